//! Resolution of simultaneous moves into the same destination cell.

use rustc_hash::FxHashMap;

use gw_core::{AgentId, MoveConflictPolicy, Position, WorldRng};

/// A mover's path-truncated destination for this turn, plus the submission
/// order of its request.
#[derive(Copy, Clone, Debug)]
pub struct ProposedMove {
    pub agent:       AgentId,
    pub destination: Position,
    pub seq:         u64,
}

/// Decide which movers actually move.
///
/// Contenders are grouped by destination cell; each contended cell is
/// settled by the policy.  Destinations are visited in sorted order so the
/// `Random` policy consumes the world PRNG deterministically.
pub fn resolve_moves(
    proposals: &[ProposedMove],
    policy: MoveConflictPolicy,
    rng: &mut WorldRng,
) -> Vec<(AgentId, Position)> {
    let mut by_destination: FxHashMap<Position, Vec<&ProposedMove>> = FxHashMap::default();
    for proposal in proposals {
        by_destination
            .entry(proposal.destination)
            .or_default()
            .push(proposal);
    }

    let mut destinations: Vec<Position> = by_destination.keys().copied().collect();
    destinations.sort();

    let mut winners = Vec::with_capacity(proposals.len());
    for destination in destinations {
        let contenders = &by_destination[&destination];
        if contenders.len() == 1 {
            winners.push((contenders[0].agent, destination));
            continue;
        }
        match policy {
            // Contention voids the cell for everyone.
            MoveConflictPolicy::NoCollisions => {}

            MoveConflictPolicy::FirstComeFirstServed => {
                let first = contenders
                    .iter()
                    .min_by_key(|proposal| proposal.seq)
                    .unwrap();
                winners.push((first.agent, destination));
            }

            MoveConflictPolicy::Random => {
                let pick = rng.below(contenders.len() as u32) as usize;
                winners.push((contenders[pick].agent, destination));
            }
        }
    }
    winners
}
