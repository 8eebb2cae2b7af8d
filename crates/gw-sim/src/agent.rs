//! Per-agent state.

use std::io::{Read, Write};

use gw_core::codec::{read_f32_grid, write_f32_grid};
use gw_core::{AgentId, Decode, Direction, Encode, Position, TurnDirection};

/// The action an agent has queued for the current turn.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum RequestedAction {
    /// Nothing queued yet — the turn barrier is waiting on this agent.
    #[default]
    None,
    Move {
        direction: Direction,
        steps:     u32,
    },
    Turn(TurnDirection),
    NoOp,
}

impl RequestedAction {
    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, RequestedAction::None)
    }
}

/// One agent.
///
/// Observation buffers are plain flattened `f32` vectors: `scent` has
/// `scent_dim` channels; `vision` is `(2·vision_range + 1)²` cells ×
/// `color_dim` channels, row-major in the agent's rotated local frame.
#[derive(Clone, Debug)]
pub struct AgentState {
    pub id:        AgentId,
    pub position:  Position,
    pub direction: Direction,

    /// Scent at the agent's cell, as of the last committed turn.
    pub scent: Vec<f32>,

    /// Egocentric vision window, as of the last committed turn.
    pub vision: Vec<f32>,

    /// Items collected so far, indexed by item type.
    pub collected_counts: Vec<u32>,

    /// Queued action for the in-progress turn.
    pub requested: RequestedAction,

    /// Global submission counter value at the time `requested` was recorded;
    /// orders first-come-first-served conflict resolution.
    pub request_seq: u64,

    /// Inactive agents are exempt from the turn barrier and keep their last
    /// observations.
    pub active: bool,
}

impl AgentState {
    pub fn new(
        id: AgentId,
        position: Position,
        scent_dim: u32,
        vision_len: usize,
        type_count: usize,
    ) -> AgentState {
        AgentState {
            id,
            position,
            direction: Direction::Up,
            scent: vec![0.0; scent_dim as usize],
            vision: vec![0.0; vision_len],
            collected_counts: vec![0; type_count],
            requested: RequestedAction::None,
            request_seq: 0,
            active: true,
        }
    }

    /// Encode the externally visible state (the wire form: no queued action,
    /// no submission bookkeeping).
    pub fn write_observable<W: Write + ?Sized>(&self, out: &mut W) -> std::io::Result<()> {
        self.id.encode(out)?;
        self.position.encode(out)?;
        self.direction.encode(out)?;
        write_f32_grid(out, &self.scent)?;
        write_f32_grid(out, &self.vision)?;
        self.collected_counts.encode(out)
    }

    /// Decode the wire form written by [`AgentState::write_observable`].
    pub fn read_observable<R: Read + ?Sized>(
        input: &mut R,
        scent_dim: u32,
        vision_len: usize,
    ) -> std::io::Result<AgentState> {
        let id = AgentId::decode(input)?;
        let position = Position::decode(input)?;
        let direction = Direction::decode(input)?;
        let scent = read_f32_grid(input, scent_dim as usize)?;
        let vision = read_f32_grid(input, vision_len)?;
        let collected_counts = Vec::<u32>::decode(input)?;
        Ok(AgentState {
            id,
            position,
            direction,
            scent,
            vision,
            collected_counts,
            requested: RequestedAction::None,
            request_seq: 0,
            active: true,
        })
    }

    /// Encode the full state, including mid-turn bookkeeping (persistence).
    pub fn write_full<W: Write + ?Sized>(&self, out: &mut W) -> std::io::Result<()> {
        self.write_observable(out)?;
        match self.requested {
            RequestedAction::None => 0u8.encode(out)?,
            RequestedAction::Move { direction, steps } => {
                1u8.encode(out)?;
                direction.encode(out)?;
                steps.encode(out)?;
            }
            RequestedAction::Turn(turn) => {
                2u8.encode(out)?;
                turn.encode(out)?;
            }
            RequestedAction::NoOp => 3u8.encode(out)?,
        }
        self.request_seq.encode(out)?;
        self.active.encode(out)
    }

    /// Decode the full state written by [`AgentState::write_full`].
    pub fn read_full<R: Read + ?Sized>(
        input: &mut R,
        scent_dim: u32,
        vision_len: usize,
    ) -> std::io::Result<AgentState> {
        let mut agent = AgentState::read_observable(input, scent_dim, vision_len)?;
        agent.requested = match u8::decode(input)? {
            0 => RequestedAction::None,
            1 => RequestedAction::Move {
                direction: Direction::decode(input)?,
                steps:     u32::decode(input)?,
            },
            2 => RequestedAction::Turn(TurnDirection::decode(input)?),
            3 => RequestedAction::NoOp,
            _ => return Err(gw_core::codec::invalid_data("bad requested-action code")),
        };
        agent.request_seq = u64::decode(input)?;
        agent.active = bool::decode(input)?;
        Ok(agent)
    }
}
