//! Directions, turns, and the per-action policy knobs.
//!
//! Wire codes are part of the protocol and must not be renumbered:
//! `Direction` is `UP=0, DOWN=1, LEFT=2, RIGHT=3`; `TurnDirection` is
//! `NO_CHANGE=0, REVERSE=1, LEFT=2, RIGHT=3`.

use std::fmt;
use std::io::{Read, Write};

use crate::codec::{Decode, Encode, invalid_data};
use crate::position::Position;

// ── Direction ─────────────────────────────────────────────────────────────────

/// One of the four lattice directions.  Doubles as an agent's facing.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
#[repr(u8)]
pub enum Direction {
    Up    = 0,
    Down  = 1,
    Left  = 2,
    Right = 3,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Unit step vector of this direction.
    #[inline]
    pub fn step(self) -> Position {
        match self {
            Direction::Up    => Position::new(0, 1),
            Direction::Down  => Position::new(0, -1),
            Direction::Left  => Position::new(-1, 0),
            Direction::Right => Position::new(1, 0),
        }
    }

    /// The facing that results from applying `turn` to this facing.
    pub fn rotated(self, turn: TurnDirection) -> Direction {
        match turn {
            TurnDirection::NoChange => self,
            TurnDirection::Reverse => match self {
                Direction::Up    => Direction::Down,
                Direction::Down  => Direction::Up,
                Direction::Left  => Direction::Right,
                Direction::Right => Direction::Left,
            },
            // Counter-clockwise quarter turn.
            TurnDirection::Left => match self {
                Direction::Up    => Direction::Left,
                Direction::Left  => Direction::Down,
                Direction::Down  => Direction::Right,
                Direction::Right => Direction::Up,
            },
            // Clockwise quarter turn.
            TurnDirection::Right => match self {
                Direction::Up    => Direction::Right,
                Direction::Right => Direction::Down,
                Direction::Down  => Direction::Left,
                Direction::Left  => Direction::Up,
            },
        }
    }

    pub fn from_wire(code: u8) -> Option<Direction> {
        match code {
            0 => Some(Direction::Up),
            1 => Some(Direction::Down),
            2 => Some(Direction::Left),
            3 => Some(Direction::Right),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::Up    => "up",
            Direction::Down  => "down",
            Direction::Left  => "left",
            Direction::Right => "right",
        };
        f.write_str(name)
    }
}

impl Encode for Direction {
    fn encode<W: Write + ?Sized>(&self, out: &mut W) -> std::io::Result<()> {
        (*self as u8).encode(out)
    }
}

impl Decode for Direction {
    fn decode<R: Read + ?Sized>(input: &mut R) -> std::io::Result<Self> {
        let code = u8::decode(input)?;
        Direction::from_wire(code).ok_or_else(|| invalid_data("bad direction code"))
    }
}

// ── TurnDirection ─────────────────────────────────────────────────────────────

/// A relative rotation request.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
#[repr(u8)]
pub enum TurnDirection {
    NoChange = 0,
    Reverse  = 1,
    Left     = 2,
    Right    = 3,
}

impl TurnDirection {
    pub const ALL: [TurnDirection; 4] = [
        TurnDirection::NoChange,
        TurnDirection::Reverse,
        TurnDirection::Left,
        TurnDirection::Right,
    ];

    pub fn from_wire(code: u8) -> Option<TurnDirection> {
        match code {
            0 => Some(TurnDirection::NoChange),
            1 => Some(TurnDirection::Reverse),
            2 => Some(TurnDirection::Left),
            3 => Some(TurnDirection::Right),
            _ => None,
        }
    }
}

impl Encode for TurnDirection {
    fn encode<W: Write + ?Sized>(&self, out: &mut W) -> std::io::Result<()> {
        (*self as u8).encode(out)
    }
}

impl Decode for TurnDirection {
    fn decode<R: Read + ?Sized>(input: &mut R) -> std::io::Result<Self> {
        let code = u8::decode(input)?;
        TurnDirection::from_wire(code).ok_or_else(|| invalid_data("bad turn code"))
    }
}

// ── Policies ──────────────────────────────────────────────────────────────────

/// What the simulator does with a particular movement or rotation request.
///
/// `Ignored` accepts the request but silently records a no-op — useful for
/// experiments that want a uniform action space where some actions are inert.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub enum ActionPolicy {
    Allowed,
    Disallowed,
    Ignored,
}

/// How simultaneous moves into the same destination cell are resolved.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub enum MoveConflictPolicy {
    /// Any contended cell rejects every contender.
    NoCollisions,
    /// The earliest-submitted request wins; the rest stay put.
    FirstComeFirstServed,
    /// A uniformly random contender wins; the rest stay put.
    Random,
}
