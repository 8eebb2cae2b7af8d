//! Integer lattice coordinates and patch↔world conversion.
//!
//! The world is an unbounded signed-64-bit lattice.  Patches are `n × n`
//! squares; a world position maps to exactly one patch via floored division,
//! so patch `(0, 0)` covers world cells `[0, n) × [0, n)` and patch
//! `(-1, -1)` covers `[-n, 0) × [-n, 0)`.
//!
//! `Position` is used both for world cells and for patch coordinates; the
//! two never mix in arithmetic because every conversion goes through
//! [`Position::to_patch`] / [`Position::patch_origin`].

use std::fmt;
use std::io::{Read, Write};

use crate::codec::{Decode, Encode};

// ── Position ──────────────────────────────────────────────────────────────────

/// A point on the integer lattice (or a patch coordinate).
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Default)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Position {
    pub x: i64,
    pub y: i64,
}

impl Position {
    pub const ORIGIN: Position = Position { x: 0, y: 0 };

    #[inline]
    pub const fn new(x: i64, y: i64) -> Position {
        Position { x, y }
    }

    #[inline]
    pub fn up(self) -> Position {
        Position { x: self.x, y: self.y + 1 }
    }

    #[inline]
    pub fn down(self) -> Position {
        Position { x: self.x, y: self.y - 1 }
    }

    #[inline]
    pub fn left(self) -> Position {
        Position { x: self.x - 1, y: self.y }
    }

    #[inline]
    pub fn right(self) -> Position {
        Position { x: self.x + 1, y: self.y }
    }

    /// Squared Euclidean length, exact in `u64`.
    #[inline]
    pub fn squared_length(self) -> u64 {
        (self.x.wrapping_mul(self.x) as u64).wrapping_add(self.y.wrapping_mul(self.y) as u64)
    }

    /// Chebyshev (chess-king) distance to `other`.
    #[inline]
    pub fn chebyshev(self, other: Position) -> u64 {
        let dx = (self.x - other.x).unsigned_abs();
        let dy = (self.y - other.y).unsigned_abs();
        dx.max(dy)
    }

    /// The eight neighboring positions, in row-major order starting at the
    /// upper-left.
    pub fn neighbors8(self) -> [Position; 8] {
        [
            self.up().left(),
            self.up(),
            self.up().right(),
            self.left(),
            self.right(),
            self.down().left(),
            self.down(),
            self.down().right(),
        ]
    }

    // ── Patch conversion ──────────────────────────────────────────────────

    /// The patch coordinate containing this world position, for patches of
    /// side `n` (floored division — negative coordinates round toward −∞).
    #[inline]
    pub fn to_patch(self, n: u32) -> Position {
        Position {
            x: floored_div(self.x, n),
            y: floored_div(self.y, n),
        }
    }

    /// Patch coordinate plus the offset of this position within that patch
    /// (both components in `[0, n)`).
    #[inline]
    pub fn to_patch_with_offset(self, n: u32) -> (Position, Position) {
        let (px, ox) = floored_div_rem(self.x, n);
        let (py, oy) = floored_div_rem(self.y, n);
        (Position::new(px, py), Position::new(ox, oy))
    }

    /// World position of the bottom-left cell of the patch with coordinate
    /// `self` (inverse of [`Position::to_patch`]).
    #[inline]
    pub fn patch_origin(self, n: u32) -> Position {
        Position {
            x: self.x * n as i64,
            y: self.y * n as i64,
        }
    }
}

#[inline]
fn floored_div(a: i64, b: u32) -> i64 {
    let b = b as i64;
    let mut q = a / b;
    if a % b != 0 && a < 0 {
        q -= 1;
    }
    q
}

#[inline]
fn floored_div_rem(a: i64, b: u32) -> (i64, i64) {
    let b = b as i64;
    let mut q = a / b;
    let mut r = a % b;
    if r != 0 && a < 0 {
        q -= 1;
        r += b;
    }
    (q, r)
}

impl std::ops::Add for Position {
    type Output = Position;
    #[inline]
    fn add(self, rhs: Position) -> Position {
        Position::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Position {
    type Output = Position;
    #[inline]
    fn sub(self, rhs: Position) -> Position {
        Position::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Mul<i64> for Position {
    type Output = Position;
    #[inline]
    fn mul(self, k: i64) -> Position {
        Position::new(self.x * k, self.y * k)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl Encode for Position {
    fn encode<W: Write + ?Sized>(&self, out: &mut W) -> std::io::Result<()> {
        self.x.encode(out)?;
        self.y.encode(out)
    }
}

impl Decode for Position {
    fn decode<R: Read + ?Sized>(input: &mut R) -> std::io::Result<Self> {
        Ok(Position {
            x: i64::decode(input)?,
            y: i64::decode(input)?,
        })
    }
}

// ── BoundingBox ───────────────────────────────────────────────────────────────

/// An inclusive axis-aligned rectangle of world cells.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct BoundingBox {
    pub bottom_left: Position,
    pub top_right:   Position,
}

impl BoundingBox {
    pub fn new(bottom_left: Position, top_right: Position) -> BoundingBox {
        BoundingBox { bottom_left, top_right }
    }

    /// `true` if `pos` lies inside the rectangle (corners inclusive).
    #[inline]
    pub fn contains(&self, pos: Position) -> bool {
        pos.x >= self.bottom_left.x
            && pos.x <= self.top_right.x
            && pos.y >= self.bottom_left.y
            && pos.y <= self.top_right.y
    }

    /// Iterate the patch coordinates (for patches of side `n`) that intersect
    /// this rectangle, in row-major order (y outer, x inner, both ascending).
    pub fn patches(&self, n: u32) -> impl Iterator<Item = Position> + use<> {
        let lo = self.bottom_left.to_patch(n);
        let hi = self.top_right.to_patch(n);
        (lo.y..=hi.y).flat_map(move |y| (lo.x..=hi.x).map(move |x| Position::new(x, y)))
    }
}

impl Encode for BoundingBox {
    fn encode<W: Write + ?Sized>(&self, out: &mut W) -> std::io::Result<()> {
        self.bottom_left.encode(out)?;
        self.top_right.encode(out)
    }
}

impl Decode for BoundingBox {
    fn decode<R: Read + ?Sized>(input: &mut R) -> std::io::Result<Self> {
        Ok(BoundingBox {
            bottom_left: Position::decode(input)?,
            top_right:   Position::decode(input)?,
        })
    }
}
