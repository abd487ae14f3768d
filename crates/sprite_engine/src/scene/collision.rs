//! Axis-aligned collision boxes
//!
//! A [`BoxCollision`] is a rectangle anchored on its owner's position through
//! a [`Pivot`]. Bounds are recomputed from the owner's global position on
//! every query, so moving an instance moves its box with no extra bookkeeping.
//!
//! Intervals are half-open: boxes that only touch along an edge do not
//! overlap. This keeps the test symmetric and lets tiles sit flush.

use crate::foundation::math::Vector3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Axis-aligned rectangle, `x`/`y` is the minimum corner
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Minimum x
    pub x: f32,
    /// Minimum y
    pub y: f32,
    /// Width
    pub w: f32,
    /// Height
    pub h: f32,
}

impl Rect {
    /// Create a rectangle from its minimum corner and size
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Create a rectangle from two corners
    pub fn from_corners(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self::new(x1.min(x2), y1.min(y2), (x2 - x1).abs(), (y2 - y1).abs())
    }

    /// Maximum x
    pub fn x2(&self) -> f32 {
        self.x + self.w
    }

    /// Maximum y
    pub fn y2(&self) -> f32 {
        self.y + self.h
    }

    /// Whether the two rectangles share any area
    pub fn overlaps(&self, other: &Self) -> bool {
        self.x < other.x2() && other.x < self.x2() && self.y < other.y2() && other.y < self.y2()
    }

    /// Whether the point lies inside (minimum edges inclusive)
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x < self.x2() && y >= self.y && y < self.y2()
    }
}

/// Anchor of a box relative to its owner's position
///
/// The first letter is the vertical anchor (Top, Middle, Bottom), the second
/// the horizontal one (Left, Middle, Right). `M` is fully centered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Pivot {
    /// Top left
    TL,
    /// Top middle
    TM,
    /// Top right
    TR,
    /// Middle left
    ML,
    /// Center
    #[default]
    M,
    /// Middle right
    MR,
    /// Bottom left
    BL,
    /// Bottom middle
    BM,
    /// Bottom right
    BR,
}

impl Pivot {
    /// Horizontal extent `[x1, x2]` of a box of `width` anchored here
    pub fn horizontal(self, width: f32) -> (f32, f32) {
        match self {
            Self::TL | Self::ML | Self::BL => (0.0, width),
            Self::TM | Self::M | Self::BM => (-width / 2.0, width / 2.0),
            Self::TR | Self::MR | Self::BR => (-width, 0.0),
        }
    }

    /// Vertical extent `[y1, y2]` of a box of `height` anchored here
    pub fn vertical(self, height: f32) -> (f32, f32) {
        match self {
            Self::BL | Self::BM | Self::BR => (0.0, height),
            Self::ML | Self::M | Self::MR => (-height / 2.0, height / 2.0),
            Self::TL | Self::TM | Self::TR => (-height, 0.0),
        }
    }
}

/// Error returned when a pivot code is not recognised
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown pivot '{0}'")]
pub struct ParsePivotError(pub String);

impl FromStr for Pivot {
    type Err = ParsePivotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "TL" => Self::TL,
            "TM" => Self::TM,
            "TR" => Self::TR,
            "ML" => Self::ML,
            "M" => Self::M,
            "MR" => Self::MR,
            "BL" => Self::BL,
            "BM" => Self::BM,
            "BR" => Self::BR,
            other => return Err(ParsePivotError(other.to_string())),
        })
    }
}

impl fmt::Display for Pivot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Collision rectangle attached to an instance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxCollision {
    width: f32,
    height: f32,
    pivot: Pivot,
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl BoxCollision {
    /// Create a box of the given size anchored at `pivot`
    pub fn new(width: f32, height: f32, pivot: Pivot) -> Self {
        let (x1, x2) = pivot.horizontal(width);
        let (y1, y2) = pivot.vertical(height);
        Self {
            width,
            height,
            pivot,
            x1,
            x2,
            y1,
            y2,
        }
    }

    /// Box width
    pub const fn width(&self) -> f32 {
        self.width
    }

    /// Box height
    pub const fn height(&self) -> f32 {
        self.height
    }

    /// Anchor
    pub const fn pivot(&self) -> Pivot {
        self.pivot
    }

    /// World bounds when the owner sits at `origin`
    pub fn bounds_at(&self, origin: &Vector3) -> Rect {
        Rect::from_corners(
            origin.x + self.x1,
            origin.y + self.y1,
            origin.x + self.x2,
            origin.y + self.y2,
        )
    }

    /// Whether this box at `origin` overlaps `other` at `other_origin`
    pub fn overlaps(&self, origin: &Vector3, other: &Self, other_origin: &Vector3) -> bool {
        self.bounds_at(origin).overlaps(&other.bounds_at(other_origin))
    }

    /// Whether this box at `origin` overlaps a raw rectangle
    pub fn overlaps_rect(&self, origin: &Vector3, rect: &Rect) -> bool {
        self.bounds_at(origin).overlaps(rect)
    }
}
