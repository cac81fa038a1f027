//! Coordinate transforms for projecting 2D bitmaps into cube layers
//!
//! Every (direction, angle) pair is an element of the square's symmetry group:
//! an optional transpose followed by an optional flip of each index. A glyph is
//! oriented by composing the direction's base view with the requested rotation,
//! so all 24 layer/direction/angle combinations come from the same two tables.

use crate::voxel::{Axis, CUBE_SIZE, LedState};

const LAST: usize = CUBE_SIZE - 1;

/// An 8x8 on/off bitmap indexed `[row][col]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Image {
    pixels: [[LedState; CUBE_SIZE]; CUBE_SIZE],
}

impl Image {
    /// Blank image
    pub const fn new() -> Self {
        Self {
            pixels: [[LedState::Off; CUBE_SIZE]; CUBE_SIZE],
        }
    }

    /// Build an image from row bitmasks, most significant bit is column 0
    pub const fn from_rows(rows: [u8; CUBE_SIZE]) -> Self {
        let mut image = Self::new();
        let mut row = 0;
        while row < CUBE_SIZE {
            let mut col = 0;
            while col < CUBE_SIZE {
                if rows[row] & (0x80 >> col) != 0 {
                    image.pixels[row][col] = LedState::On;
                }
                col += 1;
            }
            row += 1;
        }
        image
    }

    /// Row bitmasks, most significant bit is column 0
    pub fn to_rows(&self) -> [u8; CUBE_SIZE] {
        let mut rows = [0u8; CUBE_SIZE];
        for (mask, row) in rows.iter_mut().zip(self.pixels.iter()) {
            for (col, state) in row.iter().enumerate() {
                if state.is_on() {
                    *mask |= 0x80 >> col;
                }
            }
        }
        rows
    }

    /// Panics if `row` or `col` is outside `0..8`
    pub fn get(&self, row: usize, col: usize) -> LedState {
        self.pixels[row][col]
    }

    /// Panics if `row` or `col` is outside `0..8`
    pub fn set(&mut self, row: usize, col: usize, state: LedState) {
        self.pixels[row][col] = state;
    }

    pub fn is_blank(&self) -> bool {
        self.pixels.iter().flatten().all(|state| !state.is_on())
    }

    /// Returns a new image where `out[r][c] = self[map.source(r, c)]`
    #[must_use]
    pub fn remap(&self, map: IndexMap) -> Self {
        let mut out = Self::new();
        for row in 0..CUBE_SIZE {
            for col in 0..CUBE_SIZE {
                let (src_row, src_col) = map.source(row, col);
                out.pixels[row][col] = self.pixels[src_row][src_col];
            }
        }
        out
    }
}

/// Index permutation from destination `(row, col)` to source `(row, col)`
///
/// The destination index pair is optionally swapped, then each component is
/// optionally mirrored (`i -> 7 - i`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexMap {
    pub transpose: bool,
    pub flip_row: bool,
    pub flip_col: bool,
}

impl IndexMap {
    pub const IDENTITY: Self = Self::new(false, false, false);

    pub const fn new(transpose: bool, flip_row: bool, flip_col: bool) -> Self {
        Self {
            transpose,
            flip_row,
            flip_col,
        }
    }

    #[inline]
    pub const fn source(self, row: usize, col: usize) -> (usize, usize) {
        let (r, c) = if self.transpose { (col, row) } else { (row, col) };
        let r = if self.flip_row { LAST - r } else { r };
        let c = if self.flip_col { LAST - c } else { c };
        (r, c)
    }
}

/// Direction a glyph is read along
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    XAscend,
    XDescend,
    YAscend,
    YDescend,
    ZAscend,
    ZDescend,
}

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction::XAscend,
        Direction::XDescend,
        Direction::YAscend,
        Direction::YDescend,
        Direction::ZAscend,
        Direction::ZDescend,
    ];

    pub const fn axis(self) -> Axis {
        match self {
            Self::XAscend | Self::XDescend => Axis::X,
            Self::YAscend | Self::YDescend => Axis::Y,
            Self::ZAscend | Self::ZDescend => Axis::Z,
        }
    }

    pub const fn is_ascending(self) -> bool {
        matches!(self, Self::XAscend | Self::YAscend | Self::ZAscend)
    }

    #[must_use]
    pub const fn reversed(self) -> Self {
        match self {
            Self::XAscend => Self::XDescend,
            Self::XDescend => Self::XAscend,
            Self::YAscend => Self::YDescend,
            Self::YDescend => Self::YAscend,
            Self::ZAscend => Self::ZDescend,
            Self::ZDescend => Self::ZAscend,
        }
    }

    /// Coordinate of the first layer met when travelling in this direction
    pub const fn start(self) -> usize {
        if self.is_ascending() { 0 } else { LAST }
    }

    /// Unit step along the axis, `+1` or `-1`
    pub const fn step(self) -> isize {
        if self.is_ascending() { 1 } else { -1 }
    }

    /// Parse names such as `X_ASCEND` (case-insensitive)
    pub fn parse_from_str(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|direction| direction.as_str().eq_ignore_ascii_case(s))
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::XAscend => "X_ASCEND",
            Self::XDescend => "X_DESCEND",
            Self::YAscend => "Y_ASCEND",
            Self::YDescend => "Y_DESCEND",
            Self::ZAscend => "Z_ASCEND",
            Self::ZDescend => "Z_DESCEND",
        }
    }

    /// Unrotated view of a glyph in a layer read along this direction
    ///
    /// Layer images are `[x][y]` for Z, `[z][x]` for Y and `[z][y]` for X.
    pub const fn base_map(self) -> IndexMap {
        match self {
            Self::ZAscend => IndexMap::IDENTITY,
            Self::ZDescend => IndexMap::new(false, false, true),
            Self::YAscend => IndexMap::new(false, true, true),
            Self::YDescend => IndexMap::new(false, true, false),
            Self::XAscend => IndexMap::new(false, true, false),
            Self::XDescend => IndexMap::new(false, true, true),
        }
    }
}

/// Right-angle rotation applied inside the layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Angle {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Angle {
    pub const ALL: [Angle; 4] = [Angle::Deg0, Angle::Deg90, Angle::Deg180, Angle::Deg270];

    /// Rotation that undoes this one
    #[must_use]
    pub const fn inverse(self) -> Self {
        match self {
            Self::Deg0 => Self::Deg0,
            Self::Deg90 => Self::Deg270,
            Self::Deg180 => Self::Deg180,
            Self::Deg270 => Self::Deg90,
        }
    }

    pub const fn index_map(self) -> IndexMap {
        match self {
            Self::Deg0 => IndexMap::IDENTITY,
            Self::Deg90 => IndexMap::new(true, true, false),
            Self::Deg180 => IndexMap::new(false, true, true),
            Self::Deg270 => IndexMap::new(true, false, true),
        }
    }
}

/// Rotate an image by a right angle
pub fn rotate(image: &Image, angle: Angle) -> Image {
    image.remap(angle.index_map())
}

/// Orient a glyph for display in a layer orthogonal to `axis`
///
/// The result is legible to a viewer looking against `direction`. A direction
/// along another axis than the layer's has no defined orientation; a blank
/// image is returned in that case.
pub fn orient(glyph: &Image, axis: Axis, direction: Direction, angle: Angle) -> Image {
    if direction.axis() != axis {
        tracing::warn!(?axis, ?direction, "direction does not match layer axis, image left blank");
        return Image::new();
    }
    let base = direction.base_map();
    let rotation = angle.index_map();

    let mut out = Image::new();
    for row in 0..CUBE_SIZE {
        for col in 0..CUBE_SIZE {
            let (r, c) = base.source(row, col);
            let (src_row, src_col) = rotation.source(r, c);
            out.set(row, col, glyph.get(src_row, src_col));
        }
    }
    out
}
