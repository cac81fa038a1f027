//! Voxel state buffer
//!
//! Plain in-memory model of the cube. Nothing here touches hardware; callers
//! that share a grid with the scan engine go through [`crate::LedCube`], which
//! wraps every mutation in the display lock.

use crate::error::CubeError;
use crate::transform::Image;

/// Number of voxels along each edge of the cube
pub const CUBE_SIZE: usize = 8;

/// On/off state of a single LED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LedState {
    #[default]
    Off,
    On,
}

impl LedState {
    pub const fn is_on(self) -> bool {
        matches!(self, Self::On)
    }
}

impl From<bool> for LedState {
    fn from(value: bool) -> Self {
        if value { Self::On } else { Self::Off }
    }
}

/// One of the three cube axes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Returns the axis that is neither `self` nor `other`
    ///
    /// Returns `None` if both axes are the same.
    pub const fn third(self, other: Axis) -> Option<Axis> {
        Some(match (self, other) {
            (Axis::X, Axis::Y) | (Axis::Y, Axis::X) => Axis::Z,
            (Axis::X, Axis::Z) | (Axis::Z, Axis::X) => Axis::Y,
            (Axis::Y, Axis::Z) | (Axis::Z, Axis::Y) => Axis::X,
            _ => return None,
        })
    }
}

/// Pair of axes that are held fixed when lighting a row
///
/// The row runs along the remaining axis:
/// `XY` varies `z`, `YZ` varies `x`, `XZ` varies `y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plane {
    XY,
    YZ,
    XZ,
}

impl Plane {
    /// Plane whose rows run along `axis`
    pub const fn across(axis: Axis) -> Self {
        match axis {
            Axis::X => Self::YZ,
            Axis::Y => Self::XZ,
            Axis::Z => Self::XY,
        }
    }

    /// Axis the row varies along
    pub const fn along(self) -> Axis {
        match self {
            Self::XY => Axis::Z,
            Self::YZ => Axis::X,
            Self::XZ => Axis::Y,
        }
    }

    /// Fixed axes in the order the `a`/`b` arguments of
    /// [`VoxelGrid::light_row`] are interpreted
    pub const fn fixed(self) -> (Axis, Axis) {
        match self {
            Self::XY => (Axis::X, Axis::Y),
            Self::YZ => (Axis::Y, Axis::Z),
            Self::XZ => (Axis::X, Axis::Z),
        }
    }
}

/// Position of a single voxel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Voxel {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl Voxel {
    pub const fn new(x: usize, y: usize, z: usize) -> Self {
        Self { x, y, z }
    }

    /// Coordinate along the given axis
    pub const fn get(self, axis: Axis) -> usize {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    /// Replace the coordinate along the given axis
    #[must_use]
    pub const fn with(mut self, axis: Axis, value: usize) -> Self {
        match axis {
            Axis::X => self.x = value,
            Axis::Y => self.y = value,
            Axis::Z => self.z = value,
        }
        self
    }

    /// Checks that every coordinate is inside the cube
    pub fn validate(self) -> Result<Self, CubeError> {
        check(self.x)?;
        check(self.y)?;
        check(self.z)?;
        Ok(self)
    }
}

/// Checks a single coordinate against the cube size
pub fn check(value: usize) -> Result<usize, CubeError> {
    if value < CUBE_SIZE {
        Ok(value)
    } else {
        Err(CubeError::OutOfRange { value })
    }
}

/// The 8x8x8 on/off grid, stored `[z][x][y]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VoxelGrid {
    cells: [[[LedState; CUBE_SIZE]; CUBE_SIZE]; CUBE_SIZE],
}

impl VoxelGrid {
    /// Create a grid with every LED off
    pub const fn new() -> Self {
        Self {
            cells: [[[LedState::Off; CUBE_SIZE]; CUBE_SIZE]; CUBE_SIZE],
        }
    }

    pub fn get(&self, voxel: Voxel) -> Result<LedState, CubeError> {
        let Voxel { x, y, z } = voxel.validate()?;
        Ok(self.cells[z][x][y])
    }

    pub fn set(&mut self, voxel: Voxel, state: LedState) -> Result<(), CubeError> {
        let Voxel { x, y, z } = voxel.validate()?;
        self.cells[z][x][y] = state;
        Ok(())
    }

    /// Unchecked read used by the scan loop, which only iterates valid ranges
    #[inline]
    pub(crate) fn cell(&self, z: usize, x: usize, y: usize) -> LedState {
        self.cells[z][x][y]
    }

    /// Turn every LED off
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Set all 64 cells of the layer orthogonal to `axis` at `index`
    pub fn light_layer(&mut self, axis: Axis, index: usize, state: LedState) -> Result<(), CubeError> {
        let index = check(index)?;
        for a in 0..CUBE_SIZE {
            for b in 0..CUBE_SIZE {
                let (z, x, y) = match axis {
                    Axis::X => (a, index, b),
                    Axis::Y => (a, b, index),
                    Axis::Z => (index, a, b),
                };
                self.cells[z][x][y] = state;
            }
        }
        Ok(())
    }

    /// Set the 8 cells that vary along the axis not covered by `plane`
    ///
    /// `a` and `b` are the fixed coordinates in the order given by
    /// [`Plane::fixed`].
    pub fn light_row(&mut self, plane: Plane, a: usize, b: usize, state: LedState) -> Result<(), CubeError> {
        let (a, b) = (check(a)?, check(b)?);
        let (first, second) = plane.fixed();
        let base = Voxel::default().with(first, a).with(second, b);
        let along = plane.along();
        for i in 0..CUBE_SIZE {
            let Voxel { x, y, z } = base.with(along, i);
            self.cells[z][x][y] = state;
        }
        Ok(())
    }

    /// Copy an oriented image into the layer orthogonal to `axis`
    ///
    /// The image is indexed `[x][y]` for Z layers, `[z][x]` for Y layers and
    /// `[z][y]` for X layers.
    pub fn set_layer_image(&mut self, axis: Axis, index: usize, image: &Image) -> Result<(), CubeError> {
        let index = check(index)?;
        for row in 0..CUBE_SIZE {
            for col in 0..CUBE_SIZE {
                let state = image.get(row, col);
                match axis {
                    Axis::Z => self.cells[index][row][col] = state,
                    Axis::Y => self.cells[row][col][index] = state,
                    Axis::X => self.cells[row][index][col] = state,
                }
            }
        }
        Ok(())
    }

    /// Number of LEDs currently on
    pub fn count_on(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .flatten()
            .filter(|state| state.is_on())
            .count()
    }
}
