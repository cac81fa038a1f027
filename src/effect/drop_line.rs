use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::Duration;
use embedded_hal::delay::DelayNs;

use super::{Effect, pause};
use crate::cube::LedCube;
use crate::error::CubeError;
use crate::glyph::GlyphLookup;
use crate::transform::Direction;
use crate::voxel::{Axis, CUBE_SIZE, LedState, Plane};

/// One sweep of the drop-line animation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropMove {
    /// Direction the lines travel in
    pub direction: Direction,
    /// Axis the lit lines run along
    pub parallel: Axis,
}

/// Lights the first layer, then moves its lines one by one to the far side
#[derive(Debug, Clone)]
pub struct DropLineEffect {
    moves: Vec<DropMove>,
    step: Duration,
}

impl DropLineEffect {
    pub const fn new(step: Duration) -> Self {
        Self {
            moves: Vec::new(),
            step,
        }
    }

    #[must_use]
    pub fn with_move(mut self, direction: Direction, parallel: Axis) -> Self {
        self.push(direction, parallel);
        self
    }

    pub fn push(&mut self, direction: Direction, parallel: Axis) {
        self.moves.push(DropMove {
            direction,
            parallel,
        });
    }

    pub fn moves(&self) -> &[DropMove] {
        &self.moves
    }

    /// Play a single move
    ///
    /// A move whose lines run along the travel axis is skipped.
    pub fn show_move<G: GlyphLookup, R: RawMutex>(
        &self,
        cube: &LedCube<G, R>,
        DropMove {
            direction,
            parallel,
        }: DropMove,
        delay: &mut impl DelayNs,
    ) -> Result<(), CubeError> {
        let axis = direction.axis();
        if axis.third(parallel).is_none() {
            return Ok(());
        }
        let plane = Plane::across(parallel);
        let start = direction.start();

        cube.update(|grid| {
            grid.clear();
            grid.light_layer(axis, start, LedState::On)
        })?;
        pause(delay, self.step);

        for line in 0..CUBE_SIZE {
            let mut from = start;
            for _ in 1..CUBE_SIZE {
                let to = from.wrapping_add_signed(direction.step());
                let (from_a, from_b) = row_args(plane, axis, from, line);
                let (to_a, to_b) = row_args(plane, axis, to, line);
                cube.update(|grid| {
                    grid.light_row(plane, from_a, from_b, LedState::Off)?;
                    grid.light_row(plane, to_a, to_b, LedState::On)
                })?;
                pause(delay, self.step);
                from = to;
            }
        }
        Ok(())
    }
}

impl Effect for DropLineEffect {
    fn show<G: GlyphLookup, R: RawMutex>(
        &mut self,
        cube: &LedCube<G, R>,
        delay: &mut impl DelayNs,
    ) -> Result<(), CubeError> {
        for &mv in &self.moves {
            self.show_move(cube, mv, delay)?;
        }
        Ok(())
    }
}

/// Order a travel coordinate and a line index the way `plane` expects them
fn row_args(plane: Plane, travel: Axis, position: usize, line: usize) -> (usize, usize) {
    let (first, _) = plane.fixed();
    if first == travel {
        (position, line)
    } else {
        (line, position)
    }
}
