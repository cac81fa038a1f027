use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::Duration;
use embedded_hal::delay::DelayNs;

use super::script::read_events;
use super::{Effect, pause};
use crate::cube::LedCube;
use crate::error::{CubeError, ScriptError};
use crate::glyph::GlyphLookup;
use crate::transform::Direction;
use crate::voxel::{Axis, CUBE_SIZE, LedState, Voxel};

/// Number of edge segments a trail walks before it stops
const TRAIL_LEGS: usize = 6;

/// One run of the wander-edge animation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WanderEvent {
    pub x: Direction,
    pub y: Direction,
    pub z: Direction,
    /// Pause after every step
    pub step: Duration,
    /// Pause once both trails are done, before the cube is cleared
    pub hold: Duration,
}

impl WanderEvent {
    /// Corner the trails start from, if every direction runs along its own axis
    pub fn start_corner(&self) -> Option<Voxel> {
        let aligned =
            self.x.axis() == Axis::X && self.y.axis() == Axis::Y && self.z.axis() == Axis::Z;
        aligned.then(|| Voxel::new(self.x.start(), self.y.start(), self.z.start()))
    }
}

/// Growing trail that follows the cube edges
///
/// The head keeps moving in the current direction until it would leave the
/// cube, then turns to the next one. Once every direction is used up the
/// trail stops.
#[derive(Debug, Clone)]
pub struct EdgeTrail {
    head: Voxel,
    legs: [Direction; TRAIL_LEGS],
    leg: usize,
}

impl EdgeTrail {
    pub const fn new(head: Voxel, legs: [Direction; TRAIL_LEGS]) -> Self {
        Self { head, legs, leg: 0 }
    }

    pub const fn head(&self) -> Voxel {
        self.head
    }

    /// Move the head one voxel and return its new position
    pub fn advance(&mut self) -> Option<Voxel> {
        while let Some(&direction) = self.legs.get(self.leg) {
            if let Some(next) = step(self.head, direction) {
                self.head = next;
                return Some(next);
            }
            self.leg += 1;
        }
        None
    }
}

fn step(voxel: Voxel, direction: Direction) -> Option<Voxel> {
    let axis = direction.axis();
    let value = voxel.get(axis).checked_add_signed(direction.step())?;
    (value < CUBE_SIZE).then(|| voxel.with(axis, value))
}

/// Two trails leave a corner along different edge paths until they run out
#[derive(Debug, Clone, Default)]
pub struct WanderEdgeEffect {
    events: Vec<WanderEvent>,
}

impl WanderEdgeEffect {
    pub const fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn push(&mut self, event: WanderEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[WanderEvent] {
        &self.events
    }

    /// Append the events of a script
    ///
    /// Returns the number of events added. Events read before a parse error
    /// are kept.
    pub fn load_script(&mut self, script: &str) -> Result<usize, ScriptError> {
        let before = self.events.len();
        read_events(script, &mut self.events).inspect_err(|err| {
            tracing::debug!(%err, kept = self.events.len() - before, "wander-edge script rejected");
        })?;
        Ok(self.events.len() - before)
    }

    /// Play a single event
    pub fn show_event<G: GlyphLookup, R: RawMutex>(
        &self,
        cube: &LedCube<G, R>,
        event: &WanderEvent,
        delay: &mut impl DelayNs,
    ) -> Result<(), CubeError> {
        cube.clear();

        let Some(corner) = event.start_corner() else {
            pause(delay, event.hold);
            return Ok(());
        };
        let (x, y, z) = (event.x, event.y, event.z);
        let mut first = EdgeTrail::new(corner, [y, x, z, x.reversed(), y.reversed(), z.reversed()]);
        let mut second = EdgeTrail::new(corner, [x, y, z, y.reversed(), x.reversed(), z.reversed()]);

        cube.set(corner, LedState::On)?;
        while let (Some(a), Some(b)) = (first.advance(), second.advance()) {
            cube.update(|grid| {
                grid.set(a, LedState::On)?;
                grid.set(b, LedState::On)
            })?;
            pause(delay, event.step);
        }

        pause(delay, event.hold);
        cube.clear();
        Ok(())
    }
}

impl Effect for WanderEdgeEffect {
    fn show<G: GlyphLookup, R: RawMutex>(
        &mut self,
        cube: &LedCube<G, R>,
        delay: &mut impl DelayNs,
    ) -> Result<(), CubeError> {
        for event in &self.events {
            self.show_event(cube, event, delay)?;
        }
        Ok(())
    }
}
