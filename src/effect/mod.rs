//! Scripted animations built on top of the cube API
//!
//! Effects only talk to the cube through its locked mutators, so they can run
//! on any thread while the scan engine refreshes the hardware.

mod drop_line;
pub mod script;
mod wander_edge;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::Duration;
use embedded_hal::delay::DelayNs;

pub use drop_line::{DropLineEffect, DropMove};
pub use wander_edge::{EdgeTrail, WanderEdgeEffect, WanderEvent};

use crate::cube::LedCube;
use crate::error::CubeError;
use crate::glyph::GlyphLookup;

const EFFECT_NAME_DROP_LINE: &str = "drop_line";
const EFFECT_NAME_WANDER_EDGE: &str = "wander_edge";

pub trait Effect {
    /// Play the whole animation once, blocking the calling thread
    fn show<G: GlyphLookup, R: RawMutex>(
        &mut self,
        cube: &LedCube<G, R>,
        delay: &mut impl DelayNs,
    ) -> Result<(), CubeError>;
}

/// Known effect ids that can be requested.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EffectId {
    DropLine,
    WanderEdge,
}

impl EffectId {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DropLine => EFFECT_NAME_DROP_LINE,
            Self::WanderEdge => EFFECT_NAME_WANDER_EDGE,
        }
    }

    pub fn parse_from_str(s: &str) -> Option<Self> {
        match s {
            EFFECT_NAME_DROP_LINE => Some(Self::DropLine),
            EFFECT_NAME_WANDER_EDGE => Some(Self::WanderEdge),
            _ => None,
        }
    }
}

/// Effect slot - enum containing all possible effects
#[derive(Debug, Clone)]
pub enum EffectSlot {
    DropLine(DropLineEffect),
    WanderEdge(WanderEdgeEffect),
}

impl EffectSlot {
    pub fn id(&self) -> EffectId {
        match self {
            Self::DropLine(_) => EffectId::DropLine,
            Self::WanderEdge(_) => EffectId::WanderEdge,
        }
    }
}

impl Effect for EffectSlot {
    fn show<G: GlyphLookup, R: RawMutex>(
        &mut self,
        cube: &LedCube<G, R>,
        delay: &mut impl DelayNs,
    ) -> Result<(), CubeError> {
        match self {
            Self::DropLine(effect) => effect.show(cube, delay),
            Self::WanderEdge(effect) => effect.show(cube, delay),
        }
    }
}

/// Block for `duration` with millisecond resolution
pub(crate) fn pause(delay: &mut impl DelayNs, duration: Duration) {
    delay.delay_ms(u32::try_from(duration.as_millis()).unwrap_or(u32::MAX));
}
