//! Driver for multiplexed 8x8x8 LED cubes.
//!
//! The cube keeps an on/off voxel grid behind a single display lock. A
//! background [`ScanEngine`] sweeps that grid onto the hardware, while callers
//! change it through [`LedCube`], either voxel by voxel or by projecting
//! characters into whole layers.

pub mod config;
pub mod cube;
pub mod effect;
pub mod error;
pub mod glyph;
pub mod hardware;
pub mod scan;
pub mod transform;
pub mod voxel;

pub use config::{CubeConfig, PinMap, ScanTimings};
pub use cube::LedCube;
pub use effect::{DropLineEffect, Effect, EffectId, EffectSlot, WanderEdgeEffect, WanderEvent};
pub use error::{CubeError, ScriptError};
pub use glyph::GlyphLookup;
pub use hardware::{CubeHardware, Demultiplexer, Hc154, Platform, channel_for};
pub use scan::{ScanEngine, ScanState, SharedGrid, Shutdown};
pub use transform::{Angle, Direction, Image, IndexMap, orient, rotate};
pub use voxel::{Axis, CUBE_SIZE, LedState, Plane, Voxel, VoxelGrid};

pub use embassy_time::{Delay, Duration, Instant};
