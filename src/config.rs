//! Wiring and timing configuration

use embassy_time::Duration;

use crate::hardware::{DEMUX_COUNT, DEMUX_SELECT_LINES};
use crate::voxel::CUBE_SIZE;

/// GPIO numbers of every line the cube is wired to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinMap {
    /// Address lines shared by all demultiplexers, least significant bit first
    pub select: [u8; DEMUX_SELECT_LINES],
    /// Active-low gate of each demultiplexer
    pub gates: [u8; DEMUX_COUNT],
    /// Power rail of each z-layer
    pub rails: [u8; CUBE_SIZE],
}

impl Default for PinMap {
    fn default() -> Self {
        Self {
            select: [17, 27, 22, 5],
            gates: [6, 13, 19, 26],
            rails: [18, 23, 24, 25, 12, 16, 20, 21],
        }
    }
}

/// Scan loop timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanTimings {
    /// How long a selected LED stays lit, bounded below by the demux minimum pulse width
    pub pulse_width_ns: u32,
    /// Pause between two sweeps, taken with the display lock released
    pub sweep_pause_ns: u32,
    /// Upper bound on waiting for the scan thread to exit
    pub shutdown_timeout: Duration,
    /// How often the scan thread is checked while shutting down
    pub shutdown_poll: Duration,
}

impl Default for ScanTimings {
    fn default() -> Self {
        Self {
            pulse_width_ns: 300,
            sweep_pause_ns: 300,
            shutdown_timeout: Duration::from_millis(50),
            shutdown_poll: Duration::from_millis(10),
        }
    }
}

/// Configuration for the LED cube
#[derive(Debug, Clone, Default)]
pub struct CubeConfig {
    pub pins: PinMap,
    pub timings: ScanTimings,
}
