//! Physical output stage of the cube
//!
//! Each z-layer has its own power rail. Within a layer the 64 LED columns are
//! fanned out by four 1-of-16 demultiplexers: column `(x, y)` sits on chip
//! `x / 2`, output `y + 8 * (x % 2)`.

use core::cell::RefCell;
use std::sync::Arc;

use critical_section::Mutex;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorKind, OutputPin};

use crate::config::PinMap;
use crate::error::CubeError;
use crate::voxel::{CUBE_SIZE, VoxelGrid};

/// Number of demultiplexer chips
pub const DEMUX_COUNT: usize = 4;
/// Outputs per demultiplexer chip
pub const DEMUX_LINES: usize = 16;
/// Address lines per demultiplexer chip
pub const DEMUX_SELECT_LINES: usize = 4;

/// Demux output that drives one LED column of a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputChannel {
    pub demux: usize,
    pub line: u8,
}

/// Map a column position to its demux output
///
/// `x` and `y` must be inside the cube.
pub fn channel_for(x: usize, y: usize) -> OutputChannel {
    debug_assert!(x < CUBE_SIZE && y < CUBE_SIZE);
    let line = (y + CUBE_SIZE * (x % 2)) % DEMUX_LINES;
    OutputChannel {
        demux: x / 2,
        line: u8::try_from(line).unwrap_or_default(),
    }
}

/// 1-of-16 demultiplexer capability
pub trait Demultiplexer {
    type Error: embedded_hal::digital::Error;

    /// Select output `line` (`0..16`)
    fn set_output(&mut self, line: u8) -> Result<(), Self::Error>;

    /// Gate the selected output on or off
    fn enable(&mut self, enabled: bool) -> Result<(), Self::Error>;
}

/// Source of configured GPIO outputs
///
/// Implement this trait for the target board to let
/// [`CubeHardware::from_platform`] claim every line in a [`PinMap`].
pub trait Platform {
    type Pin: OutputPin;
    type Error: embedded_hal::digital::Error;

    /// Configure GPIO `number` as an output
    fn output_pin(&mut self, number: u8) -> Result<Self::Pin, Self::Error>;
}

/// Address lines shared by several demultiplexers
pub struct AddressBus<P> {
    lines: Mutex<RefCell<[P; DEMUX_SELECT_LINES]>>,
}

impl<P: OutputPin> AddressBus<P> {
    pub const fn new(lines: [P; DEMUX_SELECT_LINES]) -> Self {
        Self {
            lines: Mutex::new(RefCell::new(lines)),
        }
    }

    /// Drive the address lines with the low four bits of `line`
    pub fn select(&self, line: u8) -> Result<(), P::Error> {
        critical_section::with(|cs| {
            let mut lines = self.lines.borrow(cs).borrow_mut();
            for (bit, pin) in lines.iter_mut().enumerate() {
                if line & (1 << bit) == 0 {
                    pin.set_low()?;
                } else {
                    pin.set_high()?;
                }
            }
            Ok(())
        })
    }
}

/// 74HC154 decoder on a shared address bus
///
/// Outputs are active low and the chip is gated by a single active-low
/// enable line, so `enable(false)` drives the gate high.
pub struct Hc154<P> {
    bus: Arc<AddressBus<P>>,
    gate: P,
}

impl<P: OutputPin> Hc154<P> {
    /// Take ownership of the gate line and park the chip disabled
    pub fn new(bus: Arc<AddressBus<P>>, mut gate: P) -> Result<Self, P::Error> {
        gate.set_high()?;
        Ok(Self { bus, gate })
    }
}

impl<P: OutputPin> Demultiplexer for Hc154<P> {
    type Error = P::Error;

    fn set_output(&mut self, line: u8) -> Result<(), Self::Error> {
        self.bus.select(line & 0x0F)
    }

    fn enable(&mut self, enabled: bool) -> Result<(), Self::Error> {
        if enabled {
            self.gate.set_low()
        } else {
            self.gate.set_high()
        }
    }
}

/// Power rails and demultiplexers of one cube
pub struct CubeHardware<P, D> {
    rails: [P; CUBE_SIZE],
    demuxes: [D; DEMUX_COUNT],
}

impl<P: OutputPin, D: Demultiplexer> CubeHardware<P, D> {
    pub const fn new(rails: [P; CUBE_SIZE], demuxes: [D; DEMUX_COUNT]) -> Self {
        Self { rails, demuxes }
    }

    /// Reproduce the whole grid once
    ///
    /// Every row of every layer gets its own rail time-slice; inside a slice
    /// each lit LED is strobed for `pulse_width_ns`.
    pub fn sweep(
        &mut self,
        grid: &VoxelGrid,
        pulse_width_ns: u32,
        delay: &mut impl DelayNs,
    ) -> Result<(), CubeError> {
        for z in 0..CUBE_SIZE {
            for x in 0..CUBE_SIZE {
                self.light_row(grid, z, x, pulse_width_ns, delay)?;
            }
        }
        Ok(())
    }

    fn light_row(
        &mut self,
        grid: &VoxelGrid,
        z: usize,
        x: usize,
        pulse_width_ns: u32,
        delay: &mut impl DelayNs,
    ) -> Result<(), CubeError> {
        let rail = &mut self.rails[z];
        rail.set_high().map_err(CubeError::pin)?;
        for y in 0..CUBE_SIZE {
            if !grid.cell(z, x, y).is_on() {
                continue;
            }
            let channel = channel_for(x, y);
            let demux = &mut self.demuxes[channel.demux];
            demux.set_output(channel.line).map_err(CubeError::pin)?;
            demux.enable(true).map_err(CubeError::pin)?;
            delay.delay_ns(pulse_width_ns);
            demux.enable(false).map_err(CubeError::pin)?;
        }
        rail.set_low().map_err(CubeError::pin)
    }

    /// Gate every demultiplexer off and pull every rail low
    pub fn all_off(&mut self) -> Result<(), CubeError> {
        for demux in &mut self.demuxes {
            demux.enable(false).map_err(CubeError::pin)?;
        }
        for rail in &mut self.rails {
            rail.set_low().map_err(CubeError::pin)?;
        }
        Ok(())
    }

    pub fn rails(&self) -> &[P; CUBE_SIZE] {
        &self.rails
    }

    pub fn demuxes(&self) -> &[D; DEMUX_COUNT] {
        &self.demuxes
    }
}

impl<P: OutputPin> CubeHardware<P, Hc154<P>> {
    /// Claim every line in `pins` and build 74HC154-based hardware
    ///
    /// All outputs are left switched off.
    pub fn from_platform<T>(platform: &mut T, pins: &PinMap) -> Result<Self, CubeError>
    where
        T: Platform<Pin = P>,
    {
        let bus = Arc::new(AddressBus::new(claim(platform, &pins.select)?));
        let gates = claim(platform, &pins.gates)?;
        let rails = claim(platform, &pins.rails)?;

        let mut demuxes = heapless::Vec::<Hc154<P>, DEMUX_COUNT>::new();
        for gate in gates {
            let demux = Hc154::new(Arc::clone(&bus), gate).map_err(CubeError::pin)?;
            let _ = demuxes.push(demux);
        }
        let demuxes = demuxes
            .into_array()
            .map_err(|_| CubeError::Pin(ErrorKind::Other))?;

        let mut hardware = Self::new(rails, demuxes);
        hardware.all_off()?;
        Ok(hardware)
    }
}

/// Configure a fixed set of GPIOs as outputs
fn claim<T: Platform, const N: usize>(platform: &mut T, numbers: &[u8; N]) -> Result<[T::Pin; N], CubeError> {
    let mut pins = heapless::Vec::<T::Pin, N>::new();
    for &number in numbers {
        let pin = platform.output_pin(number).map_err(CubeError::pin)?;
        let _ = pins.push(pin);
    }
    // The vector holds exactly N pins at this point
    pins.into_array().map_err(|_| CubeError::Pin(ErrorKind::Other))
}
