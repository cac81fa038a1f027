#![allow(dead_code)]

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorKind, ErrorType, OutputPin};
use myrtio_led_cube::hardware::{CubeHardware, Demultiplexer, Platform};
use myrtio_led_cube::{GlyphLookup, Image};

/// "F" with a dot in the opposite corner, no symmetry at all
pub const ASYMMETRIC: Image = Image::from_rows([
    0b1111_0000,
    0b1000_0000,
    0b1110_0000,
    0b1000_0000,
    0b1000_0000,
    0b0000_0000,
    0b0000_0000,
    0b0000_0001,
]);

const GLYPH_A: Image = Image::from_rows([
    0b0001_1000,
    0b0010_0100,
    0b0100_0010,
    0b0111_1110,
    0b0100_0010,
    0b0100_0010,
    0b0100_0010,
    0b0000_0000,
]);

const GLYPH_B: Image = Image::from_rows([
    0b0111_1100,
    0b0100_0010,
    0b0100_0010,
    0b0111_1100,
    0b0100_0010,
    0b0100_0010,
    0b0111_1100,
    0b0000_0000,
]);

/// Font with `A`, `B`, `F` and space that counts bitmap lookups
#[derive(Debug, Default)]
pub struct TestFont {
    lookups: AtomicUsize,
}

impl TestFont {
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl GlyphLookup for TestFont {
    fn lookup(&self, ch: char) -> Option<Image> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        match ch {
            'A' => Some(GLYPH_A),
            'B' => Some(GLYPH_B),
            'F' => Some(ASYMMETRIC),
            ' ' => Some(Image::new()),
            _ => None,
        }
    }

    fn is_supported(&self, ch: char) -> bool {
        matches!(ch, 'A' | 'B' | 'F' | ' ')
    }
}

/// Font that claims every character but only has a bitmap for `A`
#[derive(Debug, Default)]
pub struct PartialFont;

impl GlyphLookup for PartialFont {
    fn lookup(&self, ch: char) -> Option<Image> {
        (ch == 'A').then_some(GLYPH_A)
    }

    fn is_supported(&self, _ch: char) -> bool {
        true
    }
}

/// Delay that only records what it was asked to do
#[derive(Debug, Default)]
pub struct RecordingDelay {
    pub millis: Vec<u32>,
    pub nanos: Vec<u32>,
}

impl DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.nanos.push(ns);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.millis.push(ms);
    }
}

/// Delay backed by `std::thread::sleep`
#[derive(Debug, Default, Clone, Copy)]
pub struct SleepDelay;

impl DelayNs for SleepDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(std::time::Duration::from_nanos(u64::from(ns)));
    }
}

/// Delay that holds every LED pulse for a long time and counts the pulses
#[derive(Debug, Clone)]
pub struct SlowPulseDelay {
    pub pulse: std::time::Duration,
    pub pulses: Arc<AtomicUsize>,
}

impl DelayNs for SlowPulseDelay {
    fn delay_ns(&mut self, ns: u32) {
        if ns == 0 {
            return;
        }
        self.pulses.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.pulse);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwEvent {
    Rail(usize, bool),
    Select(usize, u8),
    Gate(usize, bool),
}

pub type HwLog = Arc<Mutex<Vec<HwEvent>>>;

pub fn events(log: &HwLog) -> Vec<HwEvent> {
    log.lock().unwrap().clone()
}

pub struct MockRail {
    index: usize,
    log: HwLog,
}

impl ErrorType for MockRail {
    type Error = Infallible;
}

impl OutputPin for MockRail {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.log.lock().unwrap().push(HwEvent::Rail(self.index, false));
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.log.lock().unwrap().push(HwEvent::Rail(self.index, true));
        Ok(())
    }
}

pub struct MockDemux {
    index: usize,
    log: HwLog,
}

impl Demultiplexer for MockDemux {
    type Error = Infallible;

    fn set_output(&mut self, line: u8) -> Result<(), Self::Error> {
        self.log.lock().unwrap().push(HwEvent::Select(self.index, line));
        Ok(())
    }

    fn enable(&mut self, enabled: bool) -> Result<(), Self::Error> {
        self.log.lock().unwrap().push(HwEvent::Gate(self.index, enabled));
        Ok(())
    }
}

pub fn mock_hardware(log: &HwLog) -> CubeHardware<MockRail, MockDemux> {
    CubeHardware::new(
        core::array::from_fn(|index| MockRail {
            index,
            log: Arc::clone(log),
        }),
        core::array::from_fn(|index| MockDemux {
            index,
            log: Arc::clone(log),
        }),
    )
}

#[derive(Debug)]
pub struct PinFault;

impl embedded_hal::digital::Error for PinFault {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// Demultiplexer whose gate refuses to switch on
pub struct BrokenDemux;

impl Demultiplexer for BrokenDemux {
    type Error = PinFault;

    fn set_output(&mut self, _line: u8) -> Result<(), Self::Error> {
        Ok(())
    }

    fn enable(&mut self, enabled: bool) -> Result<(), Self::Error> {
        if enabled { Err(PinFault) } else { Ok(()) }
    }
}

/// Simulated GPIO bank keyed by pin number
#[derive(Debug, Default, Clone)]
pub struct MockGpio {
    pub claimed: Arc<Mutex<Vec<u8>>>,
    pub levels: Arc<Mutex<HashMap<u8, bool>>>,
}

impl MockGpio {
    pub fn level(&self, number: u8) -> Option<bool> {
        self.levels.lock().unwrap().get(&number).copied()
    }

    pub fn pin(&self, number: u8) -> GpioPin {
        GpioPin {
            number,
            levels: Arc::clone(&self.levels),
        }
    }
}

pub struct GpioPin {
    number: u8,
    levels: Arc<Mutex<HashMap<u8, bool>>>,
}

impl ErrorType for GpioPin {
    type Error = Infallible;
}

impl OutputPin for GpioPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.levels.lock().unwrap().insert(self.number, false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.levels.lock().unwrap().insert(self.number, true);
        Ok(())
    }
}

impl Platform for MockGpio {
    type Pin = GpioPin;
    type Error = Infallible;

    fn output_pin(&mut self, number: u8) -> Result<Self::Pin, Self::Error> {
        self.claimed.lock().unwrap().push(number);
        Ok(self.pin(number))
    }
}
