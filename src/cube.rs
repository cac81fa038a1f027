use core::cell::RefCell;
use std::sync::Arc;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, RawMutex};
use embassy_time::Duration;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::config::CubeConfig;
use crate::error::CubeError;
use crate::glyph::GlyphLookup;
use crate::hardware::{CubeHardware, Demultiplexer};
use crate::scan::{ScanEngine, ScanState, SharedGrid, Shutdown};
use crate::transform::{Angle, Direction, Image, orient};
use crate::voxel::{Axis, LedState, Plane, Voxel, VoxelGrid, check};

/// LED cube - owns the voxel grid, the display lock and the scan engine
///
/// Every mutator takes the display lock for its whole duration, so the scan
/// thread never renders a half-applied change. Use [`LedCube::update`] to
/// group several changes into one atomic step.
pub struct LedCube<G, R: RawMutex = CriticalSectionRawMutex> {
    display: Arc<SharedGrid<R>>,
    glyphs: G,
    config: CubeConfig,
    engine: Option<ScanEngine>,
}

impl<G: GlyphLookup, R: RawMutex> LedCube<G, R> {
    /// Create a cube with every LED off and no scan engine running
    pub fn new(glyphs: G, config: CubeConfig) -> Self {
        Self {
            display: Arc::new(Mutex::new(RefCell::new(VoxelGrid::new()))),
            glyphs,
            config,
            engine: None,
        }
    }

    pub fn config(&self) -> &CubeConfig {
        &self.config
    }

    pub fn glyphs(&self) -> &G {
        &self.glyphs
    }

    /// Shared handle to the locked grid
    pub fn display(&self) -> &Arc<SharedGrid<R>> {
        &self.display
    }

    /// Run `f` on the grid with the display lock held
    pub fn update<U>(&self, f: impl FnOnce(&mut VoxelGrid) -> U) -> U {
        self.display.lock(|grid| f(&mut grid.borrow_mut()))
    }

    /// Copy of the current grid
    pub fn snapshot(&self) -> VoxelGrid {
        self.display.lock(|grid| *grid.borrow())
    }

    pub fn get(&self, voxel: Voxel) -> Result<LedState, CubeError> {
        self.display.lock(|grid| grid.borrow().get(voxel))
    }

    pub fn set(&self, voxel: Voxel, state: LedState) -> Result<(), CubeError> {
        self.update(|grid| grid.set(voxel, state))
    }

    pub fn clear(&self) {
        self.update(VoxelGrid::clear);
    }

    pub fn light_layer(&self, axis: Axis, index: usize, state: LedState) -> Result<(), CubeError> {
        self.update(|grid| grid.light_layer(axis, index, state))
    }

    pub fn light_row(&self, plane: Plane, a: usize, b: usize, state: LedState) -> Result<(), CubeError> {
        self.update(|grid| grid.light_row(plane, a, b, state))
    }

    pub fn set_layer_image(&self, axis: Axis, index: usize, image: &Image) -> Result<(), CubeError> {
        self.update(|grid| grid.set_layer_image(axis, index, image))
    }

    /// Draw a character into one layer
    ///
    /// The whole layer is replaced in a single locked step.
    pub fn project_character(
        &self,
        ch: char,
        axis: Axis,
        index: usize,
        direction: Direction,
        angle: Angle,
    ) -> Result<(), CubeError> {
        let index = check(index)?;
        let glyph = self.glyph(ch)?;
        self.draw_glyph(&glyph, axis, index, direction, angle)
    }

    /// Show `text` one character at a time in the same layer
    ///
    /// The whole string is checked against the glyph table first, and every
    /// bitmap is fetched before the first one is drawn; nothing is drawn if
    /// any character is unsupported. After each character the caller's thread
    /// waits `interval`. In X layers a space only waits half as long.
    #[allow(clippy::too_many_arguments)]
    pub fn show_string(
        &self,
        text: &str,
        interval: Duration,
        axis: Axis,
        index: usize,
        direction: Direction,
        angle: Angle,
        delay: &mut impl DelayNs,
    ) -> Result<(), CubeError> {
        let index = check(index)?;
        let glyphs = self
            .glyphs
            .validate(text)
            .and_then(|()| {
                text.chars()
                    .map(|ch| self.glyph(ch).map(|glyph| (ch, glyph)))
                    .collect::<Result<Vec<_>, _>>()
            })
            .inspect_err(|err| tracing::debug!(%err, text, "string rejected"))?;

        let interval_ms = u32::try_from(interval.as_millis()).unwrap_or(u32::MAX);
        for (ch, glyph) in glyphs {
            self.draw_glyph(&glyph, axis, index, direction, angle)?;
            if ch == ' ' && axis == Axis::X {
                delay.delay_ms(interval_ms / 2);
            } else {
                delay.delay_ms(interval_ms);
            }
        }
        Ok(())
    }

    fn glyph(&self, ch: char) -> Result<Image, CubeError> {
        self.glyphs
            .lookup(ch)
            .ok_or(CubeError::UnsupportedCharacter(ch))
    }

    fn draw_glyph(
        &self,
        glyph: &Image,
        axis: Axis,
        index: usize,
        direction: Direction,
        angle: Angle,
    ) -> Result<(), CubeError> {
        let image = orient(glyph, axis, direction, angle);
        self.update(|grid| grid.set_layer_image(axis, index, &image))
    }
}

impl<G, R: RawMutex + Send + Sync + 'static> LedCube<G, R> {
    /// Start refreshing `hardware` from the grid in a background thread
    pub fn start<P, D, T>(&mut self, hardware: CubeHardware<P, D>, delay: T) -> Result<(), CubeError>
    where
        P: OutputPin + Send + 'static,
        D: Demultiplexer + Send + 'static,
        T: DelayNs + Send + 'static,
    {
        if self.scan_state() != ScanState::Stopped {
            return Err(CubeError::AlreadyRunning);
        }
        let engine = ScanEngine::start(
            Arc::clone(&self.display),
            hardware,
            delay,
            self.config.timings,
        )?;
        self.engine = Some(engine);
        Ok(())
    }

    pub fn scan_state(&self) -> ScanState {
        self.engine
            .as_ref()
            .map_or(ScanState::Stopped, ScanEngine::state)
    }

    /// Number of sweeps completed by the current scan engine
    pub fn sweeps(&self) -> u64 {
        self.engine.as_ref().map_or(0, ScanEngine::sweeps)
    }

    /// Stop the scan engine and turn every LED off
    ///
    /// The grid is cleared even if the engine timed out or faulted.
    pub fn shutdown(&mut self) -> Result<Shutdown, CubeError> {
        let mut engine = self.engine.take().ok_or(CubeError::NotRunning)?;
        let shutdown = engine.stop();
        self.display.lock(|grid| grid.borrow_mut().clear());
        shutdown
    }
}
