//! Background scan-refresh loop.
//!
//! The cube can only light one LED at a time, so a dedicated thread sweeps the
//! whole grid continuously, strobing every lit voxel for a short pulse.
//!
//! Each sweep runs with the display lock held, so mutators always observe a
//! sweep boundary. The flip side is that a mutator blocks for up to one full
//! sweep (hundreds of microseconds to a few milliseconds, depending on how many
//! voxels are lit).
//!
//! # Usage
//!
//! ```ignore
//! let engine = ScanEngine::start(display, hardware, embassy_time::Delay, timings)?;
//!
//! // ... mutate the grid through the display lock ...
//!
//! match engine.stop()? {
//!     Shutdown::Clean => {}
//!     other => handle(other),
//! }
//! ```

use core::cell::RefCell;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{Duration, Instant};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::config::ScanTimings;
use crate::error::CubeError;
use crate::hardware::{CubeHardware, Demultiplexer};
use crate::voxel::VoxelGrid;

/// Voxel grid guarded by the display lock
pub type SharedGrid<R> = Mutex<R, RefCell<VoxelGrid>>;

/// Flags coordinating termination of the scan thread
#[derive(Debug)]
pub struct ShutdownFlags {
    running: AtomicBool,
    quit: AtomicBool,
}

impl ShutdownFlags {
    const fn new() -> Self {
        Self {
            running: AtomicBool::new(true),
            quit: AtomicBool::new(false),
        }
    }

    /// Check if the loop has been asked to keep running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Check if the loop has exited
    pub fn has_quit(&self) -> bool {
        self.quit.load(Ordering::Acquire)
    }
}

/// Lifecycle of the scan engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Stopped,
    Running,
    Stopping,
}

/// Outcome of stopping the scan engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shutdown {
    /// The loop exited and switched every output off
    Clean,
    /// The loop aborted on an error before the stop request
    Faulted(CubeError),
    /// The loop did not exit within the shutdown timeout and was detached
    TimedOut,
}

/// Handle to the running scan thread
///
/// Dropping the handle stops the thread.
pub struct ScanEngine {
    flags: Arc<ShutdownFlags>,
    sweeps: Arc<AtomicU64>,
    handle: Option<JoinHandle<Result<(), CubeError>>>,
    timings: ScanTimings,
}

impl ScanEngine {
    /// Spawn the scan thread and return immediately
    ///
    /// The thread owns `hardware` and `delay` until it exits.
    pub fn start<R, P, D, T>(
        display: Arc<SharedGrid<R>>,
        mut hardware: CubeHardware<P, D>,
        mut delay: T,
        timings: ScanTimings,
    ) -> Result<Self, CubeError>
    where
        R: RawMutex + Send + Sync + 'static,
        P: OutputPin + Send + 'static,
        D: Demultiplexer + Send + 'static,
        T: DelayNs + Send + 'static,
    {
        let flags = Arc::new(ShutdownFlags::new());
        let sweeps = Arc::new(AtomicU64::new(0));

        let handle = thread::Builder::new()
            .name("cube-scan".into())
            .spawn({
                let flags = Arc::clone(&flags);
                let sweeps = Arc::clone(&sweeps);
                move || {
                    scan_loop(
                        &display,
                        &mut hardware,
                        &mut delay,
                        timings,
                        &flags,
                        &sweeps,
                    )
                }
            })
            .map_err(|err| CubeError::Spawn(err.to_string()))?;

        tracing::info!(
            pulse_width_ns = timings.pulse_width_ns,
            sweep_pause_ns = timings.sweep_pause_ns,
            "scan engine started"
        );

        Ok(Self {
            flags,
            sweeps,
            handle: Some(handle),
            timings,
        })
    }

    pub fn state(&self) -> ScanState {
        if self.handle.is_none() || self.flags.has_quit() {
            ScanState::Stopped
        } else if self.flags.is_running() {
            ScanState::Running
        } else {
            ScanState::Stopping
        }
    }

    /// Number of completed sweeps
    pub fn sweeps(&self) -> u64 {
        self.sweeps.load(Ordering::Relaxed)
    }

    pub fn flags(&self) -> &ShutdownFlags {
        &self.flags
    }

    /// Ask the loop to exit and wait for it
    ///
    /// The loop checks its flag once per sweep, so the wait is bounded by one
    /// sweep plus the pause. If the thread is still alive after
    /// `shutdown_timeout` it is detached and [`Shutdown::TimedOut`] is returned.
    pub fn stop(&mut self) -> Result<Shutdown, CubeError> {
        let Some(handle) = self.handle.take() else {
            return Err(CubeError::NotRunning);
        };
        self.flags.running.store(false, Ordering::Release);

        let deadline = Instant::now() + self.timings.shutdown_timeout;
        while !handle.is_finished() {
            let now = Instant::now();
            if now >= deadline {
                tracing::warn!(
                    timeout_ms = self.timings.shutdown_timeout.as_millis(),
                    "scan thread did not stop in time, detaching it"
                );
                return Ok(Shutdown::TimedOut);
            }
            let remaining = deadline - now;
            let nap = if remaining < self.timings.shutdown_poll {
                remaining
            } else {
                self.timings.shutdown_poll
            };
            thread::sleep(to_std(nap));
        }

        let shutdown = match handle.join() {
            Ok(Ok(())) => Shutdown::Clean,
            Ok(Err(err)) => Shutdown::Faulted(err),
            Err(_) => Shutdown::Faulted(CubeError::Panicked),
        };
        tracing::info!(?shutdown, sweeps = self.sweeps(), "scan engine stopped");
        Ok(shutdown)
    }
}

impl Drop for ScanEngine {
    fn drop(&mut self) {
        if self.handle.is_some() {
            if let Ok(shutdown) = self.stop() {
                if shutdown != Shutdown::Clean {
                    tracing::warn!(?shutdown, "scan engine dropped without a clean stop");
                }
            }
        }
    }
}

fn scan_loop<R, P, D, T>(
    display: &SharedGrid<R>,
    hardware: &mut CubeHardware<P, D>,
    delay: &mut T,
    timings: ScanTimings,
    flags: &ShutdownFlags,
    sweeps: &AtomicU64,
) -> Result<(), CubeError>
where
    R: RawMutex,
    P: OutputPin,
    D: Demultiplexer,
    T: DelayNs,
{
    let result = run_sweeps(display, hardware, delay, timings, flags, sweeps);
    let off = hardware.all_off();
    flags.quit.store(true, Ordering::Release);

    match result {
        Ok(()) => off,
        Err(err) => {
            tracing::error!(%err, "scan loop aborted");
            Err(err)
        }
    }
}

fn run_sweeps<R, P, D, T>(
    display: &SharedGrid<R>,
    hardware: &mut CubeHardware<P, D>,
    delay: &mut T,
    timings: ScanTimings,
    flags: &ShutdownFlags,
    sweeps: &AtomicU64,
) -> Result<(), CubeError>
where
    R: RawMutex,
    P: OutputPin,
    D: Demultiplexer,
    T: DelayNs,
{
    while flags.is_running() {
        display.lock(|grid| hardware.sweep(&grid.borrow(), timings.pulse_width_ns, delay))?;
        sweeps.fetch_add(1, Ordering::Relaxed);

        // Lock is released here; give blocked mutators a chance to take it
        delay.delay_ns(timings.sweep_pause_ns);
        thread::yield_now();
    }
    Ok(())
}

fn to_std(duration: Duration) -> std::time::Duration {
    std::time::Duration::from_micros(duration.as_micros())
}
