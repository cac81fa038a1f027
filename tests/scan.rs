mod common;

mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::{Duration as StdDuration, Instant as StdInstant};

    use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, RawMutex};
    use embedded_hal::digital::ErrorKind;
    use myrtio_led_cube::hardware::{AddressBus, CubeHardware, DEMUX_COUNT, Hc154};
    use myrtio_led_cube::{
        Axis, CubeConfig, CubeError, Demultiplexer, Duration, LedCube, LedState, PinMap,
        ScanState, ScanTimings, Shutdown, Voxel, VoxelGrid, channel_for,
    };

    use crate::common::{
        BrokenDemux, HwEvent, HwLog, MockGpio, RecordingDelay, SleepDelay, SlowPulseDelay,
        TestFont, events, mock_hardware,
    };

    fn test_config() -> CubeConfig {
        CubeConfig {
            pins: PinMap::default(),
            timings: ScanTimings {
                pulse_width_ns: 300,
                sweep_pause_ns: 1_000_000,
                shutdown_timeout: Duration::from_millis(2_000),
                shutdown_poll: Duration::from_millis(1),
            },
        }
    }

    fn wait_for_sweeps<G, R>(cube: &LedCube<G, R>, count: u64)
    where
        R: RawMutex + Send + Sync + 'static,
    {
        let deadline = StdInstant::now() + StdDuration::from_secs(5);
        while cube.sweeps() < count {
            assert!(StdInstant::now() < deadline, "scan loop stalled");
            std::thread::sleep(StdDuration::from_millis(1));
        }
    }

    #[test]
    fn test_channel_map() {
        let first = channel_for(0, 0);
        assert_eq!((first.demux, first.line), (0, 0));
        let odd = channel_for(1, 3);
        assert_eq!((odd.demux, odd.line), (0, 11));
        let last = channel_for(7, 7);
        assert_eq!((last.demux, last.line), (3, 15));

        let mut seen = std::collections::HashSet::new();
        for x in 0..8 {
            for y in 0..8 {
                let channel = channel_for(x, y);
                assert!(channel.demux < DEMUX_COUNT);
                assert!(channel.line < 16);
                assert!(seen.insert((channel.demux, channel.line)));
            }
        }
        assert_eq!(seen.len(), 64);
    }

    #[test]
    fn test_sweep_strobes_lit_voxels() {
        let log = HwLog::default();
        let mut hardware = mock_hardware(&log);
        let mut grid = VoxelGrid::new();
        grid.set(Voxel::new(3, 5, 2), LedState::On).unwrap();
        let mut delay = RecordingDelay::default();

        hardware.sweep(&grid, 300, &mut delay).unwrap();

        let events = events(&log);
        assert_eq!(events.len(), 64 * 2 + 3);
        let rails_on = events
            .iter()
            .filter(|event| matches!(event, HwEvent::Rail(_, true)))
            .count();
        assert_eq!(rails_on, 64);

        let select = events
            .iter()
            .position(|event| *event == HwEvent::Select(1, 13))
            .unwrap();
        assert_eq!(events[select - 1], HwEvent::Rail(2, true));
        assert_eq!(events[select + 1], HwEvent::Gate(1, true));
        assert_eq!(events[select + 2], HwEvent::Gate(1, false));
        assert_eq!(events[select + 3], HwEvent::Rail(2, false));
        assert_eq!(delay.nanos, vec![300]);
    }

    #[test]
    fn test_all_off() {
        let log = HwLog::default();
        let mut hardware = mock_hardware(&log);
        hardware.all_off().unwrap();
        let events = events(&log);
        assert_eq!(events.len(), 4 + 8);
        assert!(events[..4].iter().all(|event| matches!(event, HwEvent::Gate(_, false))));
        assert!(events[4..].iter().all(|event| matches!(event, HwEvent::Rail(_, false))));
    }

    #[test]
    fn test_start_and_shutdown() {
        let log = HwLog::default();
        let mut cube: LedCube<TestFont> = LedCube::new(TestFont::default(), test_config());
        assert_eq!(cube.scan_state(), ScanState::Stopped);
        cube.light_layer(Axis::Z, 0, LedState::On).unwrap();

        cube.start(mock_hardware(&log), SleepDelay).unwrap();
        assert_eq!(cube.scan_state(), ScanState::Running);
        assert_eq!(
            cube.start(mock_hardware(&log), SleepDelay),
            Err(CubeError::AlreadyRunning)
        );

        wait_for_sweeps(&cube, 2);
        assert_eq!(cube.shutdown(), Ok(Shutdown::Clean));
        assert_eq!(cube.scan_state(), ScanState::Stopped);
        assert_eq!(cube.snapshot().count_on(), 0);

        let events = events(&log);
        let tail = &events[events.len() - 12..];
        assert!(tail[..4].iter().all(|event| matches!(event, HwEvent::Gate(_, false))));
        assert!(tail[4..].iter().all(|event| matches!(event, HwEvent::Rail(_, false))));
        assert!(events.contains(&HwEvent::Select(0, 0)));

        assert_eq!(cube.shutdown(), Err(CubeError::NotRunning));
    }

    #[test]
    fn test_restart_after_shutdown() {
        let log = HwLog::default();
        let mut cube: LedCube<TestFont> = LedCube::new(TestFont::default(), test_config());
        cube.start(mock_hardware(&log), SleepDelay).unwrap();
        wait_for_sweeps(&cube, 1);
        assert_eq!(cube.shutdown(), Ok(Shutdown::Clean));

        cube.start(mock_hardware(&log), SleepDelay).unwrap();
        wait_for_sweeps(&cube, 1);
        assert_eq!(cube.shutdown(), Ok(Shutdown::Clean));
    }

    #[test]
    fn test_pin_fault_stops_loop() {
        let gpio = MockGpio::default();
        let hardware = CubeHardware::new(
            core::array::from_fn(|layer| gpio.pin(100 + layer as u8)),
            [BrokenDemux, BrokenDemux, BrokenDemux, BrokenDemux],
        );

        let mut cube: LedCube<TestFont> = LedCube::new(TestFont::default(), test_config());
        cube.set(Voxel::new(0, 0, 0), LedState::On).unwrap();
        cube.start(hardware, SleepDelay).unwrap();

        let deadline = StdInstant::now() + StdDuration::from_secs(5);
        while cube.scan_state() != ScanState::Stopped {
            assert!(StdInstant::now() < deadline, "faulted loop kept running");
            std::thread::sleep(StdDuration::from_millis(1));
        }
        assert_eq!(
            cube.shutdown(),
            Ok(Shutdown::Faulted(CubeError::Pin(ErrorKind::Other)))
        );
    }

    #[test]
    fn test_shutdown_times_out() {
        let log = HwLog::default();
        let mut config = test_config();
        config.timings.sweep_pause_ns = 0;
        config.timings.shutdown_timeout = Duration::from_millis(20);
        let mut cube: LedCube<TestFont> = LedCube::new(TestFont::default(), config);
        cube.light_layer(Axis::Z, 4, LedState::On).unwrap();

        // 64 pulses of 5 ms keep one sweep busy far beyond the timeout
        let pulses = Arc::new(AtomicUsize::new(0));
        let delay = SlowPulseDelay {
            pulse: StdDuration::from_millis(5),
            pulses: Arc::clone(&pulses),
        };
        cube.start(mock_hardware(&log), delay).unwrap();

        let deadline = StdInstant::now() + StdDuration::from_secs(5);
        while pulses.load(Ordering::SeqCst) == 0 {
            assert!(StdInstant::now() < deadline, "scan loop never pulsed");
            std::thread::sleep(StdDuration::from_millis(1));
        }

        assert_eq!(cube.shutdown(), Ok(Shutdown::TimedOut));
        assert_eq!(cube.scan_state(), ScanState::Stopped);
        assert_eq!(cube.snapshot().count_on(), 0);
    }

    static HOLDERS: AtomicUsize = AtomicUsize::new(0);
    static MAX_HOLDERS: AtomicUsize = AtomicUsize::new(0);
    static ACQUISITIONS: AtomicUsize = AtomicUsize::new(0);

    /// Display lock that records how many holders it ever had at once
    struct CountingRawMutex {
        inner: CriticalSectionRawMutex,
    }

    unsafe impl RawMutex for CountingRawMutex {
        const INIT: Self = Self {
            inner: CriticalSectionRawMutex::new(),
        };

        fn lock<R>(&self, f: impl FnOnce() -> R) -> R {
            self.inner.lock(|| {
                let holders = HOLDERS.fetch_add(1, Ordering::SeqCst) + 1;
                MAX_HOLDERS.fetch_max(holders, Ordering::SeqCst);
                ACQUISITIONS.fetch_add(1, Ordering::SeqCst);
                let result = f();
                HOLDERS.fetch_sub(1, Ordering::SeqCst);
                result
            })
        }
    }

    #[test]
    fn test_mutations_never_overlap_sweeps() {
        const WRITERS: usize = 8;
        const ROUNDS: usize = 25;

        let log = HwLog::default();
        let mut cube: LedCube<TestFont, CountingRawMutex> =
            LedCube::new(TestFont::default(), test_config());
        cube.start(mock_hardware(&log), SleepDelay).unwrap();

        let torn = Mutex::new(Vec::new());
        std::thread::scope(|scope| {
            for layer in 0..WRITERS {
                let cube = &cube;
                scope.spawn(move || {
                    for _ in 0..ROUNDS {
                        cube.update(|grid| {
                            grid.clear();
                            grid.light_layer(Axis::Z, layer, LedState::On).unwrap();
                        });
                    }
                });
            }

            let cube = &cube;
            let torn = &torn;
            scope.spawn(move || {
                for _ in 0..ROUNDS * WRITERS {
                    let frame = cube.snapshot();
                    let on = frame.count_on();
                    let single_layer = (0..8).any(|z| {
                        let mut rest = frame;
                        rest.light_layer(Axis::Z, z, LedState::Off).unwrap();
                        rest.count_on() == 0
                    });
                    if !(on == 0 || (on == 64 && single_layer)) {
                        torn.lock().unwrap().push(on);
                    }
                }
            });
        });

        wait_for_sweeps(&cube, 1);
        assert_eq!(cube.shutdown(), Ok(Shutdown::Clean));

        assert!(torn.lock().unwrap().is_empty());
        assert_eq!(MAX_HOLDERS.load(Ordering::SeqCst), 1);
        assert!(ACQUISITIONS.load(Ordering::SeqCst) > WRITERS * ROUNDS);
    }

    #[test]
    fn test_hc154_drives_shared_bus() {
        let gpio = MockGpio::default();
        let bus = Arc::new(AddressBus::new([
            gpio.pin(17),
            gpio.pin(27),
            gpio.pin(22),
            gpio.pin(5),
        ]));
        let mut first = Hc154::new(Arc::clone(&bus), gpio.pin(6)).unwrap();
        let mut second = Hc154::new(Arc::clone(&bus), gpio.pin(13)).unwrap();
        assert_eq!(gpio.level(6), Some(true));
        assert_eq!(gpio.level(13), Some(true));

        first.set_output(13).unwrap();
        assert_eq!(gpio.level(17), Some(true));
        assert_eq!(gpio.level(27), Some(false));
        assert_eq!(gpio.level(22), Some(true));
        assert_eq!(gpio.level(5), Some(true));

        second.set_output(2).unwrap();
        assert_eq!(gpio.level(17), Some(false));
        assert_eq!(gpio.level(27), Some(true));
        assert_eq!(gpio.level(22), Some(false));
        assert_eq!(gpio.level(5), Some(false));

        second.enable(true).unwrap();
        assert_eq!(gpio.level(13), Some(false));
        assert_eq!(gpio.level(6), Some(true));
        second.enable(false).unwrap();
        assert_eq!(gpio.level(13), Some(true));
    }

    #[test]
    fn test_hardware_from_platform() {
        let mut gpio = MockGpio::default();
        let pins = PinMap::default();
        let mut hardware = CubeHardware::from_platform(&mut gpio, &pins).unwrap();

        let claimed = gpio.claimed.lock().unwrap().clone();
        let expected: Vec<u8> = pins
            .select
            .iter()
            .chain(pins.gates.iter())
            .chain(pins.rails.iter())
            .copied()
            .collect();
        assert_eq!(claimed, expected);
        assert!(pins.gates.iter().all(|&gate| gpio.level(gate) == Some(true)));
        assert!(pins.rails.iter().all(|&rail| gpio.level(rail) == Some(false)));

        let mut grid = VoxelGrid::new();
        grid.set(Voxel::new(7, 7, 7), LedState::On).unwrap();
        hardware.sweep(&grid, 0, &mut RecordingDelay::default()).unwrap();
        // Last strobed line was 15 on the fourth chip
        assert!(pins.select.iter().all(|&line| gpio.level(line) == Some(true)));
        assert_eq!(gpio.level(pins.gates[3]), Some(true));
        assert_eq!(gpio.level(pins.rails[7]), Some(false));
    }
}
