//! End-to-end: timer interrupt → tick → scheduler → matrix scan → link-gated reports

#[cfg(test)]
mod tests {
    use matrix_core::test_utils::{MockBoard, MockPin, MockTimer, RawScript, AVR_PRESCALERS};
    use matrix_core::{
        default_config, Edge, LinkSignal, Matrix, RowPin, Scheduler, Tick, TickCounter, TickSource,
        TimerConfig, TimerError, UsbLink,
    };
    use rstest::rstest;

    const CLOCK_HZ: u32 = 16_000_000;

    static TICKS: TickCounter = TickCounter::new();

    fn on_tick() {
        TICKS.increment();
    }

    struct Keyboard<'a> {
        matrix: Matrix<MockPin<'a, 2, 2>, 2, 2, 8>,
        link: UsbLink,
        reports: Vec<(u8, u8, Edge, u16)>,
    }

    fn scan(kb: &mut Keyboard<'_>) {
        kb.matrix.scan(TICKS.now()).unwrap();
    }

    fn report(kb: &mut Keyboard<'_>) {
        while let Some(event) = kb.matrix.events().pop() {
            if kb.link.reporting_enabled() {
                kb.reports.push((event.row, event.col, event.edge, event.at.raw()));
            }
        }
    }

    #[test]
    fn test_bouncy_key_reported_once_through_scheduler() {
        let config = default_config();
        let mut tick = TickSource::new(MockTimer::new(CLOCK_HZ, &AVR_PRESCALERS), &TICKS);
        tick.init(config.tick_period_ms).unwrap();
        tick.start(on_tick).unwrap();
        assert_eq!(tick.timer().config(), Some(TimerConfig { prescaler: 1, compare: 15_999 }));

        let board = MockBoard::<2, 2>::new();
        let rows = board.row_pins().map(RowPin::pull_up);
        let mut kb = Keyboard {
            matrix: Matrix::new(board.column_pins(), rows, &config).unwrap(),
            link: UsbLink::new(),
            reports: Vec::new(),
        };
        kb.matrix.init().unwrap();
        kb.link.start().unwrap();
        kb.link.handle(LinkSignal::BusPowered).unwrap();
        kb.link.handle(LinkSignal::Configured).unwrap();

        let mut scheduler: Scheduler<_, _> = Scheduler::new(&TICKS);
        scheduler.create_task(scan, config.scan_period_ticks()).unwrap();
        scheduler.create_task(report, 1).unwrap();

        // Contact bounces for 3 ms, then holds; released cleanly at 30
        let raw = RawScript::new(&[(1, true), (2, false), (3, true), (30, false)]);
        for _ in 0..40 {
            tick.timer().fire();
            board.set_key(1, 0, raw.pressed_at(tick.now().raw()));
            scheduler.poll(&mut kb);
        }

        // 5 ms after the last raw change in each direction
        assert_eq!(kb.reports, [(1, 0, Edge::Pressed, 8), (1, 0, Edge::Released, 35)]);
        assert!(!kb.matrix.is_pressed(1, 0));

        // Stopped timer no longer advances the tick
        tick.stop();
        let before = tick.now();
        tick.timer().fire();
        assert_eq!(tick.now(), before);
    }

    #[test]
    fn test_reports_suppressed_until_configured() {
        let config = default_config();
        let board = MockBoard::<2, 2>::new();
        let rows = board.row_pins().map(RowPin::pull_up);
        let mut kb = Keyboard {
            matrix: Matrix::new(board.column_pins(), rows, &config).unwrap(),
            link: UsbLink::new(),
            reports: Vec::new(),
        };
        kb.matrix.init().unwrap();
        kb.link.start().unwrap();

        board.press(0, 1);
        for t in 0..=5 {
            kb.matrix.scan(Tick::from_raw(t)).unwrap();
        }
        report(&mut kb);

        assert!(kb.reports.is_empty());
        assert!(kb.matrix.is_pressed(0, 1));
        assert!(kb.matrix.events().is_empty());
    }

    #[rstest]
    #[case::zero_period(16_000_000, 0, TimerError::ZeroPeriod)]
    #[case::too_long_for_16_bits(16_000_000, 5_000, TimerError::NoValidPrescaler)]
    #[case::no_clock(0, 1, TimerError::InvalidClock)]
    fn test_tick_source_rejects_period(#[case] clock_hz: u32, #[case] period_ms: u16, #[case] expected: TimerError) {
        let counter = TickCounter::new();
        let mut tick = TickSource::new(MockTimer::new(clock_hz, &AVR_PRESCALERS), &counter);

        assert_eq!(tick.init(period_ms), Err(expected));
        assert_eq!(tick.start(|| {}), Err(TimerError::NotConfigured));
        assert!(!tick.timer().is_armed());
    }
}
