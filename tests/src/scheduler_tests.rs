//! Cooperative scheduler timing against a simulated clock

#[cfg(test)]
mod tests {
    use matrix_core::test_utils::SimClock;
    use matrix_core::{Scheduler, SchedulerError, MAX_TASKS};
    use rstest::rstest;

    /// Task context recording the tick of every run
    struct Runs<'a> {
        clock: &'a SimClock,
        first: Vec<u16>,
        second: Vec<u16>,
    }

    impl<'a> Runs<'a> {
        fn new(clock: &'a SimClock) -> Self {
            Self {
                clock,
                first: Vec::new(),
                second: Vec::new(),
            }
        }

        fn now(&self) -> u16 {
            use matrix_core::Clock;
            self.clock.now().raw()
        }
    }

    fn first(ctx: &mut Runs<'_>) {
        let now = ctx.now();
        ctx.first.push(now);
    }

    fn second(ctx: &mut Runs<'_>) {
        let now = ctx.now();
        ctx.second.push(now);
    }

    /// Takes 5 ticks to run
    fn slow(ctx: &mut Runs<'_>) {
        let now = ctx.now();
        ctx.first.push(now);
        ctx.clock.advance(5);
    }

    fn run_for<'a>(scheduler: &mut Scheduler<&'a SimClock, Runs<'a>>, ctx: &mut Runs<'a>, ticks: u16) {
        for _ in 0..ticks {
            ctx.clock.advance(1);
            scheduler.poll(ctx);
        }
    }

    #[rstest]
    #[case(1)]
    #[case(3)]
    #[case(10)]
    fn test_runs_every_period(#[case] period: u16) {
        let clock = SimClock::new();
        let mut scheduler = Scheduler::new(&clock);
        let mut ctx = Runs::new(&clock);

        scheduler.create_task(first, period).unwrap();
        run_for(&mut scheduler, &mut ctx, period * 4);

        let expected: Vec<u16> = (1..=4).map(|n| n * period).collect();
        assert_eq!(ctx.first, expected);
    }

    #[test]
    fn test_capacity_error_leaves_tasks_intact() {
        let clock = SimClock::new();
        let mut scheduler: Scheduler<_, Runs<'_>> = Scheduler::new(&clock);
        let mut ctx = Runs::new(&clock);

        for _ in 0..MAX_TASKS {
            scheduler.create_task(first, 2).unwrap();
        }
        assert_eq!(scheduler.create_task(second, 1), Err(SchedulerError::Full));
        assert_eq!(scheduler.len(), MAX_TASKS);

        run_for(&mut scheduler, &mut ctx, 2);
        assert_eq!(ctx.first, [2; MAX_TASKS]);
        assert!(ctx.second.is_empty());
    }

    #[test]
    fn test_deleted_task_stops() {
        let clock = SimClock::new();
        let mut scheduler = Scheduler::new(&clock);
        let mut ctx = Runs::new(&clock);

        let a = scheduler.create_task(first, 2).unwrap();
        scheduler.create_task(second, 2).unwrap();
        run_for(&mut scheduler, &mut ctx, 2);

        scheduler.delete_task(a);
        scheduler.delete_task(a);
        assert!(!scheduler.is_live(a));
        run_for(&mut scheduler, &mut ctx, 4);

        assert_eq!(ctx.first, [2]);
        assert_eq!(ctx.second, [2, 4, 6]);

        // The freed slot is reused
        assert_eq!(scheduler.create_task(first, 1).map(|h| h.index()), Ok(a.index()));
    }

    #[test]
    fn test_period_counts_from_end_of_slow_run() {
        let clock = SimClock::new();
        let mut scheduler = Scheduler::new(&clock);
        let mut ctx = Runs::new(&clock);

        scheduler.create_task(slow, 3).unwrap();
        run_for(&mut scheduler, &mut ctx, 8);

        // Runs at 3 and ends at 8, next due at 11
        assert_eq!(ctx.first, [3, 11]);
    }

    #[test]
    fn test_runs_across_tick_wrap() {
        let clock = SimClock::starting_at(u16::MAX - 1);
        let mut scheduler = Scheduler::new(&clock);
        let mut ctx = Runs::new(&clock);

        scheduler.create_task(first, 4).unwrap();
        run_for(&mut scheduler, &mut ctx, 8);

        assert_eq!(ctx.first, [2, 6]);
    }

    #[test]
    fn test_clear_empties_table() {
        let clock = SimClock::new();
        let mut scheduler = Scheduler::new(&clock);
        let mut ctx = Runs::new(&clock);

        scheduler.create_task(first, 1).unwrap();
        scheduler.create_task(second, 1).unwrap();
        scheduler.clear();

        assert!(scheduler.is_empty());
        run_for(&mut scheduler, &mut ctx, 3);
        assert!(ctx.first.is_empty() && ctx.second.is_empty());
    }
}
