//! Test utilities: simulated clock, timer and key matrix

pub mod sim_clock {
    //! Manually advanced tick source

    use core::cell::Cell;

    use crate::tick::Clock;
    use crate::types::Tick;

    /// Clock that only moves when told to
    #[derive(Default)]
    pub struct SimClock {
        ticks: Cell<u16>,
    }

    impl SimClock {
        pub const fn new() -> Self {
            Self { ticks: Cell::new(0) }
        }

        /// Clock starting at a raw tick value, e.g. just before a wrap
        pub const fn starting_at(raw: u16) -> Self {
            Self { ticks: Cell::new(raw) }
        }

        pub fn advance(&self, ticks: u16) {
            self.ticks.set(self.ticks.get().wrapping_add(ticks));
        }

        pub fn set(&self, tick: Tick) {
            self.ticks.set(tick.raw());
        }
    }

    impl Clock for SimClock {
        fn now(&self) -> Tick {
            Tick::from_raw(self.ticks.get())
        }
    }
}

pub mod mock_timer {
    //! Timer collaborator that records its configuration

    use crate::tick::{TimerConfig, TimerDriver, TimerError};

    /// Prescalers of an 8-bit AVR 16-bit timer
    pub const AVR_PRESCALERS: [u16; 5] = [1, 8, 64, 256, 1024];

    pub struct MockTimer {
        clock_hz: u32,
        prescalers: &'static [u16],
        config: Option<TimerConfig>,
        on_tick: Option<fn()>,
    }

    impl MockTimer {
        pub fn new(clock_hz: u32, prescalers: &'static [u16]) -> Self {
            Self {
                clock_hz,
                prescalers,
                config: None,
                on_tick: None,
            }
        }

        pub fn config(&self) -> Option<TimerConfig> {
            self.config
        }

        pub fn is_armed(&self) -> bool {
            self.on_tick.is_some()
        }

        /// Simulate the timer interrupt; does nothing while disarmed
        pub fn fire(&self) {
            if let Some(on_tick) = self.on_tick {
                on_tick();
            }
        }
    }

    impl TimerDriver for MockTimer {
        fn configure(&mut self, period_ms: u16) -> Result<(), TimerError> {
            self.config = Some(TimerConfig::solve(self.clock_hz, period_ms, self.prescalers)?);
            Ok(())
        }

        fn arm(&mut self, on_tick: fn()) {
            self.on_tick = Some(on_tick);
        }

        fn disarm(&mut self) {
            self.on_tick = None;
        }
    }
}

pub mod mock_board {
    //! Electrical model of a key matrix.
    //!
    //! A row reads its idle level (set by its bias) unless a pressed key
    //! connects it to a column driven to the opposite level.

    use core::cell::{Cell, RefCell};

    use crate::hal::{GpioPin, HalError, Level, Pull};

    pub struct MockBoard<const R: usize, const C: usize> {
        keys: RefCell<[[bool; C]; R]>,
        columns: RefCell<[Option<Level>; C]>,
        rows: RefCell<[Option<Pull>; R]>,
        fail_reads: Cell<bool>,
        reads: Cell<u32>,
    }

    impl<const R: usize, const C: usize> MockBoard<R, C> {
        pub const fn new() -> Self {
            Self {
                keys: RefCell::new([[false; C]; R]),
                columns: RefCell::new([None; C]),
                rows: RefCell::new([None; R]),
                fail_reads: Cell::new(false),
                reads: Cell::new(0),
            }
        }

        pub fn set_key(&self, row: usize, col: usize, pressed: bool) {
            self.keys.borrow_mut()[row][col] = pressed;
        }

        pub fn press(&self, row: usize, col: usize) {
            self.set_key(row, col, true);
        }

        pub fn release(&self, row: usize, col: usize) {
            self.set_key(row, col, false);
        }

        /// Output level of a column, `None` until configured as output
        pub fn column_level(&self, col: usize) -> Option<Level> {
            self.columns.borrow()[col]
        }

        pub fn row_pull(&self, row: usize) -> Option<Pull> {
            self.rows.borrow()[row]
        }

        /// Make every row read fail with `HalError::GpioError`
        pub fn fail_reads(&self, fail: bool) {
            self.fail_reads.set(fail);
        }

        /// Row reads performed so far
        pub fn reads(&self) -> u32 {
            self.reads.get()
        }

        pub fn row_pins(&self) -> [MockPin<'_, R, C>; R] {
            core::array::from_fn(|row| MockPin {
                board: self,
                role: Role::Row(row),
            })
        }

        pub fn column_pins(&self) -> [MockPin<'_, R, C>; C] {
            core::array::from_fn(|col| MockPin {
                board: self,
                role: Role::Column(col),
            })
        }

        fn read_row(&self, row: usize) -> Result<Level, HalError> {
            self.reads.set(self.reads.get() + 1);
            if self.fail_reads.get() {
                return Err(HalError::GpioError);
            }

            let idle = match self.rows.borrow()[row] {
                Some(Pull::Up) => Level::High,
                Some(Pull::None) => Level::Low,
                None => return Err(HalError::NotConfigured),
            };
            let keys = self.keys.borrow();
            let columns = self.columns.borrow();
            let pulled = (0..C).any(|col| keys[row][col] && columns[col] == Some(idle.opposite()));

            Ok(if pulled { idle.opposite() } else { idle })
        }
    }

    impl<const R: usize, const C: usize> Default for MockBoard<R, C> {
        fn default() -> Self {
            Self::new()
        }
    }

    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    enum Role {
        Row(usize),
        Column(usize),
    }

    /// Pin handle into a [`MockBoard`]
    pub struct MockPin<'a, const R: usize, const C: usize> {
        board: &'a MockBoard<R, C>,
        role: Role,
    }

    impl<const R: usize, const C: usize> GpioPin for MockPin<'_, R, C> {
        type Error = HalError;

        fn set_input(&mut self, pull: Pull) -> Result<(), Self::Error> {
            match self.role {
                Role::Row(row) => self.board.rows.borrow_mut()[row] = Some(pull),
                Role::Column(col) => self.board.columns.borrow_mut()[col] = None,
            }
            Ok(())
        }

        fn set_output(&mut self) -> Result<(), Self::Error> {
            match self.role {
                Role::Column(col) => {
                    self.board.columns.borrow_mut()[col] = Some(Level::Low);
                    Ok(())
                }
                Role::Row(_) => Err(HalError::GpioError),
            }
        }

        fn drive_high(&mut self) -> Result<(), Self::Error> {
            self.drive(Level::High)
        }

        fn drive_low(&mut self) -> Result<(), Self::Error> {
            self.drive(Level::Low)
        }

        fn read(&mut self) -> Result<Level, Self::Error> {
            match self.role {
                Role::Row(row) => self.board.read_row(row),
                Role::Column(col) => self.board.column_level(col).ok_or(HalError::NotConfigured),
            }
        }

        fn drive(&mut self, level: Level) -> Result<(), Self::Error> {
            match self.role {
                Role::Column(col) => {
                    let mut columns = self.board.columns.borrow_mut();
                    match columns[col] {
                        Some(_) => {
                            columns[col] = Some(level);
                            Ok(())
                        }
                        None => Err(HalError::NotConfigured),
                    }
                }
                Role::Row(_) => Err(HalError::GpioError),
            }
        }
    }
}

pub mod raw_script {
    //! Scripted raw key input for debounce scenarios

    /// Raw key level over time as a list of `(tick, pressed)` change points
    pub struct RawScript<'a> {
        changes: &'a [(u16, bool)],
    }

    impl<'a> RawScript<'a> {
        /// `changes` must be sorted by tick
        pub const fn new(changes: &'a [(u16, bool)]) -> Self {
            Self { changes }
        }

        /// Raw level at `tick`; released before the first change point
        pub fn pressed_at(&self, tick: u16) -> bool {
            self.changes
                .iter()
                .take_while(|(at, _)| *at <= tick)
                .last()
                .is_some_and(|&(_, pressed)| pressed)
        }

        /// Tick of the last raw change
        pub fn last_change(&self) -> Option<u16> {
            self.changes.last().map(|&(at, _)| at)
        }
    }
}

pub use mock_board::{MockBoard, MockPin};
pub use mock_timer::{MockTimer, AVR_PRESCALERS};
pub use raw_script::RawScript;
pub use sim_clock::SimClock;
