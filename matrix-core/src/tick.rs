//! Millisecond tick shared between the timer interrupt and foreground code
//!
//! The interrupt side only ever calls [`TickCounter::increment`]. Foreground
//! reads go through a critical section so a 16-bit value is never observed
//! half-updated on 8-bit cores.

use core::cell::Cell;
use critical_section::Mutex;

use crate::types::Tick;

/// Anything that can report the current tick
pub trait Clock {
    fn now(&self) -> Tick;
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now(&self) -> Tick {
        (**self).now()
    }
}

/// Tick counter written by the timer interrupt.
///
/// Meant to live in a `static` so the interrupt handler can reach it.
pub struct TickCounter {
    ticks: Mutex<Cell<u16>>,
}

impl TickCounter {
    pub const fn new() -> Self {
        Self {
            ticks: Mutex::new(Cell::new(0)),
        }
    }

    /// Advance by one tick (called from the timer interrupt handler)
    #[inline]
    pub fn increment(&self) {
        critical_section::with(|cs| {
            let ticks = self.ticks.borrow(cs);
            ticks.set(ticks.get().wrapping_add(1));
        });
    }

    /// Read the counter inside a critical section
    #[inline]
    pub fn now(&self) -> Tick {
        critical_section::with(|cs| Tick::from_raw(self.ticks.borrow(cs).get()))
    }

    /// Force the counter to a value (bring-up and tests)
    pub fn set(&self, tick: Tick) {
        critical_section::with(|cs| self.ticks.borrow(cs).set(tick.raw()));
    }
}

impl Default for TickCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TickCounter {
    fn now(&self) -> Tick {
        TickCounter::now(self)
    }
}

/// Timer configuration errors
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerError {
    /// A zero period can never be generated
    ZeroPeriod,
    /// Input clock frequency of zero
    InvalidClock,
    /// No prescaler gives a compare value within range and tolerance
    NoValidPrescaler,
    /// `start` called before a successful `init`
    NotConfigured,
    /// `init` called while the interrupt is armed
    AlreadyRunning,
}

#[cfg(feature = "std")]
impl core::fmt::Display for TimerError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TimerError::ZeroPeriod => write!(f, "Tick period must be non-zero"),
            TimerError::InvalidClock => write!(f, "Timer clock must be non-zero"),
            TimerError::NoValidPrescaler => write!(f, "No prescaler/compare pair reaches the requested period"),
            TimerError::NotConfigured => write!(f, "Timer not configured"),
            TimerError::AlreadyRunning => write!(f, "Timer is running"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for TimerError {}

/// Largest accepted period error, in parts per million
pub const MAX_PERIOD_ERROR_PPM: u64 = 1_000;

/// Prescaler and 16-bit compare value for a periodic timer
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimerConfig {
    /// Input clock divider
    pub prescaler: u16,
    /// Compare/reload register value; the timer counts `compare + 1` steps
    pub compare: u16,
}

impl TimerConfig {
    /// Find the prescaler/compare pair for `period_ms` at `clock_hz`.
    ///
    /// Prescalers are tried in the given order; the first exact match wins.
    /// Without an exact match the closest pair within
    /// [`MAX_PERIOD_ERROR_PPM`] is used, otherwise the period is rejected.
    pub fn solve(clock_hz: u32, period_ms: u16, prescalers: &[u16]) -> Result<Self, TimerError> {
        if period_ms == 0 {
            return Err(TimerError::ZeroPeriod);
        }
        if clock_hz == 0 {
            return Err(TimerError::InvalidClock);
        }

        // Work in thousandths of a clock cycle to keep everything integral
        let target = clock_hz as u64 * period_ms as u64;
        let mut best: Option<(u64, TimerConfig)> = None;

        for &prescaler in prescalers {
            if prescaler == 0 {
                continue;
            }
            let step = prescaler as u64 * 1_000;
            let counts = (target + step / 2) / step;
            if counts == 0 || counts > 1 << 16 {
                continue;
            }

            let error_ppm = (counts * step).abs_diff(target) * 1_000_000 / target;
            if error_ppm > MAX_PERIOD_ERROR_PPM {
                continue;
            }

            let candidate = TimerConfig {
                prescaler,
                compare: (counts - 1) as u16,
            };
            if error_ppm == 0 {
                return Ok(candidate);
            }
            if best.map_or(true, |(err, _)| error_ppm < err) {
                best = Some((error_ppm, candidate));
            }
        }

        best.map(|(_, config)| config).ok_or(TimerError::NoValidPrescaler)
    }

    /// Timer steps per period
    pub fn counts(&self) -> u32 {
        self.compare as u32 + 1
    }
}

/// Hardware timer collaborator generating the tick interrupt
pub trait TimerDriver {
    /// Program the timer for the given period
    fn configure(&mut self, period_ms: u16) -> Result<(), TimerError>;

    /// Enable the interrupt; `on_tick` runs at interrupt priority
    fn arm(&mut self, on_tick: fn());

    /// Disable the interrupt
    fn disarm(&mut self);
}

/// Owns the timer and exposes the tick it drives
pub struct TickSource<'a, T> {
    timer: T,
    counter: &'a TickCounter,
    period_ms: Option<u16>,
    running: bool,
}

impl<'a, T: TimerDriver> TickSource<'a, T> {
    pub fn new(timer: T, counter: &'a TickCounter) -> Self {
        Self {
            timer,
            counter,
            period_ms: None,
            running: false,
        }
    }

    /// Configure the timer period. Fails fast on periods the timer can't hit.
    pub fn init(&mut self, period_ms: u16) -> Result<(), TimerError> {
        if self.running {
            return Err(TimerError::AlreadyRunning);
        }
        if period_ms == 0 {
            return Err(TimerError::ZeroPeriod);
        }

        self.timer.configure(period_ms)?;
        self.period_ms = Some(period_ms);

        #[cfg(feature = "defmt")]
        defmt::info!("tick period {} ms", period_ms);

        Ok(())
    }

    /// Arm the interrupt; `on_tick` must do nothing but
    /// [`TickCounter::increment`] on the same counter.
    pub fn start(&mut self, on_tick: fn()) -> Result<(), TimerError> {
        if self.period_ms.is_none() {
            return Err(TimerError::NotConfigured);
        }
        self.timer.arm(on_tick);
        self.running = true;
        Ok(())
    }

    pub fn stop(&mut self) {
        self.timer.disarm();
        self.running = false;
    }

    pub fn now(&self) -> Tick {
        self.counter.now()
    }

    pub fn period_ms(&self) -> Option<u16> {
        self.period_ms
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }
}

impl<T: TimerDriver> Clock for TickSource<'_, T> {
    fn now(&self) -> Tick {
        self.counter.now()
    }
}
