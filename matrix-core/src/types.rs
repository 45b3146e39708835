//! Core data types shared by the scheduler, debounce and matrix scanner

/// Wrapping 16-bit tick count.
///
/// Ticks have no ordering: after the counter wraps, a later sample may hold a
/// smaller raw value. Compare samples with [`Tick::elapsed_since`] only.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Tick(u16);

impl Tick {
    /// Counter value right after reset
    pub const ZERO: Tick = Tick(0);

    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Ticks elapsed from `earlier` to `self`.
    ///
    /// Correct across a wrap of the counter as long as the true interval is
    /// shorter than one full period (65536 ticks).
    pub const fn elapsed_since(self, earlier: Tick) -> u16 {
        self.0.wrapping_sub(earlier.0)
    }

    /// Tick `ticks` after `self`, wrapping at the counter width
    pub const fn wrapping_add(self, ticks: u16) -> Tick {
        Tick(self.0.wrapping_add(ticks))
    }
}

/// Settled key transition direction
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Edge {
    /// Key went down and stayed down for the debounce time
    Pressed,
    /// Key came up and stayed up for the debounce time
    Released,
}

/// Debounced key transition handed to the downstream consumer
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransitionEvent {
    pub row: u8,
    pub col: u8,
    pub edge: Edge,
    /// Tick of the scan pass that settled the transition
    pub at: Tick,
}

/// What to discard when the transition queue is full
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OverflowPolicy {
    /// Evict the oldest unread event to make room
    DropOldest,
    /// Keep the queue as is and discard the incoming event
    DropNewest,
}

/// Configuration validation errors
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Tick period must be at least 1 ms
    ZeroTickPeriod,
    /// Scan period must be at least 1 ms
    ZeroScanPeriod,
    /// Scanning faster than the tick cannot be time-gated
    ScanFasterThanTick,
    /// Debounce time above the supported maximum
    DebounceTooLong,
    /// Rows disagree on which level means "pressed"
    MixedRowWiring,
    /// More rows or columns than a `TransitionEvent` can address
    MatrixTooLarge,
}

#[cfg(feature = "std")]
impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ConfigError::ZeroTickPeriod => write!(f, "Tick period must be at least 1 ms"),
            ConfigError::ZeroScanPeriod => write!(f, "Scan period must be at least 1 ms"),
            ConfigError::ScanFasterThanTick => write!(f, "Scan period must not be shorter than the tick period"),
            ConfigError::DebounceTooLong => write!(f, "Debounce must be <= 100ms"),
            ConfigError::MixedRowWiring => write!(f, "All rows must share one active level"),
            ConfigError::MatrixTooLarge => write!(f, "Matrix is limited to 256 rows and 256 columns"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

/// Upper bound for the debounce setting
pub const MAX_DEBOUNCE_MS: u16 = 100;

/// Keyboard timing configuration
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyboardConfig {
    /// Timer interrupt period
    pub tick_period_ms: u16,
    /// Interval between matrix scan passes
    pub scan_period_ms: u16,
    /// Time a raw reading must stay stable before it is reported
    pub debounce_ms: u16,
    /// Transition queue overflow handling
    pub overflow: OverflowPolicy,
}

impl Default for KeyboardConfig {
    fn default() -> Self {
        crate::default_config()
    }
}

impl KeyboardConfig {
    /// Create a new configuration with validation
    pub fn new(
        tick_period_ms: u16,
        scan_period_ms: u16,
        debounce_ms: u16,
        overflow: OverflowPolicy,
    ) -> Result<Self, ConfigError> {
        if tick_period_ms == 0 {
            return Err(ConfigError::ZeroTickPeriod);
        }
        if scan_period_ms == 0 {
            return Err(ConfigError::ZeroScanPeriod);
        }
        if scan_period_ms < tick_period_ms {
            return Err(ConfigError::ScanFasterThanTick);
        }
        if debounce_ms > MAX_DEBOUNCE_MS {
            return Err(ConfigError::DebounceTooLong);
        }

        Ok(Self {
            tick_period_ms,
            scan_period_ms,
            debounce_ms,
            overflow,
        })
    }

    /// Convert milliseconds to ticks, rounding up so waits never run short
    pub fn ms_to_ticks(&self, ms: u16) -> u16 {
        let period = self.tick_period_ms.max(1);
        ms.div_ceil(period)
    }

    /// Scan period in ticks
    pub fn scan_period_ticks(&self) -> u16 {
        self.ms_to_ticks(self.scan_period_ms)
    }

    /// Debounce time in ticks
    pub fn debounce_ticks(&self) -> u16 {
        self.ms_to_ticks(self.debounce_ms)
    }
}
