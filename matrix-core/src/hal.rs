//! GPIO collaborator interface and row wiring variants

use embedded_hal::digital::{InputPin, OutputPin};

/// Logic level on a pin
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub const fn opposite(self) -> Level {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }
}

/// Input bias
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pull {
    /// Floating; bias comes from an external resistor
    None,
    /// Internal pull-up enabled
    Up,
}

/// Error types for HAL operations
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HalError {
    /// GPIO operation failed
    GpioError,
    /// Pin used before its direction was configured
    NotConfigured,
}

#[cfg(feature = "std")]
impl core::fmt::Display for HalError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            HalError::GpioError => write!(f, "GPIO operation failed"),
            HalError::NotConfigured => write!(f, "Pin not configured"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for HalError {}

/// Register-level GPIO driver for one opaque pin
pub trait GpioPin {
    type Error;

    fn set_input(&mut self, pull: Pull) -> Result<(), Self::Error>;

    fn set_output(&mut self) -> Result<(), Self::Error>;

    fn drive_high(&mut self) -> Result<(), Self::Error>;

    fn drive_low(&mut self) -> Result<(), Self::Error>;

    fn read(&mut self) -> Result<Level, Self::Error>;

    /// Drive the pin to `level`
    fn drive(&mut self, level: Level) -> Result<(), Self::Error> {
        match level {
            Level::High => self.drive_high(),
            Level::Low => self.drive_low(),
        }
    }
}

/// How a row input is biased, which fixes what level reads as "pressed"
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RowWiring {
    /// Internal pull-up; an active-low column pulls the row low when pressed
    InternalPullUp,
    /// External pull-down; an active-high column pulls the row high when pressed
    ExternalPullDown,
}

impl RowWiring {
    /// Bias to request from the GPIO driver
    pub const fn pull(self) -> Pull {
        match self {
            RowWiring::InternalPullUp => Pull::Up,
            RowWiring::ExternalPullDown => Pull::None,
        }
    }

    /// Row level while a key on the active column is held.
    /// Also the level the column has to be driven to.
    pub const fn pressed_level(self) -> Level {
        match self {
            RowWiring::InternalPullUp => Level::Low,
            RowWiring::ExternalPullDown => Level::High,
        }
    }

    pub fn is_pressed(self, level: Level) -> bool {
        level == self.pressed_level()
    }
}

/// Adapter for `embedded-hal` pins whose direction is fixed by the HAL's
/// type state. `set_input`/`set_output` are accepted and ignored.
pub struct EmbeddedHalPin<P> {
    pin: P,
}

impl<P> EmbeddedHalPin<P>
where
    P: InputPin + OutputPin,
{
    pub fn new(pin: P) -> Self {
        Self { pin }
    }

    pub fn into_inner(self) -> P {
        self.pin
    }
}

impl<P> GpioPin for EmbeddedHalPin<P>
where
    P: InputPin + OutputPin,
{
    type Error = HalError;

    fn set_input(&mut self, _pull: Pull) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_output(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn drive_high(&mut self) -> Result<(), Self::Error> {
        self.pin.set_high().map_err(|_| HalError::GpioError)
    }

    fn drive_low(&mut self) -> Result<(), Self::Error> {
        self.pin.set_low().map_err(|_| HalError::GpioError)
    }

    fn read(&mut self) -> Result<Level, Self::Error> {
        match self.pin.is_high() {
            Ok(true) => Ok(Level::High),
            Ok(false) => Ok(Level::Low),
            Err(_) => Err(HalError::GpioError),
        }
    }
}
