#![cfg_attr(not(any(test, feature = "std")), no_std)]

//! # Matrix Core
//!
//! Building blocks for a matrix keyboard running on a single-core,
//! interrupt-driven microcontroller without an operating system:
//!
//! - [`tick`]: wrapping millisecond tick shared between the timer interrupt
//!   and foreground code through a critical section
//! - [`scheduler`]: fixed-capacity cooperative task scheduler
//! - [`hsm`]: hierarchical state machine dispatch with LCA-based transitions
//! - [`debounce`] and [`matrix`]: per-key debounce driven by column/row scans
//! - [`link`]: USB link state machine built on the HSM engine

pub mod types;
pub mod tick;
pub mod scheduler;
pub mod hsm;
pub mod link;
pub mod debounce;
pub mod queue;
pub mod matrix;
pub mod hal;
pub mod fault;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;


pub use types::*;
pub use tick::{Clock, TickCounter, TickSource, TimerConfig, TimerDriver, TimerError};
pub use scheduler::{Scheduler, SchedulerError, TaskFn, TaskHandle, MAX_TASKS};
pub use hsm::{Event, Hsm, HsmError, State, Status, MAX_NESTING};
pub use link::{LinkContext, LinkSignal, LinkState, UsbLink};
pub use debounce::{DebounceState, KeyCell};
pub use queue::EventQueue;
pub use matrix::{Matrix, RowPin, MAX_LINES};
pub use hal::{EmbeddedHalPin, GpioPin, HalError, Level, Pull, RowWiring};
pub use fault::{fatal_fault, FaultCode};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration: 1 ms tick, scan every tick, 5 ms debounce
pub fn default_config() -> KeyboardConfig {
    KeyboardConfig {
        tick_period_ms: 1,
        scan_period_ms: 1,
        debounce_ms: 5,
        overflow: OverflowPolicy::DropOldest,
    }
}
