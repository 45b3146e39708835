//! Fatal fault path for unrecoverable invariant violations

use portable_atomic::{AtomicU8, Ordering};

/// Why the firmware halted
#[repr(u8)]
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FaultCode {
    HsmNotStarted = 1,
    HsmNestingTooDeep = 2,
    HsmInvalidInitialTransition = 3,
    HsmIllegalInternalTransition = 4,
    HsmUnreachableTarget = 5,
    /// Tick timer could not be configured at boot
    TimerConfig = 6,
    /// Task table could not hold the boot-time tasks
    SchedulerFull = 7,
    /// Matrix pins or wiring rejected at boot
    MatrixConfig = 8,
    HsmAlreadyStarted = 9,
}

impl FaultCode {
    pub const fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(FaultCode::HsmNotStarted),
            2 => Some(FaultCode::HsmNestingTooDeep),
            3 => Some(FaultCode::HsmInvalidInitialTransition),
            4 => Some(FaultCode::HsmIllegalInternalTransition),
            5 => Some(FaultCode::HsmUnreachableTarget),
            6 => Some(FaultCode::TimerConfig),
            7 => Some(FaultCode::SchedulerFull),
            8 => Some(FaultCode::MatrixConfig),
            9 => Some(FaultCode::HsmAlreadyStarted),
            _ => None,
        }
    }
}

/// Last fault code, kept for a debugger attached to the halted core
static LAST_FAULT: AtomicU8 = AtomicU8::new(0);

/// Fault recorded before the most recent halt, if any
pub fn last_fault() -> Option<FaultCode> {
    FaultCode::from_raw(LAST_FAULT.load(Ordering::Relaxed))
}

/// Record `code`, mask interrupts and halt.
///
/// The critical section is entered and never left, so the tick interrupt
/// stops too and the core spins in a known state until reset.
pub fn fatal_fault(code: FaultCode) -> ! {
    LAST_FAULT.store(code as u8, Ordering::SeqCst);

    #[cfg(feature = "defmt")]
    defmt::error!("fatal fault: {}", code);

    // SAFETY: the restore token is dropped on purpose; nothing runs after this
    // point that could expect interrupts to come back.
    let _ = unsafe { critical_section::acquire() };

    loop {
        core::hint::spin_loop();
    }
}
