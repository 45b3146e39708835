#![no_std]
#![no_main]

#[cfg(feature = "defmt")]
use defmt::{info, warn};
#[cfg(feature = "defmt")]
use defmt_rtt as _;
use panic_halt as _;

// No-op logging without defmt
#[cfg(not(feature = "defmt"))]
macro_rules! info {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "defmt"))]
macro_rules! warn {
    ($($arg:tt)*) => {};
}

mod board;

use core::cell::RefCell;

use critical_section::Mutex;
use heapless::Deque;
use matrix_core::{
    default_config, fatal_fault, FaultCode, GpioPin, Level, LinkSignal, Matrix, Pull, RowPin,
    Scheduler, TaskFn, TickCounter, TickSource, UsbLink,
};
use riscv_rt::entry;
use static_cell::StaticCell;

use board::{Ch32v003Pin, Tim2, GPIOA, GPIOC, GPIOD};

// Critical section over mstatus.MIE for the single-hart core
struct RiscvCriticalSection;
critical_section::set_impl!(RiscvCriticalSection);

unsafe impl critical_section::Impl for RiscvCriticalSection {
    unsafe fn acquire() -> critical_section::RawRestoreState {
        let mstatus = riscv::register::mstatus::read();
        riscv::register::mstatus::clear_mie();
        mstatus.mie() as u8
    }

    unsafe fn release(was_enabled: critical_section::RawRestoreState) {
        if was_enabled != 0 {
            riscv::register::mstatus::set_mie();
        }
    }
}

// Pin map:
// PC0-PC3 = columns (push-pull, active low)
// PD2-PD4 = rows (input, internal pull-up)
// PA1     = VBUS sense (input, external divider)
const ROWS: usize = 3;
const COLS: usize = 4;
const QUEUE_DEPTH: usize = 16;

const REPORT_PERIOD_TICKS: u16 = 1;
const LINK_PERIOD_TICKS: u16 = 10;

type KeyMatrix = Matrix<Ch32v003Pin, ROWS, COLS, QUEUE_DEPTH>;

static TICKS: TickCounter = TickCounter::new();
static APP: StaticCell<App> = StaticCell::new();

/// Link notifications waiting for the link task
static LINK_SIGNALS: Mutex<RefCell<Deque<LinkSignal, 8>>> = Mutex::new(RefCell::new(Deque::new()));

/// Foreground state shared by the scheduled tasks
struct App {
    matrix: KeyMatrix,
    link: UsbLink,
    vbus: Ch32v003Pin,
    vbus_present: bool,
}

/// Queue a bus notification; the USB stack reports `Configured`, `Reset`,
/// `Suspend` and `Resume` through here. Returns false if the mailbox is full.
pub fn post_link_signal(signal: LinkSignal) -> bool {
    critical_section::with(|cs| LINK_SIGNALS.borrow(cs).borrow_mut().push_back(signal).is_ok())
}

fn on_tick() {
    TICKS.increment();
}

fn scan_task(app: &mut App) {
    if let Err(_err) = app.matrix.scan(TICKS.now()) {
        warn!("matrix scan failed: {}", _err);
    }
}

fn report_task(app: &mut App) {
    while let Some(_event) = app.matrix.events().pop() {
        // Transitions seen while the host isn't listening are dropped
        if app.link.reporting_enabled() {
            info!("report {}", _event);
        }
    }
}

fn link_task(app: &mut App) {
    let present = matches!(app.vbus.read(), Ok(Level::High));
    if present != app.vbus_present {
        app.vbus_present = present;
        let signal = if present { LinkSignal::BusPowered } else { LinkSignal::BusLost };
        if !post_link_signal(signal) {
            warn!("link mailbox full");
        }
    }

    while let Some(signal) = critical_section::with(|cs| LINK_SIGNALS.borrow(cs).borrow_mut().pop_front()) {
        app.link.handle_or_fault(signal);
        info!("link {} -> {}", signal, app.link.state());
    }
}

fn init_matrix(config: &matrix_core::KeyboardConfig) -> KeyMatrix {
    let columns = [
        Ch32v003Pin::new(GPIOC, 0),
        Ch32v003Pin::new(GPIOC, 1),
        Ch32v003Pin::new(GPIOC, 2),
        Ch32v003Pin::new(GPIOC, 3),
    ];
    let rows = [
        RowPin::pull_up(Ch32v003Pin::new(GPIOD, 2)),
        RowPin::pull_up(Ch32v003Pin::new(GPIOD, 3)),
        RowPin::pull_up(Ch32v003Pin::new(GPIOD, 4)),
    ];

    let Ok(mut matrix) = Matrix::new(columns, rows, config) else {
        fatal_fault(FaultCode::MatrixConfig);
    };
    if matrix.init().is_err() {
        fatal_fault(FaultCode::MatrixConfig);
    }
    matrix
}

#[entry]
fn main() -> ! {
    board::enable_clocks();
    let config = default_config();

    let mut tick = TickSource::new(Tim2::new(), &TICKS);
    if tick.init(config.tick_period_ms).is_err() {
        fatal_fault(FaultCode::TimerConfig);
    }
    info!("tim2 {}", tick.timer().config());

    let mut vbus = Ch32v003Pin::new(GPIOA, 1);
    if vbus.set_input(Pull::None).is_err() {
        fatal_fault(FaultCode::MatrixConfig);
    }

    let app = APP.init(App {
        matrix: init_matrix(&config),
        link: UsbLink::new(),
        vbus,
        vbus_present: false,
    });
    if let Err(err) = app.link.start() {
        fatal_fault(err.fault_code());
    }

    if tick.start(on_tick).is_err() {
        fatal_fault(FaultCode::TimerConfig);
    }

    let mut scheduler: Scheduler<&TickCounter, App> = Scheduler::new(&TICKS);
    let tasks: [(TaskFn<App>, u16); 3] = [
        (scan_task, config.scan_period_ticks()),
        (report_task, REPORT_PERIOD_TICKS),
        (link_task, LINK_PERIOD_TICKS),
    ];
    for (task, period) in tasks {
        if scheduler.create_task(task, period).is_err() {
            fatal_fault(FaultCode::SchedulerFull);
        }
    }

    info!("keyboard {}x{} ready, debounce {} ms", ROWS, COLS, config.debounce_ms);

    // SAFETY: every interrupt handler and its shared state are set up
    unsafe { riscv::register::mstatus::set_mie() };

    loop {
        if scheduler.poll(app) == 0 {
            // SAFETY: the next tick interrupt wakes the core
            unsafe { riscv::asm::wfi() };
        }
    }
}
