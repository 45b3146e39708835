//! CH32V003 register access: GPIO pins and TIM2 as the tick timer

use core::cell::Cell;
use core::ptr::{read_volatile, write_volatile};

use critical_section::Mutex;
use matrix_core::{GpioPin, HalError, Level, Pull, TimerConfig, TimerDriver, TimerError};

/// HSI with the PLL bypassed
pub const SYSCLK_HZ: u32 = 24_000_000;

const RCC_BASE: u32 = 0x4002_1000;
const RCC_APB2PCENR: u32 = 0x18;
const RCC_APB1PCENR: u32 = 0x1C;
const RCC_IOPAEN: u32 = 1 << 2;
const RCC_IOPCEN: u32 = 1 << 4;
const RCC_IOPDEN: u32 = 1 << 5;
const RCC_TIM2EN: u32 = 1 << 0;

pub const GPIOA: u32 = 0x4001_0800;
pub const GPIOC: u32 = 0x4001_1000;
pub const GPIOD: u32 = 0x4001_1400;

const GPIO_CFGLR: u32 = 0x00;
const GPIO_INDR: u32 = 0x08;
const GPIO_BSHR: u32 = 0x10;

// CNF[1:0] MODE[1:0] nibbles
const CFG_INPUT_FLOATING: u32 = 0x4;
const CFG_INPUT_PULL: u32 = 0x8;
const CFG_OUTPUT_PUSH_PULL: u32 = 0x3;

const TIM2_BASE: u32 = 0x4000_0000;
const TIM_CTLR1: u32 = 0x00;
const TIM_DMAINTENR: u32 = 0x0C;
const TIM_INTFR: u32 = 0x10;
const TIM_CNT: u32 = 0x24;
const TIM_PSC: u32 = 0x28;
const TIM_ATRLR: u32 = 0x2C;
const TIM_CEN: u32 = 1 << 0;
const TIM_UIE: u32 = 1 << 0;
const TIM_UIF: u32 = 1 << 0;

const PFIC_BASE: u32 = 0xE000_E000;
const PFIC_IENR2: u32 = 0x104;
const PFIC_IRER2: u32 = 0x184;
const TIM2_IRQ: u32 = 38;

/// Dividers tried for the tick period, smallest first
pub const TIM2_PRESCALERS: [u16; 6] = [1, 8, 24, 240, 2400, 24000];

unsafe fn read_reg(addr: u32) -> u32 {
    read_volatile(addr as *const u32)
}

unsafe fn write_reg(addr: u32, value: u32) {
    write_volatile(addr as *mut u32, value)
}

unsafe fn modify_reg(addr: u32, f: impl FnOnce(u32) -> u32) {
    write_reg(addr, f(read_reg(addr)))
}

/// Clock the GPIO ports and TIM2
pub fn enable_clocks() {
    // SAFETY: read-modify-write of clock enables before interrupts are on
    unsafe {
        modify_reg(RCC_BASE + RCC_APB2PCENR, |v| v | RCC_IOPAEN | RCC_IOPCEN | RCC_IOPDEN);
        modify_reg(RCC_BASE + RCC_APB1PCENR, |v| v | RCC_TIM2EN);
    }
}

/// One GPIO line, addressed by port base and pin number (0-7)
pub struct Ch32v003Pin {
    port: u32,
    pin: u8,
}

impl Ch32v003Pin {
    pub const fn new(port: u32, pin: u8) -> Self {
        Self { port, pin }
    }

    fn configure(&mut self, cfg: u32) {
        let shift = self.pin as u32 * 4;
        // SAFETY: only this pin's nibble changes; pins are owned uniquely
        unsafe {
            modify_reg(self.port + GPIO_CFGLR, |v| (v & !(0xF << shift)) | (cfg << shift));
        }
    }
}

impl GpioPin for Ch32v003Pin {
    type Error = HalError;

    fn set_input(&mut self, pull: Pull) -> Result<(), Self::Error> {
        match pull {
            Pull::Up => {
                self.configure(CFG_INPUT_PULL);
                // The output latch selects pull-up over pull-down
                self.drive_high()?;
            }
            Pull::None => self.configure(CFG_INPUT_FLOATING),
        }
        Ok(())
    }

    fn set_output(&mut self) -> Result<(), Self::Error> {
        self.configure(CFG_OUTPUT_PUSH_PULL);
        Ok(())
    }

    fn drive_high(&mut self) -> Result<(), Self::Error> {
        // SAFETY: BSHR writes are atomic per bit
        unsafe { write_reg(self.port + GPIO_BSHR, 1 << self.pin) };
        Ok(())
    }

    fn drive_low(&mut self) -> Result<(), Self::Error> {
        // SAFETY: as above, upper half resets
        unsafe { write_reg(self.port + GPIO_BSHR, 1 << (self.pin + 16)) };
        Ok(())
    }

    fn read(&mut self) -> Result<Level, Self::Error> {
        // SAFETY: read-only register
        let indr = unsafe { read_reg(self.port + GPIO_INDR) };
        Ok(if indr & (1 << self.pin) != 0 { Level::High } else { Level::Low })
    }
}

/// Callback run from the TIM2 update interrupt
static TICK_HANDLER: Mutex<Cell<Option<fn()>>> = Mutex::new(Cell::new(None));

/// TIM2 in up-counting mode, one update interrupt per tick
pub struct Tim2 {
    config: Option<TimerConfig>,
}

impl Tim2 {
    pub const fn new() -> Self {
        Self { config: None }
    }

    pub fn config(&self) -> Option<TimerConfig> {
        self.config
    }
}

impl TimerDriver for Tim2 {
    fn configure(&mut self, period_ms: u16) -> Result<(), TimerError> {
        let config = TimerConfig::solve(SYSCLK_HZ, period_ms, &TIM2_PRESCALERS)?;

        // SAFETY: the timer is stopped while it is reprogrammed
        unsafe {
            write_reg(TIM2_BASE + TIM_CTLR1, 0);
            write_reg(TIM2_BASE + TIM_PSC, config.prescaler as u32 - 1);
            write_reg(TIM2_BASE + TIM_ATRLR, config.compare as u32);
            write_reg(TIM2_BASE + TIM_CNT, 0);
        }
        self.config = Some(config);
        Ok(())
    }

    fn arm(&mut self, on_tick: fn()) {
        critical_section::with(|cs| TICK_HANDLER.borrow(cs).set(Some(on_tick)));

        // SAFETY: handler is installed before the interrupt is unmasked
        unsafe {
            write_reg(TIM2_BASE + TIM_INTFR, 0);
            write_reg(TIM2_BASE + TIM_DMAINTENR, TIM_UIE);
            write_reg(PFIC_BASE + PFIC_IENR2, 1 << (TIM2_IRQ - 32));
            modify_reg(TIM2_BASE + TIM_CTLR1, |v| v | TIM_CEN);
        }
    }

    fn disarm(&mut self) {
        // SAFETY: masking first; a pending update is dropped with the handler
        unsafe {
            write_reg(PFIC_BASE + PFIC_IRER2, 1 << (TIM2_IRQ - 32));
            write_reg(TIM2_BASE + TIM_DMAINTENR, 0);
            modify_reg(TIM2_BASE + TIM_CTLR1, |v| v & !TIM_CEN);
        }
        critical_section::with(|cs| TICK_HANDLER.borrow(cs).set(None));
    }
}

#[no_mangle]
extern "C" fn TIM2_IRQHandler() {
    // SAFETY: UIF is cleared by writing zero to it
    unsafe { modify_reg(TIM2_BASE + TIM_INTFR, |v| v & !TIM_UIF) };

    if let Some(on_tick) = critical_section::with(|cs| TICK_HANDLER.borrow(cs).get()) {
        on_tick();
    }
}
