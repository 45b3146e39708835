//! USB link state machine
//!
//! ```text
//! Top
//! ├── Detached
//! └── Attached            (BusLost → Detached, Reset → Powered)
//!     ├── Powered         (Configured → Configured)
//!     └── Configured      (INIT → Active)
//!         ├── Active      (reports keys; Suspend → Suspended)
//!         └── Suspended   (Resume → Active)
//! ```

use crate::hsm::{Event, Hsm, HsmError, State, Status};

/// Bus notifications from the USB peripheral
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkSignal {
    BusPowered,
    BusLost,
    Configured,
    Reset,
    Suspend,
    Resume,
}

/// Leaf state of the link
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkState {
    Detached,
    Powered,
    Active,
    Suspended,
}

/// Data shared by the link state handlers
#[derive(Default, Debug)]
pub struct LinkContext {
    reporting: bool,
    suspends: u16,
}

type LinkEvent = Event<LinkSignal>;
type LinkStatus = Status<LinkContext, LinkSignal>;

static TOP: State<LinkContext, LinkSignal> = State::top(|_, _| Status::Ignored);
static DETACHED: State<LinkContext, LinkSignal> = State::new("Detached", &TOP, detached);
static ATTACHED: State<LinkContext, LinkSignal> = State::new("Attached", &TOP, attached);
static POWERED: State<LinkContext, LinkSignal> = State::new("Powered", &ATTACHED, powered);
static CONFIGURED: State<LinkContext, LinkSignal> = State::new("Configured", &ATTACHED, configured);
static ACTIVE: State<LinkContext, LinkSignal> = State::new("Active", &CONFIGURED, active);
static SUSPENDED: State<LinkContext, LinkSignal> = State::new("Suspended", &CONFIGURED, suspended);

fn detached(_ctx: &mut LinkContext, event: &LinkEvent) -> LinkStatus {
    match event {
        Event::Entry => {
            #[cfg(feature = "defmt")]
            defmt::info!("usb detached");
            Status::Handled
        }
        Event::Signal(LinkSignal::BusPowered) => Status::Transition(&POWERED),
        _ => Status::Super(&TOP),
    }
}

fn attached(_ctx: &mut LinkContext, event: &LinkEvent) -> LinkStatus {
    match event {
        Event::Signal(LinkSignal::BusLost) => Status::Transition(&DETACHED),
        Event::Signal(LinkSignal::Reset) => Status::Transition(&POWERED),
        _ => Status::Super(&TOP),
    }
}

fn powered(_ctx: &mut LinkContext, event: &LinkEvent) -> LinkStatus {
    match event {
        Event::Signal(LinkSignal::Configured) => Status::Transition(&CONFIGURED),
        _ => Status::Super(&ATTACHED),
    }
}

fn configured(_ctx: &mut LinkContext, event: &LinkEvent) -> LinkStatus {
    match event {
        Event::Init => Status::Transition(&ACTIVE),
        _ => Status::Super(&ATTACHED),
    }
}

fn active(ctx: &mut LinkContext, event: &LinkEvent) -> LinkStatus {
    match event {
        Event::Entry => {
            ctx.reporting = true;
            #[cfg(feature = "defmt")]
            defmt::info!("usb active, reporting on");
            Status::Handled
        }
        Event::Exit => {
            ctx.reporting = false;
            Status::Handled
        }
        Event::Signal(LinkSignal::Suspend) => Status::Transition(&SUSPENDED),
        _ => Status::Super(&CONFIGURED),
    }
}

fn suspended(ctx: &mut LinkContext, event: &LinkEvent) -> LinkStatus {
    match event {
        Event::Entry => {
            ctx.suspends = ctx.suspends.wrapping_add(1);
            Status::Handled
        }
        Event::Signal(LinkSignal::Resume) => Status::Transition(&ACTIVE),
        _ => Status::Super(&CONFIGURED),
    }
}

/// USB link tracker. Key reports should only be sent while
/// [`reporting_enabled`](UsbLink::reporting_enabled) is true.
pub struct UsbLink {
    hsm: Hsm<LinkContext, LinkSignal>,
    ctx: LinkContext,
}

impl UsbLink {
    pub fn new() -> Self {
        Self {
            hsm: Hsm::new(&TOP),
            ctx: LinkContext::default(),
        }
    }

    /// Enter `Detached`
    pub fn start(&mut self) -> Result<(), HsmError> {
        self.hsm.begin(&mut self.ctx, |_| Status::Transition(&DETACHED))
    }

    pub fn handle(&mut self, signal: LinkSignal) -> Result<(), HsmError> {
        self.hsm.dispatch(&mut self.ctx, &Event::Signal(signal))
    }

    /// `handle`, treating a state machine error as fatal
    pub fn handle_or_fault(&mut self, signal: LinkSignal) {
        self.hsm.dispatch_or_fault(&mut self.ctx, &Event::Signal(signal));
    }

    /// Current leaf state, `None` before `start`
    pub fn state(&self) -> Option<LinkState> {
        let current = self.hsm.current()?;
        [
            (&DETACHED, LinkState::Detached),
            (&POWERED, LinkState::Powered),
            (&ACTIVE, LinkState::Active),
            (&SUSPENDED, LinkState::Suspended),
        ]
        .into_iter()
        .find(|(state, _)| current.is(state))
        .map(|(_, link)| link)
    }

    /// True anywhere below `Attached`
    pub fn is_attached(&self) -> bool {
        self.hsm.is_in(&ATTACHED)
    }

    pub fn reporting_enabled(&self) -> bool {
        self.ctx.reporting
    }

    /// Times the host has suspended the link
    pub fn suspend_count(&self) -> u16 {
        self.ctx.suspends
    }
}

impl Default for UsbLink {
    fn default() -> Self {
        Self::new()
    }
}
