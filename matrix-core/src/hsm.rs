//! Hierarchical state machine engine
//!
//! States are `static` nodes linked to their superstate, forming a tree rooted
//! at a top state. Handlers see every event first in the current state and
//! defer to their superstate by returning [`Status::Super`]. Transitions exit
//! up to the least common ancestor (LCA) of source and target, then enter
//! down to the target, so shared superstates never run EXIT/ENTRY for a
//! transition that stays inside them.

use core::fmt;
use core::ptr;

use heapless::Vec;

use crate::fault::{self, FaultCode};

/// Deepest supported state nesting below the top state
pub const MAX_NESTING: usize = 8;

/// Event delivered to a state handler.
///
/// `Entry`, `Exit` and `Init` are reserved for the engine; application
/// signals carry their own payload in `S`.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event<S> {
    Entry,
    Exit,
    /// Asks a freshly entered state for a nested initial transition
    Init,
    Signal(S),
}

/// State handler
pub type Handler<C, S> = fn(&mut C, &Event<S>) -> Status<C, S>;

/// Handler verdict for one event
pub enum Status<C: 'static, S: 'static> {
    /// Exit to the LCA, then enter down to the target
    Transition(&'static State<C, S>),
    /// Switch the current state without running EXIT/ENTRY.
    /// The target must be the acting state or one of its descendants.
    InternalTransition(&'static State<C, S>),
    Handled,
    Ignored,
    /// Not recognised here; try the given superstate
    Super(&'static State<C, S>),
}

impl<C: 'static, S: 'static> Clone for Status<C, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C: 'static, S: 'static> Copy for Status<C, S> {}

impl<C: 'static, S: 'static> fmt::Debug for Status<C, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Transition(target) => write!(f, "Transition({})", target.name),
            Status::InternalTransition(target) => write!(f, "InternalTransition({})", target.name),
            Status::Handled => write!(f, "Handled"),
            Status::Ignored => write!(f, "Ignored"),
            Status::Super(parent) => write!(f, "Super({})", parent.name),
        }
    }
}

/// Node of a state tree
pub struct State<C: 'static, S: 'static> {
    name: &'static str,
    superstate: Option<&'static State<C, S>>,
    handler: Handler<C, S>,
}

impl<C: 'static, S: 'static> State<C, S> {
    /// Root of a state tree
    pub const fn top(handler: Handler<C, S>) -> Self {
        Self {
            name: "Top",
            superstate: None,
            handler,
        }
    }

    pub const fn new(name: &'static str, superstate: &'static State<C, S>, handler: Handler<C, S>) -> Self {
        Self {
            name,
            superstate: Some(superstate),
            handler,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn superstate(&self) -> Option<&'static State<C, S>> {
        self.superstate
    }

    /// Identity comparison; states are unique statics
    pub fn is(&self, other: &State<C, S>) -> bool {
        ptr::eq(self, other)
    }

    fn handle(&self, ctx: &mut C, event: &Event<S>) -> Status<C, S> {
        (self.handler)(ctx, event)
    }
}

impl<C: 'static, S: 'static> fmt::Debug for State<C, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("name", &self.name)
            .field("superstate", &self.superstate.map(|s| s.name))
            .finish()
    }
}

/// Structural errors. They point at a malformed state tree or misuse of the
/// engine, never at a runtime condition.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HsmError {
    /// Event dispatched before `begin`
    NotStarted,
    /// `begin` called on a running instance
    AlreadyStarted,
    /// Superstate chain longer than `MAX_NESTING`
    NestingTooDeep,
    /// Initial handler or INIT answer did not transition to a substate
    InvalidInitialTransition,
    /// Internal transition outside the acting state's subtree
    IllegalInternalTransition,
    /// Target is the top state or belongs to another tree
    UnreachableTarget,
}

impl HsmError {
    pub const fn fault_code(self) -> FaultCode {
        match self {
            HsmError::NotStarted => FaultCode::HsmNotStarted,
            HsmError::AlreadyStarted => FaultCode::HsmAlreadyStarted,
            HsmError::NestingTooDeep => FaultCode::HsmNestingTooDeep,
            HsmError::InvalidInitialTransition => FaultCode::HsmInvalidInitialTransition,
            HsmError::IllegalInternalTransition => FaultCode::HsmIllegalInternalTransition,
            HsmError::UnreachableTarget => FaultCode::HsmUnreachableTarget,
        }
    }
}

#[cfg(feature = "std")]
impl core::fmt::Display for HsmError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            HsmError::NotStarted => write!(f, "State machine not started"),
            HsmError::AlreadyStarted => write!(f, "State machine already started"),
            HsmError::NestingTooDeep => write!(f, "State nesting exceeds MAX_NESTING"),
            HsmError::InvalidInitialTransition => write!(f, "Initial transition must target a substate"),
            HsmError::IllegalInternalTransition => write!(f, "Internal transition must stay within the acting state"),
            HsmError::UnreachableTarget => write!(f, "Transition target not reachable from the top state"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for HsmError {}

/// States from just below the top down to a given state
type Path<C, S> = Vec<&'static State<C, S>, MAX_NESTING>;

/// State machine instance: one current state within one tree
pub struct Hsm<C: 'static, S: 'static> {
    top: &'static State<C, S>,
    current: Option<&'static State<C, S>>,
}

impl<C: 'static, S: 'static> Hsm<C, S> {
    pub const fn new(top: &'static State<C, S>) -> Self {
        Self { top, current: None }
    }

    /// Current leaf state, `None` before `begin`
    pub fn current(&self) -> Option<&'static State<C, S>> {
        self.current
    }

    /// True if `state` is the current state or one of its superstates
    pub fn is_in(&self, state: &State<C, S>) -> bool {
        let mut node = self.current;
        for _ in 0..=MAX_NESTING + 1 {
            match node {
                Some(s) if s.is(state) => return true,
                Some(s) => node = s.superstate,
                None => return false,
            }
        }
        false
    }

    /// Run the initial transition: `init` must return `Transition(target)`.
    /// ENTRY runs from the top down to the target, then nested INIT.
    /// An instance starts once; a second call is rejected before `init` runs.
    pub fn begin(&mut self, ctx: &mut C, init: fn(&mut C) -> Status<C, S>) -> Result<(), HsmError> {
        if self.current.is_some() {
            return Err(HsmError::AlreadyStarted);
        }
        let Status::Transition(target) = init(ctx) else {
            return Err(HsmError::InvalidInitialTransition);
        };

        let path = self.path_from_top(target)?;
        self.current = Some(target);
        for state in path.iter() {
            state.handle(ctx, &Event::Entry);
        }

        self.drill_init(ctx)
    }

    /// Deliver one event, walking up the superstate chain until a handler
    /// takes it, then apply the resulting transition if any.
    pub fn dispatch(&mut self, ctx: &mut C, event: &Event<S>) -> Result<(), HsmError> {
        let source = self.current.ok_or(HsmError::NotStarted)?;
        let mut acting = source;
        let mut hops = 0;

        loop {
            match acting.handle(ctx, event) {
                Status::Super(parent) => {
                    hops += 1;
                    if hops > MAX_NESTING {
                        return Err(HsmError::NestingTooDeep);
                    }
                    acting = parent;
                }
                Status::Handled | Status::Ignored => return Ok(()),
                Status::InternalTransition(target) => {
                    if !self.contains(acting, target)? {
                        return Err(HsmError::IllegalInternalTransition);
                    }
                    self.current = Some(target);
                    return Ok(());
                }
                Status::Transition(target) => return self.transition(ctx, source, target),
            }
        }
    }

    /// `begin`, routing structural errors to the fatal fault handler
    pub fn begin_or_fault(&mut self, ctx: &mut C, init: fn(&mut C) -> Status<C, S>) {
        if let Err(err) = self.begin(ctx, init) {
            fault::fatal_fault(err.fault_code());
        }
    }

    /// `dispatch`, routing structural errors to the fatal fault handler
    pub fn dispatch_or_fault(&mut self, ctx: &mut C, event: &Event<S>) {
        if let Err(err) = self.dispatch(ctx, event) {
            fault::fatal_fault(err.fault_code());
        }
    }

    fn transition(
        &mut self,
        ctx: &mut C,
        source: &'static State<C, S>,
        target: &'static State<C, S>,
    ) -> Result<(), HsmError> {
        let source_path = self.path_from_top(source)?;
        let target_path = self.path_from_top(target)?;

        // The LCA must be a proper superstate of the target, which turns a
        // self-transition into exit + re-entry of that one state.
        let shared = source_path
            .iter()
            .zip(target_path.iter())
            .take_while(|(a, b)| a.is(b))
            .count()
            .min(target_path.len() - 1);

        for state in source_path[shared..].iter().rev() {
            state.handle(ctx, &Event::Exit);
        }
        self.current = Some(target);
        for state in target_path[shared..].iter() {
            state.handle(ctx, &Event::Entry);
        }

        #[cfg(feature = "defmt")]
        defmt::trace!("hsm {} -> {}", source.name, target.name);

        self.drill_init(ctx)
    }

    /// Follow INIT answers down the tree until a state declines
    fn drill_init(&mut self, ctx: &mut C) -> Result<(), HsmError> {
        for _ in 0..=MAX_NESTING {
            let current = self.current.ok_or(HsmError::NotStarted)?;
            let Status::Transition(child) = current.handle(ctx, &Event::Init) else {
                return Ok(());
            };
            if child.is(current) || !self.contains(current, child)? {
                return Err(HsmError::InvalidInitialTransition);
            }

            let mut entry: Path<C, S> = Vec::new();
            let mut node = child;
            while !node.is(current) {
                entry.push(node).map_err(|_| HsmError::NestingTooDeep)?;
                node = node.superstate.ok_or(HsmError::UnreachableTarget)?;
            }

            self.current = Some(child);
            for state in entry.iter().rev() {
                state.handle(ctx, &Event::Entry);
            }
        }
        Err(HsmError::NestingTooDeep)
    }

    /// True if `node` is `ancestor` or nested somewhere below it
    fn contains(&self, ancestor: &State<C, S>, node: &'static State<C, S>) -> Result<bool, HsmError> {
        let mut cursor = Some(node);
        for _ in 0..=MAX_NESTING + 1 {
            match cursor {
                Some(s) if s.is(ancestor) => return Ok(true),
                Some(s) => cursor = s.superstate,
                None => return Ok(false),
            }
        }
        Err(HsmError::NestingTooDeep)
    }

    /// Chain from just below the top down to `state`
    fn path_from_top(&self, state: &'static State<C, S>) -> Result<Path<C, S>, HsmError> {
        if state.is(self.top) {
            return Err(HsmError::UnreachableTarget);
        }

        let mut path: Path<C, S> = Vec::new();
        let mut node = state;
        while !node.is(self.top) {
            path.push(node).map_err(|_| HsmError::NestingTooDeep)?;
            node = node.superstate.ok_or(HsmError::UnreachableTarget)?;
        }
        path.reverse();
        Ok(path)
    }
}
