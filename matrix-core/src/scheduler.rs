//! Cooperative round-robin task scheduler
//!
//! Tasks live in a fixed slot array and run to completion from the foreground
//! loop. A handler that never returns stalls every other task; there is no
//! preemption and no drift correction.

use crate::tick::Clock;
use crate::types::Tick;

/// Default slot count
pub const MAX_TASKS: usize = 5;

/// Task body. Receives the application context passed to [`Scheduler::poll`].
pub type TaskFn<C> = fn(&mut C);

/// Slot index of a live task
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TaskHandle(usize);

impl TaskHandle {
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Scheduler errors
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SchedulerError {
    /// Every slot is occupied
    Full,
}

#[cfg(feature = "std")]
impl core::fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SchedulerError::Full => write!(f, "No free task slot"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for SchedulerError {}

struct Task<C> {
    handler: TaskFn<C>,
    period: u16,
    last_run: Tick,
}

// Manual impls: derive would demand `C: Copy`
impl<C> Clone for Task<C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for Task<C> {}

/// Fixed-capacity periodic task table
pub struct Scheduler<K, C, const N: usize = MAX_TASKS> {
    clock: K,
    slots: [Option<Task<C>>; N],
}

impl<K: Clock, C, const N: usize> Scheduler<K, C, N> {
    pub const fn new(clock: K) -> Self {
        Self {
            clock,
            slots: [None; N],
        }
    }

    /// Claim the first free slot for `handler`, due every `period` ticks.
    ///
    /// The first run happens once `period` ticks have elapsed from now.
    pub fn create_task(&mut self, handler: TaskFn<C>, period: u16) -> Result<TaskHandle, SchedulerError> {
        let now = self.clock.now();
        match self.slots.iter_mut().position(|slot| slot.is_none()) {
            Some(index) => {
                self.slots[index] = Some(Task {
                    handler,
                    period,
                    last_run: now,
                });
                Ok(TaskHandle(index))
            }
            None => {
                #[cfg(feature = "defmt")]
                defmt::warn!("scheduler full ({} slots)", N);
                Err(SchedulerError::Full)
            }
        }
    }

    /// Free the slot. Deleting an already empty slot does nothing.
    pub fn delete_task(&mut self, handle: TaskHandle) {
        if let Some(slot) = self.slots.get_mut(handle.0) {
            *slot = None;
        }
    }

    /// Run every due task once, in slot order. Returns how many ran.
    pub fn poll(&mut self, ctx: &mut C) -> usize {
        let mut ran = 0;

        for index in 0..N {
            let Some(task) = self.slots[index] else {
                continue;
            };
            if self.clock.now().elapsed_since(task.last_run) < task.period {
                continue;
            }

            (task.handler)(ctx);
            ran += 1;

            // Re-sampled so a slow handler doesn't fire again right away
            if let Some(slot) = self.slots[index].as_mut() {
                slot.last_run = self.clock.now();
            }
        }

        ran
    }

    /// Empty every slot
    pub fn clear(&mut self) {
        self.slots = [None; N];
    }

    pub fn is_live(&self, handle: TaskHandle) -> bool {
        matches!(self.slots.get(handle.0), Some(Some(_)))
    }

    /// Number of live tasks
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn clock(&self) -> &K {
        &self.clock
    }
}
