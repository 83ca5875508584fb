//! Cooperative scheduler.
//!
//! Tasks live in a fixed arena addressed by [`TaskHandle`], with a separate
//! list holding their run order. A pass first applies pending suspensions and
//! then walks the run order once, firing each due task at most once.
//!
//! Removing a task while a pass is in flight only empties its slot; the run
//! order is compacted when the next pass starts.

use crate::{
    config::{SUSPEND_CAPACITY, TASK_CAPACITY},
    debug, info,
    task::Task,
    trace, warn, Error,
};
use haligonia_protocol::{ThreadId, ALL_THREADS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "no-std", derive(defmt::Format))]
pub struct TaskHandle {
    index: u8,
    generation: u16,
}

struct Slot<F> {
    generation: u16,
    task: Option<Task<F>>,
}

/// Position within one scheduler pass.
#[derive(Debug, Default)]
pub struct Pass {
    position: usize,
}

pub struct Scheduler<F> {
    slots: heapless::Vec<Slot<F>, TASK_CAPACITY>,
    order: heapless::Vec<u8, TASK_CAPACITY>,
    suspended: heapless::Deque<ThreadId, SUSPEND_CAPACITY>,
}

impl<F: Copy> Default for Scheduler<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Copy> Scheduler<F> {
    pub fn new() -> Self {
        Self {
            slots: heapless::Vec::new(),
            order: heapless::Vec::new(),
            suspended: heapless::Deque::new(),
        }
    }

    /// Number of tasks currently owned by the scheduler.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.task.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends a task to the run order.
    pub fn add_task(&mut self, mut task: Task<F>) -> Result<TaskHandle, Error> {
        if task.handle.is_some() {
            return Err(Error::TaskAlreadyScheduled);
        }

        let index = match self.free_slot() {
            Some(index) => index,
            None => {
                self.slots
                    .push(Slot {
                        generation: 0,
                        task: None,
                    })
                    .map_err(|_| Error::SchedulerFull)?;
                self.slots.len() - 1
            }
        };

        let index = u8::try_from(index).map_err(|_| Error::SchedulerFull)?;
        self.order.push(index).map_err(|_| Error::SchedulerFull)?;

        let slot = &mut self.slots[usize::from(index)];
        let handle = TaskHandle {
            index,
            generation: slot.generation,
        };

        info!("Adding task {}", task.id());
        task.handle = Some(handle);
        slot.task = Some(task);

        Ok(handle)
    }

    /// Takes a task out of the scheduler. Its handle becomes invalid.
    pub fn remove_task(&mut self, handle: TaskHandle) -> Result<Task<F>, Error> {
        let slot = self.slot_mut(handle).ok_or(Error::UnknownTask)?;
        let mut task = slot.task.take().ok_or(Error::UnknownTask)?;
        slot.generation = slot.generation.wrapping_add(1);

        info!("Removed task {}", task.id());
        task.handle = None;
        Ok(task)
    }

    pub fn task(&self, handle: TaskHandle) -> Option<&Task<F>> {
        self.slots
            .get(usize::from(handle.index))
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.task.as_ref())
    }

    pub fn task_mut(&mut self, handle: TaskHandle) -> Option<&mut Task<F>> {
        self.slot_mut(handle).and_then(|slot| slot.task.as_mut())
    }

    /// Tasks in run order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task<F>> {
        self.order
            .iter()
            .filter_map(|index| self.slots[usize::from(*index)].task.as_ref())
    }

    pub fn enable_all(&mut self, now: u64) {
        for task in self.slots.iter_mut().filter_map(|slot| slot.task.as_mut()) {
            task.enable(now);
        }
    }

    pub fn disable_all(&mut self) {
        for task in self.slots.iter_mut().filter_map(|slot| slot.task.as_mut()) {
            task.disable();
        }
    }

    /// Queues a task id to be disabled when the next pass starts.
    ///
    /// [`ALL_THREADS`] disables every task.
    pub fn suspend(&mut self, id: ThreadId) -> Result<(), Error> {
        debug!("Queueing suspend of task {}", id);
        self.suspended
            .push_back(id)
            .map_err(|_| Error::SchedulerFull)
    }

    /// Starts a pass: compacts the run order and applies every pending
    /// suspension.
    pub fn begin_pass(&mut self) -> Pass {
        let slots = &self.slots;
        self.order
            .retain(|index| slots[usize::from(*index)].task.is_some());

        while let Some(id) = self.suspended.pop_front() {
            let mut matched = false;
            for task in self.slots.iter_mut().filter_map(|slot| slot.task.as_mut()) {
                if id == ALL_THREADS || task.id() == id {
                    task.disable();
                    matched = true;
                }
            }

            if matched {
                info!("Suspended task {}", id);
            } else {
                warn!("No task {} to suspend", id);
            }
        }

        Pass::default()
    }

    /// Advances `pass` to the next task that is due at `now` and returns its
    /// callback, or `None` once every task has been considered.
    pub fn next_due(&mut self, pass: &mut Pass, now: u64) -> Option<F> {
        while let Some(index) = self.order.get(pass.position).copied() {
            pass.position += 1;

            let Some(task) = self.slots[usize::from(index)].task.as_mut() else {
                continue;
            };

            if let Some(callback) = task.poll(now) {
                trace!("Firing task {} (overrun {})", task.id(), task.overrun());
                return Some(callback);
            }
        }

        None
    }

    /// Runs one complete pass, handing each due callback to `invoke`.
    pub fn run(&mut self, mut now: impl FnMut() -> u64, mut invoke: impl FnMut(F)) {
        let mut pass = self.begin_pass();
        while let Some(callback) = self.next_due(&mut pass, now()) {
            invoke(callback);
        }
    }

    fn free_slot(&self) -> Option<usize> {
        self.slots.iter().enumerate().find_map(|(index, slot)| {
            let queued = self.order.iter().any(|i| usize::from(*i) == index);
            (slot.task.is_none() && !queued).then_some(index)
        })
    }

    fn slot_mut(&mut self, handle: TaskHandle) -> Option<&mut Slot<F>> {
        self.slots
            .get_mut(usize::from(handle.index))
            .filter(|slot| slot.generation == handle.generation)
    }
}
