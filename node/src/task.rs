use crate::scheduler::TaskHandle;
use haligonia_protocol::ThreadId;

/// Iteration count of a task that never runs out.
pub const FOREVER: i64 = -1;

/// Longest interval a task can have. Longer intervals are clamped to it.
pub const MAX_INTERVAL: u64 = i64::MAX as u64;

/// A periodic unit of work.
///
/// Times are milliseconds since boot. A task is created disabled; every state
/// change is a plain mutation and performs no I/O.
#[derive(Debug, Clone)]
pub struct Task<F> {
    id: ThreadId,
    interval: u64,
    iterations: i64,
    remaining: i64,
    fired: u64,
    enabled: bool,
    disable_on_last_iteration: bool,
    last_fire: i64,
    overrun: i64,
    callback: F,
    pub(crate) handle: Option<TaskHandle>,
}

impl<F: Copy> Task<F> {
    pub fn new(id: ThreadId, interval: u64, iterations: i64, callback: F) -> Self {
        Self {
            id,
            interval: interval.min(MAX_INTERVAL),
            iterations,
            remaining: iterations,
            fired: 0,
            enabled: false,
            disable_on_last_iteration: false,
            last_fire: 0,
            overrun: 0,
            callback,
            handle: None,
        }
    }

    pub fn id(&self) -> ThreadId {
        self.id
    }

    pub fn interval(&self) -> u64 {
        self.interval
    }

    pub fn iterations_remaining(&self) -> i64 {
        self.remaining
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Time of the last scheduled firing.
    pub fn last_fire(&self) -> i64 {
        self.last_fire
    }

    /// Time left until the next firing, as measured when the task last fired.
    /// Negative when the task has fallen behind.
    pub fn overrun(&self) -> i64 {
        self.overrun
    }

    pub fn callback(&self) -> F {
        self.callback
    }

    /// The handle of the scheduler slot that owns this task.
    pub fn handle(&self) -> Option<TaskHandle> {
        self.handle
    }

    /// True while running the first invocation since (re)start.
    pub fn is_first_iteration(&self) -> bool {
        self.fired == 1
    }

    /// True while running the final invocation of a bounded task.
    pub fn is_last_iteration(&self) -> bool {
        self.remaining == 0
    }

    /// Enables the task and makes it due immediately.
    pub fn enable(&mut self, now: u64) {
        self.enable_delayed(now, 0);
    }

    /// Enables the task and makes it due `delay` from now.
    pub fn enable_delayed(&mut self, now: u64, delay: u64) {
        self.enabled = true;
        self.schedule_after(now, delay);
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    /// Pushes the next firing to `delay` from now, or one full interval when
    /// `delay` is zero. Does not change whether the task is enabled.
    pub fn delay(&mut self, now: u64, delay: u64) {
        let delay = if delay == 0 { self.interval } else { delay };
        self.schedule_after(now, delay);
    }

    /// Resets the iteration count and enables the task.
    pub fn restart(&mut self, now: u64) {
        self.restart_delayed(now, 0);
    }

    pub fn restart_delayed(&mut self, now: u64, delay: u64) {
        self.remaining = self.iterations;
        self.fired = 0;
        self.enable_delayed(now, delay);
    }

    /// Clamped to [`MAX_INTERVAL`].
    pub fn set_interval(&mut self, interval: u64) {
        self.interval = interval.min(MAX_INTERVAL);
    }

    pub fn set_iterations(&mut self, iterations: i64) {
        self.iterations = iterations;
        self.remaining = iterations;
        self.fired = 0;
    }

    pub fn set_callback(&mut self, callback: F) {
        self.callback = callback;
    }

    pub fn set_disable_on_last_iteration(&mut self, disable: bool) {
        self.disable_on_last_iteration = disable;
    }

    fn schedule_after(&mut self, now: u64, delay: u64) {
        self.last_fire = millis(now)
            .saturating_sub(millis(self.interval))
            .saturating_add(millis(delay));
    }

    /// Decides whether the task fires on this pass, updating its bookkeeping
    /// if it does.
    pub(crate) fn poll(&mut self, now: u64) -> Option<F> {
        if !self.enabled {
            return None;
        }

        if self.remaining == 0 {
            if self.disable_on_last_iteration {
                self.enabled = false;
            }
            return None;
        }

        if self.interval > 0 {
            let now = millis(now);
            let interval = millis(self.interval);
            let target = self.last_fire.saturating_add(interval);
            if now < target {
                return None;
            }

            self.last_fire = target;
            self.overrun = target.saturating_add(interval).saturating_sub(now);
        }

        if self.remaining > 0 {
            self.remaining -= 1;
        }
        self.fired = self.fired.saturating_add(1);

        Some(self.callback)
    }
}

fn millis(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
