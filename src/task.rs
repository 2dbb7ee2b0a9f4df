//! Task record: identity, timing, and the small state machine every task
//! cycles through.
//!
//! A task body never blocks. It re-enters on every scheduler pass that
//! finds it due, inspects [`TaskActionInfo::subtask`] to resume where it
//! left off, and terminates by setting `state` to `Success`, `Failed`, or
//! leaves it `Running`/`Suspended` to be called again later.

use crate::clock::Clock;
use crate::config::TASK_FLAGS_SIZE;

/// Identifies a shared resource. Left as a bare index (matching
/// [`crate::config::RESOURCE_SIZE`]) rather than a typed enum — the
/// integrator owns the resource enumeration and converts to/from this at
/// the call site.
pub type ResourceId = u8;

/// How a task's next due time is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskType {
    /// Runs once at a caller-chosen time, then disables itself.
    NonCyclical,
    /// A one-shot task bound to a shared resource; claimed, not scheduled.
    Resource,
    /// Next due = last finished + period. Delay slips the whole cycle.
    LooselyRepeated,
    /// Next due = last executed + period. Delay slips from start, not finish.
    Repeated,
    /// Next due = last due reported + period. Delay does not slip the cycle.
    Periodic,
}

impl TaskType {
    fn is_one_shot(self) -> bool {
        matches!(self, TaskType::NonCyclical | TaskType::Resource)
    }
}

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskState {
    #[default]
    Undefined,
    Initial,
    Running,
    Suspended,
    Failed,
    Success,
    Timeout,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Failed | TaskState::Success | TaskState::Timeout)
    }
}

/// The part of a task's record the task body itself mutates.
#[derive(Debug, Clone, Copy)]
pub struct TaskActionInfo {
    pub state: TaskState,
    pub enabled: bool,
    pub subtask: u8,
    /// For a resource task: `[has_next_claimer, next_claimer_id,
    /// next_claimer_priority, reserved]`. Free for other task types to use
    /// as inter-task signal flags.
    pub flags: [u8; TASK_FLAGS_SIZE],
}

impl Default for TaskActionInfo {
    fn default() -> Self {
        Self::empty()
    }
}

impl TaskActionInfo {
    pub const fn empty() -> Self {
        TaskActionInfo {
            state: TaskState::Undefined,
            enabled: false,
            subtask: 0,
            flags: [0; TASK_FLAGS_SIZE],
        }
    }

    pub fn clear_flags(&mut self) {
        self.flags = [0; TASK_FLAGS_SIZE];
    }
}

/// Per-task bookkeeping owned by the kernel.
#[derive(Debug, Clone, Copy)]
pub struct TaskInfo {
    pub id: u8,
    pub priority: u8,
    pub action_info: TaskActionInfo,
    pub task_type: TaskType,
    pub last_due_reported: Clock,
    pub last_executed: Clock,
    pub last_finished: Clock,
    /// Cyclical tasks: the period. One-shot tasks: the execution-due time.
    /// A tagged field rather than a union, per the redesign note in favor
    /// of a type-discriminated representation over "don't read the wrong
    /// member".
    pub time_info: Clock,
    pub timeout: Clock,
    pub suspension_due: Clock,
    /// A previously configured suspension duration, consumed by
    /// `wait_from_suspension_time`.
    pub suspension_time: Clock,
    pub is_due_reported: bool,
    pub forced_due: bool,
}

impl TaskInfo {
    pub const fn empty() -> Self {
        TaskInfo {
            id: 0,
            priority: 0,
            action_info: TaskActionInfo::empty(),
            task_type: TaskType::NonCyclical,
            last_due_reported: Clock::ZERO,
            last_executed: Clock::ZERO,
            last_finished: Clock::ZERO,
            time_info: Clock::ZERO,
            timeout: Clock::ZERO,
            suspension_due: Clock::ZERO,
            suspension_time: Clock::ZERO,
            is_due_reported: false,
            forced_due: false,
        }
    }

    pub fn init_clock_to_now(&mut self, now: Clock) {
        self.last_due_reported = now;
        self.last_executed = now;
        self.last_finished = now;
        self.suspension_due = now;
    }

    fn cycle_next_due(&self) -> Clock {
        let anchor = match self.task_type {
            TaskType::LooselyRepeated => self.last_finished,
            TaskType::Repeated => self.last_executed,
            _ => self.last_due_reported,
        };
        anchor.add(&self.time_info)
    }

    /// `now >= due` for the task's own notion of "due".
    pub fn is_due(&self, now: &Clock) -> bool {
        let diff = if self.task_type.is_one_shot() {
            now.sub(&self.time_info)
        } else {
            now.sub(&self.cycle_next_due())
        };
        diff.direction() >= 0
    }

    /// A zero timeout means "never times out". Otherwise, true once the
    /// elapsed time since `last_executed` reaches `timeout`.
    pub fn is_timed_out(&self, now: &Clock) -> bool {
        if self.timeout.is_disabled() {
            return false;
        }
        let elapsed = now.sub(&self.last_executed);
        self.timeout.sub(&elapsed).direction() <= 0
    }

    pub fn clear_action_flags(&mut self) {
        self.action_info.clear_flags();
    }

    /// Re-arms the task for its next cycle: clears flags, subtask, due
    /// reporting, and forced-due, and returns state to `Initial`.
    pub fn reset_state(&mut self) {
        self.clear_action_flags();
        self.action_info.subtask = 0;
        self.action_info.state = TaskState::Initial;
        self.is_due_reported = false;
        self.forced_due = false;
    }
}

/// A registered task: its record plus the function that drives it.
#[derive(Clone, Copy)]
pub struct Task {
    pub info: TaskInfo,
    pub action: TaskAction,
}

pub type TaskAction = fn(u8, &mut TaskActionInfo);

fn noop_action(_id: u8, _info: &mut TaskActionInfo) {}

impl Task {
    pub const fn empty() -> Self {
        Task {
            info: TaskInfo::empty(),
            action: noop_action,
        }
    }
}

/// An entry on the due list: which task, and at what priority it was
/// queued (a task's priority may change after being queued; the due entry
/// is re-sorted, not re-read from the task record, until the next pass).
#[derive(Debug, Clone, Copy, Default)]
pub struct DueEntry {
    pub task_id: u8,
    pub priority: u8,
}
