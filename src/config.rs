//! Compile-time constants governing the scheduler and arbiter.
//!
//! All limits are fixed at compile time — no dynamic allocation. Values
//! below mirror the defaults of the flight-software kernel this crate
//! reimplements; integrators recompile with different values rather than
//! reconfiguring at runtime.

/// Minimum allowed task-flags width; never lower this.
pub const MIN_TASK_FLAGS_SIZE: usize = 3;

/// Minimum allowed task table size; never lower this.
pub const MIN_TASK_SIZE: usize = 2;

/// Default priority assigned when none is specified.
pub const MIN_PRIORITY: u8 = 0;

/// Per-task action-flag byte count. `flags[0..3]` carry the next-claimer
/// record for resource tasks (`has`, `id`, `priority`); the remainder is
/// free for task bodies to use as inter-task signals.
pub const TASK_FLAGS_SIZE: usize = 4;

/// Maximum number of tasks the system can register.
pub const MAX_TASK_SIZE: usize = 48;

/// Highest priority value a task may hold.
pub const MAX_PRIORITY: u8 = 100;

/// Number of shared resources the arbiter can track. Must match the
/// cardinality of the integrator's own resource identifier set.
pub const RESOURCE_SIZE: usize = 8;

/// Scheduler period, day component.
pub const CLOCK_PERIOD_DAY: i16 = 0;

/// Scheduler period, millisecond component — how often a pass runs.
pub const CLOCK_PERIOD_MS: i32 = 10;

/// Milliseconds in a day; the clock's day/ms normalization modulus.
pub const MS_PER_DAY: i32 = 1000 * 86_400;

const _: () = assert!(MAX_TASK_SIZE >= MIN_TASK_SIZE);
const _: () = assert!(TASK_FLAGS_SIZE >= MIN_TASK_FLAGS_SIZE);
