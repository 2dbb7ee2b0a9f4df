//! # Kernel
//!
//! Public, firmware-facing API: a single static [`Scheduler`] behind the
//! free functions below. Registration, resource arbitration, and buffer
//! service calls each take their own critical section; [`run`] does not —
//! it delegates straight to [`Scheduler::run`], which already protects the
//! one piece of state an interrupt can touch (the clock) internally. This
//! matters because a task body is free to call back into this module (e.g.
//! `kernel::claim_resource`) from inside its own `Action`, itself invoked
//! from within `run`'s pass — wrapping `run` too would make that call nest
//! inside an already-held critical section.

use crate::clock::Clock;
use crate::scheduler::Scheduler;
use crate::sync::critical_section;
use crate::task::{ResourceId, Task, TaskAction, TaskState};

/// Global scheduler instance.
///
/// # Safety
/// All access goes through `SCHEDULER_PTR`, itself set once by [`init`].
static mut SCHEDULER: Scheduler = Scheduler::new();

/// Raw pointer to the global scheduler, for the same reason the teacher
/// keeps one for its arch layer: ISR and free-function call sites cannot
/// always thread a `&mut Scheduler` through.
///
/// # Safety
/// Set once during [`init`], read from every other function in this module.
static mut SCHEDULER_PTR: *mut Scheduler = core::ptr::null_mut();

/// Must be called exactly once, before any other function in this module.
pub fn init() {
    unsafe {
        SCHEDULER = Scheduler::new();
        SCHEDULER_PTR = &mut SCHEDULER as *mut Scheduler;
    }
}

fn with_scheduler<F, R>(f: F) -> R
where
    F: FnOnce(&mut Scheduler) -> R,
{
    critical_section(|_cs| unsafe { f(&mut *SCHEDULER_PTR) })
}

// -- registration ------------------------------------------------------------

pub fn register_non_cyclical(enabled: bool, execution_due: Clock, timeout: Clock, priority: u8, action: TaskAction) -> Option<u8> {
    with_scheduler(|s| s.register_non_cyclical(enabled, execution_due, timeout, priority, action))
}

pub fn register_resource(resource: ResourceId, timeout: Clock, priority: u8, action: TaskAction) -> Option<u8> {
    with_scheduler(|s| s.register_resource(resource, timeout, priority, action))
}

pub fn register_resource_with_tx(resource: ResourceId, timeout: Clock, priority: u8, action: TaskAction, tx: &'static mut [u8]) -> Option<u8> {
    with_scheduler(|s| s.register_resource_with_tx(resource, timeout, priority, action, tx))
}

pub fn register_resource_with_rx(resource: ResourceId, timeout: Clock, priority: u8, action: TaskAction, rx: &'static mut [u8]) -> Option<u8> {
    with_scheduler(|s| s.register_resource_with_rx(resource, timeout, priority, action, rx))
}

pub fn register_resource_with_buffers(
    resource: ResourceId,
    timeout: Clock,
    priority: u8,
    action: TaskAction,
    tx: &'static mut [u8],
    rx: &'static mut [u8],
) -> Option<u8> {
    with_scheduler(|s| s.register_resource_with_buffers(resource, timeout, priority, action, tx, rx))
}

pub fn register_loosely_repeated(enabled: bool, period: Clock, timeout: Clock, priority: u8, action: TaskAction) -> Option<u8> {
    with_scheduler(|s| s.register_loosely_repeated(enabled, period, timeout, priority, action))
}

pub fn register_repeated(enabled: bool, period: Clock, timeout: Clock, priority: u8, action: TaskAction) -> Option<u8> {
    with_scheduler(|s| s.register_repeated(enabled, period, timeout, priority, action))
}

pub fn register_periodic(enabled: bool, period: Clock, timeout: Clock, priority: u8, action: TaskAction) -> Option<u8> {
    with_scheduler(|s| s.register_periodic(enabled, period, timeout, priority, action))
}

// -- introspection ------------------------------------------------------------

pub fn clock() -> Clock {
    with_scheduler(|s| s.clock())
}

pub fn task(task_id: u8) -> Option<Task> {
    with_scheduler(|s| s.task(task_id).copied())
}

pub fn task_count() -> usize {
    with_scheduler(|s| s.task_count())
}

pub fn task_flag(task_id: u8, flag_no: usize) -> Option<u8> {
    with_scheduler(|s| s.task_flag(task_id, flag_no))
}

pub fn set_task_timeout(task_id: u8, timeout: Clock) {
    with_scheduler(|s| s.set_task_timeout(task_id, timeout));
}

// -- manual scheduling ------------------------------------------------------------

pub fn schedule_non_cyclical(task_id: u8, priority: u8, with_reset: bool, execution_due: Clock) {
    with_scheduler(|s| s.schedule_non_cyclical(task_id, priority, with_reset, execution_due));
}

pub fn due_non_cyclical_or_resource_now(task_id: u8, priority: u8, with_reset: bool) {
    with_scheduler(|s| s.due_non_cyclical_or_resource_now(task_id, priority, with_reset));
}

pub fn due_now(task_id: u8, priority: u8, with_reset: bool) {
    with_scheduler(|s| s.due_now(task_id, priority, with_reset));
}

pub fn wait(task_id: u8, duration: Clock) {
    with_scheduler(|s| s.wait(task_id, duration));
}

pub fn wait_from_suspension_time(task_id: u8) {
    with_scheduler(|s| s.wait_from_suspension_time(task_id));
}

// -- resource arbitration ------------------------------------------------------------

pub fn claim_resource(claimer_id: u8, resource: ResourceId) -> bool {
    with_scheduler(|s| s.claim_resource(claimer_id, resource))
}

pub fn release_resource(resource: ResourceId) {
    with_scheduler(|s| s.release_resource(resource));
}

pub fn resource_state(resource: ResourceId) -> Option<TaskState> {
    with_scheduler(|s| s.resource_state(resource))
}

// -- resource buffers ------------------------------------------------------------

pub fn prepare_resource_tx(resource: ResourceId, data: &[u8]) -> bool {
    with_scheduler(|s| s.prepare_resource_tx(resource, data))
}

pub fn prepare_resource_tx_with_size_return(resource: ResourceId, data: &[u8], expected_rx_size: i32) -> bool {
    with_scheduler(|s| s.prepare_resource_tx_with_size_return(resource, data, expected_rx_size))
}

pub fn prepare_resource_tx_with_time_return(resource: ResourceId, data: &[u8], wait_rx: Clock) -> bool {
    with_scheduler(|s| s.prepare_resource_tx_with_time_return(resource, data, wait_rx))
}

pub fn peek_resource_rx(resource: ResourceId, out: &mut [u8], min_item_size: i32) -> usize {
    with_scheduler(|s| s.peek_resource_rx(resource, out, min_item_size))
}

pub fn get_resource_rx(resource: ResourceId, out: &mut [u8], min_item_size: i32) -> usize {
    with_scheduler(|s| s.get_resource_rx(resource, out, min_item_size))
}

pub fn flush_resource_tx(resource: ResourceId) {
    with_scheduler(|s| s.flush_resource_tx(resource));
}

pub fn flush_resource_rx(resource: ResourceId) {
    with_scheduler(|s| s.flush_resource_rx(resource));
}

pub fn resource_tx_size(resource: ResourceId) -> usize {
    with_scheduler(|s| s.resource_tx_size(resource))
}

pub fn resource_rx_size(resource: ResourceId) -> usize {
    with_scheduler(|s| s.resource_rx_size(resource))
}

pub fn resource_has_expected_data_size(resource: ResourceId, is_tx: bool) -> bool {
    with_scheduler(|s| s.resource_has_expected_data_size(resource, is_tx))
}

pub fn resource_buffer_flags(resource: ResourceId) -> u8 {
    with_scheduler(|s| s.resource_buffer_flags(resource))
}

// -- run loop / tick ------------------------------------------------------------

/// Runs one scheduler pass if its period has elapsed. Intended to be
/// polled from the integrator's main loop.
pub fn run() {
    unsafe { (*SCHEDULER_PTR).run() }
}

/// Advances the kernel clock by one millisecond. The only function in this
/// module meant to be called from an interrupt context.
pub fn tick() {
    with_scheduler(|s| s.tick());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskActionInfo;

    fn succeed(_id: u8, info: &mut TaskActionInfo) {
        info.state = TaskState::Success;
    }

    // Both tests below touch the one shared static instance, so they live
    // in a single `#[test]` function: `cargo test` runs test functions
    // concurrently, and two `init()` calls racing on `SCHEDULER` would be
    // undefined behavior. Every other kernel behavior is exercised against
    // a local `Scheduler` in `scheduler.rs`, which has no such constraint.
    #[test]
    fn run_dispatches_through_the_static_instance() {
        init();
        let t = register_non_cyclical(true, Clock::new(0, 0), Clock::ZERO, 10, succeed).unwrap();
        run();
        assert_eq!(task(t).unwrap().info.action_info.state, TaskState::Success);

        claim_release_handoff_completes_within_a_single_pass();
    }

    /// Drives the spec's resource claim/handoff scenario end to end: a
    /// holds the resource, b's own task action calls `claim_resource`
    /// directly (the only way an action can reach back into arbitration —
    /// see the module doc comment), a releases mid-pass, and b's retry
    /// succeeds within that same `run()` call.
    fn claim_release_handoff_completes_within_a_single_pass() {
        static mut RESOURCE_RUNS: u32 = 0;
        fn resource_action(_id: u8, info: &mut TaskActionInfo) {
            unsafe { RESOURCE_RUNS += 1 };
            info.state = TaskState::Success;
        }
        fn release_then_succeed(_id: u8, info: &mut TaskActionInfo) {
            release_resource(0);
            info.state = TaskState::Success;
        }
        fn claim_then_report(id: u8, info: &mut TaskActionInfo) {
            info.state = if claim_resource(id, 0) { TaskState::Success } else { TaskState::Running };
        }

        init();
        let _resource_task = register_resource(0, Clock::ZERO, 1, resource_action).unwrap();
        // a never runs as a scheduled task; it only needs a valid priority
        // to be recorded as the resource's claimer.
        let a = register_non_cyclical(false, Clock::ZERO, Clock::ZERO, 50, succeed).unwrap();
        assert!(claim_resource(a, 0));

        // Let a's claim settle into a normal pass: the resource task runs
        // to completion and disables itself, leaving a holding a claim on
        // a resource task that is no longer "running".
        run();
        assert_eq!(unsafe { RESOURCE_RUNS }, 1);

        // b out-ranks the release task so it executes first in the next
        // pass, fails its claim attempt while a still holds the resource,
        // and is recorded as the next claimer.
        let b = register_non_cyclical(true, Clock::new(0, 0), Clock::ZERO, 100, claim_then_report).unwrap();
        let releaser = register_non_cyclical(true, Clock::new(0, 0), Clock::ZERO, 60, release_then_succeed).unwrap();

        // A pass only runs once a full scheduler period has elapsed since
        // the last one.
        for _ in 0..10 {
            tick();
        }
        run();

        // b's retry, spliced back in right after the releaser runs, sees
        // the resource free and claims it; the resource task runs again
        // under b's ownership within this same pass.
        assert_eq!(task(b).unwrap().info.action_info.state, TaskState::Success);
        assert_eq!(task(releaser).unwrap().info.action_info.state, TaskState::Success);
        assert_eq!(resource_state(0), Some(TaskState::Success));
        assert_eq!(unsafe { RESOURCE_RUNS }, 2);
    }
}
