//! # A cooperative, priority-driven task scheduler and resource arbiter
//!
//! A single-core, non-preemptive kernel for flight software: every task
//! runs to completion of its current re-entry before the next one starts,
//! so there is no stack switching, no preemption, and no heap.
//!
//! ## Overview
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                    Application Tasks                    │
//! ├────────────────────────────────────────────────────────┤
//! │                 Kernel API (kernel.rs)                  │
//! │   init() · register_*() · run() · tick() · claim_*()   │
//! ├──────────────┬────────────────────┬───────────────────┤
//! │  Scheduler   │   Clock            │  Sync Primitives  │
//! │  scheduler.rs│   clock.rs         │  sync.rs          │
//! │  ─ run()     │   ─ add()/sub()    │  ─ critical_section│
//! │  ─ claim/    │   ─ direction()    │                   │
//! │    release   │                    │                   │
//! ├──────────────┴────────────────────┴───────────────────┤
//! │       Task & Due-List Model (task.rs, sort.rs)          │
//! │    TaskInfo · TaskActionInfo · TaskState · DueEntry     │
//! ├────────────────────────────────────────────────────────┤
//! │             Resource Buffers (buffer.rs)                │
//! │               fixed-capacity RingBuffer                │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! A pass is two phases. **Enqueue** walks the task table and appends every
//! task whose due time has arrived to the due list, then sorts it ascending
//! by priority. **Execute** walks the due list tail-first (highest priority
//! first), running each due task's [`task::TaskAction`] once. A task never
//! blocks inside its own action: it records progress in
//! [`task::TaskActionInfo::subtask`] and is simply called again on a later
//! pass that finds it still due.
//!
//! Five task types exist. [`task::TaskType::NonCyclical`] runs once at a
//! caller-chosen time. [`task::TaskType::Resource`] is claimed rather than
//! scheduled — see below. The remaining three are cyclical, differing only
//! in which timestamp anchors the next due time: [`task::TaskType::Periodic`]
//! (last due reported), [`task::TaskType::Repeated`] (last executed), and
//! [`task::TaskType::LooselyRepeated`] (last finished).
//!
//! ## Resource arbitration
//!
//! A [`task::TaskType::Resource`] task models a shared peripheral or
//! protocol handler: exactly one caller may claim it at a time via
//! [`scheduler::Scheduler::claim_resource`], at which point it is armed and
//! runs on the very same pass. If the resource is already claimed, the
//! requester is recorded as a next claimer (highest priority wins) and is
//! handed the resource automatically the moment the current claimer
//! releases it — mid-pass, without waiting for the next scheduler period.
//!
//! A resource task may optionally own one or two [`buffer::RingBuffer`]s
//! (Tx, Rx, or both) for a request/response style protocol: the claimer
//! fills Tx before the resource task's first run, and polls
//! [`scheduler::Scheduler::resource_has_expected_data_size`] to learn when
//! Rx has accumulated a reply.
//!
//! ## Timeouts
//!
//! Every task (any type) may carry a timeout measured from its own
//! `last_executed`. [`task::TaskInfo::is_timed_out`] is checked on every
//! re-entry, ahead of the task's own action; a timed-out task is forced to
//! [`task::TaskState::Timeout`] without running its action that pass. If
//! the timed-out task held a claimed resource, that resource is force
//! released — after the state transition, before the due-list dequeue, so
//! the next claimer is handed off correctly.
//!
//! ## Memory model
//!
//! - No heap, no `alloc` — every table is a fixed-size array sized by
//!   [`config::MAX_TASK_SIZE`] / [`config::RESOURCE_SIZE`].
//! - Resource buffers bind to caller-owned `'static` byte slices rather
//!   than copying or allocating storage.
//! - Critical sections: [`sync::critical_section`], backed by the
//!   target-agnostic `critical-section` crate.

#![no_std]

pub mod buffer;
pub mod clock;
pub mod config;
pub mod kernel;
pub mod scheduler;
pub mod sort;
pub mod sync;
pub mod task;
