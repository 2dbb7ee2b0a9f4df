//! Interrupt-safe critical section abstraction.
//!
//! Exactly one piece of kernel state is touched from an interrupt context:
//! the main clock, advanced by `tick`. Every other entry point runs only
//! from the cooperative loop, but is still wrapped here so a future
//! interrupt-driven caller (e.g. an ISR that claims a resource directly)
//! stays safe without auditing call sites.

use critical_section::{with, CriticalSection};

/// Execute a closure with interrupts masked on the target.
///
/// This is the only synchronization primitive the kernel uses; it is
/// backed by the target-agnostic `critical-section` crate rather than a
/// single architecture's interrupt-disable instruction, so the same kernel
/// binary runs on whichever `critical-section` implementation the
/// integrator links (a `cortex-m` single-core impl on real hardware, the
/// `std`-backed impl for host tests).
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce(CriticalSection) -> R,
{
    with(f)
}
