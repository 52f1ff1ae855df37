//! Lock-protocol preconditions.
//!
//! Index bounds are always enforced. The remaining preconditions (only the
//! holder unlocks, a written value leaves the lock bit clear) are checked by
//! `contract!` when the build has `debug_assertions` or the `checked`
//! feature, and compile away otherwise. A violated check panics; build with
//! `panic = "abort"` to make it terminate the process.

use core::fmt;

/// `true` when lock-protocol preconditions are checked in this build.
pub const CHECKED: bool = cfg!(any(debug_assertions, feature = "checked"));

/// Checks a lock-protocol precondition under the build's policy.
///
/// The condition is not evaluated at all when [`CHECKED`] is `false`.
macro_rules! contract {
    ($cond:expr, $($arg:tt)+) => {
        if $crate::contract::CHECKED && !$cond {
            $crate::contract::violation(format_args!($($arg)+));
        }
    };
}

pub(crate) use contract;

#[cold]
#[inline(never)]
#[track_caller]
pub(crate) fn violation(args: fmt::Arguments<'_>) -> ! {
    panic!("lock contract violated: {}", args)
}

#[cold]
#[inline(never)]
#[track_caller]
pub(crate) fn out_of_bounds(op: &'static str, index: usize, len: usize) -> ! {
    panic!("{op}: index {index} out of bounds for locking vector of length {len}")
}
