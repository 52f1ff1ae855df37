#![doc(
    html_logo_url = "https://raw.githubusercontent.com/vertexclique/kovan/master/art/kovan-square.svg"
)]
//! Locking vectors for Kovan: fixed-length arrays of word-sized slots whose
//! locks live inside the slots themselves.
//!
//! Each slot is a 4- or 8-byte word. Bit 0 of the word is the slot's lock
//! flag, the other bits are the stored value. Locking a slot is a single
//! compare-and-swap that sets the bit; unlocking is a single store that
//! clears it, optionally together with a new value. No lock object is
//! allocated per slot, which keeps per-row or per-version storage in an
//! MVCC engine dense.
//!
//! ## Features
//!
//! - `LockingVector`: the vector, with raw and lock-protected access.
//! - `SlotGuard`: RAII lock of a single slot.
//! - `Packable`: conversion of caller types to lock words.
//!
//! Cargo features: `std` (default) and `checked`, which keeps lock-protocol
//! precondition checks in release builds (see [`contract`]).
//!
//! ## Usage
//!
//! ```rust
//! use kovan_lvec::LockingVector;
//!
//! let versions = LockingVector::<u64>::new(8);
//!
//! let v = versions.lock_and_read(5);
//! assert!(versions.is_locked(5));
//! versions.write_and_unlock(5, v + 2);
//!
//! assert!(!versions.is_locked(5));
//! assert_eq!(versions.read_raw(5), 2);
//!
//! {
//!     let mut slot = versions.lock_guard(5);
//!     *slot += 2;
//! }
//! assert_eq!(versions.to_vec_raw()[5], 4);
//! ```
//!
//! Values must leave bit 0 of their representation to the lock. Even
//! integers, aligned pointers and shifted encodings (see [`Packable`]) do.

#![warn(missing_docs)]
#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod contract;
mod error;
mod guard;
mod vector;
mod word;

pub use crate::error::LockError;
pub use crate::guard::SlotGuard;
pub use crate::vector::LockingVector;
pub use crate::word::{LockWord, Packable};
