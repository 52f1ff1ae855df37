//! Raw lock words and the value types that pack into them.
//!
//! A slot is one machine word. Bit 0 of that word is the slot's lock flag and
//! the remaining bits belong to the stored value. [`LockWord`] is the unsigned
//! view of the word (`u32` or `u64`) together with its atomic cell, and
//! [`Packable`] converts a caller type to and from that view bit-for-bit.

use core::fmt;
use core::sync::atomic::Ordering;
use portable_atomic::{AtomicU32, AtomicU64};

mod sealed {
    pub trait Sealed {}
}

/// An unsigned machine word whose least-significant bit is a lock flag.
///
/// Implemented for `u32` and `u64` only. The associated atomic comes from
/// `portable-atomic`, so 8-byte slots work on targets without native 64-bit
/// atomics.
pub trait LockWord:
    sealed::Sealed + Copy + Eq + fmt::Debug + fmt::LowerHex + Send + Sync + 'static
{
    /// Atomic cell of the same width.
    type Atomic: Send + Sync;

    /// The reserved lock flag, bit 0.
    const LOCK_BIT: Self;

    /// Width of the word in bits.
    const BITS: u32;

    /// Wraps the word in a fresh atomic cell.
    fn into_atomic(self) -> Self::Atomic;

    /// Atomically loads the word.
    fn load(cell: &Self::Atomic, order: Ordering) -> Self;

    /// Atomically stores the word.
    fn store(cell: &Self::Atomic, word: Self, order: Ordering);

    /// Weak compare-and-swap on the cell.
    fn compare_exchange_weak(
        cell: &Self::Atomic,
        current: Self,
        new: Self,
        success: Ordering,
        failure: Ordering,
    ) -> Result<Self, Self>;

    /// Returns `true` if the lock flag is set.
    fn is_locked(self) -> bool;

    /// The word with the lock flag set.
    fn locked(self) -> Self;

    /// The word with the lock flag cleared (the masked value).
    fn unlocked(self) -> Self;
}

macro_rules! lock_word {
    ($word:ty, $atomic:ty) => {
        impl sealed::Sealed for $word {}

        impl LockWord for $word {
            type Atomic = $atomic;

            const LOCK_BIT: Self = 0x1;
            const BITS: u32 = <$word>::BITS;

            #[inline]
            fn into_atomic(self) -> Self::Atomic {
                <$atomic>::new(self)
            }

            #[inline]
            fn load(cell: &Self::Atomic, order: Ordering) -> Self {
                cell.load(order)
            }

            #[inline]
            fn store(cell: &Self::Atomic, word: Self, order: Ordering) {
                cell.store(word, order)
            }

            #[inline]
            fn compare_exchange_weak(
                cell: &Self::Atomic,
                current: Self,
                new: Self,
                success: Ordering,
                failure: Ordering,
            ) -> Result<Self, Self> {
                cell.compare_exchange_weak(current, new, success, failure)
            }

            #[inline]
            fn is_locked(self) -> bool {
                self & Self::LOCK_BIT != 0
            }

            #[inline]
            fn locked(self) -> Self {
                self | Self::LOCK_BIT
            }

            #[inline]
            fn unlocked(self) -> Self {
                self & !Self::LOCK_BIT
            }
        }
    };
}

lock_word!(u32, AtomicU32);
lock_word!(u64, AtomicU64);

/// A plain 4- or 8-byte value that can live in a locking slot.
///
/// `into_word` and `from_word` must be bit-for-bit reinterpretations: the
/// value's size equals its word's size, and `from_word(into_word(v))` gives
/// back `v`. Bit 0 of the word belongs to the lock, so an implementation
/// either keeps its values' bit 0 clear (aligned pointers, even counters,
/// a shifted encoding) or accepts that bit 0 does not survive a lock cycle.
///
/// # Example
///
/// A version counter that keeps bit 0 free by storing its value shifted:
///
/// ```rust
/// use kovan_lvec::{LockingVector, Packable};
///
/// #[derive(Clone, Copy, Default, Debug, PartialEq)]
/// struct Version(u32);
///
/// impl Packable for Version {
///     type Word = u32;
///     fn into_word(self) -> u32 { self.0 << 1 }
///     fn from_word(word: u32) -> Self { Version(word >> 1) }
/// }
///
/// let versions = LockingVector::<Version>::new(4);
/// let v = versions.lock_and_read(2);
/// versions.write_and_unlock(2, Version(v.0 + 1));
/// assert_eq!(versions.read_raw(2), Version(1));
/// ```
pub trait Packable: Copy + Default {
    /// Raw word this type reinterprets to.
    type Word: LockWord;

    /// Reinterprets the value as its raw word.
    fn into_word(self) -> Self::Word;

    /// Reinterprets a raw word as a value.
    fn from_word(word: Self::Word) -> Self;
}

macro_rules! packable_int {
    ($($ty:ty => $word:ty),* $(,)?) => {
        $(
            impl Packable for $ty {
                type Word = $word;

                #[inline]
                fn into_word(self) -> $word {
                    self as $word
                }

                #[inline]
                fn from_word(word: $word) -> Self {
                    word as $ty
                }
            }
        )*
    };
}

packable_int!(u32 => u32, i32 => u32, u64 => u64, i64 => u64);

#[cfg(target_pointer_width = "32")]
packable_int!(usize => u32, isize => u32);

#[cfg(target_pointer_width = "64")]
packable_int!(usize => u64, isize => u64);

impl Packable for f32 {
    type Word = u32;

    #[inline]
    fn into_word(self) -> u32 {
        self.to_bits()
    }

    #[inline]
    fn from_word(word: u32) -> Self {
        f32::from_bits(word)
    }
}

impl Packable for f64 {
    type Word = u64;

    #[inline]
    fn into_word(self) -> u64 {
        self.to_bits()
    }

    #[inline]
    fn from_word(word: u64) -> Self {
        f64::from_bits(word)
    }
}
