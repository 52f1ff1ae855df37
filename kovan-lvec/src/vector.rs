use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;
use core::marker::PhantomData;
use core::mem::size_of;
use core::sync::atomic::Ordering;

use crossbeam_utils::Backoff;

use crate::contract::{self, contract};
use crate::error::LockError;
use crate::guard::SlotGuard;
use crate::word::{LockWord, Packable};

type Cell<T> = <<T as Packable>::Word as LockWord>::Atomic;

/// A fixed-length vector of word-sized slots, each with its own spinlock.
///
/// The lock of a slot is bit 0 of the slot's own word, so the vector costs
/// exactly `len * size_of::<T>()` bytes and no lock objects. A slot is locked
/// while that bit is set.
///
/// Two families of access are offered:
///
/// - Raw (`read_raw`, `write_raw`, `snapshot_raw`): no lock protocol. Values
///   are transferred verbatim, including the lock bit. Use them only when the
///   caller has excluded concurrent lockers by other means, e.g. before the
///   vector is shared or while every writer is quiesced.
/// - Locked (`lock`, `lock_and_read`, `write_and_unlock`, `unlock` and the
///   `try_*`/guard variants): acquisition is a compare-and-swap that sets the
///   lock bit with `Acquire` ordering, release is a `Release` store that
///   clears it.
///
/// Slots are independent. Nothing orders operations on different slots and
/// nothing prevents deadlock between callers that lock several slots in
/// different orders.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use std::thread;
/// use kovan_lvec::LockingVector;
///
/// let rows = Arc::new(LockingVector::<u64>::new(16));
///
/// let handles: Vec<_> = (0..4)
///     .map(|_| {
///         let rows = rows.clone();
///         thread::spawn(move || {
///             for _ in 0..100 {
///                 let v = rows.lock_and_read(3);
///                 rows.write_and_unlock(3, v + 2);
///             }
///         })
///     })
///     .collect();
///
/// for h in handles {
///     h.join().unwrap();
/// }
/// assert_eq!(rows.read_raw(3), 800);
/// ```
pub struct LockingVector<T: Packable> {
    slots: Box<[Cell<T>]>,
    _marker: PhantomData<T>,
}

impl<T: Packable> LockingVector<T> {
    const WIDTH_MATCHES: () = assert!(
        size_of::<T>() == size_of::<T::Word>(),
        "a Packable type must be exactly as wide as its lock word"
    );

    /// Creates a vector of `len` slots, each holding `T::default()`.
    pub fn new(len: usize) -> Self {
        Self::from_words((0..len).map(|_| T::default().into_word()))
    }

    fn from_words(words: impl Iterator<Item = T::Word>) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::WIDTH_MATCHES;

        let slots: Box<[Cell<T>]> = words.map(LockWord::into_atomic).collect();
        log::trace!(
            "allocated locking vector of {} {}-bit slots",
            slots.len(),
            <T::Word as LockWord>::BITS
        );

        LockingVector {
            slots,
            _marker: PhantomData,
        }
    }

    /// Number of slots. Fixed for the lifetime of the vector.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if the vector has no slots.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[inline]
    #[track_caller]
    fn slot(&self, index: usize, op: &'static str) -> &Cell<T> {
        match self.slots.get(index) {
            Some(slot) => slot,
            None => contract::out_of_bounds(op, index, self.slots.len()),
        }
    }

    /// Reads slot `index` verbatim, lock bit included.
    ///
    /// If the slot is locked at the time of the read, bit 0 of the returned
    /// value's representation is set.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    #[inline]
    #[track_caller]
    pub fn read_raw(&self, index: usize) -> T {
        let slot = self.slot(index, "read_raw");
        T::from_word(T::Word::load(slot, Ordering::Relaxed))
    }

    /// Stores `value` verbatim into slot `index`, bypassing the lock.
    ///
    /// Overwriting a held slot this way breaks its lock protocol. The caller
    /// must know that nobody else is locking the slot.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    #[inline]
    #[track_caller]
    pub fn write_raw(&self, index: usize, value: T) {
        let slot = self.slot(index, "write_raw");
        T::Word::store(slot, value.into_word(), Ordering::Relaxed);
    }

    /// Returns `true` if slot `index` is locked at this instant.
    ///
    /// The answer may be stale by the time it is looked at.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    #[inline]
    #[track_caller]
    pub fn is_locked(&self, index: usize) -> bool {
        let slot = self.slot(index, "is_locked");
        T::Word::load(slot, Ordering::Relaxed).is_locked()
    }

    /// Acquires the lock of slot `index`, spinning until it is free.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    #[inline]
    #[track_caller]
    pub fn lock(&self, index: usize) {
        let slot = self.slot(index, "lock");
        self.acquire(slot, index);
    }

    /// Acquires the lock of slot `index` and returns its value with the lock
    /// bit masked off.
    ///
    /// Spins until the slot is free. There is no timeout and no fairness: a
    /// contended slot goes to whichever spinner wins the compare-and-swap.
    /// Locking a slot the caller already holds spins forever.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    #[inline]
    #[track_caller]
    pub fn lock_and_read(&self, index: usize) -> T {
        let slot = self.slot(index, "lock_and_read");
        T::from_word(self.acquire(slot, index))
    }

    /// Test-and-test-and-set on the slot's lock bit. Returns the word that
    /// was observed unlocked.
    #[inline]
    fn acquire(&self, slot: &Cell<T>, index: usize) -> T::Word {
        let backoff = Backoff::new();
        let mut spins: u32 = 0;
        let mut reported = false;
        let mut word = T::Word::load(slot, Ordering::Relaxed);

        loop {
            if !word.is_locked()
                && T::Word::compare_exchange_weak(
                    slot,
                    word,
                    word.locked(),
                    Ordering::Acquire,
                    Ordering::Relaxed,
                )
                .is_ok()
            {
                break;
            }

            spins = spins.wrapping_add(1);
            if !reported && backoff.is_completed() {
                reported = true;
                log::debug!("slot {} contended, still spinning after {} attempts", index, spins);
            }
            backoff.snooze();
            word = T::Word::load(slot, Ordering::Relaxed);
        }

        contract!(
            T::Word::load(slot, Ordering::Relaxed).is_locked(),
            "slot {} lost its lock bit right after acquisition",
            index
        );
        word
    }

    /// Makes a single attempt to lock slot `index` and read its value.
    ///
    /// Never spins on a held slot: returns [`LockError::WouldBlock`] instead.
    /// A bad index is reported as [`LockError::OutOfBounds`] rather than a
    /// panic.
    pub fn try_lock_and_read(&self, index: usize) -> Result<T, LockError> {
        let slot = self.slots.get(index).ok_or(LockError::OutOfBounds {
            index,
            len: self.slots.len(),
        })?;

        let mut word = T::Word::load(slot, Ordering::Relaxed);
        loop {
            if word.is_locked() {
                return Err(LockError::WouldBlock { index });
            }
            match T::Word::compare_exchange_weak(
                slot,
                word,
                word.locked(),
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Ok(T::from_word(word)),
                // Spurious failure or a raw write moved the word; not contention.
                Err(actual) => word = actual,
            }
        }
    }

    /// Makes a single attempt to lock slot `index`.
    pub fn try_lock(&self, index: usize) -> Result<(), LockError> {
        self.try_lock_and_read(index).map(|_| ())
    }

    /// Stores `value` into slot `index` and releases its lock in one store.
    ///
    /// Must be called by the current holder of the slot. Bit 0 of `value`'s
    /// representation is overwritten by the cleared lock flag.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`. Under the checked policy (see
    /// [`contract`](crate::contract)) also panics if the slot is not locked
    /// or if `value` has bit 0 set.
    #[inline]
    #[track_caller]
    pub fn write_and_unlock(&self, index: usize, value: T) {
        let slot = self.slot(index, "write_and_unlock");
        contract!(
            T::Word::load(slot, Ordering::Relaxed).is_locked(),
            "write_and_unlock on slot {} which is not locked",
            index
        );

        let word = value.into_word();
        contract!(
            !word.is_locked(),
            "value {:#x} written to slot {} occupies the lock bit",
            word,
            index
        );
        T::Word::store(slot, word.unlocked(), Ordering::Release);
    }

    /// Releases the lock of slot `index` without changing its value.
    ///
    /// Must be called by the current holder of the slot.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`. Under the checked policy also panics if the
    /// slot is not locked.
    #[inline]
    #[track_caller]
    pub fn unlock(&self, index: usize) {
        let slot = self.slot(index, "unlock");
        let word = T::Word::load(slot, Ordering::Relaxed);
        contract!(
            word.is_locked(),
            "unlock on slot {} which is not locked",
            index
        );
        T::Word::store(slot, word.unlocked(), Ordering::Release);
    }

    /// Locks slot `index` and returns a guard over its value.
    ///
    /// Dropping the guard writes its value back and releases the slot, as
    /// [`write_and_unlock`](Self::write_and_unlock) does.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    #[track_caller]
    pub fn lock_guard(&self, index: usize) -> SlotGuard<'_, T> {
        let value = self.lock_and_read(index);
        SlotGuard::new(self, index, value)
    }

    /// Makes a single attempt to lock slot `index` behind a guard.
    pub fn try_lock_guard(&self, index: usize) -> Result<SlotGuard<'_, T>, LockError> {
        let value = self.try_lock_and_read(index)?;
        Ok(SlotGuard::new(self, index, value))
    }

    /// Copies every slot verbatim into `dest`, resizing it to `len()` first.
    ///
    /// No lock is taken; slots locked at the time of the copy come out with
    /// bit 0 set. Meant for moments when all writers are quiesced.
    pub fn snapshot_raw(&self, dest: &mut Vec<T>) {
        dest.resize(self.slots.len(), T::default());
        for (out, slot) in dest.iter_mut().zip(self.slots.iter()) {
            *out = T::from_word(T::Word::load(slot, Ordering::Relaxed));
        }
    }

    /// Returns a new vector holding a raw snapshot of every slot.
    pub fn to_vec_raw(&self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.slots.len());
        self.snapshot_raw(&mut out);
        out
    }
}

impl<T: Packable> FromIterator<T> for LockingVector<T> {
    /// Builds a vector whose slots hold the iterator's values verbatim.
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_words(iter.into_iter().map(Packable::into_word))
    }
}

impl<T: Packable> From<Vec<T>> for LockingVector<T> {
    fn from(values: Vec<T>) -> Self {
        values.into_iter().collect()
    }
}

impl<T: Packable> fmt::Debug for LockingVector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        struct Words<'a, T: Packable>(&'a [Cell<T>]);

        impl<T: Packable> fmt::Debug for Words<'_, T> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_list()
                    .entries(
                        self.0
                            .iter()
                            .map(|slot| T::Word::load(slot, Ordering::Relaxed)),
                    )
                    .finish()
            }
        }

        f.debug_struct("LockingVector")
            .field("len", &self.slots.len())
            .field("words", &Words::<T>(&self.slots))
            .finish()
    }
}
