use core::fmt;
use core::mem::ManuallyDrop;
use core::ops::{Deref, DerefMut};

use crate::vector::LockingVector;
use crate::word::Packable;

/// RAII owner of one slot's lock. Writes its value back on drop.
///
/// The guard holds a copy of the slot's value, read when the lock was
/// acquired. Changes made through [`set`](Self::set) or `DerefMut` become
/// visible to other threads when the guard is dropped, in the same store that
/// releases the lock.
pub struct SlotGuard<'a, T: Packable> {
    vector: &'a LockingVector<T>,
    index: usize,
    value: T,
}

impl<'a, T: Packable> SlotGuard<'a, T> {
    pub(crate) fn new(vector: &'a LockingVector<T>, index: usize, value: T) -> Self {
        Self {
            vector,
            index,
            value,
        }
    }

    /// Index of the held slot.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// The guard's current value.
    #[inline]
    pub fn get(&self) -> T {
        self.value
    }

    /// Replaces the value written back on drop.
    #[inline]
    pub fn set(&mut self, value: T) {
        self.value = value;
    }

    /// Releases the slot without writing the guard's value back.
    pub fn unlock(self) {
        let this = ManuallyDrop::new(self);
        this.vector.unlock(this.index);
    }
}

impl<T: Packable> Deref for SlotGuard<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: Packable> DerefMut for SlotGuard<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T: Packable> Drop for SlotGuard<'_, T> {
    #[inline]
    fn drop(&mut self) {
        self.vector.write_and_unlock(self.index, self.value);
    }
}

impl<T: Packable + fmt::Debug> fmt::Debug for SlotGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotGuard")
            .field("index", &self.index)
            .field("value", &self.value)
            .finish()
    }
}
