use std::num::NonZeroU32;
use std::ops::{Index, IndexMut};

use crate::{Handle, PoolError};

const FIRST_GENERATION: NonZeroU32 = NonZeroU32::MIN;

struct Slot<T> {
    generation: NonZeroU32,
    /// `Some` while occupied.
    value: Option<T>,
}

/// Generation-stamped slot storage with a free list.
///
/// Freed indices are reused in LIFO order. A reused slot keeps the generation
/// it was given on removal; only removal (or [`clear`](Pool::clear)) bumps it.
/// A slot whose generation would overflow is retired instead of recycled, so
/// a stale handle can never become valid again.
pub struct Pool<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Pool<T> {
    pub fn new() -> Self {
        Pool {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Pool {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots ever created, occupied or not.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Store `value`, reusing a freed slot when one is available.
    ///
    /// # Panics
    ///
    /// Panics if every `u32` index is already in use.
    pub fn insert(&mut self, value: T) -> Handle {
        match self.try_insert(value) {
            Ok(handle) => handle,
            Err(err) => panic!("{err}"),
        }
    }

    /// Like [`insert`](Self::insert), but reports exhaustion as an error.
    pub fn try_insert(&mut self, value: T) -> Result<Handle, PoolError> {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            debug_assert!(slot.value.is_none(), "free list points at occupied slot");
            slot.value = Some(value);
            self.len += 1;
            return Ok(Handle::new(index, slot.generation));
        }

        let index = u32::try_from(self.slots.len()).map_err(|_| PoolError::Full {
            capacity: self.slots.len(),
        })?;
        self.slots.push(Slot {
            generation: FIRST_GENERATION,
            value: Some(value),
        });
        self.len += 1;
        Ok(Handle::new(index, FIRST_GENERATION))
    }

    /// Validate `handle` against its slot.
    fn check(&self, handle: Handle) -> Result<&Slot<T>, PoolError> {
        let slot = self
            .slots
            .get(handle.index() as usize)
            .ok_or(PoolError::OutOfBounds {
                handle,
                capacity: self.slots.len(),
            })?;
        if slot.generation.get() != handle.generation() {
            return Err(PoolError::StaleGeneration {
                handle,
                current: slot.generation.get(),
            });
        }
        if slot.value.is_none() {
            return Err(PoolError::Vacant { handle });
        }
        Ok(slot)
    }

    /// Checked lookup that explains a rejection.
    pub fn try_get(&self, handle: Handle) -> Result<&T, PoolError> {
        self.check(handle)?
            .value
            .as_ref()
            .ok_or(PoolError::Vacant { handle })
    }

    pub fn try_get_mut(&mut self, handle: Handle) -> Result<&mut T, PoolError> {
        self.check(handle)?;
        self.slots[handle.index() as usize]
            .value
            .as_mut()
            .ok_or(PoolError::Vacant { handle })
    }

    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.try_get(handle).ok()
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.try_get_mut(handle).ok()
    }

    /// Whether `handle` is currently valid.
    pub fn contains(&self, handle: Handle) -> bool {
        self.check(handle).is_ok()
    }

    /// Remove and return the value behind `handle`, invalidating it.
    pub fn remove(&mut self, handle: Handle) -> Option<T> {
        self.check(handle).ok()?;
        let index = handle.index();
        let value = self.vacate(index);
        self.len -= 1;
        value
    }

    /// Take the value out of an occupied slot and bump its generation.
    fn vacate(&mut self, index: u32) -> Option<T> {
        let slot = &mut self.slots[index as usize];
        let value = slot.value.take();
        // On overflow the slot is retired: it stays vacant forever.
        if let Some(next) = slot.generation.checked_add(1) {
            slot.generation = next;
            self.free.push(index);
        }
        value
    }

    /// Remove every value. All outstanding handles become stale.
    pub fn clear(&mut self) {
        for index in 0..self.slots.len() {
            if self.slots[index].value.is_some() {
                // Indices below `slots.len()` fit in u32 by construction.
                #[expect(clippy::cast_possible_truncation, reason = "slot count never exceeds u32")]
                self.vacate(index as u32);
            }
        }
        self.len = 0;
    }

    /// Validate once, then run `body` with direct access to the value.
    pub fn with_valid<R>(&self, handle: Handle, body: impl FnOnce(&T) -> R) -> Option<R> {
        self.get(handle).map(body)
    }

    pub fn with_valid_mut<R>(
        &mut self,
        handle: Handle,
        body: impl FnOnce(&mut T) -> R,
    ) -> Option<R> {
        self.get_mut(handle).map(body)
    }

    /// Access a value without any validation.
    ///
    /// # Safety
    ///
    /// `handle` must be valid for this pool: its index in bounds, the slot
    /// occupied, and the generation matching. The analyses only emit this
    /// form for accesses they proved valid.
    #[allow(unsafe_code, reason = "unchecked accessor for proven-valid handles")]
    pub unsafe fn get_unchecked(&self, handle: Handle) -> &T {
        // SAFETY: the caller guarantees the slot exists and is occupied.
        unsafe {
            self.slots
                .get_unchecked(handle.index() as usize)
                .value
                .as_ref()
                .unwrap_unchecked()
        }
    }

    /// Mutable form of [`get_unchecked`](Self::get_unchecked).
    ///
    /// # Safety
    ///
    /// Same contract as [`get_unchecked`](Self::get_unchecked).
    #[allow(unsafe_code, reason = "unchecked accessor for proven-valid handles")]
    pub unsafe fn get_unchecked_mut(&mut self, handle: Handle) -> &mut T {
        // SAFETY: the caller guarantees the slot exists and is occupied.
        unsafe {
            self.slots
                .get_unchecked_mut(handle.index() as usize)
                .value
                .as_mut()
                .unwrap_unchecked()
        }
    }

    /// Iterate occupied slots in index order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            inner: self.slots.iter().enumerate(),
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        IterMut {
            inner: self.slots.iter_mut().enumerate(),
        }
    }
}

impl<T> Index<Handle> for Pool<T> {
    type Output = T;

    fn index(&self, handle: Handle) -> &T {
        match self.try_get(handle) {
            Ok(value) => value,
            Err(err) => panic!("stale handle: {err}"),
        }
    }
}

impl<T> IndexMut<Handle> for Pool<T> {
    fn index_mut(&mut self, handle: Handle) -> &mut T {
        match self.try_get_mut(handle) {
            Ok(value) => value,
            Err(err) => panic!("stale handle: {err}"),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Iterator over `(Handle, &T)` for occupied slots.
pub struct Iter<'a, T> {
    inner: std::iter::Enumerate<std::slice::Iter<'a, Slot<T>>>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (Handle, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        for (index, slot) in self.inner.by_ref() {
            if let Some(value) = slot.value.as_ref() {
                #[expect(clippy::cast_possible_truncation, reason = "slot count never exceeds u32")]
                return Some((Handle::new(index as u32, slot.generation), value));
            }
        }
        None
    }
}

/// Iterator over `(Handle, &mut T)` for occupied slots.
pub struct IterMut<'a, T> {
    inner: std::iter::Enumerate<std::slice::IterMut<'a, Slot<T>>>,
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = (Handle, &'a mut T);

    fn next(&mut self) -> Option<Self::Item> {
        for (index, slot) in self.inner.by_ref() {
            let generation = slot.generation;
            if let Some(value) = slot.value.as_mut() {
                #[expect(clippy::cast_possible_truncation, reason = "slot count never exceeds u32")]
                return Some((Handle::new(index as u32, generation), value));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests;
