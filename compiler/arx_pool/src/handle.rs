use std::fmt;
use std::num::NonZeroU32;

/// Copyable reference into a [`Pool`](crate::Pool).
///
/// Equality is structural: two handles are equal when both index and
/// generation match. Whether a handle is still valid is a question only the
/// pool can answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle {
    index: u32,
    generation: NonZeroU32,
}

impl Handle {
    #[inline]
    pub(crate) const fn new(index: u32, generation: NonZeroU32) -> Self {
        Handle { index, generation }
    }

    /// Slot index this handle points at.
    #[inline]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Generation the slot had when this handle was issued.
    #[inline]
    pub const fn generation(self) -> u32 {
        self.generation.get()
    }

    /// Rebuild a handle from its raw parts (e.g. after serialization).
    ///
    /// Returns `None` for generation 0, which is reserved.
    pub const fn from_raw_parts(index: u32, generation: u32) -> Option<Self> {
        match NonZeroU32::new(generation) {
            Some(generation) => Some(Handle { index, generation }),
            None => None,
        }
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}@{}", self.index, self.generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_handle_uses_niche() {
        assert_eq!(std::mem::size_of::<Handle>(), 8);
        assert_eq!(std::mem::size_of::<Option<Handle>>(), 8);
    }

    #[test]
    fn raw_parts_reject_generation_zero() {
        assert!(Handle::from_raw_parts(3, 0).is_none());
        let h = Handle::from_raw_parts(3, 7);
        assert_eq!(h.map(Handle::index), Some(3));
        assert_eq!(h.map(Handle::generation), Some(7));
    }

    #[test]
    fn display() {
        let h = Handle::from_raw_parts(4, 2).map(|h| h.to_string());
        assert_eq!(h.as_deref(), Some("#4@2"));
    }
}
