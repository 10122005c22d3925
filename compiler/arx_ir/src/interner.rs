//! String interner shared by every analysis worker.
//!
//! Interning happens while the input program is built; afterwards workers
//! only resolve names to print diagnostics, so a single read-mostly lock is
//! enough.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::Name;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternError {
    /// More distinct strings than a `Name` can index.
    Exhausted { count: usize },
}

impl std::fmt::Display for InternError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InternError::Exhausted { count } => {
                write!(f, "interner exhausted after {count} strings")
            }
        }
    }
}

impl std::error::Error for InternError {}

#[derive(Default)]
struct Table {
    ids: FxHashMap<&'static str, Name>,
    strings: Vec<&'static str>,
}

pub struct StringInterner {
    table: RwLock<Table>,
}

impl StringInterner {
    /// Create an interner holding only the empty string.
    pub fn new() -> Self {
        let mut table = Table::default();
        table.ids.insert("", Name::EMPTY);
        table.strings.push("");
        StringInterner {
            table: RwLock::new(table),
        }
    }

    pub fn try_intern(&self, s: &str) -> Result<Name, InternError> {
        if let Some(&name) = self.table.read().ids.get(s) {
            return Ok(name);
        }

        let mut table = self.table.write();
        // Another worker may have won the race between the two locks.
        if let Some(&name) = table.ids.get(s) {
            return Ok(name);
        }
        let count = table.strings.len();
        let name = u32::try_from(count)
            .map(Name::from_raw)
            .map_err(|_| InternError::Exhausted { count })?;

        // Interned strings live for the whole compilation.
        let leaked: &'static str = Box::leak(s.to_owned().into_boxed_str());
        table.strings.push(leaked);
        table.ids.insert(leaked, name);
        Ok(name)
    }

    /// # Panics
    /// Panics if more than `u32::MAX` strings were interned.
    pub fn intern(&self, s: &str) -> Name {
        self.try_intern(s).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Names not produced by this interner resolve to `"<unknown>"`.
    pub fn lookup(&self, name: Name) -> &'static str {
        self.table
            .read()
            .strings
            .get(name.index())
            .copied()
            .unwrap_or("<unknown>")
    }

    /// Number of interned strings, including the empty string.
    pub fn len(&self) -> usize {
        self.table.read().strings.len()
    }

    /// Whether only the empty string is interned.
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_is_idempotent() {
        let interner = StringInterner::new();
        let a = interner.intern("node");
        let b = interner.intern("node");
        assert_eq!(a, b);
        assert_eq!(interner.lookup(a), "node");
    }

    #[test]
    fn names_are_dense_indices() {
        let interner = StringInterner::new();
        assert_eq!(interner.intern("head"), Name::from_raw(1));
        assert_eq!(interner.intern("tail"), Name::from_raw(2));
        assert_eq!(interner.len(), 3);
    }

    #[test]
    fn empty_string_is_pre_interned() {
        let interner = StringInterner::new();
        assert!(interner.is_empty());
        assert_eq!(interner.intern(""), Name::EMPTY);
    }

    #[test]
    fn foreign_name_resolves_to_placeholder() {
        let interner = StringInterner::new();
        assert_eq!(interner.lookup(Name::from_raw(999)), "<unknown>");
    }

    #[test]
    fn concurrent_interning_agrees() {
        let interner = StringInterner::new();
        let names: Vec<Name> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| interner.intern("shared")))
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap_or(Name::EMPTY))
                .collect()
        });
        assert!(names.windows(2).all(|w| w[0] == w[1]));
        assert_ne!(names[0], Name::EMPTY);
    }
}
