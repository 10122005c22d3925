//! Must-alias partition over locals.
//!
//! Two locals share a class only when they provably hold the same handle
//! value. The relation is an equivalence, so it is stored as a class label
//! per local. Merging two paths intersects the partitions: locals stay
//! together only if they were together on both paths.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::ir::LocalId;

#[derive(Clone, Debug)]
pub struct MustAlias {
    /// Class label per local. Labels below `labels.len()` are canonical
    /// (the index of the class's first member); fresh labels come after.
    labels: Vec<u32>,
    next: u32,
}

impl MustAlias {
    /// Every local in its own class.
    pub fn new(num_locals: usize) -> Self {
        let labels: Vec<u32> = (0..num_locals).map(label_of).collect();
        MustAlias {
            next: label_of(num_locals),
            labels,
        }
    }

    fn label(&self, local: LocalId) -> Option<u32> {
        self.labels.get(local.index()).copied()
    }

    /// `dst = src`: `dst` leaves its class and joins `src`'s.
    pub fn copy(&mut self, dst: LocalId, src: LocalId) {
        if dst == src {
            return;
        }
        if let Some(label) = self.label(src) {
            if let Some(slot) = self.labels.get_mut(dst.index()) {
                *slot = label;
            }
        }
    }

    /// `local` was overwritten and no longer aliases anything.
    pub fn kill(&mut self, local: LocalId) {
        if let Some(slot) = self.labels.get_mut(local.index()) {
            *slot = self.next;
            self.next += 1;
        }
    }

    /// Split every local `pred` selects into its own class.
    pub fn kill_where(&mut self, mut pred: impl FnMut(LocalId) -> bool) {
        for i in 0..self.labels.len() {
            let local = LocalId::from_index(i);
            if pred(local) {
                self.kill(local);
            }
        }
    }

    pub fn are_aliases(&self, a: LocalId, b: LocalId) -> bool {
        a != b && self.label(a).is_some() && self.label(a) == self.label(b)
    }

    /// Other locals that provably hold the same value as `local`.
    pub fn aliases_of(&self, local: LocalId) -> SmallVec<[LocalId; 4]> {
        let Some(label) = self.label(local) else {
            return SmallVec::new();
        };
        self.labels
            .iter()
            .enumerate()
            .filter(|&(i, &l)| l == label && i != local.index())
            .map(|(i, _)| LocalId::from_index(i))
            .collect()
    }

    /// Partition intersection. Both sides must cover the same locals.
    #[must_use]
    pub fn meet(&self, other: &MustAlias) -> MustAlias {
        debug_assert_eq!(self.labels.len(), other.labels.len());
        let mut pairs: FxHashMap<(u32, u32), u32> = FxHashMap::default();
        let labels = self
            .labels
            .iter()
            .zip(&other.labels)
            .enumerate()
            .map(|(i, (&a, &b))| *pairs.entry((a, b)).or_insert(label_of(i)))
            .collect();
        MustAlias {
            labels,
            next: label_of(self.labels.len()),
        }
    }
}

#[inline]
fn label_of(index: usize) -> u32 {
    u32::try_from(index).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use smallvec::SmallVec;

    use super::MustAlias;
    use crate::ir::LocalId;
    use crate::test_helpers::l;

    fn sorted(mut v: SmallVec<[LocalId; 4]>) -> Vec<LocalId> {
        v.sort();
        v.into_vec()
    }

    #[test]
    fn copy_is_symmetric_and_transitive() {
        let mut a = MustAlias::new(4);
        a.copy(l(1), l(0));
        a.copy(l(2), l(1));
        assert!(a.are_aliases(l(0), l(2)));
        assert!(a.are_aliases(l(2), l(0)));
        assert_eq!(sorted(a.aliases_of(l(0))), vec![l(1), l(2)]);
        assert!(a.aliases_of(l(3)).is_empty());
    }

    #[test]
    fn kill_removes_from_class() {
        let mut a = MustAlias::new(3);
        a.copy(l(1), l(0));
        a.copy(l(2), l(0));
        a.kill(l(0));
        assert!(!a.are_aliases(l(0), l(1)));
        assert!(a.are_aliases(l(1), l(2)));
    }

    #[test]
    fn kill_of_first_member_does_not_collide() {
        let mut a = MustAlias::new(2);
        a.copy(l(1), l(0));
        a.kill(l(0));
        a.kill(l(1));
        assert!(!a.are_aliases(l(0), l(1)));
    }

    #[test]
    fn copy_moves_dst_out_of_old_class() {
        let mut a = MustAlias::new(3);
        a.copy(l(1), l(0));
        a.copy(l(1), l(2));
        assert!(!a.are_aliases(l(0), l(1)));
        assert!(a.are_aliases(l(1), l(2)));
    }

    #[test]
    fn meet_intersects() {
        let mut left = MustAlias::new(4);
        left.copy(l(1), l(0));
        left.copy(l(2), l(0));
        let mut right = MustAlias::new(4);
        right.copy(l(1), l(0));
        right.copy(l(3), l(2));

        let merged = left.meet(&right);
        assert!(merged.are_aliases(l(0), l(1)));
        assert!(!merged.are_aliases(l(0), l(2)));
        assert!(!merged.are_aliases(l(2), l(3)));
    }

    #[test]
    fn kill_where_splits_selected() {
        let mut a = MustAlias::new(3);
        a.copy(l(1), l(0));
        a.copy(l(2), l(0));
        a.kill_where(|local| local == l(2));
        assert!(a.are_aliases(l(0), l(1)));
        assert!(!a.are_aliases(l(0), l(2)));
    }
}
