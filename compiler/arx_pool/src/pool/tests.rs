#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use std::collections::HashMap;
use std::num::NonZeroU32;

use pretty_assertions::assert_eq;
use proptest::prelude::*;

use super::*;

#[test]
fn insert_get_remove() {
    let mut pool = Pool::new();
    let a = pool.insert("a");
    let b = pool.insert("b");
    assert_eq!(pool.len(), 2);
    assert_eq!(pool.get(a), Some(&"a"));
    assert_eq!(pool[b], "b");

    assert_eq!(pool.remove(a), Some("a"));
    assert_eq!(pool.get(a), None);
    assert_eq!(pool.remove(a), None);
    assert_eq!(pool.len(), 1);
}

#[test]
fn first_generation_is_one() {
    let mut pool = Pool::new();
    assert_eq!(pool.insert(0u8).generation(), 1);
}

#[test]
fn freed_slot_is_reused_with_bumped_generation() {
    let mut pool = Pool::new();
    let old = pool.insert(1);
    pool.remove(old);
    let new = pool.insert(2);

    assert_eq!(new.index(), old.index());
    assert_eq!(new.generation(), old.generation() + 1);
    assert_eq!(pool.capacity(), 1);
    assert_eq!(
        pool.try_get(old),
        Err(PoolError::StaleGeneration {
            handle: old,
            current: 2
        })
    );
    assert_eq!(pool[new], 2);
}

#[test]
fn reinsertion_does_not_bump_generation_again() {
    let mut pool = Pool::new();
    let h = pool.insert(1);
    pool.remove(h);
    let h2 = pool.insert(2);
    let h3 = pool.insert(3);
    assert_eq!(h2.generation(), 2);
    assert_eq!(h3.generation(), 1);
}

#[test]
fn out_of_bounds_and_vacant_errors() {
    let mut big = Pool::new();
    let far = (0..5).map(|i| big.insert(i)).last().unwrap();

    let mut pool: Pool<i32> = Pool::new();
    assert_eq!(
        pool.try_get(far),
        Err(PoolError::OutOfBounds {
            handle: far,
            capacity: 0
        })
    );

    let h = pool.insert(7);
    pool.slots[0].value = None;
    assert_eq!(pool.try_get_mut(h), Err(PoolError::Vacant { handle: h }));
}

#[test]
fn clear_invalidates_everything() {
    let mut pool = Pool::new();
    let handles: Vec<_> = (0..4).map(|i| pool.insert(i)).collect();
    pool.clear();

    assert!(pool.is_empty());
    assert!(handles.iter().all(|&h| !pool.contains(h)));

    let fresh = pool.insert(9);
    assert!(handles.iter().all(|&h| h != fresh));
    assert_eq!(fresh.generation(), 2);
}

#[test]
fn exhausted_generation_retires_slot() {
    let mut pool = Pool::new();
    let h = pool.insert("last");
    pool.slots[0].generation = NonZeroU32::MAX;
    let h = Handle::new(h.index(), NonZeroU32::MAX);

    assert_eq!(pool.remove(h), Some("last"));
    let next = pool.insert("next");
    assert_ne!(next.index(), h.index());
    assert!(!pool.contains(h));
    assert_eq!(pool.capacity(), 2);
}

#[test]
fn with_valid_validates_once() {
    let mut pool = Pool::new();
    let h = pool.insert(vec![1, 2]);
    assert_eq!(pool.with_valid(h, Vec::len), Some(2));
    pool.with_valid_mut(h, |v| v.push(3));
    assert_eq!(pool[h], vec![1, 2, 3]);

    pool.remove(h);
    assert_eq!(pool.with_valid(h, Vec::len), None);
}

#[test]
#[should_panic(expected = "stale handle")]
fn index_panics_on_stale_handle() {
    let mut pool = Pool::new();
    let h = pool.insert(1);
    pool.remove(h);
    let _ = pool[h];
}

#[test]
#[allow(unsafe_code, reason = "exercising the unchecked accessor")]
fn unchecked_access_matches_checked() {
    let mut pool = Pool::new();
    let h = pool.insert(41);
    // SAFETY: `h` was just inserted and never removed.
    unsafe {
        *pool.get_unchecked_mut(h) += 1;
        assert_eq!(*pool.get_unchecked(h), 42);
    }
}

#[test]
fn iter_skips_vacant_slots() {
    let mut pool = Pool::new();
    let a = pool.insert('a');
    let b = pool.insert('b');
    let c = pool.insert('c');
    pool.remove(b);

    let seen: Vec<_> = pool.iter().map(|(h, &v)| (h, v)).collect();
    assert_eq!(seen, vec![(a, 'a'), (c, 'c')]);

    for (_, v) in pool.iter_mut() {
        *v = v.to_ascii_uppercase();
    }
    assert_eq!(pool[c], 'C');
}

#[derive(Clone, Debug)]
enum Op {
    Insert(u16),
    Remove(usize),
    Get(usize),
    Clear,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => any::<u16>().prop_map(Op::Insert),
        3 => any::<usize>().prop_map(Op::Remove),
        3 => any::<usize>().prop_map(Op::Get),
        1 => Just(Op::Clear),
    ]
}

proptest! {
    /// Every handle ever issued is valid exactly while the model says its
    /// value is live, and then maps to the right value.
    #[test]
    fn pool_matches_model(ops in prop::collection::vec(op(), 0..200)) {
        let mut pool = Pool::new();
        let mut issued: Vec<Handle> = Vec::new();
        let mut live: HashMap<Handle, u16> = HashMap::new();

        for op in ops {
            match op {
                Op::Insert(v) => {
                    let h = pool.insert(v);
                    prop_assert!(!live.contains_key(&h));
                    prop_assert!(!issued.contains(&h), "handle {} reissued", h);
                    issued.push(h);
                    live.insert(h, v);
                }
                Op::Remove(i) if !issued.is_empty() => {
                    let h = issued[i % issued.len()];
                    prop_assert_eq!(pool.remove(h), live.remove(&h));
                }
                Op::Get(i) if !issued.is_empty() => {
                    let h = issued[i % issued.len()];
                    prop_assert_eq!(pool.get(h), live.get(&h));
                }
                Op::Clear => {
                    pool.clear();
                    live.clear();
                }
                Op::Remove(_) | Op::Get(_) => {}
            }
            prop_assert_eq!(pool.len(), live.len());
        }

        for &h in &issued {
            prop_assert_eq!(pool.contains(h), live.contains_key(&h));
        }
    }
}
