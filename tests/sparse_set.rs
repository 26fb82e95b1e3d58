//! SparseSet membership, erasure, and iteration laws.

use std::collections::HashSet;

use rift::SparseSet;

#[test]
fn membership_after_bulk_insert() {
    let mut set = SparseSet::new();
    set.extend([1, 2, 3, 4, 5, 6]);

    assert!(set.contains_all([4, 3, 6, 2, 1, 5]));
    assert!(!set.contains_all([10, 11, 7, 8, 9, 22]));
    assert_eq!(set.len(), 6);
}

#[test]
fn erased_values_are_gone() {
    let mut set = SparseSet::new();
    set.extend([1, 2, 3, 4, 5, 6]);
    set.erase_all([4, 3, 1]);

    assert!(!set.contains(3));
    assert!(!set.contains(1));
    assert!(!set.contains(4));
    assert!(set.contains_all([2, 5, 6]));
    assert_eq!(set.len(), 3);
}

#[test]
fn iteration_yields_exactly_the_present_set() {
    let mut set = SparseSet::new();
    set.extend([9, 0, 42, 7]);
    set.erase(0);

    let seen: HashSet<u32> = set.iter().copied().collect();
    let expected: HashSet<u32> = [9, 42, 7].into_iter().collect();
    assert_eq!(seen, expected);
}

#[test]
fn erase_swaps_with_the_last_element() {
    let mut set = SparseSet::new();
    set.extend([10, 20, 30]);
    set.erase(10);

    // The last value fills the vacated slot; membership is intact.
    assert_eq!(set.as_slice(), &[30, 20]);
    assert!(set.contains(20));
    assert!(set.contains(30));
}

#[test]
fn clear_is_constant_time_and_reusable() {
    let mut set = SparseSet::new();
    set.extend([5, 6, 7]);
    set.clear();

    assert!(set.is_empty());
    assert_eq!(set.len(), 0);
    assert!(!set.contains(5));

    // Reinsertion after clear works even though the sparse table was left
    // untouched.
    set.insert(6);
    assert!(set.contains(6));
    assert_eq!(set.len(), 1);
}

#[test]
fn sort_orders_dense_and_preserves_membership() {
    let mut set = SparseSet::new();
    set.extend([8, 2, 19, 4, 0]);
    set.sort();

    assert_eq!(set.as_slice(), &[0, 2, 4, 8, 19]);
    assert!(set.contains_all([8, 2, 19, 4, 0]));

    set.erase(4);
    assert!(!set.contains(4));
    assert!(set.contains_all([8, 2, 19, 0]));
}

#[test]
fn values_far_apart_share_a_set() {
    let mut set = SparseSet::new();
    set.insert(0);
    set.insert(10_000);

    assert!(set.contains(0));
    assert!(set.contains(10_000));
    assert!(!set.contains(9_999));
}

#[test]
fn with_capacity_starts_empty() {
    let set = SparseSet::with_capacity(256);
    assert!(set.is_empty());
    assert!(!set.contains(0));
}

#[test]
#[should_panic(expected = "already present")]
#[cfg(debug_assertions)]
fn double_insert_panics_in_debug() {
    let mut set = SparseSet::new();
    set.insert(3);
    set.insert(3);
}

#[test]
#[should_panic(expected = "not present")]
#[cfg(debug_assertions)]
fn erasing_an_absent_value_panics_in_debug() {
    let mut set = SparseSet::new();
    set.erase(3);
}
