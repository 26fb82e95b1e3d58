//! Parallel iteration: exhaustive visitation and disjoint-slot writes.

#![cfg(feature = "parallel")]

use std::sync::atomic::{AtomicUsize, Ordering};

use rift::prelude::*;

#[derive(Default, Clone)]
struct Toggle {
    state: bool,
}

#[derive(Default, Clone)]
struct Position {
    x: f64,
    y: f64,
}

#[derive(Default, Clone)]
struct Direction {
    x: f64,
    y: f64,
}

#[test]
fn every_toggle_is_flipped_exactly_once() {
    const N: usize = 10_000;
    let mut entities = EntityRegistry::new();
    let handles: Vec<Entity> = (0..N).map(|_| entities.create_entity()).collect();
    for &handle in &handles {
        entities.add_component(handle, Toggle { state: false });
    }

    let visits = AtomicUsize::new(0);
    entities.par_for_entities_with::<(Toggle,), _>(|(toggle,)| {
        toggle.state = true;
        visits.fetch_add(1, Ordering::Relaxed);
    });

    assert_eq!(visits.load(Ordering::Relaxed), N);
    for &handle in &handles {
        assert!(entities.get_component::<Toggle>(handle).state);
    }
}

#[test]
fn parallel_writes_land_on_the_right_slots() {
    const N: usize = 2_000;
    let mut entities = EntityRegistry::new();
    let handles: Vec<Entity> = (0..N).map(|_| entities.create_entity()).collect();
    for (i, &handle) in handles.iter().enumerate() {
        entities.add_component(
            handle,
            Position {
                x: i as f64,
                y: 0.0,
            },
        );
        entities.add_component(handle, Direction { x: 1.0, y: -1.0 });
    }

    entities.par_for_entities_with::<(Position, Direction), _>(|(position, direction)| {
        position.x += direction.x;
        position.y += direction.y;
    });

    for (i, &handle) in handles.iter().enumerate() {
        let position = entities.get_component::<Position>(handle);
        assert_eq!(position.x, i as f64 + 1.0);
        assert_eq!(position.y, -1.0);
    }
}

#[test]
fn parallel_pass_over_an_empty_match_is_a_no_op() {
    let mut entities = EntityRegistry::new();
    entities.create_entity();

    let visits = AtomicUsize::new(0);
    entities.par_for_entities_with::<(Toggle,), _>(|_| {
        visits.fetch_add(1, Ordering::Relaxed);
    });

    assert_eq!(visits.load(Ordering::Relaxed), 0);
}

#[test]
fn sequential_and_parallel_passes_agree() {
    const N: usize = 512;
    let mut entities = EntityRegistry::new();
    for i in 0..N {
        let e = entities.create_entity();
        entities.add_component(
            e,
            Position {
                x: i as f64,
                y: i as f64,
            },
        );
    }

    entities.par_for_entities_with::<(Position,), _>(|(position,)| {
        position.x *= 2.0;
    });

    let mut total = 0.0;
    entities.for_entities_with::<(Position,), _>(|_, (position,)| {
        assert_eq!(position.x, position.y * 2.0);
        total += position.x;
    });
    let expected: f64 = (0..N).map(|i| i as f64 * 2.0).sum();
    assert_eq!(total, expected);
}
