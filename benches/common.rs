#![allow(dead_code)]

use rift::prelude::*;

pub const ENTITIES_SMALL: usize = 10_000;
pub const ENTITIES_MED: usize = 100_000;

#[derive(Default, Clone)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

#[derive(Default, Clone)]
pub struct Velocity {
    pub x: f32,
    pub y: f32,
}

#[derive(Default, Clone)]
pub struct Wealth {
    pub value: f32,
}

pub fn populate(count: usize) -> EntityRegistry {
    let mut entities = EntityRegistry::with_capacity(count);
    for i in 0..count {
        let e = entities.create_entity();
        entities.add_component(
            e,
            Position {
                x: i as f32,
                y: 0.0,
            },
        );
        entities.add_component(e, Velocity { x: 1.0, y: 1.0 });
        entities.add_component(e, Wealth { value: 100.0 });
    }
    entities
}

/// Builds the query caches the iteration benches exercise so that the
/// measured passes run against warm caches.
pub fn warm_caches(entities: &mut EntityRegistry) {
    entities.number_of_entities_with::<(Position, Velocity)>();
    entities.number_of_entities_with::<(Wealth,)>();
}
