//! Basic usage of `SlotPool`: reserving storage, inserting items, resolving handles and seeing
//! a stale handle get rejected after its slot is reused.

use std::num::NonZero;

use slot_pool::{Error, SlotPool};

#[derive(Debug)]
struct Particle {
    x: f32,
    velocity: f32,
}

fn main() {
    println!("=== Slot Pool Basic Example ===");

    let mut pool = SlotPool::<Particle>::with_capacity(NonZero::new(3).unwrap());
    pool.reserve().unwrap();

    let a = pool
        .insert(Particle {
            x: 0.0,
            velocity: 1.0,
        })
        .unwrap();
    let b = pool
        .insert(Particle {
            x: 10.0,
            velocity: -2.0,
        })
        .unwrap();

    println!("Inserted particles at slots {} and {}", a.index(), b.index());

    for particle in &mut pool {
        particle.x += particle.velocity;
    }

    println!("After one step: {:?}", pool.get(a));

    pool.remove(a).unwrap();

    let c = pool
        .insert(Particle {
            x: 5.0,
            velocity: 0.5,
        })
        .unwrap();

    println!(
        "Slot {} reused at generation {} (old handle had generation {})",
        c.index(),
        c.generation(),
        a.generation()
    );

    match pool.remove(a) {
        Err(Error::GenerationMismatch { .. }) => println!("Stale handle was rejected"),
        other => println!("Unexpected result: {other:?}"),
    }

    let mut cursor = 0;
    while let Some(particle) = pool.enumerate(&mut cursor) {
        println!("Live particle: {particle:?}");
    }

    pool.teardown();

    println!("Example completed successfully!");
}
