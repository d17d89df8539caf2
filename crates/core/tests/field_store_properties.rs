//! Randomised operation sequences against a reference deque
//!
//! The store must behave like a bounded deque that drops from the back when
//! full, whatever the interleaving of inserts and removals.

use std::collections::VecDeque;

use caster_sim_core::{FieldStore, StoreError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[ctor::ctor]
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Drive `steps` random operations and compare against `VecDeque`.
fn run_sequence(seed: u64, capacity: usize, steps: usize) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut store = FieldStore::with_shape(capacity, 2, 2);
    let mut model: VecDeque<f32> = VecDeque::new();
    let mut inserted = 0_u64;
    let mut left_back = 0_u64;
    let mut next_value = 0.0_f32;

    for _ in 0..steps {
        match rng.random_range(0..10) {
            0..=5 => {
                store.add_first_uniform(next_value).unwrap();
                if model.len() == capacity {
                    model.pop_back();
                    left_back += 1;
                }
                model.push_front(next_value);
                inserted += 1;
                next_value += 1.0;
            }
            6..=7 => match store.remove_last() {
                Ok(slice) => {
                    assert_eq!(Some(slice[(1, 1)]), model.pop_back());
                    left_back += 1;
                }
                Err(err) => {
                    assert_eq!(err, StoreError::Empty);
                    assert!(model.is_empty());
                }
            },
            _ => match store.remove_first() {
                Ok(slice) => {
                    assert_eq!(Some(slice[(0, 1)]), model.pop_front());
                    inserted -= 1;
                }
                Err(err) => {
                    assert_eq!(err, StoreError::Empty);
                    assert!(model.is_empty());
                }
            },
        }

        assert!(store.size() <= capacity);
        assert_eq!(store.size(), model.len());
        assert_eq!(store.is_full(), model.len() == capacity);
        assert_eq!(store.end(), inserted);
        assert_eq!(store.start(), left_back);
        for (z, expected) in model.iter().enumerate() {
            assert_eq!(store.get(z, 0, 0).unwrap(), *expected);
        }
    }
}

#[test]
fn test_random_sequences_match_bounded_deque() {
    for seed in 0..16 {
        run_sequence(seed, 7, 400);
    }
}

#[test]
fn test_single_slot_store() {
    run_sequence(99, 1, 200);
}

#[test]
fn test_size_is_net_inserts_minus_removals() {
    let capacity = 50;
    let mut store = FieldStore::with_shape(capacity, 3, 3);
    let mut rng = StdRng::seed_from_u64(7);
    let mut expected = 0_usize;

    for _ in 0..1000 {
        if rng.random_bool(0.7) {
            store.add_first_uniform(1550.0).unwrap();
            expected = (expected + 1).min(capacity);
        } else if store.remove_last().is_ok() {
            expected -= 1;
        }
        assert_eq!(store.size(), expected);
        assert!(store.size() <= capacity);
    }
}
