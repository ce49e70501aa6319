use std::collections::BTreeSet;

use hps_core::{NewSweep, ParameterSpace, RngHandle, SweepId};
use hps_exp::{Allocator, MemoryStore};
use serde_json::{json, Value};

fn space(value: Value) -> ParameterSpace {
    serde_json::from_value(value).expect("space")
}

fn grid(allocator: &Allocator<MemoryStore>, parameters: Value) -> SweepId {
    allocator
        .create_sweep(&NewSweep {
            method: "grid".to_string(),
            parameters: space(parameters),
            description: None,
            metadata: None,
        })
        .expect("create sweep")
}

#[test]
fn grid_walks_product_in_dimension_order() {
    let allocator = Allocator::new(MemoryStore::new());
    let sweep = grid(&allocator, json!({"b": ["p", "q"], "a": ["x", "y"]}));
    let mut rng = RngHandle::from_seed(1);

    let assignments: Vec<Value> = (0..5)
        .map(|_| {
            let allocation = allocator.allocate(sweep, &mut rng).expect("allocate");
            serde_json::to_value(&allocation.assignment).expect("json")
        })
        .collect();

    assert_eq!(
        assignments,
        vec![
            json!({"a": "x", "b": "p"}),
            json!({"a": "x", "b": "q"}),
            json!({"a": "y", "b": "p"}),
            json!({"a": "y", "b": "q"}),
            json!({"a": "x", "b": "p"}),
        ]
    );
    assert_eq!(allocator.store().cursor(sweep).unwrap(), 5);
}

#[test]
fn each_cycle_covers_every_combination_once() {
    let allocator = Allocator::new(MemoryStore::new());
    let sweep = grid(
        &allocator,
        json!({"lr": [0.1, 0.01, 0.001], "batch": [16, 32], "opt": ["sgd", "adam"]}),
    );
    let mut rng = RngHandle::from_seed(2);

    let first_cycle: Vec<_> = (0..12)
        .map(|_| allocator.allocate(sweep, &mut rng).unwrap())
        .collect();
    let distinct: BTreeSet<_> = first_cycle
        .iter()
        .map(|allocation| allocation.coordinate.digits().to_vec())
        .collect();
    assert_eq!(distinct.len(), 12);
    let cursors: Vec<_> = first_cycle.iter().map(|a| a.cursor.unwrap()).collect();
    assert_eq!(cursors, (0..12).collect::<Vec<u64>>());

    let wrapped = allocator.allocate(sweep, &mut rng).unwrap();
    assert_eq!(wrapped.cursor, Some(12));
    assert_eq!(wrapped.assignment, first_cycle[0].assignment);
}

#[test]
fn concurrent_allocations_consume_every_cursor_once() {
    const WORKERS: u64 = 8;
    const PER_WORKER: u64 = 25;

    let allocator = Allocator::new(MemoryStore::new());
    let sweep = grid(&allocator, json!({"a": [1, 2, 3], "b": [1, 2, 3, 4, 5]}));

    let consumed: Vec<u64> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..WORKERS)
            .map(|worker| {
                let allocator = &allocator;
                scope.spawn(move || {
                    let mut rng = RngHandle::for_substream(7, worker);
                    (0..PER_WORKER)
                        .map(|_| allocator.allocate(sweep, &mut rng).unwrap().cursor.unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|handle| handle.join().expect("worker"))
            .collect()
    });

    let total = WORKERS * PER_WORKER;
    let unique: BTreeSet<u64> = consumed.iter().copied().collect();
    assert_eq!(consumed.len() as u64, total);
    assert_eq!(unique, (0..total).collect::<BTreeSet<_>>());
    assert_eq!(allocator.store().cursor(sweep).unwrap(), total);
}

#[test]
fn zero_parameter_sweep_yields_empty_assignment() {
    let allocator = Allocator::new(MemoryStore::new());
    let sweep = grid(&allocator, json!({}));
    let mut rng = RngHandle::from_seed(3);

    for expected in 0..3 {
        let allocation = allocator.allocate(sweep, &mut rng).unwrap();
        assert!(allocation.assignment.is_empty());
        assert!(allocation.coordinate.is_empty());
        assert_eq!(allocation.cursor, Some(expected));
    }
}
