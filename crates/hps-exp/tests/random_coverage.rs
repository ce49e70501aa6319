use std::collections::BTreeMap;

use hps_core::{NewSweep, RngHandle};
use hps_exp::{Allocator, MemoryStore};
use serde_json::json;

#[test]
fn random_draws_cover_candidates_uniformly() {
    const DRAWS: usize = 6000;

    let allocator = Allocator::new(MemoryStore::new());
    let sweep = allocator
        .create_sweep(&NewSweep {
            method: "random".to_string(),
            parameters: serde_json::from_value(json!({
                "depth": [2, 4, 8],
                "dropout": [0.0, 0.1, 0.2, 0.3, 0.5, 0.7],
            }))
            .unwrap(),
            description: None,
            metadata: None,
        })
        .unwrap();
    let mut rng = RngHandle::from_seed(0xC0FFEE);

    let mut counts: BTreeMap<(String, String), usize> = BTreeMap::new();
    for _ in 0..DRAWS {
        let allocation = allocator.allocate(sweep, &mut rng).unwrap();
        assert_eq!(allocation.cursor, None);
        for (name, value) in allocation.assignment.iter() {
            *counts.entry((name.to_string(), value.to_string())).or_default() += 1;
        }
    }

    for (name, cardinality) in [("depth", 3usize), ("dropout", 6)] {
        let expected = DRAWS as f64 / cardinality as f64;
        let observed: Vec<_> = counts
            .iter()
            .filter(|((param, _), _)| param == name)
            .map(|(_, &count)| count as f64)
            .collect();
        assert_eq!(observed.len(), cardinality);
        for count in observed {
            assert!(
                (count - expected).abs() < expected * 0.15,
                "{name}: {count} vs {expected}"
            );
        }
    }
    assert_eq!(allocator.store().cursor(sweep).unwrap(), 0);
}

#[test]
fn seeded_random_draws_repeat() {
    let store_a = MemoryStore::new();
    let store_b = MemoryStore::new();
    let space = serde_json::from_value(json!({"lr": [1, 2, 3, 4], "wd": [0, 1]})).unwrap();
    let sweep_a = store_a.insert_raw_sweep("random", space).unwrap();
    let space = serde_json::from_value(json!({"lr": [1, 2, 3, 4], "wd": [0, 1]})).unwrap();
    let sweep_b = store_b.insert_raw_sweep("random", space).unwrap();
    let (a, b) = (Allocator::new(store_a), Allocator::new(store_b));
    let mut rng_a = RngHandle::from_seed(99);
    let mut rng_b = RngHandle::from_seed(99);
    for _ in 0..20 {
        assert_eq!(
            a.allocate(sweep_a, &mut rng_a).unwrap().coordinate,
            b.allocate(sweep_b, &mut rng_b).unwrap().coordinate
        );
    }
}
