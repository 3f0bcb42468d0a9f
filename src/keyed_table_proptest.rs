#![cfg(test)]

// Property tests for KeyedTable kept inside the crate so they can use the
// internal chain validator.

use crate::keyed_table::{KeyedTable, Upsert};
use crate::TableError;
use proptest::prelude::*;
use std::collections::HashMap;

// Pool-indexed operations to improve shrinking: indices shrink to earlier keys,
// pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Upsert(usize, i32),
    Get(usize),
    GetMut(usize, i32),
    Remove(usize),
    Delete(usize),
    Probe(String),
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-zA-Z]{0,6}", 1..=10).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let op = prop_oneof![
            3 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Upsert(i, v)),
            1 => idx.clone().prop_map(OpI::Get),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| OpI::GetMut(i, d)),
            1 => idx.clone().prop_map(OpI::Remove),
            1 => idx.clone().prop_map(OpI::Delete),
            1 => "[a-zA-Z]{0,6}".prop_map(OpI::Probe),
        ];
        proptest::collection::vec(op, 1..80).prop_map(move |ops| (pool.clone(), ops))
    })
}

// Drives the table and a std HashMap model through the same operations and
// checks, after every step:
// - outcomes agree with the model (Added vs Updated, returned values, KeyNotFound);
// - len parity;
// - every chain is acyclic, consistently linked, and holds only keys that hash to it.
fn run(capacity: u16, pool: Vec<String>, ops: Vec<OpI>) -> Result<(), TestCaseError> {
    let mut sut: KeyedTable<i32> = KeyedTable::with_capacity(capacity).expect("initialize");
    let mut model: HashMap<String, i32> = HashMap::new();

    for op in ops {
        match op {
            OpI::Upsert(i, v) => {
                let k = &pool[i];
                let expected = model.insert(k.clone(), v);
                match sut.add_or_update(k, v) {
                    Ok(Upsert::Added) => prop_assert!(expected.is_none(), "added over existing key"),
                    Ok(Upsert::Updated { previous }) => prop_assert_eq!(Some(previous), expected),
                    Err(r) => prop_assert!(false, "unexpected failure: {:?}", r.error),
                }
            }
            OpI::Get(i) => {
                let k = &pool[i];
                prop_assert_eq!(sut.get(k), model.get(k));
                prop_assert_eq!(sut.contains_key(k), model.contains_key(k));
            }
            OpI::GetMut(i, d) => {
                let k = &pool[i];
                match (sut.get_mut(k), model.get_mut(k)) {
                    (Some(s), Some(m)) => {
                        *s = s.wrapping_add(d);
                        *m = m.wrapping_add(d);
                    }
                    (None, None) => {}
                    (s, m) => prop_assert!(false, "get_mut mismatch: {:?} vs {:?}", s, m),
                }
            }
            OpI::Remove(i) => {
                let k = &pool[i];
                prop_assert_eq!(sut.remove(k), model.remove(k));
                prop_assert!(sut.get(k).is_none());
            }
            OpI::Delete(i) => {
                let k = &pool[i];
                let expected = model.remove(k).ok_or(TableError::KeyNotFound);
                prop_assert_eq!(sut.delete(k), expected);
            }
            OpI::Probe(s) => {
                prop_assert_eq!(sut.get(&s), model.get(&s));
                let idx = sut.index(&s).expect("ready");
                prop_assert!(idx < capacity);
                prop_assert_eq!(sut.index(&s), Some(idx));
            }
        }

        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        if let Err(msg) = sut.check_chains() {
            prop_assert!(false, "chain integrity: {}", msg);
        }
    }

    let total: usize = (0..capacity).map(|i| sut.bucket_len(i).unwrap_or(0)).sum();
    prop_assert_eq!(total, model.len());
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario(), capacity in 1u16..=64) {
        run(capacity, pool, ops)?;
    }
}

// Same invariants with a single bucket: every key collides, so every unlink
// case (sole, head, tail, interior) is reached.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_single_bucket((pool, ops) in arb_scenario()) {
        run(1, pool, ops)?;
    }
}
