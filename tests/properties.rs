//! Property tests: the matched set tracks a simple model under arbitrary
//! register / unregister / alter sequences.

use media_match::{create_matcher, ChangeHandler, FakeMediaEnvironment};
use parking_lot::Mutex;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

const QUERIES: [&str; 4] = ["q0", "q1", "q2", "q3"];
const KEYS: [&str; 4] = ["k0", "k1", "k2", "k3"];

#[derive(Clone, Debug)]
enum Op {
    Register { key: usize, query: usize },
    Unregister { key: usize },
    Alter { matching: Vec<bool> },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..KEYS.len(), 0..QUERIES.len()).prop_map(|(key, query)| Op::Register { key, query }),
        (0..KEYS.len()).prop_map(|key| Op::Unregister { key }),
        prop::collection::vec(any::<bool>(), QUERIES.len())
            .prop_map(|matching| Op::Alter { matching }),
    ]
}

proptest! {
    #[test]
    fn matched_set_follows_model(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let env = FakeMediaEnvironment::new();
        let matcher = create_matcher(Arc::new(env.clone()));

        let calls = Arc::new(Mutex::new(Vec::<Vec<String>>::new()));
        let c = Arc::clone(&calls);
        matcher.on_change(&ChangeHandler::new(move |m| c.lock().push(m.to_vec())));

        // key -> query index, and the currently matching query set
        let mut model: BTreeMap<&str, usize> = BTreeMap::new();
        let mut matching: BTreeSet<&str> = BTreeSet::new();

        for op in ops {
            match op {
                Op::Register { key, query } => {
                    matcher.register_with_key(KEYS[key], QUERIES[query]).unwrap();
                    model.entry(KEYS[key]).or_insert(query);
                }
                Op::Unregister { key } => {
                    matcher.unregister(KEYS[key]);
                    model.remove(KEYS[key]);
                }
                Op::Alter { matching: flags } => {
                    matching = QUERIES
                        .iter()
                        .zip(flags)
                        .filter(|(_, on)| *on)
                        .map(|(q, _)| *q)
                        .collect();
                    let list: Vec<&str> = matching.iter().copied().collect();
                    env.alter(&list);
                }
            }

            let expected: Vec<String> = model
                .iter()
                .filter(|(_, q)| matching.contains(QUERIES[**q]))
                .map(|(k, _)| k.to_string())
                .collect();
            prop_assert_eq!(matcher.current_matches(), expected);
        }

        let calls = calls.lock();
        for pair in calls.windows(2) {
            prop_assert_ne!(&pair[0], &pair[1]);
        }
        for call in calls.iter() {
            let mut sorted = call.clone();
            sorted.sort();
            sorted.dedup();
            prop_assert_eq!(&sorted, call);
        }
    }
}
