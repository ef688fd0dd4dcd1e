//! Fuzz target for the content storage stack.
//!
//! Drives an on-disk stack with arbitrary store/load/remove sequences and
//! checks every load against a model.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use localhist_storage::create_content_storage;
use std::collections::HashMap;

#[derive(Debug, Arbitrary)]
enum Op {
    Store(Vec<u8>),
    Load(u8),
    Remove(u8),
    Flush,
}

fuzz_target!(|ops: Vec<Op>| {
    let dir = tempfile::TempDir::new().expect("temp dir");
    let storage = create_content_storage(dir.path()).expect("open storage");
    let mut model: HashMap<i32, Vec<u8>> = HashMap::new();

    for op in ops {
        match op {
            Op::Store(bytes) => {
                let id = storage.store(&bytes).expect("store");
                assert!(model.insert(id, bytes).is_none(), "id {id} reused");
            }
            Op::Load(id) => {
                let id = i32::from(id);
                match (storage.load(id), model.get(&id)) {
                    (Ok(bytes), Some(expected)) => assert_eq!(bytes.as_ref(), expected.as_slice()),
                    (Err(e), None) => assert!(e.is_missing()),
                    (result, expected) => panic!("load {id}: {result:?} vs {expected:?}"),
                }
            }
            Op::Remove(id) => {
                let id = i32::from(id);
                if model.remove(&id).is_some() {
                    storage.remove(id).expect("remove");
                }
            }
            Op::Flush => storage.flush().expect("flush"),
        }
    }
});
