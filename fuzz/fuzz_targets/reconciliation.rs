#![no_main]

use keyseq_collection::IndexedCollection;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: (Vec<(u8, u8)>, Vec<(u8, u8)>)| {
    let (seed, target) = input;
    let items = IndexedCollection::new(|v: &(u8, u8)| v.0);
    if items.add_range(seed).is_err() {
        return;
    }

    let before = items.to_vec();
    match items.set_all(target.clone()) {
        Ok(summary) => {
            assert_eq!(items.to_vec(), target);
            assert_eq!(summary.kept + summary.replaced + summary.appended, target.len());
        }
        Err(err) => {
            assert!(err.is_duplicate_key());
            assert_eq!(items.to_vec(), before);
        }
    }
    assert!(items.is_consistent());
});
