#![no_main]

use arbitrary::Arbitrary;
use keyseq_collection::IndexedCollection;
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
enum Op {
    Add(u8, u8),
    Insert(u8, u8, u8),
    RemoveAt(u8),
    RemoveRange(u8, u8),
    Set(u8, u8, u8),
    RemoveAll(u8),
    SetAll(Vec<(u8, u8)>),
    Sort,
    Reverse,
    Clear,
}

fuzz_target!(|ops: Vec<Op>| {
    let items = IndexedCollection::new(|v: &(u8, u8)| v.0);

    for op in ops {
        let before = items.to_vec();
        let rejected = match op {
            Op::Add(k, v) => items.add((k, v)).is_err(),
            Op::Insert(i, k, v) => items.insert(i as usize, (k, v)).is_err(),
            Op::RemoveAt(i) => items.remove_at(i as usize).is_err(),
            Op::RemoveRange(i, n) => items.remove_range(i as usize, n as usize).is_err(),
            Op::Set(i, k, v) => items.set(i as usize, (k, v)).is_err(),
            Op::RemoveAll(v) => {
                items.remove_all(|item| item.1 == v);
                false
            }
            Op::SetAll(target) => items.set_all(target).is_err(),
            Op::Sort => {
                items.sort();
                false
            }
            Op::Reverse => {
                items.reverse();
                false
            }
            Op::Clear => {
                items.clear();
                false
            }
        };

        if rejected {
            assert_eq!(items.to_vec(), before, "rejected operation changed contents");
        }
        assert!(items.is_consistent(), "key index diverged from sequence");
    }
});
