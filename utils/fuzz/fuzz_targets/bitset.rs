#![no_main]

use arbitrary::Arbitrary;
use binlayout_utils::Bitset;
use libfuzzer_sys::fuzz_target;
use std::collections::BTreeSet;

const MAX_INDEX: u16 = 1024;

#[derive(Arbitrary, Debug)]
enum BitsetOperation {
    Insert(u16),
    Remove(u16),
    Full(u16),
    And(Vec<u16>),
    Or(Vec<u16>),
    Xor(Vec<u16>),
    Sub(Vec<u16>),
    Subset(Vec<u16>),
}

fn model(indices: &[u16]) -> (Bitset, BTreeSet<usize>) {
    let indices: BTreeSet<usize> = indices
        .iter()
        .map(|i| (*i % MAX_INDEX) as usize)
        .collect();
    (indices.iter().copied().collect(), indices)
}

fn check(set: &Bitset, expected: &BTreeSet<usize>) {
    assert_eq!(set.count(), expected.len());
    assert_eq!(set.is_empty(), expected.is_empty());
    assert_eq!(set.first(), expected.first().copied());
    assert!(set.iter().eq(expected.iter().copied()));
    // Equal sets compare equal whatever their history
    let rebuilt: Bitset = expected.iter().copied().collect();
    assert_eq!(*set, rebuilt);
}

fn fuzz(ops: Vec<BitsetOperation>) {
    let mut set = Bitset::new();
    let mut expected = BTreeSet::new();
    for op in ops {
        match op {
            BitsetOperation::Insert(i) => {
                let i = (i % MAX_INDEX) as usize;
                set.insert(i);
                expected.insert(i);
            }
            BitsetOperation::Remove(i) => {
                let i = (i % MAX_INDEX) as usize;
                set.remove(i);
                expected.remove(&i);
            }
            BitsetOperation::Full(n) => {
                let n = (n % MAX_INDEX) as usize;
                set = Bitset::full(n);
                expected = (0..n).collect();
            }
            BitsetOperation::And(other) => {
                let (other, other_expected) = model(&other);
                set &= &other;
                expected = &expected & &other_expected;
            }
            BitsetOperation::Or(other) => {
                let (other, other_expected) = model(&other);
                set |= &other;
                expected = &expected | &other_expected;
            }
            BitsetOperation::Xor(other) => {
                let (other, other_expected) = model(&other);
                set ^= &other;
                expected = &expected ^ &other_expected;
            }
            BitsetOperation::Sub(other) => {
                let (other, other_expected) = model(&other);
                set -= &other;
                expected = &expected - &other_expected;
            }
            BitsetOperation::Subset(other) => {
                let (other, other_expected) = model(&other);
                assert_eq!(set.is_subset(&other), expected.is_subset(&other_expected));
            }
        }
        check(&set, &expected);
    }
}

fuzz_target!(|ops: Vec<BitsetOperation>| {
    fuzz(ops);
});
