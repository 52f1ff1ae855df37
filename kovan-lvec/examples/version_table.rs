//! Per-row version table for an optimistic store.
//!
//! Each row's version lives in one slot. Writers lock the row, bump its
//! version and release it in a single store; a reader snapshots every
//! version once the writers are done.

use kovan_lvec::{LockingVector, Packable};
use std::sync::Arc;
use std::thread;

/// Row version, stored shifted so bit 0 stays free for the lock.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
struct Version(u64);

impl Packable for Version {
    type Word = u64;

    fn into_word(self) -> u64 {
        self.0 << 1
    }

    fn from_word(word: u64) -> Self {
        Version(word >> 1)
    }
}

const ROWS: usize = 8;

fn main() {
    let versions = Arc::new(LockingVector::<Version>::new(ROWS));

    let writers: Vec<_> = (0..4)
        .map(|w| {
            let versions = versions.clone();
            thread::spawn(move || {
                for n in 0..1_000 {
                    let row = (w + n) % ROWS;
                    let mut slot = versions.lock_guard(row);
                    slot.0 += 1;
                }
            })
        })
        .collect();

    for w in writers {
        w.join().unwrap();
    }

    let snapshot = versions.to_vec_raw();
    for (row, version) in snapshot.iter().enumerate() {
        println!("row {}: version {}", row, version.0);
    }

    let total: u64 = snapshot.iter().map(|v| v.0).sum();
    assert_eq!(total, 4_000);
    println!("Example completed successfully!");
}
