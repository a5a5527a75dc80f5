//! Concurrent access to a single store.
//!
//! Many threads append and read through one Arc<Store>. Frames must never
//! interleave and every acknowledged offset must read back its own payload.

use rustlog_store::{FrameScanner, Store};
use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::TempDir;

const THREADS: usize = 8;
const PER_THREAD: usize = 200;

fn payload(thread: usize, seq: usize) -> Vec<u8> {
    // Varying lengths make interleaving show up as broken prefixes
    let body = format!("t{}-r{}-", thread, seq);
    body.repeat(1 + seq % 5).into_bytes()
}

#[test]
fn test_concurrent_appends_do_not_interleave() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("store.log");
    let store = Arc::new(Store::open_path(&path).unwrap());
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let mut acked = Vec::with_capacity(PER_THREAD);
                for seq in 0..PER_THREAD {
                    let data = payload(t, seq);
                    let (width, pos) = store.append(&data).expect("append failed");
                    assert_eq!(width, 8 + data.len() as u64);
                    acked.push((pos, data));
                }
                acked
            })
        })
        .collect();

    let mut acked = Vec::new();
    for handle in handles {
        acked.extend(handle.join().expect("writer thread panicked"));
    }

    // Offsets are unique and every one reads back its own payload
    let offsets: HashSet<u64> = acked.iter().map(|(pos, _)| *pos).collect();
    assert_eq!(offsets.len(), THREADS * PER_THREAD);
    for (pos, data) in &acked {
        assert_eq!(&store.read(*pos).unwrap(), data);
    }

    // Size is the sum of all frame widths
    let total: u64 = acked.iter().map(|(_, d)| 8 + d.len() as u64).sum();
    assert_eq!(store.size(), total);

    store.close().unwrap();

    // Sequential walk of the raw file reconstructs exactly the acked set
    let file = std::fs::File::open(&path).unwrap();
    let mut scanned: Vec<(u64, Vec<u8>)> = FrameScanner::new(&file)
        .map(|f| f.map(|f| (f.offset, f.payload)).expect("corrupt frame"))
        .collect();
    scanned.sort();
    acked.sort();
    assert_eq!(scanned, acked);
}

#[test]
fn test_concurrent_readers_and_writers() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(Store::open_path(dir.path().join("store.log")).unwrap());

    // Seed some records for readers to chase
    let seeded: Vec<(u64, Vec<u8>)> = (0..50)
        .map(|i| {
            let data = payload(99, i);
            let (_, pos) = store.append(&data).unwrap();
            (pos, data)
        })
        .collect();
    let seeded = Arc::new(seeded);

    let mut handles = Vec::new();

    for t in 0..THREADS / 2 {
        let store = Arc::clone(&store);
        handles.push(thread::spawn(move || {
            for seq in 0..PER_THREAD {
                let data = payload(t, seq);
                let (_, pos) = store.append(&data).unwrap();
                // Read-your-own-write, even while others keep appending
                assert_eq!(store.read(pos).unwrap(), data);
            }
        }));
    }

    for _ in 0..THREADS / 2 {
        let store = Arc::clone(&store);
        let seeded = Arc::clone(&seeded);
        handles.push(thread::spawn(move || {
            for round in 0..PER_THREAD {
                let (pos, data) = &seeded[round % seeded.len()];
                assert_eq!(&store.read(*pos).unwrap(), data);
            }
        }));
    }

    for handle in handles {
        handle.join().expect("thread panicked");
    }

    let frames = FrameScanner::new(&*store).count();
    assert_eq!(frames, 50 + (THREADS / 2) * PER_THREAD);
}
