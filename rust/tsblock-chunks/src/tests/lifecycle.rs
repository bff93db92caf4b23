use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use crate::{
    SeriesEntry, SlotIndex,
    tests::fixtures::{build_block, config, memory_segments, payload, small_pool, write_segment},
};

#[test]
fn test_pending_readers() {
    let segment = write_segment(0, vec![payload(0, 10)]);
    let block = build_block(
        memory_segments([segment.data]),
        config(64, 0),
        small_pool(),
        1,
    );
    assert_eq!(block.pending_readers(), 0);

    let first = block.chunk_reader();
    let second = block.chunk_reader();
    assert_eq!(block.pending_readers(), 2);

    first.close().unwrap();
    assert_eq!(block.pending_readers(), 1);
    drop(second);
    assert_eq!(block.pending_readers(), 0);

    // Returns at once when no reader is pending.
    block.wait_for_pending_readers();
}

#[test]
fn test_wait_for_pending_readers() {
    let segment = write_segment(0, vec![payload(0, 10)]);
    let block = build_block(
        memory_segments([segment.data]),
        config(64, 0),
        small_pool(),
        1,
    );
    let reader = block.chunk_reader();
    let closed = Arc::new(AtomicBool::new(false));

    let handle = {
        let closed = closed.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            closed.store(true, Ordering::SeqCst);
            reader.close().unwrap();
        })
    };
    block.wait_for_pending_readers();
    assert!(closed.load(Ordering::SeqCst));
    assert_eq!(block.pending_readers(), 0);
    handle.join().unwrap();
}

#[test]
fn test_close_returns_slabs() {
    let segment = write_segment(0, (0..8).map(|i| payload(i, 60)).collect());
    let pool = small_pool();
    let block = build_block(
        memory_segments([segment.data.clone()]),
        config(128, 0),
        pool.clone(),
        1,
    );

    let mut reader = block.chunk_reader();
    let output = vec![SeriesEntry::with_chunks(8)];
    for (i, (chunk_ref, _)) in segment.chunks.iter().enumerate() {
        reader.register(*chunk_ref, SlotIndex::new(0, i)).unwrap();
    }
    reader.load(&output).unwrap();
    assert!(pool.used_total() > 0);
    let pooled_before = pool.pooled_buffers();

    // Views still held by the caller keep their slabs out of the pool.
    reader.close().unwrap();
    assert_eq!(pool.used_total(), 0);
    assert_eq!(pool.pooled_buffers(), pooled_before);
    for (i, (_, payload)) in segment.chunks.iter().enumerate() {
        assert_eq!(output[0].chunk(i).unwrap().bytes().as_ref(), &payload[..]);
    }

    // Without outstanding views the slabs are reused.
    let mut reader = block.chunk_reader();
    let output = vec![SeriesEntry::with_chunks(8)];
    for (i, (chunk_ref, _)) in segment.chunks.iter().enumerate() {
        reader.register(*chunk_ref, SlotIndex::new(0, i)).unwrap();
    }
    reader.load(&output).unwrap();
    drop(output);
    drop(reader);
    assert_eq!(pool.used_total(), 0);
    assert!(pool.pooled_buffers() > pooled_before);
}

#[test]
fn test_stats_accumulate_across_loads() {
    let segment = write_segment(0, vec![payload(0, 10), payload(1, 20)]);
    let block = build_block(
        memory_segments([segment.data.clone()]),
        config(64, 0),
        small_pool(),
        1,
    );
    let mut reader = block.chunk_reader();
    let output = vec![SeriesEntry::with_chunks(2)];
    reader.register(segment.chunks[0].0, SlotIndex::new(0, 0)).unwrap();
    reader.load(&output).unwrap();
    reader.register(segment.chunks[1].0, SlotIndex::new(0, 1)).unwrap();
    reader.load(&output).unwrap();

    let stats = reader.stats();
    assert_eq!(stats.chunks_fetch_count, 2);
    assert_eq!(stats.chunks_touched, 2);
    assert_eq!(stats.chunks_touched_size_sum, 30);
}
