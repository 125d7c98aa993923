//! Tests for the ordered release buffer.

use std::sync::{Arc, Barrier};

use ebvcheck::dispatch::OrderedReleaseBuffer;
use ebvcheck::error::Error;
use ebvcheck::model::{Message, Seq};

fn line(s: &str) -> Message {
    Message::Line(s.to_string())
}

fn output(buffer: OrderedReleaseBuffer<Vec<u8>>) -> Vec<String> {
    String::from_utf8(buffer.into_inner())
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn skipped_gap_releases_buffered_successor() {
    let buffer = OrderedReleaseBuffer::new(Vec::new());

    buffer.submit(Seq(1), line("PASSED: pkgA")).unwrap();
    buffer.submit(Seq(3), line("FAILED: pkgC")).unwrap();
    assert_eq!(buffer.pending(), 1);
    buffer.submit(Seq(2), Message::Skip).unwrap();

    assert_eq!(buffer.pending(), 0);
    assert_eq!(buffer.next_to_release(), 3);
    assert_eq!(buffer.released(), 2);
    assert_eq!(buffer.skipped(), 1);
    assert_eq!(output(buffer), vec!["PASSED: pkgA", "FAILED: pkgC"]);
}

#[test]
fn skip_unblocks_without_further_action() {
    let buffer = OrderedReleaseBuffer::new(Vec::new());

    buffer.submit(Seq(2), line("second")).unwrap();
    assert_eq!(buffer.released(), 0);

    buffer.submit(Seq(1), Message::Skip).unwrap();
    assert_eq!(buffer.released(), 1);
    assert_eq!(output(buffer), vec!["second"]);
}

#[test]
fn early_arrivals_wait_for_the_gap() {
    let buffer = OrderedReleaseBuffer::new(Vec::new());

    buffer.submit(Seq(4), line("d")).unwrap();
    buffer.submit(Seq(2), line("b")).unwrap();
    buffer.submit(Seq(3), line("c")).unwrap();
    assert_eq!(buffer.next_to_release(), 0);
    assert_eq!(buffer.pending(), 3);

    buffer.submit(Seq(1), line("a")).unwrap();
    assert_eq!(buffer.next_to_release(), 4);
    assert_eq!(output(buffer), vec!["a", "b", "c", "d"]);
}

#[test]
fn drain_stops_at_next_gap() {
    let buffer = OrderedReleaseBuffer::new(Vec::new());

    buffer.submit(Seq(2), line("b")).unwrap();
    buffer.submit(Seq(5), line("e")).unwrap();
    buffer.submit(Seq(1), line("a")).unwrap();

    assert_eq!(buffer.next_to_release(), 2);
    assert_eq!(buffer.pending(), 1);
    assert_eq!(output(buffer), vec!["a", "b"]);
}

#[test]
fn long_contiguous_backlog_drains() {
    const N: u64 = 10_000;
    let buffer = OrderedReleaseBuffer::new(Vec::new());
    for seq in (2..=N).rev() {
        buffer.submit(Seq(seq), Message::Skip).unwrap();
    }
    buffer.submit(Seq(1), line("first")).unwrap();

    assert_eq!(buffer.next_to_release(), N);
    assert_eq!(buffer.skipped(), (N - 1) as usize);
    assert_eq!(output(buffer), vec!["first"]);
}

#[test]
fn resubmitting_a_released_sequence_is_out_of_range() {
    let buffer = OrderedReleaseBuffer::new(Vec::new());
    buffer.submit(Seq(1), line("a")).unwrap();

    match buffer.submit(Seq(1), line("again")) {
        Err(Error::OutOfRangeSequence { seq, next }) => {
            assert_eq!(seq, Seq(1));
            assert_eq!(next, 1);
        }
        other => panic!("expected OutOfRangeSequence, got {other:?}"),
    }
    assert_eq!(output(buffer), vec!["a"]);
}

#[test]
fn zero_and_double_pending_are_out_of_range() {
    let buffer = OrderedReleaseBuffer::new(Vec::new());
    assert!(matches!(
        buffer.submit(Seq(0), line("zero")),
        Err(Error::OutOfRangeSequence { .. })
    ));

    buffer.submit(Seq(3), line("c")).unwrap();
    assert!(matches!(
        buffer.submit(Seq(3), line("c again")),
        Err(Error::OutOfRangeSequence { .. })
    ));
    assert_eq!(buffer.pending(), 1);
}

#[test]
fn concurrent_submissions_release_in_sequence_order() {
    const N: u64 = 64;
    let buffer = Arc::new(OrderedReleaseBuffer::new(Vec::new()));
    let barrier = Arc::new(Barrier::new(N as usize));

    // 37 is coprime with 64, so this visits every sequence number once.
    let handles: Vec<_> = (0..N)
        .map(|i| {
            let seq = (i * 37) % N + 1;
            let buffer = Arc::clone(&buffer);
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                barrier.wait();
                let message = if seq % 5 == 0 {
                    Message::Skip
                } else {
                    Message::Line(format!("pkg-{seq:02}"))
                };
                buffer.submit(Seq(seq), message).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let buffer = Arc::try_unwrap(buffer).unwrap();
    let expected: Vec<String> = (1..=N)
        .filter(|seq| seq % 5 != 0)
        .map(|seq| format!("pkg-{seq:02}"))
        .collect();
    assert_eq!(output(buffer), expected);
}
