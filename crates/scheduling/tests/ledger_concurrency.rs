//! Racing reservations against the in-memory ledger.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use common::BookingId;
use scheduling::{AvailabilityLedger, InMemoryLedger, LedgerError, TimeWindow};

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2030, 6, 3).unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn identical_reservations_race_one_wins() {
    let ledger = Arc::new(InMemoryLedger::new());
    let window = TimeWindow::new(t(10, 0), t(11, 0)).unwrap();

    let mut handles = Vec::new();
    for _ in 0..32 {
        let ledger = ledger.clone();
        handles.push(tokio::spawn(async move {
            ledger.reserve(BookingId::new(), date(), window).await
        }));
    }

    let mut won = 0;
    let mut lost = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => won += 1,
            Err(LedgerError::SlotUnavailable { .. }) => lost += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(won, 1);
    assert_eq!(lost, 31);
    assert_eq!(ledger.query(date()).await.unwrap(), vec![window]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn staggered_overlapping_reservations_never_double_book() {
    let ledger = Arc::new(InMemoryLedger::new());

    // 60-minute windows starting every 15 minutes from 08:00 to 12:00
    let mut handles = Vec::new();
    for quarter in 0..16 {
        let ledger = ledger.clone();
        let start = t(8, 0) + chrono::Duration::minutes(15 * quarter);
        let window = TimeWindow::starting_at(start, 60).unwrap();
        handles.push(tokio::spawn(async move {
            ledger.reserve(BookingId::new(), date(), window).await
        }));
    }
    for handle in handles {
        let _ = handle.await.unwrap();
    }

    let committed = ledger.query(date()).await.unwrap();
    assert!(!committed.is_empty());
    for (i, a) in committed.iter().enumerate() {
        for b in committed.iter().skip(i + 1) {
            assert!(!a.overlaps(b), "{a} overlaps {b}");
        }
    }
}

#[tokio::test]
async fn released_window_can_be_taken_again() {
    let ledger = InMemoryLedger::new();
    let window = TimeWindow::new(t(13, 0), t(14, 0)).unwrap();

    let first = ledger.reserve(BookingId::new(), date(), window).await.unwrap();
    assert!(ledger.reserve(BookingId::new(), date(), window).await.is_err());

    ledger.release(first.id).await.unwrap();
    assert!(ledger.is_free(date(), window).await.unwrap());
    ledger.reserve(BookingId::new(), date(), window).await.unwrap();

    assert_eq!(ledger.records(date()).await.unwrap().len(), 2);
}
