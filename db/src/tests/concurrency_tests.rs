//! Races on the `(user_id, date)` key, including across two connections to
//! one shared database file — the window a rolling deploy opens when both
//! the old and the new instance accept writes.

use chrono::{NaiveDate, TimeZone, Utc};
use futures::future::join_all;
use tempfile::TempDir;

use crate::models::attendance_session::{Arrival, Model as Session, SessionStoreError, Status};
use crate::models::teacher::Model as Teacher;
use crate::test_utils::{connect_file_db, setup_file_db};

fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 9, 8).unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_check_ins_commit_exactly_one_row() {
    let dir = TempDir::new().unwrap();
    let db = setup_file_db(&dir.path().join("attendance.db")).await;
    Teacher::create_or_update(&db, 21, None, "Teacher", None, None, "uz", false)
        .await
        .unwrap();

    let at = Utc.with_ymd_and_hms(2025, 9, 8, 3, 0, 0).unwrap();
    let attempts = (0..8).map(|_| {
        let db = db.clone();
        async move { Session::open(&db, 21, monday(), at, 41.2995, 69.2401, Arrival::OnTime, 0).await }
    });

    let results = join_all(attempts).await;
    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one racing check-in may win");
    for result in results {
        if let Err(err) = result {
            assert!(
                matches!(err, SessionStoreError::AlreadyOpen),
                "losers must observe the committed open session, got {err:?}"
            );
        }
    }

    let row = Session::find_for_day(&db, 21, monday()).await.unwrap();
    assert!(row.is_some_and(|r| r.status == Status::Open));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn dual_instance_race_is_decided_by_the_storage_engine() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("attendance.db");

    // Two pools over one file, standing in for the blue and green instances.
    let blue = setup_file_db(&path).await;
    let green = connect_file_db(&path).await;
    Teacher::create_or_update(&blue, 22, None, "Teacher", None, None, "uz", false)
        .await
        .unwrap();

    let at = Utc.with_ymd_and_hms(2025, 9, 8, 3, 0, 0).unwrap();
    let from_blue = {
        let db = blue.clone();
        async move { Session::open(&db, 22, monday(), at, 41.2995, 69.2401, Arrival::OnTime, 0).await }
    };
    let from_green = {
        let db = green.clone();
        async move { Session::open(&db, 22, monday(), at, 41.2995, 69.2401, Arrival::OnTime, 0).await }
    };

    let (blue_result, green_result) = tokio::join!(from_blue, from_green);
    let successes = [&blue_result, &green_result]
        .iter()
        .filter(|r| r.is_ok())
        .count();
    assert_eq!(successes, 1, "the unique index must pick a single winner");

    // Both instances observe the same committed state afterwards.
    let seen_by_blue = Session::find_for_day(&blue, 22, monday()).await.unwrap();
    let seen_by_green = Session::find_for_day(&green, 22, monday()).await.unwrap();
    assert_eq!(seen_by_blue, seen_by_green);
    assert!(seen_by_blue.unwrap().is_open());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn close_raced_from_the_other_instance_reports_already_closed() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("attendance.db");
    let blue = setup_file_db(&path).await;
    let green = connect_file_db(&path).await;
    Teacher::create_or_update(&blue, 23, None, "Teacher", None, None, "uz", false)
        .await
        .unwrap();

    let morning = Utc.with_ymd_and_hms(2025, 9, 8, 3, 0, 0).unwrap();
    let evening = Utc.with_ymd_and_hms(2025, 9, 8, 12, 0, 0).unwrap();
    Session::open(&blue, 23, monday(), morning, 41.2995, 69.2401, Arrival::OnTime, 0)
        .await
        .unwrap();

    // Green closes first; blue's retry of the same logical event must fail
    // with the conflict, never commit a second close.
    Session::close(&green, 23, monday(), evening, 41.2995, 69.2401)
        .await
        .unwrap();
    let raced = Session::close(&blue, 23, monday(), evening, 41.2995, 69.2401).await;
    assert!(matches!(raced, Err(SessionStoreError::AlreadyClosed)));
}

#[tokio::test]
async fn committed_transitions_survive_reconnect() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("attendance.db");

    {
        let db = setup_file_db(&path).await;
        Teacher::create_or_update(&db, 24, None, "Teacher", None, None, "uz", false)
            .await
            .unwrap();
        let at = Utc.with_ymd_and_hms(2025, 9, 8, 3, 0, 0).unwrap();
        Session::open(&db, 24, monday(), at, 41.2995, 69.2401, Arrival::OnTime, 0)
            .await
            .unwrap();
        db.close().await.unwrap();
    }

    // A fresh process sees everything that was acknowledged before it started.
    let db = connect_file_db(&path).await;
    let row = Session::find_for_day(&db, 24, monday()).await.unwrap();
    assert!(row.is_some_and(|r| r.is_open()));
}
