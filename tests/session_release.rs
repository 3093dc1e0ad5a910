mod common;

use chrono::NaiveDate;
use common::{credentials, MockPortal};
use courtbot::commands::{fetch_then_release, reserve_then_release};
use courtbot::error::Error;
use courtbot::reservation::{PollSettings, ReservationOutcome, ReservationRequest, ReservationStage};
use std::time::Duration;

fn request(max_attempts: u32) -> ReservationRequest {
    ReservationRequest {
        date: NaiveDate::from_ymd_opt(2024, 10, 5).unwrap(),
        candidates: vec!["8:00am".to_string()],
        duration_minutes: 60,
        poll: PollSettings {
            max_attempts,
            slot_timeout: Duration::from_millis(10),
            refresh_search: false,
        },
    }
}

#[tokio::test]
async fn test_session_released_after_booking() {
    let mut portal = MockPortal::new().with_slot("8:00am", 1);

    let outcome = reserve_then_release(&mut portal, &credentials(), &request(2))
        .await
        .unwrap();

    assert!(matches!(outcome, ReservationOutcome::Booked { .. }));
    assert!(portal.closed);
    assert_eq!(portal.calls.last().map(String::as_str), Some("close"));
}

#[tokio::test]
async fn test_session_released_when_no_slot_found() {
    let mut portal = MockPortal::new();

    let outcome = reserve_then_release(&mut portal, &credentials(), &request(2))
        .await
        .unwrap();

    assert_eq!(outcome, ReservationOutcome::NoSlotAvailable { attempts: 2 });
    assert!(portal.closed);
}

#[tokio::test]
async fn test_session_released_when_confirmation_fails() {
    let mut portal = MockPortal::new().with_slot("8:00am", 1).failing_on("confirm");

    let err = reserve_then_release(&mut portal, &credentials(), &request(2))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Stage {
            stage: ReservationStage::Confirmed,
            ..
        }
    ));
    assert!(portal.closed);
}

#[tokio::test]
async fn test_session_released_when_login_fails() {
    let mut booking = MockPortal::new().failing_on("login");
    let err = reserve_then_release(&mut booking, &credentials(), &request(2))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Stage {
            stage: ReservationStage::LoggedIn,
            ..
        }
    ));
    assert!(booking.closed);

    let mut reading = MockPortal::new().failing_on("login");
    assert!(fetch_then_release(&mut reading, &credentials()).await.is_err());
    assert!(reading.closed);
}

#[tokio::test]
async fn test_session_released_when_table_is_unreadable() {
    let mut portal = MockPortal::new().with_table("<p>Service unavailable</p>");

    let err = fetch_then_release(&mut portal, &credentials()).await.unwrap_err();

    assert!(matches!(err, Error::Parse(_)));
    assert!(portal.closed);
}

/// A failing close is logged and the run's own result is still returned
#[tokio::test]
async fn test_close_failure_does_not_mask_result() {
    let mut portal = MockPortal::new().failing_on("close");

    let rows = fetch_then_release(&mut portal, &credentials()).await.unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(portal.count_calls("close"), 1);
    assert!(!portal.closed);
}
