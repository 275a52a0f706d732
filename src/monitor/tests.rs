//! Tests for the state wait loop.

use std::time::Duration;

use crate::cloud::{VolumeRecord, VolumeStatus};
use crate::error::ConnectorError;
use crate::test_support::ScriptedVolumeApi;

use super::StateMonitor;

const TEN_GIB: u64 = 10 * 1024 * 1024 * 1024;
const ATTACH_TRANSITIONAL: &[VolumeStatus] =
    &[VolumeStatus::Available, VolumeStatus::Attaching];

fn record(status: VolumeStatus) -> VolumeRecord {
    VolumeRecord {
        id: String::from("vol-1"),
        size_bytes: TEN_GIB,
        status,
    }
}

fn monitor_for(api: &ScriptedVolumeApi, timeout_ms: u64) -> StateMonitor<'_> {
    StateMonitor::new(
        api,
        record(VolumeStatus::Available),
        VolumeStatus::InUse,
        ATTACH_TRANSITIONAL,
        Duration::from_millis(1),
        Duration::from_millis(timeout_ms),
    )
}

#[tokio::test]
async fn returns_record_once_target_is_reached() {
    let api = ScriptedVolumeApi::new();
    api.push_record(record(VolumeStatus::Available));
    api.push_record(record(VolumeStatus::Attaching));
    api.push_record(record(VolumeStatus::InUse));

    let result = monitor_for(&api, 500).monitor().await;
    assert_eq!(result, Ok(record(VolumeStatus::InUse)));
    assert_eq!(api.get_count(), 3);
}

#[tokio::test]
async fn unexpected_status_fails_without_further_polling() {
    let api = ScriptedVolumeApi::new();
    api.push_record(record(VolumeStatus::Other(String::from("error"))));
    api.push_record(record(VolumeStatus::InUse));

    let result = monitor_for(&api, 500).monitor().await;
    assert_eq!(
        result,
        Err(ConnectorError::UnexpectedState {
            volume_id: String::from("vol-1"),
            status: VolumeStatus::Other(String::from("error")),
        })
    );
    assert_eq!(api.get_count(), 1);
}

#[tokio::test]
async fn times_out_while_still_transitional() {
    let api = ScriptedVolumeApi::new();
    api.push_record(record(VolumeStatus::Attaching));

    let result = monitor_for(&api, 10).monitor().await;
    assert!(matches!(
        result,
        Err(ConnectorError::WaitTimeout { volume_id, .. }) if volume_id == "vol-1"
    ));
}

#[tokio::test]
async fn fetch_failures_propagate_unchanged() {
    let api = ScriptedVolumeApi::new();
    api.push_get_error(crate::cloud::CloudApiError::Api {
        status: 500,
        message: String::from("boom"),
    });
    api.push_get_error(crate::cloud::CloudApiError::Api {
        status: 500,
        message: String::from("boom"),
    });

    let result = monitor_for(&api, 500).monitor().await;
    assert_eq!(
        result,
        Err(ConnectorError::Cloud(crate::cloud::CloudApiError::Api {
            status: 500,
            message: String::from("boom"),
        }))
    );
}
