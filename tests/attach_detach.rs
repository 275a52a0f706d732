//! Full attach/detach cycle through the public API.

use std::sync::Arc;

use camino::Utf8PathBuf;

use blocklink::test_support::{ScriptedExecutor, ScriptedInspector, ScriptedVolumeApi};
use blocklink::{
    AttachLock, ConnectOptions, ConnectorConfig, DeviceSnapshot, VolumeConnector, VolumeRecord,
    VolumeStatus,
};

const TWENTY_GIB: u64 = 20 * 1024 * 1024 * 1024;

fn record(status: VolumeStatus) -> VolumeRecord {
    VolumeRecord {
        id: String::from("vol-cache"),
        size_bytes: TWENTY_GIB,
        status,
    }
}

fn snapshot(paths: &[&str]) -> DeviceSnapshot {
    paths.iter().map(Utf8PathBuf::from).collect()
}

#[tokio::test]
async fn volume_round_trip_publishes_and_removes_the_link() {
    let api = Arc::new(ScriptedVolumeApi::new());
    let inspector = Arc::new(ScriptedInspector::new());
    let executor = Arc::new(ScriptedExecutor::new());

    let config = ConnectorConfig {
        host_id: Some(String::from("host-a")),
        volume_link_dir: String::from("/var/lib/blocklink/by-id"),
        state_poll_interval_ms: 1,
        state_wait_timeout_secs: 1,
        device_scan_interval_ms: 1,
        device_scan_timeout_secs: 1,
        ..ConnectorConfig::default()
    };
    let connector = VolumeConnector::new(
        Arc::clone(&api) as Arc<dyn blocklink::CloudVolumeApi>,
        Arc::clone(&inspector) as Arc<dyn blocklink::HostDeviceInspector>,
        Arc::clone(&executor) as Arc<dyn blocklink::ShellExecutor>,
        &config,
        AttachLock::new(&config.attach_lock_name),
    );

    // Attach: the volume moves available -> attaching -> in-use while vdc
    // shows up on the host.
    api.push_record(record(VolumeStatus::Attaching));
    api.push_record(record(VolumeStatus::InUse));
    inspector.push_scan(snapshot(&["/sys/block/vda"]));
    inspector.push_scan(snapshot(&["/sys/block/vda", "/sys/block/vdc"]));
    inspector.set_size("/sys/block/vdc", TWENTY_GIB);

    let attachment = match connector
        .connect_volume(&record(VolumeStatus::Available), &ConnectOptions::default())
        .await
    {
        Ok(attachment) => attachment,
        Err(err) => panic!("connect failed: {err}"),
    };
    assert_eq!(
        attachment.path,
        Utf8PathBuf::from("/var/lib/blocklink/by-id/vol-cache")
    );
    assert_eq!(attachment.device, Utf8PathBuf::from("/dev/vdc"));

    // Detach: re-fetch sees in-use, then the volume drains to available.
    api.push_record(record(VolumeStatus::InUse));
    api.push_record(record(VolumeStatus::Detaching));
    api.push_record(record(VolumeStatus::Available));

    let final_record = match connector
        .disconnect_volume(&record(VolumeStatus::InUse), &ConnectOptions::default())
        .await
    {
        Ok(final_record) => final_record,
        Err(err) => panic!("disconnect failed: {err}"),
    };
    assert_eq!(final_record.status, VolumeStatus::Available);

    let commands: Vec<String> = executor
        .invocations()
        .iter()
        .map(blocklink::test_support::ExecInvocation::command_string)
        .collect();
    assert_eq!(
        commands,
        vec![
            String::from("ln -s /dev/vdc /var/lib/blocklink/by-id/vol-cache"),
            String::from("rm -f /var/lib/blocklink/by-id/vol-cache"),
        ]
    );
}
