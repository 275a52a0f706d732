//! Tests for device snapshots and the sysfs inspector.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;

use super::{DeviceSnapshot, HostDeviceInspector, SysBlockInspector};

fn snapshot(paths: &[&str]) -> DeviceSnapshot {
    paths.iter().map(Utf8PathBuf::from).collect()
}

#[test]
fn appeared_since_returns_set_difference() {
    let before = snapshot(&["/sys/block/vda", "/sys/block/vdb"]);
    let after = snapshot(&["/sys/block/vda", "/sys/block/vdb", "/sys/block/vdc"]);
    assert_eq!(
        after.appeared_since(&before),
        vec![Utf8PathBuf::from("/sys/block/vdc")]
    );
    assert!(before.appeared_since(&after).is_empty());
    assert!(after.appeared_since(&after).is_empty());
}

fn synthetic_sysfs(devices: &[(&str, &str)]) -> TempDir {
    let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
    for (name, sectors) in devices {
        let dir = tmp.path().join("block").join(name);
        fs::create_dir_all(&dir).unwrap_or_else(|err| panic!("create {name}: {err}"));
        fs::write(dir.join("size"), format!("{sectors}\n"))
            .unwrap_or_else(|err| panic!("write size for {name}: {err}"));
    }
    tmp
}

fn open_inspector(tmp: &TempDir) -> SysBlockInspector {
    let Some(root) = Utf8Path::from_path(tmp.path()) else {
        panic!("tempdir path is not UTF-8");
    };
    match SysBlockInspector::open_at(root) {
        Ok(inspector) => inspector,
        Err(err) => panic!("open inspector: {err}"),
    }
}

#[test]
fn enumerate_reports_devices_under_sys_block() {
    let tmp = synthetic_sysfs(&[("vda", "41943040"), ("vdb", "1024")]);
    let inspector = open_inspector(&tmp);
    let scan = match inspector.enumerate() {
        Ok(scan) => scan,
        Err(err) => panic!("enumerate: {err}"),
    };
    assert_eq!(scan, snapshot(&["/sys/block/vda", "/sys/block/vdb"]));
}

#[test]
fn size_of_converts_sectors_to_bytes() {
    let tmp = synthetic_sysfs(&[("vda", "41943040")]);
    let inspector = open_inspector(&tmp);
    // 41943040 sectors of 512 bytes is exactly 20 GiB.
    assert_eq!(
        inspector.size_of(Utf8Path::new("/sys/block/vda")),
        Ok(20 * 1024 * 1024 * 1024)
    );
}

#[test]
fn size_of_unknown_device_fails() {
    let tmp = synthetic_sysfs(&[("vda", "1024")]);
    let inspector = open_inspector(&tmp);
    assert!(inspector.size_of(Utf8Path::new("/sys/block/nope")).is_err());
}

#[test]
fn size_of_rejects_garbage_sector_count() {
    let tmp = synthetic_sysfs(&[("vda", "not-a-number")]);
    let inspector = open_inspector(&tmp);
    let result = inspector.size_of(Utf8Path::new("/sys/block/vda"));
    let Err(err) = result else {
        panic!("expected a parse failure");
    };
    assert!(err.message.contains("invalid sector count"));
}
