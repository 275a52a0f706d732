//! Tests for volume status parsing and display.

use rstest::rstest;

use super::VolumeStatus;

#[rstest]
#[case("available", VolumeStatus::Available)]
#[case("attaching", VolumeStatus::Attaching)]
#[case("in-use", VolumeStatus::InUse)]
#[case("detaching", VolumeStatus::Detaching)]
fn known_statuses_round_trip(#[case] raw: &str, #[case] expected: VolumeStatus) {
    assert_eq!(VolumeStatus::from(raw), expected);
    assert_eq!(expected.to_string(), raw);
}

#[rstest]
#[case("error")]
#[case("error_deleting")]
#[case("reserved")]
fn unknown_statuses_pass_through(#[case] raw: &str) {
    let status = VolumeStatus::from(raw);
    assert_eq!(status, VolumeStatus::Other(raw.to_owned()));
    assert_eq!(status.to_string(), raw);
}
