//! Configuration and time-slice tests for ringos-core

use ringos_core::{OsConfig, OsError, TimeSlice};

#[test]
fn test_config_builder() {
    let config = OsConfig::builder()
        .name("monitor")
        .tick_priority(3)
        .priority_bits(4)
        .build();

    assert_eq!(config.name, "monitor");
    assert_eq!(config.tick_priority, 3);
    assert_eq!(config.priority_bits, 4);
    assert_eq!(config.tick_priority_raw(), 0x30);
}

#[test]
fn test_config_default() {
    let config = OsConfig::default();
    assert_eq!(config, OsConfig::DEFAULT);
    assert_eq!(config.name, "ringos");
    assert_eq!(config.tick_priority_raw(), 0xE0);
}

#[test]
fn test_out_of_range_priority_clamps() {
    let config = OsConfig::builder().tick_priority(12).build();
    assert_eq!(config.tick_priority_raw(), 0xE0);
}

#[test]
fn test_slice_from_rate() {
    let slice = TimeSlice::from_rate(80_000_000, 1_000).unwrap();
    assert_eq!(slice.cycles(), 80_000);
    assert_eq!(slice.reload(), 79_999);

    assert_eq!(
        TimeSlice::from_rate(80_000_000, 1),
        Err(OsError::InvalidTimeSlice(80_000_000))
    );
    assert_eq!(TimeSlice::from_rate(16_000_000, 0), Err(OsError::InvalidTimeSlice(0)));
}
