#![allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
//! Integration tests for the version store: listing, `latest` selection,
//! pinning and subversion allocation.

mod common;

use common::{InstanceBuilder, id};
use modfs_cli::config::ModSetting;
use modfs_cli::error::ModfsError;
use modfs_cli::mods::{
    Version, allocate_version, is_at_version_limit, latest_version, list_versions,
    resolve_active_version,
};

const TODAY: &str = "2024-03-05";

#[test]
fn latest_is_newest_date_then_highest_subversion() {
    let fx = InstanceBuilder::new()
        .with_version("skyui", "2023-12-24/00")
        .with_version("skyui", "2024-01-02/00")
        .with_version("skyui", "2024-01-02/01")
        .build();
    // An empty date bucket does not count.
    std::fs::create_dir_all(fx.path("mods/skyui/2024-02-01")).unwrap();

    let latest = latest_version(&fx.instance, &id("skyui")).unwrap();
    assert_eq!(latest, Some(Version::new("2024-01-02", 1)));

    let versions = list_versions(&fx.instance, &id("skyui")).unwrap();
    assert_eq!(versions.len(), 3);
    assert!(versions["2024-02-01"].is_empty());
}

#[test]
fn pinned_version_wins_over_latest() {
    let fx = InstanceBuilder::new()
        .with_version("skyui", "2024-01-02/00")
        .with_version("skyui", "2024-01-03/00")
        .with_setting("skyui", ModSetting::UseModVersion, "2024-01-02/00")
        .build();
    assert_eq!(
        resolve_active_version(&fx.instance, &id("skyui"), TODAY).unwrap(),
        Some(Version::new("2024-01-02", 0))
    );
}

#[test]
fn unknown_mod_is_not_found() {
    let fx = InstanceBuilder::new().build();
    let err = list_versions(&fx.instance, &id("ghost")).unwrap_err();
    assert!(matches!(err, ModfsError::NotFound { .. }));
}

#[test]
fn allocation_continues_after_the_highest_subversion() {
    let fx = InstanceBuilder::new()
        .with_version("skyui", &format!("{TODAY}/00"))
        .with_version("skyui", &format!("{TODAY}/04"))
        .build();
    let version = allocate_version(&fx.instance, &id("skyui"), TODAY).unwrap();
    assert_eq!(version.to_string(), format!("{TODAY}/05"));
    assert!(fx.path(&format!("mods/skyui/{TODAY}/05")).is_dir());
}

#[test]
fn allocation_for_a_new_mod_starts_at_zero() {
    let fx = InstanceBuilder::new().build();
    let version = allocate_version(&fx.instance, &id("fresh"), TODAY).unwrap();
    assert_eq!(version, Version::new(TODAY, 0));
    assert!(fx.path(&format!("mods/fresh/{TODAY}/00")).is_dir());
}

#[test]
fn full_day_is_resource_exhausted_and_untouched() {
    let fx = InstanceBuilder::new()
        .with_version("busy", &format!("{TODAY}/99"))
        .build();
    assert!(is_at_version_limit(&fx.instance, &id("busy"), TODAY).unwrap());

    let err = allocate_version(&fx.instance, &id("busy"), TODAY).unwrap_err();
    assert!(matches!(err, ModfsError::ResourceExhausted { .. }));
    let entries = std::fs::read_dir(fx.path(&format!("mods/busy/{TODAY}")))
        .unwrap()
        .count();
    assert_eq!(entries, 1);

    // Another day still has room.
    assert!(!is_at_version_limit(&fx.instance, &id("busy"), "2024-03-06").unwrap());
}
