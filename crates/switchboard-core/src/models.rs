//! Domain models for Switchboard.
//!
//! These are the core types shared across all crates.

pub mod assignment;
pub mod audit;
pub mod entity;
pub mod permission;
pub mod reference;
pub mod role;
pub mod role_exception;
pub mod screen_asset;
pub mod team;
pub mod tenant;
pub mod transaction;
pub mod user;

/// Deserializer for `Option<Option<T>>` fields: absent = `None`,
/// `null` = `Some(None)`, value = `Some(Some(v))`.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    serde::Deserialize::deserialize(deserializer).map(Some)
}
