//! Switchboard Core — domain models, the closed permission set and the
//! repository traits shared by every other crate.

pub mod error;
pub mod models;
pub mod repository;
pub mod validate;
