//! Route modules. Each exposes `routes()` with full paths relative to
//! `/api`.

pub mod assignments;
pub mod audit;
pub mod auth;
pub mod entities;
pub mod health;
pub mod reference;
pub mod role_exceptions;
pub mod roles;
pub mod screen_assets;
pub mod teams;
pub mod tenants;
pub mod transactions;
pub mod users;
