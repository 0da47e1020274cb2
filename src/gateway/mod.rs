//! HTTP health checks for orchestrators. The relay itself talks to Telegram by
//! long polling and exposes no other HTTP surface.

pub mod health;

pub use health::{HealthState, router, serve};
