//! Cinema promotions core
//!
//! Status derivation, reconciliation and usage accounting for cinema
//! promotions, plus the client for the promotions REST API and the workflows
//! an administrator runs against it.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod commands;
pub mod config;
pub mod errors;
pub mod events;
pub mod models;
pub mod notifications;
pub mod queries;
pub mod services;
pub mod session;
pub mod store;

pub use errors::{ServiceError, ServiceResult};
pub use models::{Promotion, PromotionDraft, PromotionPatch, PromotionStatus};
pub use services::PromotionService;
pub use store::{HttpPromotionStore, InMemoryPromotionStore, PromotionStore};
