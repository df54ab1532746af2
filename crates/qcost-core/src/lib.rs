//! Core types and the cost composition engine for quality-cost records.
//!
//! This crate is deliberately free of database and I/O dependencies. It turns
//! a [`draft::CostDraft`] plus [`catalog::Catalogs`] into a validated
//! [`record::NewCostRecord`], and defines the [`store::CostStore`] boundary
//! that persists it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod aggregate;
pub mod allocation;
pub mod analytics;
pub mod catalog;
pub mod category;
pub mod draft;
pub mod engine;
pub mod error;
pub mod formula;
pub mod record;
pub mod report;
pub mod store;
pub mod submit;
pub mod validate;

pub use engine::{CostBreakdown, CostEngine, EngineConfig, Evaluation};
pub use error::{Error, ErrorKind, Result};
pub use submit::{SubmitTarget, submit};
