//! divfolio-tracker: the caller side of the divfolio engine.
//!
//! Loads holdings from CSV and the dividend ledger from JSON, resolves
//! currency rates through an HTTP source with a file cache and a fixed
//! fallback, runs the engine, and persists edits with an audit trail.

pub mod audit;
pub mod commands;
pub mod config;
pub mod error;
pub mod rates;
pub mod store;
pub mod targets;
