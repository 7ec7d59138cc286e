//! Heatmap overlay engine.
//!
//! Reconciles recorded interaction events with the elements of a parsed
//! page and projects positional heatmap samples into screen space.

pub mod config;
pub mod dom;
pub mod engine;
pub mod heatmap;
pub mod net;
pub mod store;
