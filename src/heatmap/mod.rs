//! Clickmap and heatmap core: resolving recorded events against the page,
//! aggregating them per element and projecting positional samples.

pub mod aggregator;
pub mod capability;
pub mod filter;
pub mod model;
pub mod projector;
pub mod resolver;
