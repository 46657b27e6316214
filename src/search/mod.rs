//! Listing search: raw parameter parsing and filter plan construction.

pub mod filter;
pub mod params;

pub use filter::{build_filter, FilterPlan, PageLimits};
pub use params::{SearchParams, SearchQuery};
