//! Persistence collaborator for listings.
//!
//! `PgStore` is the production backend; `MemoryStore` backs tests and
//! local experiments with identical semantics.

use async_trait::async_trait;

use crate::models::listing::{Listing, ListingHistory, ListingPatch, NewListing};
use crate::search::FilterPlan;

pub mod memory;
pub mod postgres;

#[async_trait]
pub trait ListingStore: Send + Sync {
    /// One page of matching rows plus the total match count.
    async fn search(&self, plan: &FilterPlan) -> anyhow::Result<(Vec<Listing>, i64)>;

    /// Fetch by id regardless of `is_active`.
    async fn get(&self, id: i32) -> anyhow::Result<Option<Listing>>;

    /// Insert a listing with its first status and price history rows.
    /// `None` when the title or address is already taken.
    async fn create(&self, listing: &NewListing) -> anyhow::Result<Option<Listing>>;

    /// Update an active listing, appending history rows for status and
    /// price changes. `false` when nothing was updated.
    async fn update(&self, id: i32, patch: &ListingPatch) -> anyhow::Result<bool>;

    /// Mark an active listing inactive. `false` when nothing was updated.
    async fn soft_delete(&self, id: i32) -> anyhow::Result<bool>;

    /// Status and price history rows of a listing, oldest first.
    async fn history(&self, id: i32) -> anyhow::Result<ListingHistory>;

    /// Cheap round-trip used by the readiness probe.
    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
