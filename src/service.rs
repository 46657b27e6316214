use std::sync::Arc;

use crate::models::listing::{Listing, ListingHistory, ListingPatch, NewListing, SearchResults};
use crate::search::{build_filter, PageLimits, SearchQuery};
use crate::store::ListingStore;

/// Listing use-cases on top of a [`ListingStore`].
#[derive(Clone)]
pub struct ListingService {
    store: Arc<dyn ListingStore>,
    limits: PageLimits,
}

impl ListingService {
    pub fn new(store: Arc<dyn ListingStore>, limits: PageLimits) -> Self {
        Self { store, limits }
    }

    pub fn limits(&self) -> PageLimits {
        self.limits
    }

    pub async fn search(&self, query: &SearchQuery) -> anyhow::Result<SearchResults> {
        let plan = build_filter(&query.filters, &query.page, self.limits);
        let (results, total) = self.store.search(&plan).await?;
        Ok(SearchResults { results, total })
    }

    /// Soft-deleted listings are reported as absent.
    pub async fn get(&self, id: i32) -> anyhow::Result<Option<Listing>> {
        match self.store.get(id).await? {
            Some(listing) if listing.is_active => Ok(Some(listing)),
            Some(_) => {
                tracing::warn!(id, "attempted to read a deleted listing");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    pub async fn create(&self, new: &NewListing) -> anyhow::Result<Option<Listing>> {
        let created = self.store.create(new).await?;
        if let Some(listing) = &created {
            tracing::info!(id = listing.id, "listing created");
        }
        Ok(created)
    }

    pub async fn update(&self, id: i32, patch: &ListingPatch) -> anyhow::Result<bool> {
        let updated = self.store.update(id, patch).await?;
        if updated {
            tracing::info!(id, "listing updated");
        }
        Ok(updated)
    }

    pub async fn soft_delete(&self, id: i32) -> anyhow::Result<bool> {
        let deleted = self.store.soft_delete(id).await?;
        if deleted {
            tracing::info!(id, "listing deleted");
        }
        Ok(deleted)
    }

    pub async fn ping(&self) -> anyhow::Result<()> {
        self.store.ping().await
    }

    /// Status and price history of an active listing.
    pub async fn history(&self, id: i32) -> anyhow::Result<Option<ListingHistory>> {
        if self.get(id).await?.is_none() {
            return Ok(None);
        }
        Ok(Some(self.store.history(id).await?))
    }
}
