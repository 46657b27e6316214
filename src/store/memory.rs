use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::models::listing::{
    Listing, ListingHistory, ListingPatch, NewListing, PriceHistoryEntry, StatusHistoryEntry,
};
use crate::search::FilterPlan;
use crate::store::ListingStore;

/// In-process listing store.
///
/// A single lock guards all three tables, so every write is atomic in the
/// same way a database transaction would be. Unique title/address and the
/// filter plan's NULL semantics match the PostgreSQL backend.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Tables>,
}

#[derive(Default)]
struct Tables {
    listings: Vec<Listing>,
    status_history: Vec<StatusHistoryEntry>,
    price_history: Vec<PriceHistoryEntry>,
}

impl Tables {
    fn conflicts(&self, id: Option<i32>, title: Option<&str>, address: Option<&str>) -> bool {
        self.listings.iter().any(|l| {
            Some(l.id) != id
                && (title == Some(l.title.as_str()) || address == Some(l.address.as_str()))
        })
    }

    fn append_status(&mut self, listing: &Listing) {
        let id = self.status_history.len() as i32 + 1;
        self.status_history.push(StatusHistoryEntry {
            id,
            listing_id: listing.id,
            status: listing.status,
            created_at: Utc::now(),
        });
    }

    fn append_price(&mut self, listing: &Listing) {
        let id = self.price_history.len() as i32 + 1;
        self.price_history.push(PriceHistoryEntry {
            id,
            listing_id: listing.id,
            price: listing.price,
            currency: listing.currency,
            created_at: Utc::now(),
        });
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ListingStore for MemoryStore {
    async fn search(&self, plan: &FilterPlan) -> anyhow::Result<(Vec<Listing>, i64)> {
        let tables = self.inner.lock().await;
        let mut matching: Vec<&Listing> = tables
            .listings
            .iter()
            .filter(|l| plan.predicate.matches(l))
            .collect();
        matching.sort_by(|a, b| plan.order.compare(a, b));

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(plan.window.offset as usize)
            .take(plan.window.limit as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn get(&self, id: i32) -> anyhow::Result<Option<Listing>> {
        let tables = self.inner.lock().await;
        Ok(tables.listings.iter().find(|l| l.id == id).cloned())
    }

    async fn create(&self, new: &NewListing) -> anyhow::Result<Option<Listing>> {
        let mut tables = self.inner.lock().await;
        if tables.conflicts(None, Some(&new.title), Some(&new.address)) {
            tracing::warn!("create listing rejected: title or address already exists");
            return Ok(None);
        }

        let now = Utc::now();
        let listing = Listing {
            id: tables.listings.len() as i32 + 1,
            title: new.title.clone(),
            address: new.address.clone(),
            square_meters: new.square_meters,
            bedrooms: new.bedrooms,
            bathrooms: new.bathrooms,
            life_quality_index: new.life_quality_index,
            has_porch: new.has_porch,
            pool_type: new.pool_type,
            barbeque_area: new.barbeque_area,
            parking_space: new.parking_space,
            is_active: true,
            status: new.status,
            price: new.price,
            currency: new.currency,
            created_at: now,
            updated_at: now,
        };
        tables.listings.push(listing.clone());
        tables.append_status(&listing);
        tables.append_price(&listing);
        Ok(Some(listing))
    }

    async fn update(&self, id: i32, patch: &ListingPatch) -> anyhow::Result<bool> {
        let mut tables = self.inner.lock().await;
        if tables.conflicts(Some(id), patch.title.as_deref(), patch.address.as_deref()) {
            tracing::warn!(id, "update listing rejected: title or address already exists");
            return Ok(false);
        }
        let Some(listing) = tables.listings.iter_mut().find(|l| l.id == id && l.is_active) else {
            return Ok(false);
        };
        patch.apply_to(listing);
        listing.updated_at = Utc::now();
        let listing = listing.clone();

        if patch.status.is_some() {
            tables.append_status(&listing);
        }
        if patch.touches_price() {
            tables.append_price(&listing);
        }
        Ok(true)
    }

    async fn soft_delete(&self, id: i32) -> anyhow::Result<bool> {
        let mut tables = self.inner.lock().await;
        match tables.listings.iter_mut().find(|l| l.id == id && l.is_active) {
            Some(listing) => {
                listing.is_active = false;
                listing.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn history(&self, id: i32) -> anyhow::Result<ListingHistory> {
        let tables = self.inner.lock().await;
        Ok(ListingHistory {
            status: tables
                .status_history
                .iter()
                .filter(|h| h.listing_id == id)
                .cloned()
                .collect(),
            price: tables
                .price_history
                .iter()
                .filter(|h| h.listing_id == id)
                .cloned()
                .collect(),
        })
    }
}
