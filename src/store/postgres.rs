use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::models::listing::{
    Currency, Listing, ListingHistory, ListingPatch, NewListing, PriceHistoryEntry,
    StatusHistoryEntry, LISTING_COLUMNS,
};
use crate::search::FilterPlan;
use crate::store::ListingStore;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(0)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Run pending migrations from the migrations/ directory.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl ListingStore for PgStore {
    async fn search(&self, plan: &FilterPlan) -> anyhow::Result<(Vec<Listing>, i64)> {
        let mut select = plan.select_query(LISTING_COLUMNS);
        let rows = select
            .build_query_as::<Listing>()
            .fetch_all(&self.pool)
            .await?;

        let mut count = plan.count_query();
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        Ok((rows, total))
    }

    async fn get(&self, id: i32) -> anyhow::Result<Option<Listing>> {
        let sql = format!("SELECT {} FROM listing WHERE id = $1", LISTING_COLUMNS);
        let row = sqlx::query_as::<_, Listing>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn create(&self, new: &NewListing) -> anyhow::Result<Option<Listing>> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"INSERT INTO listing (title, address, square_meters, bedrooms, bathrooms, life_quality_index,
                                    has_porch, pool_type, barbeque_area, parking_space, status, price, currency)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
               RETURNING {}"#,
            LISTING_COLUMNS
        );
        let inserted = sqlx::query_as::<_, Listing>(&sql)
            .bind(&new.title)
            .bind(&new.address)
            .bind(new.square_meters)
            .bind(new.bedrooms)
            .bind(new.bathrooms)
            .bind(new.life_quality_index)
            .bind(new.has_porch)
            .bind(new.pool_type)
            .bind(new.barbeque_area)
            .bind(new.parking_space)
            .bind(new.status)
            .bind(new.price)
            .bind(new.currency)
            .fetch_one(&mut *tx)
            .await;

        // Dropping `tx` on any early return rolls the transaction back.
        let listing = match inserted {
            Ok(listing) => listing,
            Err(e) if is_unique_violation(&e) => {
                tracing::warn!("create listing rejected: title or address already exists");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        sqlx::query("INSERT INTO listing_status_history (listing_id, status) VALUES ($1, $2)")
            .bind(listing.id)
            .bind(listing.status)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO listing_price_history (listing_id, price, currency) VALUES ($1, $2, $3)",
        )
        .bind(listing.id)
        .bind(listing.price)
        .bind(listing.currency)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(listing))
    }

    async fn update(&self, id: i32, patch: &ListingPatch) -> anyhow::Result<bool> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, (Decimal, Currency)>(
            r#"UPDATE listing
               SET title = COALESCE($1, title),
                   address = COALESCE($2, address),
                   square_meters = COALESCE($3, square_meters),
                   bedrooms = COALESCE($4, bedrooms),
                   bathrooms = COALESCE($5, bathrooms),
                   life_quality_index = COALESCE($6, life_quality_index),
                   has_porch = COALESCE($7, has_porch),
                   pool_type = COALESCE($8, pool_type),
                   barbeque_area = COALESCE($9, barbeque_area),
                   parking_space = COALESCE($10, parking_space),
                   status = COALESCE($11, status),
                   price = COALESCE($12, price),
                   currency = COALESCE($13, currency),
                   updated_at = NOW()
               WHERE id = $14 AND is_active = true
               RETURNING price, currency"#,
        )
        .bind(&patch.title)
        .bind(&patch.address)
        .bind(patch.square_meters)
        .bind(patch.bedrooms)
        .bind(patch.bathrooms)
        .bind(patch.life_quality_index)
        .bind(patch.has_porch)
        .bind(patch.pool_type)
        .bind(patch.barbeque_area)
        .bind(patch.parking_space)
        .bind(patch.status)
        .bind(patch.price)
        .bind(patch.currency)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await;

        let (price, currency) = match updated {
            Ok(Some(row)) => row,
            Ok(None) => return Ok(false),
            Err(e) if is_unique_violation(&e) => {
                tracing::warn!(id, "update listing rejected: title or address already exists");
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(status) = patch.status {
            sqlx::query("INSERT INTO listing_status_history (listing_id, status) VALUES ($1, $2)")
                .bind(id)
                .bind(status)
                .execute(&mut *tx)
                .await?;
        }

        if patch.touches_price() {
            sqlx::query(
                "INSERT INTO listing_price_history (listing_id, price, currency) VALUES ($1, $2, $3)",
            )
            .bind(id)
            .bind(price)
            .bind(currency)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn soft_delete(&self, id: i32) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "UPDATE listing SET is_active = false, updated_at = NOW() WHERE id = $1 AND is_active = true",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn history(&self, id: i32) -> anyhow::Result<ListingHistory> {
        let status = sqlx::query_as::<_, StatusHistoryEntry>(
            r#"SELECT id, listing_id, status, created_at
               FROM listing_status_history
               WHERE listing_id = $1
               ORDER BY id ASC"#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let price = sqlx::query_as::<_, PriceHistoryEntry>(
            r#"SELECT id, listing_id, price, currency, created_at
               FROM listing_price_history
               WHERE listing_id = $1
               ORDER BY id ASC"#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ListingHistory { status, price })
    }

    async fn ping(&self) -> anyhow::Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
