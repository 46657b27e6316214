use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Pool and barbeque-area availability.
#[derive(Debug, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum AmenityProperty {
    None,
    Own,
    Community,
}

#[derive(Debug, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum ParkingSpace {
    None,
    Driveway,
    Garage,
}

#[derive(Debug, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ListingStatus {
    OnSale,
    OnHold,
    Sold,
}

#[derive(Debug, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "varchar", rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Eur,
    Ars,
}

/// String-backed enums accepted on the wire and stored as `VARCHAR`.
pub trait TextEnum: Sized + Copy + 'static {
    const VARIANTS: &'static [Self];

    fn as_str(&self) -> &'static str;

    fn parse(s: &str) -> Option<Self> {
        Self::VARIANTS.iter().copied().find(|v| v.as_str() == s)
    }

    /// Human-readable list for validation messages, e.g. `[none, own, community]`.
    fn allowed() -> String {
        let names: Vec<&str> = Self::VARIANTS.iter().map(|v| v.as_str()).collect();
        format!("[{}]", names.join(", "))
    }
}

impl TextEnum for AmenityProperty {
    const VARIANTS: &'static [Self] = &[Self::None, Self::Own, Self::Community];

    fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Own => "own",
            Self::Community => "community",
        }
    }
}

impl TextEnum for ParkingSpace {
    const VARIANTS: &'static [Self] = &[Self::None, Self::Driveway, Self::Garage];

    fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Driveway => "driveway",
            Self::Garage => "garage",
        }
    }
}

impl TextEnum for ListingStatus {
    const VARIANTS: &'static [Self] = &[Self::OnSale, Self::OnHold, Self::Sold];

    fn as_str(&self) -> &'static str {
        match self {
            Self::OnSale => "ON_SALE",
            Self::OnHold => "ON_HOLD",
            Self::Sold => "SOLD",
        }
    }
}

impl TextEnum for Currency {
    const VARIANTS: &'static [Self] = &[Self::Usd, Self::Eur, Self::Ars];

    fn as_str(&self) -> &'static str {
        match self {
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Ars => "ARS",
        }
    }
}

/// A real-estate listing as stored in the `listing` table.
///
/// `is_active` is the soft-delete flag; it is never serialized to clients,
/// who only ever see active rows.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: i32,
    pub title: String,
    pub address: String,
    pub square_meters: i16,
    pub bedrooms: i16,
    pub bathrooms: i16,
    pub life_quality_index: Option<Decimal>,
    pub has_porch: bool,
    pub pool_type: AmenityProperty,
    pub barbeque_area: AmenityProperty,
    pub parking_space: ParkingSpace,
    #[serde(skip_serializing)]
    pub is_active: bool,
    pub status: ListingStatus,
    pub price: Decimal,
    pub currency: Currency,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Column list matching [`Listing`]'s `FromRow` layout.
pub const LISTING_COLUMNS: &str = "id, title, address, square_meters, bedrooms, bathrooms, \
     life_quality_index, has_porch, pool_type, barbeque_area, parking_space, is_active, \
     status, price, currency, created_at, updated_at";

/// Validated payload for creating a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct NewListing {
    pub title: String,
    pub address: String,
    pub square_meters: i16,
    pub bedrooms: i16,
    pub bathrooms: i16,
    pub life_quality_index: Option<Decimal>,
    pub has_porch: bool,
    pub pool_type: AmenityProperty,
    pub barbeque_area: AmenityProperty,
    pub parking_space: ParkingSpace,
    pub status: ListingStatus,
    pub price: Decimal,
    pub currency: Currency,
}

/// Validated partial update. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingPatch {
    pub title: Option<String>,
    pub address: Option<String>,
    pub square_meters: Option<i16>,
    pub bedrooms: Option<i16>,
    pub bathrooms: Option<i16>,
    pub life_quality_index: Option<Decimal>,
    pub has_porch: Option<bool>,
    pub pool_type: Option<AmenityProperty>,
    pub barbeque_area: Option<AmenityProperty>,
    pub parking_space: Option<ParkingSpace>,
    pub status: Option<ListingStatus>,
    pub price: Option<Decimal>,
    pub currency: Option<Currency>,
}

impl ListingPatch {
    /// Whether this update must append a price-history row.
    pub fn touches_price(&self) -> bool {
        self.price.is_some() || self.currency.is_some()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the patch to an in-memory copy of a listing.
    pub fn apply_to(&self, listing: &mut Listing) {
        if let Some(v) = &self.title {
            listing.title = v.clone();
        }
        if let Some(v) = &self.address {
            listing.address = v.clone();
        }
        if let Some(v) = self.square_meters {
            listing.square_meters = v;
        }
        if let Some(v) = self.bedrooms {
            listing.bedrooms = v;
        }
        if let Some(v) = self.bathrooms {
            listing.bathrooms = v;
        }
        if let Some(v) = self.life_quality_index {
            listing.life_quality_index = Some(v);
        }
        if let Some(v) = self.has_porch {
            listing.has_porch = v;
        }
        if let Some(v) = self.pool_type {
            listing.pool_type = v;
        }
        if let Some(v) = self.barbeque_area {
            listing.barbeque_area = v;
        }
        if let Some(v) = self.parking_space {
            listing.parking_space = v;
        }
        if let Some(v) = self.status {
            listing.status = v;
        }
        if let Some(v) = self.price {
            listing.price = v;
        }
        if let Some(v) = self.currency {
            listing.currency = v;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StatusHistoryEntry {
    pub id: i32,
    pub listing_id: i32,
    pub status: ListingStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PriceHistoryEntry {
    pub id: i32,
    pub listing_id: i32,
    pub price: Decimal,
    pub currency: Currency,
    pub created_at: DateTime<Utc>,
}

/// Status and price history of one listing, oldest first.
#[derive(Debug, Clone, Serialize)]
pub struct ListingHistory {
    pub status: Vec<StatusHistoryEntry>,
    pub price: Vec<PriceHistoryEntry>,
}

/// One page of search results plus the total number of matches.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub results: Vec<Listing>,
    pub total: i64,
}
