//! Query filter builder.
//!
//! Turns typed search arguments into a [`FilterPlan`]: a conjunctive
//! predicate, an ordering and a pagination window. Building a plan is pure;
//! the plan can render itself into a `sqlx::QueryBuilder` or be evaluated
//! in memory against a [`Listing`].

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Postgres, QueryBuilder};

use crate::models::listing::{Listing, TextEnum};

// ── Fields and values ───────────────────────────────────────

/// Filterable / sortable columns of the `listing` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Address,
    SquareMeters,
    Bedrooms,
    Bathrooms,
    LifeQualityIndex,
    HasPorch,
    PoolType,
    BarbequeArea,
    ParkingSpace,
    Status,
    Currency,
    Price,
    CreatedAt,
    UpdatedAt,
    IsActive,
}

impl Field {
    pub fn column(self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Address => "address",
            Field::SquareMeters => "square_meters",
            Field::Bedrooms => "bedrooms",
            Field::Bathrooms => "bathrooms",
            Field::LifeQualityIndex => "life_quality_index",
            Field::HasPorch => "has_porch",
            Field::PoolType => "pool_type",
            Field::BarbequeArea => "barbeque_area",
            Field::ParkingSpace => "parking_space",
            Field::Status => "status",
            Field::Currency => "currency",
            Field::Price => "price",
            Field::CreatedAt => "created_at",
            Field::UpdatedAt => "updated_at",
            Field::IsActive => "is_active",
        }
    }

    /// Current value of this field on a listing; `None` is SQL NULL.
    pub fn value_of(self, listing: &Listing) -> Option<Value> {
        let v = match self {
            Field::Title => Value::Text(listing.title.clone()),
            Field::Address => Value::Text(listing.address.clone()),
            Field::SquareMeters => Value::SmallInt(listing.square_meters),
            Field::Bedrooms => Value::SmallInt(listing.bedrooms),
            Field::Bathrooms => Value::SmallInt(listing.bathrooms),
            Field::LifeQualityIndex => Value::Decimal(listing.life_quality_index?),
            Field::HasPorch => Value::Bool(listing.has_porch),
            Field::PoolType => Value::Text(listing.pool_type.as_str().into()),
            Field::BarbequeArea => Value::Text(listing.barbeque_area.as_str().into()),
            Field::ParkingSpace => Value::Text(listing.parking_space.as_str().into()),
            Field::Status => Value::Text(listing.status.as_str().into()),
            Field::Currency => Value::Text(listing.currency.as_str().into()),
            Field::Price => Value::Decimal(listing.price),
            Field::CreatedAt => Value::Timestamp(listing.created_at),
            Field::UpdatedAt => Value::Timestamp(listing.updated_at),
            Field::IsActive => Value::Bool(listing.is_active),
        };
        Some(v)
    }
}

/// A typed constraint operand. Only same-variant values are compared.
#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub enum Value {
    SmallInt(i16),
    Decimal(Decimal),
    Bool(bool),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl Value {
    fn push_bind(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        match self {
            Value::SmallInt(n) => qb.push_bind(*n),
            Value::Decimal(d) => qb.push_bind(*d),
            Value::Bool(b) => qb.push_bind(*b),
            Value::Text(s) => qb.push_bind(s.clone()),
            Value::Timestamp(t) => qb.push_bind(*t),
        };
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// Case-sensitive substring match.
    Contains(String),
    /// Inclusive bounds; an absent bound is unconstrained.
    Range {
        min: Option<Value>,
        max: Option<Value>,
    },
    /// OR of exact matches.
    OneOf(Vec<Value>),
}

impl Constraint {
    /// SQL semantics: NULL never satisfies a constraint.
    pub fn matches(&self, value: Option<&Value>) -> bool {
        let Some(value) = value else {
            return false;
        };
        match self {
            Constraint::Contains(needle) => match value {
                Value::Text(s) => s.contains(needle.as_str()),
                _ => false,
            },
            Constraint::Range { min, max } => {
                min.as_ref().map_or(true, |m| value >= m) && max.as_ref().map_or(true, |m| value <= m)
            }
            Constraint::OneOf(values) => values.iter().any(|v| v == value),
        }
    }

    fn push_sql(&self, column: &str, qb: &mut QueryBuilder<'_, Postgres>) {
        match self {
            Constraint::Contains(needle) => {
                qb.push(column);
                qb.push(" LIKE ");
                qb.push_bind(format!("%{}%", escape_like(needle)));
                qb.push(" ESCAPE '\\'");
            }
            Constraint::Range { min, max } => {
                let mut sep = "(";
                if let Some(min) = min {
                    qb.push(sep).push(column).push(" >= ");
                    min.push_bind(qb);
                    sep = " AND ";
                }
                if let Some(max) = max {
                    qb.push(sep).push(column).push(" <= ");
                    max.push_bind(qb);
                    sep = " AND ";
                }
                if sep == "(" {
                    qb.push("(TRUE");
                }
                qb.push(")");
            }
            Constraint::OneOf(values) => {
                if values.is_empty() {
                    qb.push("FALSE");
                    return;
                }
                qb.push("(");
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        qb.push(" OR ");
                    }
                    qb.push(column).push(" = ");
                    v.push_bind(qb);
                }
                qb.push(")");
            }
        }
    }
}

/// Escape LIKE metacharacters so user input only ever matches literally.
pub fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

// ── Predicate ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    pub field: Field,
    pub constraint: Constraint,
}

/// Conjunction of terms. Always starts with `is_active = true`.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    terms: Vec<Term>,
}

impl Predicate {
    pub fn active_only() -> Self {
        Self {
            terms: vec![Term {
                field: Field::IsActive,
                constraint: Constraint::OneOf(vec![Value::Bool(true)]),
            }],
        }
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    fn push(&mut self, field: Field, constraint: Constraint) {
        self.terms.push(Term { field, constraint });
    }

    /// Tighten (or create) the range term for `field`.
    fn narrow_range(&mut self, field: Field, lower: Option<Value>, upper: Option<Value>) {
        let existing = self
            .terms
            .iter_mut()
            .filter(|t| t.field == field)
            .find_map(|t| match &mut t.constraint {
                Constraint::Range { min, max } => Some((min, max)),
                _ => None,
            });
        match existing {
            Some((min, max)) => {
                if lower.is_some() {
                    *min = lower;
                }
                if upper.is_some() {
                    *max = upper;
                }
            }
            None => self.push(
                field,
                Constraint::Range {
                    min: lower,
                    max: upper,
                },
            ),
        }
    }

    pub fn matches(&self, listing: &Listing) -> bool {
        self.terms
            .iter()
            .all(|t| t.constraint.matches(t.field.value_of(listing).as_ref()))
    }

    pub fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" WHERE ");
        for (i, term) in self.terms.iter().enumerate() {
            if i > 0 {
                qb.push(" AND ");
            }
            term.constraint.push_sql(term.field.column(), qb);
        }
    }
}

// ── Ordering and pagination ─────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Title,
    Address,
    SquareMeters,
    Bedrooms,
    Bathrooms,
    LifeQualityIndex,
    HasPorch,
    Price,
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    pub const ALL: [SortField; 10] = [
        SortField::Title,
        SortField::Address,
        SortField::SquareMeters,
        SortField::Bedrooms,
        SortField::Bathrooms,
        SortField::LifeQualityIndex,
        SortField::HasPorch,
        SortField::Price,
        SortField::CreatedAt,
        SortField::UpdatedAt,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SortField::Title => "title",
            SortField::Address => "address",
            SortField::SquareMeters => "squareMeters",
            SortField::Bedrooms => "bedrooms",
            SortField::Bathrooms => "bathrooms",
            SortField::LifeQualityIndex => "lifeQualityIndex",
            SortField::HasPorch => "hasPorch",
            SortField::Price => "price",
            SortField::CreatedAt => "createdAt",
            SortField::UpdatedAt => "updatedAt",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    pub fn field(self) -> Field {
        match self {
            SortField::Title => Field::Title,
            SortField::Address => Field::Address,
            SortField::SquareMeters => Field::SquareMeters,
            SortField::Bedrooms => Field::Bedrooms,
            SortField::Bathrooms => Field::Bathrooms,
            SortField::LifeQualityIndex => Field::LifeQualityIndex,
            SortField::HasPorch => Field::HasPorch,
            SortField::Price => Field::Price,
            SortField::CreatedAt => Field::CreatedAt,
            SortField::UpdatedAt => Field::UpdatedAt,
        }
    }

    /// Comma-separated allow-list for validation messages.
    pub fn allowed() -> String {
        let names: Vec<&str> = Self::ALL.iter().map(|f| f.name()).collect();
        format!("[{}]", names.join(", "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl OrderDirection {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "asc" => Some(OrderDirection::Asc),
            "desc" => Some(OrderDirection::Desc),
            _ => None,
        }
    }

    fn sql(self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderSpec {
    pub field: SortField,
    pub direction: OrderDirection,
}

impl Default for OrderSpec {
    fn default() -> Self {
        Self {
            field: SortField::CreatedAt,
            direction: OrderDirection::Desc,
        }
    }
}

impl OrderSpec {
    /// Ties are broken by `id` in the same direction so pages are stable.
    pub fn push_order_by(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        let dir = self.direction.sql();
        qb.push(format!(
            " ORDER BY {} {}, id {}",
            self.field.field().column(),
            dir,
            dir
        ));
    }

    /// In-memory equivalent of [`push_order_by`](Self::push_order_by).
    /// NULL sorts as the largest value, as in PostgreSQL.
    pub fn compare(&self, a: &Listing, b: &Listing) -> Ordering {
        let field = self.field.field();
        let ord = match (field.value_of(a), field.value_of(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (None, None) => Ordering::Equal,
        }
        .then(a.id.cmp(&b.id));
        match self.direction {
            OrderDirection::Asc => ord,
            OrderDirection::Desc => ord.reverse(),
        }
    }
}

/// Configured page size bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default_limit: i64,
    pub max_limit: i64,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub limit: i64,
    pub offset: i64,
}

impl Window {
    pub fn push_limit(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" LIMIT ").push_bind(self.limit);
        qb.push(" OFFSET ").push_bind(self.offset);
    }
}

/// Ordering and paging parameters as they arrive from the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub order_by: Option<String>,
    pub order_direction: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

// ── Filter keys ─────────────────────────────────────────────

/// How a filter key constrains its field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Substring,
    Min,
    Max,
    Exact,
    AnyOf,
}

/// The fixed set of recognised search parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FilterKey {
    TitleLike,
    AddressLike,
    MinSquareMeters,
    MaxSquareMeters,
    Bedrooms,
    MinBedrooms,
    MaxBedrooms,
    Bathrooms,
    MinBathrooms,
    MaxBathrooms,
    MinLifeQualityIndex,
    MaxLifeQualityIndex,
    HasPorch,
    PoolType,
    BarbequeArea,
    ParkingSpace,
    MinCreatedAt,
    MaxCreatedAt,
    MinUpdatedAt,
    MaxUpdatedAt,
    Status,
    Currency,
    MinPrice,
    MaxPrice,
}

impl FilterKey {
    pub const ALL: [FilterKey; 24] = [
        FilterKey::TitleLike,
        FilterKey::AddressLike,
        FilterKey::MinSquareMeters,
        FilterKey::MaxSquareMeters,
        FilterKey::Bedrooms,
        FilterKey::MinBedrooms,
        FilterKey::MaxBedrooms,
        FilterKey::Bathrooms,
        FilterKey::MinBathrooms,
        FilterKey::MaxBathrooms,
        FilterKey::MinLifeQualityIndex,
        FilterKey::MaxLifeQualityIndex,
        FilterKey::HasPorch,
        FilterKey::PoolType,
        FilterKey::BarbequeArea,
        FilterKey::ParkingSpace,
        FilterKey::MinCreatedAt,
        FilterKey::MaxCreatedAt,
        FilterKey::MinUpdatedAt,
        FilterKey::MaxUpdatedAt,
        FilterKey::Status,
        FilterKey::Currency,
        FilterKey::MinPrice,
        FilterKey::MaxPrice,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FilterKey::TitleLike => "titleLike",
            FilterKey::AddressLike => "addressLike",
            FilterKey::MinSquareMeters => "minSquareMeters",
            FilterKey::MaxSquareMeters => "maxSquareMeters",
            FilterKey::Bedrooms => "bedrooms",
            FilterKey::MinBedrooms => "minBedrooms",
            FilterKey::MaxBedrooms => "maxBedrooms",
            FilterKey::Bathrooms => "bathrooms",
            FilterKey::MinBathrooms => "minBathrooms",
            FilterKey::MaxBathrooms => "maxBathrooms",
            FilterKey::MinLifeQualityIndex => "minLifeQualityIndex",
            FilterKey::MaxLifeQualityIndex => "maxLifeQualityIndex",
            FilterKey::HasPorch => "hasPorch",
            FilterKey::PoolType => "poolType",
            FilterKey::BarbequeArea => "barbequeArea",
            FilterKey::ParkingSpace => "parkingSpace",
            FilterKey::MinCreatedAt => "minCreatedAt",
            FilterKey::MaxCreatedAt => "maxCreatedAt",
            FilterKey::MinUpdatedAt => "minUpdatedAt",
            FilterKey::MaxUpdatedAt => "maxUpdatedAt",
            FilterKey::Status => "status",
            FilterKey::Currency => "currency",
            FilterKey::MinPrice => "minPrice",
            FilterKey::MaxPrice => "maxPrice",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    pub fn field(self) -> Field {
        match self {
            FilterKey::TitleLike => Field::Title,
            FilterKey::AddressLike => Field::Address,
            FilterKey::MinSquareMeters | FilterKey::MaxSquareMeters => Field::SquareMeters,
            FilterKey::Bedrooms | FilterKey::MinBedrooms | FilterKey::MaxBedrooms => Field::Bedrooms,
            FilterKey::Bathrooms | FilterKey::MinBathrooms | FilterKey::MaxBathrooms => {
                Field::Bathrooms
            }
            FilterKey::MinLifeQualityIndex | FilterKey::MaxLifeQualityIndex => {
                Field::LifeQualityIndex
            }
            FilterKey::HasPorch => Field::HasPorch,
            FilterKey::PoolType => Field::PoolType,
            FilterKey::BarbequeArea => Field::BarbequeArea,
            FilterKey::ParkingSpace => Field::ParkingSpace,
            FilterKey::MinCreatedAt | FilterKey::MaxCreatedAt => Field::CreatedAt,
            FilterKey::MinUpdatedAt | FilterKey::MaxUpdatedAt => Field::UpdatedAt,
            FilterKey::Status => Field::Status,
            FilterKey::Currency => Field::Currency,
            FilterKey::MinPrice | FilterKey::MaxPrice => Field::Price,
        }
    }

    pub fn kind(self) -> KeyKind {
        match self {
            FilterKey::TitleLike | FilterKey::AddressLike => KeyKind::Substring,
            FilterKey::MinSquareMeters
            | FilterKey::MinBedrooms
            | FilterKey::MinBathrooms
            | FilterKey::MinLifeQualityIndex
            | FilterKey::MinCreatedAt
            | FilterKey::MinUpdatedAt
            | FilterKey::MinPrice => KeyKind::Min,
            FilterKey::MaxSquareMeters
            | FilterKey::MaxBedrooms
            | FilterKey::MaxBathrooms
            | FilterKey::MaxLifeQualityIndex
            | FilterKey::MaxCreatedAt
            | FilterKey::MaxUpdatedAt
            | FilterKey::MaxPrice => KeyKind::Max,
            FilterKey::Bedrooms | FilterKey::Bathrooms => KeyKind::Exact,
            FilterKey::HasPorch
            | FilterKey::PoolType
            | FilterKey::BarbequeArea
            | FilterKey::ParkingSpace
            | FilterKey::Status
            | FilterKey::Currency => KeyKind::AnyOf,
        }
    }

    /// The opposite bound of a `min*`/`max*` key.
    pub fn counterpart(self) -> Option<FilterKey> {
        let (field, want) = match self.kind() {
            KeyKind::Min => (self.field(), KeyKind::Max),
            KeyKind::Max => (self.field(), KeyKind::Min),
            _ => return None,
        };
        Self::ALL
            .into_iter()
            .find(|k| k.field() == field && k.kind() == want)
    }
}

/// A parsed argument for one filter key.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterArg {
    Text(String),
    Scalar(Value),
    List(Vec<Value>),
}

pub type Filters = BTreeMap<FilterKey, FilterArg>;

// ── Plan ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct FilterPlan {
    pub predicate: Predicate,
    pub order: OrderSpec,
    pub window: Window,
}

/// Fold the recognised filter keys into a plan.
///
/// Inputs are expected to be validated already; anything that slips
/// through (unknown sort field, out-of-range limit) falls back to the
/// defaults rather than reaching the query.
pub fn build_filter(filters: &Filters, page: &PageRequest, limits: PageLimits) -> FilterPlan {
    let mut predicate = Predicate::active_only();

    for key in FilterKey::ALL {
        let Some(arg) = filters.get(&key) else {
            continue;
        };
        let field = key.field();
        match (key.kind(), arg) {
            (KeyKind::Substring, FilterArg::Text(s)) => {
                predicate.push(field, Constraint::Contains(s.clone()))
            }
            (KeyKind::Min, FilterArg::Scalar(v)) => predicate.narrow_range(field, Some(v.clone()), None),
            (KeyKind::Max, FilterArg::Scalar(v)) => predicate.narrow_range(field, None, Some(v.clone())),
            (KeyKind::Exact | KeyKind::AnyOf, FilterArg::Scalar(v)) => {
                predicate.push(field, Constraint::OneOf(vec![v.clone()]))
            }
            (KeyKind::AnyOf, FilterArg::List(values)) if !values.is_empty() => {
                predicate.push(field, Constraint::OneOf(values.clone()))
            }
            _ => tracing::warn!(key = key.name(), "ignoring filter argument of unexpected shape"),
        }
    }

    let field = match page.order_by.as_deref() {
        None => OrderSpec::default().field,
        Some(name) => SortField::from_name(name).unwrap_or_else(|| {
            tracing::warn!(order_by = name, "unknown sort field, using default");
            OrderSpec::default().field
        }),
    };
    let direction = page
        .order_direction
        .as_deref()
        .and_then(OrderDirection::parse)
        .unwrap_or(OrderSpec::default().direction);

    let window = Window {
        limit: page
            .limit
            .map(|l| l.clamp(1, limits.max_limit))
            .unwrap_or(limits.default_limit),
        offset: page.offset.unwrap_or(0).max(0),
    };

    FilterPlan {
        predicate,
        order: OrderSpec { field, direction },
        window,
    }
}

impl FilterPlan {
    /// `SELECT <columns> FROM listing WHERE … ORDER BY … LIMIT … OFFSET …`
    pub fn select_query(&self, columns: &str) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(format!("SELECT {} FROM listing", columns));
        self.predicate.push_where(&mut qb);
        self.order.push_order_by(&mut qb);
        self.window.push_limit(&mut qb);
        qb
    }

    /// `SELECT COUNT(*) FROM listing WHERE …`, ignoring order and window.
    pub fn count_query(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM listing");
        self.predicate.push_where(&mut qb);
        qb
    }
}
