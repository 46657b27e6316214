//! Query-string DTO for listing search.

use rust_decimal::Decimal;
use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::models::listing::{AmenityProperty, Currency, ListingStatus, ParkingSpace, TextEnum};
use crate::search::filter::{
    FilterArg, FilterKey, Filters, KeyKind, OrderDirection, PageLimits, PageRequest, SortField,
    Value,
};
use crate::validation::{
    check, describe, invalid, iso_timestamp, life_quality_index, listing_price, parse_timestamp,
    whole_number, FieldError,
};

/// A validated search request: typed filter arguments plus paging.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchQuery {
    pub filters: Filters,
    pub page: PageRequest,
}

/// `GET /v1/real-estate-listing` query string.
///
/// Set-valued keys (`status`, `poolType`, ...) take a comma-separated list.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SearchParams {
    #[validate(length(min = 1, max = 255))]
    pub title_like: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub address_like: Option<String>,

    #[validate(custom(function = "whole_number"), range(min = 1.0, max = 32767.0))]
    pub min_square_meters: Option<f64>,
    #[validate(custom(function = "whole_number"), range(min = 1.0, max = 32767.0))]
    pub max_square_meters: Option<f64>,
    #[validate(custom(function = "whole_number"), range(min = 1.0, max = 32767.0))]
    pub bedrooms: Option<f64>,
    #[validate(custom(function = "whole_number"), range(min = 1.0, max = 32767.0))]
    pub min_bedrooms: Option<f64>,
    #[validate(custom(function = "whole_number"), range(min = 1.0, max = 32767.0))]
    pub max_bedrooms: Option<f64>,
    #[validate(custom(function = "whole_number"), range(min = 1.0, max = 32767.0))]
    pub bathrooms: Option<f64>,
    #[validate(custom(function = "whole_number"), range(min = 1.0, max = 32767.0))]
    pub min_bathrooms: Option<f64>,
    #[validate(custom(function = "whole_number"), range(min = 1.0, max = 32767.0))]
    pub max_bathrooms: Option<f64>,

    #[validate(custom(function = "life_quality_index"))]
    pub min_life_quality_index: Option<Decimal>,
    #[validate(custom(function = "life_quality_index"))]
    pub max_life_quality_index: Option<Decimal>,

    #[validate(custom(function = "bool_list"))]
    pub has_porch: Option<String>,
    #[validate(custom(function = "amenity_list"))]
    pub pool_type: Option<String>,
    #[validate(custom(function = "amenity_list"))]
    pub barbeque_area: Option<String>,
    #[validate(custom(function = "parking_list"))]
    pub parking_space: Option<String>,
    #[validate(custom(function = "status_list"))]
    pub status: Option<String>,
    #[validate(custom(function = "currency_list"))]
    pub currency: Option<String>,

    #[validate(custom(function = "iso_timestamp"))]
    pub min_created_at: Option<String>,
    #[validate(custom(function = "iso_timestamp"))]
    pub max_created_at: Option<String>,
    #[validate(custom(function = "iso_timestamp"))]
    pub min_updated_at: Option<String>,
    #[validate(custom(function = "iso_timestamp"))]
    pub max_updated_at: Option<String>,

    #[validate(custom(function = "listing_price"))]
    pub min_price: Option<Decimal>,
    #[validate(custom(function = "listing_price"))]
    pub max_price: Option<Decimal>,

    #[serde(alias = "order_by")]
    #[validate(custom(function = "sort_field"))]
    pub order_by: Option<String>,
    #[serde(alias = "order_direction")]
    #[validate(custom(function = "sort_direction"))]
    pub order_direction: Option<String>,
    #[validate(range(min = 1))]
    pub limit: Option<i64>,
    #[validate(range(min = 0))]
    pub offset: Option<i64>,
}

impl SearchParams {
    /// Validate and convert into typed filter arguments.
    pub fn into_query(self, limits: PageLimits) -> Result<SearchQuery, Vec<FieldError>> {
        let mut errors = check(&self).err().unwrap_or_default();
        if self.limit.is_some_and(|l| l > limits.max_limit) {
            errors.push(FieldError::new(
                "limit",
                format!("must be less than or equal to {}", limits.max_limit),
            ));
        }
        if !errors.is_empty() {
            return Err(errors);
        }

        let filters = self
            .filters()
            .map_err(|e| vec![FieldError::new("query", describe(&e))])?;
        let inverted = check_ranges(&filters);
        if !inverted.is_empty() {
            return Err(inverted);
        }

        Ok(SearchQuery {
            filters,
            page: PageRequest {
                order_by: self
                    .order_by
                    .as_deref()
                    .and_then(SortField::from_name)
                    .map(|f| f.name().to_string()),
                order_direction: self.order_direction,
                limit: self.limit,
                offset: self.offset,
            },
        })
    }

    fn filters(&self) -> Result<Filters, ValidationError> {
        let text = |v: &Option<String>| v.clone().map(FilterArg::Text);
        let small = |v: Option<f64>| v.map(|n| FilterArg::Scalar(Value::SmallInt(n as i16)));
        let decimal = |v: Option<Decimal>| v.map(|d| FilterArg::Scalar(Value::Decimal(d)));
        let timestamp = |v: &Option<String>| {
            v.as_deref()
                .map(parse_timestamp)
                .transpose()
                .map(|t| t.map(|t| FilterArg::Scalar(Value::Timestamp(t))))
        };
        let list = |v: &Option<String>, parse: fn(&str) -> Result<Vec<Value>, ValidationError>| {
            v.as_deref().map(parse).transpose().map(|l| l.map(FilterArg::List))
        };

        let entries = [
            (FilterKey::TitleLike, text(&self.title_like)),
            (FilterKey::AddressLike, text(&self.address_like)),
            (FilterKey::MinSquareMeters, small(self.min_square_meters)),
            (FilterKey::MaxSquareMeters, small(self.max_square_meters)),
            (FilterKey::Bedrooms, small(self.bedrooms)),
            (FilterKey::MinBedrooms, small(self.min_bedrooms)),
            (FilterKey::MaxBedrooms, small(self.max_bedrooms)),
            (FilterKey::Bathrooms, small(self.bathrooms)),
            (FilterKey::MinBathrooms, small(self.min_bathrooms)),
            (FilterKey::MaxBathrooms, small(self.max_bathrooms)),
            (FilterKey::MinLifeQualityIndex, decimal(self.min_life_quality_index)),
            (FilterKey::MaxLifeQualityIndex, decimal(self.max_life_quality_index)),
            (FilterKey::HasPorch, list(&self.has_porch, parse_bools)?),
            (FilterKey::PoolType, list(&self.pool_type, parse_texts::<AmenityProperty>)?),
            (FilterKey::BarbequeArea, list(&self.barbeque_area, parse_texts::<AmenityProperty>)?),
            (FilterKey::ParkingSpace, list(&self.parking_space, parse_texts::<ParkingSpace>)?),
            (FilterKey::MinCreatedAt, timestamp(&self.min_created_at)?),
            (FilterKey::MaxCreatedAt, timestamp(&self.max_created_at)?),
            (FilterKey::MinUpdatedAt, timestamp(&self.min_updated_at)?),
            (FilterKey::MaxUpdatedAt, timestamp(&self.max_updated_at)?),
            (FilterKey::Status, list(&self.status, parse_texts::<ListingStatus>)?),
            (FilterKey::Currency, list(&self.currency, parse_texts::<Currency>)?),
            (FilterKey::MinPrice, decimal(self.min_price)),
            (FilterKey::MaxPrice, decimal(self.max_price)),
        ];
        Ok(entries
            .into_iter()
            .filter_map(|(key, arg)| arg.map(|arg| (key, arg)))
            .collect())
    }
}

// ── Comma lists ─────────────────────────────────────────────

fn split_unique(raw: &str) -> Result<Vec<&str>, ValidationError> {
    let items: Vec<&str> = raw.split(',').collect();
    for (i, item) in items.iter().enumerate() {
        if items[..i].contains(item) {
            return Err(invalid("unique", "contains a duplicate value"));
        }
    }
    Ok(items)
}

fn parse_texts<T: TextEnum>(raw: &str) -> Result<Vec<Value>, ValidationError> {
    split_unique(raw)?
        .into_iter()
        .map(|item| {
            T::parse(item.trim())
                .map(|v| Value::Text(v.as_str().to_string()))
                .ok_or_else(|| invalid("one_of", format!("must be one of {}", T::allowed())))
        })
        .collect()
}

fn parse_bools(raw: &str) -> Result<Vec<Value>, ValidationError> {
    split_unique(raw)?
        .into_iter()
        .map(|item| match item.trim() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(invalid("boolean", "must be a boolean")),
        })
        .collect()
}

fn bool_list(raw: &str) -> Result<(), ValidationError> {
    parse_bools(raw).map(|_| ())
}

fn amenity_list(raw: &str) -> Result<(), ValidationError> {
    parse_texts::<AmenityProperty>(raw).map(|_| ())
}

fn parking_list(raw: &str) -> Result<(), ValidationError> {
    parse_texts::<ParkingSpace>(raw).map(|_| ())
}

fn status_list(raw: &str) -> Result<(), ValidationError> {
    parse_texts::<ListingStatus>(raw).map(|_| ())
}

fn currency_list(raw: &str) -> Result<(), ValidationError> {
    parse_texts::<Currency>(raw).map(|_| ())
}

fn sort_field(raw: &str) -> Result<(), ValidationError> {
    SortField::from_name(raw)
        .map(|_| ())
        .ok_or_else(|| invalid("one_of", format!("must be one of {}", SortField::allowed())))
}

fn sort_direction(raw: &str) -> Result<(), ValidationError> {
    OrderDirection::parse(raw)
        .map(|_| ())
        .ok_or_else(|| invalid("one_of", "must be one of [asc, desc]"))
}

/// Inverted ranges are rejected; equal bounds are a valid exact match.
fn check_ranges(filters: &Filters) -> Vec<FieldError> {
    let mut errors = Vec::new();
    for (key, arg) in filters {
        if key.kind() != KeyKind::Min {
            continue;
        }
        let Some(max_key) = key.counterpart() else {
            continue;
        };
        if let (FilterArg::Scalar(min), Some(FilterArg::Scalar(max))) = (arg, filters.get(&max_key)) {
            if min > max {
                errors.push(FieldError::new(
                    key.name(),
                    format!("must be less than or equal to ref:{}", max_key.name()),
                ));
            }
        }
    }
    errors
}
