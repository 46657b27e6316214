//! Request DTOs and their validation.
//!
//! Bodies deserialize into `#[derive(Deserialize, Validate)]` structs. Serde
//! rejects unknown keys and wrongly typed values, `validator` checks bounds,
//! and both end up as [`FieldError`]s in a 400 response.

use std::borrow::Cow;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::models::listing::{
    AmenityProperty, Currency, ListingPatch, ListingStatus, NewListing, ParkingSpace,
};

pub const MAX_SAFE_INTEGER: i64 = 2147483647;
pub const MAX_LIFE_QUALITY_INDEX: Decimal = Decimal::TEN;
pub const MAX_DECIMAL_PLACES: u32 = 2;

/// 9999999999.99, the largest value a `NUMERIC(12, 2)` column holds.
pub fn max_safe_price() -> Decimal {
    Decimal::new(999_999_999_999, 2)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub path: Vec<String>,
    pub error: String,
}

impl FieldError {
    pub fn new(path: &str, error: impl Into<String>) -> Self {
        Self {
            path: vec![path.to_string()],
            error: error.into(),
        }
    }
}

// ── validator glue ──────────────────────────────────────────

/// Run a DTO's `validator` rules.
pub fn check<T: Validate>(value: &T) -> Result<(), Vec<FieldError>> {
    value.validate().map_err(|e| field_errors(&e))
}

/// Flatten `validator` output into wire-format errors, sorted by path.
pub fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut out: Vec<FieldError> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            let path = camel_case(&field);
            errs.iter()
                .map(move |e| FieldError::new(&path, describe(e)))
                .collect::<Vec<_>>()
        })
        .collect();
    out.sort_by(|a, b| a.path.cmp(&b.path));
    out
}

fn camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Joi-style message for a `validator` error.
pub(crate) fn describe(err: &ValidationError) -> String {
    if let Some(message) = &err.message {
        return message.to_string();
    }
    let param = |name: &str| err.params.get(name);
    match &*err.code {
        "range" => {
            let value = param("value").and_then(|v| v.as_f64());
            let min = param("min");
            match (value, min.and_then(|m| m.as_f64())) {
                (Some(v), Some(m)) if v < m => {
                    format!("must be greater than or equal to {}", number(min))
                }
                _ => format!("must be less than or equal to {}", number(param("max"))),
            }
        }
        "length" => {
            let len = param("value")
                .and_then(|v| v.as_str())
                .map(|s| s.chars().count() as u64);
            let min = param("min").and_then(|v| v.as_u64());
            match (len, min) {
                (Some(0), _) => "is not allowed to be empty".into(),
                (Some(n), Some(m)) if n < m => {
                    format!("length must be at least {} characters long", m)
                }
                _ => format!(
                    "length must be less than or equal to {} characters long",
                    number(param("max"))
                ),
            }
        }
        code => code.to_string(),
    }
}

fn number(v: Option<&serde_json::Value>) -> String {
    match v.and_then(|v| v.as_f64()) {
        Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        Some(f) => f.to_string(),
        None => "the limit".into(),
    }
}

pub(crate) fn invalid(code: &'static str, message: impl Into<Cow<'static, str>>) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

// ── Custom rules ────────────────────────────────────────────

/// Integers may arrive as `3.0`; anything with a fraction is rejected.
pub fn whole_number(value: impl std::borrow::Borrow<f64>) -> Result<(), ValidationError> {
    let value = value.borrow();
    if !value.is_finite() {
        return Err(invalid("number", "must be a number"));
    }
    if value.fract() != 0.0 {
        return Err(invalid("integer", "must be an integer"));
    }
    Ok(())
}

fn money(value: &Decimal, max: Decimal) -> Result<(), ValidationError> {
    if value.normalize().scale() > MAX_DECIMAL_PLACES {
        return Err(invalid(
            "precision",
            format!("must have no more than {} decimal places", MAX_DECIMAL_PLACES),
        ));
    }
    if *value < Decimal::ZERO {
        return Err(invalid("range", "must be greater than or equal to 0"));
    }
    if *value > max {
        return Err(invalid("range", format!("must be less than or equal to {}", max)));
    }
    Ok(())
}

pub fn listing_price(value: &Decimal) -> Result<(), ValidationError> {
    money(value, max_safe_price())
}

pub fn life_quality_index(value: &Decimal) -> Result<(), ValidationError> {
    money(value, MAX_LIFE_QUALITY_INDEX)
}

/// ISO 8601 timestamp; a bare date means midnight UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, ValidationError> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| invalid("date", "must be in ISO 8601 date format"))
}

pub fn iso_timestamp(raw: &str) -> Result<(), ValidationError> {
    parse_timestamp(raw).map(|_| ())
}

/// `:id` path parameter of the listing routes.
pub fn parse_id(raw: &str) -> Result<i32, Vec<FieldError>> {
    let id_error = |e: ValidationError| vec![FieldError::new("id", describe(&e))];
    let n: f64 = raw
        .trim()
        .parse()
        .map_err(|_| id_error(invalid("number", "must be a number")))?;
    whole_number(&n).map_err(id_error)?;
    if n < 1.0 {
        return Err(id_error(invalid("range", "must be greater than or equal to 1")));
    }
    if n > MAX_SAFE_INTEGER as f64 {
        return Err(id_error(invalid(
            "range",
            format!("must be less than or equal to {}", MAX_SAFE_INTEGER),
        )));
    }
    Ok(n as i32)
}

// ── Listing bodies ──────────────────────────────────────────

/// Body of `POST /v1/real-estate-listing`. Every field except
/// `lifeQualityIndex` is required.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateListingBody {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(min = 1, max = 255))]
    pub address: String,
    #[validate(custom(function = "whole_number"), range(min = 1.0, max = 32767.0))]
    pub square_meters: f64,
    #[validate(custom(function = "whole_number"), range(min = 1.0, max = 32767.0))]
    pub bedrooms: f64,
    #[validate(custom(function = "whole_number"), range(min = 1.0, max = 32767.0))]
    pub bathrooms: f64,
    #[validate(custom(function = "crate::validation::life_quality_index"))]
    pub life_quality_index: Option<Decimal>,
    pub has_porch: bool,
    pub pool_type: AmenityProperty,
    pub barbeque_area: AmenityProperty,
    pub parking_space: ParkingSpace,
    pub status: ListingStatus,
    pub currency: Currency,
    #[validate(custom(function = "listing_price"))]
    pub price: Decimal,
}

impl CreateListingBody {
    pub fn into_listing(self) -> Result<NewListing, Vec<FieldError>> {
        check(&self)?;
        // Ranges are checked, so the casts are lossless.
        Ok(NewListing {
            title: self.title,
            address: self.address,
            square_meters: self.square_meters as i16,
            bedrooms: self.bedrooms as i16,
            bathrooms: self.bathrooms as i16,
            life_quality_index: self.life_quality_index,
            has_porch: self.has_porch,
            pool_type: self.pool_type,
            barbeque_area: self.barbeque_area,
            parking_space: self.parking_space,
            status: self.status,
            price: self.price,
            currency: self.currency,
        })
    }
}

/// Body of `PATCH /v1/real-estate-listing/:id`. At least one key is required.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateListingBody {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub address: Option<String>,
    #[validate(custom(function = "whole_number"), range(min = 1.0, max = 32767.0))]
    pub square_meters: Option<f64>,
    #[validate(custom(function = "whole_number"), range(min = 1.0, max = 32767.0))]
    pub bedrooms: Option<f64>,
    #[validate(custom(function = "whole_number"), range(min = 1.0, max = 32767.0))]
    pub bathrooms: Option<f64>,
    #[validate(custom(function = "crate::validation::life_quality_index"))]
    pub life_quality_index: Option<Decimal>,
    pub has_porch: Option<bool>,
    pub pool_type: Option<AmenityProperty>,
    pub barbeque_area: Option<AmenityProperty>,
    pub parking_space: Option<ParkingSpace>,
    pub status: Option<ListingStatus>,
    pub currency: Option<Currency>,
    #[validate(custom(function = "listing_price"))]
    pub price: Option<Decimal>,
}

impl UpdateListingBody {
    pub fn into_patch(self) -> Result<ListingPatch, Vec<FieldError>> {
        check(&self)?;
        let small = |v: Option<f64>| v.map(|n| n as i16);
        let patch = ListingPatch {
            title: self.title,
            address: self.address,
            square_meters: small(self.square_meters),
            bedrooms: small(self.bedrooms),
            bathrooms: small(self.bathrooms),
            life_quality_index: self.life_quality_index,
            has_porch: self.has_porch,
            pool_type: self.pool_type,
            barbeque_area: self.barbeque_area,
            parking_space: self.parking_space,
            status: self.status,
            price: self.price,
            currency: self.currency,
        };
        if patch.is_empty() {
            return Err(vec![FieldError::new("body", "must have at least 1 key")]);
        }
        Ok(patch)
    }
}
