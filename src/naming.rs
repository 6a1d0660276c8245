//! Default property → column name inference
//!
//! The default mapping is a best-effort guess, so the rule is pluggable:
//! callers with other physical naming conventions supply their own
//! `NameNormalizer` to the `SchemaMapper`.

use lazy_static::lazy_static;
use regex::Regex;

/// Derives the physical column name a logical property is expected to have.
pub trait NameNormalizer: Send + Sync {
    fn column_name(&self, property_name: &str) -> String;
}

lazy_static! {
    static ref SEPARATORS: Regex = Regex::new(r"[\s\-]+").unwrap();
    static ref WORD_BOUNDARY: Regex = Regex::new(r"(.)([A-Z][a-z]+)").unwrap();
    static ref LOWER_UPPER: Regex = Regex::new(r"([a-z0-9])([A-Z])").unwrap();
    static ref UNDERSCORES: Regex = Regex::new(r"_+").unwrap();
}

/// Trim, collapse whitespace and camel case into snake_case, lower-case.
///
/// `"WarehouseLocation"` → `"warehouse_location"`, `"ShipmentID"` →
/// `"shipment_id"`, `"Risk  Score"` → `"risk_score"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnakeCaseNormalizer;

impl NameNormalizer for SnakeCaseNormalizer {
    fn column_name(&self, property_name: &str) -> String {
        to_snake_case(property_name)
    }
}

pub fn to_snake_case(name: &str) -> String {
    let s = SEPARATORS.replace_all(name.trim(), "_");
    let s = WORD_BOUNDARY.replace_all(&s, "${1}_${2}");
    let s = LOWER_UPPER.replace_all(&s, "${1}_${2}");
    let s = UNDERSCORES.replace_all(&s, "_");
    s.trim_matches('_').to_lowercase()
}

/// Identity mapping, for models whose columns already carry the logical names.
#[derive(Debug, Clone, Copy, Default)]
pub struct VerbatimNormalizer;

impl NameNormalizer for VerbatimNormalizer {
    fn column_name(&self, property_name: &str) -> String {
        property_name.trim().to_string()
    }
}

impl<F> NameNormalizer for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn column_name(&self, property_name: &str) -> String {
        self(property_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snake_case() {
        assert_eq!(to_snake_case("WarehouseLocation"), "warehouse_location");
        assert_eq!(to_snake_case("ShipmentID"), "shipment_id");
        assert_eq!(to_snake_case("WarehouseId"), "warehouse_id");
        assert_eq!(to_snake_case("  Risk   Score "), "risk_score");
        assert_eq!(to_snake_case("Risk Score"), "risk_score");
        assert_eq!(to_snake_case("status"), "status");
        assert_eq!(to_snake_case("order-date"), "order_date");
    }

    #[test]
    fn test_closure_normalizer() {
        let prefixed = |name: &str| format!("col_{}", to_snake_case(name));
        assert_eq!(prefixed.column_name("RiskScore"), "col_risk_score");
    }

    #[test]
    fn test_verbatim_normalizer() {
        assert_eq!(VerbatimNormalizer.column_name(" Location "), "Location");
    }
}
