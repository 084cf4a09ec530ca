//! Catalog field mapping
//!
//! Catalog exports spell the same column several ways ("OrderCode",
//! "Order Code", "orderCode") and sometimes store codes as numbers. This
//! module folds all of that into `ProductRecord` once, at load time.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

use crate::error::Result;
use crate::types::ProductRecord;

/// Parse a JSON array of loosely-keyed product objects
pub fn load_catalog_json(json: &str) -> Result<Vec<ProductRecord>> {
    let records: Vec<ProductRecord> = serde_json::from_str(json)?;
    let missing = records
        .iter()
        .filter(|r| r.order_code.trim().is_empty())
        .count();
    if missing > 0 {
        debug!("{} catalog records have no order code", missing);
    }
    info!("Loaded {} catalog records", records.len());
    Ok(records)
}

/// Read and parse a catalog JSON file
pub fn load_catalog_file(path: &Path) -> Result<Vec<ProductRecord>> {
    let content = std::fs::read_to_string(path)?;
    load_catalog_json(&content)
}

/// Accept a string or a number, yielding its string form
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    scalar_to_string(value).map_err(serde::de::Error::custom)
}

/// Like `string_or_number`, with blank values mapped to `None`
pub(crate) fn opt_string_or_number<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let text = scalar_to_string(value).map_err(serde::de::Error::custom)?;
    Ok((!text.trim().is_empty()).then_some(text))
}

fn scalar_to_string(value: Value) -> std::result::Result<String, String> {
    match value {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => match (n.as_u64(), n.as_i64(), n.as_f64()) {
            (Some(u), _, _) => Ok(u.to_string()),
            (None, Some(i), _) => Ok(i.to_string()),
            // Spreadsheet exports write integral codes as 191046.0
            (None, None, Some(f)) if f.fract() == 0.0 && f.abs() < 1e15 => {
                Ok(format!("{}", f as i64))
            }
            _ => Ok(n.to_string()),
        },
        other => Err(format!("expected a string or number, got {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MatcherError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_alternate_keys() {
        let json = r#"[
            {"OrderCode": "191046", "Product Name": "ODESSA 922 BASIN", "BARCODE": "5012345678900"},
            {"Order Code": 191047, "productName": "ODESSA 922 VANITY", "Description": "Vanity unit"},
            {"orderCode": 191048.0, "ProductName": "ODESSA 922 MIRROR", "Barcode": ""}
        ]"#;
        let records = load_catalog_json(json).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].order_code, "191046");
        assert_eq!(records[0].barcode.as_deref(), Some("5012345678900"));
        assert_eq!(records[1].order_code, "191047");
        assert_eq!(records[1].description, "Vanity unit");
        assert_eq!(records[2].order_code, "191048");
        assert_eq!(records[2].product_name, "ODESSA 922 MIRROR");
        assert!(records[2].barcode.is_none());
    }

    #[test]
    fn test_extra_fields_pass_through() {
        let json = r#"[{"OrderCode": "191046", "Price": 129.5, "Range": "Odessa"}]"#;
        let records = load_catalog_json(json).unwrap();

        assert_eq!(records[0].extra.get("Range"), Some(&Value::from("Odessa")));
        assert_eq!(records[0].extra.get("Price"), Some(&Value::from(129.5)));
        assert!(!records[0].extra.contains_key("OrderCode"));
    }

    #[test]
    fn test_missing_fields_default() {
        let records = load_catalog_json(r#"[{"Product Name": "LOOSE PART"}]"#).unwrap();
        assert_eq!(records[0].order_code, "");
        assert!(records[0].barcode.is_none());
    }

    #[test]
    fn test_malformed_json() {
        let result = load_catalog_json("{not json");
        assert!(matches!(result, Err(MatcherError::Json(_))));

        let result = load_catalog_json(r#"[{"OrderCode": ["191046"]}]"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_catalog_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, r#"[{{"OrderCode": "191046", "Product Name": "ODESSA 922 BASIN"}}]"#)
            .unwrap();

        let records = load_catalog_file(temp_file.path()).unwrap();
        assert_eq!(records.len(), 1);

        let missing = load_catalog_file(Path::new("/nonexistent/catalog.json"));
        assert!(matches!(missing, Err(MatcherError::Io(_))));
    }
}
