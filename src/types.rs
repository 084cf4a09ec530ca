//! Core data types for catalog matching results

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::loader::{opt_string_or_number, string_or_number};

/// A single catalog entry
///
/// Field names are fixed; alternate spellings found in catalog exports are
/// folded into these fields once, at load time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    #[serde(
        rename = "OrderCode",
        alias = "orderCode",
        alias = "Order Code",
        alias = "order_code",
        default,
        deserialize_with = "string_or_number"
    )]
    pub order_code: String,
    #[serde(
        rename = "Barcode",
        alias = "BARCODE",
        alias = "barcode",
        default,
        deserialize_with = "opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub barcode: Option<String>,
    #[serde(
        rename = "Product Name",
        alias = "productName",
        alias = "ProductName",
        default
    )]
    pub product_name: String,
    #[serde(
        rename = "Description",
        alias = "Product Description",
        alias = "description",
        default
    )]
    pub description: String,
    /// Pass-through fields the matcher never reads
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ProductRecord {
    pub fn new(order_code: &str, product_name: &str) -> Self {
        Self {
            order_code: order_code.to_string(),
            barcode: None,
            product_name: product_name.to_string(),
            description: String::new(),
            extra: BTreeMap::new(),
        }
    }

    pub fn with_barcode(mut self, barcode: &str) -> Self {
        self.barcode = Some(barcode.to_string());
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }
}

/// Text recognized in one frame, with the frame's geometry
///
/// `width` and `height` are the dimensions of the source frame the
/// recognizer stamped onto each item, not the size of the text box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextObservation {
    pub text: String,
    #[serde(rename = "centerX")]
    pub center_x: f64,
    #[serde(rename = "centerY")]
    pub center_y: f64,
    pub width: f64,
    pub height: f64,
}

impl TextObservation {
    pub fn new(text: &str, center_x: f64, center_y: f64, width: f64, height: f64) -> Self {
        Self {
            text: text.to_string(),
            center_x,
            center_y,
            width,
            height,
        }
    }
}

/// Everything recognized in one frame
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "items")]
pub enum Observations {
    /// Observations carrying geometry
    #[serde(rename = "frame")]
    Frame(Vec<TextObservation>),
    /// Bare strings from older recognizers
    #[serde(rename = "legacy")]
    Legacy(Vec<String>),
}

impl Observations {
    pub fn is_empty(&self) -> bool {
        match self {
            Observations::Frame(items) => items.is_empty(),
            Observations::Legacy(items) => items.is_empty(),
        }
    }
}

/// Which rule produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchType {
    OrderCodeExact,
    OrderCodePartial,
    ProductNameFuzzy,
}

/// Qualitative confidence label; ordered so `High > Medium`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Medium,
    High,
}

/// A catalog product matched from one observation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub source_text: String,
    pub match_type: MatchType,
    pub confidence: Confidence,
    pub product: ProductRecord,
    /// Proximity of the observation to the frame's central region (0.0-1.0)
    pub center_score: f64,
}

impl MatchCandidate {
    pub fn new(
        source_text: String,
        match_type: MatchType,
        confidence: Confidence,
        product: ProductRecord,
        center_score: f64,
    ) -> Self {
        Self {
            source_text,
            match_type,
            confidence,
            product,
            center_score,
        }
    }

    pub fn order_code(&self) -> &str {
        &self.product.order_code
    }
}

/// Candidates sharing a family key, scored against the other families in the frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductFamily {
    pub key: String,
    pub members: Vec<MatchCandidate>,
    pub center_score: f64,
    pub frequency_score: f64,
    pub total_score: f64,
}

/// Result of resolving one frame
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Outcome {
    #[serde(rename = "resolved")]
    Resolved(Vec<MatchCandidate>),
    #[serde(rename = "needs_selection")]
    NeedsSelection(Vec<ProductFamily>),
}

impl Outcome {
    pub fn empty() -> Self {
        Outcome::Resolved(Vec::new())
    }
}

/// Result of a tolerant order code lookup
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyCodeMatch<'a> {
    pub product: &'a ProductRecord,
    pub distance: usize,
    pub confidence: Confidence,
    /// Normalized catalog code that matched
    pub matched_code: String,
}

/// One product reached through a fuzzy "WORD NUMBER" designator
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyNameMatch<'a> {
    pub product: &'a ProductRecord,
    pub distance: usize,
    /// Catalog family the designator matched, e.g. "ODESSA 922"
    pub matched_family: String,
    pub confidence: Confidence,
}

/// Correction suggestion for a misread order code
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarCode<'a> {
    pub code: String,
    pub product: &'a ProductRecord,
    pub distance: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_is_adjacently_tagged() {
        let json = serde_json::to_value(Outcome::empty()).unwrap();
        assert_eq!(json["type"], "resolved");
        assert!(json["data"].as_array().unwrap().is_empty());

        let json = serde_json::to_value(Outcome::NeedsSelection(Vec::new())).unwrap();
        assert_eq!(json["type"], "needs_selection");
    }

    #[test]
    fn test_observations_is_empty() {
        assert!(Observations::Frame(Vec::new()).is_empty());
        assert!(Observations::Legacy(Vec::new()).is_empty());
        assert!(!Observations::Legacy(vec!["191046".to_string()]).is_empty());
    }
}
