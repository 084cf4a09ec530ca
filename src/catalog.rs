//! Catalog index - constant-time product lookups plus bounded fuzzy search
//!
//! A `CatalogIndex` is built once from a full record list and never mutated
//! afterwards. Refreshing the catalog means building a new index and
//! publishing it through a `CatalogHandle`.

use ahash::{AHashMap, AHashSet};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::patterns::{
    catalog_designator, designators, is_order_code_format, normalize_for_match,
    significant_words, Designator,
};
use crate::similarity::{bounded_levenshtein, levenshtein};
use crate::types::{Confidence, FuzzyCodeMatch, FuzzyNameMatch, ProductRecord, SimilarCode};

/// Default edit distance tolerated by the fuzzy lookups
pub const DEFAULT_MAX_DISTANCE: usize = 1;
/// Edit distance tolerated when suggesting corrections
pub const SUGGESTION_MAX_DISTANCE: usize = 2;
/// Number of correction suggestions returned by default
pub const DEFAULT_SUGGESTION_LIMIT: usize = 3;

/// Shortest text `fuzzy_match_product_name` will consider
const MIN_FUZZY_NAME_LEN: usize = 5;

/// Order code lookups compare against codes starting with this prefix
const ORDER_CODE_PREFIX: &str = "19";

#[derive(Debug)]
struct CatalogFamily {
    designator: Designator,
    members: Vec<usize>,
}

/// Immutable lookup structures over one catalog snapshot
#[derive(Debug, Default)]
pub struct CatalogIndex {
    records: Vec<ProductRecord>,
    by_order_code: AHashMap<String, usize>,
    // Codes in first-insertion order, so fuzzy ties resolve deterministically
    order_codes: Vec<String>,
    by_barcode: AHashMap<String, usize>,
    by_name_exact: AHashMap<String, usize>,
    by_name_words: AHashMap<String, Vec<usize>>,
    match_names: Vec<String>,
    // First word of each punctuation-free name, for prefix lookups
    by_match_first_word: AHashMap<String, Vec<usize>>,
    families: Vec<CatalogFamily>,
    is_built: bool,
}

impl CatalogIndex {
    /// Build every index from the catalog
    ///
    /// An empty catalog produces an index that reports `is_ready() == false`.
    /// Records sharing a key overwrite earlier ones.
    pub fn build(records: Vec<ProductRecord>) -> Self {
        if records.is_empty() {
            warn!("CatalogIndex: empty catalog provided");
            return Self::default();
        }

        let started = Instant::now();
        let mut index = Self {
            match_names: Vec::with_capacity(records.len()),
            ..Self::default()
        };
        let mut family_slots: AHashMap<String, usize> = AHashMap::new();

        for (idx, record) in records.iter().enumerate() {
            let order_code = normalize_code(&record.order_code);
            if !order_code.is_empty() {
                if index.by_order_code.insert(order_code.clone(), idx).is_none() {
                    index.order_codes.push(order_code);
                }
            } else {
                debug!("CatalogIndex: record '{}' has no order code", record.product_name);
            }

            if let Some(barcode) = record.barcode.as_deref().map(str::trim) {
                if !barcode.is_empty() {
                    index.by_barcode.insert(barcode.to_string(), idx);
                }
            }

            let product_name = normalize_code(&record.product_name);
            let match_name = normalize_for_match(&product_name);
            if let Some(first) = match_name.split(' ').next().filter(|w| !w.is_empty()) {
                index
                    .by_match_first_word
                    .entry(first.to_string())
                    .or_default()
                    .push(idx);
            }
            index.match_names.push(match_name);
            if product_name.is_empty() {
                continue;
            }

            index.by_name_exact.insert(product_name.clone(), idx);
            for word in significant_words(&product_name) {
                let postings = index.by_name_words.entry(word).or_default();
                // Postings stay sorted and unique: records arrive in order
                if postings.last() != Some(&idx) {
                    postings.push(idx);
                }
            }

            if let Some(designator) = catalog_designator(&product_name) {
                let slot = *family_slots.entry(designator.key()).or_insert_with(|| {
                    index.families.push(CatalogFamily {
                        designator,
                        members: Vec::new(),
                    });
                    index.families.len() - 1
                });
                index.families[slot].members.push(idx);
            }
        }

        index.records = records;
        index.is_built = true;

        info!(
            "Catalog index built for {} products in {:.2}ms",
            index.records.len(),
            started.elapsed().as_secs_f64() * 1000.0
        );
        info!(
            "  order codes: {}, barcodes: {}, product names: {}, words: {}, families: {}",
            index.by_order_code.len(),
            index.by_barcode.len(),
            index.by_name_exact.len(),
            index.by_name_words.len(),
            index.families.len()
        );

        index
    }

    /// Whether the index was built from a non-empty catalog
    pub fn is_ready(&self) -> bool {
        self.is_built && !self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The records the index was built from, in input order
    pub fn records(&self) -> &[ProductRecord] {
        &self.records
    }

    pub fn get_by_order_code(&self, order_code: &str) -> Option<&ProductRecord> {
        self.by_order_code
            .get(&normalize_code(order_code))
            .map(|&idx| &self.records[idx])
    }

    pub fn get_by_barcode(&self, barcode: &str) -> Option<&ProductRecord> {
        self.by_barcode
            .get(barcode.trim())
            .map(|&idx| &self.records[idx])
    }

    pub fn get_by_name_exact(&self, name: &str) -> Option<&ProductRecord> {
        self.by_name_exact
            .get(&normalize_code(name))
            .map(|&idx| &self.records[idx])
    }

    /// Products whose name contains every significant word of `text`
    pub fn find_by_name_words(&self, text: &str) -> Vec<&ProductRecord> {
        self.word_matches(text)
            .into_iter()
            .map(|idx| &self.records[idx])
            .collect()
    }

    /// Products whose name starts with `text` at a word boundary
    ///
    /// Comparison uses the punctuation-free form of both sides, so short
    /// tokens ("LG 55") and hyphenated names ("ODESSA-922") match too.
    pub fn find_by_name_prefix(&self, text: &str) -> Vec<&ProductRecord> {
        let query = normalize_for_match(text);
        let Some(first) = query.split(' ').next().filter(|w| !w.is_empty()) else {
            return Vec::new();
        };
        let Some(postings) = self.by_match_first_word.get(first) else {
            return Vec::new();
        };

        postings
            .iter()
            .copied()
            .filter(|&idx| {
                let name = &self.match_names[idx];
                name.starts_with(&query)
                    && (name.len() == query.len() || name[query.len()..].starts_with(' '))
            })
            .map(|idx| &self.records[idx])
            .collect()
    }

    /// Tolerant order code lookup
    ///
    /// Exact hits return distance 0 with high confidence. Anything else is
    /// only attempted for `19` + four digit codes, against catalog codes of
    /// the same length and prefix.
    pub fn fuzzy_match_order_code(
        &self,
        code: &str,
        max_distance: usize,
    ) -> Option<FuzzyCodeMatch<'_>> {
        let normalized = normalize_code(code);
        if normalized.is_empty() {
            return None;
        }

        if let Some(&idx) = self.by_order_code.get(&normalized) {
            return Some(FuzzyCodeMatch {
                product: &self.records[idx],
                distance: 0,
                confidence: Confidence::High,
                matched_code: normalized,
            });
        }

        if !is_order_code_format(&normalized) {
            return None;
        }

        let mut best: Option<(usize, usize, &String)> = None;
        for candidate in &self.order_codes {
            if candidate.len() != normalized.len() || !candidate.starts_with(ORDER_CODE_PREFIX) {
                continue;
            }
            let Some(&idx) = self.by_order_code.get(candidate) else {
                continue;
            };

            let distance = levenshtein(&normalized, candidate);
            if distance <= max_distance && best.map_or(true, |(d, _, _)| distance < d) {
                best = Some((distance, idx, candidate));
            }
        }

        best.map(|(distance, idx, candidate)| FuzzyCodeMatch {
            product: &self.records[idx],
            distance,
            confidence: if distance == 0 {
                Confidence::High
            } else {
                Confidence::Medium
            },
            matched_code: candidate.clone(),
        })
    }

    /// Catalog codes close to a misread code, nearest first
    pub fn find_similar_order_codes(
        &self,
        code: &str,
        max_distance: usize,
        limit: usize,
    ) -> Vec<SimilarCode<'_>> {
        let normalized = normalize_code(code);
        if normalized.is_empty() {
            return Vec::new();
        }

        let mut results: Vec<SimilarCode<'_>> = self
            .order_codes
            .iter()
            .filter(|candidate| candidate.len() == normalized.len())
            .filter_map(|candidate| {
                let distance = bounded_levenshtein(&normalized, candidate, max_distance)?;
                let &idx = self.by_order_code.get(candidate)?;
                Some(SimilarCode {
                    code: candidate.clone(),
                    product: &self.records[idx],
                    distance,
                })
            })
            .collect();

        results.sort_by_key(|s| s.distance);
        results.truncate(limit);
        results
    }

    /// Products reached through a misread "WORD NUMBER" designator
    ///
    /// Only text containing a designator (e.g. "ODESA 922") is considered;
    /// single words match too many unrelated names. The number must match a
    /// catalog family exactly while the word may be off by `max_distance`
    /// edits. Every variant of a qualifying family is returned once.
    pub fn fuzzy_match_product_name(
        &self,
        text: &str,
        max_distance: usize,
    ) -> Vec<FuzzyNameMatch<'_>> {
        let normalized = text.trim().to_uppercase();
        if normalized.chars().count() < MIN_FUZZY_NAME_LEN {
            return Vec::new();
        }

        let patterns = designators(&normalized);
        if patterns.is_empty() {
            return Vec::new();
        }

        let mut results: Vec<FuzzyNameMatch<'_>> = Vec::new();
        let mut positions: AHashMap<usize, usize> = AHashMap::new();

        for pattern in &patterns {
            for family in &self.families {
                if family.designator.number != pattern.number {
                    continue;
                }

                let Some(distance) =
                    bounded_levenshtein(&pattern.name, &family.designator.name, max_distance)
                else {
                    continue;
                };

                for &idx in &family.members {
                    let found = FuzzyNameMatch {
                        product: &self.records[idx],
                        distance,
                        matched_family: family.designator.key(),
                        confidence: if distance == 0 {
                            Confidence::High
                        } else {
                            Confidence::Medium
                        },
                    };
                    match positions.get(&idx).copied() {
                        Some(pos) if results[pos].distance > distance => results[pos] = found,
                        Some(_) => {}
                        None => {
                            positions.insert(idx, results.len());
                            results.push(found);
                        }
                    }
                }
            }
        }

        debug!(
            "Fuzzy name matching: '{}' -> {} products",
            text,
            results.len()
        );
        results
    }

    /// Record indices matching every significant word, in catalog order
    fn word_matches(&self, text: &str) -> Vec<usize> {
        let words = significant_words(text);
        let Some((first, rest)) = words.split_first() else {
            return Vec::new();
        };

        let Some(seed) = self.by_name_words.get(first) else {
            return Vec::new();
        };

        let mut result = seed.clone();
        for word in rest {
            let Some(postings) = self.by_name_words.get(word) else {
                return Vec::new();
            };
            let postings: AHashSet<usize> = postings.iter().copied().collect();
            result.retain(|idx| postings.contains(idx));
            if result.is_empty() {
                break;
            }
        }
        result
    }
}

/// Shared slot holding the current index
///
/// Readers take an `Arc` snapshot and keep using it for the whole call, so
/// a concurrent rebuild never exposes a half-built index.
#[derive(Debug, Default)]
pub struct CatalogHandle {
    current: RwLock<Arc<CatalogIndex>>,
}

impl CatalogHandle {
    pub fn new(index: CatalogIndex) -> Self {
        Self {
            current: RwLock::new(Arc::new(index)),
        }
    }

    /// The index current at the time of the call
    pub fn snapshot(&self) -> Arc<CatalogIndex> {
        Arc::clone(&self.current.read())
    }

    /// Swap in a fully built index, returning the one it replaced
    pub fn publish(&self, index: CatalogIndex) -> Arc<CatalogIndex> {
        let next = Arc::new(index);
        std::mem::replace(&mut *self.current.write(), next)
    }

    /// Build a new index off-lock and publish it
    pub fn rebuild(&self, records: Vec<ProductRecord>) -> Arc<CatalogIndex> {
        let next = Arc::new(CatalogIndex::build(records));
        *self.current.write() = Arc::clone(&next);
        next
    }
}

fn normalize_code(value: &str) -> String {
    value.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn sample_catalog() -> Vec<ProductRecord> {
        vec![
            ProductRecord::new("191046", "ODESSA 922 BASIN").with_barcode("5012345678900"),
            ProductRecord::new("191047", "ODESSA 922 VANITY"),
            ProductRecord::new("191234", "AURORA 530 TAP"),
            ProductRecord::new("192000", "LIMNI 720 MIRROR"),
            ProductRecord::new(" 193333 ", "Spares Kit, Chrome"),
        ]
    }

    #[test]
    fn test_every_order_code_is_retrievable() {
        let catalog = sample_catalog();
        let index = CatalogIndex::build(catalog.clone());

        assert!(index.is_ready());
        for record in &catalog {
            let found = index.get_by_order_code(&record.order_code.trim().to_uppercase());
            assert_eq!(found, Some(record));
        }
    }

    #[test]
    fn test_lookups_normalize_queries() {
        let index = CatalogIndex::build(sample_catalog());

        assert_eq!(index.get_by_order_code(" 193333").unwrap().product_name, "Spares Kit, Chrome");
        assert_eq!(index.get_by_barcode(" 5012345678900 ").unwrap().order_code, "191046");
        assert_eq!(index.get_by_name_exact("odessa 922 vanity").unwrap().order_code, "191047");
        assert!(index.get_by_order_code("199999").is_none());
        assert!(index.get_by_barcode("").is_none());
        assert!(index.get_by_name_exact("ODESSA").is_none());
    }

    #[test]
    fn test_empty_catalog_is_not_ready() {
        let index = CatalogIndex::build(Vec::new());
        assert!(!index.is_ready());
        assert!(index.get_by_order_code("191046").is_none());
        assert!(index.fuzzy_match_order_code("191046", 1).is_none());
        assert!(index.find_by_name_words("ODESSA").is_empty());
    }

    #[test]
    fn test_later_record_overwrites_earlier() {
        let index = CatalogIndex::build(vec![
            ProductRecord::new("191046", "FIRST"),
            ProductRecord::new("191046", "SECOND"),
        ]);
        assert_eq!(index.get_by_order_code("191046").unwrap().product_name, "SECOND");
    }

    #[test]
    fn test_find_by_name_words_intersects() {
        let index = CatalogIndex::build(sample_catalog());

        let both = index.find_by_name_words("odessa 922");
        assert_eq!(both.len(), 2);
        assert_eq!(both[0].order_code, "191046");
        assert_eq!(both[1].order_code, "191047");

        let one = index.find_by_name_words("ODESSA VANITY");
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].order_code, "191047");

        assert!(index.find_by_name_words("ODESSA MIRROR").is_empty());
        assert!(index.find_by_name_words("a b").is_empty());
        assert!(index.find_by_name_words("").is_empty());
    }

    #[test]
    fn test_find_by_name_prefix_respects_word_boundary() {
        let index = CatalogIndex::build(sample_catalog());

        assert_eq!(index.find_by_name_prefix("ODESSA 922").len(), 2);
        assert_eq!(index.find_by_name_prefix("spares kit chrome").len(), 1);
        assert!(index.find_by_name_prefix("ODESSA 92").is_empty());
        assert!(index.find_by_name_prefix("922 BASIN").is_empty());
    }

    #[test]
    fn test_find_by_name_prefix_short_and_hyphenated() {
        let index = CatalogIndex::build(vec![
            ProductRecord::new("194001", "LG 55 OLED TV"),
            ProductRecord::new("194002", "ODESSA-922 BASIN"),
            ProductRecord::new("194003", "LG 65 OLED TV"),
        ]);

        let short = index.find_by_name_prefix("LG 55");
        assert_eq!(short.len(), 1);
        assert_eq!(short[0].order_code, "194001");
        assert_eq!(index.find_by_name_prefix("lg").len(), 2);

        let hyphenated = index.find_by_name_prefix("ODESSA-922");
        assert_eq!(hyphenated.len(), 1);
        assert_eq!(hyphenated[0].order_code, "194002");
        assert!(index.find_by_name_prefix("ODESSA").is_empty());
    }

    #[test]
    fn test_records_keep_input_order() {
        let catalog = sample_catalog();
        let index = CatalogIndex::build(catalog.clone());
        assert_eq!(index.records(), catalog.as_slice());
        assert!(!index.is_empty());
        assert!(CatalogIndex::build(Vec::new()).records().is_empty());
    }

    #[test]
    fn test_fuzzy_order_code_exact() {
        let index = CatalogIndex::build(sample_catalog());
        let found = index.fuzzy_match_order_code("191234", 1).unwrap();
        assert_eq!(found.distance, 0);
        assert_eq!(found.confidence, Confidence::High);
    }

    #[test]
    fn test_fuzzy_order_code_one_edit() {
        let index = CatalogIndex::build(sample_catalog());
        let found = index.fuzzy_match_order_code("191235", 1).unwrap();
        assert_eq!(found.product.order_code, "191234");
        assert_eq!(found.distance, 1);
        assert_eq!(found.confidence, Confidence::Medium);
        assert_eq!(found.matched_code, "191234");
    }

    #[test]
    fn test_fuzzy_order_code_rejects_other_formats() {
        let index = CatalogIndex::build(vec![
            ProductRecord::new("291234", "OTHER"),
            ProductRecord::new("A91234", "ALPHA"),
        ]);
        // One edit away from catalog codes, but not 19 + four digits
        assert!(index.fuzzy_match_order_code("291235", 1).is_none());
        assert!(index.fuzzy_match_order_code("B91234", 1).is_none());
        assert!(index.fuzzy_match_order_code("1912345", 1).is_none());
    }

    #[test]
    fn test_fuzzy_order_code_beyond_distance() {
        let index = CatalogIndex::build(sample_catalog());
        assert!(index.fuzzy_match_order_code("195555", 1).is_none());
    }

    #[test]
    fn test_fuzzy_order_code_ties_use_catalog_order() {
        let index = CatalogIndex::build(vec![
            ProductRecord::new("191230", "FIRST"),
            ProductRecord::new("191231", "SECOND"),
        ]);
        let found = index.fuzzy_match_order_code("191239", 1).unwrap();
        assert_eq!(found.product.product_name, "FIRST");
    }

    #[test]
    fn test_find_similar_order_codes() {
        let index = CatalogIndex::build(sample_catalog());
        let similar = index.find_similar_order_codes("191045", SUGGESTION_MAX_DISTANCE, 3);

        assert_eq!(similar[0].code, "191046");
        assert_eq!(similar[0].distance, 1);
        assert!(similar.iter().all(|s| s.distance <= 2));
        assert!(similar.len() <= 3);

        let limited = index.find_similar_order_codes("191045", SUGGESTION_MAX_DISTANCE, 1);
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn test_fuzzy_product_name_returns_family() {
        let index = CatalogIndex::build(sample_catalog());

        let found = index.fuzzy_match_product_name("ODESA 922", 1);
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|m| m.matched_family == "ODESSA 922"));
        assert!(found.iter().all(|m| m.distance == 1));
        assert!(found.iter().all(|m| m.confidence == Confidence::Medium));

        let glued = index.fuzzy_match_product_name("odessa922", 1);
        assert_eq!(glued.len(), 2);
        assert!(glued.iter().all(|m| m.distance == 0));
    }

    #[test]
    fn test_fuzzy_product_name_requires_number() {
        let index = CatalogIndex::build(sample_catalog());

        assert!(index.fuzzy_match_product_name("ODESSA", 1).is_empty());
        assert!(index.fuzzy_match_product_name("ODESSA 923", 1).is_empty());
        assert!(index.fuzzy_match_product_name("OD 922", 1).is_empty());
        assert!(index.fuzzy_match_product_name("ODXXSA 922", 1).is_empty());
    }

    #[test]
    fn test_publish_returns_previous_index() {
        let handle = CatalogHandle::new(CatalogIndex::build(sample_catalog()));
        let held = handle.snapshot();

        let previous = handle.publish(CatalogIndex::build(Vec::new()));
        assert_eq!(previous.len(), 5);
        assert!(!handle.snapshot().is_ready());
        // Snapshots taken earlier keep working against the old catalog
        assert!(held.get_by_order_code("191046").is_some());
    }

    #[test]
    fn test_handle_publishes_atomically() {
        let handle = Arc::new(CatalogHandle::default());
        assert!(!handle.snapshot().is_ready());

        let before = handle.snapshot();
        handle.rebuild(sample_catalog());
        let after = handle.snapshot();

        assert!(!before.is_ready());
        assert!(after.is_ready());
        assert_eq!(after.len(), 5);

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let handle = Arc::clone(&handle);
                thread::spawn(move || {
                    for _ in 0..100 {
                        let index = handle.snapshot();
                        // Either the old or the new catalog, never a mix
                        assert!(index.len() == 5 || index.len() == 1);
                        if index.len() == 5 {
                            assert!(index.get_by_order_code("191046").is_some());
                        }
                    }
                })
            })
            .collect();

        handle.rebuild(vec![ProductRecord::new("199999", "REPLACEMENT")]);

        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(handle.snapshot().len(), 1);
    }
}
