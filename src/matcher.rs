//! Disambiguator - decides which catalog product(s) a frame is showing
//!
//! Each observation is matched against the catalog by a fixed priority of
//! rules. The resulting candidates are deduplicated, grouped into product
//! families and scored by position in the frame and by how often the
//! family was seen.

use ahash::{AHashMap, AHashSet};
use std::cmp::Ordering;
use tracing::{debug, warn};

use crate::catalog::CatalogIndex;
use crate::config::MatcherConfig;
use crate::patterns::{
    compact, extract_order_codes, family_key, normalize_for_match, significant_words,
};
use crate::types::{
    Confidence, MatchCandidate, MatchType, Observations, Outcome, ProductFamily, ProductRecord,
    SimilarCode, TextObservation,
};

/// Resolve a frame with the default configuration
pub fn resolve(observations: &Observations, index: &CatalogIndex) -> Outcome {
    Disambiguator::default().resolve(observations, index)
}

/// Stateless resolver; holds only its tunables
#[derive(Debug, Clone, Default)]
pub struct Disambiguator {
    config: MatcherConfig,
}

impl Disambiguator {
    pub fn new(config: MatcherConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Resolve one frame's observations against the catalog
    pub fn resolve(&self, observations: &Observations, index: &CatalogIndex) -> Outcome {
        if observations.is_empty() {
            return Outcome::empty();
        }
        match observations {
            Observations::Frame(items) => self.resolve_frame(items, index),
            Observations::Legacy(texts) => self.resolve_legacy(texts.as_slice(), index),
        }
    }

    /// Full algorithm: spatial weighting, family grouping, auto-resolution
    pub fn resolve_frame(
        &self,
        observations: &[TextObservation],
        index: &CatalogIndex,
    ) -> Outcome {
        if observations.is_empty() {
            return Outcome::empty();
        }
        if !index.is_ready() {
            warn!(
                "Disambiguator: catalog index not ready, ignoring {} observations",
                observations.len()
            );
            return Outcome::empty();
        }

        let matches: Vec<MatchCandidate> = observations
            .iter()
            .flat_map(|obs| self.match_text(&obs.text, self.center_score(obs), index))
            .collect();
        let candidates = dedupe_by_order_code(matches);
        if candidates.is_empty() {
            return Outcome::empty();
        }

        // Several clearly different codes were scanned: never hide them behind a family
        let mut exact: Vec<MatchCandidate> = candidates
            .iter()
            .filter(|c| {
                c.match_type == MatchType::OrderCodeExact && c.confidence == Confidence::High
            })
            .cloned()
            .collect();
        if exact.len() > 1 {
            debug!("Disambiguator: {} exact order codes in frame", exact.len());
            exact.sort_by(|a, b| by_score_desc(a.center_score, b.center_score));
            return Outcome::Resolved(exact);
        }

        let total = candidates.len();
        let mut families = group_families(candidates);
        if families.len() == 1 {
            let family = families.remove(0);
            debug!("Disambiguator: single family '{}'", family.key);
            return Outcome::Resolved(family.members);
        }

        for family in &mut families {
            self.score_family(family, total);
        }
        families.sort_by(|a, b| by_score_desc(a.total_score, b.total_score));

        let top = &families[0];
        if top.total_score > self.config.scoring.auto_resolve_threshold {
            debug!(
                "Disambiguator: auto-resolved family '{}' (score {:.2})",
                top.key, top.total_score
            );
            return Outcome::Resolved(families.remove(0).members);
        }

        debug!(
            "Disambiguator: {} families need selection (top '{}' at {:.2})",
            families.len(),
            top.key,
            top.total_score
        );
        Outcome::NeedsSelection(families)
    }

    /// Bare strings without geometry: priority matching ordered by confidence
    ///
    /// No spatial weighting, grouping or auto-resolution.
    pub fn resolve_legacy<S: AsRef<str>>(&self, texts: &[S], index: &CatalogIndex) -> Outcome {
        if texts.is_empty() {
            return Outcome::empty();
        }
        if !index.is_ready() {
            warn!("Disambiguator: catalog index not ready, ignoring {} texts", texts.len());
            return Outcome::empty();
        }

        let unweighted = self.config.center.inside_score;
        let matches: Vec<MatchCandidate> = texts
            .iter()
            .flat_map(|text| self.match_text(text.as_ref(), unweighted, index))
            .collect();

        let mut candidates = dedupe_by_order_code(matches);
        candidates.sort_by(|a, b| b.confidence.cmp(&a.confidence));
        Outcome::Resolved(candidates)
    }

    /// Correction suggestions for a code that matched nothing
    pub fn suggest_order_codes<'a>(
        &self,
        code: &str,
        index: &'a CatalogIndex,
    ) -> Vec<SimilarCode<'a>> {
        let fuzzy = &self.config.fuzzy;
        index.find_similar_order_codes(code, fuzzy.suggestion_max_distance, fuzzy.suggestion_limit)
    }

    /// Score an observation by whether its centre lies in the frame's central region
    pub fn center_score(&self, observation: &TextObservation) -> f64 {
        let center = &self.config.center;
        if !(observation.width > 0.0 && observation.height > 0.0) {
            return center.outside_score;
        }

        let rx = observation.center_x / observation.width;
        let ry = observation.center_y / observation.height;
        let region = center.region_min..=center.region_max;
        if region.contains(&rx) && region.contains(&ry) {
            center.inside_score
        } else {
            center.outside_score
        }
    }

    /// Candidates for one piece of text, from the first rule that matches
    ///
    /// Rules in order: whole text is an order code; order codes embedded in
    /// the text (tolerating misreads); product names. Descriptions are never
    /// consulted.
    pub fn match_text(
        &self,
        text: &str,
        center_score: f64,
        index: &CatalogIndex,
    ) -> Vec<MatchCandidate> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }
        let candidate = |product: &ProductRecord, match_type, confidence| {
            MatchCandidate::new(
                text.to_string(),
                match_type,
                confidence,
                product.clone(),
                center_score,
            )
        };

        if let Some(product) = index.get_by_order_code(&compact(text)) {
            return vec![candidate(product, MatchType::OrderCodeExact, Confidence::High)];
        }

        let fuzzy = &self.config.fuzzy;
        let mut partial: Vec<&ProductRecord> = Vec::new();
        for code in extract_order_codes(text) {
            let found = index.fuzzy_match_order_code(&code, fuzzy.order_code_max_distance);
            if let Some(found) = found {
                push_unique(&mut partial, found.product);
            }
        }
        if !partial.is_empty() {
            return partial
                .into_iter()
                .map(|p| candidate(p, MatchType::OrderCodePartial, Confidence::Medium))
                .collect();
        }

        let query = normalize_for_match(text);
        if query.chars().count() < fuzzy.min_name_query_len {
            return Vec::new();
        }

        let mut named: Vec<&ProductRecord> = Vec::new();
        if let Some(product) = index.get_by_name_exact(text) {
            push_unique(&mut named, product);
        }
        for product in index.find_by_name_prefix(&query) {
            push_unique(&mut named, product);
        }
        // A lone word ("BASIN") would match half the catalog
        if significant_words(&query).len() >= 2 {
            for product in index.find_by_name_words(&query) {
                push_unique(&mut named, product);
            }
        }
        for found in index.fuzzy_match_product_name(text, fuzzy.product_name_max_distance) {
            push_unique(&mut named, found.product);
        }

        named
            .into_iter()
            .map(|p| candidate(p, MatchType::ProductNameFuzzy, Confidence::Medium))
            .collect()
    }

    fn score_family(&self, family: &mut ProductFamily, total: usize) {
        let members = family.members.len() as f64;
        let central = family
            .members
            .iter()
            .filter(|m| m.center_score >= self.config.center.central_member_threshold)
            .count() as f64;

        family.center_score = central / members;
        family.frequency_score = members / total as f64;
        family.total_score = self.config.scoring.center_weight * family.center_score
            + self.config.scoring.frequency_weight * family.frequency_score;
    }
}

/// Keep the first candidate seen for each order code
///
/// First wins even when a later candidate for the same product has higher
/// confidence. Candidates without an order code are dropped.
fn dedupe_by_order_code(candidates: Vec<MatchCandidate>) -> Vec<MatchCandidate> {
    let mut seen = AHashSet::new();
    candidates
        .into_iter()
        .filter(|c| {
            let code = c.order_code().trim().to_uppercase();
            !code.is_empty() && seen.insert(code)
        })
        .collect()
}

/// Group candidates by family key, families in order of first appearance
fn group_families(candidates: Vec<MatchCandidate>) -> Vec<ProductFamily> {
    let mut slots: AHashMap<String, usize> = AHashMap::new();
    let mut families: Vec<ProductFamily> = Vec::new();

    for candidate in candidates {
        let mut key = family_key(&candidate.product.product_name);
        if key.is_empty() {
            key = candidate.order_code().trim().to_uppercase();
        }

        let slot = *slots.entry(key.clone()).or_insert_with(|| {
            families.push(ProductFamily {
                key,
                members: Vec::new(),
                center_score: 0.0,
                frequency_score: 0.0,
                total_score: 0.0,
            });
            families.len() - 1
        });
        families[slot].members.push(candidate);
    }

    families
}

fn push_unique<'a>(products: &mut Vec<&'a ProductRecord>, product: &'a ProductRecord) {
    if !products.iter().any(|p| std::ptr::eq(*p, product)) {
        products.push(product);
    }
}

fn by_score_desc(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}
