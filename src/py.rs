//! Python bindings for the matcher using PyO3

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};
use std::path::Path;

use crate::catalog::CatalogHandle;
use crate::config::{load_config, MatcherConfig};
use crate::loader::load_catalog_json;
use crate::matcher::Disambiguator;
use crate::similarity::levenshtein;
use crate::types::{
    Confidence, MatchCandidate, Outcome, ProductFamily, ProductRecord, TextObservation,
};

/// Edit distance between two strings (Python function)
#[pyfunction]
pub fn py_levenshtein(a: &str, b: &str) -> usize {
    levenshtein(a, b)
}

/// Python wrapper around the current catalog index
#[pyclass]
pub struct PyCatalog {
    handle: CatalogHandle,
}

#[pymethods]
impl PyCatalog {
    #[new]
    fn new() -> Self {
        Self {
            handle: CatalogHandle::default(),
        }
    }

    /// Replace the catalog from a JSON array of product objects
    ///
    /// The new index is published only once fully built.
    fn load_json(&self, json: &str) -> PyResult<usize> {
        let records = load_catalog_json(json)
            .map_err(|e| PyValueError::new_err(format!("Failed to load catalog: {}", e)))?;
        Ok(self.handle.rebuild(records).len())
    }

    fn is_ready(&self) -> bool {
        self.handle.snapshot().is_ready()
    }

    fn __len__(&self) -> usize {
        self.handle.snapshot().len()
    }

    fn get_by_order_code<'py>(
        &self,
        py: Python<'py>,
        order_code: &str,
    ) -> PyResult<Option<Bound<'py, PyDict>>> {
        let index = self.handle.snapshot();
        index
            .get_by_order_code(order_code)
            .map(|p| product_dict(py, p))
            .transpose()
    }

    fn get_by_barcode<'py>(
        &self,
        py: Python<'py>,
        barcode: &str,
    ) -> PyResult<Option<Bound<'py, PyDict>>> {
        let index = self.handle.snapshot();
        index
            .get_by_barcode(barcode)
            .map(|p| product_dict(py, p))
            .transpose()
    }

    #[pyo3(signature = (order_code, max_distance=1))]
    fn fuzzy_match_order_code<'py>(
        &self,
        py: Python<'py>,
        order_code: &str,
        max_distance: usize,
    ) -> PyResult<Option<Bound<'py, PyDict>>> {
        let index = self.handle.snapshot();
        let Some(found) = index.fuzzy_match_order_code(order_code, max_distance) else {
            return Ok(None);
        };

        let dict = PyDict::new_bound(py);
        dict.set_item("product", product_dict(py, found.product)?)?;
        dict.set_item("distance", found.distance)?;
        dict.set_item("confidence", confidence_label(found.confidence))?;
        dict.set_item("matched_code", found.matched_code)?;
        Ok(Some(dict))
    }

    #[pyo3(signature = (order_code, max_distance=2, limit=3))]
    fn find_similar_order_codes<'py>(
        &self,
        py: Python<'py>,
        order_code: &str,
        max_distance: usize,
        limit: usize,
    ) -> PyResult<Vec<Bound<'py, PyDict>>> {
        let index = self.handle.snapshot();
        index
            .find_similar_order_codes(order_code, max_distance, limit)
            .iter()
            .map(|s| -> PyResult<Bound<'py, PyDict>> {
                let dict = PyDict::new_bound(py);
                dict.set_item("code", &s.code)?;
                dict.set_item("distance", s.distance)?;
                dict.set_item("product", product_dict(py, s.product)?)?;
                Ok(dict)
            })
            .collect()
    }
}

/// Python wrapper for the disambiguator
#[pyclass]
pub struct PyDisambiguator {
    inner: Disambiguator,
}

#[pymethods]
impl PyDisambiguator {
    #[new]
    #[pyo3(signature = (config_path=None))]
    fn new(config_path: Option<&str>) -> PyResult<Self> {
        let config = match config_path {
            Some(path) => load_config(Path::new(path))
                .map_err(|e| PyValueError::new_err(format!("Failed to load config: {}", e)))?,
            None => MatcherConfig::default(),
        };
        Ok(Self {
            inner: Disambiguator::new(config),
        })
    }

    /// Resolve a list of `{text, centerX, centerY, width, height}` dicts
    fn resolve<'py>(
        &self,
        py: Python<'py>,
        catalog: PyRef<'_, PyCatalog>,
        observations: Bound<'py, PyList>,
    ) -> PyResult<Bound<'py, PyDict>> {
        let mut items = Vec::with_capacity(observations.len());
        for item in observations.iter() {
            let dict = item.downcast::<PyDict>()?;
            let number = |key: &str| -> PyResult<f64> {
                Ok(dict
                    .get_item(key)?
                    .and_then(|v| v.extract().ok())
                    .unwrap_or(0.0))
            };
            let text: String = dict
                .get_item("text")?
                .and_then(|v| v.extract().ok())
                .unwrap_or_default();

            items.push(TextObservation {
                text,
                center_x: number("centerX")?,
                center_y: number("centerY")?,
                width: number("width")?,
                height: number("height")?,
            });
        }

        let index = catalog.handle.snapshot();
        outcome_dict(py, self.inner.resolve_frame(&items, &index))
    }

    /// Resolve bare strings from recognizers that report no geometry
    fn resolve_legacy<'py>(
        &self,
        py: Python<'py>,
        catalog: PyRef<'_, PyCatalog>,
        texts: Vec<String>,
    ) -> PyResult<Bound<'py, PyDict>> {
        let index = catalog.handle.snapshot();
        outcome_dict(py, self.inner.resolve_legacy(texts.as_slice(), &index))
    }
}

fn outcome_dict(py: Python<'_>, outcome: Outcome) -> PyResult<Bound<'_, PyDict>> {
    let dict = PyDict::new_bound(py);
    match outcome {
        Outcome::Resolved(candidates) => {
            dict.set_item("type", "resolved")?;
            let candidates = candidates
                .iter()
                .map(|c| candidate_dict(py, c))
                .collect::<PyResult<Vec<_>>>()?;
            dict.set_item("candidates", candidates)?;
        }
        Outcome::NeedsSelection(families) => {
            dict.set_item("type", "needs_selection")?;
            let families = families
                .iter()
                .map(|f| family_dict(py, f))
                .collect::<PyResult<Vec<_>>>()?;
            dict.set_item("families", families)?;
        }
    }
    Ok(dict)
}

fn family_dict<'py>(py: Python<'py>, family: &ProductFamily) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new_bound(py);
    dict.set_item("key", &family.key)?;
    dict.set_item("center_score", family.center_score)?;
    dict.set_item("frequency_score", family.frequency_score)?;
    dict.set_item("total_score", family.total_score)?;
    let members = family
        .members
        .iter()
        .map(|m| candidate_dict(py, m))
        .collect::<PyResult<Vec<_>>>()?;
    dict.set_item("members", members)?;
    Ok(dict)
}

fn candidate_dict<'py>(
    py: Python<'py>,
    candidate: &MatchCandidate,
) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new_bound(py);
    dict.set_item("source_text", &candidate.source_text)?;
    dict.set_item("match_type", format!("{:?}", candidate.match_type))?;
    dict.set_item("confidence", confidence_label(candidate.confidence))?;
    dict.set_item("center_score", candidate.center_score)?;
    dict.set_item("product", product_dict(py, &candidate.product)?)?;
    Ok(dict)
}

fn product_dict<'py>(py: Python<'py>, product: &ProductRecord) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new_bound(py);
    dict.set_item("OrderCode", &product.order_code)?;
    dict.set_item("Barcode", product.barcode.as_deref())?;
    dict.set_item("Product Name", &product.product_name)?;
    dict.set_item("Description", &product.description)?;
    // Pass-through fields keep their original shape as JSON
    let extra = serde_json::to_string(&product.extra)
        .map_err(|e| PyValueError::new_err(format!("Failed to serialize product: {}", e)))?;
    dict.set_item("extra", extra)?;
    Ok(dict)
}

fn confidence_label(confidence: Confidence) -> &'static str {
    match confidence {
        Confidence::High => "high",
        Confidence::Medium => "medium",
    }
}
