//! Matcher core - catalog matching and disambiguation for scanned products
//!
//! Indexes a product catalog for exact and edit-distance-tolerant lookups,
//! and resolves the noisy text recognized in a camera frame to the
//! product(s) the user is most likely looking at.

pub mod error;
pub mod types;
pub mod similarity;
pub mod patterns;
pub mod catalog;
pub mod matcher;
pub mod text;
pub mod loader;
pub mod config;

pub use error::*;
pub use types::*;
pub use similarity::*;
pub use catalog::*;
pub use matcher::*;
pub use config::*;
pub use loader::{load_catalog_file, load_catalog_json};
pub use text::{clean_ocr_text, dedupe_observations};

// Python bindings
#[cfg(feature = "python")]
pub mod py;

#[cfg(feature = "python")]
use pyo3::prelude::*;

#[cfg(feature = "python")]
#[pymodule]
fn matcher_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    use py::*;
    m.add_class::<PyCatalog>()?;
    m.add_class::<PyDisambiguator>()?;
    m.add_function(wrap_pyfunction!(py_levenshtein, m)?)?;
    Ok(())
}
