//! Agreement core library: multi-annotator agreement over token-level codes.
//!
//! This crate merges independent annotations of one token stream into a
//! shared index space, resolves unanimous code alternatives, exports the
//! accepted subset as a new annotation, and measures inter-annotator
//! agreement with Fleiss' and Brennan–Prediger Kappa.  With the `python`
//! feature enabled it is also compiled as a Python extension module
//! (`_agreement_core`) via PyO3.

pub mod config;
pub mod consensus;
pub mod errors;
pub mod models;
pub mod remap;
pub mod service;
pub mod span;
pub mod statistics;
pub mod store;

#[cfg(feature = "python")]
mod python;

#[cfg(feature = "python")]
use pyo3::prelude::*;
#[cfg(feature = "python")]
use pyo3::wrap_pyfunction;

// ---------------------------------------------------------------------------
// Top-level Python module: _agreement_core
// ---------------------------------------------------------------------------

#[cfg(feature = "python")]
#[pymodule]
fn _agreement_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // -- Constants ----------------------------------------------------------
    m.add("FLEISS_KAPPA_NAME", models::FLEISS_KAPPA_NAME)?;
    m.add("BRENNAN_KAPPA_NAME", models::BRENNAN_KAPPA_NAME)?;
    m.add("SCHEMA_VERSION", store::schema::SCHEMA_VERSION)?;

    // -- Store + operations -------------------------------------------------
    m.add_class::<python::PyAgreementDatabase>()?;

    // -- Document-level helpers ---------------------------------------------
    m.add_function(wrap_pyfunction!(python::merge_agreement, m)?)?;
    m.add_function(wrap_pyfunction!(python::agreement_kappas, m)?)?;

    Ok(())
}
