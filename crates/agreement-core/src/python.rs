//! Python bindings (`python` feature).
//!
//! Results cross the boundary as the same JSON documents the repository
//! service exchanges, decoded with Python's `json` module.

use std::path::PathBuf;

use pyo3::prelude::*;
use serde::Serialize;

use crate::config::AgreementConfig;
use crate::consensus::{ConsensusEngine, ConsensusPolicy};
use crate::errors::AgreementError;
use crate::models::{Agreement, Annotation, Vocabulary};
use crate::service;
use crate::statistics;
use crate::store::{AnnotationStore, Database, VocabularyCache};

fn to_py_json<T: Serialize>(py: Python<'_>, value: &T) -> PyResult<PyObject> {
    let text = serde_json::to_string(value).map_err(AgreementError::from)?;
    let json_module = py.import("json")?;
    Ok(json_module.call_method1("loads", (text,))?.unbind())
}

fn policy_from_flag(decline_unresolved: Option<bool>, fallback: ConsensusPolicy) -> ConsensusPolicy {
    match decline_unresolved {
        Some(true) => ConsensusPolicy::DeclineUnresolved,
        Some(false) => ConsensusPolicy::LeavePending,
        None => fallback,
    }
}

/// SQLite-backed agreement store with the three agreement operations.
#[pyclass(name = "AgreementDatabase")]
pub struct PyAgreementDatabase {
    store: Database,
    vocabulary: VocabularyCache<Database>,
    policy: ConsensusPolicy,
}

#[pymethods]
impl PyAgreementDatabase {
    #[new]
    #[pyo3(signature = (db_path=None))]
    fn new(db_path: Option<PathBuf>) -> PyResult<Self> {
        let config = AgreementConfig::from_env();
        let store = Database::new(db_path.unwrap_or(config.db_path))?;
        store.init_schema()?;
        let vocabulary = VocabularyCache::new(store.clone(), config.vocabulary_ttl_seconds);
        Ok(Self {
            store,
            vocabulary,
            policy: config.consensus_policy,
        })
    }

    #[getter]
    fn db_path(&self) -> String {
        self.store.db_path().to_string_lossy().into_owned()
    }

    fn store_annotation(&self, payload_json: &str) -> PyResult<()> {
        let annotation: Annotation =
            serde_json::from_str(payload_json).map_err(AgreementError::from)?;
        self.store.store_annotation(&annotation)?;
        Ok(())
    }

    fn store_agreement(&self, payload_json: &str) -> PyResult<()> {
        let agreement: Agreement = serde_json::from_str(payload_json).map_err(AgreementError::from)?;
        self.store.store_agreement(&agreement)?;
        Ok(())
    }

    fn set_vocabulary(&self, categories: Vec<String>, relationship_names: Vec<String>) -> PyResult<()> {
        self.store.set_categories(&categories)?;
        self.store.set_relationship_names(&relationship_names)?;
        self.vocabulary.invalidate();
        Ok(())
    }

    #[pyo3(signature = (annotation_names, auto_merge=false, decline_unresolved=None))]
    fn aggregate(
        &self,
        py: Python<'_>,
        annotation_names: Vec<String>,
        auto_merge: bool,
        decline_unresolved: Option<bool>,
    ) -> PyResult<PyObject> {
        let policy = policy_from_flag(decline_unresolved, self.policy);
        let aggregated = service::aggregate(&self.store, &annotation_names, auto_merge, policy)?;
        to_py_json(py, &aggregated)
    }

    #[pyo3(signature = (agreement_name, annotation_names, auto_merge=false, decline_unresolved=None))]
    fn create_agreement(
        &self,
        py: Python<'_>,
        agreement_name: &str,
        annotation_names: Vec<String>,
        auto_merge: bool,
        decline_unresolved: Option<bool>,
    ) -> PyResult<PyObject> {
        let policy = policy_from_flag(decline_unresolved, self.policy);
        let agreement = service::create_agreement(
            &self.store,
            &self.vocabulary,
            agreement_name,
            &annotation_names,
            auto_merge,
            policy,
        )?;
        to_py_json(py, &agreement)
    }

    fn export_annotation(
        &self,
        py: Python<'_>,
        agreement_name: &str,
        new_annotation_name: &str,
    ) -> PyResult<PyObject> {
        let annotation = service::export_annotation(&self.store, agreement_name, new_annotation_name)?;
        to_py_json(py, &annotation)
    }

    /// Returns `(fleiss_kappa, brennan_kappa)`.
    fn compute_kappas(&self, agreement_name: &str) -> PyResult<(f64, f64)> {
        let pair = service::compute_kappas(&self.store, &self.vocabulary, agreement_name)?;
        Ok((pair.fleiss_kappa, pair.brennan_kappa))
    }
}

/// Run the consensus pass over an agreement document and return it updated.
#[pyfunction]
#[pyo3(signature = (agreement_json, decline_unresolved=false))]
pub fn merge_agreement(py: Python<'_>, agreement_json: &str, decline_unresolved: bool) -> PyResult<PyObject> {
    let mut agreement: Agreement = serde_json::from_str(agreement_json).map_err(AgreementError::from)?;
    let policy = policy_from_flag(Some(decline_unresolved), ConsensusPolicy::LeavePending);
    let annotator_count = agreement.annotator_count();
    ConsensusEngine::new(policy).run(
        &mut agreement.code_alternatives,
        &agreement.tore_relationships,
        annotator_count,
    );
    to_py_json(py, &agreement)
}

/// Kappas of an agreement document against explicit vocabularies.
#[pyfunction]
pub fn agreement_kappas(
    agreement_json: &str,
    categories: Vec<String>,
    relationship_names: Vec<String>,
) -> PyResult<(f64, f64)> {
    let agreement: Agreement = serde_json::from_str(agreement_json).map_err(AgreementError::from)?;
    let vocabulary = Vocabulary::new(categories, relationship_names);
    let pair = statistics::compute_kappas(&agreement, &vocabulary);
    Ok((pair.fleiss_kappa, pair.brennan_kappa))
}
