//! Operations exposed to the request layer.
//!
//! Each operation fetches what it needs from the store collaborators, runs
//! the pure engines, and either completes or returns an error before anything
//! caller-visible is written.

use tracing::{info, warn};

use crate::consensus::{ConsensusEngine, ConsensusPolicy};
use crate::errors::{AgreementError, AgreementResult};
use crate::models::{distinct_annotator_count, AggregatedAgreement, Agreement, Annotation, KappaPair};
use crate::remap;
use crate::statistics;
use crate::store::{AnnotationStore, VocabularyStore};

fn fetch_annotations<S: AnnotationStore + ?Sized>(
    store: &S,
    annotation_names: &[String],
) -> AgreementResult<Vec<Annotation>> {
    if annotation_names.is_empty() {
        return Err(AgreementError::InvalidInput(
            "at least one annotation name is required".to_string(),
        ));
    }
    store.get_annotations(annotation_names).map_err(|e| {
        warn!("Failed to fetch annotations {annotation_names:?}: {e}");
        e
    })
}

/// The consensus pass needs as many supporters as the kappas count raters,
/// so a repeated annotation name counts once here as well.
fn aggregate_fetched(
    annotations: &[Annotation],
    annotation_names: &[String],
    auto_merge: bool,
    policy: ConsensusPolicy,
) -> AggregatedAgreement {
    let mut aggregated = remap::aggregate_annotations(annotations);
    if auto_merge {
        let annotator_count = distinct_annotator_count(annotation_names.iter().map(String::as_str));
        ConsensusEngine::new(policy).run(
            &mut aggregated.code_alternatives,
            &aggregated.tore_relationships,
            annotator_count,
        );
    }
    aggregated
}

/// Build the initial agreement payload from the named annotations, running
/// the consensus pass when `auto_merge` is set.
pub fn aggregate<S: AnnotationStore + ?Sized>(
    store: &S,
    annotation_names: &[String],
    auto_merge: bool,
    policy: ConsensusPolicy,
) -> AgreementResult<AggregatedAgreement> {
    info!(
        "Aggregating {} annotations (auto_merge={auto_merge})",
        annotation_names.len()
    );
    let annotations = fetch_annotations(store, annotation_names)?;
    Ok(aggregate_fetched(
        &annotations,
        annotation_names,
        auto_merge,
        policy,
    ))
}

/// Aggregate, record the initial kappas, and store a new agreement.
pub fn create_agreement<S, V>(
    store: &S,
    vocabulary_store: &V,
    agreement_name: &str,
    annotation_names: &[String],
    auto_merge: bool,
    policy: ConsensusPolicy,
) -> AgreementResult<Agreement>
where
    S: AnnotationStore + ?Sized,
    V: VocabularyStore + ?Sized,
{
    if agreement_name.trim().is_empty() {
        return Err(AgreementError::InvalidInput(
            "agreement name must not be empty".to_string(),
        ));
    }
    let annotations = fetch_annotations(store, annotation_names)?;
    let vocabulary = vocabulary_store.get_vocabulary()?;
    let dataset = annotations
        .first()
        .map(|annotation| annotation.dataset.clone())
        .unwrap_or_default();

    let aggregated = aggregate_fetched(&annotations, annotation_names, auto_merge, policy);
    let mut agreement =
        Agreement::from_aggregate(agreement_name, dataset, annotation_names.to_vec(), aggregated);
    statistics::refresh_statistics(&mut agreement, &vocabulary);

    store.store_agreement(&agreement)?;
    info!(
        "Created agreement '{}' over {} code alternatives",
        agreement.name,
        agreement.code_alternatives.len()
    );
    Ok(agreement)
}

/// Export the accepted subset of a completed agreement as a new annotation
/// and store it.
pub fn export_annotation<S: AnnotationStore + ?Sized>(
    store: &S,
    agreement_name: &str,
    new_annotation_name: &str,
) -> AgreementResult<Annotation> {
    let agreement = store.get_agreement(agreement_name)?;
    let annotation = remap::export_annotation(&agreement, new_annotation_name).map_err(|e| {
        warn!("Export of agreement '{agreement_name}' refused: {e}");
        e
    })?;
    store.store_annotation(&annotation)?;
    Ok(annotation)
}

/// Fleiss' and Brennan–Prediger Kappa of a stored agreement.
pub fn compute_kappas<S, V>(
    store: &S,
    vocabulary_store: &V,
    agreement_name: &str,
) -> AgreementResult<KappaPair>
where
    S: AnnotationStore + ?Sized,
    V: VocabularyStore + ?Sized,
{
    let agreement = store.get_agreement(agreement_name)?;
    let vocabulary = vocabulary_store.get_vocabulary()?;
    let pair = statistics::compute_kappas(&agreement, &vocabulary);
    info!(
        "Kappas for '{agreement_name}': fleiss={:.4}, brennan={:.4}",
        pair.fleiss_kappa, pair.brennan_kappa
    );
    Ok(pair)
}
