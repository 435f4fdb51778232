//! Inter-annotator reliability statistics for an agreement.

pub mod kappa;
pub mod matrix;
pub mod space;

use tracing::debug;

use crate::models::{
    Agreement, AgreementStatistics, CodeAlternative, KappaPair, Relationship, Token, Vocabulary,
    BRENNAN_KAPPA_NAME, FLEISS_KAPPA_NAME,
};

pub use kappa::kappas_from_matrix;
pub use matrix::TallyMatrix;
pub use space::CategorySpace;

/// Kappas over an explicit pool of alternatives.
pub fn compute_kappas_for(
    alternatives: &[CodeAlternative],
    tokens: &[Token],
    relationships: &[Relationship],
    vocabulary: &Vocabulary,
    annotator_count: usize,
) -> KappaPair {
    let space = CategorySpace::build(alternatives, vocabulary);
    let matrix = TallyMatrix::build(alternatives, tokens, relationships, &space, annotator_count);
    let pair = kappas_from_matrix(&matrix);
    debug!(
        "Kappas over {} rows x {} columns ({} cells): fleiss={:.4}, brennan={:.4}",
        matrix.row_count(),
        matrix.column_count,
        matrix.total_cells,
        pair.fleiss_kappa,
        pair.brennan_kappa
    );
    pair
}

/// Kappas of an agreement, with every recorded annotation counted as a rater.
pub fn compute_kappas(agreement: &Agreement, vocabulary: &Vocabulary) -> KappaPair {
    compute_kappas_for(
        &agreement.code_alternatives,
        &agreement.tokens,
        &agreement.tore_relationships,
        vocabulary,
        agreement.annotator_count(),
    )
}

/// Recompute the kappas and record them in `agreement_statistics`.
///
/// The first recorded value of a coefficient is kept as its initial value.
pub fn refresh_statistics(agreement: &mut Agreement, vocabulary: &Vocabulary) -> KappaPair {
    let pair = compute_kappas(agreement, vocabulary);
    for (name, value) in [
        (FLEISS_KAPPA_NAME, pair.fleiss_kappa),
        (BRENNAN_KAPPA_NAME, pair.brennan_kappa),
    ] {
        match agreement
            .agreement_statistics
            .iter_mut()
            .find(|stat| stat.kappa_name == name)
        {
            Some(stat) => stat.current_kappa = value,
            None => agreement.agreement_statistics.push(AgreementStatistics {
                kappa_name: name.to_string(),
                initial_kappa: value,
                current_kappa: value,
            }),
        }
    }
    agreement.last_updated = chrono::Utc::now();
    pair
}
