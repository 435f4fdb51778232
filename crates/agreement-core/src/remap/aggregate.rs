//! Aggregation of several annotations into one agreement-wide index space.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::models::{AggregatedAgreement, Annotation, CodeAlternative};

/// Merge `annotations` (in input order) into one pool of code alternatives.
///
/// Relationship indices of annotation *i* are shifted by the number of
/// relationships in annotations `0..i`, and code memberships are shifted with
/// them.  Codes with an empty token set are dropped; the remaining codes get
/// consecutive global indices and are wrapped as pending alternatives.
/// Tokens and docs are taken from the first annotation.
pub fn aggregate_annotations(annotations: &[Annotation]) -> AggregatedAgreement {
    let mut aggregated = AggregatedAgreement::default();
    let mut code_counter = 0usize;
    let mut relationship_offset = 0usize;

    for (position, annotation) in annotations.iter().enumerate() {
        debug!("Getting info from annotation '{}'", annotation.name);

        if position == 0 {
            aggregated.tokens = annotation.tokens.clone();
            aggregated.docs = annotation.docs.clone();
        }

        let first_relationship = aggregated.tore_relationships.len();
        for relationship in &annotation.tore_relationships {
            let mut shifted = relationship.clone();
            shifted.index += relationship_offset;
            // Owners are reassigned once the codes of this annotation are numbered.
            shifted.owner = None;
            aggregated.tore_relationships.push(shifted);
        }

        let mut local_to_global: HashMap<usize, usize> = HashMap::new();
        for code in &annotation.codes {
            if code.tokens.is_empty() {
                debug!(
                    "Dropping code {} of '{}' without tokens",
                    code.index, annotation.name
                );
                continue;
            }

            let global_index = code_counter;
            code_counter += 1;
            local_to_global.insert(code.index, global_index);

            let mut code = code.clone();
            code.index = global_index;
            for membership in code.relationship_memberships.iter_mut() {
                *membership += relationship_offset;
                let owned = aggregated.tore_relationships[first_relationship..]
                    .iter_mut()
                    .find(|relationship| relationship.index == *membership);
                match owned {
                    Some(relationship) => relationship.owner = Some(global_index),
                    None => debug!(
                        "Code {} of '{}' references unknown relationship {}",
                        global_index, annotation.name, membership
                    ),
                }
            }

            aggregated
                .code_alternatives
                .push(CodeAlternative::pending(annotation.name.as_str(), code));
        }

        // Relationships not claimed through a membership keep their declared
        // owner when that code survived, otherwise they become ownerless.
        let shifted = &mut aggregated.tore_relationships[first_relationship..];
        for (relationship, original) in shifted.iter_mut().zip(&annotation.tore_relationships) {
            if relationship.owner.is_none() {
                relationship.owner = original
                    .owner
                    .and_then(|local| local_to_global.get(&local).copied());
            }
        }

        relationship_offset += annotation.tore_relationships.len();
    }

    info!(
        "Aggregated {} annotations into {} code alternatives and {} relationships",
        annotations.len(),
        aggregated.code_alternatives.len(),
        aggregated.tore_relationships.len()
    );
    aggregated
}
