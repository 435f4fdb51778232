//! Export of the accepted subset of an agreement as a new annotation.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use indexmap::IndexMap;
use tracing::{debug, info};

use crate::errors::{AgreementError, AgreementResult};
use crate::models::{Agreement, Annotation, Code, CodeAlternative, MergeStatus, Relationship, Token};

/// Build a new annotation from the accepted alternatives of a completed
/// agreement.
///
/// Fails with [`AgreementError::NotCompleted`] while the agreement is still
/// under review; the agreement itself is never modified.
pub fn export_annotation(agreement: &Agreement, new_annotation_name: &str) -> AgreementResult<Annotation> {
    if !agreement.is_completed {
        return Err(AgreementError::NotCompleted(agreement.name.clone()));
    }
    if new_annotation_name.trim().is_empty() {
        return Err(AgreementError::InvalidInput(
            "new annotation name must not be empty".to_string(),
        ));
    }

    let (codes, relationships) =
        accepted_codes_and_relationships(&agreement.code_alternatives, &agreement.tore_relationships);
    let mut tokens = agreement.tokens.clone();
    recount_tokens(&mut tokens, &codes);

    info!(
        "Exporting agreement '{}' as '{}' with {} codes and {} relationships",
        agreement.name,
        new_annotation_name,
        codes.len(),
        relationships.len()
    );

    let now = Utc::now();
    Ok(Annotation {
        uploaded_at: now,
        last_updated: now,
        name: new_annotation_name.to_string(),
        dataset: agreement.dataset.clone(),
        docs: agreement.docs.clone(),
        tokens,
        codes,
        tore_relationships: relationships,
    })
}

/// Densely renumber the accepted codes and the relationships they reference.
///
/// Codes keep their original order.  Relationships are numbered in the order
/// they are first referenced; a relationship referenced by several accepted
/// codes ends up owned by the last of them.  Membership lists are rebuilt from
/// the renumbered relationships.
pub fn accepted_codes_and_relationships(
    alternatives: &[CodeAlternative],
    relationships: &[Relationship],
) -> (Vec<Code>, Vec<Relationship>) {
    let mut by_index: HashMap<usize, &Relationship> = HashMap::new();
    for relationship in relationships {
        by_index.entry(relationship.index).or_insert(relationship);
    }

    let mut codes: Vec<Code> = Vec::new();
    let mut collected: IndexMap<usize, Relationship> = IndexMap::new();

    for alternative in alternatives
        .iter()
        .filter(|alt| alt.merge_status == MergeStatus::Accepted)
    {
        let new_index = codes.len();
        for membership in &alternative.code.relationship_memberships {
            match by_index.get(membership) {
                Some(relationship) => {
                    collected
                        .entry(*membership)
                        .or_insert_with(|| (*relationship).clone())
                        .owner = Some(new_index);
                }
                None => debug!(
                    "Accepted code {} references unknown relationship {}",
                    alternative.index, membership
                ),
            }
        }

        let mut code = alternative.code.clone();
        code.index = new_index;
        code.relationship_memberships.clear();
        codes.push(code);
    }

    let mut exported = Vec::with_capacity(collected.len());
    for (new_index, (_, mut relationship)) in collected.into_iter().enumerate() {
        relationship.index = new_index;
        if let Some(owner) = relationship.owner {
            if let Some(code) = codes.iter_mut().find(|code| code.index == owner) {
                code.relationship_memberships.push(new_index);
            }
        }
        exported.push(relationship);
    }

    (codes, exported)
}

/// Recompute `num_name_codes` / `num_tore_codes` of every token from `codes`.
///
/// A code counts once per token it covers, even if it lists the token twice.
pub fn recount_tokens(tokens: &mut [Token], codes: &[Code]) {
    let mut counters: HashMap<usize, (usize, usize)> = HashMap::new();
    for code in codes {
        let covered: HashSet<usize> = code.tokens.iter().copied().collect();
        for token in covered {
            let entry = counters.entry(token).or_insert((0, 0));
            if !code.name.is_empty() {
                entry.0 += 1;
            }
            if !code.tore.is_empty() {
                entry.1 += 1;
            }
        }
    }

    for token in tokens.iter_mut() {
        let (names, tores) = counters.get(&token.index).copied().unwrap_or((0, 0));
        token.num_name_codes = names;
        token.num_tore_codes = tores;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AggregatedAgreement;

    fn alternative(annotation: &str, code: Code, status: MergeStatus) -> CodeAlternative {
        let mut alt = CodeAlternative::pending(annotation, code);
        alt.merge_status = status;
        alt
    }

    fn completed_agreement() -> Agreement {
        let aggregated = AggregatedAgreement {
            docs: vec![],
            tokens: (0..5).map(|i| Token::new(i, format!("w{i}"))).collect(),
            tore_relationships: vec![
                Relationship::new(0, 0, "uses", vec![3]),
                Relationship::new(1, 1, "uses", vec![3]),
                Relationship::new(2, 2, "refines", vec![4]),
                Relationship::new(3, 3, "uses", vec![4]),
            ],
            code_alternatives: vec![
                alternative(
                    "a1",
                    Code::new(0, vec![0, 1], "app", "Software").with_memberships(vec![0]),
                    MergeStatus::Declined,
                ),
                alternative(
                    "a2",
                    Code::new(1, vec![0, 1], "app", "Software").with_memberships(vec![1]),
                    MergeStatus::Pending,
                ),
                alternative(
                    "a1",
                    Code::new(2, vec![2], "", "Task").with_memberships(vec![2]),
                    MergeStatus::Accepted,
                ),
                alternative(
                    "a2",
                    Code::new(3, vec![1, 4], "goal", "").with_memberships(vec![3]),
                    MergeStatus::Accepted,
                ),
            ],
        };
        let mut agreement =
            Agreement::from_aggregate("agr", "ds", vec!["a1".into(), "a2".into()], aggregated);
        agreement.is_completed = true;
        agreement
    }

    #[test]
    fn export_requires_completion() {
        let mut agreement = completed_agreement();
        agreement.is_completed = false;
        let before = agreement.clone();
        let err = export_annotation(&agreement, "merged").unwrap_err();
        assert!(matches!(err, AgreementError::NotCompleted(_)));
        assert_eq!(agreement, before);
    }

    #[test]
    fn export_rejects_empty_name() {
        let agreement = completed_agreement();
        let err = export_annotation(&agreement, "  ").unwrap_err();
        assert!(matches!(err, AgreementError::InvalidInput(_)));
    }

    #[test]
    fn export_renumbers_accepted_codes_and_relationships() {
        let agreement = completed_agreement();
        let annotation = export_annotation(&agreement, "merged").unwrap();

        assert_eq!(annotation.name, "merged");
        assert_eq!(annotation.dataset, "ds");
        assert_eq!(annotation.codes.len(), 2);
        assert_eq!(annotation.codes[0].index, 0);
        assert_eq!(annotation.codes[0].tore, "Task");
        assert_eq!(annotation.codes[1].index, 1);

        assert_eq!(annotation.tore_relationships.len(), 2);
        assert_eq!(annotation.tore_relationships[0].name, "refines");
        assert_eq!(annotation.tore_relationships[0].index, 0);
        assert_eq!(annotation.tore_relationships[0].owner, Some(0));
        assert_eq!(annotation.tore_relationships[1].index, 1);
        assert_eq!(annotation.tore_relationships[1].owner, Some(1));

        assert_eq!(annotation.codes[0].relationship_memberships, vec![0]);
        assert_eq!(annotation.codes[1].relationship_memberships, vec![1]);
    }

    #[test]
    fn export_recounts_token_counters() {
        let agreement = completed_agreement();
        let annotation = export_annotation(&agreement, "merged").unwrap();
        let counters: Vec<(usize, usize)> = annotation
            .tokens
            .iter()
            .map(|token| (token.num_name_codes, token.num_tore_codes))
            .collect();
        // token 1 and 4 are covered by "goal" (name only), token 2 by the Task code.
        assert_eq!(counters, vec![(0, 0), (1, 0), (0, 1), (0, 0), (1, 0)]);
    }

    #[test]
    fn shared_relationship_is_exported_once_and_owned_by_last_reference() {
        let relationships = vec![Relationship::new(0, 0, "uses", vec![3])];
        let alternatives = vec![
            alternative(
                "a1",
                Code::new(0, vec![0], "x", "").with_memberships(vec![0]),
                MergeStatus::Accepted,
            ),
            alternative(
                "a2",
                Code::new(1, vec![1], "y", "").with_memberships(vec![0, 7]),
                MergeStatus::Accepted,
            ),
        ];
        let (codes, exported) = accepted_codes_and_relationships(&alternatives, &relationships);
        assert_eq!(exported.len(), 1);
        assert_eq!(exported[0].owner, Some(1));
        assert!(codes[0].relationship_memberships.is_empty());
        assert_eq!(codes[1].relationship_memberships, vec![0]);
    }

    #[test]
    fn recount_counts_each_code_once_per_token() {
        let mut tokens = vec![Token::new(0, "a"), Token::new(1, "b")];
        let codes = vec![Code::new(0, vec![0, 0, 1], "name", "Tore")];
        recount_tokens(&mut tokens, &codes);
        assert_eq!(tokens[0].num_name_codes, 1);
        assert_eq!(tokens[0].num_tore_codes, 1);
        assert_eq!(tokens[1].num_name_codes, 1);
    }
}
