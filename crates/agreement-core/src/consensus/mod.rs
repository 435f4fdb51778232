//! Unanimous-consensus detection over a pool of code alternatives.
//!
//! A single sequential pass groups alternatives by span.  The first
//! alternative for a span founds a candidate; later alternatives for the same
//! span either support it (identical name, category, and relationships) or
//! invalidate it, after which the span is rejected for the rest of the pass.
//! Candidates supported by every annotator are unanimous: the first pending
//! alternative of such a span is accepted and its duplicates are declined.

pub mod relations;

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::models::{CodeAlternative, MergeStatus, Relationship};
use crate::span::SpanKey;

pub use relations::{relationship_sets_equal, RelationshipLookup, RelationshipShape};

/// What happens to alternatives that did not reach unanimous consensus.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsensusPolicy {
    /// Leave them pending for manual review.
    #[default]
    LeavePending,
    /// Decline every alternative that is still pending after the pass.
    DeclineUnresolved,
}

/// Outcome counts of one consensus pass.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusReport {
    pub accepted: usize,
    pub declined: usize,
    pub pending: usize,
    pub unanimous_spans: usize,
    pub rejected_spans: usize,
}

/// A span hypothesis built during one pass.
struct MergeCandidate {
    /// Position of the alternative that founded this candidate.
    founder: usize,
    supporters: Vec<String>,
}

/// Runs the consensus pass with a configurable policy for unresolved spans.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsensusEngine {
    policy: ConsensusPolicy,
}

impl ConsensusEngine {
    pub fn new(policy: ConsensusPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ConsensusPolicy {
        self.policy
    }

    /// Update the merge status of `alternatives` in place.
    ///
    /// `relationships` is the agreement-wide relationship list the membership
    /// indices refer to; `annotator_count` is the number of annotations that
    /// must all agree on a span.
    pub fn run(
        &self,
        alternatives: &mut [CodeAlternative],
        relationships: &[Relationship],
        annotator_count: usize,
    ) -> ConsensusReport {
        let keys: Vec<SpanKey> = alternatives
            .iter()
            .map(|alt| SpanKey::new(&alt.code.tokens))
            .collect();

        let (unanimous, rejected_spans) =
            find_unanimous_spans(alternatives, &keys, relationships, annotator_count);

        for span in &unanimous {
            let mut accepted = false;
            for (alternative, key) in alternatives.iter_mut().zip(&keys) {
                if key != span || alternative.merge_status != MergeStatus::Pending {
                    continue;
                }
                if accepted {
                    alternative.merge_status = MergeStatus::Declined;
                } else {
                    alternative.merge_status = MergeStatus::Accepted;
                    accepted = true;
                }
            }
        }

        if self.policy == ConsensusPolicy::DeclineUnresolved {
            for alternative in alternatives.iter_mut() {
                if alternative.merge_status == MergeStatus::Pending {
                    alternative.merge_status = MergeStatus::Declined;
                }
            }
        }

        let mut report = ConsensusReport {
            unanimous_spans: unanimous.len(),
            rejected_spans,
            ..ConsensusReport::default()
        };
        for alternative in alternatives.iter() {
            match alternative.merge_status {
                MergeStatus::Accepted => report.accepted += 1,
                MergeStatus::Declined => report.declined += 1,
                MergeStatus::Pending => report.pending += 1,
            }
        }

        info!(
            "Consensus over {} alternatives from {} annotators: {} accepted, {} declined, {} pending",
            alternatives.len(),
            annotator_count,
            report.accepted,
            report.declined,
            report.pending
        );
        report
    }
}

/// Convenience wrapper running the default policy.
pub fn update_merge_status(
    alternatives: &mut [CodeAlternative],
    relationships: &[Relationship],
    annotator_count: usize,
) -> ConsensusReport {
    ConsensusEngine::default().run(alternatives, relationships, annotator_count)
}

/// The sequential candidate pass.  Returns the unanimous spans in the order
/// their candidates were founded and the number of rejected spans.
fn find_unanimous_spans(
    alternatives: &[CodeAlternative],
    keys: &[SpanKey],
    relationships: &[Relationship],
    annotator_count: usize,
) -> (Vec<SpanKey>, usize) {
    let lookup = RelationshipLookup::new(relationships);
    let mut candidates: IndexMap<SpanKey, MergeCandidate> = IndexMap::new();
    let mut rejected: HashSet<SpanKey> = HashSet::new();

    for (position, (alternative, key)) in alternatives.iter().zip(keys).enumerate() {
        let identical = candidates.get(key).map(|candidate| {
            let founder = &alternatives[candidate.founder].code;
            let code = &alternative.code;
            founder.name == code.name
                && founder.tore == code.tore
                && relationship_sets_equal(
                    &lookup,
                    &founder.relationship_memberships,
                    &code.relationship_memberships,
                )
        });

        match identical {
            Some(true) => {
                if let Some(candidate) = candidates.get_mut(key) {
                    if !candidate
                        .supporters
                        .iter()
                        .any(|name| *name == alternative.annotation_name)
                    {
                        candidate.supporters.push(alternative.annotation_name.clone());
                    }
                }
            }
            Some(false) => {
                debug!("Rejecting span {key} after conflicting alternative {}", alternative.index);
                candidates.shift_remove(key);
                rejected.insert(key.clone());
            }
            None if rejected.contains(key) => {}
            None => {
                candidates.insert(
                    key.clone(),
                    MergeCandidate {
                        founder: position,
                        supporters: vec![alternative.annotation_name.clone()],
                    },
                );
            }
        }
    }

    let unanimous = candidates
        .into_iter()
        .filter(|(_, candidate)| candidate.supporters.len() == annotator_count)
        .map(|(key, _)| key)
        .collect();
    (unanimous, rejected.len())
}
