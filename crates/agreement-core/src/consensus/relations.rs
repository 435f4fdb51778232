//! Structural comparison of relationship memberships.
//!
//! Relationship indices are reassigned at every remap step, so two codes are
//! compared by what their relationships look like (name plus target tokens),
//! never by the numbers in their membership lists.

use std::collections::HashMap;

use tracing::debug;

use crate::models::Relationship;
use crate::span::SpanKey;

/// Name and target span of a relationship, independent of its index.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RelationshipShape<'a> {
    pub name: &'a str,
    pub targets: SpanKey,
}

/// Lookup of relationships by their current index.
pub struct RelationshipLookup<'a> {
    by_index: HashMap<usize, &'a Relationship>,
}

impl<'a> RelationshipLookup<'a> {
    pub fn new(relationships: &'a [Relationship]) -> Self {
        let mut by_index = HashMap::with_capacity(relationships.len());
        for relationship in relationships {
            by_index.entry(relationship.index).or_insert(relationship);
        }
        Self { by_index }
    }

    pub fn get(&self, index: usize) -> Option<&'a Relationship> {
        self.by_index.get(&index).copied()
    }

    /// Resolve membership indices to shapes.  Indices that do not resolve are
    /// treated as absent.
    pub fn shapes(&self, memberships: &[usize]) -> Vec<RelationshipShape<'a>> {
        memberships
            .iter()
            .filter_map(|membership| match self.get(*membership) {
                Some(relationship) => Some(RelationshipShape {
                    name: relationship.name.as_str(),
                    targets: SpanKey::new(&relationship.target_tokens),
                }),
                None => {
                    debug!("Ignoring unresolvable relationship membership {membership}");
                    None
                }
            })
            .collect()
    }
}

/// Whether two membership lists describe the same multiset of relationships.
pub fn relationship_sets_equal(lookup: &RelationshipLookup<'_>, a: &[usize], b: &[usize]) -> bool {
    let mut left = lookup.shapes(a);
    let mut right = lookup.shapes(b);
    if left.len() != right.len() {
        return false;
    }
    left.sort_unstable();
    right.sort_unstable();
    left == right
}
