//! Shared typed models used across aggregation, consensus, statistics, and
//! storage layers.
//!
//! Field names on the wire follow the repository service that owns the
//! documents, so every record can be read from and written back to it
//! unchanged.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Statistics entry name for Fleiss' Kappa.
pub const FLEISS_KAPPA_NAME: &str = "fleiss";

/// Statistics entry name for Brennan–Prediger Kappa.
pub const BRENNAN_KAPPA_NAME: &str = "brennan";

/// The repository service encodes empty lists as `null`.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// 1. Token / DocWrapper
// ---------------------------------------------------------------------------

/// One word position in a dataset.  `index` is the join key used by codes and
/// relationships and is never renumbered.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub index: usize,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub lemma: String,
    #[serde(default)]
    pub pos: String,
    #[serde(default)]
    pub num_name_codes: usize,
    #[serde(default)]
    pub num_tore_codes: usize,
}

impl Token {
    pub fn new(index: usize, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            index,
            lemma: name.to_lowercase(),
            name,
            pos: String::new(),
            num_name_codes: 0,
            num_tore_codes: 0,
        }
    }
}

/// Document boundaries inside the token stream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocWrapper {
    pub name: String,
    pub begin_index: Option<usize>,
    pub end_index: Option<usize>,
}

// ---------------------------------------------------------------------------
// 2. Relationship
// ---------------------------------------------------------------------------

/// A named, directed link owned by a code and pointing at a set of tokens.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// Index of the owning code inside the same collection.
    #[serde(rename = "TOREEntity")]
    pub owner: Option<usize>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub target_tokens: Vec<usize>,
    #[serde(rename = "relationship_name", default)]
    pub name: String,
    pub index: usize,
}

/// Relationship as sent by the repository service, where the index may be
/// `null`.
#[derive(Deserialize)]
struct WireRelationship {
    #[serde(rename = "TOREEntity")]
    owner: Option<usize>,
    #[serde(default, deserialize_with = "null_as_default")]
    target_tokens: Vec<usize>,
    #[serde(default)]
    relationship_name: String,
    #[serde(default)]
    index: Option<usize>,
}

/// Relationship lists of stored documents.  Entries without an index cannot
/// be referenced by any membership and are skipped.
fn indexed_relationships<'de, D>(deserializer: D) -> Result<Vec<Relationship>, D::Error>
where
    D: Deserializer<'de>,
{
    let wire: Option<Vec<WireRelationship>> = Option::deserialize(deserializer)?;
    Ok(wire
        .unwrap_or_default()
        .into_iter()
        .filter_map(|rel| {
            Some(Relationship {
                index: rel.index?,
                owner: rel.owner,
                target_tokens: rel.target_tokens,
                name: rel.relationship_name,
            })
        })
        .collect())
}

impl Relationship {
    pub fn new(index: usize, owner: usize, name: impl Into<String>, targets: Vec<usize>) -> Self {
        Self {
            owner: Some(owner),
            target_tokens: targets,
            name: name.into(),
            index,
        }
    }
}

// ---------------------------------------------------------------------------
// 3. Code
// ---------------------------------------------------------------------------

/// A labelled span proposed by one annotator.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Code {
    #[serde(default, deserialize_with = "null_as_default")]
    pub tokens: Vec<usize>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tore: String,
    #[serde(default)]
    pub index: usize,
    #[serde(default, deserialize_with = "null_as_default")]
    pub relationship_memberships: Vec<usize>,
}

impl Code {
    pub fn new(index: usize, tokens: Vec<usize>, name: impl Into<String>, tore: impl Into<String>) -> Self {
        Self {
            tokens,
            name: name.into(),
            tore: tore.into(),
            index,
            relationship_memberships: Vec::new(),
        }
    }

    pub fn with_memberships(mut self, memberships: Vec<usize>) -> Self {
        self.relationship_memberships = memberships;
        self
    }
}

// ---------------------------------------------------------------------------
// 4. Annotation
// ---------------------------------------------------------------------------

/// One annotator's complete coding of a dataset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub uploaded_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub name: String,
    pub dataset: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub docs: Vec<DocWrapper>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tokens: Vec<Token>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub codes: Vec<Code>,
    #[serde(default, deserialize_with = "indexed_relationships")]
    pub tore_relationships: Vec<Relationship>,
}

impl Annotation {
    pub fn new(name: impl Into<String>, dataset: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            uploaded_at: now,
            last_updated: now,
            name: name.into(),
            dataset: dataset.into(),
            docs: Vec::new(),
            tokens: Vec::new(),
            codes: Vec::new(),
            tore_relationships: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// 5. MergeStatus / CodeAlternative
// ---------------------------------------------------------------------------

/// Review state of one proposed code inside an agreement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MergeStatus {
    #[default]
    Pending,
    Accepted,
    Declined,
}

impl MergeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeStatus::Pending => "Pending",
            MergeStatus::Accepted => "Accepted",
            MergeStatus::Declined => "Declined",
        }
    }
}

/// A code as a candidate for consensus, tagged with the annotation it came
/// from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CodeAlternative {
    pub annotation_name: String,
    pub merge_status: MergeStatus,
    pub index: usize,
    pub code: Code,
}

impl CodeAlternative {
    pub fn pending(annotation_name: impl Into<String>, code: Code) -> Self {
        Self {
            annotation_name: annotation_name.into(),
            merge_status: MergeStatus::Pending,
            index: code.index,
            code,
        }
    }
}

// ---------------------------------------------------------------------------
// 6. Agreement
// ---------------------------------------------------------------------------

/// Initial and current value of one reliability coefficient.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgreementStatistics {
    pub kappa_name: String,
    pub initial_kappa: f64,
    pub current_kappa: f64,
}

/// The aggregated, mergeable view across several annotations of one dataset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Agreement {
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub name: String,
    pub dataset: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub annotation_names: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub docs: Vec<DocWrapper>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tokens: Vec<Token>,
    #[serde(default, deserialize_with = "indexed_relationships")]
    pub tore_relationships: Vec<Relationship>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub code_alternatives: Vec<CodeAlternative>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub agreement_statistics: Vec<AgreementStatistics>,
    #[serde(default)]
    pub is_completed: bool,
}

impl Agreement {
    /// Wrap an aggregation result into a fresh, uncompleted agreement.
    pub fn from_aggregate(
        name: impl Into<String>,
        dataset: impl Into<String>,
        annotation_names: Vec<String>,
        aggregated: AggregatedAgreement,
    ) -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            last_updated: now,
            name: name.into(),
            dataset: dataset.into(),
            annotation_names,
            docs: aggregated.docs,
            tokens: aggregated.tokens,
            tore_relationships: aggregated.tore_relationships,
            code_alternatives: aggregated.code_alternatives,
            agreement_statistics: Vec::new(),
            is_completed: false,
        }
    }

    /// Number of annotators taking part in this agreement.
    ///
    /// Falls back to the distinct annotation names found among the code
    /// alternatives when no explicit list was recorded.
    pub fn annotator_count(&self) -> usize {
        if !self.annotation_names.is_empty() {
            return distinct_annotator_count(self.annotation_names.iter().map(String::as_str));
        }
        distinct_annotator_count(
            self.code_alternatives
                .iter()
                .map(|alt| alt.annotation_name.as_str()),
        )
    }

    pub fn statistic(&self, kappa_name: &str) -> Option<&AgreementStatistics> {
        self.agreement_statistics
            .iter()
            .find(|stat| stat.kappa_name == kappa_name)
    }
}

/// Number of raters behind a list of annotation names; repeats count once.
pub fn distinct_annotator_count<'a>(names: impl IntoIterator<Item = &'a str>) -> usize {
    names.into_iter().collect::<HashSet<&str>>().len()
}

// ---------------------------------------------------------------------------
// 7. Aggregation payload / vocabulary / results
// ---------------------------------------------------------------------------

/// The agreement fields produced by aggregating annotations.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregatedAgreement {
    pub docs: Vec<DocWrapper>,
    pub tokens: Vec<Token>,
    pub tore_relationships: Vec<Relationship>,
    pub code_alternatives: Vec<CodeAlternative>,
}

/// The known category labels and relationship names.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    #[serde(rename = "tores", default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub relationship_names: Vec<String>,
}

impl Vocabulary {
    pub fn new(categories: Vec<String>, relationship_names: Vec<String>) -> Self {
        Self {
            categories,
            relationship_names,
        }
    }
}

/// Fleiss' Kappa and Brennan–Prediger Kappa, both clamped at zero.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct KappaPair {
    pub fleiss_kappa: f64,
    pub brennan_kappa: f64,
}
