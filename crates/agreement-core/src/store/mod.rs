//! Storage collaborators: where annotations, agreements, and the category and
//! relationship vocabularies come from.

pub mod cache;
pub mod database;
pub mod schema;

use crate::errors::AgreementResult;
use crate::models::{Agreement, Annotation, Vocabulary};

pub use cache::VocabularyCache;
pub use database::Database;

/// Named annotations and agreements.
pub trait AnnotationStore {
    fn get_annotation(&self, name: &str) -> AgreementResult<Annotation>;

    fn get_agreement(&self, name: &str) -> AgreementResult<Agreement>;

    fn store_annotation(&self, annotation: &Annotation) -> AgreementResult<()>;

    fn store_agreement(&self, agreement: &Agreement) -> AgreementResult<()>;

    /// Fetch several annotations, preserving the order of `names`.
    fn get_annotations(&self, names: &[String]) -> AgreementResult<Vec<Annotation>> {
        names.iter().map(|name| self.get_annotation(name)).collect()
    }
}

/// The known category labels and relationship names.
pub trait VocabularyStore {
    fn get_all_categories(&self) -> AgreementResult<Vec<String>>;

    fn get_all_relationship_names(&self) -> AgreementResult<Vec<String>>;

    fn get_vocabulary(&self) -> AgreementResult<Vocabulary> {
        Ok(Vocabulary::new(
            self.get_all_categories()?,
            self.get_all_relationship_names()?,
        ))
    }
}
