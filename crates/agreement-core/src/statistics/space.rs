//! Column layout of the tally matrix.
//!
//! Every (name, category, relationship) triple maps to one column.  Each
//! dimension reserves ordinal 0 for "none", so column 0 means "nothing
//! proposed" and also absorbs the shortfall of silent annotators.

use indexmap::IndexSet;

use crate::models::{CodeAlternative, Vocabulary};

#[derive(Clone, Debug)]
pub struct CategorySpace {
    names: IndexSet<String>,
    categories: IndexSet<String>,
    relationships: IndexSet<String>,
}

fn ordinals<'a>(values: impl IntoIterator<Item = &'a str>) -> IndexSet<String> {
    let mut set = IndexSet::new();
    set.insert(String::new());
    for value in values {
        if !value.is_empty() && !set.contains(value) {
            set.insert(value.to_string());
        }
    }
    set
}

impl CategorySpace {
    /// Names come from the alternatives (in first-use order), categories and
    /// relationship names from the vocabulary.
    pub fn build(alternatives: &[CodeAlternative], vocabulary: &Vocabulary) -> Self {
        Self {
            names: ordinals(alternatives.iter().map(|alt| alt.code.name.as_str())),
            categories: ordinals(vocabulary.categories.iter().map(String::as_str)),
            relationships: ordinals(vocabulary.relationship_names.iter().map(String::as_str)),
        }
    }

    pub fn name_count(&self) -> usize {
        self.names.len()
    }

    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.relationships.len()
    }

    pub fn column_count(&self) -> usize {
        self.name_count() * self.category_count() * self.relationship_count()
    }

    /// Column of a triple.  Values outside the known vocabulary fall into the
    /// "none" slot of their dimension.
    pub fn column(&self, name: &str, category: &str, relationship: &str) -> usize {
        let name_index = self.names.get_index_of(name).unwrap_or(0);
        let category_index = self.categories.get_index_of(category).unwrap_or(0);
        let relationship_index = self.relationships.get_index_of(relationship).unwrap_or(0);
        let categories = self.category_count();
        let relationships = self.relationship_count();
        name_index * categories * relationships + category_index * relationships + relationship_index
    }
}
