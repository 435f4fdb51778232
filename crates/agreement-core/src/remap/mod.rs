//! Index remapping between per-annotation and agreement-wide index spaces.

pub mod aggregate;
pub mod export;

pub use aggregate::aggregate_annotations;
pub use export::{accepted_codes_and_relationships, export_annotation, recount_tokens};
