//! Token-by-alternative tally matrices.

use std::collections::{HashMap, HashSet};

use crate::consensus::RelationshipLookup;
use crate::models::{CodeAlternative, MergeStatus, Relationship, Token};
use crate::statistics::space::CategorySpace;

/// Raw and row-level tallies over the tokens covered by at least one
/// non-declined alternative.
///
/// Both matrices share rows, columns, and cell total.  In the row-level
/// matrix every accepted alternative of a row adds to one shared cell (the
/// column of the first accepted alternative seen for that row).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TallyMatrix {
    pub token_indices: Vec<usize>,
    pub raw: Vec<Vec<u32>>,
    pub rows: Vec<Vec<u32>>,
    pub total_cells: u64,
    pub column_count: usize,
}

impl TallyMatrix {
    pub fn build(
        alternatives: &[CodeAlternative],
        tokens: &[Token],
        relationships: &[Relationship],
        space: &CategorySpace,
        annotator_count: usize,
    ) -> Self {
        let lookup = RelationshipLookup::new(relationships);
        let column_count = space.column_count();

        let mut by_token: HashMap<usize, Vec<&CodeAlternative>> = HashMap::new();
        for alternative in alternatives
            .iter()
            .filter(|alt| alt.merge_status != MergeStatus::Declined)
        {
            // A token listed twice by one code still counts once.
            let covered: HashSet<usize> = alternative.code.tokens.iter().copied().collect();
            for token in covered {
                by_token.entry(token).or_default().push(alternative);
            }
        }

        let mut matrix = TallyMatrix {
            column_count,
            ..TallyMatrix::default()
        };

        for token in tokens {
            let Some(covering) = by_token.get(&token.index) else {
                continue;
            };

            let mut raw_row = vec![0u32; column_count];
            let mut shared_row = vec![0u32; column_count];
            let mut supporters: HashSet<&str> = HashSet::new();
            let mut accepted_column: Option<usize> = None;

            for alternative in covering {
                supporters.insert(alternative.annotation_name.as_str());
                let code = &alternative.code;
                let columns: Vec<usize> = if code.relationship_memberships.is_empty() {
                    vec![space.column(&code.name, &code.tore, "")]
                } else {
                    code.relationship_memberships
                        .iter()
                        .map(|membership| {
                            let relationship = lookup
                                .get(*membership)
                                .map(|relationship| relationship.name.as_str())
                                .unwrap_or("");
                            space.column(&code.name, &code.tore, relationship)
                        })
                        .collect()
                };

                for column in columns {
                    raw_row[column] += 1;
                    if alternative.merge_status == MergeStatus::Accepted {
                        let shared = *accepted_column.get_or_insert(column);
                        shared_row[shared] += 1;
                    } else {
                        shared_row[column] += 1;
                    }
                }
            }

            let shortfall = annotator_count.saturating_sub(supporters.len()) as u32;
            raw_row[0] += shortfall;
            shared_row[0] += shortfall;

            matrix.total_cells += raw_row.iter().map(|&cell| u64::from(cell)).sum::<u64>();
            matrix.token_indices.push(token.index);
            matrix.raw.push(raw_row);
            matrix.rows.push(shared_row);
        }

        matrix
    }

    pub fn row_count(&self) -> usize {
        self.raw.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Code, Vocabulary};

    fn tokens(n: usize) -> Vec<Token> {
        (0..n).map(|i| Token::new(i, format!("w{i}"))).collect()
    }

    fn with_status(mut alt: CodeAlternative, status: MergeStatus) -> CodeAlternative {
        alt.merge_status = status;
        alt
    }

    #[test]
    fn only_covered_tokens_become_rows() {
        let alternatives = vec![
            CodeAlternative::pending("a1", Code::new(0, vec![1], "app", "")),
            with_status(
                CodeAlternative::pending("a2", Code::new(1, vec![3], "app", "")),
                MergeStatus::Declined,
            ),
        ];
        let space = CategorySpace::build(&alternatives, &Vocabulary::default());
        let matrix = TallyMatrix::build(&alternatives, &tokens(5), &[], &space, 2);

        assert_eq!(matrix.token_indices, vec![1]);
        assert_eq!(matrix.raw, vec![vec![1, 1]]);
        assert_eq!(matrix.total_cells, 2);
    }

    #[test]
    fn repeated_token_in_one_code_is_tallied_once() {
        let alternatives = vec![CodeAlternative::pending(
            "a1",
            Code::new(0, vec![0, 0], "app", ""),
        )];
        let space = CategorySpace::build(&alternatives, &Vocabulary::default());
        let matrix = TallyMatrix::build(&alternatives, &tokens(1), &[], &space, 1);

        assert_eq!(matrix.raw, vec![vec![0, 1]]);
        assert_eq!(matrix.total_cells, 1);
    }

    #[test]
    fn one_cell_per_relationship_membership() {
        let relationships = vec![
            Relationship::new(0, 0, "uses", vec![4]),
            Relationship::new(1, 0, "refines", vec![5]),
        ];
        let alternatives = vec![CodeAlternative::pending(
            "a1",
            Code::new(0, vec![0], "app", "Software").with_memberships(vec![0, 1]),
        )];
        let vocabulary = Vocabulary::new(vec!["Software".into()], vec!["uses".into(), "refines".into()]);
        let space = CategorySpace::build(&alternatives, &vocabulary);
        let matrix = TallyMatrix::build(&alternatives, &tokens(1), &relationships, &space, 1);

        let row = &matrix.raw[0];
        assert_eq!(row[space.column("app", "Software", "uses")], 1);
        assert_eq!(row[space.column("app", "Software", "refines")], 1);
        assert_eq!(matrix.total_cells, 2);
    }

    #[test]
    fn accepted_alternatives_share_one_cell_in_row_matrix() {
        let alternatives = vec![
            with_status(
                CodeAlternative::pending("a1", Code::new(0, vec![0], "app", "")),
                MergeStatus::Accepted,
            ),
            with_status(
                CodeAlternative::pending("a2", Code::new(1, vec![0, 1], "tool", "")),
                MergeStatus::Accepted,
            ),
        ];
        let space = CategorySpace::build(&alternatives, &Vocabulary::default());
        let matrix = TallyMatrix::build(&alternatives, &tokens(2), &[], &space, 2);

        let app = space.column("app", "", "");
        let tool = space.column("tool", "", "");
        assert_eq!(matrix.raw[0][app], 1);
        assert_eq!(matrix.raw[0][tool], 1);
        assert_eq!(matrix.rows[0][app], 2);
        assert_eq!(matrix.rows[0][tool], 0);
        // token 1 is only covered by a2, a1's silence lands in column 0
        assert_eq!(matrix.rows[1][0], 1);
        assert_eq!(matrix.rows[1][tool], 1);
        assert_eq!(matrix.total_cells, 4);
    }
}
