//! Fleiss' Kappa and Brennan–Prediger Kappa over a [`TallyMatrix`].

use crate::models::KappaPair;
use crate::statistics::matrix::TallyMatrix;

/// Chance agreement from the column marginals of the raw matrix.
fn chance_agreement(matrix: &TallyMatrix) -> f64 {
    if matrix.total_cells == 0 {
        return 0.0;
    }
    let total = matrix.total_cells as f64;
    (0..matrix.column_count)
        .map(|column| {
            let column_sum: u64 = matrix.raw.iter().map(|row| u64::from(row[column])).sum();
            let pj = column_sum as f64 / total;
            pj * pj
        })
        .sum()
}

/// Observed agreement of one row.  A row with fewer than two ratings has no
/// rater pairs and counts as agreeing with itself.
fn row_agreement(row: &[u32]) -> f64 {
    let s: f64 = row.iter().map(|&cell| f64::from(cell)).sum();
    if s < 2.0 {
        return 1.0;
    }
    let squares: f64 = row.iter().map(|&cell| f64::from(cell) * f64::from(cell)).sum();
    (squares - s) / (s * (s - 1.0))
}

/// Mean observed agreement over the row-level matrix.
fn observed_agreement(matrix: &TallyMatrix) -> f64 {
    if matrix.rows.is_empty() {
        return 0.0;
    }
    let sum: f64 = matrix.rows.iter().map(|row| row_agreement(row)).sum();
    sum / matrix.rows.len() as f64
}

fn kappa(p_head: f64, pc: f64) -> f64 {
    if 1.0 - pc == 0.0 {
        1.0
    } else {
        (p_head - pc) / (1.0 - pc)
    }
}

/// Both coefficients, floored at zero.
///
/// Brennan–Prediger chance agreement is `total / (total + 1)^2` over the cell
/// total, which downstream consumers rely on numerically.
pub fn kappas_from_matrix(matrix: &TallyMatrix) -> KappaPair {
    let p_head = observed_agreement(matrix);
    let pc = chance_agreement(matrix);

    let total = matrix.total_cells as f64;
    let brennan_pc = total / ((total + 1.0) * (total + 1.0));

    KappaPair {
        fleiss_kappa: kappa(p_head, pc).max(0.0),
        brennan_kappa: kappa(p_head, brennan_pc).max(0.0),
    }
}
