//! One-sided (Hestenes) Jacobi SVD.
//!
//! Columns of the working matrix are rotated pairwise until they are mutually
//! orthogonal; their norms are then the singular values, the normalized
//! columns the left singular vectors, and the accumulated rotations the right
//! singular vectors. Pivot order is fixed, so results are reproducible.

use super::{CancelToken, DenseMatrix, Factorization, Factorizer};
use crate::error::EngineError;

const MAX_SWEEPS: usize = 60;
/// Columns count as orthogonal once `|a_p·a_q| <= ORTHO_TOL * |a_p| |a_q|`.
const ORTHO_TOL: f64 = 1e-12;
/// Columns shorter than this fraction of the Frobenius norm are rounding noise and are not rotated.
const NEGLIGIBLE: f64 = 1e-13;
/// Singular values at or below `RANK_TOL * sigma_max` do not count towards the rank.
pub const RANK_TOL: f64 = 1e-10;

#[derive(Debug, Clone, Copy, Default)]
pub struct JacobiSvd;

impl Factorizer for JacobiSvd {
    fn factorize(&self, matrix: &DenseMatrix, k: usize, cancel: &CancelToken) -> Result<Factorization, EngineError> {
        let (m, n) = (matrix.rows(), matrix.cols());
        let mut a: Vec<Vec<f64>> = (0..n).map(|c| matrix.column(c)).collect();
        let mut v: Vec<Vec<f64>> = (0..n)
            .map(|c| {
                let mut e = vec![0.0; n];
                e[c] = 1.0;
                e
            })
            .collect();

        let frobenius = a.iter().map(|col| dot(col, col)).sum::<f64>().sqrt();
        let floor = (NEGLIGIBLE * frobenius).powi(2);

        let mut converged = false;
        for sweep in 0..MAX_SWEEPS {
            if cancel.is_cancelled() {
                return Err(EngineError::LatentCancelled);
            }
            let mut rotations = 0usize;
            for p in 0..n {
                for q in p + 1..n {
                    let alpha = dot(&a[p], &a[p]);
                    let beta = dot(&a[q], &a[q]);
                    let gamma = dot(&a[p], &a[q]);
                    if alpha <= floor || beta <= floor || gamma.abs() <= ORTHO_TOL * (alpha * beta).sqrt() {
                        continue;
                    }
                    let zeta = (beta - alpha) / (2.0 * gamma);
                    let sign = if zeta >= 0.0 { 1.0 } else { -1.0 };
                    let t = sign / (zeta.abs() + (1.0 + zeta * zeta).sqrt());
                    let c = 1.0 / (1.0 + t * t).sqrt();
                    let s = c * t;
                    rotate(&mut a, p, q, c, s);
                    rotate(&mut v, p, q, c, s);
                    rotations += 1;
                }
            }
            tracing::debug!(sweep, rotations, "jacobi sweep");
            if rotations == 0 {
                converged = true;
                break;
            }
        }
        if !converged {
            return Err(EngineError::Factorization(format!("no convergence after {MAX_SWEEPS} sweeps")));
        }

        let sigma_all: Vec<f64> = a.iter().map(|col| dot(col, col).sqrt()).collect();
        let sigma_max = sigma_all.iter().copied().fold(0.0f64, f64::max);
        let tol = RANK_TOL * sigma_max;

        let mut order: Vec<usize> = (0..n).filter(|&j| sigma_all[j] > tol).collect();
        order.sort_by(|&x, &y| sigma_all[y].total_cmp(&sigma_all[x]).then_with(|| x.cmp(&y)));
        order.truncate(k);

        let mut u_cols = Vec::with_capacity(order.len());
        let mut vt_rows = Vec::with_capacity(order.len());
        let mut sigma = Vec::with_capacity(order.len());
        for &j in &order {
            let s = sigma_all[j];
            let mut u: Vec<f64> = a[j].iter().map(|x| x / s).collect();
            let mut right = v[j].clone();
            // Sign convention: the largest-magnitude entry of u is positive
            let pivot = u.iter().copied().fold(0.0f64, |best, x| if x.abs() > best.abs() { x } else { best });
            if pivot < 0.0 {
                u.iter_mut().for_each(|x| *x = -*x);
                right.iter_mut().for_each(|x| *x = -*x);
            }
            u_cols.push(u);
            vt_rows.push(right);
            sigma.push(s);
        }

        Ok(Factorization { u: DenseMatrix::from_columns(m, &u_cols), sigma, vt: rows_matrix(n, vt_rows) })
    }
}

fn rows_matrix(cols: usize, rows: Vec<Vec<f64>>) -> DenseMatrix {
    if rows.is_empty() {
        DenseMatrix::zeros(0, cols)
    } else {
        DenseMatrix::from_rows(&rows)
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 { a.iter().zip(b).map(|(x, y)| x * y).sum() }

fn rotate(cols: &mut [Vec<f64>], p: usize, q: usize, c: f64, s: f64) {
    let (left, right) = cols.split_at_mut(q);
    let (cp, cq) = (&mut left[p], &mut right[0]);
    for (x, y) in cp.iter_mut().zip(cq.iter_mut()) {
        let (xp, xq) = (*x, *y);
        *x = c * xp - s * xq;
        *y = s * xp + c * xq;
    }
}
