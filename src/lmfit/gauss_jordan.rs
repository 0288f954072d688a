//! In-place Gauss-Jordan elimination with partial pivoting.
use nalgebra::DMatrix;

/// Solve `left · X = right` in place, leaving `X` in `right`.
///
/// Rows are swapped to the largest absolute entry of the pivot column before
/// each reduction. Passing the identity as `right` yields the inverse of
/// `left`. A zero pivot is not reported: the division produces NaN or
/// infinite entries that propagate to the result, and callers check for them.
pub fn gauss_jordan(left: &mut DMatrix<f64>, right: &mut DMatrix<f64>) {
    let n = left.nrows();
    debug_assert_eq!(left.ncols(), n, "left matrix must be square");
    debug_assert_eq!(right.nrows(), n, "right matrix row count mismatch");
    let r_cols = right.ncols();

    for i in 0..n {
        let mut max = i;
        for j in (i + 1)..n {
            if left[(j, i)].abs() > left[(max, i)].abs() {
                max = j;
            }
        }
        if max != i {
            left.swap_rows(i, max);
            right.swap_rows(i, max);
        }

        let pivot = left[(i, i)];
        for j in 0..n {
            if j == i {
                continue;
            }
            let d = left[(j, i)] / pivot;
            left[(j, i)] = 0.0;
            for k in (i + 1)..n {
                let v = d * left[(i, k)];
                left[(j, k)] -= v;
            }
            for k in 0..r_cols {
                let v = d * right[(i, k)];
                right[(j, k)] -= v;
            }
        }
    }

    for i in 0..n {
        let d = left[(i, i)];
        for k in 0..r_cols {
            right[(i, k)] /= d;
        }
        left[(i, i)] = 1.0;
    }
}

/// Inverse of `matrix` via [`gauss_jordan`] against the identity.
pub fn invert(matrix: &DMatrix<f64>) -> DMatrix<f64> {
    let n = matrix.nrows();
    let mut left = matrix.clone();
    let mut right = DMatrix::<f64>::identity(n, n);
    gauss_jordan(&mut left, &mut right);
    right
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverse_of_well_conditioned_matrix() {
        let a = DMatrix::from_row_slice(
            4,
            4,
            &[
                4.0, 1.0, 0.5, 0.0, //
                1.0, 5.0, 1.0, 0.25, //
                0.5, 1.0, 6.0, 1.0, //
                0.0, 0.25, 1.0, 3.0,
            ],
        );
        let inv = invert(&a);
        let reference = a.clone().try_inverse().expect("matrix is invertible");
        let rel = (&inv - &reference).norm() / reference.norm();
        assert!(rel < 1e-9, "relative error {rel}");
        let identity = &a * &inv;
        assert!((identity - DMatrix::<f64>::identity(4, 4)).norm() < 1e-12);
    }

    #[test]
    fn pivoting_handles_zero_leading_entry() {
        let a = DMatrix::from_row_slice(2, 2, &[0.0, 2.0, 3.0, 1.0]);
        let mut left = a.clone();
        let mut rhs = DMatrix::from_column_slice(2, 1, &[4.0, 5.0]);
        gauss_jordan(&mut left, &mut rhs);
        // 3x + y = 5, 2y = 4
        assert!((rhs[(0, 0)] - 1.0).abs() < 1e-12);
        assert!((rhs[(1, 0)] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn singular_matrix_yields_nan() {
        let a = DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 0.0, 0.0]);
        let inv = invert(&a);
        assert!(inv.iter().any(|v| v.is_nan()), "expected NaN, got {inv}");
    }
}
