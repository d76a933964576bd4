//! Fixtures and assertions shared by the tests and benchmarks of the workspace.
use nalgebra::DVector;
use nalgebra_sparse::{CooMatrix, CsrMatrix};

/// Approximate equality of scalars.
#[macro_export]
macro_rules! assert_approx_eq {
    ($x:expr, $y:expr, abstol = $tol:expr) => {{
        let (x, y): (f64, f64) = ($x, $y);
        assert!((x - y).abs() <= $tol, "|{} - {}| exceeds abstol {:e}", x, y, $tol);
    }};
}

fn tridiagonal(n: usize, diagonal: f64, off_diagonal: f64) -> CsrMatrix<f64> {
    let mut coo = CooMatrix::new(n, n);
    for i in 0..n {
        coo.push(i, i, diagonal);
        if i + 1 < n {
            coo.push(i, i + 1, off_diagonal);
            coo.push(i + 1, i, off_diagonal);
        }
    }
    CsrMatrix::from(&coo)
}

/// Stiffness matrix of linear elements on a uniform mesh of the unit interval with `n` interior
/// nodes, without boundary nodes. Symmetric positive definite.
pub fn laplacian_1d(n: usize) -> CsrMatrix<f64> {
    let h = 1.0 / (n as f64 + 1.0);
    tridiagonal(n, 2.0 / h, -1.0 / h)
}

/// Mass matrix of linear elements on the same mesh as [`laplacian_1d`].
pub fn mass_1d(n: usize) -> CsrMatrix<f64> {
    let h = 1.0 / (n as f64 + 1.0);
    tridiagonal(n, 4.0 * h / 6.0, h / 6.0)
}

/// Load vector of a unit source on the same mesh as [`laplacian_1d`].
pub fn unit_load_1d(n: usize) -> DVector<f64> {
    let h = 1.0 / (n as f64 + 1.0);
    DVector::repeat(n, h)
}

/// The vector `[start, start + 1, ...]` of length `n`.
pub fn ramp(n: usize, start: f64) -> DVector<f64> {
    DVector::from_fn(n, |i, _| start + i as f64)
}
