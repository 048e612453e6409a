//! Scalar CPU kernels for matrix-vector products.
//!
//! These run the whole reduction on one thread and serve as the sequential
//! correctness baseline for the GPU strategies.

/// Computes the matrix-vector product row by row: `out[i] = dot(w_rows[i], x)`.
pub fn matvec_f32_scalar(out: &mut [f32], x: &[f32], w_rows: &[f32], n: usize) {
    for (i, out_val) in out.iter_mut().enumerate() {
        let row = &w_rows[i * n..(i + 1) * n];
        let sum: f32 = x.iter().zip(row.iter()).map(|(&a, &b)| a * b).sum();
        *out_val = sum;
    }
}

/// Like [`matvec_f32_scalar`] but accumulates in f64 before rounding to f32.
/// Used as the test oracle for the single-precision kernels.
pub fn matvec_f64_reference(out: &mut [f32], x: &[f32], w_rows: &[f32], n: usize) {
    for (i, out_val) in out.iter_mut().enumerate() {
        let row = &w_rows[i * n..(i + 1) * n];
        let sum: f64 = x
            .iter()
            .zip(row.iter())
            .map(|(&a, &b)| f64::from(a) * f64::from(b))
            .sum();
        *out_val = sum as f32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matvec_concrete() {
        // W = [[1,2,3],[4,5,6]], x = [1,1,1] -> [6, 15]
        let w = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let x = [1.0, 1.0, 1.0];
        let mut out = [0.0f32; 2];

        matvec_f32_scalar(&mut out, &x, &w, 3);
        assert_eq!(out, [6.0, 15.0]);
    }

    #[test]
    fn test_matvec_unit_row_selects_element() {
        let w = [0.0, 0.0, 1.0, 0.0];
        let x = [7.0, -3.0, 42.0, 9.0];
        let mut out = [0.0f32; 1];

        matvec_f32_scalar(&mut out, &x, &w, 4);
        assert_eq!(out, [42.0]);
    }

    #[test]
    fn test_matvec_empty_rows() {
        // n = 0: every dot product is the empty sum.
        let mut out = [1.0f32; 3];
        matvec_f32_scalar(&mut out, &[], &[], 0);
        assert_eq!(out, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_f64_reference_agrees_on_small_input() {
        let w: Vec<f32> = (0..12).map(|i| (i as f32) * 0.25 - 1.0).collect();
        let x: Vec<f32> = (0..4).map(|i| (i as f32) * 0.5).collect();

        let mut out_f32 = [0.0f32; 3];
        let mut out_f64 = [0.0f32; 3];
        matvec_f32_scalar(&mut out_f32, &x, &w, 4);
        matvec_f64_reference(&mut out_f64, &x, &w, 4);

        for (a, b) in out_f32.iter().zip(out_f64.iter()) {
            assert!((a - b).abs() < 1e-6, "{} vs {}", a, b);
        }
    }
}
