//! Vector arithmetic shared by the generator and the index.

/// Inner product of two equal-length vectors.
///
/// For unit vectors this equals their cosine similarity.
#[inline]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "Vectors must have same dimension");
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Euclidean (L2) norm, accumulated in `f64`.
///
/// Every finite `f32` squares to a finite, nonzero `f64`, so the sum neither
/// overflows for huge components nor underflows for tiny ones.
#[inline]
pub fn l2_norm(v: &[f32]) -> f64 {
    v.iter()
        .map(|&x| f64::from(x) * f64::from(x))
        .sum::<f64>()
        .sqrt()
}

/// Rescales `v` to unit L2 norm in place.
///
/// Returns `false` when every component is zero. `v` is then rewritten as
/// the positive zero vector, so degenerate input never produces NaN.
/// Components must be finite.
pub fn normalize_in_place(v: &mut [f32]) -> bool {
    let norm = l2_norm(v);
    if norm == 0.0 {
        v.fill(0.0);
        return false;
    }
    for x in v.iter_mut() {
        *x = (f64::from(*x) / norm) as f32;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_produces_unit_norm() {
        let mut v = vec![3.0, 4.0, 0.0];
        assert!(normalize_in_place(&mut v));
        assert!((l2_norm(&v) - 1.0).abs() < 1e-6);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_guards_zero_vector() {
        let mut v = vec![0.0, -0.0, 0.0, 0.0];
        assert!(!normalize_in_place(&mut v));
        assert!(v.iter().all(|x| *x == 0.0 && x.is_sign_positive()));
    }

    #[test]
    fn test_normalize_huge_components_without_overflow() {
        let mut v = vec![1e20, 1e20, 0.0, 0.0];
        assert!(normalize_in_place(&mut v));
        assert!((l2_norm(&v) - 1.0).abs() < 1e-4);
        assert!((v[0] - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_tiny_components_without_underflow() {
        let mut v = vec![1e-30; 4];
        assert!(normalize_in_place(&mut v));
        assert!((l2_norm(&v) - 1.0).abs() < 1e-4);
        assert!(v.iter().all(|x| (x - 0.5).abs() < 1e-6));
    }

    #[test]
    fn test_dot_of_unit_vectors_is_cosine() {
        let mut a = vec![1.0, 0.0];
        let mut b = vec![1.0, 1.0];
        normalize_in_place(&mut a);
        normalize_in_place(&mut b);
        assert!((dot(&a, &b) - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
        assert!((dot(&b, &b) - 1.0).abs() < 1e-6);
    }
}
