// src/grading/similarity.rs

use thiserror::Error;

use crate::config::{FREE_TEXT_THRESHOLD, OPTION_THRESHOLD};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimilarityError {
    #[error("vector dimensions differ: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },

    #[error("cannot compare empty vectors")]
    EmptyVector,

    /// Zero norm or non-finite components on either side.
    #[error("degenerate vector: {reason}")]
    DegenerateVector { reason: &'static str },
}

/// Cosine similarity `dot(a, b) / (|a| * |b|)`, accumulated in f64.
///
/// Mismatched, empty, zero-norm or non-finite inputs are errors; the result is
/// never NaN and is clamped to `[-1, 1]` against rounding drift.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64, SimilarityError> {
    if a.len() != b.len() {
        return Err(SimilarityError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    if a.is_empty() {
        return Err(SimilarityError::EmptyVector);
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if !(dot.is_finite() && norm_a.is_finite() && norm_b.is_finite()) {
        return Err(SimilarityError::DegenerateVector {
            reason: "non-finite component",
        });
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return Err(SimilarityError::DegenerateVector { reason: "zero norm" });
    }

    Ok((dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0))
}

/// Similarity required to pass.
///
/// Multiple-choice answers are expected to reproduce an option nearly verbatim,
/// free-text answers may paraphrase.
pub fn pass_threshold(has_options: bool) -> f64 {
    if has_options {
        OPTION_THRESHOLD
    } else {
        FREE_TEXT_THRESHOLD
    }
}

/// Similarity exactly at the threshold passes.
pub fn is_correct(similarity: f64, has_options: bool) -> bool {
    similarity >= pass_threshold(has_options)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_identical_vectors() {
        let a = [0.3, -1.2, 4.5, 0.0, 2.25];
        let sim = cosine_similarity(&a, &a).unwrap();
        assert!((sim - 1.0).abs() < EPS);
    }

    #[test]
    fn test_scaled_vector_is_identical_direction() {
        let a = [1.0, 2.0, 3.0];
        let b = [2.0, 4.0, 6.0];
        assert!((cosine_similarity(&a, &b).unwrap() - 1.0).abs() < EPS);
    }

    #[test]
    fn test_orthogonal_vectors() {
        let sim = cosine_similarity(&[1.0, 0.0, 0.0], &[0.0, 3.0, 0.0]).unwrap();
        assert!(sim.abs() < EPS);

        let sim = cosine_similarity(&[1.0, 1.0], &[1.0, -1.0]).unwrap();
        assert!(sim.abs() < EPS);
    }

    #[test]
    fn test_opposite_vectors() {
        let sim = cosine_similarity(&[1.0, 2.0], &[-1.0, -2.0]).unwrap();
        assert!((sim + 1.0).abs() < EPS);
    }

    #[test]
    fn test_zero_vector_is_rejected() {
        let err = cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]).unwrap_err();
        assert_eq!(err, SimilarityError::DegenerateVector { reason: "zero norm" });

        let err = cosine_similarity(&[1.0, 0.0], &[0.0, 0.0]).unwrap_err();
        assert!(matches!(err, SimilarityError::DegenerateVector { .. }));
    }

    #[test]
    fn test_non_finite_is_rejected() {
        let err = cosine_similarity(&[f32::NAN, 1.0], &[1.0, 1.0]).unwrap_err();
        assert!(matches!(err, SimilarityError::DegenerateVector { .. }));

        let err = cosine_similarity(&[f32::INFINITY, 1.0], &[1.0, 1.0]).unwrap_err();
        assert!(matches!(err, SimilarityError::DegenerateVector { .. }));
    }

    #[test]
    fn test_dimension_mismatch() {
        let err = cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]).unwrap_err();
        assert_eq!(err, SimilarityError::DimensionMismatch { left: 2, right: 3 });
    }

    #[test]
    fn test_empty_vectors() {
        assert_eq!(
            cosine_similarity(&[], &[]).unwrap_err(),
            SimilarityError::EmptyVector
        );
    }

    #[test]
    fn test_threshold_selection() {
        assert_eq!(pass_threshold(true), 0.999);
        assert_eq!(pass_threshold(false), 0.95);
    }

    #[test]
    fn test_free_text_boundary() {
        assert!(is_correct(0.95, false));
        assert!(is_correct(0.97, false));
        assert!(!is_correct(0.949_999, false));
    }

    #[test]
    fn test_option_boundary() {
        assert!(is_correct(0.999, true));
        assert!(is_correct(0.9991, true));
        assert!(is_correct(0.9995, true));
        assert!(!is_correct(0.998_999, true));
        // Good enough for free text, not for an option.
        assert!(!is_correct(0.97, true));
    }
}
