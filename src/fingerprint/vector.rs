// Vector math shared by fingerprinting and matching.
//
// Embeddings arrive pre-computed (see `ingest`), so this module only needs
// averaging and distance. Cosine distance follows the usual
// `1 - cos(a, b)` convention with a small epsilon in the denominator, so a
// zero vector sits at distance 1.0 from everything instead of producing NaN.

use anyhow::Result;

/// Added to the norm product so zero vectors don't divide by zero.
pub const NORM_EPSILON: f64 = 1e-10;

/// Element-wise mean of a set of equal-length vectors.
///
/// This is how a section fingerprint is formed: the centroid of every
/// historical link published in that section.
pub fn mean_vector(vectors: &[Vec<f64>]) -> Result<Vec<f64>> {
    let Some(first) = vectors.first() else {
        anyhow::bail!("Cannot average an empty set of vectors");
    };
    let dim = first.len();
    let mut mean = vec![0.0_f64; dim];

    for (i, v) in vectors.iter().enumerate() {
        if v.len() != dim {
            anyhow::bail!(
                "Vector {} has dimension {}, expected {}",
                i,
                v.len(),
                dim
            );
        }
        for (acc, x) in mean.iter_mut().zip(v) {
            *acc += x;
        }
    }

    let n = vectors.len() as f64;
    for val in &mut mean {
        *val /= n;
    }
    Ok(mean)
}

/// Cosine distance in [0, 2]: 0 for identical direction, 1 for orthogonal.
///
/// Mismatched or empty inputs return 1.0 (no evidence of similarity).
pub fn cosine_distance(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 1.0;
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    1.0 - dot / (norm(a) * norm(b) + NORM_EPSILON)
}

/// Squared Euclidean distance, used by k-means.
pub fn squared_euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

pub fn norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// Round to 4 decimal places, the precision distances are reported at.
pub fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_vector_multiple() {
        let mean = mean_vector(&[vec![1.0, 0.0, 4.0], vec![0.0, 1.0, 2.0]]).unwrap();
        assert_eq!(mean, vec![0.5, 0.5, 3.0]);
    }

    #[test]
    fn test_mean_vector_empty_errors() {
        assert!(mean_vector(&[]).is_err());
    }

    #[test]
    fn test_mean_vector_mismatched_dims_errors() {
        let err = mean_vector(&[vec![1.0, 2.0], vec![1.0]]).unwrap_err();
        assert!(err.to_string().contains("dimension 1"));
    }

    #[test]
    fn test_cosine_distance_identical() {
        let d = cosine_distance(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]);
        assert!(d.abs() < 1e-9);
    }

    #[test]
    fn test_cosine_distance_orthogonal() {
        let d = cosine_distance(&[1.0, 0.0], &[0.0, 1.0]);
        assert!((d - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_cosine_distance_opposite() {
        let d = cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]);
        assert!((d - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_distance_zero_vector() {
        let d = cosine_distance(&[0.0, 0.0], &[1.0, 1.0]);
        assert!((d - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_cosine_distance_mismatched() {
        assert_eq!(cosine_distance(&[1.0], &[1.0, 0.0]), 1.0);
        assert_eq!(cosine_distance(&[], &[]), 1.0);
    }

    #[test]
    fn test_round4() {
        assert_eq!(round4(0.123456), 0.1235);
        assert_eq!(round4(0.5), 0.5);
    }
}
