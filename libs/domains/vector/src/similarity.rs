//! Cosine similarity for the linear-scan file store.

/// `dot(a, b) / (|a| * |b|)`, or `0.0` when either norm is zero.
///
/// Accumulates in `f64` and clamps to `[-1, 1]`. Callers guarantee equal
/// lengths; extra trailing components of the longer slice are ignored.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let score = dot / (norm_a.sqrt() * norm_b.sqrt());
    if score.is_nan() {
        return 0.0;
    }

    score.clamp(-1.0, 1.0) as f32
}
