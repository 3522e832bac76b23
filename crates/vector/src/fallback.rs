use sha2::{Digest, Sha256};

/// Deterministic hash-based vector used when the embedding provider is
/// unavailable (spec.md §9 "Deterministic fallback vector"). Not a
/// semantic substitute — it exists purely so downstream vector-store
/// calls do not fail when there is no real embedding to send.
#[must_use]
pub fn hash_fallback_vector(text: &str, dimension: usize) -> Vec<f32> {
    let mut vector = Vec::with_capacity(dimension);
    let mut counter: u32 = 0;
    while vector.len() < dimension {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        hasher.update(counter.to_le_bytes());
        let digest = hasher.finalize();
        for chunk in digest.chunks(4) {
            if vector.len() == dimension {
                break;
            }
            let mut bytes = [0u8; 4];
            bytes[..chunk.len()].copy_from_slice(chunk);
            let value = u32::from_le_bytes(bytes);
            vector.push((value as f32 / u32::MAX as f32) * 2.0 - 1.0);
        }
        counter += 1;
    }
    normalize(&mut vector);
    vector
}

fn normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produces_the_requested_dimension() {
        let vector = hash_fallback_vector("sicilian endgame", 16);
        assert_eq!(vector.len(), 16);
    }

    #[test]
    fn is_deterministic_for_the_same_input() {
        assert_eq!(
            hash_fallback_vector("french defense", 8),
            hash_fallback_vector("french defense", 8)
        );
    }

    #[test]
    fn differs_for_different_inputs() {
        assert_ne!(
            hash_fallback_vector("french defense", 8),
            hash_fallback_vector("sicilian defense", 8)
        );
    }

    #[test]
    fn is_approximately_unit_norm() {
        let vector = hash_fallback_vector("king attack", 32);
        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-3);
    }
}
