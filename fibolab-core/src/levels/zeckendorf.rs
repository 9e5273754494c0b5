//! Zeckendorf representation: every non-negative integer is a unique sum of
//! non-consecutive Fibonacci numbers.
//!
//! Indices refer to the encoder's Fibonacci table and are returned ascending.
//! The compressor never emits index 0 or 1, so `compress(1) == [2]`.

use super::{LevelEncoder, LevelError};

impl LevelEncoder {
    /// Greedy largest-Fibonacci-first decomposition of `value`.
    pub fn zeckendorf_compress(&self, value: i128) -> Result<Vec<usize>, LevelError> {
        if value < 0 {
            return Err(LevelError::InvalidInput(format!(
                "cannot compress negative value {value}"
            )));
        }
        let mut remaining = value as u128;
        let mut indices = Vec::new();
        for i in (2..=self.max_index()).rev() {
            if remaining == 0 {
                break;
            }
            let f = self.fibonacci_table()[i];
            if f <= remaining {
                indices.push(i);
                remaining -= f;
            }
        }
        if remaining != 0 {
            return Err(LevelError::InvalidInput(format!(
                "{value} exceeds the largest representable value for max index {}",
                self.max_index()
            )));
        }
        indices.reverse();
        Ok(indices)
    }

    /// Sum of `F(i)` over `indices`. Indices must be ascending with gaps ≥ 2.
    pub fn zeckendorf_decompress(&self, indices: &[usize]) -> Result<u128, LevelError> {
        if let Some((first, second)) = first_consecutive_pair(indices) {
            return Err(LevelError::InvalidRepresentation { first, second });
        }
        indices
            .iter()
            .map(|&i| self.fibonacci(i))
            .sum::<Result<u128, _>>()
    }

    /// Whether `indices` is a well-formed representation for this table.
    pub fn is_valid_zeckendorf(&self, indices: &[usize]) -> bool {
        first_consecutive_pair(indices).is_none()
            && indices.iter().all(|&i| i <= self.max_index())
    }
}

/// Shorthand for [`LevelEncoder::zeckendorf_compress`] on the shared encoder.
pub fn compress(value: i128) -> Result<Vec<usize>, LevelError> {
    LevelEncoder::shared().zeckendorf_compress(value)
}

/// Shorthand for [`LevelEncoder::zeckendorf_decompress`] on the shared encoder.
pub fn decompress(indices: &[usize]) -> Result<u128, LevelError> {
    LevelEncoder::shared().zeckendorf_decompress(indices)
}

fn first_consecutive_pair(indices: &[usize]) -> Option<(usize, usize)> {
    indices
        .windows(2)
        .find(|w| w[1] < w[0] + 2)
        .map(|w| (w[0], w[1]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compress_100() {
        assert_eq!(compress(100).unwrap(), vec![4, 6, 11]);
        assert_eq!(decompress(&[4, 6, 11]).unwrap(), 100);
    }

    #[test]
    fn compress_small_values() {
        assert_eq!(compress(0).unwrap(), Vec::<usize>::new());
        assert_eq!(compress(1).unwrap(), vec![2]);
        assert_eq!(compress(2).unwrap(), vec![3]);
        assert_eq!(compress(4).unwrap(), vec![2, 4]);
    }

    #[test]
    fn compress_negative_fails() {
        assert!(matches!(compress(-1), Err(LevelError::InvalidInput(_))));
    }

    #[test]
    fn compress_beyond_table_fails() {
        let enc = LevelEncoder::new(10).unwrap();
        // Largest representable: F(10)+F(8)+F(6)+F(4)+F(2) = 55+21+8+3+1 = 88
        assert!(enc.zeckendorf_compress(88).is_ok());
        assert!(enc.zeckendorf_compress(89).is_err());
    }

    #[test]
    fn decompress_rejects_consecutive() {
        assert_eq!(
            decompress(&[4, 5, 11]),
            Err(LevelError::InvalidRepresentation {
                first: 4,
                second: 5
            })
        );
        // Duplicates and descending order are rejected too.
        assert!(decompress(&[6, 6]).is_err());
        assert!(decompress(&[11, 6]).is_err());
    }

    #[test]
    fn decompress_out_of_range_fails() {
        let enc = LevelEncoder::new(10).unwrap();
        assert!(matches!(
            enc.zeckendorf_decompress(&[2, 12]),
            Err(LevelError::IndexOutOfRange { index: 12, .. })
        ));
    }

    #[test]
    fn decompress_empty_is_zero() {
        assert_eq!(decompress(&[]).unwrap(), 0);
    }

    #[test]
    fn validity_check() {
        let enc = LevelEncoder::shared();
        assert!(enc.is_valid_zeckendorf(&[4, 6, 11]));
        assert!(enc.is_valid_zeckendorf(&[]));
        assert!(!enc.is_valid_zeckendorf(&[4, 5]));
        assert!(!enc.is_valid_zeckendorf(&[2, 500]));
    }
}
