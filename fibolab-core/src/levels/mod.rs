//! Integer-exact Fibonacci/Lucas level encoding.
//!
//! Prices and durations are mapped to sequence indices using integer
//! arithmetic only. Tables are built once at construction and never mutated,
//! so a single encoder can be shared freely across concurrent runs (see
//! [`LevelEncoder::shared`]).
//!
//! Sequences:
//! - Fibonacci (OEIS A000045): F(0)=0, F(1)=1, F(n)=F(n-1)+F(n-2)
//! - Lucas (OEIS A000032): L(0)=2, L(1)=1, L(n)=L(n-1)+L(n-2)

pub mod zeckendorf;

use std::sync::OnceLock;
use thiserror::Error;

/// Default largest precomputed index.
pub const DEFAULT_MAX_INDEX: usize = 100;

/// Largest index for which both F(n) and L(n) fit in a `u128`.
pub const MAX_SUPPORTED_INDEX: usize = 184;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LevelError {
    #[error("sequence index {index} out of range (max {max})")]
    IndexOutOfRange { index: usize, max: usize },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("indices {first} and {second} are consecutive")]
    InvalidRepresentation { first: usize, second: usize },
}

/// Precomputed Fibonacci and Lucas tables with nearest-level lookup.
#[derive(Debug, Clone)]
pub struct LevelEncoder {
    fib: Vec<u128>,
    lucas: Vec<u128>,
}

static SHARED: OnceLock<LevelEncoder> = OnceLock::new();

impl LevelEncoder {
    /// Build tables for indices `0..=max_index`.
    pub fn new(max_index: usize) -> Result<Self, LevelError> {
        if max_index < 2 || max_index > MAX_SUPPORTED_INDEX {
            return Err(LevelError::InvalidInput(format!(
                "max_index must be in 2..={MAX_SUPPORTED_INDEX}, got {max_index}"
            )));
        }
        Ok(Self {
            fib: build_table(0, 1, max_index),
            lucas: build_table(2, 1, max_index),
        })
    }

    /// Process-wide encoder with the default table size.
    pub fn shared() -> &'static LevelEncoder {
        SHARED.get_or_init(|| LevelEncoder {
            fib: build_table(0, 1, DEFAULT_MAX_INDEX),
            lucas: build_table(2, 1, DEFAULT_MAX_INDEX),
        })
    }

    pub fn max_index(&self) -> usize {
        self.fib.len() - 1
    }

    pub fn fibonacci(&self, n: usize) -> Result<u128, LevelError> {
        self.fib.get(n).copied().ok_or(LevelError::IndexOutOfRange {
            index: n,
            max: self.max_index(),
        })
    }

    pub fn lucas(&self, n: usize) -> Result<u128, LevelError> {
        self.lucas.get(n).copied().ok_or(LevelError::IndexOutOfRange {
            index: n,
            max: self.max_index(),
        })
    }

    pub fn fibonacci_table(&self) -> &[u128] {
        &self.fib
    }

    pub fn lucas_table(&self) -> &[u128] {
        &self.lucas
    }

    /// Index of the largest Fibonacci number ≤ `price`.
    ///
    /// `price <= 0` encodes to 0. `price == 1` encodes to 1 even though
    /// F(2) is also 1. Prices above the table saturate at the max index.
    pub fn encode_price(&self, price: i128) -> usize {
        if price <= 0 {
            return 0;
        }
        if price == 1 {
            return 1;
        }
        let price = price as u128;
        // fib is non-decreasing, so partition_point is a binary search.
        self.fib.partition_point(|&f| f <= price) - 1
    }

    /// Inverse of [`encode_price`](Self::encode_price): the level value at `index`.
    pub fn decode_price(&self, index: usize) -> Result<u128, LevelError> {
        self.fibonacci(index)
    }

    /// The `levels` Fibonacci values immediately below and above the encoded
    /// index of `price`. Either side may be shorter at the table boundaries.
    pub fn support_resistance(&self, price: i128, levels: usize) -> (Vec<u128>, Vec<u128>) {
        let idx = self.encode_price(price);
        let support = (1..=levels)
            .filter_map(|i| idx.checked_sub(i))
            .map(|j| self.fib[j])
            .collect();
        let resistance = (1..=levels)
            .map(|i| idx + i)
            .take_while(|&j| j < self.fib.len())
            .map(|j| self.fib[j])
            .collect();
        (support, resistance)
    }

    /// Index of the largest Lucas number ≤ `units`, searched from index 1
    /// (where the sequence becomes increasing). `units <= 0` encodes to 0.
    pub fn encode_time(&self, units: i64) -> usize {
        if units <= 0 {
            return 0;
        }
        let units = units as u128;
        // L(1) = 1 <= units, so the count of tail entries <= units is the index.
        self.lucas[1..].partition_point(|&l| l <= units)
    }

    /// True iff `L(time_index)` is divisible by 3. Out-of-range is false.
    pub fn is_equilibrium(&self, time_index: usize) -> bool {
        self.lucas
            .get(time_index)
            .is_some_and(|&l| l % 3 == 0)
    }

    /// The next equilibrium time strictly after the Lucas index of
    /// `current_time`, or `None` once the table is exhausted.
    pub fn next_equilibrium(&self, current_time: i64) -> Option<u128> {
        let start = self.encode_time(current_time) + 1;
        (start..self.lucas.len())
            .find(|&idx| self.is_equilibrium(idx))
            .map(|idx| self.lucas[idx])
    }
}

impl Default for LevelEncoder {
    fn default() -> Self {
        Self::shared().clone()
    }
}

/// Convert a float price to integer ticks. This is the only float boundary
/// in level encoding; everything downstream is integer.
pub fn price_to_ticks(price: f64, ticks_per_unit: u32) -> Result<i128, LevelError> {
    if !price.is_finite() {
        return Err(LevelError::InvalidInput(format!(
            "price must be finite, got {price}"
        )));
    }
    if ticks_per_unit == 0 {
        return Err(LevelError::InvalidInput(
            "ticks_per_unit must be positive".into(),
        ));
    }
    Ok((price * f64::from(ticks_per_unit)).round() as i128)
}

fn build_table(first: u128, second: u128, max_index: usize) -> Vec<u128> {
    let mut table = Vec::with_capacity(max_index + 1);
    table.push(first);
    table.push(second);
    for i in 2..=max_index {
        let next = table[i - 1] + table[i - 2];
        table.push(next);
    }
    table
}
