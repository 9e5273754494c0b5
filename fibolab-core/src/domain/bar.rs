//! Bar: the fundamental market data unit.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OHLCV sample for one fixed time interval.
///
/// Bars are immutable once ingested. A series handed to the engine must pass
/// [`validate_series`] first; the engine refuses to start otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Precondition failures for a bar series. All of these are fatal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BarError {
    #[error("bar series is empty")]
    EmptySeries,
    #[error("bar {index}: non-finite {field}")]
    NonFinite { index: usize, field: &'static str },
    #[error("bar {index}: low <= open/close <= high violated")]
    InconsistentRange { index: usize },
    #[error("bar {index}: negative volume {volume}")]
    NegativeVolume { index: usize, volume: f64 },
    #[error("bar {index}: timestamp {timestamp} does not follow {previous}")]
    NonIncreasingTimestamp {
        index: usize,
        timestamp: NaiveDateTime,
        previous: NaiveDateTime,
    },
}

impl Bar {
    pub fn new(
        timestamp: NaiveDateTime,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Returns the first non-finite OHLCV field, if any.
    fn non_finite_field(&self) -> Option<&'static str> {
        [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("volume", self.volume),
        ]
        .into_iter()
        .find(|(_, v)| !v.is_finite())
        .map(|(name, _)| name)
    }

    /// `low <= {open, close} <= high`.
    pub fn is_consistent(&self) -> bool {
        self.low <= self.open
            && self.low <= self.close
            && self.open <= self.high
            && self.close <= self.high
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    fn check(&self, index: usize) -> Result<(), BarError> {
        if let Some(field) = self.non_finite_field() {
            return Err(BarError::NonFinite { index, field });
        }
        if !self.is_consistent() {
            return Err(BarError::InconsistentRange { index });
        }
        if self.volume < 0.0 {
            return Err(BarError::NegativeVolume {
                index,
                volume: self.volume,
            });
        }
        Ok(())
    }
}

/// Check every bar invariant plus strictly increasing timestamps.
pub fn validate_series(bars: &[Bar]) -> Result<(), BarError> {
    if bars.is_empty() {
        return Err(BarError::EmptySeries);
    }
    for (index, bar) in bars.iter().enumerate() {
        bar.check(index)?;
        if index > 0 {
            let previous = bars[index - 1].timestamp;
            if bar.timestamp <= previous {
                return Err(BarError::NonIncreasingTimestamp {
                    index,
                    timestamp: bar.timestamp,
                    previous,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn sample_bar(day: u32) -> Bar {
        Bar::new(ts(day), 100.0, 105.0, 98.0, 103.0, 50_000.0)
    }

    #[test]
    fn valid_series_passes() {
        let bars = vec![sample_bar(2), sample_bar(3), sample_bar(4)];
        assert!(validate_series(&bars).is_ok());
    }

    #[test]
    fn empty_series_rejected() {
        assert_eq!(validate_series(&[]), Err(BarError::EmptySeries));
    }

    #[test]
    fn nan_field_rejected() {
        let mut bar = sample_bar(2);
        bar.close = f64::NAN;
        assert_eq!(
            validate_series(&[bar]),
            Err(BarError::NonFinite {
                index: 0,
                field: "close"
            })
        );
    }

    #[test]
    fn high_below_close_rejected() {
        let mut bar = sample_bar(2);
        bar.high = 101.0; // below close of 103
        assert_eq!(
            validate_series(&[bar]),
            Err(BarError::InconsistentRange { index: 0 })
        );
    }

    #[test]
    fn negative_volume_rejected() {
        let mut bar = sample_bar(2);
        bar.volume = -1.0;
        assert!(matches!(
            validate_series(&[bar]),
            Err(BarError::NegativeVolume { index: 0, .. })
        ));
    }

    #[test]
    fn duplicate_timestamp_rejected() {
        let bars = vec![sample_bar(2), sample_bar(3), sample_bar(3)];
        assert!(matches!(
            validate_series(&bars),
            Err(BarError::NonIncreasingTimestamp { index: 2, .. })
        ));
    }

    #[test]
    fn bar_serialization_roundtrip() {
        let bar = sample_bar(2);
        let json = serde_json::to_string(&bar).unwrap();
        let deser: Bar = serde_json::from_str(&json).unwrap();
        assert_eq!(bar, deser);
    }
}
