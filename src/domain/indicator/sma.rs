//! Simple Moving Average indicator.
//!
//! SMA(n) = (P[i-n+1] + ... + P[i]) / n
//! Warmup: first (n-1) bars are invalid. No backfill.
//!
//! Every window is summed from its own closes, O(n * period). A running
//! sum would carry rounding error from earlier bars into a flat stretch and
//! break the exact MA equality the crossover rule tests for.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_sma(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    if period == 0 || bars.is_empty() {
        return IndicatorSeries::empty(period);
    }

    let values = (0..bars.len())
        .map(|i| {
            if i + 1 < period {
                return IndicatorPoint {
                    valid: false,
                    value: 0.0,
                };
            }
            let window_sum: f64 = bars[i + 1 - period..=i].iter().map(|b| b.close).sum();
            IndicatorPoint {
                valid: true,
                value: window_sum / period as f64,
            }
        })
        .collect();

    IndicatorSeries { period, values }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn make_bars(prices: &[f64]) -> Vec<OhlcvBar> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
                    + chrono::Duration::days(i as i64);
                OhlcvBar::from_close(date, close)
            })
            .collect()
    }

    #[test]
    fn sma_warmup() {
        let bars = make_bars(&[10.0, 20.0, 30.0, 40.0, 50.0]);
        let series = calculate_sma(&bars, 3);

        assert!(!series.values[0].valid);
        assert!(!series.values[1].valid);
        assert!(series.values[2].valid);
        assert!(series.values[3].valid);
        assert!(series.values[4].valid);
    }

    #[test]
    fn sma_known_values() {
        let bars = make_bars(&[10.0, 20.0, 30.0, 40.0, 50.0]);
        let series = calculate_sma(&bars, 3);

        assert_relative_eq!(series.values[2].value, 20.0);
        assert_relative_eq!(series.values[3].value, 30.0);
        assert_relative_eq!(series.values[4].value, 40.0);
    }

    #[test]
    fn sma_period_1_tracks_close() {
        let bars = make_bars(&[10.0, 20.0, 30.0]);
        let series = calculate_sma(&bars, 1);

        for (point, bar) in series.values.iter().zip(&bars) {
            assert!(point.valid);
            assert_relative_eq!(point.value, bar.close);
        }
    }

    #[test]
    fn sma_matches_naive_average() {
        let prices = [101.3, 99.8, 102.4, 104.1, 103.7, 98.2, 97.5, 100.0];
        let bars = make_bars(&prices);
        let series = calculate_sma(&bars, 4);

        for i in 3..prices.len() {
            let naive = prices[i - 3..=i].iter().sum::<f64>() / 4.0;
            assert_relative_eq!(series.values[i].value, naive, epsilon = 1e-9);
        }
    }

    #[test]
    fn sma_period_longer_than_series() {
        let bars = make_bars(&[10.0, 20.0]);
        let series = calculate_sma(&bars, 5);
        assert_eq!(series.values.len(), 2);
        assert!(series.values.iter().all(|p| !p.valid));
    }

    #[test]
    fn sma_flat_tail_after_noisy_prefix_is_exact() {
        let mut prices = vec![0.1, 0.7, 0.3, 1.9, 0.2, 3.3, 0.1];
        prices.extend([5.0; 30]);
        let bars = make_bars(&prices);
        let short = calculate_sma(&bars, 2);
        let long = calculate_sma(&bars, 5);

        for i in prices.len() - 25..prices.len() {
            assert_eq!(short.values[i].value, 5.0);
            assert_eq!(long.values[i].value, 5.0);
        }
    }

    #[test]
    fn sma_empty_bars() {
        let series = calculate_sma(&[], 3);
        assert!(series.values.is_empty());
        assert_eq!(series.period, 3);
    }

    #[test]
    fn sma_period_0() {
        let bars = make_bars(&[10.0, 20.0]);
        let series = calculate_sma(&bars, 0);
        assert!(series.values.is_empty());
    }
}
