//! Trend Analyzer
//!
//! Turns the trailing sample window into two outputs:
//! - a ranking of assets by relative strength, i.e. their own price change
//!   over the window minus the BTC dominance drift over the same window
//! - accumulation signals for assets whose latest volume spikes above the
//!   windowed average

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::config::{DEFAULT_TOP_RANKED, DEFAULT_VOLUME_SPIKE_MULTIPLIER};
use crate::models::market::PricePoint;

/// Minimum samples an asset needs before it is ranked
pub const MIN_SAMPLES: usize = 2;

/// How the dominance delta (percentage points) is put against the price
/// change (a fraction) when computing relative strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DominanceBaseline {
    /// Convert the delta to a fraction first (2.5 pp -> 0.025)
    #[default]
    Fraction,
    /// Subtract the raw percentage-point delta from the fractional change
    PercentagePoints,
}

impl DominanceBaseline {
    pub fn scale(self, delta_points: f64) -> f64 {
        match self {
            DominanceBaseline::Fraction => delta_points / 100.0,
            DominanceBaseline::PercentagePoints => delta_points,
        }
    }
}

impl FromStr for DominanceBaseline {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fraction" => Ok(DominanceBaseline::Fraction),
            "points" | "percentage_points" => Ok(DominanceBaseline::PercentagePoints),
            other => Err(format!("unknown dominance baseline: {}", other)),
        }
    }
}

impl fmt::Display for DominanceBaseline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DominanceBaseline::Fraction => write!(f, "fraction"),
            DominanceBaseline::PercentagePoints => write!(f, "points"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendSettings {
    /// Ranking length
    pub top_n: usize,
    /// Latest volume must exceed `average * multiplier` to flag accumulation
    pub volume_spike_multiplier: f64,
    pub baseline: DominanceBaseline,
}

impl Default for TrendSettings {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_RANKED,
            volume_spike_multiplier: DEFAULT_VOLUME_SPIKE_MULTIPLIER,
            baseline: DominanceBaseline::default(),
        }
    }
}

/// Analyzer input: per-asset samples and the dominance series, both
/// ordered oldest first and covering the same trailing window.
#[derive(Debug, Clone, Default)]
pub struct TrendWindow {
    pub assets: BTreeMap<String, Vec<PricePoint>>,
    pub dominance: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedAsset {
    pub asset_id: String,
    pub price_change: f64,
    pub relative_strength: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccumulationSignal {
    pub asset_id: String,
    pub latest_volume: f64,
    pub average_volume: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    InsufficientSamples,
    ZeroInitialPrice,
    NonFiniteStrength,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::InsufficientSamples => write!(f, "fewer than {} samples", MIN_SAMPLES),
            SkipReason::ZeroInitialPrice => write!(f, "initial price is zero"),
            SkipReason::NonFiniteStrength => write!(f, "relative strength is not finite"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedAsset {
    pub asset_id: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrendReport {
    /// Net dominance drift over the window, percentage points
    pub dominance_delta: f64,
    /// Strongest first, at most `top_n` entries
    pub ranking: Vec<RankedAsset>,
    /// In asset_id order
    pub accumulation: Vec<AccumulationSignal>,
    pub skipped: Vec<SkippedAsset>,
}

pub struct TrendAnalyzer {
    settings: TrendSettings,
}

impl TrendAnalyzer {
    pub fn new(settings: TrendSettings) -> Self {
        Self { settings }
    }

    pub fn analyze(&self, window: &TrendWindow) -> TrendReport {
        let dominance_delta = dominance_delta(&window.dominance);
        let baseline = self.settings.baseline.scale(dominance_delta);

        let mut ranked = Vec::new();
        let mut accumulation = Vec::new();
        let mut skipped = Vec::new();

        for (asset_id, samples) in &window.assets {
            if samples.len() < MIN_SAMPLES {
                debug!(asset = %asset_id, samples = samples.len(), "Not enough samples to rank");
                skipped.push(SkippedAsset {
                    asset_id: asset_id.clone(),
                    reason: SkipReason::InsufficientSamples,
                });
                continue;
            }

            let Some(change) = price_change(samples) else {
                warn!(asset = %asset_id, "Initial window price is zero, skipping asset");
                skipped.push(SkippedAsset {
                    asset_id: asset_id.clone(),
                    reason: SkipReason::ZeroInitialPrice,
                });
                continue;
            };

            let relative_strength = change - baseline;
            if !relative_strength.is_finite() {
                warn!(asset = %asset_id, "Relative strength is not finite, skipping asset");
                skipped.push(SkippedAsset {
                    asset_id: asset_id.clone(),
                    reason: SkipReason::NonFiniteStrength,
                });
                continue;
            }

            ranked.push(RankedAsset {
                asset_id: asset_id.clone(),
                price_change: change,
                relative_strength,
            });

            if let Some(signal) =
                detect_accumulation(asset_id, samples, self.settings.volume_spike_multiplier)
            {
                accumulation.push(signal);
            }
        }

        ranked.sort_by(compare_strength);
        ranked.truncate(self.settings.top_n);

        debug!(
            dominance_delta = dominance_delta,
            ranked = ranked.len(),
            accumulation = accumulation.len(),
            skipped = skipped.len(),
            "Trend analysis complete"
        );

        TrendReport {
            dominance_delta,
            ranking: ranked,
            accumulation,
            skipped,
        }
    }
}

/// `last - first` over the series, zero with fewer than two readings
pub fn dominance_delta(series: &[f64]) -> f64 {
    match (series.first(), series.last()) {
        (Some(first), Some(last)) if series.len() >= 2 => last - first,
        _ => 0.0,
    }
}

/// Fractional change from the first to the last sample.
///
/// `None` with fewer than two samples or a zero starting price.
pub fn price_change(samples: &[PricePoint]) -> Option<f64> {
    if samples.len() < MIN_SAMPLES {
        return None;
    }
    let initial = samples.first()?.price;
    let latest = samples.last()?.price;
    if initial == 0.0 {
        return None;
    }
    Some((latest - initial) / initial)
}

/// Arithmetic mean of volume over every sample, missing volume as zero
pub fn average_volume(samples: &[PricePoint]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let total: f64 = samples.iter().map(PricePoint::volume_or_zero).sum();
    total / samples.len() as f64
}

/// Flags the asset when its latest volume is strictly above
/// `average * multiplier`.
pub fn detect_accumulation(
    asset_id: &str,
    samples: &[PricePoint],
    multiplier: f64,
) -> Option<AccumulationSignal> {
    let latest_volume = samples.last()?.volume_or_zero();
    let average_volume = average_volume(samples);

    if latest_volume > average_volume * multiplier {
        Some(AccumulationSignal {
            asset_id: asset_id.to_string(),
            latest_volume,
            average_volume,
        })
    } else {
        None
    }
}

// Strongest first, ties by asset_id ascending
fn compare_strength(a: &RankedAsset, b: &RankedAsset) -> Ordering {
    b.relative_strength
        .total_cmp(&a.relative_strength)
        .then_with(|| a.asset_id.cmp(&b.asset_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn points(prices: &[f64]) -> Vec<PricePoint> {
        prices.iter().map(|p| PricePoint::new(*p, None)).collect()
    }

    fn with_volumes(samples: &[(f64, f64)]) -> Vec<PricePoint> {
        samples
            .iter()
            .map(|(p, v)| PricePoint::new(*p, Some(*v)))
            .collect()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_dominance_delta() {
        assert_eq!(dominance_delta(&[]), 0.0);
        assert_eq!(dominance_delta(&[52.0]), 0.0);
        assert!(approx(dominance_delta(&[50.0, 49.0, 52.5]), 2.5));
    }

    #[test]
    fn test_price_change_two_percent() {
        let change = price_change(&points(&[100.0, 102.0])).unwrap();
        assert!(approx(change, 0.02));
    }

    #[test]
    fn test_price_change_guards_zero_initial_price() {
        assert_eq!(price_change(&points(&[0.0, 5.0])), None);
        assert_eq!(price_change(&points(&[5.0])), None);
    }

    #[test]
    fn test_relative_strength_with_flat_dominance() {
        let mut window = TrendWindow::default();
        window.assets.insert("eth".to_string(), points(&[100.0, 102.0]));
        window.dominance = vec![50.0, 50.0];

        let report = TrendAnalyzer::new(TrendSettings::default()).analyze(&window);

        assert_eq!(report.ranking.len(), 1);
        assert!(approx(report.ranking[0].price_change, 0.02));
        assert!(approx(report.ranking[0].relative_strength, 0.02));
    }

    #[test]
    fn test_baseline_scaling() {
        let mut window = TrendWindow::default();
        window.assets.insert("eth".to_string(), points(&[100.0, 102.0]));
        window.dominance = vec![50.0, 51.0];

        let fraction = TrendAnalyzer::new(TrendSettings::default()).analyze(&window);
        assert!(approx(fraction.ranking[0].relative_strength, 0.01));

        let points_settings = TrendSettings {
            baseline: DominanceBaseline::PercentagePoints,
            ..TrendSettings::default()
        };
        let raw = TrendAnalyzer::new(points_settings).analyze(&window);
        assert!(approx(raw.ranking[0].relative_strength, 0.02 - 1.0));
    }

    #[test]
    fn test_single_sample_assets_are_omitted() {
        let mut window = TrendWindow::default();
        window.assets.insert("lonely".to_string(), points(&[10.0]));
        window.assets.insert("eth".to_string(), points(&[1.0, 1.1]));

        let report = TrendAnalyzer::new(TrendSettings::default()).analyze(&window);

        assert!(report.ranking.iter().all(|r| r.asset_id != "lonely"));
        assert_eq!(
            report.skipped,
            vec![SkippedAsset {
                asset_id: "lonely".to_string(),
                reason: SkipReason::InsufficientSamples,
            }]
        );
    }

    #[test]
    fn test_zero_initial_price_is_skipped() {
        let mut window = TrendWindow::default();
        window
            .assets
            .insert("new".to_string(), with_volumes(&[(0.0, 1.0), (1.0, 100.0)]));

        let report = TrendAnalyzer::new(TrendSettings::default()).analyze(&window);

        assert!(report.ranking.is_empty());
        assert!(report.accumulation.is_empty());
        assert_eq!(report.skipped[0].reason, SkipReason::ZeroInitialPrice);
    }

    #[test]
    fn test_ranking_top_five_descending() {
        let mut window = TrendWindow::default();
        for (i, id) in ["a", "b", "c", "d", "e", "f", "g"].iter().enumerate() {
            let end = 100.0 + i as f64;
            window.assets.insert(id.to_string(), points(&[100.0, end]));
        }

        let report = TrendAnalyzer::new(TrendSettings::default()).analyze(&window);
        let ids: Vec<&str> = report.ranking.iter().map(|r| r.asset_id.as_str()).collect();

        assert_eq!(ids, vec!["g", "f", "e", "d", "c"]);
        assert!(
            report
                .ranking
                .windows(2)
                .all(|w| w[0].relative_strength >= w[1].relative_strength)
        );
    }

    #[test]
    fn test_ranking_shorter_than_top_n() {
        let mut window = TrendWindow::default();
        window.assets.insert("a".to_string(), points(&[1.0, 2.0]));
        window.assets.insert("b".to_string(), points(&[1.0, 3.0]));

        let report = TrendAnalyzer::new(TrendSettings::default()).analyze(&window);
        assert_eq!(report.ranking.len(), 2);
    }

    #[test]
    fn test_ties_break_by_asset_id() {
        let mut window = TrendWindow::default();
        window.assets.insert("zeta".to_string(), points(&[1.0, 2.0]));
        window.assets.insert("alpha".to_string(), points(&[1.0, 2.0]));

        let report = TrendAnalyzer::new(TrendSettings::default()).analyze(&window);
        let ids: Vec<&str> = report.ranking.iter().map(|r| r.asset_id.as_str()).collect();

        assert_eq!(ids, vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_accumulation_example() {
        let mut window = TrendWindow::default();
        window.assets.insert(
            "x".to_string(),
            with_volumes(&[(1.0, 100.0), (1.0, 100.0), (1.0, 400.0)]),
        );
        window.dominance = vec![50.0, 53.0];

        let settings = TrendSettings {
            baseline: DominanceBaseline::PercentagePoints,
            ..TrendSettings::default()
        };
        let report = TrendAnalyzer::new(settings).analyze(&window);

        assert_eq!(
            report.accumulation,
            vec![AccumulationSignal {
                asset_id: "x".to_string(),
                latest_volume: 400.0,
                average_volume: 200.0,
            }]
        );
        assert!(approx(report.ranking[0].relative_strength, 0.0 - 3.0));
    }

    #[test]
    fn test_accumulation_boundary_is_strict() {
        // mean 200, 1.5 * 200 == 300
        let at_boundary = with_volumes(&[(1.0, 100.0), (1.0, 300.0)]);
        assert_eq!(detect_accumulation("x", &at_boundary, 1.5), None);

        let above = with_volumes(&[(1.0, 100.0), (1.0, 301.0)]);
        assert!(detect_accumulation("x", &above, 1.5).is_some());
    }

    #[test]
    fn test_missing_volume_counts_as_zero() {
        let samples = vec![
            PricePoint::new(1.0, None),
            PricePoint::new(1.0, None),
            PricePoint::new(1.0, Some(90.0)),
        ];
        assert!(approx(average_volume(&samples), 30.0));

        let signal = detect_accumulation("x", &samples, 1.5).unwrap();
        assert!(approx(signal.average_volume, 30.0));

        let all_missing = points(&[1.0, 1.0]);
        assert_eq!(detect_accumulation("x", &all_missing, 1.5), None);
    }

    #[test]
    fn test_baseline_parse() {
        assert_eq!("fraction".parse::<DominanceBaseline>(), Ok(DominanceBaseline::Fraction));
        assert_eq!("POINTS".parse::<DominanceBaseline>(), Ok(DominanceBaseline::PercentagePoints));
        assert!("percent".parse::<DominanceBaseline>().is_err());
    }
}
