//! Technical indicators
//!
//! Stateless transforms over a close-price series, plus optional highs, lows
//! and volumes. Window-based indicators return an empty series when the input
//! is shorter than the period (or the period is zero); the caller decides
//! whether that is acceptable.
//!
//! Output lengths for `n` prices and period `p`:
//! - SMA, Bollinger, Stochastic %K: `n − p + 1`
//! - EMA, MACD, OBV, VWAP: `n` (EMA is seeded with the first price, so unlike
//!   SMA it has no warm-up truncation)
//! - RSI, ATR: `n − p` (both consume one price for the first change)
//! - Stochastic %D: `len(%K) − 2`

use crate::config::IndicatorConfig;
use crate::error::{EngineError, EngineResult};
use crate::types::{IndicatorKind, IndicatorRequest, IndicatorSet};
use tracing::debug;

/// Window length of the %D smoothing
const STOCHASTIC_D_PERIOD: usize = 3;

/// Simple moving average via a sliding sum
pub fn sma(prices: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || prices.len() < period {
        return Vec::new();
    }

    let mut out = Vec::with_capacity(prices.len() - period + 1);
    let mut sum: f64 = prices[..period].iter().sum();
    out.push(sum / period as f64);
    for i in period..prices.len() {
        sum += prices[i] - prices[i - period];
        out.push(sum / period as f64);
    }
    out
}

/// Exponential moving average, `k = 2 / (period + 1)`, seeded with the first price
pub fn ema(prices: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || prices.len() < period {
        return Vec::new();
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(prices.len());
    let mut prev = prices[0];
    out.push(prev);
    for &price in &prices[1..] {
        prev = price * k + prev * (1.0 - k);
        out.push(prev);
    }
    out
}

/// Relative strength index over trailing windows of `period` price changes.
///
/// Gains and losses are simple averages over the window. A window without
/// losses reads 100.
pub fn rsi(prices: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || prices.len() <= period {
        return Vec::new();
    }

    let changes: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();
    changes
        .windows(period)
        .map(|window| {
            let (gains, losses) = window.iter().fold((0.0, 0.0), |(g, l), &c| {
                if c > 0.0 { (g + c, l) } else { (g, l - c) }
            });
            let avg_gain = gains / period as f64;
            let avg_loss = losses / period as f64;
            if avg_loss == 0.0 {
                100.0
            } else {
                let rs = avg_gain / avg_loss;
                (100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0)
            }
        })
        .collect()
}

/// MACD line, its signal line and the histogram between them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Macd {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

/// `EMA(fast) − EMA(slow)`, signal `EMA(signal)` of that line
pub fn macd(prices: &[f64], fast: usize, slow: usize, signal: usize) -> Macd {
    if fast == 0 || slow == 0 || signal == 0 || prices.len() < slow.max(fast) {
        return Macd::default();
    }

    let macd: Vec<f64> = ema(prices, fast)
        .iter()
        .zip(ema(prices, slow))
        .map(|(f, s)| f - s)
        .collect();
    let signal = ema(&macd, signal);
    let histogram = macd.iter().zip(&signal).map(|(m, s)| m - s).collect();

    Macd {
        macd,
        signal,
        histogram,
    }
}

/// Stochastic oscillator %K and its 3-period %D
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stochastic {
    pub k: Vec<f64>,
    pub d: Vec<f64>,
}

/// %K = `(close − lowestLow) / (highestHigh − lowestLow) × 100` per window.
///
/// Uses closes as highs and lows when those are absent. A window with no
/// range reads 50.
pub fn stochastic(closes: &[f64], highs: Option<&[f64]>, lows: Option<&[f64]>, period: usize) -> Stochastic {
    if period == 0 || closes.len() < period {
        return Stochastic::default();
    }
    let highs = highs.unwrap_or(closes);
    let lows = lows.unwrap_or(closes);

    let k: Vec<f64> = (period - 1..closes.len())
        .map(|i| {
            let start = i + 1 - period;
            let highest = highs[start..=i].iter().copied().fold(f64::MIN, f64::max);
            let lowest = lows[start..=i].iter().copied().fold(f64::MAX, f64::min);
            let range = highest - lowest;
            if range > 0.0 {
                ((closes[i] - lowest) / range * 100.0).clamp(0.0, 100.0)
            } else {
                50.0
            }
        })
        .collect();
    let d = sma(&k, STOCHASTIC_D_PERIOD);

    Stochastic { k, d }
}

/// Bollinger bands around an SMA
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bollinger {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

/// Middle = SMA(period); bands at `± k × rolling population stddev`
pub fn bollinger(prices: &[f64], period: usize, k: f64) -> Bollinger {
    let middle = sma(prices, period);
    if middle.is_empty() {
        return Bollinger::default();
    }

    let (upper, lower) = prices
        .windows(period)
        .zip(&middle)
        .map(|(window, &m)| {
            let var = window.iter().map(|p| (p - m).powi(2)).sum::<f64>() / period as f64;
            let band = k * var.sqrt();
            (m + band, m - band)
        })
        .unzip();

    Bollinger {
        upper,
        middle,
        lower,
    }
}

/// True range for each step after the first.
///
/// With genuine highs and lows: `max(h − l, |h − prevClose|, |l − prevClose|)`.
/// Close-only: `|close − prevClose|`.
pub fn true_range(closes: &[f64], high_low: Option<(&[f64], &[f64])>) -> Vec<f64> {
    (1..closes.len())
        .map(|i| {
            let prev_close = closes[i - 1];
            match high_low {
                Some((highs, lows)) => (highs[i] - lows[i])
                    .max((highs[i] - prev_close).abs())
                    .max((lows[i] - prev_close).abs()),
                None => (closes[i] - prev_close).abs(),
            }
        })
        .collect()
}

/// Average true range: simple mean of the last `period` true ranges
pub fn atr(closes: &[f64], high_low: Option<(&[f64], &[f64])>, period: usize) -> Vec<f64> {
    if period == 0 || closes.len() <= period {
        return Vec::new();
    }
    sma(&true_range(closes, high_low), period)
}

/// On-balance volume seeded with the first volume
pub fn obv(prices: &[f64], volumes: &[f64]) -> Vec<f64> {
    let Some(&seed) = volumes.first() else {
        return Vec::new();
    };

    let mut out = Vec::with_capacity(prices.len());
    let mut running = seed;
    out.push(running);
    for (window, volume) in prices.windows(2).zip(&volumes[1..]) {
        if window[1] > window[0] {
            running += volume;
        } else if window[1] < window[0] {
            running -= volume;
        }
        out.push(running);
    }
    out
}

/// Running volume-weighted average price; the price itself until volume accrues
pub fn vwap(prices: &[f64], volumes: &[f64]) -> Vec<f64> {
    let mut notional = 0.0;
    let mut volume_sum = 0.0;
    prices
        .iter()
        .zip(volumes)
        .map(|(&price, &volume)| {
            notional += price * volume;
            volume_sum += volume;
            if volume_sum > 0.0 { notional / volume_sum } else { price }
        })
        .collect()
}

/// Resolved periods for one request
#[derive(Debug, Clone, Copy)]
struct Periods {
    sma: usize,
    ema: usize,
    rsi: usize,
    stochastic: usize,
    bollinger: usize,
    bollinger_k: f64,
    atr: usize,
    macd_fast: usize,
    macd_slow: usize,
    macd_signal: usize,
}

impl Periods {
    fn resolve(request: &IndicatorRequest, config: &IndicatorConfig) -> EngineResult<Self> {
        let periods = Self {
            sma: request.sma_period.unwrap_or(config.sma_period),
            ema: request.ema_period.unwrap_or(config.ema_period),
            rsi: request.rsi_period.unwrap_or(config.rsi_period),
            stochastic: request.stochastic_period.unwrap_or(config.stochastic_period),
            bollinger: request.bollinger_period.unwrap_or(config.bollinger_period),
            bollinger_k: request.bollinger_k.unwrap_or(config.bollinger_k),
            atr: request.atr_period.unwrap_or(config.atr_period),
            macd_fast: config.macd_fast,
            macd_slow: config.macd_slow,
            macd_signal: config.macd_signal,
        };

        let named = [
            ("smaPeriod", periods.sma),
            ("emaPeriod", periods.ema),
            ("rsiPeriod", periods.rsi),
            ("stochasticPeriod", periods.stochastic),
            ("bollingerPeriod", periods.bollinger),
            ("atrPeriod", periods.atr),
        ];
        if let Some((name, _)) = named.iter().find(|(_, p)| *p == 0) {
            return Err(EngineError::invalid(format!("{name} must be at least 1")));
        }
        if !(periods.bollinger_k >= 0.0 && periods.bollinger_k.is_finite()) {
            return Err(EngineError::invalid("bollingerK must be a non-negative number"));
        }
        Ok(periods)
    }
}

fn validate_prices(xs: &[f64], name: &str, len: usize) -> EngineResult<()> {
    if xs.len() != len {
        return Err(EngineError::invalid(format!(
            "{name} has length {}, expected {len}",
            xs.len()
        )));
    }
    if let Some(pos) = xs.iter().position(|x| !(x.is_finite() && *x > 0.0)) {
        return Err(EngineError::invalid(format!(
            "{name} must be positive and finite (index {pos})"
        )));
    }
    Ok(())
}

/// Compute the requested indicator families
pub fn compute(request: &IndicatorRequest, config: &IndicatorConfig) -> EngineResult<IndicatorSet> {
    let prices = request.prices.as_slice();
    if prices.is_empty() {
        return Err(EngineError::invalid("prices must not be empty"));
    }
    validate_prices(prices, "prices", prices.len())?;

    let volumes = request.volumes.as_deref();
    if let Some(volumes) = volumes {
        if volumes.len() != prices.len() {
            return Err(EngineError::invalid(format!(
                "volumes has length {}, expected {}",
                volumes.len(),
                prices.len()
            )));
        }
        if let Some(pos) = volumes.iter().position(|v| !(v.is_finite() && *v >= 0.0)) {
            return Err(EngineError::invalid(format!(
                "volumes must be non-negative and finite (index {pos})"
            )));
        }
    }

    let high_low = match (request.highs.as_deref(), request.lows.as_deref()) {
        (Some(highs), Some(lows)) => {
            validate_prices(highs, "highs", prices.len())?;
            validate_prices(lows, "lows", prices.len())?;
            if let Some(pos) = highs.iter().zip(lows).position(|(h, l)| h < l) {
                return Err(EngineError::invalid(format!("high below low at index {pos}")));
            }
            Some((highs, lows))
        }
        (None, None) => None,
        _ => {
            debug!("Only one of highs/lows supplied, using close-only ranges");
            None
        }
    };

    let periods = Periods::resolve(request, config)?;
    let selected: &[IndicatorKind] = request.indicators.as_deref().unwrap_or(&IndicatorKind::ALL);
    let explicit = request.indicators.is_some();

    let mut set = IndicatorSet::new();
    for kind in selected {
        match kind {
            IndicatorKind::Sma => set.insert("sma", sma(prices, periods.sma)),
            IndicatorKind::Ema => set.insert("ema", ema(prices, periods.ema)),
            IndicatorKind::Rsi => set.insert("rsi", rsi(prices, periods.rsi)),
            IndicatorKind::Macd => {
                let m = macd(prices, periods.macd_fast, periods.macd_slow, periods.macd_signal);
                set.insert("macd", m.macd);
                set.insert("macdSignal", m.signal);
                set.insert("macdHistogram", m.histogram);
            }
            IndicatorKind::Stochastic => {
                let (highs, lows) = high_low.unzip();
                let s = stochastic(prices, highs, lows, periods.stochastic);
                set.insert("stochasticK", s.k);
                set.insert("stochasticD", s.d);
            }
            IndicatorKind::Bollinger => {
                let b = bollinger(prices, periods.bollinger, periods.bollinger_k);
                set.insert("bollingerUpper", b.upper);
                set.insert("bollingerMiddle", b.middle);
                set.insert("bollingerLower", b.lower);
            }
            IndicatorKind::Atr => set.insert("atr", atr(prices, high_low, periods.atr)),
            IndicatorKind::Obv | IndicatorKind::Vwap => match volumes {
                Some(volumes) if *kind == IndicatorKind::Obv => set.insert("obv", obv(prices, volumes)),
                Some(volumes) => set.insert("vwap", vwap(prices, volumes)),
                None if explicit => {
                    return Err(EngineError::invalid(format!(
                        "{kind:?} requires volumes"
                    )));
                }
                None => {}
            },
        }
    }

    debug!(n = prices.len(), indicators = set.len(), "Indicators computed");
    Ok(set)
}
