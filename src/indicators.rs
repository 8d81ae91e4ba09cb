//! Indicator library. Every function returns a series of the same length as
//! its input, padding positions with insufficient lookback with NaN; callers
//! must treat NaN as "indicator undefined at this bar".

/// Simple moving average over the trailing `period` values. Undefined (NaN)
/// for index < period - 1.
pub fn calculate_sma(prices: &[f64], period: usize) -> Vec<f64> {
    let n = prices.len();
    if period == 0 {
        return vec![f64::NAN; n];
    }
    if period == 1 {
        return prices.to_vec();
    }

    let mut sma_values = vec![f64::NAN; n];
    if n < period {
        return sma_values;
    }

    let mut window_sum: f64 = prices[..period].iter().sum();
    sma_values[period - 1] = window_sum / period as f64;
    for i in period..n {
        window_sum += prices[i] - prices[i - period];
        sma_values[i] = window_sum / period as f64;
    }

    sma_values
}

/// Exponential moving average seeded at the first data point, so it is never
/// NaN after index 0. The first-price seed is intentional; see
/// `calculate_ema_sma_seeded` for the textbook period-seeded variant.
pub fn calculate_ema(prices: &[f64], period: usize) -> Vec<f64> {
    if prices.is_empty() || period == 0 {
        return vec![f64::NAN; prices.len()];
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut ema_values = Vec::with_capacity(prices.len());
    ema_values.push(prices[0]);

    for i in 1..prices.len() {
        let ema = (prices[i] * multiplier) + (ema_values[i - 1] * (1.0 - multiplier));
        ema_values.push(ema);
    }

    ema_values
}

/// Textbook EMA seeded with the SMA of the first `period` values, NaN before
/// that. Not used by condition evaluation; offered for callers that want the
/// corrected seeding.
pub fn calculate_ema_sma_seeded(prices: &[f64], period: usize) -> Vec<f64> {
    let n = prices.len();
    if period == 0 || n < period {
        return vec![f64::NAN; n];
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut ema_values = vec![f64::NAN; n];
    ema_values[period - 1] = prices[..period].iter().sum::<f64>() / period as f64;
    for i in period..n {
        ema_values[i] = (prices[i] * multiplier) + (ema_values[i - 1] * (1.0 - multiplier));
    }

    ema_values
}

/// Relative strength index over consecutive-close changes. The first bar has
/// no preceding change, so output is NaN through index `period`; RSI is 100
/// when the trailing average loss is zero.
pub fn calculate_rsi(prices: &[f64], period: usize) -> Vec<f64> {
    let n = prices.len();
    let mut rsi_values = vec![f64::NAN; n];
    if period == 0 || n < period + 1 {
        return rsi_values;
    }

    for i in period..n {
        let mut sum_gain = 0.0f64;
        let mut sum_loss = 0.0f64;
        for j in (i + 1 - period)..=i {
            let delta = prices[j] - prices[j - 1];
            if delta > 0.0 {
                sum_gain += delta;
            } else {
                sum_loss += -delta;
            }
        }

        let avg_gain = sum_gain / period as f64;
        let avg_loss = sum_loss / period as f64;
        rsi_values[i] = if avg_loss == 0.0 {
            100.0
        } else {
            100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
        };
    }

    rsi_values
}

/// MACD line, signal line and histogram. The signal line is an EMA over the
/// non-NaN MACD values, left-padded back to the input length.
pub fn calculate_macd(
    prices: &[f64],
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let fast_ema = calculate_ema(prices, fast_period);
    let slow_ema = calculate_ema(prices, slow_period);

    let mut macd_line = Vec::with_capacity(prices.len());
    for i in 0..prices.len() {
        macd_line.push(fast_ema[i] - slow_ema[i]);
    }

    let signal_line = realign(&macd_line, |valid| calculate_ema(valid, signal_period));

    let mut histogram = Vec::with_capacity(macd_line.len());
    for i in 0..macd_line.len() {
        histogram.push(macd_line[i] - signal_line[i]);
    }

    (macd_line, signal_line, histogram)
}

/// Bollinger bands: middle = SMA(period), upper/lower = middle +/- std_dev
/// population standard deviations of the trailing window.
pub fn calculate_bollinger_bands(
    prices: &[f64],
    period: usize,
    std_dev: f64,
) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let n = prices.len();
    let middle = calculate_sma(prices, period);
    let mut upper = vec![f64::NAN; n];
    let mut lower = vec![f64::NAN; n];
    if period == 0 || n < period {
        return (upper, middle, lower);
    }

    for i in (period - 1)..n {
        let window_start = i + 1 - period;
        let slice = &prices[window_start..=i];
        let mean = middle[i];
        let variance = slice.iter().map(|&val| (val - mean).powi(2)).sum::<f64>() / period as f64;
        let standard_deviation = variance.sqrt();

        upper[i] = mean + (std_dev * standard_deviation);
        lower[i] = mean - (std_dev * standard_deviation);
    }

    (upper, middle, lower)
}

/// Stochastic oscillator. %K is 50 when the trailing high/low range is zero
/// (flat market); %D is an SMA of %K realigned with left-padding.
pub fn calculate_stochastic(
    highs: &[f64],
    lows: &[f64],
    closes: &[f64],
    k_period: usize,
    d_period: usize,
) -> (Vec<f64>, Vec<f64>) {
    let n = closes.len();
    let mut k_values = vec![f64::NAN; n];
    if k_period == 0 || n < k_period {
        return (k_values.clone(), vec![f64::NAN; n]);
    }

    for i in (k_period - 1)..n {
        let window_start = i + 1 - k_period;
        let highest_high = highs[window_start..=i]
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        let lowest_low = lows[window_start..=i]
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min);
        let range = highest_high - lowest_low;

        k_values[i] = if range == 0.0 {
            50.0
        } else {
            (closes[i] - lowest_low) / range * 100.0
        };
    }

    let d_values = realign(&k_values, |valid| calculate_sma(valid, d_period));

    (k_values, d_values)
}

/// Trailing average volume, used both as an indicator series and as a
/// comparison target for "avg"-style volume conditions.
pub fn calculate_volume_sma(volumes: &[f64], period: usize) -> Vec<f64> {
    calculate_sma(volumes, period)
}

/// Apply `f` to the non-NaN suffix of `values` and left-pad the output with
/// NaN back to the input length.
fn realign<F>(values: &[f64], f: F) -> Vec<f64>
where
    F: FnOnce(&[f64]) -> Vec<f64>,
{
    let first_valid = values
        .iter()
        .position(|v| !v.is_nan())
        .unwrap_or(values.len());
    let computed = f(&values[first_valid..]);

    let mut out = vec![f64::NAN; first_valid];
    out.extend(computed);
    out
}
