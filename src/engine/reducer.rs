use crate::config::BandwidthReduction;

/// Mean of the daily peaks, ignoring days that peaked at or below zero.
/// Returns 0 when no day carries data.
pub fn average_daily_peaks(days: &[Vec<f64>]) -> f64 {
    let peaks: Vec<f64> = days
        .iter()
        .filter_map(|day| daily_peak(day))
        .filter(|peak| *peak > 0.0)
        .collect();

    if peaks.is_empty() {
        return 0.0;
    }
    peaks.iter().sum::<f64>() / peaks.len() as f64
}

/// Highest sample across every day, floored at zero
pub fn global_peak(days: &[Vec<f64>]) -> f64 {
    days.iter()
        .flatten()
        .copied()
        .reduce(f64::max)
        .unwrap_or(0.0)
        .max(0.0)
}

pub fn reduce_bandwidth(days: &[Vec<f64>], policy: BandwidthReduction) -> f64 {
    match policy {
        BandwidthReduction::DailyPeakAverage => average_daily_peaks(days),
        BandwidthReduction::GlobalPeak => global_peak(days),
    }
}

fn daily_peak(day: &[f64]) -> Option<f64> {
    day.iter().copied().reduce(f64::max)
}
