//! Statistical features derived from an ascending window of draws.
//!
//! Everything here is a pure function of its input: no I/O, no hidden state.

use crate::domain::model::{Draw, MAX_NUMBER};
use crate::utils::error::{Result, SyncError};
use serde::Serialize;
use std::collections::BTreeSet;

pub const PRIMES: [u8; 9] = [2, 3, 5, 7, 11, 13, 17, 19, 23];
pub const FIBONACCI: [u8; 7] = [1, 2, 3, 5, 8, 13, 21];
pub const GRID_SIZE: usize = 5;

const EXTREME_Z: f64 = 2.0;
const ELEVATED_Z: f64 = 1.5;
const OVERLOADED_LINE: usize = 4;
const EMPTY_LINE: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Heat {
    ExtremeHot,
    ElevatedHot,
    Neutral,
    ElevatedCold,
    ExtremeCold,
}

impl Heat {
    pub fn classify(z: f64) -> Self {
        let magnitude = z.abs();
        match (magnitude >= EXTREME_Z, magnitude >= ELEVATED_Z, z > 0.0) {
            (true, _, true) => Heat::ExtremeHot,
            (true, _, false) => Heat::ExtremeCold,
            (false, true, true) => Heat::ElevatedHot,
            (false, true, false) => Heat::ElevatedCold,
            _ => Heat::Neutral,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberFrequency {
    pub number: u8,
    pub count: usize,
    pub z_score: f64,
    pub heat: Heat,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrequencyStats {
    pub window: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub numbers: Vec<NumberFrequency>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberDelay {
    pub number: u8,
    pub delay: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleStatus {
    /// Numbers not seen while scanning back through the window; empty once a cycle closed.
    pub missing: Vec<u8>,
    /// Draws scanned (newest first) until all numbers appeared, if they did.
    pub closed_after: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawProfile {
    pub even: usize,
    pub odd: usize,
    pub sum: u32,
    pub primes: usize,
    pub fibonacci: usize,
    pub repeats_from_previous: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpatialDistribution {
    pub rows: [usize; GRID_SIZE],
    pub columns: [usize; GRID_SIZE],
    pub overloaded_rows: Vec<usize>,
    pub empty_rows: Vec<usize>,
    pub overloaded_columns: Vec<usize>,
    pub empty_columns: Vec<usize>,
}

/// Metrics bundle keyed by the newest draw in the window.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureBundle {
    pub draw_number: u32,
    pub window_size: usize,
    pub frequency: FrequencyStats,
    pub delays: Vec<NumberDelay>,
    pub cycle: CycleStatus,
    pub profile: DrawProfile,
    pub spatial: SpatialDistribution,
    pub gap_std_dev: f64,
}

#[derive(Debug, Clone)]
pub struct FeatureEngine {
    frequency_window: usize,
}

impl FeatureEngine {
    pub fn new(frequency_window: usize) -> Self {
        Self {
            frequency_window: frequency_window.max(1),
        }
    }

    /// `window` 必須依期數遞增，且至少兩期
    pub fn compute(&self, window: &[Draw]) -> Result<FeatureBundle> {
        let [.., previous, newest] = window else {
            return Err(SyncError::EmptyHistory {
                available: window.len(),
            });
        };

        Ok(FeatureBundle {
            draw_number: newest.number,
            window_size: window.len(),
            frequency: frequency(window, self.frequency_window),
            delays: delays(window),
            cycle: cycle_status(window),
            profile: profile(newest, previous),
            spatial: spatial_distribution(newest),
            gap_std_dev: gap_std_dev(newest),
        })
    }
}

fn all_numbers() -> impl Iterator<Item = u8> {
    1..=MAX_NUMBER
}

/// 最近 `w` 期每個號碼的出現次數與 z 分數
pub fn frequency(window: &[Draw], w: usize) -> FrequencyStats {
    let recent = &window[window.len().saturating_sub(w)..];

    let counts: Vec<usize> = all_numbers()
        .map(|n| recent.iter().filter(|d| d.contains(n)).count())
        .collect();

    let values: Vec<f64> = counts.iter().map(|&c| c as f64).collect();
    let mean = mean(&values);
    let distinct: BTreeSet<usize> = counts.iter().copied().collect();
    // 所有次數相同時標準差以 1 代替，避免除以零
    let std_dev = if distinct.len() <= 1 {
        1.0
    } else {
        population_std_dev(&values, mean)
    };

    let numbers = all_numbers()
        .zip(counts)
        .map(|(number, count)| {
            let z_score = (count as f64 - mean) / std_dev;
            NumberFrequency {
                number,
                count,
                z_score,
                heat: Heat::classify(z_score),
            }
        })
        .collect();

    FrequencyStats {
        window: recent.len(),
        mean,
        std_dev,
        numbers,
    }
}

/// 從最新一期往回數，連續未開出的期數
pub fn delays(window: &[Draw]) -> Vec<NumberDelay> {
    all_numbers()
        .map(|number| NumberDelay {
            number,
            delay: window
                .iter()
                .rev()
                .take_while(|d| !d.contains(number))
                .count(),
        })
        .collect()
}

pub fn cycle_status(window: &[Draw]) -> CycleStatus {
    let mut seen = BTreeSet::new();
    let mut closed_after = None;

    for (scanned, draw) in window.iter().rev().enumerate() {
        seen.extend(draw.numbers.iter().copied());
        if seen.len() == usize::from(MAX_NUMBER) {
            closed_after = Some(scanned + 1);
            break;
        }
    }

    CycleStatus {
        missing: all_numbers().filter(|n| !seen.contains(n)).collect(),
        closed_after,
    }
}

pub fn profile(newest: &Draw, previous: &Draw) -> DrawProfile {
    let even = newest.numbers.iter().filter(|n| *n % 2 == 0).count();
    DrawProfile {
        even,
        odd: newest.numbers.len() - even,
        sum: newest.numbers.iter().map(|&n| u32::from(n)).sum(),
        primes: newest.numbers.iter().filter(|n| PRIMES.contains(*n)).count(),
        fibonacci: newest.numbers.iter().filter(|n| FIBONACCI.contains(*n)).count(),
        repeats_from_previous: newest
            .numbers
            .iter()
            .filter(|&&n| previous.contains(n))
            .count(),
    }
}

/// 5x5 票面：`row = (n-1)/5`，`col = (n-1)%5`；票面外的號碼不計入
pub fn spatial_distribution(draw: &Draw) -> SpatialDistribution {
    let mut rows = [0usize; GRID_SIZE];
    let mut columns = [0usize; GRID_SIZE];
    for &n in draw.numbers.iter().filter(|n| (1..=MAX_NUMBER).contains(*n)) {
        let idx = usize::from(n - 1);
        rows[idx / GRID_SIZE] += 1;
        columns[idx % GRID_SIZE] += 1;
    }

    let select = |lines: &[usize; GRID_SIZE], pred: &dyn Fn(usize) -> bool| -> Vec<usize> {
        lines
            .iter()
            .enumerate()
            .filter(|(_, count)| pred(**count))
            .map(|(i, _)| i)
            .collect()
    };

    SpatialDistribution {
        overloaded_rows: select(&rows, &|c| c >= OVERLOADED_LINE),
        empty_rows: select(&rows, &|c| c <= EMPTY_LINE),
        overloaded_columns: select(&columns, &|c| c >= OVERLOADED_LINE),
        empty_columns: select(&columns, &|c| c <= EMPTY_LINE),
        rows,
        columns,
    }
}

/// 相鄰號碼間距的母體標準差，用來衡量號碼聚集程度
pub fn gap_std_dev(draw: &Draw) -> f64 {
    let mut sorted = draw.numbers.clone();
    sorted.sort_unstable();
    let gaps: Vec<f64> = sorted
        .windows(2)
        .map(|w| f64::from(w[1] - w[0]))
        .collect();
    if gaps.is_empty() {
        return 0.0;
    }
    population_std_dev(&gaps, mean(&gaps))
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn population_std_dev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}
