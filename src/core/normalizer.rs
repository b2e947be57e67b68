//! Converts one raw source record into the canonical [`Draw`].
//!
//! Field names differ between the community mirror and the official source,
//! so every logical field is resolved from an ordered list of candidate
//! names. Nothing downstream of this module sees a source field name.

use crate::domain::model::{Draw, PayoutTier, RawRecord, MAX_NUMBER, NUMBERS_PER_DRAW, PAYOUT_MATCHES};
use crate::utils::error::{Result, SyncError};
use serde_json::Value;

const NUMBER_FIELDS: &[&str] = &["concurso", "numero", "number"];
const DATE_FIELDS: &[&str] = &["data", "dataApuracao", "date"];
const NUMBERS_FIELDS: &[&str] = &["dezenas", "listaDezenas", "numbers"];
const PAYOUT_FIELDS: &[&str] = &["premiacoes", "listaRateioPremio", "payoutTiers"];
const ACCUMULATED_FIELDS: &[&str] = &["acumulou", "acumulado", "accumulated"];
const ACCUMULATED_VALUE_FIELDS: &[&str] =
    &["valorAcumuladoProximoConcurso", "valorAcumulado", "accumulatedValue"];

const TIER_DESCRIPTION_FIELDS: &[&str] = &["descricao", "descricaoFaixa", "description"];
const TIER_WINNER_FIELDS: &[&str] = &["ganhadores", "numeroDeGanhadores", "winnerCount"];
const TIER_PRIZE_FIELDS: &[&str] = &["valorPremio", "prizeAmount"];
const TIER_MATCH_FIELDS: &[&str] = &["acertos", "matches"];
const TIER_RANK_FIELDS: &[&str] = &["faixa"];

/// 將原始記錄轉為標準 Draw；失敗時回傳 `MalformedRecord`，呼叫端應記錄後略過
pub fn normalize(record: &RawRecord) -> Result<Draw> {
    let number = resolve(record, NUMBER_FIELDS)
        .and_then(as_integer)
        .ok_or_else(|| SyncError::malformed("missing or non-numeric draw number"))?;
    if number <= 0 || number > i64::from(u32::MAX) {
        return Err(SyncError::malformed(format!(
            "draw number {} out of range",
            number
        )));
    }
    let number = number as u32;

    let numbers = resolve(record, NUMBERS_FIELDS)
        .ok_or_else(|| SyncError::malformed(format!("draw {}: missing numbers", number)))
        .and_then(|value| normalize_numbers(number, value))?;

    let date = match resolve(record, DATE_FIELDS) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(other) => other.to_string(),
        None => String::new(),
    };

    let accumulated = resolve(record, ACCUMULATED_FIELDS)
        .and_then(as_bool)
        .unwrap_or(false);

    let accumulated_value = resolve(record, ACCUMULATED_VALUE_FIELDS)
        .and_then(as_decimal)
        .filter(|v| *v >= 0.0)
        .unwrap_or(0.0);

    let payout_tiers = match resolve(record, PAYOUT_FIELDS) {
        Some(Value::Array(items)) => normalize_tiers(items),
        _ => Vec::new(),
    };

    Ok(Draw {
        number,
        date,
        numbers,
        accumulated,
        accumulated_value,
        payout_tiers,
    })
}

fn normalize_numbers(number: u32, value: &Value) -> Result<Vec<u8>> {
    let items = value.as_array().ok_or_else(|| {
        SyncError::malformed(format!("draw {}: numbers field is not a list", number))
    })?;

    let mut numbers = Vec::with_capacity(items.len());
    for item in items {
        let n = as_integer(item).ok_or_else(|| {
            SyncError::malformed(format!("draw {}: non-numeric value {}", number, item))
        })?;
        if n < 1 || n > i64::from(MAX_NUMBER) {
            return Err(SyncError::malformed(format!(
                "draw {}: value {} outside 1..={}",
                number, n, MAX_NUMBER
            )));
        }
        numbers.push(n as u8);
    }

    numbers.sort_unstable();
    if numbers.windows(2).any(|w| w[0] == w[1]) {
        return Err(SyncError::malformed(format!(
            "draw {}: duplicated numbers",
            number
        )));
    }
    if numbers.len() != NUMBERS_PER_DRAW {
        return Err(SyncError::malformed(format!(
            "draw {}: expected {} numbers, got {}",
            number,
            NUMBERS_PER_DRAW,
            numbers.len()
        )));
    }

    Ok(numbers)
}

fn normalize_tiers(items: &[Value]) -> Vec<PayoutTier> {
    let mut tiers: Vec<PayoutTier> = Vec::new();

    for item in items {
        let Some(obj) = item.as_object() else {
            continue;
        };
        let tier = RawRecord {
            data: obj.clone().into_iter().collect(),
        };

        let Some(matches) = tier_matches(&tier) else {
            continue;
        };

        // 缺少的數值視為 0；非數字或負數則丟棄該級距
        let winner_count = match resolve(&tier, TIER_WINNER_FIELDS) {
            None => Some(0),
            Some(v) => as_integer(v).filter(|w| *w >= 0).map(|w| w as u64),
        };
        let prize_amount = match resolve(&tier, TIER_PRIZE_FIELDS) {
            None => Some(0.0),
            Some(v) => as_decimal(v).filter(|p| *p >= 0.0),
        };
        let (Some(winner_count), Some(prize_amount)) = (winner_count, prize_amount) else {
            continue;
        };

        if tiers.iter().any(|t| t.matches == matches) {
            continue;
        }
        tiers.push(PayoutTier {
            matches,
            winner_count,
            prize_amount,
        });
    }

    tiers.sort_by(|a, b| b.matches.cmp(&a.matches));
    tiers
}

/// 數字識別優先於文字描述：先看明確的中獎數，再看級距序號，最後比對描述
fn tier_matches(tier: &RawRecord) -> Option<u8> {
    if let Some(m) = resolve(tier, TIER_MATCH_FIELDS).and_then(as_integer) {
        return PAYOUT_MATCHES.iter().copied().find(|p| i64::from(*p) == m);
    }

    if let Some(rank) = resolve(tier, TIER_RANK_FIELDS).and_then(as_integer) {
        return usize::try_from(rank - 1)
            .ok()
            .and_then(|idx| PAYOUT_MATCHES.get(idx).copied());
    }

    let description = resolve(tier, TIER_DESCRIPTION_FIELDS)?.as_str()?;
    PAYOUT_MATCHES
        .iter()
        .copied()
        .find(|m| description.contains(&m.to_string()))
}

fn resolve<'a>(record: &'a RawRecord, aliases: &[&str]) -> Option<&'a Value> {
    aliases
        .iter()
        .filter_map(|name| record.data.get(*name))
        .find(|value| !value.is_null())
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// 同時接受 `1234.56` 與巴西格式 `1.234,56`；
/// 沒有逗號且以三位數分組的 `1.234` 視為巴西千分位
fn as_decimal(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            let parsed = if s.contains(',') || is_thousands_grouped(s) {
                s.replace('.', "").replace(',', ".").parse::<f64>()
            } else {
                s.parse::<f64>()
            };
            parsed.ok().filter(|f| f.is_finite())
        }
        _ => None,
    }
}

fn is_thousands_grouped(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    let mut groups = digits.split('.');
    let head_ok = groups
        .next()
        .is_some_and(|g| (1..=3).contains(&g.len()) && g.bytes().all(|b| b.is_ascii_digit()));
    let tail: Vec<&str> = groups.collect();
    head_ok
        && !tail.is_empty()
        && tail
            .iter()
            .all(|g| g.len() == 3 && g.bytes().all(|b| b.is_ascii_digit()))
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|i| i != 0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}
