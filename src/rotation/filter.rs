//! Filter tokens narrowing a proxy list
//!
//! Recognized tokens: `online`, `offline`, `older-than-<N>h`, `older-than-<N>d`.
//! Several tokens may be combined with commas or whitespace; all must hold.

use chrono::{DateTime, Duration, Utc};

use crate::error::{Result, RotaError};
use crate::models::ProxyRecord;

/// Single filter predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyFilter {
    Online,
    Offline,
    /// Last rotation happened longer ago than this; never-rotated proxies always match
    OlderThan(Duration),
}

impl ProxyFilter {
    /// Parse one token, `None` when it is not a filter
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim().to_lowercase();
        match token.as_str() {
            "online" => return Some(Self::Online),
            "offline" => return Some(Self::Offline),
            _ => {}
        }

        let age = token.strip_prefix("older-than-")?;
        let unit = age.chars().last()?;
        let amount: i64 = age[..age.len() - unit.len_utf8()]
            .parse()
            .ok()
            .filter(|n| *n >= 0)?;
        match unit {
            'h' => Duration::try_hours(amount).map(Self::OlderThan),
            'd' => Duration::try_days(amount).map(Self::OlderThan),
            _ => None,
        }
    }

    pub fn matches(&self, proxy: &ProxyRecord, now: DateTime<Utc>) -> bool {
        match self {
            Self::Online => proxy.is_online,
            Self::Offline => !proxy.is_online,
            Self::OlderThan(age) => match proxy.last_rotated_at {
                None => true,
                Some(at) => now.signed_duration_since(at) > *age,
            },
        }
    }
}

impl std::fmt::Display for ProxyFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Online => write!(f, "online"),
            Self::Offline => write!(f, "offline"),
            Self::OlderThan(age) if age.num_hours() % 24 == 0 && age.num_hours() > 0 => {
                write!(f, "older-than-{}d", age.num_days())
            }
            Self::OlderThan(age) => write!(f, "older-than-{}h", age.num_hours()),
        }
    }
}

fn tokens(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
}

/// Parse a filter expression; unknown tokens are an error
pub fn parse_filters(raw: &str) -> Result<Vec<ProxyFilter>> {
    tokens(raw)
        .map(|token| {
            ProxyFilter::parse(token).ok_or_else(|| RotaError::InvalidFilter(token.to_string()))
        })
        .collect()
}

/// Whether every token of `raw` is a filter (used to spot identifiers that are really filters)
pub fn is_filter_expression(raw: &str) -> bool {
    let mut any = false;
    for token in tokens(raw) {
        if ProxyFilter::parse(token).is_none() {
            return false;
        }
        any = true;
    }
    any
}

/// Keep proxies satisfying every filter, preserving input order
pub fn apply_filter(
    proxies: &[ProxyRecord],
    filters: &[ProxyFilter],
    now: DateTime<Utc>,
) -> Vec<ProxyRecord> {
    proxies
        .iter()
        .filter(|p| filters.iter().all(|f| f.matches(p, now)))
        .cloned()
        .collect()
}
