//! Resolving user-supplied identifiers into concrete proxies
//!
//! Rules are tried in priority order and the first acceptable one wins:
//!
//! 1. exact full name (case-insensitive)
//! 2. exact id
//! 3. dongle number (exact, then prefix), only when it picks a single proxy
//! 4. country code as a whole name token, never a substring ("US" must not hit "UA")
//! 5. substring of the full name
//!
//! Rules 4 and 5 return every match when there are several. Picking one of
//! them is left to the caller.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::filter::{apply_filter, is_filter_expression, parse_filters};
use crate::error::Result;
use crate::models::{ProxyRecord, TargetSelector};

/// Narrow `proxies` down to the candidates `identifier` refers to.
///
/// Deterministic and order-preserving; an unknown identifier yields an
/// empty list rather than an error.
pub fn resolve(proxies: &[ProxyRecord], identifier: &str) -> Vec<ProxyRecord> {
    let needle = identifier.trim();
    if needle.is_empty() {
        return Vec::new();
    }
    let lowered = needle.to_lowercase();

    let by_name = select(proxies, |p| p.name.to_lowercase() == lowered);
    if !by_name.is_empty() {
        return by_name;
    }

    let by_id = select(proxies, |p| p.id == needle);
    if !by_id.is_empty() {
        return by_id;
    }

    if needle.chars().all(|c| c.is_ascii_digit()) {
        let exact = select(proxies, |p| p.dongle_segment() == Some(needle));
        if exact.len() == 1 {
            return exact;
        }
        let prefix = select(proxies, |p| {
            p.dongle_segment().is_some_and(|d| d.starts_with(needle))
        });
        if prefix.len() == 1 {
            return prefix;
        }
    }

    let by_country = select(proxies, |p| {
        p.country_segment()
            .is_some_and(|c| c.eq_ignore_ascii_case(needle))
    });
    if !by_country.is_empty() {
        return by_country;
    }

    select(proxies, |p| p.name.to_lowercase().contains(&lowered))
}

fn select<F>(proxies: &[ProxyRecord], predicate: F) -> Vec<ProxyRecord>
where
    F: Fn(&ProxyRecord) -> bool,
{
    proxies.iter().filter(|p| predicate(p)).cloned().collect()
}

/// What a target selector narrowed the account down to
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "proxies", rename_all = "snake_case")]
pub enum ResolutionOutcome {
    /// Exactly one proxy; safe to rotate
    Unique(ProxyRecord),
    /// Several proxies, explicitly requested via "all"
    Selected(Vec<ProxyRecord>),
    /// Several candidates; the caller must choose
    Ambiguous(Vec<ProxyRecord>),
    /// Nothing matched
    Empty,
}

impl ResolutionOutcome {
    /// Proxies a rotation may proceed with; empty unless resolution is settled
    pub fn targets(&self) -> Vec<ProxyRecord> {
        match self {
            Self::Unique(proxy) => vec![proxy.clone()],
            Self::Selected(proxies) => proxies.clone(),
            Self::Ambiguous(_) | Self::Empty => Vec::new(),
        }
    }

    pub fn candidates(&self) -> &[ProxyRecord] {
        match self {
            Self::Unique(proxy) => std::slice::from_ref(proxy),
            Self::Selected(proxies) | Self::Ambiguous(proxies) => proxies,
            Self::Empty => &[],
        }
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Self::Ambiguous(_))
    }
}

/// Combine identifier resolution, filters and the "all" flag.
///
/// The identifier narrows first and the filter narrows further. An identifier
/// made only of filter tokens is treated as a filter. With neither identifier
/// nor filter and no "all", the whole account is listed for disambiguation,
/// unless `auto_select_if_unique` is set and the account has a single proxy.
pub fn resolve_targets(
    proxies: &[ProxyRecord],
    selector: &TargetSelector,
    auto_select_if_unique: bool,
    now: DateTime<Utc>,
) -> Result<ResolutionOutcome> {
    let mut filters = match selector.filter.as_deref() {
        Some(raw) => parse_filters(raw)?,
        None => Vec::new(),
    };

    let mut identifier = selector
        .identifier
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    if let Some(raw) = identifier {
        if is_filter_expression(raw) {
            filters.extend(parse_filters(raw)?);
            identifier = None;
        }
    }

    let narrowed = match identifier {
        Some(id) => resolve(proxies, id),
        None => proxies.to_vec(),
    };
    let mut candidates = apply_filter(&narrowed, &filters, now);

    if candidates.is_empty() {
        return Ok(ResolutionOutcome::Empty);
    }

    if selector.all {
        return Ok(ResolutionOutcome::Selected(candidates));
    }

    let unscoped = identifier.is_none() && filters.is_empty();
    if unscoped && !auto_select_if_unique {
        return Ok(ResolutionOutcome::Ambiguous(candidates));
    }

    if candidates.len() == 1 {
        return Ok(ResolutionOutcome::Unique(candidates.remove(0)));
    }

    Ok(ResolutionOutcome::Ambiguous(candidates))
}
