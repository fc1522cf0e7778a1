//! Plain-text rendering of rotation outcomes

use std::fmt::Write;

use crate::models::{ProxyRecord, RotationHistoryEntry, RotationResult, RotationStatus};
use crate::rotation::BatchSummary;

fn seconds(ms: u64) -> String {
    format!("{:.1}s", ms as f64 / 1000.0)
}

fn ip_or_dash(ip: Option<&str>) -> &str {
    ip.unwrap_or("-")
}

/// One line describing a single proxy's outcome
pub fn format_result(result: &RotationResult) -> String {
    match result.status() {
        RotationStatus::Confirmed => format!(
            "[ok] {}: {} -> {} ({})",
            result.proxy_name(),
            ip_or_dash(result.old_ip()),
            ip_or_dash(result.new_ip()),
            seconds(result.elapsed_ms())
        ),
        RotationStatus::Unconfirmed => format!(
            "[pending] {}: {} (was {})",
            result.proxy_name(),
            result
                .error()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "not confirmed".to_string()),
            ip_or_dash(result.old_ip())
        ),
        RotationStatus::Failed => format!(
            "[failed] {}: {}",
            result.proxy_name(),
            result
                .error()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown error".to_string())
        ),
    }
}

/// Counts line followed by one line per result
pub fn format_batch_summary(results: &[RotationResult]) -> String {
    if let [single] = results {
        return format_result(single);
    }

    let summary = BatchSummary::from_results(results);
    let mut out = format!(
        "Rotated {} proxies: {} confirmed, {} unconfirmed, {} failed",
        summary.total, summary.confirmed, summary.unconfirmed, summary.failed
    );
    for result in results {
        let _ = write!(out, "\n  {}", format_result(result));
    }
    out
}

/// Candidate listing shown when an identifier matches several proxies
pub fn format_disambiguation(identifier: Option<&str>, candidates: &[ProxyRecord]) -> String {
    let mut out = match identifier {
        Some(id) => format!("{} proxies match \"{}\":", candidates.len(), id),
        None => format!("Choose a proxy to rotate ({} available):", candidates.len()),
    };

    for (index, proxy) in candidates.iter().enumerate() {
        let _ = write!(
            out,
            "\n  {}. {} (id {}, {}, {})",
            index + 1,
            proxy.name,
            proxy.id,
            if proxy.is_online { "online" } else { "offline" },
            ip_or_dash(proxy.current_ip())
        );
    }

    out.push_str("\nRepeat with an exact name or id, or request all matches.");
    out
}

pub fn format_no_match(identifier: Option<&str>) -> String {
    match identifier {
        Some(id) => format!("No proxy matches \"{}\".", id),
        None => "No proxies match the given filter.".to_string(),
    }
}

/// History listing, newest first
pub fn format_history(entries: &[RotationHistoryEntry]) -> String {
    if entries.is_empty() {
        return "No rotations recorded.".to_string();
    }

    let mut out = format!("Last {} rotations:", entries.len());
    for entry in entries.iter().rev() {
        let _ = write!(
            out,
            "\n  {} {} {} -> {} [{}]",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.proxy_name,
            ip_or_dash(entry.old_ip.as_deref()),
            ip_or_dash(entry.new_ip.as_deref()),
            entry.status
        );
        if let Some(code) = &entry.error_code {
            let _ = write!(out, " {}", code);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::test_support::entry;
    use crate::models::{FailureReason, VerifiedIp};
    use std::time::Duration;

    fn proxy(id: &str, name: &str, online: bool) -> ProxyRecord {
        ProxyRecord {
            id: id.to_string(),
            name: name.to_string(),
            external_ip: Some("1.1.1.1".to_string()),
            is_online: online,
            rotation_trigger_url: None,
            rotation_status_url: None,
            last_rotated_at: None,
        }
    }

    fn confirmed() -> RotationResult {
        let ip = VerifiedIp::accept(Some("2.2.2.2"), Some("1.1.1.1")).unwrap();
        RotationResult::confirmed(&proxy("p1", "12_DE_abc", true), ip, Duration::from_millis(14_300))
    }

    #[test]
    fn test_format_each_status() {
        assert_eq!(
            format_result(&confirmed()),
            "[ok] 12_DE_abc: 1.1.1.1 -> 2.2.2.2 (14.3s)"
        );

        let pending = RotationResult::failed(
            &proxy("p2", "34_US_def", true),
            FailureReason::VerificationTimeout,
            Duration::from_secs(40),
        );
        assert_eq!(
            format_result(&pending),
            "[pending] 34_US_def: IP change not confirmed yet, check again later (was 1.1.1.1)"
        );

        let failed = RotationResult::failed(
            &proxy("p3", "56_PL_ghi", false),
            FailureReason::ProviderRejected("Rotation link has expired".into()),
            Duration::ZERO,
        );
        assert_eq!(
            format_result(&failed),
            "[failed] 56_PL_ghi: provider rejected: Rotation link has expired"
        );
    }

    #[test]
    fn test_batch_summary_counts() {
        let failed = RotationResult::failed(
            &proxy("p3", "56_PL_ghi", false),
            FailureReason::MissingRotationUrl,
            Duration::ZERO,
        );
        let text = format_batch_summary(&[confirmed(), failed]);
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("Rotated 2 proxies: 1 confirmed, 0 unconfirmed, 1 failed")
        );
        assert_eq!(lines.count(), 2);
    }

    #[test]
    fn test_single_result_summary_is_one_line() {
        assert_eq!(format_batch_summary(&[confirmed()]), format_result(&confirmed()));
    }

    #[test]
    fn test_disambiguation_lists_every_candidate() {
        let candidates = vec![proxy("p1", "12_DE_abc", true), proxy("p4", "78_DE_xyz", false)];
        let text = format_disambiguation(Some("DE"), &candidates);
        assert!(text.starts_with("2 proxies match \"DE\":"));
        assert!(text.contains("1. 12_DE_abc (id p1, online, 1.1.1.1)"));
        assert!(text.contains("2. 78_DE_xyz (id p4, offline, 1.1.1.1)"));
    }

    #[test]
    fn test_history_is_newest_first() {
        let text = format_history(&[entry("p1", 1), entry("p2", 2)]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Last 2 rotations:");
        assert!(lines[1].contains("p2_DE"));
        assert!(lines[2].contains("p1_DE"));
        assert!(lines[1].contains("[confirmed]"));

        assert_eq!(format_history(&[]), "No rotations recorded.");
    }
}
