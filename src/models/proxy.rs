use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Proxy (modem) entry as reported by the account API
///
/// Names follow `<dongleNumericId>_<countryCode>[_<extra>]`, e.g. `12_DE_berlin`.
/// Snapshots are read-only; callers re-fetch instead of mutating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(
        default,
        alias = "externalIp",
        alias = "ext_ip",
        alias = "current_ip"
    )]
    pub external_ip: Option<String>,
    #[serde(default, alias = "isOnline", alias = "online")]
    pub is_online: bool,
    /// Capability URL; never echoed back to API callers
    #[serde(
        default,
        skip_serializing,
        alias = "rotationTriggerUrl",
        alias = "rotation_url",
        alias = "change_ip_url"
    )]
    pub rotation_trigger_url: Option<String>,
    #[serde(
        default,
        skip_serializing,
        alias = "rotationStatusUrl",
        alias = "status_url"
    )]
    pub rotation_status_url: Option<String>,
    #[serde(default, alias = "lastRotatedAt", alias = "last_rotation")]
    pub last_rotated_at: Option<DateTime<Utc>>,
}

impl ProxyRecord {
    /// Numeric dongle token in front of the country code
    pub fn dongle_segment(&self) -> Option<&str> {
        self.name
            .split('_')
            .next()
            .filter(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()))
    }

    /// Second underscore-delimited token of the name
    pub fn country_segment(&self) -> Option<&str> {
        self.name.split('_').nth(1).filter(|s| !s.is_empty())
    }

    /// Current public IP, if the account API reported a usable one
    pub fn current_ip(&self) -> Option<&str> {
        self.external_ip
            .as_deref()
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
    }

    pub fn trigger_url(&self) -> Option<&str> {
        non_blank(self.rotation_trigger_url.as_deref())
    }

    pub fn status_url(&self) -> Option<&str> {
        non_blank(self.rotation_status_url.as_deref())
    }

    /// Rotation is only possible when the provider handed out a trigger URL
    pub fn can_rotate(&self) -> bool {
        self.trigger_url().is_some()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Account APIs disagree on whether ids are strings or integers
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proxy(name: &str) -> ProxyRecord {
        ProxyRecord {
            id: "p1".to_string(),
            name: name.to_string(),
            external_ip: None,
            is_online: true,
            rotation_trigger_url: None,
            rotation_status_url: None,
            last_rotated_at: None,
        }
    }

    #[test]
    fn test_name_segments() {
        let p = proxy("12_DE_berlin");
        assert_eq!(p.dongle_segment(), Some("12"));
        assert_eq!(p.country_segment(), Some("DE"));

        let p = proxy("34_US");
        assert_eq!(p.dongle_segment(), Some("34"));
        assert_eq!(p.country_segment(), Some("US"));

        let p = proxy("office-modem");
        assert_eq!(p.dongle_segment(), None);
        assert_eq!(p.country_segment(), None);

        let p = proxy("ab_FR_x");
        assert_eq!(p.dongle_segment(), None);
        assert_eq!(p.country_segment(), Some("FR"));
    }

    #[test]
    fn test_blank_urls_and_ip_are_absent() {
        let mut p = proxy("1_US");
        p.rotation_trigger_url = Some("  ".to_string());
        p.external_ip = Some("".to_string());
        assert!(!p.can_rotate());
        assert_eq!(p.current_ip(), None);

        p.rotation_trigger_url = Some("https://rotate.example/1".to_string());
        p.external_ip = Some(" 10.0.0.1 ".to_string());
        assert!(p.can_rotate());
        assert_eq!(p.current_ip(), Some("10.0.0.1"));
    }

    #[test]
    fn test_deserialize_accepts_aliases_and_numeric_id() {
        let json = r#"{
            "id": 42,
            "name": "7_UA_kyiv",
            "externalIp": "1.2.3.4",
            "online": true,
            "rotation_url": "https://rotate.example/42",
            "status_url": "https://status.example/42",
            "lastRotatedAt": "2024-05-01T10:00:00Z"
        }"#;

        let p: ProxyRecord = serde_json::from_str(json).unwrap();
        assert_eq!(p.id, "42");
        assert_eq!(p.external_ip.as_deref(), Some("1.2.3.4"));
        assert!(p.is_online);
        assert_eq!(p.trigger_url(), Some("https://rotate.example/42"));
        assert_eq!(p.status_url(), Some("https://status.example/42"));
        assert!(p.last_rotated_at.is_some());
    }

    #[test]
    fn test_deserialize_minimal_record() {
        let p: ProxyRecord = serde_json::from_str(r#"{"id":"abc","name":"1_US"}"#).unwrap();
        assert!(!p.is_online);
        assert!(!p.can_rotate());
        assert!(p.last_rotated_at.is_none());
    }
}
