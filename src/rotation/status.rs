//! Interpreting provider response bodies

use serde_json::Value;

use super::transport::HttpResponse;

/// Field names providers use for the modem's current public IP
pub const IP_FIELDS: &[&str] = &["ext_ip", "external_ip", "current_ip", "ip"];

/// Pull a candidate IP out of a status body.
///
/// Top-level fields win over the same fields nested one level under `data`.
pub fn extract_ip(body: &Value) -> Option<String> {
    find_ip(body).or_else(|| body.get("data").and_then(find_ip))
}

fn find_ip(value: &Value) -> Option<String> {
    let object = value.as_object()?;
    IP_FIELDS.iter().find_map(|field| {
        object
            .get(*field)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .map(str::to_string)
    })
}

/// Provider's explicit rejection text for a trigger response, if any.
///
/// Non-2xx/3xx statuses and bodies carrying an `error` field both count;
/// the text is returned as the provider wrote it.
pub fn trigger_rejection(response: &HttpResponse) -> Option<String> {
    let error_field = response.json().and_then(|body| match body.get("error") {
        None | Some(Value::Null) | Some(Value::Bool(false)) => None,
        Some(Value::String(text)) if text.trim().is_empty() => None,
        Some(Value::String(text)) => Some(text.clone()),
        Some(other) => Some(other.to_string()),
    });

    if let Some(text) = error_field {
        return Some(text);
    }

    if !response.is_accepted() {
        let body = response.body.trim();
        return Some(if body.is_empty() {
            format!("HTTP {}", response.status)
        } else {
            body.to_string()
        });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_extract_ip_from_each_field_name() {
        for field in IP_FIELDS {
            let mut map = serde_json::Map::new();
            map.insert(field.to_string(), json!("9.9.9.9"));
            let body = Value::Object(map);
            assert_eq!(extract_ip(&body).as_deref(), Some("9.9.9.9"), "{}", field);
        }
    }

    #[test]
    fn test_extract_ip_nested_under_data() {
        let body = json!({ "status": "ok", "data": { "external_ip": "8.8.8.8" } });
        assert_eq!(extract_ip(&body).as_deref(), Some("8.8.8.8"));
    }

    #[test]
    fn test_extract_ip_prefers_top_level_and_skips_blank() {
        let body = json!({ "ext_ip": "  ", "ip": "1.1.1.1", "data": { "ip": "2.2.2.2" } });
        assert_eq!(extract_ip(&body).as_deref(), Some("1.1.1.1"));
    }

    #[test]
    fn test_extract_ip_missing() {
        assert_eq!(extract_ip(&json!({ "status": "rebooting" })), None);
        assert_eq!(extract_ip(&json!({ "data": { "ip": 42 } })), None);
        assert_eq!(extract_ip(&json!(["1.1.1.1"])), None);
    }

    #[test]
    fn test_trigger_rejection_error_field() {
        let resp = response(200, r#"{"error":"Rotation link expired"}"#);
        assert_eq!(
            trigger_rejection(&resp).as_deref(),
            Some("Rotation link expired")
        );

        let resp = response(200, r#"{"error":null,"status":"ok"}"#);
        assert_eq!(trigger_rejection(&resp), None);

        let resp = response(200, r#"{"error":false}"#);
        assert_eq!(trigger_rejection(&resp), None);

        let resp = response(200, r#"{"error":"  ","status":"ok"}"#);
        assert_eq!(trigger_rejection(&resp), None);
    }

    #[test]
    fn test_trigger_rejection_by_status() {
        assert_eq!(
            trigger_rejection(&response(403, "forbidden")).as_deref(),
            Some("forbidden")
        );
        assert_eq!(
            trigger_rejection(&response(500, "")).as_deref(),
            Some("HTTP 500")
        );
        assert_eq!(trigger_rejection(&response(302, "")), None);
        assert_eq!(trigger_rejection(&response(200, "OK")), None);
    }
}
