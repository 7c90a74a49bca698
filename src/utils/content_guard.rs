use serde_json::{json, Value};

/// Largest document `load-pdf` accepts, from disk or over HTTP.
pub const PDF_LIMIT_BYTES: u64 = 500 * 1024 * 1024; // 500 MiB

/// Safely truncates a UTF-8 string without breaking character boundaries.
/// If `s` length exceeds `max`, returns a string cut at a valid char boundary and appends `suffix`.
/// The resulting string length will be <= max whenever possible (suffix included). If `max` < suffix length,
/// the function returns a safely cut string without suffix, not exceeding `max` bytes.
pub fn safe_truncate_utf8(s: &str, max: usize, suffix: &str) -> String {
    if s.len() <= max {
        return s.to_string();
    }

    if max == 0 {
        return String::new();
    }

    let suffix_len = suffix.len();
    if max <= suffix_len {
        let mut end = max;
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        return s[..end].to_string();
    }

    let mut end = max - suffix_len;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    let mut result = String::with_capacity(end + suffix_len);
    result.push_str(&s[..end]);
    result.push_str(suffix);
    result
}

/// Builds a standardized error payload string for tool errors.
/// First line: short human-readable message.
/// Then a JSON object with fields: code, message, details.
pub fn build_error_payload(code: &str, message: &str, details: Value) -> String {
    let obj = json!({
        "code": code,
        "message": message,
        "details": details,
    });
    let mut out = String::new();
    out.push_str(message);
    out.push('\n');
    out.push_str(&obj.to_string());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_respects_char_boundaries() {
        let s = "héllo wörld";
        let out = safe_truncate_utf8(s, 8, "…");
        assert!(out.len() <= 8);
        assert!(out.ends_with('…'));
        assert_eq!(safe_truncate_utf8("short", 10, "..."), "short");
        assert_eq!(safe_truncate_utf8("abcdef", 2, "..."), "ab");
    }

    #[test]
    fn error_payload_has_message_line_and_json() {
        let payload = build_error_payload("ERR_X", "Something broke", json!({ "path": "a.pdf" }));
        let mut lines = payload.lines();
        assert_eq!(lines.next(), Some("Something broke"));
        let v: Value = serde_json::from_str(lines.next().expect("json line")).expect("json");
        assert_eq!(v["code"], "ERR_X");
        assert_eq!(v["details"]["path"], "a.pdf");
    }
}
