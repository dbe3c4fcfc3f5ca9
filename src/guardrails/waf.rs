//! WAF header sanity check.
//!
//! The edge proxy in front of the intake endpoint stamps three signals on
//! every request: a threat score, a geographic origin tag, and a request
//! identifier. A high threat score always blocks; missing signals are
//! warnings unless the caller demands strict header presence.

use axum::http::HeaderMap;

use crate::config::GuardrailConfig;

/// Threat score header (0–100, stamped by the edge proxy).
pub const HEADER_THREAT_SCORE: &str = "x-waf-threat-score";
/// Geographic origin header.
pub const HEADER_GEO_IP: &str = "x-waf-geo-ip";
/// Request identifier header.
pub const HEADER_REQUEST_ID: &str = "x-waf-request-id";

/// Result of the WAF header check.
#[derive(Debug, Clone)]
pub struct WafCheck {
    /// Threat score at or above the block threshold — always fails.
    pub blocked: bool,
    /// Missing or malformed signals. Fail the check only under strictness.
    pub warnings: Vec<String>,
}

impl WafCheck {
    /// Whether the check passes under the given strictness.
    pub fn ok(&self, strict: bool) -> bool {
        !self.blocked && (!strict || self.warnings.is_empty())
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Verify the WAF signal triple on a request.
pub fn verify_waf_headers(headers: &HeaderMap, config: &GuardrailConfig) -> WafCheck {
    let mut warnings = Vec::new();

    let threat_score = header_str(headers, HEADER_THREAT_SCORE);
    if threat_score.is_none() {
        warnings.push("missing_threat_score".to_string());
    }
    if header_str(headers, HEADER_GEO_IP).is_none() {
        warnings.push("missing_geo_ip".to_string());
    }
    if header_str(headers, HEADER_REQUEST_ID).is_none() {
        warnings.push("missing_request_id".to_string());
    }

    if let Some(raw) = threat_score {
        match raw.trim().parse::<u32>() {
            Ok(score) if score >= config.threat_score_block => {
                return WafCheck {
                    blocked: true,
                    warnings: vec!["high_threat_score".to_string()],
                };
            }
            Ok(_) => {}
            Err(_) => warnings.push("malformed_threat_score".to_string()),
        }
    }

    WafCheck {
        blocked: false,
        warnings,
    }
}
