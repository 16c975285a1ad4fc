use crate::error::ProtocolError;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Outcome of a threat lookup. Computed fresh per call, never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    NoThreat,
    /// Named threat category reported by the server, e.g. "MALWARE".
    Threat(String),
}

impl Verdict {
    pub fn is_threat(&self) -> bool {
        matches!(self, Verdict::Threat(_))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FindThreatMatchesRequest {
    threat_info: ThreatInfo,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThreatInfo {
    threat_entries: Vec<ThreatEntry>,
}

#[derive(Debug, Serialize)]
struct ThreatEntry {
    url: String,
}

#[derive(Debug, Deserialize)]
struct FindThreatMatchesResponse {
    #[serde(default)]
    matches: Vec<ThreatMatch>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreatMatch {
    threat_type: String,
}

impl FindThreatMatchesRequest {
    fn for_url(url: &str) -> Self {
        Self {
            threat_info: ThreatInfo {
                threat_entries: vec![ThreatEntry {
                    url: url.to_string(),
                }],
            },
        }
    }
}

/// Client for the supervised threat-matching server. Holds only the
/// server's network address, never the process itself.
pub struct ThreatClient {
    address: String,
    http: Client,
}

impl ThreatClient {
    /// `timeout` bounds every lookup round trip; a server that accepts the
    /// connection but never answers surfaces as `ProtocolError::Transport`.
    pub fn new(address: impl Into<String>, timeout: Duration) -> Self {
        Self {
            address: address.into(),
            http: Client::builder()
                .user_agent("UrlVet/1.0")
                .timeout(timeout)
                .build()
                .unwrap(),
        }
    }

    /// Asks the server whether `url` matches a known threat. A non-200
    /// answer is fatal for this call and is not retried.
    pub async fn lookup(&self, url: &str) -> Result<Verdict, ProtocolError> {
        let endpoint = format!("http://{}/v4/threatMatches:find", self.address);

        let response = self
            .http
            .post(&endpoint)
            .json(&FindThreatMatchesRequest::for_url(url))
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(ProtocolError::Status(response.status()));
        }

        let content: FindThreatMatchesResponse = response.json().await?;
        Ok(match content.matches.into_iter().next() {
            Some(m) => Verdict::Threat(m.threat_type),
            None => Verdict::NoThreat,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_shape() {
        let request = FindThreatMatchesRequest::for_url("http://evil.example/p");
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "threatInfo": {
                    "threatEntries": [
                        {"url": "http://evil.example/p"}
                    ]
                }
            })
        );
    }

    #[test]
    fn test_response_with_matches() {
        let content: FindThreatMatchesResponse = serde_json::from_str(
            r#"{"matches": [{"threatType": "SOCIAL_ENGINEERING", "platformType": "ANY_PLATFORM"},
                            {"threatType": "MALWARE"}]}"#,
        )
        .unwrap();
        assert_eq!(content.matches.len(), 2);
        assert_eq!(content.matches[0].threat_type, "SOCIAL_ENGINEERING");
    }

    #[test]
    fn test_empty_response_is_no_threat() {
        let content: FindThreatMatchesResponse = serde_json::from_str("{}").unwrap();
        assert!(content.matches.is_empty());
    }

    #[test]
    fn test_verdict_is_threat() {
        assert!(Verdict::Threat("MALWARE".to_string()).is_threat());
        assert!(!Verdict::NoThreat.is_threat());
    }
}
