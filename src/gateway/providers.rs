/// Provider endpoint adapters (raw HTTP via reqwest)
///
/// Each adapter turns a persisted `RequestData` into one HTTP call and
/// classifies the response into the gateway's success/failure taxonomy.
/// A bounded transport-level retry (2 attempts) lives here; it is distinct
/// from the queue-level retry the driver applies on transient failures.
use crate::config::with_config;
use crate::errors::WardenError;
use crate::gateway::types::{ApiProvider, RequestData};
use crate::logger::{self, LogTag};
use reqwest::Client;
use std::time::Duration;

const ETHERSCAN_BASE_URL: &str = "https://api.etherscan.io/v2/api";
const GEMINI_BASE_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent";

/// Transport attempts per dispatch (not to be confused with queue attempts)
const TRANSPORT_ATTEMPTS: u32 = 2;
const TRANSPORT_BACKOFF_MS: u64 = 500;

/// Dispatch one claimed request and classify the result
pub async fn dispatch(
    client: &Client,
    provider: ApiProvider,
    request_data: &RequestData,
) -> Result<String, WardenError> {
    let mut last_error = WardenError::transient(provider.as_str(), "no attempt made");

    for attempt in 0..TRANSPORT_ATTEMPTS {
        if attempt > 0 {
            let backoff = TRANSPORT_BACKOFF_MS * 2u64.pow(attempt - 1);
            tokio::time::sleep(Duration::from_millis(backoff)).await;
        }

        let outcome = match (provider, request_data) {
            (ApiProvider::Etherscan, RequestData::Explorer { .. }) => {
                call_explorer(client, request_data).await
            }
            (ApiProvider::Gemini, RequestData::Generate { prompt }) => {
                call_gemini(client, prompt).await
            }
            _ => Err(WardenError::permanent(
                provider.as_str(),
                "request data does not match provider",
            )),
        };

        match outcome {
            Ok(result) => return Ok(result),
            // Only transport-level trouble is worth a same-dispatch retry;
            // permanent classifications surface immediately
            Err(err) if err.is_transient() && attempt + 1 < TRANSPORT_ATTEMPTS => {
                logger::debug(
                    LogTag::Gateway,
                    &format!("Transport retry for {}: {}", provider, err),
                );
                last_error = err;
            }
            Err(err) => return Err(err),
        }
    }
    Err(last_error)
}

// =============================================================================
// ETHERSCAN ADAPTER
// =============================================================================

async fn call_explorer(client: &Client, request_data: &RequestData) -> Result<String, WardenError> {
    let RequestData::Explorer {
        module,
        action,
        chain_id,
        params,
    } = request_data
    else {
        return Err(WardenError::permanent("etherscan", "not an explorer request"));
    };

    let api_key = with_config(|cfg| cfg.etherscan_api_key.clone());
    let mut query: Vec<(String, String)> = vec![
        ("module".to_string(), module.clone()),
        ("action".to_string(), action.clone()),
        ("chainid".to_string(), chain_id.to_string()),
        ("apikey".to_string(), api_key),
    ];
    query.extend(params.iter().cloned());

    let response = client
        .get(ETHERSCAN_BASE_URL)
        .query(&query)
        .send()
        .await
        .map_err(|e| classify_reqwest_error("etherscan", e))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| WardenError::transient("etherscan", format!("body read failed: {}", e)))?;

    if status.is_server_error() {
        return Err(WardenError::transient(
            "etherscan",
            format!("HTTP {}", status.as_u16()),
        ));
    }
    if status.as_u16() == 429 {
        return Err(WardenError::transient("etherscan", "HTTP 429"));
    }
    if status.is_client_error() {
        return Err(WardenError::permanent(
            "etherscan",
            format!("HTTP {}: {}", status.as_u16(), truncate(&body, 200)),
        ));
    }

    classify_explorer_body(&body)
}

/// Explorer success when `status == "1"` or the message contains OK;
/// "No transactions found" is a successful empty list.
fn classify_explorer_body(body: &str) -> Result<String, WardenError> {
    let parsed: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| WardenError::permanent("etherscan", format!("unparseable response: {}", e)))?;

    let status = parsed.get("status").and_then(|s| s.as_str()).unwrap_or("");
    let message = parsed.get("message").and_then(|m| m.as_str()).unwrap_or("");

    if status == "1" || message.contains("OK") {
        let result = parsed.get("result").cloned().unwrap_or(serde_json::Value::Null);
        return Ok(result.to_string());
    }

    // The sentinel arrives with status "0"; it is an empty success, not an error
    if message.contains("No transactions found") {
        return Ok("[]".to_string());
    }

    let detail = parsed
        .get("result")
        .and_then(|r| r.as_str())
        .unwrap_or(message);
    if detail.to_lowercase().contains("rate limit") {
        return Err(WardenError::transient("etherscan", detail));
    }
    Err(WardenError::permanent("etherscan", detail))
}

// =============================================================================
// GEMINI ADAPTER
// =============================================================================

async fn call_gemini(client: &Client, prompt: &str) -> Result<String, WardenError> {
    let api_key = with_config(|cfg| cfg.gemini_api_key.clone());
    if api_key.is_empty() {
        return Err(WardenError::permanent("gemini", "GEMINI_API_KEY not set"));
    }

    let body = serde_json::json!({
        "contents": [ { "parts": [ { "text": prompt } ] } ]
    });

    let response = client
        .post(format!("{}?key={}", GEMINI_BASE_URL, api_key))
        .header("Content-Type", "application/json")
        .json(&body)
        .send()
        .await
        .map_err(|e| classify_reqwest_error("gemini", e))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| WardenError::transient("gemini", format!("body read failed: {}", e)))?;

    if status.is_server_error() || status.as_u16() == 429 {
        return Err(WardenError::transient(
            "gemini",
            format!("HTTP {}", status.as_u16()),
        ));
    }
    if status.is_client_error() {
        return Err(WardenError::permanent(
            "gemini",
            format!("HTTP {}: {}", status.as_u16(), truncate(&body, 200)),
        ));
    }

    classify_gemini_body(&body)
}

/// Answer is the first candidate's text; content-filter payloads are
/// permanent failures (retrying the same prompt cannot help).
fn classify_gemini_body(body: &str) -> Result<String, WardenError> {
    let parsed: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| WardenError::permanent("gemini", format!("unparseable response: {}", e)))?;

    if let Some(reason) = parsed
        .get("promptFeedback")
        .and_then(|f| f.get("blockReason"))
        .and_then(|r| r.as_str())
    {
        return Err(WardenError::permanent(
            "gemini",
            format!("content filtered: {}", reason),
        ));
    }

    let text = parsed
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.get(0))
        .and_then(|p| p.get("text"))
        .and_then(|t| t.as_str());

    match text {
        Some(text) => Ok(text.to_string()),
        None => Err(WardenError::permanent(
            "gemini",
            "no candidate text in response",
        )),
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn classify_reqwest_error(provider: &str, err: reqwest::Error) -> WardenError {
    // Connect/timeout/body failures are all transport-level and retryable
    WardenError::transient(provider, err.to_string())
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explorer_success_returns_result_field() {
        let body = r#"{"status":"1","message":"OK","result":[{"hash":"0x1"}]}"#;
        let result = classify_explorer_body(body).unwrap();
        assert!(result.contains("0x1"));
    }

    #[test]
    fn test_explorer_empty_sentinel_is_success() {
        let body = r#"{"status":"0","message":"No transactions found","result":[]}"#;
        assert_eq!(classify_explorer_body(body).unwrap(), "[]");
    }

    #[test]
    fn test_explorer_rate_limit_is_transient() {
        let body = r#"{"status":"0","message":"NOTOK","result":"Max rate limit reached"}"#;
        let err = classify_explorer_body(body).unwrap_err();
        assert!(err.is_transient());
    }

    #[test]
    fn test_explorer_other_failure_is_permanent() {
        let body = r#"{"status":"0","message":"NOTOK","result":"Invalid API Key"}"#;
        let err = classify_explorer_body(body).unwrap_err();
        assert!(!err.is_transient());
    }

    #[test]
    fn test_explorer_garbage_is_permanent() {
        let err = classify_explorer_body("<html>gateway error</html>").unwrap_err();
        assert!(!err.is_transient());
    }

    #[test]
    fn test_gemini_extracts_first_candidate_text() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"summary here"}]}}]}"#;
        assert_eq!(classify_gemini_body(body).unwrap(), "summary here");
    }

    #[test]
    fn test_gemini_content_filter_is_permanent() {
        let body = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        let err = classify_gemini_body(body).unwrap_err();
        assert!(!err.is_transient());
    }

    #[test]
    fn test_gemini_missing_candidates_is_permanent() {
        let err = classify_gemini_body(r#"{"candidates":[]}"#).unwrap_err();
        assert!(!err.is_transient());
    }
}
