use std::time::Duration;

use webhook_core::model::DueAttempt;
use webhook_core::signing;

/// Outcome of one HTTP delivery attempt, already classified against the
/// response code table: `Terminal` attempts never retry, `Retryable` ones do
/// (subject to `MAX_RETRY_ATTEMPTS`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success { status_code: u16 },
    Retryable { status_code: Option<u16>, error_details: String },
    Terminal { status_code: u16, error_details: String },
}

const RETRYABLE_STATUS_CODES: [u16; 6] = [408, 429, 500, 502, 503, 504];

/// Performs the POST for one due attempt and classifies the result.
/// `timeout` is the configured `DELIVERY_TIMEOUT`.
pub async fn deliver(client: &reqwest::Client, attempt: &DueAttempt, timeout: Duration) -> Outcome {
    let body = serde_json::to_vec(&attempt.body).unwrap_or_default();

    let mut request = client
        .post(&attempt.target_url)
        .timeout(timeout)
        .header(reqwest::header::CONTENT_TYPE, "application/json");

    if let Some(secret) = &attempt.secret_key {
        let signature = signing::sign(secret, &body);
        request = request.header("X-Hub-Signature-256", signature);
    }
    if let Some(event_type) = &attempt.event_type {
        request = request.header("X-Webhook-Event", event_type);
    }

    match request.body(body).send().await {
        Ok(response) => {
            let status = response.status();
            if status.is_success() {
                Outcome::Success {
                    status_code: status.as_u16(),
                }
            } else {
                let body_text = response.text().await.unwrap_or_default();
                let mut error_details =
                    format!("Target server responded with status {}", status.as_u16());
                if !body_text.is_empty() {
                    let truncated: String = body_text.chars().take(200).collect();
                    error_details.push_str(&format!(": {truncated}"));
                }

                if RETRYABLE_STATUS_CODES.contains(&status.as_u16()) {
                    Outcome::Retryable {
                        status_code: Some(status.as_u16()),
                        error_details,
                    }
                } else {
                    Outcome::Terminal {
                        status_code: status.as_u16(),
                        error_details,
                    }
                }
            }
        }
        Err(e) if e.is_timeout() => Outcome::Retryable {
            status_code: None,
            error_details: format!("Request timed out after {} seconds", timeout.as_secs()),
        },
        Err(e) if e.is_connect() => Outcome::Retryable {
            status_code: None,
            error_details: format!("Connection error: {e}"),
        },
        Err(e) => Outcome::Retryable {
            status_code: None,
            error_details: format!("Unexpected error: {e}"),
        },
    }
}
