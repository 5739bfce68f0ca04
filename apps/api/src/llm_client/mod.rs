//! Inference client: the single point of entry for all remote model calls.
//!
//! ARCHITECTURAL RULE: handlers never talk to the inference endpoint directly.
//! Every call goes through `InferenceClient::infer`, which owns the retry policy.
//!
//! Sampling parameters are fixed for every call (see `SamplingParams::default`).

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, error, info_span, Instrument};
use uuid::Uuid;

use crate::retry::{RetryError, RetryPolicy};

pub mod gradio;
pub mod prompts;

/// Failure of a single transport round trip.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection refused, timeout, truncated body. Safe to retry.
    #[error("transport failure: {0}")]
    Transient(String),

    /// The endpoint answered with a well-formed failure.
    #[error("remote error (status {status}): {message}")]
    Remote { status: u16, message: String },

    #[error("unexpected response shape: {0}")]
    Malformed(String),

    /// The request could not be built or sent as specified, e.g. an invalid URL.
    #[error("invalid request: {0}")]
    Invalid(String),
}

impl TransportError {
    pub fn is_transient(&self) -> bool {
        matches!(self, TransportError::Transient(_))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_builder() {
            TransportError::Invalid(e.to_string())
        } else if e.is_timeout() || e.is_connect() || e.is_request() || e.is_body() {
            TransportError::Transient(e.to_string())
        } else if let Some(status) = e.status() {
            TransportError::Remote {
                status: status.as_u16(),
                message: e.to_string(),
            }
        } else if e.is_decode() {
            TransportError::Malformed(e.to_string())
        } else {
            TransportError::Invalid(e.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("inference endpoint unreachable after {attempts} attempts: {last}")]
    TransportExhausted { attempts: u32, last: String },

    #[error("inference endpoint returned an error (status {status}): {message}")]
    Remote { status: u16, message: String },

    #[error("inference endpoint returned malformed output: {0}")]
    Malformed(String),

    #[error("inference request is invalid: {0}")]
    InvalidRequest(String),
}

impl From<TransportError> for InferenceError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Transient(last) => {
                InferenceError::TransportExhausted { attempts: 1, last }
            }
            TransportError::Remote { status, message } => {
                InferenceError::Remote { status, message }
            }
            TransportError::Malformed(msg) => InferenceError::Malformed(msg),
            TransportError::Invalid(msg) => InferenceError::InvalidRequest(msg),
        }
    }
}

impl From<RetryError<TransportError>> for InferenceError {
    fn from(e: RetryError<TransportError>) -> Self {
        match e {
            RetryError::Exhausted { attempts, last } => InferenceError::TransportExhausted {
                attempts,
                last: last.to_string(),
            },
            RetryError::Permanent(e) => e.into(),
        }
    }
}

/// Generation controls sent with every prompt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingParams {
    pub temperature: f64,
    pub max_new_tokens: u32,
    pub top_p: f64,
    pub repetition_penalty: f64,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_new_tokens: 300,
            top_p: 0.9,
            repetition_penalty: 1.2,
        }
    }
}

impl SamplingParams {
    /// Positional argument list for the remote `/chat` operation.
    pub fn to_call_data(&self, prompt: &str) -> Vec<Value> {
        vec![
            json!(prompt),
            json!(self.temperature),
            json!(self.max_new_tokens),
            json!(self.top_p),
            json!(self.repetition_penalty),
        ]
    }
}

/// A single round trip to a named remote operation.
///
/// Carried by `InferenceClient` as `Arc<dyn InferenceTransport>` so tests can
/// substitute a scripted transport.
#[async_trait]
pub trait InferenceTransport: Send + Sync {
    async fn predict(&self, api_name: &str, data: Vec<Value>) -> Result<Value, TransportError>;
}

/// Process-wide inference handle. Built once in `main` before the listener
/// is bound, then shared by every request through `AppState`.
#[derive(Clone)]
pub struct InferenceClient {
    transport: Arc<dyn InferenceTransport>,
    api_name: String,
    policy: RetryPolicy,
    params: SamplingParams,
}

impl InferenceClient {
    pub fn new(
        transport: Arc<dyn InferenceTransport>,
        api_name: impl Into<String>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            api_name: api_name.into(),
            policy,
            params: SamplingParams::default(),
        }
    }

    /// Sends `prompt` with the fixed sampling parameters and returns the
    /// model's text, trimmed. Transport failures are retried per the policy.
    pub async fn infer(&self, prompt: &str) -> Result<String, InferenceError> {
        let call_id = Uuid::new_v4();
        let data = self.params.to_call_data(prompt);

        let span = info_span!("inference", %call_id, api = %self.api_name);
        let result = self
            .policy
            .run(
                |attempt| {
                    debug!("Inference attempt {attempt}");
                    self.transport.predict(&self.api_name, data.clone())
                },
                TransportError::is_transient,
            )
            .instrument(span)
            .await;

        let output = match result {
            Ok(output) => output,
            Err(e) => {
                let e = InferenceError::from(e);
                error!(%call_id, "Inference failed: {e}");
                return Err(e);
            }
        };

        let text = output_text(&output)?;
        debug!(%call_id, chars = text.len(), "Inference succeeded");
        Ok(text.trim().to_string())
    }
}

/// The remote operation yields a list of outputs; the first one is the
/// generated text. A bare string is accepted as well.
fn output_text(output: &Value) -> Result<&str, InferenceError> {
    let first = match output {
        Value::Array(items) => items.first(),
        other => Some(other),
    };
    first.and_then(Value::as_str).ok_or_else(|| {
        InferenceError::Malformed(format!("expected text output, got {output}"))
    })
}
