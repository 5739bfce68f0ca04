//! Text-to-speech through the public Google Translate TTS endpoint.
//!
//! The endpoint accepts at most 100 characters per request, so text is cut
//! into chunks and the returned MP3 frames are concatenated in order. Audio
//! never touches disk.

use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

const MAX_CHUNK_CHARS: usize = 100;
const PUNCTUATION: &[char] = &[
    '.', ',', ';', ':', '!', '?', '¡', '¿', '…', '。', '，', '、', '！', '？', '\n',
];

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("nothing to synthesize")]
    EmptyText,

    #[error("speech request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("speech endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("speech endpoint returned no audio")]
    EmptyAudio,
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Returns MP3 audio for `text` spoken in `lang`.
    async fn synthesize(&self, text: &str, lang: &str) -> Result<Bytes, SpeechError>;
}

#[derive(Clone)]
pub struct GoogleTts {
    client: Client,
    endpoint: String,
}

impl GoogleTts {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            endpoint: endpoint.into(),
        })
    }

    async fn fetch_chunk(
        &self,
        chunk: &str,
        lang: &str,
        idx: usize,
        total: usize,
    ) -> Result<Bytes, SpeechError> {
        let idx = idx.to_string();
        let total = total.to_string();
        let textlen = chunk.chars().count().to_string();

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("ie", "UTF-8"),
                ("client", "tw-ob"),
                ("tl", lang),
                ("q", chunk),
                ("idx", idx.as_str()),
                ("total", total.as_str()),
                ("textlen", textlen.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SpeechError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.bytes().await?)
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTts {
    async fn synthesize(&self, text: &str, lang: &str) -> Result<Bytes, SpeechError> {
        let chunks = tokenize(text, MAX_CHUNK_CHARS);
        if chunks.is_empty() {
            return Err(SpeechError::EmptyText);
        }

        let mut audio = BytesMut::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            let frame = self.fetch_chunk(chunk, lang, idx, chunks.len()).await?;
            debug!(idx, total = chunks.len(), bytes = frame.len(), "Fetched speech chunk");
            audio.extend_from_slice(&frame);
        }

        if audio.is_empty() {
            return Err(SpeechError::EmptyAudio);
        }
        Ok(audio.freeze())
    }
}

/// Splits `text` into chunks of at most `max_chars` characters, cutting after
/// punctuation where possible, then at whitespace, then mid-word. Chunks with
/// nothing speakable in them are dropped.
fn tokenize(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut rest = text.trim();

    while !rest.is_empty() {
        let window_end = match rest.char_indices().nth(max_chars) {
            Some((i, _)) => i,
            None => {
                push_speakable(&mut chunks, rest);
                break;
            }
        };
        let window = &rest[..window_end];

        let cut = window
            .rfind(PUNCTUATION)
            .map(|i| i + window[i..].chars().next().map_or(1, char::len_utf8))
            .or_else(|| window.rfind(char::is_whitespace))
            .filter(|&i| i > 0)
            .unwrap_or(window_end);

        let (head, tail) = rest.split_at(cut);
        push_speakable(&mut chunks, head);
        rest = tail.trim_start();
    }

    chunks
}

fn push_speakable(chunks: &mut Vec<String>, chunk: &str) {
    let chunk = chunk.trim();
    if chunk.chars().any(char::is_alphanumeric) {
        chunks.push(chunk.to_string());
    }
}
