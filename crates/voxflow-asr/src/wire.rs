//! Wire types for the provider's `json-v2` transcript format.
//!
//! The token stream is a flat list of results, each either a word (content,
//! timings, speaker) or a punctuation mark (content, attachment and
//! end-of-sentence flags). Unknown fields are ignored so provider-side
//! additions do not break deserialization.

use serde::{Deserialize, Serialize};

/// Token kind discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Word,
    Punctuation,
    /// Anything this version does not recognize; carried but not rendered.
    #[serde(other)]
    Other,
}

/// One recognition alternative for a token. The first alternative is the
/// provider's best guess and the only one voxflow reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionAlternative {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
}

/// One token of the provider's output stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionResult {
    #[serde(rename = "type")]
    pub kind: TokenKind,
    pub start_time: f64,
    pub end_time: f64,
    /// `"previous"` on punctuation that concatenates without a leading space.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attaches_to: Option<String>,
    /// Set on sentence-terminating punctuation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_eos: Option<bool>,
    #[serde(default)]
    pub alternatives: Vec<RecognitionAlternative>,
}

impl RecognitionResult {
    /// Best-guess content, if the provider supplied any alternative.
    pub fn content(&self) -> Option<&str> {
        self.alternatives.first().map(|a| a.content.as_str())
    }

    /// Best-guess speaker label, when present.
    pub fn speaker(&self) -> Option<&str> {
        self.alternatives.first().and_then(|a| a.speaker.as_deref())
    }

    pub fn attaches_to_previous(&self) -> bool {
        self.attaches_to.as_deref() == Some("previous")
    }

    pub fn is_end_of_sentence(&self) -> bool {
        self.is_eos.unwrap_or(false)
    }

    /// Convenience constructor for a word token.
    pub fn word(content: &str, start: f64, end: f64, speaker: Option<&str>) -> Self {
        Self {
            kind: TokenKind::Word,
            start_time: start,
            end_time: end,
            attaches_to: None,
            is_eos: None,
            alternatives: vec![RecognitionAlternative {
                content: content.to_string(),
                confidence: None,
                speaker: speaker.map(String::from),
            }],
        }
    }

    /// Convenience constructor for a punctuation token.
    pub fn punctuation(content: &str, at: f64, attaches_to_previous: bool, is_eos: bool) -> Self {
        Self {
            kind: TokenKind::Punctuation,
            start_time: at,
            end_time: at,
            attaches_to: attaches_to_previous.then(|| "previous".to_string()),
            is_eos: Some(is_eos),
            alternatives: vec![RecognitionAlternative {
                content: content.to_string(),
                confidence: None,
                speaker: None,
            }],
        }
    }
}

/// Transcript response body in `json-v2` format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptBody {
    #[serde(default)]
    pub results: Vec<RecognitionResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_word_token() {
        let json = r#"{
            "type": "word",
            "start_time": 0.2,
            "end_time": 0.61,
            "alternatives": [{"content": "hello", "confidence": 0.98, "speaker": "S1"}]
        }"#;
        let token: RecognitionResult = serde_json::from_str(json).unwrap();
        assert_eq!(token.kind, TokenKind::Word);
        assert_eq!(token.content(), Some("hello"));
        assert_eq!(token.speaker(), Some("S1"));
        assert!(!token.attaches_to_previous());
        assert!(!token.is_end_of_sentence());
    }

    #[test]
    fn test_deserialize_punctuation_token() {
        let json = r#"{
            "type": "punctuation",
            "start_time": 0.61,
            "end_time": 0.61,
            "attaches_to": "previous",
            "is_eos": true,
            "alternatives": [{"content": "."}]
        }"#;
        let token: RecognitionResult = serde_json::from_str(json).unwrap();
        assert_eq!(token.kind, TokenKind::Punctuation);
        assert_eq!(token.content(), Some("."));
        assert_eq!(token.speaker(), None);
        assert!(token.attaches_to_previous());
        assert!(token.is_end_of_sentence());
    }

    #[test]
    fn test_deserialize_unknown_kind_tolerated() {
        let json = r#"{
            "type": "entity",
            "start_time": 1.0,
            "end_time": 2.0,
            "alternatives": []
        }"#;
        let token: RecognitionResult = serde_json::from_str(json).unwrap();
        assert_eq!(token.kind, TokenKind::Other);
        assert_eq!(token.content(), None);
    }

    #[test]
    fn test_deserialize_body_with_extra_fields() {
        let json = r#"{
            "format": "2.9",
            "metadata": {"created_at": "2026-01-01T00:00:00Z"},
            "results": [
                {"type": "word", "start_time": 0.0, "end_time": 0.4,
                 "alternatives": [{"content": "ok"}]}
            ]
        }"#;
        let body: TranscriptBody = serde_json::from_str(json).unwrap();
        assert_eq!(body.results.len(), 1);
        assert_eq!(body.results[0].content(), Some("ok"));
    }

    #[test]
    fn test_empty_body() {
        let body: TranscriptBody = serde_json::from_str("{}").unwrap();
        assert!(body.results.is_empty());
    }
}
