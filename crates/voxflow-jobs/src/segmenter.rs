//! Segment builder: token stream to speaker-attributed sentence segments.
//!
//! The provider emits a flat stream of word and punctuation tokens; this
//! module reconstructs readable sentences from it. A sentence accumulates
//! until either sentence-terminating punctuation or a speaker change, and
//! the plain-text transcript is the segment texts joined with single spaces.
//!
//! Segment start times are taken from provider timestamps as-is: if the
//! provider reports non-monotonic times, segments may overlap. That
//! pass-through is deliberate.

use voxflow_asr::wire::{RecognitionResult, TokenKind};
use voxflow_core::defaults::UNKNOWN_SPEAKER;
use voxflow_core::{Segment, TranscriptDocument};

/// Build ordered sentence segments and the joined transcript from a token
/// stream.
pub fn build_segments(results: &[RecognitionResult]) -> TranscriptDocument {
    let mut segments: Vec<Segment> = Vec::new();

    // Accumulator for the sentence under construction.
    let mut text = String::new();
    let mut start: Option<f64> = None;
    let mut end = 0.0_f64;
    let mut speaker = UNKNOWN_SPEAKER.to_string();

    for token in results {
        let Some(content) = token.content() else {
            continue;
        };
        let token_speaker = token.speaker().unwrap_or(UNKNOWN_SPEAKER);

        // A speaker change closes the current sentence mid-stream. Only word
        // tokens carry speakers; punctuation always attaches to the sentence
        // in progress.
        if token.kind == TokenKind::Word && token_speaker != speaker && !text.is_empty() {
            segments.push(Segment {
                start: start.unwrap_or(0.0),
                end,
                text: std::mem::take(&mut text),
                speaker: speaker.clone(),
            });
            start = None;
        }

        if text.is_empty() {
            start = Some(token.start_time);
            speaker = token_speaker.to_string();
            text.push_str(content);
        } else if token.attaches_to_previous() {
            text.push_str(content);
        } else {
            text.push(' ');
            text.push_str(content);
        }

        end = token.end_time;

        if token.is_end_of_sentence() && !text.is_empty() {
            segments.push(Segment {
                start: start.unwrap_or(0.0),
                end,
                text: std::mem::take(&mut text),
                speaker: speaker.clone(),
            });
            start = None;
        }
    }

    // Flush whatever the stream left unterminated.
    if !text.is_empty() {
        segments.push(Segment {
            start: start.unwrap_or(0.0),
            end,
            text,
            speaker,
        });
    }

    let transcript = segments
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    TranscriptDocument {
        transcript,
        segments,
    }
}
