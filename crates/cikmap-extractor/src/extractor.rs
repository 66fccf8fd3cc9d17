//! Core Extractor implementation

use crate::config::ExtractorConfig;
use crate::error::ExtractorError;
use crate::normalize::{normalize, skip_header};
use crate::validate::{check_digit_status, is_denied_by_context, is_valid, CheckDigitStatus};
use cikmap_domain::{Extraction, ExtractionMethod};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

static MARKER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bCUSIP\b").unwrap());

static SHAPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Za-z0-9]{8,9}\b").unwrap());

const WINDOW_CONFIDENCE: f32 = 0.9;
const FALLBACK_CONFIDENCE: f32 = 0.6;

/// An identifier-shaped token and where it sits in the normalized text
#[derive(Debug, Clone)]
struct Token {
    start: usize,
    end: usize,
    text: String,
}

#[derive(Debug, Clone)]
struct Scored<'a> {
    token: &'a Token,
    score: f32,
    check: CheckDigitStatus,
}

impl Scored<'_> {
    /// Higher score wins; ties go to the earlier token
    fn beats(&self, other: &Scored<'_>) -> bool {
        self.score > other.score
            || (self.score == other.score && self.token.start < other.token.start)
    }
}

fn pick_best<'a>(candidates: impl IntoIterator<Item = Scored<'a>>) -> Option<Scored<'a>> {
    candidates.into_iter().fold(None, |best, next| match best {
        Some(current) if !next.beats(&current) => Some(current),
        _ => Some(next),
    })
}

fn tokenize(text: &str) -> Vec<Token> {
    SHAPE_RE
        .find_iter(text)
        .filter(|m| m.as_str().bytes().any(|b| b.is_ascii_digit()))
        .map(|m| Token {
            start: m.start(),
            end: m.end(),
            text: m.as_str().to_ascii_uppercase(),
        })
        .collect()
}

/// Byte offset `chars` characters before `pos`, clamped to the start
fn back_by_chars(text: &str, pos: usize, chars: usize) -> usize {
    if chars == 0 {
        return pos;
    }
    text[..pos]
        .char_indices()
        .rev()
        .nth(chars - 1)
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Byte offset `chars` characters after `pos`, clamped to the end
fn forward_by_chars(text: &str, pos: usize, chars: usize) -> usize {
    text[pos..]
        .char_indices()
        .nth(chars)
        .map(|(i, _)| pos + i)
        .unwrap_or(text.len())
}

/// Length and letter heuristics shared by both phases
fn base_score(candidate: &str, check: CheckDigitStatus, check_bonus: bool) -> f32 {
    let mut score = 0.0;
    if candidate.len() == 9 {
        score += 4.0;
    }
    if candidate.bytes().any(|b| b.is_ascii_uppercase()) {
        score += 2.0;
    }
    if check_bonus && check == CheckDigitStatus::Valid {
        score += 1.0;
    }
    score
}

fn accept(text: &str, token: &Token, strict: bool) -> bool {
    is_valid(&token.text, strict) && !is_denied_by_context(text, token.start, &token.text)
}

fn best_in_window<'a>(
    text: &str,
    tokens: &'a [Token],
    marker: (usize, usize),
    config: &ExtractorConfig,
) -> Option<Scored<'a>> {
    let radius = config.window_radius;
    let (marker_start, marker_end) = marker;
    let window_start = back_by_chars(text, marker_start, radius);
    let window_end = forward_by_chars(text, marker_end, radius);

    let scored = tokens
        .iter()
        .filter(|t| t.start >= window_start && t.end <= window_end)
        .filter(|t| accept(text, t, config.strict_validation))
        .map(|token| {
            let distance = if token.start >= marker_end {
                text[marker_end..token.start].chars().count()
            } else {
                text[token.end..marker_start].chars().count()
            };
            let proximity = 1.0 - distance as f32 / (radius as f32 + 1.0);
            let check = check_digit_status(&token.text);
            Scored {
                token,
                score: base_score(&token.text, check, config.strict_validation) + proximity,
                check,
            }
        });

    pick_best(scored)
}

fn window_phase<'a>(
    text: &str,
    tokens: &'a [Token],
    config: &ExtractorConfig,
) -> Option<Scored<'a>> {
    let per_window = MARKER_RE
        .find_iter(text)
        .filter_map(|m| best_in_window(text, tokens, (m.start(), m.end()), config));
    pick_best(per_window)
}

fn fallback_phase<'a>(text: &str, tokens: &'a [Token]) -> Option<Scored<'a>> {
    let scored = tokens
        .iter()
        .filter(|t| accept(text, t, true))
        .map(|token| {
            let check = check_digit_status(&token.text);
            Scored {
                token,
                score: base_score(&token.text, check, true),
                check,
            }
        });
    pick_best(scored)
}

/// Find the best identifier in a filing
///
/// Searches windows around every `CUSIP` marker first, then the whole
/// document. A check-digit mismatch lowers confidence but never rejects a
/// candidate on its own.
///
/// # Examples
///
/// ```
/// use cikmap_domain::ExtractionMethod;
/// use cikmap_extractor::{extract_candidate, ExtractorConfig};
///
/// let extraction = extract_candidate(
///     "Common Stock (Title of Class) CUSIP No. 68389X105",
///     &ExtractorConfig::default(),
/// );
/// assert_eq!(extraction.candidate.as_deref(), Some("68389X105"));
/// assert_eq!(extraction.method, ExtractionMethod::Window);
/// ```
pub fn extract_candidate(text: &str, config: &ExtractorConfig) -> Extraction {
    let body = normalize(skip_header(text));
    let tokens = tokenize(&body);

    if let Some(best) = window_phase(&body, &tokens, config) {
        return Extraction::found(
            best.token.text.clone(),
            ExtractionMethod::Window,
            WINDOW_CONFIDENCE * best.check.confidence_factor(),
        );
    }

    if let Some(best) = fallback_phase(&body, &tokens) {
        return Extraction::found(
            best.token.text.clone(),
            ExtractionMethod::Fallback,
            FALLBACK_CONFIDENCE * best.check.confidence_factor(),
        );
    }

    Extraction::no_match()
}

/// Configured extractor used by the pipeline's parse workers
#[derive(Debug, Clone, Default)]
pub struct CandidateExtractor {
    config: ExtractorConfig,
}

impl CandidateExtractor {
    /// Create a new extractor, validating the configuration
    pub fn new(config: ExtractorConfig) -> Result<Self, ExtractorError> {
        config.validate().map_err(ExtractorError::Config)?;
        Ok(Self { config })
    }

    /// The active configuration
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extract the identifier from one document
    ///
    /// Only oversized input is an error; an empty result is
    /// `ExtractionMethod::NoMatch`.
    pub fn extract(&self, text: &str) -> Result<Extraction, ExtractorError> {
        if text.len() > self.config.max_document_bytes {
            return Err(ExtractorError::TextTooLong(
                text.len(),
                self.config.max_document_bytes,
            ));
        }

        let extraction = extract_candidate(text, &self.config);
        debug!(
            "Extracted {:?} via {} (confidence {:.2}) from {} bytes",
            extraction.candidate,
            extraction.method,
            extraction.confidence,
            text.len()
        );
        Ok(extraction)
    }
}
