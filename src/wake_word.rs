//! Wake phrase detection over transcripts
//!
//! Fuzzy matching so that transcription noise ("hi mitchi", "halo michi!")
//! still activates the robot. Scores are on a 0-100 scale; the best partial
//! match across all configured phrases must reach the threshold.

use crate::config::WakeConfig;

/// Detects configured wake phrases in a transcript
#[derive(Debug, Clone)]
pub struct WakeWordDetector {
    phrases: Vec<String>,
    threshold: u8,
}

impl WakeWordDetector {
    /// Create a detector from wake configuration
    #[must_use]
    pub fn new(config: &WakeConfig) -> Self {
        let phrases: Vec<String> = config
            .phrases
            .iter()
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();

        tracing::debug!(phrases = ?phrases, threshold = config.threshold, "wake detector initialized");

        Self {
            phrases,
            threshold: config.threshold,
        }
    }

    /// Check whether the transcript contains a wake phrase
    #[must_use]
    pub fn detect(&self, transcript: &str) -> bool {
        let normalized = normalize(transcript);
        if normalized.is_empty() {
            return false;
        }

        for phrase in &self.phrases {
            let score = partial_ratio(phrase, &normalized);
            if score >= f64::from(self.threshold) {
                tracing::info!(phrase = %phrase, score, "wake phrase detected");
                return true;
            }
            tracing::trace!(phrase = %phrase, score, "wake phrase below threshold");
        }

        false
    }

    /// Configured wake phrases
    #[must_use]
    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }
}

/// Lowercase and strip punctuation, collapsing whitespace
fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Best similarity (0-100) of `needle` against any same-length window of
/// `haystack`. Equivalent in spirit to rapidfuzz's `partial_ratio`: a short
/// phrase embedded in a longer transcript scores as if compared alone.
fn partial_ratio(needle: &str, haystack: &str) -> f64 {
    if needle.is_empty() || haystack.is_empty() {
        return 0.0;
    }

    if haystack.contains(needle) {
        return 100.0;
    }

    let needle_chars: Vec<char> = needle.chars().collect();
    let hay_chars: Vec<char> = haystack.chars().collect();

    if hay_chars.len() <= needle_chars.len() {
        return strsim::normalized_levenshtein(needle, haystack) * 100.0;
    }

    let window = needle_chars.len();
    let mut best = 0.0_f64;
    for start in 0..=(hay_chars.len() - window) {
        let slice: String = hay_chars[start..start + window].iter().collect();
        let score = strsim::normalized_levenshtein(needle, &slice) * 100.0;
        if score > best {
            best = score;
        }
    }

    best
}
