//! Stage 3: transcribe a reference sentence.

use chrono::{DateTime, Utc};

use super::evidence::{EvidenceBundle, TypingMetrics};

/// Per-character mismatches between `a` and `b`, ignoring case, up to the
/// longer of the two; characters past the shorter string all count.
pub fn typo_count(a: &str, b: &str) -> usize {
    let mut left = a.chars();
    let mut right = b.chars();
    let mut count = 0;
    loop {
        match (left.next(), right.next()) {
            (None, None) => return count,
            (Some(x), Some(y)) if x.to_lowercase().eq(y.to_lowercase()) => {}
            _ => count += 1,
        }
    }
}

/// Words per minute with the usual five-characters-per-word convention.
/// Zero or negative elapsed time gives 0.
pub fn speed_wpm(chars_entered: usize, elapsed_ms: i64) -> f64 {
    if elapsed_ms <= 0 {
        return 0.0;
    }
    let minutes = elapsed_ms as f64 / 60_000.0;
    let wpm = (chars_entered as f64 / 5.0) / minutes;
    if wpm.is_finite() {
        wpm
    } else {
        0.0
    }
}

#[derive(Debug)]
pub struct TypingStage {
    pub(crate) bundle: EvidenceBundle,
    reference: String,
    entered: String,
    started_at: DateTime<Utc>,
}

impl TypingStage {
    pub(crate) fn new(bundle: EvidenceBundle, reference: String, started_at: DateTime<Utc>) -> Self {
        Self {
            bundle,
            reference,
            entered: String::new(),
            started_at,
        }
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn entered(&self) -> &str {
        &self.entered
    }

    pub(crate) fn set_entered(&mut self, text: &str) {
        self.entered.clear();
        self.entered.push_str(text);
    }

    pub fn required_chars(&self) -> usize {
        self.reference.chars().count()
    }

    pub fn entered_chars(&self) -> usize {
        self.entered.chars().count()
    }

    pub fn can_submit(&self) -> bool {
        self.entered_chars() >= self.required_chars()
    }

    /// Live typo count for display while typing.
    pub fn typo_count(&self) -> usize {
        typo_count(&self.reference, &self.entered)
    }

    pub fn metrics(&self, now: DateTime<Utc>) -> TypingMetrics {
        let elapsed_ms = (now - self.started_at).num_milliseconds();
        TypingMetrics {
            typo_count: self.typo_count(),
            speed_wpm: speed_wpm(self.entered_chars(), elapsed_ms),
            text_entered: self.entered.clone(),
        }
    }

    pub(crate) fn into_bundle(self, now: DateTime<Utc>) -> EvidenceBundle {
        let metrics = self.metrics(now);
        let mut bundle = self.bundle;
        bundle.set_typing(metrics);
        bundle
    }
}
