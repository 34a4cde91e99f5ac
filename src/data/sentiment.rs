//! Headline sentiment: per-text compound scores bucketed into labels and averaged

use serde::{Deserialize, Serialize};
use std::fmt;
use vader_sentiment::SentimentIntensityAnalyzer;

use super::validation::validate_sentiment_score;

/// Scores strictly above this are positive
pub const POSITIVE_THRESHOLD: f64 = 0.05;
/// Scores strictly below this are negative
pub const NEGATIVE_THRESHOLD: f64 = -0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    /// Bucket a compound score. Both thresholds are exclusive, so 0.05 and -0.05 are neutral.
    pub fn from_score(score: f64) -> Self {
        if score > POSITIVE_THRESHOLD {
            SentimentLabel::Positive
        } else if score < NEGATIVE_THRESHOLD {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SentimentLabel::Positive => write!(f, "Positive"),
            SentimentLabel::Negative => write!(f, "Negative"),
            SentimentLabel::Neutral => write!(f, "Neutral"),
        }
    }
}

/// Anything that maps a text to a compound polarity in [-1.0, 1.0]
pub trait SentimentScorer: Send + Sync {
    fn compound(&self, text: &str) -> f64;
}

impl<F> SentimentScorer for F
where
    F: Fn(&str) -> f64 + Send + Sync,
{
    fn compound(&self, text: &str) -> f64 {
        self(text)
    }
}

/// VADER lexicon scorer
pub struct VaderScorer {
    analyzer: SentimentIntensityAnalyzer<'static>,
}

impl VaderScorer {
    pub fn new() -> Self {
        Self {
            analyzer: SentimentIntensityAnalyzer::new(),
        }
    }
}

impl Default for VaderScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl SentimentScorer for VaderScorer {
    fn compound(&self, text: &str) -> f64 {
        if text.trim().is_empty() {
            return 0.0;
        }
        let compound = self
            .analyzer
            .polarity_scores(text)
            .get("compound")
            .copied()
            .unwrap_or(0.0);

        if let Err(e) = validate_sentiment_score(compound) {
            tracing::warn!("VADER returned {} for {:?}: {}", compound, text, e);
            return compound.clamp(-1.0, 1.0);
        }
        compound
    }
}

/// Average score plus one label per input text, in input order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentReport {
    pub average: f64,
    pub labels: Vec<SentimentLabel>,
}

/// Label counts, the distribution shown next to the average
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentBreakdown {
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
}

impl SentimentBreakdown {
    pub fn total(&self) -> usize {
        self.positive + self.negative + self.neutral
    }

    pub fn count(&self, label: SentimentLabel) -> usize {
        match label {
            SentimentLabel::Positive => self.positive,
            SentimentLabel::Negative => self.negative,
            SentimentLabel::Neutral => self.neutral,
        }
    }

    /// Fraction of texts carrying `label`, 0.0 when there are none
    pub fn share(&self, label: SentimentLabel) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.count(label) as f64 / total as f64,
        }
    }
}

impl SentimentReport {
    pub fn empty() -> Self {
        Self {
            average: 0.0,
            labels: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// The average bucketed with the same thresholds as individual texts
    pub fn overall(&self) -> SentimentLabel {
        SentimentLabel::from_score(self.average)
    }

    pub fn breakdown(&self) -> SentimentBreakdown {
        self.labels
            .iter()
            .fold(SentimentBreakdown::default(), |mut acc, label| {
                match label {
                    SentimentLabel::Positive => acc.positive += 1,
                    SentimentLabel::Negative => acc.negative += 1,
                    SentimentLabel::Neutral => acc.neutral += 1,
                }
                acc
            })
    }
}

/// Score every text, label each score and average them.
///
/// Empty input yields an average of 0.0 and no labels.
pub fn aggregate<S, T>(scorer: &S, texts: &[T]) -> SentimentReport
where
    S: SentimentScorer + ?Sized,
    T: AsRef<str>,
{
    if texts.is_empty() {
        return SentimentReport::empty();
    }

    let scores: Vec<f64> = texts.iter().map(|t| scorer.compound(t.as_ref())).collect();
    let labels = scores.iter().map(|s| SentimentLabel::from_score(*s)).collect();
    let average = scores.iter().sum::<f64>() / scores.len() as f64;

    tracing::debug!("Scored {} texts, average compound {:.4}", scores.len(), average);

    SentimentReport { average, labels }
}
