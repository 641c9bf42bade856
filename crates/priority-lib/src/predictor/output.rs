//! Prediction output formatting
//!
//! Maps raw class values to the priority labels shown to users and
//! derives the confidence scalar from class probabilities.

use super::ClassValue;
use std::collections::BTreeMap;

/// Display labels for the integer priority classes
pub const PRIORITY_LABELS: &[(i64, &str)] = &[
    (1, "1-High"),
    (2, "2-High"),
    (3, "3-Medium"),
    (4, "4-Low"),
    (5, "5-Low"),
];

/// Formats raw model outputs for display
#[derive(Debug, Clone)]
pub struct LabelFormatter {
    labels: BTreeMap<i64, String>,
}

impl LabelFormatter {
    pub fn new() -> Self {
        Self::with_labels(PRIORITY_LABELS.iter().map(|(k, v)| (*k, v.to_string())))
    }

    pub fn with_labels(labels: impl IntoIterator<Item = (i64, String)>) -> Self {
        Self {
            labels: labels.into_iter().collect(),
        }
    }

    /// Label for a class value; unmapped values are shown as-is
    pub fn display_label(&self, value: &ClassValue) -> String {
        value
            .as_int()
            .and_then(|v| self.labels.get(&v))
            .cloned()
            .unwrap_or_else(|| value.to_string())
    }

    /// Largest probability across all rows, ignoring NaN
    pub fn confidence(probabilities: &[Vec<f32>]) -> Option<f32> {
        probabilities
            .iter()
            .flatten()
            .copied()
            .filter(|p| !p.is_nan())
            .fold(None, |acc: Option<f32>, p| Some(acc.map_or(p, |a| a.max(p))))
    }

    /// One-line summary such as `Predicted Priority: 3-Medium • Confidence: 0.82`
    pub fn summary(label: &str, confidence: Option<f32>) -> String {
        match confidence {
            Some(c) => format!("Predicted Priority: {} • Confidence: {:.2}", label, c),
            None => format!("Predicted Priority: {}", label),
        }
    }
}

impl Default for LabelFormatter {
    fn default() -> Self {
        Self::new()
    }
}
