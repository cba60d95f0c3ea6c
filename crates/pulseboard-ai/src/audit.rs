use serde::Serialize;
use std::fmt;

/// Phrases that suggest generated text was not grounded in retrieved data.
pub const HALLUCINATION_INDICATORS: &[&str] = &[
    // Suspiciously round or stock numbers
    "1,234,567",
    "45,678",
    "12,345",
    "100,000",
    "50,000",
    // Metrics quoted without data behind them
    "Total pageviews: 1",
    "Unique visitors: 1",
    // Placeholder vocabulary
    "fictional",
    "example data",
    "placeholder",
    "sample data",
    "dummy data",
    "test data",
    "mock data",
    // Vague time references
    "peak hours",
    "busy periods",
    "high traffic times",
    // Stock percentages
    "45% increase",
    "30% bounce rate",
    "25% growth",
];

/// Case-insensitive scan of `text`; one entry per matched phrase, in list order.
pub fn audit(text: &str) -> Vec<String> {
    let haystack = text.to_lowercase();
    let mut found: Vec<String> = Vec::new();
    for indicator in HALLUCINATION_INDICATORS {
        if haystack.contains(&indicator.to_lowercase()) && !found.iter().any(|f| f == indicator) {
            found.push(indicator.to_string());
        }
    }
    found
}

/// Indicator phrases found in one generated response.
///
/// A clean report is a lint result, not evidence that the text is accurate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HallucinationReport {
    indicators: Vec<String>,
}

impl HallucinationReport {
    pub fn from_text(text: &str) -> Self {
        Self {
            indicators: audit(text),
        }
    }

    pub fn indicators(&self) -> &[String] {
        &self.indicators
    }

    pub fn is_clean(&self) -> bool {
        self.indicators.is_empty()
    }
}

impl fmt::Display for HallucinationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let quoted: Vec<String> = self
            .indicators
            .iter()
            .map(|i| format!("'{}'", i))
            .collect();
        write!(f, "[{}]", quoted.join(", "))
    }
}
