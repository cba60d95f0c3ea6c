// ABOUTME: Typed store for one best-effort analytics collection pass.
// ABOUTME: Success values and per-category errors are kept mutually exclusive.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

/// Retrieval categories filled in by the collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Html,
    Websites,
    WebsiteStats,
    PageviewSeries,
    Metrics,
    ActiveVisitors,
    /// Failures that escaped every per-call guard
    General,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Html,
        Category::Websites,
        Category::WebsiteStats,
        Category::PageviewSeries,
        Category::Metrics,
        Category::ActiveVisitors,
        Category::General,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Category::Html => "html",
            Category::Websites => "websites",
            Category::WebsiteStats => "website_stats",
            Category::PageviewSeries => "pageview_series",
            Category::Metrics => "metrics",
            Category::ActiveVisitors => "active_visitors",
            Category::General => "general",
        }
    }

    pub fn error_key(&self) -> String {
        format!("{}_error", self.key())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Breakdown dimensions for `get_website_metrics`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetricType {
    Url,
    Referrer,
    Browser,
    Os,
    Country,
}

impl MetricType {
    /// Order in which breakdowns are attempted; the first success is kept.
    pub const PRIORITY: [MetricType; 5] = [
        MetricType::Url,
        MetricType::Referrer,
        MetricType::Browser,
        MetricType::Os,
        MetricType::Country,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Url => "url",
            MetricType::Referrer => "referrer",
            MetricType::Browser => "browser",
            MetricType::Os => "os",
            MetricType::Country => "country",
        }
    }

    pub fn snapshot_key(&self) -> String {
        format!("metrics_{}", self.as_str())
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single metric breakdown kept by a collection pass.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricBreakdown {
    pub metric_type: MetricType,
    pub data: Value,
}

/// Accumulated result of one data-collection pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalyticsSnapshot {
    website_domain: String,
    date_range: String,
    timezone: String,
    available_tools: Vec<String>,
    html: Option<Value>,
    websites: Option<Value>,
    website_id: Option<String>,
    website_stats: Option<Value>,
    pageview_series: Option<Value>,
    metrics: Option<MetricBreakdown>,
    active_visitors: Option<Value>,
    errors: BTreeMap<Category, String>,
}

impl AnalyticsSnapshot {
    pub fn new(
        website_domain: impl Into<String>,
        start_date: &str,
        end_date: &str,
        timezone: impl Into<String>,
    ) -> Self {
        Self {
            website_domain: website_domain.into(),
            date_range: format!("{} to {}", start_date, end_date),
            timezone: timezone.into(),
            ..Default::default()
        }
    }

    pub fn website_domain(&self) -> &str {
        &self.website_domain
    }

    pub fn date_range(&self) -> &str {
        &self.date_range
    }

    pub fn timezone(&self) -> &str {
        &self.timezone
    }

    pub fn available_tools(&self) -> &[String] {
        &self.available_tools
    }

    pub fn set_available_tools(&mut self, tools: Vec<String>) {
        self.available_tools = tools;
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.available_tools.iter().any(|t| t == name)
    }

    pub fn website_id(&self) -> Option<&str> {
        self.website_id.as_deref()
    }

    pub fn set_website_id(&mut self, id: impl Into<String>) {
        self.website_id = Some(id.into());
    }

    pub fn metrics(&self) -> Option<&MetricBreakdown> {
        self.metrics.as_ref()
    }

    /// Success value recorded for `category`, if any.
    pub fn value(&self, category: Category) -> Option<&Value> {
        match category {
            Category::Html => self.html.as_ref(),
            Category::Websites => self.websites.as_ref(),
            Category::WebsiteStats => self.website_stats.as_ref(),
            Category::PageviewSeries => self.pageview_series.as_ref(),
            Category::Metrics => self.metrics.as_ref().map(|m| &m.data),
            Category::ActiveVisitors => self.active_visitors.as_ref(),
            Category::General => None,
        }
    }

    pub fn has_success(&self, category: Category) -> bool {
        self.value(category).is_some()
    }

    pub fn error(&self, category: Category) -> Option<&str> {
        self.errors.get(&category).map(String::as_str)
    }

    pub fn errors(&self) -> impl Iterator<Item = (Category, &str)> {
        self.errors.iter().map(|(c, e)| (*c, e.as_str()))
    }

    /// Store a retrieved value. Metric breakdowns go through
    /// [`AnalyticsSnapshot::record_metrics`]; `General` carries no value.
    pub fn record_success(&mut self, category: Category, value: Value) {
        let slot = match category {
            Category::Html => &mut self.html,
            Category::Websites => &mut self.websites,
            Category::WebsiteStats => &mut self.website_stats,
            Category::PageviewSeries => &mut self.pageview_series,
            Category::ActiveVisitors => &mut self.active_visitors,
            Category::Metrics | Category::General => {
                warn!("Ignoring untyped success value for category '{}'", category);
                return;
            }
        };
        *slot = Some(value);
        self.errors.remove(&category);
    }

    pub fn record_metrics(&mut self, metric_type: MetricType, data: Value) {
        self.metrics = Some(MetricBreakdown { metric_type, data });
        self.errors.remove(&Category::Metrics);
    }

    pub fn record_error(&mut self, category: Category, message: impl Into<String>) {
        match category {
            Category::Html => self.html = None,
            Category::Websites => {
                self.websites = None;
                self.website_id = None;
            }
            Category::WebsiteStats => self.website_stats = None,
            Category::PageviewSeries => self.pageview_series = None,
            Category::Metrics => self.metrics = None,
            Category::ActiveVisitors => self.active_visitors = None,
            Category::General => {}
        }
        self.errors.insert(category, message.into());
    }

    /// Indented JSON rendering embedded verbatim into prompts.
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| {
            warn!("Failed to serialize analytics snapshot: {}", e);
            format!("{:#?}", self)
        })
    }
}

impl Serialize for AnalyticsSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("website_domain", &self.website_domain)?;
        map.serialize_entry("date_range", &self.date_range)?;
        map.serialize_entry("timezone", &self.timezone)?;
        map.serialize_entry("available_tools", &self.available_tools)?;

        if let Some(html) = &self.html {
            map.serialize_entry("html", html)?;
        }
        if let Some(websites) = &self.websites {
            map.serialize_entry("websites", websites)?;
        }
        if let Some(id) = &self.website_id {
            map.serialize_entry("website_id", id)?;
        }
        if let Some(stats) = &self.website_stats {
            map.serialize_entry("website_stats", stats)?;
        }
        if let Some(series) = &self.pageview_series {
            map.serialize_entry("pageview_series", series)?;
        }
        if let Some(metrics) = &self.metrics {
            map.serialize_entry(&metrics.metric_type.snapshot_key(), &metrics.data)?;
        }
        if let Some(active) = &self.active_visitors {
            map.serialize_entry("active_visitors", active)?;
        }

        for (category, message) in &self.errors {
            map.serialize_entry(&category.error_key(), message)?;
        }
        map.end()
    }
}
