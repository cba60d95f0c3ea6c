use crate::session::{AnalyticsSession, JsonObject, ToolContent};
use pulseboard_core::{AnalyticsSnapshot, Category, MetricType, PulseboardError, Result};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

pub const TOOL_GET_HTML: &str = "get_html";
pub const TOOL_GET_WEBSITES: &str = "get_websites";
pub const TOOL_GET_WEBSITE_STATS: &str = "get_website_stats";
pub const TOOL_GET_PAGEVIEW_SERIES: &str = "get_pageview_series";
pub const TOOL_GET_WEBSITE_METRICS: &str = "get_website_metrics";
pub const TOOL_GET_ACTIVE_VISITORS: &str = "get_active_visitors";

/// Date window and target site for one collection pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionRequest {
    pub website_domain: String,
    pub start_date: String,
    pub end_date: String,
    pub timezone: String,
}

/// Gather everything the analytics server will give us for one site.
///
/// Never fails: individual tool failures become `<category>_error` entries,
/// and anything that escapes them is recorded as `general_error`.
pub async fn collect<S>(session: &S, request: &CollectionRequest) -> AnalyticsSnapshot
where
    S: AnalyticsSession + ?Sized,
{
    let mut snapshot = AnalyticsSnapshot::new(
        request.website_domain.clone(),
        &request.start_date,
        &request.end_date,
        request.timezone.clone(),
    );

    if let Err(e) = collect_into(session, request, &mut snapshot).await {
        warn!("Error getting real data: {}", e);
        snapshot.record_error(Category::General, e.to_string());
    }

    snapshot
}

async fn collect_into<S>(
    session: &S,
    request: &CollectionRequest,
    snapshot: &mut AnalyticsSnapshot,
) -> Result<()>
where
    S: AnalyticsSession + ?Sized,
{
    let tools = session.list_tools().await?;
    info!("Available MCP tools: {:?}", tools);
    snapshot.set_available_tools(tools);

    if snapshot.has_tool(TOOL_GET_HTML) {
        match session.call_tool(TOOL_GET_HTML, JsonObject::new()).await {
            Ok(content) => snapshot.record_success(Category::Html, content.to_value()),
            Err(e) => {
                warn!("Error getting html: {}", e);
                snapshot.record_error(Category::Html, e.to_string());
                return Ok(());
            }
        }
    }

    if snapshot.has_tool(TOOL_GET_WEBSITES) {
        let content = match session.call_tool(TOOL_GET_WEBSITES, JsonObject::new()).await {
            Ok(content) => content,
            Err(e) => {
                warn!("Error getting websites: {}", e);
                snapshot.record_error(Category::Websites, e.to_string());
                return Ok(());
            }
        };
        snapshot.record_success(Category::Websites, content.to_value());
        info!("Available websites: {} found", content.len());

        match resolve_website_id(&content, &request.website_domain) {
            Ok(Some(id)) => {
                info!("Found website ID for {}: {}", request.website_domain, id);
                snapshot.set_website_id(id);
            }
            Ok(None) => {
                warn!(
                    "Could not find website ID for domain: {}",
                    request.website_domain
                );
                return Ok(());
            }
            Err(e) => {
                warn!("Error parsing websites data: {}", e);
                return Ok(());
            }
        }
    }

    let website_id = match snapshot.website_id() {
        Some(id) => id.to_string(),
        None => {
            info!("No website ID available, skipping other API calls");
            return Ok(());
        }
    };

    if snapshot.has_tool(TOOL_GET_WEBSITE_STATS) {
        let args = arguments(json!({
            "website_id": website_id,
            "start_at": request.start_date,
            "end_at": request.end_date,
        }));
        match session.call_tool(TOOL_GET_WEBSITE_STATS, args).await {
            Ok(content) => {
                snapshot.record_success(Category::WebsiteStats, content.to_value());
                info!("Successfully retrieved website stats");
            }
            Err(e) => {
                warn!("Error getting website stats: {}", e);
                snapshot.record_error(Category::WebsiteStats, e.to_string());
            }
        }
    }

    if snapshot.has_tool(TOOL_GET_PAGEVIEW_SERIES) {
        let args = arguments(json!({
            "website_id": website_id,
            "start_at": request.start_date,
            "end_at": request.end_date,
            "unit": "day",
            "timezone": request.timezone,
        }));
        match session.call_tool(TOOL_GET_PAGEVIEW_SERIES, args).await {
            Ok(content) => {
                snapshot.record_success(Category::PageviewSeries, content.to_value());
                info!("Successfully retrieved pageview series");
            }
            Err(e) => {
                warn!("Error getting pageview series: {}", e);
                snapshot.record_error(Category::PageviewSeries, e.to_string());
            }
        }
    }

    if snapshot.has_tool(TOOL_GET_WEBSITE_METRICS) {
        collect_first_metric(session, request, &website_id, snapshot).await;
    }

    if snapshot.has_tool(TOOL_GET_ACTIVE_VISITORS) {
        let args = arguments(json!({ "website_id": website_id }));
        match session.call_tool(TOOL_GET_ACTIVE_VISITORS, args).await {
            Ok(content) => {
                snapshot.record_success(Category::ActiveVisitors, content.to_value());
                info!("Successfully retrieved active visitors");
            }
            Err(e) => {
                // Many Umami deployments do not expose the realtime endpoint.
                info!("Error getting active visitors (expected): {}", e);
                snapshot.record_error(Category::ActiveVisitors, e.to_string());
            }
        }
    }

    Ok(())
}

/// Try each metric type in priority order and keep the first that succeeds.
async fn collect_first_metric<S>(
    session: &S,
    request: &CollectionRequest,
    website_id: &str,
    snapshot: &mut AnalyticsSnapshot,
) where
    S: AnalyticsSession + ?Sized,
{
    let mut last_error: Option<PulseboardError> = None;

    for metric_type in MetricType::PRIORITY {
        let args = arguments(json!({
            "website_id": website_id,
            "start_at": request.start_date,
            "end_at": request.end_date,
            "type": metric_type.as_str(),
        }));
        match session.call_tool(TOOL_GET_WEBSITE_METRICS, args).await {
            Ok(content) => {
                snapshot.record_metrics(metric_type, content.to_value());
                info!("Successfully retrieved {} metrics", metric_type);
                return;
            }
            Err(e) => {
                debug!("{} metrics unavailable: {}", metric_type, e);
                last_error = Some(e);
            }
        }
    }

    if let Some(e) = last_error {
        warn!("Error getting website metrics: {}", e);
        snapshot.record_error(Category::Metrics, e.to_string());
    }
}

/// Find the id of the site whose `domain` matches exactly.
///
/// The first content block must hold JSON shaped like
/// `{"data": [{"domain": "...", "id": ...}]}`. Numeric ids are rendered
/// as strings; an empty id counts as no match.
pub fn resolve_website_id(content: &ToolContent, domain: &str) -> Result<Option<String>> {
    let text = match content.first_text() {
        Some(text) => text,
        None => return Ok(None),
    };

    let parsed: Value = serde_json::from_str(text)
        .map_err(|e| PulseboardError::Resolution(format!("websites payload is not JSON: {}", e)))?;

    Ok(find_website_id(&parsed, domain))
}

fn find_website_id(websites: &Value, domain: &str) -> Option<String> {
    websites
        .get("data")?
        .as_array()?
        .iter()
        .find(|site| site.get("domain").and_then(Value::as_str) == Some(domain))
        .and_then(|site| match site.get("id")? {
            Value::String(id) => Some(id.clone()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        })
        .filter(|id| !id.is_empty())
}

fn arguments(value: Value) -> JsonObject {
    match value {
        Value::Object(map) => map,
        _ => JsonObject::new(),
    }
}
