// ABOUTME: Prompt templates that embed the collected analytics snapshot.
// ABOUTME: Both templates forbid the model from inventing numbers absent from the data.

use crate::collector::CollectionRequest;
use crate::session::JsonObject;
use pulseboard_core::AnalyticsSnapshot;
use serde_json::Value;

fn or_unknown(value: &str) -> &str {
    if value.is_empty() {
        "Unknown"
    } else {
        value
    }
}

/// Dashboard prompt: the server-provided guide plus the real data.
pub fn render_dashboard_prompt(guide: &str, snapshot: &AnalyticsSnapshot) -> String {
    format!(
        r#"You are an expert analytics consultant creating a dashboard based on REAL data from an analytics system.

DASHBOARD CREATION GUIDE:
{guide}

ACTUAL DATA FROM ANALYTICS SYSTEM:
{data}

CRITICAL REQUIREMENTS:
1. ONLY use the real data provided above - NEVER fabricate numbers
2. If data is missing/unavailable, clearly state this and explain why
3. Provide actionable insights based on available data
4. Suggest specific next steps for missing data
5. Create visualizations only for data that actually exists
6. Be transparent about data limitations

ANALYSIS TARGET:
- Website: {website}
- Period: {period}
- Timezone: {timezone}

Create a comprehensive dashboard analysis using ONLY the real data provided."#,
        guide = guide,
        data = snapshot.to_pretty_json(),
        website = or_unknown(snapshot.website_domain()),
        period = or_unknown(snapshot.date_range()),
        timezone = or_unknown(snapshot.timezone()),
    )
}

/// Follow-up prompt for one chat question about the same snapshot.
pub fn render_chat_prompt(question: &str, snapshot: &AnalyticsSnapshot) -> String {
    format!(
        r#"You are an expert analytics consultant answering questions about website analytics data.

CONTEXT - AVAILABLE DATA:
{data}

USER QUESTION: {question}

GUIDELINES:
1. Answer based ONLY on the real data provided above
2. If the data doesn't contain information to answer the question, say so clearly
3. Provide specific insights and recommendations when possible
4. Suggest what additional data might be needed if the question can't be fully answered
5. Be conversational but professional
6. Refer to specific metrics and time periods from the data when relevant

Answer the user's question about the website analytics:"#,
        data = snapshot.to_pretty_json(),
        question = question,
    )
}

/// Arguments for the server's "Create Dashboard" prompt.
pub fn dashboard_prompt_arguments(request: &CollectionRequest) -> JsonObject {
    let mut args = JsonObject::new();
    args.insert(
        "Website Name".to_string(),
        Value::String(request.website_domain.clone()),
    );
    args.insert(
        "Start Date (YYYY-MM-DD)".to_string(),
        Value::String(request.start_date.clone()),
    );
    args.insert(
        "End Date (YYYY-MM-DD)".to_string(),
        Value::String(request.end_date.clone()),
    );
    args.insert(
        "Timezone".to_string(),
        Value::String(request.timezone.clone()),
    );
    args
}
