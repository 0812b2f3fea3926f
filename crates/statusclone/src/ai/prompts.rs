//! Instructions for each extraction purpose.

pub const JSON_ONLY: &str =
    "You extract structured data from status pages. Respond ONLY with valid JSON, no explanation.";

pub const STATUS_RULES: &str = "Status values: operational, degraded, partial, major, maintenance. \
green/up/operational -> operational; yellow/degraded/slow -> degraded; orange/partial -> partial; \
red/down/major -> major; blue/maintenance/scheduled -> maintenance. When unsure use operational.";

pub const SERVICES: &str = r#"List every service (component) shown on this status page, in the order they appear.
Nested services go in the parent's "children" array; a parent is a category header, not a service.
Return: {"name": "<page name>", "services": [{"name": "...", "status": "...", "children": [{"name": "...", "status": "..."}]}]}"#;

pub const UPTIME: &str = r#"For each listed service, read its uptime bar (a row of day cells, usually SVG rects) oldest to newest, left to right.
Green fill -> true. Red, orange or yellow fill -> false. Gray or no data -> null. Skip transparent cells.
If the page shows the date of the oldest bar, return it as startDate (YYYY-MM-DD).
Return: {"startDate": "YYYY-MM-DD or null", "services": [{"name": "...", "uptimePct": 99.9, "uptimeDays": [true, false, null]}]}
Services:"#;

pub const INCIDENTS: &str = r#"Extract every incident with its full timeline. Updates newest first.
Incident status: investigating, identified, monitoring, maintenance, resolved.
Impact: operational, degraded, partial, major, maintenance.
Timestamps in ISO-8601. When an incident title is a link, include its href as detailUrl.
Return: {"incidents": [{"title": "...", "status": "...", "impact": "...", "createdAt": "...", "detailUrl": "...", "updates": [{"status": "...", "message": "...", "timestamp": "..."}]}]}"#;

pub const INCIDENT_DETAIL: &str = r#"This is a single incident page. Extract its full timeline, newest update first.
Return: {"title": "...", "status": "...", "impact": "...", "createdAt": "...", "updates": [{"status": "...", "message": "...", "timestamp": "..."}]}"#;

pub const INCIDENT_TEXT: &str = r#"Turn this free-text incident description into a status-page incident.
Infer the affected organization if named. Timestamps in ISO-8601; if none are given use the current time.
Return: {"organization": "... or null", "title": "...", "status": "...", "impact": "...", "createdAt": "...", "updates": [{"status": "...", "message": "...", "timestamp": "..."}]}"#;

pub const DIAGRAM: &str = r#"This image is an architecture or status diagram. Identify the organization, every service it shows with its apparent health, the group each belongs to, and summarize the system in one or two sentences.
Return: {"organization": "...", "services": [{"name": "...", "status": "...", "group": "... or null", "description": "... or null"}], "summary": "..."}"#;

/// System prompt with the shared status vocabulary.
pub fn system() -> String {
    format!("{JSON_ONLY}\n{STATUS_RULES}")
}

/// Uptime instructions followed by the service names to look for.
pub fn uptime(service_names: &[String]) -> String {
    let mut prompt = UPTIME.to_string();
    for name in service_names {
        prompt.push_str("\n- ");
        prompt.push_str(name);
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uptime_prompt_lists_services() {
        let prompt = uptime(&["API".to_string(), "Web".to_string()]);
        assert!(prompt.ends_with("- API\n- Web"));
        assert!(system().contains("operational"));
    }
}
