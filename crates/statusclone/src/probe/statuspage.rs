//! Wire records for the hosted status-page JSON API.
//!
//! Every field is optional or defaulted: providers drift, and a missing field
//! must never turn a usable response into a parse failure.

use serde::{Deserialize, Deserializer};

pub const SUMMARY_PATH: &str = "/api/v2/summary.json";
pub const COMPONENTS_PATH: &str = "/api/v2/components.json";
pub const INCIDENTS_PATH: &str = "/api/v2/incidents.json";
pub const UNRESOLVED_INCIDENTS_PATH: &str = "/api/v2/incidents/unresolved.json";

/// Explicit `null` decodes like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SummaryRecord {
    #[serde(default)]
    pub page: Option<PageRecord>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub components: Vec<ComponentRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComponentsRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub components: Vec<ComponentRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComponentRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// `operational`, `degraded_performance`, `partial_outage`, `major_outage`,
    /// `under_maintenance`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(default)]
    pub position: Option<i64>,
    #[serde(default)]
    pub group_id: Option<String>,
    /// True for group headers.
    #[serde(default, deserialize_with = "null_as_default")]
    pub group: bool,
    /// Child ids, present on group headers.
    #[serde(default)]
    pub components: Option<Vec<String>>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IncidentsRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub incidents: Vec<IncidentRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IncidentRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub impact: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub shortlink: Option<String>,
    /// Newest first, as served.
    #[serde(default, deserialize_with = "null_as_default")]
    pub incident_updates: Vec<IncidentUpdateRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IncidentUpdateRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub display_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl IncidentUpdateRecord {
    pub fn timestamp(&self) -> Option<&str> {
        self.display_at.as_deref().or(self.created_at.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_component_decodes() {
        let json = r#"{"components":[{"id":"a","name":"API"},{"name":"Web","group":true,"components":["a"]}]}"#;
        let rec: ComponentsRecord = serde_json::from_str(json).unwrap();
        assert_eq!(rec.components.len(), 2);
        assert!(rec.components[0].group_id.is_none());
        assert!(rec.components[1].group);
        assert_eq!(rec.components[1].components.as_deref(), Some(&["a".to_string()][..]));
    }

    #[test]
    fn test_null_fields_decode_as_missing() {
        let rec: SummaryRecord =
            serde_json::from_str(r#"{"components":[{"id":"a","name":"API","status":null}]}"#)
                .unwrap();
        assert_eq!(rec.components[0].name, "API");
        assert_eq!(rec.components[0].status, "");

        let json = r#"{"page":null,"components":[{"id":null,"name":"Web","group":null,"components":null}]}"#;
        let rec: SummaryRecord = serde_json::from_str(json).unwrap();
        assert!(rec.page.is_none());
        assert_eq!(rec.components[0].id, "");
        assert!(!rec.components[0].group);

        let json = r#"{"incidents":[{"id":"i1","name":"Outage","impact":null,"incident_updates":null},{"name":"Later","incident_updates":[{"status":null,"body":"ok"}]}]}"#;
        let rec: IncidentsRecord = serde_json::from_str(json).unwrap();
        assert_eq!(rec.incidents[0].impact, "");
        assert!(rec.incidents[0].incident_updates.is_empty());
        assert_eq!(rec.incidents[1].incident_updates[0].status, "");

        let rec: ComponentsRecord = serde_json::from_str(r#"{"components":null}"#).unwrap();
        assert!(rec.components.is_empty());
    }

    #[test]
    fn test_update_timestamp_prefers_display_at() {
        let rec = IncidentUpdateRecord {
            display_at: Some("2024-01-02T00:00:00Z".into()),
            created_at: Some("2024-01-01T00:00:00Z".into()),
            ..Default::default()
        };
        assert_eq!(rec.timestamp(), Some("2024-01-02T00:00:00Z"));
    }
}
