//! Trust the platform API's explicit group identifiers.

use super::{Structure, StructureInput, StructureStrategy};
use crate::types::CloneResult;
use async_trait::async_trait;

pub struct PlatformStrategy;

#[async_trait]
impl StructureStrategy for PlatformStrategy {
    fn name(&self) -> &'static str {
        "platform"
    }

    async fn attempt(&self, input: &StructureInput<'_>) -> CloneResult<Option<Structure>> {
        let Some(platform) = input.platform.filter(|p| p.has_hierarchy()) else {
            return Ok(None);
        };
        let services = platform.services();
        if services.is_empty() {
            return Ok(None);
        }
        Ok(Some(
            Structure::from_services(services, self.name()).with_page_name(platform.name.clone()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::statuspage::ComponentRecord;
    use crate::probe::PlatformPage;

    fn record(id: &str, name: &str, group_id: Option<&str>, group: bool) -> ComponentRecord {
        ComponentRecord {
            id: id.into(),
            name: name.into(),
            status: "operational".into(),
            position: Some(1),
            group_id: group_id.map(str::to_string),
            group,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_uses_platform_groups() {
        let page = PlatformPage {
            name: Some("Acme".into()),
            components: vec![record("g", "Core", None, true), record("a", "API", Some("g"), false)],
            ..Default::default()
        };
        let input = StructureInput {
            raw_html: "",
            reduced_html: "",
            platform: Some(&page),
            known_services: &[],
        };
        let s = PlatformStrategy.attempt(&input).await.unwrap().unwrap();
        assert_eq!(s.order, vec!["API"]);
        assert_eq!(s.groups["API"], "Core");
        assert_eq!(s.page_name.as_deref(), Some("Acme"));
    }

    #[tokio::test]
    async fn test_flat_platform_not_applicable() {
        let page = PlatformPage {
            components: vec![record("a", "API", None, false)],
            ..Default::default()
        };
        let input = StructureInput {
            raw_html: "",
            reduced_html: "",
            platform: Some(&page),
            known_services: &[],
        };
        assert!(PlatformStrategy.attempt(&input).await.unwrap().is_none());
    }
}
