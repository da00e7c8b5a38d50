//! Catalog Entity Descriptor
//!
//! The component descriptor written as `catalog-info.yaml` and submitted to
//! the catalog entity API.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntity {
    pub api_version: String,
    pub identifier: String,
    pub name: String,
    pub kind: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub project_identifier: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub org_identifier: String,
    pub owner: String,
    pub metadata: EntityMetadata,
    pub spec: EntitySpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityMetadata {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub links: Vec<EntityLink>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityLink {
    pub title: String,
    pub url: String,
    #[serde(rename = "type")]
    pub link_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntitySpec {
    pub lifecycle: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
}

impl CatalogEntity {
    /// Names of required fields that are empty
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let required = [
            ("identifier", &self.identifier),
            ("name", &self.name),
            ("type", &self.entity_type),
            ("lifecycle", &self.spec.lifecycle),
            ("owner", &self.owner),
        ];
        required
            .into_iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(field, _)| field)
            .collect()
    }

    /// Check required fields, describing every missing one
    pub fn validate(&self) -> std::result::Result<(), String> {
        let missing = self.missing_fields();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(format!("missing required fields: {}", missing.join(", ")))
        }
    }

    /// Render as a `catalog-info.yaml` document
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity() -> CatalogEntity {
        CatalogEntity {
            api_version: "harness.io/v1".to_string(),
            identifier: "payments_api".to_string(),
            name: "payments-api".to_string(),
            kind: "Component".to_string(),
            entity_type: "service".to_string(),
            project_identifier: String::new(),
            org_identifier: "default".to_string(),
            owner: "team-payments".to_string(),
            metadata: EntityMetadata::default(),
            spec: EntitySpec {
                lifecycle: "production".to_string(),
                system: None,
            },
        }
    }

    #[test]
    fn test_validate_lists_all_missing_fields() {
        let mut e = entity();
        assert!(e.validate().is_ok());

        e.owner = String::new();
        e.spec.lifecycle = "  ".to_string();
        let err = e.validate().unwrap_err();
        assert_eq!(err, "missing required fields: lifecycle, owner");
    }

    #[test]
    fn test_yaml_uses_descriptor_field_names() {
        let yaml = entity().to_yaml().unwrap();
        assert!(yaml.contains("apiVersion: harness.io/v1"));
        assert!(yaml.contains("type: service"));
        assert!(yaml.contains("orgIdentifier: default"));
        assert!(!yaml.contains("projectIdentifier"));
        assert!(!yaml.contains("system"));
    }
}
