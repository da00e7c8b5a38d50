//! Manifest Mapping
//!
//! Builds the catalog entity for a repository and normalizes identifiers in
//! existing manifests.

use serde_yaml::Value;
use std::collections::BTreeMap;

use crate::config::{Config, DefaultsConfig};
use crate::constants::manifest::{API_VERSION, KIND};
use crate::types::{CatalogEntity, EntityLink, EntityMetadata, EntitySpec, Repository, Result};

/// Lowercase and replace `_`/`.` with `-`
pub fn sanitize_name(name: &str) -> String {
    name.to_lowercase().replace(['_', '.'], "-")
}

/// Catalog identifier for a repository name (`[a-z0-9_]`-style)
pub fn entity_identifier(name: &str) -> String {
    sanitize_name(name).replace('-', "_")
}

/// Rewrite every `identifier:` line so its value uses `_` instead of `-`.
/// Idempotent.
pub fn sanitize_identifiers(content: &str) -> String {
    content
        .split('\n')
        .map(|line| {
            if !line.trim_start().starts_with("identifier:") {
                return line.to_string();
            }
            match line.split_once(':') {
                Some((field, value)) => format!("{}: {}", field, value.trim().replace('-', "_")),
                None => line.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Entity identifier of a manifest: top-level `identifier`, else `metadata.name`
pub fn extract_identifier(content: &str) -> Result<Option<String>> {
    let doc: Value = serde_yaml::from_str(content)?;
    let non_empty = |v: Option<&Value>| {
        v.and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    Ok(non_empty(doc.get("identifier"))
        .or_else(|| non_empty(doc.get("metadata").and_then(|m| m.get("name")))))
}

fn normalize_annotation_key(key: &str) -> String {
    match key {
        "harness-io-managed" => "harness.io/managed".to_string(),
        other => other.to_string(),
    }
}

/// Maps repositories to catalog entities
#[derive(Debug, Clone)]
pub struct ManifestBuilder {
    defaults: DefaultsConfig,
    org_id: String,
    project_id: String,
}

impl ManifestBuilder {
    pub fn new(
        defaults: DefaultsConfig,
        org_id: impl Into<String>,
        project_id: impl Into<String>,
    ) -> Self {
        Self {
            defaults,
            org_id: org_id.into(),
            project_id: project_id.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.defaults.clone(),
            config.catalog.org_id.clone(),
            config.catalog.project_id.clone(),
        )
    }

    /// First code owner, else the configured default
    pub fn owner(&self, repo: &Repository) -> String {
        repo.code_owners
            .first()
            .cloned()
            .unwrap_or_else(|| self.defaults.owner.clone())
    }

    pub fn build(&self, repo: &Repository) -> CatalogEntity {
        let mut tags: Vec<String> = Vec::new();
        let language = repo.language.as_deref().map(str::to_lowercase);
        for tag in repo
            .topics
            .iter()
            .cloned()
            .chain(language.clone())
            .chain(self.defaults.tags.iter().cloned())
        {
            if !tag.is_empty() && !tags.contains(&tag) {
                tags.push(tag);
            }
        }

        let mut annotations: BTreeMap<String, String> = self
            .defaults
            .annotations
            .iter()
            .map(|(k, v)| (normalize_annotation_key(k), v.clone()))
            .collect();
        annotations.insert("github.com/project-slug".to_string(), repo.full_name.clone());
        if !repo.html_url.is_empty() {
            annotations.insert("harness.io/source-repo".to_string(), repo.html_url.clone());
        }
        if let Some(language) = language {
            annotations.insert("harness.io/language".to_string(), language);
        }

        let links = if repo.html_url.is_empty() {
            Vec::new()
        } else {
            vec![EntityLink {
                title: "Repository".to_string(),
                url: repo.html_url.clone(),
                link_type: "repository".to_string(),
            }]
        };

        CatalogEntity {
            api_version: API_VERSION.to_string(),
            identifier: entity_identifier(&repo.name),
            name: repo.name.clone(),
            kind: KIND.to_string(),
            entity_type: self.defaults.component_type.clone(),
            project_identifier: self.project_id.clone(),
            org_identifier: self.org_id.clone(),
            owner: self.owner(repo),
            metadata: EntityMetadata {
                description: repo.description.clone(),
                annotations,
                tags,
                links,
            },
            spec: EntitySpec {
                lifecycle: self.defaults.lifecycle.clone(),
                system: self.defaults.system.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn builder() -> ManifestBuilder {
        let mut defaults = DefaultsConfig {
            owner: "platform-team".to_string(),
            ..Default::default()
        };
        defaults
            .annotations
            .insert("harness-io-managed".to_string(), "true".to_string());
        ManifestBuilder::new(defaults, "default", "idp")
    }

    fn repo() -> Repository {
        Repository {
            description: "Payments service".to_string(),
            html_url: "https://github.com/acme/Payments_API.v2".to_string(),
            language: Some("Go".to_string()),
            topics: vec!["payments".to_string(), "go".to_string()],
            ..Repository::new("acme/Payments_API.v2")
        }
    }

    #[test]
    fn test_identifier_rules() {
        assert_eq!(sanitize_name("Payments_API.v2"), "payments-api-v2");
        assert_eq!(entity_identifier("Payments_API.v2"), "payments_api_v2");
        assert_eq!(entity_identifier("web-frontend"), "web_frontend");
    }

    #[test]
    fn test_build_maps_repository() {
        let entity = builder().build(&repo());
        assert_eq!(entity.identifier, "payments_api_v2");
        assert_eq!(entity.name, "Payments_API.v2");
        assert_eq!(entity.kind, "Component");
        assert_eq!(entity.entity_type, "service");
        assert_eq!(entity.spec.lifecycle, "production");
        assert_eq!(entity.owner, "platform-team");
        assert_eq!(entity.org_identifier, "default");
        assert_eq!(entity.project_identifier, "idp");
        assert_eq!(entity.metadata.tags, vec!["payments", "go"]);
        assert_eq!(entity.metadata.annotations["harness.io/managed"], "true");
        assert_eq!(
            entity.metadata.annotations["github.com/project-slug"],
            "acme/Payments_API.v2"
        );
        assert_eq!(entity.metadata.annotations["harness.io/language"], "go");
        assert_eq!(entity.metadata.links.len(), 1);
        assert!(entity.validate().is_ok());
    }

    #[test]
    fn test_first_code_owner_wins() {
        let mut r = repo();
        r.code_owners = vec!["acme/payments".to_string(), "alice".to_string()];
        assert_eq!(builder().build(&r).owner, "acme/payments");
    }

    #[test]
    fn test_sanitize_identifier_lines_only() {
        let input = "apiVersion: harness.io/v1\nidentifier: my-service\nname: my-service\n  identifier:  nested-id\n";
        let out = sanitize_identifiers(input);
        assert_eq!(
            out,
            "apiVersion: harness.io/v1\nidentifier: my_service\nname: my-service\n  identifier: nested_id\n"
        );
    }

    #[test]
    fn test_extract_identifier() {
        assert_eq!(
            extract_identifier("identifier: svc_a\nmetadata:\n  name: other\n").unwrap(),
            Some("svc_a".to_string())
        );
        assert_eq!(
            extract_identifier("kind: Component\nmetadata:\n  name: svc-b\n").unwrap(),
            Some("svc-b".to_string())
        );
        assert_eq!(extract_identifier("kind: Component\n").unwrap(), None);
        assert!(extract_identifier("identifier: [unclosed").is_err());
    }

    proptest! {
        #[test]
        fn prop_sanitize_is_idempotent(content in "((identifier|name|  identifier):[ a-z-]{0,12}\n){0,6}") {
            let once = sanitize_identifiers(&content);
            prop_assert_eq!(sanitize_identifiers(&once), once.clone());
        }

        #[test]
        fn prop_identifier_has_no_separators(name in "[A-Za-z0-9_.-]{1,30}") {
            let id = entity_identifier(&name);
            prop_assert!(!id.contains('-') && !id.contains('.'));
            prop_assert_eq!(id.clone(), id.to_lowercase());
        }
    }
}
