//! In-memory source host and catalog used by tests.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use super::{CatalogApi, ManifestRemote, RepositoryDirectory};
use crate::types::{
    CatalogEntity, OnboardError, ProcessingError, PullRequestRef, Repository, Result, WriteOutcome,
};

#[derive(Default)]
pub struct FakeSource {
    pub repos: Vec<Repository>,
    /// (repo, path) -> content
    pub files: Mutex<HashMap<(String, String), String>>,
    pub open_prs: HashMap<String, PullRequestRef>,
    /// Repositories whose file reads fail with this status
    pub read_failures: HashMap<String, u16>,
    /// (repo, path, content) per write
    pub written: Mutex<Vec<(String, String, String)>>,
}

impl FakeSource {
    pub fn with_file(self, repo: &str, path: &str, content: &str) -> Self {
        self.files
            .lock()
            .unwrap()
            .insert((repo.to_string(), path.to_string()), content.to_string());
        self
    }
}

#[async_trait]
impl RepositoryDirectory for FakeSource {
    async fn discover(&self, _organization: &str, include: &[String]) -> Result<Vec<Repository>> {
        Ok(self
            .repos
            .iter()
            .filter(|r| include.is_empty() || include.contains(&r.name))
            .cloned()
            .collect())
    }

    async fn enrich(&self, mut repo: Repository) -> Result<Repository> {
        if repo.code_owners.is_empty() {
            repo.code_owners.push("platform-team".to_string());
        }
        Ok(repo)
    }
}

#[async_trait]
impl ManifestRemote for FakeSource {
    async fn read_file(&self, repo: &Repository, path: &str) -> Result<Option<String>> {
        if let Some(status) = self.read_failures.get(&repo.full_name) {
            return Err(OnboardError::remote("github", *status, "simulated failure"));
        }
        Ok(self
            .files
            .lock()
            .unwrap()
            .get(&(repo.full_name.clone(), path.to_string()))
            .cloned())
    }

    async fn write_manifest(
        &self,
        repo: &Repository,
        path: &str,
        content: &str,
    ) -> Result<WriteOutcome> {
        let key = (repo.full_name.clone(), path.to_string());
        let mut files = self.files.lock().unwrap();
        let pr = PullRequestRef {
            number: 1,
            title: "Add catalog-info.yaml".to_string(),
            url: format!("https://example.test/{}/pull/1", repo.full_name),
        };
        let outcome = match files.get(&key) {
            Some(existing) if existing.trim() == content.trim() => WriteOutcome::Unchanged,
            Some(_) => WriteOutcome::Updated(pr),
            None => WriteOutcome::Created(pr),
        };
        files.insert(key, content.to_string());
        self.written
            .lock()
            .unwrap()
            .push((repo.full_name.clone(), path.to_string(), content.to_string()));
        Ok(outcome)
    }

    async fn find_open_onboarding_pr(&self, repo: &Repository) -> Result<Option<PullRequestRef>> {
        Ok(self.open_prs.get(&repo.full_name).cloned())
    }
}

#[derive(Default)]
pub struct FakeCatalog {
    pub entities: Mutex<HashSet<String>>,
    /// Identifiers whose creation fails with a plain remote conflict
    pub conflicts: HashSet<String>,
    pub registered: Mutex<HashSet<String>>,
}

#[async_trait]
impl CatalogApi for FakeCatalog {
    async fn create_entity(&self, entity: &CatalogEntity) -> Result<()> {
        if self.conflicts.contains(&entity.identifier) {
            return Err(OnboardError::remote(
                "catalog",
                409,
                format!("entity {} already exists", entity.identifier),
            ));
        }
        self.entities
            .lock()
            .unwrap()
            .insert(entity.identifier.clone());
        Ok(())
    }

    async fn entity_exists(&self, identifier: &str) -> Result<bool> {
        Ok(self.entities.lock().unwrap().contains(identifier))
    }

    async fn register_manifest_location(
        &self,
        repo: &Repository,
        _branch: &str,
        path: &str,
        _content: &str,
    ) -> Result<()> {
        let key = format!("{}:{}", repo.full_name, path);
        if !self.registered.lock().unwrap().insert(key) {
            return Err(ProcessingError::already_registered("").into());
        }
        Ok(())
    }
}
