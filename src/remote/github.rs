//! GitHub REST Adapter
//!
//! Implements [`RepositoryDirectory`] and [`ManifestRemote`] over the GitHub
//! v3 REST API. Non-success responses become [`OnboardError::Remote`] with the
//! status and response body, so the classifier can route them.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use reqwest::{Method, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::filter::all_literal;
use super::{ManifestRemote, RepositoryDirectory};
use crate::config::SourceConfig;
use crate::constants::manifest::{BRANCH_PREFIX, CODEOWNERS_PATHS, ONBOARDING_PR_KEYWORDS};
use crate::constants::network::{PAGE_SIZE, REQUEST_TIMEOUT_SECS, USER_AGENT};
use crate::types::{
    OnboardError, ProcessingError, PullRequestRef, Repository, RepositorySignals, Result,
    WriteOutcome,
};

const SERVICE: &str = "github";
const API_VERSION: &str = "2022-11-28";

/// Paths whose presence sets a repository signal
const DOCKER_PATHS: &[&str] = &["Dockerfile", "docker-compose.yml", "docker-compose.yaml"];
const KUBERNETES_PATHS: &[&str] = &["k8s", "kubernetes", "deploy", "deployment"];
const CI_PATHS: &[&str] = &[".github/workflows", ".gitlab-ci.yml", ".circleci"];

const ADD_PR_TITLE: &str = "Add Harness IDP Integration";
const UPDATE_PR_TITLE: &str = "Update Harness IDP Integration";

const ADD_PR_BODY: &str = "This PR adds a catalog-info.yaml file to register this repository in the Harness IDP catalog.

The file contains:
- Component metadata
- Owner information
- Lifecycle and type configuration
- Repository annotations

Generated by catalog-onboarder.";

const UPDATE_PR_BODY: &str = "This PR updates the catalog-info.yaml file so the Harness IDP catalog matches this repository.

The updated file contains:
- Component metadata
- Owner information
- Lifecycle and type configuration
- Repository annotations

Generated by catalog-onboarder.";

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct GhAccount {
    #[serde(rename = "type", default)]
    account_type: String,
}

#[derive(Debug, Deserialize)]
struct GhLicense {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GhRepo {
    id: u64,
    name: String,
    full_name: String,
    description: Option<String>,
    #[serde(default)]
    html_url: String,
    language: Option<String>,
    #[serde(default)]
    topics: Vec<String>,
    #[serde(default)]
    private: bool,
    #[serde(default)]
    archived: bool,
    default_branch: Option<String>,
    #[serde(default)]
    stargazers_count: u64,
    #[serde(default)]
    forks_count: u64,
    #[serde(default)]
    open_issues_count: u64,
    license: Option<GhLicense>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    pushed_at: Option<DateTime<Utc>>,
}

impl From<GhRepo> for Repository {
    fn from(gh: GhRepo) -> Self {
        Repository {
            id: gh.id,
            name: gh.name,
            full_name: gh.full_name,
            description: gh.description.unwrap_or_default(),
            html_url: gh.html_url,
            language: gh.language.filter(|l| !l.is_empty()),
            topics: gh.topics,
            default_branch: gh.default_branch.unwrap_or_else(|| "main".to_string()),
            code_owners: Vec::new(),
            archived: gh.archived,
            private: gh.private,
            stars: gh.stargazers_count,
            forks: gh.forks_count,
            open_issues: gh.open_issues_count,
            license: gh.license.and_then(|l| l.name),
            created_at: gh.created_at,
            updated_at: gh.updated_at,
            pushed_at: gh.pushed_at,
            signals: RepositorySignals::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GhContent {
    sha: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct GhObject {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct GhRef {
    object: GhObject,
}

#[derive(Debug, Deserialize)]
struct GhPull {
    number: u64,
    #[serde(default)]
    title: String,
    body: Option<String>,
    #[serde(default)]
    html_url: String,
}

impl From<GhPull> for PullRequestRef {
    fn from(pr: GhPull) -> Self {
        PullRequestRef {
            number: pr.number,
            title: pr.title,
            url: pr.html_url,
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Owners listed in a CODEOWNERS file, `@` stripped, first occurrence kept
pub fn parse_codeowners(content: &str) -> Vec<String> {
    let mut owners: Vec<String> = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 2 {
            continue;
        }
        for field in &fields[1..] {
            let owner = field.trim_start_matches('@');
            if !owner.is_empty() && !owners.iter().any(|o| o == owner) {
                owners.push(owner.to_string());
            }
        }
    }
    owners
}

/// Keyword match over a pull request's title and body
pub fn is_onboarding_pr(title: &str, body: &str) -> bool {
    let text = format!("{} {}", title, body).to_lowercase();
    ONBOARDING_PR_KEYWORDS.iter().any(|k| text.contains(k))
}

/// Decode a contents-API payload (base64 wrapped at 60 columns)
fn decode_content(encoded: &str) -> Result<String> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD.decode(compact).map_err(|e| {
        OnboardError::remote(SERVICE, 200, format!("invalid base64 file content: {}", e))
    })?;
    String::from_utf8(bytes).map_err(|e| {
        OnboardError::remote(SERVICE, 200, format!("file content is not UTF-8: {}", e))
    })
}

fn onboarding_branch() -> String {
    format!("{}-{}", BRANCH_PREFIX, Utc::now().timestamp())
}

// =============================================================================
// Client
// =============================================================================

pub struct GitHubClient {
    api_base: String,
    token: Option<SecretString>,
    client: reqwest::Client,
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("api_base", &self.api_base)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl GitHubClient {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| OnboardError::Config(format!("Failed to create HTTP client: {}", e)))?;

        if config.token.is_none() {
            warn!("No GitHub token configured; requests are unauthenticated and heavily rate limited");
        }

        Ok(Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: config.token.clone().map(SecretString::from),
            client,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut request = self
            .client
            .request(method, format!("{}{}", self.api_base, path))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token.expose_secret());
        }
        request
    }

    async fn send(request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(OnboardError::remote(SERVICE, status.as_u16(), body))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = Self::send(self.request(Method::GET, path)).await?;
        Ok(response.json().await?)
    }

    async fn list_repositories(&self, path: &str) -> Result<Vec<Repository>> {
        let mut repos = Vec::new();
        let mut page = 1;
        loop {
            let batch: Vec<GhRepo> = self
                .get_json(&format!("{}&per_page={}&page={}", path, PAGE_SIZE, page))
                .await?;
            let count = batch.len();
            debug!("Retrieved {} repositories (page {})", count, page);
            repos.extend(batch.into_iter().map(Repository::from));
            if count < PAGE_SIZE {
                break;
            }
            page += 1;
        }
        Ok(repos)
    }

    async fn fetch_named(&self, organization: &str, names: &[String]) -> Vec<Repository> {
        let mut repos = Vec::with_capacity(names.len());
        for name in names {
            match self
                .get_json::<GhRepo>(&format!("/repos/{}/{}", organization, name))
                .await
            {
                Ok(repo) => repos.push(repo.into()),
                Err(e) => warn!("Failed to fetch repository {}/{}: {}", organization, name, e),
            }
        }
        repos
    }

    fn contents_path(owner: &str, name: &str, path: &str) -> String {
        format!("/repos/{}/{}/contents/{}", owner, name, path)
    }

    async fn get_content(&self, repo: &Repository, path: &str) -> Result<Option<GhContent>> {
        let (owner, name) = repo.owner_and_name()?;
        let request = self
            .request(Method::GET, &Self::contents_path(owner, name, path))
            .query(&[("ref", repo.branch())]);
        match Self::send(request).await {
            Ok(response) => Ok(Some(response.json().await?)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Existence check that works for files and directories alike
    async fn path_exists(&self, repo: &Repository, path: &str) -> Result<bool> {
        let (owner, name) = repo.owner_and_name()?;
        let request = self
            .request(Method::GET, &Self::contents_path(owner, name, path))
            .query(&[("ref", repo.branch())]);
        match Self::send(request).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn any_exists(&self, repo: &Repository, paths: &[&str]) -> bool {
        for path in paths {
            match self.path_exists(repo, path).await {
                Ok(true) => return true,
                Ok(false) => {}
                Err(e) => warn!("Error checking {} in {}: {}", path, repo.full_name, e),
            }
        }
        false
    }

    async fn code_owners(&self, repo: &Repository) -> Vec<String> {
        for path in CODEOWNERS_PATHS {
            match self.read_file(repo, path).await {
                Ok(Some(content)) => return parse_codeowners(&content),
                Ok(None) => {}
                Err(e) => {
                    warn!("Failed to read {} in {}: {}", path, repo.full_name, e);
                    return Vec::new();
                }
            }
        }
        Vec::new()
    }

    async fn create_branch(&self, repo: &Repository, branch: &str) -> Result<()> {
        let (owner, name) = repo.owner_and_name()?;
        let base: GhRef = self
            .get_json(&format!(
                "/repos/{}/{}/git/ref/heads/{}",
                owner,
                name,
                repo.branch()
            ))
            .await?;

        let request = self
            .request(Method::POST, &format!("/repos/{}/{}/git/refs", owner, name))
            .json(&json!({
                "ref": format!("refs/heads/{}", branch),
                "sha": base.object.sha,
            }));
        match Self::send(request).await {
            Ok(_) => Ok(()),
            Err(OnboardError::Remote { message, .. })
                if message.to_lowercase().contains("reference already exists") =>
            {
                Err(ProcessingError::pr_exists(&repo.full_name, None, None).into())
            }
            Err(e) => Err(e),
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

#[async_trait]
impl RepositoryDirectory for GitHubClient {
    async fn discover(&self, organization: &str, include: &[String]) -> Result<Vec<Repository>> {
        if !include.is_empty() && all_literal(include) {
            info!(
                "Fetching {} named repositories from {}",
                include.len(),
                organization
            );
            return Ok(self.fetch_named(organization, include).await);
        }

        let account: GhAccount = self.get_json(&format!("/users/{}", organization)).await?;
        let path = if account.account_type == "Organization" {
            format!("/orgs/{}/repos?type=all", organization)
        } else {
            format!("/users/{}/repos?type=owner", organization)
        };

        let repos = self.list_repositories(&path).await?;
        info!("Discovered {} repositories in {}", repos.len(), organization);
        Ok(repos)
    }

    async fn enrich(&self, mut repo: Repository) -> Result<Repository> {
        repo.owner_and_name()?;
        repo.code_owners = self.code_owners(&repo).await;
        repo.signals = RepositorySignals {
            has_dockerfile: self.any_exists(&repo, DOCKER_PATHS).await,
            has_kubernetes: self.any_exists(&repo, KUBERNETES_PATHS).await,
            has_ci: self.any_exists(&repo, CI_PATHS).await,
        };
        debug!(
            "Enriched {} (owners: {}, signals: {:?})",
            repo.full_name,
            repo.code_owners.len(),
            repo.signals
        );
        Ok(repo)
    }
}

#[async_trait]
impl ManifestRemote for GitHubClient {
    async fn read_file(&self, repo: &Repository, path: &str) -> Result<Option<String>> {
        match self.get_content(repo, path).await? {
            Some(file) => Ok(Some(decode_content(&file.content)?)),
            None => Ok(None),
        }
    }

    async fn write_manifest(
        &self,
        repo: &Repository,
        path: &str,
        content: &str,
    ) -> Result<WriteOutcome> {
        let (owner, name) = repo.owner_and_name()?;

        let existing = self.get_content(repo, path).await?;
        if let Some(file) = &existing {
            if decode_content(&file.content)?.trim() == content.trim() {
                debug!("{} in {} is already up to date", path, repo.full_name);
                return Ok(WriteOutcome::Unchanged);
            }
        }
        let is_update = existing.is_some();

        let branch = onboarding_branch();
        self.create_branch(repo, &branch).await?;

        let mut body = json!({
            "message": if is_update {
                format!("Update Harness IDP {}", path)
            } else {
                format!("Add Harness IDP {}", path)
            },
            "content": STANDARD.encode(content),
            "branch": branch,
        });
        if let Some(file) = &existing {
            body["sha"] = json!(file.sha);
        }
        Self::send(
            self.request(Method::PUT, &Self::contents_path(owner, name, path))
                .json(&body),
        )
        .await?;

        let (title, pr_body) = if is_update {
            (UPDATE_PR_TITLE, UPDATE_PR_BODY)
        } else {
            (ADD_PR_TITLE, ADD_PR_BODY)
        };
        let response = Self::send(
            self.request(Method::POST, &format!("/repos/{}/{}/pulls", owner, name))
                .json(&json!({
                    "title": title,
                    "head": branch,
                    "base": repo.branch(),
                    "body": pr_body,
                })),
        )
        .await?;
        let pr: PullRequestRef = response.json::<GhPull>().await?.into();
        info!("Created PR #{} for {}: {}", pr.number, repo.full_name, pr.url);

        Ok(if is_update {
            WriteOutcome::Updated(pr)
        } else {
            WriteOutcome::Created(pr)
        })
    }

    async fn find_open_onboarding_pr(&self, repo: &Repository) -> Result<Option<PullRequestRef>> {
        let (owner, name) = repo.owner_and_name()?;
        let pulls: Vec<GhPull> = self
            .get_json(&format!(
                "/repos/{}/{}/pulls?state=open&per_page={}",
                owner, name, PAGE_SIZE
            ))
            .await?;

        Ok(pulls
            .into_iter()
            .find(|pr| is_onboarding_pr(&pr.title, pr.body.as_deref().unwrap_or_default()))
            .map(PullRequestRef::from))
    }
}
