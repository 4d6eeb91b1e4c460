// Catalog operations: the verbs behind each subcommand. Every operation
// that addresses an analytic or artifact by name resolves it against a
// fresh listing first.

use reqwest::blocking::multipart;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use tracing::debug;

use crate::api::{null_as_default, ApiClient, ApiResponse};
use crate::error::{CatalogError, Result};
use crate::poller::{OperationResult, PollPolicy, Poller};
use crate::resolver::{resolve_id, Named};
use crate::taxonomy::Taxonomy;

const ANALYTICS_PATH: &str = "/api/v1/catalog/analytics";
const ARTIFACTS_PATH: &str = "/api/v1/catalog/artifacts";
const TAXONOMY_PATH: &str = "/api/v1/catalog/taxonomy";

/// Artifact type given to the executable uploaded on create.
pub const EXECUTABLE_ARTIFACT: &str = "Executable";

/// An analytic as listed by, and submitted to, the catalog. Empty fields
/// are left out of submitted JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CatalogEntry {
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_as_default")]
    pub author: String,
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_as_default")]
    pub version: String,
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_as_default")]
    pub supported_language: String,
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_as_default")]
    pub custom_metadata: String,
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_as_default")]
    pub taxonomy_location: String,
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_as_default")]
    pub state: String,
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_as_default")]
    pub created_timestamp: String,
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_as_default")]
    pub updated_timestamp: String,
}

impl Named for CatalogEntry {
    const KIND: &'static str = "Analytic";

    fn name(&self) -> &str {
        &self.name
    }

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CatalogEntryPage {
    #[serde(deserialize_with = "null_as_default")]
    pub current_page_size: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub maximum_page_size: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub current_page_number: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub total_elements: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub total_pages: u32,
    #[serde(rename = "analyticCatalogEntries", deserialize_with = "null_as_default")]
    pub entries: Vec<CatalogEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Artifact {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub filename: String,
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub kind: String,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(deserialize_with = "null_as_default")]
    pub created_timestamp: String,
    #[serde(deserialize_with = "null_as_default")]
    pub updated_timestamp: String,
}

impl Named for Artifact {
    const KIND: &'static str = "Artifact";

    fn name(&self) -> &str {
        &self.filename
    }

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ArtifactList {
    #[serde(deserialize_with = "null_as_default")]
    artifacts: Vec<Artifact>,
}

/// Resources requested for a deployment, in MB and instance count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentConfig {
    pub memory: u32,
    pub disk_quota: u32,
    pub instances: u32,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        DeploymentConfig {
            memory: 512,
            disk_quota: 1024,
            instances: 1,
        }
    }
}

/// Outcome of deleting an artifact; anything but 204 is reported, not
/// raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactDeletion {
    Removed,
    Refused(StatusCode),
}

pub struct Catalog<'a> {
    api: &'a ApiClient,
    poll: PollPolicy,
}

impl<'a> Catalog<'a> {
    pub fn new(api: &'a ApiClient, poll: PollPolicy) -> Self {
        Catalog { api, poll }
    }

    pub fn analytics(&self) -> Result<Vec<CatalogEntry>> {
        let page: CatalogEntryPage = self.api.get(ANALYTICS_PATH).send()?.success()?.json()?;
        Ok(page.entries)
    }

    pub fn analytic_id(&self, name: &str) -> Result<String> {
        resolve_id(|| self.analytics(), name)
    }

    /// Register `entry`, then upload `executable` as its executable
    /// artifact.
    pub fn create_analytic(&self, entry: &CatalogEntry, executable: &Path) -> Result<()> {
        self.api.post(ANALYTICS_PATH).json(entry).send()?.success()?;
        debug!(name = %entry.name, "analytic registered");
        self.add_artifact(&entry.name, executable, EXECUTABLE_ARTIFACT, "")
    }

    pub fn delete_analytic(&self, name: &str) -> Result<()> {
        let id = self.analytic_id(name)?;
        self.api
            .delete(&format!("{}/{}", ANALYTICS_PATH, id))
            .send()?
            .success()?;
        Ok(())
    }

    /// Execute the analytic on the contents of `input`; returns the raw
    /// response body.
    pub fn run_analytic(&self, name: &str, input: &Path) -> Result<String> {
        let file = open_input(input)?;
        let id = self.analytic_id(name)?;
        let res = self
            .api
            .post(&format!("{}/{}/execution", ANALYTICS_PATH, id))
            .body(file)
            .send()?;
        Ok(res.text())
    }

    pub fn validate_analytic(&self, name: &str, input: &Path) -> Result<OperationResult> {
        let file = open_input(input)?;
        let id = self.analytic_id(name)?;
        let base = format!("{}/{}/validation", ANALYTICS_PATH, id);
        Poller::new(self.api, self.poll.clone()).run(self.api.post(&base).body(file), |request| {
            format!("{}/{}", base, request)
        })
    }

    pub fn deploy_analytic(&self, name: &str, config: &DeploymentConfig) -> Result<OperationResult> {
        let id = self.analytic_id(name)?;
        let base = format!("{}/{}/deployment", ANALYTICS_PATH, id);
        Poller::new(self.api, self.poll.clone()).run(self.api.post(&base).json(config), |request| {
            format!("{}/{}", base, request)
        })
    }

    /// Logs as plain text, with each `(STD` marker moved to a line start.
    pub fn analytic_logs(&self, name: &str) -> Result<String> {
        let id = self.analytic_id(name)?;
        let res = self
            .api
            .get(&format!("{}/{}/logs", ANALYTICS_PATH, id))
            .send()?;
        Ok(res.text().replace("(STD", "\r(STD"))
    }

    pub fn artifacts(&self, analytic: &str) -> Result<Vec<Artifact>> {
        let id = self.analytic_id(analytic)?;
        let list: ArtifactList = self
            .api
            .get(&format!("{}/{}/artifacts", ANALYTICS_PATH, id))
            .send()?
            .success()?
            .json()?;
        Ok(list.artifacts)
    }

    pub fn artifact_id(&self, analytic: &str, filename: &str) -> Result<String> {
        resolve_id(|| self.artifacts(analytic), filename)
    }

    /// Upload `path` as an artifact of `analytic`. The description field is
    /// only sent when non-empty.
    pub fn add_artifact(
        &self,
        analytic: &str,
        path: &Path,
        kind: &str,
        description: &str,
    ) -> Result<()> {
        let id = self.analytic_id(analytic)?;
        let mut form = multipart::Form::new()
            .text("catalogEntryId", id)
            .text("type", kind.to_string());
        if !description.is_empty() {
            form = form.text("description", description.to_string());
        }
        let form = form.file("file", path).map_err(|e| {
            CatalogError::io(format!("Failed to upload artifact {}", path.display()), e)
        })?;

        self.api.post(ARTIFACTS_PATH).multipart(form).send()?.success()?;
        debug!(analytic, file = %path.display(), kind, "artifact uploaded");
        Ok(())
    }

    /// Fetch an artifact's file. The response is returned whatever its
    /// status so the caller can show the server's explanation.
    pub fn download_artifact(&self, analytic: &str, filename: &str) -> Result<ApiResponse> {
        let id = self.artifact_id(analytic, filename)?;
        self.api.get(&artifact_file_path(&id)).send()
    }

    pub fn delete_artifact(&self, analytic: &str, filename: &str) -> Result<ArtifactDeletion> {
        let id = self.artifact_id(analytic, filename)?;
        let res = self.api.delete(&artifact_file_path(&id)).send()?;
        Ok(match res.status() {
            StatusCode::NO_CONTENT => ArtifactDeletion::Removed,
            other => ArtifactDeletion::Refused(other),
        })
    }

    pub fn taxonomy(&self) -> Result<Vec<Taxonomy>> {
        self.api.get(TAXONOMY_PATH).send()?.success()?.json()
    }

    /// Post the chain built from `path`; returns what was sent.
    pub fn add_taxonomy(&self, path: &str) -> Result<Taxonomy> {
        let chain = Taxonomy::from_path(path);
        self.api.post(TAXONOMY_PATH).json(&chain).send()?.success()?;
        Ok(chain)
    }
}

fn artifact_file_path(artifact_id: &str) -> String {
    format!("{}/{}/file", ARTIFACTS_PATH, artifact_id)
}

fn open_input(path: &Path) -> Result<File> {
    File::open(path)
        .map_err(|e| CatalogError::io(format!("Error accessing input file {}", path.display()), e))
}
