use anyhow::Result;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::artifactory::content::ContentReader;
use crate::buildinfo::{Artifact, Checksum, Dependency};
use crate::util::join_path;

pub mod aql;
pub mod content;
pub mod http;

/// Everything the container code needs from an Artifactory server.
pub trait ServiceManager {
    /// Server base url, always ending with `/`.
    fn base_url(&self) -> &str;

    fn search_files(&self, params: &SearchParams) -> Result<ContentReader<ResultItem>>;

    /// Set `props` (`k=v;k=v`) on every item of the reader. Returns the number of items updated.
    fn set_props(&self, props: &str, items: ContentReader<ResultItem>) -> Result<usize>;

    fn get_version(&self) -> Result<String>;

    fn send_head(&self, url: &str, headers: &[(&str, &str)]) -> Result<SimpleResponse>;

    /// Download `<repo>/<path>/<name>`.
    fn read_remote_file(&self, relative_path: &str) -> Result<Bytes>;

    fn get_repository(&self, key: &str) -> Result<RepositoryConfig>;
}

#[derive(Debug, Clone)]
pub struct SearchParams {
    pub pattern: String,
    pub recursive: bool,
}

impl SearchParams {
    pub fn new(pattern: &str) -> SearchParams {
        SearchParams {
            pattern: pattern.to_string(),
            recursive: false,
        }
    }

    pub fn recursive(mut self, recursive: bool) -> SearchParams {
        self.recursive = recursive;
        self
    }
}

#[derive(Debug)]
pub struct SimpleResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl SimpleResponse {
    pub fn body_str(&self) -> String {
        String::from_utf8_lossy(&self.body[..]).into()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

/// One item returned by an AQL search.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultItem {
    pub repo: String,
    pub path: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub item_type: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub actual_md5: String,
    #[serde(default)]
    pub actual_sha1: String,
    #[serde(default)]
    pub sha256: String,
    #[serde(default)]
    pub properties: Vec<Property>,
}

impl ResultItem {
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.iter().find(|p| p.key == key).map(|p| p.value.as_str())
    }

    /// `repo/path/name`, or `repo/name` for items at the repository root.
    pub fn relative_path(&self) -> String {
        join_path(&[&self.repo, &self.path, &self.name])
    }

    /// `path/name` inside the repository.
    pub fn relative_location(&self) -> String {
        join_path(&[&self.path, &self.name])
    }

    pub fn checksum(&self) -> Checksum {
        Checksum {
            sha1: self.actual_sha1.clone(),
            sha256: self.sha256.clone(),
            md5: self.actual_md5.clone(),
        }
    }

    pub fn to_artifact(&self) -> Artifact {
        Artifact {
            name: self.name.clone(),
            artifact_type: String::new(),
            checksum: self.checksum(),
            path: self.relative_location(),
            original_deployment_repo: self.repo.clone(),
        }
    }

    pub fn to_dependency(&self) -> Dependency {
        Dependency {
            id: self.name.clone(),
            dependency_type: String::new(),
            checksum: self.checksum(),
        }
    }
}

/// The subset of `api/repositories/<key>` the container code looks at.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryConfig {
    pub key: String,
    #[serde(default)]
    pub rclass: String,
    #[serde(default)]
    pub default_deployment_repo: String,
}
