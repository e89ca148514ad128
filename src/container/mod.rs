use std::fmt::{Display, Formatter};

use anyhow::{Context, Result};
use log::debug;

use crate::artifactory::ServiceManager;

pub mod builder;
pub mod error;
pub mod image;
pub mod locator;
pub mod manager;
pub mod manifest;
pub mod search;
#[cfg(test)]
pub(crate) mod testutil;

pub const MANIFEST_JSON_FILE: &str = "manifest.json";
pub const FAT_MANIFEST_JSON_FILE: &str = "list.manifest.json";
pub const MARKER_LAYER_SUFFIX: &str = ".marker";
pub const MANIFEST_DIGEST_PROPERTY: &str = "docker.manifest.digest";
pub const IMAGE_ID_PROPERTY: &str = "docker.image.id";
pub const IMAGE_TAG_PROPERTY: &str = "docker.image.tag";
pub const REFERENCE_TYPE_ANNOTATION: &str = "vnd.docker.reference.type";
pub const ATTESTATION_MANIFEST: &str = "attestation-manifest";
pub const ARTIFACTORY_DOCKER_REGISTRY_HEADER: &str = "X-Artifactory-Docker-Registry";

/// Which container command the build-info is collected for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandType {
    Push,
    Pull,
}

impl Display for CommandType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandType::Push => "push".fmt(f),
            CommandType::Pull => "pull".fmt(f),
        }
    }
}

pub struct RegContentType(pub &'static str);

impl RegContentType {
    pub const DOCKER_MANIFEST: Self = Self("application/vnd.docker.distribution.manifest.v2+json");
    pub const DOCKER_MANIFEST_LIST: Self = Self("application/vnd.docker.distribution.manifest.list.v2+json");
    pub const DOCKER_FOREIGN_LAYER_TGZ: Self = Self("application/vnd.docker.image.rootfs.foreign.diff.tar.gzip");
    pub const OCI_INDEX: Self = Self("application/vnd.oci.image.index.v1+json");
    pub const OCI_MANIFEST: Self = Self("application/vnd.oci.image.manifest.v1+json");

    pub fn val(&self) -> &'static str {
        self.0
    }

    pub fn manifest_accepts() -> String {
        [Self::DOCKER_MANIFEST, Self::DOCKER_MANIFEST_LIST, Self::OCI_MANIFEST, Self::OCI_INDEX]
            .iter()
            .map(|content_type| content_type.val())
            .collect::<Vec<&str>>()
            .join(",")
    }
}

/// The repository an image lives in, as far as searching is concerned.
#[derive(Debug, Clone, Default)]
pub struct RepositoryDetails {
    pub key: String,
    pub is_remote: bool,
    pub repo_type: String,
    /// Only set for virtual repositories.
    pub default_deployment_repo: String,
}

impl RepositoryDetails {
    pub fn new(key: &str) -> RepositoryDetails {
        RepositoryDetails {
            key: key.to_string(),
            repo_type: "local".to_string(),
            ..Default::default()
        }
    }

    pub fn fetch(key: &str, service: &dyn ServiceManager) -> Result<RepositoryDetails> {
        let config = service.get_repository(key)?;
        debug!("Repository '{}' is of type '{}'", config.key, config.rclass);
        Ok(RepositoryDetails {
            key: key.to_string(),
            is_remote: config.rclass == "remote",
            repo_type: config.rclass,
            default_deployment_repo: config.default_deployment_repo,
        })
    }

    /// Remote repositories keep their content in `<key>-cache`.
    pub fn searchable_repo(&self) -> String {
        if self.is_remote {
            format!("{}-cache", self.key)
        } else {
            self.key.clone()
        }
    }

    pub fn is_virtual(&self) -> bool {
        self.repo_type == "virtual"
    }
}

/// Read the `docker.manifest.digest` style `sha256:<hex>` value and return the hex part.
pub fn digest_hex(digest: &str) -> Result<&str> {
    digest
        .strip_prefix("sha256:")
        .with_context(|| format!("'{}' is not a sha256 digest", digest))
}
