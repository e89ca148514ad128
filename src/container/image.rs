use std::fmt::{Display, Formatter};

use anyhow::{anyhow, Result};
use log::info;
use reqwest::StatusCode;

use crate::artifactory::http::get_header;
use crate::artifactory::ServiceManager;
use crate::container::{RegContentType, ARTIFACTORY_DOCKER_REGISTRY_HEADER};

const DEFAULT_TAG: &str = "latest";

/// A docker style image reference, e.g. `my-registry:8082/docker-local/hello-world:latest`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    tag: String,
}

impl Display for Image {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.tag.fmt(f)
    }
}

impl Image {
    pub fn new(tag: &str) -> Image {
        Image { tag: tag.to_string() }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn validate(&self) -> Result<()> {
        if !self.tag.contains('/') {
            return Err(anyhow!("The image '{}' is missing '/' which indicates the image name/tag", self.tag));
        }
        Ok(())
    }

    /// Registry host, the text before the first `/`.
    pub fn registry(&self) -> Result<&str> {
        self.validate()?;
        let index = self.tag.find('/').ok_or_else(|| anyhow!("Failed to get the registry of '{}'", self.tag))?;
        Ok(&self.tag[..index])
    }

    /// Image name without registry and tag, plus the tag (`latest` when missing).
    /// A colon only separates a tag when it follows the last `/`, so registry ports are left alone.
    fn split(&self) -> (&str, &str) {
        let rest = match self.tag.find('/') {
            Some(index) => &self.tag[index + 1..],
            None => self.tag.as_str(),
        };
        let last_segment = rest.rfind('/').map_or(0, |index| index + 1);
        match rest[last_segment..].rfind(':') {
            Some(colon) => {
                let version = &rest[last_segment + colon + 1..];
                let version = if version.is_empty() { DEFAULT_TAG } else { version };
                (&rest[..last_segment + colon], version)
            }
            None => (rest, DEFAULT_TAG),
        }
    }

    /// `docker-local/hello-world:latest` for `my-registry/docker-local/hello-world`.
    pub fn long_name_with_tag(&self) -> Result<String> {
        self.validate()?;
        let (name, version) = self.split();
        if !self.has_explicit_tag() {
            info!("The image '{}' does not include tag. Using the '{}' tag.", self.tag, DEFAULT_TAG);
        }
        Ok(format!("{}:{}", name, version))
    }

    pub fn long_name(&self) -> Result<&str> {
        self.validate()?;
        Ok(self.split().0)
    }

    pub fn version(&self) -> Result<&str> {
        self.validate()?;
        Ok(self.split().1)
    }

    /// Last path segment with the tag, e.g. `hello-world:latest`.
    pub fn name(&self) -> String {
        let (name, version) = self.split();
        format!("{}:{}", last_segment(name), version)
    }

    /// Long name without the repository segment, e.g. `myorg/hello-world:latest` for
    /// `domain/docker-local/myorg/hello-world:latest`.
    pub fn long_name_without_repo_with_tag(&self) -> Result<String> {
        let long_name = self.long_name_with_tag()?;
        Ok(match long_name.split_once('/') {
            Some((_, rest)) => rest.to_string(),
            None => long_name,
        })
    }

    /// Search path of the image inside a repository, e.g. `/docker-local/hello-world/1.0`
    /// for `localhost:8082/docker-local/hello-world:1.0`.
    pub fn path(&self) -> String {
        let (name, version) = self.split();
        format!("/{}/{}", name, version)
    }

    fn has_explicit_tag(&self) -> bool {
        let rest = self.tag.split_once('/').map_or(self.tag.as_str(), |(_, rest)| rest);
        last_segment(rest).contains(':')
    }

    /// Ask Artifactory which repository serves the image, using the
    /// `X-Artifactory-Docker-Registry` header of a manifest HEAD request.
    pub fn remote_repo(&self, service: &dyn ServiceManager) -> Result<String> {
        let registry = self.registry()?;
        let long_name = self.long_name()?;
        let version = self.version()?;
        let https = service.base_url().starts_with("https");
        let url = build_request_url(long_name, version, registry, https);
        let accept = RegContentType::manifest_accepts();
        let response = service.send_head(&url, &[("Accept", accept.as_str())])?;
        if response.status != StatusCode::OK {
            return Err(anyhow!(
                "Error while getting docker repository name. Artifactory response: {}",
                response.status
            ));
        }
        get_header(&response.headers, ARTIFACTORY_DOCKER_REGISTRY_HEADER)
            .ok_or_else(|| anyhow!("Couldn't find the '{}' header in the Artifactory response", ARTIFACTORY_DOCKER_REGISTRY_HEADER))
    }
}

fn last_segment(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

pub fn build_request_url(long_name: &str, tag: &str, registry: &str, https: bool) -> String {
    let scheme = if https { "https" } else { "http" };
    format!("{}://{}/v2/{}/manifests/{}", scheme, registry.trim_end_matches('/'), long_name, tag)
}
