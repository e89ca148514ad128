use std::collections::{BTreeMap, HashSet};

use serde::Deserialize;
use serde::Serialize;

use crate::container::{CommandType, ATTESTATION_MANIFEST, REFERENCE_TYPE_ANNOTATION};
use crate::util::join_path;

const UNKNOWN_PLATFORM: &str = "unknown";

/// `manifest.json` as stored by Artifactory.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub config: ManifestConfig,
    #[serde(default)]
    pub layers: Vec<ManifestLayer>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ManifestConfig {
    #[serde(default)]
    pub digest: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ManifestLayer {
    #[serde(default)]
    pub digest: String,
    #[serde(default)]
    pub media_type: String,
}

impl Manifest {
    /// Empty layers may appear more than once in a manifest, keep the first of each digest.
    pub fn remove_duplicate_layers(&mut self) {
        let mut seen = HashSet::new();
        self.layers.retain(|layer| seen.insert(layer.digest.clone()));
    }
}

/// `list.manifest.json` of a multi platform image.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct FatManifest {
    #[serde(default)]
    pub manifests: Vec<ManifestDetails>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ManifestDetails {
    pub digest: String,
    #[serde(default)]
    pub platform: Platform,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Platform {
    #[serde(default)]
    pub architecture: String,
    #[serde(default)]
    pub os: String,
}

impl Platform {
    pub fn is_known(&self) -> bool {
        self.os != UNKNOWN_PLATFORM && self.architecture != UNKNOWN_PLATFORM
    }
}

impl FatManifest {
    /// Digest of the first manifest built for `os`/`arch`.
    pub fn find_platform_digest(&self, os: &str, arch: &str) -> Option<&str> {
        self.manifests
            .iter()
            .find(|item| item.platform.os == os && item.platform.architecture == arch)
            .map(|item| item.digest.as_str())
    }
}

/// The image config blob, only its history is of interest.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ConfigLayer {
    #[serde(default)]
    pub history: Vec<History>,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct History {
    pub created: Option<String>,
    pub created_by: Option<String>,
    pub empty_layer: Option<bool>,
}

impl History {
    fn is_empty_layer(&self) -> bool {
        self.empty_layer.unwrap_or(false)
    }

    fn created_by(&self) -> &str {
        self.created_by.as_deref().unwrap_or_default()
    }
}

impl ConfigLayer {
    /// Number of layers inherited from the base image. Walking the history backwards, every entry
    /// counts as new until the base image's `ENTRYPOINT`/`MAINTAINER` entry; below it only empty
    /// layers are discounted.
    pub fn number_of_dependent_layers(&self) -> usize {
        let mut layers = self.history.len();
        let mut new_image_layers = true;
        for history in self.history.iter().rev() {
            if new_image_layers || history.is_empty_layer() {
                layers -= 1;
            }
            let created_by = history.created_by();
            if created_by.contains("ENTRYPOINT") || created_by.contains("MAINTAINER") {
                new_image_layers = false;
            }
        }
        layers
    }
}

/// Search patterns under which the manifest of `image_path` may be stored, most likely first.
pub fn get_manifest_paths(image_path: &str, repo: &str, command_type: CommandType) -> Vec<String> {
    // reverse proxy, e.g. acme-docker-local.jfrog.io
    let mut paths = vec![join_path(&[repo, image_path, "*"])];
    // proxy-less, e.g. acme.jfrog.io/docker-local
    let proxyless = proxyless_path(image_path);
    paths.push(join_path(&[repo, proxyless, "*"]));
    // Images deeper than three levels are never stored under 'library'.
    if command_type != CommandType::Push && image_path.matches('/').count() <= 3 {
        paths.push(join_path(&[repo, "library", image_path, "*"]));
        paths.push(join_path(&[repo, "library", proxyless, "*"]));
    }
    paths
}

/// The image path without its leading segment.
fn proxyless_path(image_path: &str) -> &str {
    let rest = image_path.get(1..).unwrap_or_default();
    match rest.find('/') {
        Some(index) => &image_path[index + 1..],
        None => image_path,
    }
}

/// `sha256:abc` to the `sha256__abc` file name Artifactory stores layers under.
pub fn digest_to_layer(digest: &str) -> String {
    digest.replacen(':', "__", 1)
}

/// `sha256__abc.marker` back to `sha256:abc`.
pub fn to_none_marker_layer(layer: &str) -> String {
    layer.replacen("__", ":", 1).replacen(".marker", "", 1)
}

/// Replace the tag folder of `pattern` (`repo/image/tag/*`) with the folder of `digest`.
pub fn digest_pattern(pattern: &str, digest: &str) -> String {
    let folder = pattern.replacen("/*", "", 1);
    let parent = folder.rfind('/').map_or("", |index| &folder[..index]);
    join_path(&[parent, &digest_to_layer(digest), "*"])
}

/// Module id of one platform image of a multi platform build.
pub fn module_id_by_manifest(manifest: &ManifestDetails, base_module_id: &str) -> String {
    let reference_type = manifest.annotations.get(REFERENCE_TYPE_ANNOTATION);
    if reference_type.map(String::as_str) == Some(ATTESTATION_MANIFEST) {
        return join_path(&["attestations", base_module_id]);
    }
    if manifest.platform.is_known() {
        return join_path(&[&manifest.platform.os, &manifest.platform.architecture, base_module_id]);
    }
    base_module_id.to_string()
}
