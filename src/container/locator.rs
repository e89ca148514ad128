use std::collections::{HashSet, VecDeque};

use anyhow::Result;
use log::{debug, info, warn};

use crate::artifactory::{ResultItem, ServiceManager};
use crate::container::error::ContainerError;
use crate::container::image::Image;
use crate::container::manager::ContainerManager;
use crate::container::manifest::{digest_pattern, get_manifest_paths, FatManifest, Manifest};
use crate::container::search::{download_layer, download_marker_layers_to_remote_cache, perform_search, SearchResults};
use crate::container::{
    CommandType, RepositoryDetails, FAT_MANIFEST_JSON_FILE, MANIFEST_DIGEST_PROPERTY, MANIFEST_JSON_FILE,
};

/// How the image being described was produced.
pub enum ImageAgent {
    /// Pushed or pulled by a local docker/podman client, verified against the local image id.
    Local(Box<dyn ContainerManager>),
    /// Built elsewhere (kaniko, oc, buildx), verified against the manifest digest it reported.
    Remote { manifest_sha256: String },
}

#[derive(Debug)]
pub enum LocatedImage {
    Manifest {
        results: SearchResults,
        manifest: Manifest,
    },
    FatManifest {
        fat_manifest_item: ResultItem,
        fat_manifest: FatManifest,
    },
}

/// Finds the folder holding an image's manifest among the candidate search patterns.
pub struct ManifestLocator<'a> {
    image: &'a Image,
    repository: &'a RepositoryDetails,
    service: &'a dyn ServiceManager,
}

impl<'a> ManifestLocator<'a> {
    pub fn new(image: &'a Image, repository: &'a RepositoryDetails, service: &'a dyn ServiceManager) -> ManifestLocator<'a> {
        ManifestLocator {
            image,
            repository,
            service,
        }
    }

    pub fn locate(&self, agent: &ImageAgent, command_type: CommandType, image_id: &str) -> Result<LocatedImage> {
        match agent {
            ImageAgent::Local(manager) => self.locate_local(manager.as_ref(), command_type, image_id),
            ImageAgent::Remote { manifest_sha256 } => self.locate_remote(manifest_sha256),
        }
    }

    fn candidates(&self, command_type: CommandType) -> Vec<String> {
        get_manifest_paths(&self.image.path(), &self.repository.searchable_repo(), command_type)
    }

    /// Accept the first manifest whose config digest is the local image id. A folder holding only a
    /// fat manifest is replaced by the folder of the manifest matching the local platform.
    fn locate_local(&self, manager: &dyn ContainerManager, command_type: CommandType, image_id: &str) -> Result<LocatedImage> {
        let mut pending = self.candidates(command_type).into_iter().collect::<VecDeque<String>>();
        let mut tried = HashSet::new();
        debug!("Start searching for image manifest.json");
        while let Some(pattern) = pending.pop_front() {
            if !tried.insert(pattern.clone()) {
                continue;
            }
            debug!("Searching in: \"{}\"", pattern);
            let results = self.search(&pattern)?;
            let manifest_item = match results.get(MANIFEST_JSON_FILE) {
                Some(item) => item,
                None => {
                    if let Some(fat_manifest_item) = results.get(FAT_MANIFEST_JSON_FILE) {
                        debug!("Found list.manifest.json (fat-manifest). Searching for the image manifest digest in list.manifest.json");
                        match self.platform_pattern(&pattern, fat_manifest_item, manager)? {
                            Some(platform_pattern) => pending.push_front(platform_pattern),
                            None => debug!("Couldn't find matching digest in list.manifest.json"),
                        }
                    }
                    continue;
                }
            };
            let manifest = download_layer::<Manifest>(manifest_item, &self.repository.key, self.service)?;
            if manifest.config.digest != image_id {
                let mismatch = ContainerError::VerificationMismatch {
                    expected: image_id.to_string(),
                    found: manifest.config.digest.clone(),
                };
                debug!("Found incorrect manifest.json file. {}", mismatch);
                continue;
            }
            debug!("Found manifest.json. Proceeding to create build-info.");
            return Ok(LocatedImage::Manifest { results, manifest });
        }
        Err(ContainerError::ImageNotFound(self.image.tag().to_string()).into())
    }

    /// Pattern of the folder holding the manifest built for the local image's platform.
    fn platform_pattern(
        &self,
        pattern: &str,
        fat_manifest_item: &ResultItem,
        manager: &dyn ContainerManager,
    ) -> Result<Option<String>> {
        let fat_manifest = download_layer::<FatManifest>(fat_manifest_item, &self.repository.key, self.service)?;
        let (os, arch) = manager.os_compatibility(self.image)?;
        Ok(fat_manifest
            .find_platform_digest(&os, &arch)
            .filter(|digest| !digest.is_empty())
            .map(|digest| digest_pattern(pattern, digest)))
    }

    /// Accept the first manifest or fat manifest carrying the reported digest. When no tag folder
    /// matches, fall back to the folders named after the digest itself.
    fn locate_remote(&self, manifest_sha256: &str) -> Result<LocatedImage> {
        let candidates = self.candidates(CommandType::Push);
        let mut tried = HashSet::new();
        debug!("Start searching for image manifest.json");
        for pattern in &candidates {
            if !tried.insert(pattern.clone()) {
                continue;
            }
            debug!("Searching in: \"{}\"", pattern);
            let results = self.search(pattern)?;
            let item = match results.get(MANIFEST_JSON_FILE).or_else(|| results.get(FAT_MANIFEST_JSON_FILE)) {
                Some(item) => item,
                None => continue,
            };
            let found = item.property(MANIFEST_DIGEST_PROPERTY).unwrap_or_default();
            if found != manifest_sha256 {
                let mismatch = ContainerError::VerificationMismatch {
                    expected: manifest_sha256.to_string(),
                    found: found.to_string(),
                };
                warn!("{}", mismatch);
                continue;
            }
            return self.located(results);
        }
        if !manifest_sha256.is_empty() {
            debug!("Tag-based search failed. Trying digest-based search with: {}", manifest_sha256);
            for pattern in candidates.iter().map(|pattern| digest_pattern(pattern, manifest_sha256)) {
                if !tried.insert(pattern.clone()) {
                    continue;
                }
                debug!("Searching by digest in: \"{}\"", pattern);
                let results = self.search(&pattern)?;
                if results.contains_key(MANIFEST_JSON_FILE) || results.contains_key(FAT_MANIFEST_JSON_FILE) {
                    info!("Found image by digest in repository");
                    return self.located(results);
                }
            }
        }
        Err(ContainerError::ImageNotFound(self.image.tag().to_string()).into())
    }

    fn located(&self, results: SearchResults) -> Result<LocatedImage> {
        if let Some(item) = results.get(MANIFEST_JSON_FILE) {
            let manifest = download_layer::<Manifest>(item, &self.repository.key, self.service)?;
            debug!("Found manifest.json. Proceeding to create build-info.");
            return Ok(LocatedImage::Manifest { results, manifest });
        }
        match results.get(FAT_MANIFEST_JSON_FILE).cloned() {
            Some(fat_manifest_item) => {
                debug!("Found list.manifest.json. Proceeding to create build-info.");
                let fat_manifest = download_layer::<FatManifest>(&fat_manifest_item, &self.repository.key, self.service)?;
                Ok(LocatedImage::FatManifest {
                    fat_manifest_item,
                    fat_manifest,
                })
            }
            None => Err(ContainerError::ImageNotFound(self.image.tag().to_string()).into()),
        }
    }

    /// Search a folder, materializing `.marker` layers first when the repository is remote.
    fn search(&self, pattern: &str) -> Result<SearchResults> {
        let results = perform_search(pattern, self.service)?;
        let total_downloaded = download_marker_layers_to_remote_cache(&results, self.repository, self.image, self.service)?;
        if total_downloaded > 0 {
            return perform_search(pattern, self.service);
        }
        Ok(results)
    }
}
