use std::collections::BTreeMap;

use anyhow::Result;
use colored::Colorize;
use log::{debug, info, warn};

use crate::artifactory::content::ContentReader;
use crate::artifactory::{ResultItem, ServiceManager};
use crate::buildinfo::{Artifact, BuildDetails, BuildInfo, Dependency, Module, ModuleType};
use crate::container::error::ContainerError;
use crate::container::image::Image;
use crate::container::locator::{ImageAgent, LocatedImage, ManifestLocator};
use crate::container::manager::ContainerManager;
use crate::container::manifest::{digest_to_layer, module_id_by_manifest, ConfigLayer, FatManifest, Manifest, ManifestDetails};
use crate::container::search::{download_layer, perform_multi_platform_image_search, SearchResults};
use crate::container::{
    CommandType, RegContentType, RepositoryDetails, FAT_MANIFEST_JSON_FILE, IMAGE_ID_PROPERTY, IMAGE_TAG_PROPERTY,
    MANIFEST_JSON_FILE,
};
use crate::util::join_path;

/// Collects the build-info of one docker image from Artifactory.
pub struct BuildInfoBuilder<'a> {
    image: Image,
    repository: RepositoryDetails,
    command_type: CommandType,
    build: BuildDetails,
    service: &'a dyn ServiceManager,
    agent: ImageAgent,
    skip_tagging_layers: bool,
    updated: bool,
    image_id: String,
    artifacts: Vec<Artifact>,
    dependencies: Vec<Dependency>,
    layers: Vec<ResultItem>,
    fat_manifest_item: Option<ResultItem>,
    platform_images: Vec<(ManifestDetails, Vec<ResultItem>)>,
}

impl<'a> BuildInfoBuilder<'a> {
    /// Builder for an image pushed or pulled with a local docker/podman client.
    pub fn new_local(
        image: Image,
        repository: RepositoryDetails,
        build: BuildDetails,
        service: &'a dyn ServiceManager,
        command_type: CommandType,
        manager: Box<dyn ContainerManager>,
    ) -> Result<BuildInfoBuilder<'a>> {
        let image_id = manager.id(&image)?;
        debug!("Local image id of {} is {}", image, image_id);
        let mut builder = Self::new(image, repository, build, service, command_type, ImageAgent::Local(manager));
        builder.image_id = image_id;
        Ok(builder)
    }

    /// Builder for an image built by a remote agent which reported the manifest digest.
    pub fn new_remote(
        image: Image,
        repository: RepositoryDetails,
        build: BuildDetails,
        service: &'a dyn ServiceManager,
        manifest_sha256: &str,
    ) -> BuildInfoBuilder<'a> {
        let agent = ImageAgent::Remote {
            manifest_sha256: manifest_sha256.to_string(),
        };
        Self::new(image, repository, build, service, CommandType::Push, agent)
    }

    fn new(
        image: Image,
        repository: RepositoryDetails,
        build: BuildDetails,
        service: &'a dyn ServiceManager,
        command_type: CommandType,
        agent: ImageAgent,
    ) -> BuildInfoBuilder<'a> {
        BuildInfoBuilder {
            image,
            repository,
            command_type,
            build,
            service,
            agent,
            skip_tagging_layers: false,
            updated: false,
            image_id: String::new(),
            artifacts: Vec::new(),
            dependencies: Vec::new(),
            layers: Vec::new(),
            fat_manifest_item: None,
            platform_images: Vec::new(),
        }
    }

    /// Don't write build properties on the pushed layers.
    pub fn set_skip_tagging_layers(&mut self, skip_tagging_layers: bool) {
        self.skip_tagging_layers = skip_tagging_layers;
    }

    /// Layers of the image found in Artifactory, in the order they were collected.
    pub fn layers(&self) -> &[ResultItem] {
        &self.layers
    }

    pub fn image_id(&self) -> &str {
        &self.image_id
    }

    /// Locate and verify the image, then classify its files as artifacts and dependencies. Nothing
    /// collected is kept when this fails.
    pub fn update_artifacts_and_dependencies(&mut self) -> Result<()> {
        self.clear();
        let collected = self.collect();
        match collected {
            Ok(()) => self.updated = true,
            Err(_) => self.clear(),
        }
        collected
    }

    fn collect(&mut self) -> Result<()> {
        let locator = ManifestLocator::new(&self.image, &self.repository, self.service);
        let located = locator.locate(&self.agent, self.command_type, &self.image_id)?;
        match located {
            LocatedImage::Manifest { results, mut manifest } => {
                if let ImageAgent::Remote { .. } = self.agent {
                    self.image_id = manifest.config.digest.clone();
                }
                manifest.remove_duplicate_layers();
                match self.command_type {
                    CommandType::Push => {
                        self.handle_push(&manifest, &results)?;
                        self.set_build_properties()?;
                    }
                    CommandType::Pull => self.handle_pull(&manifest, &results)?,
                }
            }
            LocatedImage::FatManifest {
                fat_manifest_item,
                fat_manifest,
            } => {
                self.handle_fat_manifest(fat_manifest_item, fat_manifest)?;
                self.set_build_properties()?;
            }
        }
        Ok(())
    }

    /// Produce the build-info, collecting it first when needed. `module` overrides the module id,
    /// which otherwise is the image name with its tag.
    pub fn build(&mut self, module: Option<&str>) -> Result<BuildInfo> {
        if !self.updated {
            if let Err(err) = self.update_artifacts_and_dependencies() {
                warn!("Failed to collect build-info of image \"{}\": {:#}", self.image, err);
                if let ImageAgent::Local(_) = self.agent {
                    return Err(err);
                }
            }
        }
        let mut build_info = self.create_build_info(module)?;
        if !self.build.is_empty() {
            build_info.set_build_details(&self.build);
        }
        Ok(build_info)
    }

    fn clear(&mut self) {
        // A remote agent learns the image id from the manifest it locates.
        if let ImageAgent::Remote { .. } = self.agent {
            self.image_id.clear();
        }
        self.artifacts.clear();
        self.dependencies.clear();
        self.layers.clear();
        self.fat_manifest_item = None;
        self.platform_images.clear();
    }

    fn config_layer_item<'r>(&self, results: &'r SearchResults) -> Result<&'r ResultItem> {
        let config_name = digest_to_layer(&self.image_id);
        results
            .get(&config_name)
            .ok_or_else(|| ContainerError::MissingLayer(config_name).into())
    }

    fn manifest_item<'r>(&self, results: &'r SearchResults) -> Result<&'r ResultItem> {
        results
            .get(MANIFEST_JSON_FILE)
            .ok_or_else(|| ContainerError::ImageNotFound(self.image.tag().to_string()).into())
    }

    /// Everything is an artifact. Layers inherited from the base image are dependencies as well.
    fn handle_push(&mut self, manifest: &Manifest, results: &SearchResults) -> Result<()> {
        let manifest_item = self.manifest_item(results)?;
        let config_item = self.config_layer_item(results)?;
        self.artifacts.push(manifest_artifact(manifest_item, MANIFEST_JSON_FILE));
        self.artifacts.push(config_item.to_artifact());
        self.layers.push(manifest_item.clone());
        self.layers.push(config_item.clone());

        let total_dependencies = self.total_dependencies(config_item)?;
        debug!("{} of {} layers come from the base image", total_dependencies, manifest.layers.len());
        for (index, layer) in manifest.layers.iter().enumerate() {
            let layer_name = digest_to_layer(&layer.digest);
            let item = match results.get(&layer_name) {
                Some(item) => item,
                None => {
                    handle_missing_layer(&layer.media_type, &layer_name)?;
                    continue;
                }
            };
            if index < total_dependencies {
                self.dependencies.push(item.to_dependency());
            }
            self.artifacts.push(item.to_artifact());
            self.layers.push(item.clone());
        }
        Ok(())
    }

    /// Everything is a dependency.
    fn handle_pull(&mut self, manifest: &Manifest, results: &SearchResults) -> Result<()> {
        let manifest_item = self.manifest_item(results)?;
        let config_item = self.config_layer_item(results)?;
        self.dependencies.push(manifest_dependency(manifest_item));
        self.dependencies.push(config_item.to_dependency());
        for layer in &manifest.layers {
            let layer_name = digest_to_layer(&layer.digest);
            match results.get(&layer_name) {
                Some(item) => self.dependencies.push(item.to_dependency()),
                None => handle_missing_layer(&layer.media_type, &layer_name)?,
            }
        }
        Ok(())
    }

    /// Collect the files of every platform image listed in the fat manifest. Artifactory keeps each
    /// platform image in a sibling folder of the tag folder, named after its digest.
    fn handle_fat_manifest(&mut self, fat_manifest_item: ResultItem, fat_manifest: FatManifest) -> Result<()> {
        let image_folder = match fat_manifest_item.path.rfind('/') {
            Some(index) => &fat_manifest_item.path[..index],
            None => "",
        };
        let root_pattern = join_path(&[&fat_manifest_item.repo, image_folder, "*"]);
        debug!("Searching platform images in: \"{}\"", root_pattern);
        let mut images = perform_multi_platform_image_search(&root_pattern, self.service)?;
        self.layers.push(fat_manifest_item.clone());
        for details in fat_manifest.manifests {
            let items = images.remove(&details.digest).unwrap_or_default();
            if items.is_empty() {
                debug!("No files found for platform image {}", details.digest);
            }
            self.layers.extend(items.iter().cloned());
            self.platform_images.push((details, items));
        }
        self.fat_manifest_item = Some(fat_manifest_item);
        Ok(())
    }

    fn total_dependencies(&self, config_item: &ResultItem) -> Result<usize> {
        let config_layer = download_layer::<ConfigLayer>(config_item, &self.repository.key, self.service)?;
        Ok(config_layer.number_of_dependent_layers())
    }

    /// Tag the collected layers with the build name, number, timestamp and project.
    fn set_build_properties(&self) -> Result<()> {
        if self.build.is_empty() {
            debug!("Skipping setting properties - build name and build number are required");
            return Ok(());
        }
        if self.skip_tagging_layers {
            debug!("Skipping setting properties on the image layers");
            return Ok(());
        }
        let layers = self.layers_to_tag();
        if layers.is_empty() {
            debug!("No layers to set properties on, skipping property setting");
            return Ok(());
        }
        let reader = ContentReader::from_items(layers)?;
        let total = self.service.set_props(&self.build.props(), reader)?;
        info!("Set build properties on {} layers of {}", total, self.image.tag().green());
        Ok(())
    }

    /// A virtual repository deploys into its default deployment repository. Only the layers stored
    /// there belong to this build.
    fn layers_to_tag(&self) -> Vec<ResultItem> {
        let deployment_repo = &self.repository.default_deployment_repo;
        if !self.repository.is_virtual() || deployment_repo.is_empty() {
            return self.layers.clone();
        }
        let filtered = self
            .layers
            .iter()
            .filter(|layer| &layer.repo == deployment_repo)
            .cloned()
            .collect::<Vec<ResultItem>>();
        if filtered.is_empty() {
            warn!(
                "No layers found in default deployment repository '{}' for virtual repository '{}'. \
                Properties will not be set. Consider pushing the image directly to the virtual repository.",
                deployment_repo, self.repository.key
            );
        } else {
            info!(
                "Filtered {} layers to {} layers from default deployment repository: {}",
                self.layers.len(),
                filtered.len(),
                deployment_repo
            );
        }
        filtered
    }

    fn create_build_info(&self, module: Option<&str>) -> Result<BuildInfo> {
        let base_module_id = match module.filter(|module| !module.is_empty()) {
            Some(module) => module.to_string(),
            None => self.image.name(),
        };
        if let Some(fat_manifest_item) = &self.fat_manifest_item {
            return self.create_multi_platform_build_info(fat_manifest_item, &base_module_id);
        }
        let mut properties = BTreeMap::new();
        if !self.image_id.is_empty() {
            properties.insert(IMAGE_ID_PROPERTY.to_string(), self.image_id.clone());
        }
        properties.insert(IMAGE_TAG_PROPERTY.to_string(), self.image.tag().to_string());
        Ok(BuildInfo::new(vec![Module {
            id: base_module_id,
            module_type: ModuleType::Docker,
            properties,
            artifacts: self.artifacts.clone(),
            dependencies: self.dependencies.clone(),
            parent: None,
        }]))
    }

    /// One module for the fat manifest and one per platform image, pointing back to it.
    fn create_multi_platform_build_info(&self, fat_manifest_item: &ResultItem, base_module_id: &str) -> Result<BuildInfo> {
        let parent = self.image.long_name_without_repo_with_tag()?;
        let mut modules = vec![Module {
            id: base_module_id.to_string(),
            module_type: ModuleType::Docker,
            properties: BTreeMap::from([(IMAGE_TAG_PROPERTY.to_string(), self.image.tag().to_string())]),
            artifacts: vec![manifest_artifact(fat_manifest_item, FAT_MANIFEST_JSON_FILE)],
            ..Default::default()
        }];
        for (details, items) in &self.platform_images {
            let artifacts = items
                .iter()
                .map(|item| {
                    if item.name == MANIFEST_JSON_FILE {
                        manifest_artifact(item, MANIFEST_JSON_FILE)
                    } else {
                        item.to_artifact()
                    }
                })
                .collect::<Vec<Artifact>>();
            modules.push(Module {
                id: module_id_by_manifest(details, base_module_id),
                module_type: ModuleType::Docker,
                artifacts,
                parent: Some(parent.clone()),
                ..Default::default()
            });
        }
        Ok(BuildInfo::new(modules))
    }
}

fn manifest_artifact(item: &ResultItem, name: &str) -> Artifact {
    Artifact {
        name: name.to_string(),
        artifact_type: "json".to_string(),
        ..item.to_artifact()
    }
}

fn manifest_dependency(item: &ResultItem) -> Dependency {
    Dependency {
        id: MANIFEST_JSON_FILE.to_string(),
        dependency_type: "json".to_string(),
        checksum: item.checksum(),
    }
}

/// Foreign layers are never uploaded to Artifactory, any other missing layer is an error.
fn handle_missing_layer(media_type: &str, layer_name: &str) -> Result<()> {
    if media_type == RegContentType::DOCKER_FOREIGN_LAYER_TGZ.val() {
        info!(
            "Foreign layer: {} is missing in Artifactory and therefore will not be added to the build-info.",
            layer_name
        );
        return Ok(());
    }
    Err(ContainerError::MissingLayer(layer_name.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifactory::{Property, RepositoryConfig};
    use crate::container::testutil::{result_item, MockContainerManager, MockServiceManager};
    use crate::container::MANIFEST_DIGEST_PROPERTY;

    const IMAGE: &str = "localhost:8082/docker-local/hello-world:1.0";
    const PUSH_PATTERN: &str = "docker-local/docker-local/hello-world/1.0/*";
    const PROXYLESS_PATTERN: &str = "docker-local/hello-world/1.0/*";

    const MANIFEST: &str = r#"{
        "schemaVersion": 2,
        "config": {"digest": "sha256:image", "mediaType": "application/vnd.docker.container.image.v1+json"},
        "layers": [
            {"digest": "sha256:l1", "mediaType": "application/vnd.docker.image.rootfs.diff.tar.gzip"},
            {"digest": "sha256:l2", "mediaType": "application/vnd.docker.image.rootfs.diff.tar.gzip"},
            {"digest": "sha256:l1", "mediaType": "application/vnd.docker.image.rootfs.diff.tar.gzip"},
            {"digest": "sha256:l3", "mediaType": "application/vnd.docker.image.rootfs.diff.tar.gzip"}
        ]}"#;

    const CONFIG: &str = r#"{"history": [
        {"created_by": "/bin/sh -c #(nop) ADD file:abc in / "},
        {"created_by": "/bin/sh -c #(nop)  ENTRYPOINT [\"/bin/sh\"]", "empty_layer": true},
        {"created_by": "/bin/sh -c apk add curl"},
        {"created_by": "/bin/sh -c #(nop) COPY file:def in /app"}
    ]}"#;

    fn build_details() -> BuildDetails {
        BuildDetails::new("my-build".into(), "7".into(), None)
    }

    fn local_manager() -> Box<dyn ContainerManager> {
        Box::new(MockContainerManager::new("sha256:image", "linux", "amd64"))
    }

    /// Image files stored under `docker-local/hello-world/1.0`, the proxy-less location.
    fn stored_image(service: &MockServiceManager, repo: &str, layers: &[&str]) {
        let folder = "hello-world/1.0";
        let mut items = vec![
            result_item(repo, folder, "manifest.json"),
            result_item(repo, folder, "sha256__image"),
        ];
        items.extend(layers.iter().map(|layer| result_item(repo, folder, layer)));
        service.add_search_results(&format!("{}/{}/*", repo, folder), items);
        service.add_file(&format!("docker-local/{}/manifest.json", folder), MANIFEST);
        service.add_file(&format!("docker-local/{}/sha256__image", folder), CONFIG);
    }

    #[test]
    fn push_collects_artifacts_and_dependencies() -> Result<()> {
        let service = MockServiceManager::default();
        stored_image(&service, "docker-local", &["sha256__l1", "sha256__l2", "sha256__l3"]);
        let mut builder = BuildInfoBuilder::new_local(
            Image::new(IMAGE),
            RepositoryDetails::new("docker-local"),
            build_details(),
            &service,
            CommandType::Push,
            local_manager(),
        )?;
        let build_info = builder.build(None)?;

        assert_eq!(service.search_calls(), vec![PUSH_PATTERN, PROXYLESS_PATTERN]);
        assert_eq!(build_info.name, "my-build");
        assert_eq!(build_info.modules.len(), 1);
        let module = &build_info.modules[0];
        assert_eq!(module.id, "hello-world:1.0");
        assert_eq!(module.properties[IMAGE_ID_PROPERTY], "sha256:image");
        assert_eq!(module.properties[IMAGE_TAG_PROPERTY], IMAGE);

        let artifact_names = module.artifacts.iter().map(|a| a.name.as_str()).collect::<Vec<&str>>();
        assert_eq!(artifact_names, vec!["manifest.json", "sha256__image", "sha256__l1", "sha256__l2", "sha256__l3"]);
        assert_eq!(module.artifacts[0].artifact_type, "json");
        assert_eq!(module.artifacts[0].path, "hello-world/1.0/manifest.json");
        assert_eq!(module.dependencies.len(), 1);
        assert_eq!(module.dependencies[0].id, "sha256__l1");

        assert_eq!(builder.layers().len(), 5);
        let set_props = service.set_props_calls();
        assert_eq!(set_props.len(), 1);
        assert!(set_props[0].0.starts_with("build.name=my-build;build.number=7;build.timestamp="));
        assert_eq!(set_props[0].1.len(), 5);
        assert_eq!(set_props[0].1[0], "docker-local/hello-world/1.0/manifest.json");
        Ok(())
    }

    #[test]
    fn push_skips_tagging_when_asked() -> Result<()> {
        let service = MockServiceManager::default();
        stored_image(&service, "docker-local", &["sha256__l1", "sha256__l2", "sha256__l3"]);
        let mut builder = BuildInfoBuilder::new_local(
            Image::new(IMAGE),
            RepositoryDetails::new("docker-local"),
            build_details(),
            &service,
            CommandType::Push,
            local_manager(),
        )?;
        builder.set_skip_tagging_layers(true);
        builder.build(None)?;
        assert!(service.set_props_calls().is_empty());
        Ok(())
    }

    #[test]
    fn push_without_build_details_does_not_tag() -> Result<()> {
        let service = MockServiceManager::default();
        stored_image(&service, "docker-local", &["sha256__l1", "sha256__l2", "sha256__l3"]);
        let mut builder = BuildInfoBuilder::new_local(
            Image::new(IMAGE),
            RepositoryDetails::new("docker-local"),
            BuildDetails::new(String::new(), String::new(), None),
            &service,
            CommandType::Push,
            local_manager(),
        )?;
        let build_info = builder.build(Some("my-module"))?;
        assert!(service.set_props_calls().is_empty());
        assert!(build_info.name.is_empty());
        assert_eq!(build_info.modules[0].id, "my-module");
        Ok(())
    }

    #[test]
    fn pull_collects_dependencies_only() -> Result<()> {
        let service = MockServiceManager::default();
        stored_image(&service, "docker-local", &["sha256__l1", "sha256__l2", "sha256__l3"]);
        let mut builder = BuildInfoBuilder::new_local(
            Image::new(IMAGE),
            RepositoryDetails::new("docker-local"),
            build_details(),
            &service,
            CommandType::Pull,
            local_manager(),
        )?;
        let build_info = builder.build(None)?;
        let module = &build_info.modules[0];
        assert!(module.artifacts.is_empty());
        let ids = module.dependencies.iter().map(|d| d.id.as_str()).collect::<Vec<&str>>();
        assert_eq!(ids, vec!["manifest.json", "sha256__image", "sha256__l1", "sha256__l2", "sha256__l3"]);
        assert_eq!(module.dependencies[0].dependency_type, "json");
        assert!(service.set_props_calls().is_empty());
        Ok(())
    }

    #[test]
    fn pull_fails_on_missing_layer() -> Result<()> {
        let service = MockServiceManager::default();
        stored_image(&service, "docker-local", &["sha256__l1", "sha256__l3"]);
        let mut builder = BuildInfoBuilder::new_local(
            Image::new(IMAGE),
            RepositoryDetails::new("docker-local"),
            build_details(),
            &service,
            CommandType::Pull,
            local_manager(),
        )?;
        let err = builder.build(None).unwrap_err();
        match err.downcast_ref::<ContainerError>() {
            Some(ContainerError::MissingLayer(layer)) => assert_eq!(layer, "sha256__l2"),
            other => panic!("unexpected error {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn foreign_layers_may_be_missing() {
        let foreign = RegContentType::DOCKER_FOREIGN_LAYER_TGZ.val();
        assert!(handle_missing_layer(foreign, "sha256__win").is_ok());
        assert!(handle_missing_layer("application/vnd.docker.image.rootfs.diff.tar.gzip", "sha256__l").is_err());
    }

    #[test]
    fn local_image_not_found_is_an_error() -> Result<()> {
        let service = MockServiceManager::default();
        let mut builder = BuildInfoBuilder::new_local(
            Image::new(IMAGE),
            RepositoryDetails::new("docker-local"),
            build_details(),
            &service,
            CommandType::Push,
            local_manager(),
        )?;
        let err = builder.build(None).unwrap_err();
        assert!(matches!(err.downcast_ref::<ContainerError>(), Some(ContainerError::ImageNotFound(_))));
        Ok(())
    }

    #[test]
    fn remote_not_found_gives_empty_build_info() -> Result<()> {
        let service = MockServiceManager::default();
        let mut builder = BuildInfoBuilder::new_remote(
            Image::new(IMAGE),
            RepositoryDetails::new("docker-local"),
            build_details(),
            &service,
            "sha256:manifest",
        );
        let build_info = builder.build(None)?;
        assert_eq!(build_info.modules.len(), 1);
        assert!(build_info.modules[0].artifacts.is_empty());
        assert!(build_info.modules[0].dependencies.is_empty());
        assert!(!build_info.modules[0].properties.contains_key(IMAGE_ID_PROPERTY));
        Ok(())
    }

    #[test]
    fn remote_push_uses_manifest_config_digest() -> Result<()> {
        let service = MockServiceManager::default();
        let folder = "hello-world/1.0";
        let mut manifest_item = result_item("docker-local", folder, "manifest.json");
        manifest_item.properties.push(Property {
            key: MANIFEST_DIGEST_PROPERTY.into(),
            value: "sha256:manifest".into(),
        });
        let mut items = vec![manifest_item];
        for name in ["sha256__image", "sha256__l1", "sha256__l2", "sha256__l3"] {
            items.push(result_item("docker-local", folder, name));
        }
        service.add_search_results(PROXYLESS_PATTERN, items);
        service.add_file("docker-local/hello-world/1.0/manifest.json", MANIFEST);
        service.add_file("docker-local/hello-world/1.0/sha256__image", CONFIG);

        let mut builder = BuildInfoBuilder::new_remote(
            Image::new(IMAGE),
            RepositoryDetails::new("docker-local"),
            build_details(),
            &service,
            "sha256:manifest",
        );
        builder.set_skip_tagging_layers(true);
        let build_info = builder.build(None)?;
        let module = &build_info.modules[0];
        assert_eq!(builder.image_id(), "sha256:image");
        assert_eq!(module.properties[IMAGE_ID_PROPERTY], "sha256:image");
        assert_eq!(module.artifacts.len(), 5);
        assert_eq!(module.dependencies.len(), 1);
        assert!(service.set_props_calls().is_empty());
        Ok(())
    }

    /// Manifest and layers are found but the config layer can't be downloaded.
    fn stored_image_without_config(service: &MockServiceManager, manifest_item: ResultItem) {
        let folder = "hello-world/1.0";
        let mut items = vec![manifest_item];
        for name in ["sha256__image", "sha256__l1", "sha256__l2", "sha256__l3"] {
            items.push(result_item("docker-local", folder, name));
        }
        service.add_search_results(PROXYLESS_PATTERN, items);
        service.add_file("docker-local/hello-world/1.0/manifest.json", MANIFEST);
    }

    #[test]
    fn local_failed_update_keeps_nothing() -> Result<()> {
        let service = MockServiceManager::default();
        stored_image_without_config(&service, result_item("docker-local", "hello-world/1.0", "manifest.json"));
        let mut builder = BuildInfoBuilder::new_local(
            Image::new(IMAGE),
            RepositoryDetails::new("docker-local"),
            build_details(),
            &service,
            CommandType::Push,
            local_manager(),
        )?;
        let err = builder.update_artifacts_and_dependencies().unwrap_err();
        assert!(format!("{:#}", err).contains("sha256__image"));
        assert!(builder.layers().is_empty());
        assert!(builder.build(None).is_err());
        assert!(service.set_props_calls().is_empty());
        Ok(())
    }

    #[test]
    fn remote_failed_update_gives_empty_build_info() -> Result<()> {
        let service = MockServiceManager::default();
        let mut manifest_item = result_item("docker-local", "hello-world/1.0", "manifest.json");
        manifest_item.properties.push(Property {
            key: MANIFEST_DIGEST_PROPERTY.into(),
            value: "sha256:manifest".into(),
        });
        stored_image_without_config(&service, manifest_item);
        let mut builder = BuildInfoBuilder::new_remote(
            Image::new(IMAGE),
            RepositoryDetails::new("docker-local"),
            build_details(),
            &service,
            "sha256:manifest",
        );
        assert!(builder.update_artifacts_and_dependencies().is_err());
        let build_info = builder.build(None)?;
        let module = &build_info.modules[0];
        assert!(module.artifacts.is_empty());
        assert!(module.dependencies.is_empty());
        assert!(!module.properties.contains_key(IMAGE_ID_PROPERTY));
        assert!(builder.image_id().is_empty());
        assert!(builder.layers().is_empty());
        Ok(())
    }

    #[test]
    fn virtual_repository_tags_default_deployment_layers_only() -> Result<()> {
        let service = MockServiceManager::default();
        service.add_repository(RepositoryConfig {
            key: "docker-virtual".into(),
            rclass: "virtual".into(),
            default_deployment_repo: "docker-local".into(),
        });
        let repository = RepositoryDetails::fetch("docker-virtual", &service)?;
        let folder = "hello-world/1.0";
        service.add_search_results(
            "docker-virtual/hello-world/1.0/*",
            vec![
                result_item("docker-local", folder, "manifest.json"),
                result_item("docker-local", folder, "sha256__image"),
                result_item("docker-base", folder, "sha256__l1"),
                result_item("docker-local", folder, "sha256__l2"),
                result_item("docker-local", folder, "sha256__l3"),
            ],
        );
        service.add_file("docker-virtual/hello-world/1.0/manifest.json", MANIFEST);
        service.add_file("docker-virtual/hello-world/1.0/sha256__image", CONFIG);
        let mut builder = BuildInfoBuilder::new_local(
            Image::new("localhost:8082/docker-virtual/hello-world:1.0"),
            repository,
            build_details(),
            &service,
            CommandType::Push,
            local_manager(),
        )?;
        builder.build(None)?;
        let set_props = service.set_props_calls();
        assert_eq!(set_props.len(), 1);
        assert_eq!(set_props[0].1.len(), 4);
        assert!(set_props[0].1.iter().all(|path| path.starts_with("docker-local/")));
        Ok(())
    }

    #[test]
    fn virtual_repository_without_deployment_layers_skips_tagging() -> Result<()> {
        let service = MockServiceManager::default();
        let repository = RepositoryDetails {
            key: "docker-virtual".into(),
            is_remote: false,
            repo_type: "virtual".into(),
            default_deployment_repo: "docker-dev".into(),
        };
        let mut builder = BuildInfoBuilder::new_remote(Image::new(IMAGE), repository, build_details(), &service, "");
        builder.layers = vec![result_item("docker-local", "hello-world/1.0", "sha256__l1")];
        builder.set_build_properties()?;
        assert!(service.set_props_calls().is_empty());
        Ok(())
    }

    #[test]
    fn remote_fat_manifest_creates_platform_modules() -> Result<()> {
        let service = MockServiceManager::default();
        let mut fat_item = result_item("docker-local", "multi/1.0", "list.manifest.json");
        fat_item.properties.push(Property {
            key: MANIFEST_DIGEST_PROPERTY.into(),
            value: "sha256:index".into(),
        });
        service.add_search_results("docker-local/multi/1.0/*", vec![fat_item]);
        service.add_file(
            "docker-local/multi/1.0/list.manifest.json",
            r#"{"manifests":[
                {"digest":"sha256:amd","platform":{"os":"linux","architecture":"amd64"}},
                {"digest":"sha256:att","platform":{"os":"unknown","architecture":"unknown"},
                 "annotations":{"vnd.docker.reference.type":"attestation-manifest"}}]}"#,
        );
        let mut amd_manifest = result_item("docker-local", "multi/sha256__amd", "manifest.json");
        amd_manifest.sha256 = "amd".into();
        let mut att_manifest = result_item("docker-local", "multi/sha256__att", "manifest.json");
        att_manifest.sha256 = "att".into();
        service.add_search_results(
            "docker-local/multi/*",
            vec![
                result_item("docker-local", "multi/1.0", "list.manifest.json"),
                amd_manifest,
                result_item("docker-local", "multi/sha256__amd", "sha256__l1"),
                att_manifest,
            ],
        );

        let mut builder = BuildInfoBuilder::new_remote(
            Image::new("localhost:8082/docker-local/multi:1.0"),
            RepositoryDetails::new("docker-local"),
            build_details(),
            &service,
            "sha256:index",
        );
        let build_info = builder.build(None)?;
        let ids = build_info.modules.iter().map(|m| m.id.as_str()).collect::<Vec<&str>>();
        assert_eq!(ids, vec!["multi:1.0", "linux/amd64/multi:1.0", "attestations/multi:1.0"]);

        let base = &build_info.modules[0];
        assert_eq!(base.artifacts.len(), 1);
        assert_eq!(base.artifacts[0].name, "list.manifest.json");
        assert!(!base.properties.contains_key(IMAGE_ID_PROPERTY));
        assert!(base.parent.is_none());

        let amd = &build_info.modules[1];
        assert_eq!(amd.parent.as_deref(), Some("multi:1.0"));
        assert_eq!(amd.artifacts.len(), 2);
        assert_eq!(build_info.modules[2].artifacts.len(), 1);

        assert_eq!(builder.layers().len(), 4);
        assert_eq!(service.set_props_calls()[0].1.len(), 4);
        Ok(())
    }
}
