use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use log::{debug, info};
use serde::Deserialize;

use crate::config::cmd::BuildDockerCreateArgs;
use crate::container::builder::BuildInfoBuilder;
use crate::container::image::Image;
use crate::container::{digest_hex, RepositoryDetails};
use crate::subcmd::{build_details, create_service, save_build_info};

/// Metadata file written by `docker buildx build --metadata-file`.
#[derive(Deserialize, Debug, Default)]
struct BuildxMetadata {
    #[serde(rename = "image.name", default)]
    image_name: String,
    #[serde(rename = "containerimage.digest", default)]
    image_sha256: String,
}

/// Build-info of an image pushed by a remote agent.
pub struct BuildDockerCreateCommand {}

impl BuildDockerCreateCommand {
    pub fn run(args: &BuildDockerCreateArgs) -> Result<()> {
        let build = build_details(&args.build)?
            .ok_or_else(|| anyhow!("build-docker-create requires --build-name and --build-number"))?;
        let (image, manifest_sha256) = read_image_tag_with_digest(&args.image_file)?;
        info!("Collecting build-info of {} ({})", image.tag().green(), manifest_sha256);
        let service = create_service(&args.server)?;
        let repository = match RepositoryDetails::fetch(&args.repo, &service) {
            Ok(repository) => repository,
            Err(err) => {
                debug!("Couldn't read the configuration of repository '{}': {:#}", args.repo, err);
                RepositoryDetails::new(&args.repo)
            }
        };
        let mut builder = BuildInfoBuilder::new_remote(image, repository, build, &service, &manifest_sha256);
        builder.set_skip_tagging_layers(args.build.skip_tagging_layers);
        let build_info = builder.build(args.build.module.as_deref())?;
        save_build_info(&build_info, args.build.output.as_deref())
    }
}

/// Image tag and manifest digest from a buildx metadata file or a kaniko/oc `tag@sha256:...` file.
pub fn read_image_tag_with_digest(path: &Path) -> Result<(Image, String)> {
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    parse_image_tag_with_digest(&content)
        .with_context(|| format!("Unexpected content in the image file \"{}\"", path.display()))
}

fn parse_image_tag_with_digest(content: &str) -> Result<(Image, String)> {
    match serde_json::from_str::<BuildxMetadata>(content) {
        Ok(metadata) if !metadata.image_name.is_empty() && !metadata.image_sha256.is_empty() => {
            // buildx lists every pushed tag, separated by commas.
            let tag = metadata.image_name.split(',').next().unwrap_or_default().trim();
            digest_hex(&metadata.image_sha256)?;
            return Ok((Image::new(tag), metadata.image_sha256));
        }
        Ok(_) => debug!("The image file is not a buildx metadata file"),
        Err(err) => debug!("Failed parsing buildx metadata: {}. Falling back to the kaniko/oc format", err),
    }
    let (tag, sha256) = content
        .split_once('@')
        .filter(|(_, sha256)| !sha256.contains('@'))
        .ok_or_else(|| anyhow!("The file should include one line in the following format: image-tag@sha256"))?;
    let sha256 = sha256.trim_matches('\n');
    if tag.is_empty() || sha256.is_empty() {
        return Err(anyhow!("Missing image-tag/sha256"));
    }
    digest_hex(sha256)?;
    Ok((Image::new(tag), sha256.to_string()))
}
