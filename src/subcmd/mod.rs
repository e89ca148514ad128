use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use log::{debug, info, warn};

use crate::artifactory::http::client::ArtifactoryHttpClient;
use crate::artifactory::ServiceManager;
use crate::buildinfo::{BuildDetails, BuildInfo};
use crate::config::cmd::{BuildArgs, ServerArgs};
use crate::config::ServerDetails;
use crate::container::image::Image;
use crate::container::RepositoryDetails;
use crate::util::version::validate_minimum_version;

pub mod build_create;
pub mod docker;

/// Since this version Artifactory tells which repository serves an image.
pub const MIN_RT_VERSION_FOR_REPO_FETCHING: &str = "7.33.3";

fn create_service(server: &ServerArgs) -> Result<ArtifactoryHttpClient> {
    let details = ServerDetails::load(server)?;
    debug!("Using Artifactory at {}", details.url);
    ArtifactoryHttpClient::new(&details, server.insecure_tls, server.conn_timeout)
}

/// Build name and number go together. `None` when build-info should not be collected.
fn build_details(args: &BuildArgs) -> Result<Option<BuildDetails>> {
    match (&args.build_name, &args.build_number) {
        (None, None) => Ok(None),
        (Some(name), Some(number)) => Ok(Some(BuildDetails::new(name.clone(), number.clone(), args.project.clone()))),
        _ => Err(anyhow!("Both --build-name and --build-number are required to collect build-info")),
    }
}

/// The Artifactory repository holding the image, asked from Artifactory unless given.
fn resolve_repository(image: &Image, repo: Option<&str>, service: &dyn ServiceManager) -> Result<RepositoryDetails> {
    let key = match repo {
        Some(repo) => repo.to_string(),
        None => {
            let version = service.get_version()?;
            validate_minimum_version("Artifactory", &version, MIN_RT_VERSION_FOR_REPO_FETCHING).with_context(|| {
                format!(
                    "Collecting docker build-info without --repo requires Artifactory version {} or higher",
                    MIN_RT_VERSION_FOR_REPO_FETCHING
                )
            })?;
            image.remote_repo(service)?
        }
    };
    info!("Image {} is stored in repository {}", image.tag().green(), key.green());
    match RepositoryDetails::fetch(&key, service) {
        Ok(repository) => Ok(repository),
        Err(err) => {
            warn!("Couldn't read the configuration of repository '{}', assuming a local repository: {:#}", key, err);
            Ok(RepositoryDetails::new(&key))
        }
    }
}

fn save_build_info(build_info: &BuildInfo, output: Option<&Path>) -> Result<()> {
    let content = serde_json::to_string_pretty(build_info)?;
    match output {
        Some(path) => {
            fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Build-info saved to {}", path.display().to_string().green());
        }
        None => println!("{}", content),
    }
    Ok(())
}
