use std::fmt::{Display, Formatter};
use std::process::{Command, Stdio};
use std::str::FromStr;

use anyhow::{anyhow, Error, Result};
use log::{debug, error};
use regex::Regex;

use crate::container::image::Image;
use crate::util::version::validate_minimum_version;

/// Docker API 1.31 shipped with Docker 17.07.0.
pub const MIN_SUPPORTED_API_VERSION: &str = "1.31";
const API_VERSION_PATTERN: &str = r"^(\d+)\.(\d+)$";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerManagerType {
    DockerClient,
    Podman,
}

impl Display for ContainerManagerType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ContainerManagerType::DockerClient => "docker".fmt(f),
            ContainerManagerType::Podman => "podman".fmt(f),
        }
    }
}

impl FromStr for ContainerManagerType {
    type Err = Error;

    fn from_str(arg: &str) -> Result<Self, Self::Err> {
        Ok(match arg {
            "docker" => ContainerManagerType::DockerClient,
            "podman" => ContainerManagerType::Podman,
            _ => return Err(anyhow!("unknown container manager: {}", arg)),
        })
    }
}

/// The local container tool the image was pushed or pulled with.
pub trait ContainerManager {
    /// Image id, the sha256 digest of the image config.
    fn id(&self, image: &Image) -> Result<String>;

    /// `(os, architecture)` the image was built for.
    fn os_compatibility(&self, image: &Image) -> Result<(String, String)>;

    fn run_native_cmd(&self, args: &[String]) -> Result<()>;

    fn manager_type(&self) -> ContainerManagerType;

    fn push(&self, image: &Image) -> Result<()> {
        self.run_native_cmd(&["push".to_string(), image.tag().to_string()])
    }

    fn pull(&self, image: &Image) -> Result<()> {
        self.run_native_cmd(&["pull".to_string(), image.tag().to_string()])
    }
}

/// Runs the `docker`/`podman` executable.
pub struct CliContainerManager {
    manager_type: ContainerManagerType,
}

impl CliContainerManager {
    pub fn new(manager_type: ContainerManagerType) -> CliContainerManager {
        CliContainerManager { manager_type }
    }

    fn command(&self) -> Command {
        let mut command = Command::new(self.manager_type.to_string());
        if self.manager_type == ContainerManagerType::DockerClient {
            command.env("DOCKER_SCAN_SUGGEST", "false");
        }
        command
    }

    /// Run a command and collect stdout and stderr together.
    fn output(&self, args: &[&str]) -> Result<String> {
        debug!("Running {} {}", self.manager_type, args.join(" "));
        let output = self.command().args(args).output()?;
        let mut content = String::from_utf8_lossy(&output.stdout).to_string();
        content.push_str(&String::from_utf8_lossy(&output.stderr));
        if !output.status.success() {
            return Err(anyhow!("{} {} failed: {}", self.manager_type, args.join(" "), content.trim()));
        }
        Ok(content)
    }
}

impl ContainerManager for CliContainerManager {
    fn id(&self, image: &Image) -> Result<String> {
        let content = self.output(&["images", "--format", "{{.ID}}", "--no-trunc", image.tag()])?;
        let id = content.lines().next().unwrap_or_default().trim().to_string();
        if id.is_empty() {
            return Err(anyhow!("Couldn't find the id of image '{}' in the local {} daemon", image, self.manager_type));
        }
        Ok(id)
    }

    fn os_compatibility(&self, image: &Image) -> Result<(String, String)> {
        debug!("Running image inspect...");
        let content = self.output(&["image", "inspect", image.tag(), "--format", "{{ .Os}},{{ .Architecture}}"])?;
        parse_os_compatibility(&content)
            .ok_or_else(|| anyhow!("Couldn't find OS and architecture of image: {}", image))
    }

    fn run_native_cmd(&self, args: &[String]) -> Result<()> {
        debug!("Running {} {}", self.manager_type, args.join(" "));
        let status = self.command().args(args).stdout(Stdio::inherit()).stderr(Stdio::inherit()).status()?;
        if !status.success() {
            return Err(anyhow!("{} {} exited with {}", self.manager_type, args.join(" "), status));
        }
        Ok(())
    }

    fn manager_type(&self) -> ContainerManagerType {
        self.manager_type
    }
}

/// Split `linux,amd64` at the first comma.
pub fn parse_os_compatibility(content: &str) -> Option<(String, String)> {
    let content = content.trim_matches('\n');
    let (os, arch) = content.split_once(',')?;
    Some((os.to_string(), arch.to_string()))
}

pub fn is_api_version(content: &str) -> Result<bool> {
    Ok(Regex::new(API_VERSION_PATTERN)?.is_match(content))
}

/// Fail unless the local docker client speaks at least API version 1.31.
pub fn validate_client_api_version() -> Result<()> {
    // 'docker version' exits with 1 when the daemon is unreachable, the client version is still printed.
    let output = Command::new("docker").args(["version", "--format", "{{.Client.APIVersion}}"]).output()?;
    let content = String::from_utf8_lossy(&output.stdout).trim().to_string();
    check_api_version(&content)
}

fn check_api_version(content: &str) -> Result<()> {
    if !is_api_version(content)? {
        error!("The Docker client Api version is expected to be 'major.minor'. The actual output is: {}", content);
        return Err(anyhow!("Unexpected Docker client API version '{}'", content));
    }
    validate_minimum_version("Docker API", content, MIN_SUPPORTED_API_VERSION)
}
