use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Parser;

use crate::container::manager::ContainerManagerType;

#[derive(Parser)]
#[command(about = "Collect docker build-info from Artifactory", version)]
pub enum CmdArgs {
    /// Push an image with docker/podman and collect its build-info
    DockerPush(DockerCmdArgs),
    /// Pull an image with docker/podman and collect its build-info
    DockerPull(DockerCmdArgs),
    /// Collect the build-info of an image pushed by kaniko, oc or buildx
    BuildDockerCreate(BuildDockerCreateArgs),
}

#[derive(clap::Args)]
pub struct DockerCmdArgs {
    /// Image tag. Example:'acme.jfrog.io/docker-local/hello-world:1.0'
    pub image_tag: String,

    /// [OPTION] Artifactory repository of the image. Detected from the registry when missing.
    #[arg(long)]
    pub repo: Option<String>,

    /// [OPTION] 'docker' or 'podman'
    #[arg(long, default_value = "docker")]
    pub container_manager: ContainerManagerType,

    #[command(flatten)]
    pub server: ServerArgs,

    #[command(flatten)]
    pub build: BuildArgs,
}

#[derive(clap::Args)]
pub struct BuildDockerCreateArgs {
    /// Artifactory repository the image was pushed to
    pub repo: String,

    /// File written by the build tool: 'tag@sha256:...' (kaniko, oc) or the buildx metadata JSON
    #[arg(long)]
    pub image_file: PathBuf,

    #[command(flatten)]
    pub server: ServerArgs,

    #[command(flatten)]
    pub build: BuildArgs,
}

#[derive(clap::Args, Default)]
pub struct ServerArgs {
    /// [OPTION] Artifactory URL. Example:'https://acme.jfrog.io/artifactory/'
    #[arg(long)]
    pub url: Option<String>,

    /// [OPTION] Example:'myname','${RT_USER}'
    #[arg(long, value_parser = value_or_env)]
    pub user: Option<String>,

    /// [OPTION] Example:'mypass','${RT_PASSWORD}'
    #[arg(long, value_parser = value_or_env)]
    pub password: Option<String>,

    /// [OPTION] Example:'${RT_ACCESS_TOKEN}'
    #[arg(long, value_parser = value_or_env)]
    pub access_token: Option<String>,

    /// [OPTION] JSON file with the server details. Default: '~/.jfrog/rt-server.json'
    #[arg(long)]
    pub server_config: Option<PathBuf>,

    /// Skip TLS certificates verification
    #[arg(long)]
    pub insecure_tls: bool,

    /// [OPTION] Connection timeout in seconds.
    #[arg(long, default_value = "600")]
    pub conn_timeout: u64,
}

#[derive(clap::Args, Default)]
pub struct BuildArgs {
    /// [OPTION] Build name
    #[arg(long)]
    pub build_name: Option<String>,

    /// [OPTION] Build number
    #[arg(long)]
    pub build_number: Option<String>,

    /// [OPTION] Artifactory project key
    #[arg(long)]
    pub project: Option<String>,

    /// [OPTION] Module id. Default: image name with tag
    #[arg(long)]
    pub module: Option<String>,

    /// Don't set the build properties on the image layers
    #[arg(long)]
    pub skip_tagging_layers: bool,

    /// [OPTION] Write the build-info to this file instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,
}

/// `${NAME}` is replaced by the value of the environment variable `NAME`.
pub fn value_or_env(param: &str) -> Result<String> {
    if param.starts_with("${") && param.ends_with('}') {
        let name = &param[2..param.len() - 1];
        return env::var(name).map_err(|_| anyhow!("environment variable '{}' is not set", name));
    }
    Ok(param.to_string())
}
