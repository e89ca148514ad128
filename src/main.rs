use anyhow::Result;
use clap::Parser;

use crate::config::cmd::CmdArgs;
use crate::subcmd::build_create::BuildDockerCreateCommand;
use crate::subcmd::docker::DockerCommand;

mod artifactory;
mod buildinfo;
mod config;
mod container;
mod init;
mod subcmd;
mod util;

fn main() -> Result<()> {
    init::init()?;
    match CmdArgs::parse() {
        CmdArgs::DockerPush(args) => DockerCommand::push(&args),
        CmdArgs::DockerPull(args) => DockerCommand::pull(&args),
        CmdArgs::BuildDockerCreate(args) => BuildDockerCreateCommand::run(&args),
    }
}
