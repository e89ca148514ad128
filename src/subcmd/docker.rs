use anyhow::Result;
use colored::Colorize;
use log::info;

use crate::config::cmd::DockerCmdArgs;
use crate::container::builder::BuildInfoBuilder;
use crate::container::image::Image;
use crate::container::manager::{validate_client_api_version, CliContainerManager, ContainerManager, ContainerManagerType};
use crate::container::CommandType;
use crate::subcmd::{build_details, create_service, resolve_repository, save_build_info};

/// `docker push`/`docker pull` followed by build-info collection.
pub struct DockerCommand {}

impl DockerCommand {
    pub fn push(args: &DockerCmdArgs) -> Result<()> {
        run(args, CommandType::Push)
    }

    pub fn pull(args: &DockerCmdArgs) -> Result<()> {
        run(args, CommandType::Pull)
    }
}

fn run(args: &DockerCmdArgs, command_type: CommandType) -> Result<()> {
    let image = Image::new(&args.image_tag);
    image.validate()?;
    let build = build_details(&args.build)?;
    if args.container_manager == ContainerManagerType::DockerClient {
        validate_client_api_version()?;
    }
    let manager: Box<dyn ContainerManager> = Box::new(CliContainerManager::new(args.container_manager));
    info!("Running {} {} {}", manager.manager_type(), command_type, image.tag().green());
    match command_type {
        CommandType::Push => manager.push(&image)?,
        CommandType::Pull => manager.pull(&image)?,
    }

    let build = match build {
        Some(build) => build,
        None => {
            info!("No build name and number given, skipping build-info collection");
            return Ok(());
        }
    };
    let service = create_service(&args.server)?;
    let repository = resolve_repository(&image, args.repo.as_deref(), &service)?;
    let mut builder = BuildInfoBuilder::new_local(image, repository, build, &service, command_type, manager)?;
    builder.set_skip_tagging_layers(args.build.skip_tagging_layers);
    let build_info = builder.build(args.build.module.as_deref())?;
    save_build_info(&build_info, args.build.output.as_deref())
}
