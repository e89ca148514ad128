use std::fs::File;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use home::home_dir;
use log::debug;
use serde::Deserialize;

use crate::config::cmd::ServerArgs;

pub mod cmd;

const DEFAULT_SERVER_CONFIG: &str = ".jfrog/rt-server.json";

/// Artifactory server URL and credentials.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServerDetails {
    pub url: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
}

impl ServerDetails {
    /// Server details from the config file, overridden by the values given on the command line.
    pub fn load(args: &ServerArgs) -> Result<ServerDetails> {
        let config_path = match &args.server_config {
            Some(path) => Some(path.clone()),
            None => home_dir().map(|dir| dir.join(DEFAULT_SERVER_CONFIG)).filter(|path| path.is_file()),
        };
        let from_file = match config_path {
            Some(path) => read_server_config(&path)?,
            None => ServerDetails::default(),
        };
        let details = from_file.merge(args);
        if details.url.is_empty() {
            return Err(anyhow!(
                "The Artifactory URL is missing. Use --url or --server-config, or create ~/{}",
                DEFAULT_SERVER_CONFIG
            ));
        }
        Ok(details)
    }

    fn merge(self, args: &ServerArgs) -> ServerDetails {
        ServerDetails {
            url: args.url.clone().unwrap_or(self.url),
            user: args.user.clone().or(self.user),
            password: args.password.clone().or(self.password),
            access_token: args.access_token.clone().or(self.access_token),
        }
    }
}

fn read_server_config(path: &Path) -> Result<ServerDetails> {
    debug!("Reading server details from {}", path.display());
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    serde_json::from_reader::<_, ServerDetails>(file).with_context(|| format!("Failed to parse {}", path.display()))
}
