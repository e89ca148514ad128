use std::collections::BTreeMap;

use chrono::{DateTime, Local};
use serde::Deserialize;
use serde::Serialize;

pub const BUILD_INFO_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%z";

/// Build name, number and optional project of the build an image belongs to.
#[derive(Debug, Clone)]
pub struct BuildDetails {
    pub name: String,
    pub number: String,
    pub project: String,
    pub started: DateTime<Local>,
}

impl BuildDetails {
    pub fn new(name: String, number: String, project: Option<String>) -> BuildDetails {
        BuildDetails {
            name,
            number,
            project: project.unwrap_or_default(),
            started: Local::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty() || self.number.is_empty()
    }

    /// Properties written on the artifacts of the build, `key=value` pairs joined by `;`.
    pub fn props(&self) -> String {
        let mut props = format!(
            "build.name={};build.number={};build.timestamp={}",
            self.name,
            self.number,
            self.started.timestamp_millis()
        );
        if !self.project.is_empty() {
            props.push_str(";build.project=");
            props.push_str(&self.project);
        }
        props
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub started: String,
    #[serde(default)]
    pub modules: Vec<Module>,
}

impl BuildInfo {
    pub fn new(modules: Vec<Module>) -> BuildInfo {
        BuildInfo {
            modules,
            ..Default::default()
        }
    }

    pub fn set_build_details(&mut self, details: &BuildDetails) {
        self.name = details.name.clone();
        self.number = details.number.clone();
        self.project = if details.project.is_empty() { None } else { Some(details.project.clone()) };
        self.started = details.started.format(BUILD_INFO_TIME_FORMAT).to_string();
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModuleType {
    #[default]
    Docker,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub id: String,
    #[serde(rename = "type")]
    pub module_type: ModuleType,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<Artifact>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Dependency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Checksum {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sha1: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sha256: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub md5: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub artifact_type: String,
    #[serde(flatten)]
    pub checksum: Checksum,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub original_deployment_repo: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Dependency {
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub dependency_type: String,
    #[serde(flatten)]
    pub checksum: Checksum,
}
