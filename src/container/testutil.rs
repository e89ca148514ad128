use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

use anyhow::{anyhow, Result};
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;

use crate::artifactory::content::ContentReader;
use crate::artifactory::{RepositoryConfig, ResultItem, SearchParams, ServiceManager, SimpleResponse};
use crate::container::error::ContainerError;
use crate::container::image::Image;
use crate::container::manager::{ContainerManager, ContainerManagerType};

pub fn result_item(repo: &str, path: &str, name: &str) -> ResultItem {
    ResultItem {
        repo: repo.to_string(),
        path: path.to_string(),
        name: name.to_string(),
        item_type: "file".to_string(),
        size: 1,
        actual_md5: format!("md5-{}", name),
        actual_sha1: format!("sha1-{}", name),
        ..Default::default()
    }
}

/// In memory Artifactory. Search responses are queued per pattern, the last one keeps answering.
pub struct MockServiceManager {
    base_url: String,
    version: String,
    searches: RefCell<HashMap<String, VecDeque<Vec<ResultItem>>>>,
    files: RefCell<HashMap<String, Bytes>>,
    heads: RefCell<HashMap<String, (StatusCode, HeaderMap)>>,
    repositories: RefCell<HashMap<String, RepositoryConfig>>,
    search_calls: RefCell<Vec<String>>,
    head_calls: RefCell<Vec<String>>,
    set_props_calls: RefCell<Vec<(String, Vec<String>)>>,
}

impl Default for MockServiceManager {
    fn default() -> Self {
        MockServiceManager {
            base_url: "https://acme.jfrog.io/artifactory/".to_string(),
            version: "7.77.3".to_string(),
            searches: Default::default(),
            files: Default::default(),
            heads: Default::default(),
            repositories: Default::default(),
            search_calls: Default::default(),
            head_calls: Default::default(),
            set_props_calls: Default::default(),
        }
    }
}

impl MockServiceManager {
    pub fn with_version(version: &str) -> MockServiceManager {
        MockServiceManager {
            version: version.to_string(),
            ..Default::default()
        }
    }

    pub fn add_search_results(&self, pattern: &str, items: Vec<ResultItem>) {
        self.searches.borrow_mut().entry(pattern.to_string()).or_default().push_back(items);
    }

    pub fn add_file(&self, relative_path: &str, content: &str) {
        self.files.borrow_mut().insert(relative_path.to_string(), Bytes::from(content.to_string()));
    }

    pub fn add_head_status(&self, url: &str, status: StatusCode) {
        self.add_head_response(url, status, HeaderMap::new());
    }

    pub fn add_head_response(&self, url: &str, status: StatusCode, headers: HeaderMap) {
        self.heads.borrow_mut().insert(url.to_string(), (status, headers));
    }

    pub fn add_repository(&self, config: RepositoryConfig) {
        self.repositories.borrow_mut().insert(config.key.clone(), config);
    }

    pub fn search_calls(&self) -> Vec<String> {
        self.search_calls.borrow().clone()
    }

    pub fn head_calls(&self) -> Vec<String> {
        self.head_calls.borrow().clone()
    }

    pub fn set_props_calls(&self) -> Vec<(String, Vec<String>)> {
        self.set_props_calls.borrow().clone()
    }
}

impl ServiceManager for MockServiceManager {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn search_files(&self, params: &SearchParams) -> Result<ContentReader<ResultItem>> {
        self.search_calls.borrow_mut().push(params.pattern.clone());
        let mut searches = self.searches.borrow_mut();
        let items = match searches.get_mut(&params.pattern) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_default(),
            Some(queue) => queue.front().cloned().unwrap_or_default(),
            None => Vec::new(),
        };
        ContentReader::from_items(items)
    }

    fn set_props(&self, props: &str, items: ContentReader<ResultItem>) -> Result<usize> {
        let paths = items.map(|item| item.map(|i| i.relative_path())).collect::<Result<Vec<String>>>()?;
        let total = paths.len();
        self.set_props_calls.borrow_mut().push((props.to_string(), paths));
        Ok(total)
    }

    fn get_version(&self) -> Result<String> {
        Ok(self.version.clone())
    }

    fn send_head(&self, url: &str, _headers: &[(&str, &str)]) -> Result<SimpleResponse> {
        self.head_calls.borrow_mut().push(url.to_string());
        let (status, headers) = self
            .heads
            .borrow()
            .get(url)
            .cloned()
            .unwrap_or((StatusCode::NOT_FOUND, HeaderMap::new()));
        Ok(SimpleResponse {
            status,
            headers,
            body: Bytes::new(),
        })
    }

    fn read_remote_file(&self, relative_path: &str) -> Result<Bytes> {
        self.files.borrow().get(relative_path).cloned().ok_or_else(|| {
            ContainerError::Transport {
                status: 404,
                body: format!("{} not found", relative_path),
            }
            .into()
        })
    }

    fn get_repository(&self, key: &str) -> Result<RepositoryConfig> {
        self.repositories
            .borrow()
            .get(key)
            .cloned()
            .ok_or_else(|| anyhow!("Repository '{}' does not exist", key))
    }
}

pub struct MockContainerManager {
    id: String,
    os: String,
    arch: String,
    commands: RefCell<Vec<Vec<String>>>,
}

impl MockContainerManager {
    pub fn new(id: &str, os: &str, arch: &str) -> MockContainerManager {
        MockContainerManager {
            id: id.to_string(),
            os: os.to_string(),
            arch: arch.to_string(),
            commands: RefCell::new(Vec::new()),
        }
    }
}

impl ContainerManager for MockContainerManager {
    fn id(&self, _image: &Image) -> Result<String> {
        Ok(self.id.clone())
    }

    fn os_compatibility(&self, _image: &Image) -> Result<(String, String)> {
        Ok((self.os.clone(), self.arch.clone()))
    }

    fn run_native_cmd(&self, args: &[String]) -> Result<()> {
        self.commands.borrow_mut().push(args.to_vec());
        Ok(())
    }

    fn manager_type(&self) -> ContainerManagerType {
        ContainerManagerType::DockerClient
    }
}

#[test]
fn mock_container_manager_records_push() -> Result<()> {
    let manager = MockContainerManager::new("sha256:image", "linux", "amd64");
    manager.push(&Image::new("acme.jfrog.io/docker-local/hello-world:1.0"))?;
    assert_eq!(
        manager.commands.borrow().as_slice(),
        &[vec!["push".to_string(), "acme.jfrog.io/docker-local/hello-world:1.0".to_string()]]
    );
    Ok(())
}
