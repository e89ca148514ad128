use std::collections::{BTreeMap, HashMap};

use anyhow::{anyhow, Context, Result};
use log::debug;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::artifactory::{ResultItem, SearchParams, ServiceManager};
use crate::container::error::ContainerError;
use crate::container::image::Image;
use crate::container::manifest::to_none_marker_layer;
use crate::container::{RepositoryDetails, MANIFEST_JSON_FILE, MARKER_LAYER_SUFFIX};
use crate::util::join_path;
use crate::util::sha::bytes_sha256;

/// Search results of one folder, keyed by file name.
pub type SearchResults = HashMap<String, ResultItem>;

pub fn perform_search(pattern: &str, service: &dyn ServiceManager) -> Result<SearchResults> {
    let reader = service.search_files(&SearchParams::new(pattern))?;
    let mut results = SearchResults::with_capacity(reader.len());
    for item in reader {
        let item = item?;
        results.insert(item.name.clone(), item);
    }
    Ok(results)
}

/// Recursive search below `pattern`, grouping the items of every folder that holds a manifest
/// under that manifest's digest (`sha256:<hex>`).
pub fn perform_multi_platform_image_search(
    pattern: &str,
    service: &dyn ServiceManager,
) -> Result<HashMap<String, Vec<ResultItem>>> {
    let reader = service.search_files(&SearchParams::new(pattern).recursive(true))?;
    let mut path_to_digest = HashMap::new();
    let mut path_to_items: HashMap<String, Vec<ResultItem>> = HashMap::new();
    for item in reader {
        let item = item?;
        if item.name == MANIFEST_JSON_FILE {
            path_to_digest.insert(item.path.clone(), format!("sha256:{}", item.sha256));
        }
        path_to_items.entry(item.path.clone()).or_default().push(item);
    }
    let mut results: HashMap<String, Vec<ResultItem>> = HashMap::new();
    for (path, digest) in path_to_digest {
        if let Some(items) = path_to_items.remove(&path) {
            results.entry(digest).or_default().extend(items);
        }
    }
    Ok(results)
}

/// Artifactory leaves `.marker` files in a remote repository's cache for layers the client already
/// had. Ask the remote repository for each of them so the real layer gets cached.
/// Returns the number of layers downloaded; the first failure aborts.
pub fn download_marker_layers_to_remote_cache(
    results: &SearchResults,
    repository: &RepositoryDetails,
    image: &Image,
    service: &dyn ServiceManager,
) -> Result<usize> {
    if !repository.is_remote || results.is_empty() {
        return Ok(0);
    }
    let markers = results
        .iter()
        .filter(|(name, _)| name.ends_with(MARKER_LAYER_SUFFIX))
        .collect::<BTreeMap<&String, &ResultItem>>();
    let mut total_downloaded = 0;
    for (name, item) in markers {
        debug!("Downloading {} layer into remote repository cache...", name);
        let image_name = match item.path.rfind('/') {
            Some(index) => item.path[..index].to_string(),
            None => image.long_name()?.to_string(),
        };
        let url = format!(
            "{}api/docker/{}/v2/{}/blobs/{}",
            service.base_url(),
            repository.key,
            image_name,
            to_none_marker_layer(name)
        );
        let response = service.send_head(&url, &[])?;
        if response.status != StatusCode::OK {
            return Err(ContainerError::MarkerMaterialization {
                layer: name.clone(),
                status: response.status.as_u16(),
                body: response.body_str(),
            }
            .into());
        }
        total_downloaded += 1;
    }
    Ok(total_downloaded)
}

/// Download and parse a JSON file found by a search. The item is read through `repo` rather than
/// the repository it was found in, since expired remote cache entries are only served by the
/// remote repository itself.
pub fn download_layer<T: DeserializeOwned>(item: &ResultItem, repo: &str, service: &dyn ServiceManager) -> Result<T> {
    let relative_path = join_path(&[repo, &item.path, &item.name]);
    debug!("Downloading {}", relative_path);
    let body = service
        .read_remote_file(&relative_path)
        .with_context(|| format!("Failed to download {}", relative_path))?;
    if !item.sha256.is_empty() {
        let actual = bytes_sha256(&body);
        if actual != item.sha256 {
            return Err(anyhow!(
                "Checksum mismatch for {}: expected sha256 {}, got {}",
                relative_path,
                item.sha256,
                actual
            ));
        }
    }
    serde_json::from_slice::<T>(&body).with_context(|| format!("Failed to parse {}", relative_path))
}
