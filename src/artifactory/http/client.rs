use std::time::Duration;

use anyhow::{Context, Result};
use bytes::Bytes;
use log::debug;
use reqwest::blocking::{Client, Response};
use reqwest::redirect::Policy;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::artifactory::aql::{build_search_query, AqlResponse};
use crate::artifactory::content::{ContentReader, ContentWriter};
use crate::artifactory::http::{do_request_raw, ContentType, HttpAuth};
use crate::artifactory::{RepositoryConfig, ResultItem, SearchParams, ServiceManager, SimpleResponse};
use crate::config::ServerDetails;
use crate::container::error::ContainerError;

pub struct ArtifactoryHttpClient {
    base_url: String,
    client: Client,
    auth: Option<HttpAuth>,
}

impl ArtifactoryHttpClient {
    pub fn new(server: &ServerDetails, insecure_tls: bool, conn_timeout: u64) -> Result<ArtifactoryHttpClient> {
        let client = reqwest::blocking::ClientBuilder::new()
            .timeout(Duration::from_secs(conn_timeout))
            .gzip(true)
            .connect_timeout(Duration::from_secs(10))
            .danger_accept_invalid_certs(insecure_tls)
            .deflate(true)
            .redirect(Policy::default())
            .build()?;
        let auth = if let Some(token) = server.access_token.as_ref().filter(|t| !t.is_empty()) {
            Some(HttpAuth::BearerToken { token: token.clone() })
        } else {
            server.user.as_ref().filter(|u| !u.is_empty()).map(|user| HttpAuth::BasicAuth {
                username: user.clone(),
                password: server.password.clone().unwrap_or_default(),
            })
        };
        Ok(ArtifactoryHttpClient {
            base_url: normalize_base_url(&server.url),
            client,
            auth,
        })
    }

    pub fn request_body<R: DeserializeOwned>(&self, request: ClientRequest) -> Result<R> {
        let success_response = self.request_full_response(request)?;
        success_response.json_body::<R>()
    }

    pub fn request_full_response(&self, request: ClientRequest) -> Result<FullResponse> {
        let url = self.url_of(request.path);
        let http_response = self.do_request_raw(&url, request)?;
        let response = FullResponse::new_response(http_response)?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(ContainerError::Transport {
                status: response.status_code().as_u16(),
                body: response.body_str(),
            })
            .with_context(|| format!("Request to {} failed", url))
        }
    }

    fn do_request_raw(&self, url: &str, request: ClientRequest) -> Result<Response> {
        debug!("{} {}", request.method, url);
        do_request_raw(
            &self.client,
            url,
            request.method,
            self.auth.as_ref(),
            request.accept,
            request.body,
            request.headers,
        )
    }

    /// Absolute urls pass through untouched, everything else is relative to the base url.
    fn url_of(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path.trim_start_matches('/'))
        }
    }
}

fn normalize_base_url(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{}/", url)
    }
}

#[derive(Deserialize)]
struct VersionResponse {
    version: String,
}

impl ServiceManager for ArtifactoryHttpClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn search_files(&self, params: &SearchParams) -> Result<ContentReader<ResultItem>> {
        let query = build_search_query(params);
        debug!("Searching Artifactory using AQL query: {}", query);
        let request = ClientRequest::new("api/search/aql", Method::POST, Some(query.as_str()));
        let response = self.request_body::<AqlResponse>(request)?;
        let mut writer = ContentWriter::new()?;
        for item in response.results.iter().filter(|item| item.item_type != "folder") {
            writer.write(item)?;
        }
        writer.close()
    }

    fn set_props(&self, props: &str, items: ContentReader<ResultItem>) -> Result<usize> {
        let mut updated = 0;
        for item in items {
            let item = item?;
            let mut url = Url::parse(&self.url_of(&format!("api/storage/{}", item.relative_path())))?;
            url.query_pairs_mut().append_pair("properties", props).append_pair("recursive", "0");
            debug!("Setting properties on {}", item.relative_path());
            let request = ClientRequest::new(url.as_str(), Method::PUT, None);
            self.request_full_response(request)?;
            updated += 1;
        }
        Ok(updated)
    }

    fn get_version(&self) -> Result<String> {
        let request = ClientRequest::new_get_request("api/system/version", &ContentType::JSON);
        let response = self.request_body::<VersionResponse>(request)?;
        Ok(response.version)
    }

    fn send_head(&self, url: &str, headers: &[(&str, &str)]) -> Result<SimpleResponse> {
        let request = ClientRequest::new_head_request(url, headers);
        let url = self.url_of(url);
        let response = self.do_request_raw(&url, request)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes()?;
        Ok(SimpleResponse { status, headers, body })
    }

    fn read_remote_file(&self, relative_path: &str) -> Result<Bytes> {
        let request = ClientRequest::new_get_request(relative_path, &ContentType::ALL);
        let response = self.request_full_response(request)?;
        Ok(response.body_bytes)
    }

    fn get_repository(&self, key: &str) -> Result<RepositoryConfig> {
        let path = format!("api/repositories/{}", key);
        let request = ClientRequest::new_get_request(&path, &ContentType::JSON);
        self.request_body::<RepositoryConfig>(request)
            .with_context(|| format!("Failed to read the configuration of repository '{}'", key))
    }
}

pub struct FullResponse {
    body_bytes: Bytes,
    http_status: StatusCode,
}

impl FullResponse {
    pub fn new_response(http_response: Response) -> Result<FullResponse> {
        let code = http_response.status();
        let body_bytes = http_response.bytes()?;
        Ok(FullResponse {
            body_bytes,
            http_status: code,
        })
    }

    pub fn is_success(&self) -> bool {
        self.status_code().is_success()
    }

    pub fn status_code(&self) -> &StatusCode {
        &self.http_status
    }

    pub fn body_str(&self) -> String {
        String::from_utf8_lossy(&self.body_bytes[..]).into()
    }

    pub fn json_body<R: DeserializeOwned>(&self) -> Result<R> {
        let json_result = serde_json::from_slice::<R>(self.body_bytes.as_ref());
        Ok(json_result?)
    }
}

pub struct ClientRequest<'a> {
    path: &'a str,
    method: Method,
    accept: Option<&'a ContentType>,
    body: Option<&'a str>,
    headers: &'a [(&'a str, &'a str)],
}

impl<'a> ClientRequest<'a> {
    pub fn new(path: &'a str, method: Method, body: Option<&'a str>) -> ClientRequest<'a> {
        ClientRequest {
            path,
            method,
            accept: Some(&ContentType::JSON),
            body,
            headers: &[],
        }
    }

    pub fn new_head_request(path: &'a str, headers: &'a [(&'a str, &'a str)]) -> ClientRequest<'a> {
        ClientRequest {
            path,
            method: Method::HEAD,
            accept: None,
            body: None,
            headers,
        }
    }

    pub fn new_get_request(path: &'a str, accept: &'a ContentType) -> ClientRequest<'a> {
        ClientRequest {
            path,
            method: Method::GET,
            accept: Some(accept),
            body: None,
            headers: &[],
        }
    }
}
