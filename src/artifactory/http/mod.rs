use std::str::FromStr;

use anyhow::Result;
use reqwest::blocking::{Client, Request, Response};
use reqwest::header::HeaderMap;
use reqwest::Method;
use url::Url;

pub mod client;

#[derive(Clone, Debug)]
pub enum HttpAuth {
    BasicAuth { username: String, password: String },
    BearerToken { token: String },
}

pub struct ContentType(&'static str);

impl ContentType {
    pub const JSON: Self = Self("application/json");
    pub const TEXT: Self = Self("text/plain");
    pub const ALL: Self = Self("*/*");

    pub fn val(&self) -> &'static str {
        self.0
    }
}

pub(crate) fn do_request_raw(
    client: &Client,
    url: &str,
    method: Method,
    http_auth_opt: Option<&HttpAuth>,
    accept: Option<&ContentType>,
    text_body: Option<&str>,
    headers: &[(&str, &str)],
) -> Result<Response> {
    let request = build_request(client, url, method, http_auth_opt, accept, text_body, headers)?;
    let http_response = client.execute(request)?;
    Ok(http_response)
}

fn build_request(
    client: &Client,
    url: &str,
    method: Method,
    http_auth_opt: Option<&HttpAuth>,
    accept: Option<&ContentType>,
    text_body: Option<&str>,
    headers: &[(&str, &str)],
) -> Result<Request> {
    let url = Url::from_str(url)?;
    let mut builder = client.request(method, url);
    match http_auth_opt {
        None => {}
        Some(HttpAuth::BasicAuth { username, password }) => builder = builder.basic_auth(username, Some(password)),
        Some(HttpAuth::BearerToken { token }) => builder = builder.bearer_auth(token),
    }
    if let Some(accept) = accept {
        builder = builder.header("Accept", accept.val());
    }
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    if let Some(text) = text_body {
        builder = builder.header("Content-Type", ContentType::TEXT.val()).body(text.to_string())
    }
    Ok(builder.build()?)
}

pub fn get_header(headers: &HeaderMap, header_name: &str) -> Option<String> {
    headers.get(header_name).and_then(|value| match value.to_str() {
        Ok(str) => Some(String::from(str)),
        Err(_) => None,
    })
}
