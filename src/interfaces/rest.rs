//! REST Interface
//!
//! One blocking HTTP request per query or write.
//!
//! Wire format:
//! - `POST {url}/query`  body = params object plus `limit` / `skip`
//! - `POST {url}/insert` body = document
//! - `PUT  {url}/update` body = document
//!
//! A query response is a JSON array of documents, or `{"data": [...]}`.

use super::{Connection, DatasourceInterface};
use crate::error::{FrameError, Result};
use crate::query::{CompiledQuery, Params, QueryTarget};
use crate::types::{Document, Label};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// REST client configuration
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Base URL, `http://` or `https://`
    pub url: String,
    /// Extra headers sent with every request
    pub headers: Vec<(String, String)>,
    /// Bearer token
    pub token: Option<String>,
    /// Request timeout
    pub timeout: Duration,
    pub query_path: String,
    pub insert_path: String,
    pub update_path: String,
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            headers: Vec::new(),
            token: None,
            timeout: Duration::from_secs(30),
            query_path: "query".to_string(),
            insert_path: "insert".to_string(),
            update_path: "update".to_string(),
        }
    }
}

impl RestConfig {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            ..Default::default()
        }
    }

    /// Read `RFRAME_URL`, `RFRAME_TIMEOUT_SECS` and `RFRAME_TOKEN`
    pub fn from_env() -> Result<Self> {
        let url = std::env::var("RFRAME_URL")
            .map_err(|_| FrameError::Config("RFRAME_URL is not set".to_string()))?;
        let mut config = Self::new(&url);
        if let Ok(secs) = std::env::var("RFRAME_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .map_err(|_| FrameError::Config(format!("RFRAME_TIMEOUT_SECS is not a number: {secs}")))?;
            config.timeout = Duration::from_secs(secs);
        }
        config.token = std::env::var("RFRAME_TOKEN").ok();
        Ok(config)
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn query_path(mut self, path: &str) -> Self {
        self.query_path = path.to_string();
        self
    }

    pub fn insert_path(mut self, path: &str) -> Self {
        self.insert_path = path.to_string();
        self
    }

    pub fn update_path(mut self, path: &str) -> Self {
        self.update_path = path.to_string();
        self
    }

    /// Build the client. Only `http` and `https` URLs are accepted.
    pub fn build(&self) -> Result<RestClient> {
        let base = Url::parse(&self.url)
            .map_err(|e| FrameError::UnsupportedBackend(format!("{}: {e}", self.url)))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(FrameError::UnsupportedBackend(format!(
                "{}: scheme '{}' is not http or https",
                self.url,
                base.scheme()
            )));
        }

        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| FrameError::Config(format!("invalid header name '{name}': {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| FrameError::Config(format!("invalid header value: {e}")))?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .timeout(self.timeout)
            .default_headers(headers)
            .build()?;

        Ok(RestClient { base, client, config: self.clone() })
    }
}

/// Blocking REST client for one endpoint
#[derive(Debug)]
pub struct RestClient {
    base: Url,
    client: Client,
    config: RestConfig,
}

impl RestClient {
    pub fn url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base.as_str().trim_end_matches('/'), path.trim_start_matches('/'))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// One request with the merged params plus limit/skip
    pub fn query(&self, params: &Params, limit: Option<usize>, skip: Option<usize>) -> Result<Vec<Document>> {
        let mut body = match params.to_json() {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        if let Some(limit) = limit {
            body.insert("limit".to_string(), Value::from(limit));
        }
        if let Some(skip) = skip {
            body.insert("skip".to_string(), Value::from(skip));
        }

        let url = self.endpoint(&self.config.query_path);
        debug!(url = %url, "REST query");
        let response = self.authorized(self.client.post(url.as_str()).json(&body)).send()?;
        let response = check_status(response, &url).map_err(FrameError::Transport)?;
        documents_from(response.json::<Value>()?)
    }

    pub fn insert(&self, doc: &Document) -> Result<()> {
        let url = self.endpoint(&self.config.insert_path);
        debug!(url = %url, "REST insert");
        let response = self
            .authorized(self.client.post(url.as_str()).json(doc))
            .send()
            .map_err(|e| FrameError::Insertion(e.to_string()))?;
        check_status(response, &url).map_err(FrameError::Insertion)?;
        Ok(())
    }

    pub fn update(&self, doc: &Document) -> Result<()> {
        let url = self.endpoint(&self.config.update_path);
        debug!(url = %url, "REST update");
        let response = self
            .authorized(self.client.put(url.as_str()).json(doc))
            .send()
            .map_err(|e| FrameError::Update(e.to_string()))?;
        check_status(response, &url).map_err(FrameError::Update)?;
        Ok(())
    }
}

impl QueryTarget for RestClient {
    fn run(&self, params: &Params, limit: Option<usize>, skip: Option<usize>) -> Result<Vec<Document>> {
        self.query(params, limit, skip)
    }
}

fn check_status(response: Response, url: &str) -> std::result::Result<Response, String> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    warn!(url = %url, status = %status, "REST request rejected");
    Err(format!("{status} from {url}: {body}"))
}

fn documents_from(value: Value) -> Result<Vec<Document>> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("data") {
            Some(Value::Array(items)) => items,
            _ => return Err(FrameError::Transport("response has no document list".to_string())),
        },
        _ => return Err(FrameError::Transport("response is not a document list".to_string())),
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::Object(doc) => Ok(doc),
            other => Err(FrameError::Transport(format!("expected a document, got {other}"))),
        })
        .collect()
}

/// Interface over a `RestClient`
pub struct RestInterface {
    client: Arc<RestClient>,
}

impl RestInterface {
    pub fn new(client: Arc<RestClient>) -> Self {
        Self { client }
    }

    pub fn from_url(url: &str) -> Result<Self> {
        Ok(Self::new(Arc::new(RestConfig::new(url).build()?)))
    }

    pub fn client(&self) -> &Arc<RestClient> {
        &self.client
    }

    pub(crate) fn factory(connection: &Connection) -> Result<Arc<dyn DatasourceInterface>> {
        match connection {
            Connection::Rest(client) => Ok(Arc::new(Self::new(client.clone()))),
            other => Err(FrameError::UnsupportedBackend(format!(
                "RestInterface cannot serve {:?} connections",
                other.kind()
            ))),
        }
    }
}

impl DatasourceInterface for RestInterface {
    fn name(&self) -> &'static str {
        "RestInterface"
    }

    fn bind(&self, params: Params) -> CompiledQuery {
        CompiledQuery::new(self.client.clone(), params)
    }

    fn compile_value(&self, name: &str, label: &Label) -> Result<CompiledQuery> {
        Ok(self.bind(Params::matching(name, label)))
    }

    fn compile_interpolating(&self, name: &str, label: &Label) -> Result<CompiledQuery> {
        Ok(self.bind(Params::matching(name, label)))
    }

    fn compile_interval(&self, name: &str, label: &Label) -> Result<CompiledQuery> {
        Ok(self.bind(Params::overlapping(name, label)))
    }

    fn insert(&self, doc: &Document) -> Result<()> {
        self.client.insert(doc)
    }

    fn update(&self, _key: &Params, doc: &Document) -> Result<()> {
        self.client.update(doc)
    }
}
