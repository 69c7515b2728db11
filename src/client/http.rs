use super::{RawResponse, Transport};
use crate::config::Service;
use anyhow::{anyhow, Context, Result};
use reqwest::{header::CONTENT_TYPE, Client, RequestBuilder};
use tracing::debug;
use url::Url;

const API_KEY_HEADER: &str = "x-api-key";
const API_VERSION_HEADER: &str = "x-api-version";

pub struct HttpTransport {
    http: Client,
    base: Url,
    stage: String,
}

impl HttpTransport {
    pub fn new(service: &Service) -> Result<Self> {
        let base = Url::parse(&service.base_url)
            .with_context(|| format!("parse service.base_url: {}", service.base_url))?;
        if base.cannot_be_a_base() {
            return Err(anyhow!("service.base_url cannot be a base: {base}"));
        }

        let mut builder = Client::builder();
        if let Some(timeout) = service.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().with_context(|| "building HTTP client")?;

        Ok(Self {
            http,
            base,
            stage: service.stage.clone(),
        })
    }

    /// Appends percent-encoded path segments to the base URL.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("base url cannot be a base: {}", self.base))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, req: RequestBuilder) -> Result<RawResponse> {
        let resp = req.send().await?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await?.to_vec();
        debug!(status, bytes = body.len(), "http response");
        Ok(RawResponse { status, body })
    }
}

impl Transport for HttpTransport {
    async fn health(&self, credential: &str) -> Result<RawResponse> {
        let url = self.endpoint(&["health"])?;
        self.send(self.http.get(url).header(API_KEY_HEADER, credential))
            .await
    }

    async fn request_upload(
        &self,
        credential: &str,
        object_name: &str,
        version: &str,
    ) -> Result<RawResponse> {
        let url = self.endpoint(&["upload", &self.stage, object_name])?;
        self.send(
            self.http
                .get(url)
                .header(API_VERSION_HEADER, version)
                .header(API_KEY_HEADER, credential),
        )
        .await
    }

    async fn status(&self, credential: &str, guid: &str) -> Result<RawResponse> {
        let url = self.endpoint(&["status", &self.stage, guid])?;
        self.send(self.http.get(url).header(API_KEY_HEADER, credential))
            .await
    }

    async fn request_download(&self, credential: &str, guid: &str) -> Result<RawResponse> {
        let url = self.endpoint(&["download", &self.stage, guid])?;
        self.send(self.http.get(url).header(API_KEY_HEADER, credential))
            .await
    }

    async fn put_object(
        &self,
        target: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<RawResponse> {
        self.send(
            self.http
                .put(target)
                .header(CONTENT_TYPE, content_type)
                .body(bytes.to_vec()),
        )
        .await
    }

    async fn get_object(&self, target: &str) -> Result<RawResponse> {
        self.send(self.http.get(target)).await
    }
}
