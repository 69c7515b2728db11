pub mod http;
pub mod types;

use crate::{
    config,
    credential::Credential,
    error::{JobError, Stage},
    job::VideoFile,
    result::InferenceResult,
};
use anyhow::Result;
use serde::de::DeserializeOwned;
use std::future::Future;
use time::OffsetDateTime;
use tracing::{debug, info};

pub use types::{
    DownloadTarget, EndpointInfo, HealthResponse, PollStatus, RawResponse, Submission, UploadSlot,
};

/// The remote calls the job protocol is built from.
///
/// First-hop calls go to the service API and receive the credential.
/// Object-store calls (`put_object`, `get_object`) take a presigned target and
/// never see it.
pub trait Transport {
    fn health(&self, credential: &str) -> impl Future<Output = Result<RawResponse>> + Send;
    fn request_upload(
        &self,
        credential: &str,
        object_name: &str,
        version: &str,
    ) -> impl Future<Output = Result<RawResponse>> + Send;
    fn status(&self, credential: &str, guid: &str)
        -> impl Future<Output = Result<RawResponse>> + Send;
    fn request_download(
        &self,
        credential: &str,
        guid: &str,
    ) -> impl Future<Output = Result<RawResponse>> + Send;

    fn put_object(
        &self,
        target: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> impl Future<Output = Result<RawResponse>> + Send;
    fn get_object(&self, target: &str) -> impl Future<Output = Result<RawResponse>> + Send;
}

pub struct JobClient<T: Transport> {
    transport: T,
    credential: Credential,
    object_prefix: String,
    object_extension: String,
    content_type: String,
}

impl<T: Transport> JobClient<T> {
    pub fn new(transport: T, credential: Credential, service: &config::Service) -> Self {
        Self {
            transport,
            credential,
            object_prefix: service.object_prefix.clone(),
            object_extension: service.object_extension.clone(),
            content_type: service.content_type.clone(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub async fn health(&self) -> Result<HealthResponse, JobError> {
        let key = self.credential.require()?;
        let resp = self
            .transport
            .health(key)
            .await
            .map_err(|e| no_response(Stage::Health, e))?;
        let resp = check(Stage::Health, resp, false)?;
        decode(Stage::Health, &resp)
    }

    /// Requests an upload slot and transfers the video bytes to it.
    pub async fn submit(&self, video: &VideoFile, version: &str) -> Result<Submission, JobError> {
        let submission = self.reserve_slot(version).await?;
        self.transfer(&submission, video).await?;
        Ok(submission)
    }

    /// Asks the service for a job GUID and a presigned upload target.
    pub async fn reserve_slot(&self, version: &str) -> Result<Submission, JobError> {
        let key = self.credential.require()?;
        let object_name = object_name(
            &self.object_prefix,
            &self.object_extension,
            OffsetDateTime::now_utc(),
        );
        debug!(%object_name, %version, "requesting upload slot");

        let resp = self
            .transport
            .request_upload(key, &object_name, version)
            .await
            .map_err(|e| no_response(Stage::Submit, e))?;
        let resp = check(Stage::Submit, resp, false)?;
        let slot: UploadSlot = decode(Stage::Submit, &resp)?;

        let guid = non_empty(slot.guid).ok_or(JobError::MissingData {
            stage: Stage::Submit,
            field: "guid",
        })?;
        let upload_target = non_empty(slot.presigned_url).ok_or(JobError::MissingData {
            stage: Stage::Submit,
            field: "presigned_url",
        })?;

        Ok(Submission {
            guid,
            upload_target,
            object_name,
        })
    }

    /// PUTs the video bytes to a reserved slot. No credential on this hop.
    pub async fn transfer(&self, slot: &Submission, video: &VideoFile) -> Result<(), JobError> {
        info!(
            "uploading {} ({} bytes) as {} guid={}",
            video.name,
            video.bytes.len(),
            slot.object_name,
            slot.guid
        );
        let put = self
            .transport
            .put_object(&slot.upload_target, &self.content_type, &video.bytes)
            .await
            .map_err(|e| no_response(Stage::Transfer, e))?;
        check(Stage::Transfer, put, false)?;
        Ok(())
    }

    pub async fn poll_once(&self, guid: &str) -> Result<PollStatus, JobError> {
        let key = self.credential.require()?;
        let resp = self
            .transport
            .status(key, guid)
            .await
            .map_err(|e| no_response(Stage::Poll, e))?;
        let resp = check(Stage::Poll, resp, false)?;
        decode(Stage::Poll, &resp)
    }

    /// Resolves the presigned download target for `guid`, then reads the
    /// result document from it.
    pub async fn fetch_result(&self, guid: &str) -> Result<InferenceResult, JobError> {
        let key = self.credential.require()?;
        let resp = self
            .transport
            .request_download(key, guid)
            .await
            .map_err(|e| no_response(Stage::Resolve, e))?;
        let resp = check(Stage::Resolve, resp, true)?;
        let target: DownloadTarget = decode(Stage::Resolve, &resp)?;
        let target = non_empty(target.presigned_url).ok_or(JobError::MissingData {
            stage: Stage::Resolve,
            field: "presigned_url",
        })?;

        debug!(%guid, "fetching results from presigned target");
        let resp = self
            .transport
            .get_object(&target)
            .await
            .map_err(|e| no_response(Stage::Fetch, e))?;
        let resp = check(Stage::Fetch, resp, false)?;
        decode(Stage::Fetch, &resp)
    }
}

/// `<prefix><YYYYMMDDhhmmssSSS>.<ext>`, UTC.
pub fn object_name(prefix: &str, extension: &str, at: OffsetDateTime) -> String {
    format!(
        "{prefix}{:04}{:02}{:02}{:02}{:02}{:02}{:03}.{extension}",
        at.year(),
        u8::from(at.month()),
        at.day(),
        at.hour(),
        at.minute(),
        at.second(),
        at.millisecond()
    )
}

fn no_response(stage: Stage, err: anyhow::Error) -> JobError {
    JobError::RequestFailed {
        stage,
        status: None,
        detail: format!("{err:#}"),
    }
}

fn check(stage: Stage, resp: RawResponse, with_body: bool) -> Result<RawResponse, JobError> {
    if resp.is_success() {
        return Ok(resp);
    }
    let detail = if with_body { resp.text() } else { String::new() };
    Err(JobError::RequestFailed {
        stage,
        status: Some(resp.status),
        detail,
    })
}

fn decode<D: DeserializeOwned>(stage: Stage, resp: &RawResponse) -> Result<D, JobError> {
    serde_json::from_slice(&resp.body).map_err(|source| JobError::Decode { stage, source })
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.trim().is_empty())
}
