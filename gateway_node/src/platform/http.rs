//! REST client for the platform gateway.

use async_trait::async_trait;
use futures::StreamExt;
use log::debug;
use reqwest::{multipart, Client, Response, StatusCode};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

use super::{
    DatasetHandle, DatasetMetadata, Dispatcher, Identity, JobInfo, JobRequest, PlatformClient,
    PlatformError, Result,
};
use crate::config::PlatformConfig;
use crate::types::{Address, RawJobId};

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct IdentityResponse {
    address: Address,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitJobResponse {
    job_id: String,
}

/// Platform client speaking the gateway REST API with client-credential
/// authentication.
#[derive(Debug, Clone)]
pub struct HttpPlatformClient {
    client: Client,
    api_url: String,
    auth_url: String,
    client_id: String,
    client_secret: String,
}

impl HttpPlatformClient {
    pub fn new(config: &PlatformConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            auth_url: config.auth_url.trim_end_matches('/').to_string(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        })
    }

    async fn fetch_token(&self) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/token", self.auth_url))
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await?;
        let token: TokenResponse = check_auth(response).await?.json().await?;
        Ok(token.access_token)
    }
}

/// Turn a non-2xx response into [`PlatformError::Rejected`].
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(PlatformError::Rejected {
        status: status.as_u16(),
        message,
    })
}

/// Like [`check`], but 401/403 become [`PlatformError::Auth`].
async fn check_auth(response: Response) -> Result<Response> {
    match response.status() {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            let message = response.text().await.unwrap_or_default();
            Err(PlatformError::Auth(message))
        }
        _ => check(response).await,
    }
}

#[async_trait]
impl PlatformClient for HttpPlatformClient {
    async fn get_token_identity(&self) -> Result<Identity> {
        let token = self.fetch_token().await?;
        let response = self
            .client
            .get(format!("{}/identities/me", self.api_url))
            .bearer_auth(&token)
            .send()
            .await?;
        let me: IdentityResponse = check_auth(response).await?.json().await?;
        Ok(Identity {
            address: me.address,
            token,
        })
    }

    async fn upload_dataset(
        &self,
        data: Vec<u8>,
        metadata: &DatasetMetadata,
        identity: &Identity,
    ) -> Result<DatasetHandle> {
        let metadata_json = serde_json::to_string(metadata)
            .map_err(|e| PlatformError::InvalidResponse(e.to_string()))?;
        let data_part = multipart::Part::bytes(data)
            .file_name("data")
            .mime_str("application/octet-stream")?;
        let form = multipart::Form::new()
            .text("metadata", metadata_json)
            .part("data", data_part);

        let response = self
            .client
            .post(format!("{}/datasets", self.api_url))
            .bearer_auth(&identity.token)
            .multipart(form)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    async fn connect_dataset(
        &self,
        address: &Address,
        identity: &Identity,
    ) -> Result<DatasetHandle> {
        let response = self
            .client
            .get(format!("{}/datasets/{}", self.api_url, address))
            .bearer_auth(&identity.token)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    async fn download_to_path(
        &self,
        dataset: &DatasetHandle,
        identity: &Identity,
        path: &Path,
    ) -> Result<()> {
        let response = self
            .client
            .get(format!("{}/datasets/{}/download", self.api_url, dataset.address))
            .bearer_auth(&identity.token)
            .send()
            .await?;
        let mut body = check(response).await?.bytes_stream();

        let mut file = tokio::fs::File::create(path).await?;
        let mut written = 0usize;
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            written += chunk.len();
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        debug!("Downloaded {} bytes of {} to {}", written, dataset.address, path.display());
        Ok(())
    }

    async fn connect_dispatcher(
        &self,
        dispatcher: &Address,
        identity: &Identity,
    ) -> Result<Box<dyn Dispatcher>> {
        let base_url = format!("{}/dispatchers/{}", self.api_url, dispatcher);
        let response = self
            .client
            .get(&base_url)
            .bearer_auth(&identity.token)
            .send()
            .await?;
        check(response).await?;

        Ok(Box::new(HttpDispatcher {
            client: self.client.clone(),
            base_url,
            token: identity.token.clone(),
        }))
    }
}

/// Connection to one dispatcher, bound to the identity that opened it.
struct HttpDispatcher {
    client: Client,
    base_url: String,
    token: String,
}

#[async_trait]
impl Dispatcher for HttpDispatcher {
    async fn submit_job(&self, job: JobRequest) -> Result<RawJobId> {
        let response = self
            .client
            .post(format!("{}/jobs", self.base_url))
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "job": job }))
            .send()
            .await?;
        let submitted: SubmitJobResponse = check(response).await?.json().await?;
        RawJobId::decode_hex(&submitted.job_id)
            .map_err(|e| PlatformError::InvalidResponse(format!("job id: {}", e)))
    }

    async fn get_job_info(&self, job_id: &RawJobId) -> Result<JobInfo> {
        let response = self
            .client
            .get(format!("{}/jobs/{}", self.base_url, job_id))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }
}
