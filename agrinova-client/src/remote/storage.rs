use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use tracing::info;

use super::{ApiContext, check};
use crate::backend::ObjectStorage;
use crate::error::{ClientError, ClientResult};

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(rename = "Key")]
    key: String,
}

pub struct HostedStorage {
    api: ApiContext,
}

impl HostedStorage {
    pub(crate) fn new(api: ApiContext) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ObjectStorage for HostedStorage {
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> ClientResult<String> {
        let size = data.len();
        let rb = self
            .api
            .http
            .post(self.api.url(&format!("/storage/v1/object/{bucket}/{key}")))
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", "true")
            .body(data);
        let resp = self
            .api
            .authed(rb)
            .await
            .send()
            .await
            .map_err(|e| ClientError::Storage(e.to_string()))?;
        let resp = check(resp)
            .await
            .map_err(|e| ClientError::Storage(e.to_string()))?;
        let body: UploadResponse = resp.json().await?;
        info!(bucket, key, size, "object uploaded");
        Ok(body.key)
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        self.api
            .url(&format!("/storage/v1/object/public/{bucket}/{key}"))
    }
}
