use agrinova_shared::session::Session;
use bytes::Bytes;
use chrono::Utc;
use tracing::info;

use super::FarmData;
use crate::error::{ClientError, ClientResult};

pub const INVENTORY_BUCKET: &str = "inventory-images";
pub const PROFILE_BUCKET: &str = "profile-images";
const JPEG: &str = "image/jpeg";

/// `{user_id}/{prefix}-{unix_millis}.jpg`
pub fn photo_key(user_id: &str, prefix: &str) -> String {
    format!("{user_id}/{prefix}-{}.jpg", Utc::now().timestamp_millis())
}

impl FarmData {
    /// Uploads a JPEG and returns its public URL.
    pub(crate) async fn upload_photo(
        &self,
        bucket: &str,
        user_id: &str,
        prefix: &str,
        data: Bytes,
    ) -> ClientResult<String> {
        if data.is_empty() {
            return Err(ClientError::InvalidInput("photo is empty".into()));
        }
        let key = photo_key(user_id, prefix);
        self.run(self.storage.upload(bucket, &key, data, JPEG))
            .await?;
        Ok(self.storage.public_url(bucket, &key))
    }

    pub async fn upload_profile_photo(&self, session: &Session, data: Bytes) -> ClientResult<String> {
        let url = self
            .upload_photo(PROFILE_BUCKET, &session.user_id, "avatar", data)
            .await?;
        info!(user_id = %session.user_id, "profile photo updated");
        Ok(url)
    }
}
