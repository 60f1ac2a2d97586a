use std::path::{Path, PathBuf};

use agrinova_shared::session::Session;
use tracing::debug;

use crate::config::Config;
use crate::error::ClientResult;
use crate::util::persist;

/// The locally cached [`Session`], kept in a private JSON file.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_location() -> ClientResult<Self> {
        Ok(Self::new(Config::session_file_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> ClientResult<Option<Session>> {
        persist::read_json(&self.path)
    }

    pub fn save(&self, session: &Session) -> ClientResult<()> {
        persist::write_private_json(&self.path, session)?;
        debug!(path = %self.path.display(), user_id = %session.user_id, "session cached");
        Ok(())
    }

    pub fn clear(&self) -> ClientResult<()> {
        persist::remove_file(&self.path)
    }
}
