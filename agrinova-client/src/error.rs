use std::fmt;

use thiserror::Error;

/// Step of a multi-step signup, used to report where a signup stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignupStep {
    ReserveJoinCode,
    LookupOrganization,
    CreateIdentity,
    CreateOrganization,
    CreateProfile,
    PersistSession,
}

impl fmt::Display for SignupStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SignupStep::ReserveJoinCode => "reserve join code",
            SignupStep::LookupOrganization => "look up organization",
            SignupStep::CreateIdentity => "create identity",
            SignupStep::CreateOrganization => "create organization",
            SignupStep::CreateProfile => "create profile",
            SignupStep::PersistSession => "persist session",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("profile not found for user {0}")]
    ProfileNotFound(String),

    #[error("no organization found with join code {0}")]
    InvalidJoinCode(String),

    #[error("not logged in")]
    NotAuthenticated,

    #[error("missing fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("signup failed at step '{step}': {message}{}", orphan_note(.orphaned))]
    Signup {
        step: SignupStep,
        message: String,
        orphaned: Vec<String>,
    },

    #[error("remote error (http {status}): {message}")]
    Remote { status: u16, message: String },

    #[error("network error: {0}")]
    Transport(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("local persistence error: {0}")]
    Persistence(String),

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("request cancelled")]
    Cancelled,
}

fn orphan_note(orphaned: &[String]) -> String {
    if orphaned.is_empty() {
        String::new()
    } else {
        format!(" (left behind: {})", orphaned.join(", "))
    }
}

impl ClientError {
    pub fn remote(status: u16, message: impl Into<String>) -> Self {
        ClientError::Remote {
            status,
            message: message.into(),
        }
    }

    /// True when the remote side answered and refused, as opposed to the
    /// request never completing.
    pub fn is_rejection(&self) -> bool {
        matches!(self, ClientError::Remote { status, .. } if (400..500).contains(status))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            ClientError::remote(status.as_u16(), err.to_string())
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Persistence(err.to_string())
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
