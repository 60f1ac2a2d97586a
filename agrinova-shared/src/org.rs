use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const JOIN_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ1234567890";
pub const JOIN_CODE_LEN: usize = 6;

/// A farm tenant. The backend column for the join code is `farm_code`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Organization {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(rename = "farm_code")]
    pub join_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

// insert body for `organizations`
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct NewOrganization {
    pub name: String,
    pub address: String,
    #[serde(rename = "farm_code")]
    pub join_code: String,
}

pub fn generate_join_code() -> String {
    generate_join_code_with(&mut rand::thread_rng())
}

pub fn generate_join_code_with<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..JOIN_CODE_LEN)
        .map(|_| JOIN_CODE_ALPHABET[rng.gen_range(0..JOIN_CODE_ALPHABET.len())] as char)
        .collect()
}

/// Codes are typed by hand on a phone keyboard, so surrounding whitespace and
/// lower case input are accepted.
pub fn normalize_join_code(input: &str) -> String {
    input.trim().to_ascii_uppercase()
}

pub fn is_valid_join_code(code: &str) -> bool {
    code.len() == JOIN_CODE_LEN && code.bytes().all(|b| JOIN_CODE_ALPHABET.contains(&b))
}
