use serde::{Deserialize, Serialize};

pub const DEFAULT_LIMIT: u32 = 50;
pub const MAX_LIMIT: u32 = 100;

/// Offset/limit window over a newest-first listing. The limit is always
/// within `1..=MAX_LIMIT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawPage")]
pub struct Page {
    offset: u64,
    limit: u32,
}

#[derive(Deserialize)]
struct RawPage {
    offset: u64,
    limit: u32,
}

impl From<RawPage> for Page {
    fn from(raw: RawPage) -> Self {
        Page::new(raw.offset, raw.limit)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Page {
    pub fn new(offset: u64, limit: u32) -> Self {
        Self {
            offset,
            limit: limit.clamp(1, MAX_LIMIT),
        }
    }

    pub fn max_limit() -> Self {
        Self {
            offset: 0,
            limit: MAX_LIMIT,
        }
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn next(&self) -> Self {
        Self {
            offset: self.offset + self.limit as u64,
            limit: self.limit,
        }
    }

    pub fn slice<T>(&self, rows: Vec<T>) -> Vec<T> {
        rows.into_iter()
            .skip(self.offset as usize)
            .take(self.limit as usize)
            .collect()
    }
}
