//! Catalog record types.

use bitflags::bitflags;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SearchError;

/// Numeric user identifier.
pub type UserId = i64;

bitflags! {
    /// Boolean torrent attributes packed into one integer.
    ///
    /// Bit values match the stored `flags` column and the external index
    /// document fields.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct TorrentFlags: u32 {
        const ANONYMOUS = 1 << 0;
        const HIDDEN = 1 << 1;
        const TRUSTED = 1 << 2;
        const REMAKE = 1 << 3;
        const COMPLETE = 1 << 4;
        const DELETED = 1 << 5;
    }
}

impl TorrentFlags {
    /// Field name used by the external index for a single flag.
    pub fn index_field(self) -> Option<&'static str> {
        match self {
            f if f == Self::ANONYMOUS => Some("anonymous"),
            f if f == Self::HIDDEN => Some("hidden"),
            f if f == Self::TRUSTED => Some("trusted"),
            f if f == Self::REMAKE => Some("remake"),
            f if f == Self::COMPLETE => Some("complete"),
            f if f == Self::DELETED => Some("deleted"),
            _ => None,
        }
    }
}

/// Swarm statistics aggregate for a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub seed_count: u32,
    pub leech_count: u32,
    pub download_count: u32,
}

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: i64,
    /// Info hash (lowercase hex).
    pub info_hash: String,
    pub display_name: String,
    /// Uploader, `None` if uploaded without an account.
    pub uploader: Option<UserId>,
    /// Total size in bytes.
    pub filesize: u64,
    pub created_at: DateTime<Utc>,
    pub main_category_id: u32,
    pub sub_category_id: u32,
    pub flags: TorrentFlags,
    pub stats: Statistics,
}

impl Record {
    pub fn has(&self, flag: TorrentFlags) -> bool {
        self.flags.contains(flag)
    }

    /// Category key as `"<main>_<sub>"`.
    pub fn category_key(&self) -> String {
        format!("{}_{}", self.main_category_id, self.sub_category_id)
    }
}

/// Lookup of single records by id, regardless of flags.
pub trait RecordSource: Send + Sync {
    fn record_by_id(&self, id: i64) -> Result<Option<Record>, SearchError>;
}
