//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the collaborator traits,
//! allowing engine and HTTP tests without a database or external index.
//!
//! # Example
//!
//! ```rust,ignore
//! use torrent_index_core::testing::{fixtures, MockSearchBackend, MockUserDirectory};
//!
//! let users = MockUserDirectory::with_users(vec![fixtures::user(1, "alice", UserLevel::Regular)]);
//! let backend = MockSearchBackend::with_records(BackendKind::Relational, vec![
//!     fixtures::record(1, "[Group] Show - 01"),
//! ]);
//! ```

mod mock_backend;
mod mock_users;

pub use mock_backend::MockSearchBackend;
pub use mock_users::MockUserDirectory;

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::{TimeZone, Utc};

    use crate::record::{Record, Statistics, TorrentFlags, UserId};
    use crate::taxonomy::{MainCategory, SubCategory, Taxonomy};
    use crate::viewer::{UserIdentity, UserLevel};

    /// A visible record in category `1_2` with reasonable defaults.
    pub fn record(id: i64, display_name: &str) -> Record {
        Record {
            id,
            info_hash: format!("{:040x}", id),
            display_name: display_name.to_string(),
            uploader: None,
            filesize: 1024 * 1024 * 100, // 100 MiB
            created_at: Utc.timestamp_opt(1_577_836_800 + id * 3600, 0).single().unwrap_or_default(),
            main_category_id: 1,
            sub_category_id: 2,
            flags: TorrentFlags::empty(),
            stats: Statistics {
                seed_count: 10,
                leech_count: 2,
                download_count: 100,
            },
        }
    }

    /// A record uploaded by `uploader` with the given flags.
    pub fn owned_record(id: i64, display_name: &str, uploader: UserId, flags: TorrentFlags) -> Record {
        Record {
            uploader: Some(uploader),
            flags,
            ..record(id, display_name)
        }
    }

    pub fn user(id: UserId, username: &str, level: UserLevel) -> UserIdentity {
        UserIdentity {
            id,
            username: username.to_string(),
            level,
        }
    }

    /// Two main categories: Anime (1) with subs 1 and 2, Audio (2) with sub 1.
    pub fn taxonomy() -> Taxonomy {
        Taxonomy::new(vec![
            MainCategory {
                id: 1,
                name: "Anime".to_string(),
                sub_categories: vec![
                    SubCategory {
                        id: 1,
                        name: "Anime Music Video".to_string(),
                    },
                    SubCategory {
                        id: 2,
                        name: "English-translated".to_string(),
                    },
                ],
            },
            MainCategory {
                id: 2,
                name: "Audio".to_string(),
                sub_categories: vec![SubCategory {
                    id: 1,
                    name: "Lossless".to_string(),
                }],
            },
        ])
    }
}
