//! Raw request parameters and the listing surfaces that consume them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Query string parameters as received.
///
/// Several settings accept legacy aliases; the first present alias wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchParams(HashMap<String, String>);

impl SearchParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.0.insert(key.to_string(), value.to_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Value of the first key in `keys` that is present, even if empty.
    pub fn chain_get(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|k| self.get(k))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn term(&self) -> Option<&str> {
        self.chain_get(&["q", "term"])
    }

    pub fn sort(&self) -> Option<&str> {
        self.get("s")
    }

    pub fn order(&self) -> Option<&str> {
        self.get("o")
    }

    pub fn category(&self) -> Option<&str> {
        self.chain_get(&["c", "cats"])
    }

    pub fn quality(&self) -> Option<&str> {
        self.chain_get(&["f", "filter"])
    }

    pub fn username(&self) -> Option<&str> {
        self.chain_get(&["u", "user"])
    }

    pub fn page(&self) -> Option<&str> {
        self.chain_get(&["p", "page", "offset"])
    }

    /// `magnets` or `m` present: feed enclosures use magnet links.
    pub fn use_magnet_links(&self) -> bool {
        self.contains("magnets") || self.contains("m")
    }

    /// `admin` present: the viewer asks for moderator visibility.
    pub fn admin_requested(&self) -> bool {
        self.contains("admin")
    }

    /// Legacy `page=rss` switch on the home listing.
    pub fn requests_feed(&self) -> bool {
        self.get("page") == Some("rss")
    }
}

/// Parse a page number, falling back to 1 on anything malformed.
pub fn parse_page(raw: Option<&str>) -> u32 {
    raw.and_then(|p| p.trim().parse::<i64>().ok())
        .filter(|p| *p >= 1)
        .map(|p| u32::try_from(p).unwrap_or(u32::MAX))
        .unwrap_or(1)
}

/// Which listing a request is for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingSurface {
    /// Front page listing and search; owner comes from `u`/`user`.
    Home,
    /// A user's uploads; owner comes from the path.
    User { username: String },
    /// Syndication feed; owner comes from `u`/`user`.
    Feed,
}

/// One listing request: which surface and its raw parameters.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub surface: ListingSurface,
    pub params: SearchParams,
}

impl SearchRequest {
    pub fn home(params: SearchParams) -> Self {
        Self {
            surface: ListingSurface::Home,
            params,
        }
    }

    pub fn user(username: impl Into<String>, params: SearchParams) -> Self {
        Self {
            surface: ListingSurface::User {
                username: username.into(),
            },
            params,
        }
    }

    pub fn feed(params: SearchParams) -> Self {
        Self {
            surface: ListingSurface::Feed,
            params,
        }
    }

    pub fn is_feed(&self) -> bool {
        self.surface == ListingSurface::Feed
    }
}
