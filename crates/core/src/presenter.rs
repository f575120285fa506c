//! Shaping result pages for listings and feeds.

use std::sync::Arc;

use serde::Serialize;

use crate::backend::{BackendKind, ResultPage};
use crate::error::SearchError;
use crate::record::{Record, TorrentFlags};
use crate::taxonomy::CategoryTaxonomy;

/// Builds the URLs a record is reachable under.
pub trait TorrentLinks: Send + Sync {
    /// Human-facing page for the record.
    fn view_url(&self, record: &Record) -> String;

    fn magnet(&self, record: &Record) -> String;

    /// Download URL of the `.torrent` file.
    fn torrent_file(&self, record: &Record) -> String;
}

/// Links rooted at the public site URL.
#[derive(Debug, Clone)]
pub struct SiteTorrentLinks {
    site_url: String,
    trackers: Vec<String>,
}

impl SiteTorrentLinks {
    pub fn new(site_url: impl Into<String>, trackers: Vec<String>) -> Self {
        Self {
            site_url: site_url.into().trim_end_matches('/').to_string(),
            trackers,
        }
    }

    pub fn site_url(&self) -> &str {
        &self.site_url
    }
}

impl TorrentLinks for SiteTorrentLinks {
    fn view_url(&self, record: &Record) -> String {
        format!("{}/view/{}", self.site_url, record.id)
    }

    fn magnet(&self, record: &Record) -> String {
        let mut uri = format!(
            "magnet:?xt=urn:btih:{}&dn={}",
            record.info_hash,
            urlencoding::encode(&record.display_name)
        );
        for tracker in &self.trackers {
            uri.push_str("&tr=");
            uri.push_str(&urlencoding::encode(tracker));
        }
        uri
    }

    fn torrent_file(&self, record: &Record) -> String {
        format!("{}/view/{}/torrent", self.site_url, record.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderKind {
    Page,
    Feed,
}

/// One syndication entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub guid: String,
    /// RFC 2822 date.
    pub pub_date: String,
    pub enclosure_url: String,
    pub enclosure_is_magnet: bool,
    pub category: String,
    pub category_id: String,
    pub seeders: u32,
    pub leechers: u32,
    pub downloads: u32,
    pub info_hash: String,
    pub size: String,
    pub trusted: bool,
    pub remake: bool,
}

/// A normalized page ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PresentedPage {
    pub kind: RenderKind,
    pub records: Vec<Record>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub total_is_exact: bool,
    pub total_pages: u64,
    /// 1-based index of the first record shown, 0 when empty.
    pub range_start: u64,
    pub range_end: u64,
    pub backend: BackendKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<FeedItem>,
}

impl PresentedPage {
    /// "Displaying results X-Y out of Z results."
    pub fn summary(&self) -> String {
        let approx = if self.total_is_exact { "" } else { "at least " };
        format!(
            "Displaying results {}-{} out of {}{} results.",
            self.range_start, self.range_end, approx, self.total
        )
    }
}

pub struct ResultPresenter {
    taxonomy: Arc<CategoryTaxonomy>,
    links: Arc<dyn TorrentLinks>,
}

impl ResultPresenter {
    pub fn new(taxonomy: Arc<CategoryTaxonomy>, links: Arc<dyn TorrentLinks>) -> Self {
        Self { taxonomy, links }
    }

    pub fn present_page(&self, page: ResultPage) -> PresentedPage {
        let per_page = u64::from(page.per_page.max(1));
        let offset = u64::from(page.page.saturating_sub(1)) * per_page;
        let shown = page.records.len() as u64;
        let (range_start, range_end) = if shown == 0 {
            (0, 0)
        } else {
            (offset + 1, offset + shown)
        };

        PresentedPage {
            kind: RenderKind::Page,
            total_pages: page.total.div_ceil(per_page).max(1),
            range_start,
            range_end,
            page: page.page,
            per_page: page.per_page,
            total: page.total,
            total_is_exact: page.total_is_exact,
            backend: page.backend,
            records: page.records,
            items: Vec::new(),
        }
    }

    pub fn present_feed(
        &self,
        page: ResultPage,
        use_magnet_links: bool,
    ) -> Result<PresentedPage, SearchError> {
        let taxonomy = self.taxonomy.get()?;
        let items = page
            .records
            .iter()
            .map(|record| {
                let link = self.links.view_url(record);
                FeedItem {
                    title: record.display_name.clone(),
                    guid: link.clone(),
                    link,
                    pub_date: record.created_at.to_rfc2822(),
                    enclosure_url: if use_magnet_links {
                        self.links.magnet(record)
                    } else {
                        self.links.torrent_file(record)
                    },
                    enclosure_is_magnet: use_magnet_links,
                    category: taxonomy.label(record.main_category_id, record.sub_category_id),
                    category_id: record.category_key(),
                    seeders: record.stats.seed_count,
                    leechers: record.stats.leech_count,
                    downloads: record.stats.download_count,
                    info_hash: record.info_hash.clone(),
                    size: format_filesize(record.filesize),
                    trusted: record.has(TorrentFlags::TRUSTED),
                    remake: record.has(TorrentFlags::REMAKE),
                }
            })
            .collect();

        let mut presented = self.present_page(page);
        presented.kind = RenderKind::Feed;
        presented.items = items;
        Ok(presented)
    }
}

/// Binary-prefixed human size, e.g. `1.5 GiB`.
pub fn format_filesize(bytes: u64) -> String {
    const UNITS: [&str; 8] = ["KiB", "MiB", "GiB", "TiB", "PiB", "EiB", "ZiB", "YiB"];
    if bytes < 1024 {
        return if bytes == 1 {
            "1 Byte".to_string()
        } else {
            format!("{} Bytes", bytes)
        };
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Statistics;
    use crate::taxonomy::tests::sample_taxonomy;
    use chrono::{TimeZone, Utc};

    fn record(id: i64) -> Record {
        Record {
            id,
            info_hash: "0123abcd".to_string(),
            display_name: "[Group] Show & Co".to_string(),
            uploader: None,
            filesize: 1536,
            created_at: Utc.with_ymd_and_hms(2020, 5, 1, 12, 0, 0).unwrap(),
            main_category_id: 1,
            sub_category_id: 2,
            flags: TorrentFlags::TRUSTED,
            stats: Statistics {
                seed_count: 4,
                leech_count: 1,
                download_count: 30,
            },
        }
    }

    fn page(records: Vec<Record>, page: u32, total: u64) -> ResultPage {
        ResultPage {
            records,
            total,
            total_is_exact: true,
            page,
            per_page: 10,
            backend: BackendKind::Relational,
        }
    }

    fn presenter() -> ResultPresenter {
        ResultPresenter::new(
            Arc::new(CategoryTaxonomy::preloaded(sample_taxonomy())),
            Arc::new(SiteTorrentLinks::new(
                "https://example.org/",
                vec!["udp://tracker.example:1337/announce".to_string()],
            )),
        )
    }

    #[test]
    fn test_page_range_and_total_pages() {
        let presented = presenter().present_page(page(vec![record(1), record(2)], 3, 22));
        assert_eq!(presented.kind, RenderKind::Page);
        assert_eq!(presented.total_pages, 3);
        assert_eq!(presented.range_start, 21);
        assert_eq!(presented.range_end, 22);
        assert_eq!(
            presented.summary(),
            "Displaying results 21-22 out of 22 results."
        );
    }

    #[test]
    fn test_empty_page_has_one_page() {
        let presented = presenter().present_page(page(Vec::new(), 1, 0));
        assert_eq!(presented.total_pages, 1);
        assert_eq!((presented.range_start, presented.range_end), (0, 0));
    }

    #[test]
    fn test_feed_items_with_torrent_links() {
        let presented = presenter()
            .present_feed(page(vec![record(5)], 1, 1), false)
            .unwrap();
        assert_eq!(presented.kind, RenderKind::Feed);

        let item = &presented.items[0];
        assert_eq!(item.link, "https://example.org/view/5");
        assert_eq!(item.guid, item.link);
        assert_eq!(item.enclosure_url, "https://example.org/view/5/torrent");
        assert_eq!(item.category, "Anime - English-translated");
        assert_eq!(item.category_id, "1_2");
        assert_eq!(
            chrono::DateTime::parse_from_rfc2822(&item.pub_date).unwrap(),
            record(5).created_at
        );
        assert_eq!(item.size, "1.5 KiB");
        assert!(item.trusted);
        assert!(!item.remake);
    }

    #[test]
    fn test_feed_items_with_magnets() {
        let presented = presenter()
            .present_feed(page(vec![record(5)], 1, 1), true)
            .unwrap();
        let item = &presented.items[0];
        assert!(item.enclosure_is_magnet);
        assert_eq!(
            item.enclosure_url,
            "magnet:?xt=urn:btih:0123abcd&dn=%5BGroup%5D%20Show%20%26%20Co\
             &tr=udp%3A%2F%2Ftracker.example%3A1337%2Fannounce"
        );
    }

    #[test]
    fn test_format_filesize() {
        assert_eq!(format_filesize(0), "0 Bytes");
        assert_eq!(format_filesize(1), "1 Byte");
        assert_eq!(format_filesize(1023), "1023 Bytes");
        assert_eq!(format_filesize(1024), "1.0 KiB");
        assert_eq!(format_filesize(5 * 1024 * 1024 * 1024), "5.0 GiB");
    }
}
