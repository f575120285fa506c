//! RSS 2.0 rendering.

use std::io::Cursor;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use thiserror::Error;

use crate::presenter::FeedItem;

/// Namespace of the torrent extension elements, kept for feed reader compatibility.
pub const TORRENT_NAMESPACE: &str = "https://nyaa.si/xmlns/nyaa";

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Failed to write feed XML: {0}")]
    Xml(String),
}

fn xml_error(e: impl std::fmt::Display) -> FeedError {
    FeedError::Xml(e.to_string())
}

/// Channel-level metadata.
#[derive(Debug, Clone)]
pub struct FeedChannel {
    pub title: String,
    pub link: String,
    pub description: String,
    /// URL of the feed itself.
    pub self_link: String,
}

impl FeedChannel {
    /// Channel for `label` (a quoted term or "Home") on `site_name`.
    pub fn for_listing(site_name: &str, site_url: &str, label: &str) -> Self {
        let site_url = site_url.trim_end_matches('/');
        Self {
            title: format!("{} Torrent File RSS", site_name),
            link: format!("{}/", site_url),
            description: format!("RSS Feed for {}", label),
            self_link: format!("{}/rss", site_url),
        }
    }
}

struct FeedWriter {
    writer: Writer<Cursor<Vec<u8>>>,
}

impl FeedWriter {
    fn new() -> Self {
        Self {
            writer: Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2),
        }
    }

    fn event(&mut self, event: Event<'_>) -> Result<(), FeedError> {
        self.writer.write_event(event).map_err(xml_error)
    }

    fn start(&mut self, start: BytesStart<'_>) -> Result<(), FeedError> {
        self.event(Event::Start(start))
    }

    fn end(&mut self, name: &str) -> Result<(), FeedError> {
        self.event(Event::End(BytesEnd::new(name)))
    }

    fn text_element(&mut self, name: &str, text: &str) -> Result<(), FeedError> {
        self.start(BytesStart::new(name))?;
        self.event(Event::Text(BytesText::new(text)))?;
        self.end(name)
    }

    fn finish(self) -> Result<String, FeedError> {
        String::from_utf8(self.writer.into_inner().into_inner()).map_err(xml_error)
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "Yes"
    } else {
        "No"
    }
}

/// Render an RSS 2.0 document.
pub fn render_rss(channel: &FeedChannel, items: &[FeedItem]) -> Result<String, FeedError> {
    let mut w = FeedWriter::new();

    w.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    w.start(BytesStart::new("rss").with_attributes([
        ("version", "2.0"),
        ("xmlns:atom", "http://www.w3.org/2005/Atom"),
        ("xmlns:nyaa", TORRENT_NAMESPACE),
    ]))?;
    w.start(BytesStart::new("channel"))?;

    w.text_element("title", &channel.title)?;
    w.text_element("description", &channel.description)?;
    w.text_element("link", &channel.link)?;
    w.event(Event::Empty(BytesStart::new("atom:link").with_attributes([
        ("href", channel.self_link.as_str()),
        ("rel", "self"),
        ("type", "application/rss+xml"),
    ])))?;

    for item in items {
        w.start(BytesStart::new("item"))?;
        w.text_element("title", &item.title)?;
        w.text_element("link", &item.enclosure_url)?;
        w.start(BytesStart::new("guid").with_attributes([("isPermaLink", "true")]))?;
        w.event(Event::Text(BytesText::new(&item.guid)))?;
        w.end("guid")?;
        w.text_element("pubDate", &item.pub_date)?;

        w.text_element("nyaa:seeders", &item.seeders.to_string())?;
        w.text_element("nyaa:leechers", &item.leechers.to_string())?;
        w.text_element("nyaa:downloads", &item.downloads.to_string())?;
        w.text_element("nyaa:infoHash", &item.info_hash)?;
        w.text_element("nyaa:categoryId", &item.category_id)?;
        w.text_element("nyaa:category", &item.category)?;
        w.text_element("nyaa:size", &item.size)?;
        w.text_element("nyaa:trusted", yes_no(item.trusted))?;
        w.text_element("nyaa:remake", yes_no(item.remake))?;

        // CDATA cannot contain its own terminator, split it across sections.
        let description = format!(
            "<a href=\"{}\">#{}</a> | {}",
            item.link, item.category_id, item.title
        )
        .replace("]]>", "]]]]><![CDATA[>");
        w.start(BytesStart::new("description"))?;
        w.event(Event::CData(quick_xml::events::BytesCData::new(description)))?;
        w.end("description")?;
        w.end("item")?;
    }

    w.end("channel")?;
    w.end("rss")?;
    w.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> FeedItem {
        FeedItem {
            title: "Show <01> & more".to_string(),
            link: "https://example.org/view/3".to_string(),
            guid: "https://example.org/view/3".to_string(),
            pub_date: "Fri, 01 May 2020 12:00:00 +0000".to_string(),
            enclosure_url: "https://example.org/view/3/torrent".to_string(),
            enclosure_is_magnet: false,
            category: "Anime - English-translated".to_string(),
            category_id: "1_2".to_string(),
            seeders: 4,
            leechers: 1,
            downloads: 30,
            info_hash: "0123abcd".to_string(),
            size: "1.5 KiB".to_string(),
            trusted: true,
            remake: false,
        }
    }

    #[test]
    fn test_channel_for_listing() {
        let channel = FeedChannel::for_listing("Index", "https://example.org/", "\"naruto\"");
        assert_eq!(channel.title, "Index Torrent File RSS");
        assert_eq!(channel.link, "https://example.org/");
        assert_eq!(channel.description, "RSS Feed for \"naruto\"");
        assert_eq!(channel.self_link, "https://example.org/rss");
    }

    #[test]
    fn test_render_escapes_and_includes_items() {
        let channel = FeedChannel::for_listing("Index", "https://example.org", "Home");
        let xml = render_rss(&channel, &[item()]).unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<rss version=\"2.0\""));
        assert!(xml.contains("<title>Index Torrent File RSS</title>"));
        assert!(xml.contains("<title>Show &lt;01&gt; &amp; more</title>"));
        assert!(xml.contains("<link>https://example.org/view/3/torrent</link>"));
        assert!(xml.contains("<guid isPermaLink=\"true\">https://example.org/view/3</guid>"));
        assert!(xml.contains("<nyaa:categoryId>1_2</nyaa:categoryId>"));
        assert!(xml.contains("<nyaa:trusted>Yes</nyaa:trusted>"));
        assert!(xml.contains("<nyaa:remake>No</nyaa:remake>"));
        assert!(xml.contains("<![CDATA[<a href=\"https://example.org/view/3\">#1_2</a>"));
    }

    #[test]
    fn test_render_empty_feed() {
        let channel = FeedChannel::for_listing("Index", "https://example.org", "Home");
        let xml = render_rss(&channel, &[]).unwrap();
        assert!(!xml.contains("<item>"));
        assert!(xml.trim_end().ends_with("</rss>"));
    }

    #[test]
    fn test_render_parses_back() {
        let channel = FeedChannel::for_listing("Index", "https://example.org", "Home");
        let xml = render_rss(&channel, &[item(), item()]).unwrap();

        let mut reader = quick_xml::Reader::from_str(&xml);
        let mut items = 0;
        loop {
            match reader.read_event().unwrap() {
                Event::Start(e) if e.name().as_ref() == b"item" => items += 1,
                Event::Eof => break,
                _ => {}
            }
        }
        assert_eq!(items, 2);
    }
}
