use std::sync::LazyLock;

use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;

use crate::resilience::error::UpstreamFetchError;

static TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag pattern"));
static SPACE_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

/// Raw fields of one `<item>`, exactly as the feed carried them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RssItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub content_encoded: Option<String>,
    pub pub_date: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemField {
    Title,
    Link,
    Description,
    ContentEncoded,
    PubDate,
}

impl ItemField {
    fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Self::Title),
            b"link" => Some(Self::Link),
            b"description" => Some(Self::Description),
            b"content:encoded" => Some(Self::ContentEncoded),
            b"pubDate" => Some(Self::PubDate),
            _ => None,
        }
    }

    fn assign(self, item: &mut RssItem, value: String) {
        let slot = match self {
            Self::Title => &mut item.title,
            Self::Link => &mut item.link,
            Self::Description => &mut item.description,
            Self::ContentEncoded => &mut item.content_encoded,
            Self::PubDate => &mut item.pub_date,
        };
        *slot = Some(value);
    }
}

/// Extracts `rss > channel > item` entries.
///
/// Anything that is not a well-formed document rooted at `<rss>` is a
/// malformed payload. Elements other than the known item fields are skipped.
pub fn parse_rss(xml: &str) -> Result<Vec<RssItem>, UpstreamFetchError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut saw_root = false;
    let mut items = Vec::new();
    let mut current: Option<RssItem> = None;
    let mut field: Option<ItemField> = None;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                let name = start.name().as_ref().to_vec();
                if path.is_empty() {
                    check_root(&name, saw_root)?;
                    saw_root = true;
                }
                let parent = path.last().map(Vec::as_slice);
                if name.as_slice() == b"item" && parent == Some(b"channel".as_slice()) && path.len() == 2 {
                    current = Some(RssItem::default());
                } else if current.is_some() && field.is_none() && parent == Some(b"item".as_slice()) {
                    field = ItemField::from_name(&name);
                    text.clear();
                }
                path.push(name);
            }
            Ok(Event::Empty(empty)) => {
                if path.is_empty() {
                    check_root(empty.name().as_ref(), saw_root)?;
                    saw_root = true;
                }
            }
            Ok(Event::End(_)) => {
                path.pop();
                let parent = path.last().map(Vec::as_slice);
                if let Some(active) = field {
                    if parent == Some(b"item".as_slice()) {
                        if let Some(item) = current.as_mut() {
                            active.assign(item, std::mem::take(&mut text));
                        }
                        field = None;
                    }
                } else if path.len() == 2 && parent == Some(b"channel".as_slice()) {
                    if let Some(item) = current.take() {
                        items.push(item);
                    }
                }
            }
            Ok(Event::Text(raw)) => {
                if field.is_some() {
                    match raw.unescape() {
                        Ok(value) => text.push_str(&value),
                        Err(_) => text.push_str(&String::from_utf8_lossy(&raw)),
                    }
                }
            }
            Ok(Event::CData(raw)) => {
                if field.is_some() {
                    text.push_str(&String::from_utf8_lossy(&raw.into_inner()));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(UpstreamFetchError::malformed(format!(
                    "invalid xml at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
        }
    }

    if !path.is_empty() {
        return Err(UpstreamFetchError::malformed("document ended inside an open element"));
    }
    if !saw_root {
        return Err(UpstreamFetchError::malformed("document has no <rss> root"));
    }
    Ok(items)
}

fn check_root(name: &[u8], saw_root: bool) -> Result<(), UpstreamFetchError> {
    if saw_root {
        return Err(UpstreamFetchError::malformed("document has more than one root element"));
    }
    if name != b"rss" {
        return Err(UpstreamFetchError::malformed(format!(
            "document root is <{}>, expected <rss>",
            String::from_utf8_lossy(name)
        )));
    }
    Ok(())
}

/// Strips markup, decodes the common entities and collapses whitespace.
pub fn clean_text(raw: &str) -> String {
    let stripped = TAG_PATTERN.replace_all(raw, "");
    let decoded = stripped
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    SPACE_PATTERN.replace_all(&decoded, " ").trim().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/">
  <channel>
    <title>Channel title is not an item</title>
    <link>https://example.com</link>
    <item>
      <title>First &amp; foremost</title>
      <link>https://example.com/1</link>
      <description>&lt;p&gt;Escaped &lt;b&gt;markup&lt;/b&gt;&lt;/p&gt;</description>
      <pubDate>Wed, 01 May 2024 08:30:00 GMT</pubDate>
    </item>
    <item>
      <title><![CDATA[Second <em>story</em>]]></title>
      <link>https://example.com/2</link>
      <content:encoded><![CDATA[<div>Body only</div>]]></content:encoded>
    </item>
    <item>
      <link>https://example.com/no-title</link>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn extracts_items_and_their_fields() {
        let items = parse_rss(FEED).unwrap();
        assert_eq!(items.len(), 3);

        assert_eq!(items[0].title.as_deref(), Some("First & foremost"));
        assert_eq!(items[0].link.as_deref(), Some("https://example.com/1"));
        assert_eq!(items[0].description.as_deref(), Some("<p>Escaped <b>markup</b></p>"));
        assert_eq!(items[0].pub_date.as_deref(), Some("Wed, 01 May 2024 08:30:00 GMT"));

        assert_eq!(items[1].title.as_deref(), Some("Second <em>story</em>"));
        assert_eq!(items[1].description, None);
        assert_eq!(items[1].content_encoded.as_deref(), Some("<div>Body only</div>"));

        assert_eq!(items[2].title, None);
    }

    #[test]
    fn rejects_documents_that_are_not_rss() {
        assert!(matches!(parse_rss("<html><body/></html>"), Err(UpstreamFetchError::Malformed(_))));
        assert!(matches!(parse_rss(""), Err(UpstreamFetchError::Malformed(_))));
        assert!(matches!(parse_rss("not xml at all"), Err(UpstreamFetchError::Malformed(_))));
    }

    #[test]
    fn rejects_broken_nesting() {
        let broken = "<rss><channel><item><title>cut</channel></rss>";
        assert!(matches!(parse_rss(broken), Err(UpstreamFetchError::Malformed(_))));

        let truncated = "<rss><channel><item><title>cut</title>";
        assert!(matches!(parse_rss(truncated), Err(UpstreamFetchError::Malformed(_))));
    }

    #[test]
    fn empty_channel_yields_no_items() {
        assert!(parse_rss("<rss><channel></channel></rss>").unwrap().is_empty());
    }

    #[test]
    fn clean_text_strips_tags_and_entities() {
        assert_eq!(
            clean_text("<p>Tom&nbsp;&amp;&nbsp;Jerry</p>\n\n  say &quot;hi&quot; &#39;there&#39; &lt;3"),
            "Tom & Jerry say \"hi\" 'there' <3"
        );
        assert_eq!(clean_text("   "), "");
    }
}
