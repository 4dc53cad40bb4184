//! Feed parsing
//!
//! Any well-formed XML becomes a [`Document`]. RSS 2.0 is reshaped so that
//! the channel's items sit directly under the root, which is the shape the
//! default `.item[].link` path expects.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::document::{Document, Element};
use crate::error::{FeedError, FeedResult};

/// Parse a feed, normalising RSS 2.0 and Atom documents
pub fn parse_feed(bytes: &[u8]) -> FeedResult<Document> {
    let root = parse_xml(bytes)?.into_root();

    let root = match root.name() {
        "rss" => normalize_rss(root)?,
        "feed" => {
            let mut root = root;
            promote_link_hrefs(&mut root);
            root
        }
        _ => root,
    };

    Ok(Document::new(root))
}

/// Parse XML into a generic element tree
///
/// Element text is the concatenation of the element's own text and CDATA
/// sections, trimmed.
pub fn parse_xml(bytes: &[u8]) -> FeedResult<Document> {
    let mut reader = Reader::from_reader(bytes);
    let mut buf = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                stack.push(element_from(e)?);
            }
            Ok(Event::Empty(ref e)) => {
                let element = element_from(e)?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::End(_)) => {
                let mut element = stack
                    .pop()
                    .ok_or_else(|| FeedError::MalformedFeed("unexpected closing tag".into()))?;
                let trimmed = element.text().trim();
                if trimmed.len() != element.text().len() {
                    let trimmed = trimmed.to_string();
                    element.set_text(trimmed);
                }
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::Text(e)) => {
                if let Some(current) = stack.last_mut() {
                    current.push_text(&e.unescape()?);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(current) = stack.last_mut() {
                    current.push_text(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }

    if let Some(open) = stack.last() {
        return Err(FeedError::MalformedFeed(format!(
            "element <{}> is never closed",
            open.name()
        )));
    }

    root.map(Document::new)
        .ok_or_else(|| FeedError::MalformedFeed("no document element".into()))
}

fn element_from(e: &BytesStart<'_>) -> FeedResult<Element> {
    let mut element = Element::new(String::from_utf8_lossy(e.name().as_ref()));
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        element = element.with_attribute(key, value);
    }
    Ok(element)
}

/// Hand a finished element to its parent, or make it the root
fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> FeedResult<()> {
    match stack.last_mut() {
        Some(parent) => parent.push_child(element),
        None if root.is_none() => *root = Some(element),
        None => {
            return Err(FeedError::MalformedFeed(format!(
                "second document element <{}>",
                element.name()
            )))
        }
    }
    Ok(())
}

/// Reshape `rss/channel/item*` into `rss/{version, channel, item*}`
fn normalize_rss(mut rss: Element) -> FeedResult<Element> {
    let version = rss.attribute("version").unwrap_or_default().to_string();
    let children = std::mem::take(rss.children_mut());

    let mut channel = children
        .into_iter()
        .find(|c| c.name() == "channel")
        .ok_or_else(|| FeedError::MalformedFeed("rss document has no <channel>".into()))?;

    let (items, rest): (Vec<_>, Vec<_>) = std::mem::take(channel.children_mut())
        .into_iter()
        .partition(|c| c.name() == "item");
    *channel.children_mut() = rest;

    log::debug!("RSS {} feed with {} items", version, items.len());

    let mut root = Element::new(rss.name()).with_child(Element::leaf("version", version));
    root.push_child(channel);
    for item in items {
        root.push_child(item);
    }
    Ok(root)
}

/// Atom carries link targets in `href`; give empty `link` elements that text
fn promote_link_hrefs(element: &mut Element) {
    for child in element.children_mut().iter_mut() {
        if child.name() == "link" && child.text().is_empty() {
            if let Some(href) = child.attribute("href").map(str::to_string) {
                child.set_text(href);
            }
        }
        promote_link_hrefs(child);
    }
}
