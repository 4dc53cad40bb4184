//! Feed parsing seam

use xlquery_feed::{parse_feed, Document, FeedResult};

/// Turns response bytes into a [`Document`]
pub trait FeedParser {
    fn parse(&self, bytes: &[u8]) -> FeedResult<Document>;
}

impl<P: FeedParser + ?Sized> FeedParser for &P {
    fn parse(&self, bytes: &[u8]) -> FeedResult<Document> {
        (**self).parse(bytes)
    }
}

/// RSS 2.0, Atom or any other XML, see [`xlquery_feed::parse_feed`]
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlFeedParser;

impl FeedParser for XmlFeedParser {
    fn parse(&self, bytes: &[u8]) -> FeedResult<Document> {
        parse_feed(bytes)
    }
}
