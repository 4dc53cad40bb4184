//! Generic document tree

/// An element of a parsed feed
///
/// Sibling elements may share a name; those are the repeatable elements a
/// `[]` step iterates over.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    name: String,
    text: String,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
}

impl Element {
    /// Create an element with no text or children
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Create a leaf element holding text
    pub fn leaf<N: Into<String>, T: Into<String>>(name: N, text: T) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            ..Self::default()
        }
    }

    /// Add a child, builder style
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Add an attribute, builder style
    pub fn with_attribute<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    /// Element name, including any namespace prefix (e.g. `dc:creator`)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Text directly inside this element, trimmed
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replace the text
    pub fn set_text<S: Into<String>>(&mut self, text: S) {
        self.text = text.into();
    }

    pub(crate) fn push_text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    /// Attribute value by name
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All child elements in document order
    pub fn children(&self) -> &[Element] {
        &self.children
    }

    pub(crate) fn children_mut(&mut self) -> &mut Vec<Element> {
        &mut self.children
    }

    /// Append a child element
    pub fn push_child(&mut self, child: Element) {
        self.children.push(child);
    }

    /// Every child with the given name, in document order
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// First child with the given name
    pub fn first_child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }
}

/// A parsed feed: a single root element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    root: Element,
}

impl Document {
    /// Wrap a root element
    pub fn new(root: Element) -> Self {
        Self { root }
    }

    /// The root element
    pub fn root(&self) -> &Element {
        &self.root
    }

    pub(crate) fn into_root(self) -> Element {
        self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_children_named_keeps_order() {
        let root = Element::new("rss")
            .with_child(Element::leaf("item", "1"))
            .with_child(Element::leaf("title", "t"))
            .with_child(Element::leaf("item", "2"));

        let texts: Vec<_> = root.children_named("item").map(Element::text).collect();
        assert_eq!(texts, vec!["1", "2"]);
        assert_eq!(root.first_child("title").unwrap().text(), "t");
        assert!(root.first_child("missing").is_none());
    }

    #[test]
    fn test_attribute_lookup() {
        let link = Element::new("link").with_attribute("href", "http://example.org");
        assert_eq!(link.attribute("href"), Some("http://example.org"));
        assert_eq!(link.attribute("rel"), None);
    }
}
