//! Style sheet handling
//!
//! A loaded workbook keeps its `xl/styles.xml` verbatim and cells keep their
//! `cellXfs` index, so number formats, fonts, fills and borders survive a
//! save. The only edit ever made is appending cell formats: when a cell must
//! wrap but its format does not, a copy of that format with wrapping switched
//! on is added to the end of `cellXfs`.

use std::collections::HashMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::XlsxResult;

/// Byte span of the `cellXfs` element within the source
#[derive(Debug)]
struct CellXfsSpan {
    start: usize,
    end: usize,
    name: String,
}

/// A parsed style sheet that can grow wrap variants of its cell formats
#[derive(Debug)]
pub(crate) struct StyleSheet {
    source: String,
    span: Option<CellXfsSpan>,
    /// Raw XML of each cell format, original ones first
    xfs: Vec<String>,
    wraps: Vec<bool>,
    original_len: usize,
    variants: HashMap<(u32, bool), u32>,
}

impl StyleSheet {
    /// Parse a style sheet, falling back to [`STYLES_XML`] when it has no
    /// cell formats
    pub(crate) fn parse(source: String) -> XlsxResult<Self> {
        let mut sheet = Self::scan(source)?;
        if sheet.span.is_none() || sheet.xfs.is_empty() {
            log::warn!("Style sheet has no cellXfs table, using the default styles");
            sheet = Self::scan(STYLES_XML.to_string())?;
        }
        Ok(sheet)
    }

    fn scan(source: String) -> XlsxResult<Self> {
        let mut span = None;
        let mut xfs = Vec::new();
        let mut wraps = Vec::new();

        {
            let mut reader = Reader::from_str(&source);
            let mut cell_xfs: Option<(usize, String)> = None;
            let mut xf_start = None;
            // Open elements below cellXfs
            let mut depth = 0usize;

            loop {
                let start = reader.buffer_position();
                let event = reader.read_event()?;
                let end = reader.buffer_position();

                match event {
                    Event::Start(e) => {
                        if cell_xfs.is_none() {
                            if e.local_name().as_ref() == b"cellXfs" {
                                cell_xfs = Some((start, qname(&e)));
                            }
                            continue;
                        }
                        if depth == 0 && e.local_name().as_ref() == b"xf" {
                            xf_start = Some(start);
                            wraps.push(false);
                        } else if e.local_name().as_ref() == b"alignment" {
                            set_last(&mut wraps, wrap_attr(&e));
                        }
                        depth += 1;
                    }
                    Event::Empty(e) => {
                        if cell_xfs.is_none() {
                            if e.local_name().as_ref() == b"cellXfs" {
                                span = Some(CellXfsSpan {
                                    start,
                                    end,
                                    name: qname(&e),
                                });
                                break;
                            }
                            continue;
                        }
                        if depth == 0 && e.local_name().as_ref() == b"xf" {
                            xfs.push(source[start..end].to_string());
                            wraps.push(false);
                        } else if e.local_name().as_ref() == b"alignment" {
                            set_last(&mut wraps, wrap_attr(&e));
                        }
                    }
                    Event::End(_) if cell_xfs.is_some() => {
                        if depth == 0 {
                            if let Some((start, name)) = cell_xfs.take() {
                                span = Some(CellXfsSpan { start, end, name });
                            }
                            break;
                        }
                        depth -= 1;
                        if depth == 0 {
                            if let Some(xf) = xf_start.take() {
                                xfs.push(source[xf..end].to_string());
                            }
                        }
                    }
                    Event::Eof => break,
                    _ => {}
                }
            }
        }

        let original_len = xfs.len();
        Ok(Self {
            source,
            span,
            xfs,
            wraps,
            original_len,
            variants: HashMap::new(),
        })
    }

    /// The style sheet XML as it was parsed
    pub(crate) fn into_source(self) -> String {
        self.source
    }

    /// Whether the given cell format wraps text
    pub(crate) fn wraps(&self, xf: u32) -> bool {
        self.wraps.get(xf as usize).copied().unwrap_or(false)
    }

    /// Cell format to write for a cell with format `base` and the given wrap
    /// setting, appending a variant of `base` when none fits
    pub(crate) fn xf_for(&mut self, base: u32, wrap: bool) -> XlsxResult<u32> {
        let base = if (base as usize) < self.xfs.len() { base } else { 0 };
        if self.wraps(base) == wrap {
            return Ok(base);
        }
        if let Some(&xf) = self.variants.get(&(base, wrap)) {
            return Ok(xf);
        }

        let variant = match self.xfs.get(base as usize) {
            Some(raw) => with_wrap(raw, wrap)?,
            None => return Ok(base),
        };
        let xf = self.xfs.len() as u32;
        self.xfs.push(variant);
        self.wraps.push(wrap);
        self.variants.insert((base, wrap), xf);
        Ok(xf)
    }

    /// Serialize, with any appended formats added to `cellXfs`
    pub(crate) fn to_xml(&self) -> String {
        let span = match &self.span {
            Some(span) if self.xfs.len() > self.original_len => span,
            _ => return self.source.clone(),
        };

        let mut xml = String::with_capacity(self.source.len() + 256);
        xml.push_str(&self.source[..span.start]);
        xml.push_str(&format!("<{} count=\"{}\">", span.name, self.xfs.len()));
        for xf in &self.xfs {
            xml.push_str(xf);
        }
        xml.push_str(&format!("</{}>", span.name));
        xml.push_str(&self.source[span.end..]);
        xml
    }
}

fn set_last(wraps: &mut [bool], wrap: bool) {
    if let Some(last) = wraps.last_mut() {
        *last = wrap;
    }
}

fn qname(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

fn wrap_attr(e: &BytesStart<'_>) -> bool {
    e.attributes().flatten().any(|attr| {
        attr.key.as_ref() == b"wrapText"
            && attr
                .unescape_value()
                .map_or(false, |v| v.as_ref() == "1" || v.as_ref() == "true")
    })
}

/// Start tag text for `e` without the attributes named in `skip` and with
/// `extra` appended
fn start_tag(e: &BytesStart<'_>, skip: &[u8], extra: &str) -> String {
    let mut tag = format!("<{}", qname(e));
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == skip {
            continue;
        }
        let value = String::from_utf8_lossy(&attr.value).replace('"', "&quot;");
        tag.push_str(&format!(
            " {}=\"{}\"",
            String::from_utf8_lossy(attr.key.as_ref()),
            value
        ));
    }
    tag.push(' ');
    tag.push_str(extra);
    tag
}

/// Copy of a raw `<xf>` element with its alignment wrap set to `wrap`
fn with_wrap(xf: &str, wrap: bool) -> XlsxResult<String> {
    let wrap_attr = format!("wrapText=\"{}\"", if wrap { 1 } else { 0 });
    let mut reader = Reader::from_str(xf);
    let mut out = String::with_capacity(xf.len() + 48);
    let mut alignment = String::new();
    let mut copied = 0;
    let mut depth = 0usize;
    let mut aligned = false;

    loop {
        let start = reader.buffer_position();
        let event = reader.read_event()?;
        let end = reader.buffer_position();

        let (e, empty) = match event {
            Event::Start(e) => (e, false),
            Event::Empty(e) => (e, true),
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    out.push_str(&xf[copied..start]);
                    if !aligned {
                        out.push_str(&alignment);
                    }
                    out.push_str(&xf[start..end]);
                    return Ok(out);
                }
                continue;
            }
            Event::Eof => return Ok(out),
            _ => continue,
        };

        if depth == 0 {
            let name = qname(&e);
            let prefix = name
                .split_once(':')
                .map(|(p, _)| format!("{}:", p))
                .unwrap_or_default();
            alignment = format!("<{}alignment {}/>", prefix, wrap_attr);
            out.push_str(&start_tag(&e, b"applyAlignment", "applyAlignment=\"1\""));
            out.push('>');
            if empty {
                out.push_str(&alignment);
                out.push_str(&format!("</{}>", name));
                return Ok(out);
            }
            copied = end;
        } else if depth == 1 && !aligned {
            out.push_str(&xf[copied..start]);
            if e.local_name().as_ref() == b"alignment" {
                out.push_str(&start_tag(&e, b"wrapText", &wrap_attr));
                out.push_str(if empty { "/>" } else { ">" });
                copied = end;
            } else {
                // Alignment comes first among the children
                out.push_str(&alignment);
                copied = start;
            }
            aligned = true;
        }

        if !empty {
            depth += 1;
        }
    }
}

/// Style sheet for workbooks that were not loaded from a file
pub(crate) const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
    <fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts>
    <fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills>
    <borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>
    <cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>
    <cellXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/></cellXfs>
    <cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles>
</styleSheet>"#;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(xml: &str) -> StyleSheet {
        StyleSheet::parse(xml.to_string()).unwrap()
    }

    #[test]
    fn test_default_styles_gain_one_wrap_format() {
        let mut styles = parse(STYLES_XML);
        assert!(!styles.wraps(0));

        assert_eq!(styles.xf_for(0, false).unwrap(), 0);
        assert_eq!(styles.xf_for(0, true).unwrap(), 1);
        assert_eq!(styles.xf_for(0, true).unwrap(), 1);
        assert!(styles.wraps(1));

        let reparsed = parse(&styles.to_xml());
        assert_eq!(reparsed.xfs.len(), 2);
        assert!(reparsed.wraps(1));
        assert!(reparsed.to_xml().contains("<cellXfs count=\"2\">"));
    }

    #[test]
    fn test_cell_style_xfs_are_ignored() {
        let xml = r#"<styleSheet>
            <cellStyleXfs count="1"><xf><alignment wrapText="1"/></xf></cellStyleXfs>
            <cellXfs count="3">
                <xf numFmtId="0"/>
                <xf numFmtId="0"><alignment horizontal="left"/></xf>
                <xf numFmtId="0"><alignment wrapText="true"/></xf>
            </cellXfs>
        </styleSheet>"#;
        let styles = parse(xml);
        assert_eq!(styles.wraps, vec![false, false, true]);
    }

    #[test]
    fn test_unchanged_styles_are_written_verbatim() {
        let xml = r#"<styleSheet><numFmts count="1"><numFmt numFmtId="164" formatCode="yyyy-mm-dd"/></numFmts><cellXfs count="2"><xf numFmtId="0"/><xf numFmtId="164" applyNumberFormat="1"/></cellXfs></styleSheet>"#;
        let mut styles = parse(xml);
        assert_eq!(styles.xf_for(1, false).unwrap(), 1);
        assert_eq!(styles.to_xml(), xml);
    }

    #[test]
    fn test_wrap_variant_keeps_number_format() {
        let xml = r#"<styleSheet><cellXfs count="2"><xf numFmtId="0"/><xf numFmtId="164" applyNumberFormat="1"/></cellXfs></styleSheet>"#;
        let mut styles = parse(xml);

        assert_eq!(styles.xf_for(1, true).unwrap(), 2);
        assert_eq!(
            styles.xfs[2],
            r#"<xf numFmtId="164" applyNumberFormat="1" applyAlignment="1"><alignment wrapText="1"/></xf>"#
        );
        assert_eq!(
            styles.to_xml(),
            r#"<styleSheet><cellXfs count="3"><xf numFmtId="0"/><xf numFmtId="164" applyNumberFormat="1"/><xf numFmtId="164" applyNumberFormat="1" applyAlignment="1"><alignment wrapText="1"/></xf></cellXfs></styleSheet>"#
        );
    }

    #[test]
    fn test_wrap_variant_replaces_existing_alignment() {
        let xf = r#"<xf fontId="2" applyAlignment="1"><alignment horizontal="center" wrapText="0"/><protection locked="0"/></xf>"#;
        assert_eq!(
            with_wrap(xf, true).unwrap(),
            r#"<xf fontId="2" applyAlignment="1"><alignment horizontal="center" wrapText="1"/><protection locked="0"/></xf>"#
        );

        let xf = r#"<xf fontId="2"><protection locked="0"/></xf>"#;
        assert_eq!(
            with_wrap(xf, true).unwrap(),
            r#"<xf fontId="2" applyAlignment="1"><alignment wrapText="1"/><protection locked="0"/></xf>"#
        );
    }

    #[test]
    fn test_missing_cell_xfs_falls_back_to_default() {
        let styles = parse("<styleSheet><fonts count=\"0\"/></styleSheet>");
        assert_eq!(styles.xfs.len(), 1);
        assert!(styles.into_source().contains("cellXfs"));
    }

    #[test]
    fn test_out_of_range_format_uses_default() {
        let mut styles = parse(STYLES_XML);
        assert_eq!(styles.xf_for(9, false).unwrap(), 0);
    }
}
