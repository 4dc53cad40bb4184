//! XLSX reader

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::{XlsxError, XlsxResult};
use crate::styles::StyleSheet;
use xlquery_core::{CellAddress, CellKind, SheetLayout, Workbook, Worksheet, MAX_COLS, MAX_ROWS};

/// Decode Excel's `_xHHHH_` escape sequences in strings.
///
/// Excel uses this format to encode special characters in XML:
/// - `_x000d_` = CR (carriage return)
/// - `_x000a_` = LF (line feed)
/// - `_x005f_` = Underscore (escaped underscore)
fn decode_excel_escapes(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(pos) = rest.find("_x") {
        result.push_str(&rest[..pos]);
        let candidate = &rest[pos..];
        let decoded = candidate
            .get(2..6)
            .filter(|hex| hex.chars().all(|c| c.is_ascii_hexdigit()))
            .filter(|_| candidate.as_bytes().get(6) == Some(&b'_'))
            .and_then(|hex| u32::from_str_radix(hex, 16).ok())
            .and_then(char::from_u32);

        match decoded {
            Some(c) => {
                result.push(c);
                rest = &candidate[7..];
            }
            None => {
                result.push_str("_x");
                rest = &candidate[2..];
            }
        }
    }
    result.push_str(rest);

    result
}

/// Raw cell state collected while walking a `<c>` element
#[derive(Default)]
struct RawCell {
    reference: Option<String>,
    cell_type: Option<String>,
    style: Option<u32>,
    value: Option<String>,
    formula: Option<String>,
}

/// A top-level worksheet element outside `sheetData` being collected
struct Fragment {
    start: usize,
    name: String,
    /// Refers to a package relationship that is not carried over
    has_relationship: bool,
}

impl Fragment {
    fn new(start: usize, e: &BytesStart<'_>) -> Self {
        let mut fragment = Self {
            start,
            name: String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
            has_relationship: false,
        };
        fragment.note(e);
        fragment
    }

    fn note(&mut self, e: &BytesStart<'_>) {
        self.has_relationship |= e
            .attributes()
            .flatten()
            .any(|attr| attr.key.prefix().is_some() && attr.key.local_name().as_ref() == b"id");
    }
}

/// XLSX file reader
pub struct XlsxReader;

impl XlsxReader {
    /// Read a workbook from a file path
    pub fn read_file<P: AsRef<Path>>(path: P) -> XlsxResult<Workbook> {
        let file = File::open(path)?;
        Self::read(file)
    }

    /// Read a workbook from a reader
    pub fn read<R: Read + Seek>(reader: R) -> XlsxResult<Workbook> {
        let mut archive = zip::ZipArchive::new(reader)?;

        // Verify this is an XLSX file
        if archive.by_name("[Content_Types].xml").is_err() {
            return Err(XlsxError::InvalidFormat(
                "Missing [Content_Types].xml".into(),
            ));
        }

        let shared_strings = Self::read_shared_strings(&mut archive)?;
        let styles = Self::read_styles(&mut archive)?;
        let sheet_info = Self::read_workbook_xml(&mut archive)?;
        let sheet_paths = Self::read_workbook_rels(&mut archive)?;

        let mut workbook = Workbook::empty();

        for (name, r_id) in &sheet_info {
            match sheet_paths.get(r_id) {
                Some(path) => {
                    let mut worksheet = Worksheet::new(name.as_str());
                    Self::read_worksheet(
                        &mut archive,
                        path,
                        &mut worksheet,
                        &shared_strings,
                        styles.as_ref(),
                    )?;
                    workbook.add_existing_worksheet(worksheet)?;
                }
                None => log::warn!("Sheet {name:?} has no worksheet relationship ({r_id}), skipping"),
            }
        }

        if workbook.is_empty() {
            return Err(XlsxError::InvalidFormat("Workbook has no worksheets".into()));
        }

        workbook.set_styles_part(styles.map(StyleSheet::into_source));
        Ok(workbook)
    }

    /// Read the shared strings table
    fn read_shared_strings<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> XlsxResult<Vec<String>> {
        let mut strings = Vec::new();

        let file = match archive.by_name("xl/sharedStrings.xml") {
            Ok(f) => f,
            Err(_) => return Ok(strings), // No shared strings is valid
        };

        // Text is kept exactly, leading and trailing spaces included
        let mut xml_reader = Reader::from_reader(BufReader::new(file));

        let mut buf = Vec::new();
        let mut current_string = String::new();
        let mut in_si = false;
        let mut in_t = false;
        let mut in_phonetic = false;

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"si" => {
                        in_si = true;
                        current_string.clear();
                    }
                    b"rPh" => in_phonetic = true,
                    b"t" if in_si && !in_phonetic => in_t = true,
                    _ => {}
                },
                Ok(Event::Empty(e)) if e.name().as_ref() == b"si" => {
                    strings.push(String::new());
                }
                Ok(Event::End(e)) => match e.name().as_ref() {
                    b"si" => {
                        strings.push(decode_excel_escapes(&current_string));
                        current_string.clear();
                        in_si = false;
                    }
                    b"t" => in_t = false,
                    b"rPh" => in_phonetic = false,
                    _ => {}
                },
                Ok(Event::Text(e)) if in_t => {
                    current_string.push_str(&e.unescape()?);
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(strings)
    }

    /// Read the style sheet, if the package has one
    fn read_styles<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> XlsxResult<Option<StyleSheet>> {
        let mut file = match archive.by_name("xl/styles.xml") {
            Ok(f) => f,
            Err(_) => return Ok(None),
        };
        let mut xml = String::new();
        file.read_to_string(&mut xml)?;
        StyleSheet::parse(xml).map(Some)
    }

    /// Read workbook.xml to get sheet names and rIds
    fn read_workbook_xml<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> XlsxResult<Vec<(String, String)>> {
        let file = archive
            .by_name("xl/workbook.xml")
            .map_err(|_| XlsxError::MissingPart("xl/workbook.xml".into()))?;

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        xml_reader.trim_text(true);

        let mut buf = Vec::new();
        let mut sheets = Vec::new();

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.name().as_ref() == b"sheet" => {
                    let name = attr_value(&e, b"name");
                    let r_id = attr_value(&e, b"r:id");
                    if let (Some(name), Some(r_id)) = (name, r_id) {
                        sheets.push((name, r_id));
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(sheets)
    }

    /// Read workbook.xml.rels to get sheet file paths
    fn read_workbook_rels<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> XlsxResult<HashMap<String, String>> {
        let file = archive
            .by_name("xl/_rels/workbook.xml.rels")
            .map_err(|_| XlsxError::MissingPart("xl/_rels/workbook.xml.rels".into()))?;

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        xml_reader.trim_text(true);

        let mut buf = Vec::new();
        let mut rels = HashMap::new();

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Empty(e)) | Ok(Event::Start(e))
                    if e.name().as_ref() == b"Relationship" =>
                {
                    let id = attr_value(&e, b"Id");
                    let target = attr_value(&e, b"Target");
                    let rel_type = attr_value(&e, b"Type");

                    // Only worksheet relationships matter
                    if let (Some(id), Some(target), Some(rel_type)) = (id, target, rel_type) {
                        if rel_type.ends_with("/worksheet") {
                            // Target is relative to the xl/ folder unless absolute
                            let full_path = match target.strip_prefix('/') {
                                Some(absolute) => absolute.to_string(),
                                None => format!("xl/{}", target),
                            };
                            rels.insert(id, full_path);
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(rels)
    }

    /// Read a worksheet from the archive
    ///
    /// Cells go into the worksheet; the other top-level elements are kept as
    /// raw XML in its [`SheetLayout`], except `dimension` (rewritten on save)
    /// and anything pointing at a relationship.
    fn read_worksheet<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
        path: &str,
        worksheet: &mut Worksheet,
        shared_strings: &[String],
        styles: Option<&StyleSheet>,
    ) -> XlsxResult<()> {
        let mut xml = String::new();
        archive
            .by_name(path)
            .map_err(|_| XlsxError::MissingPart(path.to_string()))?
            .read_to_string(&mut xml)?;

        let mut xml_reader = Reader::from_str(&xml);

        let mut layout = SheetLayout::default();
        // Open elements before the current event
        let mut depth = 0usize;
        let mut fragment: Option<Fragment> = None;
        let mut in_sheet_data = false;
        let mut past_sheet_data = false;

        // Position of the next cell when `r` attributes are omitted
        let mut current_row: usize = 0;
        let mut next_col: usize = 0;
        let mut seen_row = false;

        let mut cell = RawCell::default();
        let mut in_cell = false;
        let mut in_value = false;
        let mut in_formula = false;
        let mut in_inline_str = false;
        let mut in_inline_text = false;
        let mut in_phonetic = false;

        loop {
            let start = xml_reader.buffer_position();
            let event = xml_reader.read_event()?;
            let end = xml_reader.buffer_position();

            match event {
                Event::Start(e) => {
                    match depth {
                        0 => layout.root_attributes = root_attributes(&e),
                        1 if e.local_name().as_ref() == b"sheetData" => in_sheet_data = true,
                        1 => fragment = Some(Fragment::new(start, &e)),
                        _ if in_sheet_data => match e.name().as_ref() {
                            b"row" => {
                                current_row = Self::row_index(&e, current_row, seen_row);
                                seen_row = true;
                                next_col = 0;
                            }
                            b"c" => {
                                in_cell = true;
                                cell = Self::raw_cell(&e);
                            }
                            b"v" if in_cell => in_value = true,
                            b"f" if in_cell => in_formula = true,
                            b"is" if in_cell => in_inline_str = true,
                            b"rPh" if in_inline_str => in_phonetic = true,
                            b"t" if in_inline_str && !in_phonetic => in_inline_text = true,
                            _ => {}
                        },
                        _ => {
                            if let Some(fragment) = fragment.as_mut() {
                                fragment.note(&e);
                            }
                        }
                    }
                    depth += 1;
                }
                Event::Empty(e) => match depth {
                    0 => layout.root_attributes = root_attributes(&e),
                    1 if e.local_name().as_ref() == b"sheetData" => past_sheet_data = true,
                    1 => {
                        let fragment = Fragment::new(start, &e);
                        let raw = &xml[start..end];
                        Self::keep_fragment(&mut layout, fragment, raw, past_sheet_data, path);
                    }
                    _ if in_sheet_data => match e.name().as_ref() {
                        b"row" => {
                            current_row = Self::row_index(&e, current_row, seen_row);
                            seen_row = true;
                            next_col = 0;
                        }
                        b"c" => {
                            // Style-only cell
                            let raw = Self::raw_cell(&e);
                            next_col = Self::process_cell(
                                worksheet,
                                raw,
                                (current_row, next_col),
                                shared_strings,
                                styles,
                            )?;
                        }
                        _ => {}
                    },
                    _ => {
                        if let Some(fragment) = fragment.as_mut() {
                            fragment.note(&e);
                        }
                    }
                },
                Event::End(e) => {
                    depth = depth.saturating_sub(1);
                    if depth == 1 && in_sheet_data {
                        in_sheet_data = false;
                        past_sheet_data = true;
                    } else if depth == 1 {
                        if let Some(fragment) = fragment.take() {
                            let raw = &xml[fragment.start..end];
                            Self::keep_fragment(&mut layout, fragment, raw, past_sheet_data, path);
                        }
                    } else if in_sheet_data {
                        match e.name().as_ref() {
                            b"c" => {
                                let raw = std::mem::take(&mut cell);
                                next_col = Self::process_cell(
                                    worksheet,
                                    raw,
                                    (current_row, next_col),
                                    shared_strings,
                                    styles,
                                )?;
                                in_cell = false;
                            }
                            b"v" => in_value = false,
                            b"f" => in_formula = false,
                            b"is" => in_inline_str = false,
                            b"rPh" => in_phonetic = false,
                            b"t" if in_inline_str => in_inline_text = false,
                            _ => {}
                        }
                    }
                }
                // Whitespace between elements is ignored by state, not trimmed
                Event::Text(e) if in_sheet_data => {
                    if in_value {
                        cell.value
                            .get_or_insert_with(String::new)
                            .push_str(&e.unescape()?);
                    } else if in_formula {
                        cell.formula
                            .get_or_insert_with(String::new)
                            .push_str(&e.unescape()?);
                    } else if in_inline_text {
                        cell.value
                            .get_or_insert_with(String::new)
                            .push_str(&e.unescape()?);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        worksheet.set_layout(layout);
        Ok(())
    }

    fn keep_fragment(
        layout: &mut SheetLayout,
        fragment: Fragment,
        raw: &str,
        after_data: bool,
        path: &str,
    ) {
        if fragment.name == "dimension" {
            return;
        }
        if fragment.has_relationship {
            log::debug!(
                "Dropping <{}> from {}, it refers to a relationship",
                fragment.name,
                path
            );
            return;
        }
        if after_data {
            layout.after_data.push_str(raw);
        } else {
            layout.before_data.push_str(raw);
        }
    }

    fn row_index(e: &BytesStart<'_>, current: usize, seen_row: bool) -> usize {
        attr_value(e, b"r")
            .and_then(|r| r.parse::<usize>().ok())
            .map(|r| r.saturating_sub(1)) // 1-based to 0-based
            .unwrap_or(if seen_row { current + 1 } else { 0 })
    }

    fn raw_cell(e: &BytesStart<'_>) -> RawCell {
        RawCell {
            reference: attr_value(e, b"r"),
            cell_type: attr_value(e, b"t"),
            style: attr_value(e, b"s").and_then(|s| s.parse::<u32>().ok()),
            ..RawCell::default()
        }
    }

    /// Store a cell in the worksheet, returning the column after it
    fn process_cell(
        worksheet: &mut Worksheet,
        raw: RawCell,
        fallback: (usize, usize),
        shared_strings: &[String],
        styles: Option<&StyleSheet>,
    ) -> XlsxResult<usize> {
        let (row, col) = match raw.reference.as_deref() {
            Some(reference) => {
                let addr = CellAddress::parse(reference).map_err(|e| {
                    XlsxError::InvalidFormat(format!("Cell reference {:?}: {}", reference, e))
                })?;
                (addr.row, addr.col)
            }
            None => fallback,
        };
        if row >= MAX_ROWS || col >= MAX_COLS {
            return Err(XlsxError::InvalidFormat(format!(
                "Cell at row {} column {} is outside the sheet",
                row + 1,
                col + 1
            )));
        }

        let style = raw.style.unwrap_or(0);
        let wrap = styles.map_or(false, |s| s.wraps(style));

        let (value, kind) = match (raw.cell_type.as_deref(), raw.value) {
            (_, None) => (String::new(), CellKind::Text),
            (Some("s"), Some(v)) => {
                let idx: usize = v.trim().parse().map_err(|_| {
                    XlsxError::InvalidFormat(format!("Invalid shared string index '{}'", v))
                })?;
                let text = shared_strings.get(idx).cloned().ok_or_else(|| {
                    XlsxError::InvalidFormat(format!("Shared string index {} out of range", idx))
                })?;
                (text, CellKind::Text)
            }
            (Some("str"), Some(v)) | (Some("inlineStr"), Some(v)) => {
                (decode_excel_escapes(&v), CellKind::Text)
            }
            (Some("b"), Some(v)) => {
                let text = if v.trim() == "1" { "TRUE" } else { "FALSE" };
                (text.to_string(), CellKind::Boolean)
            }
            (Some("e"), Some(v)) => (v, CellKind::Error),
            (_, Some(v)) => (v, CellKind::Number),
        };

        if value.is_empty() && raw.formula.is_none() && style == 0 {
            return Ok(col + 1);
        }

        let cell = worksheet.cell_at_mut(row, col);
        cell.value = value;
        cell.kind = kind;
        cell.formula = raw.formula;
        cell.style = style;
        cell.alignment.wrap_text = wrap;

        Ok(col + 1)
    }
}

/// Attributes of the worksheet root element, unescaped
fn root_attributes(e: &BytesStart<'_>) -> Vec<(String, String)> {
    e.attributes()
        .flatten()
        .filter_map(|attr| {
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            attr.unescape_value().ok().map(|v| (key, v.into_owned()))
        })
        .collect()
}

/// Unescaped value of the attribute with the given key
fn attr_value(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}
