//! XLSX writer

use std::fs::File;
use std::io::{Seek, Write};
use std::path::Path;

use crate::error::XlsxResult;
use crate::styles::{StyleSheet, STYLES_XML};
use xlquery_core::{Cell, CellAddress, CellKind, Workbook, Worksheet};

/// XLSX file writer
pub struct XlsxWriter;

impl XlsxWriter {
    /// Write a workbook to a file path
    pub fn write_file<P: AsRef<Path>>(workbook: &Workbook, path: P) -> XlsxResult<()> {
        let file = File::create(path)?;
        Self::write(workbook, file)
    }

    /// Write a workbook to a writer
    pub fn write<W: Write + Seek>(workbook: &Workbook, writer: W) -> XlsxResult<()> {
        let mut zip = zip::ZipWriter::new(writer);

        Self::write_content_types(&mut zip, workbook)?;
        Self::write_root_rels(&mut zip)?;
        Self::write_workbook_xml(&mut zip, workbook)?;
        Self::write_workbook_rels(&mut zip, workbook)?;

        // Sheets first: wrapped cells may add formats to the style sheet
        let source = workbook.styles_part().unwrap_or(STYLES_XML);
        let mut styles = StyleSheet::parse(source.to_string())?;
        for (i, sheet) in workbook.worksheets().enumerate() {
            let content = Self::worksheet_xml(sheet, &mut styles)?;
            Self::write_part(&mut zip, &format!("xl/worksheets/sheet{}.xml", i + 1), &content)?;
        }
        Self::write_part(&mut zip, "xl/styles.xml", &styles.to_xml())?;

        zip.finish()?;
        Ok(())
    }

    fn write_part<W: Write + Seek>(
        zip: &mut zip::ZipWriter<W>,
        name: &str,
        content: &str,
    ) -> XlsxResult<()> {
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file(name, options)?;
        zip.write_all(content.as_bytes())?;
        Ok(())
    }

    fn write_content_types<W: Write + Seek>(
        zip: &mut zip::ZipWriter<W>,
        workbook: &Workbook,
    ) -> XlsxResult<()> {
        let mut content = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
    <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
    <Default Extension="xml" ContentType="application/xml"/>
    <Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
    <Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#,
        );

        for i in 0..workbook.sheet_count() {
            content.push_str(&format!(
                r#"
    <Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
                i + 1
            ));
        }

        content.push_str("\n</Types>");
        Self::write_part(zip, "[Content_Types].xml", &content)
    }

    fn write_root_rels<W: Write + Seek>(zip: &mut zip::ZipWriter<W>) -> XlsxResult<()> {
        let content = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;
        Self::write_part(zip, "_rels/.rels", content)
    }

    fn write_workbook_xml<W: Write + Seek>(
        zip: &mut zip::ZipWriter<W>,
        workbook: &Workbook,
    ) -> XlsxResult<()> {
        let mut content = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
    <sheets>"#,
        );

        for (i, sheet) in workbook.worksheets().enumerate() {
            content.push_str(&format!(
                r#"
        <sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
                escape_xml(sheet.name()),
                i + 1,
                i + 1
            ));
        }

        content.push_str(
            r#"
    </sheets>
</workbook>"#,
        );

        Self::write_part(zip, "xl/workbook.xml", &content)
    }

    fn write_workbook_rels<W: Write + Seek>(
        zip: &mut zip::ZipWriter<W>,
        workbook: &Workbook,
    ) -> XlsxResult<()> {
        let mut content = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );

        for i in 0..workbook.sheet_count() {
            content.push_str(&format!(
                r#"
    <Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
                i + 1,
                i + 1
            ));
        }

        // Styles relationship follows the sheets
        content.push_str(&format!(
            r#"
    <Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#,
            workbook.sheet_count() + 1
        ));

        Self::write_part(zip, "xl/_rels/workbook.xml.rels", &content)
    }

    fn worksheet_xml(sheet: &Worksheet, styles: &mut StyleSheet) -> XlsxResult<String> {
        let layout = sheet.layout();
        let mut content = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n<worksheet",
        );
        if !layout.root_attributes.iter().any(|(key, _)| key == "xmlns") {
            content.push_str(" xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\"");
        }
        for (key, value) in &layout.root_attributes {
            content.push_str(&format!(" {}=\"{}\"", key, escape_xml(value)));
        }
        content.push('>');
        content.push_str(&layout.before_data);
        content.push_str("\n    <sheetData>");

        for (row_idx, row) in sheet.rows().enumerate() {
            let mut cells = Vec::new();
            for (col, cell) in row.cells().enumerate() {
                let xf = styles.xf_for(cell.style, cell.alignment.wrap_text)?;
                cells.extend(Self::cell_xml(CellAddress::new(row_idx, col), cell, xf));
            }
            if cells.is_empty() {
                continue;
            }

            content.push_str(&format!("\n        <row r=\"{}\">", row_idx + 1));
            for cell in cells {
                content.push_str("\n            ");
                content.push_str(&cell);
            }
            content.push_str("\n        </row>");
        }

        content.push_str("\n    </sheetData>");
        content.push_str(&layout.after_data);
        content.push_str("\n</worksheet>");
        Ok(content)
    }

    /// Serialize a single cell written with cell format `xf`, `None` for
    /// cells with nothing to keep
    fn cell_xml(addr: CellAddress, cell: &Cell, xf: u32) -> Option<String> {
        let style_attr = if xf != 0 {
            format!(" s=\"{}\"", xf)
        } else {
            String::new()
        };

        if let Some(formula) = &cell.formula {
            let type_attr = match cell.kind {
                CellKind::Text => " t=\"str\"",
                CellKind::Boolean => " t=\"b\"",
                CellKind::Error => " t=\"e\"",
                CellKind::Number => "",
            };
            let cached = if cell.value.is_empty() {
                String::new()
            } else {
                format!("<v>{}</v>", escape_xml(&Self::stored_value(cell)))
            };
            return Some(format!(
                "<c r=\"{}\"{}{}><f>{}</f>{}</c>",
                addr,
                style_attr,
                type_attr,
                escape_xml(formula),
                cached
            ));
        }

        if cell.value.is_empty() {
            // Preserve style-only cells
            return (xf != 0).then(|| format!("<c r=\"{}\"{}/>", addr, style_attr));
        }

        Some(match cell.kind {
            CellKind::Text => {
                let space = if needs_space_preserve(&cell.value) {
                    " xml:space=\"preserve\""
                } else {
                    ""
                };
                format!(
                    "<c r=\"{}\"{} t=\"inlineStr\"><is><t{}>{}</t></is></c>",
                    addr,
                    style_attr,
                    space,
                    escape_xml(&cell.value)
                )
            }
            CellKind::Number => format!(
                "<c r=\"{}\"{}><v>{}</v></c>",
                addr,
                style_attr,
                escape_xml(&cell.value)
            ),
            CellKind::Boolean => format!(
                "<c r=\"{}\"{} t=\"b\"><v>{}</v></c>",
                addr,
                style_attr,
                Self::stored_value(cell)
            ),
            CellKind::Error => format!(
                "<c r=\"{}\"{} t=\"e\"><v>{}</v></c>",
                addr,
                style_attr,
                escape_xml(&cell.value)
            ),
        })
    }

    /// Value as stored in `<v>`; booleans are `1`/`0` in the file
    fn stored_value(cell: &Cell) -> String {
        match cell.kind {
            CellKind::Boolean if cell.value.eq_ignore_ascii_case("true") => "1".to_string(),
            CellKind::Boolean => "0".to_string(),
            _ => cell.value.clone(),
        }
    }
}

fn needs_space_preserve(s: &str) -> bool {
    s.starts_with(char::is_whitespace) || s.ends_with(char::is_whitespace)
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
