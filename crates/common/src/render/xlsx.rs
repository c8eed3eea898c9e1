//! XLSX workbook written as raw SpreadsheetML parts in a zip container

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::{comment_text, ComparisonReport};
use crate::error::Result;

const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const PKG_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const XML_DECL: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n";

const STYLES: &str = "<fonts count=\"2\"><font><sz val=\"11\"/><name val=\"Calibri\"/></font>\
<font><b/><sz val=\"11\"/><name val=\"Calibri\"/></font></fonts>\
<fills count=\"2\"><fill><patternFill patternType=\"none\"/></fill><fill><patternFill patternType=\"gray125\"/></fill></fills>\
<borders count=\"1\"><border><left/><right/><top/><bottom/><diagonal/></border></borders>\
<cellStyleXfs count=\"1\"><xf numFmtId=\"0\" fontId=\"0\" fillId=\"0\" borderId=\"0\"/></cellStyleXfs>\
<cellXfs count=\"2\"><xf numFmtId=\"0\" fontId=\"0\" fillId=\"0\" borderId=\"0\" xfId=\"0\"/>\
<xf numFmtId=\"0\" fontId=\"1\" fillId=\"0\" borderId=\"0\" xfId=\"0\" applyFont=\"1\"/></cellXfs>\
<cellStyles count=\"1\"><cellStyle name=\"Normal\" xfId=\"0\" builtinId=\"0\"/></cellStyles>";

#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Text(String),
    Bold(String),
    Number(f64),
}

impl From<usize> for Cell {
    fn from(n: usize) -> Self {
        Cell::Number(n as f64)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

fn header(labels: &[&str]) -> Vec<Cell> {
    labels.iter().map(|l| Cell::Bold(l.to_string())).collect()
}

struct Sheet {
    name: &'static str,
    rows: Vec<Vec<Cell>>,
}

impl Sheet {
    fn new(name: &'static str) -> Self {
        Self { name, rows: Vec::new() }
    }

    fn push(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }

    fn section(&mut self, title: &str) {
        if !self.rows.is_empty() {
            self.rows.push(Vec::new());
        }
        self.rows.push(vec![Cell::Bold(title.to_string())]);
    }

    fn to_xml(&self) -> String {
        let mut xml = format!("{XML_DECL}<worksheet xmlns=\"{MAIN_NS}\"><sheetData>");
        for (r, row) in self.rows.iter().enumerate() {
            xml.push_str(&format!("<row r=\"{}\">", r + 1));
            for (c, cell) in row.iter().enumerate() {
                let reference = format!("{}{}", column_name(c), r + 1);
                match cell {
                    Cell::Text(text) => xml.push_str(&format!(
                        "<c r=\"{reference}\" t=\"inlineStr\"><is><t xml:space=\"preserve\">{}</t></is></c>",
                        escape(text)
                    )),
                    Cell::Bold(text) => xml.push_str(&format!(
                        "<c r=\"{reference}\" t=\"inlineStr\" s=\"1\"><is><t xml:space=\"preserve\">{}</t></is></c>",
                        escape(text)
                    )),
                    Cell::Number(n) => xml.push_str(&format!("<c r=\"{reference}\"><v>{}</v></c>", n)),
                }
            }
            xml.push_str("</row>");
        }
        xml.push_str("</sheetData></worksheet>");
        xml
    }
}

/// Spreadsheet column letters: 0 → A, 25 → Z, 26 → AA
fn column_name(mut index: usize) -> String {
    let mut name = Vec::new();
    loop {
        name.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    name.reverse();
    String::from_utf8_lossy(&name).into_owned()
}

/// XML text escaping; control characters XML 1.0 cannot carry are dropped
fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\t' | '\n' | '\r' => out.push(c),
            c if (c as u32) < 0x20 => {}
            _ => out.push(c),
        }
    }
    out
}

fn overview_sheet(report: &ComparisonReport) -> Sheet {
    let mut sheet = Sheet::new("Übersicht");
    sheet.section("Gesamtübersicht");
    sheet.push(header(&["Bestanden", "Fehlgeschlagen", "In Bearbeitung", "Nicht begonnen", "Gesamt"]));
    let o = &report.overall;
    sheet.push(vec![o.passed.into(), o.failed.into(), o.in_progress.into(), o.not_started.into(), o.total.into()]);

    sheet.section("Top Fehlerpunkte");
    sheet.push(header(&["Testpunkt", "Fehleranzahl"]));
    for failure in &report.top_failures {
        sheet.push(vec![failure.description.as_str().into(), failure.count.into()]);
    }

    sheet.section("Leistung pro Bericht");
    sheet.push(header(&["Bericht", "Bestanden", "Fehlgeschlagen"]));
    let perf = &report.performance;
    for (i, label) in perf.labels.iter().enumerate() {
        sheet.push(vec![label.as_str().into(), perf.passed[i].into(), perf.failed[i].into()]);
    }
    sheet
}

fn aggregated_sheet(report: &ComparisonReport) -> Sheet {
    let mut sheet = Sheet::new("Aggregiert");
    sheet.push(header(&[
        "Testpfad",
        "Tester (Anzahl)",
        "Testpunkt",
        "Läufe",
        "Bestanden",
        "Fehlgeschlagen",
        "In Bearbeitung",
        "Nicht begonnen",
        "Bestehensquote %",
        "Kommentare",
    ]));
    for card in &report.aggregated {
        for item in &card.items {
            let comments = item
                .comments
                .iter()
                .map(|c| {
                    let text = c.comment.as_deref().map(comment_text).unwrap_or_default();
                    match c.comment_images.len() {
                        0 => format!("{}: {}", c.tester_name, text),
                        n => format!("{}: {} [{} Bild(er)]", c.tester_name, text, n),
                    }
                })
                .collect::<Vec<_>>()
                .join("\n");
            sheet.push(vec![
                card.title.as_str().into(),
                card.tester_count.into(),
                item.description.as_str().into(),
                item.runs.into(),
                item.passed.into(),
                item.failed.into(),
                item.in_progress.into(),
                item.not_started.into(),
                Cell::Number((item.pass_rate() * 10.0).round() / 10.0),
                comments.into(),
            ]);
        }
    }
    sheet
}

fn reports_sheet(report: &ComparisonReport) -> Sheet {
    let mut sheet = Sheet::new("Berichte");
    sheet.push(header(&["Testpfad", "Tester", "Exportiert", "#", "Testpunkt", "Status", "Kommentar", "Bilder"]));
    for path in &report.reports {
        for (index, item) in path.items.iter().enumerate() {
            sheet.push(vec![
                path.title.as_str().into(),
                path.tester().unwrap_or("N/A").into(),
                path.export_timestamp.as_deref().unwrap_or("").into(),
                (index + 1).into(),
                item.description.as_str().into(),
                item.status.label().into(),
                item.comment.as_deref().map(comment_text).unwrap_or_default().into(),
                item.images().len().into(),
            ]);
        }
    }
    sheet
}

pub(super) fn render(report: &ComparisonReport) -> Result<Vec<u8>> {
    let sheets = [overview_sheet(report), aggregated_sheet(report), reports_sheet(report)];

    let mut content_types = format!(
        "{XML_DECL}<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
         <Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
         <Default Extension=\"xml\" ContentType=\"application/xml\"/>\
         <Override PartName=\"/xl/workbook.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml\"/>\
         <Override PartName=\"/xl/styles.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml\"/>"
    );
    let mut workbook = format!("{XML_DECL}<workbook xmlns=\"{MAIN_NS}\" xmlns:r=\"{REL_NS}\"><sheets>");
    let mut workbook_rels = format!("{XML_DECL}<Relationships xmlns=\"{PKG_REL_NS}\">");
    for (i, sheet) in sheets.iter().enumerate() {
        let n = i + 1;
        content_types.push_str(&format!(
            "<Override PartName=\"/xl/worksheets/sheet{n}.xml\" \
             ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml\"/>"
        ));
        workbook.push_str(&format!("<sheet name=\"{}\" sheetId=\"{n}\" r:id=\"rId{n}\"/>", escape(sheet.name)));
        workbook_rels.push_str(&format!(
            "<Relationship Id=\"rId{n}\" Type=\"{REL_NS}/worksheet\" Target=\"worksheets/sheet{n}.xml\"/>"
        ));
    }
    content_types.push_str("</Types>");
    workbook.push_str("</sheets></workbook>");
    workbook_rels.push_str(&format!(
        "<Relationship Id=\"rId{}\" Type=\"{REL_NS}/styles\" Target=\"styles.xml\"/></Relationships>",
        sheets.len() + 1
    ));
    let root_rels = format!(
        "{XML_DECL}<Relationships xmlns=\"{PKG_REL_NS}\">\
         <Relationship Id=\"rId1\" Type=\"{REL_NS}/officeDocument\" Target=\"xl/workbook.xml\"/></Relationships>"
    );
    let styles = format!("{XML_DECL}<styleSheet xmlns=\"{MAIN_NS}\">{STYLES}</styleSheet>");

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let part = |zip: &mut ZipWriter<Cursor<Vec<u8>>>, name: String, body: &str| -> Result<()> {
        zip.start_file(name, options)?;
        zip.write_all(body.as_bytes())?;
        Ok(())
    };
    part(&mut zip, "[Content_Types].xml".to_string(), &content_types)?;
    part(&mut zip, "_rels/.rels".to_string(), &root_rels)?;
    part(&mut zip, "xl/workbook.xml".to_string(), &workbook)?;
    part(&mut zip, "xl/_rels/workbook.xml.rels".to_string(), &workbook_rels)?;
    part(&mut zip, "xl/styles.xml".to_string(), &styles)?;
    for (i, sheet) in sheets.iter().enumerate() {
        part(&mut zip, format!("xl/worksheets/sheet{}.xml", i + 1), &sheet.to_xml())?;
    }
    Ok(zip.finish()?.into_inner())
}
