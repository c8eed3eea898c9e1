//! Minimal PDF 1.4 writer for text-only reports
//!
//! Pages are A4 portrait with the standard Helvetica faces, so no font
//! data is embedded. Text is encoded as WinAnsi; characters outside that
//! set print as `?`.

use std::fmt::Write;

use super::{comment_text, ComparisonReport};

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 50.0;
/// Characters per body line at 10pt Helvetica inside the margins
const WRAP_WIDTH: usize = 92;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Style {
    Title,
    Heading,
    Body,
    Blank,
}

impl Style {
    fn font(self) -> &'static str {
        match self {
            Style::Title | Style::Heading => "F2",
            Style::Body | Style::Blank => "F1",
        }
    }

    fn size(self) -> f32 {
        match self {
            Style::Title => 18.0,
            Style::Heading => 13.0,
            Style::Body | Style::Blank => 10.0,
        }
    }

    fn leading(self) -> f32 {
        match self {
            Style::Title => 26.0,
            Style::Heading => 20.0,
            Style::Body => 13.0,
            Style::Blank => 8.0,
        }
    }
}

/// A flowing text document laid out onto A4 pages
#[derive(Debug, Clone, Default)]
pub struct PdfDocument {
    lines: Vec<(Style, String)>,
}

impl PdfDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(&mut self, text: &str) -> &mut Self {
        self.lines.push((Style::Title, text.to_string()));
        self
    }

    pub fn heading(&mut self, text: &str) -> &mut Self {
        self.lines.push((Style::Heading, text.to_string()));
        self
    }

    /// Body text, wrapped at word boundaries
    pub fn text(&mut self, text: &str) -> &mut Self {
        for line in wrap(text, WRAP_WIDTH) {
            self.lines.push((Style::Body, line));
        }
        self
    }

    pub fn blank(&mut self) -> &mut Self {
        self.lines.push((Style::Blank, String::new()));
        self
    }

    fn paginate(&self) -> Vec<Vec<(f32, Style, &str)>> {
        let top = PAGE_HEIGHT - MARGIN;
        let mut pages = vec![Vec::new()];
        let mut y = top;
        for (style, text) in &self.lines {
            y -= style.leading();
            if y < MARGIN {
                // A blank line never opens a page of its own
                if *style == Style::Blank {
                    continue;
                }
                pages.push(Vec::new());
                y = top - style.leading();
            }
            if *style != Style::Blank {
                if let Some(page) = pages.last_mut() {
                    page.push((y, *style, text.as_str()));
                }
            }
        }
        pages
    }

    pub fn page_count(&self) -> usize {
        self.paginate().len()
    }

    /// Serialize to PDF bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let pages = self.paginate();
        // 1 catalog, 2 page tree, 3 and 4 fonts, then a page and its content stream per page
        let page_ref = |index: usize| 5 + index * 2;
        let mut objects: Vec<Vec<u8>> = Vec::new();

        objects.push(b"<< /Type /Catalog /Pages 2 0 R >>".to_vec());
        let kids = (0..pages.len())
            .map(|i| format!("{} 0 R", page_ref(i)))
            .collect::<Vec<_>>()
            .join(" ");
        objects.push(format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids, pages.len()).into_bytes());
        for face in ["Helvetica", "Helvetica-Bold"] {
            objects.push(
                format!("<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>", face)
                    .into_bytes(),
            );
        }

        for (index, page) in pages.iter().enumerate() {
            objects.push(
                format!(
                    "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] \
                     /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents {} 0 R >>",
                    PAGE_WIDTH,
                    PAGE_HEIGHT,
                    page_ref(index) + 1
                )
                .into_bytes(),
            );

            let mut content = Vec::new();
            for (y, style, text) in page {
                content.extend_from_slice(
                    format!("BT /{} {} Tf {} {:.2} Td (", style.font(), style.size(), MARGIN, y).as_bytes(),
                );
                content.extend_from_slice(&encode_text(text));
                content.extend_from_slice(b") Tj ET\n");
            }
            let mut stream = format!("<< /Length {} >>\nstream\n", content.len()).into_bytes();
            stream.extend_from_slice(&content);
            stream.extend_from_slice(b"\nendstream");
            objects.push(stream);
        }

        let mut out = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n".to_vec();
        let mut offsets = Vec::with_capacity(objects.len());
        for (i, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n", i + 1).as_bytes());
            out.extend_from_slice(body);
            out.extend_from_slice(b"\nendobj\n");
        }

        let xref_at = out.len();
        let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
        for offset in offsets {
            let _ = writeln!(xref, "{:010} 00000 n ", offset);
        }
        let _ = write!(
            xref,
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_at
        );
        out.extend_from_slice(xref.as_bytes());
        out
    }
}

/// WinAnsi bytes with PDF string escapes applied
fn encode_text(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' | ')' | '\\' => {
                out.push(b'\\');
                out.push(c as u8);
            }
            '€' => out.push(0x80),
            '•' => out.push(0x95),
            '–' => out.push(0x96),
            '—' => out.push(0x97),
            c if (c as u32) < 0x20 => out.push(b' '),
            c if (c as u32) < 0x7F || (0xA0..=0xFF).contains(&(c as u32)) => out.push(c as u8),
            _ => out.push(b'?'),
        }
    }
    out
}

fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            lines.push(word.drain(..width).collect());
        }
        let word: String = word.into_iter().collect();
        if word.is_empty() {
            continue;
        }
        let needed = if line.is_empty() { word.chars().count() } else { line.chars().count() + 1 + word.chars().count() };
        if needed > width {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(&word);
    }
    if !line.is_empty() || lines.is_empty() {
        lines.push(line);
    }
    lines
}

pub(super) fn render(report: &ComparisonReport) -> Vec<u8> {
    let mut doc = PdfDocument::new();
    doc.title("Testplan-Vergleich")
        .text(&format!("Erstellt: {} - {} Berichte", report.generated_at, report.reports.len()))
        .blank();

    let o = &report.overall;
    doc.heading("Gesamtübersicht").text(&format!(
        "Bestanden: {}   Fehlgeschlagen: {}   In Bearbeitung: {}   Nicht begonnen: {}   Gesamt: {}",
        o.passed, o.failed, o.in_progress, o.not_started, o.total
    ));

    if !report.top_failures.is_empty() {
        doc.blank().heading("Top Fehlerpunkte");
        for (rank, failure) in report.top_failures.iter().enumerate() {
            doc.text(&format!("{}. {} ({}x fehlgeschlagen)", rank + 1, failure.description, failure.count));
        }
    }

    doc.blank().heading("Leistung pro Bericht");
    let perf = &report.performance;
    for (i, label) in perf.labels.iter().enumerate() {
        doc.text(&format!("{}: {} bestanden, {} fehlgeschlagen", label, perf.passed[i], perf.failed[i]));
    }

    doc.blank().heading("Aggregierte Testpfad-Analyse");
    for card in &report.aggregated {
        doc.blank().text(&format!("{} ({} Tester)", card.title, card.tester_count));
        for item in &card.items {
            doc.text(&format!(
                "• {}: {} Läufe, {} bestanden, {} fehlgeschlagen, {} in Bearbeitung, {} nicht begonnen ({:.0}%)",
                item.description,
                item.runs,
                item.passed,
                item.failed,
                item.in_progress,
                item.not_started,
                item.pass_rate()
            ));
            for c in &item.comments {
                let text = c.comment.as_deref().map(comment_text).unwrap_or_default();
                let images = match c.comment_images.len() {
                    0 => String::new(),
                    n => format!(" [{} Bild(er)]", n),
                };
                doc.text(&format!("    {}: {}{}", c.tester_name, text, images));
            }
        }
    }

    doc.blank().heading(&format!("Einzelne Berichte ({})", report.reports.len()));
    for path in &report.reports {
        doc.blank().text(&format!(
            "{} - Getestet von: {} - {} - {}% abgeschlossen",
            path.title,
            path.tester().unwrap_or("N/A"),
            path.export_timestamp.as_deref().unwrap_or("Kein Datum"),
            path.summary().completion()
        ));
        for (index, item) in path.items.iter().enumerate() {
            doc.text(&format!("{}. {} - {}", index + 1, item.description, item.status));
            if let Some(comment) = &item.comment {
                doc.text(&format!("    Kommentar: {}", comment_text(comment)));
            }
        }
    }

    doc.to_bytes()
}
