//! Self-contained HTML comparison report

use std::fmt::Write;

use super::{comment_text, ComparisonReport};
use crate::media::DATA_IMAGE_PREFIX;
use crate::types::{PathSummary, TestStatus};

const STYLE: &str = "\
body{font-family:system-ui,sans-serif;margin:2rem;color:#1e293b}\
h1{margin-bottom:0}h2{border-bottom:1px solid #cbd5e1;padding-bottom:.25rem;margin-top:2rem}\
table{border-collapse:collapse;width:100%;margin:.5rem 0}\
th,td{border:1px solid #e2e8f0;padding:.35rem .5rem;text-align:left;vertical-align:top}\
th{background:#f1f5f9}.num{text-align:right}\
.passed{color:#15803d}.failed{color:#b91c1c}.in-progress{color:#1d4ed8}.not-started{color:#64748b}\
.comment{font-size:.85rem;color:#0e7490;margin:.25rem 0}\
img{max-width:240px;max-height:160px;border:1px solid #cbd5e1;margin:.25rem .25rem 0 0}";

pub(super) fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn status_class(status: TestStatus) -> &'static str {
    match status {
        TestStatus::Passed => "passed",
        TestStatus::Failed => "failed",
        TestStatus::InProgress => "in-progress",
        TestStatus::NotStarted => "not-started",
    }
}

fn images(out: &mut String, urls: &[String]) {
    for url in urls.iter().filter(|u| u.starts_with(DATA_IMAGE_PREFIX)) {
        let _ = write!(out, "<img src=\"{}\" alt=\"Anhang\">", escape(url));
    }
}

fn summary_row(out: &mut String, summary: &PathSummary) {
    let _ = write!(
        out,
        "<tr><td class=\"num passed\">{}</td><td class=\"num failed\">{}</td>\
         <td class=\"num in-progress\">{}</td><td class=\"num not-started\">{}</td>\
         <td class=\"num\">{}</td></tr>",
        summary.passed,
        summary.failed,
        summary.in_progress,
        summary.not_started,
        summary.total
    );
}

pub(super) fn render(report: &ComparisonReport) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "<!DOCTYPE html><html lang=\"de\"><head><meta charset=\"utf-8\">\
         <title>Testplan-Vergleich</title><style>{STYLE}</style></head><body>\
         <h1>Testplan-Vergleich</h1><p>Erstellt: {} &middot; {} Berichte</p>",
        escape(&report.generated_at),
        report.reports.len()
    );

    out.push_str("<h2>Gesamtübersicht</h2><table><tr><th>Bestanden</th><th>Fehlgeschlagen</th>\
                  <th>In Bearbeitung</th><th>Nicht begonnen</th><th>Gesamt</th></tr>");
    summary_row(&mut out, &report.overall);
    out.push_str("</table>");

    if !report.top_failures.is_empty() {
        out.push_str("<h2>Top Fehlerpunkte</h2><table><tr><th>Testpunkt</th><th>Fehleranzahl</th></tr>");
        for failure in &report.top_failures {
            let _ = write!(
                out,
                "<tr><td>{}</td><td class=\"num failed\">{}</td></tr>",
                escape(&failure.description),
                failure.count
            );
        }
        out.push_str("</table>");
    }

    out.push_str("<h2>Leistung pro Bericht</h2><table><tr><th>Bericht</th><th>Bestanden</th><th>Fehlgeschlagen</th></tr>");
    let perf = &report.performance;
    for (i, label) in perf.labels.iter().enumerate() {
        let _ = write!(
            out,
            "<tr><td>{}</td><td class=\"num passed\">{}</td><td class=\"num failed\">{}</td></tr>",
            escape(label),
            perf.passed[i],
            perf.failed[i]
        );
    }
    out.push_str("</table>");

    out.push_str("<h2>Aggregierte Testpfad-Analyse</h2>");
    for card in &report.aggregated {
        let _ = write!(
            out,
            "<h3>{} <small>({} Tester)</small></h3><table><tr><th>Testpunkt</th><th>Läufe</th>\
             <th>Bestanden</th><th>Fehlgeschlagen</th><th>In Bearbeitung</th><th>Nicht begonnen</th>\
             <th>Kommentare</th></tr>",
            escape(&card.title),
            card.tester_count
        );
        for item in &card.items {
            let _ = write!(
                out,
                "<tr><td>{}</td><td class=\"num\">{}</td><td class=\"num passed\">{}</td>\
                 <td class=\"num failed\">{}</td><td class=\"num in-progress\">{}</td>\
                 <td class=\"num not-started\">{}</td><td>",
                escape(&item.description),
                item.runs,
                item.passed,
                item.failed,
                item.in_progress,
                item.not_started
            );
            for c in &item.comments {
                let _ = write!(out, "<div class=\"comment\"><strong>{}</strong>", escape(&c.tester_name));
                if let Some(comment) = &c.comment {
                    let _ = write!(out, ": {}", escape(&comment_text(comment)));
                }
                images(&mut out, &c.comment_images);
                out.push_str("</div>");
            }
            out.push_str("</td></tr>");
        }
        out.push_str("</table>");
    }

    let _ = write!(out, "<h2>Einzelne Berichte ({})</h2>", report.reports.len());
    for path in &report.reports {
        let summary = path.summary();
        let _ = write!(
            out,
            "<h3>{}</h3><p>Getestet von: {} &middot; {} &middot; {}% abgeschlossen</p><table>\
             <tr><th>#</th><th>Testpunkt</th><th>Status</th><th>Kommentar</th></tr>",
            escape(&path.title),
            escape(path.tester().unwrap_or("N/A")),
            escape(path.export_timestamp.as_deref().unwrap_or("Kein Datum")),
            summary.completion()
        );
        for (index, item) in path.items.iter().enumerate() {
            let _ = write!(
                out,
                "<tr><td class=\"num\">{}.</td><td>{}</td><td class=\"{}\">{}</td><td>",
                index + 1,
                escape(&item.description),
                status_class(item.status),
                item.status
            );
            if let Some(comment) = &item.comment {
                let _ = write!(out, "<div class=\"comment\">{}</div>", escape(&comment_text(comment)));
            }
            images(&mut out, item.images());
            out.push_str("</td></tr>");
        }
        out.push_str("</table>");
    }

    out.push_str("</body></html>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::tests::sample;

    #[test]
    fn test_escape() {
        assert_eq!(escape("<a href=\"x\">&</a>"), "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;");
    }

    #[test]
    fn test_render_sections() {
        let html = render(&sample());
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("Smoke &lt;Web&gt;"));
        assert!(html.contains("Top Fehlerpunkte"));
        assert!(html.contains("500 on &amp; submit"));
        assert!(html.contains("Einzelne Berichte (2)"));
        assert!(!html.contains("<Web>"));
    }
}
