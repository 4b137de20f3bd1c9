//! Report output: a self-contained, color-coded HTML page and a flat CSV
//! export.

use crate::compare::{ComparisonReport, ComparisonRow};
use crate::{Error, Result};
use serde::Serialize;
use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;

/// File name of the HTML report inside a report directory.
pub const REPORT_FILE_NAME: &str = "translation_comparison_report.html";

const STYLE: &str = r#"<style>
  body { font-family: Arial, Helvetica, sans-serif; margin: 18px; color:#222; }
  h1 { text-align:center; color:#1f4e79; }
  table { border-collapse: collapse; width:100%; }
  th, td { border:1px solid #ddd; padding:8px; vertical-align:top; white-space:pre-wrap; }
  th { background:#333; color:#fff; position: sticky; top:0; z-index:2; }
  td.small { width:90px; font-size:13px; text-align:center; }
  tr.ok { background:#e6f4ea; }
  tr.review { background:#fff7e6; }
  tr.missing { background:#fbeaea; }
  .mono { font-family: "Courier New", monospace; font-size:12px; color:#333; }
  .caption { margin-bottom:12px; color:#333; }
  .summary { margin-bottom:12px; font-weight:bold; }
  .legend { margin:8px 0 18px 0; }
  .legend span { display:inline-block; padding:6px 10px; margin-right:10px; border-radius:4px; }
</style>"#;

/// Escape text for inclusion in HTML content or quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render the full HTML document for a comparison.
pub fn render_html(report: &ComparisonReport) -> String {
    let mut html = String::new();
    let lang = escape_html(&report.back_translation_language.to_uppercase());
    let threshold_pct = report.threshold * 100.0;

    html.push_str("<!doctype html><html><head><meta charset='utf-8'>");
    html.push_str("<title>Translation Comparison</title>");
    html.push_str(STYLE);
    html.push_str("</head><body>");

    let _ = write!(
        html,
        "<h1>Translation Comparison \u{2014} {} \u{2194} {}</h1>",
        escape_html(&report.source_name),
        escape_html(&report.translated_name)
    );
    let _ = write!(
        html,
        "<div class='caption'>Generated: {}</div>",
        report.generated_at.format("%Y-%m-%d %H:%M:%S")
    );

    let s = &report.summary;
    let _ = write!(
        html,
        "<div class='summary'>{} rows: {} OK, {} need review, {} missing, {} extra, {} empty</div>",
        s.total, s.ok, s.needs_review, s.missing, s.extra, s.empty
    );

    let _ = write!(
        html,
        "<div class='legend'>\
         <span style=\"background:#e6f4ea\">OK (&gt;= {threshold_pct:.0}%)</span>\
         <span style=\"background:#fff7e6\">Needs Review (&lt; {threshold_pct:.0}%)</span>\
         <span style=\"background:#fbeaea\">Missing / Extra</span>\
         </div>"
    );

    html.push_str("<table><thead><tr>");
    html.push_str("<th class='small'>Slide</th>");
    html.push_str("<th class='small'>Shape</th>");
    html.push_str("<th class='small'>Para</th>");
    html.push_str("<th>Source text</th>");
    html.push_str("<th>Translated text</th>");
    let _ = write!(html, "<th>Back-translated (to {})</th>", lang);
    html.push_str("<th class='small'>Sim (%)</th>");
    html.push_str("<th class='small'>Status</th>");
    html.push_str("</tr></thead><tbody>");

    for row in &report.rows {
        push_row(&mut html, row);
    }

    html.push_str("</tbody></table></body></html>");
    html
}

fn push_row(html: &mut String, row: &ComparisonRow) {
    let _ = write!(
        html,
        "<tr class='{}'>\
         <td class='small'>{}</td>\
         <td class='small'>{}</td>\
         <td class='small'>{}</td>\
         <td>{}</td>\
         <td>{}</td>\
         <td class='mono'>{}</td>\
         <td class='small'>{}</td>\
         <td class='small'>{}</td>\
         </tr>",
        row.status.css_class(),
        row.key.slide,
        row.key.shape,
        row.key.paragraph,
        escape_html(&row.source_text),
        escape_html(&row.translated_text),
        escape_html(&row.back_translated),
        row.similarity,
        escape_html(row.status.label()),
    );
}

/// Render and write the HTML report to `path`.
pub fn write_html(report: &ComparisonReport, path: &Path) -> Result<()> {
    let html = render_html(report);
    std::fs::write(path, html).map_err(|e| {
        Error::Report(format!("Failed to write {}: {}", path.display(), e))
    })?;
    log::info!("Wrote HTML report to {}", path.display());
    Ok(())
}

#[derive(Serialize)]
struct CsvRecord<'a> {
    slide: usize,
    shape_index: usize,
    para_index: usize,
    source_text: &'a str,
    translated_text: &'a str,
    back_translated: &'a str,
    similarity: f64,
    status: &'static str,
}

/// Write every row as CSV, with a header line.
pub fn write_csv<W: Write>(report: &ComparisonReport, writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in &report.rows {
        csv_writer
            .serialize(CsvRecord {
                slide: row.key.slide,
                shape_index: row.key.shape,
                para_index: row.key.paragraph,
                source_text: &row.source_text,
                translated_text: &row.translated_text,
                back_translated: &row.back_translated,
                similarity: row.similarity,
                status: row.status.label(),
            })
            .map_err(|e| Error::Report(format!("CSV error: {}", e)))?;
    }
    csv_writer
        .flush()
        .map_err(|e| Error::Report(format!("CSV flush failed: {}", e)))?;
    Ok(())
}
