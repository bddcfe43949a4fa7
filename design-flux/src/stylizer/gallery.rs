//! HTML gallery of stylized variations

use std::fmt::Write as _;
use std::path::Path;

use super::{StyleStatus, StylizationReport};

const STYLE: &str = r#"
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; margin: 0; padding: 20px; background: #f5f5f5; }
h1, h2 { color: #333; }
.variation-section { margin-bottom: 40px; background: white; padding: 20px; border-radius: 8px; box-shadow: 0 2px 4px rgba(0,0,0,0.1); }
.style-grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(300px, 1fr)); gap: 20px; margin-top: 20px; }
.style-card { background: #f9f9f9; border-radius: 8px; overflow: hidden; }
.style-card img { width: 100%; height: 200px; object-fit: cover; }
.style-info { padding: 15px; }
.style-name { font-weight: 600; margin-bottom: 5px; }
.style-description { font-size: 14px; color: #666; line-height: 1.4; }
.error { color: #e74c3c; font-style: italic; }
"#;

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// "variation_1" -> "Variation 1"
fn title_case(key: &str) -> String {
    key.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render the report; image links are relative to `gallery_dir` where possible
pub fn render_gallery(report: &StylizationReport, gallery_dir: &Path) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Stylized Variations Gallery</title>\n<style>{}</style>\n</head>\n<body>\n\
         <h1>Stylized Variations Gallery</h1>\n<p>Generated on: {}</p>\n",
        STYLE,
        escape_html(&report.metadata.stylization_timestamp.to_rfc3339())
    );

    for (key, variation) in &report.stylized_variations {
        let _ = write!(
            html,
            "<div class=\"variation-section\">\n<h2>{}</h2>\n<p>Original: {}</p>\n<div class=\"style-grid\">\n",
            escape_html(&title_case(key)),
            escape_html(&variation.original_variation)
        );

        for job in &variation.stylized_images {
            let name = escape_html(&job.style_name);
            match &job.status {
                StyleStatus::Success { output_path, .. } => {
                    let src = output_path.strip_prefix(gallery_dir).unwrap_or(output_path.as_path());
                    let _ = write!(
                        html,
                        "<div class=\"style-card\">\n<img src=\"{}\" alt=\"{}\">\n\
                         <div class=\"style-info\">\n<div class=\"style-name\">{}</div>\n\
                         <div class=\"style-description\">{}</div>\n</div>\n</div>\n",
                        escape_html(&src.to_string_lossy()),
                        name,
                        name,
                        escape_html(&job.style_description)
                    );
                }
                StyleStatus::Failed { error } => {
                    let _ = write!(
                        html,
                        "<div class=\"style-card\">\n<div class=\"style-info\">\n\
                         <div class=\"style-name\">{}</div>\n<div class=\"error\">Error: {}</div>\n\
                         </div>\n</div>\n",
                        name,
                        escape_html(error)
                    );
                }
                StyleStatus::Pending => {}
            }
        }

        html.push_str("</div>\n</div>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}
