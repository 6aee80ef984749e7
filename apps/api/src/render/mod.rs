//! Result Renderer — page-width document view and PDF export.
//!
//! The tuned HTML comes from the model and is inserted verbatim. The backend is
//! treated as non-adversarial: nothing here escapes or sanitizes it.

pub mod export;

pub use export::{DocumentExporter, ExportError, ExportOptions, WkHtmlToPdfExporter};

/// Letter width at 96 dpi (8.5 in).
pub const PAGE_WIDTH_PX: u32 = 816;
pub const CONTAINER_ID: &str = "resume-content";

/// Styles for the class names the tuning instruction prescribes. Keeps the rendered
/// document self-contained so the export engine needs no network access.
const DOCUMENT_STYLES: &str = r#"
body { margin: 0; background: #ffffff; font-family: "Helvetica Neue", Arial, sans-serif; color: #1f2937; }
#resume-content { background: #ffffff; margin: 0 auto; padding: 3rem; box-sizing: border-box; }
.w-full { width: 100%; } .text-left { text-align: left; } .text-center { text-align: center; }
.text-3xl { font-size: 1.875rem; line-height: 2.25rem; } .text-lg { font-size: 1.125rem; line-height: 1.75rem; }
.text-base { font-size: 1rem; line-height: 1.5rem; } .text-sm { font-size: 0.875rem; line-height: 1.25rem; }
.font-bold { font-weight: 700; } .font-medium { font-weight: 500; } .italic { font-style: italic; } .uppercase { text-transform: uppercase; }
.text-slate-800 { color: #1e293b; } .text-gray-900 { color: #111827; } .text-gray-800 { color: #1f2937; }
.text-gray-700 { color: #374151; } .text-gray-600 { color: #4b5563; }
.border-b { border-bottom: 1px solid; } .border-b-2 { border-bottom: 2px solid; }
.border-gray-300 { border-color: #d1d5db; } .border-gray-800 { border-color: #1f2937; }
.mb-0 { margin-bottom: 0; } .mb-1 { margin-bottom: 0.25rem; } .mb-3 { margin-bottom: 0.75rem; } .mb-4 { margin-bottom: 1rem; }
.mt-5 { margin-top: 1.25rem; } .ml-4 { margin-left: 1rem; } .pb-2 { padding-bottom: 0.5rem; }
.flex { display: flex; } .justify-between { justify-content: space-between; } .items-baseline { align-items: baseline; }
.list-disc { list-style-type: disc; } .list-outside { list-style-position: outside; }
.space-y-1 > * + * { margin-top: 0.25rem; }
h1, h2, p, ul { margin-top: 0; }
li, .flex { page-break-inside: avoid; break-inside: avoid; }
"#;

/// Wraps tuned HTML in a fixed-width container and returns a complete document.
pub fn render_document(content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Tuned Resume</title>
<style>{DOCUMENT_STYLES}</style>
</head>
<body>
<div id="{CONTAINER_ID}" style="max-width: {PAGE_WIDTH_PX}px;">
<div class="w-full text-left">
{content}
</div>
</div>
</body>
</html>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::prompts::STRUCTURAL_CLASSES;

    #[test]
    fn test_content_is_inserted_verbatim() {
        let html = r#"<h1 class="text-3xl font-bold">JANE DOE</h1><p>a &amp; b <b>c</b></p>"#;
        let doc = render_document(html);
        assert!(doc.contains(html));
        assert!(!doc.contains("&lt;h1"));
    }

    #[test]
    fn test_container_has_page_width() {
        let doc = render_document("<p>x</p>");
        assert!(doc.contains(r#"id="resume-content""#));
        assert!(doc.contains("max-width: 816px;"));
        assert!(doc.starts_with("<!DOCTYPE html>"));
    }

    #[test]
    fn test_stylesheet_covers_structural_classes() {
        for class in STRUCTURAL_CLASSES {
            assert!(
                DOCUMENT_STYLES.contains(&format!(".{class} ")),
                "no rule for .{class}"
            );
        }
    }
}
