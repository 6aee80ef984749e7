//! PDF export through an external HTML-to-PDF engine.
//!
//! The engine is a collaborator, not something we reimplement: it is invoked with a
//! fixed configuration (`ExportOptions::standard`) and its output bytes are returned
//! untouched.

use std::process::Stdio;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("PDF engine command is empty")]
    NoEngine,

    #[error("failed to start PDF engine '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("PDF engine exited with {status}: {stderr}")]
    EngineFailed { status: String, stderr: String },

    #[error("PDF engine produced no output")]
    EmptyOutput,

    #[error("I/O error during export: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PageFormat {
    Letter,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageBreakMode {
    AvoidAll,
    Css,
    Legacy,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageOptions {
    #[serde(rename = "type")]
    pub image_type: &'static str,
    pub quality: f32,
}

/// Fixed export configuration. Serializes to the shape browser-side exporters
/// (html2pdf.js) accept, so a client can reproduce the same document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportOptions {
    pub filename: &'static str,
    /// [top/bottom, left/right] in `unit`.
    pub margin: [f32; 2],
    pub unit: &'static str,
    pub format: PageFormat,
    pub orientation: Orientation,
    pub image: ImageOptions,
    /// Rasterization scale relative to CSS pixels.
    pub scale: f32,
    pub pagebreak: Vec<PageBreakMode>,
}

impl ExportOptions {
    pub fn standard() -> Self {
        Self {
            filename: "Tuned_Resume.pdf",
            margin: [0.4, 0.4],
            unit: "in",
            format: PageFormat::Letter,
            orientation: Orientation::Portrait,
            image: ImageOptions {
                image_type: "jpeg",
                quality: 0.98,
            },
            scale: 2.0,
            pagebreak: vec![
                PageBreakMode::AvoidAll,
                PageBreakMode::Css,
                PageBreakMode::Legacy,
            ],
        }
    }

    /// Command-line flags for wkhtmltopdf-compatible engines.
    pub fn engine_args(&self) -> Vec<String> {
        let [vertical, horizontal] = self.margin;
        let page_size = match self.format {
            PageFormat::Letter => "Letter",
        };
        let orientation = match self.orientation {
            Orientation::Portrait => "Portrait",
        };
        let mut args = vec![
            "--quiet".to_string(),
            "--enable-local-file-access".to_string(),
            "--page-size".to_string(),
            page_size.to_string(),
            "--orientation".to_string(),
            orientation.to_string(),
        ];
        for (flag, value) in [
            ("--margin-top", vertical),
            ("--margin-bottom", vertical),
            ("--margin-left", horizontal),
            ("--margin-right", horizontal),
        ] {
            args.push(flag.to_string());
            args.push(format!("{value}{}", self.unit));
        }
        args.push("--image-quality".to_string());
        args.push(((self.image.quality * 100.0).round() as u32).to_string());
        args.push("--dpi".to_string());
        args.push(((96.0 * self.scale).round() as u32).to_string());
        args
    }
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self::standard()
    }
}

#[async_trait]
pub trait DocumentExporter: Send + Sync {
    /// Converts a complete HTML document into PDF bytes.
    async fn export(&self, document: &str, options: &ExportOptions) -> Result<Vec<u8>, ExportError>;
}

/// Runs a wkhtmltopdf-compatible executable: `<program> [prefix args] <flags> <in.html> <out.pdf>`.
pub struct WkHtmlToPdfExporter {
    program: String,
    prefix_args: Vec<String>,
}

impl WkHtmlToPdfExporter {
    /// Accepts a whitespace-separated command, e.g. `wkhtmltopdf` or `xvfb-run wkhtmltopdf`.
    pub fn from_command(command: &str) -> Result<Self, ExportError> {
        let mut parts = command.split_whitespace().map(String::from);
        let program = parts.next().ok_or(ExportError::NoEngine)?;
        Ok(Self {
            program,
            prefix_args: parts.collect(),
        })
    }
}

#[async_trait]
impl DocumentExporter for WkHtmlToPdfExporter {
    async fn export(&self, document: &str, options: &ExportOptions) -> Result<Vec<u8>, ExportError> {
        let workdir = tempfile::tempdir()?;
        let input = workdir.path().join("resume.html");
        let output = workdir.path().join(options.filename);
        tokio::fs::write(&input, document).await?;

        debug!("Running PDF engine {} for {}", self.program, input.display());

        let result = Command::new(&self.program)
            .args(&self.prefix_args)
            .args(options.engine_args())
            .arg(&input)
            .arg(&output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ExportError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !result.status.success() {
            return Err(ExportError::EngineFailed {
                status: result.status.to_string(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        let pdf = tokio::fs::read(&output).await?;
        if pdf.is_empty() {
            return Err(ExportError::EmptyOutput);
        }

        info!("Exported {} ({} bytes)", options.filename, pdf.len());
        Ok(pdf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_options() {
        let options = ExportOptions::standard();
        assert_eq!(options.filename, "Tuned_Resume.pdf");
        assert_eq!(options.margin, [0.4, 0.4]);
        assert_eq!(options.format, PageFormat::Letter);
        assert_eq!(options.orientation, Orientation::Portrait);
        assert!((options.image.quality - 0.98).abs() < f32::EPSILON);
    }

    #[test]
    fn test_options_serialize_for_browser_exporters() {
        let value = serde_json::to_value(ExportOptions::standard()).unwrap();
        assert_eq!(value["format"], "letter");
        assert_eq!(value["orientation"], "portrait");
        assert_eq!(value["image"]["type"], "jpeg");
        assert_eq!(
            value["pagebreak"],
            serde_json::json!(["avoid-all", "css", "legacy"])
        );
    }

    #[test]
    fn test_engine_args() {
        let args = ExportOptions::standard().engine_args();
        let joined = args.join(" ");
        assert!(joined.contains("--page-size Letter"));
        assert!(joined.contains("--orientation Portrait"));
        assert!(joined.contains("--margin-top 0.4in"));
        assert!(joined.contains("--margin-right 0.4in"));
        assert!(joined.contains("--image-quality 98"));
        assert!(joined.contains("--dpi 192"));
    }

    #[test]
    fn test_empty_command_is_rejected() {
        assert!(matches!(
            WkHtmlToPdfExporter::from_command("   "),
            Err(ExportError::NoEngine)
        ));
    }

    #[tokio::test]
    async fn test_missing_engine_fails_to_spawn() {
        let exporter =
            WkHtmlToPdfExporter::from_command("resutune-definitely-missing-engine").unwrap();
        let err = exporter
            .export("<html></html>", &ExportOptions::standard())
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_engine_output_is_returned() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-engine.sh");
        // Writes a stub PDF to the last argument.
        std::fs::write(
            &script,
            "for a in \"$@\"; do out=\"$a\"; done\nprintf '%%PDF-1.4 stub' > \"$out\"\n",
        )
        .unwrap();

        let exporter =
            WkHtmlToPdfExporter::from_command(&format!("sh {}", script.display())).unwrap();
        let pdf = exporter
            .export("<html></html>", &ExportOptions::standard())
            .await
            .unwrap();

        assert_eq!(pdf, b"%PDF-1.4 stub");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_engine_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("broken-engine.sh");
        std::fs::write(&script, "echo 'QXcbConnection: could not connect' >&2\nexit 3\n").unwrap();

        let exporter =
            WkHtmlToPdfExporter::from_command(&format!("sh {}", script.display())).unwrap();
        let err = exporter
            .export("<html></html>", &ExportOptions::standard())
            .await
            .unwrap_err();
        match err {
            ExportError::EngineFailed { stderr, .. } => {
                assert_eq!(stderr, "QXcbConnection: could not connect")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
