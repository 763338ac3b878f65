//! Rendering through Graphviz and base64 encoding of the result.
//!
//! [`GraphvizRenderer`] pipes DOT text into `dot -Tpng -o <tmp>`, reads the
//! temp file back and lets it drop, which removes it on every path out of
//! [`Render::render`].

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use base64::Engine;
use log::{debug, info, warn};
use serde::Serialize;

use crate::config::{AppConfig, StyleConfig};
use crate::dot;
use crate::error::RenderError;
use crate::graph::DiagramGraph;

pub const PNG_MIME_TYPE: &str = "image/png";

/// Turns a diagram graph into image bytes.
pub trait Render {
    fn render(&self, graph: &DiagramGraph) -> Result<RenderedImage, RenderError>;
}

/// Raw image produced by a [`Render`] implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
}

impl RenderedImage {
    pub fn png(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            mime_type: PNG_MIME_TYPE,
        }
    }
}

/// Transport envelope: `{"image": <base64>, "mime_type": "image/png"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodedImage {
    pub image: String,
    pub mime_type: String,
}

impl From<&RenderedImage> for EncodedImage {
    fn from(rendered: &RenderedImage) -> Self {
        Self {
            image: base64::engine::general_purpose::STANDARD.encode(&rendered.bytes),
            mime_type: rendered.mime_type.to_string(),
        }
    }
}

/// Renders with the Graphviz `dot` executable.
#[derive(Debug, Clone)]
pub struct GraphvizRenderer {
    dot: PathBuf,
    style: StyleConfig,
    keep_dir: Option<PathBuf>,
    scratch_dir: Option<PathBuf>,
}

impl GraphvizRenderer {
    pub fn new(dot: impl Into<PathBuf>) -> Self {
        Self {
            dot: dot.into(),
            style: StyleConfig::default(),
            keep_dir: None,
            scratch_dir: None,
        }
    }

    /// Locate `dot` as configured and apply the configured style.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::EngineUnavailable`] when the configured path is
    /// not a file or, with no path configured, `dot` is not on `PATH`.
    pub fn from_config(config: &AppConfig) -> Result<Self, RenderError> {
        let dot = locate_dot(config.render().dot())?;
        info!(dot = dot.display().to_string(); "Using Graphviz");
        let mut renderer = Self::new(dot).with_style(config.style().clone());
        if let Some(dir) = config.render().keep_dir() {
            renderer = renderer.with_keep_dir(dir);
        }
        Ok(renderer)
    }

    pub fn with_style(mut self, style: StyleConfig) -> Self {
        self.style = style;
        self
    }

    /// Keep a copy of every image as `<dir>/<diagram-name>.png`.
    pub fn with_keep_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.keep_dir = Some(dir.into());
        self
    }

    /// Directory for the temporary output file (system temp dir by default).
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    pub fn style(&self) -> &StyleConfig {
        &self.style
    }

    /// DOT text this renderer feeds to Graphviz for `graph`.
    pub fn dot_source(&self, graph: &DiagramGraph) -> String {
        dot::to_dot(graph, &self.style)
    }

    fn run_dot(&self, source: &str, output: &Path) -> Result<(), RenderError> {
        let mut child = Command::new(&self.dot)
            .arg("-Tpng")
            .arg("-o")
            .arg(output)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
                    RenderError::EngineUnavailable(format!(
                        "cannot run {}: {e}",
                        self.dot.display()
                    ))
                }
                _ => RenderError::Io(e),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            // dot closes stdin early on a syntax error; its stderr says why.
            if let Err(e) = stdin.write_all(source.as_bytes()) {
                if e.kind() != io::ErrorKind::BrokenPipe {
                    return Err(e.into());
                }
            }
        }

        let result = child.wait_with_output()?;
        if !result.status.success() {
            return Err(RenderError::EngineFailed {
                status: result.status,
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }
        if !result.stderr.is_empty() {
            debug!(stderr = String::from_utf8_lossy(&result.stderr).trim(); "Graphviz warnings");
        }
        Ok(())
    }
}

impl Render for GraphvizRenderer {
    fn render(&self, graph: &DiagramGraph) -> Result<RenderedImage, RenderError> {
        let source = self.dot_source(graph);
        debug!(diagram = graph.name.as_str(), dot = source.as_str(); "Generated DOT");

        let builder = {
            let mut builder = tempfile::Builder::new();
            builder.prefix("cloudarch-").suffix(".png");
            builder
        };
        // dot writes to the path itself; dropping it deletes the file.
        let output = match &self.scratch_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        }
        .into_temp_path();

        self.run_dot(&source, &output)?;
        let bytes = fs::read(&output)?;
        if bytes.is_empty() {
            return Err(RenderError::EmptyImage);
        }

        if let Some(dir) = &self.keep_dir {
            match keep_copy(dir, &graph.name, &bytes) {
                Ok(path) => info!(path = path.display().to_string(); "Kept rendered diagram"),
                Err(e) => warn!(dir = dir.display().to_string(), error = e.to_string(); "Failed to keep rendered diagram"),
            }
        }

        Ok(RenderedImage::png(bytes))
    }
}

/// Resolve the `dot` executable from configuration or `PATH`.
pub fn locate_dot(configured: Option<&Path>) -> Result<PathBuf, RenderError> {
    match configured {
        Some(path) if path.is_file() => Ok(path.to_path_buf()),
        Some(path) => Err(RenderError::EngineUnavailable(format!(
            "configured dot executable {} does not exist",
            path.display()
        ))),
        None => which::which("dot").map_err(|e| {
            RenderError::EngineUnavailable(format!(
                "`dot` not found on PATH ({e}); install Graphviz"
            ))
        }),
    }
}

fn keep_copy(dir: &Path, name: &str, bytes: &[u8]) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.png", file_stem(name)));
    fs::write(&path, bytes)?;
    Ok(path)
}

/// Diagram name reduced to a safe file stem.
pub fn file_stem(name: &str) -> String {
    let stem: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "diagram".to_string()
    } else {
        stem
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_base64_envelope() {
        let encoded = EncodedImage::from(&RenderedImage::png(b"hello".to_vec()));
        assert_eq!(encoded.image, "aGVsbG8=");
        assert_eq!(encoded.mime_type, "image/png");
        let value = serde_json::to_value(&encoded).unwrap();
        assert_eq!(value["mime_type"], "image/png");
    }

    #[test]
    fn file_stem_replaces_unsafe_characters() {
        assert_eq!(file_stem("prod web/stack"), "prod_web_stack");
        assert_eq!(file_stem("../etc"), "___etc");
        assert_eq!(file_stem("   "), "diagram");
        assert_eq!(file_stem("k8s-arch_v2"), "k8s-arch_v2");
    }

    #[test]
    fn missing_configured_dot_is_unavailable() {
        let err = locate_dot(Some(Path::new("/nonexistent/bin/dot"))).unwrap_err();
        assert!(matches!(err, RenderError::EngineUnavailable(_)));
    }

    #[test]
    fn keep_copy_writes_named_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = keep_copy(&dir.path().join("kept"), "my diagram", b"png").unwrap();
        assert_eq!(path.file_name().unwrap(), "my_diagram.png");
        assert_eq!(fs::read(path).unwrap(), b"png");
    }
}
