//! Configuration types for diagram rendering.
//!
//! All types implement [`serde::Deserialize`] so the binary can load them from
//! TOML. Every field is optional; an empty file yields [`AppConfig::default`].
//!
//! - [`AppConfig`] - root with `[render]` and `[style]` sections.
//! - [`RenderConfig`] - where Graphviz lives and whether to keep images.
//! - [`StyleConfig`] - default direction and the icon image directory.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::model::Direction;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    render: RenderConfig,

    #[serde(default)]
    style: StyleConfig,
}

impl AppConfig {
    pub fn new(render: RenderConfig, style: StyleConfig) -> Self {
        Self { render, style }
    }

    pub fn render(&self) -> &RenderConfig {
        &self.render
    }

    pub fn style(&self) -> &StyleConfig {
        &self.style
    }
}

/// Graphviz invocation settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenderConfig {
    /// Path to the `dot` executable. Looked up on `PATH` when unset.
    #[serde(default)]
    dot: Option<PathBuf>,

    /// Directory where a copy of every rendered image is kept.
    #[serde(default)]
    keep_dir: Option<PathBuf>,
}

impl RenderConfig {
    pub fn new(dot: Option<PathBuf>, keep_dir: Option<PathBuf>) -> Self {
        Self { dot, keep_dir }
    }

    pub fn dot(&self) -> Option<&Path> {
        self.dot.as_deref()
    }

    pub fn keep_dir(&self) -> Option<&Path> {
        self.keep_dir.as_deref()
    }
}

/// Visual defaults applied when a request does not override them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StyleConfig {
    /// Layout direction for requests that do not set one.
    #[serde(default)]
    direction: Direction,

    /// Root of `<provider>/<type>.png` icon images. Nodes without an image
    /// are drawn as coloured shapes.
    #[serde(default)]
    icons_dir: Option<PathBuf>,
}

impl StyleConfig {
    pub fn new(direction: Direction, icons_dir: Option<PathBuf>) -> Self {
        Self {
            direction,
            icons_dir,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn icons_dir(&self) -> Option<&Path> {
        self.icons_dir.as_deref()
    }
}
