//! Graphviz DOT emission.
//!
//! The output is a pure function of the graph and the style, so the same
//! request always produces the same DOT text. Groupings become `cluster_N`
//! subgraphs holding their member nodes; ungrouped nodes and then edges follow
//! at the top level.

use std::fmt::{self, Write};
use std::path::PathBuf;

use crate::config::StyleConfig;
use crate::graph::{DiagramGraph, DiagramNode};
use crate::provider::{Category, Icon, Provider};

const FONT: &str = "Sans-Serif";
const FONT_COLOR: &str = "#2D3436";
const EDGE_COLOR: &str = "#7B8894";
const CLUSTER_BG: &str = "#E5F5FD";
const CLUSTER_PEN: &str = "#AEB6BE";

/// Render `graph` as a DOT `digraph`.
pub fn to_dot(graph: &DiagramGraph, style: &StyleConfig) -> String {
    let mut out = String::new();
    write_dot(&mut out, graph, style).expect("Writing to String buffer is infallible");
    out
}

fn write_dot(out: &mut String, graph: &DiagramGraph, style: &StyleConfig) -> fmt::Result {
    let direction = graph.direction.unwrap_or(style.direction());

    writeln!(out, "digraph {} {{", quote(&graph.name))?;
    writeln!(
        out,
        "  graph [label={}, rankdir={}, pad=\"2.0\", splines=\"ortho\", nodesep=\"0.60\", ranksep=\"0.75\", fontname={}, fontsize=\"15\", fontcolor={}];",
        quote(&graph.name),
        direction.as_rankdir(),
        quote(FONT),
        quote(FONT_COLOR),
    )?;
    writeln!(
        out,
        "  node [fontname={}, fontsize=\"13\", fontcolor={}];",
        quote(FONT),
        quote(FONT_COLOR),
    )?;
    writeln!(out, "  edge [color={}];", quote(EDGE_COLOR))?;

    for (index, group) in graph.groupings().iter().enumerate() {
        writeln!(out, "  subgraph {} {{", quote(&format!("cluster_{index}")))?;
        writeln!(
            out,
            "    graph [label={}, style=\"rounded\", labeljust=\"l\", pencolor={}, bgcolor={}, fontname={}, fontsize=\"12\", margin=\"16\"];",
            quote(&group.name),
            quote(CLUSTER_PEN),
            quote(CLUSTER_BG),
            quote(FONT),
        )?;
        if group.members.is_empty() {
            // Graphviz does not draw clusters without nodes.
            writeln!(
                out,
                "    {} [shape=\"point\", style=\"invis\"];",
                quote(&anchor_id(graph, index))
            )?;
        }
        for member in &group.members {
            if let Some(node) = graph.node(member) {
                write_node(out, "    ", node, style)?;
            }
        }
        writeln!(out, "  }}")?;
    }

    for node in graph.ungrouped() {
        write_node(out, "  ", node, style)?;
    }

    for edge in graph.edges() {
        match &edge.label {
            Some(label) => writeln!(
                out,
                "  {} -> {} [xlabel={}];",
                quote(&edge.from),
                quote(&edge.to),
                quote(label)
            )?,
            None => writeln!(out, "  {} -> {};", quote(&edge.from), quote(&edge.to))?,
        }
    }

    out.push_str("}\n");
    Ok(())
}

/// Id of the invisible node keeping an empty cluster visible. Node ids share
/// one namespace, so it must not match any component name.
fn anchor_id(graph: &DiagramGraph, index: usize) -> String {
    let mut id = format!("cluster_{index}_anchor");
    while graph.node(&id).is_some() {
        id.push('_');
    }
    id
}

fn write_node(
    out: &mut String,
    indent: &str,
    node: &DiagramNode,
    style: &StyleConfig,
) -> fmt::Result {
    match icon_image(style, node.icon) {
        Some(image) => {
            let height = 1.9 + 0.4 * node.attributes.len() as f64;
            writeln!(
                out,
                "{indent}{} [label={}, tooltip={}, image={}, shape=\"none\", labelloc=\"b\", imagescale=\"true\", fixedsize=\"true\", width=\"1.4\", height=\"{height:.1}\"];",
                quote(&node.name),
                quote(&node.label()),
                quote(node.icon.class_name()),
                quote(&image.to_string_lossy()),
            )
        }
        None => {
            let label = format!("{}\n({})", node.label(), node.icon.class_name());
            writeln!(
                out,
                "{indent}{} [label={}, tooltip={}, shape={}, style=\"filled,rounded\", fillcolor={}, color={}, fontcolor=\"#FFFFFF\", margin=\"0.2\"];",
                quote(&node.name),
                quote(&label),
                quote(node.icon.class_name()),
                quote(shape(node.icon.category())),
                quote(fill_color(node.icon)),
                quote(fill_color(node.icon)),
            )
        }
    }
}

/// `<icons_dir>/<provider>/<tag>.png`, if configured and present.
fn icon_image(style: &StyleConfig, icon: Icon) -> Option<PathBuf> {
    let path = style
        .icons_dir()?
        .join(icon.provider().icon_dir())
        .join(format!("{}.png", icon.tag()));
    path.is_file().then_some(path)
}

fn shape(category: Category) -> &'static str {
    match category {
        Category::Compute => "box",
        Category::Network => "hexagon",
        Category::Storage => "folder",
        Category::Database => "cylinder",
        Category::Config => "note",
        Category::Scaling => "octagon",
        Category::Integration => "cds",
        Category::Analytics => "component",
    }
}

fn fill_color(icon: Icon) -> &'static str {
    match (icon.provider(), icon.category()) {
        (Provider::Kubernetes, _) => "#326CE5",
        (Provider::Aws, Category::Compute) => "#ED7100",
        (Provider::Aws, Category::Database) => "#C925D1",
        (Provider::Aws, Category::Storage) => "#7AA116",
        (Provider::Aws, Category::Network) => "#8C4FFF",
        (Provider::Aws, Category::Integration) => "#E7157B",
        (Provider::Aws, _) => "#232F3E",
        (Provider::Gcp, Category::Compute) => "#4285F4",
        (Provider::Gcp, Category::Database) => "#34A853",
        (Provider::Gcp, Category::Storage) => "#F9AB00",
        (Provider::Gcp, Category::Network) => "#EA4335",
        (Provider::Gcp, Category::Analytics) => "#669DF6",
        (Provider::Gcp, _) => "#5F6368",
    }
}

/// Quote a DOT identifier or string attribute.
pub fn quote(s: &str) -> String {
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('"');
    for ch in s.chars() {
        match ch {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\r' => {}
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}
