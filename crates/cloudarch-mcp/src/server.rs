use std::{borrow::Cow, marker::PhantomData, sync::Arc};

use log::{info, warn};
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler,
};
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use cloudarch_core::{
    config::AppConfig,
    model::{CloudDiagramArgs, KubernetesDiagramArgs},
    DiagramError, DiagramGraph, DiagramOutput, GraphvizRenderer, Provider, Render, RenderError,
    RenderedImage, ToolFailure,
};

/// Renderer shared by every tool call.
pub type SharedRenderer = Arc<dyn Render + Send + Sync>;

// --- Request types ---

/// Raw tool arguments that advertise the input schema of `T`.
///
/// The arguments are checked by [`cloudarch_core::generate`] rather than by
/// serde so that shape errors come back as `InvalidRequest` tool results.
pub struct Arguments<T> {
    value: Value,
    _schema: PhantomData<fn() -> T>,
}

impl<T> Arguments<T> {
    pub fn into_value(self) -> Value {
        self.value
    }
}

impl<T> From<Value> for Arguments<T> {
    fn from(value: Value) -> Self {
        Self {
            value,
            _schema: PhantomData,
        }
    }
}

impl<'de, T> Deserialize<'de> for Arguments<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from)
    }
}

impl<T: JsonSchema> JsonSchema for Arguments<T> {
    fn schema_name() -> Cow<'static, str> {
        T::schema_name()
    }

    fn json_schema(generator: &mut schemars::SchemaGenerator) -> schemars::Schema {
        T::json_schema(generator)
    }
}

// --- Server ---

#[derive(Clone)]
pub struct CloudArchServer {
    tool_router: ToolRouter<Self>,
    renderer: SharedRenderer,
}

#[tool_router]
impl CloudArchServer {
    pub fn new(renderer: SharedRenderer) -> Self {
        Self {
            tool_router: Self::tool_router(),
            renderer,
        }
    }

    /// Server backed by Graphviz as configured. A missing `dot` does not stop
    /// the server; each call then fails with a render error.
    pub fn from_config(config: &AppConfig) -> Self {
        let renderer: SharedRenderer = match GraphvizRenderer::from_config(config) {
            Ok(renderer) => Arc::new(renderer),
            Err(e) => {
                warn!(error = e.to_string(); "Graphviz unavailable, diagram tools will fail");
                Arc::new(MissingEngine(e.to_string()))
            }
        };
        Self::new(renderer)
    }

    #[tool(
        name = "build-kubernetes-diagram",
        description = "Build a Kubernetes architecture diagram from components, connections and optional cluster groupings (namespaces). Returns a summary and the diagram as a base64 PNG image. Component types: deployment, statefulset, daemonset, job, pod, replicaset, service, ingress, pvc, pv, storageclass, configmap, secret, hpa."
    )]
    async fn build_kubernetes_diagram(
        &self,
        Parameters(args): Parameters<Arguments<KubernetesDiagramArgs>>,
    ) -> Result<CallToolResult, McpError> {
        self.build(Provider::Kubernetes, args.into_value()).await
    }

    #[tool(
        name = "build-aws-diagram",
        description = "Build an AWS architecture diagram from components, connections and optional VPC groupings. Returns a summary and the diagram as a base64 PNG image. Component types: ec2, ecs, eks, lambda, rds, dynamodb, elasticache, redshift, s3, ebs, efs, alb, nlb, elb, cloudfront, route53, vpc, sqs, sns, eventbridge."
    )]
    async fn build_aws_diagram(
        &self,
        Parameters(args): Parameters<Arguments<CloudDiagramArgs>>,
    ) -> Result<CallToolResult, McpError> {
        self.build(Provider::Aws, args.into_value()).await
    }

    #[tool(
        name = "build-gcp-diagram",
        description = "Build a GCP architecture diagram from components, connections and optional VPC groupings. Returns a summary and the diagram as a base64 PNG image. Component types: gce, computeengine, gke, functions, cloudsql, firestore, bigtable, spanner, gcs, persistentdisk, loadbalancing, clouddns, vpc, bigquery, dataflow, pubsub."
    )]
    async fn build_gcp_diagram(
        &self,
        Parameters(args): Parameters<Arguments<CloudDiagramArgs>>,
    ) -> Result<CallToolResult, McpError> {
        self.build(Provider::Gcp, args.into_value()).await
    }

    /// Graphviz blocks, so the pipeline runs off the async workers.
    async fn build(
        &self,
        provider: Provider,
        arguments: Value,
    ) -> Result<CallToolResult, McpError> {
        let renderer = Arc::clone(&self.renderer);
        let outcome = tokio::task::spawn_blocking(move || {
            cloudarch_core::generate(provider, &arguments, &*renderer)
        })
        .await
        .map_err(|e| McpError::internal_error(format!("diagram task failed: {e}"), None))?;
        Ok(tool_result(provider, outcome))
    }
}

#[tool_handler]
impl ServerHandler for CloudArchServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(instructions().into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

// --- Helpers ---

/// Tool result for a finished pipeline run: summary text plus image, or the
/// `{error_kind, message}` object as text.
pub fn tool_result(
    provider: Provider,
    outcome: Result<DiagramOutput, DiagramError>,
) -> CallToolResult {
    match outcome {
        Ok(output) => {
            info!(
                tool = provider.tool_name(),
                diagram = output.name.as_str(),
                components = output.node_count,
                connections = output.edge_count,
                groupings = output.grouping_count;
                "Diagram built"
            );
            let summary = output.summary();
            CallToolResult::success(vec![
                Content::text(summary),
                Content::image(output.image.image, output.image.mime_type),
            ])
        }
        Err(err) => {
            let failure = ToolFailure::from(&err);
            warn!(tool = provider.tool_name(), kind:? = failure.error_kind; "{}", failure.message);
            let text = serde_json::to_string(&failure).unwrap_or_else(|_| err.to_string());
            CallToolResult::error(vec![Content::text(text)])
        }
    }
}

fn instructions() -> String {
    let mut text = String::from(
        "Render cloud architecture diagrams. Each tool takes a diagram name, a list of \
         components ({type, name, replicas?, attributes?}), directed connections \
         ({from, to, label?}) between component names and optional groupings \
         ({name, components}), and returns a PNG image. Component names must be unique \
         and a component may belong to at most one grouping. Failures come back as a \
         JSON object {error_kind, message}.\n",
    );
    for provider in Provider::ALL {
        text.push_str(&format!(
            "\n{} ({}, groupings under \"{}\"): {}",
            provider.tool_name(),
            provider.display_name(),
            provider.grouping_key(),
            provider.component_types().join(", ")
        ));
    }
    text
}

/// Stands in for Graphviz when `dot` could not be located at startup.
struct MissingEngine(String);

impl Render for MissingEngine {
    fn render(&self, _graph: &DiagramGraph) -> Result<RenderedImage, RenderError> {
        Err(RenderError::EngineUnavailable(self.0.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudarch_core::{config::StyleConfig, dot};
    use rmcp::model::RawContent;
    use serde_json::json;

    /// Returns the DOT text as the image so tests run without Graphviz.
    struct DotEcho;

    impl Render for DotEcho {
        fn render(&self, graph: &DiagramGraph) -> Result<RenderedImage, RenderError> {
            Ok(RenderedImage::png(
                dot::to_dot(graph, &StyleConfig::default()).into_bytes(),
            ))
        }
    }

    fn server() -> CloudArchServer {
        CloudArchServer::new(Arc::new(DotEcho))
    }

    fn text(content: &Content) -> &str {
        match &content.raw {
            RawContent::Text(text) => &text.text,
            other => panic!("expected text content, got {other:?}"),
        }
    }

    fn failure(result: &CallToolResult) -> Value {
        assert_eq!(result.is_error, Some(true));
        serde_json::from_str(text(&result.content[0])).unwrap()
    }

    #[tokio::test]
    async fn kubernetes_tool_returns_summary_and_image() {
        let args = json!({
            "name": "web-stack",
            "components": [
                {"type": "deployment", "name": "nginx", "replicas": 3},
                {"type": "service", "name": "nginx-svc"},
                {"type": "ingress", "name": "web-ingress"}
            ],
            "connections": [
                {"from": "web-ingress", "to": "nginx-svc"},
                {"from": "nginx-svc", "to": "nginx"}
            ],
            "clusters": []
        });
        let result = server()
            .build_kubernetes_diagram(Parameters(args.into()))
            .await
            .unwrap();

        assert_eq!(result.is_error, Some(false));
        assert_eq!(result.content.len(), 2);
        assert_eq!(
            text(&result.content[0]),
            "Kubernetes architecture diagram 'web-stack' created successfully with 3 components."
        );
        match &result.content[1].raw {
            RawContent::Image(image) => {
                assert_eq!(image.mime_type, "image/png");
                assert!(!image.data.is_empty());
            }
            other => panic!("expected image content, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn aws_tool_reports_dangling_reference() {
        let args = json!({
            "name": "aws",
            "components": [{"type": "route53", "name": "dns"}],
            "connections": [{"from": "dns", "to": "nonexistent"}]
        });
        let result = server().build_aws_diagram(Parameters(args.into())).await.unwrap();
        let value = failure(&result);
        assert_eq!(value["error_kind"], "UnknownComponentReference");
        assert!(value["message"].as_str().unwrap().contains("nonexistent"));
    }

    #[tokio::test]
    async fn gcp_tool_reports_unknown_type() {
        let args = json!({
            "name": "gcp",
            "components": [{"type": "not-a-real-gcp-service", "name": "x"}]
        });
        let result = server().build_gcp_diagram(Parameters(args.into())).await.unwrap();
        assert_eq!(failure(&result)["error_kind"], "UnknownComponentType");
    }

    #[tokio::test]
    async fn malformed_arguments_are_invalid_requests() {
        let result = server()
            .build_aws_diagram(Parameters(json!({"components": []}).into()))
            .await
            .unwrap();
        assert_eq!(failure(&result)["error_kind"], "InvalidRequest");

        let result = server()
            .build_aws_diagram(Parameters(
                json!({"name": "x", "components": [], "clusters": []}).into(),
            ))
            .await
            .unwrap();
        assert_eq!(failure(&result)["error_kind"], "InvalidRequest");
    }

    #[tokio::test]
    async fn missing_engine_fails_every_call_with_render_error() {
        let server = CloudArchServer::new(Arc::new(MissingEngine("dot not found".into())));
        let args = json!({"name": "d", "components": [{"type": "s3", "name": "bucket"}]});
        let result = server.build_aws_diagram(Parameters(args.into())).await.unwrap();
        let value = failure(&result);
        assert_eq!(value["error_kind"], "RenderError");
        assert!(value["message"].as_str().unwrap().contains("dot not found"));
    }

    #[test]
    fn registers_the_three_tools_with_provider_schemas() {
        let tools = server().tool_router.list_all();
        let mut names: Vec<&str> = tools.iter().map(|t| &*t.name).collect();
        names.sort_unstable();
        assert_eq!(
            names,
            ["build-aws-diagram", "build-gcp-diagram", "build-kubernetes-diagram"]
        );

        for tool in &tools {
            let properties = tool
                .input_schema
                .get("properties")
                .and_then(Value::as_object)
                .expect("object schema with properties");
            assert!(properties.contains_key("components"));
            let grouping_key = if tool.name == "build-kubernetes-diagram" {
                "clusters"
            } else {
                "vpcs"
            };
            assert!(properties.contains_key(grouping_key), "{}", tool.name);
        }
    }

    #[test]
    fn descriptions_match_the_registries() {
        for tool in server().tool_router.list_all() {
            let provider = Provider::ALL
                .into_iter()
                .find(|p| p.tool_name() == tool.name)
                .unwrap();
            let description = tool.description.as_deref().unwrap_or_default();
            let listed = description
                .split("Component types: ")
                .nth(1)
                .unwrap()
                .trim_end_matches('.');
            let listed: Vec<&str> = listed.split(", ").collect();
            assert_eq!(listed, provider.component_types(), "{}", tool.name);
        }
    }

    #[test]
    fn instructions_list_every_component_type() {
        let info = server().get_info();
        let instructions = info.instructions.unwrap();
        for provider in Provider::ALL {
            for tag in provider.component_types() {
                assert!(instructions.contains(tag), "{tag}");
            }
        }
    }
}
