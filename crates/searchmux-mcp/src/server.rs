//! MCP stdio surface: three tools over one routing engine.
//!
//! Results carry structured content plus a text-serialized JSON fallback;
//! the routing trace appears only when the caller set `debug`.

use rmcp::{
    handler::server::router::tool::ToolRouter as RmcpToolRouter,
    handler::server::wrapper::Parameters,
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
    transport::stdio,
    ErrorData as McpError, ServiceExt,
};
use schemars::JsonSchema;
use searchmux_core::router::Router;
use searchmux_core::{Envelope, Error as CoreError, Mode, SearchRequest};
use serde::Deserialize;
use std::sync::Arc;

const SCHEMA_VERSION: u64 = 1;

fn tool_result(payload: serde_json::Value) -> CallToolResult {
    // Structured content for machine consumers, plus a text fallback for
    // clients that only read `content[0].text`.
    let mut r = CallToolResult::structured(payload.clone());
    r.content = vec![Content::text(payload.to_string())];
    r
}

fn error_code(e: &CoreError) -> &'static str {
    match e {
        CoreError::InvalidRequest(_) => "invalid_request",
        CoreError::InvalidConfig(_) => "invalid_config",
        CoreError::NotConfigured(_) => "not_configured",
        CoreError::Budget(_) => "budget_exhausted",
        CoreError::Search(_) => "search_failed",
        CoreError::Answer(_) => "answer_failed",
        CoreError::Exhausted { .. } => "tier_exhausted",
    }
}

fn error_payload(kind: &str, e: &CoreError) -> serde_json::Value {
    serde_json::json!({
        "ok": false,
        "schema_version": SCHEMA_VERSION,
        "kind": kind,
        "error": {
            "code": error_code(e),
            "message": e.to_string(),
            "retryable": e.retryable(),
        }
    })
}

fn ok_payload(kind: &str, envelope: &Envelope) -> serde_json::Value {
    let mut payload = serde_json::json!({
        "ok": true,
        "schema_version": SCHEMA_VERSION,
        "kind": kind,
    });
    if let (Some(obj), Ok(serde_json::Value::Object(fields))) =
        (payload.as_object_mut(), serde_json::to_value(envelope))
    {
        for (k, v) in fields {
            obj.insert(k, v);
        }
    }
    payload
}

#[derive(Debug, Deserialize, JsonSchema, Default)]
struct SearchArgs {
    /// Query text (required, non-empty).
    #[serde(default)]
    query: Option<String>,
    /// Pin a specific provider (brave|searxng|perplexity|tavily).
    #[serde(default)]
    provider: Option<String>,
    /// Result count, clamped to 1..=20.
    #[serde(default)]
    max_results: Option<i64>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    region: Option<String>,
    /// Provider-specific freshness hint (e.g. pd, pw, pm).
    #[serde(default)]
    freshness: Option<String>,
    #[serde(default)]
    category: Option<String>,
    /// Safe-search hint passed through to providers that support it.
    #[serde(default)]
    safesearch: Option<String>,
    /// Include the routing trace in the result.
    #[serde(default)]
    debug: Option<bool>,
}

pub(crate) struct SearchmuxMcp {
    tool_router: RmcpToolRouter<Self>,
    router: Arc<Router>,
}

#[tool_router]
impl SearchmuxMcp {
    pub(crate) fn new() -> Result<Self, McpError> {
        let config =
            crate::config::load().map_err(|e| McpError::internal_error(e.to_string(), None))?;
        config
            .validate()
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        let client = searchmux_local::http_client()
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        let registry = searchmux_local::registry_from_config(&config, client);
        Ok(Self {
            tool_router: Self::tool_router(),
            router: Arc::new(Router::new(config, registry.basic, registry.ai)),
        })
    }

    async fn run(&self, kind: &'static str, mode: Mode, args: SearchArgs) -> CallToolResult {
        let req = SearchRequest {
            query: args.query.unwrap_or_default(),
            provider: args.provider,
            mode: Some(mode),
            language: args.language,
            region: args.region,
            freshness: args.freshness,
            category: args.category,
            safesearch: args.safesearch,
            max_results: args.max_results,
            debug: args.debug.unwrap_or(false),
        };
        let payload = match self.router.execute(&req).await {
            Ok(envelope) => ok_payload(kind, &envelope),
            Err(e) => error_payload(kind, &e),
        };
        tool_result(payload)
    }

    #[tool(
        description = "Search the web with automatic basic->ai escalation (returns ok=false not_configured unless provider credentials are set)"
    )]
    async fn search(
        &self,
        params: Parameters<Option<SearchArgs>>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self
            .run("search", Mode::Auto, params.0.unwrap_or_default())
            .await)
    }

    #[tool(description = "Lexical web search (basic tier only; no escalation)")]
    async fn search_basic(
        &self,
        params: Parameters<Option<SearchArgs>>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self
            .run("search_basic", Mode::Basic, params.0.unwrap_or_default())
            .await)
    }

    #[tool(description = "Synthesized-answer search with citations (ai tier only)")]
    async fn search_ai(
        &self,
        params: Parameters<Option<SearchArgs>>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self
            .run("search_ai", Mode::Ai, params.0.unwrap_or_default())
            .await)
    }
}

#[tool_handler]
impl rmcp::ServerHandler for SearchmuxMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Tiered web search router. `search_basic` returns lexical results, `search_ai` returns a synthesized answer with citations, and `search` picks automatically with basic->ai escalation. Outputs are JSON and schema-versioned."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

pub(crate) async fn serve_stdio() -> Result<(), McpError> {
    let svc = SearchmuxMcp::new()?;
    let running = svc
        .serve(stdio())
        .await
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    // Keep the stdio server alive until the client closes.
    running
        .waiting()
        .await
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(())
}
