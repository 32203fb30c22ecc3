//! Tool registry and dispatch: each tool validates its arguments, calls the
//! worker, and renders the result as one Markdown text block (§6 of the
//! protocol description: "each returns a single text block").

use crate::client::{ClientError, CompleteSessionRequest, SaveMemoryRequest, StartSessionRequest, StoreKnowledgeRequest, WorkerClient};
use crate::protocol::{CallToolResult, McpTool};
use memory_core::model::{Checkpoint, Observation, Session, Summary};
use serde::Deserialize;
use serde_json::{json, Value};

const DEFAULT_LIMIT: i64 = 20;

pub fn definitions() -> Vec<McpTool> {
    vec![
        McpTool {
            name: "search".to_string(),
            description: "Keyword search over stored observations, optionally scoped to a project or type".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "q": {"type": "string"},
                    "project": {"type": "string"},
                    "type": {"type": "string"},
                    "limit": {"type": "integer"}
                }
            }),
        },
        McpTool {
            name: "timeline".to_string(),
            description: "Observations surrounding a given anchor id, ordered chronologically".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "anchor": {"type": "integer"},
                    "depth_before": {"type": "integer"},
                    "depth_after": {"type": "integer"}
                },
                "required": ["anchor"]
            }),
        },
        McpTool {
            name: "get_observations".to_string(),
            description: "Fetch observations by id, preserving request order".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {"ids": {"type": "array", "items": {"type": "integer"}}},
                "required": ["ids"]
            }),
        },
        McpTool {
            name: "get_context".to_string(),
            description: "Recency-weighted observations and recent summaries for a project, within the configured token budget".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {"project": {"type": "string"}},
                "required": ["project"]
            }),
        },
        McpTool {
            name: "semantic_search".to_string(),
            description: "Hybrid keyword + vector search over observations".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "q": {"type": "string"},
                    "project": {"type": "string"},
                    "limit": {"type": "integer"}
                },
                "required": ["q"]
            }),
        },
        McpTool {
            name: "embedding_stats".to_string(),
            description: "Embedding coverage counts, optionally scoped to a project".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {"project": {"type": "string"}}
            }),
        },
        McpTool {
            name: "store_knowledge".to_string(),
            description: "Record a durable knowledge observation: a constraint, decision, heuristic, or rejected approach".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "memory_session_id": {"type": "integer"},
                    "project": {"type": "string"},
                    "knowledge_type": {"type": "string", "enum": ["constraint", "decision", "heuristic", "rejected"]},
                    "title": {"type": "string"},
                    "text": {"type": "string"},
                    "narrative": {"type": "string"},
                    "concepts": {"type": "string"},
                    "metadata": {"type": "object"}
                },
                "required": ["memory_session_id", "project", "knowledge_type", "title", "text"]
            }),
        },
        McpTool {
            name: "start_session".to_string(),
            description: "Start (or idempotently resume) an agent working session, returning its numeric id for save_memory/store_knowledge calls".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "content_session_id": {"type": "string"},
                    "project": {"type": "string"},
                    "user_prompt": {"type": "string"}
                },
                "required": ["content_session_id", "project"]
            }),
        },
        McpTool {
            name: "complete_session".to_string(),
            description: "End a session: synthesizes its summary and creates a checkpoint".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {"content_session_id": {"type": "string"}},
                "required": ["content_session_id"]
            }),
        },
        McpTool {
            name: "resume_session".to_string(),
            description: "Latest checkpoint for a project: task, progress, next steps, and recent context".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {"project": {"type": "string"}},
                "required": ["project"]
            }),
        },
        McpTool {
            name: "save_memory".to_string(),
            description: "Record a manual observation (default type `research`)".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "memory_session_id": {"type": "integer"},
                    "project": {"type": "string"},
                    "type": {"type": "string"},
                    "title": {"type": "string"},
                    "text": {"type": "string"},
                    "narrative": {"type": "string"}
                },
                "required": ["memory_session_id", "project", "title"]
            }),
        },
        McpTool {
            name: "generate_report".to_string(),
            description: "Weekly or monthly Markdown digest for a project".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "project": {"type": "string"},
                    "period": {"type": "string", "enum": ["weekly", "monthly"]}
                },
                "required": ["project"]
            }),
        },
    ]
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    Unknown(String),
    #[error("invalid arguments: {0}")]
    InvalidArguments(#[from] serde_json::Error),
    #[error(transparent)]
    Client(#[from] ClientError),
}

pub async fn call(client: &WorkerClient, name: &str, arguments: Option<Value>) -> Result<CallToolResult, ToolError> {
    let args = arguments.unwrap_or(Value::Null);
    match name {
        "search" => search(client, args).await,
        "timeline" => timeline(client, args).await,
        "get_observations" => get_observations(client, args).await,
        "get_context" => get_context(client, args).await,
        "semantic_search" => semantic_search(client, args).await,
        "embedding_stats" => embedding_stats(client, args).await,
        "store_knowledge" => store_knowledge(client, args).await,
        "start_session" => start_session(client, args).await,
        "complete_session" => complete_session(client, args).await,
        "resume_session" => resume_session(client, args).await,
        "save_memory" => save_memory(client, args).await,
        "generate_report" => generate_report(client, args).await,
        other => Err(ToolError::Unknown(other.to_string())),
    }
}

fn parse<T: for<'de> Deserialize<'de> + Default>(args: Value) -> Result<T, serde_json::Error> {
    if args.is_null() {
        Ok(T::default())
    } else {
        serde_json::from_value(args)
    }
}

#[derive(Deserialize, Default)]
struct SearchArgs {
    q: Option<String>,
    project: Option<String>,
    #[serde(rename = "type")]
    type_filter: Option<String>,
    limit: Option<i64>,
}

async fn search(client: &WorkerClient, args: Value) -> Result<CallToolResult, ToolError> {
    let args: SearchArgs = parse(args)?;
    let result = client.search(args.q.as_deref(), args.project.as_deref(), args.type_filter.as_deref(), args.limit.unwrap_or(DEFAULT_LIMIT)).await?;
    let mut out = format!("# Search results ({} observation(s))\n\n", result.observations.len());
    render_observation_list(&mut out, &result.observations);
    if !result.summaries.is_empty() {
        out.push_str("\n## Related summaries\n\n");
        render_summary_list(&mut out, &result.summaries);
    }
    Ok(CallToolResult::text(out))
}

#[derive(Deserialize, Default)]
struct TimelineArgs {
    anchor: i64,
    depth_before: Option<i64>,
    depth_after: Option<i64>,
}

async fn timeline(client: &WorkerClient, args: Value) -> Result<CallToolResult, ToolError> {
    let args: TimelineArgs = serde_json::from_value(args)?;
    let result = client.timeline(args.anchor, args.depth_before, args.depth_after).await?;
    let mut out = format!("# Timeline around observation {}\n\n", args.anchor);
    render_observation_list(&mut out, &result.entries);
    Ok(CallToolResult::text(out))
}

#[derive(Deserialize)]
struct IdsArgs {
    ids: Vec<i64>,
}

async fn get_observations(client: &WorkerClient, args: Value) -> Result<CallToolResult, ToolError> {
    let args: IdsArgs = serde_json::from_value(args)?;
    let result = client.get_observations(&args.ids).await?;
    let mut out = format!("# Observations ({} of {} requested)\n\n", result.observations.len(), args.ids.len());
    render_observation_list(&mut out, &result.observations);
    Ok(CallToolResult::text(out))
}

#[derive(Deserialize)]
struct ProjectArgs {
    project: String,
}

async fn get_context(client: &WorkerClient, args: Value) -> Result<CallToolResult, ToolError> {
    let args: ProjectArgs = serde_json::from_value(args)?;
    let result = client.get_context(&args.project).await?;
    let mut out = format!("# Context for {} ({} tokens)\n\n", args.project, result.tokens_used);
    render_observation_list(&mut out, &result.observations);
    if !result.summaries.is_empty() {
        out.push_str("\n## Recent summaries\n\n");
        render_summary_list(&mut out, &result.summaries);
    }
    Ok(CallToolResult::text(out))
}

#[derive(Deserialize)]
struct SemanticSearchArgs {
    q: String,
    project: Option<String>,
    limit: Option<i64>,
}

async fn semantic_search(client: &WorkerClient, args: Value) -> Result<CallToolResult, ToolError> {
    let args: SemanticSearchArgs = serde_json::from_value(args)?;
    let result = client.semantic_search(&args.q, args.project.as_deref(), args.limit.unwrap_or(DEFAULT_LIMIT)).await?;
    let mut out = format!("# Semantic search: \"{}\" ({} hit(s))\n\n", args.q, result.results.len());
    for hit in &result.results {
        out.push_str(&format!("- **[{}] {}** (project `{}`, score {:.3}, source `{}`)\n", hit.type_, hit.title, hit.project, hit.score, hit.source));
    }
    if result.results.is_empty() {
        out.push_str("_no matches_\n");
    }
    Ok(CallToolResult::text(out))
}

async fn embedding_stats(client: &WorkerClient, args: Value) -> Result<CallToolResult, ToolError> {
    let args: ProjectArgsOpt = parse(args)?;
    let stats = client.embedding_stats(args.project.as_deref()).await?;
    let out = format!(
        "# Embedding coverage\n\n- total observations: {}\n- embedded: {}\n- missing: {}\n",
        stats.total_observations, stats.embedded_observations, stats.missing_observations
    );
    Ok(CallToolResult::text(out))
}

#[derive(Deserialize, Default)]
struct ProjectArgsOpt {
    project: Option<String>,
}

#[derive(Deserialize)]
struct StoreKnowledgeArgs {
    memory_session_id: i64,
    project: String,
    knowledge_type: String,
    title: String,
    text: String,
    narrative: Option<String>,
    concepts: Option<String>,
    metadata: Option<Value>,
}

async fn store_knowledge(client: &WorkerClient, args: Value) -> Result<CallToolResult, ToolError> {
    let args: StoreKnowledgeArgs = serde_json::from_value(args)?;
    let request = StoreKnowledgeRequest {
        memory_session_id: args.memory_session_id,
        project: &args.project,
        knowledge_type: &args.knowledge_type,
        title: &args.title,
        text: &args.text,
        narrative: args.narrative.as_deref(),
        concepts: args.concepts.as_deref(),
        metadata: args.metadata,
    };
    let result = client.store_knowledge(&request).await?;
    Ok(CallToolResult::text(render_ingest_result(&result)))
}

#[derive(Deserialize)]
struct StartSessionArgs {
    content_session_id: String,
    project: String,
    #[serde(default)]
    user_prompt: String,
}

async fn start_session(client: &WorkerClient, args: Value) -> Result<CallToolResult, ToolError> {
    let args: StartSessionArgs = serde_json::from_value(args)?;
    let request = StartSessionRequest { content_session_id: &args.content_session_id, project: &args.project, user_prompt: &args.user_prompt };
    let session = client.start_session(&request).await?;
    Ok(CallToolResult::text(render_session(&session)))
}

#[derive(Deserialize)]
struct CompleteSessionArgs {
    content_session_id: String,
}

async fn complete_session(client: &WorkerClient, args: Value) -> Result<CallToolResult, ToolError> {
    let args: CompleteSessionArgs = serde_json::from_value(args)?;
    let request = CompleteSessionRequest { content_session_id: &args.content_session_id };
    let result = client.complete_session(&request).await?;
    let mut out = format!("Session {} completed.\n\n", result.session.id);
    out.push_str("## Summary\n\n");
    out.push_str(&format!("- request: {}\n- notes: {}\n", result.summary.request, result.summary.notes));
    out.push_str(&render_checkpoint(&result.checkpoint));
    Ok(CallToolResult::text(out))
}

async fn resume_session(client: &WorkerClient, args: Value) -> Result<CallToolResult, ToolError> {
    let args: ProjectArgs = serde_json::from_value(args)?;
    let checkpoint = client.latest_checkpoint(&args.project).await?;
    Ok(CallToolResult::text(render_checkpoint(&checkpoint)))
}

#[derive(Deserialize)]
struct SaveMemoryArgs {
    memory_session_id: i64,
    project: String,
    r#type: Option<String>,
    title: String,
    text: Option<String>,
    narrative: Option<String>,
}

async fn save_memory(client: &WorkerClient, args: Value) -> Result<CallToolResult, ToolError> {
    let args: SaveMemoryArgs = serde_json::from_value(args)?;
    let request = SaveMemoryRequest {
        memory_session_id: args.memory_session_id,
        project: &args.project,
        r#type: args.r#type.as_deref(),
        title: &args.title,
        text: args.text.as_deref(),
        narrative: args.narrative.as_deref(),
    };
    let result = client.save_memory(&request).await?;
    Ok(CallToolResult::text(render_ingest_result(&result)))
}

#[derive(Deserialize)]
struct GenerateReportArgs {
    project: String,
    #[serde(default = "default_period")]
    period: String,
}

fn default_period() -> String {
    "weekly".to_string()
}

async fn generate_report(client: &WorkerClient, args: Value) -> Result<CallToolResult, ToolError> {
    let args: GenerateReportArgs = serde_json::from_value(args)?;
    let markdown = client.report_markdown(&args.project, &args.period).await?;
    Ok(CallToolResult::text(markdown))
}

fn render_ingest_result(result: &crate::client::IngestResponse) -> String {
    match &result.observation {
        Some(observation) => format!("Stored observation {} — \"{}\"\n", observation.id, observation.title),
        None if result.duplicate => "Duplicate — an identical observation already exists, nothing new stored.\n".to_string(),
        None => "Not stored.\n".to_string(),
    }
}

fn render_observation_list(out: &mut String, observations: &[Observation]) {
    if observations.is_empty() {
        out.push_str("_none_\n");
        return;
    }
    for observation in observations {
        out.push_str(&format!("- **[{}] {}** (id {}, project `{}`)\n", observation.r#type, observation.title, observation.id, observation.project));
    }
}

fn render_summary_list(out: &mut String, summaries: &[Summary]) {
    if summaries.is_empty() {
        out.push_str("_none_\n");
        return;
    }
    for summary in summaries {
        out.push_str(&format!("- {}\n", summary.request));
    }
}

fn render_session(session: &Session) -> String {
    format!("Session {} ({:?}) for project `{}`, memory_session_id {}\n", session.content_session_id, session.status, session.project, session.id)
}

fn render_checkpoint(checkpoint: &Checkpoint) -> String {
    let mut out = format!("# Checkpoint for {}\n\n**Task:** {}\n\n**Progress:** {}\n\n", checkpoint.project, checkpoint.task, checkpoint.progress);

    out.push_str("## Next steps\n\n");
    if checkpoint.next_steps.is_empty() {
        out.push_str("_none_\n");
    } else {
        for step in &checkpoint.next_steps {
            out.push_str(&format!("- {step}\n"));
        }
    }

    if !checkpoint.open_questions.is_empty() {
        out.push_str("\n## Open questions\n\n");
        for question in &checkpoint.open_questions {
            out.push_str(&format!("- {question}\n"));
        }
    }

    if !checkpoint.context_snapshot.is_empty() {
        out.push_str("\n## Recent context\n\n");
        for header in &checkpoint.context_snapshot {
            out.push_str(&format!("- [{}] {}\n", header.r#type, header.title));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definitions_cover_every_named_tool() {
        let names: Vec<&str> = definitions().iter().map(|t| t.name.as_str()).collect();
        for expected in [
            "search",
            "timeline",
            "get_observations",
            "get_context",
            "semantic_search",
            "embedding_stats",
            "store_knowledge",
            "start_session",
            "complete_session",
            "resume_session",
            "save_memory",
            "generate_report",
        ] {
            assert!(names.contains(&expected), "missing tool definition: {expected}");
        }
    }

    #[test]
    fn render_ingest_result_reports_duplicates() {
        let result = crate::client::IngestResponse { observation: None, duplicate: true };
        assert!(render_ingest_result(&result).contains("Duplicate"));
    }
}
