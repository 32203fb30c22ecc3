//! Schema DDL, one `CREATE ... IF NOT EXISTS` constant per object, applied
//! in order by [`crate::migrate`]. Mirrors the teacher's `schema.rs` /
//! `fts5_schema.rs` split: plain tables first, FTS5 + sync triggers after.

pub const CREATE_SCHEMA_META_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    version INTEGER NOT NULL
)
"#;

pub const CREATE_SESSIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS sessions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    content_session_id TEXT NOT NULL UNIQUE,
    project TEXT NOT NULL,
    user_prompt TEXT NOT NULL,
    status TEXT NOT NULL,
    started_at_epoch INTEGER NOT NULL,
    started_at_iso TEXT NOT NULL,
    completed_at_epoch INTEGER,
    completed_at_iso TEXT
)
"#;

pub const CREATE_SESSIONS_PROJECT_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_sessions_project ON sessions(project, started_at_epoch DESC)
"#;

pub const CREATE_OBSERVATIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS observations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    memory_session_id INTEGER NOT NULL REFERENCES sessions(id),
    project TEXT NOT NULL,
    type TEXT NOT NULL,
    title TEXT NOT NULL,
    subtitle TEXT,
    text TEXT NOT NULL,
    narrative TEXT NOT NULL,
    facts TEXT,
    concepts TEXT,
    files_read TEXT NOT NULL DEFAULT '[]',
    files_modified TEXT NOT NULL DEFAULT '[]',
    prompt_number INTEGER,
    created_at_epoch INTEGER NOT NULL,
    created_at_iso TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    discovery_tokens INTEGER NOT NULL DEFAULT 0,
    last_accessed_epoch INTEGER,
    last_accessed_iso TEXT,
    is_stale INTEGER NOT NULL DEFAULT 0,
    auto_category TEXT NOT NULL
)
"#;

pub const CREATE_OBSERVATIONS_PROJECT_KEYSET_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_observations_project_keyset
ON observations(project, created_at_epoch DESC, id DESC)
"#;

pub const CREATE_OBSERVATIONS_SESSION_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_observations_session ON observations(memory_session_id)
"#;

pub const CREATE_OBSERVATIONS_CONTENT_HASH_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_observations_content_hash ON observations(project, content_hash)
"#;

pub const CREATE_OBSERVATIONS_TYPE_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_observations_type ON observations(project, type)
"#;

pub const CREATE_OBSERVATIONS_FTS_TABLE: &str = r#"
CREATE VIRTUAL TABLE IF NOT EXISTS observations_fts USING fts5(
    observation_id UNINDEXED,
    title,
    text,
    narrative,
    tokenize='porter unicode61'
)
"#;

pub const CREATE_OBSERVATIONS_FTS_TRIGGERS: &str = r#"
CREATE TRIGGER IF NOT EXISTS observations_ai AFTER INSERT ON observations BEGIN
    INSERT INTO observations_fts(observation_id, title, text, narrative)
    VALUES (new.id, new.title, new.text, new.narrative);
END;

CREATE TRIGGER IF NOT EXISTS observations_au AFTER UPDATE ON observations BEGIN
    UPDATE observations_fts
    SET title = new.title, text = new.text, narrative = new.narrative
    WHERE observation_id = new.id;
END;

CREATE TRIGGER IF NOT EXISTS observations_ad AFTER DELETE ON observations BEGIN
    DELETE FROM observations_fts WHERE observation_id = old.id;
END;
"#;

pub const CREATE_SUMMARIES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS summaries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id INTEGER NOT NULL REFERENCES sessions(id),
    project TEXT NOT NULL,
    request TEXT NOT NULL,
    investigated TEXT NOT NULL DEFAULT '[]',
    learned TEXT NOT NULL DEFAULT '[]',
    completed TEXT NOT NULL DEFAULT '[]',
    next_steps TEXT NOT NULL DEFAULT '[]',
    notes TEXT NOT NULL DEFAULT '',
    created_at_epoch INTEGER NOT NULL,
    created_at_iso TEXT NOT NULL
)
"#;

pub const CREATE_SUMMARIES_PROJECT_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_summaries_project ON summaries(project, created_at_epoch DESC)
"#;

pub const CREATE_CHECKPOINTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS checkpoints (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id INTEGER NOT NULL REFERENCES sessions(id),
    project TEXT NOT NULL,
    task TEXT NOT NULL,
    progress TEXT NOT NULL,
    next_steps TEXT NOT NULL DEFAULT '[]',
    open_questions TEXT NOT NULL DEFAULT '[]',
    relevant_files TEXT NOT NULL DEFAULT '[]',
    context_snapshot TEXT NOT NULL DEFAULT '[]',
    created_at_epoch INTEGER NOT NULL,
    created_at_iso TEXT NOT NULL
)
"#;

pub const CREATE_CHECKPOINTS_PROJECT_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_checkpoints_project ON checkpoints(project, created_at_epoch DESC)
"#;

pub const CREATE_PROMPTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS prompts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    content_session_id TEXT NOT NULL,
    project TEXT NOT NULL,
    prompt_number INTEGER NOT NULL,
    prompt_text TEXT NOT NULL,
    created_at_epoch INTEGER NOT NULL,
    created_at_iso TEXT NOT NULL
)
"#;

pub const CREATE_PROMPTS_SESSION_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_prompts_session ON prompts(content_session_id, prompt_number)
"#;

// embeddings is an internal blob store keyed by observation_id, never read
// back into a model type or returned from the API, so it carries no paired
// iso column (unlike every other table here).
pub const CREATE_EMBEDDINGS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS embeddings (
    observation_id INTEGER PRIMARY KEY REFERENCES observations(id),
    model_name TEXT NOT NULL,
    dimension INTEGER NOT NULL,
    vector BLOB NOT NULL,
    created_at_epoch INTEGER NOT NULL
)
"#;

pub const CREATE_PROJECT_ALIAS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS project_alias (
    project_name TEXT PRIMARY KEY,
    display_name TEXT NOT NULL
)
"#;

pub const CREATE_EXTERNAL_LINK_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS external_link (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    observation_id INTEGER NOT NULL REFERENCES observations(id),
    repo TEXT NOT NULL,
    artifact_number INTEGER,
    action TEXT NOT NULL,
    url TEXT NOT NULL,
    created_at_epoch INTEGER NOT NULL,
    created_at_iso TEXT NOT NULL
)
"#;

pub const CREATE_EXTERNAL_LINK_OBSERVATION_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_external_link_observation ON external_link(observation_id)
"#;

/// Statements applied, in order, to bring a fresh database to the current
/// schema version. New versions only ever append further statements here
/// (forward-only migrations, §6).
pub const SCHEMA_V1: &[&str] = &[
    CREATE_SCHEMA_META_TABLE,
    CREATE_SESSIONS_TABLE,
    CREATE_SESSIONS_PROJECT_INDEX,
    CREATE_OBSERVATIONS_TABLE,
    CREATE_OBSERVATIONS_PROJECT_KEYSET_INDEX,
    CREATE_OBSERVATIONS_SESSION_INDEX,
    CREATE_OBSERVATIONS_CONTENT_HASH_INDEX,
    CREATE_OBSERVATIONS_TYPE_INDEX,
    CREATE_OBSERVATIONS_FTS_TABLE,
    CREATE_OBSERVATIONS_FTS_TRIGGERS,
    CREATE_SUMMARIES_TABLE,
    CREATE_SUMMARIES_PROJECT_INDEX,
    CREATE_CHECKPOINTS_TABLE,
    CREATE_CHECKPOINTS_PROJECT_INDEX,
    CREATE_PROMPTS_TABLE,
    CREATE_PROMPTS_SESSION_INDEX,
    CREATE_EMBEDDINGS_TABLE,
    CREATE_PROJECT_ALIAS_TABLE,
    CREATE_EXTERNAL_LINK_TABLE,
    CREATE_EXTERNAL_LINK_OBSERVATION_INDEX,
];

/// The schema version this build expects after migration.
pub const CURRENT_SCHEMA_VERSION: i64 = 1;
