pub const SCHEMA: &str = r#"
-- user_added_projects table
CREATE TABLE IF NOT EXISTS user_added_projects (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project TEXT NOT NULL,
    state TEXT,
    county TEXT,
    type TEXT,
    status TEXT,
    latitude REAL,
    longitude REAL,
    system_size_mw_ac REAL,
    system_size_mw_dc REAL,
    sentiment TEXT,
    sentiment_detail TEXT,
    mentions_of_moratoria TEXT,
    recent_projects TEXT,
    survey_q1 TEXT,
    survey_q2 TEXT,
    survey_q3 TEXT,
    survey_q4 TEXT,
    survey_q5 TEXT,
    survey_q6 TEXT,
    survey_q7 TEXT,
    survey_q8 TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_user_added_projects_project ON user_added_projects(project);

-- removed_projects table (tombstones hide a project name from every view)
CREATE TABLE IF NOT EXISTS removed_projects (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- public_hearing_qa table
CREATE TABLE IF NOT EXISTS public_hearing_qa (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    topic TEXT,
    question TEXT NOT NULL,
    response TEXT NOT NULL,
    sources TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_public_hearing_qa_topic ON public_hearing_qa(topic);
"#;

/// Adds the soft-delete flag to Q&A tables created before it existed.
pub const QA_SOFT_DELETE_MIGRATION: &str =
    "ALTER TABLE public_hearing_qa ADD COLUMN is_removed INTEGER NOT NULL DEFAULT 0";
