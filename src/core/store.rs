//! RC-006: Session store — durable, resumable run records.
//!
//! One directory per session under a per-project prefix:
//! `<base>/<project slug>/<session id>/`, holding `session.yaml` (the
//! record, written atomically via temp file + rename), a `recipe.yaml`
//! snapshot so resume needs only the session id, and the `events.jsonl`
//! provenance log. The store is the sole source of truth
//! for resumption and must survive process restart.

use super::error::EngineError;
use super::types::{yaml_value_to_string, Recipe, Session, SessionStatus, SessionSummary};
use chrono::Utc;
use indexmap::IndexMap;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Session record file name.
pub const SESSION_FILE: &str = "session.yaml";

/// Persisted recipe copy file name.
pub const RECIPE_FILE: &str = "recipe.yaml";

/// Session record schema version.
pub const SCHEMA_VERSION: &str = "1.0";

/// Filesystem-backed session store rooted at a base directory.
#[derive(Debug, Clone)]
pub struct SessionStore {
    base_dir: PathBuf,
}

impl SessionStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Default base directory: `~/.receta/projects`.
    pub fn default_base_dir() -> PathBuf {
        dirs::home_dir()
            .map(|home| home.join(".receta").join("projects"))
            .unwrap_or_else(|| PathBuf::from(".receta/projects"))
    }

    /// Per-project prefix — sessions from different projects never collide.
    pub fn project_dir(&self, project_path: &Path) -> PathBuf {
        self.base_dir.join(project_slug(project_path))
    }

    pub fn session_dir_for(&self, project_path: &Path, session_id: &str) -> PathBuf {
        self.project_dir(project_path).join(session_id)
    }

    pub fn session_dir(&self, session: &Session) -> PathBuf {
        self.session_dir_for(&session.project_path, &session.session_id)
    }

    /// Allocate a fresh session and persist its initial record together
    /// with a snapshot of the recipe. Context is seeded from recipe-level
    /// defaults, then invocation variables on top.
    pub fn create(
        &self,
        recipe: &Recipe,
        project_path: &Path,
        initial_variables: IndexMap<String, String>,
    ) -> Result<Session, EngineError> {
        let mut context: IndexMap<String, String> = recipe
            .context
            .iter()
            .map(|(k, v)| (k.clone(), yaml_value_to_string(v)))
            .collect();
        context.extend(initial_variables);

        let now = Utc::now();
        let session = Session {
            schema: SCHEMA_VERSION.to_string(),
            session_id: generate_session_id(),
            recipe_name: recipe.name.clone(),
            recipe_version: recipe.version.clone(),
            project_path: project_path.to_path_buf(),
            started_at: now,
            updated_at: now,
            generator: format!("receta {}", env!("CARGO_PKG_VERSION")),
            status: SessionStatus::Running,
            context,
            completed_steps: Vec::new(),
        };

        let dir = self.session_dir(&session);
        std::fs::create_dir_all(&dir)
            .map_err(|e| EngineError::Store(format!("cannot create {}: {}", dir.display(), e)))?;

        let recipe_yaml = serde_yaml_ng::to_string(recipe)
            .map_err(|e| EngineError::Store(format!("recipe serialize error: {}", e)))?;
        let recipe_path = dir.join(RECIPE_FILE);
        std::fs::write(&recipe_path, recipe_yaml).map_err(|e| {
            EngineError::Store(format!("cannot write {}: {}", recipe_path.display(), e))
        })?;

        self.save(&session)?;
        Ok(session)
    }

    /// Durably overwrite the record. Atomic (temp file + rename) so a
    /// concurrent reader never observes a partial record; idempotent,
    /// last-write-wins.
    pub fn save(&self, session: &Session) -> Result<(), EngineError> {
        let dir = self.session_dir(session);
        std::fs::create_dir_all(&dir)
            .map_err(|e| EngineError::Store(format!("cannot create {}: {}", dir.display(), e)))?;

        let yaml = serde_yaml_ng::to_string(session)
            .map_err(|e| EngineError::Store(format!("session serialize error: {}", e)))?;

        let path = dir.join(SESSION_FILE);
        let tmp_path = dir.join("session.yaml.tmp");
        std::fs::write(&tmp_path, &yaml).map_err(|e| {
            EngineError::Store(format!("cannot write {}: {}", tmp_path.display(), e))
        })?;
        std::fs::rename(&tmp_path, &path).map_err(|e| {
            EngineError::Store(format!(
                "cannot rename {} -> {}: {}",
                tmp_path.display(),
                path.display(),
                e
            ))
        })?;

        Ok(())
    }

    /// Load a session record by id.
    pub fn load(&self, project_path: &Path, session_id: &str) -> Result<Session, EngineError> {
        let path = self
            .session_dir_for(project_path, session_id)
            .join(SESSION_FILE);
        if !path.exists() {
            return Err(EngineError::SessionNotFound(session_id.to_string()));
        }
        let content = std::fs::read_to_string(&path)
            .map_err(|e| EngineError::Store(format!("cannot read {}: {}", path.display(), e)))?;
        serde_yaml_ng::from_str(&content).map_err(|e| {
            EngineError::Store(format!("invalid session file {}: {}", path.display(), e))
        })
    }

    /// Load the recipe copy persisted alongside a session.
    pub fn load_recipe(&self, session: &Session) -> Result<Recipe, EngineError> {
        let path = self.session_dir(session).join(RECIPE_FILE);
        if !path.exists() {
            return Err(EngineError::Store(format!(
                "recipe copy missing for session {}",
                session.session_id
            )));
        }
        super::parser::parse_recipe_file(&path)
    }

    /// Summaries of every session for a project, newest `started_at`
    /// first. Unreadable entries are skipped, not fatal.
    pub fn list(&self, project_path: &Path) -> Result<Vec<SessionSummary>, EngineError> {
        let dir = self.project_dir(project_path);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let entries = std::fs::read_dir(&dir)
            .map_err(|e| EngineError::Store(format!("cannot read {}: {}", dir.display(), e)))?;

        let mut summaries = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path().join(SESSION_FILE);
            let Ok(content) = std::fs::read_to_string(&path) else {
                continue;
            };
            let Ok(session) = serde_yaml_ng::from_str::<Session>(&content) else {
                continue;
            };
            summaries.push(SessionSummary {
                session_id: session.session_id,
                recipe_name: session.recipe_name,
                recipe_version: session.recipe_version,
                status: session.status,
                started_at: session.started_at,
                completed_steps: session.completed_steps.len(),
            });
        }

        summaries.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(summaries)
    }

    /// Remove terminal sessions whose last update is older than the
    /// cutoff. Running sessions are never removed. Returns the number
    /// of sessions deleted.
    pub fn cleanup(
        &self,
        project_path: &Path,
        older_than_days: u32,
    ) -> Result<usize, EngineError> {
        let dir = self.project_dir(project_path);
        if !dir.exists() {
            return Ok(0);
        }
        let cutoff = Utc::now() - chrono::Duration::days(i64::from(older_than_days));

        let entries = std::fs::read_dir(&dir)
            .map_err(|e| EngineError::Store(format!("cannot read {}: {}", dir.display(), e)))?;

        let mut removed = 0;
        for entry in entries.flatten() {
            let session_path = entry.path().join(SESSION_FILE);
            let Ok(content) = std::fs::read_to_string(&session_path) else {
                continue;
            };
            let Ok(session) = serde_yaml_ng::from_str::<Session>(&content) else {
                continue;
            };
            if session.status != SessionStatus::Running && session.updated_at < cutoff {
                std::fs::remove_dir_all(entry.path()).map_err(|e| {
                    EngineError::Store(format!(
                        "cannot remove {}: {}",
                        entry.path().display(),
                        e
                    ))
                })?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// Generate a session id embedding a UTC timestamp and a random component.
pub fn generate_session_id() -> String {
    let ts = Utc::now().format("%Y%m%d%H%M%S");
    let salt = Uuid::new_v4().simple().to_string();
    format!("s-{}-{}", ts, &salt[..8])
}

/// Derive the per-project directory name: sanitized final path component
/// plus a short digest of the full path.
fn project_slug(project_path: &Path) -> String {
    let name = project_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "root".to_string());
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();

    let digest = Sha256::digest(project_path.to_string_lossy().as_bytes());
    let hex: String = digest.iter().take(4).map(|b| format!("{:02x}", b)).collect();
    format!("{}-{}", sanitized, hex)
}
