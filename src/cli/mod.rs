//! RC-010: CLI subcommands — init, validate, run, resume, sessions, clean.

use crate::core::executor::Executor;
use crate::core::store::SessionStore;
use crate::core::types::{Recipe, Session, SessionStatus};
use crate::core::{parser, resolver, validator};
use crate::invoker::CommandInvoker;
use clap::Subcommand;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a starter recipe
    Init {
        /// Directory to initialize (default: current)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Validate a recipe without executing it
    Validate {
        /// Path to the recipe file
        #[arg(short, long, default_value = "recipe.yaml")]
        file: PathBuf,
    },

    /// Execute a recipe
    Run {
        /// Path to the recipe file
        #[arg(short, long, default_value = "recipe.yaml")]
        file: PathBuf,

        /// Invocation variable as key=value (repeatable)
        #[arg(short = 'v', long = "var")]
        vars: Vec<String>,

        /// Project the session belongs to (default: current directory)
        #[arg(long)]
        project: Option<PathBuf>,

        /// Session store base directory (default: ~/.receta/projects)
        #[arg(long)]
        session_dir: Option<PathBuf>,

        /// Agent runner command line (default: $RECETA_AGENT_CMD)
        #[arg(long)]
        agent_command: Option<String>,

        /// Show the step plan without executing
        #[arg(long)]
        dry_run: bool,
    },

    /// Resume an interrupted session
    Resume {
        /// Session id to resume
        session_id: String,

        /// Project the session belongs to (default: current directory)
        #[arg(long)]
        project: Option<PathBuf>,

        /// Session store base directory (default: ~/.receta/projects)
        #[arg(long)]
        session_dir: Option<PathBuf>,

        /// Agent runner command line (default: $RECETA_AGENT_CMD)
        #[arg(long)]
        agent_command: Option<String>,
    },

    /// List sessions for a project, newest first
    Sessions {
        /// Project to list (default: current directory)
        #[arg(long)]
        project: Option<PathBuf>,

        /// Session store base directory (default: ~/.receta/projects)
        #[arg(long)]
        session_dir: Option<PathBuf>,
    },

    /// Remove finished sessions older than a cutoff
    Clean {
        /// Age cutoff in days
        #[arg(long, default_value_t = 7)]
        days: u32,

        /// Project to clean (default: current directory)
        #[arg(long)]
        project: Option<PathBuf>,

        /// Session store base directory (default: ~/.receta/projects)
        #[arg(long)]
        session_dir: Option<PathBuf>,
    },
}

/// Dispatch a CLI command.
pub async fn dispatch(cmd: Commands) -> Result<(), String> {
    match cmd {
        Commands::Init { path } => cmd_init(&path),
        Commands::Validate { file } => cmd_validate(&file),
        Commands::Run {
            file,
            vars,
            project,
            session_dir,
            agent_command,
            dry_run,
        } => cmd_run(&file, &vars, project, session_dir, agent_command, dry_run).await,
        Commands::Resume {
            session_id,
            project,
            session_dir,
            agent_command,
        } => cmd_resume(&session_id, project, session_dir, agent_command).await,
        Commands::Sessions {
            project,
            session_dir,
        } => cmd_sessions(project, session_dir),
        Commands::Clean {
            days,
            project,
            session_dir,
        } => cmd_clean(days, project, session_dir),
    }
}

const STARTER_RECIPE: &str = r#"name: my-recipe
version: "1.0.0"
description: "Managed by receta"

context: {}

steps:
  - id: hello
    agent: demo/greeter
    prompt: "Say hi to {{who}}"
"#;

fn cmd_init(path: &Path) -> Result<(), String> {
    let recipe_path = path.join("recipe.yaml");
    if recipe_path.exists() {
        return Err(format!("{} already exists", recipe_path.display()));
    }

    std::fs::create_dir_all(path).map_err(|e| format!("cannot create dir: {}", e))?;
    std::fs::write(&recipe_path, STARTER_RECIPE)
        .map_err(|e| format!("cannot write {}: {}", recipe_path.display(), e))?;

    println!("Initialized receta recipe at {}", recipe_path.display());
    Ok(())
}

fn cmd_validate(file: &Path) -> Result<(), String> {
    let recipe = parser::parse_recipe_file(file).map_err(|e| e.to_string())?;
    let result = validator::validate(&recipe);

    for warning in &result.warnings {
        println!("  WARN: {}", warning);
    }
    if result.is_valid() {
        println!(
            "OK: {} v{} ({} steps)",
            recipe.name,
            recipe.version,
            recipe.steps.len()
        );
        Ok(())
    } else {
        for error in &result.errors {
            eprintln!("  ERROR: {}", error);
        }
        Err(format!("{} validation error(s)", result.errors.len()))
    }
}

/// Parse and validate a recipe file, printing findings. The validator is
/// the single pre-execution gate — nothing runs on an invalid recipe.
fn load_and_validate(file: &Path) -> Result<Recipe, String> {
    let recipe = parser::parse_recipe_file(file).map_err(|e| e.to_string())?;
    let result = validator::validate(&recipe);
    for warning in &result.warnings {
        println!("  WARN: {}", warning);
    }
    if result.is_valid() {
        return Ok(recipe);
    }
    for error in &result.errors {
        eprintln!("  ERROR: {}", error);
    }
    Err(
        crate::core::error::EngineError::ValidationFailed(format!(
            "{} error(s)",
            result.errors.len()
        ))
        .to_string(),
    )
}

async fn cmd_run(
    file: &Path,
    vars: &[String],
    project: Option<PathBuf>,
    session_dir: Option<PathBuf>,
    agent_command: Option<String>,
    dry_run: bool,
) -> Result<(), String> {
    let recipe = load_and_validate(file)?;

    if dry_run {
        print_plan(&recipe);
        return Ok(());
    }

    let project = resolve_project(project)?;
    let initial = parse_vars(vars)?;
    let store = session_store(session_dir);
    let invoker = build_invoker(agent_command)?;

    let session = store
        .create(&recipe, &project, initial)
        .map_err(|e| e.to_string())?;
    println!("Session: {}", session.session_id);

    let executor = Executor::new(&invoker, &store);
    let session = executor
        .run(&recipe, session)
        .await
        .map_err(|e| e.to_string())?;

    print_outcome(&recipe, &session)
}

async fn cmd_resume(
    session_id: &str,
    project: Option<PathBuf>,
    session_dir: Option<PathBuf>,
    agent_command: Option<String>,
) -> Result<(), String> {
    let project = resolve_project(project)?;
    let store = session_store(session_dir);

    let session = store
        .load(&project, session_id)
        .map_err(|e| e.to_string())?;
    if session.status != SessionStatus::Running {
        return Err(crate::core::error::EngineError::SessionNotResumable {
            id: session.session_id,
            status: session.status,
        }
        .to_string());
    }

    let recipe = store.load_recipe(&session).map_err(|e| e.to_string())?;
    let invoker = build_invoker(agent_command)?;

    println!(
        "Resuming {} ({} of {} steps already complete)",
        session.session_id,
        session.completed_steps.len(),
        recipe.steps.len()
    );

    let executor = Executor::new(&invoker, &store);
    let session = executor
        .run(&recipe, session)
        .await
        .map_err(|e| e.to_string())?;

    print_outcome(&recipe, &session)
}

fn cmd_sessions(project: Option<PathBuf>, session_dir: Option<PathBuf>) -> Result<(), String> {
    let project = resolve_project(project)?;
    let store = session_store(session_dir);
    let summaries = store.list(&project).map_err(|e| e.to_string())?;

    if summaries.is_empty() {
        println!("No sessions for {}", project.display());
        return Ok(());
    }

    println!(
        "{:<34} {:<10} {:>6}  {:<21} RECIPE",
        "SESSION", "STATUS", "STEPS", "STARTED"
    );
    for summary in &summaries {
        println!(
            "{:<34} {:<10} {:>6}  {:<21} {} v{}",
            summary.session_id,
            summary.status.to_string(),
            summary.completed_steps,
            summary.started_at.format("%Y-%m-%dT%H:%M:%SZ"),
            summary.recipe_name,
            summary.recipe_version
        );
    }
    Ok(())
}

fn cmd_clean(
    days: u32,
    project: Option<PathBuf>,
    session_dir: Option<PathBuf>,
) -> Result<(), String> {
    let project = resolve_project(project)?;
    let store = session_store(session_dir);
    let removed = store.cleanup(&project, days).map_err(|e| e.to_string())?;
    println!("Removed {} finished session(s) older than {} days", removed, days);
    Ok(())
}

/// Display the step plan without executing (dry run).
fn print_plan(recipe: &Recipe) {
    println!(
        "Plan: {} v{} ({} steps)",
        recipe.name,
        recipe.version,
        recipe.steps.len()
    );
    println!();
    for (index, step) in recipe.steps.iter().enumerate() {
        println!(
            "  {}. {:<20} agent={:<24} on_error={}",
            index + 1,
            step.id,
            step.agent,
            step.on_error
        );
        let mut needs: Vec<String> = resolver::extract_variables(&step.prompt)
            .into_iter()
            .collect();
        needs.sort();
        if !needs.is_empty() {
            println!("     needs: {}", needs.join(", "));
        }
    }
}

fn print_outcome(recipe: &Recipe, session: &Session) -> Result<(), String> {
    match session.status {
        SessionStatus::Completed => {
            println!(
                "{}: COMPLETED ({} of {} steps)",
                session.session_id,
                session.completed_steps.len(),
                recipe.steps.len()
            );
            Ok(())
        }
        status => Err(format!(
            "session {} {} after {} of {} steps",
            session.session_id,
            status,
            session.completed_steps.len(),
            recipe.steps.len()
        )),
    }
}

/// Parse repeated `key=value` pairs.
fn parse_vars(vars: &[String]) -> Result<IndexMap<String, String>, String> {
    let mut parsed = IndexMap::new();
    for pair in vars {
        let Some((key, value)) = pair.split_once('=') else {
            return Err(format!("invalid --var '{}': expected key=value", pair));
        };
        if key.is_empty() {
            return Err(format!("invalid --var '{}': empty key", pair));
        }
        parsed.insert(key.to_string(), value.to_string());
    }
    Ok(parsed)
}

fn session_store(session_dir: Option<PathBuf>) -> SessionStore {
    SessionStore::new(session_dir.unwrap_or_else(SessionStore::default_base_dir))
}

fn resolve_project(project: Option<PathBuf>) -> Result<PathBuf, String> {
    match project {
        Some(path) => Ok(path),
        None => std::env::current_dir().map_err(|e| format!("cannot resolve project dir: {}", e)),
    }
}

fn build_invoker(agent_command: Option<String>) -> Result<CommandInvoker, String> {
    let command_line = match agent_command {
        Some(cmd) => cmd,
        None => std::env::var("RECETA_AGENT_CMD").map_err(|_| {
            "no agent command configured; pass --agent-command or set RECETA_AGENT_CMD"
                .to_string()
        })?,
    };
    CommandInvoker::from_command_line(&command_line)
        .ok_or_else(|| "agent command must not be empty".to_string())
}
