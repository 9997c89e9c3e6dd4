//! Thin CLI binary over [`gait::GaitRepo`]. Parses arguments, calls the
//! library, and prints; no business logic lives here.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use gait::{GaitError, GaitRepo, Tokens, Turn, Visibility};

#[derive(Parser)]
#[command(name = "gait", about = "Content-addressed versioning store for LLM conversation turns")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Initialize a gait repo in PATH (default: .)
    Init {
        #[arg(default_value = ".")]
        path: PathBuf,
    },
    /// Show current repo status
    Status,
    /// Create a branch
    Branch {
        name: String,
        #[arg(long = "from-commit")]
        from_commit: Option<String>,
        #[arg(long = "no-inherit-memory")]
        no_inherit_memory: bool,
    },
    /// Switch branches
    Checkout { name: String },
    /// Record a user+assistant turn and auto-commit
    #[command(name = "record-turn")]
    RecordTurn {
        #[arg(long)]
        user: String,
        #[arg(long)]
        assistant: String,
        #[arg(long, default_value = "")]
        message: String,
        #[arg(long, default_value = "private")]
        visibility: String,
        #[arg(long, default_value = "")]
        context: String,
        #[arg(long, default_value = "")]
        tools: String,
        #[arg(long, default_value = "")]
        model: String,
    },
    /// Show commit log
    Log {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Show prompts and responses for a commit (default: HEAD)
    Show { commit: Option<String> },
    /// Pin a commit's turns into the current branch's memory
    Pin {
        commit: Option<String>,
        #[arg(long)]
        last: bool,
        #[arg(long, default_value = "")]
        note: String,
    },
    /// List pinned memory items for the current branch
    Memory,
    /// Remove a pinned memory item by 1-based index
    Unpin { index: usize },
    /// Show token budget summary for pinned memory
    Budget,
    /// Merge SOURCE branch into the current branch
    Merge {
        source: String,
        #[arg(long, default_value = "")]
        message: String,
        #[arg(long = "with-memory")]
        with_memory: bool,
    },
    /// Print the current context pack
    Context {
        #[arg(long)]
        json: bool,
        #[arg(long)]
        full: bool,
    },
    /// Roll the current branch back to a prior commit
    Revert {
        commit: Option<String>,
        #[arg(long = "also-memory")]
        also_memory: bool,
    },
}

fn parse_json_object(raw: &str) -> Result<serde_json::Map<String, serde_json::Value>, GaitError> {
    if raw.is_empty() {
        return Ok(serde_json::Map::new());
    }
    match serde_json::from_str(raw) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(_) => Err(GaitError::SchemaError("expected a JSON object".to_string())),
        Err(e) => Err(GaitError::Json(e)),
    }
}

fn short(oid: &str) -> &str {
    gait::hash::short_oid(oid)
}

fn run(cli: Cli) -> Result<(), GaitError> {
    match cli.command {
        Command::Init { path } => {
            let repo = GaitRepo::init(path)?;
            println!("Initialized gait repo in {}", repo.root().join(".gait").display());
        }
        Command::Status => {
            let repo = GaitRepo::discover(std::env::current_dir()?)?;
            let branch = repo.current_branch()?;
            let head = repo.head_commit_id()?;
            println!("root:   {}", repo.root().display());
            println!("branch: {branch}");
            println!("HEAD:   {}", head.as_deref().unwrap_or("(empty)"));
        }
        Command::Branch { name, from_commit, no_inherit_memory } => {
            let repo = GaitRepo::discover(std::env::current_dir()?)?;
            repo.create_branch(&name, from_commit.as_deref(), !no_inherit_memory)?;
            println!("Created branch {name}");
        }
        Command::Checkout { name } => {
            let repo = GaitRepo::discover(std::env::current_dir()?)?;
            repo.checkout(&name)?;
            println!("Switched to branch {name}");
        }
        Command::RecordTurn { user, assistant, message, visibility, context, tools, model } => {
            let repo = GaitRepo::discover(std::env::current_dir()?)?;
            let visibility = match visibility.as_str() {
                "private" => Visibility::Private,
                "shareable" => Visibility::Shareable,
                other => {
                    return Err(GaitError::SchemaError(format!(
                        "unknown visibility `{other}`, expected private or shareable"
                    )));
                }
            };
            let turn = Turn::v0(
                user,
                assistant,
                parse_json_object(&context)?,
                parse_json_object(&tools)?,
                parse_json_object(&model)?,
                Tokens::default(),
                visibility,
            );
            let (turn_id, commit_id) = repo.record_turn(&turn, &message)?;
            println!("turn:   {turn_id}");
            println!("commit: {commit_id}");
            println!("branch: {} -> {}", repo.current_branch()?, commit_id);
        }
        Command::Log { limit } => {
            let repo = GaitRepo::discover(std::env::current_dir()?)?;
            let log = repo.log(Some(limit))?;
            for (oid, commit) in log {
                let parents = if commit.parents.is_empty() {
                    "-".to_string()
                } else {
                    commit.parents.iter().map(|p| short(p)).collect::<Vec<_>>().join(",")
                };
                let merge_flag = if commit.parents.len() > 1 { " (merge)" } else { "" };
                println!(
                    "{}{merge_flag}  {}  {}  p=[{parents}]  turns={}  {}",
                    short(&oid),
                    commit.created_at.to_rfc3339(),
                    commit.kind,
                    commit.turn_ids.len(),
                    commit.message,
                );
            }
        }
        Command::Show { commit } => {
            let repo = GaitRepo::discover(std::env::current_dir()?)?;
            let commit_id = match commit {
                Some(c) => c,
                None => repo
                    .head_commit_id()?
                    .ok_or_else(|| GaitError::EmptyBranch(repo.current_branch()?))?,
            };
            let c = repo.get_commit(&commit_id)?;
            println!("commit: {commit_id}");
            println!("branch: {}", c.branch);
            println!("kind:   {}", c.kind);
            println!("{}", "-".repeat(60));
            if c.turn_ids.is_empty() {
                println!("(no turns attached to this commit)");
                return Ok(());
            }
            for (i, tid) in c.turn_ids.iter().enumerate() {
                let turn = repo.get_turn(tid)?;
                println!("[Turn {}]", i + 1);
                println!("User:");
                println!("{}", turn.user.text);
                println!("\nAssistant:");
                println!("{}", turn.assistant.text);
                println!("{}", "-".repeat(60));
            }
        }
        Command::Pin { commit, last, note } => {
            let repo = GaitRepo::discover(std::env::current_dir()?)?;
            let commit_id = if last {
                let head = repo
                    .head_commit_id()?
                    .ok_or_else(|| GaitError::NotFound("HEAD commit to pin".to_string()))?;
                let (oid, _) = gait::dag::last_commit_with_turns(repo.objects(), &head)?
                    .ok_or_else(|| {
                        GaitError::NotFound("commit with turns in history to pin".to_string())
                    })?;
                oid
            } else {
                commit.ok_or_else(|| {
                    GaitError::SchemaError("provide a commit id/prefix or use --last".to_string())
                })?
            };
            let mem_id = repo.pin_commit(&commit_id, &note)?;
            println!("pinned commit {commit_id} into memory");
            println!("memory: {mem_id}");
        }
        Command::Memory => {
            let repo = GaitRepo::discover(std::env::current_dir()?)?;
            let branch = repo.current_branch()?;
            let manifest = repo.get_memory(&branch)?;
            println!("branch: {branch}");
            println!("pinned: {}", manifest.items.len());
            println!("{}", "-".repeat(60));
            for (i, item) in manifest.items.iter().enumerate() {
                println!(
                    "{}. turn={} commit={} note={}",
                    i + 1,
                    short(&item.turn_id),
                    short(&item.commit_id),
                    item.note,
                );
            }
        }
        Command::Unpin { index } => {
            let repo = GaitRepo::discover(std::env::current_dir()?)?;
            let branch = repo.current_branch()?;
            let manifest = repo.get_memory(&branch)?;
            if manifest.items.is_empty() {
                println!("nothing to unpin (memory is empty)");
                return Ok(());
            }
            let mem_id = repo.unpin_index(index)?;
            println!("unpinned #{index}");
            println!("memory: {mem_id}");
        }
        Command::Budget => {
            let repo = GaitRepo::discover(std::env::current_dir()?)?;
            let b = repo.budget_for_memory()?;
            println!("branch: {}", b.branch);
            println!("pinned_items: {}", b.pinned_items);
            println!("tokens_input_total: {}", b.tokens_input_total);
            println!("tokens_output_total: {}", b.tokens_output_total);
            println!("unknown_token_fields: {}", b.unknown_token_fields);
        }
        Command::Merge { source, message, with_memory } => {
            let repo = GaitRepo::discover(std::env::current_dir()?)?;
            let merge_id = repo.merge(&source, &message, with_memory)?;
            println!("merged: {source} -> {}", repo.current_branch()?);
            println!("HEAD:   {merge_id}");
            if with_memory {
                let branch = repo.current_branch()?;
                println!("memory: {}", repo.memory_ref(&branch)?);
            }
        }
        Command::Context { json, full } => {
            let repo = GaitRepo::discover(std::env::current_dir()?)?;
            let bundle = repo.build_context_bundle(full)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&bundle)?);
                return Ok(());
            }
            println!("branch: {}", bundle.branch);
            println!("memory: {}", bundle.memory_id);
            println!("pinned: {}", bundle.pinned_items);
            println!("{}", "-".repeat(60));
            if bundle.items.is_empty() {
                println!("(no pinned memory)");
                return Ok(());
            }
            for item in &bundle.items {
                println!("[PIN {}] note={}", item.index, item.note);
                println!("User:");
                println!("{}", item.user_text);
                println!("\nAssistant:");
                println!("{}", item.assistant_text);
                println!("{}", "-".repeat(60));
            }
        }
        Command::Revert { commit, also_memory } => {
            let repo = GaitRepo::discover(std::env::current_dir()?)?;
            let branch = repo.current_branch()?;
            repo.head_commit_id()?
                .ok_or_else(|| GaitError::EmptyBranch(branch.clone()))?;

            let resolved = match commit {
                Some(target) => repo.reset_branch(&target)?,
                None => repo.revert_to_parent()?,
            };
            if resolved.is_empty() {
                println!("reverted: {branch} is now empty");
            } else {
                println!("reverted: {branch} -> {resolved}");
            }
            println!("HEAD:   {}", repo.head_commit_id()?.unwrap_or_default());

            if also_memory {
                let head = repo.head_commit_id()?.unwrap_or_default();
                let (old_mem, new_mem) = repo.rewind_memory_to_head(&branch, &head)?;
                println!("memory: {old_mem} -> {new_mem}");
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
