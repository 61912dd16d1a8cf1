use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use daylist::domain::{
    compute_totals, day_summary, format_minutes, status_badge, time_label, tree_connector,
    TaskIcon, TaskKind,
};
use daylist::persistence::{
    atomic_write, backup_file, config_file, export_file_name, get_data_dir, init_local_dir,
    clear_session_lock, load_config, read_file, save_config, session_file, snapshot_file,
    write_session_lock, AppConfig, SessionLock,
};
use daylist::ticker::{tick_duration, Ticker};
use daylist::{AppState, TaskDraft};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "daylist")]
#[command(about = "A daily checklist with subtasks, progress and task timers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a local .daylist directory in the current directory
    Init,
    /// Show the task list (default)
    List,
    /// Add a task
    Add {
        title: String,
        /// Icon name, e.g. Sun, BookOpen, Toothbrush
        #[arg(short, long)]
        icon: Option<String>,
        /// Estimated minutes
        #[arg(short, long)]
        estimate: Option<f64>,
        /// Discarded on a new day when the drop_temporary policy is set
        #[arg(short, long)]
        temporary: bool,
    },
    /// Edit a task's title, icon, estimate or kind
    Edit {
        /// Task position (1-based)
        task: usize,
        #[arg(long)]
        title: Option<String>,
        #[arg(short, long)]
        icon: Option<String>,
        #[arg(short, long)]
        estimate: Option<f64>,
        /// Remove the estimate
        #[arg(long, conflicts_with = "estimate")]
        no_estimate: bool,
        /// daily or temporary
        #[arg(short, long)]
        kind: Option<String>,
    },
    /// Toggle a task's completion
    Toggle { task: usize },
    /// Delete a task and its subtasks
    Rm { task: usize },
    /// Move a task to another position
    Move { task: usize, to: usize },
    /// Manage subtasks
    Sub {
        #[command(subcommand)]
        command: SubCommands,
    },
    /// Start a task's timer
    Start { task: usize },
    /// Stop a task's timer
    Stop { task: usize },
    /// Clear all completion for a fresh day
    NewDay {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Export tasks to a JSON file
    Export {
        /// Output file path. Defaults to ./adhd-tasks-YYYY-MM-DD.json
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Replace all tasks with the contents of an export file
    Import { file: PathBuf },
    /// List icon names offered for tasks
    Icons,
    /// Drive running timers, stopping them when their estimate is used up.
    /// Ends once no timer is running; interrupting it abandons the timers.
    Watch {
        /// Start this task's timer first (1-based position)
        #[arg(short, long)]
        start: Option<usize>,
        /// Keep watching when no timer is running
        #[arg(short, long)]
        keep: bool,
    },
}

#[derive(Subcommand)]
enum SubCommands {
    /// Add a subtask
    Add { task: usize, title: String },
    /// Toggle a subtask's completion
    Toggle { task: usize, subtask: usize },
    /// Delete a subtask
    Rm { task: usize, subtask: usize },
    /// Rename a subtask
    Edit {
        task: usize,
        subtask: usize,
        title: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Some(Commands::Icons) = cli.command {
        let names: Vec<&str> = TaskIcon::pickable().iter().map(TaskIcon::name).collect();
        println!("{}", names.join(", "));
        return Ok(());
    }

    if let Some(Commands::Init) = cli.command {
        let data_dir = init_local_dir()?;
        save_config(data_dir.join("config.json"), &AppConfig::default())?;
        println!("Initialized daylist directory: {}", data_dir.display());
        println!();
        println!("Daylist will now use this local directory for task storage.");
        return Ok(());
    }

    let data_dir = get_data_dir()?;
    tracing::debug!(dir = %data_dir.display(), "using data directory");

    let config = load_config(config_file()?)?;
    let snapshot_path = snapshot_file()?;
    let lock_path = session_file()?;
    let mut app = AppState::open(&snapshot_path, &lock_path, config, Utc::now())?;

    match cli.command.unwrap_or(Commands::List) {
        Commands::Init | Commands::Icons | Commands::List => {}
        Commands::Add {
            title,
            icon,
            estimate,
            temporary,
        } => {
            let kind = if temporary {
                TaskKind::Temporary
            } else {
                TaskKind::Daily
            };
            let draft = TaskDraft::new(title)
                .icon(parse_icon(icon.as_deref()))
                .estimate(estimate)
                .kind(kind);
            if app.add_task(draft).is_none() {
                anyhow::bail!("Task title cannot be empty");
            }
        }
        Commands::Edit {
            task,
            title,
            icon,
            estimate,
            no_estimate,
            kind,
        } => {
            let id = task_id(&app, task)?;
            let current = app.task(&id).context("Task disappeared")?;

            let kind = match kind {
                Some(tag) => TaskKind::from_tag(&tag)
                    .with_context(|| format!("Unknown kind '{}', use daily or temporary", tag))?,
                None => current.kind,
            };
            let estimate = if no_estimate {
                None
            } else {
                estimate.or(current.track.estimated_minutes)
            };
            let draft = TaskDraft::new(title.unwrap_or_else(|| current.title.clone()))
                .icon(icon.as_deref().map(TaskIcon::normalize).unwrap_or(current.icon))
                .estimate(estimate)
                .kind(kind);

            if !app.update_task(&id, draft) {
                anyhow::bail!("Task title cannot be empty");
            }
        }
        Commands::Toggle { task } => {
            let id = task_id(&app, task)?;
            if !app.toggle_task(&id) {
                println!("Task {} is completed through its subtasks", task);
            }
        }
        Commands::Rm { task } => {
            let id = task_id(&app, task)?;
            app.delete_task(&id);
        }
        Commands::Move { task, to } => {
            let id = task_id(&app, task)?;
            if to == 0 || to > app.tasks().len() {
                anyhow::bail!("Target position must be between 1 and {}", app.tasks().len());
            }
            app.reorder_task(&id, to - 1);
        }
        Commands::Sub { command } => run_sub_command(&mut app, command)?,
        Commands::Start { task } => {
            let id = task_id(&app, task)?;
            if !app.start_timer(&id) {
                println!("Timer for task {} is already running", task);
            }
        }
        Commands::Stop { task } => {
            let id = task_id(&app, task)?;
            match app.stop_timer(&id) {
                Some(minutes) => println!("Logged {}", format_minutes(minutes)),
                None => println!("Timer for task {} is not running", task),
            }
        }
        Commands::NewDay { yes } => {
            if !yes && !confirm("Start a new day? All completion will be cleared")? {
                println!("Cancelled");
                return Ok(());
            }
            let dropped = app.new_day_session();
            if dropped > 0 {
                println!("Removed {} temporary task(s)", dropped);
            }
        }
        Commands::Export { output } => {
            let path = output
                .unwrap_or_else(|| PathBuf::from(export_file_name(Utc::now().date_naive())));
            let content = app.export_snapshot()?;
            atomic_write(&path, &content)
                .with_context(|| format!("Failed to write export: {}", path.display()))?;
            println!("Exported {} task(s) to {}", app.tasks().len(), path.display());
            return Ok(());
        }
        Commands::Import { file } => {
            if !file.is_file() {
                anyhow::bail!("Import file not found: {}", file.display());
            }
            let raw = read_file(&file)?;
            let count = app
                .import_snapshot(&raw)
                .with_context(|| format!("Could not import {}", file.display()))?;
            if let Some(backup) = backup_file(&snapshot_path)? {
                println!("Previous tasks backed up to {}", backup.display());
            }
            println!("Imported {} task(s)", count);
        }
        Commands::Watch { start, keep } => {
            if let Some(task) = start {
                let id = task_id(&app, task)?;
                app.start_timer(&id);
                app.save(&snapshot_path)?;
            }
            return run_watch(&mut app, &snapshot_path, &lock_path, keep);
        }
    }

    if app.needs_save {
        app.save(&snapshot_path)?;
    }
    print_tasks(&app);
    Ok(())
}

fn run_sub_command(app: &mut AppState, command: SubCommands) -> Result<()> {
    match command {
        SubCommands::Add { task, title } => {
            let id = task_id(app, task)?;
            if app.add_subtask(&id, &title).is_none() {
                anyhow::bail!("Subtask title cannot be empty");
            }
        }
        SubCommands::Toggle { task, subtask } => {
            let (id, sub_id) = subtask_id(app, task, subtask)?;
            app.toggle_subtask(&id, &sub_id);
        }
        SubCommands::Rm { task, subtask } => {
            let (id, sub_id) = subtask_id(app, task, subtask)?;
            app.delete_subtask(&id, &sub_id);
        }
        SubCommands::Edit {
            task,
            subtask,
            title,
        } => {
            let (id, sub_id) = subtask_id(app, task, subtask)?;
            if !app.edit_subtask(&id, &sub_id, &title) {
                anyhow::bail!("Subtask title cannot be empty");
            }
        }
    }
    Ok(())
}

/// Hold the session lock while driving timers, releasing it on the way out
fn run_watch(
    app: &mut AppState,
    snapshot_path: &Path,
    lock_path: &Path,
    keep: bool,
) -> Result<()> {
    let tick_ms = app.config.tick_ms;
    write_session_lock(lock_path, &SessionLock::new_at(Utc::now(), tick_ms))?;

    let result = watch_loop(app, snapshot_path, lock_path, keep);
    clear_session_lock(lock_path)?;
    result
}

/// Each tick re-reads the snapshot so commands run meanwhile are seen,
/// applies auto-stop, saves and refreshes the lock heartbeat
fn watch_loop(
    app: &mut AppState,
    snapshot_path: &Path,
    lock_path: &Path,
    keep: bool,
) -> Result<()> {
    let tick_ms = app.config.tick_ms;
    let ticker = Ticker::spawn(tick_duration(tick_ms));
    print_tasks(app);

    while ticker.wait() {
        let now = Utc::now();
        if let Err(e) = app.reload(snapshot_path) {
            tracing::warn!("could not reload snapshot, keeping current tasks: {:#}", e);
        }

        let stopped = app.tick(now);
        for stop in &stopped {
            println!(
                "⏰ Time is up for '{}' ({} logged)",
                stop.title,
                format_minutes(stop.credited)
            );
        }

        if app.needs_save {
            if let Err(e) = app.save(snapshot_path) {
                tracing::error!("failed to save snapshot: {:#}", e);
            }
        }

        if let Err(e) = write_session_lock(lock_path, &SessionLock::new_at(now, tick_ms)) {
            tracing::warn!("failed to refresh session lock: {:#}", e);
        }

        let running = app.has_running_timers();
        if !stopped.is_empty() || running {
            print_tasks(app);
        }
        if !running && !keep {
            println!("No timers running, done watching");
            break;
        }
    }

    Ok(())
}

fn print_tasks(app: &AppState) {
    let now = Utc::now();
    let summary = day_summary(app.tasks());

    if app.tasks().is_empty() {
        println!("No tasks yet. Add one with: daylist add \"Brush teeth\"");
        return;
    }

    println!(
        "Today: {}/{} done ({}%)",
        summary.completed, summary.total, summary.percent
    );
    let (elapsed, estimated) = compute_totals(app.tasks(), now);
    if elapsed > 0.0 || estimated > 0.0 {
        println!(
            "Time: {} spent of {} planned",
            format_minutes(elapsed),
            format_minutes(estimated)
        );
    }
    for (index, task) in app.tasks().iter().enumerate() {
        let mut line = format!(
            "{:>2}. {} {} [{}]",
            index + 1,
            status_badge(task),
            task.title,
            task.icon.name()
        );
        if task.has_subtasks() {
            line.push_str(&format!(" {}%", task.progress));
        }
        let time = time_label(task, now);
        if !time.is_empty() {
            line.push_str(&format!("  {}", time));
        }
        if task.kind == TaskKind::Temporary {
            line.push_str(&format!("  ({})", task.kind.to_tag()));
        }
        println!("{}", line);

        let count = task.subtasks.len();
        for (st_index, subtask) in task.subtasks.iter().enumerate() {
            let mark = if subtask.completed { "✓" } else { "○" };
            println!(
                "      {} {}. {} {}",
                tree_connector(st_index + 1 == count),
                st_index + 1,
                mark,
                subtask.title
            );
        }
    }
}

fn parse_icon(name: Option<&str>) -> TaskIcon {
    name.map(TaskIcon::normalize).unwrap_or_default()
}

/// Resolve a 1-based task position to its id
fn task_id(app: &AppState, position: usize) -> Result<String> {
    position
        .checked_sub(1)
        .and_then(|index| app.tasks().get(index))
        .map(|task| task.id.clone())
        .with_context(|| format!("No task at position {}", position))
}

/// Resolve 1-based task and subtask positions to their ids
fn subtask_id(app: &AppState, task: usize, subtask: usize) -> Result<(String, String)> {
    let id = task_id(app, task)?;
    let sub_id = subtask
        .checked_sub(1)
        .and_then(|index| app.task(&id)?.subtasks.get(index))
        .map(|st| st.id.clone())
        .with_context(|| format!("Task {} has no subtask {}", task, subtask))?;
    Ok((id, sub_id))
}

fn confirm(prompt: &str) -> Result<bool> {
    use std::io::Write;

    print!("{} [y/N] ", prompt);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}
