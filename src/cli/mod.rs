//! CLI module for the recall command-line interface.
//!
//! Provides one-shot subcommands against the DSA Recall backend:
//! - `login` / `signup` / `logout` / `whoami` - session management
//! - `list` - problems due for review, or all problems with search
//! - `add` / `show` / `edit` - manage saved problems
//! - `review <id>` - record a review outcome
//! - `activity` - review activity heatmap
//!
//! Running with no subcommand opens the interactive dashboard instead.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::api::models::{Credentials, ProblemDraft, ProblemPatch, SignupDetails};
use crate::api::{ApiError, RecallBackend};
use crate::dashboard::heatmap::HeatmapGrid;
use crate::AppContext;

/// CLI arguments structure
#[derive(Parser, Debug)]
#[command(name = "recall")]
#[command(author, version, about = "Spaced-repetition tracker for algorithm practice", long_about = None)]
pub struct Cli {
    /// Path to configuration file (default: ~/.config/recall/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override the backend API URL
    #[arg(long, env = "RECALL_API_URL")]
    pub api_url: Option<String>,

    /// Override log level
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Subcommand to run (if none, opens the interactive dashboard)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in and persist the session
    Login {
        /// Account email
        email: String,
        /// Account password (prompted when omitted; can also be set via RECALL_PASSWORD)
        #[arg(long, env = "RECALL_PASSWORD")]
        password: Option<String>,
    },

    /// Create an account and log in
    Signup {
        /// Display name
        name: String,
        /// Account email
        email: String,
        /// Account password (prompted when omitted; can also be set via RECALL_PASSWORD)
        #[arg(long, env = "RECALL_PASSWORD")]
        password: Option<String>,
    },

    /// Log out and discard the stored session
    Logout,

    /// Show the currently logged-in account
    Whoami,

    /// List problems due for review
    List {
        /// Show every problem, not just the ones due today
        #[arg(short, long)]
        all: bool,
        /// Filter by title (implies --all)
        #[arg(short, long)]
        search: Option<String>,
        /// Page to show
        #[arg(short, long, default_value = "1")]
        page: u32,
    },

    /// Save a new problem
    Add {
        /// Problem title
        title: String,
        /// Link to the problem statement
        #[arg(long)]
        link: String,
        /// Implementation language
        #[arg(long, default_value = "javascript")]
        language: String,
        /// Markdown file holding the approach writeup
        #[arg(long)]
        approach_file: Option<PathBuf>,
        /// File holding the solution code
        #[arg(long)]
        code_file: Option<PathBuf>,
    },

    /// Show one problem in full
    Show {
        /// Problem ID
        id: i64,
    },

    /// Update fields of a saved problem
    Edit {
        /// Problem ID
        id: i64,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New link
        #[arg(long)]
        link: Option<String>,
        /// New implementation language
        #[arg(long)]
        language: Option<String>,
        /// Replace the approach writeup with this file's contents
        #[arg(long)]
        approach_file: Option<PathBuf>,
        /// Replace the solution code with this file's contents
        #[arg(long)]
        code_file: Option<PathBuf>,
    },

    /// Record a review outcome for a problem
    Review {
        /// Problem ID
        id: i64,
        /// Recall came back cleanly; pushes the next review further out
        #[arg(long, conflicts_with = "hard", required_unless_present = "hard")]
        easy: bool,
        /// Recall took a struggle; schedules a prompt retry
        #[arg(long)]
        hard: bool,
    },

    /// Show the review activity heatmap
    Activity {
        /// Months of history to show
        #[arg(short, long)]
        months: Option<u32>,
    },
}

// ============================================================================
// CLI Command Handlers
// ============================================================================

/// Run a CLI command
pub async fn run_command(cli: &Cli, ctx: &AppContext) -> Result<()> {
    match &cli.command {
        Some(Commands::Login { email, password }) => {
            cmd_login(ctx, email, password.as_deref()).await
        }
        Some(Commands::Signup {
            name,
            email,
            password,
        }) => cmd_signup(ctx, name, email, password.as_deref()).await,
        Some(Commands::Logout) => cmd_logout(ctx).await,
        Some(Commands::Whoami) => cmd_whoami(ctx).await,
        Some(Commands::List { all, search, page }) => {
            cmd_list(ctx, *all, search.as_deref(), *page).await
        }
        Some(Commands::Add {
            title,
            link,
            language,
            approach_file,
            code_file,
        }) => {
            cmd_add(
                ctx,
                title,
                link,
                language,
                approach_file.as_deref(),
                code_file.as_deref(),
            )
            .await
        }
        Some(Commands::Show { id }) => cmd_show(ctx, *id).await,
        Some(Commands::Edit {
            id,
            title,
            link,
            language,
            approach_file,
            code_file,
        }) => {
            cmd_edit(
                ctx,
                *id,
                title.clone(),
                link.clone(),
                language.clone(),
                approach_file.as_deref(),
                code_file.as_deref(),
            )
            .await
        }
        Some(Commands::Review { id, easy, hard: _ }) => cmd_review(ctx, *id, *easy).await,
        Some(Commands::Activity { months }) => cmd_activity(ctx, *months).await,
        None => {
            // No subcommand means the interactive dashboard - handled in main.rs
            Ok(())
        }
    }
}

/// Log in and persist the session cookie
async fn cmd_login(ctx: &AppContext, email: &str, password: Option<&str>) -> Result<()> {
    let password = match password {
        Some(p) => p.to_string(),
        None => prompt_line("Password")?,
    };

    let credentials = Credentials {
        email: email.to_string(),
        password,
    };
    ctx.session.login(&credentials).await?;

    let session = ctx.session.snapshot();
    if let Some(user) = &session.identity {
        println!("[OK] Logged in as {} <{}>", user.name, user.email);
    }
    Ok(())
}

/// Create an account, then log in with it
async fn cmd_signup(
    ctx: &AppContext,
    name: &str,
    email: &str,
    password: Option<&str>,
) -> Result<()> {
    let password = match password {
        Some(p) => p.to_string(),
        None => prompt_line("Password")?,
    };

    let details = SignupDetails {
        name: name.to_string(),
        email: email.to_string(),
        password,
    };
    ctx.session.signup(&details).await?;

    let session = ctx.session.snapshot();
    if let Some(user) = &session.identity {
        println!("[OK] Account created. Logged in as {} <{}>", user.name, user.email);
    }
    Ok(())
}

/// Log out; always clears the local session
async fn cmd_logout(ctx: &AppContext) -> Result<()> {
    ctx.session.logout().await;
    println!("[OK] Logged out.");
    Ok(())
}

/// Show the account behind the stored session
async fn cmd_whoami(ctx: &AppContext) -> Result<()> {
    ctx.session.refresh_identity().await;
    let session = ctx.session.snapshot();
    match &session.identity {
        Some(user) => {
            println!("Logged in as {} <{}>", user.name, user.email);
            println!("Server: {}", ctx.api.base_url());
        }
        None => {
            println!("Not logged in.");
        }
    }
    Ok(())
}

/// List due problems, or all problems with optional search
async fn cmd_list(ctx: &AppContext, all: bool, search: Option<&str>, page: u32) -> Result<()> {
    let search = search.unwrap_or("");
    let all = all || !search.is_empty();
    let page = page.max(1);

    let page_data = if all {
        let limit = ctx.config.dashboard.all_page_size;
        ctx.api
            .list_all(search, page, limit)
            .await
            .map_err(session_hint)?
    } else {
        let limit = ctx.config.dashboard.due_page_size;
        ctx.api.list_due(page, limit).await.map_err(session_hint)?
    };

    println!();
    if !all {
        println!("=== Due Today ===");
    } else if search.is_empty() {
        println!("=== All Problems ===");
    } else {
        println!("=== All Problems matching '{}' ===", search);
    }
    println!();

    if page_data.problems.is_empty() {
        if all {
            println!("No problems found.");
        } else {
            println!("Nothing due for review.");
        }
        println!();
        return Ok(());
    }

    println!(
        "{:<6}  {:<40}  {:<10}  {:<6}  {:<12}",
        "ID", "TITLE", "LANGUAGE", "STREAK", "NEXT REVIEW"
    );
    println!("{}", "-".repeat(82));

    for problem in &page_data.problems {
        println!(
            "{:<6}  {:<40}  {:<10}  {:<6}  {:<12}",
            problem.id,
            truncate(&problem.title, 40),
            truncate(&problem.language, 10),
            problem.current_streak,
            format_date(&problem.next_review_date),
        );
    }

    let meta = &page_data.meta;
    println!();
    println!(
        "Page {} of {} ({} problem{})",
        meta.current_page,
        meta.total_pages.max(1),
        meta.total_records,
        if meta.total_records == 1 { "" } else { "s" }
    );
    println!();
    Ok(())
}

/// Save a new problem
async fn cmd_add(
    ctx: &AppContext,
    title: &str,
    link: &str,
    language: &str,
    approach_file: Option<&Path>,
    code_file: Option<&Path>,
) -> Result<()> {
    let draft = ProblemDraft {
        title: title.to_string(),
        link: link.to_string(),
        approach: read_or_empty(approach_file)?,
        code: read_or_empty(code_file)?,
        language: language.to_string(),
    };

    let problem = ctx.api.create_problem(&draft).await.map_err(session_hint)?;

    println!("[OK] Saved problem {}: {}", problem.id, problem.title);
    println!("First review: {}", format_date(&problem.next_review_date));
    Ok(())
}

/// Show one problem in full
async fn cmd_show(ctx: &AppContext, id: i64) -> Result<()> {
    let problem = ctx.api.get_problem(id).await.map_err(session_hint)?;

    println!();
    println!("=== Problem {}: {} ===", problem.id, problem.title);
    println!();
    println!("Link:        {}", problem.link);
    println!("Language:    {}", problem.language);
    println!("Streak:      {}", problem.current_streak);
    println!("Next review: {}", format_date(&problem.next_review_date));
    println!("Created:     {}", format_date(&problem.created_at));
    println!("Updated:     {}", format_date(&problem.updated_at));

    if !problem.approach.is_empty() {
        println!();
        println!("--- Approach ---");
        println!("{}", problem.approach);
    }
    if !problem.code.is_empty() {
        println!();
        println!("--- Code ---");
        println!("{}", problem.code);
    }
    println!();
    Ok(())
}

/// Update fields of a saved problem
async fn cmd_edit(
    ctx: &AppContext,
    id: i64,
    title: Option<String>,
    link: Option<String>,
    language: Option<String>,
    approach_file: Option<&Path>,
    code_file: Option<&Path>,
) -> Result<()> {
    let approach = match approach_file {
        Some(path) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?,
        ),
        None => None,
    };
    let code = match code_file {
        Some(path) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?,
        ),
        None => None,
    };

    let patch = ProblemPatch {
        title,
        link,
        approach,
        code,
        language,
    };
    if patch.is_empty() {
        anyhow::bail!(
            "Nothing to update. Pass at least one of --title, --link, --language, \
             --approach-file, --code-file."
        );
    }

    let problem = ctx
        .api
        .update_problem(id, &patch)
        .await
        .map_err(session_hint)?;

    println!("[OK] Updated problem {}: {}", problem.id, problem.title);
    Ok(())
}

/// Record a review outcome
async fn cmd_review(ctx: &AppContext, id: i64, is_easy: bool) -> Result<()> {
    let problem = ctx
        .api
        .review_problem(id, is_easy)
        .await
        .map_err(session_hint)?;

    println!(
        "[OK] Recorded {} review for '{}'",
        if is_easy { "an easy" } else { "a hard" },
        problem.title
    );
    println!("Streak:      {}", problem.current_streak);
    println!("Next review: {}", format_date(&problem.next_review_date));
    Ok(())
}

/// Print the review activity heatmap
async fn cmd_activity(ctx: &AppContext, months: Option<u32>) -> Result<()> {
    let months = months.unwrap_or(ctx.config.dashboard.heatmap_months).max(1);
    let days = ctx.api.activity(months).await.map_err(session_hint)?;
    let grid = HeatmapGrid::build(&days, Utc::now().date_naive(), months);

    println!();
    println!("=== Review Activity ===");
    println!();
    for line in render_heatmap(&grid) {
        println!("{}", line);
    }
    println!();
    let total = grid.total_reviews();
    println!(
        "{} review{} in the last {} month{}",
        total,
        if total == 1 { "" } else { "s" },
        months,
        if months == 1 { "" } else { "s" }
    );
    println!();
    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Glyphs for activity levels 0-4
const LEVEL_GLYPHS: [char; 5] = ['·', '░', '▒', '▓', '█'];

/// Render the heatmap grid as text rows, Sunday through Saturday
fn render_heatmap(grid: &HeatmapGrid) -> Vec<String> {
    let mut lines = Vec::new();

    let mut header = String::from("     ");
    let mut col = 0;
    for (week, label) in &grid.months {
        if *week < col {
            continue;
        }
        while col < *week {
            header.push(' ');
            col += 1;
        }
        header.push_str(label);
        col += label.chars().count();
    }
    lines.push(header);

    let day_names = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
    for (row, name) in day_names.iter().enumerate() {
        let mut line = format!("{:<4} ", name);
        for week in &grid.weeks {
            line.push(match week[row] {
                Some(cell) => LEVEL_GLYPHS[cell.level as usize],
                None => ' ',
            });
        }
        lines.push(line);
    }
    lines
}

/// Read a file's contents, or return an empty string when no path was given
fn read_or_empty(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => Ok(String::new()),
    }
}

/// Prompt for one line on stdin. Input is echoed.
fn prompt_line(label: &str) -> Result<String> {
    use std::io::Write;
    print!("{}: ", label);
    std::io::stdout().flush().context("Failed to flush stdout")?;
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Map session-related API errors to a login hint
fn session_hint(err: ApiError) -> anyhow::Error {
    match err {
        ApiError::AuthRejected(_) | ApiError::NotAuthenticated => {
            anyhow::anyhow!("Not logged in. Run 'recall login <email>' first.")
        }
        other => other.into(),
    }
}

/// Render a backend timestamp as a calendar date
fn format_date(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc).format("%Y-%m-%d").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

/// Truncate a string to max length with ellipsis
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
