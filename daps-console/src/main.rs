use std::{
    fs::File,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use colored::Colorize;
use daps_console::{
    api::RunControl,
    ctx::AppContext,
    posters::{PosterIndex, stats_summary},
    scheduler::{RunEnd, run_and_watch},
    settings::Settings,
    theme::Theme,
    tui,
};
use dapsconfig::{
    data::{catalog, value::module_subtree},
    services::Notifier,
    session::{EditSession, splash},
};
use log::{debug, info};
use serde_json::Value;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    /// Backend URL, overriding the settings file
    #[arg(long, global = true)]
    url: Option<String>,
    /// Settings file (default: <config dir>/daps-console/daps-console.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List configurable modules
    Modules,
    /// Interactive settings editor
    Tui {
        /// Module to open straight away
        module: Option<String>,
    },
    /// Print a module's configuration as TOML
    Show { module: String },
    /// Check a module's configuration for missing required values
    Validate { module: String },
    /// Start a module run
    Run {
        module: String,
        /// Wait until the run finishes
        #[arg(long)]
        watch: bool,
    },
    /// Cancel a running module
    Cancel { module: String },
    /// Whether a module is running
    Status { module: String },
    /// Last run time of every module
    RunState,
    /// Poster asset search
    Posters {
        #[command(subcommand)]
        command: PosterCommand,
    },
    /// Show or set the UI theme
    Theme {
        /// `dark` or `light`
        theme: Option<Theme>,
    },
}

#[derive(Debug, Subcommand)]
enum PosterCommand {
    /// Search poster assets by title
    Search {
        query: String,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// File count and size of a poster location
    Stats { location: String },
}

fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let default = if verbose { "debug" } else { "info" };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default));
    if let Some(path) = log_file {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let file = File::create(path)
            .with_context(|| format!("Failed to create log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let interactive = matches!(cli.command, Command::Tui { .. });
    let log_file = interactive.then(Settings::log_path);
    init_logging(cli.verbose, log_file.as_deref())?;

    let mut settings = Settings::load(cli.config.as_deref()).await?;
    if let Some(url) = cli.url {
        settings.base_url = url;
    }
    let ctx = AppContext::new(settings, !interactive)?;
    debug!("command {:?}", cli.command);

    match cli.command {
        Command::Modules => cmd_modules(),
        Command::Tui { module } => tui::run(&ctx, module.as_deref()).await,
        Command::Show { module } => cmd_show(&ctx, &module).await,
        Command::Validate { module } => cmd_validate(&ctx, &module).await,
        Command::Run { module, watch } => cmd_run(&ctx, &module, watch).await,
        Command::Cancel { module } => {
            ctx.api.cancel(&module).await?;
            println!("{} cancel requested", module.bold());
            Ok(())
        }
        Command::Status { module } => {
            let running = ctx.api.status(&module).await?;
            let state = if running { "running".green() } else { "idle".normal() };
            println!("{}: {state}", module.bold());
            Ok(())
        }
        Command::RunState => cmd_run_state(&ctx).await,
        Command::Posters { command } => cmd_posters(&ctx, command).await,
        Command::Theme { theme } => cmd_theme(&ctx, theme),
    }
}

fn cmd_modules() -> Result<()> {
    for m in splash() {
        println!("{:<20} {}", m.key.cyan(), m.description);
    }
    Ok(())
}

/// TOML has no null; drop those keys and array items.
fn strip_nulls(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Object(map) => Some(Value::Object(
            map.into_iter()
                .filter_map(|(k, v)| strip_nulls(v).map(|v| (k, v)))
                .collect(),
        )),
        Value::Array(items) => Some(Value::Array(
            items.into_iter().filter_map(strip_nulls).collect(),
        )),
        other => Some(other),
    }
}

async fn cmd_show(ctx: &AppContext, module: &str) -> Result<()> {
    if catalog::find(module).is_none() {
        bail!("unknown module `{module}`, see `daps-console modules`");
    }
    let root = ctx.api.get_config().await?;
    let subtree = strip_nulls(module_subtree(&root, module)).unwrap_or(Value::Null);
    let text = toml::to_string_pretty(&subtree)
        .with_context(|| format!("Failed to render {module} as TOML"))?;
    print!("{text}");
    Ok(())
}

async fn cmd_validate(ctx: &AppContext, module: &str) -> Result<()> {
    let schema = catalog::find(module)
        .ok_or_else(|| anyhow::anyhow!("unknown module `{module}`, see `daps-console modules`"))?;
    let root = ctx.api.get_config().await?;
    let mut session = EditSession::new(schema, root);
    let invalid = session.validate();
    if invalid.is_empty() {
        println!("{} {module} is valid", "✓".green());
        return Ok(());
    }
    for (key, message) in session.form.errors() {
        println!("{} {key}: {message}", "✗".red());
    }
    bail!("{} invalid field(s) in {module}", invalid.len());
}

async fn cmd_run(ctx: &AppContext, module: &str, watch: bool) -> Result<()> {
    if !watch {
        ctx.api.run(module).await?;
        println!("{} run requested", module.bold());
        return Ok(());
    }
    let watcher = run_and_watch(ctx.api.clone(), module, ctx.settings.poll_interval()).await?;
    println!("{} running, waiting for it to finish…", watcher.module().bold());
    let stop = watcher.canceller();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stop.cancel();
        }
    });
    let end = watcher.join().await;
    interrupt.abort();
    if end == RunEnd::Cancelled {
        info!("stopped watching {module}");
    }
    match end {
        RunEnd::Changed { running: false } => println!("{} {module} finished", "✓".green()),
        RunEnd::Changed { running: true } => println!("{module} is running"),
        RunEnd::Cancelled => ctx.toasts.error(&format!("Stopped watching {module}")),
    }
    Ok(())
}

async fn cmd_run_state(ctx: &AppContext) -> Result<()> {
    let states = ctx.api.run_states().await?;
    println!("{:<24} {}", "MODULE".bold(), "LAST RUN".bold());
    for s in states {
        println!(
            "{:<24} {}",
            s.module_name,
            s.last_run.as_deref().unwrap_or("never")
        );
    }
    Ok(())
}

async fn cmd_posters(ctx: &AppContext, command: PosterCommand) -> Result<()> {
    match command {
        PosterCommand::Search { query, limit } => {
            let index = PosterIndex::new(ctx.api.poster_assets().await?);
            debug!("{} poster assets indexed", index.len());
            let hits = index.search(&query, limit);
            if hits.is_empty() {
                println!("no posters match `{query}`");
            }
            for hit in hits {
                println!("{:<48} {}", hit.to_string().bold(), hit.file.dimmed());
            }
        }
        PosterCommand::Stats { location } => {
            let stats = ctx.api.poster_search_stats(&location).await?;
            println!("{}", stats_summary(&location, &stats));
        }
    }
    Ok(())
}

fn cmd_theme(ctx: &AppContext, theme: Option<Theme>) -> Result<()> {
    match theme {
        Some(t) => {
            ctx.theme.set(t)?;
            println!("theme set to {t}");
        }
        None => println!("{}", ctx.theme.current()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from(["daps-console", "--url", "http://nas:8000", "run", "nohl", "--watch"])
            .unwrap();
        assert_eq!(cli.url.as_deref(), Some("http://nas:8000"));
        assert!(matches!(cli.command, Command::Run { watch: true, .. }));

        let cli = Cli::try_parse_from(["daps-console", "theme", "light"]).unwrap();
        assert!(matches!(cli.command, Command::Theme { theme: Some(Theme::Light) }));
        assert!(Cli::try_parse_from(["daps-console", "theme", "blue"]).is_err());
    }

    #[test]
    fn test_strip_nulls_for_toml() {
        let v = json!({"a": null, "b": [1, null], "c": {"d": null, "e": "x"}});
        let stripped = strip_nulls(v).unwrap();
        assert_eq!(stripped, json!({"b": [1], "c": {"e": "x"}}));
        assert!(toml::to_string_pretty(&stripped).is_ok());
    }
}
