use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::{self, CommandReport};
use crate::logging;
use crate::wr::config::load_config;
use crate::wr::paths::resolve_paths;

#[derive(Debug, Parser)]
#[command(
    name = "wr-live",
    version,
    about = "Track newly verified speedrun.com world records and render them as Markdown"
)]
pub struct Cli {
    /// Print the command report as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Scan the verified-runs feed, update the ledger and render the report.
    Scan(ScanArgs),
    /// Render the report from the saved ledger without touching the network.
    Render(OutputArgs),
    /// Show paths, ledger and state summary.
    Status,
    /// List current #1 runs verified in the last N days.
    Recent(RecentArgs),
}

#[derive(Debug, Args)]
struct OutputArgs {
    /// Write Markdown here instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct ScanArgs {
    #[command(flatten)]
    out: OutputArgs,
    /// Update ledger and state only.
    #[arg(long)]
    no_render: bool,
    /// Skip filling avatars for entries saved without them.
    #[arg(long)]
    no_enrich: bool,
}

#[derive(Debug, Args)]
struct RecentArgs {
    #[command(flatten)]
    out: OutputArgs,
    /// Days to look back (1-3650).
    #[arg(long)]
    days: Option<u32>,
    /// Maximum rows (1-3650).
    #[arg(long)]
    limit: Option<u32>,
}

fn print_report(report: &CommandReport, json: bool, to_stderr: bool) -> Result<()> {
    let text = if json {
        serde_json::to_string_pretty(report)?
    } else {
        let mut lines = vec![format!(
            "{}: {}",
            report.command,
            if report.ok { "ok" } else { "failed" }
        )];
        lines.extend(report.details.iter().map(|d| format!("  - {d}")));
        lines.extend(report.issues.iter().map(|i| format!("  ! {i}")));
        lines.join("\n")
    };
    if to_stderr {
        eprintln!("{text}");
    } else {
        println!("{text}");
    }
    Ok(())
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let cfg = load_config()?;
    logging::init(&cfg.log)?;
    let paths = resolve_paths()?;

    let (report, markdown_on_stdout) = match cli.command {
        Command::Scan(args) => {
            let on_stdout = !args.no_render && args.out.output.is_none();
            let opts = commands::scan::ScanOptions {
                output: args.out.output,
                render: !args.no_render,
                enrich: !args.no_enrich,
            };
            (commands::scan::run(&cfg, &paths, &opts)?, on_stdout)
        }
        Command::Render(args) => (
            commands::render::run(&cfg, &paths, args.output.as_deref())?,
            args.output.is_none(),
        ),
        Command::Status => (commands::status::run(&cfg, &paths)?, false),
        Command::Recent(args) => (
            commands::recent::run(&cfg, args.days, args.limit, args.out.output.as_deref())?,
            args.out.output.is_none(),
        ),
    };

    print_report(&report, cli.json, markdown_on_stdout)?;
    if !report.ok {
        anyhow::bail!("{} finished with {} issue(s)", report.command, report.issues.len());
    }
    Ok(())
}
