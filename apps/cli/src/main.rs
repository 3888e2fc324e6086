mod commands;
mod session;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::*;
use iox::DataDir;
use model::AchievementCategory;
use session::AppSession;

#[derive(Parser, Debug)]
#[command(name = "stride", version, about = "Track runs and walks from a GPS feed")]
struct Cli {
    /// Where profile, progress and history are kept
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record a live session
    Track(TrackArgs),
    /// List recorded sessions, newest first
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Totals for today, this week, all time and per month
    Stats {
        #[arg(long)]
        year: Option<i32>,
    },
    Achievements {
        #[arg(long, value_parser = parse_lower::<AchievementCategory>)]
        category: Option<AchievementCategory>,
    },
    /// Today's goals and step trend
    Goals,
    #[command(subcommand)]
    Profile(ProfileCmd),
    /// Planned-route progress against the daily distance goal
    #[command(subcommand)]
    Progress(ProgressCmd),
    /// Plan a route between two points
    Route(RouteArgs),
    #[command(subcommand)]
    Export(ExportCmd),
    #[command(subcommand)]
    Import(ImportCmd),
}

fn default_data_dir() -> PathBuf {
    dirs_next::data_dir().map(|d| d.join("stride")).unwrap_or_else(|| PathBuf::from(".stride"))
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let dir = DataDir::new(cli.data_dir.unwrap_or_else(default_data_dir));
    let mut app = AppSession::open(dir)?;

    match cli.command {
        Command::Track(args) => track(&app, args).await,
        Command::History { limit } => history(&app, limit),
        Command::Stats { year } => stats(&app, year),
        Command::Achievements { category } => achievements(&app, category),
        Command::Goals => goals(&app),
        Command::Profile(cmd) => profile(&mut app, cmd),
        Command::Progress(cmd) => progress(&app, cmd),
        Command::Route(args) => route(&app, args).await,
        Command::Export(cmd) => export(&app, cmd),
        Command::Import(cmd) => import(&app, cmd),
    }
}
