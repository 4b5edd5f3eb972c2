use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "studypod", version, about = "Study pod accountability CLI")]
struct Cli {
    /// Data directory (default: ~/.config/studypod)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Learner profiles
    User {
        #[command(subcommand)]
        action: commands::user::UserAction,
    },
    /// Pod management
    Pod {
        #[command(subcommand)]
        action: commands::pod::PodAction,
    },
    /// Daily check-ins
    Checkin {
        #[command(subcommand)]
        action: commands::checkin::CheckinAction,
    },
    /// Current streak of a learner
    Streak(commands::streak::StreakArgs),
    /// Weekly reviews
    Review {
        #[command(subcommand)]
        action: commands::review::ReviewAction,
    },
    /// Coaching insights for a learner in a pod
    Coach(commands::coach::CoachArgs),
    /// Rank pods for a learner
    Match(commands::matching::MatchArgs),
    /// Decide whether a learner should get a check-in reminder
    Remind(commands::remind::RemindArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("STUDYPOD_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let result = commands::Context::new(cli.data_dir).and_then(|ctx| match cli.command {
        Commands::User { action } => commands::user::run(action, &ctx),
        Commands::Pod { action } => commands::pod::run(action, &ctx),
        Commands::Checkin { action } => commands::checkin::run(action, &ctx),
        Commands::Streak(args) => commands::streak::run(args, &ctx),
        Commands::Review { action } => commands::review::run(action, &ctx),
        Commands::Coach(args) => commands::coach::run(args, &ctx),
        Commands::Match(args) => commands::matching::run(args, &ctx),
        Commands::Remind(args) => commands::remind::run(args, &ctx),
        Commands::Config { action } => commands::config::run(action, &ctx),
    });

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
