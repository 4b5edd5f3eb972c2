use chrono::{DateTime, Utc};
use clap::Args;

use super::{print_json, Context};

#[derive(Args)]
pub struct StreakArgs {
    /// Learner ID
    #[arg(long)]
    user: String,
    /// Pod ID (ignored when streak scope is all_pods)
    #[arg(long)]
    pod: Option<String>,
    /// Evaluate as of this instant (RFC 3339, default: now)
    #[arg(long)]
    at: Option<DateTime<Utc>>,
}

pub fn run(args: StreakArgs, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let svc = ctx.service()?;
    let now = args.at.unwrap_or_else(Utc::now);
    print_json(&svc.streak_for(&args.user, args.pod.as_deref(), now)?)
}
