use chrono::{DateTime, Utc};
use clap::Args;

use super::{print_json, Context};

#[derive(Args)]
pub struct CoachArgs {
    /// Learner ID
    #[arg(long)]
    user: String,
    /// Pod ID
    #[arg(long)]
    pod: String,
    /// Evaluate as of this instant (RFC 3339, default: now)
    #[arg(long)]
    at: Option<DateTime<Utc>>,
}

pub fn run(args: CoachArgs, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let svc = ctx.service()?;
    let now = args.at.unwrap_or_else(Utc::now);
    print_json(&svc.coach(&args.user, &args.pod, now)?)
}
