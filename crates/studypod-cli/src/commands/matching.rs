//! Pod matching command.

use chrono::Utc;
use clap::Args;
use studypod_core::{MatchOutcome, MatchPreferences};

use super::{print_json, Context};

#[derive(Args)]
pub struct MatchArgs {
    /// Learner ID
    #[arg(long)]
    user: String,
    /// Only consider pods of at most this capacity
    #[arg(long)]
    max_capacity: Option<u8>,
    /// Form a new pod when nothing qualifies
    #[arg(long)]
    form: bool,
}

pub fn run(args: MatchArgs, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let mut svc = ctx.service()?;
    let prefs = MatchPreferences {
        max_pod_capacity: args.max_capacity,
    };

    let outcome = svc.match_learner(&args.user, &prefs)?;
    match outcome {
        MatchOutcome::NoCapacity { .. } if args.form => {
            let pod = svc.form_pod_for(&args.user, Utc::now())?;
            print_json(&pod)
        }
        outcome => print_json(&outcome),
    }
}
