//! Weekly review commands.

use chrono::{NaiveDate, Utc};
use clap::Subcommand;
use studypod_core::WeekKey;

use super::{print_json, Context};

#[derive(Subcommand)]
pub enum ReviewAction {
    /// Review of a whole pod
    Pod {
        /// Pod ID
        pod_id: String,
        /// ISO week, e.g. 2025-W23 (default: week of --as-of)
        #[arg(long)]
        week: Option<WeekKey>,
        /// Evaluation date (YYYY-MM-DD, default: today UTC)
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Review of one learner across all pods
    User {
        /// Learner ID
        user_id: String,
        /// ISO week, e.g. 2025-W23 (default: week of --as-of)
        #[arg(long)]
        week: Option<WeekKey>,
        /// Evaluation date (YYYY-MM-DD, default: today UTC)
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
}

pub fn run(action: ReviewAction, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let svc = ctx.service()?;
    let today = Utc::now().date_naive();

    match action {
        ReviewAction::Pod { pod_id, week, as_of } => {
            let as_of = as_of.unwrap_or(today);
            let week = week.unwrap_or_else(|| WeekKey::of(as_of));
            print_json(&svc.pod_review(&pod_id, week, as_of)?)?;
        }
        ReviewAction::User { user_id, week, as_of } => {
            let as_of = as_of.unwrap_or(today);
            let week = week.unwrap_or_else(|| WeekKey::of(as_of));
            print_json(&svc.user_review(&user_id, week, as_of)?)?;
        }
    }
    Ok(())
}
