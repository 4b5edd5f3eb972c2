//! Daily check-in commands.

use chrono::{DateTime, NaiveDate, Utc};
use clap::Subcommand;
use studypod_core::{CheckInSubmission, DateRange};

use super::{print_json, Context};

#[derive(Subcommand)]
pub enum CheckinAction {
    /// Submit today's check-in
    Submit {
        /// Learner ID
        #[arg(long)]
        user: String,
        /// Pod ID
        #[arg(long)]
        pod: String,
        /// Minutes studied
        #[arg(long, allow_hyphen_values = true)]
        minutes: i64,
        /// Proof type: screenshot, note or link
        #[arg(long, default_value = "note")]
        proof_type: String,
        /// Proof content (note text, URL, or image reference)
        #[arg(long)]
        proof: String,
        /// Mood: struggling, okay or great
        #[arg(long, default_value = "okay")]
        mood: String,
        /// Submission time (RFC 3339, default: now)
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
    /// List a learner's check-ins
    List {
        /// Learner ID
        #[arg(long)]
        user: String,
        /// Restrict to one pod
        #[arg(long)]
        pod: Option<String>,
        /// First date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Last date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
    },
}

pub fn run(action: CheckinAction, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let mut svc = ctx.service()?;

    match action {
        CheckinAction::Submit {
            user,
            pod,
            minutes,
            proof_type,
            proof,
            mood,
            at,
        } => {
            let submission = CheckInSubmission {
                user_id: user,
                pod_id: pod,
                submitted_at: at.unwrap_or_else(Utc::now),
                study_minutes: minutes,
                proof_type,
                proof_content: proof,
                mood,
            };
            print_json(&svc.submit_check_in(&submission)?)?;
        }
        CheckinAction::List { user, pod, from, to } => {
            let range = DateRange { start: from, end: to };
            print_json(&svc.check_ins(&user, pod.as_deref(), range)?)?;
        }
    }
    Ok(())
}
