//! Pod management commands.

use chrono::{NaiveDate, Utc};
use clap::Subcommand;
use studypod_core::{JlptLevel, Pod};
use uuid::Uuid;

use super::{print_json, Context};

#[derive(Subcommand)]
pub enum PodAction {
    /// Create an empty pod
    Create {
        /// JLPT level shared by all members
        #[arg(long)]
        level: JlptLevel,
        /// First exam date the pod targets (YYYY-MM-DD)
        #[arg(long)]
        window_start: NaiveDate,
        /// Last exam date the pod targets (YYYY-MM-DD)
        #[arg(long)]
        window_end: NaiveDate,
        /// Maximum number of members (3-8)
        #[arg(long, default_value = "6")]
        capacity: u8,
        /// Pod ID (generated when omitted)
        #[arg(long)]
        id: Option<String>,
    },
    /// Add a learner to a pod
    Join {
        /// Pod ID
        pod_id: String,
        /// Learner ID
        user_id: String,
    },
    /// Remove a learner from a pod
    Leave {
        /// Pod ID
        pod_id: String,
        /// Learner ID
        user_id: String,
    },
    /// Show pod details
    Show {
        /// Pod ID
        pod_id: String,
    },
    /// List pods
    List {
        /// Only pods this learner belongs to
        #[arg(long)]
        user: Option<String>,
    },
    /// Dissolve empty pods and pods whose exam window has passed
    Prune,
}

pub fn run(action: PodAction, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let mut svc = ctx.service()?;
    let now = Utc::now();

    match action {
        PodAction::Create {
            level,
            window_start,
            window_end,
            capacity,
            id,
        } => {
            let id = id.unwrap_or_else(|| Uuid::new_v4().to_string());
            let pod = Pod::new(id, level, window_start, window_end, capacity, now)?;
            svc.create_pod(&pod)?;
            print_json(&pod)?;
        }
        PodAction::Join { pod_id, user_id } => {
            print_json(&svc.join_pod(&user_id, &pod_id, now)?)?;
        }
        PodAction::Leave { pod_id, user_id } => {
            print_json(&svc.leave_pod(&user_id, &pod_id, now)?)?;
        }
        PodAction::Show { pod_id } => {
            print_json(&svc.pod(&pod_id)?)?;
        }
        PodAction::List { user } => {
            let pods = match user {
                Some(user_id) => svc.pods_for_user(&user_id)?,
                None => svc.pods()?,
            };
            print_json(&pods)?;
        }
        PodAction::Prune => {
            print_json(&svc.dissolve_expired(now)?)?;
        }
    }
    Ok(())
}
