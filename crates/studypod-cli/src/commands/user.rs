use chrono::NaiveDate;
use clap::Subcommand;
use studypod_core::{JlptLevel, UserProfile};

use super::{print_json, Context};

#[derive(Subcommand)]
pub enum UserAction {
    /// Register or update a learner
    Add {
        /// Learner ID
        id: String,
        /// Target JLPT level (N5..N1)
        #[arg(long)]
        level: JlptLevel,
        /// Exam date (YYYY-MM-DD)
        #[arg(long)]
        exam_date: NaiveDate,
        /// Fixed UTC offset in minutes, e.g. 540 for Tokyo
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        utc_offset: i32,
    },
    /// Show a learner profile
    Show {
        /// Learner ID
        id: String,
    },
}

pub fn run(action: UserAction, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let mut svc = ctx.service()?;

    match action {
        UserAction::Add {
            id,
            level,
            exam_date,
            utc_offset,
        } => {
            let profile = UserProfile::new(id, level, exam_date, utc_offset)?;
            svc.register_user(&profile)?;
            print_json(&profile)?;
        }
        UserAction::Show { id } => {
            print_json(&svc.user(&id)?)?;
        }
    }
    Ok(())
}
