//! Engine configuration, one section per component.

use clap::{Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::{Map, Value};
use studypod_core::{CoachingConfig, Config, MatcherConfig, StreakConfig, ValidatorConfig};

use super::{print_json, Context};

/// Engine component owning a group of keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Section {
    /// Check-in ceiling
    Validator,
    /// Grace allowance, window and scope
    Streak,
    /// Exam-date tolerance and new-pod capacity
    Matcher,
    /// Lookback window, milestones and notification timing
    Coaching,
}

impl Section {
    const ALL: [Section; 4] = [Section::Validator, Section::Streak, Section::Matcher, Section::Coaching];

    fn name(self) -> &'static str {
        match self {
            Section::Validator => "validator",
            Section::Streak => "streak",
            Section::Matcher => "matcher",
            Section::Coaching => "coaching",
        }
    }

    fn about(self) -> &'static str {
        match self {
            Section::Validator => "check-in ceiling",
            Section::Streak => "grace allowance, window and scope",
            Section::Matcher => "exam-date tolerance and new-pod capacity",
            Section::Coaching => "lookback window, milestones and notification timing",
        }
    }

    fn reset(self, config: &mut Config) {
        match self {
            Section::Validator => config.validator = ValidatorConfig::default(),
            Section::Streak => config.streak = StreakConfig::default(),
            Section::Matcher => config.matcher = MatcherConfig::default(),
            Section::Coaching => config.coaching = CoachingConfig::default(),
        }
    }
}

/// One section of `config list` output.
#[derive(Serialize)]
struct SectionView {
    section: &'static str,
    about: &'static str,
    /// Dot-path key to current value
    values: Map<String, Value>,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print one value by its `<section>.<key>` path
    Get {
        /// e.g. "streak.grace_window_days", "matcher.exam_date_tolerance_days"
        key: String,
    },
    /// Change one value; it is type-checked and range-checked before saving
    Set {
        /// `<section>.<key>` path
        key: String,
        value: String,
    },
    /// List keys grouped by component
    List {
        /// Only this component
        section: Option<Section>,
    },
    /// Restore defaults for one component, or for all of them
    Reset {
        section: Option<Section>,
    },
}

pub fn run(action: ConfigAction, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key } => {
            let config = ctx.config()?;
            match config.get(&key) {
                Some(value) => println!("{value}"),
                None => return Err(format!("unknown key: {key}").into()),
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = ctx.config()?;
            config.set(&key, &value)?;
            config.save_to(ctx.data_dir())?;
            tracing::info!(%key, %value, "config updated");
            println!("ok");
        }
        ConfigAction::List { section } => {
            let config = serde_json::to_value(ctx.config()?)?;
            let views: Vec<SectionView> = selected(section)
                .into_iter()
                .map(|s| section_view(&config, s))
                .collect();
            print_json(&views)?;
        }
        ConfigAction::Reset { section } => {
            let mut config = ctx.config()?;
            for s in selected(section) {
                s.reset(&mut config);
            }
            config.save_to(ctx.data_dir())?;
            match section {
                Some(s) => println!("{} reset to defaults", s.name()),
                None => println!("config reset to defaults"),
            }
        }
    }
    Ok(())
}

fn selected(section: Option<Section>) -> Vec<Section> {
    match section {
        Some(s) => vec![s],
        None => Section::ALL.to_vec(),
    }
}

fn section_view(config: &Value, section: Section) -> SectionView {
    let values = config
        .get(section.name())
        .and_then(Value::as_object)
        .map(|fields| {
            fields
                .iter()
                .map(|(key, value)| (format!("{}.{key}", section.name()), value.clone()))
                .collect()
        })
        .unwrap_or_default();
    SectionView {
        section: section.name(),
        about: section.about(),
        values,
    }
}
