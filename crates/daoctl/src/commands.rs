//! Command execution
//!
//! One handler per subcommand, consuming the dao_common stores the way
//! the tracker's pages do: list/filter for views, the journal for
//! logging, the progression calculator for stats and breakthroughs.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use dao_common::config::TrackerConfig;
use dao_common::journal::{self, JournalError};
use dao_common::progression::{
    self, attempt_breakthrough, DayStatus, ProgressionError, Trend,
};
use dao_common::seed::seed_default_paths;
use dao_common::{Cultivation, EntityStore, Practice};
use owo_colors::OwoColorize;
use serde_json::json;
use std::path::PathBuf;

/// How far back practice records are fetched for stats, matching the
/// longest window the views use.
const PRACTICE_FETCH_LIMIT: usize = 365;

/// Open stores plus the resolved data directory.
pub struct AppContext {
    pub data_dir: PathBuf,
    pub cultivations: EntityStore<Cultivation>,
    pub practices: EntityStore<Practice>,
}

impl AppContext {
    /// Open both collections and run the first-launch seed contract.
    pub async fn open(data_dir_flag: Option<PathBuf>, today: NaiveDate) -> Result<Self> {
        let data_dir = match data_dir_flag {
            Some(dir) => dir,
            None => TrackerConfig::load().resolve_data_dir(),
        };
        let cultivations = EntityStore::open(&data_dir)
            .with_context(|| format!("opening cultivation store in {}", data_dir.display()))?;
        let practices = EntityStore::open(&data_dir)
            .with_context(|| format!("opening practice store in {}", data_dir.display()))?;

        seed_default_paths(&cultivations, today).await?;

        Ok(Self {
            data_dir,
            cultivations,
            practices,
        })
    }

    /// Find a path by exact id, falling back to a case-insensitive dao
    /// name match.
    pub async fn resolve_path(&self, key: &str) -> Result<Cultivation> {
        if let Some(found) = self.cultivations.get(key).await {
            return Ok(found);
        }
        let by_name: Vec<Cultivation> = self
            .cultivations
            .list(Some("dao_name"), None)
            .await
            .into_iter()
            .filter(|c| c.dao_name.eq_ignore_ascii_case(key))
            .collect();
        match by_name.len() {
            0 => bail!("no cultivation path matching '{key}'"),
            1 => Ok(by_name.into_iter().next().unwrap()),
            n => bail!("'{key}' matches {n} paths; use the id"),
        }
    }

    /// Recent practice records for one path, newest first.
    async fn recent_practices(&self, cultivation_id: &str) -> Vec<Practice> {
        self.practices
            .filter(
                &[("cultivation_id", json!(cultivation_id))],
                Some("-date"),
                Some(PRACTICE_FETCH_LIMIT),
            )
            .await
    }
}

fn trend_colored(trend: Trend) -> String {
    match trend {
        Trend::Increasing => trend.as_str().green().to_string(),
        Trend::Decreasing => trend.as_str().red().to_string(),
        Trend::Stable => trend.as_str().dimmed().to_string(),
    }
}

pub async fn paths(ctx: &AppContext) -> Result<()> {
    let paths = ctx.cultivations.list(Some("dao_name"), None).await;
    if paths.is_empty() {
        println!("No cultivation paths. Start one with `daoctl begin <name>`.");
        return Ok(());
    }

    println!("{}", "CULTIVATION PATHS".bold());
    for path in paths {
        println!(
            "  {}  {}  {} days practiced  [{}]",
            path.dao_name.green(),
            path.stage_label(),
            path.total_days_practiced,
            path.id.dimmed(),
        );
    }
    Ok(())
}

pub async fn begin(ctx: &AppContext, dao_name: &str, today: NaiveDate) -> Result<()> {
    if dao_name.trim().is_empty() {
        bail!("the dao name must not be empty");
    }
    let created = ctx
        .cultivations
        .create(Cultivation::new(dao_name.trim(), today))
        .await?;
    println!(
        "Begun cultivating the Dao of {} [{}]",
        created.dao_name.green(),
        created.id.dimmed()
    );
    Ok(())
}

pub async fn show(ctx: &AppContext, key: &str, today: NaiveDate) -> Result<()> {
    let path = ctx.resolve_path(key).await?;
    let practices = ctx.recent_practices(&path.id).await;

    let density90 = progression::density(90, &practices, today);
    let density180 = progression::density(180, &practices, today);

    println!("{}", format!("Cultivating the Dao of {}", path.dao_name).bold());
    println!("  Stage:            {}", path.stage_label());
    println!("  State:            {}", path.cultivation_state.as_str());
    println!("  Days on path:     {}", progression::days_on_path(&path, today));
    println!("  Total practiced:  {}", path.total_days_practiced);
    println!("  Density:          {density90}% (90d)  {density180}% (180d)");
    if let Some(last) = path.last_breakthrough_attempt {
        println!("  Last attempt:     {last}");
    }
    Ok(())
}

pub async fn log(ctx: &AppContext, key: &str, minutes: Option<u32>, today: NaiveDate) -> Result<()> {
    let path = ctx.resolve_path(key).await?;
    match journal::log_practice(&ctx.cultivations, &ctx.practices, &path.id, today, minutes).await {
        Ok(_) => {
            println!("Practice recorded for {} on {today}.", path.dao_name.green());
            Ok(())
        }
        Err(JournalError::DuplicateDay(date)) => {
            println!("{date} is already logged for {}.", path.dao_name);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn rest(ctx: &AppContext, key: &str, today: NaiveDate) -> Result<()> {
    let path = ctx.resolve_path(key).await?;
    match journal::log_rest(&ctx.cultivations, &ctx.practices, &path.id, today).await {
        Ok(_) => {
            println!("Rest recorded for {} on {today}.", path.dao_name);
            Ok(())
        }
        Err(JournalError::DuplicateDay(date)) => {
            println!("{date} is already logged for {}.", path.dao_name);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn history(ctx: &AppContext, key: &str, window: u32, today: NaiveDate) -> Result<()> {
    if window == 0 {
        bail!("the window must be at least one day");
    }
    let path = ctx.resolve_path(key).await?;
    let practices = ctx.recent_practices(&path.id).await;
    let stats = progression::window_stats(window, &practices, today);

    println!("{}", format!("{} — last {window} days", path.dao_name).bold());
    println!(
        "  Density: {}%   Practiced: {} days   Trend: {}",
        stats.density_pct,
        stats.practiced_days,
        trend_colored(stats.trend)
    );

    // Day grid, oldest first: ● practiced, ○ rested, · unlogged.
    let marks = progression::day_marks(window, &practices, today);
    for row in marks.chunks(30) {
        let line: String = row
            .iter()
            .map(|mark| match mark.status {
                DayStatus::Practiced => '●',
                DayStatus::Rested => '○',
                DayStatus::Unlogged => '·',
            })
            .collect();
        println!("  {line}");
    }
    Ok(())
}

pub async fn breakthrough(ctx: &AppContext, key: &str, today: NaiveDate) -> Result<()> {
    let path = ctx.resolve_path(key).await?;
    let practices = ctx.recent_practices(&path.id).await;
    let density90 = progression::density(90, &practices, today);
    let req = progression::requirements(path.current_realm);

    println!("{}", "ATTEMPT BREAKTHROUGH".bold());
    println!(
        "  Total practiced:  {} days (required: {})",
        path.total_days_practiced, req.days
    );
    println!("  90-day density:   {density90}% (required: {}%)", req.density);

    let mut rng = rand::thread_rng();
    match attempt_breakthrough(&ctx.cultivations, &path.id, density90, today, &mut rng).await {
        Ok(outcome) => {
            println!("  Chance:           {:.0}%", outcome.chance);
            if outcome.success {
                let (realm, phase) = outcome.target;
                println!();
                println!("{}", "Breakthrough successful.".green().bold());
                println!("{} — {} Stage", realm.as_str().bold(), phase.as_str());
                println!("A new realm opens before you.");
            } else {
                println!();
                println!("{}", "Foundation unstable.".red());
                println!("Continue cultivation.");
            }
            Ok(())
        }
        Err(ProgressionError::TerminalStage) => {
            println!();
            println!("You have reached the peak of cultivation.");
            Ok(())
        }
        Err(ProgressionError::NotEligible { .. }) => {
            println!();
            println!("Foundation insufficient for a breakthrough attempt.");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn remove(ctx: &AppContext, key: &str) -> Result<()> {
    let path = ctx.resolve_path(key).await?;
    ctx.cultivations.delete(&path.id).await?;
    println!("Removed the Dao of {}.", path.dao_name);
    Ok(())
}

pub async fn seed(ctx: &AppContext, today: NaiveDate) -> Result<()> {
    // AppContext::open already ran the seed; report what's there.
    let seeded = seed_default_paths(&ctx.cultivations, today).await?;
    if seeded > 0 {
        println!("Seeded {seeded} default paths into {}.", ctx.data_dir.display());
    } else {
        println!(
            "Store at {} already has {} paths.",
            ctx.data_dir.display(),
            ctx.cultivations.count().await
        );
    }
    Ok(())
}
