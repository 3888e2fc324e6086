use std::{
    fs::File,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use analysis::{goal_percent, progress, stats, step_trend};
use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Subcommand};
use iox::Backup;
use model::*;
use serde::de::DeserializeOwned;
use stride_ingest_core::{LocationOptions, LocationSource, ReplaySource};
use stride_ingest_nmea::{NmeaConfig, NmeaUdpSource};
use stride_routing::{OsrmClient, OsrmConfig, RoutingService};
use tracker::AnnouncerConfig;
use uuid::Uuid;

use crate::session::{describe_goal, load_replay, local_now, say, AppSession, TrackOptions};

/// clap parser for the lowercase serde names of model enums.
pub fn parse_lower<T: DeserializeOwned>(s: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(s.to_lowercase())).map_err(|e| e.to_string())
}

#[derive(Args, Debug)]
pub struct TrackArgs {
    /// UDP address to receive NMEA sentences on
    #[arg(long, default_value = "0.0.0.0:10110")]
    pub bind: String,
    /// Replay a recorded track instead of listening for NMEA
    #[arg(long)]
    pub replay: Option<PathBuf>,
    /// Milliseconds between replayed fixes
    #[arg(long, default_value_t = 1000)]
    pub replay_spacing_ms: u64,
    /// Stop after this many seconds
    #[arg(long)]
    pub max_seconds: Option<u64>,
    #[arg(long, default_value = "run", value_parser = parse_lower::<SessionKind>)]
    pub kind: SessionKind,
    /// Seconds a cached fix may be reused (0-60)
    #[arg(long, default_value_t = 0)]
    pub max_age: u64,
    /// Seconds to wait for a fix before reporting a timeout (5-20)
    #[arg(long, default_value_t = 5)]
    pub timeout: u64,
    #[arg(long)]
    pub low_accuracy: bool,
    #[arg(long)]
    pub quiet: bool,
    /// Don't read p/r/s commands from stdin
    #[arg(long)]
    pub no_controls: bool,
    /// Meters between distance announcements
    #[arg(long, default_value_t = 1000.0)]
    pub announce_every_m: f64,
    /// Minutes between stats announcements
    #[arg(long, default_value_t = 5)]
    pub announce_every_min: u64,
}

pub async fn track(app: &AppSession, args: TrackArgs) -> Result<()> {
    let source: Arc<dyn LocationSource> = match &args.replay {
        Some(path) => {
            let spacing = Duration::from_millis(args.replay_spacing_ms);
            let samples = load_replay(path, spacing)?;
            log::info!("replaying {} fixes from {}", samples.len(), path.display());
            Arc::new(ReplaySource::from_samples(samples, spacing))
        }
        None => {
            let options = LocationOptions {
                high_accuracy: !args.low_accuracy,
                maximum_age: Duration::from_secs(args.max_age),
                timeout: Duration::from_secs(args.timeout),
            };
            log::info!("listening for NMEA on {}", args.bind);
            Arc::new(NmeaUdpSource::new(NmeaConfig { bind_addr: args.bind.clone(), options }))
        }
    };

    let opts = TrackOptions {
        kind: args.kind,
        max_duration: args.max_seconds.map(Duration::from_secs),
        announcer: AnnouncerConfig {
            enabled: !args.quiet,
            distance_interval_m: args.announce_every_m,
            interval_minutes: args.announce_every_min,
        },
        controls: !args.no_controls,
    };
    let Some(summary) = app.track(source, opts).await? else {
        println!("Nothing recorded.");
        return Ok(());
    };
    print_summary(app, &summary);
    for a in app.record_session(summary)? {
        say(&a);
    }
    Ok(())
}

fn print_summary(app: &AppSession, s: &SessionSummary) {
    let p = &app.profile;
    println!("{} on {}", s.kind, s.date.date());
    println!("  distance  {}", p.format_distance(s.distance_m));
    println!("  time      {}:{:02}", s.duration_s / 60, s.duration_s % 60);
    println!("  pace      {} /km", s.avg_pace);
    println!("  calories  {}", s.calories);
    println!("  steps     {} ({:.0}/min)", s.steps, s.steps_per_minute);
}

pub fn history(app: &AppSession, limit: usize) -> Result<()> {
    let h = app.history()?;
    if h.is_empty() {
        println!("No sessions yet.");
        return Ok(());
    }
    for s in h.sessions().iter().take(limit) {
        println!(
            "{}  {}  {:<4} {:>10}  {:>6}  {:>5} kcal",
            s.id.simple(),
            s.date.date(),
            s.kind,
            app.profile.format_distance(s.distance_m),
            s.avg_pace,
            s.calories
        );
    }
    if h.len() > limit {
        println!("... {} more", h.len() - limit);
    }
    Ok(())
}

pub fn stats(app: &AppSession, year: Option<i32>) -> Result<()> {
    let h = app.history()?;
    let now = local_now();
    let p = &app.profile;
    let all = stats::totals(h.sessions());
    let today = stats::totals(stats::today(h.sessions(), now));
    let week = stats::this_week(h.sessions(), now);

    println!(
        "All time: {} sessions, {}, {} h, {} kcal, {} steps",
        all.sessions,
        p.format_distance(all.distance_m),
        all.duration_s / 3600,
        all.calories,
        all.steps
    );
    println!("Today:    {} sessions, {}", today.sessions, p.format_distance(today.distance_m));
    println!("Week:     {} sessions, {}, avg pace {}", week.totals.sessions, p.format_distance(week.totals.distance_m), week.avg_pace);

    let year = year.unwrap_or(now.year());
    println!("\n{year}");
    for m in stats::yearly(h.sessions(), year, now.offset()) {
        if m.totals.sessions == 0 {
            continue;
        }
        println!(
            "  {:02}  {:>3} sessions  {:>10}  {:>5} kcal",
            m.month,
            m.totals.sessions,
            p.format_distance(m.totals.distance_m),
            m.totals.calories
        );
    }
    Ok(())
}

pub fn achievements(app: &AppSession, category: Option<AchievementCategory>) -> Result<()> {
    let h = app.history()?;
    let doc = app.achievements();
    let mut book = doc.load()?;
    let fresh = book.evaluate(h.sessions(), local_now());
    if !fresh.is_empty() {
        doc.save(&book)?;
    }

    let list: Vec<&Achievement> = match category {
        Some(c) => book.by_category(c),
        None => book.entries().iter().collect(),
    };
    for a in list {
        let mark = if a.unlocked { "x" } else { " " };
        println!("[{mark}] {:<20} {:>3.0}%  {}", a.title, a.progress, a.description);
    }
    println!("{}/{} unlocked ({}%)", book.unlocked_count(), book.total(), book.percent_unlocked());
    Ok(())
}

pub fn goals(app: &AppSession) -> Result<()> {
    let h = app.history()?;
    let now = local_now();
    for g in app.goals(h.sessions(), now) {
        println!("{:<9} {:>8.0} / {:<20} {:>3.0}%", g.id, g.current, describe_goal(&g), goal_percent(g.current, g.target));
    }
    let t = step_trend(h.sessions(), now);
    let arrow = if t.diff >= 0 { "up" } else { "down" };
    println!("steps today {} vs yesterday {}: {} {} ({}%)", t.today, t.yesterday, arrow, t.diff.abs(), t.percent);
    Ok(())
}

#[derive(Subcommand, Debug)]
pub enum ProfileCmd {
    Show,
    Set(ProfileSet),
}

#[derive(Args, Debug)]
pub struct ProfileSet {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub weight_kg: Option<f64>,
    #[arg(long)]
    pub height_cm: Option<f64>,
    #[arg(long)]
    pub age: Option<u32>,
    #[arg(long, value_parser = parse_lower::<Gender>)]
    pub gender: Option<Gender>,
    #[arg(long, value_parser = parse_lower::<ExperienceLevel>)]
    pub level: Option<ExperienceLevel>,
    #[arg(long, value_parser = parse_lower::<UnitSystem>)]
    pub units: Option<UnitSystem>,
    #[arg(long)]
    pub daily_steps: Option<u32>,
    #[arg(long)]
    pub daily_distance_m: Option<f64>,
    #[arg(long)]
    pub weekly_runs: Option<u32>,
}

pub fn profile(app: &mut AppSession, cmd: ProfileCmd) -> Result<()> {
    if let ProfileCmd::Set(s) = cmd {
        let p = &mut app.profile;
        if let Some(v) = s.name { p.name = v; }
        if let Some(v) = s.weight_kg {
            if v <= 0.0 {
                bail!("weight must be positive");
            }
            p.weight_kg = v;
        }
        if let Some(v) = s.height_cm { p.height_cm = v; }
        if let Some(v) = s.age { p.age = v; }
        if let Some(v) = s.gender { p.gender = v; }
        if let Some(v) = s.level { p.experience_level = v; }
        if let Some(v) = s.units { p.unit_system = v; }
        if let Some(v) = s.daily_steps { p.goals.daily_steps = v; }
        if let Some(v) = s.daily_distance_m { p.goals.daily_distance_m = v; }
        if let Some(v) = s.weekly_runs { p.goals.weekly_runs = v; }
        app.dir.profile().save(&app.profile)?;
        log::info!("profile saved");
    }
    println!("{}", serde_json::to_string_pretty(&app.profile)?);
    println!("bmr {:.0} kcal/day, ~{:.0} kcal/km", app.profile.bmr(), app.profile.calories_per_km());
    Ok(())
}

#[derive(Subcommand, Debug)]
pub enum ProgressCmd {
    Show,
    AddRoute { distance_km: f64, duration_min: f64 },
    SetGoal { meters: f64 },
    Reset,
}

pub fn progress(app: &AppSession, cmd: ProgressCmd) -> Result<()> {
    let doc = app.dir.progress();
    let mut p = doc.load()?;
    match cmd {
        ProgressCmd::Show => {}
        ProgressCmd::AddRoute { distance_km, duration_min } => {
            let kcal = progress::add_route(&mut p, distance_km, duration_min);
            log::info!("added {distance_km} km route, {kcal} kcal");
        }
        ProgressCmd::SetGoal { meters } => {
            if meters <= 0.0 {
                bail!("goal must be positive");
            }
            progress::set_goal(&mut p, meters)
        }
        ProgressCmd::Reset => progress::reset(&mut p),
    }
    doc.save(&p)?;
    print_progress(app, &p);
    Ok(())
}

fn print_progress(app: &AppSession, p: &DailyProgress) {
    let f = |m| app.profile.format_distance(m);
    println!(
        "{} of {} ({:.0}%), {} to go, {:.0} min, {} kcal",
        f(p.total_distance_m),
        f(p.goal_m),
        progress::percent(p),
        f(progress::remaining_m(p)),
        p.total_time_min,
        p.total_calories
    );
}

#[derive(Args, Debug)]
pub struct RouteArgs {
    #[arg(allow_hyphen_values = true)]
    pub from_lat: f64,
    #[arg(allow_hyphen_values = true)]
    pub from_lng: f64,
    #[arg(allow_hyphen_values = true)]
    pub to_lat: f64,
    #[arg(allow_hyphen_values = true)]
    pub to_lng: f64,
    #[arg(long, default_value = "https://router.project-osrm.org")]
    pub server: String,
    #[arg(long, default_value = "foot")]
    pub profile: String,
    /// Add the planned route to today's progress
    #[arg(long)]
    pub add: bool,
}

pub async fn route(app: &AppSession, args: RouteArgs) -> Result<()> {
    let client = OsrmClient::new(OsrmConfig { base_url: args.server, profile: args.profile, ..Default::default() })?;
    let r = client.route((args.from_lat, args.from_lng), (args.to_lat, args.to_lng)).await?;
    println!("Route: {} km in {} minutes ({} points)", r.distance_km, r.duration_min, r.geometry.len());
    if args.add {
        let doc = app.dir.progress();
        let mut p = doc.load()?;
        progress::add_planned(&mut p, &r);
        doc.save(&p)?;
        print_progress(app, &p);
    }
    Ok(())
}

#[derive(Subcommand, Debug)]
pub enum ExportCmd {
    /// Session table as CSV
    Sessions { out: Option<PathBuf> },
    /// Positions of one session as CSV (latest when no id is given)
    Positions { #[arg(long)] id: Option<String>, out: Option<PathBuf> },
    Gpx { #[arg(long)] id: Option<String>, out: Option<PathBuf> },
    Ndjson { out: PathBuf },
    /// Profile, progress and history as one JSON document
    Backup { out: Option<PathBuf> },
}

#[derive(Subcommand, Debug)]
pub enum ImportCmd {
    /// Replace profile, progress and history from a backup
    Backup { path: PathBuf },
    /// Merge sessions from an NDJSON dump
    Ndjson { path: PathBuf },
}

fn output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(p) => Box::new(File::create(p).with_context(|| format!("create {}", p.display()))?),
        None => Box::new(io::stdout().lock()),
    })
}

fn pick<'a>(sessions: &'a [SessionSummary], id: Option<&str>) -> Result<&'a SessionSummary> {
    match id {
        None => sessions.first().ok_or_else(|| anyhow!("no sessions recorded")),
        Some(raw) => {
            let id = Uuid::parse_str(raw).with_context(|| format!("bad session id {raw}"))?;
            sessions.iter().find(|s| s.id == id).ok_or_else(|| anyhow!("no session {raw}"))
        }
    }
}

pub fn export(app: &AppSession, cmd: ExportCmd) -> Result<()> {
    let h = app.history()?;
    match cmd {
        ExportCmd::Sessions { out } => iox::write_sessions_csv(h.sessions(), output(out.as_deref())?)?,
        ExportCmd::Positions { id, out } => {
            let s = pick(h.sessions(), id.as_deref())?;
            iox::write_positions_csv(s, output(out.as_deref())?)?
        }
        ExportCmd::Gpx { id, out } => {
            let s = pick(h.sessions(), id.as_deref())?;
            output(out.as_deref())?.write_all(iox::to_gpx(s)?.as_bytes())?
        }
        ExportCmd::Ndjson { out } => iox::export_ndjson(h.sessions(), &out)?,
        ExportCmd::Backup { out } => Backup::collect(&app.dir, local_now())?.write(output(out.as_deref())?)?,
    }
    Ok(())
}

pub fn import(app: &AppSession, cmd: ImportCmd) -> Result<()> {
    match cmd {
        ImportCmd::Backup { path } => {
            let f = File::open(&path).with_context(|| format!("open {}", path.display()))?;
            let report = Backup::read(f)?.restore(&app.dir)?;
            println!(
                "restored {} sessions{}{}",
                report.sessions,
                if report.profile { ", profile" } else { "" },
                if report.progress { ", progress" } else { "" }
            );
        }
        ImportCmd::Ndjson { path } => {
            let sessions = iox::import_ndjson(&path)?;
            let total = sessions.len();
            let added = app.history()?.merge(sessions)?;
            println!("imported {added} of {total} sessions");
        }
    }
    Ok(())
}
