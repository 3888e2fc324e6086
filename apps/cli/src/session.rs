use std::{
    fs,
    io::{self, BufRead},
    path::Path,
    sync::Arc,
    thread,
    time::Duration,
};

use analysis::{goals, AchievementBook};
use anyhow::{ensure, Context, Result};
use iox::{DataDir, JsonDocument, SessionHistory, ACHIEVEMENTS_FILE};
use model::*;
use stride_ingest_core::{now_ms, LocationSample, LocationSource};
use time::OffsetDateTime;
use tokio::{
    sync::mpsc::{unbounded_channel, UnboundedReceiver},
    time::{interval, Instant, MissedTickBehavior},
};
use tracker::{finalize, Announcement, Announcer, AnnouncerConfig, LiveConfig, LiveSession, TrackerConfig};

/// Wall clock in the local offset when it can be determined.
pub fn local_now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

pub fn say(a: &Announcement) {
    println!(">> {a}");
}

pub struct TrackOptions {
    pub kind: SessionKind,
    pub max_duration: Option<Duration>,
    pub announcer: AnnouncerConfig,
    /// Read pause/resume/stop commands from stdin.
    pub controls: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Pause,
    Resume,
    Stop,
}

pub fn parse_control(line: &str) -> Option<Control> {
    match line.trim().to_ascii_lowercase().as_str() {
        "p" | "pause" => Some(Control::Pause),
        "r" | "resume" => Some(Control::Resume),
        "s" | "stop" | "q" => Some(Control::Stop),
        _ => None,
    }
}

/// Stdin is read on its own thread; the receiver closes at EOF.
fn spawn_controls() -> UnboundedReceiver<Control> {
    let (tx, rx) = unbounded_channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            match parse_control(&line) {
                Some(c) => {
                    if tx.send(c).is_err() {
                        break;
                    }
                }
                None => println!("p = pause, r = resume, s = stop"),
            }
        }
    });
    rx
}

pub struct AppSession {
    pub dir: DataDir,
    pub profile: UserProfile,
}

impl AppSession {
    pub fn open(dir: DataDir) -> Result<Self> {
        let profile = dir.profile().load()?;
        log::debug!("data dir {}", dir.root().display());
        Ok(Self { dir, profile })
    }

    pub fn history(&self) -> Result<SessionHistory> {
        self.dir.history()
    }

    pub fn achievements(&self) -> JsonDocument<AchievementBook> {
        self.dir.document(ACHIEVEMENTS_FILE)
    }

    /// Daily goals, with the targets the profile overrides.
    pub fn goals(&self, sessions: &[SessionSummary], now: OffsetDateTime) -> Vec<Goal> {
        let mut list = goals::default_goals(now);
        for g in &mut list {
            match g.kind {
                GoalKind::Steps => g.target = self.profile.goals.daily_steps as f64,
                GoalKind::Distance => g.target = self.profile.goals.daily_distance_m,
                _ => {}
            }
        }
        goals::refresh_all(&mut list, sessions, now);
        list
    }

    /// Run a live session until the source ends, the time limit passes or
    /// ctrl-c. Returns `None` when nothing worth saving was recorded.
    pub async fn track(&self, source: Arc<dyn LocationSource>, opts: TrackOptions) -> Result<Option<SessionSummary>> {
        let mut live = LiveSession::new(LiveConfig {
            tracker: TrackerConfig::from_profile(&self.profile),
            ..Default::default()
        });
        live.start(source).context("start tracking")?;
        let announce = opts.announcer.enabled;
        if announce {
            say(&Announcement::Start);
        }

        let mut controls = if opts.controls {
            println!("p = pause, r = resume, s = stop");
            spawn_controls()
        } else {
            unbounded_channel().1
        };
        let mut announcer = Announcer::new(opts.announcer);
        let deadline = opts.max_duration.map(|d| Instant::now() + d);
        let mut poll = interval(Duration::from_secs(1));
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        let mut last_error = None;
        let mut source_done = false;
        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    log::info!("interrupted");
                    break;
                }
                Some(c) = controls.recv() => {
                    let (res, a) = match c {
                        Control::Pause => (live.pause(), Announcement::Pause),
                        Control::Resume => (live.resume(), Announcement::Resume),
                        Control::Stop => break,
                    };
                    match res {
                        Ok(()) if announce => say(&a),
                        Ok(()) => {}
                        Err(e) => log::warn!("{c:?}: {e}"),
                    }
                }
                _ = poll.tick() => {
                    let rec = live.snapshot();
                    if let Some(a) = announcer.check(&rec) {
                        say(&a);
                    }
                    let err = live.last_error();
                    if err.is_some() && err != last_error {
                        log::warn!("location: {}", err.as_ref().map(|e| e.to_string()).unwrap_or_default());
                    }
                    last_error = err;
                    if deadline.is_some_and(|d| Instant::now() >= d) {
                        log::info!("time limit reached");
                        break;
                    }
                    // give the pump one more tick to drain after the source ends
                    if !live.is_source_running() {
                        if source_done {
                            log::info!("location source finished");
                            break;
                        }
                        source_done = true;
                    }
                }
            }
        }

        let Some(record) = live.stop() else { return Ok(None) };
        if announce {
            say(&Announcement::stop(&record));
        }
        if record.positions.is_empty() {
            log::warn!("no positions recorded, session not saved");
            return Ok(None);
        }
        Ok(Some(finalize(&record, opts.kind)))
    }

    /// Persist a finished session and report what it unlocked.
    pub fn record_session(&self, summary: SessionSummary) -> Result<Vec<Announcement>> {
        let now = local_now();
        let mut history = self.history()?;
        let before: Vec<String> = self
            .goals(history.sessions(), now)
            .into_iter()
            .filter(goals::is_complete)
            .map(|g| g.id)
            .collect();

        history.add(summary)?;

        let mut out = vec![];
        for g in self.goals(history.sessions(), now) {
            if goals::is_complete(&g) && !before.contains(&g.id) {
                out.push(Announcement::GoalReached(describe_goal(&g)));
            }
        }

        let doc = self.achievements();
        let mut book = doc.load()?;
        for a in book.evaluate(history.sessions(), now) {
            out.push(Announcement::AchievementUnlocked(a.title));
        }
        doc.save(&book)?;
        Ok(out)
    }
}

pub fn describe_goal(g: &Goal) -> String {
    match g.kind {
        GoalKind::Steps => format!("{:.0} steps", g.target),
        GoalKind::Distance => format!("{:.1} kilometers", g.target / 1000.0),
        GoalKind::Calories => format!("{:.0} calories", g.target),
        GoalKind::Time => format!("{:.0} minutes", g.target),
    }
}

/// A recorded track: JSON `LocationSample` lines, or bare `lat,lng` lines
/// which get timestamps `spacing` apart.
pub fn load_replay(path: &Path, spacing: Duration) -> Result<Vec<LocationSample>> {
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let t0 = now_ms();
    let step = spacing.as_millis() as i64;
    let mut out: Vec<LocationSample> = vec![];
    for (n, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let sample = if line.starts_with('{') {
            serde_json::from_str::<LocationSample>(line).with_context(|| format!("line {}", n + 1))?
        } else {
            let (lat, lng) = line.split_once(',').with_context(|| format!("line {}: expected lat,lng", n + 1))?;
            let lat: f64 = lat.trim().parse().with_context(|| format!("line {}: latitude", n + 1))?;
            let lng: f64 = lng.trim().parse().with_context(|| format!("line {}: longitude", n + 1))?;
            LocationSample::new(lat, lng, t0 + out.len() as i64 * step)
        };
        ensure!(
            sample.latitude.abs() <= 90.0 && sample.longitude.abs() <= 180.0,
            "line {}: coordinates out of range",
            n + 1
        );
        out.push(sample);
    }
    Ok(out)
}
