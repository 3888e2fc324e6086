use anyhow::{bail, Context, Result};
use model::{DailyProgress, SessionSummary, UserProfile};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Read, Write},
    path::Path,
};
use time::{format_description::well_known::Rfc3339, Duration, OffsetDateTime};

use crate::store::{DataDir, SessionHistory};

pub const BACKUP_VERSION: &str = "1.0";

fn rfc3339(t: OffsetDateTime) -> Result<String> {
    t.format(&Rfc3339).context("format timestamp")
}

pub fn write_sessions_csv<W: Write>(sessions: &[SessionSummary], out: W) -> Result<()> {
    let mut w = csv::Writer::from_writer(out);
    w.write_record([
        "id", "kind", "date", "duration_min", "distance_km", "calories", "avg_pace", "steps", "steps_per_minute",
    ])?;
    for s in sessions {
        w.write_record([
            s.id.simple().to_string(),
            s.kind.to_string(),
            rfc3339(s.date)?,
            format!("{:.2}", s.duration_s as f64 / 60.0),
            format!("{:.2}", s.distance_m / 1000.0),
            s.calories.to_string(),
            s.avg_pace.clone(),
            s.steps.to_string(),
            format!("{:.1}", s.steps_per_minute),
        ])?;
    }
    w.flush()?;
    Ok(())
}

/// One row per recorded position. Timing is estimated at one second per
/// point since summaries don't keep per-fix timestamps.
pub fn write_positions_csv<W: Write>(session: &SessionSummary, out: W) -> Result<()> {
    let mut w = csv::Writer::from_writer(out);
    w.write_record(["index", "latitude", "longitude", "estimated_time_ms"])?;
    for (i, [lat, lng]) in session.positions.iter().enumerate() {
        w.write_record([(i + 1).to_string(), lat.to_string(), lng.to_string(), (i as u64 * 1000).to_string()])?;
    }
    w.flush()?;
    Ok(())
}

pub fn to_gpx(session: &SessionSummary) -> Result<String> {
    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str("<gpx version=\"1.1\" creator=\"Stride\" xmlns=\"http://www.topografix.com/GPX/1/1\">\n");
    xml.push_str("  <metadata>\n");
    xml.push_str(&format!("    <name>{} - {}</name>\n", session.kind, session.date.date()));
    xml.push_str(&format!("    <time>{}</time>\n", rfc3339(session.date)?));
    xml.push_str("  </metadata>\n");
    xml.push_str("  <trk>\n");
    xml.push_str(&format!("    <name>{} Session</name>\n", session.kind));
    xml.push_str(&format!("    <type>{}</type>\n", session.kind));
    xml.push_str("    <trkseg>\n");
    for (i, [lat, lng]) in session.positions.iter().enumerate() {
        let t = session.date + Duration::seconds(i as i64);
        xml.push_str(&format!("      <trkpt lat=\"{}\" lon=\"{}\">\n", lat, lng));
        xml.push_str(&format!("        <time>{}</time>\n", rfc3339(t)?));
        xml.push_str("      </trkpt>\n");
    }
    xml.push_str("    </trkseg>\n");
    xml.push_str("  </trk>\n");
    xml.push_str("</gpx>\n");
    Ok(xml)
}

pub fn write_ndjson<W: Write>(sessions: &[SessionSummary], out: W) -> Result<()> {
    let mut w = BufWriter::new(out);
    for s in sessions {
        serde_json::to_writer(&mut w, s)?;
        writeln!(w)?;
    }
    w.flush()?;
    Ok(())
}

pub fn read_ndjson<R: Read>(input: R) -> Result<Vec<SessionSummary>> {
    let mut sessions = vec![];
    for (n, line) in BufReader::new(input).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let s: SessionSummary = serde_json::from_str(&line).with_context(|| format!("line {}", n + 1))?;
        sessions.push(s);
    }
    Ok(sessions)
}

pub fn export_ndjson(sessions: &[SessionSummary], path: &Path) -> Result<()> {
    let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
    write_ndjson(sessions, f)
}

pub fn import_ndjson(path: &Path) -> Result<Vec<SessionSummary>> {
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    read_ndjson(f)
}

/// Everything the app stores, in one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Backup {
    pub version: String,
    #[serde(with = "time::serde::rfc3339")]
    pub export_date: OffsetDateTime,
    #[serde(default)]
    pub profile: Option<UserProfile>,
    #[serde(default)]
    pub progress: Option<DailyProgress>,
    #[serde(default)]
    pub sessions: Option<Vec<SessionSummary>>,
}

impl Backup {
    pub fn new(
        profile: UserProfile,
        progress: DailyProgress,
        sessions: Vec<SessionSummary>,
        export_date: OffsetDateTime,
    ) -> Self {
        Self {
            version: BACKUP_VERSION.into(),
            export_date,
            profile: Some(profile),
            progress: Some(progress),
            sessions: Some(sessions),
        }
    }

    pub fn collect(dir: &DataDir, export_date: OffsetDateTime) -> Result<Self> {
        let sessions = dir.history()?.sessions().to_vec();
        Ok(Self::new(dir.profile().load()?, dir.progress().load()?, sessions, export_date))
    }

    pub fn write<W: Write>(&self, out: W) -> Result<()> {
        serde_json::to_writer_pretty(out, self)?;
        Ok(())
    }

    pub fn read<R: Read>(input: R) -> Result<Self> {
        let b: Backup = serde_json::from_reader(input).context("parse backup")?;
        if b.version.split('.').next() != BACKUP_VERSION.split('.').next() {
            bail!("unsupported backup version {}", b.version);
        }
        Ok(b)
    }

    /// Overwrite whatever the backup carries; absent parts are left alone.
    pub fn restore(self, dir: &DataDir) -> Result<RestoreReport> {
        let mut report = RestoreReport::default();
        if let Some(p) = self.profile {
            dir.profile().save(&p)?;
            report.profile = true;
        }
        if let Some(p) = self.progress {
            dir.progress().save(&p)?;
            report.progress = true;
        }
        if let Some(s) = self.sessions {
            report.sessions = s.len();
            let mut history: SessionHistory = dir.history()?;
            history.replace_all(s)?;
        }
        log::info!("restored backup from {}: {:?}", self.export_date, report);
        Ok(report)
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct RestoreReport {
    pub profile: bool,
    pub progress: bool,
    pub sessions: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::{summary, temp_dir};
    use time::macros::datetime;

    #[test]
    fn test_sessions_csv() {
        let s = summary(datetime!(2024-04-01 07:30 UTC), 5234.0);
        let mut buf = vec![];
        write_sessions_csv(&[s.clone()], &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("id,kind,date,duration_min,distance_km,calories,avg_pace,steps,steps_per_minute")
        );
        let expected = format!("{},Run,2024-04-01T07:30:00Z,25.00,5.23,280,5:00,7142,285.7", s.id.simple());
        assert_eq!(lines.next(), Some(expected.as_str()));
    }

    #[test]
    fn test_positions_csv() {
        let s = summary(datetime!(2024-04-01 07:30 UTC), 100.0);
        let mut buf = vec![];
        write_positions_csv(&s, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let rows: Vec<_> = text.lines().collect();
        assert_eq!(rows, vec!["index,latitude,longitude,estimated_time_ms", "1,40,-3,0", "2,40.001,-3,1000"]);
    }

    #[test]
    fn test_gpx_points_and_times() {
        let s = summary(datetime!(2024-04-01 07:30 UTC), 100.0);
        let gpx = to_gpx(&s).unwrap();
        assert!(gpx.starts_with("<?xml"));
        assert_eq!(gpx.matches("<trkpt").count(), 2);
        assert!(gpx.contains("<trkpt lat=\"40.001\" lon=\"-3\">"));
        assert!(gpx.contains("<time>2024-04-01T07:30:01Z</time>"));
        assert!(gpx.contains("<name>Run - 2024-04-01</name>"));
    }

    #[test]
    fn test_ndjson_skips_blank_lines() {
        let a = summary(datetime!(2024-04-01 07:30 UTC), 100.0);
        let b = summary(datetime!(2024-04-02 07:30 UTC), 200.0);
        let mut buf = vec![];
        write_ndjson(&[a.clone(), b.clone()], &mut buf).unwrap();
        buf.extend_from_slice(b"\n\n");
        assert_eq!(read_ndjson(buf.as_slice()).unwrap(), vec![a, b]);

        let err = read_ndjson(&b"{}\n"[..]).unwrap_err();
        assert!(format!("{err:#}").contains("line 1"));
    }

    #[test]
    fn test_backup_restore() {
        let src = DataDir::new(temp_dir());
        let mut profile = UserProfile::default();
        profile.name = "Ana".into();
        src.profile().save(&profile).unwrap();
        src.history().unwrap().add(summary(datetime!(2024-04-01 07:30 UTC), 100.0)).unwrap();

        let backup = Backup::collect(&src, datetime!(2024-04-02 00:00 UTC)).unwrap();
        let mut buf = vec![];
        backup.write(&mut buf).unwrap();
        let v: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(v["version"], "1.0");
        assert_eq!(v["export_date"], "2024-04-02T00:00:00Z");

        let dst = DataDir::new(temp_dir());
        let report = Backup::read(buf.as_slice()).unwrap().restore(&dst).unwrap();
        assert_eq!(report, RestoreReport { profile: true, progress: true, sessions: 1 });
        assert_eq!(dst.profile().load().unwrap().name, "Ana");
        assert_eq!(dst.history().unwrap().len(), 1);

        std::fs::remove_dir_all(src.root()).unwrap();
        std::fs::remove_dir_all(dst.root()).unwrap();
    }

    #[test]
    fn test_backup_rejects_future_major() {
        let json = r#"{"version":"2.0","export_date":"2024-04-02T00:00:00Z"}"#;
        assert!(Backup::read(json.as_bytes()).is_err());
        let partial = r#"{"version":"1.3","export_date":"2024-04-02T00:00:00Z"}"#;
        let b = Backup::read(partial.as_bytes()).unwrap();
        assert!(b.profile.is_none() && b.sessions.is_none());
    }
}
