//! Persistence and interchange formats for session history.

mod export;
mod store;

pub use export::{
    export_ndjson, import_ndjson, read_ndjson, to_gpx, write_ndjson, write_positions_csv, write_sessions_csv,
    Backup, RestoreReport, BACKUP_VERSION,
};
pub use store::{
    DataDir, HistoryStore, JsonDocument, JsonFileStore, MemoryStore, SessionHistory, ACHIEVEMENTS_FILE,
    HISTORY_FILE, PROFILE_FILE, PROGRESS_FILE,
};
