/// Lifetime player records on disk: wins, losses, scores.
///
/// Stored as TOML (`records.toml`), one table per player id. Written after
/// every update so a crash mid-session loses nothing already reported.
/// A record file that can't be read or written is logged and ignored; the
/// game keeps running.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use blastgrid::domain::entity::PlayerId;
use blastgrid::sim::session::StatsStore;

const RECORDS_FILE: &str = "records.toml";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifetimeRecord {
    #[serde(default)]
    pub matches: u32,
    #[serde(default)]
    pub wins: u32,
    #[serde(default)]
    pub total_score: u64,
    #[serde(default)]
    pub best_score: u32,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RecordFile {
    // toml tables need string keys
    #[serde(default)]
    players: BTreeMap<String, LifetimeRecord>,
}

pub struct FileStatsStore {
    path: PathBuf,
    file: RecordFile,
}

// ══════════════════════════════════════════════════════════════
// Paths
// ══════════════════════════════════════════════════════════════

fn records_dir() -> PathBuf {
    // 1. exe directory, when writable (portable installs)
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            let probe = parent.join(".write_test_blastgrid");
            if std::fs::write(&probe, "").is_ok() {
                let _ = std::fs::remove_file(&probe);
                return parent.to_path_buf();
            }
        }
    }

    // 2. XDG data home for system installs
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/blastgrid");
        if std::fs::create_dir_all(&xdg).is_ok() {
            return xdg;
        }
    }

    // 3. CWD
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

// ══════════════════════════════════════════════════════════════
// Store
// ══════════════════════════════════════════════════════════════

impl FileStatsStore {
    pub fn open_default() -> Self {
        FileStatsStore::open(records_dir().join(RECORDS_FILE))
    }

    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file = read_records(&path).unwrap_or_default();
        FileStatsStore { path, file }
    }

    pub fn record(&self, player: PlayerId) -> LifetimeRecord {
        self.file.players.get(&player.to_string()).copied().unwrap_or_default()
    }

    fn entry(&mut self, player: PlayerId) -> &mut LifetimeRecord {
        self.file.players.entry(player.to_string()).or_default()
    }

    fn flush(&self) {
        let text = match toml::to_string(&self.file) {
            Ok(t) => t,
            Err(e) => {
                log::warn!("records not serialized: {e}");
                return;
            }
        };
        if let Err(e) = std::fs::write(&self.path, text) {
            log::warn!("records not saved to {}: {e}", self.path.display());
        }
    }
}

fn read_records(path: &Path) -> Option<RecordFile> {
    let text = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&text) {
        Ok(file) => Some(file),
        Err(e) => {
            log::warn!("{} unreadable, starting fresh: {e}", path.display());
            None
        }
    }
}

impl StatsStore for FileStatsStore {
    fn update_stats(&mut self, player: PlayerId, won: bool) {
        let r = self.entry(player);
        r.matches += 1;
        if won {
            r.wins += 1;
        }
        self.flush();
    }

    fn add_score(&mut self, player: PlayerId, score: u32) {
        let r = self.entry(player);
        r.total_score += score as u64;
        r.best_score = r.best_score.max(score);
        self.flush();
    }
}
