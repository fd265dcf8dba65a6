//! On-disk journal: `<file>.steps` holds one line per mutation,
//! `<file>.snapshots` holds appended zstd-compressed JSON trees.

use super::error::{DbError, Result};
use super::tree::DbTree;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

const ESCAPES: [(char, &str); 5] = [
    ('\\', "\\s"),
    ('\n', "\\n"),
    ('[', "\\l"),
    (']', "\\r"),
    ('|', "\\b"),
];

const ZSTD_LEVEL: i32 = 3;

pub fn escape_field(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match ESCAPES.iter().find(|(raw, _)| *raw == c) {
            Some((_, escaped)) => out.push_str(escaped),
            None => out.push(c),
        }
    }
    out
}

pub fn unescape_field(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(code) => match ESCAPES.iter().find(|(_, e)| e.ends_with(code)) {
                Some((raw, _)) => out.push(*raw),
                None => {
                    out.push('\\');
                    out.push(code);
                }
            },
            None => out.push('\\'),
        }
    }
    out
}

pub fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// One parsed journal line: `name [v1|v2|...] timestamp`
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub name: String,
    pub values: Vec<String>,
    /// Unix seconds
    pub timestamp: Option<f64>,
}

impl Step {
    pub fn new(name: &str, values: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            values,
            timestamp: Some(now_secs()),
        }
    }

    pub fn to_line(&self) -> String {
        let values: Vec<String> = self.values.iter().map(|v| escape_field(v)).collect();
        let timestamp = self.timestamp.map(|t| t.to_string()).unwrap_or_default();
        format!("{} [{}] {}\n", escape_field(&self.name), values.join("|"), timestamp)
    }

    pub fn parse(line: &str) -> Result<Self> {
        let (Some(open), Some(close)) = (line.find('['), line.find(']')) else {
            return Err(DbError::CorruptStep(line.to_string()));
        };
        if close < open {
            return Err(DbError::CorruptStep(line.to_string()));
        }
        Ok(Step {
            name: unescape_field(line[..open].trim()),
            values: line[open + 1..close].split('|').map(unescape_field).collect(),
            timestamp: line[close + 1..].trim().parse().ok(),
        })
    }

    /// `(pos, size, name)` of a snapshot step
    pub fn snapshot_ref(&self) -> Option<(u64, u64, &str)> {
        if self.name != "snapshot" {
            return None;
        }
        let pos = self.values.first()?.parse().ok()?;
        let size = self.values.get(1)?.parse().ok()?;
        let name = self.values.get(2).map(String::as_str).unwrap_or("unnamed");
        Some((pos, size, name))
    }
}

/// Paths of the two journal files
#[derive(Debug, Clone)]
pub struct Journal {
    steps: PathBuf,
    snapshots: PathBuf,
}

impl Journal {
    /// Open the journal next to `base`, creating empty files if needed
    pub fn open(base: &Path) -> Result<Self> {
        let with_suffix = |suffix: &str| {
            let mut name = base.as_os_str().to_owned();
            name.push(suffix);
            PathBuf::from(name)
        };
        let journal = Journal {
            steps: with_suffix(".steps"),
            snapshots: with_suffix(".snapshots"),
        };
        for path in [&journal.steps, &journal.snapshots] {
            if !path.exists() {
                File::create(path)?;
            }
        }
        debug!("Opened journal {}", journal.steps.display());
        Ok(journal)
    }

    pub fn steps_path(&self) -> &Path {
        &self.steps
    }

    pub fn append(&self, step: &Step) -> Result<()> {
        let mut file = OpenOptions::new().append(true).open(&self.steps)?;
        file.write_all(step.to_line().as_bytes())?;
        Ok(())
    }

    /// All readable steps in journal order; corrupt lines are skipped
    pub fn read_steps(&self) -> Result<Vec<Step>> {
        let content = fs::read_to_string(&self.steps)?;
        Ok(content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match Step::parse(line) {
                Ok(step) => Some(step),
                Err(e) => {
                    warn!("Skipping journal line: {}", e);
                    None
                }
            })
            .collect())
    }

    /// Append a compressed tree, returning its `(pos, size)`
    pub fn write_snapshot(&self, tree: &DbTree) -> Result<(u64, u64)> {
        let json = serde_json::to_vec(tree)?;
        let compressed = zstd::encode_all(json.as_slice(), ZSTD_LEVEL)?;
        let mut file = OpenOptions::new().append(true).open(&self.snapshots)?;
        let pos = file.seek(SeekFrom::End(0))?;
        file.write_all(&compressed)?;
        Ok((pos, compressed.len() as u64))
    }

    pub fn read_snapshot(&self, pos: u64, size: u64) -> Result<DbTree> {
        let mut file = File::open(&self.snapshots)?;
        let len = file.metadata()?.len();
        if pos.checked_add(size).map_or(true, |end| end > len) {
            return Err(DbError::SnapshotOutOfBounds { pos, size, len });
        }
        file.seek(SeekFrom::Start(pos))?;
        let mut compressed = vec![0u8; size as usize];
        file.read_exact(&mut compressed)?;
        let json = zstd::decode_all(compressed.as_slice())?;
        Ok(serde_json::from_slice(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_escapes() {
        let raw = "a\\b\n[c]|d";
        let escaped = escape_field(raw);
        assert_eq!(escaped, "a\\sb\\n\\lc\\r\\bd");
        assert_eq!(unescape_field(&escaped), raw);
    }

    #[test]
    fn test_step_line() {
        let step = Step {
            name: "set".to_string(),
            values: vec!["user".to_string(), "a|b".to_string()],
            timestamp: Some(1700000000.0),
        };
        let line = step.to_line();
        assert_eq!(line, "set [user|a\\bb] 1700000000\n");
        assert_eq!(Step::parse(line.trim_end()).unwrap(), step);
    }

    #[test]
    fn test_fractional_timestamp() {
        let step = Step::parse("set [a|b] 1700000000.25").unwrap();
        assert_eq!(step.timestamp, Some(1700000000.25));
        assert_eq!(step.to_line(), "set [a|b] 1700000000.25\n");

        let fresh = Step::new("set", vec!["a".to_string()]);
        assert!(fresh.timestamp.is_some_and(|t| t > 1_600_000_000.0));
    }

    #[test]
    fn test_snapshot_outside_file() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::open(&dir.path().join("db")).unwrap();
        let (pos, size) = journal.write_snapshot(&DbTree::new()).unwrap();
        assert!(journal.read_snapshot(pos, size).is_ok());
        assert!(matches!(
            journal.read_snapshot(pos, u64::MAX),
            Err(DbError::SnapshotOutOfBounds { .. })
        ));
        assert!(matches!(
            journal.read_snapshot(pos + size, 1 << 40),
            Err(DbError::SnapshotOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_corrupt_line() {
        assert!(matches!(
            Step::parse("garbage"),
            Err(DbError::CorruptStep(_))
        ));
    }

    #[test]
    fn test_snapshot_ref() {
        let step = Step::parse("snapshot [10|20|daily] 5").unwrap();
        assert_eq!(step.snapshot_ref(), Some((10, 20, "daily")));
        let step = Step::parse("set [a|b] 5").unwrap();
        assert_eq!(step.snapshot_ref(), None);
    }
}
