//! Hierarchical key-value database, optionally journaled to disk.

mod command;
mod error;
pub mod journal;
mod tree;

pub use command::register;
pub use error::{DbError, Result};
pub use journal::{Journal, Step};
pub use tree::{DbTree, Node};

use journal::now_secs;
use std::path::Path;
use tracing::{debug, info};

/// The database exposed to programs through the `db` command
#[derive(Debug, Default)]
pub struct Database {
    tree: DbTree,
    journal: Option<Journal>,
}

impl Database {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open (or create) a journaled database and restore its state
    pub fn open(path: &Path) -> Result<Self> {
        let mut db = Database {
            tree: DbTree::new(),
            journal: Some(Journal::open(path)?),
        };
        db.load()?;
        info!("Database loaded from {}", path.display());
        Ok(db)
    }

    pub fn is_journaled(&self) -> bool {
        self.journal.is_some()
    }

    pub fn tree(&self) -> &DbTree {
        &self.tree
    }

    /// Replace the in-memory tree without journaling
    pub fn replace_tree(&mut self, tree: DbTree) {
        self.tree = tree;
    }

    /// Replace the tree with restored state; a journaled database records
    /// it as a `restore` snapshot
    pub fn restore(&mut self, tree: DbTree) -> Result<()> {
        self.tree = tree;
        if self.journal.is_some() {
            self.create_snapshot("restore")?;
        }
        Ok(())
    }

    fn journal(&self) -> Result<&Journal> {
        self.journal.as_ref().ok_or(DbError::NotJournaled)
    }

    fn log(&self, name: &str, values: Vec<String>) -> Result<()> {
        if let Some(journal) = &self.journal {
            journal.append(&Step::new(name, values))?;
        }
        Ok(())
    }

    pub fn get(&self, keys: &[String]) -> String {
        self.tree.get(keys)
    }

    pub fn has(&self, keys: &[String]) -> bool {
        self.tree.has(keys)
    }

    pub fn list(&self, keys: &[String]) -> Vec<String> {
        self.tree.list(keys)
    }

    pub fn show(&self, keys: &[String]) -> String {
        self.tree.show(keys)
    }

    pub fn show_keys(&self, keys: &[String]) -> String {
        self.tree.show_keys(keys)
    }

    pub fn set(&mut self, keys: &[String], value: &str) -> Result<()> {
        let mut values = keys.to_vec();
        values.push(value.to_string());
        self.log("set", values)?;
        self.tree.set(keys, value);
        Ok(())
    }

    pub fn unset(&mut self, keys: &[String]) -> Result<()> {
        self.log("unset", keys.to_vec())?;
        self.tree.unset(keys);
        Ok(())
    }

    pub fn prune(&mut self, keys: &[String]) -> Result<()> {
        if keys.is_empty() {
            return Err(DbError::EmptyPath);
        }
        self.log("prune", keys.to_vec())?;
        self.tree.prune(keys);
        Ok(())
    }

    /// Restore the latest snapshot, then replay the steps logged after it.
    /// Without any snapshot the whole journal is replayed.
    pub fn load(&mut self) -> Result<()> {
        let journal = self.journal()?;
        let steps = journal.read_steps()?;

        let latest = steps.iter().rposition(|s| s.snapshot_ref().is_some());
        let (mut tree, replay) = match latest {
            Some(index) => {
                let tree = match steps[index].snapshot_ref() {
                    Some((pos, size, _)) => journal.read_snapshot(pos, size)?,
                    None => DbTree::new(),
                };
                (tree, &steps[index + 1..])
            }
            None => (DbTree::new(), &steps[..]),
        };
        replay_steps(journal, &mut tree, replay)?;
        debug!(replayed = replay.len(), "Journal replayed");
        self.tree = tree;
        Ok(())
    }

    /// Write the current tree as a snapshot named `name`
    pub fn create_snapshot(&mut self, name: &str) -> Result<()> {
        let journal = self.journal()?;
        let (pos, size) = journal.write_snapshot(&self.tree)?;
        journal.append(&Step::new(
            "snapshot",
            vec![pos.to_string(), size.to_string(), name.to_string()],
        ))?;
        info!("Created snapshot {} at {}:{}", name, pos, size);
        Ok(())
    }

    /// Load the most recent snapshot, or the most recent one called `name`
    pub fn load_snapshot(&mut self, name: Option<&str>) -> Result<()> {
        let journal = self.journal()?;
        let steps = journal.read_steps()?;
        let found = steps
            .iter()
            .rev()
            .filter_map(Step::snapshot_ref)
            .find(|(_, _, label)| name.map_or(true, |n| n == *label));

        let Some((pos, size, label)) = found else {
            return Err(match name {
                Some(n) => DbError::SnapshotNotFound(n.to_string()),
                None => DbError::NoSnapshot,
            });
        };
        let tree = journal.read_snapshot(pos, size)?;
        journal.append(&Step::new(
            "snapshot",
            vec![pos.to_string(), size.to_string(), label.to_string()],
        ))?;
        self.tree = tree;
        info!("Loaded snapshot {}", label);
        Ok(())
    }

    /// Labels of the most recent distinct snapshots, newest first
    pub fn list_snapshots(&self, limit: usize) -> Result<Vec<String>> {
        let steps = self.journal()?.read_steps()?;
        let mut labels: Vec<String> = Vec::new();
        for (pos, size, name) in steps.iter().rev().filter_map(Step::snapshot_ref) {
            if labels.len() >= limit {
                break;
            }
            let label = if name == "unnamed" {
                format!("{}:{}", pos, size)
            } else {
                name.to_string()
            };
            if !labels.contains(&label) {
                labels.push(label);
            }
        }
        Ok(labels)
    }

    /// Rebuild the state as it was `seconds` ago and record it as a new
    /// snapshot named `revert`
    pub fn revert(&mut self, seconds: f64) -> Result<()> {
        let journal = self.journal()?;
        let target = now_secs() - seconds;
        let steps = journal.read_steps()?;

        let mut reached = false;
        let mut gathered = Vec::new();
        let mut base = None;
        for step in steps.iter().rev() {
            if step.timestamp.is_some_and(|t| t <= target) {
                reached = true;
            }
            if !reached {
                continue;
            }
            if let Some((pos, size, _)) = step.snapshot_ref() {
                base = Some((pos, size));
                break;
            }
            gathered.push(step.clone());
        }

        let mut tree = match base {
            Some((pos, size)) => journal.read_snapshot(pos, size)?,
            None => DbTree::new(),
        };
        gathered.reverse();
        replay_steps(journal, &mut tree, &gathered)?;
        self.tree = tree;
        info!(seconds, "Reverted database");
        self.create_snapshot("revert")
    }
}

/// Apply journal steps to `tree` without logging them again
fn replay_steps(journal: &Journal, tree: &mut DbTree, steps: &[Step]) -> Result<()> {
    for step in steps {
        match step.name.as_str() {
            "set" => {
                if let Some((value, keys)) = step.values.split_last() {
                    tree.set(keys, value.clone());
                }
            }
            "unset" => tree.unset(&step.values),
            "prune" => {
                tree.prune(&step.values);
            }
            "snapshot" => {
                if let Some((pos, size, _)) = step.snapshot_ref() {
                    *tree = journal.read_snapshot(pos, size)?;
                }
            }
            other => debug!("Ignoring journal step {}", other),
        }
    }
    Ok(())
}
