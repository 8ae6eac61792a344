//! Append-only identity log.
//!
//! One plain-text line per successful signup, so the next person to sit down
//! at this machine knows which throwaway inboxes the portal believes in.

use crate::identity::Identity;
use anyhow::{Context, Result};
use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Default log location, relative to the working directory.
pub const NAMES_FILE: &str = "names.txt";

/// Append-only identity log at a fixed path.
pub struct IdentityLog {
    path: PathBuf,
}

impl IdentityLog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Append one `<local timestamp> <first> <last> <email>` line.
    pub fn append(&self, identity: &Identity) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open identity log: {}", self.path.display()))?;

        let stamp = Local::now().format("%-m/%-d/%Y, %-I:%M:%S %p");
        writeln!(
            file,
            "{stamp} {} {} {} ",
            identity.first, identity.last, identity.email
        )
        .with_context(|| format!("failed to append to {}", self.path.display()))?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
