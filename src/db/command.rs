//! Command repository: name → path/URL lookups for system and web commands

use std::fmt;
use std::path::Path;

use super::DbPool;
use crate::{Error, Result};

/// Maximum stored length of a command name
pub const MAX_NAME_LEN: usize = 50;

/// Maximum stored length of a command target
pub const MAX_TARGET_LEN: usize = 1000;

/// Which table a command lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Local application launched as a process
    System,
    /// Website opened in the default browser
    Web,
}

impl CommandKind {
    const fn table(self) -> &'static str {
        match self {
            Self::System => "sys_command",
            Self::Web => "web_command",
        }
    }

    /// Short label used in logs and CLI output
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Web => "web",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandEntry {
    pub id: i64,
    pub kind: CommandKind,
    pub name: String,
    /// Executable path (with arguments) or URL
    pub target: String,
}

/// Command repository
#[derive(Clone)]
pub struct CommandRepo {
    pool: DbPool,
}

impl CommandRepo {
    /// Create a new command repository
    #[must_use]
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Open the command store at `path`, creating and migrating it if needed
    ///
    /// # Errors
    ///
    /// Returns error if the database cannot be opened
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(super::init(path)?))
    }

    /// Release the store's connections
    pub fn close(self) {
        drop(self.pool);
        tracing::debug!("command store closed");
    }

    /// Check that a connection can be taken and queried
    ///
    /// # Errors
    ///
    /// Returns error if the database is unreachable
    pub fn ping(&self) -> Result<()> {
        let conn = self.pool.get().map_err(|e| Error::Database(e.to_string()))?;
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }

    /// Look up the target for `name`, ignoring case
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn find(&self, kind: CommandKind, name: &str) -> Result<Option<String>> {
        let conn = self.pool.get().map_err(|e| Error::Database(e.to_string()))?;

        let sql = format!("SELECT path FROM {} WHERE name = ?1", kind.table());
        let result = conn.query_row(&sql, rusqlite::params![name.trim()], |row| row.get(0));

        match result {
            Ok(path) => Ok(Some(path)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Error::Database(e.to_string())),
        }
    }

    /// Add a command, replacing the target of an existing entry with the same name
    ///
    /// # Errors
    ///
    /// Returns error if the entry is invalid or the database operation fails
    pub fn add(&self, kind: CommandKind, name: &str, target: &str) -> Result<CommandEntry> {
        let name = name.trim();
        let target = target.trim();
        validate(kind, name, target)?;

        let conn = self.pool.get().map_err(|e| Error::Database(e.to_string()))?;

        let sql = format!(
            "INSERT INTO {} (name, path) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET path = excluded.path
             RETURNING id",
            kind.table()
        );
        let id: i64 = conn.query_row(&sql, rusqlite::params![name, target], |row| row.get(0))?;

        tracing::info!(kind = %kind, name, target, "command saved");

        Ok(CommandEntry {
            id,
            kind,
            name: name.to_string(),
            target: target.to_string(),
        })
    }

    /// List all commands of one kind, ordered by name
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn list(&self, kind: CommandKind) -> Result<Vec<CommandEntry>> {
        let conn = self.pool.get().map_err(|e| Error::Database(e.to_string()))?;

        let sql = format!("SELECT id, name, path FROM {} ORDER BY name", kind.table());
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            Ok(CommandEntry {
                id: row.get(0)?,
                kind,
                name: row.get(1)?,
                target: row.get(2)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::Database(e.to_string()))
    }
}

fn validate(kind: CommandKind, name: &str, target: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidCommand("name must not be empty".to_string()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(Error::InvalidCommand(format!(
            "name longer than {MAX_NAME_LEN} characters"
        )));
    }
    if target.is_empty() {
        return Err(Error::InvalidCommand("target must not be empty".to_string()));
    }
    if target.chars().count() > MAX_TARGET_LEN {
        return Err(Error::InvalidCommand(format!(
            "target longer than {MAX_TARGET_LEN} characters"
        )));
    }

    if kind == CommandKind::Web {
        let url = url::Url::parse(target)
            .map_err(|e| Error::InvalidCommand(format!("invalid URL {target}: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::InvalidCommand(format!(
                "unsupported URL scheme: {}",
                url.scheme()
            )));
        }
    }

    Ok(())
}
