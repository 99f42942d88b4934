//! Interaction log repository
//!
//! Append-only record of conversational turns. Logging runs off the
//! response path; a failed insert is logged and never fails a request.

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use super::DbPool;
use crate::{Error, Result};

/// A logged interaction
#[derive(Debug, Clone, Serialize)]
pub struct ChatLogEntry {
    pub id: String,
    pub robot_id: Option<String>,
    pub input: String,
    pub output: Option<String>,
    pub time: String,
}

/// Interaction log repository
#[derive(Debug, Clone)]
pub struct ChatLogRepo {
    pool: DbPool,
}

impl ChatLogRepo {
    /// Create a new log repository
    #[must_use]
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Append a completed turn
    ///
    /// # Errors
    ///
    /// Returns error if the insert fails
    pub fn add(&self, robot_id: Option<&str>, input: &str, output: Option<&str>) -> Result<ChatLogEntry> {
        let conn = self.pool.get().map_err(|e| Error::Database(e.to_string()))?;

        let entry = ChatLogEntry {
            id: format!("log_{}", Uuid::new_v4()),
            robot_id: robot_id.map(ToString::to_string),
            input: input.to_string(),
            output: output.map(ToString::to_string),
            time: Utc::now().to_rfc3339(),
        };

        conn.execute(
            "INSERT INTO chat_logs (id, robot_id, input, output, time)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![entry.id, entry.robot_id, entry.input, entry.output, entry.time],
        )?;

        Ok(entry)
    }

    /// List turns for a robot, newest first
    ///
    /// # Errors
    ///
    /// Returns error if the query fails
    pub fn list(&self, robot_id: &str, limit: usize) -> Result<Vec<ChatLogEntry>> {
        let conn = self.pool.get().map_err(|e| Error::Database(e.to_string()))?;

        let mut stmt = conn.prepare(
            "SELECT id, robot_id, input, output, time FROM chat_logs
             WHERE robot_id = ?1 ORDER BY time DESC LIMIT ?2",
        )?;

        #[allow(clippy::cast_possible_wrap)]
        let rows = stmt.query_map(rusqlite::params![robot_id, limit as i64], |row| {
            Ok(ChatLogEntry {
                id: row.get(0)?,
                robot_id: row.get(1)?,
                input: row.get(2)?,
                output: row.get(3)?,
                time: row.get(4)?,
            })
        })?;

        Ok(rows.flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[test]
    fn add_and_list_newest_first() {
        let pool = db::init_memory().unwrap();
        let repo = ChatLogRepo::new(pool);

        let first = repo.add(Some("robot-1"), "halo", Some("hai!")).unwrap();
        // Distinct timestamps so ordering is observable
        {
            let conn = repo.pool.get().unwrap();
            conn.execute(
                "UPDATE chat_logs SET time = ?1 WHERE id = ?2",
                rusqlite::params![(Utc::now() - chrono::Duration::seconds(10)).to_rfc3339(), first.id],
            )
            .unwrap();
        }
        repo.add(Some("robot-1"), "apa kabar", Some("baik")).unwrap();

        let logs = repo.list("robot-1", 10).unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].input, "apa kabar");
        assert_eq!(logs[1].input, "halo");
    }

    #[test]
    fn logs_are_scoped_per_robot() {
        let pool = db::init_memory().unwrap();
        let repo = ChatLogRepo::new(pool);

        repo.add(Some("robot-a"), "a", None).unwrap();
        repo.add(Some("robot-b"), "b", Some("out")).unwrap();

        let logs = repo.list("robot-a", 10).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].input, "a");
        assert!(logs[0].output.is_none());
    }

    #[test]
    fn non_talk_turn_has_no_output() {
        let pool = db::init_memory().unwrap();
        let repo = ChatLogRepo::new(pool);

        let entry = repo.add(Some("robot-1"), "ayo joget", None).unwrap();
        assert!(entry.output.is_none());
    }
}
