use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;

use crate::upload::{DocumentStore, RemoteDocument};

/// SQLite mirror of the document store; each batch is one transaction
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        Self::from_connection(conn)
    }

    pub fn from_connection(conn: Connection) -> Result<Self> {
        init_database(&conn)?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn get(
        &self,
        collection: &str,
        key: &str,
    ) -> Result<Option<std::collections::BTreeMap<String, String>>> {
        use rusqlite::OptionalExtension;

        let body: Option<String> = self
            .conn
            .query_row(
                "SELECT body FROM documents WHERE collection = ?1 AND key = ?2",
                (collection, key),
                |row| row.get(0),
            )
            .optional()?;
        match body {
            Some(body) => Ok(Some(serde_json::from_str(&body)?)),
            None => Ok(None),
        }
    }

    pub fn count(&self, collection: &str) -> Result<usize> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE collection = ?1",
            [collection],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }
}

pub fn init_database(conn: &Connection) -> Result<()> {
    let schema = include_str!("../schema.sql");
    conn.execute_batch(schema)?;
    Ok(())
}

impl DocumentStore for SqliteStore {
    fn commit(&mut self, collection: &str, batch: &[RemoteDocument]) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO documents (collection, key, body) VALUES (?1, ?2, ?3)",
            )?;
            for doc in batch {
                let body = serde_json::to_string(&doc.fields)?;
                stmt.execute((collection, &doc.key, &body))
                    .with_context(|| format!("Failed to write document {}", doc.key))?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}
