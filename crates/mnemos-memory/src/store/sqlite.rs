//! SQLite record store.

use std::path::Path;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags, params};
use tracing::{debug, info};

use super::RecordStore;
use crate::error::{MemoryError, Result};
use crate::types::{
    ConnectionType, MemoryConnection, MemoryId, MemoryLayer, MemoryMetadata, MemoryNode,
    MemoryState,
};

// ─────────────────────────────────────────────────────────────────────────────
// Schema
// ─────────────────────────────────────────────────────────────────────────────

/// Current schema version, stored in `user_version`.
const SCHEMA_VERSION: i32 = 1;

const SCHEMA: &str = r#"
    -- One row per memory node, metadata flattened into columns
    CREATE TABLE IF NOT EXISTS memory_nodes (
        id TEXT PRIMARY KEY,
        content TEXT NOT NULL,
        memory_type TEXT NOT NULL,
        project TEXT NOT NULL,
        tags TEXT NOT NULL DEFAULT '[]',
        embedding TEXT,
        topic_path TEXT NOT NULL DEFAULT '[]',
        skill_path TEXT NOT NULL DEFAULT '[]',
        access_count INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        last_accessed TEXT NOT NULL,
        emotional_weight REAL NOT NULL,
        integration_depth REAL NOT NULL,
        decay_rate REAL NOT NULL,
        reinforcement_count INTEGER NOT NULL DEFAULT 0,
        layer TEXT NOT NULL,
        state TEXT NOT NULL,
        topic_categories TEXT NOT NULL DEFAULT '[]',
        skill_categories TEXT NOT NULL DEFAULT '[]',
        context_categories TEXT NOT NULL DEFAULT '[]',
        connection_strength_total REAL NOT NULL DEFAULT 0,
        connected_count INTEGER NOT NULL DEFAULT 0
    );

    CREATE INDEX IF NOT EXISTS idx_memory_nodes_project
        ON memory_nodes(project);

    CREATE INDEX IF NOT EXISTS idx_memory_nodes_created_at
        ON memory_nodes(created_at);

    -- Directed typed edges
    CREATE TABLE IF NOT EXISTS memory_connections (
        source_id TEXT NOT NULL,
        target_id TEXT NOT NULL,
        connection_type TEXT NOT NULL,
        strength REAL NOT NULL,
        created_at TEXT NOT NULL,
        last_reinforced TEXT NOT NULL,
        reinforcement_count INTEGER NOT NULL DEFAULT 0,
        PRIMARY KEY (source_id, target_id, connection_type)
    );

    CREATE INDEX IF NOT EXISTS idx_memory_connections_target
        ON memory_connections(target_id);
"#;

const NODE_COLUMNS: &str = "id, content, memory_type, project, tags, embedding, topic_path, \
     skill_path, access_count, created_at, last_accessed, emotional_weight, integration_depth, \
     decay_rate, reinforcement_count, layer, state, topic_categories, skill_categories, \
     context_categories, connection_strength_total, connected_count";

// ─────────────────────────────────────────────────────────────────────────────
// Store
// ─────────────────────────────────────────────────────────────────────────────

/// Record store backed by a single SQLite database in WAL mode.
pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteRecordStore").finish_non_exhaustive()
    }
}

impl SqliteRecordStore {
    /// Open or create a database at `path`, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|_| {
                MemoryError::Database(rusqlite::Error::InvalidPath(path.to_path_buf()))
            })?;
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_FULL_MUTEX,
        )?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize()?;

        info!(path = %path.display(), "Record store opened");
        Ok(store)
    }

    /// Private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        store.initialize()?;
        debug!("In-memory record store created");
        Ok(store)
    }

    fn initialize(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        let current: i32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap_or(0);
        if current >= SCHEMA_VERSION {
            debug!(version = current, "Schema up to date");
            return Ok(());
        }

        conn.execute_batch(SCHEMA)?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        info!(version = SCHEMA_VERSION, "Schema created");
        Ok(())
    }

    fn row_to_node(row: &rusqlite::Row) -> Result<MemoryNode> {
        let id: String = row.get(0)?;
        let tags: String = row.get(4)?;
        let embedding: Option<String> = row.get(5)?;
        let topic_path: String = row.get(6)?;
        let skill_path: String = row.get(7)?;
        let created_at: String = row.get(9)?;
        let last_accessed: String = row.get(10)?;
        let layer: String = row.get(15)?;
        let state: String = row.get(16)?;
        let topic_categories: String = row.get(17)?;
        let skill_categories: String = row.get(18)?;
        let context_categories: String = row.get(19)?;

        let metadata = MemoryMetadata {
            access_count: row.get(8)?,
            created_at: parse_time(&created_at)?,
            last_accessed: parse_time(&last_accessed)?,
            emotional_weight: row.get(11)?,
            integration_depth: row.get(12)?,
            decay_rate: row.get(13)?,
            reinforcement_count: row.get(14)?,
            layer: MemoryLayer::parse(&layer)
                .ok_or_else(|| MemoryError::InvalidData(format!("Unknown layer: {layer}")))?,
            state: MemoryState::parse(&state)
                .ok_or_else(|| MemoryError::InvalidData(format!("Unknown state: {state}")))?,
            topic_categories: serde_json::from_str(&topic_categories)?,
            skill_categories: serde_json::from_str(&skill_categories)?,
            context_categories: serde_json::from_str(&context_categories)?,
            connection_strength_total: row.get(20)?,
            connected_count: row.get(21)?,
        };

        Ok(MemoryNode {
            id: MemoryId::parse(&id)?,
            content: row.get(1)?,
            memory_type: row.get(2)?,
            project: row.get(3)?,
            tags: serde_json::from_str(&tags)?,
            embedding: embedding.as_deref().map(serde_json::from_str).transpose()?,
            topic_path: serde_json::from_str(&topic_path)?,
            skill_path: serde_json::from_str(&skill_path)?,
            metadata,
        })
    }

    fn row_to_connection(row: &rusqlite::Row) -> Result<MemoryConnection> {
        let source: String = row.get(0)?;
        let target: String = row.get(1)?;
        let connection_type: String = row.get(2)?;
        let created_at: String = row.get(4)?;
        let last_reinforced: String = row.get(5)?;

        Ok(MemoryConnection {
            source: MemoryId::parse(&source)?,
            target: MemoryId::parse(&target)?,
            connection_type: ConnectionType::parse(&connection_type).ok_or_else(|| {
                MemoryError::InvalidData(format!("Unknown connection type: {connection_type}"))
            })?,
            strength: row.get(3)?,
            created_at: parse_time(&created_at)?,
            last_reinforced: parse_time(&last_reinforced)?,
            reinforcement_count: row.get(6)?,
        })
    }
}

fn parse_time(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .map_err(|e| MemoryError::InvalidData(e.to_string()))?
        .with_timezone(&Utc))
}

impl RecordStore for SqliteRecordStore {
    fn save_node(&self, node: &MemoryNode) -> Result<()> {
        let meta = &node.metadata;
        let embedding = node
            .embedding
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let conn = self.conn.lock();
        conn.execute(
            &format!(
                r#"
                INSERT INTO memory_nodes ({NODE_COLUMNS})
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                        ?16, ?17, ?18, ?19, ?20, ?21, ?22)
                ON CONFLICT(id) DO UPDATE SET
                    embedding = excluded.embedding,
                    topic_path = excluded.topic_path,
                    skill_path = excluded.skill_path,
                    access_count = excluded.access_count,
                    last_accessed = excluded.last_accessed,
                    emotional_weight = excluded.emotional_weight,
                    integration_depth = excluded.integration_depth,
                    decay_rate = excluded.decay_rate,
                    reinforcement_count = excluded.reinforcement_count,
                    layer = excluded.layer,
                    state = excluded.state,
                    topic_categories = excluded.topic_categories,
                    skill_categories = excluded.skill_categories,
                    context_categories = excluded.context_categories,
                    connection_strength_total = excluded.connection_strength_total,
                    connected_count = excluded.connected_count
                "#
            ),
            params![
                node.id.to_string(),
                node.content,
                node.memory_type,
                node.project,
                serde_json::to_string(&node.tags)?,
                embedding,
                serde_json::to_string(&node.topic_path)?,
                serde_json::to_string(&node.skill_path)?,
                meta.access_count,
                meta.created_at.to_rfc3339(),
                meta.last_accessed.to_rfc3339(),
                meta.emotional_weight,
                meta.integration_depth,
                meta.decay_rate,
                meta.reinforcement_count,
                meta.layer.as_str(),
                meta.state.as_str(),
                serde_json::to_string(&meta.topic_categories)?,
                serde_json::to_string(&meta.skill_categories)?,
                serde_json::to_string(&meta.context_categories)?,
                meta.connection_strength_total,
                meta.connected_count,
            ],
        )?;

        debug!(memory_id = %node.id, "Saved node");
        Ok(())
    }

    fn save_connection(&self, connection: &MemoryConnection) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            r#"
            INSERT INTO memory_connections
                (source_id, target_id, connection_type, strength, created_at,
                 last_reinforced, reinforcement_count)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(source_id, target_id, connection_type) DO UPDATE SET
                strength = excluded.strength,
                last_reinforced = excluded.last_reinforced,
                reinforcement_count = excluded.reinforcement_count
            "#,
            params![
                connection.source.to_string(),
                connection.target.to_string(),
                connection.connection_type.as_str(),
                connection.strength,
                connection.created_at.to_rfc3339(),
                connection.last_reinforced.to_rfc3339(),
                connection.reinforcement_count,
            ],
        )?;
        Ok(())
    }

    fn delete_connection(
        &self,
        source: MemoryId,
        target: MemoryId,
        connection_type: ConnectionType,
    ) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "DELETE FROM memory_connections \
             WHERE source_id = ?1 AND target_id = ?2 AND connection_type = ?3",
            params![
                source.to_string(),
                target.to_string(),
                connection_type.as_str()
            ],
        )?;
        Ok(())
    }

    fn load_nodes(&self) -> Result<Vec<MemoryNode>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {NODE_COLUMNS} FROM memory_nodes ORDER BY created_at, id"
        ))?;
        let mut rows = stmt.query([])?;

        let mut nodes = Vec::new();
        while let Some(row) = rows.next()? {
            nodes.push(Self::row_to_node(row)?);
        }
        Ok(nodes)
    }

    fn load_connections(&self) -> Result<Vec<MemoryConnection>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            r#"
            SELECT source_id, target_id, connection_type, strength, created_at,
                   last_reinforced, reinforcement_count
            FROM memory_connections
            ORDER BY source_id, target_id, connection_type
            "#,
        )?;
        let mut rows = stmt.query([])?;

        let mut connections = Vec::new();
        while let Some(row) = rows.next()? {
            connections.push(Self::row_to_connection(row)?);
        }
        Ok(connections)
    }
}
