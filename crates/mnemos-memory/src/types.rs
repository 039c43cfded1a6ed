//! Core data model: nodes, their metadata, and the edges between them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{MemoryError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Identity
// ─────────────────────────────────────────────────────────────────────────────

/// Stable identifier of a memory node. Assigned once, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryId(Uuid);

impl MemoryId {
    /// Generate a fresh random ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an ID from its hyphenated string form.
    pub fn parse(s: &str) -> Result<Self> {
        Ok(Self(Uuid::parse_str(s.trim())?))
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MemoryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MemoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for MemoryId {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<Uuid> for MemoryId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Enumerations
// ─────────────────────────────────────────────────────────────────────────────

/// Coarse lifecycle category of a memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryLayer {
    ShortTerm,
    LongTerm,
    Episodic,
    Procedural,
    Semantic,
}

impl MemoryLayer {
    /// Every layer, in declaration order.
    pub const ALL: [MemoryLayer; 5] = [
        MemoryLayer::ShortTerm,
        MemoryLayer::LongTerm,
        MemoryLayer::Episodic,
        MemoryLayer::Procedural,
        MemoryLayer::Semantic,
    ];

    /// Storage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryLayer::ShortTerm => "short_term",
            MemoryLayer::LongTerm => "long_term",
            MemoryLayer::Episodic => "episodic",
            MemoryLayer::Procedural => "procedural",
            MemoryLayer::Semantic => "semantic",
        }
    }

    /// Parse a storage name. Accepts `-` in place of `_`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "short_term" => Some(MemoryLayer::ShortTerm),
            "long_term" => Some(MemoryLayer::LongTerm),
            "episodic" => Some(MemoryLayer::Episodic),
            "procedural" => Some(MemoryLayer::Procedural),
            "semantic" => Some(MemoryLayer::Semantic),
            _ => None,
        }
    }
}

impl fmt::Display for MemoryLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemoryLayer {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| MemoryError::InvalidInput(format!("unknown layer '{s}'")))
    }
}

/// Usage-driven status of a memory, independent of its layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryState {
    Fresh,
    Active,
    Stable,
    Dormant,
    Consolidated,
}

impl MemoryState {
    /// Every state, in declaration order.
    pub const ALL: [MemoryState; 5] = [
        MemoryState::Fresh,
        MemoryState::Active,
        MemoryState::Stable,
        MemoryState::Dormant,
        MemoryState::Consolidated,
    ];

    /// Storage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryState::Fresh => "fresh",
            MemoryState::Active => "active",
            MemoryState::Stable => "stable",
            MemoryState::Dormant => "dormant",
            MemoryState::Consolidated => "consolidated",
        }
    }

    /// Parse a storage name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "fresh" => Some(MemoryState::Fresh),
            "active" => Some(MemoryState::Active),
            "stable" => Some(MemoryState::Stable),
            "dormant" => Some(MemoryState::Dormant),
            "consolidated" => Some(MemoryState::Consolidated),
            _ => None,
        }
    }
}

impl fmt::Display for MemoryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of relation an edge expresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    Semantic,
    Temporal,
    Causal,
    Contextual,
    Functional,
    Analogical,
}

impl ConnectionType {
    /// Every connection type, in declaration order.
    pub const ALL: [ConnectionType; 6] = [
        ConnectionType::Semantic,
        ConnectionType::Temporal,
        ConnectionType::Causal,
        ConnectionType::Contextual,
        ConnectionType::Functional,
        ConnectionType::Analogical,
    ];

    /// Storage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionType::Semantic => "semantic",
            ConnectionType::Temporal => "temporal",
            ConnectionType::Causal => "causal",
            ConnectionType::Contextual => "contextual",
            ConnectionType::Functional => "functional",
            ConnectionType::Analogical => "analogical",
        }
    }

    /// Parse a storage name.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s.trim().to_lowercase())
    }
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectionType {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
            .ok_or_else(|| MemoryError::InvalidInput(format!("unknown connection type '{s}'")))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Metadata
// ─────────────────────────────────────────────────────────────────────────────

/// Mutable lifecycle data carried by every node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryMetadata {
    /// Successful reads. Only ever increases.
    pub access_count: u32,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    /// Importance score in `[0, 1]`.
    pub emotional_weight: f32,
    /// How embedded the node is in broader knowledge, `[0, 1]`.
    pub integration_depth: f32,
    /// Fading speed per hour without access.
    pub decay_rate: f32,
    pub reinforcement_count: u32,
    pub layer: MemoryLayer,
    pub state: MemoryState,
    pub topic_categories: Vec<String>,
    pub skill_categories: Vec<String>,
    pub context_categories: Vec<String>,
    /// Sum of the strengths of all incident edges. Derived.
    pub connection_strength_total: f32,
    /// Number of distinct neighbours over incident edges. Derived.
    pub connected_count: u32,
}

impl MemoryMetadata {
    /// Metadata for a node created at `now`.
    pub fn new(now: DateTime<Utc>, decay_rate: f32) -> Self {
        Self {
            access_count: 0,
            created_at: now,
            last_accessed: now,
            emotional_weight: 0.5,
            integration_depth: 0.0,
            decay_rate: decay_rate.max(0.0),
            reinforcement_count: 0,
            layer: MemoryLayer::LongTerm,
            state: MemoryState::Fresh,
            topic_categories: Vec::new(),
            skill_categories: Vec::new(),
            context_categories: Vec::new(),
            connection_strength_total: 0.0,
            connected_count: 0,
        }
    }

    /// `exp(-decay_rate * hours_since_last_access)`, in `[0, 1]`.
    pub fn decay_factor(&self, now: DateTime<Utc>) -> f32 {
        let hours = (now - self.last_accessed).num_seconds().max(0) as f64 / 3600.0;
        (-(self.decay_rate as f64) * hours).exp().clamp(0.0, 1.0) as f32
    }

    /// Count one successful read.
    pub fn record_access(&mut self, now: DateTime<Utc>) {
        self.access_count = self.access_count.saturating_add(1);
        self.last_accessed = now;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Nodes and edges
// ─────────────────────────────────────────────────────────────────────────────

/// A stored memory together with its classification and lifecycle data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryNode {
    pub id: MemoryId,
    pub content: String,
    pub memory_type: String,
    pub project: String,
    pub tags: Vec<String>,
    pub embedding: Option<Vec<f32>>,
    /// Root-first topic path, at most two entries.
    pub topic_path: Vec<String>,
    /// Root-first skill path, at most two entries.
    pub skill_path: Vec<String>,
    pub metadata: MemoryMetadata,
}

impl MemoryNode {
    /// A fresh, unclassified node built from raw input.
    pub fn from_raw(raw: RawMemory, now: DateTime<Utc>, decay_rate: f32) -> Self {
        Self {
            id: raw.id.unwrap_or_default(),
            content: raw.content,
            memory_type: raw.memory_type,
            project: raw.project,
            tags: raw.tags,
            embedding: None,
            topic_path: Vec::new(),
            skill_path: Vec::new(),
            metadata: MemoryMetadata::new(now, decay_rate),
        }
    }

    /// All topic, skill and context categories, in that order.
    pub fn categories(&self) -> impl Iterator<Item = &String> {
        self.metadata
            .topic_categories
            .iter()
            .chain(self.metadata.skill_categories.iter())
            .chain(self.metadata.context_categories.iter())
    }

    /// Whether the node carries `tag` (case-insensitive).
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}

/// A directed, typed, weighted edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryConnection {
    pub source: MemoryId,
    pub target: MemoryId,
    pub connection_type: ConnectionType,
    /// Edge strength in `[0, 1]`.
    pub strength: f32,
    pub created_at: DateTime<Utc>,
    pub last_reinforced: DateTime<Utc>,
    pub reinforcement_count: u32,
}

// ─────────────────────────────────────────────────────────────────────────────
// Input
// ─────────────────────────────────────────────────────────────────────────────

/// Project assigned when the caller does not name one.
pub const DEFAULT_PROJECT: &str = "default";

/// A memory as handed to the engine, before classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMemory {
    /// Caller-chosen ID; a new one is generated when absent.
    #[serde(default)]
    pub id: Option<MemoryId>,
    pub content: String,
    #[serde(default = "default_memory_type")]
    pub memory_type: String,
    #[serde(default = "default_project")]
    pub project: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_memory_type() -> String {
    "note".to_string()
}

fn default_project() -> String {
    DEFAULT_PROJECT.to_string()
}

impl RawMemory {
    /// A note in the default project.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: None,
            content: content.into(),
            memory_type: default_memory_type(),
            project: default_project(),
            tags: Vec::new(),
        }
    }

    /// Set the declared type (e.g. "task", "fact", "code").
    pub fn with_type(mut self, memory_type: impl Into<String>) -> Self {
        self.memory_type = memory_type.into();
        self
    }

    /// Set the owning project.
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = project.into();
        self
    }

    /// Add one tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Add several tags.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Use a caller-chosen ID.
    pub fn with_id(mut self, id: MemoryId) -> Self {
        self.id = Some(id);
        self
    }
}
