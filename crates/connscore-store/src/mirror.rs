//! JSON mirrors of the tables, in the shape the publishing site consumes.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use connscore_types::{Record, RecordRow, format_date};

use crate::error::Result;
use crate::table::write_atomic;

/// Value of `metadata.source` in every mirror.
pub const MIRROR_SOURCE: &str = "Connections Game Difficulty Data";

/// Envelope written to every `.json` artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonMirror {
    pub puzzles: Vec<RecordRow>,
    pub metadata: MirrorMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirrorMetadata {
    /// Date of the newest record in the mirror.
    pub last_updated: Option<String>,
    pub total_puzzles: usize,
    pub source: String,
}

impl JsonMirror {
    /// Mirror `records`, keeping their order.
    pub fn from_records(records: &[Record]) -> Self {
        let last_updated = records.iter().map(Record::date).max().map(format_date);
        Self {
            puzzles: records.iter().map(Record::to_row).collect(),
            metadata: MirrorMetadata {
                last_updated,
                total_puzzles: records.len(),
                source: MIRROR_SOURCE.to_string(),
            },
        }
    }

    pub fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let mut content = serde_json::to_string_pretty(self)?;
        content.push('\n');
        write_atomic(path, content.as_bytes())
    }
}
