//! Process-level configuration
//!
//! Mirrors the teacher's `DB_KEY_ENV`-style constant-named environment
//! variable convention: configuration knobs that matter at process start
//! are named constants here, read once, and never re-read mid-run.

/// Environment variable naming the SQLite database file path.
pub const DB_PATH_ENV: &str = "MEMORY_DB_PATH";

/// Default database path when `MEMORY_DB_PATH` is unset.
pub const DEFAULT_DB_PATH: &str = "memory.db";

/// Default weights for the hybrid retriever's three scorers.
#[derive(Debug, Clone, Copy)]
pub struct RetrievalWeights {
    pub lexical: f64,
    pub semantic: f64,
    pub graph: f64,
}

impl Default for RetrievalWeights {
    fn default() -> Self {
        Self {
            lexical: 0.3,
            semantic: 0.5,
            graph: 0.2,
        }
    }
}

impl RetrievalWeights {
    /// Redistribute the semantic weight to lexical (60%) and graph (40%)
    /// when the semantic scorer yields nothing (collaborator absent or
    /// failed). See spec §4.7.
    pub fn without_semantic(self) -> Self {
        Self {
            lexical: self.lexical + self.semantic * 0.6,
            semantic: 0.0,
            graph: self.graph + self.semantic * 0.4,
        }
    }
}
