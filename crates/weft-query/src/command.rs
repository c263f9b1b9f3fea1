//! Finished query scripts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Script dialect a [`Command`] is written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    /// A single OrientDB SQL statement
    #[serde(rename = "orientdb-sql")]
    OrientSql,
    /// A transactional OrientDB SQL script (`begin` .. `commit`)
    #[serde(rename = "orientdb-sql-batch")]
    OrientSqlBatch,
    /// A single Cypher statement
    #[serde(rename = "cypher")]
    Cypher,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::OrientSql => "orientdb-sql",
            Language::OrientSqlBatch => "orientdb-sql-batch",
            Language::Cypher => "cypher",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A literal query script plus the dialect it is written in.
///
/// Immutable once built; the execution layer receives it unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Command {
    script: String,
    language: Language,
}

impl Command {
    pub fn new(script: impl Into<String>, language: Language) -> Self {
        Self {
            script: script.into(),
            language,
        }
    }

    pub fn script(&self) -> &str {
        &self.script
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn into_script(self) -> String {
        self.script
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.script)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_displays_its_script() {
        let command = Command::new("SELECT FROM V", Language::OrientSql);
        assert_eq!(command.to_string(), "SELECT FROM V");
        assert_eq!(command.language(), Language::OrientSql);
    }

    #[test]
    fn test_language_tag_is_spelled_once() {
        for language in [Language::OrientSql, Language::OrientSqlBatch, Language::Cypher] {
            let json = serde_json::to_string(&language).unwrap();
            assert_eq!(json, format!("\"{language}\""));
            let parsed: Language = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, language);
        }
        assert_eq!(Language::OrientSqlBatch.as_str(), "orientdb-sql-batch");
    }
}
