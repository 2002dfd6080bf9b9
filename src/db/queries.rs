//! Named SQL statements
//!
//! Statements live in plain SQL files, each introduced by a tag line:
//!
//! ```sql
//! -- name: get-registers
//! SELECT id, name, description FROM registers
//! ```
//!
//! Statements keep their file order, which is the order schema bootstrap
//! runs them in.

use std::collections::HashMap;
use std::path::Path;

use super::DataAccessError;

const NAME_TAG: &str = "name:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedQuery {
    pub name: String,
    pub sql: String,
}

#[derive(Debug, Clone, Default)]
pub struct NamedQueries {
    queries: Vec<NamedQuery>,
    index: HashMap<String, usize>,
}

impl NamedQueries {
    pub fn load(path: &Path) -> Result<Self, DataAccessError> {
        let contents = std::fs::read_to_string(path).map_err(|source| DataAccessError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let queries = Self::parse(&contents)?;
        tracing::debug!("Loaded {} named queries from {}", queries.len(), path.display());
        Ok(queries)
    }

    pub fn parse(contents: &str) -> Result<Self, DataAccessError> {
        let mut queries = Self::default();
        let mut current: Option<(String, Vec<&str>)> = None;

        for (line_number, line) in contents.lines().enumerate() {
            if let Some(name) = name_tag(line) {
                if let Some((name, body)) = current.take() {
                    queries.push(name, &body)?;
                }
                if name.is_empty() {
                    return Err(DataAccessError::InvalidQueryFile(format!(
                        "empty query name on line {}",
                        line_number + 1
                    )));
                }
                current = Some((name.to_string(), Vec::new()));
                continue;
            }

            match current.as_mut() {
                Some((_, body)) => body.push(line),
                None => {
                    let trimmed = line.trim();
                    if !trimmed.is_empty() && !trimmed.starts_with("--") {
                        return Err(DataAccessError::InvalidQueryFile(format!(
                            "statement without a name on line {}",
                            line_number + 1
                        )));
                    }
                }
            }
        }

        if let Some((name, body)) = current.take() {
            queries.push(name, &body)?;
        }

        Ok(queries)
    }

    fn push(&mut self, name: String, body: &[&str]) -> Result<(), DataAccessError> {
        let sql = body
            .iter()
            .filter(|line| !line.trim_start().starts_with("--"))
            .copied()
            .collect::<Vec<_>>()
            .join("\n");
        let sql = sql.trim().trim_end_matches(';').trim_end().to_string();

        if sql.is_empty() {
            return Err(DataAccessError::InvalidQueryFile(format!(
                "query '{}' has no statement",
                name
            )));
        }
        if self.index.contains_key(&name) {
            return Err(DataAccessError::InvalidQueryFile(format!(
                "query '{}' is defined more than once",
                name
            )));
        }

        self.index.insert(name.clone(), self.queries.len());
        self.queries.push(NamedQuery { name, sql });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&str, DataAccessError> {
        self.index
            .get(name)
            .map(|i| self.queries[*i].sql.as_str())
            .ok_or_else(|| DataAccessError::UnknownQuery(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &NamedQuery> {
        self.queries.iter()
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}

fn name_tag(line: &str) -> Option<&str> {
    let comment = line.trim().strip_prefix("--")?.trim_start();
    comment.strip_prefix(NAME_TAG).map(str::trim)
}
