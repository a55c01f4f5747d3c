// Session Context
//
// Read-only handle passed into every parse call. Parsing never mutates the
// session beyond appending diagnostic warnings, so a shared reference is
// enough and concurrent parses against distinct sessions are safe.

use std::collections::HashMap;
use std::time::SystemTime;

use parking_lot::RwLock;

use crate::plan::expr::Value;

/// A diagnostic raised during statement processing, surfaced by
/// `SHOW WARNINGS`.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionWarning {
    pub level: String,
    pub code: u16,
    pub message: String,
}

/// Per-connection state the parser consults: the current database, session
/// variables, accumulated warnings and a clock for DDL timestamps.
pub struct Session {
    database: String,
    variables: HashMap<String, Value>,
    warnings: RwLock<Vec<SessionWarning>>,
}

impl Session {
    pub fn new(database: impl Into<String>) -> Self {
        Session {
            database: database.into(),
            variables: HashMap::new(),
            warnings: RwLock::new(Vec::new()),
        }
    }

    /// Current database name, used to qualify unqualified introspection
    /// output such as the `Tables_in_<db>` column.
    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: Value) {
        self.variables.insert(name.into().to_lowercase(), value);
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(&name.to_lowercase())
    }

    /// The `sql_select_limit` session setting, applied to top-level SELECT
    /// statements that carry no LIMIT of their own.
    pub fn default_limit(&self) -> Option<i64> {
        match self.variable("sql_select_limit") {
            Some(value) => value.as_i64().filter(|limit| *limit > 0),
            None => None,
        }
    }

    pub fn warn(&self, code: u16, message: impl Into<String>) {
        self.warnings.write().push(SessionWarning {
            level: "Warning".to_string(),
            code,
            message: message.into(),
        });
    }

    /// Snapshot of the current warnings, newest last.
    pub fn warnings(&self) -> Vec<SessionWarning> {
        self.warnings.read().clone()
    }

    pub fn clear_warnings(&self) {
        self.warnings.write().clear();
    }

    /// Statement timestamp, recorded on created triggers.
    pub fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

impl Default for Session {
    fn default() -> Self {
        Session::new("")
    }
}
