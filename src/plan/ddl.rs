// DDL Value Records
//
// Flat records created once during DDL compilation and owned by the
// enclosing plan node: column definitions, index definitions, constraint
// specs, table locks and trigger metadata.

use std::collections::HashMap;
use std::fmt;
use std::time::SystemTime;

use crate::plan::expr::Expression;

/// A `[db.]name` pair; the qualifier is empty for unqualified names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedName {
    pub database: Option<String>,
    pub name: String,
}

impl QualifiedName {
    pub fn bare(name: impl Into<String>) -> QualifiedName {
        QualifiedName {
            database: None,
            name: name.into(),
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.database {
            Some(db) => write!(f, "{}.{}", db, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// One column of a CREATE TABLE or ALTER TABLE statement. The type is kept
/// as source text; resolving it is the analyzer's job.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: String,
    pub type_name: String,
    pub nullable: bool,
    pub default: Option<Expression>,
    pub auto_increment: bool,
    pub primary_key: bool,
    pub comment: Option<String>,
}

/// Column placement for ALTER TABLE ADD/MODIFY/CHANGE COLUMN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnOrder {
    First,
    After(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexUsing {
    #[default]
    BTree,
    Hash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexConstraint {
    #[default]
    None,
    Unique,
    Primary,
    Spatial,
}

/// An indexed column with an optional prefix length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexColumn {
    pub name: String,
    pub length: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct IndexDefinition {
    pub name: Option<String>,
    pub using: IndexUsing,
    pub constraint: IndexConstraint,
    pub columns: Vec<IndexColumn>,
    pub comment: Option<String>,
    /// Driver configuration from a `WITH (key = value, ...)` clause.
    pub config: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ForeignKeyAction {
    #[default]
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKeyConstraint {
    pub name: Option<String>,
    pub columns: Vec<String>,
    pub parent_table: QualifiedName,
    pub parent_columns: Vec<String>,
    pub on_update: ForeignKeyAction,
    pub on_delete: ForeignKeyAction,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckConstraint {
    pub name: Option<String>,
    pub expr: Expression,
    pub enforced: bool,
}

/// One entry of a LOCK TABLES list. `write` covers both WRITE and
/// LOW_PRIORITY WRITE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLock {
    pub table: String,
    pub write: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerTime {
    Before,
    After,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerEvent {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSequence {
    Follows,
    Precedes,
}

/// FOLLOWS/PRECEDES ordering against a sibling trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerOrder {
    pub sequence: TriggerSequence,
    pub other_trigger: String,
}

/// Metadata of a CREATE TRIGGER statement. `create_text` is the full
/// statement source and `body_text` the body substring; both round-trip.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerDefinition {
    pub name: String,
    pub time: TriggerTime,
    pub event: TriggerEvent,
    pub table: QualifiedName,
    pub order: Option<TriggerOrder>,
    pub create_text: String,
    pub body_text: String,
    pub created_at: SystemTime,
}

/// Scope of one SET assignment target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetScope {
    /// Bare or `@@session.` system variable.
    Session,
    /// `@@global.` system variable.
    Global,
    /// `@name` user variable.
    User,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetVariable {
    pub scope: SetScope,
    pub name: String,
    pub value: Expression,
}
