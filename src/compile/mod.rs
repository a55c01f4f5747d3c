// Plan Compiler
//
// Converts parsed statements into logical plans. Statement families the
// parser handles by hand (SHOW, SET, ALTER TABLE and friends) never
// arrive here.

// Re-export public components
pub mod ddl;
pub mod dml;
pub mod expr;
pub mod query;
pub mod window;

use sqlparser::ast;

use crate::error::{ParseError, ParseResult};
use crate::plan::ddl::QualifiedName;
use crate::plan::node::LogicalPlan;
use crate::session::Session;

pub fn convert(session: &Session, statement: ast::Statement) -> ParseResult<LogicalPlan> {
    match &statement {
        ast::Statement::Query(select) => query::convert_query(session, select, true),
        ast::Statement::Insert(insert) => dml::convert_insert(session, insert),
        ast::Statement::Update {
            table,
            assignments,
            from,
            selection,
            returning,
            ..
        } => dml::convert_update(session, table, assignments, from, selection, returning),
        ast::Statement::Delete(delete) => dml::convert_delete(session, delete),
        ast::Statement::CreateTable(create) => ddl::convert_create_table(session, create),
        ast::Statement::Drop {
            object_type,
            if_exists,
            names,
            ..
        } => convert_drop(object_type, *if_exists, names),
        ast::Statement::Truncate { table_names, .. } => match table_names.as_slice() {
            [target] => Ok(LogicalPlan::Truncate {
                table: qualified_name(&target.name)?,
            }),
            _ => Err(ParseError::UnsupportedFeature(
                "truncating multiple tables in the same statement".to_string(),
            )),
        },
        ast::Statement::CreateDatabase {
            db_name,
            if_not_exists,
            ..
        } => Ok(LogicalPlan::CreateDatabase {
            name: qualified_name(db_name)?.name,
            if_not_exists: *if_not_exists,
        }),
        ast::Statement::CreateSchema {
            schema_name,
            if_not_exists,
            ..
        } => match schema_name {
            ast::SchemaName::Simple(name) => Ok(LogicalPlan::CreateDatabase {
                name: qualified_name(name)?.name,
                if_not_exists: *if_not_exists,
            }),
            other => Err(ParseError::UnsupportedSyntax(format!(
                "schema name {}",
                other
            ))),
        },
        ast::Statement::StartTransaction { modes, .. } => {
            let mut read_only = None;
            for mode in modes {
                match mode {
                    ast::TransactionMode::AccessMode(ast::TransactionAccessMode::ReadOnly) => {
                        read_only = Some(true);
                    }
                    ast::TransactionMode::AccessMode(ast::TransactionAccessMode::ReadWrite) => {
                        read_only = Some(false);
                    }
                    other => {
                        return Err(ParseError::UnsupportedFeature(format!(
                            "transaction mode {}",
                            other
                        )));
                    }
                }
            }
            Ok(LogicalPlan::StartTransaction { read_only })
        }
        ast::Statement::Commit { .. } => Ok(LogicalPlan::Commit),
        ast::Statement::Rollback { savepoint, .. } => match savepoint {
            Some(name) => Ok(LogicalPlan::RollbackSavepoint {
                name: name.value.clone(),
            }),
            None => Ok(LogicalPlan::Rollback),
        },
        ast::Statement::Savepoint { name } => Ok(LogicalPlan::Savepoint {
            name: name.value.clone(),
        }),
        other => Err(ParseError::UnsupportedFeature(other.to_string())),
    }
}

/// DROP TABLE accepts several tables but they must share one database.
fn convert_drop(
    object_type: &ast::ObjectType,
    if_exists: bool,
    names: &[ast::ObjectName],
) -> ParseResult<LogicalPlan> {
    match object_type {
        ast::ObjectType::Table => {
            let mut database: Option<String> = None;
            let mut tables = Vec::with_capacity(names.len());
            for (i, name) in names.iter().enumerate() {
                let qualified = qualified_name(name)?;
                if i == 0 {
                    database = qualified.database;
                } else if database != qualified.database {
                    return Err(ParseError::UnsupportedFeature(
                        "dropping tables on multiple databases in the same statement"
                            .to_string(),
                    ));
                }
                tables.push(qualified.name);
            }
            Ok(LogicalPlan::DropTable {
                database,
                tables,
                if_exists,
            })
        }
        ast::ObjectType::Database | ast::ObjectType::Schema => match names {
            [name] => Ok(LogicalPlan::DropDatabase {
                name: qualified_name(name)?.name,
                if_exists,
            }),
            _ => Err(ParseError::UnsupportedFeature(
                "dropping multiple databases in the same statement".to_string(),
            )),
        },
        other => Err(ParseError::UnsupportedFeature(format!("DROP {}", other))),
    }
}

/// A one- or two-part object name.
pub(crate) fn qualified_name(name: &ast::ObjectName) -> ParseResult<QualifiedName> {
    let mut parts = Vec::with_capacity(name.0.len());
    for part in &name.0 {
        match part {
            ast::ObjectNamePart::Identifier(ident) => parts.push(ident.value.clone()),
            other => {
                return Err(ParseError::UnsupportedSyntax(format!(
                    "object name {}",
                    other
                )));
            }
        }
    }
    match parts.len() {
        1 => Ok(QualifiedName {
            database: None,
            name: parts.pop().unwrap_or_default(),
        }),
        2 => {
            let name = parts.pop().unwrap_or_default();
            Ok(QualifiedName {
                database: parts.pop(),
                name,
            })
        }
        _ => Err(ParseError::UnsupportedSyntax(format!(
            "object name {}",
            name
        ))),
    }
}
