// DML Compiler
//
// INSERT, REPLACE, UPDATE and DELETE statements. Each produces a plan
// whose leaf is the unresolved target table.

use sqlparser::ast;

use crate::compile::expr::{convert_expr, convert_sort_field};
use crate::compile::{qualified_name, query};
use crate::error::{ParseError, ParseResult};
use crate::plan::expr::Expression;
use crate::plan::node::{LogicalPlan, UpdateAssignment};
use crate::session::Session;

pub(crate) fn convert_insert(session: &Session, insert: &ast::Insert) -> ParseResult<LogicalPlan> {
    if insert.on.is_some() {
        return Err(ParseError::UnsupportedFeature(
            "ON DUPLICATE KEY".to_string(),
        ));
    }
    if insert.ignore {
        return Err(ParseError::UnsupportedFeature("INSERT IGNORE".to_string()));
    }
    if insert.returning.is_some() {
        return Err(ParseError::UnsupportedFeature(
            "INSERT RETURNING".to_string(),
        ));
    }
    let table = match &insert.table {
        ast::TableObject::TableName(name) => LogicalPlan::UnresolvedTable {
            name: qualified_name(name)?,
            as_of: None,
        },
        other => {
            return Err(ParseError::UnsupportedFeature(format!(
                "insert target {}",
                other
            )));
        }
    };
    let columns = insert
        .columns
        .iter()
        .map(|column| column.value.clone())
        .collect();
    let source = match &insert.source {
        Some(source) => query::convert_query(session, source, false)?,
        None => {
            return Err(ParseError::UnsupportedFeature(
                "INSERT without a source".to_string(),
            ));
        }
    };
    Ok(LogicalPlan::Insert {
        table: Box::new(table),
        columns,
        source: Box::new(mark_defaults(source)),
        is_replace: insert.replace_into,
    })
}

/// The parser reads a bare DEFAULT in a VALUES row as a column reference;
/// rewrite those into explicit default markers.
fn mark_defaults(source: LogicalPlan) -> LogicalPlan {
    match source {
        LogicalPlan::Values { rows } => LogicalPlan::Values {
            rows: rows
                .into_iter()
                .map(|row| {
                    row.into_iter()
                        .map(|expr| match expr {
                            Expression::UnresolvedColumn { table: None, name }
                                if name.eq_ignore_ascii_case("default") =>
                            {
                                Expression::DefaultMarker
                            }
                            other => other,
                        })
                        .collect()
                })
                .collect(),
        },
        other => other,
    }
}

pub(crate) fn convert_update(
    session: &Session,
    table: &ast::TableWithJoins,
    assignments: &[ast::Assignment],
    from: &Option<ast::UpdateTableFromKind>,
    selection: &Option<ast::Expr>,
    returning: &Option<Vec<ast::SelectItem>>,
) -> ParseResult<LogicalPlan> {
    if from.is_some() {
        return Err(ParseError::UnsupportedFeature("UPDATE FROM".to_string()));
    }
    if returning.is_some() {
        return Err(ParseError::UnsupportedFeature(
            "UPDATE RETURNING".to_string(),
        ));
    }
    let mut child = query::convert_table_with_joins(session, table)?;
    if let Some(selection) = selection {
        child = LogicalPlan::filter(convert_expr(session, selection)?, child);
    }
    let mut converted = Vec::with_capacity(assignments.len());
    for assignment in assignments {
        let column = match &assignment.target {
            ast::AssignmentTarget::ColumnName(name) => assignment_column(name)?,
            other => {
                return Err(ParseError::UnsupportedFeature(format!(
                    "assignment target {}",
                    other
                )));
            }
        };
        let value = match &assignment.value {
            ast::Expr::Identifier(ident) if ident.value.eq_ignore_ascii_case("default") => {
                Expression::DefaultMarker
            }
            expr => convert_expr(session, expr)?,
        };
        converted.push(UpdateAssignment { column, value });
    }
    Ok(LogicalPlan::Update {
        assignments: converted,
        child: Box::new(child),
    })
}

fn assignment_column(name: &ast::ObjectName) -> ParseResult<Expression> {
    let parts: Vec<&str> = name
        .0
        .iter()
        .map(|part| match part {
            ast::ObjectNamePart::Identifier(ident) => Ok(ident.value.as_str()),
            other => Err(ParseError::UnsupportedSyntax(format!(
                "assignment target {}",
                other
            ))),
        })
        .collect::<ParseResult<_>>()?;
    match parts.as_slice() {
        [column] => Ok(Expression::column(*column)),
        [table, column] => Ok(Expression::qualified_column(*table, *column)),
        _ => Err(ParseError::UnsupportedSyntax(format!(
            "assignment target {}",
            name
        ))),
    }
}

pub(crate) fn convert_delete(session: &Session, delete: &ast::Delete) -> ParseResult<LogicalPlan> {
    if !delete.tables.is_empty() {
        return Err(ParseError::UnsupportedFeature(
            "multi-table DELETE".to_string(),
        ));
    }
    if delete.using.as_ref().is_some_and(|using| !using.is_empty()) {
        return Err(ParseError::UnsupportedFeature("DELETE USING".to_string()));
    }
    if delete.returning.is_some() {
        return Err(ParseError::UnsupportedFeature(
            "DELETE RETURNING".to_string(),
        ));
    }
    let from = match &delete.from {
        ast::FromTable::WithFromKeyword(tables) | ast::FromTable::WithoutKeyword(tables) => tables,
    };
    let [table] = from.as_slice() else {
        return Err(ParseError::UnsupportedFeature(
            "DELETE from multiple tables".to_string(),
        ));
    };
    let mut child = query::convert_table_with_joins(session, table)?;
    if let Some(selection) = &delete.selection {
        child = LogicalPlan::filter(convert_expr(session, selection)?, child);
    }
    if !delete.order_by.is_empty() {
        let mut fields = Vec::with_capacity(delete.order_by.len());
        for order in &delete.order_by {
            fields.push(convert_sort_field(session, order)?);
        }
        child = LogicalPlan::Sort {
            fields,
            child: Box::new(child),
        };
    }
    if let Some(limit) = &delete.limit {
        child = LogicalPlan::Limit {
            count: convert_expr(session, limit)?,
            child: Box::new(child),
        };
    }
    Ok(LogicalPlan::Delete {
        child: Box::new(child),
    })
}
