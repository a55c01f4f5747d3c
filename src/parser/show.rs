// SHOW Statement Grammars
//
// Hand-parsed SHOW variants. Each variant produces its introspection node
// directly; a trailing LIKE or WHERE clause wraps the node in a Filter
// over the variant's synthetic column (Tables_in_<db>, Field, Database,
// Name, Collation, Variable_name).

use crate::compile;
use crate::error::{ParseError, ParseResult};
use crate::parser::combinators::Cursor;
use crate::plan::ddl::QualifiedName;
use crate::plan::expr::Expression;
use crate::plan::node::LogicalPlan;
use crate::session::Session;

pub fn parse_show(session: &Session, sql: &str) -> ParseResult<LogicalPlan> {
    let mut cur = Cursor::new(sql);
    cur.skip_spaces();
    cur.expect("show")?;
    cur.skip_spaces();

    if cur
        .optional(|c| {
            c.expect("count")?;
            c.skip_spaces();
            c.expect_char('(')?;
            c.skip_spaces();
            c.expect_char('*')?;
            c.skip_spaces();
            c.expect_char(')')?;
            c.skip_spaces();
            c.expect("warnings")
        })?
        .is_some()
    {
        return Err(ParseError::UnsupportedFeature(
            "SHOW COUNT(*) WARNINGS".to_string(),
        ));
    }

    let keyword = cur.read_ident();
    match keyword.as_str() {
        "variables" => show_variables(&mut cur, false),
        "global" | "session" => {
            cur.skip_spaces();
            cur.expect("variables")?;
            show_variables(&mut cur, keyword == "global")
        }
        "warnings" => show_warnings(session, &mut cur),
        "processlist" => {
            finish(&mut cur)?;
            Ok(LogicalPlan::ShowProcessList)
        }
        "full" => {
            cur.skip_spaces();
            let target = cur.one_of(&["processlist", "tables", "columns", "fields"])?;
            match target.as_str() {
                "processlist" => {
                    finish(&mut cur)?;
                    Ok(LogicalPlan::ShowProcessList)
                }
                "tables" => show_tables(session, &mut cur, true),
                _ => show_columns(&mut cur, true),
            }
        }
        "tables" => show_tables(session, &mut cur, false),
        "columns" | "fields" => show_columns(&mut cur, false),
        "databases" | "schemas" => {
            filtered(&mut cur, "Database", LogicalPlan::ShowDatabases)
        }
        "collation" => filtered(&mut cur, "Collation", LogicalPlan::ShowCollation),
        "table" => {
            cur.skip_spaces();
            cur.expect("status")?;
            cur.skip_spaces();
            let database = from_or_in(&mut cur)?;
            filtered(&mut cur, "Name", LogicalPlan::ShowTableStatus { database })
        }
        "create" => show_create(&mut cur),
        "index" | "indexes" | "keys" => {
            cur.skip_spaces();
            cur.one_of(&["from", "in"])?;
            cur.skip_spaces();
            let (database, name) = cur.read_qualified_ident()?;
            cur.skip_spaces();
            let database = match from_or_in(&mut cur)? {
                Some(db) => Some(db),
                None => database,
            };
            finish(&mut cur)?;
            Ok(LogicalPlan::ShowIndexes {
                table: QualifiedName { database, name },
            })
        }
        other => Err(ParseError::UnsupportedFeature(format!("SHOW {}", other))),
    }
}

fn show_variables(cur: &mut Cursor, global: bool) -> ParseResult<LogicalPlan> {
    filtered(cur, "Variable_name", LogicalPlan::ShowVariables { global })
}

/// SHOW WARNINGS [LIMIT [offset,] count]. The warning list is snapshotted
/// at parse time; a literal offset of zero is elided.
fn show_warnings(session: &Session, cur: &mut Cursor) -> ParseResult<LogicalPlan> {
    let mut node = LogicalPlan::ShowWarnings {
        warnings: session.warnings(),
    };
    cur.skip_spaces();
    if cur.optional(|c| c.expect("limit"))?.is_some() {
        cur.skip_spaces();
        let first = cur.read_digits()?;
        cur.skip_spaces();
        let (offset, count) = if cur.peek() == Some(',') {
            cur.expect_char(',')?;
            cur.skip_spaces();
            let second = cur.read_digits()?;
            (Some(first), second)
        } else {
            (None, first)
        };
        if let Some(offset) = offset {
            if offset != "0" {
                node = LogicalPlan::Offset {
                    count: Expression::Literal(compile::expr::convert_integer(&offset, 10)?),
                    child: Box::new(node),
                };
            }
        }
        node = LogicalPlan::Limit {
            count: Expression::Literal(compile::expr::convert_integer(&count, 10)?),
            child: Box::new(node),
        };
    }
    finish(cur)?;
    Ok(node)
}

fn show_tables(session: &Session, cur: &mut Cursor, full: bool) -> ParseResult<LogicalPlan> {
    cur.skip_spaces();
    let database = from_or_in(cur)?;
    let column = format!(
        "Tables_in_{}",
        database.as_deref().unwrap_or_else(|| session.database())
    );
    filtered(cur, &column, LogicalPlan::ShowTables { database, full })
}

fn show_columns(cur: &mut Cursor, full: bool) -> ParseResult<LogicalPlan> {
    cur.skip_spaces();
    cur.one_of(&["from", "in"])?;
    cur.skip_spaces();
    let (database, name) = cur.read_qualified_ident()?;
    cur.skip_spaces();
    let database = match from_or_in(cur)? {
        Some(db) => Some(db),
        None => database,
    };
    filtered(
        cur,
        "Field",
        LogicalPlan::ShowColumns {
            table: QualifiedName { database, name },
            full,
        },
    )
}

fn show_create(cur: &mut Cursor) -> ParseResult<LogicalPlan> {
    cur.skip_spaces();
    let kind = cur.one_of(&["table", "view", "database", "schema"])?;
    cur.skip_spaces();
    match kind.as_str() {
        "table" => {
            let (database, name) = cur.read_qualified_ident()?;
            finish(cur)?;
            Ok(LogicalPlan::ShowCreateTable {
                table: QualifiedName { database, name },
            })
        }
        "view" => {
            let (database, name) = cur.read_qualified_ident()?;
            finish(cur)?;
            Ok(LogicalPlan::ShowCreateView {
                view: QualifiedName { database, name },
            })
        }
        _ => {
            let if_not_exists = cur.multi_maybe(&["if", "not", "exists"]);
            cur.skip_spaces();
            let database = cur.read_quotable_ident()?;
            finish(cur)?;
            Ok(LogicalPlan::ShowCreateDatabase {
                database,
                if_not_exists,
            })
        }
    }
}

/// Optionally wrap `node` in a Filter from a trailing LIKE or WHERE
/// clause; LIKE matches against the variant's synthetic `column`.
fn filtered(cur: &mut Cursor, column: &str, node: LogicalPlan) -> ParseResult<LogicalPlan> {
    cur.skip_spaces();
    if cur.optional(|c| c.expect("like"))?.is_some() {
        cur.skip_spaces();
        let pattern = cur.read_value()?.into_string();
        finish(cur)?;
        return Ok(LogicalPlan::filter(
            Expression::Like {
                expr: Box::new(Expression::column(column)),
                pattern: Box::new(Expression::Literal(crate::plan::expr::Value::String(pattern))),
                escape: None,
            },
            node,
        ));
    }
    if cur.optional(|c| c.expect("where"))?.is_some() {
        let fragment = cur.read_remaining();
        let predicate = compile::expr::parse_expr_fragment(fragment.trim())?;
        return Ok(LogicalPlan::filter(predicate, node));
    }
    finish(cur)?;
    Ok(node)
}

fn from_or_in(cur: &mut Cursor) -> ParseResult<Option<String>> {
    if cur.optional(|c| c.one_of(&["from", "in"]))?.is_some() {
        cur.skip_spaces();
        Ok(Some(cur.read_quotable_ident()?))
    } else {
        Ok(None)
    }
}

fn finish(cur: &mut Cursor) -> ParseResult<()> {
    cur.skip_spaces();
    cur.check_eof()
}
