// Administrative DDL Grammars
//
// Hand-parsed CREATE/DROP INDEX, CREATE/DROP VIEW, CREATE TRIGGER and
// RENAME TABLE. View and trigger bodies are parsed recursively through
// the top-level entry point; their source text is captured verbatim so
// the definitions round-trip.

use std::collections::HashMap;

use crate::compile;
use crate::error::{ParseError, ParseResult};
use crate::parser;
use crate::parser::admin;
use crate::parser::combinators::Cursor;
use crate::parser::preparse::{split_statement, trim_statement};
use crate::plan::ddl::{
    CheckConstraint, ColumnDefinition, ColumnOrder, ForeignKeyAction, ForeignKeyConstraint,
    IndexColumn, IndexConstraint, IndexDefinition, IndexUsing, QualifiedName, TriggerDefinition,
    TriggerEvent, TriggerOrder, TriggerSequence, TriggerTime,
};
use crate::plan::node::LogicalPlan;
use crate::session::Session;

/// CREATE [UNIQUE|FULLTEXT|SPATIAL] INDEX name [USING method] ON table
/// (columns) [WITH (config)] [COMMENT text].
pub fn parse_create_index(sql: &str) -> ParseResult<LogicalPlan> {
    let mut cur = Cursor::new(sql);
    cur.skip_spaces();
    cur.expect("create")?;
    cur.skip_spaces();
    let constraint = match cur.optional(|c| c.one_of(&["unique", "fulltext", "spatial"]))? {
        Some(word) => match word.as_str() {
            "unique" => IndexConstraint::Unique,
            "spatial" => IndexConstraint::Spatial,
            _ => {
                return Err(ParseError::UnsupportedFeature(
                    "fulltext keys are unsupported".to_string(),
                ));
            }
        },
        None => IndexConstraint::None,
    };
    cur.skip_spaces();
    cur.expect("index")?;
    cur.skip_spaces();
    let name = cur.read_quotable_ident()?;
    if name == "primary" {
        return Err(ParseError::IncorrectIndexName(name));
    }
    cur.skip_spaces();
    let using = read_index_using(&mut cur)?;
    cur.skip_spaces();
    cur.expect("on")?;
    cur.skip_spaces();
    let (database, table) = cur.read_qualified_ident()?;
    let mut columns = Vec::new();
    for item in cur.read_exprs()? {
        columns.push(index_column(&item)?);
    }
    cur.skip_spaces();
    let config = if cur.optional(|c| c.expect("with"))?.is_some() {
        cur.read_key_value()?
    } else {
        HashMap::new()
    };
    cur.skip_spaces();
    let comment = if cur.optional(|c| c.expect("comment"))?.is_some() {
        cur.skip_spaces();
        Some(cur.read_value()?.into_string())
    } else {
        None
    };
    cur.skip_spaces();
    cur.check_eof()?;
    Ok(LogicalPlan::AlterCreateIndex {
        table: QualifiedName {
            database,
            name: table,
        },
        index: IndexDefinition {
            name: Some(name),
            using,
            constraint,
            columns,
            comment,
            config,
        },
    })
}

/// DROP INDEX name ON table.
pub fn parse_drop_index(sql: &str) -> ParseResult<LogicalPlan> {
    let mut cur = Cursor::new(sql);
    cur.skip_spaces();
    cur.expect("drop")?;
    cur.skip_spaces();
    cur.expect("index")?;
    cur.skip_spaces();
    let name = cur.read_quotable_ident()?;
    cur.skip_spaces();
    cur.expect("on")?;
    cur.skip_spaces();
    let (database, table) = cur.read_qualified_ident()?;
    cur.skip_spaces();
    cur.check_eof()?;
    Ok(LogicalPlan::AlterDropIndex {
        table: QualifiedName {
            database,
            name: table,
        },
        name,
    })
}

fn read_index_using(cur: &mut Cursor) -> ParseResult<IndexUsing> {
    if cur.optional(|c| c.expect("using"))?.is_some() {
        cur.skip_spaces();
        match cur.one_of(&["btree", "hash"])?.as_str() {
            "hash" => Ok(IndexUsing::Hash),
            _ => Ok(IndexUsing::BTree),
        }
    } else {
        Ok(IndexUsing::BTree)
    }
}

/// One item of an index column list: `name [(length)] [ASC|DESC]`. Any
/// item that is not a plain column reference is rejected; indexes over
/// expressions are not representable.
fn index_column(item: &str) -> ParseResult<IndexColumn> {
    let invalid = || ParseError::InvalidIndexExpression(item.to_string());
    let mut cur = Cursor::new(item);
    cur.skip_spaces();
    let name = cur.read_quotable_ident().map_err(|_| invalid())?;
    cur.skip_spaces();
    let mut length = None;
    if cur.peek() == Some('(') {
        cur.expect_char('(')?;
        cur.skip_spaces();
        let digits = cur.read_digits().map_err(|_| invalid())?;
        cur.skip_spaces();
        cur.expect_char(')').map_err(|_| invalid())?;
        let prefix: i64 = digits
            .parse()
            .map_err(|_| ParseError::InvalidIndexPrefix(digits.clone()))?;
        if prefix < 1 {
            return Err(ParseError::InvalidIndexPrefix(digits));
        }
        length = Some(prefix);
        cur.skip_spaces();
    }
    if !cur.eof() {
        let word = cur.read_ident();
        if word != "asc" && word != "desc" {
            return Err(ParseError::InvalidSortOrder(if word.is_empty() {
                item.to_string()
            } else {
                word
            }));
        }
        cur.skip_spaces();
        if !cur.eof() {
            return Err(invalid());
        }
    }
    Ok(IndexColumn { name, length })
}

/// CREATE [OR REPLACE] VIEW name [(columns)] AS select.
pub fn parse_create_view(session: &Session, sql: &str) -> ParseResult<LogicalPlan> {
    let mut cur = Cursor::new(sql);
    cur.skip_spaces();
    cur.expect("create")?;
    cur.skip_spaces();
    let or_replace = cur.multi_maybe(&["or", "replace"]);
    cur.skip_spaces();
    cur.expect("view")?;
    cur.skip_spaces();
    let (database, name) = cur
        .read_qualified_ident()
        .map_err(|_| ParseError::MalformedViewName(trim_statement(sql).to_string()))?;
    if cur.peek() == Some('.') {
        return Err(ParseError::MalformedViewName(format!("{:?}.{}", database, name)));
    }
    cur.skip_spaces();
    let columns = cur.maybe_list('(', ',', ')')?.unwrap_or_default();
    cur.skip_spaces();
    cur.expect("as")
        .map_err(|_| ParseError::MalformedViewDefinition(trim_statement(sql).to_string()))?;
    let definition = cur.read_remaining().trim().to_string();
    if definition.is_empty() {
        return Err(ParseError::MalformedViewDefinition(
            trim_statement(sql).to_string(),
        ));
    }
    let child = parser::parse(session, &definition)?;
    Ok(LogicalPlan::CreateView {
        name: QualifiedName { database, name },
        columns,
        child: Box::new(child),
        definition,
        or_replace,
    })
}

/// DROP VIEW [IF EXISTS] name [, name ...].
pub fn parse_drop_view(sql: &str) -> ParseResult<LogicalPlan> {
    let mut cur = Cursor::new(sql);
    cur.skip_spaces();
    cur.expect("drop")?;
    cur.skip_spaces();
    cur.expect("view")?;
    cur.skip_spaces();
    let if_exists = cur.multi_maybe(&["if", "exists"]);
    let views = cur
        .read_qualified_list()?
        .into_iter()
        .map(|(database, name)| QualifiedName { database, name })
        .collect();
    cur.skip_spaces();
    cur.check_eof()?;
    Ok(LogicalPlan::DropView { views, if_exists })
}

/// CREATE TRIGGER name BEFORE|AFTER INSERT|UPDATE|DELETE ON table FOR
/// EACH ROW [FOLLOWS|PRECEDES other] body. The body is a single statement
/// or a BEGIN ... END block.
pub fn parse_create_trigger(session: &Session, sql: &str) -> ParseResult<LogicalPlan> {
    let mut cur = Cursor::new(sql);
    cur.skip_spaces();
    cur.expect("create")?;
    cur.skip_spaces();
    cur.expect("trigger")?;
    cur.skip_spaces();
    let name = cur.read_quotable_ident()?;
    cur.skip_spaces();
    let time = match cur.one_of(&["before", "after"])?.as_str() {
        "before" => TriggerTime::Before,
        _ => TriggerTime::After,
    };
    cur.skip_spaces();
    let event = match cur.one_of(&["insert", "update", "delete"])?.as_str() {
        "insert" => TriggerEvent::Insert,
        "update" => TriggerEvent::Update,
        _ => TriggerEvent::Delete,
    };
    cur.skip_spaces();
    cur.expect("on")?;
    cur.skip_spaces();
    let (database, table) = cur.read_qualified_ident()?;
    cur.skip_spaces();
    cur.expect("for")?;
    cur.skip_spaces();
    cur.expect("each")?;
    cur.skip_spaces();
    cur.expect("row")?;
    cur.skip_spaces();
    let order = match cur.optional(|c| c.one_of(&["follows", "precedes"]))? {
        Some(word) => {
            cur.skip_spaces();
            let other_trigger = cur.read_quotable_ident()?;
            Some(TriggerOrder {
                sequence: if word == "follows" {
                    TriggerSequence::Follows
                } else {
                    TriggerSequence::Precedes
                },
                other_trigger,
            })
        }
        None => None,
    };
    let body_text = cur.read_remaining().trim().to_string();
    if body_text.is_empty() {
        return Err(ParseError::unexpected("trigger body", "EOF"));
    }
    let body = parse_trigger_body(session, &body_text)?;
    Ok(LogicalPlan::CreateTrigger {
        definition: TriggerDefinition {
            name,
            time,
            event,
            table: QualifiedName {
                database,
                name: table,
            },
            order,
            create_text: trim_statement(sql).to_string(),
            body_text,
            created_at: session.now(),
        },
        body: Box::new(body),
    })
}

fn parse_trigger_body(session: &Session, body: &str) -> ParseResult<LogicalPlan> {
    match block_interior(body) {
        Some(inner) => {
            let mut statements = Vec::new();
            let mut rest = inner;
            while !rest.trim().is_empty() {
                let (consumed, remainder) = split_statement(rest);
                if !consumed.is_empty() {
                    statements.push(parser::parse(session, consumed)?);
                }
                rest = remainder;
            }
            Ok(LogicalPlan::Block { statements })
        }
        None => parser::parse(session, body),
    }
}

/// The statements between BEGIN and END, if the body is a block.
fn block_interior(body: &str) -> Option<&str> {
    let trimmed = body.trim();
    if trimmed.len() < 8 {
        return None;
    }
    let (head, tail) = trimmed.split_at(5);
    if !head.eq_ignore_ascii_case("begin") || !tail.starts_with(|c: char| c.is_whitespace()) {
        return None;
    }
    let without_end = tail.trim_end().trim_end_matches(';');
    let cut = without_end.len().checked_sub(3)?;
    if !without_end.is_char_boundary(cut) || !without_end[cut..].eq_ignore_ascii_case("end") {
        return None;
    }
    Some(&without_end[..cut])
}

/// ALTER TABLE with a single operation: ADD/DROP/MODIFY/CHANGE/RENAME
/// COLUMN, ADD/DROP INDEX, ADD/DROP FOREIGN KEY, ADD CHECK, DROP
/// CONSTRAINT and RENAME TO.
pub fn parse_alter_table(sql: &str) -> ParseResult<LogicalPlan> {
    let mut cur = Cursor::new(sql);
    cur.skip_spaces();
    cur.expect("alter")?;
    cur.skip_spaces();
    cur.expect("table")?;
    cur.skip_spaces();
    let (database, name) = cur.read_qualified_ident()?;
    let table = QualifiedName { database, name };
    cur.skip_spaces();
    let plan = match cur.one_of(&["add", "drop", "modify", "change", "rename"])?.as_str() {
        "add" => alter_add(&mut cur, table)?,
        "drop" => alter_drop(&mut cur, table)?,
        "modify" => {
            cur.skip_spaces();
            cur.optional(|c| c.expect("column"))?;
            cur.skip_spaces();
            let column = column_definition(&mut cur)?;
            let order = column_order(&mut cur)?;
            LogicalPlan::ModifyColumn {
                table,
                column,
                order,
            }
        }
        "change" => {
            cur.skip_spaces();
            cur.optional(|c| c.expect("column"))?;
            cur.skip_spaces();
            let old_name = cur.read_quotable_ident()?;
            cur.skip_spaces();
            let column = column_definition(&mut cur)?;
            let order = column_order(&mut cur)?;
            LogicalPlan::ChangeColumn {
                table,
                old_name,
                column,
                order,
            }
        }
        _ => {
            cur.skip_spaces();
            if cur.optional(|c| c.expect("column"))?.is_some() {
                cur.skip_spaces();
                let from = cur.read_quotable_ident()?;
                cur.skip_spaces();
                cur.expect("to")?;
                cur.skip_spaces();
                let to = cur.read_quotable_ident()?;
                LogicalPlan::RenameColumn { table, from, to }
            } else {
                cur.optional(|c| c.one_of(&["to", "as"]))?;
                cur.skip_spaces();
                let (to_db, to) = cur.read_qualified_ident()?;
                LogicalPlan::RenameTable {
                    renames: vec![(
                        table,
                        QualifiedName {
                            database: to_db,
                            name: to,
                        },
                    )],
                }
            }
        }
    };
    cur.skip_spaces();
    if cur.peek() == Some(',') {
        return Err(ParseError::UnsupportedFeature(
            "multiple operations in a single ALTER TABLE".to_string(),
        ));
    }
    cur.check_eof()?;
    Ok(plan)
}

fn alter_add(cur: &mut Cursor, table: QualifiedName) -> ParseResult<LogicalPlan> {
    cur.skip_spaces();
    let save = cur.position();
    let word = cur.read_ident();
    match word.as_str() {
        "column" => {
            cur.skip_spaces();
            let column = column_definition(cur)?;
            let order = column_order(cur)?;
            Ok(LogicalPlan::AddColumn {
                table,
                column,
                order,
            })
        }
        "constraint" => {
            cur.skip_spaces();
            let save_name = cur.position();
            let first = cur.read_quotable_ident()?;
            let (name, kind) = if first == "foreign" || first == "check" {
                cur.rewind(save_name);
                (None, cur.one_of(&["foreign", "check"])?)
            } else {
                cur.skip_spaces();
                let kind = cur.read_ident();
                if kind != "foreign" && kind != "check" {
                    return Err(ParseError::UnknownConstraintDefinition(kind));
                }
                (Some(first), kind)
            };
            if kind == "foreign" {
                cur.skip_spaces();
                cur.expect("key")?;
                let constraint = foreign_key_body(cur, name)?;
                Ok(LogicalPlan::AlterAddForeignKey { table, constraint })
            } else {
                let check = check_body(cur, name)?;
                Ok(LogicalPlan::AlterAddCheck { table, check })
            }
        }
        "foreign" => {
            cur.skip_spaces();
            cur.expect("key")?;
            let constraint = foreign_key_body(cur, None)?;
            Ok(LogicalPlan::AlterAddForeignKey { table, constraint })
        }
        "check" => {
            let check = check_body(cur, None)?;
            Ok(LogicalPlan::AlterAddCheck { table, check })
        }
        "unique" => {
            cur.skip_spaces();
            cur.optional(|c| c.one_of(&["index", "key"]))?;
            let index = alter_index_body(cur, IndexConstraint::Unique)?;
            Ok(LogicalPlan::AlterCreateIndex { table, index })
        }
        "index" | "key" => {
            let index = alter_index_body(cur, IndexConstraint::None)?;
            Ok(LogicalPlan::AlterCreateIndex { table, index })
        }
        "primary" => Err(ParseError::UnsupportedFeature(
            "adding a primary key with ALTER TABLE".to_string(),
        )),
        _ => {
            cur.rewind(save);
            let column = column_definition(cur)?;
            let order = column_order(cur)?;
            Ok(LogicalPlan::AddColumn {
                table,
                column,
                order,
            })
        }
    }
}

fn alter_drop(cur: &mut Cursor, table: QualifiedName) -> ParseResult<LogicalPlan> {
    cur.skip_spaces();
    let save = cur.position();
    let word = cur.read_ident();
    match word.as_str() {
        "column" => {
            cur.skip_spaces();
            let column = cur.read_quotable_ident()?;
            Ok(LogicalPlan::DropColumn { table, column })
        }
        "index" | "key" => {
            cur.skip_spaces();
            let name = cur.read_quotable_ident()?;
            Ok(LogicalPlan::AlterDropIndex { table, name })
        }
        "foreign" => {
            cur.skip_spaces();
            cur.expect("key")?;
            cur.skip_spaces();
            let name = cur.read_quotable_ident()?;
            Ok(LogicalPlan::AlterDropForeignKey { table, name })
        }
        "constraint" => {
            cur.skip_spaces();
            let name = cur.read_quotable_ident()?;
            Ok(LogicalPlan::AlterDropConstraint { table, name })
        }
        "primary" => Err(ParseError::UnsupportedFeature(
            "dropping a primary key with ALTER TABLE".to_string(),
        )),
        _ => {
            cur.rewind(save);
            let column = cur.read_quotable_ident()?;
            Ok(LogicalPlan::DropColumn { table, column })
        }
    }
}

fn alter_index_body(cur: &mut Cursor, constraint: IndexConstraint) -> ParseResult<IndexDefinition> {
    cur.skip_spaces();
    let name = if cur.peek() == Some('(') {
        None
    } else {
        Some(cur.read_quotable_ident()?)
    };
    cur.skip_spaces();
    let using = read_index_using(cur)?;
    let mut columns = Vec::new();
    for item in cur.read_exprs()? {
        columns.push(index_column(&item)?);
    }
    Ok(IndexDefinition {
        name,
        using,
        constraint,
        columns,
        comment: None,
        config: HashMap::new(),
    })
}

fn foreign_key_body(cur: &mut Cursor, name: Option<String>) -> ParseResult<ForeignKeyConstraint> {
    cur.skip_spaces();
    let columns = required_column_list(cur)?;
    cur.skip_spaces();
    cur.expect("references")?;
    cur.skip_spaces();
    let (parent_db, parent_name) = cur.read_qualified_ident()?;
    cur.skip_spaces();
    let parent_columns = required_column_list(cur)?;
    let mut on_update = ForeignKeyAction::NoAction;
    let mut on_delete = ForeignKeyAction::NoAction;
    loop {
        cur.skip_spaces();
        if cur.optional(|c| c.expect("on"))?.is_none() {
            break;
        }
        cur.skip_spaces();
        let event = cur.one_of(&["delete", "update"])?;
        cur.skip_spaces();
        let action = referential_action(cur)?;
        if event == "delete" {
            on_delete = action;
        } else {
            on_update = action;
        }
    }
    Ok(ForeignKeyConstraint {
        name,
        columns,
        parent_table: QualifiedName {
            database: parent_db,
            name: parent_name,
        },
        parent_columns,
        on_update,
        on_delete,
    })
}

fn required_column_list(cur: &mut Cursor) -> ParseResult<Vec<String>> {
    match cur.maybe_list('(', ',', ')')? {
        Some(columns) => Ok(columns),
        None => Err(ParseError::unexpected(
            "a column list",
            cur.peek().map(|c| c.to_string()).unwrap_or_else(|| "EOF".to_string()),
        )),
    }
}

fn referential_action(cur: &mut Cursor) -> ParseResult<ForeignKeyAction> {
    match cur.one_of(&["restrict", "cascade", "set", "no"])?.as_str() {
        "restrict" => Ok(ForeignKeyAction::Restrict),
        "cascade" => Ok(ForeignKeyAction::Cascade),
        "set" => {
            cur.skip_spaces();
            match cur.one_of(&["null", "default"])?.as_str() {
                "null" => Ok(ForeignKeyAction::SetNull),
                _ => Ok(ForeignKeyAction::SetDefault),
            }
        }
        _ => {
            cur.skip_spaces();
            cur.expect("action")?;
            Ok(ForeignKeyAction::NoAction)
        }
    }
}

fn check_body(cur: &mut Cursor, name: Option<String>) -> ParseResult<CheckConstraint> {
    let text = cur.read_parenthesized()?;
    let expr = compile::expr::parse_expr_fragment(&text)?;
    cur.skip_spaces();
    let enforced = if cur.multi_maybe(&["not", "enforced"]) {
        false
    } else {
        cur.optional(|c| c.expect("enforced"))?;
        true
    };
    Ok(CheckConstraint {
        name,
        expr,
        enforced,
    })
}

fn column_order(cur: &mut Cursor) -> ParseResult<Option<ColumnOrder>> {
    cur.skip_spaces();
    match cur.optional(|c| c.one_of(&["first", "after"]))? {
        Some(word) if word == "after" => {
            cur.skip_spaces();
            Ok(Some(ColumnOrder::After(cur.read_quotable_ident()?)))
        }
        Some(_) => Ok(Some(ColumnOrder::First)),
        None => Ok(None),
    }
}

/// `name type [type attributes] [column options]`. The type is captured
/// as source text; resolving it is left to the analyzer.
fn column_definition(cur: &mut Cursor) -> ParseResult<ColumnDefinition> {
    let name = cur.read_quotable_ident()?;
    cur.skip_spaces();
    let type_name = read_type_name(cur)?;
    let mut not_null = false;
    let mut primary_key = false;
    let mut auto_increment = false;
    let mut default = None;
    let mut comment = None;
    loop {
        cur.skip_spaces();
        let save = cur.position();
        let word = cur.read_ident();
        match word.as_str() {
            "not" => {
                cur.skip_spaces();
                cur.expect("null")?;
                not_null = true;
            }
            "null" => {}
            "default" => {
                cur.skip_spaces();
                default = Some(if cur.peek() == Some('(') {
                    let text = cur.read_parenthesized()?;
                    compile::expr::parse_expr_fragment(&text)?
                } else {
                    admin::read_value_expression(cur)?
                });
            }
            "auto_increment" => auto_increment = true,
            "primary" => {
                cur.skip_spaces();
                cur.expect("key")?;
                primary_key = true;
            }
            "comment" => {
                cur.skip_spaces();
                comment = Some(cur.read_value()?.into_string());
            }
            "collate" => {
                cur.skip_spaces();
                cur.read_value()?;
            }
            "character" => {
                cur.skip_spaces();
                cur.expect("set")?;
                cur.skip_spaces();
                cur.read_value()?;
            }
            "unique" => {
                return Err(ParseError::UnsupportedFeature(
                    "inline UNIQUE on an altered column".to_string(),
                ));
            }
            _ => {
                cur.rewind(save);
                break;
            }
        }
    }
    Ok(ColumnDefinition {
        name,
        type_name,
        nullable: !primary_key && !not_null,
        default,
        auto_increment,
        primary_key,
        comment,
    })
}

fn read_type_name(cur: &mut Cursor) -> ParseResult<String> {
    let mut type_name = cur.read_ident();
    if type_name.is_empty() {
        return Err(ParseError::unexpected(
            "a column type",
            cur.peek().map(|c| c.to_string()).unwrap_or_else(|| "EOF".to_string()),
        ));
    }
    if cur.peek() == Some('(') {
        let args = cur.read_parenthesized()?;
        type_name.push('(');
        type_name.push_str(&args);
        type_name.push(')');
    }
    loop {
        let save = cur.position();
        cur.skip_spaces();
        let word = cur.read_ident();
        if word == "unsigned" || word == "zerofill" {
            type_name.push(' ');
            type_name.push_str(&word);
        } else {
            cur.rewind(save);
            break;
        }
    }
    Ok(type_name)
}

/// RENAME TABLE a TO b [, c TO d ...].
pub fn parse_rename_table(sql: &str) -> ParseResult<LogicalPlan> {
    let mut cur = Cursor::new(sql);
    cur.skip_spaces();
    cur.expect("rename")?;
    cur.skip_spaces();
    cur.expect("table")?;
    let mut renames = Vec::new();
    loop {
        cur.skip_spaces();
        let (from_db, from) = cur.read_qualified_ident()?;
        cur.skip_spaces();
        cur.expect("to")?;
        cur.skip_spaces();
        let (to_db, to) = cur.read_qualified_ident()?;
        renames.push((
            QualifiedName {
                database: from_db,
                name: from,
            },
            QualifiedName {
                database: to_db,
                name: to,
            },
        ));
        cur.skip_spaces();
        if cur.peek() == Some(',') {
            cur.expect_char(',')?;
        } else {
            break;
        }
    }
    cur.check_eof()?;
    Ok(LogicalPlan::RenameTable { renames })
}
