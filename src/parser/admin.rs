// Administrative Statement Grammars
//
// Hand-parsed SET, USE, LOCK/UNLOCK TABLES, DESCRIBE/EXPLAIN and RELEASE
// SAVEPOINT. SET statements are first rewritten textually so bare
// `SESSION x` / `GLOBAL x` targets become the canonical `@@scope.x`
// spelling, then parsed as an assignment list.

use crate::compile;
use crate::error::{ParseError, ParseResult};
use crate::parser;
use crate::parser::combinators::{Cursor, ValueToken};
use crate::plan::ddl::{QualifiedName, SetScope, SetVariable, TableLock};
use crate::plan::expr::{Expression, Value};
use crate::plan::node::{KillKind, LogicalPlan};
use crate::session::Session;

/// Rewrite `SET [SESSION|GLOBAL] name = value, ...` so every scoped bare
/// target uses the `@@scope.name` form. Statements that are not SET, and
/// assignments already in canonical form, pass through unchanged.
pub fn fix_set_query(sql: &str) -> String {
    let trimmed = sql.trim();
    let Some(rest) = strip_keyword(trimmed, "set") else {
        return sql.to_string();
    };
    let rewritten: Vec<String> = split_assignments(rest)
        .into_iter()
        .map(|fragment| {
            let fragment = fragment.trim();
            for scope in ["session", "global"] {
                if let Some(tail) = strip_keyword(fragment, scope) {
                    if tail.starts_with(|c: char| c.is_alphabetic() || c == '`') {
                        return format!("@@{}.{}", scope, tail);
                    }
                }
            }
            fragment.to_string()
        })
        .collect();
    format!("SET {}", rewritten.join(", "))
}

/// Strip a leading keyword followed by at least one whitespace character,
/// case-insensitively. Returns the trimmed tail on a match.
fn strip_keyword<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    if text.len() <= keyword.len() || !text[..keyword.len()].eq_ignore_ascii_case(keyword) {
        return None;
    }
    let tail = &text[keyword.len()..];
    if tail.starts_with(|c: char| c.is_whitespace()) {
        Some(tail.trim_start())
    } else {
        None
    }
}

/// Top-level comma split, quote-aware.
fn split_assignments(text: &str) -> Vec<String> {
    let mut fragments = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            current.push(c);
            if c == '\\' && q != '`' {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' | '`' => {
                quote = Some(c);
                current.push(c);
            }
            ',' => {
                fragments.push(current);
                current = String::new();
            }
            _ => current.push(c),
        }
    }
    fragments.push(current);
    fragments
}

pub fn parse_set(session: &Session, sql: &str) -> ParseResult<LogicalPlan> {
    let rewritten = fix_set_query(sql);
    let mut cur = Cursor::new(&rewritten);
    cur.skip_spaces();
    cur.expect("set")?;
    cur.skip_spaces();

    // SET NAMES and SET CHARSET shorthands, unless "names"/"charset" is
    // itself an assignment target.
    let save = cur.position();
    let word = cur.read_ident();
    cur.skip_spaces();
    let is_assignment = cur.peek() == Some('=');
    cur.rewind(save);
    if !is_assignment {
        match word.as_str() {
            "names" => return set_names(&mut cur),
            "charset" => return set_charset(session, &mut cur, false),
            "character" => return set_charset(session, &mut cur, true),
            _ => {}
        }
    }

    let mut variables = Vec::new();
    for fragment in split_assignments(cur.read_remaining().trim()) {
        variables.push(parse_assignment(fragment.trim())?);
    }
    Ok(LogicalPlan::Set { variables })
}

/// SET NAMES charset [COLLATE collation]: expands to the three client
/// character set variables.
fn set_names(cur: &mut Cursor) -> ParseResult<LogicalPlan> {
    cur.expect("names")?;
    cur.skip_spaces();
    let charset = cur.read_value()?.into_string();
    cur.skip_spaces();
    if cur.optional(|c| c.expect("collate"))?.is_some() {
        cur.skip_spaces();
        cur.read_value()?;
        cur.skip_spaces();
    }
    cur.check_eof()?;
    let variables = [
        "character_set_client",
        "character_set_connection",
        "character_set_results",
    ]
    .iter()
    .map(|name| SetVariable {
        scope: SetScope::Session,
        name: name.to_string(),
        value: Expression::Literal(Value::String(charset.clone())),
    })
    .collect();
    Ok(LogicalPlan::Set { variables })
}

/// SET CHARSET / SET CHARACTER SET charset: client and results take the
/// given charset; the connection charset follows the current database.
fn set_charset(session: &Session, cur: &mut Cursor, long_form: bool) -> ParseResult<LogicalPlan> {
    if long_form {
        cur.expect("character")?;
        cur.skip_spaces();
        cur.expect("set")?;
    } else {
        cur.expect("charset")?;
    }
    cur.skip_spaces();
    let charset = cur.read_value()?.into_string();
    cur.skip_spaces();
    cur.check_eof()?;
    let database_charset = match session.variable("character_set_database") {
        Some(value) => value.clone(),
        None => Value::String("utf8mb4".to_string()),
    };
    let variables = vec![
        SetVariable {
            scope: SetScope::Session,
            name: "character_set_client".to_string(),
            value: Expression::Literal(Value::String(charset.clone())),
        },
        SetVariable {
            scope: SetScope::Session,
            name: "character_set_results".to_string(),
            value: Expression::Literal(Value::String(charset)),
        },
        SetVariable {
            scope: SetScope::Session,
            name: "character_set_connection".to_string(),
            value: Expression::Literal(database_charset),
        },
    ];
    Ok(LogicalPlan::Set { variables })
}

fn parse_assignment(fragment: &str) -> ParseResult<SetVariable> {
    let mut cur = Cursor::new(fragment);
    cur.skip_spaces();
    let scope = if cur.maybe("@@global.") {
        SetScope::Global
    } else if cur.maybe("@@session.") {
        SetScope::Session
    } else if cur.maybe("@@") {
        SetScope::Session
    } else if cur.maybe("@") {
        SetScope::User
    } else {
        SetScope::Session
    };
    let name = cur.read_quotable_ident()?;
    cur.skip_spaces();
    cur.expect_char('=')?;
    cur.skip_spaces();
    let value = read_value_expression(&mut cur)?;
    cur.skip_spaces();
    cur.check_eof()?;
    Ok(SetVariable { scope, name, value })
}

/// A scalar literal: quoted string, boolean word, integer (narrowed),
/// float, the DEFAULT keyword, or a bare word kept as a string.
pub(crate) fn read_value_expression(cur: &mut Cursor) -> ParseResult<Expression> {
    match cur.read_value()? {
        ValueToken::Quoted(text) => Ok(Expression::Literal(Value::String(text))),
        ValueToken::Bare(text) => {
            if text.eq_ignore_ascii_case("default") {
                return Ok(Expression::DefaultMarker);
            }
            if text.eq_ignore_ascii_case("on") || text.eq_ignore_ascii_case("true") {
                return Ok(Expression::Literal(Value::Boolean(true)));
            }
            if text.eq_ignore_ascii_case("off") || text.eq_ignore_ascii_case("false") {
                return Ok(Expression::Literal(Value::Boolean(false)));
            }
            let digits = text.strip_prefix('-').unwrap_or(&text);
            if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
                return Ok(Expression::Literal(compile::expr::convert_integer(&text, 10)?));
            }
            if let Ok(float) = text.parse::<f64>() {
                return Ok(Expression::Literal(Value::Float64(float)));
            }
            Ok(Expression::Literal(Value::String(text)))
        }
    }
}

pub fn parse_use(sql: &str) -> ParseResult<LogicalPlan> {
    let mut cur = Cursor::new(sql);
    cur.skip_spaces();
    cur.expect("use")?;
    cur.skip_spaces();
    let database = cur.read_quotable_ident()?;
    cur.skip_spaces();
    cur.check_eof()?;
    Ok(LogicalPlan::Use { database })
}

/// LOCK TABLES t [AS alias] READ [LOCAL] | [LOW_PRIORITY] WRITE, ...
pub fn parse_lock_tables(sql: &str) -> ParseResult<LogicalPlan> {
    let mut cur = Cursor::new(sql);
    cur.skip_spaces();
    cur.expect("lock")?;
    cur.skip_spaces();
    cur.expect("tables")?;
    let mut locks = Vec::new();
    loop {
        cur.skip_spaces();
        let (database, name) = cur.read_qualified_ident()?;
        let table = match database {
            Some(db) => format!("{}.{}", db, name),
            None => name,
        };
        cur.skip_spaces();
        if cur.optional(|c| c.expect("as"))?.is_some() {
            cur.skip_spaces();
            cur.read_quotable_ident()?;
            cur.skip_spaces();
        }
        let write = if cur.optional(|c| c.expect("read"))?.is_some() {
            cur.skip_spaces();
            cur.optional(|c| c.expect("local"))?;
            false
        } else {
            cur.optional(|c| c.expect("low_priority"))?;
            cur.skip_spaces();
            cur.expect("write")?;
            true
        };
        locks.push(TableLock { table, write });
        cur.skip_spaces();
        if cur.peek() == Some(',') {
            cur.expect_char(',')?;
        } else {
            break;
        }
    }
    cur.check_eof()?;
    Ok(LogicalPlan::LockTables { locks })
}

pub fn parse_unlock_tables(sql: &str) -> ParseResult<LogicalPlan> {
    let mut cur = Cursor::new(sql);
    cur.skip_spaces();
    cur.expect("unlock")?;
    cur.skip_spaces();
    cur.expect("tables")?;
    cur.skip_spaces();
    cur.check_eof()?;
    Ok(LogicalPlan::UnlockTables)
}

/// DESCRIBE/DESC/EXPLAIN. A bare table name maps to SHOW COLUMNS; a
/// statement is re-parsed and wrapped in DescribeQuery. Only the `tree`
/// output format is supported.
pub fn parse_describe(session: &Session, sql: &str) -> ParseResult<LogicalPlan> {
    let mut cur = Cursor::new(sql);
    cur.skip_spaces();
    cur.one_of(&["describe", "desc", "explain"])?;
    cur.skip_spaces();

    if cur
        .optional(|c| {
            c.expect("format")?;
            c.skip_spaces();
            c.expect_char('=')
        })?
        .is_some()
    {
        cur.skip_spaces();
        let format = cur.read_value()?.into_string();
        if !format.eq_ignore_ascii_case("tree") {
            return Err(ParseError::InvalidDescribeFormat {
                format,
                supported: "tree".to_string(),
            });
        }
        let rest = cur.read_remaining();
        let child = parser::parse(session, rest.trim())?;
        return Ok(LogicalPlan::DescribeQuery {
            format: "tree".to_string(),
            child: Box::new(child),
        });
    }

    let save = cur.position();
    let keyword = cur.read_ident();
    cur.rewind(save);
    if matches!(
        keyword.as_str(),
        "select" | "insert" | "update" | "delete" | "with" | "replace"
    ) {
        let rest = cur.read_remaining();
        let child = parser::parse(session, rest.trim())?;
        return Ok(LogicalPlan::DescribeQuery {
            format: "tree".to_string(),
            child: Box::new(child),
        });
    }

    let (database, name) = cur.read_qualified_ident()?;
    cur.skip_spaces();
    cur.check_eof()?;
    Ok(LogicalPlan::ShowColumns {
        table: QualifiedName { database, name },
        full: false,
    })
}

/// KILL [CONNECTION|QUERY] id. The connection form is the default.
pub fn parse_kill(sql: &str) -> ParseResult<LogicalPlan> {
    let mut cur = Cursor::new(sql);
    cur.skip_spaces();
    cur.expect("kill")?;
    cur.skip_spaces();
    let kind = match cur.optional(|c| c.one_of(&["connection", "query"]))? {
        Some(word) if word == "query" => KillKind::Query,
        _ => KillKind::Connection,
    };
    cur.skip_spaces();
    let digits = cur.read_digits()?;
    let connection_id = digits
        .parse::<u64>()
        .map_err(|_| ParseError::invalid_value(digits, "connection id out of range"))?;
    cur.skip_spaces();
    cur.check_eof()?;
    Ok(LogicalPlan::Kill {
        kind,
        connection_id,
    })
}

pub fn parse_release_savepoint(sql: &str) -> ParseResult<LogicalPlan> {
    let mut cur = Cursor::new(sql);
    cur.skip_spaces();
    cur.expect("release")?;
    cur.skip_spaces();
    cur.expect("savepoint")?;
    cur.skip_spaces();
    let name = cur.read_quotable_ident()?;
    cur.skip_spaces();
    cur.check_eof()?;
    Ok(LogicalPlan::ReleaseSavepoint { name })
}
