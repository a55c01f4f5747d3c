// Statement Parser
//
// Entry points for turning SQL text into logical plans. Comment-stripped
// statements are dispatched by keyword prefix: administrative and
// introspection grammars are parsed by hand, everything else goes through
// the MySQL-dialect statement parser and the plan compiler.

// Re-export public components
pub mod admin;
pub mod combinators;
pub mod ddl;
pub mod preparse;
pub mod show;

use sqlparser::dialect::MySqlDialect;
use sqlparser::parser::{Parser, ParserOptions};

use crate::compile;
use crate::error::{ParseError, ParseResult};
use crate::plan::node::LogicalPlan;
use crate::session::Session;

pub use self::preparse::strip_comments;

/// Parse a single statement into a logical plan. Empty or comment-only
/// input yields a no-op node rather than an error.
pub fn parse(session: &Session, sql: &str) -> ParseResult<LogicalPlan> {
    parse_statement(session, sql)
}

/// Parse the first `;`-terminated statement of `sql`. Returns the plan,
/// the consumed statement text (comments retained) and the unparsed
/// remainder.
pub fn parse_one<'a>(
    session: &Session,
    sql: &'a str,
) -> ParseResult<(LogicalPlan, &'a str, &'a str)> {
    let (consumed, remainder) = preparse::split_statement(sql);
    let plan = parse_statement(session, consumed)?;
    Ok((plan, consumed, remainder))
}

fn parse_statement(session: &Session, sql: &str) -> ParseResult<LogicalPlan> {
    let stripped = strip_comments(sql);
    let statement = preparse::trim_statement(&stripped);
    if statement.is_empty() {
        log::warn!("query was empty after trimming comments, so it will be a no-op");
        session.warn(1105, "query was empty after trimming comments");
        return Ok(LogicalPlan::Nothing);
    }

    let mut words = statement.split_whitespace().map(str::to_lowercase);
    let first = words.next().unwrap_or_default();
    let second = words.next().unwrap_or_default();

    match first.as_str() {
        "show" => show::parse_show(session, statement),
        "set" => admin::parse_set(session, statement),
        "use" => admin::parse_use(statement),
        "lock" => admin::parse_lock_tables(statement),
        "unlock" => admin::parse_unlock_tables(statement),
        "describe" | "desc" | "explain" => admin::parse_describe(session, statement),
        "rename" => ddl::parse_rename_table(statement),
        "release" => admin::parse_release_savepoint(statement),
        "create" => match second.as_str() {
            "index" | "unique" | "fulltext" | "spatial" => ddl::parse_create_index(statement),
            "view" => ddl::parse_create_view(session, statement),
            "trigger" => ddl::parse_create_trigger(session, statement),
            // CREATE OR REPLACE: the object keyword sits after REPLACE.
            "or" => match words.nth(1).unwrap_or_default().as_str() {
                "view" => ddl::parse_create_view(session, statement),
                _ => parse_ddl_statement(session, statement),
            },
            _ => parse_ddl_statement(session, statement),
        },
        "drop" => match second.as_str() {
            "index" => ddl::parse_drop_index(statement),
            "view" => ddl::parse_drop_view(statement),
            _ => parse_ddl_statement(session, statement),
        },
        "alter" => ddl::parse_alter_table(statement),
        "kill" => admin::parse_kill(statement),
        "truncate" => parse_ddl_statement(session, statement),
        _ => parse_general_statement(session, statement),
    }
}

fn parse_general_statement(session: &Session, sql: &str) -> ParseResult<LogicalPlan> {
    // The statement parser has no rule for a bare `AS OF` table suffix;
    // it is peeled off here and re-attached to the table scan after
    // compilation.
    if let Some((rewritten, table, value)) = preparse::split_as_of(sql) {
        let as_of = compile::expr::parse_expr_fragment(&value)?;
        let plan = parse_general_statement(session, &rewritten)?;
        return Ok(compile::query::attach_as_of(plan, &table, &as_of));
    }
    let dialect = MySqlDialect {};
    let statements =
        Parser::parse_sql(&dialect, sql).map_err(|e| ParseError::Syntax(e.to_string()))?;
    compile_single(session, statements)
}

/// DDL goes through the parser in strict mode; the permissive recovery
/// rules hide malformed column definitions otherwise.
fn parse_ddl_statement(session: &Session, sql: &str) -> ParseResult<LogicalPlan> {
    let dialect = MySqlDialect {};
    let statements = Parser::new(&dialect)
        .with_options(ParserOptions::new().with_trailing_commas(false))
        .try_with_sql(sql)
        .map_err(|e| ParseError::Syntax(e.to_string()))?
        .parse_statements()
        .map_err(|e| ParseError::Syntax(e.to_string()))?;
    compile_single(session, statements)
}

fn compile_single(
    session: &Session,
    mut statements: Vec<sqlparser::ast::Statement>,
) -> ParseResult<LogicalPlan> {
    match statements.len() {
        0 => Ok(LogicalPlan::Nothing),
        1 => compile::convert(session, statements.remove(0)),
        _ => Err(ParseError::UnsupportedSyntax(
            "expected a single statement".to_string(),
        )),
    }
}
