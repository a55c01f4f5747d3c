use anyhow::{Result, anyhow};
use sqlfront::parser::{parse, parse_one, strip_comments};
use sqlfront::plan::node::LogicalPlan;
use sqlfront::{ParseError, Session};

#[test]
fn test_simple_select_statement() -> Result<()> {
    // Test basic parse functionality
    let session = Session::new("mydb");
    let sql = "SELECT id, name FROM test_table WHERE id > 5";

    let plan = parse(&session, sql).map_err(|e| anyhow!("Parse error: {:?}", e))?;

    // Verify the operator stack: Project over Filter over the table scan
    if let LogicalPlan::Project { projections, child } = plan {
        assert_eq!(projections.len(), 2);
        if let LogicalPlan::Filter { child, .. } = *child {
            if let LogicalPlan::UnresolvedTable { name, .. } = *child {
                assert_eq!(name.name, "test_table");
            } else {
                panic!("Expected table scan under Filter");
            }
        } else {
            panic!("Expected Filter under Project");
        }
    } else {
        panic!("Expected Project at the root");
    }

    Ok(())
}

#[test]
fn test_empty_statement_is_noop() -> Result<()> {
    // Empty and comment-only input parse to a no-op and leave a warning
    let session = Session::new("mydb");

    let plan = parse(&session, "   \t  ").map_err(|e| anyhow!("Parse error: {:?}", e))?;
    assert_eq!(plan, LogicalPlan::Nothing);
    assert_eq!(session.warnings().len(), 1);

    session.clear_warnings();
    let plan = parse(&session, "-- just a comment\n/* and another */")
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;
    assert_eq!(plan, LogicalPlan::Nothing);
    assert_eq!(session.warnings().len(), 1);

    Ok(())
}

#[test]
fn test_comments_are_stripped_before_parsing() -> Result<()> {
    let session = Session::new("mydb");
    let sql = "SELECT a /* inline */ FROM t -- trailing\nWHERE a = 1";

    let plan = parse(&session, sql).map_err(|e| anyhow!("Parse error: {:?}", e))?;
    assert!(matches!(plan, LogicalPlan::Project { .. }));

    Ok(())
}

#[test]
fn test_strip_comments_is_idempotent() {
    let sql = "SELECT 'a -- literal' /* gone */ FROM t # tail";
    let once = strip_comments(sql);
    let twice = strip_comments(&once);
    assert_eq!(once, twice);
    // Quoted comment markers survive
    assert!(once.contains("'a -- literal'"));
    assert!(!once.contains("gone"));
    assert!(!once.contains("tail"));
}

#[test]
fn test_parse_one_splits_at_statement_boundary() -> Result<()> {
    let session = Session::new("mydb");

    let (plan, consumed, remainder) = parse_one(&session, "USE otherdb; SELECT 1; SELECT 2")
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;
    assert_eq!(
        plan,
        LogicalPlan::Use {
            database: "otherdb".to_string(),
        }
    );
    assert_eq!(consumed, "USE otherdb");
    assert_eq!(remainder, " SELECT 1; SELECT 2");

    // Semicolons inside string literals do not end the statement
    let (_, consumed, remainder) = parse_one(&session, "SELECT 'a;b'; SELECT 2")
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;
    assert_eq!(consumed, "SELECT 'a;b'");
    assert_eq!(remainder, " SELECT 2");

    Ok(())
}

#[test]
fn test_trailing_semicolon_accepted() -> Result<()> {
    let session = Session::new("mydb");
    let plan = parse(&session, "COMMIT;").map_err(|e| anyhow!("Parse error: {:?}", e))?;
    assert_eq!(plan, LogicalPlan::Commit);
    Ok(())
}

#[test]
fn test_syntax_error_reported() {
    let session = Session::new("mydb");
    let result = parse(&session, "SELECT FROM WHERE");
    assert!(result.is_err(), "Malformed statement should fail to parse");
    if let Err(ParseError::Syntax(_)) = result {
    } else {
        panic!("Expected a syntax error");
    }
}

#[test]
fn test_administrative_statements_dispatch() -> Result<()> {
    // Each hand-parsed family is reachable through the main entry point
    let session = Session::new("mydb");

    let plan = parse(&session, "UNLOCK TABLES").map_err(|e| anyhow!("Parse error: {:?}", e))?;
    assert_eq!(plan, LogicalPlan::UnlockTables);

    let plan = parse(&session, "SHOW DATABASES").map_err(|e| anyhow!("Parse error: {:?}", e))?;
    assert_eq!(plan, LogicalPlan::ShowDatabases);

    let plan =
        parse(&session, "RELEASE SAVEPOINT sp1").map_err(|e| anyhow!("Parse error: {:?}", e))?;
    assert_eq!(
        plan,
        LogicalPlan::ReleaseSavepoint {
            name: "sp1".to_string(),
        }
    );

    let plan = parse(&session, "KILL QUERY 9").map_err(|e| anyhow!("Parse error: {:?}", e))?;
    assert!(matches!(plan, LogicalPlan::Kill { .. }));

    Ok(())
}

#[test]
fn test_describe_select_wraps_query() -> Result<()> {
    let session = Session::new("mydb");
    let plan = parse(&session, "EXPLAIN SELECT a FROM t")
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;

    if let LogicalPlan::DescribeQuery { format, child } = plan {
        assert_eq!(format, "tree");
        assert!(matches!(*child, LogicalPlan::Project { .. }));
    } else {
        panic!("Expected DescribeQuery");
    }

    Ok(())
}

#[test]
fn test_versioned_comment_is_removed() -> Result<()> {
    // MySQL versioned comment syntax is treated as a plain comment
    let session = Session::new("mydb");
    let plan = parse(&session, "SELECT a FROM t /*!40100 IGNORED */")
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;
    assert!(matches!(plan, LogicalPlan::Project { .. }));
    Ok(())
}
