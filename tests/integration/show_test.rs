use anyhow::{Result, anyhow};
use sqlfront::parser::parse;
use sqlfront::plan::ddl::QualifiedName;
use sqlfront::plan::expr::Expression;
use sqlfront::plan::node::LogicalPlan;
use sqlfront::{ParseError, Session};

#[test]
fn test_show_tables_uses_session_database() -> Result<()> {
    let session = Session::new("mydb");
    let plan = parse(&session, "SHOW TABLES LIKE 'user%'")
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;

    // The LIKE pattern filters the synthetic Tables_in_<db> column
    if let LogicalPlan::Filter { predicate, child } = plan {
        if let Expression::Like { expr, .. } = predicate {
            assert_eq!(*expr, Expression::column("Tables_in_mydb"));
        } else {
            panic!("Expected Like predicate");
        }
        assert_eq!(
            *child,
            LogicalPlan::ShowTables {
                database: None,
                full: false,
            }
        );
    } else {
        panic!("Expected Filter over ShowTables");
    }

    Ok(())
}

#[test]
fn test_show_tables_from_database() -> Result<()> {
    let session = Session::new("mydb");
    let plan = parse(&session, "SHOW FULL TABLES FROM otherdb")
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;
    assert_eq!(
        plan,
        LogicalPlan::ShowTables {
            database: Some("otherdb".to_string()),
            full: true,
        }
    );
    Ok(())
}

#[test]
fn test_show_columns_variants() -> Result<()> {
    let session = Session::new("mydb");

    let plan = parse(&session, "SHOW COLUMNS FROM t1")
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;
    assert_eq!(
        plan,
        LogicalPlan::ShowColumns {
            table: QualifiedName::bare("t1"),
            full: false,
        }
    );

    // FIELDS is a synonym, and a second FROM names the database
    let plan = parse(&session, "SHOW FIELDS FROM t1 IN otherdb")
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;
    if let LogicalPlan::ShowColumns { table, .. } = plan {
        assert_eq!(table.database.as_deref(), Some("otherdb"));
        assert_eq!(table.name, "t1");
    } else {
        panic!("Expected ShowColumns");
    }

    Ok(())
}

#[test]
fn test_show_columns_where_clause() -> Result<()> {
    let session = Session::new("mydb");
    let plan = parse(&session, "SHOW COLUMNS FROM t1 WHERE Field = 'id'")
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;

    if let LogicalPlan::Filter { child, .. } = plan {
        assert!(matches!(*child, LogicalPlan::ShowColumns { .. }));
    } else {
        panic!("Expected Filter over ShowColumns");
    }

    Ok(())
}

#[test]
fn test_show_variables_scopes() -> Result<()> {
    let session = Session::new("mydb");

    let plan = parse(&session, "SHOW VARIABLES")
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;
    assert_eq!(plan, LogicalPlan::ShowVariables { global: false });

    let plan = parse(&session, "SHOW GLOBAL VARIABLES LIKE 'max%'")
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;
    if let LogicalPlan::Filter { child, .. } = plan {
        assert_eq!(*child, LogicalPlan::ShowVariables { global: true });
    } else {
        panic!("Expected Filter over ShowVariables");
    }

    Ok(())
}

#[test]
fn test_show_warnings_snapshots_session() -> Result<()> {
    let session = Session::new("mydb");
    session.warn(1064, "something happened");

    let plan = parse(&session, "SHOW WARNINGS")
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;
    if let LogicalPlan::ShowWarnings { warnings } = plan {
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].message, "something happened");
    } else {
        panic!("Expected ShowWarnings");
    }

    // The LIMIT form wraps the snapshot
    let plan = parse(&session, "SHOW WARNINGS LIMIT 1")
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;
    assert!(matches!(plan, LogicalPlan::Limit { .. }));

    Ok(())
}

#[test]
fn test_show_count_warnings_unsupported() {
    let session = Session::new("mydb");
    let result = parse(&session, "SHOW COUNT(*) WARNINGS");
    assert!(matches!(result, Err(ParseError::UnsupportedFeature(_))));
}

#[test]
fn test_show_create_family() -> Result<()> {
    let session = Session::new("mydb");

    let plan = parse(&session, "SHOW CREATE TABLE mydb.t1")
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;
    if let LogicalPlan::ShowCreateTable { table } = plan {
        assert_eq!(table.database.as_deref(), Some("mydb"));
        assert_eq!(table.name, "t1");
    } else {
        panic!("Expected ShowCreateTable");
    }

    let plan = parse(&session, "SHOW CREATE VIEW v1")
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;
    assert_eq!(
        plan,
        LogicalPlan::ShowCreateView {
            view: QualifiedName::bare("v1"),
        }
    );

    let plan = parse(&session, "SHOW CREATE DATABASE IF NOT EXISTS mydb")
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;
    assert_eq!(
        plan,
        LogicalPlan::ShowCreateDatabase {
            database: "mydb".to_string(),
            if_not_exists: true,
        }
    );

    Ok(())
}

#[test]
fn test_show_index_synonyms() -> Result<()> {
    let session = Session::new("mydb");
    for sql in [
        "SHOW INDEX FROM t1",
        "SHOW INDEXES FROM t1",
        "SHOW KEYS FROM t1",
    ] {
        let plan = parse(&session, sql).map_err(|e| anyhow!("Parse error: {:?}", e))?;
        assert_eq!(
            plan,
            LogicalPlan::ShowIndexes {
                table: QualifiedName::bare("t1"),
            }
        );
    }
    Ok(())
}

#[test]
fn test_show_table_status_and_collation() -> Result<()> {
    let session = Session::new("mydb");

    let plan = parse(&session, "SHOW TABLE STATUS FROM otherdb")
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;
    assert_eq!(
        plan,
        LogicalPlan::ShowTableStatus {
            database: Some("otherdb".to_string()),
        }
    );

    let plan = parse(&session, "SHOW COLLATION LIKE 'utf8%'")
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;
    if let LogicalPlan::Filter { child, .. } = plan {
        assert_eq!(*child, LogicalPlan::ShowCollation);
    } else {
        panic!("Expected Filter over ShowCollation");
    }

    Ok(())
}

#[test]
fn test_show_processlist() -> Result<()> {
    let session = Session::new("mydb");
    for sql in ["SHOW PROCESSLIST", "SHOW FULL PROCESSLIST"] {
        let plan = parse(&session, sql).map_err(|e| anyhow!("Parse error: {:?}", e))?;
        assert_eq!(plan, LogicalPlan::ShowProcessList);
    }
    Ok(())
}
