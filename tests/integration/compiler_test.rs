use anyhow::{Result, anyhow};
use sqlfront::parser::parse;
use sqlfront::plan::expr::{Expression, Value};
use sqlfront::plan::node::{JoinKind, LogicalPlan, SetOpKind};
use sqlfront::{ParseError, Session};

#[test]
fn test_select_operator_stack() -> Result<()> {
    let session = Session::new("mydb");
    let sql = "SELECT a, b FROM t WHERE a > 1 ORDER BY b DESC LIMIT 10 OFFSET 20";

    let plan = parse(&session, sql).map_err(|e| anyhow!("Parse error: {:?}", e))?;

    // Limit wraps Offset wraps Sort wraps Project wraps Filter
    if let LogicalPlan::Limit { count, child } = plan {
        assert_eq!(count, Expression::Literal(Value::Int8(10)));
        if let LogicalPlan::Offset { count, child } = *child {
            assert_eq!(count, Expression::Literal(Value::Int8(20)));
            if let LogicalPlan::Sort { fields, child } = *child {
                assert!(!fields[0].ascending);
                if let LogicalPlan::Project { child, .. } = *child {
                    assert!(matches!(*child, LogicalPlan::Filter { .. }));
                } else {
                    panic!("Expected Project under Sort");
                }
            } else {
                panic!("Expected Sort under Offset");
            }
        } else {
            panic!("Expected Offset under Limit");
        }
    } else {
        panic!("Expected Limit at the root");
    }

    Ok(())
}

#[test]
fn test_comma_limit_equals_offset_form() -> Result<()> {
    // LIMIT 5, 2 and LIMIT 2 OFFSET 5 build identical plans
    let session = Session::new("mydb");
    let comma = parse(&session, "SELECT a FROM t LIMIT 5, 2")
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;
    let keyword = parse(&session, "SELECT a FROM t LIMIT 2 OFFSET 5")
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;
    assert_eq!(comma, keyword);
    Ok(())
}

#[test]
fn test_session_select_limit_default() -> Result<()> {
    let mut session = Session::new("mydb");
    session.set_variable("sql_select_limit", Value::Int64(50));

    let plan =
        parse(&session, "SELECT a FROM t").map_err(|e| anyhow!("Parse error: {:?}", e))?;
    if let LogicalPlan::Limit { count, .. } = plan {
        assert_eq!(count, Expression::Literal(Value::Int64(50)));
    } else {
        panic!("Expected the session limit at the root");
    }

    // An explicit LIMIT wins over the session default
    let plan = parse(&session, "SELECT a FROM t LIMIT 3")
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;
    if let LogicalPlan::Limit { count, .. } = plan {
        assert_eq!(count, Expression::Literal(Value::Int8(3)));
    } else {
        panic!("Expected Limit at the root");
    }

    Ok(())
}

#[test]
fn test_join_kinds() -> Result<()> {
    let session = Session::new("mydb");

    let plan = parse(&session, "SELECT * FROM a LEFT JOIN b ON a.id = b.id")
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;
    if let LogicalPlan::Project { child, .. } = plan {
        if let LogicalPlan::Join {
            kind, condition, ..
        } = *child
        {
            assert_eq!(kind, JoinKind::Left);
            assert!(condition.is_some());
        } else {
            panic!("Expected Join");
        }
    } else {
        panic!("Expected Project");
    }

    // An inner join with no ON clause degrades to a cross join
    let plan = parse(&session, "SELECT * FROM a JOIN b")
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;
    if let LogicalPlan::Project { child, .. } = plan {
        if let LogicalPlan::Join { kind, .. } = *child {
            assert_eq!(kind, JoinKind::Cross);
        } else {
            panic!("Expected Join");
        }
    } else {
        panic!("Expected Project");
    }

    Ok(())
}

#[test]
fn test_aggregation_and_having() -> Result<()> {
    let session = Session::new("mydb");
    let sql = "SELECT dept, COUNT(*) FROM emp GROUP BY dept HAVING COUNT(*) > 5";

    let plan = parse(&session, sql).map_err(|e| anyhow!("Parse error: {:?}", e))?;
    if let LogicalPlan::Having { child, .. } = plan {
        if let LogicalPlan::GroupBy {
            select_exprs,
            group_exprs,
            ..
        } = *child
        {
            assert_eq!(select_exprs.len(), 2);
            assert_eq!(group_exprs, vec![Expression::column("dept")]);
        } else {
            panic!("Expected GroupBy under Having");
        }
    } else {
        panic!("Expected Having at the root");
    }

    Ok(())
}

#[test]
fn test_union_and_union_all() -> Result<()> {
    let session = Session::new("mydb");

    // Plain UNION deduplicates
    let plan = parse(&session, "SELECT a FROM t UNION SELECT a FROM u")
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;
    if let LogicalPlan::Distinct { child } = plan {
        if let LogicalPlan::SetOp { op, .. } = *child {
            assert_eq!(op, SetOpKind::Union);
        } else {
            panic!("Expected SetOp under Distinct");
        }
    } else {
        panic!("Expected Distinct at the root");
    }

    let plan = parse(&session, "SELECT a FROM t UNION ALL SELECT a FROM u")
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;
    assert!(matches!(plan, LogicalPlan::SetOp { .. }));

    Ok(())
}

#[test]
fn test_with_clause_and_subquery_alias() -> Result<()> {
    let session = Session::new("mydb");
    let sql = "WITH top (id) AS (SELECT id FROM t) SELECT * FROM top";

    let plan = parse(&session, sql).map_err(|e| anyhow!("Parse error: {:?}", e))?;
    if let LogicalPlan::With { ctes, recursive, .. } = plan {
        assert!(!recursive);
        assert_eq!(ctes[0].name, "top");
        assert_eq!(ctes[0].columns, vec!["id".to_string()]);
        if let LogicalPlan::SubqueryAlias { text, .. } = ctes[0].subquery.as_ref() {
            assert!(text.contains("SELECT"));
        } else {
            panic!("Expected SubqueryAlias for the CTE body");
        }
    } else {
        panic!("Expected With at the root");
    }

    Ok(())
}

#[test]
fn test_insert_update_delete() -> Result<()> {
    let session = Session::new("mydb");

    let plan = parse(&session, "INSERT INTO t (a) VALUES (1)")
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;
    assert!(matches!(plan, LogicalPlan::Insert { .. }));

    let plan = parse(&session, "UPDATE t SET a = 1 WHERE b = 2")
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;
    if let LogicalPlan::Update { child, .. } = plan {
        assert!(matches!(*child, LogicalPlan::Filter { .. }));
    } else {
        panic!("Expected Update");
    }

    let plan = parse(&session, "DELETE FROM t WHERE a = 1")
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;
    if let LogicalPlan::Delete { child } = plan {
        assert!(matches!(*child, LogicalPlan::Filter { .. }));
    } else {
        panic!("Expected Delete");
    }

    Ok(())
}

#[test]
fn test_drop_table_multiple_databases_rejected() {
    let session = Session::new("mydb");
    let result = parse(&session, "DROP TABLE db1.a, db2.b");
    if let Err(ParseError::UnsupportedFeature(msg)) = result {
        assert!(msg.contains("multiple databases"));
    } else {
        panic!("Expected an unsupported-feature error");
    }
}

#[test]
fn test_transaction_control() -> Result<()> {
    let session = Session::new("mydb");

    let plan = parse(&session, "START TRANSACTION READ ONLY")
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;
    assert_eq!(
        plan,
        LogicalPlan::StartTransaction {
            read_only: Some(true),
        }
    );

    assert_eq!(
        parse(&session, "BEGIN").map_err(|e| anyhow!("Parse error: {:?}", e))?,
        LogicalPlan::StartTransaction { read_only: None }
    );
    assert_eq!(
        parse(&session, "COMMIT").map_err(|e| anyhow!("Parse error: {:?}", e))?,
        LogicalPlan::Commit
    );
    assert_eq!(
        parse(&session, "ROLLBACK").map_err(|e| anyhow!("Parse error: {:?}", e))?,
        LogicalPlan::Rollback
    );

    Ok(())
}

#[test]
fn test_as_of_historical_read() -> Result<()> {
    let session = Session::new("mydb");
    let plan = parse(&session, "SELECT * FROM t AS OF '2020-01-01'")
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;

    if let LogicalPlan::Project { child, .. } = plan {
        if let LogicalPlan::UnresolvedTable { name, as_of } = *child {
            assert_eq!(name.name, "t");
            assert_eq!(
                as_of,
                Some(Expression::Literal(Value::String("2020-01-01".to_string())))
            );
        } else {
            panic!("Expected table scan");
        }
    } else {
        panic!("Expected Project");
    }

    Ok(())
}

#[test]
fn test_table_alias() -> Result<()> {
    let session = Session::new("mydb");
    let plan = parse(&session, "SELECT e.name FROM employees e")
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;

    if let LogicalPlan::Project { child, .. } = plan {
        if let LogicalPlan::TableAlias { name, child } = *child {
            assert_eq!(name, "e");
            assert!(matches!(*child, LogicalPlan::UnresolvedTable { .. }));
        } else {
            panic!("Expected TableAlias");
        }
    } else {
        panic!("Expected Project");
    }

    Ok(())
}
