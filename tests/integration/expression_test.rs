use anyhow::{Result, anyhow};
use sqlfront::parser::parse;
use sqlfront::plan::expr::{BinaryOperator, Expression, FrameBound, Value};
use sqlfront::plan::node::LogicalPlan;
use sqlfront::{ParseError, Session};

/// Parse a SELECT with a single projection and return that expression.
fn projection(sql: &str) -> Result<Expression> {
    let session = Session::new("mydb");
    let plan = parse(&session, sql).map_err(|e| anyhow!("Parse error: {:?}", e))?;
    let exprs = match plan {
        LogicalPlan::Project { projections, .. } => projections,
        LogicalPlan::GroupBy { select_exprs, .. } => select_exprs,
        LogicalPlan::Window { select_exprs, .. } => select_exprs,
        other => return Err(anyhow!("Expected a projection node, got: {}", other)),
    };
    exprs
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("Empty projection"))
}

#[test]
fn test_integer_literals_narrow() -> Result<()> {
    // Each literal takes the smallest type that holds it exactly
    assert_eq!(
        projection("SELECT 127 FROM t")?,
        Expression::Literal(Value::Int8(127))
    );
    assert_eq!(
        projection("SELECT 128 FROM t")?,
        Expression::Literal(Value::UInt8(128))
    );
    assert_eq!(
        projection("SELECT 32768 FROM t")?,
        Expression::Literal(Value::UInt16(32768))
    );
    assert_eq!(
        projection("SELECT 18446744073709551616 FROM t")?,
        Expression::Literal(Value::Decimal("18446744073709551616".to_string()))
    );
    Ok(())
}

#[test]
fn test_negative_and_float_literals() -> Result<()> {
    let expr = projection("SELECT -5 FROM t")?;
    if let Expression::UnaryMinus(inner) = expr {
        assert_eq!(*inner, Expression::Literal(Value::Int8(5)));
    } else {
        panic!("Expected UnaryMinus");
    }

    assert_eq!(
        projection("SELECT 2.5 FROM t")?,
        Expression::Literal(Value::Float64(2.5))
    );
    Ok(())
}

#[test]
fn test_string_boolean_null_literals() -> Result<()> {
    assert_eq!(
        projection("SELECT 'hello' FROM t")?,
        Expression::Literal(Value::String("hello".to_string()))
    );
    assert_eq!(
        projection("SELECT TRUE FROM t")?,
        Expression::Literal(Value::Boolean(true))
    );
    assert_eq!(
        projection("SELECT NULL FROM t")?,
        Expression::Literal(Value::Null)
    );
    Ok(())
}

#[test]
fn test_not_equal_lowering() -> Result<()> {
    // != is lowered to NOT(=) rather than carried as its own operator
    let expr = projection("SELECT a != 1 FROM t")?;
    if let Expression::Not(inner) = expr {
        assert!(matches!(
            *inner,
            Expression::BinaryOp {
                op: BinaryOperator::Eq,
                ..
            }
        ));
    } else {
        panic!("Expected Not(Eq)");
    }
    Ok(())
}

#[test]
fn test_null_safe_equality() -> Result<()> {
    let expr = projection("SELECT a <=> b FROM t")?;
    assert!(matches!(
        expr,
        Expression::BinaryOp {
            op: BinaryOperator::NullSafeEq,
            ..
        }
    ));
    Ok(())
}

#[test]
fn test_case_between_in() -> Result<()> {
    let expr = projection("SELECT CASE a WHEN 1 THEN 'one' ELSE 'many' END FROM t")?;
    if let Expression::Case {
        operand,
        branches,
        else_value,
    } = expr
    {
        assert!(operand.is_some());
        assert_eq!(branches.len(), 1);
        assert!(else_value.is_some());
    } else {
        panic!("Expected Case");
    }

    let expr = projection("SELECT a BETWEEN 1 AND 10 FROM t")?;
    assert!(matches!(expr, Expression::Between { .. }));

    let expr = projection("SELECT a NOT IN (1, 2, 3) FROM t")?;
    if let Expression::Not(inner) = expr {
        if let Expression::InTuple { values, .. } = *inner {
            assert_eq!(values.len(), 3);
        } else {
            panic!("Expected InTuple under Not");
        }
    } else {
        panic!("Expected Not");
    }

    Ok(())
}

#[test]
fn test_like_with_escape() -> Result<()> {
    let expr = projection("SELECT a LIKE 'x\\\\_%' ESCAPE '|' FROM t")?;
    if let Expression::Like { escape, .. } = expr {
        assert_eq!(
            escape.map(|e| *e),
            Some(Expression::Literal(Value::String("|".to_string())))
        );
    } else {
        panic!("Expected Like");
    }
    Ok(())
}

#[test]
fn test_interval_arithmetic_guard() {
    let session = Session::new("mydb");
    let result = parse(
        &session,
        "SELECT INTERVAL 1 DAY + INTERVAL 2 DAY FROM t",
    );
    if let Err(ParseError::UnsupportedSyntax(msg)) = result {
        assert!(msg.contains("intervals"));
    } else {
        panic!("Expected an unsupported-syntax error");
    }

    // Interval added to a date expression is fine
    let result = parse(&session, "SELECT d + INTERVAL 1 DAY FROM t");
    assert!(result.is_ok(), "date + interval should parse: {:?}", result);
}

#[test]
fn test_aggregate_classification() -> Result<()> {
    let expr = projection("SELECT COUNT(*) FROM t")?;
    if let Expression::Function {
        name,
        is_aggregate,
        args,
        ..
    } = expr
    {
        assert_eq!(name, "count");
        assert!(is_aggregate);
        assert_eq!(args, vec![Expression::Star { table: None }]);
    } else {
        panic!("Expected Function");
    }

    // Unknown functions are plain calls
    let expr = projection("SELECT lower(a) FROM t")?;
    if let Expression::Function { is_aggregate, .. } = expr {
        assert!(!is_aggregate);
    } else {
        panic!("Expected Function");
    }

    Ok(())
}

#[test]
fn test_count_distinct() -> Result<()> {
    let expr = projection("SELECT COUNT(DISTINCT a) FROM t")?;
    if let Expression::Function { distinct, .. } = expr {
        assert!(distinct);
    } else {
        panic!("Expected Function");
    }

    // DISTINCT on other aggregates is rejected
    let session = Session::new("mydb");
    let result = parse(&session, "SELECT SUM(DISTINCT a) FROM t");
    assert!(matches!(result, Err(ParseError::UnsupportedSyntax(_))));

    Ok(())
}

#[test]
fn test_window_function_frame_defaults() -> Result<()> {
    let expr =
        projection("SELECT SUM(a) OVER (PARTITION BY b ORDER BY c ROWS 2 PRECEDING) FROM t")?;
    if let Expression::Function { over: Some(w), .. } = expr {
        assert_eq!(w.partition_by.len(), 1);
        let frame = w.frame.expect("Expected a frame");
        // A frame without BETWEEN ends at the current row
        assert_eq!(frame.end, FrameBound::CurrentRow);
    } else {
        panic!("Expected window function");
    }
    Ok(())
}

#[test]
fn test_scalar_subquery_keeps_text() -> Result<()> {
    let expr = projection("SELECT (SELECT MAX(b) FROM u) FROM t")?;
    if let Expression::Subquery { text, plan } = expr {
        assert!(text.contains("MAX"));
        assert!(matches!(*plan, LogicalPlan::GroupBy { .. }));
    } else {
        panic!("Expected Subquery");
    }
    Ok(())
}

#[test]
fn test_exists_and_in_subquery() -> Result<()> {
    let expr = projection("SELECT EXISTS (SELECT 1 FROM u) FROM t")?;
    assert!(matches!(expr, Expression::Exists(_)));

    let expr = projection("SELECT a IN (SELECT b FROM u) FROM t")?;
    assert!(matches!(expr, Expression::InSubquery { .. }));
    Ok(())
}

#[test]
fn test_placeholder_bind_variable() -> Result<()> {
    let session = Session::new("mydb");
    let plan = parse(&session, "SELECT a FROM t WHERE a = :v1")
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;
    if let LogicalPlan::Project { child, .. } = plan {
        if let LogicalPlan::Filter { predicate, .. } = *child {
            if let Expression::BinaryOp { right, .. } = predicate {
                assert_eq!(*right, Expression::BindVar("v1".to_string()));
            } else {
                panic!("Expected BinaryOp predicate");
            }
        } else {
            panic!("Expected Filter");
        }
    } else {
        panic!("Expected Project");
    }
    Ok(())
}

#[test]
fn test_cast_keeps_type_text() -> Result<()> {
    let expr = projection("SELECT CAST(a AS CHAR(10)) FROM t")?;
    if let Expression::Cast { target_type, .. } = expr {
        assert_eq!(target_type, "CHAR(10)");
    } else {
        panic!("Expected Cast");
    }
    Ok(())
}

#[test]
fn test_is_predicates() -> Result<()> {
    let expr = projection("SELECT a IS NULL FROM t")?;
    assert!(matches!(expr, Expression::IsNull(_)));

    let expr = projection("SELECT a IS NOT TRUE FROM t")?;
    if let Expression::Not(inner) = expr {
        assert!(matches!(*inner, Expression::IsTrue(_)));
    } else {
        panic!("Expected Not(IsTrue)");
    }
    Ok(())
}
