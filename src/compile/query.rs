// Query Compiler
//
// Lowers SELECT statements into plan trees. Operators stack in a fixed
// order: source, filter, aggregation or windowing, having, distinct,
// sort, offset, limit, and finally the WITH clause.

use sqlparser::ast;

use crate::compile::expr::{convert_expr, convert_sort_field};
use crate::compile::{qualified_name, window};
use crate::error::{ParseError, ParseResult};
use crate::plan::expr::{Expression, Value};
use crate::plan::node::{CommonTableExpression, JoinKind, LogicalPlan, SetOpKind};
use crate::session::Session;

/// Compile a query body with its ORDER BY, LIMIT and WITH clauses. The
/// session default row limit applies only at the top level, and only when
/// the statement does not carry its own LIMIT.
pub(crate) fn convert_query(
    session: &Session,
    query: &ast::Query,
    top_level: bool,
) -> ParseResult<LogicalPlan> {
    let mut plan = convert_set_expr(session, &query.body)?;

    if let Some(order_by) = &query.order_by {
        plan = convert_order_by(session, order_by, plan)?;
    }

    let mut limited = false;
    if let Some(limit_clause) = &query.limit_clause {
        let (limit, offset) = split_limit_clause(limit_clause)?;
        if let Some(offset) = offset {
            plan = convert_offset(session, offset, plan)?;
        }
        if let Some(limit) = limit {
            plan = LogicalPlan::Limit {
                count: convert_expr(session, limit)?,
                child: Box::new(plan),
            };
            limited = true;
        }
    }
    if top_level && !limited {
        if let Some(default_limit) = session.default_limit() {
            plan = LogicalPlan::Limit {
                count: Expression::literal(Value::Int64(default_limit)),
                child: Box::new(plan),
            };
        }
    }

    if let Some(with) = &query.with {
        plan = convert_with(session, with, plan)?;
    }
    Ok(plan)
}

fn convert_set_expr(session: &Session, body: &ast::SetExpr) -> ParseResult<LogicalPlan> {
    match body {
        ast::SetExpr::Select(select) => convert_select(session, select),
        ast::SetExpr::Query(query) => convert_query(session, query, false),
        ast::SetExpr::SetOperation {
            op,
            set_quantifier,
            left,
            right,
        } => {
            let op = match op {
                ast::SetOperator::Union => SetOpKind::Union,
                ast::SetOperator::Intersect => SetOpKind::Intersect,
                ast::SetOperator::Except => SetOpKind::Except,
                other => {
                    return Err(ParseError::UnsupportedFeature(format!(
                        "set operator {}",
                        other
                    )));
                }
            };
            let combined = LogicalPlan::SetOp {
                op,
                left: Box::new(convert_set_expr(session, left)?),
                right: Box::new(convert_set_expr(session, right)?),
            };
            // UNION implies DISTINCT unless ALL is spelled out.
            match set_quantifier {
                ast::SetQuantifier::All => Ok(combined),
                _ => Ok(LogicalPlan::Distinct {
                    child: Box::new(combined),
                }),
            }
        }
        ast::SetExpr::Values(values) => {
            let mut rows = Vec::with_capacity(values.rows.len());
            for row in &values.rows {
                let mut converted = Vec::with_capacity(row.len());
                for expr in row {
                    converted.push(convert_expr(session, expr)?);
                }
                rows.push(converted);
            }
            Ok(LogicalPlan::Values { rows })
        }
        other => Err(ParseError::UnsupportedSyntax(other.to_string())),
    }
}

fn convert_select(session: &Session, select: &ast::Select) -> ParseResult<LogicalPlan> {
    let mut plan = convert_from(session, &select.from)?;

    if let Some(selection) = &select.selection {
        plan = LogicalPlan::filter(convert_expr(session, selection)?, plan);
    }

    let mut select_exprs = Vec::with_capacity(select.projection.len());
    for item in &select.projection {
        select_exprs.push(convert_select_item(session, item)?);
    }

    let group_exprs = convert_group_by(session, &select.group_by, &select_exprs)?;

    let has_window = select_exprs.iter().any(Expression::contains_window);
    let has_aggregate =
        !group_exprs.is_empty() || select_exprs.iter().any(Expression::contains_aggregate);
    // Window functions coexist with plain aggregates; only an explicit
    // GROUP BY conflicts with them.
    if has_window && !group_exprs.is_empty() {
        return Err(ParseError::UnsupportedFeature(
            "window functions combined with GROUP BY".to_string(),
        ));
    }
    plan = if has_window {
        LogicalPlan::Window {
            select_exprs,
            child: Box::new(plan),
        }
    } else if has_aggregate {
        LogicalPlan::GroupBy {
            select_exprs,
            group_exprs,
            child: Box::new(plan),
        }
    } else {
        LogicalPlan::project(select_exprs, plan)
    };

    if !select.named_window.is_empty() {
        plan = LogicalPlan::NamedWindows {
            windows: window::convert_named_windows(session, &select.named_window)?,
            child: Box::new(plan),
        };
    }

    if let Some(having) = &select.having {
        plan = LogicalPlan::Having {
            predicate: convert_expr(session, having)?,
            child: Box::new(plan),
        };
    }

    match &select.distinct {
        None => {}
        Some(ast::Distinct::Distinct) => {
            plan = LogicalPlan::Distinct {
                child: Box::new(plan),
            };
        }
        Some(ast::Distinct::On(_)) => {
            return Err(ParseError::UnsupportedFeature("DISTINCT ON".to_string()));
        }
    }
    Ok(plan)
}

fn convert_select_item(session: &Session, item: &ast::SelectItem) -> ParseResult<Expression> {
    match item {
        ast::SelectItem::UnnamedExpr(expr) => convert_expr(session, expr),
        ast::SelectItem::ExprWithAlias { expr, alias } => Ok(Expression::Alias {
            name: alias.value.clone(),
            expr: Box::new(convert_expr(session, expr)?),
        }),
        ast::SelectItem::Wildcard(_) => Ok(Expression::Star { table: None }),
        ast::SelectItem::QualifiedWildcard(kind, _) => match kind {
            ast::SelectItemQualifiedWildcardKind::ObjectName(name) => Ok(Expression::Star {
                table: Some(name.to_string()),
            }),
            other => Err(ParseError::UnsupportedSyntax(format!(
                "wildcard qualifier {}",
                other
            ))),
        },
    }
}

/// GROUP BY expressions. An integer literal is a 1-based ordinal into the
/// select list; grouping by an aliased select item groups by the alias.
fn convert_group_by(
    session: &Session,
    group_by: &ast::GroupByExpr,
    select_exprs: &[Expression],
) -> ParseResult<Vec<Expression>> {
    let exprs = match group_by {
        ast::GroupByExpr::All(_) => {
            return Err(ParseError::UnsupportedFeature("GROUP BY ALL".to_string()));
        }
        ast::GroupByExpr::Expressions(exprs, modifiers) => {
            if !modifiers.is_empty() {
                return Err(ParseError::UnsupportedFeature(
                    "GROUP BY modifiers".to_string(),
                ));
            }
            exprs
        }
    };
    let mut group_exprs = Vec::with_capacity(exprs.len());
    for expr in exprs {
        let converted = convert_expr(session, expr)?;
        let resolved = match &converted {
            Expression::Literal(value) => match value.as_i64() {
                Some(ordinal) => {
                    let selected = usize::try_from(ordinal)
                        .ok()
                        .and_then(|i| i.checked_sub(1))
                        .and_then(|i| select_exprs.get(i));
                    match selected {
                        Some(Expression::Alias { name, .. }) => {
                            Expression::column(name.clone())
                        }
                        Some(selected) => selected.clone(),
                        // An out-of-range ordinal stays a literal; the
                        // resolver reports it against the actual schema.
                        None => converted,
                    }
                }
                None => converted,
            },
            _ => converted,
        };
        group_exprs.push(resolved);
    }
    Ok(group_exprs)
}

/// FROM clause. An empty clause reads the one-row dual table; multiple
/// comma-separated sources become a chain of cross joins.
fn convert_from(session: &Session, from: &[ast::TableWithJoins]) -> ParseResult<LogicalPlan> {
    let mut tables = from.iter();
    let mut plan = match tables.next() {
        Some(table) => convert_table_with_joins(session, table)?,
        None => {
            return Ok(LogicalPlan::UnresolvedTable {
                name: crate::plan::ddl::QualifiedName::bare("dual"),
                as_of: None,
            });
        }
    };
    for table in tables {
        plan = LogicalPlan::Join {
            kind: JoinKind::Cross,
            condition: None,
            left: Box::new(plan),
            right: Box::new(convert_table_with_joins(session, table)?),
        };
    }
    Ok(plan)
}

pub(crate) fn convert_table_with_joins(
    session: &Session,
    table: &ast::TableWithJoins,
) -> ParseResult<LogicalPlan> {
    let mut plan = convert_table_factor(session, &table.relation)?;
    for join in &table.joins {
        let right = convert_table_factor(session, &join.relation)?;
        let (kind, constraint) = match &join.join_operator {
            ast::JoinOperator::Join(c) | ast::JoinOperator::Inner(c) => (JoinKind::Inner, c),
            ast::JoinOperator::Left(c) | ast::JoinOperator::LeftOuter(c) => (JoinKind::Left, c),
            ast::JoinOperator::Right(c) | ast::JoinOperator::RightOuter(c) => {
                (JoinKind::Right, c)
            }
            ast::JoinOperator::CrossJoin => (JoinKind::Cross, &ast::JoinConstraint::None),
            other => {
                return Err(ParseError::UnsupportedFeature(format!(
                    "join type {:?}",
                    other
                )));
            }
        };
        let (kind, condition) = match constraint {
            ast::JoinConstraint::On(expr) => (kind, Some(convert_expr(session, expr)?)),
            ast::JoinConstraint::Natural => (JoinKind::Natural, None),
            // A join written without ON degrades to a cross join.
            ast::JoinConstraint::None => {
                let kind = if kind == JoinKind::Inner {
                    JoinKind::Cross
                } else {
                    kind
                };
                (kind, None)
            }
            ast::JoinConstraint::Using(_) => {
                return Err(ParseError::UnsupportedFeature("JOIN USING".to_string()));
            }
        };
        plan = LogicalPlan::Join {
            kind,
            condition,
            left: Box::new(plan),
            right: Box::new(right),
        };
    }
    Ok(plan)
}

fn convert_table_factor(
    session: &Session,
    factor: &ast::TableFactor,
) -> ParseResult<LogicalPlan> {
    match factor {
        ast::TableFactor::Table {
            name,
            alias,
            version,
            ..
        } => {
            let as_of = match version {
                Some(ast::TableVersion::ForSystemTimeAsOf(expr)) => {
                    Some(convert_expr(session, expr)?)
                }
                Some(other) => {
                    return Err(ParseError::UnsupportedFeature(format!(
                        "table version {:?}",
                        other
                    )));
                }
                None => None,
            };
            let mut plan = LogicalPlan::UnresolvedTable {
                name: qualified_name(name)?,
                as_of,
            };
            if let Some(alias) = alias {
                plan = LogicalPlan::TableAlias {
                    name: alias.name.value.clone(),
                    child: Box::new(plan),
                };
            }
            Ok(plan)
        }
        ast::TableFactor::Derived {
            lateral,
            subquery,
            alias,
        } => {
            if *lateral {
                return Err(ParseError::UnsupportedFeature(
                    "LATERAL subquery".to_string(),
                ));
            }
            let alias = alias.as_ref().ok_or_else(|| {
                ParseError::UnsupportedFeature("subquery without alias".to_string())
            })?;
            Ok(LogicalPlan::SubqueryAlias {
                name: alias.name.value.clone(),
                columns: alias_columns(alias),
                child: Box::new(convert_query(session, subquery, false)?),
                text: subquery.to_string(),
            })
        }
        ast::TableFactor::NestedJoin {
            table_with_joins,
            alias,
            ..
        } => {
            let mut plan = convert_table_with_joins(session, table_with_joins)?;
            if let Some(alias) = alias {
                plan = LogicalPlan::TableAlias {
                    name: alias.name.value.clone(),
                    child: Box::new(plan),
                };
            }
            Ok(plan)
        }
        other => Err(ParseError::UnsupportedFeature(format!(
            "table source {}",
            other
        ))),
    }
}

fn alias_columns(alias: &ast::TableAlias) -> Vec<String> {
    alias
        .columns
        .iter()
        .map(|column| column.name.value.clone())
        .collect()
}

fn convert_order_by(
    session: &Session,
    order_by: &ast::OrderBy,
    child: LogicalPlan,
) -> ParseResult<LogicalPlan> {
    match &order_by.kind {
        ast::OrderByKind::Expressions(exprs) => {
            if exprs.is_empty() {
                return Ok(child);
            }
            let mut fields = Vec::with_capacity(exprs.len());
            for order in exprs {
                fields.push(convert_sort_field(session, order)?);
            }
            Ok(LogicalPlan::Sort {
                fields,
                child: Box::new(child),
            })
        }
        ast::OrderByKind::All(_) => {
            Err(ParseError::UnsupportedFeature("ORDER BY ALL".to_string()))
        }
    }
}

fn split_limit_clause(
    limit_clause: &ast::LimitClause,
) -> ParseResult<(Option<&ast::Expr>, Option<&ast::Expr>)> {
    match limit_clause {
        ast::LimitClause::LimitOffset {
            limit,
            offset,
            limit_by,
        } => {
            if !limit_by.is_empty() {
                return Err(ParseError::UnsupportedFeature("LIMIT BY".to_string()));
            }
            Ok((limit.as_ref(), offset.as_ref().map(|o| &o.value)))
        }
        ast::LimitClause::OffsetCommaLimit { offset, limit } => {
            Ok((Some(limit), Some(offset)))
        }
    }
}

/// An explicit OFFSET 0 is dropped rather than planned.
fn convert_offset(
    session: &Session,
    offset: &ast::Expr,
    child: LogicalPlan,
) -> ParseResult<LogicalPlan> {
    let count = convert_expr(session, offset)?;
    if let Expression::Literal(value) = &count {
        if value.as_i64() == Some(0) {
            return Ok(child);
        }
    }
    Ok(LogicalPlan::Offset {
        count,
        child: Box::new(child),
    })
}

/// Attach a historical-read expression to every scan of `table` that does
/// not already carry one. Leaf and non-relational nodes pass through
/// unchanged.
pub(crate) fn attach_as_of(plan: LogicalPlan, table: &str, as_of: &Expression) -> LogicalPlan {
    let walk = |child: Box<LogicalPlan>| Box::new(attach_as_of(*child, table, as_of));
    match plan {
        LogicalPlan::UnresolvedTable { name, as_of: None }
            if name.name.eq_ignore_ascii_case(table) =>
        {
            LogicalPlan::UnresolvedTable {
                name,
                as_of: Some(as_of.clone()),
            }
        }
        LogicalPlan::TableAlias { name, child } => LogicalPlan::TableAlias {
            name,
            child: walk(child),
        },
        LogicalPlan::SubqueryAlias {
            name,
            columns,
            child,
            text,
        } => LogicalPlan::SubqueryAlias {
            name,
            columns,
            child: walk(child),
            text,
        },
        LogicalPlan::Filter { predicate, child } => LogicalPlan::Filter {
            predicate,
            child: walk(child),
        },
        LogicalPlan::Project { projections, child } => LogicalPlan::Project {
            projections,
            child: walk(child),
        },
        LogicalPlan::GroupBy {
            select_exprs,
            group_exprs,
            child,
        } => LogicalPlan::GroupBy {
            select_exprs,
            group_exprs,
            child: walk(child),
        },
        LogicalPlan::Window { select_exprs, child } => LogicalPlan::Window {
            select_exprs,
            child: walk(child),
        },
        LogicalPlan::NamedWindows { windows, child } => LogicalPlan::NamedWindows {
            windows,
            child: walk(child),
        },
        LogicalPlan::Having { predicate, child } => LogicalPlan::Having {
            predicate,
            child: walk(child),
        },
        LogicalPlan::Distinct { child } => LogicalPlan::Distinct { child: walk(child) },
        LogicalPlan::Sort { fields, child } => LogicalPlan::Sort {
            fields,
            child: walk(child),
        },
        LogicalPlan::Offset { count, child } => LogicalPlan::Offset {
            count,
            child: walk(child),
        },
        LogicalPlan::Limit { count, child } => LogicalPlan::Limit {
            count,
            child: walk(child),
        },
        LogicalPlan::With {
            ctes,
            recursive,
            child,
        } => LogicalPlan::With {
            ctes: ctes
                .into_iter()
                .map(|cte| CommonTableExpression {
                    name: cte.name,
                    columns: cte.columns,
                    subquery: Box::new(attach_as_of(*cte.subquery, table, as_of)),
                })
                .collect(),
            recursive,
            child: walk(child),
        },
        LogicalPlan::Join {
            kind,
            condition,
            left,
            right,
        } => LogicalPlan::Join {
            kind,
            condition,
            left: walk(left),
            right: walk(right),
        },
        LogicalPlan::SetOp { op, left, right } => LogicalPlan::SetOp {
            op,
            left: walk(left),
            right: walk(right),
        },
        LogicalPlan::Insert {
            table: target,
            columns,
            source,
            is_replace,
        } => LogicalPlan::Insert {
            table: target,
            columns,
            source: walk(source),
            is_replace,
        },
        LogicalPlan::Update { assignments, child } => LogicalPlan::Update {
            assignments,
            child: walk(child),
        },
        LogicalPlan::Delete { child } => LogicalPlan::Delete { child: walk(child) },
        other => other,
    }
}

fn convert_with(
    session: &Session,
    with: &ast::With,
    child: LogicalPlan,
) -> ParseResult<LogicalPlan> {
    let mut ctes = Vec::with_capacity(with.cte_tables.len());
    for cte in &with.cte_tables {
        let name = cte.alias.name.value.clone();
        let columns = alias_columns(&cte.alias);
        let subquery = LogicalPlan::SubqueryAlias {
            name: name.clone(),
            columns: columns.clone(),
            child: Box::new(convert_query(session, &cte.query, false)?),
            text: cte.query.to_string(),
        };
        ctes.push(CommonTableExpression {
            name,
            columns,
            subquery: Box::new(subquery),
        });
    }
    Ok(LogicalPlan::With {
        ctes,
        recursive: with.recursive,
        child: Box::new(child),
    })
}
