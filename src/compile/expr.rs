// Expression Compiler
//
// Lowers parsed SQL expressions into unresolved expression trees. Integer
// literals are narrowed to the smallest native type that holds them
// exactly, preserving the source base (decimal, hex, bit).

use std::collections::HashSet;

use once_cell::sync::Lazy;
use sqlparser::ast;
use sqlparser::dialect::MySqlDialect;
use sqlparser::parser::Parser;

use crate::compile::{query, window};
use crate::error::{ParseError, ParseResult};
use crate::plan::expr::{BinaryOperator, CaseBranch, Expression, Value};
use crate::plan::expr::{NullOrdering, SortField};
use crate::session::Session;

/// Function names treated as aggregates when they appear without an OVER
/// clause.
static AGGREGATE_FUNCTIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "first",
        "last",
        "count",
        "sum",
        "any_value",
        "avg",
        "max",
        "min",
        "count_distinct",
        "json_arrayagg",
        "row_number",
        "percent_rank",
        "lag",
        "first_value",
    ]
    .into_iter()
    .collect()
});

/// Parse a standalone expression fragment (a WHERE tail or CHECK body) by
/// wrapping it in a SELECT.
pub fn parse_expr_fragment(fragment: &str) -> ParseResult<Expression> {
    if fragment.trim().is_empty() {
        return Err(ParseError::Syntax("empty expression".to_string()));
    }
    let sql = format!("SELECT {}", fragment);
    let statements = Parser::parse_sql(&MySqlDialect {}, &sql)
        .map_err(|e| ParseError::Syntax(e.to_string()))?;
    let session = Session::default();
    if let [ast::Statement::Query(query)] = statements.as_slice() {
        if let ast::SetExpr::Select(select) = query.body.as_ref() {
            if let [ast::SelectItem::UnnamedExpr(expr)] = select.projection.as_slice() {
                return convert_expr(&session, expr);
            }
        }
    }
    Err(ParseError::Syntax(format!(
        "expected a single expression, got: {}",
        fragment
    )))
}

/// Narrow an integer literal to the smallest type that represents it,
/// trying signed before unsigned at each width. Decimal literals too wide
/// for u64 become exact decimal text; hex and bit literals report an
/// error instead (the caller falls back to a byte literal).
pub fn convert_integer(text: &str, radix: u32) -> ParseResult<Value> {
    if let Ok(v) = i8::from_str_radix(text, radix) {
        return Ok(Value::Int8(v));
    }
    if let Ok(v) = u8::from_str_radix(text, radix) {
        return Ok(Value::UInt8(v));
    }
    if let Ok(v) = i16::from_str_radix(text, radix) {
        return Ok(Value::Int16(v));
    }
    if let Ok(v) = u16::from_str_radix(text, radix) {
        return Ok(Value::UInt16(v));
    }
    if let Ok(v) = i32::from_str_radix(text, radix) {
        return Ok(Value::Int32(v));
    }
    if let Ok(v) = u32::from_str_radix(text, radix) {
        return Ok(Value::UInt32(v));
    }
    if let Ok(v) = i64::from_str_radix(text, radix) {
        return Ok(Value::Int64(v));
    }
    if let Ok(v) = u64::from_str_radix(text, radix) {
        return Ok(Value::UInt64(v));
    }
    if radix == 10 {
        Ok(Value::Decimal(text.to_string()))
    } else {
        Err(ParseError::invalid_value(text, "number out of range"))
    }
}

fn convert_value(value: &ast::Value) -> ParseResult<Expression> {
    match value {
        ast::Value::Number(text, _) => {
            if text.contains(['.', 'e', 'E']) {
                match text.parse::<f64>() {
                    Ok(v) => Ok(Expression::Literal(Value::Float64(v))),
                    Err(_) => Ok(Expression::Literal(Value::Decimal(text.clone()))),
                }
            } else {
                Ok(Expression::Literal(convert_integer(text, 10)?))
            }
        }
        ast::Value::SingleQuotedString(s) | ast::Value::DoubleQuotedString(s) => {
            Ok(Expression::Literal(Value::String(s.clone())))
        }
        ast::Value::HexStringLiteral(s) => match convert_integer(s, 16) {
            Ok(v) => Ok(Expression::Literal(v)),
            Err(_) => {
                let bytes = hex::decode(s)
                    .map_err(|_| ParseError::invalid_value(s, "malformed hex literal"))?;
                Ok(Expression::Literal(Value::Bytes(bytes)))
            }
        },
        ast::Value::SingleQuotedByteStringLiteral(s) => {
            Ok(Expression::Literal(convert_integer(s, 2)?))
        }
        ast::Value::Boolean(b) => Ok(Expression::Literal(Value::Boolean(*b))),
        ast::Value::Null => Ok(Expression::Literal(Value::Null)),
        ast::Value::Placeholder(name) => {
            Ok(Expression::BindVar(name.trim_start_matches(':').to_string()))
        }
        other => Err(ParseError::UnsupportedSyntax(other.to_string())),
    }
}

pub(crate) fn convert_expr(session: &Session, expr: &ast::Expr) -> ParseResult<Expression> {
    match expr {
        ast::Expr::Identifier(ident) => Ok(Expression::column(ident.value.clone())),
        ast::Expr::CompoundIdentifier(parts) => match parts.as_slice() {
            [name] => Ok(Expression::column(name.value.clone())),
            [table, name] => Ok(Expression::qualified_column(
                table.value.clone(),
                name.value.clone(),
            )),
            _ => Err(ParseError::UnsupportedSyntax(format!(
                "column reference with too many parts: {}",
                expr
            ))),
        },
        ast::Expr::Value(value) => convert_value(&value.value),
        ast::Expr::Nested(inner) => convert_expr(session, inner),
        ast::Expr::BinaryOp { left, op, right } => convert_binary_op(session, left, op, right),
        ast::Expr::UnaryOp { op, expr } => match op {
            ast::UnaryOperator::Plus => convert_expr(session, expr),
            ast::UnaryOperator::Minus => Ok(Expression::UnaryMinus(Box::new(convert_expr(
                session, expr,
            )?))),
            ast::UnaryOperator::Not => {
                Ok(Expression::Not(Box::new(convert_expr(session, expr)?)))
            }
            other => Err(ParseError::UnsupportedSyntax(format!(
                "unary operator {}",
                other
            ))),
        },
        ast::Expr::Function(func) => convert_function(session, func),
        ast::Expr::Case {
            operand,
            conditions,
            else_result,
            ..
        } => {
            let operand = match operand {
                Some(e) => Some(Box::new(convert_expr(session, e)?)),
                None => None,
            };
            let mut branches = Vec::with_capacity(conditions.len());
            for when in conditions {
                branches.push(CaseBranch {
                    condition: convert_expr(session, &when.condition)?,
                    value: convert_expr(session, &when.result)?,
                });
            }
            let else_value = match else_result {
                Some(e) => Some(Box::new(convert_expr(session, e)?)),
                None => None,
            };
            Ok(Expression::Case {
                operand,
                branches,
                else_value,
            })
        }
        ast::Expr::Cast {
            expr, data_type, ..
        } => Ok(Expression::Cast {
            expr: Box::new(convert_expr(session, expr)?),
            target_type: data_type.to_string(),
        }),
        // CONVERT(expr, type) is a cast with the arguments flipped; the
        // USING form changes the character set instead and is not one.
        ast::Expr::Convert {
            expr,
            data_type,
            charset,
            ..
        } => {
            if charset.is_some() {
                return Err(ParseError::UnsupportedFeature(
                    "CONVERT with a character set".to_string(),
                ));
            }
            let target = data_type.as_ref().ok_or_else(|| {
                ParseError::UnsupportedSyntax("CONVERT without a target type".to_string())
            })?;
            Ok(Expression::Cast {
                expr: Box::new(convert_expr(session, expr)?),
                target_type: target.to_string(),
            })
        }
        ast::Expr::Between {
            expr,
            negated,
            low,
            high,
        } => {
            let between = Expression::Between {
                expr: Box::new(convert_expr(session, expr)?),
                low: Box::new(convert_expr(session, low)?),
                high: Box::new(convert_expr(session, high)?),
            };
            Ok(negate_if(*negated, between))
        }
        ast::Expr::InList {
            expr,
            list,
            negated,
        } => {
            let mut values = Vec::with_capacity(list.len());
            for item in list {
                values.push(convert_expr(session, item)?);
            }
            let in_tuple = Expression::InTuple {
                expr: Box::new(convert_expr(session, expr)?),
                values,
            };
            Ok(negate_if(*negated, in_tuple))
        }
        ast::Expr::InSubquery {
            expr,
            subquery,
            negated,
        } => {
            let in_subquery = Expression::InSubquery {
                expr: Box::new(convert_expr(session, expr)?),
                subquery: Box::new(convert_subquery(session, subquery)?),
            };
            Ok(negate_if(*negated, in_subquery))
        }
        ast::Expr::Like {
            negated,
            expr,
            pattern,
            escape_char,
            ..
        } => {
            let like = Expression::Like {
                expr: Box::new(convert_expr(session, expr)?),
                pattern: Box::new(convert_expr(session, pattern)?),
                escape: escape_char.as_ref().map(|e| {
                    Box::new(Expression::Literal(Value::String(
                        e.to_string().trim_matches('\'').to_string(),
                    )))
                }),
            };
            Ok(negate_if(*negated, like))
        }
        ast::Expr::RLike {
            negated,
            expr,
            pattern,
            ..
        } => {
            let regexp = Expression::BinaryOp {
                op: BinaryOperator::Regexp,
                left: Box::new(convert_expr(session, expr)?),
                right: Box::new(convert_expr(session, pattern)?),
            };
            Ok(negate_if(*negated, regexp))
        }
        ast::Expr::IsNull(e) => Ok(Expression::IsNull(Box::new(convert_expr(session, e)?))),
        ast::Expr::IsNotNull(e) => Ok(Expression::Not(Box::new(Expression::IsNull(Box::new(
            convert_expr(session, e)?,
        ))))),
        ast::Expr::IsTrue(e) => Ok(Expression::IsTrue(Box::new(convert_expr(session, e)?))),
        ast::Expr::IsNotTrue(e) => Ok(Expression::Not(Box::new(Expression::IsTrue(Box::new(
            convert_expr(session, e)?,
        ))))),
        ast::Expr::IsFalse(e) => Ok(Expression::IsFalse(Box::new(convert_expr(session, e)?))),
        ast::Expr::IsNotFalse(e) => Ok(Expression::Not(Box::new(Expression::IsFalse(
            Box::new(convert_expr(session, e)?),
        )))),
        ast::Expr::Exists { subquery, negated } => {
            let exists = Expression::Exists(Box::new(convert_subquery(session, subquery)?));
            Ok(negate_if(*negated, exists))
        }
        ast::Expr::Subquery(subquery) => convert_subquery(session, subquery),
        ast::Expr::Tuple(items) => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                values.push(convert_expr(session, item)?);
            }
            Ok(Expression::Tuple(values))
        }
        ast::Expr::Interval(interval) => convert_interval(session, interval),
        ast::Expr::Substring {
            expr,
            substring_from,
            substring_for,
            ..
        } => {
            let mut args = vec![convert_expr(session, expr)?];
            if let Some(from) = substring_from {
                args.push(convert_expr(session, from)?);
            }
            if let Some(length) = substring_for {
                args.push(convert_expr(session, length)?);
            }
            Ok(Expression::Function {
                name: "substring".to_string(),
                args,
                is_aggregate: false,
                distinct: false,
                over: None,
            })
        }
        other => Err(ParseError::UnsupportedSyntax(other.to_string())),
    }
}

fn negate_if(negated: bool, expr: Expression) -> Expression {
    if negated {
        Expression::Not(Box::new(expr))
    } else {
        expr
    }
}

fn convert_subquery(session: &Session, subquery: &ast::Query) -> ParseResult<Expression> {
    let plan = query::convert_query(session, subquery, false)?;
    Ok(Expression::Subquery {
        plan: Box::new(plan),
        text: subquery.to_string(),
    })
}

/// Arithmetic over intervals is restricted: an interval may be added to or
/// subtracted from a date expression, nothing else.
fn convert_binary_op(
    session: &Session,
    left: &ast::Expr,
    op: &ast::BinaryOperator,
    right: &ast::Expr,
) -> ParseResult<Expression> {
    let left_interval = matches!(left, ast::Expr::Interval(_));
    let right_interval = matches!(right, ast::Expr::Interval(_));
    if left_interval || right_interval {
        match op {
            ast::BinaryOperator::Plus | ast::BinaryOperator::Minus => {
                if left_interval && right_interval {
                    return Err(ParseError::UnsupportedSyntax(
                        "intervals cannot be added or subtracted from other intervals"
                            .to_string(),
                    ));
                }
                if left_interval && *op == ast::BinaryOperator::Minus {
                    return Err(ParseError::UnsupportedSyntax(
                        "subtracting from an interval".to_string(),
                    ));
                }
            }
            _ => {
                return Err(ParseError::UnsupportedSyntax(
                    "only addition and subtraction are supported on intervals".to_string(),
                ));
            }
        }
    }

    if *op == ast::BinaryOperator::NotEq {
        return Ok(Expression::Not(Box::new(Expression::BinaryOp {
            op: BinaryOperator::Eq,
            left: Box::new(convert_expr(session, left)?),
            right: Box::new(convert_expr(session, right)?),
        })));
    }

    let op = match op {
        ast::BinaryOperator::And => BinaryOperator::And,
        ast::BinaryOperator::Or => BinaryOperator::Or,
        ast::BinaryOperator::Xor => BinaryOperator::Xor,
        ast::BinaryOperator::Eq => BinaryOperator::Eq,
        ast::BinaryOperator::Spaceship => BinaryOperator::NullSafeEq,
        ast::BinaryOperator::Lt => BinaryOperator::Lt,
        ast::BinaryOperator::LtEq => BinaryOperator::LtEq,
        ast::BinaryOperator::Gt => BinaryOperator::Gt,
        ast::BinaryOperator::GtEq => BinaryOperator::GtEq,
        ast::BinaryOperator::Plus => BinaryOperator::Plus,
        ast::BinaryOperator::Minus => BinaryOperator::Minus,
        ast::BinaryOperator::Multiply => BinaryOperator::Multiply,
        ast::BinaryOperator::Divide => BinaryOperator::Divide,
        ast::BinaryOperator::MyIntegerDivide => BinaryOperator::IntDivide,
        ast::BinaryOperator::Modulo => BinaryOperator::Modulo,
        ast::BinaryOperator::BitwiseAnd => BinaryOperator::BitAnd,
        ast::BinaryOperator::BitwiseOr => BinaryOperator::BitOr,
        ast::BinaryOperator::BitwiseXor => BinaryOperator::BitXor,
        ast::BinaryOperator::PGBitwiseShiftLeft => BinaryOperator::ShiftLeft,
        ast::BinaryOperator::PGBitwiseShiftRight => BinaryOperator::ShiftRight,
        other => {
            return Err(ParseError::UnsupportedSyntax(format!(
                "binary operator {}",
                other
            )));
        }
    };
    Ok(Expression::BinaryOp {
        op,
        left: Box::new(convert_expr(session, left)?),
        right: Box::new(convert_expr(session, right)?),
    })
}

fn convert_interval(session: &Session, interval: &ast::Interval) -> ParseResult<Expression> {
    let ast::Interval {
        value,
        leading_field,
        ..
    } = interval;
    let unit = leading_field
        .as_ref()
        .map(|f| f.to_string().to_uppercase())
        .unwrap_or_else(|| "SECOND".to_string());
    Ok(Expression::Interval {
        value: Box::new(convert_expr(session, value)?),
        unit,
    })
}

fn convert_function(session: &Session, func: &ast::Function) -> ParseResult<Expression> {
    let ast::Function {
        name, args, over, ..
    } = func;
    let name = match name.0.last() {
        Some(ast::ObjectNamePart::Identifier(ident)) => ident.value.to_lowercase(),
        _ => {
            return Err(ParseError::UnsupportedSyntax(format!(
                "function name {}",
                name
            )));
        }
    };

    let mut distinct = false;
    let mut converted = Vec::new();
    match args {
        ast::FunctionArguments::None => {}
        ast::FunctionArguments::Subquery(_) => {
            return Err(ParseError::UnsupportedSyntax(
                "subquery as function argument list".to_string(),
            ));
        }
        ast::FunctionArguments::List(list) => {
            distinct = matches!(
                list.duplicate_treatment,
                Some(ast::DuplicateTreatment::Distinct)
            );
            for arg in &list.args {
                match arg {
                    ast::FunctionArg::Unnamed(ast::FunctionArgExpr::Expr(e)) => {
                        converted.push(convert_expr(session, e)?);
                    }
                    ast::FunctionArg::Unnamed(ast::FunctionArgExpr::Wildcard) => {
                        converted.push(Expression::Star { table: None });
                    }
                    ast::FunctionArg::Unnamed(ast::FunctionArgExpr::QualifiedWildcard(
                        qualifier,
                    )) => {
                        converted.push(Expression::Star {
                            table: Some(qualifier.to_string()),
                        });
                    }
                    other => {
                        return Err(ParseError::UnsupportedSyntax(format!(
                            "function argument {}",
                            other
                        )));
                    }
                }
            }
        }
    }

    if distinct && !(name == "count" && converted.len() == 1) {
        return Err(ParseError::UnsupportedSyntax(
            "more than one expression with distinct".to_string(),
        ));
    }

    let over = match over {
        Some(window_type) => Some(window::convert_window_type(session, window_type)?),
        None => None,
    };

    Ok(Expression::Function {
        is_aggregate: AGGREGATE_FUNCTIONS.contains(name.as_str()),
        name,
        args: converted,
        distinct,
        over,
    })
}

/// One ORDER BY field. Direction defaults to ascending; null ordering
/// defaults to NULLS FIRST for ascending and NULLS LAST for descending.
pub(crate) fn convert_sort_field(
    session: &Session,
    order: &ast::OrderByExpr,
) -> ParseResult<SortField> {
    let ascending = order.options.asc.unwrap_or(true);
    let null_ordering = match order.options.nulls_first {
        Some(true) => NullOrdering::NullsFirst,
        Some(false) => NullOrdering::NullsLast,
        None => {
            if ascending {
                NullOrdering::NullsFirst
            } else {
                NullOrdering::NullsLast
            }
        }
    };
    Ok(SortField {
        expr: convert_expr(session, &order.expr)?,
        ascending,
        null_ordering,
    })
}
