// Expression Nodes
//
// Unresolved expression tree produced by the compiler. Columns and tables
// are placeholders; binding them to a schema happens downstream.

use std::fmt;

use crate::plan::node::LogicalPlan;

/// A literal value together with its narrowed semantic type. Integer
/// literals are narrowed to the smallest variant that represents them
/// exactly; see `compile::expr`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float64(f64),
    /// Exact decimal text too wide for any native integer type.
    Decimal(String),
    String(String),
    Bytes(Vec<u8>),
    Boolean(bool),
    Null,
}

impl Value {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int8(v) => Some(*v as i64),
            Value::UInt8(v) => Some(*v as i64),
            Value::Int16(v) => Some(*v as i64),
            Value::UInt16(v) => Some(*v as i64),
            Value::Int32(v) => Some(*v as i64),
            Value::UInt32(v) => Some(*v as i64),
            Value::Int64(v) => Some(*v),
            Value::UInt64(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int8(v) => write!(f, "{}", v),
            Value::UInt8(v) => write!(f, "{}", v),
            Value::Int16(v) => write!(f, "{}", v),
            Value::UInt16(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::UInt32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::UInt64(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::Decimal(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{:?}", v),
            Value::Bytes(v) => write!(f, "0x{}", hex::encode(v)),
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Null => write!(f, "NULL"),
        }
    }
}

/// Binary operators. `!=` never appears here: the compiler lowers it to
/// `Not(Eq)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    And,
    Or,
    Xor,
    Eq,
    NullSafeEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Plus,
    Minus,
    Multiply,
    Divide,
    IntDivide,
    Modulo,
    BitAnd,
    BitOr,
    BitXor,
    ShiftLeft,
    ShiftRight,
    Regexp,
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
            BinaryOperator::Xor => "XOR",
            BinaryOperator::Eq => "=",
            BinaryOperator::NullSafeEq => "<=>",
            BinaryOperator::Lt => "<",
            BinaryOperator::LtEq => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::GtEq => ">=",
            BinaryOperator::Plus => "+",
            BinaryOperator::Minus => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::IntDivide => "DIV",
            BinaryOperator::Modulo => "%",
            BinaryOperator::BitAnd => "&",
            BinaryOperator::BitOr => "|",
            BinaryOperator::BitXor => "^",
            BinaryOperator::ShiftLeft => "<<",
            BinaryOperator::ShiftRight => ">>",
            BinaryOperator::Regexp => "REGEXP",
        };
        write!(f, "{}", symbol)
    }
}

/// One WHEN/THEN branch of a CASE expression.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseBranch {
    pub condition: Expression,
    pub value: Expression,
}

/// Sort direction plus null placement for one ORDER BY field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullOrdering {
    NullsFirst,
    NullsLast,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortField {
    pub expr: Expression,
    pub ascending: bool,
    pub null_ordering: NullOrdering,
}

impl SortField {
    pub fn ascending(expr: Expression) -> SortField {
        SortField {
            expr,
            ascending: true,
            null_ordering: NullOrdering::NullsFirst,
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            self.expr,
            if self.ascending { "ASC" } else { "DESC" }
        )
    }
}

/// ROWS or RANGE framing for a window function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameUnit {
    Rows,
    Range,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FrameBound {
    UnboundedPreceding,
    Preceding(Box<Expression>),
    CurrentRow,
    Following(Box<Expression>),
    UnboundedFollowing,
}

/// Window frame; a missing end bound in the source defaults to the
/// current row.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSpecification {
    pub unit: FrameUnit,
    pub start: FrameBound,
    pub end: FrameBound,
}

/// A window definition, inline in OVER(...) or referencing a WINDOW-clause
/// entry by name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WindowDefinition {
    pub partition_by: Vec<Expression>,
    pub order_by: Vec<SortField>,
    pub frame: Option<FrameSpecification>,
    pub name_ref: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// A column reference not yet bound to a table schema.
    UnresolvedColumn {
        table: Option<String>,
        name: String,
    },
    Literal(Value),
    Alias {
        name: String,
        expr: Box<Expression>,
    },
    /// `*` or `table.*` in a projection.
    Star {
        table: Option<String>,
    },
    UnaryMinus(Box<Expression>),
    Not(Box<Expression>),
    BinaryOp {
        op: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Like {
        expr: Box<Expression>,
        pattern: Box<Expression>,
        escape: Option<Box<Expression>>,
    },
    InTuple {
        expr: Box<Expression>,
        values: Vec<Expression>,
    },
    InSubquery {
        expr: Box<Expression>,
        subquery: Box<Expression>,
    },
    Exists(Box<Expression>),
    IsNull(Box<Expression>),
    IsTrue(Box<Expression>),
    IsFalse(Box<Expression>),
    Between {
        expr: Box<Expression>,
        low: Box<Expression>,
        high: Box<Expression>,
    },
    Case {
        operand: Option<Box<Expression>>,
        branches: Vec<CaseBranch>,
        else_value: Option<Box<Expression>>,
    },
    Cast {
        expr: Box<Expression>,
        target_type: String,
    },
    Function {
        /// Lower-cased function name.
        name: String,
        args: Vec<Expression>,
        is_aggregate: bool,
        distinct: bool,
        over: Option<WindowDefinition>,
    },
    Tuple(Vec<Expression>),
    /// Prepared-statement placeholder.
    BindVar(String),
    Interval {
        value: Box<Expression>,
        unit: String,
    },
    /// Scalar subquery, carrying its compiled plan and original text.
    Subquery {
        plan: Box<LogicalPlan>,
        text: String,
    },
    /// The DEFAULT keyword in INSERT values and SET assignments.
    DefaultMarker,
}

impl Expression {
    pub fn column(name: impl Into<String>) -> Expression {
        Expression::UnresolvedColumn {
            table: None,
            name: name.into(),
        }
    }

    pub fn qualified_column(table: impl Into<String>, name: impl Into<String>) -> Expression {
        Expression::UnresolvedColumn {
            table: Some(table.into()),
            name: name.into(),
        }
    }

    pub fn literal(value: Value) -> Expression {
        Expression::Literal(value)
    }

    /// True if this tree contains an aggregate call outside any OVER clause.
    pub fn contains_aggregate(&self) -> bool {
        match self {
            Expression::Function {
                is_aggregate, over, ..
            } if *is_aggregate && over.is_none() => true,
            _ => self.children().iter().any(|c| c.contains_aggregate()),
        }
    }

    /// True if this tree contains a window-function invocation.
    pub fn contains_window(&self) -> bool {
        match self {
            Expression::Function { over: Some(_), .. } => true,
            _ => self.children().iter().any(|c| c.contains_window()),
        }
    }

    fn children(&self) -> Vec<&Expression> {
        match self {
            Expression::UnresolvedColumn { .. }
            | Expression::Literal(_)
            | Expression::Star { .. }
            | Expression::BindVar(_)
            | Expression::Subquery { .. }
            | Expression::DefaultMarker => Vec::new(),
            Expression::Alias { expr, .. }
            | Expression::UnaryMinus(expr)
            | Expression::Not(expr)
            | Expression::IsNull(expr)
            | Expression::IsTrue(expr)
            | Expression::IsFalse(expr)
            | Expression::Exists(expr)
            | Expression::Cast { expr, .. }
            | Expression::Interval { value: expr, .. } => vec![expr],
            Expression::BinaryOp { left, right, .. } => vec![left, right],
            Expression::Like {
                expr,
                pattern,
                escape,
            } => {
                let mut children = vec![expr.as_ref(), pattern.as_ref()];
                if let Some(escape) = escape {
                    children.push(escape);
                }
                children
            }
            Expression::InTuple { expr, values } => {
                let mut children = vec![expr.as_ref()];
                children.extend(values.iter());
                children
            }
            Expression::InSubquery { expr, subquery } => vec![expr, subquery],
            Expression::Between { expr, low, high } => vec![expr, low, high],
            Expression::Case {
                operand,
                branches,
                else_value,
            } => {
                let mut children = Vec::new();
                if let Some(operand) = operand {
                    children.push(operand.as_ref());
                }
                for branch in branches {
                    children.push(&branch.condition);
                    children.push(&branch.value);
                }
                if let Some(else_value) = else_value {
                    children.push(else_value.as_ref());
                }
                children
            }
            Expression::Function { args, .. } => args.iter().collect(),
            Expression::Tuple(values) => values.iter().collect(),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::UnresolvedColumn { table: Some(t), name } => write!(f, "{}.{}", t, name),
            Expression::UnresolvedColumn { table: None, name } => write!(f, "{}", name),
            Expression::Literal(value) => write!(f, "{}", value),
            Expression::Alias { name, expr } => write!(f, "{} AS {}", expr, name),
            Expression::Star { table: Some(t) } => write!(f, "{}.*", t),
            Expression::Star { table: None } => write!(f, "*"),
            Expression::UnaryMinus(expr) => write!(f, "-{}", expr),
            Expression::Not(expr) => write!(f, "NOT {}", expr),
            Expression::BinaryOp { op, left, right } => write!(f, "({} {} {})", left, op, right),
            Expression::Like {
                expr,
                pattern,
                escape: _,
            } => write!(f, "({} LIKE {})", expr, pattern),
            Expression::InTuple { expr, values } => {
                write!(f, "({} IN (", expr)?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                write!(f, "))")
            }
            Expression::InSubquery { expr, subquery } => {
                write!(f, "({} IN {})", expr, subquery)
            }
            Expression::Exists(subquery) => write!(f, "EXISTS {}", subquery),
            Expression::IsNull(expr) => write!(f, "({} IS NULL)", expr),
            Expression::IsTrue(expr) => write!(f, "({} IS TRUE)", expr),
            Expression::IsFalse(expr) => write!(f, "({} IS FALSE)", expr),
            Expression::Between { expr, low, high } => {
                write!(f, "({} BETWEEN {} AND {})", expr, low, high)
            }
            Expression::Case {
                operand,
                branches,
                else_value,
            } => {
                write!(f, "CASE")?;
                if let Some(operand) = operand {
                    write!(f, " {}", operand)?;
                }
                for branch in branches {
                    write!(f, " WHEN {} THEN {}", branch.condition, branch.value)?;
                }
                if let Some(else_value) = else_value {
                    write!(f, " ELSE {}", else_value)?;
                }
                write!(f, " END")
            }
            Expression::Cast { expr, target_type } => {
                write!(f, "CAST({} AS {})", expr, target_type)
            }
            Expression::Function {
                name,
                args,
                distinct,
                ..
            } => {
                write!(f, "{}(", name)?;
                if *distinct {
                    write!(f, "DISTINCT ")?;
                }
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expression::Tuple(values) => {
                write!(f, "(")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                write!(f, ")")
            }
            Expression::BindVar(name) => write!(f, ":{}", name),
            Expression::Interval { value, unit } => write!(f, "INTERVAL {} {}", value, unit),
            Expression::Subquery { text, .. } => write!(f, "({})", text),
            Expression::DefaultMarker => write!(f, "DEFAULT"),
        }
    }
}
