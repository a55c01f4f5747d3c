// Logical Plan Nodes
//
// The plan tree produced by parsing. Nodes own their children, are built
// bottom-up and never mutated afterwards; resolution and execution belong
// to a downstream subsystem.

use std::fmt;

use linked_hash_map::LinkedHashMap;

use crate::plan::ddl::{
    CheckConstraint, ColumnDefinition, ColumnOrder, ForeignKeyConstraint, IndexDefinition,
    QualifiedName, SetVariable, TableLock, TriggerDefinition,
};
use crate::plan::expr::{Expression, SortField, WindowDefinition};
use crate::session::SessionWarning;

/// One `SET col = value` pair of an UPDATE statement.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateAssignment {
    pub column: Expression,
    pub value: Expression,
}

/// One entry of a WITH clause: the name, optional column list and the
/// aliased subquery it binds.
#[derive(Debug, Clone, PartialEq)]
pub struct CommonTableExpression {
    pub name: String,
    pub columns: Vec<String>,
    pub subquery: Box<LogicalPlan>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Natural,
    Cross,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOpKind {
    Union,
    Intersect,
    Except,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillKind {
    Connection,
    Query,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogicalPlan {
    /// No-op node for empty or comment-only input.
    Nothing,

    // Relational operators
    UnresolvedTable {
        name: QualifiedName,
        /// AS OF expression for historical reads.
        as_of: Option<Expression>,
    },
    TableAlias {
        name: String,
        child: Box<LogicalPlan>,
    },
    SubqueryAlias {
        name: String,
        columns: Vec<String>,
        child: Box<LogicalPlan>,
        /// Original subquery source text.
        text: String,
    },
    Values {
        rows: Vec<Vec<Expression>>,
    },
    Filter {
        predicate: Expression,
        child: Box<LogicalPlan>,
    },
    Project {
        projections: Vec<Expression>,
        child: Box<LogicalPlan>,
    },
    GroupBy {
        select_exprs: Vec<Expression>,
        group_exprs: Vec<Expression>,
        child: Box<LogicalPlan>,
    },
    Window {
        select_exprs: Vec<Expression>,
        child: Box<LogicalPlan>,
    },
    NamedWindows {
        windows: LinkedHashMap<String, WindowDefinition>,
        child: Box<LogicalPlan>,
    },
    Having {
        predicate: Expression,
        child: Box<LogicalPlan>,
    },
    Distinct {
        child: Box<LogicalPlan>,
    },
    Sort {
        fields: Vec<SortField>,
        child: Box<LogicalPlan>,
    },
    /// OFFSET is always the inner wrap; LIMIT wraps it, never vice versa.
    Offset {
        count: Expression,
        child: Box<LogicalPlan>,
    },
    Limit {
        count: Expression,
        child: Box<LogicalPlan>,
    },
    With {
        ctes: Vec<CommonTableExpression>,
        recursive: bool,
        child: Box<LogicalPlan>,
    },
    Join {
        kind: JoinKind,
        condition: Option<Expression>,
        left: Box<LogicalPlan>,
        right: Box<LogicalPlan>,
    },
    SetOp {
        op: SetOpKind,
        left: Box<LogicalPlan>,
        right: Box<LogicalPlan>,
    },
    /// Ordered statement sequence, used for BEGIN..END trigger bodies.
    Block {
        statements: Vec<LogicalPlan>,
    },

    // DML
    Insert {
        table: Box<LogicalPlan>,
        columns: Vec<String>,
        source: Box<LogicalPlan>,
        is_replace: bool,
    },
    Update {
        assignments: Vec<UpdateAssignment>,
        child: Box<LogicalPlan>,
    },
    Delete {
        child: Box<LogicalPlan>,
    },
    Truncate {
        table: QualifiedName,
    },

    // DDL
    CreateTable {
        name: QualifiedName,
        if_not_exists: bool,
        temporary: bool,
        columns: Vec<ColumnDefinition>,
        indexes: Vec<IndexDefinition>,
        foreign_keys: Vec<ForeignKeyConstraint>,
        checks: Vec<CheckConstraint>,
        select: Option<Box<LogicalPlan>>,
    },
    DropTable {
        database: Option<String>,
        tables: Vec<String>,
        if_exists: bool,
    },
    RenameTable {
        renames: Vec<(QualifiedName, QualifiedName)>,
    },
    AddColumn {
        table: QualifiedName,
        column: ColumnDefinition,
        order: Option<ColumnOrder>,
    },
    DropColumn {
        table: QualifiedName,
        column: String,
    },
    RenameColumn {
        table: QualifiedName,
        from: String,
        to: String,
    },
    ModifyColumn {
        table: QualifiedName,
        column: ColumnDefinition,
        order: Option<ColumnOrder>,
    },
    ChangeColumn {
        table: QualifiedName,
        old_name: String,
        column: ColumnDefinition,
        order: Option<ColumnOrder>,
    },
    AlterCreateIndex {
        table: QualifiedName,
        index: IndexDefinition,
    },
    AlterDropIndex {
        table: QualifiedName,
        name: String,
    },
    AlterAddForeignKey {
        table: QualifiedName,
        constraint: ForeignKeyConstraint,
    },
    AlterDropForeignKey {
        table: QualifiedName,
        name: String,
    },
    AlterAddCheck {
        table: QualifiedName,
        check: CheckConstraint,
    },
    AlterDropConstraint {
        table: QualifiedName,
        name: String,
    },
    CreateView {
        name: QualifiedName,
        columns: Vec<String>,
        child: Box<LogicalPlan>,
        /// Stored SELECT source text.
        definition: String,
        or_replace: bool,
    },
    DropView {
        views: Vec<QualifiedName>,
        if_exists: bool,
    },
    CreateTrigger {
        definition: TriggerDefinition,
        body: Box<LogicalPlan>,
    },
    CreateDatabase {
        name: String,
        if_not_exists: bool,
    },
    DropDatabase {
        name: String,
        if_exists: bool,
    },

    // Introspection
    ShowTables {
        database: Option<String>,
        full: bool,
    },
    ShowColumns {
        table: QualifiedName,
        full: bool,
    },
    ShowDatabases,
    ShowCollation,
    ShowTableStatus {
        database: Option<String>,
    },
    ShowIndexes {
        table: QualifiedName,
    },
    ShowCreateTable {
        table: QualifiedName,
    },
    ShowCreateView {
        view: QualifiedName,
    },
    ShowCreateDatabase {
        database: String,
        if_not_exists: bool,
    },
    ShowVariables {
        global: bool,
    },
    /// Snapshot of the session warnings at parse time.
    ShowWarnings {
        warnings: Vec<SessionWarning>,
    },
    ShowProcessList,

    // Administrative
    Set {
        variables: Vec<SetVariable>,
    },
    Use {
        database: String,
    },
    LockTables {
        locks: Vec<TableLock>,
    },
    UnlockTables,
    StartTransaction {
        read_only: Option<bool>,
    },
    Commit,
    Rollback,
    Savepoint {
        name: String,
    },
    RollbackSavepoint {
        name: String,
    },
    ReleaseSavepoint {
        name: String,
    },
    Kill {
        kind: KillKind,
        connection_id: u64,
    },
    DescribeQuery {
        format: String,
        child: Box<LogicalPlan>,
    },
}

impl LogicalPlan {
    pub fn filter(predicate: Expression, child: LogicalPlan) -> LogicalPlan {
        LogicalPlan::Filter {
            predicate,
            child: Box::new(child),
        }
    }

    pub fn project(projections: Vec<Expression>, child: LogicalPlan) -> LogicalPlan {
        LogicalPlan::Project {
            projections,
            child: Box::new(child),
        }
    }

    /// Header line plus borrowed children, shared by Display.
    fn describe(&self) -> (String, Vec<&LogicalPlan>) {
        match self {
            LogicalPlan::Nothing => ("Nothing".to_string(), vec![]),
            LogicalPlan::UnresolvedTable { name, as_of } => match as_of {
                Some(expr) => (format!("UnresolvedTable({} AS OF {})", name, expr), vec![]),
                None => (format!("UnresolvedTable({})", name), vec![]),
            },
            LogicalPlan::TableAlias { name, child } => {
                (format!("TableAlias({})", name), vec![child.as_ref()])
            }
            LogicalPlan::SubqueryAlias { name, child, .. } => {
                (format!("SubqueryAlias({})", name), vec![child.as_ref()])
            }
            LogicalPlan::Values { rows } => (format!("Values({} rows)", rows.len()), vec![]),
            LogicalPlan::Filter { predicate, child } => {
                (format!("Filter({})", predicate), vec![child.as_ref()])
            }
            LogicalPlan::Project { projections, child } => (
                format!("Project({})", join_exprs(projections)),
                vec![child.as_ref()],
            ),
            LogicalPlan::GroupBy {
                select_exprs,
                group_exprs,
                child,
            } => (
                format!(
                    "GroupBy({} group by {})",
                    join_exprs(select_exprs),
                    join_exprs(group_exprs)
                ),
                vec![child.as_ref()],
            ),
            LogicalPlan::Window { select_exprs, child } => (
                format!("Window({})", join_exprs(select_exprs)),
                vec![child.as_ref()],
            ),
            LogicalPlan::NamedWindows { windows, child } => {
                let names: Vec<&str> = windows.keys().map(String::as_str).collect();
                (
                    format!("NamedWindows({})", names.join(", ")),
                    vec![child.as_ref()],
                )
            }
            LogicalPlan::Having { predicate, child } => {
                (format!("Having({})", predicate), vec![child.as_ref()])
            }
            LogicalPlan::Distinct { child } => ("Distinct".to_string(), vec![child.as_ref()]),
            LogicalPlan::Sort { fields, child } => {
                let rendered: Vec<String> = fields.iter().map(|f| f.to_string()).collect();
                (format!("Sort({})", rendered.join(", ")), vec![child.as_ref()])
            }
            LogicalPlan::Offset { count, child } => {
                (format!("Offset({})", count), vec![child.as_ref()])
            }
            LogicalPlan::Limit { count, child } => {
                (format!("Limit({})", count), vec![child.as_ref()])
            }
            LogicalPlan::With { ctes, recursive, child } => {
                let names: Vec<&str> = ctes.iter().map(|c| c.name.as_str()).collect();
                let mut children: Vec<&LogicalPlan> =
                    ctes.iter().map(|c| c.subquery.as_ref()).collect();
                children.push(child.as_ref());
                (
                    format!(
                        "With{}({})",
                        if *recursive { " RECURSIVE" } else { "" },
                        names.join(", ")
                    ),
                    children,
                )
            }
            LogicalPlan::Join {
                kind,
                condition,
                left,
                right,
            } => {
                let header = match condition {
                    Some(cond) => format!("{:?}Join({})", kind, cond),
                    None => format!("{:?}Join", kind),
                };
                (header, vec![left.as_ref(), right.as_ref()])
            }
            LogicalPlan::SetOp { op, left, right } => {
                (format!("{:?}", op), vec![left.as_ref(), right.as_ref()])
            }
            LogicalPlan::Block { statements } => {
                ("Block".to_string(), statements.iter().collect())
            }
            LogicalPlan::Insert {
                table,
                columns,
                source,
                is_replace,
            } => (
                format!(
                    "{}({})",
                    if *is_replace { "Replace" } else { "Insert" },
                    columns.join(", ")
                ),
                vec![table.as_ref(), source.as_ref()],
            ),
            LogicalPlan::Update { assignments, child } => {
                let rendered: Vec<String> = assignments
                    .iter()
                    .map(|a| format!("{} = {}", a.column, a.value))
                    .collect();
                (format!("Update({})", rendered.join(", ")), vec![child.as_ref()])
            }
            LogicalPlan::Delete { child } => ("Delete".to_string(), vec![child.as_ref()]),
            LogicalPlan::Truncate { table } => (format!("Truncate({})", table), vec![]),
            LogicalPlan::CreateTable { name, select, .. } => {
                let children = match select {
                    Some(query) => vec![query.as_ref()],
                    None => vec![],
                };
                (format!("CreateTable({})", name), children)
            }
            LogicalPlan::DropTable { database, tables, .. } => {
                let prefix = database.as_deref().unwrap_or("");
                (
                    format!("DropTable({} {})", prefix, tables.join(", ")),
                    vec![],
                )
            }
            LogicalPlan::RenameTable { renames } => {
                let rendered: Vec<String> = renames
                    .iter()
                    .map(|(from, to)| format!("{} -> {}", from, to))
                    .collect();
                (format!("RenameTable({})", rendered.join(", ")), vec![])
            }
            LogicalPlan::AddColumn { table, column, .. } => (
                format!("AddColumn({}.{})", table, column.name),
                vec![],
            ),
            LogicalPlan::DropColumn { table, column } => {
                (format!("DropColumn({}.{})", table, column), vec![])
            }
            LogicalPlan::RenameColumn { table, from, to } => (
                format!("RenameColumn({}.{} -> {})", table, from, to),
                vec![],
            ),
            LogicalPlan::ModifyColumn { table, column, .. } => (
                format!("ModifyColumn({}.{})", table, column.name),
                vec![],
            ),
            LogicalPlan::ChangeColumn { table, old_name, column, .. } => (
                format!("ChangeColumn({}.{} -> {})", table, old_name, column.name),
                vec![],
            ),
            LogicalPlan::AlterCreateIndex { table, index } => (
                format!(
                    "AlterCreateIndex({}, {})",
                    table,
                    index.name.as_deref().unwrap_or("")
                ),
                vec![],
            ),
            LogicalPlan::AlterDropIndex { table, name } => {
                (format!("AlterDropIndex({}, {})", table, name), vec![])
            }
            LogicalPlan::AlterAddForeignKey { table, .. } => {
                (format!("AlterAddForeignKey({})", table), vec![])
            }
            LogicalPlan::AlterDropForeignKey { table, name } => {
                (format!("AlterDropForeignKey({}, {})", table, name), vec![])
            }
            LogicalPlan::AlterAddCheck { table, .. } => {
                (format!("AlterAddCheck({})", table), vec![])
            }
            LogicalPlan::AlterDropConstraint { table, name } => {
                (format!("AlterDropConstraint({}, {})", table, name), vec![])
            }
            LogicalPlan::CreateView { name, child, .. } => {
                (format!("CreateView({})", name), vec![child.as_ref()])
            }
            LogicalPlan::DropView { views, .. } => {
                let rendered: Vec<String> = views.iter().map(|v| v.to_string()).collect();
                (format!("DropView({})", rendered.join(", ")), vec![])
            }
            LogicalPlan::CreateTrigger { definition, body } => (
                format!("CreateTrigger({})", definition.name),
                vec![body.as_ref()],
            ),
            LogicalPlan::CreateDatabase { name, .. } => {
                (format!("CreateDatabase({})", name), vec![])
            }
            LogicalPlan::DropDatabase { name, .. } => (format!("DropDatabase({})", name), vec![]),
            LogicalPlan::ShowTables { database, .. } => (
                format!("ShowTables({})", database.as_deref().unwrap_or("")),
                vec![],
            ),
            LogicalPlan::ShowColumns { table, .. } => (format!("ShowColumns({})", table), vec![]),
            LogicalPlan::ShowDatabases => ("ShowDatabases".to_string(), vec![]),
            LogicalPlan::ShowCollation => ("ShowCollation".to_string(), vec![]),
            LogicalPlan::ShowTableStatus { database } => (
                format!("ShowTableStatus({})", database.as_deref().unwrap_or("")),
                vec![],
            ),
            LogicalPlan::ShowIndexes { table } => (format!("ShowIndexes({})", table), vec![]),
            LogicalPlan::ShowCreateTable { table } => {
                (format!("ShowCreateTable({})", table), vec![])
            }
            LogicalPlan::ShowCreateView { view } => (format!("ShowCreateView({})", view), vec![]),
            LogicalPlan::ShowCreateDatabase { database, .. } => {
                (format!("ShowCreateDatabase({})", database), vec![])
            }
            LogicalPlan::ShowVariables { global } => (
                format!(
                    "ShowVariables({})",
                    if *global { "global" } else { "session" }
                ),
                vec![],
            ),
            LogicalPlan::ShowWarnings { warnings } => {
                (format!("ShowWarnings({})", warnings.len()), vec![])
            }
            LogicalPlan::ShowProcessList => ("ShowProcessList".to_string(), vec![]),
            LogicalPlan::Set { variables } => {
                let rendered: Vec<String> = variables
                    .iter()
                    .map(|v| format!("{} = {}", v.name, v.value))
                    .collect();
                (format!("Set({})", rendered.join(", ")), vec![])
            }
            LogicalPlan::Use { database } => (format!("Use({})", database), vec![]),
            LogicalPlan::LockTables { locks } => {
                let rendered: Vec<String> = locks
                    .iter()
                    .map(|l| {
                        format!("{} {}", l.table, if l.write { "WRITE" } else { "READ" })
                    })
                    .collect();
                (format!("LockTables({})", rendered.join(", ")), vec![])
            }
            LogicalPlan::UnlockTables => ("UnlockTables".to_string(), vec![]),
            LogicalPlan::StartTransaction { .. } => ("StartTransaction".to_string(), vec![]),
            LogicalPlan::Commit => ("Commit".to_string(), vec![]),
            LogicalPlan::Rollback => ("Rollback".to_string(), vec![]),
            LogicalPlan::Savepoint { name } => (format!("Savepoint({})", name), vec![]),
            LogicalPlan::RollbackSavepoint { name } => {
                (format!("RollbackSavepoint({})", name), vec![])
            }
            LogicalPlan::ReleaseSavepoint { name } => {
                (format!("ReleaseSavepoint({})", name), vec![])
            }
            LogicalPlan::Kill { kind, connection_id } => {
                (format!("Kill({:?}, {})", kind, connection_id), vec![])
            }
            LogicalPlan::DescribeQuery { format, child } => {
                (format!("DescribeQuery(format={})", format), vec![child.as_ref()])
            }
        }
    }

    fn fmt_indent(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let (header, children) = self.describe();
        if depth > 0 {
            writeln!(f)?;
            write!(f, "{}", " ".repeat(depth * 2))?;
        }
        write!(f, "{}", header)?;
        for child in children {
            child.fmt_indent(f, depth + 1)?;
        }
        Ok(())
    }
}

fn join_exprs(exprs: &[Expression]) -> String {
    let rendered: Vec<String> = exprs.iter().map(|e| e.to_string()).collect();
    rendered.join(", ")
}

impl fmt::Display for LogicalPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indent(f, 0)
    }
}
