// DDL Compiler
//
// Lowers CREATE TABLE statements. Column types stay as source text;
// inline and table-level constraints are collected into flat index,
// foreign-key and check records.

use sqlparser::ast;
use sqlparser::tokenizer::Token;

use crate::compile::expr::convert_expr;
use crate::compile::{qualified_name, query};
use crate::error::{ParseError, ParseResult};
use crate::plan::ddl::{
    CheckConstraint, ColumnDefinition, ForeignKeyAction, ForeignKeyConstraint, IndexColumn,
    IndexConstraint, IndexDefinition, IndexUsing,
};
use crate::plan::node::LogicalPlan;
use crate::session::Session;

pub(crate) fn convert_create_table(
    session: &Session,
    create: &ast::CreateTable,
) -> ParseResult<LogicalPlan> {
    if create.or_replace {
        return Err(ParseError::UnsupportedFeature(
            "CREATE OR REPLACE TABLE".to_string(),
        ));
    }
    if create.like.is_some() || create.clone.is_some() {
        return Err(ParseError::UnsupportedFeature(
            "CREATE TABLE LIKE".to_string(),
        ));
    }

    let mut columns = Vec::with_capacity(create.columns.len());
    let mut explicit_nulls = Vec::new();
    let mut indexes = Vec::new();
    let mut foreign_keys = Vec::new();
    let mut checks = Vec::new();
    for column in &create.columns {
        let explicit_null = convert_column(
            session,
            column,
            &mut columns,
            &mut indexes,
            &mut foreign_keys,
            &mut checks,
        )?;
        if explicit_null {
            explicit_nulls.push(column.name.value.clone());
        }
    }
    let mut primary_columns: Vec<IndexColumn> = columns
        .iter()
        .filter(|column| column.primary_key)
        .map(|column| IndexColumn {
            name: column.name.clone(),
            length: None,
        })
        .collect();

    for constraint in &create.constraints {
        match constraint {
            ast::TableConstraint::PrimaryKey {
                columns: key_columns,
                ..
            } => {
                for key_column in index_columns(key_columns)? {
                    if explicit_nulls.iter().any(|c| *c == key_column.name) {
                        return Err(ParseError::PrimaryKeyOnNullField);
                    }
                    mark_primary(&mut columns, &key_column.name)?;
                    primary_columns.push(key_column);
                }
            }
            ast::TableConstraint::Unique {
                name,
                index_name,
                columns: key_columns,
                index_type,
                ..
            } => {
                indexes.push(IndexDefinition {
                    name: constraint_name(name, index_name),
                    using: index_using(index_type),
                    constraint: IndexConstraint::Unique,
                    columns: index_columns(key_columns)?,
                    ..IndexDefinition::default()
                });
            }
            ast::TableConstraint::Index {
                name,
                index_type,
                columns: key_columns,
                ..
            } => {
                indexes.push(IndexDefinition {
                    name: name.as_ref().map(|n| n.value.clone()),
                    using: index_using(index_type),
                    columns: index_columns(key_columns)?,
                    ..IndexDefinition::default()
                });
            }
            ast::TableConstraint::ForeignKey {
                name,
                columns: key_columns,
                foreign_table,
                referred_columns,
                on_delete,
                on_update,
                ..
            } => {
                foreign_keys.push(ForeignKeyConstraint {
                    name: name.as_ref().map(|n| n.value.clone()),
                    columns: key_columns.iter().map(|c| c.value.clone()).collect(),
                    parent_table: qualified_name(foreign_table)?,
                    parent_columns: referred_columns.iter().map(|c| c.value.clone()).collect(),
                    on_update: referential_action(on_update),
                    on_delete: referential_action(on_delete),
                });
            }
            ast::TableConstraint::Check { name, expr, .. } => {
                checks.push(CheckConstraint {
                    name: name.as_ref().map(|n| n.value.clone()),
                    expr: convert_expr(session, expr)?,
                    enforced: true,
                });
            }
            ast::TableConstraint::FulltextOrSpatial {
                fulltext,
                opt_index_name,
                columns: key_columns,
                ..
            } => {
                if *fulltext {
                    return Err(ParseError::UnsupportedFeature(
                        "FULLTEXT index".to_string(),
                    ));
                }
                indexes.push(IndexDefinition {
                    name: opt_index_name.as_ref().map(|n| n.value.clone()),
                    constraint: IndexConstraint::Spatial,
                    columns: index_columns(key_columns)?,
                    ..IndexDefinition::default()
                });
            }
        }
    }

    for index in &indexes {
        for index_column in &index.columns {
            if !columns.iter().any(|c| c.name == index_column.name) {
                return Err(ParseError::UnknownIndexColumn {
                    column: index_column.name.clone(),
                    index: index.name.clone().unwrap_or_default(),
                });
            }
        }
    }
    if !primary_columns.is_empty() {
        indexes.insert(
            0,
            IndexDefinition {
                name: Some("primary".to_string()),
                constraint: IndexConstraint::Primary,
                columns: primary_columns,
                ..IndexDefinition::default()
            },
        );
    }

    let select = match &create.query {
        Some(select) => Some(Box::new(query::convert_query(session, select, false)?)),
        None => None,
    };
    Ok(LogicalPlan::CreateTable {
        name: qualified_name(&create.name)?,
        if_not_exists: create.if_not_exists,
        temporary: create.temporary,
        columns,
        indexes,
        foreign_keys,
        checks,
        select,
    })
}

fn convert_column(
    session: &Session,
    column: &ast::ColumnDef,
    columns: &mut Vec<ColumnDefinition>,
    indexes: &mut Vec<IndexDefinition>,
    foreign_keys: &mut Vec<ForeignKeyConstraint>,
    checks: &mut Vec<CheckConstraint>,
) -> ParseResult<bool> {
    let name = column.name.value.clone();
    let mut explicit_null = false;
    let mut not_null = false;
    let mut primary_key = false;
    let mut auto_increment = false;
    let mut default = None;
    let mut comment = None;
    for option in &column.options {
        match &option.option {
            ast::ColumnOption::Null => explicit_null = true,
            ast::ColumnOption::NotNull => not_null = true,
            ast::ColumnOption::Default(expr) => {
                default = Some(convert_expr(session, expr)?);
            }
            ast::ColumnOption::Unique { is_primary, .. } => {
                if *is_primary {
                    primary_key = true;
                } else {
                    indexes.push(IndexDefinition {
                        constraint: IndexConstraint::Unique,
                        columns: vec![IndexColumn {
                            name: name.clone(),
                            length: None,
                        }],
                        ..IndexDefinition::default()
                    });
                }
            }
            ast::ColumnOption::Comment(text) => comment = Some(text.clone()),
            ast::ColumnOption::Check(expr) => {
                checks.push(CheckConstraint {
                    name: None,
                    expr: convert_expr(session, expr)?,
                    enforced: true,
                });
            }
            ast::ColumnOption::ForeignKey {
                foreign_table,
                referred_columns,
                on_delete,
                on_update,
                ..
            } => {
                foreign_keys.push(ForeignKeyConstraint {
                    name: None,
                    columns: vec![name.clone()],
                    parent_table: qualified_name(foreign_table)?,
                    parent_columns: referred_columns.iter().map(|c| c.value.clone()).collect(),
                    on_update: on_update
                        .as_ref()
                        .map(referential_action_ref)
                        .unwrap_or_default(),
                    on_delete: on_delete
                        .as_ref()
                        .map(referential_action_ref)
                        .unwrap_or_default(),
                });
            }
            ast::ColumnOption::DialectSpecific(tokens) => {
                if tokens.iter().any(|token| match token {
                    Token::Word(word) => word.value.eq_ignore_ascii_case("auto_increment"),
                    _ => false,
                }) {
                    auto_increment = true;
                }
            }
            _ => {}
        }
    }
    if primary_key && explicit_null {
        return Err(ParseError::PrimaryKeyOnNullField);
    }
    columns.push(ColumnDefinition {
        name,
        type_name: column.data_type.to_string(),
        nullable: !primary_key && !not_null,
        default,
        auto_increment,
        primary_key,
        comment,
    });
    Ok(explicit_null)
}

/// Promote a column named by a table-level PRIMARY KEY constraint.
fn mark_primary(columns: &mut [ColumnDefinition], name: &str) -> ParseResult<()> {
    for column in columns.iter_mut() {
        if column.name == name {
            column.primary_key = true;
            column.nullable = false;
            return Ok(());
        }
    }
    Err(ParseError::UnknownIndexColumn {
        column: name.to_string(),
        index: "primary".to_string(),
    })
}

/// Key columns of a table-level constraint. A plain column reference or a
/// `col(len)` prefix form is accepted; anything else is an expression
/// index, which is not supported.
fn index_columns(columns: &[ast::IndexColumn]) -> ParseResult<Vec<IndexColumn>> {
    let mut converted = Vec::with_capacity(columns.len());
    for column in columns {
        converted.push(index_column(&column.column.expr)?);
    }
    Ok(converted)
}

fn index_column(expr: &ast::Expr) -> ParseResult<IndexColumn> {
    let invalid = || ParseError::InvalidIndexExpression(expr.to_string());
    match expr {
        ast::Expr::Identifier(ident) => Ok(IndexColumn {
            name: ident.value.clone(),
            length: None,
        }),
        ast::Expr::Function(func) => {
            let name = match func.name.0.as_slice() {
                [ast::ObjectNamePart::Identifier(ident)] => ident.value.clone(),
                _ => return Err(invalid()),
            };
            let ast::FunctionArguments::List(list) = &func.args else {
                return Err(invalid());
            };
            let [ast::FunctionArg::Unnamed(ast::FunctionArgExpr::Expr(length))] =
                list.args.as_slice()
            else {
                return Err(invalid());
            };
            let length = match length {
                ast::Expr::Value(value) => match &value.value {
                    ast::Value::Number(text, _) => {
                        text.parse::<i64>().map_err(|_| invalid())?
                    }
                    _ => return Err(invalid()),
                },
                _ => return Err(invalid()),
            };
            if length < 1 {
                return Err(ParseError::InvalidIndexPrefix(name));
            }
            Ok(IndexColumn {
                name,
                length: Some(length),
            })
        }
        _ => Err(invalid()),
    }
}

fn constraint_name(name: &Option<ast::Ident>, index_name: &Option<ast::Ident>) -> Option<String> {
    index_name
        .as_ref()
        .or(name.as_ref())
        .map(|n| n.value.clone())
}

fn index_using(index_type: &Option<ast::IndexType>) -> IndexUsing {
    match index_type {
        Some(ast::IndexType::Hash) => IndexUsing::Hash,
        _ => IndexUsing::BTree,
    }
}

fn referential_action(action: &Option<ast::ReferentialAction>) -> ForeignKeyAction {
    action.as_ref().map(referential_action_ref).unwrap_or_default()
}

fn referential_action_ref(action: &ast::ReferentialAction) -> ForeignKeyAction {
    match action {
        ast::ReferentialAction::Restrict => ForeignKeyAction::Restrict,
        ast::ReferentialAction::Cascade => ForeignKeyAction::Cascade,
        ast::ReferentialAction::SetNull => ForeignKeyAction::SetNull,
        ast::ReferentialAction::SetDefault => ForeignKeyAction::SetDefault,
        ast::ReferentialAction::NoAction => ForeignKeyAction::NoAction,
    }
}
