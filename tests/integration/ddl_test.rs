use anyhow::{Result, anyhow};
use sqlfront::parser::parse;
use sqlfront::plan::ddl::{
    ColumnOrder, ForeignKeyAction, IndexConstraint, QualifiedName, TriggerEvent, TriggerTime,
};
use sqlfront::plan::node::LogicalPlan;
use sqlfront::{ParseError, Session};

#[test]
fn test_create_table_full_definition() -> Result<()> {
    let session = Session::new("mydb");
    let sql = "CREATE TABLE IF NOT EXISTS users (\
               id INT PRIMARY KEY AUTO_INCREMENT, \
               email VARCHAR(255) NOT NULL UNIQUE, \
               age INT DEFAULT 18, \
               bio TEXT COMMENT 'profile text')";

    let plan = parse(&session, sql).map_err(|e| anyhow!("Parse error: {:?}", e))?;
    if let LogicalPlan::CreateTable {
        name,
        if_not_exists,
        temporary,
        columns,
        indexes,
        ..
    } = plan
    {
        assert_eq!(name, QualifiedName::bare("users"));
        assert!(if_not_exists);
        assert!(!temporary);
        assert_eq!(columns.len(), 4);
        assert!(columns[0].primary_key && columns[0].auto_increment);
        assert!(!columns[1].nullable);
        assert_eq!(columns[3].comment.as_deref(), Some("profile text"));
        // Primary key index first, then the inline unique index
        assert_eq!(indexes[0].constraint, IndexConstraint::Primary);
        assert_eq!(indexes[1].constraint, IndexConstraint::Unique);
        assert_eq!(indexes[1].columns[0].name, "email");
    } else {
        panic!("Expected CreateTable");
    }

    Ok(())
}

#[test]
fn test_create_temporary_table() -> Result<()> {
    let session = Session::new("mydb");
    let plan = parse(&session, "CREATE TEMPORARY TABLE scratch (a INT)")
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;
    if let LogicalPlan::CreateTable { temporary, .. } = plan {
        assert!(temporary);
    } else {
        panic!("Expected CreateTable");
    }
    Ok(())
}

#[test]
fn test_primary_key_null_rejected() {
    let session = Session::new("mydb");
    let result = parse(&session, "CREATE TABLE t (a INT NULL, PRIMARY KEY (a))");
    assert_eq!(result, Err(ParseError::PrimaryKeyOnNullField));
}

#[test]
fn test_create_index_statement() -> Result<()> {
    let session = Session::new("mydb");
    let sql = "CREATE UNIQUE INDEX idx_email USING HASH ON users (email(20))";

    let plan = parse(&session, sql).map_err(|e| anyhow!("Parse error: {:?}", e))?;
    if let LogicalPlan::AlterCreateIndex { table, index } = plan {
        assert_eq!(table, QualifiedName::bare("users"));
        assert_eq!(index.name.as_deref(), Some("idx_email"));
        assert_eq!(index.constraint, IndexConstraint::Unique);
        assert_eq!(index.columns[0].length, Some(20));
    } else {
        panic!("Expected AlterCreateIndex");
    }

    Ok(())
}

#[test]
fn test_create_index_named_primary_rejected() {
    let session = Session::new("mydb");
    let result = parse(&session, "CREATE INDEX `PRIMARY` ON t (a)");
    assert!(matches!(result, Err(ParseError::IncorrectIndexName(_))));
}

#[test]
fn test_drop_index_statement() -> Result<()> {
    let session = Session::new("mydb");
    let plan = parse(&session, "DROP INDEX idx_email ON users")
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;
    assert_eq!(
        plan,
        LogicalPlan::AlterDropIndex {
            table: QualifiedName::bare("users"),
            name: "idx_email".to_string(),
        }
    );
    Ok(())
}

#[test]
fn test_alter_table_column_operations() -> Result<()> {
    let session = Session::new("mydb");

    let plan = parse(&session, "ALTER TABLE t ADD COLUMN age INT NOT NULL FIRST")
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;
    if let LogicalPlan::AddColumn { column, order, .. } = plan {
        assert_eq!(column.name, "age");
        assert!(!column.nullable);
        assert_eq!(order, Some(ColumnOrder::First));
    } else {
        panic!("Expected AddColumn");
    }

    let plan = parse(&session, "ALTER TABLE t DROP COLUMN age")
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;
    assert_eq!(
        plan,
        LogicalPlan::DropColumn {
            table: QualifiedName::bare("t"),
            column: "age".to_string(),
        }
    );

    let plan = parse(&session, "ALTER TABLE t RENAME COLUMN a TO b")
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;
    assert_eq!(
        plan,
        LogicalPlan::RenameColumn {
            table: QualifiedName::bare("t"),
            from: "a".to_string(),
            to: "b".to_string(),
        }
    );

    let plan = parse(&session, "ALTER TABLE t MODIFY COLUMN a BIGINT UNSIGNED")
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;
    if let LogicalPlan::ModifyColumn { column, .. } = plan {
        assert_eq!(column.type_name, "bigint unsigned");
    } else {
        panic!("Expected ModifyColumn");
    }

    Ok(())
}

#[test]
fn test_alter_table_multiple_operations_rejected() {
    let session = Session::new("mydb");
    let result = parse(&session, "ALTER TABLE t ADD COLUMN a INT, DROP COLUMN b");
    if let Err(ParseError::UnsupportedFeature(msg)) = result {
        assert!(msg.contains("single ALTER TABLE"));
    } else {
        panic!("Expected an unsupported-feature error");
    }
}

#[test]
fn test_alter_table_constraints() -> Result<()> {
    let session = Session::new("mydb");

    let plan = parse(
        &session,
        "ALTER TABLE child ADD FOREIGN KEY (pid) REFERENCES parent (id) ON UPDATE SET NULL",
    )
    .map_err(|e| anyhow!("Parse error: {:?}", e))?;
    if let LogicalPlan::AlterAddForeignKey { constraint, .. } = plan {
        assert_eq!(constraint.on_update, ForeignKeyAction::SetNull);
    } else {
        panic!("Expected AlterAddForeignKey");
    }

    let plan = parse(&session, "ALTER TABLE t ADD CHECK (a > 0) NOT ENFORCED")
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;
    if let LogicalPlan::AlterAddCheck { check, .. } = plan {
        assert!(!check.enforced);
    } else {
        panic!("Expected AlterAddCheck");
    }

    let plan = parse(&session, "ALTER TABLE t DROP CONSTRAINT chk_a")
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;
    assert_eq!(
        plan,
        LogicalPlan::AlterDropConstraint {
            table: QualifiedName::bare("t"),
            name: "chk_a".to_string(),
        }
    );

    Ok(())
}

#[test]
fn test_rename_table_statement() -> Result<()> {
    let session = Session::new("mydb");
    let plan = parse(&session, "RENAME TABLE old1 TO new1, db.old2 TO db.new2")
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;
    if let LogicalPlan::RenameTable { renames } = plan {
        assert_eq!(renames.len(), 2);
        assert_eq!(renames[0].0, QualifiedName::bare("old1"));
        assert_eq!(renames[1].1.database.as_deref(), Some("db"));
    } else {
        panic!("Expected RenameTable");
    }
    Ok(())
}

#[test]
fn test_create_view_round_trips_definition() -> Result<()> {
    let session = Session::new("mydb");
    let sql = "CREATE OR REPLACE VIEW v (a, b) AS SELECT x, y FROM t";

    let plan = parse(&session, sql).map_err(|e| anyhow!("Parse error: {:?}", e))?;
    if let LogicalPlan::CreateView {
        name,
        columns,
        definition,
        or_replace,
        child,
    } = plan
    {
        assert_eq!(name, QualifiedName::bare("v"));
        assert_eq!(columns, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(definition, "SELECT x, y FROM t");
        assert!(or_replace);
        assert!(matches!(*child, LogicalPlan::Project { .. }));
    } else {
        panic!("Expected CreateView");
    }

    Ok(())
}

#[test]
fn test_drop_view_statement() -> Result<()> {
    let session = Session::new("mydb");
    let plan = parse(&session, "DROP VIEW IF EXISTS v1, v2")
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;
    assert_eq!(
        plan,
        LogicalPlan::DropView {
            views: vec![QualifiedName::bare("v1"), QualifiedName::bare("v2")],
            if_exists: true,
        }
    );
    Ok(())
}

#[test]
fn test_create_trigger_single_statement_body() -> Result<()> {
    let session = Session::new("mydb");
    let sql = "CREATE TRIGGER trg BEFORE INSERT ON t FOR EACH ROW UPDATE audit SET n = n + 1";

    let plan = parse(&session, sql).map_err(|e| anyhow!("Parse error: {:?}", e))?;
    if let LogicalPlan::CreateTrigger { definition, body } = plan {
        assert_eq!(definition.name, "trg");
        assert_eq!(definition.time, TriggerTime::Before);
        assert_eq!(definition.event, TriggerEvent::Insert);
        assert_eq!(definition.table, QualifiedName::bare("t"));
        assert_eq!(definition.body_text, "UPDATE audit SET n = n + 1");
        assert_eq!(definition.create_text, sql);
        assert!(matches!(*body, LogicalPlan::Update { .. }));
    } else {
        panic!("Expected CreateTrigger");
    }

    Ok(())
}

#[test]
fn test_create_trigger_block_body() -> Result<()> {
    let session = Session::new("mydb");
    let sql = "CREATE TRIGGER trg AFTER DELETE ON t FOR EACH ROW \
               BEGIN UPDATE a SET n = 1; UPDATE b SET n = 2; END";

    let plan = parse(&session, sql).map_err(|e| anyhow!("Parse error: {:?}", e))?;
    if let LogicalPlan::CreateTrigger { body, .. } = plan {
        if let LogicalPlan::Block { statements } = *body {
            assert_eq!(statements.len(), 2);
        } else {
            panic!("Expected Block body");
        }
    } else {
        panic!("Expected CreateTrigger");
    }

    Ok(())
}

#[test]
fn test_database_statements() -> Result<()> {
    let session = Session::new("mydb");

    let plan = parse(&session, "CREATE DATABASE IF NOT EXISTS reports")
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;
    assert_eq!(
        plan,
        LogicalPlan::CreateDatabase {
            name: "reports".to_string(),
            if_not_exists: true,
        }
    );

    let plan = parse(&session, "DROP DATABASE reports")
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;
    assert_eq!(
        plan,
        LogicalPlan::DropDatabase {
            name: "reports".to_string(),
            if_exists: false,
        }
    );

    let plan = parse(&session, "TRUNCATE TABLE t")
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;
    assert_eq!(
        plan,
        LogicalPlan::Truncate {
            table: QualifiedName::bare("t"),
        }
    );

    Ok(())
}
