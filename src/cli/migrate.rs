// src/cli/migrate.rs — Database migration command
//
// Migrations run automatically whenever the database is opened; this
// command shows what has been applied and can undo the latest one.

use rusqlite::Connection;
use std::path::Path;

use crate::store::schema;

pub async fn run_migrate(db_path: &Path, status_only: bool, rollback: bool) -> anyhow::Result<()> {
    if !db_path.exists() && (status_only || rollback) {
        println!("No database found at: {}", db_path.display());
        println!("Run `pomotask serve` or `pomotask adduser` to create it.");
        return Ok(());
    }
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(db_path)?;

    if rollback {
        match schema::rollback_last(&conn)? {
            Some(v) => println!("Rolled back migration v{v}."),
            None => println!("No migrations to roll back."),
        }
    } else if !status_only {
        println!("Running database migrations...");
        schema::run_migrations(&conn)?;
    }

    print!("{}", migration_status(&conn)?);
    Ok(())
}

fn migration_status(conn: &Connection) -> anyhow::Result<String> {
    let version = schema::current_version(conn)?;
    let mut out = format!("Current schema version: {version}\n");

    let mut stmt = conn.prepare("SELECT version, name, applied_at FROM _migrations ORDER BY version")?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, u32>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;
    for row in rows {
        let (version, name, applied_at) = row?;
        out.push_str(&format!("  v{version}: {name} (applied {applied_at})\n"));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_lists_applied_migrations() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(migration_status(&conn)
            .unwrap()
            .starts_with("Current schema version: 0"));

        schema::run_migrations(&conn).unwrap();
        let status = migration_status(&conn).unwrap();
        assert!(status.contains("v1: initial_schema"));
        assert!(status.contains("v2: login_sessions"));
    }

    #[tokio::test]
    async fn test_rollback_on_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pomotask.db");
        run_migrate(&path, false, false).await.unwrap();
        run_migrate(&path, false, true).await.unwrap();

        let conn = Connection::open(&path).unwrap();
        assert_eq!(schema::current_version(&conn).unwrap(), 1);
    }
}
