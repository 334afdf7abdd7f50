use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;

/// Open the SQLite file, creating its parent directory when needed. Foreign
/// keys are a per-connection setting in SQLite, so every connection we hand
/// out has them switched on; the set-null and cascade rules depend on it.
pub(super) fn open_connection(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).context("failed to create database directory")?;
        }
    }

    let conn = Connection::open(path).context("failed to open SQLite database")?;
    conn.execute("PRAGMA foreign_keys = ON", [])
        .context("failed to enable foreign keys")?;
    register_functions(&conn)?;
    Ok(conn)
}

/// `portal_lower(text)`: full Unicode lower-casing. SQLite's own `lower()`
/// and `LIKE` only fold ASCII.
fn register_functions(conn: &Connection) -> Result<()> {
    conn.create_scalar_function(
        "portal_lower",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let value: Option<String> = ctx.get(0)?;
            Ok(value.map(|text| text.to_lowercase()))
        },
    )
    .context("failed to register SQLite functions")
}

/// Create the portal tables if they do not exist yet.
pub(super) fn ensure_schema(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS Teachers (
            teacher_id INTEGER PRIMARY KEY AUTOINCREMENT,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            subject TEXT NOT NULL
        )",
        [],
    )
    .context("failed to create Teachers table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS Courses (
            course_id INTEGER PRIMARY KEY AUTOINCREMENT,
            course_name TEXT NOT NULL,
            duration INTEGER NOT NULL,
            teacher_id INTEGER,
            FOREIGN KEY(teacher_id) REFERENCES Teachers(teacher_id) ON DELETE SET NULL
        )",
        [],
    )
    .context("failed to create Courses table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS Students (
            student_id INTEGER PRIMARY KEY AUTOINCREMENT,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            email TEXT NOT NULL,
            course_id INTEGER,
            FOREIGN KEY(course_id) REFERENCES Courses(course_id) ON DELETE SET NULL
        )",
        [],
    )
    .context("failed to create Students table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS CourseMaterials (
            material_id INTEGER PRIMARY KEY AUTOINCREMENT,
            course_id INTEGER NOT NULL,
            file_name TEXT NOT NULL,
            file_path TEXT NOT NULL,
            uploaded_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY(course_id) REFERENCES Courses(course_id) ON DELETE CASCADE
        )",
        [],
    )
    .context("failed to create CourseMaterials table")?;

    Ok(())
}

/// In-memory database with the portal schema, for query tests.
#[cfg(test)]
pub(super) fn test_connection() -> Connection {
    let conn = Connection::open_in_memory().expect("in-memory database");
    conn.execute("PRAGMA foreign_keys = ON", [])
        .expect("enable foreign keys");
    register_functions(&conn).expect("register functions");
    ensure_schema(&conn).expect("create schema");
    conn
}
