use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, Row};

use crate::models::{Lookup, Teacher, TeacherInput};

fn teacher_from_row(row: &Row<'_>) -> rusqlite::Result<Teacher> {
    Ok(Teacher {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        subject: row.get(3)?,
    })
}

/// Every teacher, ordered by last name then first name.
pub(super) fn fetch_teachers(conn: &Connection) -> Result<Vec<Teacher>> {
    let mut stmt = conn
        .prepare(
            "SELECT teacher_id, first_name, last_name, subject
             FROM Teachers
             ORDER BY last_name COLLATE NOCASE, first_name COLLATE NOCASE",
        )
        .context("failed to prepare teacher query")?;

    let teachers = stmt
        .query_map([], teacher_from_row)
        .context("failed to load teachers")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect teachers")?;

    Ok(teachers)
}

/// `(id, "First Last")` pairs for the course form's teacher selector.
pub(super) fn fetch_teacher_lookup(conn: &Connection) -> Result<Vec<Lookup>> {
    let mut stmt = conn
        .prepare(
            "SELECT teacher_id, first_name || ' ' || last_name AS teacher_name
             FROM Teachers
             ORDER BY last_name COLLATE NOCASE, first_name COLLATE NOCASE",
        )
        .context("failed to prepare teacher lookup query")?;

    let lookup = stmt
        .query_map([], |row| {
            Ok(Lookup {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })
        .context("failed to load teacher lookup")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect teacher lookup")?;

    Ok(lookup)
}

pub(super) fn create_teacher(conn: &Connection, input: &TeacherInput) -> Result<i64> {
    conn.execute(
        "INSERT INTO Teachers (first_name, last_name, subject) VALUES (?1, ?2, ?3)",
        params![input.first_name, input.last_name, input.subject],
    )
    .context("failed to insert teacher")?;

    Ok(conn.last_insert_rowid())
}

pub(super) fn update_teacher(conn: &Connection, id: i64, input: &TeacherInput) -> Result<()> {
    let updated = conn
        .execute(
            "UPDATE Teachers
             SET first_name = ?1, last_name = ?2, subject = ?3
             WHERE teacher_id = ?4",
            params![input.first_name, input.last_name, input.subject, id],
        )
        .context("failed to update teacher")?;

    if updated == 0 {
        Err(anyhow!("Teacher not found"))
    } else {
        Ok(())
    }
}

/// Delete a teacher. Their courses stay behind with no teacher assigned.
pub(super) fn delete_teacher(conn: &Connection, id: i64) -> Result<()> {
    let deleted = conn
        .execute("DELETE FROM Teachers WHERE teacher_id = ?1", params![id])
        .context("failed to delete teacher")?;

    if deleted == 0 {
        Err(anyhow!("Teacher not found"))
    } else {
        Ok(())
    }
}
