use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection};

use crate::models::{CourseMaterial, MaterialInput};

/// Material metadata, newest upload first. `uploaded_at` only has second
/// precision, so the identity breaks ties.
pub(super) fn fetch_materials(conn: &Connection) -> Result<Vec<CourseMaterial>> {
    let mut stmt = conn
        .prepare(
            "SELECT m.material_id,
                    m.course_id,
                    c.course_name,
                    m.file_name,
                    m.file_path,
                    m.uploaded_at
             FROM CourseMaterials m
             LEFT JOIN Courses c ON m.course_id = c.course_id
             ORDER BY m.uploaded_at DESC, m.material_id DESC",
        )
        .context("failed to prepare material query")?;

    let materials = stmt
        .query_map([], |row| {
            Ok(CourseMaterial {
                id: row.get(0)?,
                course_id: row.get(1)?,
                course_name: row.get(2)?,
                file_name: row.get(3)?,
                file_path: row.get(4)?,
                uploaded_at: row.get(5)?,
            })
        })
        .context("failed to load materials")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect materials")?;

    Ok(materials)
}

pub(super) fn create_material(conn: &Connection, input: &MaterialInput) -> Result<i64> {
    conn.execute(
        "INSERT INTO CourseMaterials (course_id, file_name, file_path) VALUES (?1, ?2, ?3)",
        params![input.course_id, input.file_name, input.file_path],
    )
    .context("failed to insert material")?;

    Ok(conn.last_insert_rowid())
}

pub(super) fn delete_material(conn: &Connection, id: i64) -> Result<()> {
    let deleted = conn
        .execute(
            "DELETE FROM CourseMaterials WHERE material_id = ?1",
            params![id],
        )
        .context("failed to delete material")?;

    if deleted == 0 {
        Err(anyhow!("Material not found"))
    } else {
        Ok(())
    }
}
