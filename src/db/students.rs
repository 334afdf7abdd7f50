use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection};

use crate::models::{CourseStudent, Student, StudentInput};

/// Every student with the name of the course they are enrolled in, ordered by
/// last name then first name.
pub(super) fn fetch_students(conn: &Connection) -> Result<Vec<Student>> {
    let mut stmt = conn
        .prepare(
            "SELECT s.student_id,
                    s.first_name,
                    s.last_name,
                    s.email,
                    s.course_id,
                    c.course_name
             FROM Students s
             LEFT JOIN Courses c ON s.course_id = c.course_id
             ORDER BY s.last_name COLLATE NOCASE, s.first_name COLLATE NOCASE",
        )
        .context("failed to prepare student query")?;

    let students = stmt
        .query_map([], |row| {
            Ok(Student {
                id: row.get(0)?,
                first_name: row.get(1)?,
                last_name: row.get(2)?,
                email: row.get(3)?,
                course_id: row.get(4)?,
                course_name: row.get(5)?,
            })
        })
        .context("failed to load students")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect students")?;

    Ok(students)
}

/// Students enrolled in one course. Backs the course-scoped student view.
pub(super) fn fetch_students_for_course(
    conn: &Connection,
    course_id: i64,
) -> Result<Vec<CourseStudent>> {
    let mut stmt = conn
        .prepare(
            "SELECT s.student_id,
                    s.first_name,
                    s.last_name,
                    s.email,
                    c.course_name
             FROM Students s
             INNER JOIN Courses c ON s.course_id = c.course_id
             WHERE c.course_id = ?1
             ORDER BY s.last_name COLLATE NOCASE, s.first_name COLLATE NOCASE",
        )
        .context("failed to prepare course students query")?;

    let students = stmt
        .query_map([course_id], |row| {
            Ok(CourseStudent {
                id: row.get(0)?,
                first_name: row.get(1)?,
                last_name: row.get(2)?,
                email: row.get(3)?,
                course_name: row.get(4)?,
            })
        })
        .context("failed to load course students")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect course students")?;

    Ok(students)
}

pub(super) fn create_student(conn: &Connection, input: &StudentInput) -> Result<i64> {
    conn.execute(
        "INSERT INTO Students (first_name, last_name, email, course_id)
         VALUES (?1, ?2, ?3, ?4)",
        params![input.first_name, input.last_name, input.email, input.course_id],
    )
    .context("failed to insert student")?;

    Ok(conn.last_insert_rowid())
}

pub(super) fn update_student(conn: &Connection, id: i64, input: &StudentInput) -> Result<()> {
    let updated = conn
        .execute(
            "UPDATE Students
             SET first_name = ?1, last_name = ?2, email = ?3, course_id = ?4
             WHERE student_id = ?5",
            params![
                input.first_name,
                input.last_name,
                input.email,
                input.course_id,
                id
            ],
        )
        .context("failed to update student")?;

    if updated == 0 {
        Err(anyhow!("Student not found"))
    } else {
        Ok(())
    }
}

pub(super) fn delete_student(conn: &Connection, id: i64) -> Result<()> {
    let deleted = conn
        .execute("DELETE FROM Students WHERE student_id = ?1", params![id])
        .context("failed to delete student")?;

    if deleted == 0 {
        Err(anyhow!("Student not found"))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::test_connection;
    use crate::db::courses::{create_course, delete_course};
    use crate::models::CourseInput;

    fn seed_course(conn: &Connection, name: &str) -> i64 {
        create_course(
            conn,
            &CourseInput {
                name: name.to_string(),
                duration: 10,
                teacher_id: None,
            },
        )
        .unwrap()
    }

    fn student(first: &str, last: &str, course_id: Option<i64>) -> StudentInput {
        StudentInput {
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: format!("{}@example.org", first.to_lowercase()),
            course_id,
        }
    }

    #[test]
    fn student_rows_carry_course_name() {
        let conn = test_connection();
        let course = seed_course(&conn, "Databases");
        let id = create_student(&conn, &student("Linus", "Torvalds", Some(course))).unwrap();

        assert_eq!(
            fetch_students(&conn).unwrap(),
            vec![Student {
                id,
                first_name: "Linus".into(),
                last_name: "Torvalds".into(),
                email: "linus@example.org".into(),
                course_id: Some(course),
                course_name: Some("Databases".into()),
            }]
        );
    }

    #[test]
    fn course_view_only_lists_enrolled_students() {
        let conn = test_connection();
        let rust = seed_course(&conn, "Rust");
        let go = seed_course(&conn, "Go");
        create_student(&conn, &student("Zoe", "Adams", Some(rust))).unwrap();
        create_student(&conn, &student("Ann", "Adams", Some(rust))).unwrap();
        create_student(&conn, &student("Rob", "Pike", Some(go))).unwrap();
        create_student(&conn, &student("Nobody", "Unassigned", None)).unwrap();

        let enrolled = fetch_students_for_course(&conn, rust).unwrap();
        let names: Vec<&str> = enrolled.iter().map(|s| s.first_name.as_str()).collect();
        assert_eq!(names, ["Ann", "Zoe"]);
        assert!(enrolled.iter().all(|s| s.course_name == "Rust"));

        assert!(fetch_students_for_course(&conn, 999).unwrap().is_empty());
    }

    #[test]
    fn deleting_course_clears_student_reference() {
        let conn = test_connection();
        let course = seed_course(&conn, "Rust");
        create_student(&conn, &student("Ann", "Adams", Some(course))).unwrap();

        delete_course(&conn, course).unwrap();

        let students = fetch_students(&conn).unwrap();
        assert_eq!(students.len(), 1);
        assert_eq!(students[0].course_id, None);
        assert_eq!(students[0].course_name, None);
    }

    #[test]
    fn update_and_delete_target_one_student() {
        let conn = test_connection();
        let first = create_student(&conn, &student("Ann", "Adams", None)).unwrap();
        let second = create_student(&conn, &student("Bob", "Brown", None)).unwrap();

        update_student(&conn, first, &student("Anne", "Adams", None)).unwrap();
        let students = fetch_students(&conn).unwrap();
        assert_eq!(students[0].first_name, "Anne");
        assert_eq!(students[0].email, "anne@example.org");
        assert_eq!(students[1].first_name, "Bob");

        delete_student(&conn, first).unwrap();
        let students = fetch_students(&conn).unwrap();
        assert_eq!(students.len(), 1);
        assert_eq!(students[0].id, second);

        assert_eq!(
            update_student(&conn, first, &student("X", "Y", None))
                .unwrap_err()
                .to_string(),
            "Student not found"
        );
    }
}
