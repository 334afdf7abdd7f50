use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, Row};

use super::search_pattern;
use crate::models::{Course, CourseInput, Lookup};

const COURSE_COLUMNS: &str = "SELECT c.course_id,
            c.course_name,
            c.duration,
            c.teacher_id,
            t.first_name || ' ' || t.last_name AS teacher_name
     FROM Courses c
     LEFT JOIN Teachers t ON c.teacher_id = t.teacher_id";

fn course_from_row(row: &Row<'_>) -> rusqlite::Result<Course> {
    Ok(Course {
        id: row.get(0)?,
        name: row.get(1)?,
        duration: row.get(2)?,
        teacher_id: row.get(3)?,
        teacher_name: row.get(4)?,
    })
}

/// Courses ordered by name, narrowed by a case-insensitive name search when
/// one is given.
pub(super) fn fetch_courses(conn: &Connection, search: Option<&str>) -> Result<Vec<Course>> {
    let courses = match search_pattern(search) {
        Some(pattern) => {
            let sql = format!(
                "{COURSE_COLUMNS}
                 WHERE portal_lower(c.course_name) LIKE ?1 ESCAPE '\\'
                 ORDER BY c.course_name COLLATE NOCASE"
            );
            let mut stmt = conn
                .prepare(&sql)
                .context("failed to prepare course search")?;
            let rows = stmt
                .query_map(params![pattern], course_from_row)
                .context("failed to search courses")?
                .collect::<Result<Vec<_>, _>>()
                .context("failed to collect courses")?;
            rows
        }
        None => {
            let sql = format!("{COURSE_COLUMNS} ORDER BY c.course_name COLLATE NOCASE");
            let mut stmt = conn
                .prepare(&sql)
                .context("failed to prepare course query")?;
            let rows = stmt
                .query_map([], course_from_row)
                .context("failed to load courses")?
                .collect::<Result<Vec<_>, _>>()
                .context("failed to collect courses")?;
            rows
        }
    };

    Ok(courses)
}

pub(super) fn fetch_course_lookup(conn: &Connection) -> Result<Vec<Lookup>> {
    let mut stmt = conn
        .prepare(
            "SELECT course_id, course_name FROM Courses ORDER BY course_name COLLATE NOCASE",
        )
        .context("failed to prepare course lookup query")?;

    let lookup = stmt
        .query_map([], |row| {
            Ok(Lookup {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })
        .context("failed to load course lookup")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect course lookup")?;

    Ok(lookup)
}

pub(super) fn create_course(conn: &Connection, input: &CourseInput) -> Result<i64> {
    conn.execute(
        "INSERT INTO Courses (course_name, duration, teacher_id) VALUES (?1, ?2, ?3)",
        params![input.name, input.duration, input.teacher_id],
    )
    .context("failed to insert course")?;

    Ok(conn.last_insert_rowid())
}

pub(super) fn update_course(conn: &Connection, id: i64, input: &CourseInput) -> Result<()> {
    let updated = conn
        .execute(
            "UPDATE Courses
             SET course_name = ?1, duration = ?2, teacher_id = ?3
             WHERE course_id = ?4",
            params![input.name, input.duration, input.teacher_id, id],
        )
        .context("failed to update course")?;

    if updated == 0 {
        Err(anyhow!("Course not found"))
    } else {
        Ok(())
    }
}

/// Delete a course. Enrolled students lose their course, attached material
/// rows go with it.
pub(super) fn delete_course(conn: &Connection, id: i64) -> Result<()> {
    let deleted = conn
        .execute("DELETE FROM Courses WHERE course_id = ?1", params![id])
        .context("failed to delete course")?;

    if deleted == 0 {
        Err(anyhow!("Course not found"))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::test_connection;
    use crate::db::teachers::{create_teacher, delete_teacher};
    use crate::models::TeacherInput;

    fn course(name: &str, duration: i32, teacher_id: Option<i64>) -> CourseInput {
        CourseInput {
            name: name.to_string(),
            duration,
            teacher_id,
        }
    }

    fn seed_teacher(conn: &Connection) -> i64 {
        create_teacher(
            conn,
            &TeacherInput {
                first_name: "Grace".into(),
                last_name: "Hopper".into(),
                subject: "Compilers".into(),
            },
        )
        .unwrap()
    }

    fn names(courses: &[Course]) -> Vec<&str> {
        courses.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn course_rows_carry_teacher_name() {
        let conn = test_connection();
        let teacher = seed_teacher(&conn);
        let id = create_course(&conn, &course("Systems Programming", 12, Some(teacher))).unwrap();

        let courses = fetch_courses(&conn, None).unwrap();
        assert_eq!(
            courses,
            vec![Course {
                id,
                name: "Systems Programming".into(),
                duration: 12,
                teacher_id: Some(teacher),
                teacher_name: Some("Grace Hopper".into()),
            }]
        );
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let conn = test_connection();
        create_course(&conn, &course("Intro to Rust", 10, None)).unwrap();
        create_course(&conn, &course("Advanced RUST", 8, None)).unwrap();
        create_course(&conn, &course("Databases", 6, None)).unwrap();

        let found = fetch_courses(&conn, Some("rust")).unwrap();
        assert_eq!(names(&found), ["Advanced RUST", "Intro to Rust"]);

        let found = fetch_courses(&conn, Some("  BASE ")).unwrap();
        assert_eq!(names(&found), ["Databases"]);
    }

    #[test]
    fn search_folds_non_ascii_case() {
        let conn = test_connection();
        create_course(&conn, &course("Économie", 6, None)).unwrap();
        create_course(&conn, &course("ПРОГРАММИРОВАНИЕ", 6, None)).unwrap();
        create_course(&conn, &course("Ökologie", 6, None)).unwrap();

        assert_eq!(names(&fetch_courses(&conn, Some("éco")).unwrap()), ["Économie"]);
        assert_eq!(
            names(&fetch_courses(&conn, Some("программ")).unwrap()),
            ["ПРОГРАММИРОВАНИЕ"]
        );
        assert_eq!(names(&fetch_courses(&conn, Some("ÖKO")).unwrap()), ["Ökologie"]);
    }

    #[test]
    fn blank_search_returns_everything() {
        let conn = test_connection();
        create_course(&conn, &course("Databases", 6, None)).unwrap();
        create_course(&conn, &course("Algebra", 4, None)).unwrap();

        assert_eq!(names(&fetch_courses(&conn, Some("   ")).unwrap()), ["Algebra", "Databases"]);
        assert_eq!(names(&fetch_courses(&conn, Some("")).unwrap()), ["Algebra", "Databases"]);
    }

    #[test]
    fn search_matches_wildcards_literally() {
        let conn = test_connection();
        create_course(&conn, &course("100% Practice", 2, None)).unwrap();
        create_course(&conn, &course("1000 Exercises", 2, None)).unwrap();

        let found = fetch_courses(&conn, Some("0%")).unwrap();
        assert_eq!(names(&found), ["100% Practice"]);
    }

    #[test]
    fn deleting_teacher_clears_course_reference() {
        let conn = test_connection();
        let teacher = seed_teacher(&conn);
        let id = create_course(&conn, &course("Compilers", 12, Some(teacher))).unwrap();

        delete_teacher(&conn, teacher).unwrap();

        let courses = fetch_courses(&conn, None).unwrap();
        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0].id, id);
        assert_eq!(courses[0].teacher_id, None);
        assert_eq!(courses[0].teacher_name, None);
    }

    #[test]
    fn update_and_delete_target_one_course() {
        let conn = test_connection();
        let keep = create_course(&conn, &course("Algebra", 4, None)).unwrap();
        let change = create_course(&conn, &course("Geometry", 4, None)).unwrap();

        update_course(&conn, change, &course("Trigonometry", 5, None)).unwrap();
        let courses = fetch_courses(&conn, None).unwrap();
        assert_eq!(names(&courses), ["Algebra", "Trigonometry"]);
        assert_eq!(courses[1].duration, 5);

        delete_course(&conn, change).unwrap();
        let courses = fetch_courses(&conn, None).unwrap();
        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0].id, keep);

        assert_eq!(
            delete_course(&conn, change).unwrap_err().to_string(),
            "Course not found"
        );
    }

    #[test]
    fn lookup_is_ordered_by_name() {
        let conn = test_connection();
        let b = create_course(&conn, &course("biology", 3, None)).unwrap();
        let a = create_course(&conn, &course("Art", 3, None)).unwrap();

        let lookup = fetch_course_lookup(&conn).unwrap();
        assert_eq!(
            lookup,
            vec![
                Lookup { id: a, name: "Art".into() },
                Lookup { id: b, name: "biology".into() },
            ]
        );
    }
}
