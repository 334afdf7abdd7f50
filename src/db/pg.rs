//! PostgreSQL flavour of the store. Queries mirror the SQLite ones; the
//! differences are placeholder syntax, `ILIKE` for the course search and
//! `RETURNING` for generated identities.

use anyhow::{anyhow, Context, Result};
use postgres::{Client, Config, NoTls, Row};
use tracing::{debug, info};

use super::{search_pattern, PortalStore};
use crate::models::{
    Course, CourseInput, CourseMaterial, CourseStudent, Lookup, MaterialInput, Student,
    StudentInput, Teacher, TeacherInput,
};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS Teachers (
    teacher_id BIGSERIAL PRIMARY KEY,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    subject TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS Courses (
    course_id BIGSERIAL PRIMARY KEY,
    course_name TEXT NOT NULL,
    duration INTEGER NOT NULL,
    teacher_id BIGINT REFERENCES Teachers(teacher_id) ON DELETE SET NULL
);
CREATE TABLE IF NOT EXISTS Students (
    student_id BIGSERIAL PRIMARY KEY,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    email TEXT NOT NULL,
    course_id BIGINT REFERENCES Courses(course_id) ON DELETE SET NULL
);
CREATE TABLE IF NOT EXISTS CourseMaterials (
    material_id BIGSERIAL PRIMARY KEY,
    course_id BIGINT NOT NULL REFERENCES Courses(course_id) ON DELETE CASCADE,
    file_name TEXT NOT NULL,
    file_path TEXT NOT NULL,
    uploaded_at TIMESTAMP NOT NULL DEFAULT (NOW() AT TIME ZONE 'utc')
);
";

const COURSE_COLUMNS: &str = "SELECT c.course_id,
            c.course_name,
            c.duration,
            c.teacher_id,
            t.first_name || ' ' || t.last_name AS teacher_name
     FROM Courses c
     LEFT JOIN Teachers t ON c.teacher_id = t.teacher_id";

/// Store talking to a PostgreSQL server.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    config: Config,
}

impl PostgresStore {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    fn connect(&self) -> Result<Client> {
        self.config
            .connect(NoTls)
            .context("failed to connect to PostgreSQL")
    }
}

fn expect_one(affected: u64, entity: &str) -> Result<()> {
    if affected == 0 {
        Err(anyhow!("{entity} not found"))
    } else {
        Ok(())
    }
}

fn lookup_from_row(row: &Row) -> Result<Lookup, postgres::Error> {
    Ok(Lookup {
        id: row.try_get(0)?,
        name: row.try_get(1)?,
    })
}

fn course_from_row(row: &Row) -> Result<Course, postgres::Error> {
    Ok(Course {
        id: row.try_get(0)?,
        name: row.try_get(1)?,
        duration: row.try_get(2)?,
        teacher_id: row.try_get(3)?,
        teacher_name: row.try_get(4)?,
    })
}

impl PortalStore for PostgresStore {
    fn backend_name(&self) -> &'static str {
        "PostgreSQL"
    }

    fn ensure_schema(&self) -> Result<()> {
        info!("ensuring PostgreSQL schema");
        self.connect()?
            .batch_execute(SCHEMA)
            .context("failed to create portal tables")
    }

    fn list_teachers(&self) -> Result<Vec<Teacher>> {
        debug!("loading teachers");
        let rows = self
            .connect()?
            .query(
                "SELECT teacher_id, first_name, last_name, subject
                 FROM Teachers
                 ORDER BY last_name, first_name",
                &[],
            )
            .context("failed to load teachers")?;

        rows.iter()
            .map(|row| -> Result<Teacher, postgres::Error> {
                Ok(Teacher {
                    id: row.try_get(0)?,
                    first_name: row.try_get(1)?,
                    last_name: row.try_get(2)?,
                    subject: row.try_get(3)?,
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .context("failed to read teachers")
    }

    fn teacher_lookup(&self) -> Result<Vec<Lookup>> {
        let rows = self
            .connect()?
            .query(
                "SELECT teacher_id, first_name || ' ' || last_name AS teacher_name
                 FROM Teachers
                 ORDER BY last_name, first_name",
                &[],
            )
            .context("failed to load teacher lookup")?;

        rows.iter()
            .map(lookup_from_row)
            .collect::<Result<Vec<_>, _>>()
            .context("failed to read teacher lookup")
    }

    fn create_teacher(&self, input: &TeacherInput) -> Result<i64> {
        let row = self
            .connect()?
            .query_one(
                "INSERT INTO Teachers (first_name, last_name, subject)
                 VALUES ($1, $2, $3)
                 RETURNING teacher_id",
                &[&input.first_name, &input.last_name, &input.subject],
            )
            .context("failed to insert teacher")?;
        let id: i64 = row.try_get(0).context("failed to read teacher id")?;
        info!(id, "teacher created");
        Ok(id)
    }

    fn update_teacher(&self, id: i64, input: &TeacherInput) -> Result<()> {
        let updated = self
            .connect()?
            .execute(
                "UPDATE Teachers
                 SET first_name = $1, last_name = $2, subject = $3
                 WHERE teacher_id = $4",
                &[&input.first_name, &input.last_name, &input.subject, &id],
            )
            .context("failed to update teacher")?;
        expect_one(updated, "Teacher")?;
        info!(id, "teacher updated");
        Ok(())
    }

    fn delete_teacher(&self, id: i64) -> Result<()> {
        let deleted = self
            .connect()?
            .execute("DELETE FROM Teachers WHERE teacher_id = $1", &[&id])
            .context("failed to delete teacher")?;
        expect_one(deleted, "Teacher")?;
        info!(id, "teacher deleted");
        Ok(())
    }

    fn list_courses(&self, search: Option<&str>) -> Result<Vec<Course>> {
        debug!(?search, "loading courses");
        let mut client = self.connect()?;
        let rows = match search_pattern(search) {
            Some(pattern) => {
                let sql = format!(
                    "{COURSE_COLUMNS}
                     WHERE c.course_name ILIKE $1 ESCAPE '\\'
                     ORDER BY c.course_name"
                );
                client.query(sql.as_str(), &[&pattern])
            }
            None => {
                let sql = format!("{COURSE_COLUMNS} ORDER BY c.course_name");
                client.query(sql.as_str(), &[])
            }
        }
        .context("failed to load courses")?;

        rows.iter()
            .map(course_from_row)
            .collect::<Result<Vec<_>, _>>()
            .context("failed to read courses")
    }

    fn course_lookup(&self) -> Result<Vec<Lookup>> {
        let rows = self
            .connect()?
            .query(
                "SELECT course_id, course_name FROM Courses ORDER BY course_name",
                &[],
            )
            .context("failed to load course lookup")?;

        rows.iter()
            .map(lookup_from_row)
            .collect::<Result<Vec<_>, _>>()
            .context("failed to read course lookup")
    }

    fn create_course(&self, input: &CourseInput) -> Result<i64> {
        let row = self
            .connect()?
            .query_one(
                "INSERT INTO Courses (course_name, duration, teacher_id)
                 VALUES ($1, $2, $3)
                 RETURNING course_id",
                &[&input.name, &input.duration, &input.teacher_id],
            )
            .context("failed to insert course")?;
        let id: i64 = row.try_get(0).context("failed to read course id")?;
        info!(id, "course created");
        Ok(id)
    }

    fn update_course(&self, id: i64, input: &CourseInput) -> Result<()> {
        let updated = self
            .connect()?
            .execute(
                "UPDATE Courses
                 SET course_name = $1, duration = $2, teacher_id = $3
                 WHERE course_id = $4",
                &[&input.name, &input.duration, &input.teacher_id, &id],
            )
            .context("failed to update course")?;
        expect_one(updated, "Course")?;
        info!(id, "course updated");
        Ok(())
    }

    fn delete_course(&self, id: i64) -> Result<()> {
        let deleted = self
            .connect()?
            .execute("DELETE FROM Courses WHERE course_id = $1", &[&id])
            .context("failed to delete course")?;
        expect_one(deleted, "Course")?;
        info!(id, "course deleted");
        Ok(())
    }

    fn list_students(&self) -> Result<Vec<Student>> {
        debug!("loading students");
        let rows = self
            .connect()?
            .query(
                "SELECT s.student_id,
                        s.first_name,
                        s.last_name,
                        s.email,
                        s.course_id,
                        c.course_name
                 FROM Students s
                 LEFT JOIN Courses c ON s.course_id = c.course_id
                 ORDER BY s.last_name, s.first_name",
                &[],
            )
            .context("failed to load students")?;

        rows.iter()
            .map(|row| -> Result<Student, postgres::Error> {
                Ok(Student {
                    id: row.try_get(0)?,
                    first_name: row.try_get(1)?,
                    last_name: row.try_get(2)?,
                    email: row.try_get(3)?,
                    course_id: row.try_get(4)?,
                    course_name: row.try_get(5)?,
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .context("failed to read students")
    }

    fn students_for_course(&self, course_id: i64) -> Result<Vec<CourseStudent>> {
        debug!(course_id, "loading course students");
        let rows = self
            .connect()?
            .query(
                "SELECT s.student_id,
                        s.first_name,
                        s.last_name,
                        s.email,
                        c.course_name
                 FROM Students s
                 INNER JOIN Courses c ON s.course_id = c.course_id
                 WHERE c.course_id = $1
                 ORDER BY s.last_name, s.first_name",
                &[&course_id],
            )
            .context("failed to load course students")?;

        rows.iter()
            .map(|row| -> Result<CourseStudent, postgres::Error> {
                Ok(CourseStudent {
                    id: row.try_get(0)?,
                    first_name: row.try_get(1)?,
                    last_name: row.try_get(2)?,
                    email: row.try_get(3)?,
                    course_name: row.try_get(4)?,
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .context("failed to read course students")
    }

    fn create_student(&self, input: &StudentInput) -> Result<i64> {
        let row = self
            .connect()?
            .query_one(
                "INSERT INTO Students (first_name, last_name, email, course_id)
                 VALUES ($1, $2, $3, $4)
                 RETURNING student_id",
                &[
                    &input.first_name,
                    &input.last_name,
                    &input.email,
                    &input.course_id,
                ],
            )
            .context("failed to insert student")?;
        let id: i64 = row.try_get(0).context("failed to read student id")?;
        info!(id, "student created");
        Ok(id)
    }

    fn update_student(&self, id: i64, input: &StudentInput) -> Result<()> {
        let updated = self
            .connect()?
            .execute(
                "UPDATE Students
                 SET first_name = $1, last_name = $2, email = $3, course_id = $4
                 WHERE student_id = $5",
                &[
                    &input.first_name,
                    &input.last_name,
                    &input.email,
                    &input.course_id,
                    &id,
                ],
            )
            .context("failed to update student")?;
        expect_one(updated, "Student")?;
        info!(id, "student updated");
        Ok(())
    }

    fn delete_student(&self, id: i64) -> Result<()> {
        let deleted = self
            .connect()?
            .execute("DELETE FROM Students WHERE student_id = $1", &[&id])
            .context("failed to delete student")?;
        expect_one(deleted, "Student")?;
        info!(id, "student deleted");
        Ok(())
    }

    fn list_materials(&self) -> Result<Vec<CourseMaterial>> {
        debug!("loading materials");
        let rows = self
            .connect()?
            .query(
                "SELECT m.material_id,
                        m.course_id,
                        c.course_name,
                        m.file_name,
                        m.file_path,
                        m.uploaded_at
                 FROM CourseMaterials m
                 LEFT JOIN Courses c ON m.course_id = c.course_id
                 ORDER BY m.uploaded_at DESC, m.material_id DESC",
                &[],
            )
            .context("failed to load materials")?;

        rows.iter()
            .map(|row| -> Result<CourseMaterial, postgres::Error> {
                Ok(CourseMaterial {
                    id: row.try_get(0)?,
                    course_id: row.try_get(1)?,
                    course_name: row.try_get(2)?,
                    file_name: row.try_get(3)?,
                    file_path: row.try_get(4)?,
                    uploaded_at: row.try_get(5)?,
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .context("failed to read materials")
    }

    fn create_material(&self, input: &MaterialInput) -> Result<i64> {
        let row = self
            .connect()?
            .query_one(
                "INSERT INTO CourseMaterials (course_id, file_name, file_path)
                 VALUES ($1, $2, $3)
                 RETURNING material_id",
                &[&input.course_id, &input.file_name, &input.file_path],
            )
            .context("failed to insert material")?;
        let id: i64 = row.try_get(0).context("failed to read material id")?;
        info!(id, path = %input.file_path, "material recorded");
        Ok(id)
    }

    fn delete_material(&self, id: i64) -> Result<()> {
        let deleted = self
            .connect()?
            .execute("DELETE FROM CourseMaterials WHERE material_id = $1", &[&id])
            .context("failed to delete material")?;
        expect_one(deleted, "Material")?;
        info!(id, "material deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_time_defaults_to_utc() {
        let materials = SCHEMA
            .split("CREATE TABLE")
            .find(|table| table.contains("CourseMaterials"))
            .unwrap();
        assert!(materials
            .contains("uploaded_at TIMESTAMP NOT NULL DEFAULT (NOW() AT TIME ZONE 'utc')"));
        assert!(!SCHEMA.contains("DEFAULT NOW()"));
    }
}
