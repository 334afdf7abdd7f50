use std::path::{Path, PathBuf};

use anyhow::Result;
use rusqlite::Connection;
use tracing::{debug, info};

use super::{connection, courses, materials, students, teachers, PortalStore};
use crate::models::{
    Course, CourseInput, CourseMaterial, CourseStudent, Lookup, MaterialInput, Student,
    StudentInput, Teacher, TeacherInput,
};

/// Embedded store backed by a single SQLite file.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fresh connection for one call; closed when the caller drops it.
    fn connect(&self) -> Result<Connection> {
        connection::open_connection(&self.path)
    }
}

impl PortalStore for SqliteStore {
    fn backend_name(&self) -> &'static str {
        "SQLite"
    }

    fn ensure_schema(&self) -> Result<()> {
        info!(path = %self.path.display(), "ensuring SQLite schema");
        connection::ensure_schema(&self.connect()?)
    }

    fn list_teachers(&self) -> Result<Vec<Teacher>> {
        debug!("loading teachers");
        teachers::fetch_teachers(&self.connect()?)
    }

    fn teacher_lookup(&self) -> Result<Vec<Lookup>> {
        teachers::fetch_teacher_lookup(&self.connect()?)
    }

    fn create_teacher(&self, input: &TeacherInput) -> Result<i64> {
        let id = teachers::create_teacher(&self.connect()?, input)?;
        info!(id, "teacher created");
        Ok(id)
    }

    fn update_teacher(&self, id: i64, input: &TeacherInput) -> Result<()> {
        teachers::update_teacher(&self.connect()?, id, input)?;
        info!(id, "teacher updated");
        Ok(())
    }

    fn delete_teacher(&self, id: i64) -> Result<()> {
        teachers::delete_teacher(&self.connect()?, id)?;
        info!(id, "teacher deleted");
        Ok(())
    }

    fn list_courses(&self, search: Option<&str>) -> Result<Vec<Course>> {
        debug!(?search, "loading courses");
        courses::fetch_courses(&self.connect()?, search)
    }

    fn course_lookup(&self) -> Result<Vec<Lookup>> {
        courses::fetch_course_lookup(&self.connect()?)
    }

    fn create_course(&self, input: &CourseInput) -> Result<i64> {
        let id = courses::create_course(&self.connect()?, input)?;
        info!(id, "course created");
        Ok(id)
    }

    fn update_course(&self, id: i64, input: &CourseInput) -> Result<()> {
        courses::update_course(&self.connect()?, id, input)?;
        info!(id, "course updated");
        Ok(())
    }

    fn delete_course(&self, id: i64) -> Result<()> {
        courses::delete_course(&self.connect()?, id)?;
        info!(id, "course deleted");
        Ok(())
    }

    fn list_students(&self) -> Result<Vec<Student>> {
        debug!("loading students");
        students::fetch_students(&self.connect()?)
    }

    fn students_for_course(&self, course_id: i64) -> Result<Vec<CourseStudent>> {
        debug!(course_id, "loading course students");
        students::fetch_students_for_course(&self.connect()?, course_id)
    }

    fn create_student(&self, input: &StudentInput) -> Result<i64> {
        let id = students::create_student(&self.connect()?, input)?;
        info!(id, "student created");
        Ok(id)
    }

    fn update_student(&self, id: i64, input: &StudentInput) -> Result<()> {
        students::update_student(&self.connect()?, id, input)?;
        info!(id, "student updated");
        Ok(())
    }

    fn delete_student(&self, id: i64) -> Result<()> {
        students::delete_student(&self.connect()?, id)?;
        info!(id, "student deleted");
        Ok(())
    }

    fn list_materials(&self) -> Result<Vec<CourseMaterial>> {
        debug!("loading materials");
        materials::fetch_materials(&self.connect()?)
    }

    fn create_material(&self, input: &MaterialInput) -> Result<i64> {
        let id = materials::create_material(&self.connect()?, input)?;
        info!(id, path = %input.file_path, "material recorded");
        Ok(id)
    }

    fn delete_material(&self, id: i64) -> Result<()> {
        materials::delete_material(&self.connect()?, id)?;
        info!(id, "material deleted");
        Ok(())
    }
}
