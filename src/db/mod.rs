//! Persistence layer. `PortalStore` is the seam between the UI and the backing
//! database; the embedded SQLite store and the PostgreSQL store implement it
//! with the same semantics so either can sit behind the application.
//!
//! Every store call opens its own connection and drops it before returning.
//! Nothing spans more than one statement.

mod connection;
mod courses;
mod materials;
mod pg;
mod sqlite;
mod students;
mod teachers;

use anyhow::Result;

use crate::config::ConnectionTarget;
use crate::models::{
    Course, CourseInput, CourseMaterial, CourseStudent, Lookup, MaterialInput, Student,
    StudentInput, Teacher, TeacherInput,
};

pub use pg::PostgresStore;
pub use sqlite::SqliteStore;

/// Data access operations the administrative views rely on.
pub trait PortalStore {
    /// Short backend label shown in the footer.
    fn backend_name(&self) -> &'static str;

    /// Create any missing tables. Safe to run on every start.
    fn ensure_schema(&self) -> Result<()>;

    fn list_teachers(&self) -> Result<Vec<Teacher>>;
    fn teacher_lookup(&self) -> Result<Vec<Lookup>>;
    fn create_teacher(&self, input: &TeacherInput) -> Result<i64>;
    fn update_teacher(&self, id: i64, input: &TeacherInput) -> Result<()>;
    fn delete_teacher(&self, id: i64) -> Result<()>;

    /// List courses, optionally narrowed to names containing `search`
    /// (case-insensitive). A blank search returns every course.
    fn list_courses(&self, search: Option<&str>) -> Result<Vec<Course>>;
    fn course_lookup(&self) -> Result<Vec<Lookup>>;
    fn create_course(&self, input: &CourseInput) -> Result<i64>;
    fn update_course(&self, id: i64, input: &CourseInput) -> Result<()>;
    fn delete_course(&self, id: i64) -> Result<()>;

    fn list_students(&self) -> Result<Vec<Student>>;
    fn students_for_course(&self, course_id: i64) -> Result<Vec<CourseStudent>>;
    fn create_student(&self, input: &StudentInput) -> Result<i64>;
    fn update_student(&self, id: i64, input: &StudentInput) -> Result<()>;
    fn delete_student(&self, id: i64) -> Result<()>;

    /// Materials, newest upload first.
    fn list_materials(&self) -> Result<Vec<CourseMaterial>>;
    fn create_material(&self, input: &MaterialInput) -> Result<i64>;
    fn delete_material(&self, id: i64) -> Result<()>;
}

/// Build the store matching a resolved connection target.
pub fn open_store(target: &ConnectionTarget) -> Box<dyn PortalStore> {
    match target {
        ConnectionTarget::Sqlite(path) => Box::new(SqliteStore::new(path.clone())),
        ConnectionTarget::Postgres(config) => Box::new(PostgresStore::new(config.clone())),
    }
}

/// Turn a free-text search into a `LIKE` pattern. Blank input means "no
/// filter". The term is lower-cased to match `portal_lower` on SQLite;
/// `ILIKE` on PostgreSQL ignores case anyway. Wildcards typed by the user
/// are escaped with `\` so they match literally.
pub(crate) fn search_pattern(search: Option<&str>) -> Option<String> {
    let term = search.map(str::trim).filter(|term| !term.is_empty())?;
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.to_lowercase().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    Some(pattern)
}
