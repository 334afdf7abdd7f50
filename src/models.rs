//! Domain models that mirror the portal schema and get passed throughout the
//! TUI. Row types carry the joined display columns the grids need so the UI
//! never has to resolve foreign keys on its own.

use std::fmt;

use chrono::NaiveDateTime;

/// A teacher row from the `Teachers` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Teacher {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub subject: String,
}

impl Teacher {
    /// `First Last`, the same projection the teacher lookup uses.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A course row joined with the name of its teacher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    pub id: i64,
    pub name: String,
    /// Length of the course, unit is up to the school.
    pub duration: i32,
    /// Cleared by the database when the teacher is deleted.
    pub teacher_id: Option<i64>,
    pub teacher_name: Option<String>,
}

/// A student row joined with the name of the enrolled course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Student {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Cleared by the database when the course is deleted.
    pub course_id: Option<i64>,
    pub course_name: Option<String>,
}

impl Student {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Metadata for a file attached to a course. The file itself lives under the
/// application base directory at `file_path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseMaterial {
    pub id: i64,
    pub course_id: i64,
    pub course_name: Option<String>,
    /// Name of the file as the user picked it.
    pub file_name: String,
    /// Stored path, normally relative to the base directory.
    pub file_path: String,
    /// Assigned by the database on insert.
    pub uploaded_at: NaiveDateTime,
}

/// Row of the course-scoped student view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseStudent {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub course_name: String,
}

/// Two-column `(id, display name)` projection used by selection fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    pub id: i64,
    pub name: String,
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Validated teacher fields ready for an insert or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeacherInput {
    pub first_name: String,
    pub last_name: String,
    pub subject: String,
}

/// Validated course fields ready for an insert or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseInput {
    pub name: String,
    pub duration: i32,
    pub teacher_id: Option<i64>,
}

/// Validated student fields ready for an insert or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub course_id: Option<i64>,
}

/// Metadata written once a material file has been copied into place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialInput {
    pub course_id: i64,
    pub file_name: String,
    pub file_path: String,
}
