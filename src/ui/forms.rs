use std::path::PathBuf;

use anyhow::{anyhow, Result};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::models::{
    Course, CourseInput, CourseMaterial, Lookup, Student, StudentInput, Teacher, TeacherInput,
};

/// Selection bound to a lookup list, the TUI stand-in for a combo box.
#[derive(Clone, Debug, Default)]
pub(crate) struct Choice {
    pub(crate) options: Vec<Lookup>,
    pub(crate) selected: Option<usize>,
}

impl Choice {
    /// Build a choice with `selected_id` preselected when it is still listed.
    pub(crate) fn new(options: Vec<Lookup>, selected_id: Option<i64>) -> Self {
        let selected = selected_id.and_then(|id| options.iter().position(|o| o.id == id));
        Self { options, selected }
    }

    /// Step through the options, wrapping at both ends.
    pub(crate) fn cycle(&mut self, offset: isize) {
        if self.options.is_empty() {
            return;
        }
        let len = self.options.len() as isize;
        let next = match self.selected {
            Some(idx) => (idx as isize + offset).rem_euclid(len),
            None if offset < 0 => len - 1,
            None => 0,
        };
        self.selected = Some(next as usize);
    }

    pub(crate) fn clear(&mut self) {
        self.selected = None;
    }

    pub(crate) fn selected_id(&self) -> Option<i64> {
        self.current().map(|option| option.id)
    }

    fn current(&self) -> Option<&Lookup> {
        self.selected.and_then(|idx| self.options.get(idx))
    }
}

fn field_style(is_active: bool, is_empty: bool) -> Style {
    if is_active {
        Style::default().fg(Color::Yellow)
    } else if is_empty {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default()
    }
}

/// `Name: value` line with a placeholder for empty input.
fn text_line(field_name: &str, value: &str, is_active: bool) -> Line<'static> {
    let display = if value.is_empty() {
        "<required>".to_string()
    } else {
        value.to_string()
    };
    Line::from(vec![
        Span::raw(format!("{field_name}: ")),
        Span::styled(display, field_style(is_active, value.is_empty())),
    ])
}

/// `Name: < option >` line for a selection field.
fn choice_line(field_name: &str, choice: &Choice, is_active: bool) -> Line<'static> {
    let display = match choice.current() {
        Some(option) => format!("< {option} >"),
        None if choice.options.is_empty() => "<nothing to select>".to_string(),
        None => "<select with ←/→>".to_string(),
    };
    Line::from(vec![
        Span::raw(format!("{field_name}: ")),
        Span::styled(display, field_style(is_active, choice.selected.is_none())),
    ])
}

fn push_text(target: &mut String, ch: char) -> bool {
    if ch.is_control() {
        false
    } else {
        target.push(ch);
        true
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) enum TeacherField {
    #[default]
    FirstName,
    LastName,
    Subject,
}

/// Teacher add/update form.
#[derive(Clone, Debug, Default)]
pub(crate) struct TeacherForm {
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) subject: String,
    pub(crate) active: TeacherField,
    pub(crate) error: Option<String>,
}

impl TeacherForm {
    pub(crate) const FIELDS: [(TeacherField, &'static str); 3] = [
        (TeacherField::FirstName, "First name"),
        (TeacherField::LastName, "Last name"),
        (TeacherField::Subject, "Subject"),
    ];

    pub(crate) fn from_teacher(teacher: &Teacher) -> Self {
        Self {
            first_name: teacher.first_name.clone(),
            last_name: teacher.last_name.clone(),
            subject: teacher.subject.clone(),
            ..Self::default()
        }
    }

    pub(crate) fn focus_next(&mut self) {
        self.active = match self.active {
            TeacherField::FirstName => TeacherField::LastName,
            TeacherField::LastName => TeacherField::Subject,
            TeacherField::Subject => TeacherField::FirstName,
        };
    }

    pub(crate) fn focus_previous(&mut self) {
        self.active = match self.active {
            TeacherField::FirstName => TeacherField::Subject,
            TeacherField::LastName => TeacherField::FirstName,
            TeacherField::Subject => TeacherField::LastName,
        };
    }

    fn value_mut(&mut self, field: TeacherField) -> &mut String {
        match field {
            TeacherField::FirstName => &mut self.first_name,
            TeacherField::LastName => &mut self.last_name,
            TeacherField::Subject => &mut self.subject,
        }
    }

    pub(crate) fn value(&self, field: TeacherField) -> &str {
        match field {
            TeacherField::FirstName => &self.first_name,
            TeacherField::LastName => &self.last_name,
            TeacherField::Subject => &self.subject,
        }
    }

    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        let field = self.active;
        push_text(self.value_mut(field), ch)
    }

    pub(crate) fn backspace(&mut self) {
        let field = self.active;
        self.value_mut(field).pop();
    }

    /// Trim and validate; nothing is written when this fails.
    pub(crate) fn parse_inputs(&self) -> Result<TeacherInput> {
        let first_name = self.first_name.trim();
        let last_name = self.last_name.trim();
        if first_name.is_empty() || last_name.is_empty() {
            return Err(anyhow!("Enter teacher first and last name."));
        }
        let subject = self.subject.trim();
        if subject.is_empty() {
            return Err(anyhow!("Enter a subject."));
        }
        Ok(TeacherInput {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            subject: subject.to_string(),
        })
    }

    pub(crate) fn lines(&self) -> Vec<Line<'static>> {
        Self::FIELDS
            .iter()
            .map(|(field, name)| text_line(name, self.value(*field), self.active == *field))
            .collect()
    }

    /// Row and column of the text cursor inside the form body.
    pub(crate) fn cursor(&self) -> (u16, u16) {
        let row = Self::FIELDS
            .iter()
            .position(|(field, _)| *field == self.active)
            .unwrap_or(0);
        let (_, name) = Self::FIELDS[row];
        let column = name.len() + 2 + self.value(self.active).chars().count();
        (row as u16, column as u16)
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) enum CourseField {
    #[default]
    Name,
    Duration,
    Teacher,
}

/// Course add/update form. The teacher is picked from the teacher lookup.
#[derive(Clone, Debug, Default)]
pub(crate) struct CourseForm {
    pub(crate) name: String,
    pub(crate) duration: String,
    pub(crate) teacher: Choice,
    pub(crate) active: CourseField,
    pub(crate) error: Option<String>,
}

impl CourseForm {
    pub(crate) fn new(teachers: Vec<Lookup>) -> Self {
        Self {
            teacher: Choice::new(teachers, None),
            ..Self::default()
        }
    }

    pub(crate) fn from_course(course: &Course, teachers: Vec<Lookup>) -> Self {
        Self {
            name: course.name.clone(),
            duration: course.duration.to_string(),
            teacher: Choice::new(teachers, course.teacher_id),
            ..Self::default()
        }
    }

    pub(crate) fn focus_next(&mut self) {
        self.active = match self.active {
            CourseField::Name => CourseField::Duration,
            CourseField::Duration => CourseField::Teacher,
            CourseField::Teacher => CourseField::Name,
        };
    }

    pub(crate) fn focus_previous(&mut self) {
        self.active = match self.active {
            CourseField::Name => CourseField::Teacher,
            CourseField::Duration => CourseField::Name,
            CourseField::Teacher => CourseField::Duration,
        };
    }

    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        match self.active {
            CourseField::Name => push_text(&mut self.name, ch),
            CourseField::Duration => push_text(&mut self.duration, ch),
            CourseField::Teacher => false,
        }
    }

    pub(crate) fn backspace(&mut self) {
        match self.active {
            CourseField::Name => {
                self.name.pop();
            }
            CourseField::Duration => {
                self.duration.pop();
            }
            CourseField::Teacher => self.teacher.clear(),
        }
    }

    pub(crate) fn cycle_choice(&mut self, offset: isize) {
        if self.active == CourseField::Teacher {
            self.teacher.cycle(offset);
        }
    }

    /// Reset every field, keeping the lookup options.
    pub(crate) fn clear(&mut self) {
        *self = Self::new(std::mem::take(&mut self.teacher.options));
    }

    pub(crate) fn parse_inputs(&self) -> Result<CourseInput> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(anyhow!("Enter a course name."));
        }
        let duration = self
            .duration
            .trim()
            .parse::<i32>()
            .map_err(|_| anyhow!("Enter a numeric duration."))?;
        let teacher_id = self
            .teacher
            .selected_id()
            .ok_or_else(|| anyhow!("Select a teacher."))?;
        Ok(CourseInput {
            name: name.to_string(),
            duration,
            teacher_id: Some(teacher_id),
        })
    }

    pub(crate) fn lines(&self) -> Vec<Line<'static>> {
        vec![
            text_line("Name", &self.name, self.active == CourseField::Name),
            text_line("Duration", &self.duration, self.active == CourseField::Duration),
            choice_line("Teacher", &self.teacher, self.active == CourseField::Teacher),
        ]
    }

    /// `None` while a selection field is focused.
    pub(crate) fn cursor(&self) -> Option<(u16, u16)> {
        match self.active {
            CourseField::Name => Some((0, ("Name: ".len() + self.name.chars().count()) as u16)),
            CourseField::Duration => Some((
                1,
                ("Duration: ".len() + self.duration.chars().count()) as u16,
            )),
            CourseField::Teacher => None,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) enum StudentField {
    #[default]
    FirstName,
    LastName,
    Email,
    Course,
}

/// Student add/update form. The course is picked from the course lookup.
#[derive(Clone, Debug, Default)]
pub(crate) struct StudentForm {
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) email: String,
    pub(crate) course: Choice,
    pub(crate) active: StudentField,
    pub(crate) error: Option<String>,
}

impl StudentForm {
    pub(crate) fn new(courses: Vec<Lookup>) -> Self {
        Self {
            course: Choice::new(courses, None),
            ..Self::default()
        }
    }

    pub(crate) fn from_student(student: &Student, courses: Vec<Lookup>) -> Self {
        Self {
            first_name: student.first_name.clone(),
            last_name: student.last_name.clone(),
            email: student.email.clone(),
            course: Choice::new(courses, student.course_id),
            ..Self::default()
        }
    }

    pub(crate) fn focus_next(&mut self) {
        self.active = match self.active {
            StudentField::FirstName => StudentField::LastName,
            StudentField::LastName => StudentField::Email,
            StudentField::Email => StudentField::Course,
            StudentField::Course => StudentField::FirstName,
        };
    }

    pub(crate) fn focus_previous(&mut self) {
        self.active = match self.active {
            StudentField::FirstName => StudentField::Course,
            StudentField::LastName => StudentField::FirstName,
            StudentField::Email => StudentField::LastName,
            StudentField::Course => StudentField::Email,
        };
    }

    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        match self.active {
            StudentField::FirstName => push_text(&mut self.first_name, ch),
            StudentField::LastName => push_text(&mut self.last_name, ch),
            StudentField::Email => push_text(&mut self.email, ch),
            StudentField::Course => false,
        }
    }

    pub(crate) fn backspace(&mut self) {
        match self.active {
            StudentField::FirstName => {
                self.first_name.pop();
            }
            StudentField::LastName => {
                self.last_name.pop();
            }
            StudentField::Email => {
                self.email.pop();
            }
            StudentField::Course => self.course.clear(),
        }
    }

    pub(crate) fn cycle_choice(&mut self, offset: isize) {
        if self.active == StudentField::Course {
            self.course.cycle(offset);
        }
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::new(std::mem::take(&mut self.course.options));
    }

    pub(crate) fn parse_inputs(&self) -> Result<StudentInput> {
        let first_name = self.first_name.trim();
        let last_name = self.last_name.trim();
        if first_name.is_empty() || last_name.is_empty() {
            return Err(anyhow!("Enter student first and last name."));
        }
        let email = self.email.trim();
        if email.is_empty() {
            return Err(anyhow!("Enter student email."));
        }
        let course_id = self
            .course
            .selected_id()
            .ok_or_else(|| anyhow!("Select a course for the student."))?;
        Ok(StudentInput {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: email.to_string(),
            course_id: Some(course_id),
        })
    }

    pub(crate) fn lines(&self) -> Vec<Line<'static>> {
        vec![
            text_line(
                "First name",
                &self.first_name,
                self.active == StudentField::FirstName,
            ),
            text_line(
                "Last name",
                &self.last_name,
                self.active == StudentField::LastName,
            ),
            text_line("Email", &self.email, self.active == StudentField::Email),
            choice_line("Course", &self.course, self.active == StudentField::Course),
        ]
    }

    pub(crate) fn cursor(&self) -> Option<(u16, u16)> {
        let (row, prefix, value) = match self.active {
            StudentField::FirstName => (0, "First name: ", &self.first_name),
            StudentField::LastName => (1, "Last name: ", &self.last_name),
            StudentField::Email => (2, "Email: ", &self.email),
            StudentField::Course => return None,
        };
        Some((row, (prefix.len() + value.chars().count()) as u16))
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) enum MaterialField {
    #[default]
    Course,
    Source,
}

/// Attach form: the course to attach to and the path of the file to copy.
#[derive(Clone, Debug, Default)]
pub(crate) struct MaterialForm {
    pub(crate) course: Choice,
    pub(crate) source_path: String,
    pub(crate) active: MaterialField,
    pub(crate) error: Option<String>,
}

impl MaterialForm {
    pub(crate) fn new(courses: Vec<Lookup>, course_id: Option<i64>) -> Self {
        Self {
            course: Choice::new(courses, course_id),
            ..Self::default()
        }
    }

    pub(crate) fn toggle_field(&mut self) {
        self.active = match self.active {
            MaterialField::Course => MaterialField::Source,
            MaterialField::Source => MaterialField::Course,
        };
    }

    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        match self.active {
            MaterialField::Course => false,
            MaterialField::Source => push_text(&mut self.source_path, ch),
        }
    }

    pub(crate) fn backspace(&mut self) {
        match self.active {
            MaterialField::Course => self.course.clear(),
            MaterialField::Source => {
                self.source_path.pop();
            }
        }
    }

    pub(crate) fn cycle_choice(&mut self, offset: isize) {
        if self.active == MaterialField::Course {
            self.course.cycle(offset);
        }
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::new(std::mem::take(&mut self.course.options), None);
    }

    /// Course id and source file, checked before anything is copied.
    pub(crate) fn parse_inputs(&self) -> Result<(i64, PathBuf)> {
        let course_id = self
            .course
            .selected_id()
            .ok_or_else(|| anyhow!("Select a course for the material."))?;
        let raw = self.source_path.trim();
        let path = PathBuf::from(raw);
        if raw.is_empty() || !path.is_file() {
            return Err(anyhow!("Choose a file to attach."));
        }
        Ok((course_id, path))
    }

    pub(crate) fn lines(&self) -> Vec<Line<'static>> {
        vec![
            choice_line("Course", &self.course, self.active == MaterialField::Course),
            text_line("File", &self.source_path, self.active == MaterialField::Source),
        ]
    }

    pub(crate) fn cursor(&self) -> Option<(u16, u16)> {
        match self.active {
            MaterialField::Course => None,
            MaterialField::Source => Some((
                1,
                ("File: ".len() + self.source_path.chars().count()) as u16,
            )),
        }
    }
}

/// Row picked for deletion, waiting on a y/n answer.
#[derive(Clone, Debug)]
pub(crate) enum ConfirmDelete {
    Teacher { id: i64, name: String },
    Course { id: i64, name: String },
    Student { id: i64, name: String },
    Material(CourseMaterial),
}

impl ConfirmDelete {
    pub(crate) fn title(&self) -> &'static str {
        match self {
            ConfirmDelete::Teacher { .. } => "Delete Teacher",
            ConfirmDelete::Course { .. } => "Delete Course",
            ConfirmDelete::Student { .. } => "Delete Student",
            ConfirmDelete::Material(_) => "Delete Material",
        }
    }

    pub(crate) fn prompt(&self) -> String {
        match self {
            ConfirmDelete::Teacher { name, .. } => format!("Delete selected teacher '{name}'?"),
            ConfirmDelete::Course { name, .. } => format!("Delete selected course '{name}'?"),
            ConfirmDelete::Student { name, .. } => format!("Delete selected student '{name}'?"),
            ConfirmDelete::Material(material) => {
                format!("Delete selected material '{}'?", material.file_name)
            }
        }
    }

    pub(crate) fn consequence(&self) -> &'static str {
        match self {
            ConfirmDelete::Teacher { .. } => "Their courses will be left without a teacher.",
            ConfirmDelete::Course { .. } => {
                "Enrolled students are unassigned and attached materials are removed."
            }
            ConfirmDelete::Student { .. } => "This cannot be undone.",
            ConfirmDelete::Material(_) => "The stored file is deleted as well.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookups() -> Vec<Lookup> {
        vec![
            Lookup {
                id: 10,
                name: "Algebra".into(),
            },
            Lookup {
                id: 20,
                name: "Biology".into(),
            },
        ]
    }

    fn type_text(form: &mut TeacherForm, text: &str) {
        for ch in text.chars() {
            form.push_char(ch);
        }
    }

    #[test]
    fn teacher_inputs_are_trimmed() {
        let mut form = TeacherForm::default();
        type_text(&mut form, "  Ada ");
        form.focus_next();
        type_text(&mut form, "Lovelace");
        form.focus_next();
        type_text(&mut form, " Maths\t");

        let input = form.parse_inputs().unwrap();
        assert_eq!(input.first_name, "Ada");
        assert_eq!(input.last_name, "Lovelace");
        assert_eq!(input.subject, "Maths");
    }

    #[test]
    fn teacher_requires_every_field() {
        let mut form = TeacherForm {
            first_name: "Ada".into(),
            last_name: "   ".into(),
            subject: "Maths".into(),
            ..TeacherForm::default()
        };
        assert_eq!(
            form.parse_inputs().unwrap_err().to_string(),
            "Enter teacher first and last name."
        );

        form.last_name = "Lovelace".into();
        form.subject.clear();
        assert_eq!(form.parse_inputs().unwrap_err().to_string(), "Enter a subject.");
    }

    #[test]
    fn teacher_cursor_follows_active_field() {
        let mut form = TeacherForm::default();
        form.focus_previous();
        type_text(&mut form, "Math");
        assert_eq!(form.active, TeacherField::Subject);
        assert_eq!(form.cursor(), (2, ("Subject: ".len() + 4) as u16));
    }

    #[test]
    fn course_validation_order_and_messages() {
        let mut form = CourseForm::new(lookups());
        assert_eq!(form.parse_inputs().unwrap_err().to_string(), "Enter a course name.");

        form.name = " Rust ".into();
        form.duration = "ten".into();
        assert_eq!(
            form.parse_inputs().unwrap_err().to_string(),
            "Enter a numeric duration."
        );

        form.duration = " 12 ".into();
        assert_eq!(form.parse_inputs().unwrap_err().to_string(), "Select a teacher.");

        form.active = CourseField::Teacher;
        form.cycle_choice(1);
        let input = form.parse_inputs().unwrap();
        assert_eq!(
            input,
            CourseInput {
                name: "Rust".into(),
                duration: 12,
                teacher_id: Some(10),
            }
        );
    }

    #[test]
    fn editing_course_preselects_teacher() {
        let course = Course {
            id: 1,
            name: "Botany".into(),
            duration: 3,
            teacher_id: Some(20),
            teacher_name: Some("Biology".into()),
        };
        let form = CourseForm::from_course(&course, lookups());
        assert_eq!(form.teacher.selected_id(), Some(20));
        assert_eq!(form.duration, "3");

        let orphan = Course {
            teacher_id: None,
            ..course
        };
        let form = CourseForm::from_course(&orphan, lookups());
        assert_eq!(form.teacher.selected_id(), None);
    }

    #[test]
    fn choice_wraps_in_both_directions() {
        let mut choice = Choice::new(lookups(), None);
        choice.cycle(-1);
        assert_eq!(choice.selected_id(), Some(20));
        choice.cycle(1);
        assert_eq!(choice.selected_id(), Some(10));
        choice.cycle(-1);
        assert_eq!(choice.selected_id(), Some(20));

        let mut empty = Choice::default();
        empty.cycle(1);
        assert_eq!(empty.selected_id(), None);
    }

    #[test]
    fn student_validation_messages() {
        let mut form = StudentForm::new(lookups());
        form.first_name = "Ann".into();
        assert_eq!(
            form.parse_inputs().unwrap_err().to_string(),
            "Enter student first and last name."
        );
        form.last_name = "Adams".into();
        assert_eq!(form.parse_inputs().unwrap_err().to_string(), "Enter student email.");
        form.email = " ann@example.org ".into();
        assert_eq!(
            form.parse_inputs().unwrap_err().to_string(),
            "Select a course for the student."
        );
        form.course.cycle(1);
        let input = form.parse_inputs().unwrap();
        assert_eq!(input.email, "ann@example.org");
        assert_eq!(input.course_id, Some(10));
    }

    #[test]
    fn clearing_keeps_lookup_options() {
        let mut form = StudentForm::new(lookups());
        form.first_name = "Ann".into();
        form.course.cycle(1);
        form.active = StudentField::Email;
        form.clear();
        assert!(form.first_name.is_empty());
        assert_eq!(form.course.selected_id(), None);
        assert_eq!(form.course.options.len(), 2);
        assert_eq!(form.active, StudentField::FirstName);
    }

    #[test]
    fn material_needs_course_and_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("slides.pdf");
        std::fs::write(&file, b"%PDF").unwrap();

        let mut form = MaterialForm::new(lookups(), None);
        form.source_path = file.display().to_string();
        assert_eq!(
            form.parse_inputs().unwrap_err().to_string(),
            "Select a course for the material."
        );

        form.course.cycle(1);
        form.source_path = dir.path().join("missing.pdf").display().to_string();
        assert_eq!(
            form.parse_inputs().unwrap_err().to_string(),
            "Choose a file to attach."
        );

        form.source_path = format!("  {}  ", file.display());
        assert_eq!(form.parse_inputs().unwrap(), (10, file));
    }
}
