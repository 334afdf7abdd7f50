use std::mem;

use anyhow::{Error, Result};
use crossterm::event::KeyCode;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Tabs, Wrap,
};
use ratatui::Frame;
use tracing::{debug, warn};

use crate::db::PortalStore;
use crate::materials::{attach_material, delete_material, open_material, MaterialLibrary};
use crate::models::{Course, CourseMaterial, Lookup, Student, Teacher};

use super::forms::{ConfirmDelete, CourseForm, MaterialForm, StudentForm, TeacherForm};
use super::helpers::{centered_rect, format_uploaded, key_hints, or_unassigned, surface_error};
use super::screens::{CourseStudentsScreen, EntityList, Tab};

/// Tab bar height including its border.
const HEADER_HEIGHT: u16 = 3;
/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;

/// High-level navigation states.
enum Screen {
    Main,
    CourseStudents(CourseStudentsScreen),
}

/// Fine-grained modes scoped to the current screen. Form modes carry the id
/// of the row being edited; `None` means the form adds a new row.
enum Mode {
    Normal,
    Teacher { id: Option<i64>, form: TeacherForm },
    Course { id: Option<i64>, form: CourseForm },
    Student { id: Option<i64>, form: StudentForm },
    AttachMaterial(MaterialForm),
    ConfirmDelete(ConfirmDelete),
    Searching(SearchState),
}

/// Live course-name search.
struct SearchState {
    query: String,
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

/// Severity levels shown in the footer.
#[derive(Debug, PartialEq, Eq)]
enum StatusKind {
    Info,
    Warning,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Warning => Style::default().fg(Color::Yellow),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Central application state shared across the TUI.
pub struct App {
    store: Box<dyn PortalStore>,
    library: MaterialLibrary,
    teachers: EntityList<Teacher>,
    courses: EntityList<Course>,
    students: EntityList<Student>,
    materials: EntityList<CourseMaterial>,
    teacher_lookup: Vec<Lookup>,
    course_lookup: Vec<Lookup>,
    course_search: String,
    tab: Tab,
    screen: Screen,
    mode: Mode,
    status: Option<StatusMessage>,
}

impl App {
    /// Build the app and bind every grid. A failed initial load is reported
    /// in the footer rather than aborting, and `notice` takes precedence.
    pub fn new(
        store: Box<dyn PortalStore>,
        library: MaterialLibrary,
        notice: Option<String>,
    ) -> Self {
        let mut app = Self {
            store,
            library,
            teachers: EntityList::default(),
            courses: EntityList::default(),
            students: EntityList::default(),
            materials: EntityList::default(),
            teacher_lookup: Vec::new(),
            course_lookup: Vec::new(),
            course_search: String::new(),
            tab: Tab::Teachers,
            screen: Screen::Main,
            mode: Mode::Normal,
            status: None,
        };

        let loaded = app.refresh_all();
        match (loaded, notice) {
            (Err(err), Some(notice)) => {
                warn!("initial load failed: {err:#}");
                app.set_status(notice, StatusKind::Warning);
            }
            (Err(err), None) => {
                warn!("initial load failed: {err:#}");
                app.set_status(
                    format!("Failed to load data: {}", surface_error(&err)),
                    StatusKind::Error,
                );
            }
            (Ok(()), Some(notice)) => app.set_status(notice, StatusKind::Warning),
            (Ok(()), None) => {}
        }
        app
    }

    /// Route a key press to the active mode. Returns `true` once the user asks
    /// to quit. Data errors are shown in the footer, never returned.
    pub fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        let mut exit = false;
        let mode = mem::replace(&mut self.mode, Mode::Normal);

        self.mode = match mode {
            Mode::Normal => match self.screen {
                Screen::Main => self.handle_main_key(code, &mut exit),
                Screen::CourseStudents(_) => self.handle_course_students_key(code, &mut exit),
            },
            Mode::Teacher { id, form } => self.handle_teacher_form(code, id, form),
            Mode::Course { id, form } => self.handle_course_form(code, id, form),
            Mode::Student { id, form } => self.handle_student_form(code, id, form),
            Mode::AttachMaterial(form) => self.handle_material_form(code, form),
            Mode::ConfirmDelete(confirm) => self.handle_confirm_delete(code, confirm),
            Mode::Searching(state) => self.handle_search(code, state),
        };

        Ok(exit)
    }

    fn handle_main_key(&mut self, code: KeyCode, exit: &mut bool) -> Mode {
        let moved = match self.tab {
            Tab::Teachers => self.teachers.handle_navigation(code),
            Tab::Courses => self.courses.handle_navigation(code),
            Tab::Students => self.students.handle_navigation(code),
            Tab::Materials => self.materials.handle_navigation(code),
        };
        if moved {
            return Mode::Normal;
        }

        match code {
            KeyCode::Char('q') => *exit = true,
            KeyCode::Esc => {
                if self.tab == Tab::Courses && !self.course_search.is_empty() {
                    self.apply_course_search(String::new());
                } else {
                    *exit = true;
                }
            }
            KeyCode::Tab | KeyCode::Right => {
                self.clear_status();
                self.tab = self.tab.next();
            }
            KeyCode::BackTab | KeyCode::Left => {
                self.clear_status();
                self.tab = self.tab.previous();
            }
            KeyCode::Char('+') | KeyCode::Char('a') => return self.begin_add(),
            KeyCode::Char('e') | KeyCode::Char('E') => return self.begin_edit(),
            KeyCode::Char('-') | KeyCode::Char('d') | KeyCode::Delete => {
                return self.begin_delete()
            }
            KeyCode::Enter => {
                if self.tab == Tab::Materials {
                    self.open_selected_material();
                } else {
                    return self.begin_edit();
                }
            }
            KeyCode::Char('o') if self.tab == Tab::Materials => self.open_selected_material(),
            KeyCode::Char('f') | KeyCode::Char('/') if self.tab == Tab::Courses => {
                self.clear_status();
                return Mode::Searching(SearchState {
                    query: self.course_search.clone(),
                });
            }
            KeyCode::Char('v') | KeyCode::Char('V') => self.open_course_students(),
            KeyCode::Char('r') | KeyCode::Char('R') => match self.refresh_all() {
                Ok(()) => self.set_status("Reloaded.", StatusKind::Info),
                Err(err) => {
                    self.report_error(&err);
                }
            },
            _ => {}
        }
        Mode::Normal
    }

    fn handle_course_students_key(&mut self, code: KeyCode, exit: &mut bool) -> Mode {
        let Screen::CourseStudents(screen) = &mut self.screen else {
            return Mode::Normal;
        };
        if screen.students.handle_navigation(code) {
            return Mode::Normal;
        }

        let cycled = match code {
            KeyCode::Char('q') => {
                *exit = true;
                return Mode::Normal;
            }
            KeyCode::Esc | KeyCode::Char('v') | KeyCode::Char('V') => {
                self.screen = Screen::Main;
                self.clear_status();
                return Mode::Normal;
            }
            KeyCode::Char('r') | KeyCode::Char('R') => {
                if let Err(err) = screen.refresh(self.store.as_ref()) {
                    self.report_error(&err);
                }
                return Mode::Normal;
            }
            KeyCode::Left => screen.cycle_course(self.store.as_ref(), -1),
            KeyCode::Right | KeyCode::Tab => screen.cycle_course(self.store.as_ref(), 1),
            _ => return Mode::Normal,
        };

        match cycled {
            Ok(true) => self.clear_status(),
            Ok(false) => self.set_status("No other course to show.", StatusKind::Info),
            Err(err) => {
                self.report_error(&err);
            }
        }
        Mode::Normal
    }

    fn handle_teacher_form(
        &mut self,
        code: KeyCode,
        id: Option<i64>,
        mut form: TeacherForm,
    ) -> Mode {
        match code {
            KeyCode::Esc => {
                self.set_status(cancel_message(id), StatusKind::Info);
                return Mode::Normal;
            }
            KeyCode::Tab | KeyCode::Down => form.focus_next(),
            KeyCode::BackTab | KeyCode::Up => form.focus_previous(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match self.save_teacher(id, &form) {
                Ok(()) => return Mode::Normal,
                Err(err) => form.error = Some(self.report_error(&err)),
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }
        Mode::Teacher { id, form }
    }

    fn handle_course_form(
        &mut self,
        code: KeyCode,
        id: Option<i64>,
        mut form: CourseForm,
    ) -> Mode {
        match code {
            KeyCode::Esc => {
                self.set_status(cancel_message(id), StatusKind::Info);
                return Mode::Normal;
            }
            KeyCode::Tab | KeyCode::Down => form.focus_next(),
            KeyCode::BackTab | KeyCode::Up => form.focus_previous(),
            KeyCode::Left => form.cycle_choice(-1),
            KeyCode::Right => form.cycle_choice(1),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match self.save_course(id, &form) {
                Ok(()) => return Mode::Normal,
                Err(err) => form.error = Some(self.report_error(&err)),
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }
        Mode::Course { id, form }
    }

    fn handle_student_form(
        &mut self,
        code: KeyCode,
        id: Option<i64>,
        mut form: StudentForm,
    ) -> Mode {
        match code {
            KeyCode::Esc => {
                self.set_status(cancel_message(id), StatusKind::Info);
                return Mode::Normal;
            }
            KeyCode::Tab | KeyCode::Down => form.focus_next(),
            KeyCode::BackTab | KeyCode::Up => form.focus_previous(),
            KeyCode::Left => form.cycle_choice(-1),
            KeyCode::Right => form.cycle_choice(1),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match self.save_student(id, &form) {
                Ok(()) => return Mode::Normal,
                Err(err) => form.error = Some(self.report_error(&err)),
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }
        Mode::Student { id, form }
    }

    fn handle_material_form(&mut self, code: KeyCode, mut form: MaterialForm) -> Mode {
        match code {
            KeyCode::Esc => {
                self.set_status("Attach cancelled.", StatusKind::Info);
                return Mode::Normal;
            }
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => form.toggle_field(),
            KeyCode::Left => form.cycle_choice(-1),
            KeyCode::Right => form.cycle_choice(1),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match self.save_material(&form) {
                Ok(()) => return Mode::Normal,
                Err(err) => form.error = Some(self.report_error(&err)),
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }
        Mode::AttachMaterial(form)
    }

    fn handle_confirm_delete(&mut self, code: KeyCode, confirm: ConfirmDelete) -> Mode {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Deletion cancelled.", StatusKind::Info);
                Mode::Normal
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                match self.perform_delete(&confirm) {
                    Ok(()) => Mode::Normal,
                    Err(err) => {
                        self.report_error(&err);
                        Mode::ConfirmDelete(confirm)
                    }
                }
            }
            _ => Mode::ConfirmDelete(confirm),
        }
    }

    fn handle_search(&mut self, code: KeyCode, mut state: SearchState) -> Mode {
        if self.courses.handle_navigation(code) {
            return Mode::Searching(state);
        }
        match code {
            KeyCode::Esc => {
                self.apply_course_search(String::new());
                return Mode::Normal;
            }
            KeyCode::Enter => return Mode::Normal,
            KeyCode::Backspace => {
                state.query.pop();
            }
            KeyCode::Char(ch) => state.query.push(ch),
            _ => return Mode::Searching(state),
        }
        self.apply_course_search(state.query.clone());
        Mode::Searching(state)
    }

    /// Ctrl+E while searching: keep the filter and edit the highlighted course.
    pub(crate) fn handle_ctrl_e(&mut self) -> Result<()> {
        if !matches!(self.mode, Mode::Searching(_)) {
            return Ok(());
        }
        self.mode = Mode::Normal;
        self.mode = self.begin_edit();
        Ok(())
    }

    /// Ctrl+L inside a form: reset every field and forget the edited row, so
    /// the next save adds instead of updating.
    pub(crate) fn handle_ctrl_l(&mut self) -> Result<()> {
        let cleared = match &mut self.mode {
            Mode::Teacher { id, form } => {
                *id = None;
                *form = TeacherForm::default();
                true
            }
            Mode::Course { id, form } => {
                *id = None;
                form.clear();
                true
            }
            Mode::Student { id, form } => {
                *id = None;
                form.clear();
                true
            }
            Mode::AttachMaterial(form) => {
                form.clear();
                true
            }
            _ => false,
        };
        if cleared {
            self.set_status("Form cleared.", StatusKind::Info);
        }
        Ok(())
    }

    fn begin_add(&mut self) -> Mode {
        self.clear_status();
        match self.tab {
            Tab::Teachers => Mode::Teacher {
                id: None,
                form: TeacherForm::default(),
            },
            Tab::Courses => Mode::Course {
                id: None,
                form: CourseForm::new(self.teacher_lookup.clone()),
            },
            Tab::Students => Mode::Student {
                id: None,
                form: StudentForm::new(self.course_lookup.clone()),
            },
            Tab::Materials => {
                let course_id = self.materials.current().map(|material| material.course_id);
                Mode::AttachMaterial(MaterialForm::new(self.course_lookup.clone(), course_id))
            }
        }
    }

    fn begin_edit(&mut self) -> Mode {
        let mode = match self.tab {
            Tab::Teachers => self.teachers.current().map(|teacher| Mode::Teacher {
                id: Some(teacher.id),
                form: TeacherForm::from_teacher(teacher),
            }),
            Tab::Courses => self.courses.current().map(|course| Mode::Course {
                id: Some(course.id),
                form: CourseForm::from_course(course, self.teacher_lookup.clone()),
            }),
            Tab::Students => self.students.current().map(|student| Mode::Student {
                id: Some(student.id),
                form: StudentForm::from_student(student, self.course_lookup.clone()),
            }),
            Tab::Materials => {
                self.set_status(
                    "Materials cannot be edited. Delete and attach the file again.",
                    StatusKind::Info,
                );
                return Mode::Normal;
            }
        };

        match mode {
            Some(mode) => {
                self.clear_status();
                mode
            }
            None => {
                self.set_status(
                    format!("Select a {} to update.", self.tab.noun()),
                    StatusKind::Error,
                );
                Mode::Normal
            }
        }
    }

    fn begin_delete(&mut self) -> Mode {
        let confirm = match self.tab {
            Tab::Teachers => self.teachers.current().map(|teacher| ConfirmDelete::Teacher {
                id: teacher.id,
                name: teacher.full_name(),
            }),
            Tab::Courses => self.courses.current().map(|course| ConfirmDelete::Course {
                id: course.id,
                name: course.name.clone(),
            }),
            Tab::Students => self.students.current().map(|student| ConfirmDelete::Student {
                id: student.id,
                name: student.full_name(),
            }),
            Tab::Materials => self.materials.current().cloned().map(ConfirmDelete::Material),
        };

        match confirm {
            Some(confirm) => {
                self.clear_status();
                Mode::ConfirmDelete(confirm)
            }
            None => {
                self.set_status(
                    format!("Select a {} to delete.", self.tab.noun()),
                    StatusKind::Error,
                );
                Mode::Normal
            }
        }
    }

    fn open_selected_material(&mut self) {
        let Some(material) = self.materials.current().cloned() else {
            self.set_status("Select a material to open.", StatusKind::Error);
            return;
        };
        match open_material(&self.library, &material) {
            Ok(_) => self.set_status(format!("Opened {}.", material.file_name), StatusKind::Info),
            Err(err) => {
                warn!(id = material.id, "failed to open material: {err}");
                self.set_status(err.to_string(), StatusKind::Error);
            }
        }
    }

    fn open_course_students(&mut self) {
        match CourseStudentsScreen::load(self.store.as_ref()) {
            Ok(screen) => {
                self.clear_status();
                self.screen = Screen::CourseStudents(screen);
            }
            Err(err) => {
                self.report_error(&err);
            }
        }
    }

    fn apply_course_search(&mut self, query: String) {
        self.course_search = query;
        if let Err(err) = self.reload_course_grid(None) {
            self.report_error(&err);
        }
    }

    // The save and delete helpers return `Err` only when nothing was written.
    // Once the write succeeds the form or dialog closes, and a failed reload
    // is reported through `finish_write` so a retry cannot write twice.

    fn save_teacher(&mut self, id: Option<i64>, form: &TeacherForm) -> Result<()> {
        let input = form.parse_inputs()?;
        let (id, verb) = match id {
            Some(id) => {
                self.store.update_teacher(id, &input)?;
                (id, "Updated")
            }
            None => (self.store.create_teacher(&input)?, "Added"),
        };
        self.finish_write(
            format!("{verb} teacher {} {}.", input.first_name, input.last_name),
            |app| app.reload_teachers(Some(id)),
        );
        Ok(())
    }

    fn save_course(&mut self, id: Option<i64>, form: &CourseForm) -> Result<()> {
        let input = form.parse_inputs()?;
        let (id, verb) = match id {
            Some(id) => {
                self.store.update_course(id, &input)?;
                (id, "Updated")
            }
            None => (self.store.create_course(&input)?, "Added"),
        };
        self.finish_write(format!("{verb} course {}.", input.name), |app| {
            app.reload_courses(Some(id))
        });
        Ok(())
    }

    fn save_student(&mut self, id: Option<i64>, form: &StudentForm) -> Result<()> {
        let input = form.parse_inputs()?;
        let (id, verb) = match id {
            Some(id) => {
                self.store.update_student(id, &input)?;
                (id, "Updated")
            }
            None => (self.store.create_student(&input)?, "Added"),
        };
        self.finish_write(
            format!("{verb} student {} {}.", input.first_name, input.last_name),
            |app| app.reload_students(Some(id)),
        );
        Ok(())
    }

    fn save_material(&mut self, form: &MaterialForm) -> Result<()> {
        let (course_id, source) = form.parse_inputs()?;
        let id = attach_material(self.store.as_ref(), &self.library, course_id, &source)?;
        let name = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.finish_write(format!("Attached {name}."), |app| {
            app.reload_materials(Some(id))
        });
        Ok(())
    }

    fn perform_delete(&mut self, confirm: &ConfirmDelete) -> Result<()> {
        match confirm {
            ConfirmDelete::Teacher { id, name } => {
                self.store.delete_teacher(*id)?;
                self.finish_write(format!("Deleted teacher {name}."), |app| {
                    app.reload_teachers(None)
                });
            }
            ConfirmDelete::Course { id, name } => {
                self.store.delete_course(*id)?;
                self.finish_write(format!("Deleted course {name}."), |app| {
                    app.reload_courses(None)
                });
            }
            ConfirmDelete::Student { id, name } => {
                self.store.delete_student(*id)?;
                self.finish_write(format!("Deleted student {name}."), |app| {
                    app.reload_students(None)
                });
            }
            ConfirmDelete::Material(material) => {
                delete_material(self.store.as_ref(), &self.library, material)?;
                self.finish_write(format!("Deleted material {}.", material.file_name), |app| {
                    app.reload_materials(None)
                });
            }
        }
        Ok(())
    }

    /// Reload after a successful write. A reload failure keeps the success
    /// message so the user knows the change was saved.
    fn finish_write(
        &mut self,
        message: String,
        reload: impl FnOnce(&mut Self) -> Result<()>,
    ) {
        match reload(self) {
            Ok(()) => self.set_status(message, StatusKind::Info),
            Err(err) => {
                warn!("reload after write failed: {err:#}");
                self.set_status(
                    format!("{message} Reload failed: {}", surface_error(&err)),
                    StatusKind::Error,
                );
            }
        }
    }

    fn refresh_all(&mut self) -> Result<()> {
        debug!("reloading every grid");
        self.reload_teachers(None)?;
        self.reload_courses(None)
    }

    /// Teacher changes show up in the teacher grid, the teacher lookup and the
    /// course grid's teacher column.
    fn reload_teachers(&mut self, focus: Option<i64>) -> Result<()> {
        self.teachers.set_items(self.store.list_teachers()?);
        if let Some(id) = focus {
            self.teachers.select_where(|teacher| teacher.id == id);
        }
        self.teacher_lookup = self.store.teacher_lookup()?;
        self.reload_course_grid(None)
    }

    /// Course changes ripple into every grid that shows a course name.
    fn reload_courses(&mut self, focus: Option<i64>) -> Result<()> {
        self.reload_course_grid(focus)?;
        self.course_lookup = self.store.course_lookup()?;
        self.reload_students(None)?;
        self.reload_materials(None)
    }

    fn reload_course_grid(&mut self, focus: Option<i64>) -> Result<()> {
        self.courses
            .set_items(self.store.list_courses(Some(&self.course_search))?);
        if let Some(id) = focus {
            self.courses.select_where(|course| course.id == id);
        }
        Ok(())
    }

    fn reload_students(&mut self, focus: Option<i64>) -> Result<()> {
        self.students.set_items(self.store.list_students()?);
        if let Some(id) = focus {
            self.students.select_where(|student| student.id == id);
        }
        Ok(())
    }

    fn reload_materials(&mut self, focus: Option<i64>) -> Result<()> {
        self.materials.set_items(self.store.list_materials()?);
        if let Some(id) = focus {
            self.materials.select_where(|material| material.id == id);
        }
        Ok(())
    }

    /// Log the full chain, show the root cause, and hand it back for the form.
    fn report_error(&mut self, err: &Error) -> String {
        warn!("{err:#}");
        let message = surface_error(err);
        self.set_status(message.clone(), StatusKind::Error);
        message
    }

    fn set_status<S: Into<String>>(&mut self, text: S, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    fn clear_status(&mut self) {
        self.status = None;
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(HEADER_HEIGHT),
                Constraint::Min(0),
                Constraint::Length(FOOTER_HEIGHT),
            ])
            .split(area);

        match &self.screen {
            Screen::Main => {
                self.draw_tabs(frame, chunks[0]);
                self.draw_tab_content(frame, chunks[1]);
            }
            Screen::CourseStudents(screen) => {
                self.draw_course_selector(frame, chunks[0], screen);
                self.draw_course_students(frame, chunks[1], screen);
            }
        }
        self.draw_footer(frame, chunks[2]);

        match &self.mode {
            Mode::Teacher { id, form } => self.draw_form(
                frame,
                area,
                form_title(*id, "Teacher"),
                form.lines(),
                form.error.as_deref(),
                Some(form.cursor()),
            ),
            Mode::Course { id, form } => self.draw_form(
                frame,
                area,
                form_title(*id, "Course"),
                form.lines(),
                form.error.as_deref(),
                form.cursor(),
            ),
            Mode::Student { id, form } => self.draw_form(
                frame,
                area,
                form_title(*id, "Student"),
                form.lines(),
                form.error.as_deref(),
                form.cursor(),
            ),
            Mode::AttachMaterial(form) => self.draw_form(
                frame,
                area,
                "Attach Material".to_string(),
                form.lines(),
                form.error.as_deref(),
                form.cursor(),
            ),
            Mode::ConfirmDelete(confirm) => self.draw_confirm(frame, area, confirm),
            Mode::Searching(state) => self.draw_search_bar(frame, chunks[1], state),
            Mode::Normal => {}
        }
    }

    fn draw_tabs(&self, frame: &mut Frame, area: Rect) {
        let titles: Vec<Line> = Tab::ALL.iter().map(|tab| Line::from(tab.title())).collect();
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!("Education Portal ({})", self.store.backend_name()));
        let tabs = Tabs::new(titles)
            .block(block)
            .select(self.tab.index())
            .highlight_style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            );
        frame.render_widget(tabs, area);
    }

    fn draw_tab_content(&self, frame: &mut Frame, area: Rect) {
        match self.tab {
            Tab::Teachers => {
                let rows = self
                    .teachers
                    .items
                    .iter()
                    .map(|teacher| {
                        Row::new(vec![
                            teacher.id.to_string(),
                            teacher.first_name.clone(),
                            teacher.last_name.clone(),
                            teacher.subject.clone(),
                        ])
                    })
                    .collect();
                draw_table(
                    frame,
                    area,
                    "Teachers".to_string(),
                    &["ID", "First name", "Last name", "Subject"],
                    &[
                        Constraint::Length(6),
                        Constraint::Percentage(30),
                        Constraint::Percentage(30),
                        Constraint::Min(10),
                    ],
                    rows,
                    self.teachers.selected,
                    "No teachers yet. Press '+' to add one.",
                );
            }
            Tab::Courses => {
                let rows = self
                    .courses
                    .items
                    .iter()
                    .map(|course| {
                        Row::new(vec![
                            course.id.to_string(),
                            course.name.clone(),
                            course.duration.to_string(),
                            or_unassigned(course.teacher_name.as_deref()),
                        ])
                    })
                    .collect();
                let (title, empty) = if self.course_search.trim().is_empty() {
                    (
                        "Courses".to_string(),
                        "No courses yet. Press '+' to add one.",
                    )
                } else {
                    (
                        format!("Courses matching \"{}\"", self.course_search.trim()),
                        "No course name matches the search.",
                    )
                };
                draw_table(
                    frame,
                    area,
                    title,
                    &["ID", "Name", "Duration", "Teacher"],
                    &[
                        Constraint::Length(6),
                        Constraint::Percentage(40),
                        Constraint::Length(10),
                        Constraint::Min(10),
                    ],
                    rows,
                    self.courses.selected,
                    empty,
                );
            }
            Tab::Students => {
                let rows = self
                    .students
                    .items
                    .iter()
                    .map(|student| {
                        Row::new(vec![
                            student.id.to_string(),
                            student.first_name.clone(),
                            student.last_name.clone(),
                            student.email.clone(),
                            or_unassigned(student.course_name.as_deref()),
                        ])
                    })
                    .collect();
                draw_table(
                    frame,
                    area,
                    "Students".to_string(),
                    &["ID", "First name", "Last name", "Email", "Course"],
                    &[
                        Constraint::Length(6),
                        Constraint::Percentage(20),
                        Constraint::Percentage(20),
                        Constraint::Percentage(30),
                        Constraint::Min(10),
                    ],
                    rows,
                    self.students.selected,
                    "No students yet. Press '+' to add one.",
                );
            }
            Tab::Materials => {
                let rows = self
                    .materials
                    .items
                    .iter()
                    .map(|material| {
                        Row::new(vec![
                            material.id.to_string(),
                            or_unassigned(material.course_name.as_deref()),
                            material.file_name.clone(),
                            format_uploaded(&material.uploaded_at),
                            material.file_path.clone(),
                        ])
                    })
                    .collect();
                draw_table(
                    frame,
                    area,
                    "Materials".to_string(),
                    &["ID", "Course", "File", "Uploaded", "Stored as"],
                    &[
                        Constraint::Length(6),
                        Constraint::Percentage(20),
                        Constraint::Percentage(25),
                        Constraint::Length(17),
                        Constraint::Min(10),
                    ],
                    rows,
                    self.materials.selected,
                    "No materials yet. Press '+' to attach a file.",
                );
            }
        }
    }

    fn draw_course_selector(&self, frame: &mut Frame, area: Rect, screen: &CourseStudentsScreen) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title("Students by Course");
        let line = match screen.current_course() {
            Some(course) => Line::from(vec![
                Span::raw("Course: "),
                Span::styled(
                    format!("< {} >", course.name),
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!("  {} of {}", screen.course_index + 1, screen.courses.len()),
                    Style::default().fg(Color::DarkGray),
                ),
            ]),
            None => Line::from("No courses yet."),
        };
        frame.render_widget(Paragraph::new(line).block(block), area);
    }

    fn draw_course_students(&self, frame: &mut Frame, area: Rect, screen: &CourseStudentsScreen) {
        let rows = screen
            .students
            .items
            .iter()
            .map(|student| {
                Row::new(vec![
                    student.id.to_string(),
                    student.first_name.clone(),
                    student.last_name.clone(),
                    student.email.clone(),
                    student.course_name.clone(),
                ])
            })
            .collect();
        draw_table(
            frame,
            area,
            "Enrolled".to_string(),
            &["ID", "First name", "Last name", "Email", "Course"],
            &[
                Constraint::Length(6),
                Constraint::Percentage(20),
                Constraint::Percentage(20),
                Constraint::Percentage(30),
                Constraint::Min(10),
            ],
            rows,
            screen.students.selected,
            "No students enrolled in this course.",
        );
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.kind.style())])
        } else {
            Line::from("")
        };

        let instructions = self.footer_instructions();

        let paragraph = Paragraph::new(vec![status_line, instructions]).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn draw_search_bar(&self, frame: &mut Frame, area: Rect, state: &SearchState) {
        let height = 3u16.min(area.height);
        let popup_area = Rect {
            x: area.x,
            y: area.y,
            width: area.width,
            height,
        };
        frame.render_widget(Clear, popup_area);

        let block = Block::default().borders(Borders::ALL).title("Search courses");
        let paragraph = Paragraph::new(Span::raw(format!("Search: {}", state.query)))
            .block(block.clone())
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, popup_area);

        let inner = block.inner(popup_area);
        let cursor_x = inner.x + "Search: ".len() as u16 + state.query.chars().count() as u16;
        let cursor_y = inner.y;
        frame.set_cursor_position((cursor_x, cursor_y));
    }

    fn footer_instructions(&self) -> Line<'static> {
        match (&self.screen, &self.mode) {
            (_, Mode::ConfirmDelete(_)) => key_hints(&[("y", "Delete"), ("n/Esc", "Cancel")]),
            (_, Mode::Searching(_)) => key_hints(&[
                ("type", "Filter"),
                ("↑↓", "Select"),
                ("Ctrl+E", "Edit"),
                ("Enter", "Keep Filter"),
                ("Esc", "Clear"),
            ]),
            (_, Mode::Teacher { .. }) => key_hints(&[
                ("Tab", "Next Field"),
                ("Enter", "Save"),
                ("Ctrl+L", "Clear"),
                ("Esc", "Cancel"),
            ]),
            (_, Mode::Course { .. })
            | (_, Mode::Student { .. })
            | (_, Mode::AttachMaterial(_)) => key_hints(&[
                ("Tab", "Next Field"),
                ("←→", "Choose"),
                ("Enter", "Save"),
                ("Ctrl+L", "Clear"),
                ("Esc", "Cancel"),
            ]),
            (Screen::CourseStudents(_), _) => key_hints(&[
                ("←→", "Course"),
                ("↑↓", "Select"),
                ("r", "Reload"),
                ("Esc", "Back"),
                ("q", "Quit"),
            ]),
            (Screen::Main, _) => match self.tab {
                Tab::Courses => key_hints(&[
                    ("Tab", "Switch"),
                    ("↑↓", "Select"),
                    ("+", "Add"),
                    ("e", "Edit"),
                    ("-", "Delete"),
                    ("f", "Search"),
                    ("v", "Students by Course"),
                    ("r", "Reload"),
                    ("q", "Quit"),
                ]),
                Tab::Materials => key_hints(&[
                    ("Tab", "Switch"),
                    ("↑↓", "Select"),
                    ("Enter", "Open"),
                    ("+", "Attach"),
                    ("-", "Delete"),
                    ("v", "Students by Course"),
                    ("r", "Reload"),
                    ("q", "Quit"),
                ]),
                Tab::Teachers | Tab::Students => key_hints(&[
                    ("Tab", "Switch"),
                    ("↑↓", "Select"),
                    ("+", "Add"),
                    ("e", "Edit"),
                    ("-", "Delete"),
                    ("v", "Students by Course"),
                    ("r", "Reload"),
                    ("q", "Quit"),
                ]),
            },
        }
    }

    fn draw_form(
        &self,
        frame: &mut Frame,
        area: Rect,
        title: String,
        mut lines: Vec<Line<'static>>,
        error: Option<&str>,
        cursor: Option<(u16, u16)>,
    ) {
        let popup_area = centered_rect(60, 40, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title(title).borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        lines.push(Line::from(""));
        if let Some(error) = error {
            lines.push(Line::from(Span::styled(
                error.to_string(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Enter to save • Tab to switch • Esc to cancel",
                Style::default().fg(Color::Gray),
            )));
        }

        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);

        if let Some((row, column)) = cursor {
            frame.set_cursor_position((inner.x + column, inner.y + row));
        }
    }

    fn draw_confirm(&self, frame: &mut Frame, area: Rect, confirm: &ConfirmDelete) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title(confirm.title()).borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let lines = vec![
            Line::from(confirm.prompt()),
            Line::from(confirm.consequence()),
            Line::from(""),
            Line::from(Span::styled(
                "Press Y to confirm or N / Esc to cancel.",
                Style::default().fg(Color::Gray),
            )),
        ];

        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }
}

fn form_title(id: Option<i64>, entity: &str) -> String {
    match id {
        Some(_) => format!("Edit {entity}"),
        None => format!("Add {entity}"),
    }
}

fn cancel_message(id: Option<i64>) -> &'static str {
    match id {
        Some(_) => "Edit cancelled.",
        None => "Add cancelled.",
    }
}

/// Bordered grid with a bold header row, or a centered hint when empty.
#[allow(clippy::too_many_arguments)]
fn draw_table(
    frame: &mut Frame,
    area: Rect,
    title: String,
    header: &[&'static str],
    widths: &[Constraint],
    rows: Vec<Row<'static>>,
    selected: usize,
    empty_message: &str,
) {
    let block = Block::default().borders(Borders::ALL).title(title);
    if rows.is_empty() {
        let message = Paragraph::new(empty_message.to_string())
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(message, area);
        return;
    }

    let header = Row::new(header.iter().map(|title| Cell::from(*title)))
        .style(Style::default().add_modifier(Modifier::BOLD));
    let table = Table::new(rows, widths.iter().copied())
        .header(header)
        .block(block)
        .row_highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");
    let mut state = TableState::default().with_selected(Some(selected));
    frame.render_stateful_widget(table, area, &mut state);
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::fs;
    use std::rc::Rc;

    use anyhow::anyhow;

    use super::*;
    use crate::db::SqliteStore;
    use crate::models::{CourseInput, CourseStudent, MaterialInput, StudentInput, TeacherInput};

    /// SQLite store whose list queries start failing once `fail_reads` is
    /// set, while writes keep going through.
    struct FlakyStore {
        inner: SqliteStore,
        fail_reads: Rc<Cell<bool>>,
    }

    impl FlakyStore {
        fn check_reads(&self) -> Result<()> {
            if self.fail_reads.get() {
                Err(anyhow!("connection reset"))
            } else {
                Ok(())
            }
        }
    }

    impl PortalStore for FlakyStore {
        fn backend_name(&self) -> &'static str {
            "flaky"
        }
        fn ensure_schema(&self) -> Result<()> {
            self.inner.ensure_schema()
        }
        fn list_teachers(&self) -> Result<Vec<Teacher>> {
            self.check_reads()?;
            self.inner.list_teachers()
        }
        fn teacher_lookup(&self) -> Result<Vec<Lookup>> {
            self.check_reads()?;
            self.inner.teacher_lookup()
        }
        fn create_teacher(&self, input: &TeacherInput) -> Result<i64> {
            self.inner.create_teacher(input)
        }
        fn update_teacher(&self, id: i64, input: &TeacherInput) -> Result<()> {
            self.inner.update_teacher(id, input)
        }
        fn delete_teacher(&self, id: i64) -> Result<()> {
            self.inner.delete_teacher(id)
        }
        fn list_courses(&self, search: Option<&str>) -> Result<Vec<Course>> {
            self.check_reads()?;
            self.inner.list_courses(search)
        }
        fn course_lookup(&self) -> Result<Vec<Lookup>> {
            self.check_reads()?;
            self.inner.course_lookup()
        }
        fn create_course(&self, input: &CourseInput) -> Result<i64> {
            self.inner.create_course(input)
        }
        fn update_course(&self, id: i64, input: &CourseInput) -> Result<()> {
            self.inner.update_course(id, input)
        }
        fn delete_course(&self, id: i64) -> Result<()> {
            self.inner.delete_course(id)
        }
        fn list_students(&self) -> Result<Vec<Student>> {
            self.check_reads()?;
            self.inner.list_students()
        }
        fn students_for_course(&self, course_id: i64) -> Result<Vec<CourseStudent>> {
            self.check_reads()?;
            self.inner.students_for_course(course_id)
        }
        fn create_student(&self, input: &StudentInput) -> Result<i64> {
            self.inner.create_student(input)
        }
        fn update_student(&self, id: i64, input: &StudentInput) -> Result<()> {
            self.inner.update_student(id, input)
        }
        fn delete_student(&self, id: i64) -> Result<()> {
            self.inner.delete_student(id)
        }
        fn list_materials(&self) -> Result<Vec<CourseMaterial>> {
            self.check_reads()?;
            self.inner.list_materials()
        }
        fn create_material(&self, input: &MaterialInput) -> Result<i64> {
            self.inner.create_material(input)
        }
        fn delete_material(&self, id: i64) -> Result<()> {
            self.inner.delete_material(id)
        }
    }

    fn flaky_app() -> (tempfile::TempDir, SqliteStore, Rc<Cell<bool>>, App) {
        let dir = tempfile::tempdir().unwrap();
        let inner = SqliteStore::new(dir.path().join("portal.sqlite"));
        inner.ensure_schema().unwrap();
        let fail_reads = Rc::new(Cell::new(false));
        let store = FlakyStore {
            inner: inner.clone(),
            fail_reads: Rc::clone(&fail_reads),
        };
        let app = App::new(Box::new(store), MaterialLibrary::new(dir.path()), None);
        (dir, inner, fail_reads, app)
    }

    fn test_app() -> (tempfile::TempDir, App) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(dir.path().join("portal.sqlite"));
        store.ensure_schema().unwrap();
        let library = MaterialLibrary::new(dir.path());
        let app = App::new(Box::new(store), library, None);
        (dir, app)
    }

    fn press(app: &mut App, codes: &[KeyCode]) {
        for code in codes {
            app.handle_key(*code).unwrap();
        }
    }

    fn type_text(app: &mut App, text: &str) {
        for ch in text.chars() {
            app.handle_key(KeyCode::Char(ch)).unwrap();
        }
    }

    fn status_text(app: &App) -> Option<&str> {
        app.status.as_ref().map(|status| status.text.as_str())
    }

    fn seed_teacher(app: &App, first: &str) -> i64 {
        app.store
            .create_teacher(&TeacherInput {
                first_name: first.into(),
                last_name: "Hopper".into(),
                subject: "Computing".into(),
            })
            .unwrap()
    }

    fn seed_course(app: &App, name: &str, teacher_id: Option<i64>) -> i64 {
        app.store
            .create_course(&CourseInput {
                name: name.into(),
                duration: 8,
                teacher_id,
            })
            .unwrap()
    }

    fn seed_student(app: &App, last: &str, course_id: i64) -> i64 {
        app.store
            .create_student(&StudentInput {
                first_name: "Sam".into(),
                last_name: last.into(),
                email: format!("{}@example.org", last.to_lowercase()),
                course_id: Some(course_id),
            })
            .unwrap()
    }

    #[test]
    fn adding_a_teacher_through_the_form() {
        let (_dir, mut app) = test_app();
        press(&mut app, &[KeyCode::Char('+')]);
        type_text(&mut app, "  Ada ");
        press(&mut app, &[KeyCode::Tab]);
        type_text(&mut app, "Lovelace");
        press(&mut app, &[KeyCode::Tab]);
        type_text(&mut app, "Maths");
        press(&mut app, &[KeyCode::Enter]);

        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(app.teachers.items.len(), 1);
        assert_eq!(app.teachers.items[0].first_name, "Ada");
        assert_eq!(app.teacher_lookup.len(), 1);
        assert_eq!(status_text(&app), Some("Added teacher Ada Lovelace."));
    }

    #[test]
    fn invalid_form_stays_open_and_writes_nothing() {
        let (_dir, mut app) = test_app();
        press(&mut app, &[KeyCode::Char('+'), KeyCode::Enter]);

        match &app.mode {
            Mode::Teacher { id: None, form } => {
                assert_eq!(
                    form.error.as_deref(),
                    Some("Enter teacher first and last name.")
                );
            }
            _ => panic!("teacher form should still be open"),
        }
        assert_eq!(app.status.as_ref().map(|s| &s.kind), Some(&StatusKind::Error));
        assert!(app.store.list_teachers().unwrap().is_empty());
    }

    #[test]
    fn edit_and_delete_need_a_selection() {
        let (_dir, mut app) = test_app();
        press(&mut app, &[KeyCode::Char('e')]);
        assert_eq!(status_text(&app), Some("Select a teacher to update."));

        press(&mut app, &[KeyCode::Tab, KeyCode::Tab, KeyCode::Char('-')]);
        assert_eq!(app.tab, Tab::Students);
        assert_eq!(status_text(&app), Some("Select a student to delete."));
        assert!(matches!(app.mode, Mode::Normal));
    }

    #[test]
    fn deleting_a_teacher_reloads_courses() {
        let (_dir, mut app) = test_app();
        let teacher = seed_teacher(&app, "Grace");
        seed_course(&app, "Compilers", Some(teacher));
        press(&mut app, &[KeyCode::Char('r')]);
        assert_eq!(
            app.courses.items[0].teacher_name.as_deref(),
            Some("Grace Hopper")
        );

        press(&mut app, &[KeyCode::Char('d'), KeyCode::Char('n')]);
        assert_eq!(app.teachers.items.len(), 1);
        assert_eq!(status_text(&app), Some("Deletion cancelled."));

        press(&mut app, &[KeyCode::Char('d'), KeyCode::Char('y')]);
        assert!(app.teachers.items.is_empty());
        assert!(app.teacher_lookup.is_empty());
        assert_eq!(app.courses.items[0].teacher_id, None);
        assert_eq!(app.courses.items[0].teacher_name, None);
    }

    #[test]
    fn editing_a_course_updates_only_that_row() {
        let (_dir, mut app) = test_app();
        let teacher = seed_teacher(&app, "Grace");
        seed_course(&app, "Algebra", Some(teacher));
        seed_course(&app, "Botany", Some(teacher));
        press(&mut app, &[KeyCode::Char('r'), KeyCode::Tab, KeyCode::Down]);
        assert_eq!(app.courses.current().map(|c| c.name.as_str()), Some("Botany"));

        press(&mut app, &[KeyCode::Char('e'), KeyCode::Tab, KeyCode::Backspace]);
        type_text(&mut app, "12");
        press(&mut app, &[KeyCode::Enter]);

        assert!(matches!(app.mode, Mode::Normal));
        let durations: Vec<_> = app
            .courses
            .items
            .iter()
            .map(|c| (c.name.as_str(), c.duration))
            .collect();
        assert_eq!(durations, vec![("Algebra", 8), ("Botany", 12)]);
        assert_eq!(app.courses.current().map(|c| c.name.as_str()), Some("Botany"));
    }

    #[test]
    fn course_search_filters_while_typing() {
        let (_dir, mut app) = test_app();
        seed_course(&app, "Rust Basics", None);
        seed_course(&app, "Biology", None);
        press(&mut app, &[KeyCode::Char('r'), KeyCode::Tab, KeyCode::Char('f')]);
        type_text(&mut app, "RUST");
        assert!(matches!(app.mode, Mode::Searching(_)));
        assert_eq!(app.courses.items.len(), 1);
        assert_eq!(app.courses.items[0].name, "Rust Basics");

        press(&mut app, &[KeyCode::Enter]);
        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(app.courses.items.len(), 1);

        press(&mut app, &[KeyCode::Esc]);
        assert_eq!(app.courses.items.len(), 2);
        assert!(app.course_search.is_empty());
    }

    #[test]
    fn ctrl_e_edits_the_highlighted_search_result() {
        let (_dir, mut app) = test_app();
        let id = seed_course(&app, "Rust Basics", None);
        press(&mut app, &[KeyCode::Char('r'), KeyCode::Tab, KeyCode::Char('/')]);
        type_text(&mut app, "basics");
        app.handle_ctrl_e().unwrap();

        match &app.mode {
            Mode::Course { id: edited, form } => {
                assert_eq!(*edited, Some(id));
                assert_eq!(form.name, "Rust Basics");
            }
            _ => panic!("course form should be open"),
        }
    }

    #[test]
    fn ctrl_l_turns_an_edit_into_an_add() {
        let (_dir, mut app) = test_app();
        seed_teacher(&app, "Grace");
        press(&mut app, &[KeyCode::Char('r'), KeyCode::Char('e')]);
        assert!(matches!(app.mode, Mode::Teacher { id: Some(_), .. }));

        app.handle_ctrl_l().unwrap();
        match &app.mode {
            Mode::Teacher { id, form } => {
                assert_eq!(*id, None);
                assert!(form.first_name.is_empty());
            }
            _ => panic!("teacher form should still be open"),
        }

        type_text(&mut app, "Alan");
        press(&mut app, &[KeyCode::Tab]);
        type_text(&mut app, "Turing");
        press(&mut app, &[KeyCode::Tab]);
        type_text(&mut app, "Logic");
        press(&mut app, &[KeyCode::Enter]);
        assert_eq!(app.teachers.items.len(), 2);
    }

    #[test]
    fn attaching_and_deleting_a_material() {
        let (dir, mut app) = test_app();
        seed_course(&app, "Physics", None);
        let source = dir.path().join("lab-notes.txt");
        fs::write(&source, "pendulum").unwrap();

        press(
            &mut app,
            &[
                KeyCode::Char('r'),
                KeyCode::BackTab,
                KeyCode::Char('+'),
                KeyCode::Right,
                KeyCode::Tab,
            ],
        );
        assert_eq!(app.tab, Tab::Materials);
        type_text(&mut app, &source.display().to_string());
        press(&mut app, &[KeyCode::Enter]);

        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(status_text(&app), Some("Attached lab-notes.txt."));
        let material = app.materials.current().cloned().unwrap();
        assert_eq!(material.file_name, "lab-notes.txt");
        assert_eq!(material.course_name.as_deref(), Some("Physics"));
        let stored = app.library.resolve(&material.file_path);
        assert_eq!(fs::read_to_string(&stored).unwrap(), "pendulum");

        press(&mut app, &[KeyCode::Char('-'), KeyCode::Char('y')]);
        assert!(app.materials.items.is_empty());
        assert!(!stored.exists());
    }

    #[test]
    fn course_students_view_follows_the_selector() {
        let (_dir, mut app) = test_app();
        let algebra = seed_course(&app, "Algebra", None);
        let botany = seed_course(&app, "Botany", None);
        seed_student(&app, "Young", algebra);
        seed_student(&app, "Adams", algebra);
        seed_student(&app, "Brown", botany);

        press(&mut app, &[KeyCode::Char('v')]);
        let Screen::CourseStudents(screen) = &app.screen else {
            panic!("course students view should be open");
        };
        assert_eq!(screen.current_course().map(|c| c.id), Some(algebra));
        let names: Vec<_> = screen
            .students
            .items
            .iter()
            .map(|s| s.last_name.as_str())
            .collect();
        assert_eq!(names, vec!["Adams", "Young"]);

        press(&mut app, &[KeyCode::Right]);
        let Screen::CourseStudents(screen) = &app.screen else {
            panic!("course students view should be open");
        };
        assert_eq!(screen.students.items.len(), 1);
        assert_eq!(screen.students.items[0].course_name, "Botany");

        press(&mut app, &[KeyCode::Esc]);
        assert!(matches!(app.screen, Screen::Main));
    }

    #[test]
    fn startup_notice_is_shown_as_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(dir.path().join("portal.sqlite"));
        store.ensure_schema().unwrap();
        let app = App::new(
            Box::new(store),
            MaterialLibrary::new(dir.path()),
            Some("check the password".to_string()),
        );
        let status = app.status.as_ref().unwrap();
        assert_eq!(status.text, "check the password");
        assert_eq!(status.kind, StatusKind::Warning);
    }

    #[test]
    fn failed_reload_after_add_closes_the_form() {
        let (_dir, inner, fail_reads, mut app) = flaky_app();
        fail_reads.set(true);

        press(&mut app, &[KeyCode::Char('+')]);
        type_text(&mut app, "Ada");
        press(&mut app, &[KeyCode::Tab]);
        type_text(&mut app, "Lovelace");
        press(&mut app, &[KeyCode::Tab]);
        type_text(&mut app, "Maths");
        press(&mut app, &[KeyCode::Enter]);

        assert!(matches!(app.mode, Mode::Normal));
        let status = app.status.as_ref().unwrap();
        assert_eq!(status.kind, StatusKind::Error);
        assert_eq!(
            status.text,
            "Added teacher Ada Lovelace. Reload failed: connection reset"
        );

        press(&mut app, &[KeyCode::Enter]);
        assert_eq!(inner.list_teachers().unwrap().len(), 1);

        fail_reads.set(false);
        press(&mut app, &[KeyCode::Char('r')]);
        assert_eq!(app.teachers.items.len(), 1);
    }

    #[test]
    fn failed_reload_after_attach_copies_once() {
        let (dir, inner, fail_reads, mut app) = flaky_app();
        inner
            .create_course(&CourseInput {
                name: "Physics".into(),
                duration: 8,
                teacher_id: None,
            })
            .unwrap();
        let source = dir.path().join("lab-notes.txt");
        fs::write(&source, "pendulum").unwrap();
        press(&mut app, &[KeyCode::Char('r'), KeyCode::BackTab]);
        fail_reads.set(true);

        press(&mut app, &[KeyCode::Char('+'), KeyCode::Right, KeyCode::Tab]);
        type_text(&mut app, &source.display().to_string());
        press(&mut app, &[KeyCode::Enter]);
        assert!(matches!(app.mode, Mode::Normal));
        assert!(status_text(&app)
            .unwrap()
            .starts_with("Attached lab-notes.txt. Reload failed:"));

        press(&mut app, &[KeyCode::Enter]);
        assert_eq!(inner.list_materials().unwrap().len(), 1);
        let copies = fs::read_dir(app.library.materials_dir()).unwrap().count();
        assert_eq!(copies, 1);
    }
}
