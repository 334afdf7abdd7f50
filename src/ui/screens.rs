use anyhow::Result;
use crossterm::event::KeyCode;

use crate::db::PortalStore;
use crate::models::{CourseStudent, Lookup};

/// The four grids of the main view.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Tab {
    Teachers,
    Courses,
    Students,
    Materials,
}

impl Tab {
    pub(crate) const ALL: [Tab; 4] = [Tab::Teachers, Tab::Courses, Tab::Students, Tab::Materials];

    pub(crate) fn title(self) -> &'static str {
        match self {
            Tab::Teachers => "Teachers",
            Tab::Courses => "Courses",
            Tab::Students => "Students",
            Tab::Materials => "Materials",
        }
    }

    /// Singular, lower-case name used in status messages.
    pub(crate) fn noun(self) -> &'static str {
        match self {
            Tab::Teachers => "teacher",
            Tab::Courses => "course",
            Tab::Students => "student",
            Tab::Materials => "material",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Tab::Teachers => 0,
            Tab::Courses => 1,
            Tab::Students => 2,
            Tab::Materials => 3,
        }
    }

    pub(crate) fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub(crate) fn previous(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// Rows skipped by PgUp/PgDn.
const PAGE_SIZE: isize = 10;

/// Rows bound to one grid plus the highlighted row.
pub(crate) struct EntityList<T> {
    pub(crate) items: Vec<T>,
    pub(crate) selected: usize,
}

impl<T> Default for EntityList<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            selected: 0,
        }
    }
}

impl<T> EntityList<T> {
    /// Rebind the grid. The selection stays on the same index where possible.
    pub(crate) fn set_items(&mut self, items: Vec<T>) {
        self.items = items;
        self.ensure_in_bounds();
    }

    pub(crate) fn current(&self) -> Option<&T> {
        self.items.get(self.selected)
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        if self.items.is_empty() {
            return;
        }
        let len = self.items.len() as isize;
        let mut new = self.selected as isize + offset;
        if new < 0 {
            new = 0;
        }
        if new >= len {
            new = len - 1;
        }
        self.selected = new as usize;
    }

    pub(crate) fn select_first(&mut self) {
        self.selected = 0;
    }

    pub(crate) fn select_last(&mut self) {
        self.selected = self.items.len().saturating_sub(1);
    }

    /// Move the highlight onto the first row matching `predicate`, if any.
    pub(crate) fn select_where(&mut self, predicate: impl Fn(&T) -> bool) {
        if let Some(idx) = self.items.iter().position(predicate) {
            self.selected = idx;
        }
    }

    /// Apply a navigation key. Returns `false` for keys that do not move the
    /// highlight so the caller can handle them.
    pub(crate) fn handle_navigation(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Up => self.move_selection(-1),
            KeyCode::Down => self.move_selection(1),
            KeyCode::PageUp => self.move_selection(-PAGE_SIZE),
            KeyCode::PageDown => self.move_selection(PAGE_SIZE),
            KeyCode::Home => self.select_first(),
            KeyCode::End => self.select_last(),
            _ => return false,
        }
        true
    }

    fn ensure_in_bounds(&mut self) {
        if self.items.is_empty() {
            self.selected = 0;
        } else if self.selected >= self.items.len() {
            self.selected = self.items.len() - 1;
        }
    }
}

/// Read-only list of the students enrolled in one course, with a course
/// selector that defaults to the first course.
pub(crate) struct CourseStudentsScreen {
    pub(crate) courses: Vec<Lookup>,
    pub(crate) course_index: usize,
    pub(crate) students: EntityList<CourseStudent>,
}

impl CourseStudentsScreen {
    pub(crate) fn load(store: &dyn PortalStore) -> Result<Self> {
        let mut screen = Self {
            courses: store.course_lookup()?,
            course_index: 0,
            students: EntityList::default(),
        };
        screen.reload_students(store)?;
        Ok(screen)
    }

    pub(crate) fn current_course(&self) -> Option<&Lookup> {
        self.courses.get(self.course_index)
    }

    /// Step the course selector and re-query its students. Returns `false`
    /// when there is nothing to switch to.
    pub(crate) fn cycle_course(&mut self, store: &dyn PortalStore, offset: isize) -> Result<bool> {
        if self.courses.len() < 2 {
            return Ok(false);
        }
        let len = self.courses.len() as isize;
        self.course_index = (self.course_index as isize + offset).rem_euclid(len) as usize;
        self.students.select_first();
        self.reload_students(store)?;
        Ok(true)
    }

    /// Reload the course selector and the grid, staying on the same course
    /// when it still exists.
    pub(crate) fn refresh(&mut self, store: &dyn PortalStore) -> Result<()> {
        let current = self.current_course().map(|course| course.id);
        self.courses = store.course_lookup()?;
        self.course_index = current
            .and_then(|id| self.courses.iter().position(|course| course.id == id))
            .unwrap_or(0);
        self.reload_students(store)
    }

    fn reload_students(&mut self, store: &dyn PortalStore) -> Result<()> {
        let students = match self.current_course() {
            Some(course) => store.students_for_course(course.id)?,
            None => Vec::new(),
        };
        self.students.set_items(students);
        Ok(())
    }
}
