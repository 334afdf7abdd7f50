use anyhow::Error;
use chrono::NaiveDateTime;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use crate::materials::MaterialError;

/// Produce a rectangle centered within `area` that spans the requested percent
/// of the width and height. Used for modal dialogs.
pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(area);

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(horizontal[1]);

    vertical[1]
}

/// Extract the most relevant error message from a chained error. Material
/// errors already name the action and file, so they are shown whole.
pub(crate) fn surface_error(err: &Error) -> String {
    if let Some(material) = err.downcast_ref::<MaterialError>() {
        return material.to_string();
    }
    err.chain()
        .last()
        .map(|cause| cause.to_string())
        .unwrap_or_else(|| err.to_string())
}

/// Footer line of `[key] Action` pairs.
pub(crate) fn key_hints(hints: &[(&str, &str)]) -> Line<'static> {
    let key_style = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);
    let mut spans = Vec::with_capacity(hints.len() * 2);
    for (idx, (key, action)) in hints.iter().enumerate() {
        spans.push(Span::styled(format!("[{key}]"), key_style));
        if idx + 1 == hints.len() {
            spans.push(Span::raw(format!(" {action}")));
        } else {
            spans.push(Span::raw(format!(" {action}   ")));
        }
    }
    Line::from(spans)
}

pub(crate) fn format_uploaded(at: &NaiveDateTime) -> String {
    at.format("%Y-%m-%d %H:%M").to_string()
}

/// Display placeholder for a nulled reference.
pub(crate) fn or_unassigned(value: Option<&str>) -> String {
    value.unwrap_or("(unassigned)").to_string()
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::path::PathBuf;

    use super::*;
    use anyhow::{anyhow, Context};

    #[test]
    fn surface_error_reports_root_cause() {
        let err = Err::<(), _>(anyhow!("Teacher not found"))
            .context("failed to update teacher")
            .unwrap_err();
        assert_eq!(surface_error(&err), "Teacher not found");
    }

    #[test]
    fn surface_error_keeps_material_action_and_path() {
        let err = Err::<(), _>(MaterialError::Io {
            action: "failed to copy into",
            path: PathBuf::from("/srv/portal/Materials"),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        })
        .context("failed to attach material")
        .unwrap_err();

        let message = surface_error(&err);
        assert!(message.starts_with("failed to copy into /srv/portal/Materials: "));
        assert_ne!(message, io::Error::from(io::ErrorKind::PermissionDenied).to_string());
    }

    #[test]
    fn surface_error_shows_plain_material_messages() {
        let err = anyhow::Error::from(MaterialError::SourceMissing);
        assert_eq!(surface_error(&err), "Choose a file to attach.");
    }

    #[test]
    fn key_hints_alternate_keys_and_actions() {
        let line = key_hints(&[("q", "Quit"), ("+", "Add")]);
        let text: Vec<_> = line.spans.iter().map(|s| s.content.to_string()).collect();
        assert_eq!(text, vec!["[q]", " Quit   ", "[+]", " Add"]);
    }

    #[test]
    fn centered_rect_stays_inside_area() {
        let area = Rect::new(0, 0, 100, 40);
        let popup = centered_rect(60, 50, area);
        assert_eq!(popup.width, 60);
        assert_eq!(popup.height, 20);
        assert_eq!(popup.x, 20);
        assert_eq!(popup.y, 10);
    }
}
