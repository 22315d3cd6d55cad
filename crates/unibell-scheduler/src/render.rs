//! Notification text built from per-language templates.

use unibell_core::config::LanguageTemplates;
use unibell_core::types::{NotifyOffset, ScheduleDay};

use crate::window::WindowClassifier;

/// Render the reminder for the day's first lesson. One line per period, so
/// split subgroups each see their own discipline and teachers.
pub fn render_notification(
    templates: &LanguageTemplates,
    offset: NotifyOffset,
    day: &ScheduleDay,
    classifier: &WindowClassifier,
) -> String {
    let mut lines = vec![templates
        .header
        .replace("{minutes}", &offset.minutes().to_string())];

    if let Some(lesson) = day.lessons.first() {
        let slot = classifier.slot(lesson.number);
        for period in &lesson.periods {
            let (start, end) = match slot {
                Some(slot) => (
                    slot.time_start.format("%H:%M").to_string(),
                    slot.time_end.format("%H:%M").to_string(),
                ),
                None => (period.time_start.clone(), period.time_end.clone()),
            };
            let line = templates
                .lesson_line
                .replace("{number}", &lesson.number.to_string())
                .replace("{start}", &start)
                .replace("{end}", &end)
                .replace("{discipline}", period.display_name())
                .replace("{teachers}", &period.teachers_name.join(&templates.teacher_separator));
            lines.push(line);
        }
    }

    if !templates.footer.is_empty() {
        lines.push(templates.footer.clone());
    }
    lines.join("\n")
}
