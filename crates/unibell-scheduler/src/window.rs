//! Lesson-window classification: where "now" sits relative to a day's lessons.

use chrono::{Duration, NaiveDateTime};

use unibell_core::types::{CallSlot, Lesson, ScheduleDay};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowStatus {
    BeforeFirstCall,
    BeforeNextCall,
    DuringCall,
}

/// Classification result plus the instant that ends the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationWindow {
    pub status: WindowStatus,
    pub boundary: NaiveDateTime,
}

/// Classifies a day against the bell schedule.
#[derive(Debug, Clone)]
pub struct WindowClassifier {
    /// Sorted by call number.
    slots: Vec<CallSlot>,
    hidden_marker: String,
}

impl WindowClassifier {
    pub fn new(slots: &[CallSlot], hidden_marker: impl Into<String>) -> Self {
        let mut slots = slots.to_vec();
        slots.sort_by_key(|s| s.number);
        Self {
            slots,
            hidden_marker: hidden_marker.into(),
        }
    }

    pub fn slot(&self, number: u32) -> Option<&CallSlot> {
        self.slots.iter().find(|s| s.number == number)
    }

    /// The call ordered immediately before `number`.
    fn previous_slot(&self, number: u32) -> Option<&CallSlot> {
        let idx = self.slots.iter().position(|s| s.number == number)?;
        idx.checked_sub(1).map(|i| &self.slots[i])
    }

    /// Placeholder lessons carry the marker in their primary period's name.
    pub fn is_hidden(&self, lesson: &Lesson) -> bool {
        if self.hidden_marker.is_empty() {
            return false;
        }
        lesson.primary_period().is_some_and(|p| {
            p.discipline_name.contains(&self.hidden_marker)
                || p.discipline_full_name.contains(&self.hidden_marker)
        })
    }

    /// Where `now` sits within the day's lessons. `None` when there is
    /// nothing to notify about: no lessons, a hidden first lesson, an unknown
    /// call number, or the day is over.
    pub fn classify(&self, day: &ScheduleDay, now: NaiveDateTime) -> Option<NotificationWindow> {
        let first = day.lessons.first()?;
        if self.is_hidden(first) {
            return None;
        }

        let first_start = self.slot(first.number)?.start_on(day.date);
        if now < first_start {
            return Some(NotificationWindow {
                status: WindowStatus::BeforeFirstCall,
                boundary: first_start,
            });
        }

        let last = day.lessons.last()?;
        if now > self.slot(last.number)?.end_on(day.date) {
            return None;
        }

        for lesson in &day.lessons {
            let Some(slot) = self.slot(lesson.number) else {
                continue;
            };
            let start = slot.start_on(day.date);
            let end = slot.end_on(day.date);
            if start < now && now < end {
                return Some(NotificationWindow {
                    status: WindowStatus::DuringCall,
                    boundary: end,
                });
            }
            if now < start {
                return Some(NotificationWindow {
                    status: WindowStatus::BeforeNextCall,
                    boundary: start,
                });
            }
        }
        None
    }

    /// Whether the day's first class is about to start.
    ///
    /// True for `now` in `[end of the preceding call, end of the first
    /// lesson's call]`. Without a preceding call the lower bound is one
    /// minute before `now`, so the check only ever looks one minute back.
    pub fn is_class_imminent(&self, day: &ScheduleDay, now: NaiveDateTime) -> bool {
        let Some(first) = day.lessons.first() else {
            return false;
        };
        if self.is_hidden(first) {
            return false;
        }
        let Some(slot) = self.slot(first.number) else {
            return false;
        };

        let upper = slot.end_on(day.date);
        let lower = match self.previous_slot(first.number) {
            Some(prev) => prev.end_on(day.date),
            None => now - Duration::minutes(1),
        };
        lower <= now && now <= upper
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime, Utc};
    use unibell_core::types::Period;

    fn hms(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        date().and_time(hms(h, m, s))
    }

    fn slot(number: u32, start: NaiveTime, end: NaiveTime) -> CallSlot {
        CallSlot {
            number,
            time_start: start,
            time_end: end,
        }
    }

    fn lesson(number: u32, name: &str) -> Lesson {
        Lesson {
            number,
            periods: vec![Period {
                discipline_name: name.into(),
                discipline_full_name: name.into(),
                time_start: String::new(),
                time_end: String::new(),
                teachers_name: vec![],
                classroom: None,
                type_name: None,
                has_extra_text: false,
            }],
        }
    }

    fn day(lessons: Vec<Lesson>) -> ScheduleDay {
        ScheduleDay {
            group_id: 1,
            date: date(),
            lessons,
            updated_at: Utc::now(),
        }
    }

    fn two_calls() -> WindowClassifier {
        WindowClassifier::new(
            &[
                slot(2, hms(10, 0, 0), hms(11, 20, 0)),
                slot(1, hms(8, 30, 0), hms(9, 50, 0)),
            ],
            "[hidden]",
        )
    }

    #[test]
    fn test_during_first_call() {
        let w = two_calls()
            .classify(&day(vec![lesson(1, "Math"), lesson(2, "Phys")]), at(8, 40, 0))
            .unwrap();
        assert_eq!(w.status, WindowStatus::DuringCall);
        assert_eq!(w.boundary, at(9, 50, 0));
    }

    #[test]
    fn test_before_first_call() {
        let w = two_calls()
            .classify(&day(vec![lesson(1, "Math"), lesson(2, "Phys")]), at(8, 15, 0))
            .unwrap();
        assert_eq!(w.status, WindowStatus::BeforeFirstCall);
        assert_eq!(w.boundary, at(8, 30, 0));
    }

    #[test]
    fn test_before_next_call_in_break() {
        let w = two_calls()
            .classify(&day(vec![lesson(1, "Math"), lesson(2, "Phys")]), at(9, 55, 0))
            .unwrap();
        assert_eq!(w.status, WindowStatus::BeforeNextCall);
        assert_eq!(w.boundary, at(10, 0, 0));
    }

    #[test]
    fn test_after_last_call_is_none() {
        // Only lesson 1 today, 09:55 is past its end
        let w = two_calls().classify(&day(vec![lesson(1, "Math")]), at(9, 55, 0));
        assert_eq!(w, None);
    }

    #[test]
    fn test_no_lessons_is_none() {
        assert_eq!(two_calls().classify(&day(vec![]), at(8, 0, 0)), None);
        assert!(!two_calls().is_class_imminent(&day(vec![]), at(8, 0, 0)));
    }

    #[test]
    fn test_hidden_first_lesson_is_none() {
        let d = day(vec![lesson(1, "[hidden] reserved"), lesson(2, "Phys")]);
        assert_eq!(two_calls().classify(&d, at(8, 15, 0)), None);
        assert!(!two_calls().is_class_imminent(&d, at(9, 55, 0)));
    }

    #[test]
    fn test_hidden_second_subgroup_does_not_hide_lesson() {
        let mut first = lesson(1, "Math");
        first.periods.extend(lesson(1, "[hidden] subgroup 2").periods);
        let d = day(vec![first, lesson(2, "Phys")]);

        let w = two_calls().classify(&d, at(8, 15, 0)).unwrap();
        assert_eq!(w.status, WindowStatus::BeforeFirstCall);
        assert_eq!(w.boundary, at(8, 30, 0));
        assert!(two_calls().is_class_imminent(&d, at(8, 15, 0)));
    }

    #[test]
    fn test_unknown_call_number_is_none() {
        assert_eq!(two_calls().classify(&day(vec![lesson(7, "Art")]), at(8, 0, 0)), None);
        assert!(!two_calls().is_class_imminent(&day(vec![lesson(7, "Art")]), at(8, 0, 0)));
    }

    #[test]
    fn test_imminent_after_preceding_call() {
        let classifier = WindowClassifier::new(
            &[
                slot(1, hms(7, 0, 0), hms(8, 29, 0)),
                slot(2, hms(8, 30, 0), hms(9, 50, 0)),
            ],
            "[hidden]",
        );
        let d = day(vec![lesson(2, "Math")]);
        assert!(classifier.is_class_imminent(&d, at(8, 29, 30)));
        assert!(classifier.is_class_imminent(&d, at(8, 29, 0)));
        assert!(!classifier.is_class_imminent(&d, at(8, 28, 0)));
        assert!(!classifier.is_class_imminent(&d, at(9, 50, 1)));
    }

    #[test]
    fn test_imminent_without_preceding_call() {
        // Lower bound is now − 1m, so any time up to the end of the call passes
        let d = day(vec![lesson(1, "Math")]);
        let classifier = two_calls();
        assert!(classifier.is_class_imminent(&d, at(8, 15, 0)));
        assert!(classifier.is_class_imminent(&d, at(9, 50, 0)));
        assert!(!classifier.is_class_imminent(&d, at(9, 50, 1)));
    }

    #[test]
    fn test_empty_marker_hides_nothing() {
        let classifier = WindowClassifier::new(&[slot(1, hms(8, 30, 0), hms(9, 50, 0))], "");
        assert!(!classifier.is_hidden(&lesson(1, "")));
    }
}
