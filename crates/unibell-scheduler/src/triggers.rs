//! Trigger-time derivation from the bell schedule.
//! Each offset fires daily at `call start − offset`, once per distinct time.

use chrono::{Duration, NaiveDateTime, NaiveTime};
use std::collections::{BTreeMap, BTreeSet};

use unibell_core::error::{Result, UnibellError};
use unibell_core::types::{CallSlot, NotifyOffset};

/// Daily wall-clock trigger times per offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerPlan {
    times: BTreeMap<NotifyOffset, Vec<NaiveTime>>,
}

/// A concrete firing instant and the offsets due at it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub at: NaiveDateTime,
    pub offsets: Vec<NotifyOffset>,
}

/// Derive trigger times for every offset. An empty bell schedule is a
/// configuration error: there is nothing to notify about.
pub fn derive_trigger_times(slots: &[CallSlot], offsets: &[NotifyOffset]) -> Result<TriggerPlan> {
    if slots.is_empty() {
        return Err(UnibellError::Config(
            "bell schedule is empty, cannot derive notification times".into(),
        ));
    }
    if offsets.is_empty() {
        return Err(UnibellError::Config("no notification offsets configured".into()));
    }

    let times = offsets
        .iter()
        .map(|offset| {
            let lead = Duration::minutes(offset.minutes());
            let unique: BTreeSet<NaiveTime> = slots
                .iter()
                .map(|slot| slot.time_start.overflowing_sub_signed(lead).0)
                .collect();
            (*offset, unique.into_iter().collect())
        })
        .collect();

    Ok(TriggerPlan { times })
}

impl TriggerPlan {
    pub fn times(&self, offset: NotifyOffset) -> &[NaiveTime] {
        self.times.get(&offset).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn offsets(&self) -> impl Iterator<Item = NotifyOffset> + '_ {
        self.times.keys().copied()
    }

    /// Earliest trigger strictly after `after`, with every offset due at it.
    pub fn next_after(&self, after: NaiveDateTime) -> Option<Trigger> {
        let mut best: Option<Trigger> = None;
        for (offset, times) in &self.times {
            let Some(at) = next_occurrence(times, after) else {
                continue;
            };
            match &mut best {
                Some(trigger) if trigger.at == at => trigger.offsets.push(*offset),
                Some(trigger) if trigger.at < at => {}
                _ => {
                    best = Some(Trigger {
                        at,
                        offsets: vec![*offset],
                    })
                }
            }
        }
        best
    }

    /// One line per offset, for startup logs.
    pub fn describe(&self) -> String {
        self.times
            .iter()
            .map(|(offset, times)| {
                let list: Vec<String> = times.iter().map(|t| t.format("%H:%M").to_string()).collect();
                format!("{offset}: {}", list.join(", "))
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Next daily occurrence of any of `times` strictly after `after`.
fn next_occurrence(times: &[NaiveTime], after: NaiveDateTime) -> Option<NaiveDateTime> {
    let today = after.date();
    let tomorrow = today.succ_opt()?;
    times
        .iter()
        .map(|t| today.and_time(*t))
        .find(|candidate| *candidate > after)
        .or_else(|| times.first().map(|t| tomorrow.and_time(*t)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn slot(number: u32, start: NaiveTime, end: NaiveTime) -> CallSlot {
        CallSlot {
            number,
            time_start: start,
            time_end: end,
        }
    }

    fn bells() -> Vec<CallSlot> {
        vec![
            slot(1, hm(8, 30), hm(9, 50)),
            slot(2, hm(10, 0), hm(11, 20)),
            slot(3, hm(11, 35), hm(12, 55)),
        ]
    }

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap().and_time(hm(h, m))
    }

    #[test]
    fn test_derive_times() {
        let plan = derive_trigger_times(&bells(), &NotifyOffset::ALL).unwrap();
        assert_eq!(
            plan.times(NotifyOffset::FifteenMinutes),
            &[hm(8, 15), hm(9, 45), hm(11, 20)]
        );
        assert_eq!(
            plan.times(NotifyOffset::OneMinute),
            &[hm(8, 29), hm(9, 59), hm(11, 34)]
        );
    }

    #[test]
    fn test_duplicate_slots_collapse() {
        let mut slots = bells();
        slots.push(slot(4, hm(10, 0), hm(11, 20)));
        let plan = derive_trigger_times(&slots, &[NotifyOffset::OneMinute]).unwrap();
        assert_eq!(plan.times(NotifyOffset::OneMinute).len(), 3);
        assert!(plan.times(NotifyOffset::FifteenMinutes).is_empty());
    }

    #[test]
    fn test_empty_bell_schedule_is_config_error() {
        let err = derive_trigger_times(&[], &NotifyOffset::ALL).unwrap_err();
        assert!(matches!(err, UnibellError::Config(_)));
    }

    #[test]
    fn test_next_after_same_day_and_rollover() {
        let plan = derive_trigger_times(&bells(), &NotifyOffset::ALL).unwrap();

        let next = plan.next_after(at(2, 8, 0)).unwrap();
        assert_eq!(next.at, at(2, 8, 15));
        assert_eq!(next.offsets, vec![NotifyOffset::FifteenMinutes]);

        // Strictly after: firing at 08:15 moves on to 08:29
        let next = plan.next_after(at(2, 8, 15)).unwrap();
        assert_eq!(next.at, at(2, 8, 29));
        assert_eq!(next.offsets, vec![NotifyOffset::OneMinute]);

        let next = plan.next_after(at(2, 18, 0)).unwrap();
        assert_eq!(next.at, at(3, 8, 15));
    }

    #[test]
    fn test_coinciding_offsets_fire_together() {
        // 09:59 is both slot 1 − 1m and slot 2 − 15m
        let slots = vec![slot(1, hm(10, 0), hm(11, 0)), slot(2, hm(10, 14), hm(11, 30))];
        let plan = derive_trigger_times(&slots, &NotifyOffset::ALL).unwrap();
        let next = plan.next_after(at(2, 9, 50)).unwrap();
        assert_eq!(next.at, at(2, 9, 59));
        assert_eq!(
            next.offsets,
            vec![NotifyOffset::FifteenMinutes, NotifyOffset::OneMinute]
        );
    }

    #[test]
    fn test_describe() {
        let plan = derive_trigger_times(&bells()[..1], &[NotifyOffset::FifteenMinutes]).unwrap();
        assert_eq!(plan.describe(), "15m: 08:15");
    }
}
