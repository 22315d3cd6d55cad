//! Wall clock used for trigger times and lesson windows.

use chrono::{FixedOffset, Local, NaiveDateTime, Utc};

use unibell_core::config::NotifyConfig;
use unibell_core::error::{Result, UnibellError};

/// Local wall-clock time, either the system zone or a fixed UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WallClock {
    offset: Option<FixedOffset>,
}

impl WallClock {
    pub fn system() -> Self {
        Self { offset: None }
    }

    pub fn fixed(utc_offset_minutes: i32) -> Result<Self> {
        let offset = FixedOffset::east_opt(utc_offset_minutes * 60).ok_or_else(|| {
            UnibellError::Config(format!("utc_offset_minutes {utc_offset_minutes} is out of range"))
        })?;
        Ok(Self { offset: Some(offset) })
    }

    pub fn from_config(config: &NotifyConfig) -> Result<Self> {
        match config.utc_offset_minutes {
            Some(minutes) => Self::fixed(minutes),
            None => Ok(Self::system()),
        }
    }

    pub fn now(&self) -> NaiveDateTime {
        match self.offset {
            Some(offset) => Utc::now().with_timezone(&offset).naive_local(),
            None => Local::now().naive_local(),
        }
    }
}
