use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Persisted status label attached to each permit record. The label is a
/// cached projection of the monitor's last decision; the authoritative state
/// is always derived from the calendar window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermitStatus {
    #[default]
    Active,
    Expired,
}

impl PermitStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Expired => "expired",
        }
    }
}

/// Wire representation of a scaffold-erection permit as held by the permit
/// collection. Dates stay raw strings at this layer; the store accepts ISO
/// dates with or without a time-of-day portion and a trailing `Z`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permit {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub area: String,
    pub sub_area: String,
    pub start_date: String,
    pub estimated_end_date: String,
    pub leader_name: String,
    pub executor_name: String,
    pub leader_phone: String,
    pub executor_phone: String,
    #[serde(default)]
    pub status: PermitStatus,
}

impl Permit {
    /// Parse both date fields into a calendar window, dropping time-of-day.
    pub fn window(&self) -> Result<PermitWindow, DateFieldError> {
        PermitWindow::parse(&self.start_date, &self.estimated_end_date)
    }
}

/// Creation payload: a permit before the store has assigned an id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermitDraft {
    pub area: String,
    pub sub_area: String,
    pub start_date: String,
    pub estimated_end_date: String,
    pub leader_name: String,
    pub executor_name: String,
    pub leader_phone: String,
    pub executor_phone: String,
    #[serde(default)]
    pub status: PermitStatus,
}

impl PermitDraft {
    /// Check the creation invariant: both dates parse and the start day does
    /// not fall after the estimated end day. Held at creation only; existing
    /// records are never re-validated.
    pub fn validate(&self) -> Result<PermitWindow, PermitDraftError> {
        let window = PermitWindow::parse(&self.start_date, &self.estimated_end_date)?;
        if window.start > window.end {
            return Err(PermitDraftError::WindowOrder {
                start: window.start,
                end: window.end,
            });
        }
        Ok(window)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PermitDraftError {
    #[error(transparent)]
    Date(#[from] DateFieldError),
    #[error("startDate {start} falls after estimatedEndDate {end}")]
    WindowOrder { start: NaiveDate, end: NaiveDate },
}

/// Validity window of a permit, normalized to calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermitWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl PermitWindow {
    pub fn parse(start_raw: &str, end_raw: &str) -> Result<Self, DateFieldError> {
        Ok(Self {
            start: parse_wire_date(start_raw)?,
            end: parse_wire_date(end_raw)?,
        })
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("unparsable calendar date '{raw}'")]
pub struct DateFieldError {
    pub raw: String,
}

/// Accepts the date shapes seen on the wire: full RFC 3339 timestamps,
/// naive date-times, and plain dates. Time-of-day is discarded so that
/// repeated evaluation within one calendar day is deterministic.
pub fn parse_wire_date(raw: &str) -> Result<NaiveDate, DateFieldError> {
    let trimmed = raw.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(timestamp.date_naive());
    }

    let naive = trimmed.strip_suffix('Z').unwrap_or(trimmed);
    if let Ok(timestamp) = NaiveDateTime::parse_from_str(naive, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(timestamp.date());
    }

    NaiveDate::parse_from_str(naive, "%Y-%m-%d").map_err(|_| DateFieldError {
        raw: raw.to_string(),
    })
}

/// Inclusive days of validity remaining: both the reference day and the end
/// day count, so a permit ending today has one day left and a permit whose
/// end day was yesterday has zero.
pub fn days_left(end: NaiveDate, today: NaiveDate) -> i64 {
    (end - today).num_days() + 1
}

/// Lifecycle classification of a permit relative to a reference day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleClass {
    NotStarted,
    ActiveNormal,
    ExpiringSoon,
    ExpiredToday,
    ExpiredGrace,
    ExpiredPurge,
}

impl LifecycleClass {
    pub const fn label(self) -> &'static str {
        match self {
            Self::NotStarted => "not started",
            Self::ActiveNormal => "active",
            Self::ExpiringSoon => "expiring soon",
            Self::ExpiredToday => "expired today",
            Self::ExpiredGrace => "expired, in grace period",
            Self::ExpiredPurge => "expired past grace period",
        }
    }

    /// Side effect the monitor owes this classification.
    pub const fn action(self) -> LifecycleAction {
        match self {
            Self::NotStarted | Self::ActiveNormal => LifecycleAction::None,
            Self::ExpiringSoon => LifecycleAction::Notify { urgent: false },
            Self::ExpiredToday => LifecycleAction::Notify { urgent: true },
            Self::ExpiredGrace => LifecycleAction::MarkExpired,
            Self::ExpiredPurge => LifecycleAction::Purge,
        }
    }
}

/// Effect requested by the evaluator, applied by the monitor loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    None,
    Notify { urgent: bool },
    MarkExpired,
    Purge,
}

/// Pure lifecycle evaluator. The start day itself counts as started, and day
/// counting is inclusive on both window boundaries; the same rule backs every
/// branch.
pub fn classify(window: PermitWindow, today: NaiveDate) -> LifecycleClass {
    if window.start > today {
        return LifecycleClass::NotStarted;
    }

    let left = days_left(window.end, today);
    if left > 3 {
        LifecycleClass::ActiveNormal
    } else if left > 0 {
        LifecycleClass::ExpiringSoon
    } else if left == 0 {
        LifecycleClass::ExpiredToday
    } else if left > -3 {
        LifecycleClass::ExpiredGrace
    } else {
        LifecycleClass::ExpiredPurge
    }
}
