//! Policy rule types: authoritative rules and their offline projections.

use crate::error::{CoreError, CoreResult};
use crate::types::{ControlPointId, HolderId, RoleId};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A wall-clock time window with inclusive bounds.
///
/// A window whose `end` is earlier than its `start` crosses midnight and
/// is active when `now >= start` **or** `now <= end`. A window with
/// `start == end` covers that single instant.
///
/// # Examples
///
/// ```
/// use tapgate_core::TimeWindow;
/// use chrono::NaiveTime;
///
/// let night = TimeWindow::from_hms(22, 0, 2, 0).unwrap();
/// assert!(night.contains(NaiveTime::from_hms_opt(23, 30, 0).unwrap()));
/// assert!(night.contains(NaiveTime::from_hms_opt(1, 0, 0).unwrap()));
/// assert!(!night.contains(NaiveTime::from_hms_opt(12, 0, 0).unwrap()));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// First instant of the window (inclusive).
    pub start: NaiveTime,
    /// Last instant of the window (inclusive).
    pub end: NaiveTime,
}

impl TimeWindow {
    /// Creates a window from two wall-clock times.
    #[must_use]
    pub const fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Creates a window from hour/minute pairs.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTimeOfDay`] if either pair is out of
    /// range.
    pub fn from_hms(
        start_hour: u32,
        start_minute: u32,
        end_hour: u32,
        end_minute: u32,
    ) -> CoreResult<Self> {
        let start = NaiveTime::from_hms_opt(start_hour, start_minute, 0).ok_or(
            CoreError::InvalidTimeOfDay {
                hour: start_hour,
                minute: start_minute,
            },
        )?;
        let end =
            NaiveTime::from_hms_opt(end_hour, end_minute, 0).ok_or(CoreError::InvalidTimeOfDay {
                hour: end_hour,
                minute: end_minute,
            })?;
        Ok(Self { start, end })
    }

    /// Returns true if this window crosses midnight.
    #[must_use]
    pub fn crosses_midnight(&self) -> bool {
        self.end < self.start
    }

    /// Returns true if `time` falls inside the window.
    #[must_use]
    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.crosses_midnight() {
            time >= self.start || time <= self.end
        } else {
            time >= self.start && time <= self.end
        }
    }
}

/// A calendar validity window with inclusive bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    /// First day of validity (inclusive).
    pub start: NaiveDate,
    /// Last day of validity (inclusive).
    pub end: NaiveDate,
}

impl DateWindow {
    /// Creates a window from two dates.
    #[must_use]
    pub const fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Returns true if `date` falls inside the window.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// An authoritative access rule for one control point.
///
/// Rules are created and updated by the administrative collaborator;
/// this crate only reads them. Absent windows mean "unconstrained":
/// no time window grants at any time of day, no date window grants on
/// any date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRule {
    /// The control point this rule applies to.
    pub control_point: ControlPointId,
    /// Roles that may pass under this rule.
    pub roles: BTreeSet<RoleId>,
    /// Optional wall-clock restriction.
    pub time_window: Option<TimeWindow>,
    /// Optional calendar restriction.
    pub date_window: Option<DateWindow>,
}

impl AccessRule {
    /// Creates an unconstrained rule for a control point with no roles.
    ///
    /// A rule with an empty role set never matches; add roles with
    /// [`AccessRule::with_role`].
    #[must_use]
    pub fn new(control_point: ControlPointId) -> Self {
        Self {
            control_point,
            roles: BTreeSet::new(),
            time_window: None,
            date_window: None,
        }
    }

    /// Adds a role to the rule.
    #[must_use]
    pub fn with_role(mut self, role: RoleId) -> Self {
        self.roles.insert(role);
        self
    }

    /// Restricts the rule to a wall-clock window.
    #[must_use]
    pub fn with_time_window(mut self, window: TimeWindow) -> Self {
        self.time_window = Some(window);
        self
    }

    /// Restricts the rule to a calendar window.
    #[must_use]
    pub fn with_date_window(mut self, window: DateWindow) -> Self {
        self.date_window = Some(window);
        self
    }

    /// Returns true if the rule fully matches: the role sets intersect,
    /// the date window (if any) contains `now`'s date, and the time
    /// window (if any) contains `now`'s time.
    #[must_use]
    pub fn matches(&self, holder_roles: &BTreeSet<RoleId>, now: NaiveDateTime) -> bool {
        if self.roles.is_disjoint(holder_roles) {
            return false;
        }
        if let Some(window) = &self.date_window {
            if !window.contains(now.date()) {
                return false;
            }
        }
        if let Some(window) = &self.time_window {
            if !window.contains(now.time()) {
                return false;
            }
        }
        true
    }
}

/// Day-of-week numbering used by [`CachedRule::allowed_days`]:
/// 0 = Sunday through 6 = Saturday.
pub(crate) fn day_number(now: NaiveDateTime) -> u8 {
    now.weekday().num_days_from_sunday() as u8
}

/// The offline projection of the rules granting a holder passage
/// through a control point.
///
/// Cached rules are produced by the authority during sync and
/// bulk-replaced wholesale; they are never edited locally. The role
/// intersection has already been applied by the authority, which is why
/// a cached rule carries a holder rather than a role set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedRule {
    /// The holder this projection was computed for.
    pub holder: HolderId,
    /// The control point the rule applies to.
    pub control_point: ControlPointId,
    /// Days of week the rule is active, 0 = Sunday … 6 = Saturday.
    pub allowed_days: BTreeSet<u8>,
    /// First instant of the daily window (inclusive).
    pub start: NaiveTime,
    /// Last instant of the daily window (inclusive).
    pub end: NaiveTime,
    /// When this projection was last pulled from the authority.
    pub last_synced_at: DateTime<Utc>,
}

impl CachedRule {
    /// Validates the day set.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidDayOfWeek`] if any entry is > 6.
    pub fn validate(&self) -> CoreResult<()> {
        if let Some(&value) = self.allowed_days.iter().find(|&&d| d > 6) {
            return Err(CoreError::InvalidDayOfWeek { value });
        }
        Ok(())
    }

    /// The daily window of this rule.
    #[must_use]
    pub fn window(&self) -> TimeWindow {
        TimeWindow::new(self.start, self.end)
    }

    /// Returns true if the rule is active at `now`.
    ///
    /// The day-of-week check runs before the time check. A window that
    /// crosses midnight is attributed to the day it starts on.
    #[must_use]
    pub fn matches(&self, now: NaiveDateTime) -> bool {
        if !self.allowed_days.contains(&day_number(now)) {
            return false;
        }
        self.window().contains(now.time())
    }
}
