//! Booking Slot Advisor
//!
//! Marks already-booked times on a fixed grid of appointment slots. Advisory
//! only: nothing is reserved, and a conflicting booking is refused by the
//! server like any other error.

use std::{fmt, sync::Arc};

use jiff::{
    SignedDuration,
    civil::{self, Date, DateTime, Time},
};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::api::{ApiError, AvailabilityService};

/// Id of a bookable service (grooming, vaccination, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceId(pub u64);

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The slots offered each day: `start` up to, not including, `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotGrid {
    start: Time,
    end: Time,
    step: SignedDuration,
}

impl Default for SlotGrid {
    /// Half-hour slots from 08:00 to 17:30.
    fn default() -> Self {
        Self {
            start: civil::time(8, 0, 0, 0),
            end: civil::time(18, 0, 0, 0),
            step: SignedDuration::from_mins(30),
        }
    }
}

impl SlotGrid {
    /// Create a grid. A non-positive step yields only `start`.
    #[must_use]
    pub fn new(start: Time, end: Time, step: SignedDuration) -> Self {
        Self { start, end, step }
    }

    /// Slot start times in order.
    #[must_use]
    pub fn times(&self) -> Vec<Time> {
        let mut times = Vec::new();
        let mut current = self.start;

        while current < self.end {
            times.push(current);

            match current.checked_add(self.step) {
                Ok(next) if next > current => current = next,
                _ => break,
            }
        }

        times
    }
}

/// Times already booked for a service on a date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookedTimeSet {
    /// Service the times belong to.
    pub service: ServiceId,

    /// Date the times belong to.
    pub date: Date,

    times: FxHashSet<Time>,
}

impl BookedTimeSet {
    /// An empty set.
    #[must_use]
    pub fn empty(service: ServiceId, date: Date) -> Self {
        Self {
            service,
            date,
            times: FxHashSet::default(),
        }
    }

    /// Build a set from server times, skipping entries that do not parse.
    pub fn from_raw<S: AsRef<str>>(service: ServiceId, date: Date, raw: &[S]) -> Self {
        let times = raw
            .iter()
            .filter_map(|entry| {
                let entry = entry.as_ref();
                let parsed = parse_time_of_day(entry);

                if parsed.is_none() {
                    warn!(%service, %date, entry, "skipping unparseable booked time");
                }

                parsed
            })
            .collect();

        Self {
            service,
            date,
            times,
        }
    }

    /// Whether `time` is booked. Seconds are ignored.
    #[must_use]
    pub fn contains(&self, time: Time) -> bool {
        self.times.contains(&minute_of(time))
    }

    /// Number of distinct booked times.
    #[must_use]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Whether nothing is booked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

/// A slot on the booking grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSlot {
    /// Slot start.
    pub time: Time,

    /// Whether the slot can be picked.
    pub available: bool,
}

impl TimeSlot {
    /// `HH:MM` label.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{:02}:{:02}", self.time.hour(), self.time.minute())
    }
}

/// Lay `booked` over `grid`. On `now`'s own date, slots at or before `now` are
/// disabled as well.
#[must_use]
pub fn plan_slots(grid: &SlotGrid, booked: &BookedTimeSet, now: DateTime) -> Vec<TimeSlot> {
    let today = booked.date == now.date();
    let past = booked.date < now.date();

    grid.times()
        .into_iter()
        .map(|time| TimeSlot {
            time,
            available: !past && !booked.contains(time) && !(today && time <= now.time()),
        })
        .collect()
}

/// Parse `HH:MM` or `HH:MM:SS`, dropping the seconds.
#[must_use]
pub fn parse_time_of_day(raw: &str) -> Option<Time> {
    let mut parts = raw.trim().split(':');

    let hour = parts.next()?.parse::<i8>().ok()?;
    let minute = parts.next()?.parse::<i8>().ok()?;

    if let Some(second) = parts.next() {
        second.parse::<u8>().ok().filter(|second| *second < 60)?;
    }

    if parts.next().is_some() {
        return None;
    }

    Time::new(hour, minute, 0, 0).ok()
}

fn minute_of(time: Time) -> Time {
    Time::new(time.hour(), time.minute(), 0, 0).unwrap_or(time)
}

/// Tracks the booked times for the selected date of one service.
pub struct BookingSlotAdvisor {
    availability: Arc<dyn AvailabilityService>,
    service: ServiceId,
    grid: SlotGrid,
    booked: Option<BookedTimeSet>,
}

impl fmt::Debug for BookingSlotAdvisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BookingSlotAdvisor")
            .field("service", &self.service)
            .field("grid", &self.grid)
            .field("booked", &self.booked)
            .finish_non_exhaustive()
    }
}

impl BookingSlotAdvisor {
    /// Create an advisor for `service` on the default grid.
    #[must_use]
    pub fn new(availability: Arc<dyn AvailabilityService>, service: ServiceId) -> Self {
        Self {
            availability,
            service,
            grid: SlotGrid::default(),
            booked: None,
        }
    }

    /// Use a different grid.
    #[must_use]
    pub fn with_grid(mut self, grid: SlotGrid) -> Self {
        self.grid = grid;
        self
    }

    /// Fetch the booked times for `date` without touching the selection.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    pub async fn fetch_booked_times(&self, date: Date) -> Result<BookedTimeSet, ApiError> {
        let raw = self.availability.booked_times(self.service, date).await?;

        Ok(BookedTimeSet::from_raw(self.service, date, &raw))
    }

    /// Select `date`, discarding the previous date's booked times.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails; the selection is then empty.
    pub async fn select_date(&mut self, date: Date) -> Result<&BookedTimeSet, ApiError> {
        self.booked = None;

        let booked = self.fetch_booked_times(date).await?;

        debug!(service = %self.service, %date, booked = booked.len(), "booked times loaded");

        Ok(self.booked.insert(booked))
    }

    /// The selected date's booked times.
    #[must_use]
    pub fn booked(&self) -> Option<&BookedTimeSet> {
        self.booked.as_ref()
    }

    /// Slots for the selected date; empty when no date is selected.
    #[must_use]
    pub fn slots(&self, now: DateTime) -> Vec<TimeSlot> {
        self.booked
            .as_ref()
            .map(|booked| plan_slots(&self.grid, booked, now))
            .unwrap_or_default()
    }
}
