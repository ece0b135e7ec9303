//! Single-pass attendance aggregation.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, warn};

use super::rate::{attendance_rate, DayBucket, DayMeanMode};
use super::window::AggregationWindow;
use crate::records::{AchievementTally, AttendanceRecord, ChildRecord, EventRecord};

/// Snapshot of everything one report is computed from.
///
/// Events missing from `attendance` are treated as having no marks.
#[derive(Debug, Clone, Default)]
pub struct AggregationInput {
    /// Reference data for every child.
    pub children: Vec<ChildRecord>,
    /// Events scheduled in the window.
    pub events: Vec<EventRecord>,
    /// Attendance marks keyed by event id.
    pub attendance: HashMap<i64, Vec<AttendanceRecord>>,
    /// Achievement point totals.
    pub tallies: Vec<AchievementTally>,
}

/// Attendance of one squad.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SquadAttendanceSummary {
    /// Squad label.
    pub squad: String,
    /// Children of this squad with at least one mark.
    pub child_count: usize,
    /// Present marks across the squad.
    pub total_present: u32,
    /// Absent marks across the squad.
    pub total_absent: u32,
    /// Mean of the members' individual rates (integer division).
    pub rate: u32,
}

/// Attendance of one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventAttendanceSummary {
    /// Event id.
    pub event_id: i64,
    /// Event title.
    pub title: String,
    /// Scheduled start in milliseconds.
    pub starts_at: i64,
    /// Children marked present.
    pub present: u32,
    /// Children marked absent.
    pub absent: u32,
    /// Attendance rate.
    pub rate: u32,
}

/// Attendance of one child.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChildAttendanceSummary {
    /// Child id.
    pub child_id: i64,
    /// Display name.
    pub name: String,
    /// Squad label.
    pub squad: String,
    /// Events the child attended.
    pub attended: u32,
    /// Events the child missed.
    pub missed: u32,
    /// Attendance rate.
    pub rate: u32,
}

/// Mean event rate for one day of the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayPoint {
    /// Day offset from the window start.
    pub day_index: i64,
    /// Events scheduled that day.
    pub event_count: u32,
    /// Mean of the day's event rates.
    pub mean_rate: u32,
}

/// Position on the achievement leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    /// 1-based position.
    pub rank: usize,
    /// Child id.
    pub child_id: i64,
    /// Display name.
    pub name: String,
    /// Squad label.
    pub squad: String,
    /// Accumulated points.
    pub total_points: i64,
}

/// Everything derived for one window. Recomputed on every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttendanceReport {
    /// The window the report covers.
    pub window: AggregationWindow,
    /// Day-bucket averaging policy used for `daily`.
    pub day_mean_mode: DayMeanMode,
    /// Present marks over all events.
    pub total_present: u32,
    /// All marks over all events.
    pub total_records: u32,
    /// Pooled attendance rate over every recorded (child, event) pair.
    pub overall_rate: u32,
    /// Per-squad breakdown, in order of first appearance among children.
    pub squads: Vec<SquadAttendanceSummary>,
    /// Per-event breakdown, in input order.
    pub events: Vec<EventAttendanceSummary>,
    /// Per-child breakdown, by rate descending.
    pub children: Vec<ChildAttendanceSummary>,
    /// Days holding at least one event, by day index.
    pub daily: Vec<DayPoint>,
    /// Achievement leaderboard, by points descending. Points are lifetime
    /// totals, so the leaderboard does not depend on the window and stays
    /// filled when no event falls inside it.
    pub leaderboard: Vec<LeaderboardEntry>,
}

impl AttendanceReport {
    /// A report with no data.
    #[must_use]
    pub fn empty(window: AggregationWindow, day_mean_mode: DayMeanMode) -> Self {
        Self {
            window,
            day_mean_mode,
            total_present: 0,
            total_records: 0,
            overall_rate: 0,
            squads: Vec::new(),
            events: Vec::new(),
            children: Vec::new(),
            daily: Vec::new(),
            leaderboard: Vec::new(),
        }
    }

    /// Whether no attendance was found in the window. The leaderboard is not
    /// considered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.children.is_empty()
    }

    /// The `n` best-attending children. Ties keep input order.
    #[must_use]
    pub fn top_children(&self, n: usize) -> Vec<ChildAttendanceSummary> {
        self.children.iter().take(n).cloned().collect()
    }

    /// The `n` best-attended events. Ties keep schedule order.
    #[must_use]
    pub fn top_events(&self, n: usize) -> Vec<EventAttendanceSummary> {
        let mut events = self.events.clone();
        events.sort_by(|a, b| b.rate.cmp(&a.rate));
        events.truncate(n);
        events
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct ChildTally {
    attended: u32,
    total: u32,
}

#[derive(Debug)]
struct SquadTally<'a> {
    squad: &'a str,
    rate_sum: u32,
    child_count: usize,
    present: u32,
    absent: u32,
}

/// Compute every summary for `window` from `input`.
///
/// Never fails: events outside the window are skipped, duplicate marks for
/// the same (child, event) keep the first one, and marks for unknown children
/// only count toward overall and per-event numbers.
#[must_use]
pub fn aggregate(
    window: &AggregationWindow,
    input: &AggregationInput,
    day_mean_mode: DayMeanMode,
) -> AttendanceReport {
    let mut report = AttendanceReport::empty(*window, day_mean_mode);
    let mut child_tallies: HashMap<i64, ChildTally> = HashMap::new();
    let mut days: BTreeMap<i64, DayBucket> = BTreeMap::new();

    for event in &input.events {
        if !window.contains(event.starts_at) {
            debug!(event_id = event.id, "Skipping event outside window");
            continue;
        }

        let records = input
            .attendance
            .get(&event.id)
            .map_or(&[][..], Vec::as_slice);
        let mut seen = HashSet::with_capacity(records.len());
        let (mut present, mut total) = (0u32, 0u32);

        for record in records {
            if !seen.insert(record.child_id) {
                warn!(
                    event_id = event.id,
                    child_id = record.child_id,
                    "Ignoring duplicate attendance mark"
                );
                continue;
            }
            total += 1;
            let tally = child_tallies.entry(record.child_id).or_default();
            tally.total += 1;
            if record.present {
                present += 1;
                tally.attended += 1;
            }
        }

        let rate = attendance_rate(present, total);
        report.total_present += present;
        report.total_records += total;
        days.entry(window.day_index(event.starts_at))
            .or_default()
            .push(rate);
        report.events.push(EventAttendanceSummary {
            event_id: event.id,
            title: event.title.clone(),
            starts_at: event.starts_at,
            present,
            absent: total - present,
            rate,
        });
    }

    report.overall_rate = attendance_rate(report.total_present, report.total_records);
    report.daily = days
        .into_iter()
        .map(|(day_index, bucket)| DayPoint {
            day_index,
            event_count: bucket.count(),
            mean_rate: bucket.mean(day_mean_mode),
        })
        .collect();

    let mut squads: Vec<SquadTally<'_>> = Vec::new();
    let mut squad_index: HashMap<&str, usize> = HashMap::new();
    let mut seen_children = HashSet::with_capacity(input.children.len());

    for child in &input.children {
        if !seen_children.insert(child.id) {
            continue;
        }
        let Some(tally) = child_tallies.get(&child.id).filter(|t| t.total > 0) else {
            continue;
        };
        let rate = attendance_rate(tally.attended, tally.total);
        let missed = tally.total - tally.attended;

        let idx = *squad_index.entry(child.squad.as_str()).or_insert_with(|| {
            squads.push(SquadTally {
                squad: child.squad.as_str(),
                rate_sum: 0,
                child_count: 0,
                present: 0,
                absent: 0,
            });
            squads.len() - 1
        });
        let squad = &mut squads[idx];
        squad.rate_sum += rate;
        squad.child_count += 1;
        squad.present += tally.attended;
        squad.absent += missed;

        report.children.push(ChildAttendanceSummary {
            child_id: child.id,
            name: child.name.clone(),
            squad: child.squad.clone(),
            attended: tally.attended,
            missed,
            rate,
        });
    }

    // stable: equal rates keep children order
    report.children.sort_by(|a, b| b.rate.cmp(&a.rate));

    report.squads = squads
        .into_iter()
        .map(|squad| SquadAttendanceSummary {
            squad: squad.squad.to_string(),
            child_count: squad.child_count,
            total_present: squad.present,
            total_absent: squad.absent,
            rate: u32::try_from(squad.child_count)
                .ok()
                .filter(|count| *count > 0)
                .map_or(0, |count| squad.rate_sum / count),
        })
        .collect();

    report.leaderboard = leaderboard(&input.children, &input.tallies);

    debug!(
        events = report.events.len(),
        children = report.children.len(),
        squads = report.squads.len(),
        overall_rate = report.overall_rate,
        "Aggregated attendance"
    );
    report
}

/// Join tallies with children, highest points first; equal points keep
/// tally order. Tallies for unknown children are dropped.
#[must_use]
pub fn leaderboard(children: &[ChildRecord], tallies: &[AchievementTally]) -> Vec<LeaderboardEntry> {
    let lookup: HashMap<i64, &ChildRecord> = children.iter().map(|c| (c.id, c)).collect();

    let mut known: Vec<(&AchievementTally, &ChildRecord)> = tallies
        .iter()
        .filter_map(|tally| match lookup.get(&tally.child_id) {
            Some(child) => Some((tally, *child)),
            None => {
                debug!(child_id = tally.child_id, "Tally for unknown child");
                None
            }
        })
        .collect();
    known.sort_by(|a, b| b.0.total_points.cmp(&a.0.total_points));

    known
        .into_iter()
        .enumerate()
        .map(|(i, (tally, child))| LeaderboardEntry {
            rank: i + 1,
            child_id: child.id,
            name: child.name.clone(),
            squad: child.squad.clone(),
            total_points: tally.total_points,
        })
        .collect()
}
