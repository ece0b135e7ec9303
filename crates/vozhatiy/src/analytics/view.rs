//! Per-tab projections of an [`AttendanceReport`].

use serde::{Deserialize, Serialize};

use super::aggregate::{
    AttendanceReport, ChildAttendanceSummary, DayPoint, EventAttendanceSummary, LeaderboardEntry,
    SquadAttendanceSummary,
};

/// Which part of a report the caller wants to look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportTab {
    /// Headline numbers.
    #[default]
    Overview,
    /// Per-squad breakdown.
    Squads,
    /// Per-event breakdown.
    Events,
    /// Per-child breakdown.
    Children,
    /// Day-by-day series.
    Timeline,
    /// Achievement leaderboard.
    Leaderboard,
}

/// Headline numbers of a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Overview {
    /// Pooled attendance rate.
    pub overall_rate: u32,
    /// Present marks.
    pub total_present: u32,
    /// All marks.
    pub total_records: u32,
    /// Events in the window.
    pub event_count: usize,
    /// Children with at least one mark.
    pub child_count: usize,
    /// Squads with at least one marked child.
    pub squad_count: usize,
    /// Best-attending child, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_child: Option<ChildAttendanceSummary>,
    /// Best-attended event, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_event: Option<EventAttendanceSummary>,
}

/// The data behind one tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "view", content = "data", rename_all = "snake_case")]
pub enum ReportView {
    /// See [`ReportTab::Overview`].
    Overview(Overview),
    /// See [`ReportTab::Squads`].
    Squads(Vec<SquadAttendanceSummary>),
    /// See [`ReportTab::Events`].
    Events(Vec<EventAttendanceSummary>),
    /// See [`ReportTab::Children`].
    Children(Vec<ChildAttendanceSummary>),
    /// See [`ReportTab::Timeline`].
    Timeline(Vec<DayPoint>),
    /// See [`ReportTab::Leaderboard`].
    Leaderboard(Vec<LeaderboardEntry>),
}

impl ReportView {
    /// The tab this view belongs to.
    #[must_use]
    pub fn tab(&self) -> ReportTab {
        match self {
            Self::Overview(_) => ReportTab::Overview,
            Self::Squads(_) => ReportTab::Squads,
            Self::Events(_) => ReportTab::Events,
            Self::Children(_) => ReportTab::Children,
            Self::Timeline(_) => ReportTab::Timeline,
            Self::Leaderboard(_) => ReportTab::Leaderboard,
        }
    }
}

impl AttendanceReport {
    /// Project the report onto `tab`.
    ///
    /// With a `limit`, ranked tabs (children, events, leaderboard) are cut to
    /// their top entries; events are then ordered by rate instead of schedule.
    #[must_use]
    pub fn view(&self, tab: ReportTab, limit: Option<usize>) -> ReportView {
        match tab {
            ReportTab::Overview => ReportView::Overview(Overview {
                overall_rate: self.overall_rate,
                total_present: self.total_present,
                total_records: self.total_records,
                event_count: self.events.len(),
                child_count: self.children.len(),
                squad_count: self.squads.len(),
                best_child: self.children.first().cloned(),
                best_event: self.top_events(1).into_iter().next(),
            }),
            ReportTab::Squads => ReportView::Squads(self.squads.clone()),
            ReportTab::Events => ReportView::Events(match limit {
                Some(n) => self.top_events(n),
                None => self.events.clone(),
            }),
            ReportTab::Children => {
                ReportView::Children(self.top_children(limit.unwrap_or(usize::MAX)))
            }
            ReportTab::Timeline => ReportView::Timeline(self.daily.clone()),
            ReportTab::Leaderboard => ReportView::Leaderboard(
                self.leaderboard
                    .iter()
                    .take(limit.unwrap_or(usize::MAX))
                    .cloned()
                    .collect(),
            ),
        }
    }
}
