//! Report collection and request lifecycle.
//!
//! [`collect`] reads everything a report needs from a [`RecordSource`],
//! fetching attendance for every event concurrently, and hands the joined
//! snapshot to [`analytics::aggregate`]. Read failures never abort a report:
//! the failed piece is replaced by an empty collection and recorded in the
//! returned [`ReportOutcome`].
//!
//! [`ReportController`] runs one collection at a time. A new request aborts
//! the one in flight; results are published on a `watch` channel.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use crate::analytics::{self, AggregationInput, AggregationWindow, AttendanceReport, DayMeanMode};
use crate::source::RecordSource;

/// Message shown when no source could be read at all.
pub const LOAD_FAILED_MESSAGE: &str = "Could not load statistics. Please try again.";

/// Message shown when events could not be read.
pub const EVENTS_FAILED_MESSAGE: &str =
    "Could not load events; attendance statistics are unavailable.";

/// Which read failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FetchTarget {
    /// The children list.
    Children,
    /// The events in the window.
    Events,
    /// Attendance of one event. `None` when the fetch task itself died.
    Attendance {
        /// The event whose marks were requested.
        event_id: Option<i64>,
    },
    /// Achievement tallies.
    Tallies,
}

/// One failed read, replaced by an empty collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchFailure {
    /// What was being read.
    pub target: FetchTarget,
    /// The error text.
    pub message: String,
}

/// A report plus what went wrong while building it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportOutcome {
    /// The (possibly partial) report.
    pub report: AttendanceReport,
    /// Reads that failed and were substituted.
    pub failures: Vec<FetchFailure>,
    /// A user-facing message when the report is unusable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ReportOutcome {
    /// Whether any read failed.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Read every input for `window` from `source` and aggregate it.
///
/// Children, events and tallies are fetched together; attendance is then
/// fetched for all events concurrently and joined before aggregation starts.
pub async fn collect<S>(
    source: Arc<S>,
    window: AggregationWindow,
    day_mean_mode: DayMeanMode,
) -> ReportOutcome
where
    S: RecordSource + ?Sized + 'static,
{
    let mut failures = Vec::new();

    let (children, events, tallies) = tokio::join!(
        source.fetch_all_children(),
        source.fetch_events_in_range(window.start(), window.end()),
        source.fetch_achievement_tallies(),
    );

    let children_failed = children.is_err();
    let events_failed = events.is_err();
    let tallies_failed = tallies.is_err();

    let children = recover(children, FetchTarget::Children, &mut failures);
    let events = recover(events, FetchTarget::Events, &mut failures);
    let tallies = recover(tallies, FetchTarget::Tallies, &mut failures);

    if children_failed && events_failed && tallies_failed {
        warn!("Every record source failed; returning an empty report");
        return ReportOutcome {
            report: AttendanceReport::empty(window, day_mean_mode),
            failures,
            message: Some(LOAD_FAILED_MESSAGE.to_string()),
        };
    }

    let mut tasks = JoinSet::new();
    for event in &events {
        let source = Arc::clone(&source);
        let event_id = event.id;
        tasks.spawn(async move { (event_id, source.fetch_attendance_for_event(event_id).await) });
    }

    let mut attendance = HashMap::with_capacity(events.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((event_id, Ok(records))) => {
                attendance.insert(event_id, records);
            }
            Ok((event_id, Err(err))) => {
                warn!(event_id, error = %err, "Attendance fetch failed; treating as empty");
                failures.push(FetchFailure {
                    target: FetchTarget::Attendance {
                        event_id: Some(event_id),
                    },
                    message: err.to_string(),
                });
            }
            Err(err) => {
                warn!(error = %err, "Attendance fetch task failed");
                failures.push(FetchFailure {
                    target: FetchTarget::Attendance { event_id: None },
                    message: err.to_string(),
                });
            }
        }
    }

    let input = AggregationInput {
        children,
        events,
        attendance,
        tallies,
    };
    let report = analytics::aggregate(&window, &input, day_mean_mode);

    info!(
        events = report.events.len(),
        overall_rate = report.overall_rate,
        failures = failures.len(),
        "Report ready"
    );

    ReportOutcome {
        report,
        failures,
        message: events_failed.then(|| EVENTS_FAILED_MESSAGE.to_string()),
    }
}

fn recover<T>(
    result: crate::Result<Vec<T>>,
    target: FetchTarget,
    failures: &mut Vec<FetchFailure>,
) -> Vec<T> {
    match result {
        Ok(values) => values,
        Err(err) => {
            warn!(?target, error = %err, "Fetch failed; treating as empty");
            failures.push(FetchFailure {
                target,
                message: err.to_string(),
            });
            Vec::new()
        }
    }
}

/// Lifecycle state of the latest report request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportState {
    /// Nothing requested yet.
    Idle,
    /// A request is running.
    Loading {
        /// Request number.
        generation: u64,
        /// Requested window.
        window: AggregationWindow,
    },
    /// The latest request finished.
    Ready {
        /// Request number.
        generation: u64,
        /// The result.
        outcome: Arc<ReportOutcome>,
    },
}

impl ReportState {
    /// Request number this state belongs to; 0 when idle.
    #[must_use]
    pub fn generation(&self) -> u64 {
        match self {
            Self::Idle => 0,
            Self::Loading { generation, .. } | Self::Ready { generation, .. } => *generation,
        }
    }
}

/// Runs report requests one at a time, superseding older ones.
pub struct ReportController<S: ?Sized> {
    source: Arc<S>,
    day_mean_mode: DayMeanMode,
    generation: u64,
    in_flight: Option<JoinHandle<()>>,
    state: Arc<watch::Sender<ReportState>>,
}

impl<S: ?Sized> std::fmt::Debug for ReportController<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportController")
            .field("day_mean_mode", &self.day_mean_mode)
            .field("generation", &self.generation)
            .field("in_flight", &self.in_flight.is_some())
            .finish_non_exhaustive()
    }
}

impl<S> ReportController<S>
where
    S: RecordSource + ?Sized + 'static,
{
    /// Create an idle controller over `source`.
    #[must_use]
    pub fn new(source: Arc<S>, day_mean_mode: DayMeanMode) -> Self {
        let (state, _) = watch::channel(ReportState::Idle);
        Self {
            source,
            day_mean_mode,
            generation: 0,
            in_flight: None,
            state: Arc::new(state),
        }
    }

    /// Watch state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ReportState> {
        self.state.subscribe()
    }

    /// The current state.
    #[must_use]
    pub fn state(&self) -> ReportState {
        self.state.borrow().clone()
    }

    /// Start building a report for `window`, aborting any request still
    /// running. Returns the new request number.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn request(&mut self, window: AggregationWindow) -> u64 {
        if let Some(handle) = self.in_flight.take() {
            if !handle.is_finished() {
                debug!(generation = self.generation, "Superseding in-flight report");
            }
            handle.abort();
        }

        self.generation += 1;
        let generation = self.generation;
        self.state
            .send_replace(ReportState::Loading { generation, window });

        let source = Arc::clone(&self.source);
        let state = Arc::clone(&self.state);
        let mode = self.day_mean_mode;
        self.in_flight = Some(tokio::spawn(async move {
            let outcome = collect(source, window, mode).await;
            publish(&state, generation, Arc::new(outcome));
        }));

        generation
    }

    /// Wait for the latest request to finish. Returns `None` if nothing was
    /// requested.
    pub async fn wait_ready(&self) -> Option<Arc<ReportOutcome>> {
        let target = self.generation;
        if target == 0 {
            return None;
        }
        let mut rx = self.state.subscribe();
        let state = rx
            .wait_for(|s| matches!(s, ReportState::Ready { generation, .. } if *generation == target))
            .await
            .ok()?;
        match &*state {
            ReportState::Ready { outcome, .. } => Some(Arc::clone(outcome)),
            _ => None,
        }
    }
}

/// Publish a finished report unless a newer request has taken over the
/// state. Returns whether the state changed.
fn publish(
    state: &watch::Sender<ReportState>,
    generation: u64,
    outcome: Arc<ReportOutcome>,
) -> bool {
    state.send_if_modified(|current| {
        // a newer request may have been issued before abort landed
        if current.generation() != generation {
            return false;
        }
        *current = ReportState::Ready {
            generation,
            outcome,
        };
        true
    })
}

impl<S: ?Sized> Drop for ReportController<S> {
    fn drop(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::MILLIS_PER_DAY;
    use crate::error::{Error, Result};
    use crate::records::{AchievementTally, AttendanceRecord, ChildRecord, EventRecord, EventStatus};
    use crate::storage::Storage;
    use crate::records::{NewChild, NewEvent};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::time::Duration;

    /// In-memory source with switchable failures.
    #[derive(Default)]
    struct FakeSource {
        children: Vec<ChildRecord>,
        events: Vec<EventRecord>,
        marks: Vec<AttendanceRecord>,
        tallies: Vec<AchievementTally>,
        fail_children: bool,
        fail_events: bool,
        fail_tallies: bool,
        fail_attendance_for: HashSet<i64>,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl RecordSource for FakeSource {
        async fn fetch_all_children(&self) -> Result<Vec<ChildRecord>> {
            if self.fail_children {
                return Err(Error::internal("children unavailable"));
            }
            Ok(self.children.clone())
        }

        async fn fetch_events_in_range(&self, start: i64, end: i64) -> Result<Vec<EventRecord>> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_events {
                return Err(Error::internal("events unavailable"));
            }
            Ok(self
                .events
                .iter()
                .filter(|e| e.starts_at >= start && e.starts_at <= end)
                .cloned()
                .collect())
        }

        async fn fetch_attendance_for_event(&self, event_id: i64) -> Result<Vec<AttendanceRecord>> {
            if self.fail_attendance_for.contains(&event_id) {
                return Err(Error::internal("attendance unavailable"));
            }
            Ok(self
                .marks
                .iter()
                .filter(|m| m.event_id == event_id)
                .cloned()
                .collect())
        }

        async fn fetch_achievement_tallies(&self) -> Result<Vec<AchievementTally>> {
            if self.fail_tallies {
                return Err(Error::internal("tallies unavailable"));
            }
            Ok(self.tallies.clone())
        }
    }

    fn window() -> AggregationWindow {
        AggregationWindow::new(0, 2 * MILLIS_PER_DAY).unwrap()
    }

    fn sample() -> FakeSource {
        let child = |id: i64| ChildRecord {
            id,
            name: format!("Child {id}"),
            squad: "Owls".to_string(),
            age: 10,
        };
        let event = |id: i64, day: i64| EventRecord {
            id,
            title: format!("Event {id}"),
            starts_at: day * MILLIS_PER_DAY + 1_000,
            ends_at: day * MILLIS_PER_DAY + 2_000,
            status: EventStatus::Completed,
        };
        let mark = |child_id: i64, event_id: i64, present: bool| AttendanceRecord {
            child_id,
            event_id,
            present,
            note: None,
            recorded_at: 0,
        };
        FakeSource {
            children: vec![child(1), child(2), child(3)],
            events: vec![event(10, 0), event(11, 1)],
            marks: vec![
                mark(1, 10, true),
                mark(2, 10, true),
                mark(3, 10, false),
                mark(1, 11, true),
                mark(2, 11, false),
            ],
            tallies: vec![AchievementTally {
                child_id: 2,
                total_points: 4,
            }],
            ..FakeSource::default()
        }
    }

    #[tokio::test]
    async fn test_collect_full_report() {
        let outcome = collect(Arc::new(sample()), window(), DayMeanMode::Deferred).await;

        assert!(!outcome.is_degraded());
        assert!(outcome.message.is_none());
        assert_eq!(outcome.report.overall_rate, 60);
        assert_eq!(outcome.report.events[0].rate, 67);
        assert_eq!(outcome.report.events[1].rate, 50);
        assert_eq!(outcome.report.leaderboard.len(), 1);
    }

    #[tokio::test]
    async fn test_collect_empty_window() {
        let source = FakeSource::default();
        let outcome = collect(Arc::new(source), window(), DayMeanMode::Deferred).await;

        assert!(outcome.report.is_empty());
        assert_eq!(outcome.report.overall_rate, 0);
        assert!(outcome.failures.is_empty());
    }

    #[tokio::test]
    async fn test_single_attendance_failure_degrades() {
        crate::logging::init_test_logging();
        let mut source = sample();
        source.fail_attendance_for.insert(11);
        let outcome = collect(Arc::new(source), window(), DayMeanMode::Deferred).await;

        assert!(outcome.is_degraded());
        assert!(outcome.message.is_none());
        assert_eq!(
            outcome.failures[0].target,
            FetchTarget::Attendance {
                event_id: Some(11)
            }
        );
        // event 11 counts as having no marks
        assert_eq!(outcome.report.events.len(), 2);
        assert_eq!(outcome.report.events[1].rate, 0);
        assert_eq!(outcome.report.overall_rate, 67);
    }

    #[tokio::test]
    async fn test_children_failure_keeps_event_numbers() {
        let mut source = sample();
        source.fail_children = true;
        let outcome = collect(Arc::new(source), window(), DayMeanMode::Deferred).await;

        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].target, FetchTarget::Children);
        assert_eq!(outcome.report.overall_rate, 60);
        assert!(outcome.report.children.is_empty());
        assert!(outcome.report.squads.is_empty());
        assert!(outcome.report.leaderboard.is_empty());
    }

    #[tokio::test]
    async fn test_events_failure_sets_message() {
        let mut source = sample();
        source.fail_events = true;
        let outcome = collect(Arc::new(source), window(), DayMeanMode::Deferred).await;

        assert_eq!(outcome.message.as_deref(), Some(EVENTS_FAILED_MESSAGE));
        assert!(outcome.report.events.is_empty());
        assert_eq!(outcome.report.leaderboard.len(), 1);
    }

    #[tokio::test]
    async fn test_total_failure_returns_empty_report() {
        crate::logging::init_test_logging();
        let mut source = sample();
        source.fail_children = true;
        source.fail_events = true;
        source.fail_tallies = true;
        let outcome = collect(Arc::new(source), window(), DayMeanMode::Deferred).await;

        assert_eq!(outcome.message.as_deref(), Some(LOAD_FAILED_MESSAGE));
        assert_eq!(outcome.failures.len(), 3);
        assert_eq!(
            outcome.report,
            AttendanceReport::empty(window(), DayMeanMode::Deferred)
        );
    }

    #[tokio::test]
    async fn test_collect_from_storage() {
        let storage = Storage::open_in_memory().unwrap();
        let masha = storage
            .insert_child(&NewChild {
                name: "Masha".to_string(),
                squad: "Owls".to_string(),
                age: 11,
            })
            .unwrap();
        let hike = storage
            .insert_event(&NewEvent {
                title: "Hike".to_string(),
                starts_at: 1_000,
                ends_at: 2_000,
                status: EventStatus::Completed,
            })
            .unwrap();
        storage
            .mark_attendance(masha.id, hike.id, true, None)
            .unwrap();

        let outcome = collect(Arc::new(storage), window(), DayMeanMode::Deferred).await;
        assert_eq!(outcome.report.overall_rate, 100);
        assert_eq!(outcome.report.children[0].name, "Masha");
    }

    #[tokio::test]
    async fn test_controller_publishes_ready() {
        let mut controller = ReportController::new(Arc::new(sample()), DayMeanMode::Deferred);
        assert_eq!(controller.state(), ReportState::Idle);
        assert!(controller.wait_ready().await.is_none());

        let generation = controller.request(window());
        assert_eq!(generation, 1);

        let outcome = controller.wait_ready().await.unwrap();
        assert_eq!(outcome.report.overall_rate, 60);
        assert_eq!(controller.state().generation(), 1);
    }

    #[tokio::test]
    async fn test_controller_supersedes_in_flight_request() {
        let mut source = sample();
        source.delay = Some(Duration::from_millis(50));
        let mut controller = ReportController::new(Arc::new(source), DayMeanMode::Deferred);
        let mut rx = controller.subscribe();
        let seen = tokio::spawn(async move {
            let mut seen = Vec::new();
            while rx.changed().await.is_ok() {
                let state = rx.borrow_and_update().clone();
                let done = matches!(state, ReportState::Ready { generation: 2, .. });
                seen.push(state);
                if done {
                    break;
                }
            }
            seen
        });

        controller.request(window());
        // second request covers only day 1
        let narrow = AggregationWindow::new(MILLIS_PER_DAY, MILLIS_PER_DAY).unwrap();
        let generation = controller.request(narrow);
        assert_eq!(generation, 2);

        let outcome = controller.wait_ready().await.unwrap();
        assert_eq!(outcome.report.window, narrow);
        assert_eq!(outcome.report.events.len(), 1);
        assert_eq!(outcome.report.overall_rate, 50);

        let seen = seen.await.unwrap();
        assert!(matches!(
            seen.last(),
            Some(ReportState::Ready { generation: 2, .. })
        ));
        assert!(!seen
            .iter()
            .any(|state| matches!(state, ReportState::Ready { generation: 1, .. })));
    }

    #[tokio::test]
    async fn test_controller_sequential_requests() {
        let mut controller = ReportController::new(Arc::new(sample()), DayMeanMode::Deferred);

        controller.request(window());
        let first = controller.wait_ready().await.unwrap();
        assert_eq!(
            controller.state(),
            ReportState::Ready {
                generation: 1,
                outcome: Arc::clone(&first),
            }
        );

        let narrow = AggregationWindow::new(MILLIS_PER_DAY, MILLIS_PER_DAY).unwrap();
        assert_eq!(controller.request(narrow), 2);
        let second = controller.wait_ready().await.unwrap();

        let ReportState::Ready { generation, outcome } = controller.state() else {
            panic!("expected a ready state");
        };
        assert_eq!(generation, 2);
        assert_eq!(outcome.report.window, narrow);
        assert_eq!(second.report.overall_rate, 50);
        // the earlier result is untouched
        assert_eq!(first.report.window, window());
        assert_eq!(first.report.overall_rate, 60);
    }

    #[test]
    fn test_publish_ignores_stale_generation() {
        let (state, _rx) = watch::channel(ReportState::Loading {
            generation: 2,
            window: window(),
        });
        let stale = Arc::new(ReportOutcome {
            report: AttendanceReport::empty(window(), DayMeanMode::Deferred),
            failures: Vec::new(),
            message: None,
        });

        assert!(!publish(&state, 1, Arc::clone(&stale)));
        assert_eq!(state.borrow().generation(), 2);
        assert!(matches!(*state.borrow(), ReportState::Loading { .. }));

        assert!(publish(&state, 2, stale));
        assert!(matches!(
            *state.borrow(),
            ReportState::Ready { generation: 2, .. }
        ));
    }
}
