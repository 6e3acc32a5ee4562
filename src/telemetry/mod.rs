//! Telemetry for CardioPredict
//!
//! Collects per-request events and running counters for the service and
//! renders a terminal summary.

use crate::ensemble::{EnsembleOutcome, OutcomeSource};
use crate::models::SlotId;
use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Events kept for `recent_events`
const EVENT_HISTORY: usize = 1_000;

/// Telemetry event types
#[derive(Debug, Clone)]
pub enum TelemetryEvent {
    PredictionCompleted {
        request_id: String,
        source: OutcomeSource,
        backfilled: Vec<SlotId>,
        stacking_used: bool,
        duration_ms: u64,
        timestamp: Instant,
    },
    InputRejected {
        request_id: String,
        reason: String,
        timestamp: Instant,
    },
    TimedOut {
        request_id: String,
        deadline_ms: u64,
        timestamp: Instant,
    },
}

impl TelemetryEvent {
    /// Build a completion event from an outcome
    pub fn completed(request_id: &str, outcome: &EnsembleOutcome, duration: Duration) -> Self {
        TelemetryEvent::PredictionCompleted {
            request_id: request_id.to_string(),
            source: outcome.diagnostics.source,
            backfilled: outcome.diagnostics.backfilled.clone(),
            stacking_used: outcome.diagnostics.stacking_used,
            duration_ms: duration.as_millis() as u64,
            timestamp: Instant::now(),
        }
    }
}

/// Telemetry statistics
#[derive(Debug, Clone, Default)]
pub struct TelemetryStats {
    pub predictions: usize,
    pub fallback_predictions: usize,
    /// Ensemble predictions where the stacking model did not answer
    pub stacking_fallbacks: usize,
    /// Times each base slot was backfilled on the ensemble path
    pub slot_backfills: BTreeMap<SlotId, usize>,
    pub rejected_inputs: usize,
    pub timeouts: usize,
    pub total_duration_ms: u64,
}

/// Telemetry collector
#[derive(Clone)]
pub struct TelemetryCollector {
    events: Arc<Mutex<VecDeque<TelemetryEvent>>>,
    stats: Arc<Mutex<TelemetryStats>>,
    start_time: Instant,
}

impl TelemetryCollector {
    /// Create a new telemetry collector
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::new())),
            stats: Arc::new(Mutex::new(TelemetryStats::default())),
            start_time: Instant::now(),
        }
    }

    /// Record an event
    pub fn record(&self, event: TelemetryEvent) {
        {
            let mut stats = self.stats.lock();
            match &event {
                TelemetryEvent::PredictionCompleted {
                    source,
                    backfilled,
                    stacking_used,
                    duration_ms,
                    ..
                } => {
                    stats.predictions += 1;
                    stats.total_duration_ms += duration_ms;
                    match source {
                        OutcomeSource::Fallback => stats.fallback_predictions += 1,
                        OutcomeSource::Ensemble => {
                            if !stacking_used {
                                stats.stacking_fallbacks += 1;
                            }
                            for slot in backfilled {
                                *stats.slot_backfills.entry(*slot).or_insert(0) += 1;
                            }
                        }
                    }
                }
                TelemetryEvent::InputRejected { .. } => {
                    stats.rejected_inputs += 1;
                }
                TelemetryEvent::TimedOut { .. } => {
                    stats.timeouts += 1;
                }
            }
        }

        let mut events = self.events.lock();
        if events.len() == EVENT_HISTORY {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// Get current statistics
    pub fn get_stats(&self) -> TelemetryStats {
        self.stats.lock().clone()
    }

    /// Get elapsed time since start
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Get retained event count
    pub fn event_count(&self) -> usize {
        self.events.lock().len()
    }

    /// Get recent events (last n)
    pub fn recent_events(&self, n: usize) -> Vec<TelemetryEvent> {
        let events = self.events.lock();
        let start = events.len().saturating_sub(n);
        events.iter().skip(start).cloned().collect()
    }

    /// Mean latency of completed predictions
    pub fn average_latency_ms(&self) -> f64 {
        let stats = self.stats.lock();
        if stats.predictions == 0 {
            0.0
        } else {
            stats.total_duration_ms as f64 / stats.predictions as f64
        }
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Simple telemetry display
pub struct TelemetryDisplay {
    collector: TelemetryCollector,
    verbosity: crate::cli::Verbosity,
}

impl TelemetryDisplay {
    /// Create a new display
    pub fn new(collector: TelemetryCollector, verbosity: crate::cli::Verbosity) -> Self {
        Self {
            collector,
            verbosity,
        }
    }

    /// Display summary statistics on stderr
    pub fn display_summary(&self) {
        if !self.verbosity.show_progress() {
            return;
        }

        let stats = self.collector.get_stats();

        eprintln!("\n📊 Prediction Summary");
        eprintln!("─────────────────────────────────────");
        eprintln!("Duration:           {:?}", self.collector.elapsed());
        eprintln!("Predictions:        {}", stats.predictions);
        eprintln!("Fallback scored:    {}", stats.fallback_predictions);
        eprintln!("Stacking fallbacks: {}", stats.stacking_fallbacks);
        eprintln!("Rejected inputs:    {}", stats.rejected_inputs);
        eprintln!("Timeouts:           {}", stats.timeouts);
        eprintln!("Avg latency:        {:.1} ms", self.collector.average_latency_ms());

        if self.should_show_details() && !stats.slot_backfills.is_empty() {
            eprintln!("Backfilled slots:");
            for (slot, count) in &stats.slot_backfills {
                eprintln!("  {:<8} {:>6}  ({})", slot.key(), count, slot.display_name());
            }
        }
        eprintln!();
    }

    /// Check if should show detailed output
    pub fn should_show_details(&self) -> bool {
        self.verbosity.show_events()
    }
}
