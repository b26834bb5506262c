//! Per-tool call health for the `health_check` tool.
//!
//! Each tool keeps a bounded window of recent outcomes. A tool is graded by
//! success rate and mean latency once the window holds enough calls.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};

/// Grade of a tool or of the hub as a whole. Ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
    Unknown,
}

/// Grading thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Success rate at or above which a tool is healthy.
    pub success_rate_healthy: f64,
    /// Success rate below which a tool is unhealthy.
    pub success_rate_degraded: f64,
    /// Mean latency at or below which a tool is healthy.
    pub latency_healthy_ms: u64,
    /// Mean latency above which a tool is unhealthy.
    pub latency_degraded_ms: u64,
    /// Calls needed before a tool is graded at all.
    pub min_calls_for_assessment: usize,
    pub window_size: usize,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            success_rate_healthy: 0.95,
            success_rate_degraded: 0.80,
            latency_healthy_ms: 2_000,
            latency_degraded_ms: 10_000,
            min_calls_for_assessment: 5,
            window_size: 100,
        }
    }
}

impl HealthConfig {
    fn grade_rate(&self, rate: f64) -> HealthStatus {
        match rate {
            r if r >= self.success_rate_healthy => HealthStatus::Healthy,
            r if r >= self.success_rate_degraded => HealthStatus::Degraded,
            _ => HealthStatus::Unhealthy,
        }
    }

    fn grade_latency(&self, mean_ms: f64) -> HealthStatus {
        match mean_ms {
            ms if ms <= self.latency_healthy_ms as f64 => HealthStatus::Healthy,
            ms if ms <= self.latency_degraded_ms as f64 => HealthStatus::Degraded,
            _ => HealthStatus::Unhealthy,
        }
    }
}

/// One finished call. `error_kind` is `None` for successes and refusals.
#[derive(Debug, Clone, Copy)]
struct Outcome {
    success: bool,
    latency_ms: u64,
    error_kind: Option<&'static str>,
}

/// Bounded outcome history with running totals.
#[derive(Debug)]
struct CallWindow {
    outcomes: VecDeque<Outcome>,
    capacity: usize,
    successes: usize,
    latency_total: u64,
}

impl CallWindow {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            outcomes: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            successes: 0,
            latency_total: 0,
        }
    }

    fn push(&mut self, outcome: Outcome) {
        if self.outcomes.len() == self.capacity {
            if let Some(evicted) = self.outcomes.pop_front() {
                self.successes -= usize::from(evicted.success);
                self.latency_total -= evicted.latency_ms;
            }
        }
        self.successes += usize::from(outcome.success);
        self.latency_total = self.latency_total.saturating_add(outcome.latency_ms);
        self.outcomes.push_back(outcome);
    }

    fn len(&self) -> usize {
        self.outcomes.len()
    }

    fn success_rate(&self) -> f64 {
        if self.outcomes.is_empty() {
            return 0.0;
        }
        self.successes as f64 / self.len() as f64
    }

    fn mean_latency_ms(&self) -> f64 {
        if self.outcomes.is_empty() {
            return 0.0;
        }
        self.latency_total as f64 / self.len() as f64
    }

    /// Failure counts by error kind, most frequent first.
    fn failure_kinds(&self) -> Vec<(&'static str, usize)> {
        let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
        for outcome in self.outcomes.iter().filter(|o| !o.success) {
            *counts.entry(outcome.error_kind.unwrap_or("refused")).or_default() += 1;
        }
        let mut kinds: Vec<_> = counts.into_iter().collect();
        kinds.sort_by(|a, b| b.1.cmp(&a.1));
        kinds
    }
}

/// Grade and figures for one tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolHealthReport {
    pub status: HealthStatus,
    pub success_rate: f64,
    pub avg_latency_ms: f64,
    pub total_calls: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<(&'static str, usize)>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,
}

impl ToolHealthReport {
    fn unseen() -> Self {
        Self {
            status: HealthStatus::Unknown,
            success_rate: 0.0,
            avg_latency_ms: 0.0,
            total_calls: 0,
            errors: Vec::new(),
            issues: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct HealthSummary {
    pub healthy: usize,
    pub degraded: usize,
    pub unhealthy: usize,
    pub unknown: usize,
}

impl HealthSummary {
    fn count(&mut self, status: HealthStatus) {
        let slot = match status {
            HealthStatus::Healthy => &mut self.healthy,
            HealthStatus::Degraded => &mut self.degraded,
            HealthStatus::Unhealthy => &mut self.unhealthy,
            HealthStatus::Unknown => &mut self.unknown,
        };
        *slot += 1;
    }

    /// Worst graded status; `Unknown` only when nothing has been graded.
    fn overall(&self) -> HealthStatus {
        if self.unhealthy > 0 {
            HealthStatus::Unhealthy
        } else if self.degraded > 0 {
            HealthStatus::Degraded
        } else if self.healthy > 0 {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unknown
        }
    }
}

/// Every registered tool, in registration order, followed by unregistered ones.
#[derive(Debug, Clone, Serialize)]
pub struct SystemHealthReport {
    pub status: HealthStatus,
    pub summary: HealthSummary,
    pub tools: Vec<(String, ToolHealthReport)>,
}

/// Outcome windows keyed by tool name.
#[derive(Debug)]
pub struct ToolHealthTracker {
    config: HealthConfig,
    windows: HashMap<String, CallWindow>,
    registered: Vec<String>,
}

impl ToolHealthTracker {
    pub fn new(config: HealthConfig) -> Self {
        Self {
            config,
            windows: HashMap::new(),
            registered: Vec::new(),
        }
    }

    /// Tools listed in reports even before their first call.
    pub fn set_registered_tools(&mut self, names: Vec<String>) {
        self.registered = names;
    }

    pub fn record(&mut self, tool: &str, success: bool, latency_ms: u64, error_kind: Option<&'static str>) {
        let capacity = self.config.window_size;
        self.windows
            .entry(tool.to_string())
            .or_insert_with(|| CallWindow::with_capacity(capacity))
            .push(Outcome {
                success,
                latency_ms,
                error_kind,
            });
    }

    pub fn check_tool(&self, tool: &str) -> ToolHealthReport {
        let Some(window) = self.windows.get(tool) else {
            return ToolHealthReport::unseen();
        };

        let cfg = &self.config;
        let calls = window.len();
        let rate = window.success_rate();
        let latency = window.mean_latency_ms();
        let mut issues = Vec::new();

        let status = if calls < cfg.min_calls_for_assessment {
            issues.push(format!("Insufficient data ({calls}/{})", cfg.min_calls_for_assessment));
            HealthStatus::Unknown
        } else {
            if rate < cfg.success_rate_healthy {
                issues.push(format!(
                    "{:.1}% of calls succeeded, want at least {:.0}%",
                    rate * 100.0,
                    cfg.success_rate_healthy * 100.0
                ));
            }
            if latency > cfg.latency_healthy_ms as f64 {
                issues.push(format!("Mean latency {latency:.0}ms is over {}ms", cfg.latency_healthy_ms));
            }
            cfg.grade_rate(rate).max(cfg.grade_latency(latency))
        };

        ToolHealthReport {
            status,
            success_rate: rate,
            avg_latency_ms: latency,
            total_calls: calls,
            errors: window.failure_kinds(),
            issues,
        }
    }

    pub fn check_system(&self) -> SystemHealthReport {
        let mut unregistered: Vec<&String> = self
            .windows
            .keys()
            .filter(|name| !self.registered.contains(*name))
            .collect();
        unregistered.sort();

        let mut summary = HealthSummary::default();
        let tools: Vec<(String, ToolHealthReport)> = self
            .registered
            .iter()
            .chain(unregistered)
            .map(|name| {
                let report = self.check_tool(name);
                summary.count(report.status);
                (name.clone(), report)
            })
            .collect();

        SystemHealthReport {
            status: summary.overall(),
            summary,
            tools,
        }
    }
}

impl Default for ToolHealthTracker {
    fn default() -> Self {
        Self::new(HealthConfig::default())
    }
}
