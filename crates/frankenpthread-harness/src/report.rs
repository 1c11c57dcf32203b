//! Scenario outcomes and run summaries.

use serde::{Deserialize, Serialize};

/// Outcome of one scenario run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub scenario: String,
    pub threads: u32,
    pub iterations: u32,
    /// Value the scenario must observe when every primitive behaved.
    pub expected: u64,
    pub observed: u64,
    pub passed: bool,
    pub elapsed_ns: u64,
}

impl ScenarioReport {
    #[must_use]
    pub fn throughput_per_sec(&self) -> f64 {
        if self.elapsed_ns == 0 {
            return 0.0;
        }
        self.observed as f64 * 1e9 / self.elapsed_ns as f64
    }
}

/// All reports from one harness invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub campaign: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub reports: Vec<ScenarioReport>,
}

impl RunSummary {
    #[must_use]
    pub fn new(campaign: impl Into<String>) -> Self {
        Self {
            campaign: campaign.into(),
            ..Self::default()
        }
    }

    pub fn push(&mut self, report: ScenarioReport) {
        self.total += 1;
        if report.passed {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
        self.reports.push(report);
    }

    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
