//! Beta-test tracker.
//!
//! Each tester walks through a fixed catalog of tests for their role and
//! marks each one working or broken. Pending is never stored: a test with no
//! row is pending, so resetting a tester is just deleting their rows.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{CatalogError, DataError};

const EMBEDDED_CATALOG: &str = include_str!("../../../config/beta_tests.yaml");

static CATALOG: LazyLock<Result<BetaCatalog, String>> =
    LazyLock::new(|| parse_catalog(EMBEDDED_CATALOG).map_err(|e| e.to_string()));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestRole {
    Client,
    Provider,
}

impl TestRole {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TestRole::Client => "client",
            TestRole::Provider => "provider",
        }
    }
}

impl std::fmt::Display for TestRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestRole {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "client" => Ok(TestRole::Client),
            "provider" => Ok(TestRole::Provider),
            other => Err(DataError::Validation(format!("unknown tester role '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Pending,
    Working,
    Broken,
}

impl TestStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TestStatus::Pending => "pending",
            TestStatus::Working => "working",
            TestStatus::Broken => "broken",
        }
    }
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestStatus {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(TestStatus::Pending),
            "working" => Ok(TestStatus::Working),
            "broken" => Ok(TestStatus::Broken),
            other => Err(DataError::Validation(format!("unknown test status '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestDefinition {
    pub id: String,
    pub category: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetaCatalog {
    pub client: Vec<TestDefinition>,
    pub provider: Vec<TestDefinition>,
}

impl BetaCatalog {
    #[must_use]
    pub fn for_role(&self, role: TestRole) -> &[TestDefinition] {
        match role {
            TestRole::Client => &self.client,
            TestRole::Provider => &self.provider,
        }
    }

    #[must_use]
    pub fn find(&self, role: TestRole, test_id: &str) -> Option<&TestDefinition> {
        self.for_role(role).iter().find(|t| t.id == test_id)
    }
}

/// Parses and validates a catalog document.
///
/// # Errors
///
/// Returns [`CatalogError::Parse`] for malformed YAML and
/// [`CatalogError::Validation`] for blank fields or duplicate ids.
pub fn parse_catalog(yaml: &str) -> Result<BetaCatalog, CatalogError> {
    let catalog: BetaCatalog = serde_yaml::from_str(yaml)?;
    validate_catalog(&catalog)?;
    Ok(catalog)
}

fn validate_catalog(catalog: &BetaCatalog) -> Result<(), CatalogError> {
    let mut seen = HashSet::new();
    for role in [TestRole::Client, TestRole::Provider] {
        let tests = catalog.for_role(role);
        if tests.is_empty() {
            return Err(CatalogError::Validation(format!(
                "{role} catalog must not be empty"
            )));
        }
        for test in tests {
            if test.id.trim().is_empty() || test.name.trim().is_empty() {
                return Err(CatalogError::Validation(format!(
                    "{role} catalog has a test with a blank id or name"
                )));
            }
            if !seen.insert(test.id.as_str()) {
                return Err(CatalogError::Validation(format!(
                    "duplicate test id '{}'",
                    test.id
                )));
            }
        }
    }
    Ok(())
}

/// The catalog compiled into the binary.
///
/// # Errors
///
/// Returns [`DataError::Unknown`] if the embedded document is invalid.
pub fn embedded_catalog() -> Result<&'static BetaCatalog, DataError> {
    CATALOG
        .as_ref()
        .map_err(|e| DataError::Unknown(format!("embedded beta catalog is invalid: {e}")))
}

/// One persisted result, keyed by `(user_id, test_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetaTestResult {
    pub user_id: Uuid,
    pub test_id: String,
    pub role: TestRole,
    pub status: TestStatus,
    pub comment: Option<String>,
    pub device_info: Option<String>,
    pub tested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TestAction {
    MarkWorking,
    MarkBroken {
        #[serde(default)]
        comment: String,
    },
}

/// One tester's results for one role.
#[derive(Debug, Clone)]
pub struct TrackerState {
    user_id: Uuid,
    role: TestRole,
    results: BTreeMap<String, BetaTestResult>,
}

impl TrackerState {
    /// Builds the state from stored rows, ignoring rows of other users or roles.
    #[must_use]
    pub fn new(user_id: Uuid, role: TestRole, rows: Vec<BetaTestResult>) -> Self {
        let results = rows
            .into_iter()
            .filter(|r| r.user_id == user_id && r.role == role)
            .map(|r| (r.test_id.clone(), r))
            .collect();
        Self {
            user_id,
            role,
            results,
        }
    }

    /// Status of a test; a test without a row is pending.
    #[must_use]
    pub fn status(&self, test_id: &str) -> TestStatus {
        self.results
            .get(test_id)
            .map_or(TestStatus::Pending, |r| r.status)
    }

    #[must_use]
    pub fn result(&self, test_id: &str) -> Option<&BetaTestResult> {
        self.results.get(test_id)
    }

    /// Persisted rows, ordered by test id.
    pub fn rows(&self) -> impl Iterator<Item = &BetaTestResult> {
        self.results.values()
    }

    /// Applies an action and returns the row to upsert.
    ///
    /// Marking working keeps any earlier comment: the local row holds on to
    /// it and the returned row carries no comment, so storage leaves the
    /// stored one untouched. Marking broken replaces it with the submitted
    /// one, which may be empty.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Validation`] when the test is not in this role's
    /// catalog.
    pub fn apply(
        &mut self,
        catalog: &BetaCatalog,
        test_id: &str,
        action: TestAction,
        now: DateTime<Utc>,
        device_info: Option<String>,
    ) -> Result<BetaTestResult, DataError> {
        if catalog.find(self.role, test_id).is_none() {
            return Err(DataError::Validation(format!(
                "test '{test_id}' is not part of the {} catalog",
                self.role
            )));
        }

        let previous_comment = self.results.get(test_id).and_then(|r| r.comment.clone());
        let (status, comment, kept_comment) = match action {
            TestAction::MarkWorking => (TestStatus::Working, None, previous_comment),
            TestAction::MarkBroken { comment } => {
                (TestStatus::Broken, Some(comment.clone()), Some(comment))
            }
        };

        let row = BetaTestResult {
            user_id: self.user_id,
            test_id: test_id.to_string(),
            role: self.role,
            status,
            comment,
            device_info,
            tested_at: now,
        };
        self.results.insert(
            test_id.to_string(),
            BetaTestResult {
                comment: kept_comment,
                ..row.clone()
            },
        );
        Ok(row)
    }

    /// Drops every row; all tests go back to pending. Returns how many rows
    /// were cleared.
    pub fn reset(&mut self) -> usize {
        let cleared = self.results.len();
        self.results.clear();
        cleared
    }

    #[must_use]
    pub fn counts(&self, catalog: &BetaCatalog) -> StatusCounts {
        StatusCounts::tally(catalog.for_role(self.role).len(), self.results.values())
    }
}

/// `round(100 × (working + broken) / total)`, zero when there are no tests.
#[must_use]
pub fn completion_rate(working: usize, broken: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let done = (working + broken).min(total);
    // Integer round-half-up of 100 * done / total.
    let rate = (200 * done + total) / (2 * total);
    u32::try_from(rate).unwrap_or(100)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub total: usize,
    pub pending: usize,
    pub working: usize,
    pub broken: usize,
    pub completion_rate: u32,
}

impl StatusCounts {
    fn tally<'a>(total: usize, rows: impl Iterator<Item = &'a BetaTestResult>) -> Self {
        let mut working = 0;
        let mut broken = 0;
        for row in rows {
            match row.status {
                TestStatus::Working => working += 1,
                TestStatus::Broken => broken += 1,
                TestStatus::Pending => {}
            }
        }
        Self::from_parts(total, working, broken)
    }

    fn from_parts(total: usize, working: usize, broken: usize) -> Self {
        Self {
            total,
            pending: total.saturating_sub(working + broken),
            working,
            broken,
            completion_rate: completion_rate(working, broken, total),
        }
    }

    fn add(self, other: Self) -> Self {
        Self::from_parts(
            self.total + other.total,
            self.working + other.working,
            self.broken + other.broken,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TesterSummary {
    pub user_id: Uuid,
    pub roles: Vec<TestRole>,
    pub counts: StatusCounts,
    pub last_tested_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetaOverview {
    pub testers: usize,
    pub counts: StatusCounts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokenReport {
    pub user_id: Uuid,
    pub role: TestRole,
    pub test_id: String,
    pub test_name: Option<String>,
    pub comment: Option<String>,
    pub device_info: Option<String>,
    pub tested_at: DateTime<Utc>,
}

/// Per-tester counts across every role the tester has results for.
///
/// A tester's total is the size of the catalog of each role they tested;
/// rows for tests no longer in the catalog are ignored. Sorted by most
/// recent activity first.
#[must_use]
pub fn summarize_testers(rows: &[BetaTestResult], catalog: &BetaCatalog) -> Vec<TesterSummary> {
    let mut grouped: HashMap<Uuid, BTreeMap<TestRole, Vec<&BetaTestResult>>> = HashMap::new();
    for row in rows {
        if catalog.find(row.role, &row.test_id).is_none() {
            tracing::debug!(test_id = %row.test_id, role = %row.role, "ignoring result for unknown test");
            continue;
        }
        grouped
            .entry(row.user_id)
            .or_default()
            .entry(row.role)
            .or_default()
            .push(row);
    }

    let mut summaries: Vec<TesterSummary> = grouped
        .into_iter()
        .map(|(user_id, by_role)| {
            let mut counts = StatusCounts::default();
            let mut last_tested_at = None;
            for (role, role_rows) in &by_role {
                let role_counts =
                    StatusCounts::tally(catalog.for_role(*role).len(), role_rows.iter().copied());
                counts = counts.add(role_counts);
                last_tested_at = role_rows
                    .iter()
                    .map(|r| r.tested_at)
                    .chain(last_tested_at)
                    .max();
            }
            TesterSummary {
                user_id,
                roles: by_role.keys().copied().collect(),
                counts,
                last_tested_at,
            }
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.last_tested_at
            .cmp(&a.last_tested_at)
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    summaries
}

/// Global counts across all testers.
#[must_use]
pub fn overview(summaries: &[TesterSummary]) -> BetaOverview {
    BetaOverview {
        testers: summaries.len(),
        counts: summaries
            .iter()
            .fold(StatusCounts::default(), |acc, s| acc.add(s.counts)),
    }
}

/// Broken results with their comments, newest first.
#[must_use]
pub fn broken_reports(rows: &[BetaTestResult], catalog: &BetaCatalog) -> Vec<BrokenReport> {
    let mut reports: Vec<BrokenReport> = rows
        .iter()
        .filter(|r| r.status == TestStatus::Broken)
        .map(|r| BrokenReport {
            user_id: r.user_id,
            role: r.role,
            test_id: r.test_id.clone(),
            test_name: catalog.find(r.role, &r.test_id).map(|t| t.name.clone()),
            comment: r.comment.clone(),
            device_info: r.device_info.clone(),
            tested_at: r.tested_at,
        })
        .collect();
    reports.sort_by(|a, b| b.tested_at.cmp(&a.tested_at));
    reports
}

#[cfg(test)]
#[path = "beta_test.rs"]
mod tests;
