//! Drift detection: binding expectations vs. an observed schema snapshot
//!
//! Drift is never an error. Every divergence becomes a `DriftFinding` and the
//! report's `Severity` tells the caller how urgent it is.

use crate::binding::SchemaBinding;
use crate::error::{OntologyError, Result};
use crate::naming::NameNormalizer;
use crate::ontology::{Ontology, OntologyProperty};
use crate::schema::{column_key, SchemaSnapshot};
use crate::similarity;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, warn};

/// Ordered urgency, `None` lowest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::None => write!(f, "NONE"),
            Severity::Low => write!(f, "LOW"),
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::High => write!(f, "HIGH"),
            Severity::Critical => write!(f, "CRITICAL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DriftKind {
    MissingColumn,
    TypeMismatch,
    ExtraColumn,
    RenamedCandidate,
}

impl DriftKind {
    /// Severity a finding of this kind contributes to a report.
    pub fn severity(self, required: bool) -> Severity {
        match (self, required) {
            (DriftKind::MissingColumn, true) => Severity::Critical,
            (DriftKind::TypeMismatch, true) => Severity::High,
            (DriftKind::MissingColumn | DriftKind::TypeMismatch, false) => Severity::Medium,
            (DriftKind::ExtraColumn | DriftKind::RenamedCandidate, _) => Severity::Low,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftFinding {
    pub kind: DriftKind,
    /// Absent for `EXTRA_COLUMN`, which belongs to no property
    pub property_name: Option<String>,
    pub expected_column: Option<String>,
    pub observed_column: Option<String>,
    pub detail: String,
    pub severity: Severity,
    /// Rename candidates only: the name similarity that selected the column
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriftReport<'a> {
    pub binding: &'a SchemaBinding,
    pub severity: Severity,
    pub findings: Vec<DriftFinding>,
    pub message: String,
}

impl DriftReport<'_> {
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }

    pub fn findings_of(&self, kind: DriftKind) -> impl Iterator<Item = &DriftFinding> + '_ {
        self.findings.iter().filter(move |f| f.kind == kind)
    }
}

/// Options that shape detection without touching the classification rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetectorOptions {
    /// Do not emit `EXTRA_COLUMN` findings
    pub ignore_extra_columns: bool,
}

pub struct DriftDetector<'a> {
    ontology: &'a Ontology,
    normalizer: &'a dyn NameNormalizer,
    options: DetectorOptions,
}

impl<'a> DriftDetector<'a> {
    pub fn new(
        ontology: &'a Ontology,
        normalizer: &'a dyn NameNormalizer,
        options: DetectorOptions,
    ) -> Self {
        Self {
            ontology,
            normalizer,
            options,
        }
    }

    pub fn detect<'b>(
        &self,
        binding: &'b SchemaBinding,
        snapshot: &SchemaSnapshot,
    ) -> Result<DriftReport<'b>> {
        let entity = self
            .ontology
            .entity(&binding.entity_name)
            .ok_or_else(|| OntologyError::UnknownEntity(binding.entity_name.clone()))?;

        let resolved: Vec<(&OntologyProperty, String)> = entity
            .properties
            .iter()
            .map(|p| (p, binding.column_for(&p.name, self.normalizer)))
            .collect();

        // Snapshot columns some property already points at
        let mut claimed: HashSet<String> = resolved
            .iter()
            .map(|(_, column)| column_key(column))
            .filter(|key| snapshot.contains(key))
            .collect();

        let mut findings = Vec::new();

        for (prop, column) in &resolved {
            match snapshot.get(column) {
                None => {
                    findings.push(DriftFinding {
                        kind: DriftKind::MissingColumn,
                        property_name: Some(prop.name.clone()),
                        expected_column: Some(column.clone()),
                        observed_column: None,
                        detail: format!(
                            "{} property '{}' expects column '{}' which is missing from {}",
                            if prop.required { "Required" } else { "Optional" },
                            prop.name,
                            column,
                            binding.physical_table
                        ),
                        severity: DriftKind::MissingColumn.severity(prop.required),
                        similarity: None,
                    });

                    if let Some(candidate) = self.rename_candidate(prop, column, snapshot, &claimed)
                    {
                        claimed.insert(column_key(&candidate.observed));
                        findings.push(DriftFinding {
                            kind: DriftKind::RenamedCandidate,
                            property_name: Some(prop.name.clone()),
                            expected_column: Some(column.clone()),
                            observed_column: Some(candidate.observed.clone()),
                            detail: format!(
                                "Column '{}' may have been renamed to '{}' (similarity {:.2})",
                                column, candidate.observed, candidate.score
                            ),
                            severity: DriftKind::RenamedCandidate.severity(prop.required),
                            similarity: Some(candidate.score),
                        });
                    }
                }
                Some(observed) if !prop.data_type.accepts(observed.physical_type) => {
                    findings.push(DriftFinding {
                        kind: DriftKind::TypeMismatch,
                        property_name: Some(prop.name.clone()),
                        expected_column: Some(column.clone()),
                        observed_column: Some(observed.name.clone()),
                        detail: format!(
                            "Column '{}' is {} but property '{}' is declared {}",
                            observed.name, observed.physical_type, prop.name, prop.data_type
                        ),
                        severity: DriftKind::TypeMismatch.severity(prop.required),
                        similarity: None,
                    });
                }
                Some(_) => {}
            }
        }

        if !self.options.ignore_extra_columns {
            // Bound columns and chosen rename candidates are both claimed
            for column in snapshot.columns() {
                if claimed.contains(&column_key(&column.name)) {
                    continue;
                }
                findings.push(DriftFinding {
                    kind: DriftKind::ExtraColumn,
                    property_name: None,
                    expected_column: None,
                    observed_column: Some(column.name.clone()),
                    detail: format!(
                        "Column '{}' ({}) in {} is not bound to any property",
                        column.name, column.physical_type, binding.physical_table
                    ),
                    severity: DriftKind::ExtraColumn.severity(false),
                    similarity: None,
                });
            }
        }

        for finding in &findings {
            debug!("{:?} [{}]: {}", finding.kind, finding.severity, finding.detail);
        }

        let severity = findings
            .iter()
            .map(|f| f.severity)
            .max()
            .unwrap_or(Severity::None);
        let message = findings
            .iter()
            .find(|f| f.severity == severity)
            .map(|f| format!("{}: {}", severity, f.detail))
            .unwrap_or_else(|| "No drift detected".to_string());

        if severity == Severity::Critical {
            warn!("Critical drift on {}: {}", binding.entity_name, message);
        }

        Ok(DriftReport {
            binding,
            severity,
            findings,
            message,
        })
    }

    /// Best unclaimed, type-compatible column for a missing one.
    fn rename_candidate(
        &self,
        prop: &OntologyProperty,
        missing: &str,
        snapshot: &SchemaSnapshot,
        claimed: &HashSet<String>,
    ) -> Option<RenameCandidate> {
        let candidates: Vec<&str> = snapshot
            .columns()
            .iter()
            .filter(|c| !claimed.contains(&column_key(&c.name)))
            .filter(|c| prop.data_type.accepts(c.physical_type))
            .map(|c| c.name.as_str())
            .collect();

        similarity::best_match(missing, candidates.iter().copied()).map(|(idx, score)| {
            RenameCandidate {
                observed: candidates[idx].to_string(),
                score: score.score,
            }
        })
    }
}

struct RenameCandidate {
    observed: String,
    score: f64,
}
