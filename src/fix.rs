//! Remediation proposals for drift reports
//!
//! Fixes are suggestions. Nothing here changes a binding; callers apply the
//! fixes they accept with `SchemaBinding::apply_fix`.

use crate::drift::{DriftFinding, DriftKind, DriftReport};
use crate::similarity::RENAME_THRESHOLD;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    pub property_name: String,
    pub current_mapping: String,
    /// `None` means no automatic suggestion: the property needs human input
    pub suggested_mapping: Option<String>,
    /// 0.0 – 1.0, the similarity that selected `suggested_mapping`
    pub confidence: f64,
    pub rationale: String,
}

impl Fix {
    pub fn is_actionable(&self) -> bool {
        self.suggested_mapping.is_some()
    }
}

pub struct FixSuggester;

impl FixSuggester {
    pub fn new() -> Self {
        Self
    }

    /// One fix per `MISSING_COLUMN`, in finding order.
    pub fn suggest(&self, report: &DriftReport<'_>) -> Vec<Fix> {
        let mut fixes = Vec::new();

        for (idx, finding) in report.findings.iter().enumerate() {
            if finding.kind != DriftKind::MissingColumn {
                continue;
            }
            let (Some(property), Some(expected)) =
                (&finding.property_name, &finding.expected_column)
            else {
                continue;
            };

            let candidate = report.findings[idx + 1..]
                .iter()
                .take_while(|f| f.kind != DriftKind::MissingColumn)
                .find(|f| is_candidate_for(f, property));

            let fix = match candidate {
                Some(found) => {
                    let observed = found.observed_column.clone().unwrap_or_default();
                    let confidence = found.similarity.unwrap_or(0.0);
                    Fix {
                        property_name: property.clone(),
                        current_mapping: expected.clone(),
                        rationale: format!(
                            "Column '{}' is missing from {}; '{}' is an unclaimed compatible column with similarity {:.2}",
                            expected, report.binding.physical_table, observed, confidence
                        ),
                        suggested_mapping: Some(observed),
                        confidence,
                    }
                }
                None => Fix {
                    property_name: property.clone(),
                    current_mapping: expected.clone(),
                    suggested_mapping: None,
                    confidence: 0.0,
                    rationale: format!(
                        "Column '{}' is missing from {} and no compatible column reaches similarity {:.2}; check whether it was renamed or deleted",
                        expected, report.binding.physical_table, RENAME_THRESHOLD
                    ),
                },
            };
            fixes.push(fix);
        }

        fixes
    }
}

impl Default for FixSuggester {
    fn default() -> Self {
        Self::new()
    }
}

fn is_candidate_for(finding: &DriftFinding, property: &str) -> bool {
    finding.kind == DriftKind::RenamedCandidate
        && finding.property_name.as_deref() == Some(property)
        && finding.observed_column.is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{SchemaBinding, SourceType};
    use crate::drift::Severity;
    use std::collections::BTreeMap;

    fn finding(
        kind: DriftKind,
        property: &str,
        observed: Option<&str>,
        similarity: Option<f64>,
    ) -> DriftFinding {
        DriftFinding {
            kind,
            property_name: Some(property.to_string()),
            expected_column: Some(property.to_lowercase()),
            observed_column: observed.map(str::to_string),
            detail: String::new(),
            severity: kind.severity(true),
            similarity,
        }
    }

    fn binding() -> SchemaBinding {
        SchemaBinding {
            entity_name: "Warehouse".to_string(),
            physical_table: "dbo.warehouses".to_string(),
            property_mappings: BTreeMap::new(),
            source_type: SourceType::Sql,
        }
    }

    #[test]
    fn test_fix_from_rename_candidate_and_without() {
        let binding = binding();
        let report = DriftReport {
            binding: &binding,
            severity: Severity::Critical,
            findings: vec![
                finding(DriftKind::MissingColumn, "Location", None, None),
                finding(DriftKind::RenamedCandidate, "Location", Some("facility_id"), Some(0.67)),
                finding(DriftKind::MissingColumn, "Capacity", None, None),
            ],
            message: String::new(),
        };

        let fixes = FixSuggester::new().suggest(&report);
        assert_eq!(fixes.len(), 2);

        assert_eq!(fixes[0].property_name, "Location");
        assert_eq!(fixes[0].current_mapping, "location");
        assert_eq!(fixes[0].suggested_mapping.as_deref(), Some("facility_id"));
        assert_eq!(fixes[0].confidence, 0.67);
        assert!(fixes[0].is_actionable());

        assert_eq!(fixes[1].property_name, "Capacity");
        assert_eq!(fixes[1].suggested_mapping, None);
        assert_eq!(fixes[1].confidence, 0.0);
        assert!(!fixes[1].is_actionable());
    }

    #[test]
    fn test_no_fixes_for_mismatch_or_extra() {
        let binding = binding();
        let report = DriftReport {
            binding: &binding,
            severity: Severity::High,
            findings: vec![finding(DriftKind::TypeMismatch, "Location", Some("location"), None)],
            message: String::new(),
        };

        assert!(FixSuggester::default().suggest(&report).is_empty());
    }
}
