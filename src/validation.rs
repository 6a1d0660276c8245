//! Structural validation of a binding before it is trusted
//!
//! Validation fails often while bindings are being authored, so every issue is
//! reported as data in `ValidationResult` and nothing here returns an error.

use crate::binding::SchemaBinding;
use crate::ontology::Ontology;
use crate::schema::column_key;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Characters that would split a table identifier when bindings are written
/// as `entity = table: column, ...` style configuration.
const MAPPING_SEPARATORS: &[char] = &['=', ':', ',', ';', '|', '\n', '\r', '\t'];

/// A reason a binding cannot be trusted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindingProblem {
    #[error("Entity '{0}' not found in ontology")]
    UnknownEntity(String),

    #[error("Required property '{0}' has no column mapping")]
    UnmappedRequired(String),

    #[error("Ambiguous binding: properties {properties} all map to column '{column}'")]
    AmbiguousBinding { column: String, properties: String },

    #[error("Physical table '{0}' is malformed: {1}")]
    MalformedTable(String, String),

    #[error("Property '{0}' is mapped but not declared by entity '{1}'")]
    DanglingMapping(String, String),

    #[error("Property '{0}' maps to an empty column name")]
    EmptyColumn(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub ok: bool,
    pub problems: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

pub struct BindingValidator<'a> {
    ontology: &'a Ontology,
}

impl<'a> BindingValidator<'a> {
    pub fn new(ontology: &'a Ontology) -> Self {
        Self { ontology }
    }

    pub fn validate(&self, binding: &SchemaBinding) -> ValidationResult {
        let problems = self.problems(binding);
        let warnings = self.warnings(binding);

        ValidationResult {
            ok: problems.is_empty(),
            problems: problems.iter().map(|p| p.to_string()).collect(),
            warnings,
        }
    }

    /// Problems in a fixed order: table, entity, mappings (entity property
    /// order, then undeclared names), ambiguity.
    pub fn problems(&self, binding: &SchemaBinding) -> Vec<BindingProblem> {
        let mut problems = Vec::new();

        if let Some(reason) = table_defect(&binding.physical_table) {
            problems.push(BindingProblem::MalformedTable(
                binding.physical_table.clone(),
                reason.to_string(),
            ));
        }

        let entity = match self.ontology.entity(&binding.entity_name) {
            Some(entity) => entity,
            None => {
                problems.push(BindingProblem::UnknownEntity(binding.entity_name.clone()));
                return problems;
            }
        };

        for prop in &entity.properties {
            match binding.property_mappings.get(&prop.name) {
                None if prop.required => {
                    problems.push(BindingProblem::UnmappedRequired(prop.name.clone()))
                }
                Some(column) if column.trim().is_empty() => {
                    problems.push(BindingProblem::EmptyColumn(prop.name.clone()))
                }
                _ => {}
            }
        }

        for name in binding.property_mappings.keys() {
            if entity.property(name).is_none() {
                problems.push(BindingProblem::DanglingMapping(
                    name.clone(),
                    entity.name.clone(),
                ));
            }
        }

        // column key → properties, first-seen column order
        let mut by_column: Vec<(String, Vec<&str>)> = Vec::new();
        let mut slots: HashMap<String, usize> = HashMap::new();
        for prop in &entity.properties {
            let Some(column) = binding.property_mappings.get(&prop.name) else {
                continue;
            };
            if column.trim().is_empty() {
                continue;
            }
            let key = column_key(column);
            match slots.get(&key) {
                Some(&slot) => by_column[slot].1.push(&prop.name),
                None => {
                    slots.insert(key, by_column.len());
                    by_column.push((column.trim().to_string(), vec![prop.name.as_str()]));
                }
            }
        }
        for (column, properties) in by_column {
            if properties.len() > 1 {
                problems.push(BindingProblem::AmbiguousBinding {
                    column,
                    properties: properties.iter().map(|p| format!("'{}'", p)).join(", "),
                });
            }
        }

        problems
    }

    fn warnings(&self, binding: &SchemaBinding) -> Vec<String> {
        let Some(entity) = self.ontology.entity(&binding.entity_name) else {
            return Vec::new();
        };

        entity
            .properties
            .iter()
            .filter(|p| !p.required && !binding.property_mappings.contains_key(&p.name))
            .map(|p| {
                format!(
                    "Optional property '{}' has no explicit mapping; the default column name will be used",
                    p.name
                )
            })
            .collect()
    }
}

fn table_defect(table: &str) -> Option<&'static str> {
    if table.trim().is_empty() {
        return Some("empty identifier");
    }
    if table.contains(MAPPING_SEPARATORS) {
        return Some("contains a mapping separator");
    }
    if table.trim().split('.').any(|segment| segment.trim().is_empty()) {
        return Some("empty dotted segment");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::SourceType;
    use crate::ontology::{OntologyEntity, OntologyProperty, SemanticType};
    use std::collections::BTreeMap;

    fn ontology() -> Ontology {
        Ontology::new(
            "SupplyChain",
            vec![OntologyEntity::new(
                "Shipment",
                vec![
                    OntologyProperty::new("ShipmentId", SemanticType::Guid).required(),
                    OntologyProperty::new("Status", SemanticType::String).required(),
                    OntologyProperty::new("Temperature", SemanticType::Decimal),
                ],
            )],
        )
        .unwrap()
    }

    fn binding(table: &str, mappings: &[(&str, &str)]) -> SchemaBinding {
        SchemaBinding {
            entity_name: "Shipment".to_string(),
            physical_table: table.to_string(),
            property_mappings: mappings
                .iter()
                .map(|(p, c)| (p.to_string(), c.to_string()))
                .collect::<BTreeMap<_, _>>(),
            source_type: SourceType::Sql,
        }
    }

    #[test]
    fn test_valid_binding() {
        let ontology = ontology();
        let result = BindingValidator::new(&ontology).validate(&binding(
            "dbo.shipments",
            &[
                ("ShipmentId", "shipment_id"),
                ("Status", "status"),
                ("Temperature", "temperature"),
            ],
        ));

        assert!(result.ok);
        assert!(result.problems.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_ambiguous_binding() {
        let ontology = ontology();
        let validator = BindingValidator::new(&ontology);
        let b = binding(
            "dbo.shipments",
            &[
                ("ShipmentId", "shipment_id"),
                ("Status", "Shipment_ID"),
                ("Temperature", "temperature"),
            ],
        );

        let problems = validator.problems(&b);
        assert_eq!(problems.len(), 1);
        assert!(matches!(problems[0], BindingProblem::AmbiguousBinding { .. }));

        let result = validator.validate(&b);
        assert!(!result.ok);
        assert!(result.problems[0].contains("'ShipmentId', 'Status'"));
    }

    #[test]
    fn test_unmapped_required_and_optional_warning() {
        let ontology = ontology();
        let result = BindingValidator::new(&ontology)
            .validate(&binding("dbo.shipments", &[("ShipmentId", "shipment_id")]));

        assert!(!result.ok);
        assert_eq!(result.problems, vec!["Required property 'Status' has no column mapping"]);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("Temperature"));
    }

    #[test]
    fn test_blank_column_mapping() {
        let ontology = ontology();
        let validator = BindingValidator::new(&ontology);
        let b = binding(
            "dbo.shipments",
            &[("ShipmentId", "  "), ("Status", "status")],
        );

        assert_eq!(
            validator.problems(&b),
            vec![BindingProblem::EmptyColumn("ShipmentId".to_string())]
        );
        let result = validator.validate(&b);
        assert!(!result.ok);
        assert_eq!(
            result.problems,
            vec!["Property 'ShipmentId' maps to an empty column name"]
        );
    }

    #[test]
    fn test_malformed_tables() {
        assert_eq!(table_defect("dbo.shipments"), None);
        assert_eq!(table_defect("SQL.dbo.customers"), None);
        assert!(table_defect("").is_some());
        assert!(table_defect("dbo.shipments=status").is_some());
        assert!(table_defect("dbo..shipments").is_some());
        assert!(table_defect("shipments.").is_some());
    }

    #[test]
    fn test_unknown_entity_and_dangling_mapping() {
        let ontology = ontology();
        let validator = BindingValidator::new(&ontology);

        let mut unknown = binding("dbo.customers", &[]);
        unknown.entity_name = "Customer".to_string();
        assert_eq!(
            validator.problems(&unknown),
            vec![BindingProblem::UnknownEntity("Customer".to_string())]
        );

        let dangling = binding(
            "dbo.shipments",
            &[
                ("ShipmentId", "shipment_id"),
                ("Status", "status"),
                ("Carrier", "carrier"),
            ],
        );
        assert_eq!(
            validator.problems(&dangling),
            vec![BindingProblem::DanglingMapping(
                "Carrier".to_string(),
                "Shipment".to_string()
            )]
        );
    }
}
