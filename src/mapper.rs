//! Schema Mapper - binds ontology entities to physical tables and watches them for drift
//!
//! `SchemaMapper` is the entry point of the crate. It borrows an ontology and
//! exposes the binding lifecycle:
//! 1. `create_binding` - entity → table, explicit or default column mappings
//! 2. `validate_binding` - structural self-consistency, reported as data
//! 3. `detect_drift` - compare the binding with a schema snapshot
//! 4. `suggest_fix` - candidate remediations for a drift report
//!
//! All operations are pure over their inputs and hold no shared mutable
//! state, so one mapper can serve many bindings, from many threads.

use crate::binding::SchemaBinding;
use crate::config::DriftConfig;
use crate::drift::{DriftDetector, DriftReport};
use crate::error::{OntologyError, Result};
use crate::fix::{Fix, FixSuggester};
use crate::naming::{NameNormalizer, SnakeCaseNormalizer};
use crate::ontology::Ontology;
use crate::schema::SchemaSnapshot;
use crate::validation::{BindingValidator, ValidationResult};
use std::collections::BTreeMap;

pub struct SchemaMapper<'a> {
    ontology: &'a Ontology,
    normalizer: Box<dyn NameNormalizer>,
    config: DriftConfig,
}

impl<'a> SchemaMapper<'a> {
    pub fn new(ontology: &'a Ontology) -> Self {
        Self {
            ontology,
            normalizer: Box::new(SnakeCaseNormalizer),
            config: DriftConfig::default(),
        }
    }

    /// Replace the default snake_case column naming convention.
    pub fn with_normalizer(mut self, normalizer: impl NameNormalizer + 'static) -> Self {
        self.normalizer = Box::new(normalizer);
        self
    }

    pub fn with_config(mut self, config: DriftConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &DriftConfig {
        &self.config
    }

    pub fn create_binding(
        &self,
        entity_name: &str,
        physical_table: &str,
        property_mappings: Option<&BTreeMap<String, String>>,
    ) -> Result<SchemaBinding> {
        let entity = self
            .ontology
            .entity(entity_name)
            .ok_or_else(|| OntologyError::UnknownEntity(entity_name.to_string()))?;

        SchemaBinding::for_entity(
            entity,
            physical_table,
            property_mappings,
            self.normalizer.as_ref(),
        )
    }

    pub fn validate_binding(&self, binding: &SchemaBinding) -> ValidationResult {
        BindingValidator::new(self.ontology).validate(binding)
    }

    pub fn detect_drift<'b>(
        &self,
        binding: &'b SchemaBinding,
        current_schema: &SchemaSnapshot,
    ) -> Result<DriftReport<'b>> {
        DriftDetector::new(
            self.ontology,
            self.normalizer.as_ref(),
            self.config.detector_options(),
        )
        .detect(binding, current_schema)
    }

    /// `detect_drift` over a raw column → type-tag map. Malformed maps fail
    /// with `InvalidSnapshot`.
    pub fn detect_drift_columns<'b, I, K, V>(
        &self,
        binding: &'b SchemaBinding,
        current_schema: I,
    ) -> Result<DriftReport<'b>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let snapshot = SchemaSnapshot::from_columns(current_schema)?;
        self.detect_drift(binding, &snapshot)
    }

    pub fn suggest_fix(&self, drift_report: &DriftReport<'_>) -> Vec<Fix> {
        FixSuggester::new().suggest(drift_report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drift::Severity;
    use crate::naming::VerbatimNormalizer;
    use crate::ontology::{OntologyEntity, OntologyProperty, SemanticType};

    fn ontology() -> Ontology {
        Ontology::new(
            "SupplyChain",
            vec![OntologyEntity::new(
                "Customer",
                vec![
                    OntologyProperty::new("CustomerId", SemanticType::Guid).required(),
                    OntologyProperty::new("RiskScore", SemanticType::Decimal),
                ],
            )],
        )
        .unwrap()
    }

    #[test]
    fn test_unknown_entity() {
        let ontology = ontology();
        let mapper = SchemaMapper::new(&ontology);

        let err = mapper.create_binding("NoSuchEntity", "t", None).unwrap_err();
        assert!(matches!(err, OntologyError::UnknownEntity(ref name) if name == "NoSuchEntity"));
    }

    #[test]
    fn test_custom_normalizer() {
        let ontology = ontology();
        let mapper = SchemaMapper::new(&ontology).with_normalizer(VerbatimNormalizer);

        let binding = mapper.create_binding("Customer", "dbo.customers", None).unwrap();
        assert_eq!(binding.property_mappings["CustomerId"], "CustomerId");

        let report = mapper
            .detect_drift_columns(
                &binding,
                [("CustomerId", "uniqueidentifier"), ("RiskScore", "money")],
            )
            .unwrap();
        assert_eq!(report.severity, Severity::None);
    }

    #[test]
    fn test_config_drives_detection() {
        let ontology = ontology();
        let config = DriftConfig {
            ignore_extra_columns: true,
            min_apply_confidence: 0.8,
        };
        let mapper = SchemaMapper::new(&ontology).with_config(config);
        assert_eq!(mapper.config().min_apply_confidence, 0.8);

        let binding = mapper.create_binding("Customer", "dbo.customers", None).unwrap();
        let report = mapper
            .detect_drift_columns(
                &binding,
                [("customer_id", "GUID"), ("risk_score", "Decimal"), ("segment", "String")],
            )
            .unwrap();
        assert_eq!(report.severity, Severity::None);
    }

    #[test]
    fn test_raw_columns_with_unknown_tag() {
        let ontology = ontology();
        let mapper = SchemaMapper::new(&ontology);
        let binding = mapper.create_binding("Customer", "dbo.customers", None).unwrap();

        let err = mapper
            .detect_drift_columns(&binding, [("customer_id", "GUID"), ("risk_score", "Vector")])
            .unwrap_err();
        assert!(matches!(err, OntologyError::InvalidSnapshot(_)));
    }
}
