//! Schema bindings: one ontology entity → one physical table

use crate::error::{OntologyError, Result};
use crate::fix::Fix;
use crate::naming::NameNormalizer;
use crate::ontology::{Ontology, OntologyEntity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use tracing::debug;

/// Kind of physical source a binding points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    #[default]
    Sql,
    AzureSql,
    Fabric,
}

impl SourceType {
    pub fn detect(physical_table: &str) -> Self {
        let lower = physical_table.to_lowercase();
        if lower.contains("azure") || lower.contains("sql") {
            SourceType::AzureSql
        } else if lower.contains("fabric") || lower.contains("onelake") {
            SourceType::Fabric
        } else {
            SourceType::Sql
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceType::Sql => write!(f, "sql"),
            SourceType::AzureSql => write!(f, "azure_sql"),
            SourceType::Fabric => write!(f, "fabric"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaBinding {
    pub entity_name: String,
    /// Opaque table identifier, e.g. `"dbo.shipments"`
    pub physical_table: String,
    /// Logical property name → physical column name
    #[serde(default)]
    pub property_mappings: BTreeMap<String, String>,
    #[serde(default)]
    pub source_type: SourceType,
}

impl SchemaBinding {
    /// Build a binding for `entity`. Properties missing from `overrides` are
    /// mapped through `normalizer`.
    pub fn for_entity(
        entity: &OntologyEntity,
        physical_table: &str,
        overrides: Option<&BTreeMap<String, String>>,
        normalizer: &dyn NameNormalizer,
    ) -> Result<Self> {
        let physical_table = physical_table.trim();
        if physical_table.is_empty() {
            return Err(OntologyError::InvalidBinding(format!(
                "Empty physical table for entity '{}'",
                entity.name
            )));
        }

        let mut property_mappings = BTreeMap::new();
        for prop in &entity.properties {
            let column = overrides
                .and_then(|o| o.get(&prop.name))
                .cloned()
                .unwrap_or_else(|| normalizer.column_name(&prop.name));
            property_mappings.insert(prop.name.clone(), column);
        }

        // Overrides for names the entity does not declare are kept so the
        // validator can report them as dangling.
        if let Some(overrides) = overrides {
            for (prop, column) in overrides {
                property_mappings
                    .entry(prop.clone())
                    .or_insert_with(|| column.clone());
            }
        }

        debug!(
            "Created binding: {} -> {} ({} mappings)",
            entity.name,
            physical_table,
            property_mappings.len()
        );

        Ok(Self {
            entity_name: entity.name.clone(),
            physical_table: physical_table.to_string(),
            property_mappings,
            source_type: SourceType::detect(physical_table),
        })
    }

    /// Column the binding expects for `property`, falling back to the
    /// default mapping when the property was never mapped explicitly.
    pub fn column_for(&self, property: &str, normalizer: &dyn NameNormalizer) -> String {
        self.property_mappings
            .get(property)
            .cloned()
            .unwrap_or_else(|| normalizer.column_name(property))
    }

    /// Point a property at the column a `Fix` suggests.
    pub fn apply_fix(&mut self, fix: &Fix) -> Result<()> {
        let suggested = fix.suggested_mapping.as_ref().ok_or_else(|| {
            OntologyError::FixNotApplicable(format!(
                "No suggested column for property '{}'",
                fix.property_name
            ))
        })?;

        if let Some(current) = self.property_mappings.get(&fix.property_name) {
            if current != &fix.current_mapping {
                return Err(OntologyError::FixNotApplicable(format!(
                    "Property '{}' maps to '{}', fix expected '{}'",
                    fix.property_name, current, fix.current_mapping
                )));
            }
        }

        debug!(
            "Applying fix on {}: {} -> {}",
            self.entity_name, fix.current_mapping, suggested
        );
        self.property_mappings
            .insert(fix.property_name.clone(), suggested.clone());
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path.as_ref(), serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OntologyRef {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingEntry {
    pub source: String,
    pub source_type: SourceType,
    pub mappings: BTreeMap<String, String>,
}

/// All bindings of one ontology, persisted as YAML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingSet {
    pub ontology: OntologyRef,
    #[serde(default)]
    pub entities: BTreeMap<String, BindingEntry>,
}

impl BindingSet {
    pub fn new(ontology: &Ontology) -> Self {
        Self {
            ontology: OntologyRef {
                name: ontology.name.clone(),
                version: ontology.version.clone(),
            },
            entities: BTreeMap::new(),
        }
    }

    /// Add or replace the binding of an entity.
    pub fn insert(&mut self, binding: &SchemaBinding) {
        self.entities.insert(
            binding.entity_name.clone(),
            BindingEntry {
                source: binding.physical_table.clone(),
                source_type: binding.source_type,
                mappings: binding.property_mappings.clone(),
            },
        );
    }

    pub fn binding(&self, entity_name: &str) -> Option<SchemaBinding> {
        self.entities.get(entity_name).map(|entry| SchemaBinding {
            entity_name: entity_name.to_string(),
            physical_table: entry.source.clone(),
            property_mappings: entry.mappings.clone(),
            source_type: entry.source_type,
        })
    }

    pub fn bindings(&self) -> Vec<SchemaBinding> {
        self.entities
            .keys()
            .filter_map(|name| self.binding(name))
            .collect()
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::SnakeCaseNormalizer;
    use crate::ontology::{OntologyProperty, SemanticType};

    fn shipment() -> OntologyEntity {
        OntologyEntity::new(
            "Shipment",
            vec![
                OntologyProperty::new("ShipmentId", SemanticType::Guid).required(),
                OntologyProperty::new("WarehouseLocation", SemanticType::String).required(),
                OntologyProperty::new("Temperature", SemanticType::Decimal),
            ],
        )
    }

    #[test]
    fn test_default_mappings() {
        let binding =
            SchemaBinding::for_entity(&shipment(), "dbo.shipments", None, &SnakeCaseNormalizer)
                .unwrap();

        assert_eq!(binding.property_mappings["ShipmentId"], "shipment_id");
        assert_eq!(binding.property_mappings["WarehouseLocation"], "warehouse_location");
        assert_eq!(binding.property_mappings["Temperature"], "temperature");
        assert_eq!(binding.source_type, SourceType::Sql);
    }

    #[test]
    fn test_partial_overrides_keep_defaults() {
        let overrides = BTreeMap::from([("Temperature".to_string(), "temp_c".to_string())]);
        let binding = SchemaBinding::for_entity(
            &shipment(),
            "dbo.shipments",
            Some(&overrides),
            &SnakeCaseNormalizer,
        )
        .unwrap();

        assert_eq!(binding.property_mappings["Temperature"], "temp_c");
        assert_eq!(binding.property_mappings["ShipmentId"], "shipment_id");
        assert_eq!(binding.property_mappings.len(), 3);
    }

    #[test]
    fn test_empty_table_rejected() {
        let err = SchemaBinding::for_entity(&shipment(), "  ", None, &SnakeCaseNormalizer)
            .unwrap_err();
        assert!(matches!(err, OntologyError::InvalidBinding(_)));
    }

    #[test]
    fn test_source_type_detection() {
        assert_eq!(SourceType::detect("SQL.dbo.customers"), SourceType::AzureSql);
        assert_eq!(SourceType::detect("onelake.sales.orders"), SourceType::Fabric);
        assert_eq!(SourceType::detect("dbo.shipments"), SourceType::Sql);
        // sql wins over fabric
        assert_eq!(SourceType::detect("fabric_sql.dbo.orders"), SourceType::AzureSql);
    }

    #[test]
    fn test_apply_fix() {
        let mut binding =
            SchemaBinding::for_entity(&shipment(), "dbo.shipments", None, &SnakeCaseNormalizer)
                .unwrap();
        let fix = Fix {
            property_name: "WarehouseLocation".to_string(),
            current_mapping: "warehouse_location".to_string(),
            suggested_mapping: Some("facility_id".to_string()),
            confidence: 0.67,
            rationale: String::new(),
        };

        binding.apply_fix(&fix).unwrap();
        assert_eq!(binding.property_mappings["WarehouseLocation"], "facility_id");

        // applying again no longer matches the current mapping
        assert!(binding.apply_fix(&fix).is_err());
    }

    #[test]
    fn test_apply_fix_without_suggestion() {
        let mut binding =
            SchemaBinding::for_entity(&shipment(), "dbo.shipments", None, &SnakeCaseNormalizer)
                .unwrap();
        let fix = Fix {
            property_name: "Temperature".to_string(),
            current_mapping: "temperature".to_string(),
            suggested_mapping: None,
            confidence: 0.0,
            rationale: String::new(),
        };

        let err = binding.apply_fix(&fix).unwrap_err();
        assert!(matches!(err, OntologyError::FixNotApplicable(_)));
        assert_eq!(binding.property_mappings["Temperature"], "temperature");
    }

    #[test]
    fn test_binding_set_yaml() {
        let ontology = Ontology::new("SupplyChain", vec![shipment()]).unwrap();
        let binding =
            SchemaBinding::for_entity(&shipment(), "dbo.shipments", None, &SnakeCaseNormalizer)
                .unwrap();

        let mut set = BindingSet::new(&ontology);
        set.insert(&binding);

        let yaml = set.to_yaml().unwrap();
        assert!(yaml.contains("source: dbo.shipments"));
        assert!(yaml.contains("source_type: sql"));

        let restored = BindingSet::from_yaml(&yaml).unwrap();
        assert_eq!(restored.binding("Shipment"), Some(binding));
        assert_eq!(restored.ontology.version, "1.0.0");
    }
}
