//! Logical ontology model
//!
//! Entities, properties, relationships and business rules as produced by the
//! ontology generator. The binding engine only reads entity/property names,
//! declared semantic types and the `required` flag.

use crate::error::{OntologyError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

/// Semantic type of an ontology property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SemanticType {
    #[serde(rename = "STRING", alias = "String", alias = "string", alias = "Text")]
    String,
    #[serde(rename = "INTEGER", alias = "Integer", alias = "integer", alias = "Int64")]
    Integer,
    #[serde(rename = "DECIMAL", alias = "Decimal", alias = "decimal", alias = "Double")]
    Decimal,
    #[serde(rename = "BOOLEAN", alias = "Boolean", alias = "boolean")]
    Boolean,
    #[serde(
        rename = "DATETIME",
        alias = "DateTime",
        alias = "datetime",
        alias = "Date",
        alias = "date"
    )]
    DateTime,
    #[serde(rename = "GUID", alias = "Guid", alias = "guid", alias = "UUID")]
    Guid,
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SemanticType::String => write!(f, "STRING"),
            SemanticType::Integer => write!(f, "INTEGER"),
            SemanticType::Decimal => write!(f, "DECIMAL"),
            SemanticType::Boolean => write!(f, "BOOLEAN"),
            SemanticType::DateTime => write!(f, "DATETIME"),
            SemanticType::Guid => write!(f, "GUID"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OntologyProperty {
    pub name: String,
    pub data_type: SemanticType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub description: String,
}

impl OntologyProperty {
    pub fn new(name: impl Into<String>, data_type: SemanticType) -> Self {
        Self {
            name: name.into(),
            data_type,
            required: false,
            unique: false,
            description: String::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OntologyEntity {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub properties: Vec<OntologyProperty>,
    #[serde(default)]
    pub source_table: String,
    /// "standard", "dimension", "fact", "bridge" or "date"
    #[serde(default = "default_entity_type")]
    pub entity_type: String,
}

fn default_entity_type() -> String {
    "standard".to_string()
}

impl OntologyEntity {
    pub fn new(name: impl Into<String>, properties: Vec<OntologyProperty>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            properties,
            source_table: String::new(),
            entity_type: default_entity_type(),
        }
    }

    pub fn property(&self, name: &str) -> Option<&OntologyProperty> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn required_properties(&self) -> impl Iterator<Item = &OntologyProperty> + '_ {
        self.properties.iter().filter(|p| p.required)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OntologyRelationship {
    pub from_entity: String,
    pub from_property: String,
    pub to_entity: String,
    pub to_property: String,
    /// "has", "belongs_to", "contains", ...
    pub relationship_type: String,
    pub cardinality: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessRule {
    pub name: String,
    pub entity: String,
    pub condition: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub classification: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_priority")]
    pub priority: u32,
}

fn default_priority() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ontology {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub entities: Vec<OntologyEntity>,
    #[serde(default)]
    pub relationships: Vec<OntologyRelationship>,
    #[serde(default)]
    pub business_rules: Vec<BusinessRule>,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

impl Ontology {
    pub fn new(name: impl Into<String>, entities: Vec<OntologyEntity>) -> Result<Self> {
        let ontology = Self {
            name: name.into(),
            version: default_version(),
            source: String::new(),
            entities,
            relationships: Vec::new(),
            business_rules: Vec::new(),
        };
        ontology.check_invariants()?;
        Ok(ontology)
    }

    /// Load an ontology previously written by the ontology generator.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            OntologyError::InvalidOntology(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let ontology: Ontology = serde_json::from_str(&content).map_err(|e| {
            OntologyError::InvalidOntology(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        ontology.check_invariants()?;
        Ok(ontology)
    }

    /// Entity names are unique, and property names are unique within an entity.
    pub fn check_invariants(&self) -> Result<()> {
        let mut entity_names = HashSet::new();
        for entity in &self.entities {
            if !entity_names.insert(entity.name.as_str()) {
                return Err(OntologyError::InvalidOntology(format!(
                    "Duplicate entity '{}'",
                    entity.name
                )));
            }

            let mut property_names = HashSet::new();
            for prop in &entity.properties {
                if !property_names.insert(prop.name.as_str()) {
                    return Err(OntologyError::InvalidOntology(format!(
                        "Duplicate property '{}' in entity '{}'",
                        prop.name, entity.name
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn entity(&self, name: &str) -> Option<&OntologyEntity> {
        self.entities.iter().find(|e| e.name == name)
    }
}
