pub mod binding;
pub mod config;
pub mod drift;
pub mod error;
pub mod fix;
pub mod mapper;
pub mod naming;
pub mod ontology;
pub mod schema;
pub mod similarity;
pub mod validation;

pub use binding::{BindingSet, SchemaBinding, SourceType};
pub use config::DriftConfig;
pub use drift::{DriftFinding, DriftKind, DriftReport, Severity};
pub use error::{OntologyError, Result};
pub use fix::Fix;
pub use mapper::SchemaMapper;
pub use naming::{NameNormalizer, SnakeCaseNormalizer};
pub use ontology::{Ontology, OntologyEntity, OntologyProperty, SemanticType};
pub use schema::{PhysicalType, SchemaSnapshot};
pub use validation::ValidationResult;
