use thiserror::Error;

#[derive(Error, Debug)]
pub enum OntologyError {
    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Invalid binding: {0}")]
    InvalidBinding(String),

    #[error("Invalid ontology: {0}")]
    InvalidOntology(String),

    #[error("Fix not applicable: {0}")]
    FixNotApplicable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, OntologyError>;
