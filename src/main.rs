use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use pbi_ontology::{
    BindingSet, DriftConfig, Ontology, SchemaBinding, SchemaMapper, SchemaSnapshot, Severity,
};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const EXIT_RUNTIME_ERROR: u8 = 1;
const EXIT_INVALID_BINDING: u8 = 2;
const EXIT_CRITICAL_DRIFT: u8 = 3;

#[derive(Parser)]
#[command(name = "pbi-ontology")]
#[command(about = "Bind Power BI ontology entities to physical tables and detect schema drift")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a binding between an ontology entity and a physical table
    Bind {
        /// Ontology JSON produced by the ontology generator
        #[arg(long)]
        ontology: PathBuf,

        #[arg(long)]
        entity: String,

        /// Physical table identifier, e.g. dbo.shipments
        #[arg(long)]
        table: String,

        /// Explicit mapping, repeatable: --map Location=warehouse_location
        #[arg(long = "map", value_parser = parse_mapping)]
        mappings: Vec<(String, String)>,

        /// Write the binding here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check a binding for structural problems
    Validate {
        #[arg(long)]
        ontology: PathBuf,

        #[arg(long)]
        binding: PathBuf,
    },

    /// Compare a binding with the current physical schema
    Drift {
        #[arg(long)]
        ontology: PathBuf,

        #[arg(long)]
        binding: PathBuf,

        /// Schema snapshot JSON: {column: type} or {table: {column: type}}
        #[arg(long)]
        schema: PathBuf,

        /// Do not report columns no property is bound to
        #[arg(long)]
        ignore_extra_columns: bool,

        /// Include suggested fixes in the output
        #[arg(long)]
        fixes: bool,
    },

    /// Suggest fixes for the drift between a binding and a schema
    Suggest {
        #[arg(long)]
        ontology: PathBuf,

        #[arg(long)]
        binding: PathBuf,

        #[arg(long)]
        schema: PathBuf,
    },

    /// Apply confident fixes and write the updated binding
    Apply {
        #[arg(long)]
        ontology: PathBuf,

        #[arg(long)]
        binding: PathBuf,

        #[arg(long)]
        schema: PathBuf,

        /// Lowest fix confidence to apply (default from environment, else 0.6)
        #[arg(long)]
        min_confidence: Option<f64>,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Collect binding files into one YAML configuration
    ExportBindings {
        #[arg(long)]
        ontology: PathBuf,

        /// Binding JSON files
        #[arg(required = true)]
        bindings: Vec<PathBuf>,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// How a successful run ends; each maps to its own exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Success,
    InvalidBinding,
    CriticalDrift,
}

impl Outcome {
    fn from_severity(severity: Severity) -> Self {
        if severity == Severity::Critical {
            Outcome::CriticalDrift
        } else {
            Outcome::Success
        }
    }

    fn exit_code(self) -> ExitCode {
        match self {
            Outcome::Success => ExitCode::SUCCESS,
            Outcome::InvalidBinding => ExitCode::from(EXIT_INVALID_BINDING),
            Outcome::CriticalDrift => ExitCode::from(EXIT_CRITICAL_DRIFT),
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(EXIT_RUNTIME_ERROR)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(args.command) {
        Ok(outcome) => outcome.exit_code(),
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(EXIT_RUNTIME_ERROR)
        }
    }
}

fn run(command: Command) -> Result<Outcome> {
    let mut config = DriftConfig::from_env();

    match command {
        Command::Bind {
            ontology,
            entity,
            table,
            mappings,
            output,
        } => {
            let ontology = load_ontology(&ontology)?;
            let mapper = SchemaMapper::new(&ontology).with_config(config);
            let overrides: BTreeMap<String, String> = mappings.into_iter().collect();
            let overrides = (!overrides.is_empty()).then_some(&overrides);

            let binding = mapper.create_binding(&entity, &table, overrides)?;
            info!("Created binding: {} -> {}", binding.entity_name, binding.physical_table);

            let validation = mapper.validate_binding(&binding);
            for warning in &validation.warnings {
                warn!("{}", warning);
            }
            for problem in &validation.problems {
                error!("{}", problem);
            }

            emit(&binding, output.as_deref())?;
            Ok(if validation.ok {
                Outcome::Success
            } else {
                Outcome::InvalidBinding
            })
        }

        Command::Validate { ontology, binding } => {
            let ontology = load_ontology(&ontology)?;
            let binding = load_binding(&binding)?;
            let mapper = SchemaMapper::new(&ontology).with_config(config);

            let validation = mapper.validate_binding(&binding);
            emit(&validation, None)?;
            Ok(if validation.ok {
                Outcome::Success
            } else {
                Outcome::InvalidBinding
            })
        }

        Command::Drift {
            ontology,
            binding,
            schema,
            ignore_extra_columns,
            fixes,
        } => {
            config.ignore_extra_columns |= ignore_extra_columns;
            let ontology = load_ontology(&ontology)?;
            let binding = load_binding(&binding)?;
            let mapper = SchemaMapper::new(&ontology).with_config(config);

            let validation = mapper.validate_binding(&binding);
            if !validation.ok {
                emit(&validation, None)?;
                return Ok(Outcome::InvalidBinding);
            }

            let snapshot = load_snapshot(&schema, &binding)?;
            let report = mapper.detect_drift(&binding, &snapshot)?;
            info!("Drift severity for {}: {}", binding.entity_name, report.severity);

            if fixes {
                let suggested = mapper.suggest_fix(&report);
                emit(&json!({ "report": &report, "fixes": suggested }), None)?;
            } else {
                emit(&report, None)?;
            }
            Ok(Outcome::from_severity(report.severity))
        }

        Command::Suggest {
            ontology,
            binding,
            schema,
        } => {
            let ontology = load_ontology(&ontology)?;
            let binding = load_binding(&binding)?;
            let mapper = SchemaMapper::new(&ontology).with_config(config);

            let snapshot = load_snapshot(&schema, &binding)?;
            let report = mapper.detect_drift(&binding, &snapshot)?;
            emit(&mapper.suggest_fix(&report), None)?;
            Ok(Outcome::from_severity(report.severity))
        }

        Command::Apply {
            ontology,
            binding: binding_path,
            schema,
            min_confidence,
            output,
        } => {
            if let Some(min) = min_confidence {
                if !(0.0..=1.0).contains(&min) {
                    return Err(anyhow!("--min-confidence must be between 0 and 1, got {}", min));
                }
                config.min_apply_confidence = min;
            }
            let ontology = load_ontology(&ontology)?;
            let mut binding = load_binding(&binding_path)?;
            let mapper = SchemaMapper::new(&ontology).with_config(config);
            let snapshot = load_snapshot(&schema, &binding)?;

            let fixes = {
                let report = mapper.detect_drift(&binding, &snapshot)?;
                mapper.suggest_fix(&report)
            };

            let mut applied = 0;
            for fix in &fixes {
                if !fix.is_actionable() || fix.confidence < mapper.config().min_apply_confidence {
                    warn!("Needs review: {}", fix.rationale);
                    continue;
                }
                binding.apply_fix(fix)?;
                applied += 1;
            }
            info!("Applied {} of {} fixes", applied, fixes.len());

            let report = mapper.detect_drift(&binding, &snapshot)?;
            let severity = report.severity;
            if severity != Severity::None {
                info!("Remaining drift: {}", report.message);
            }

            match output.as_deref() {
                Some(path) => binding
                    .save(path)
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => emit(&binding, None)?,
            }
            Ok(Outcome::from_severity(severity))
        }

        Command::ExportBindings {
            ontology,
            bindings,
            output,
        } => {
            let ontology = load_ontology(&ontology)?;
            let mapper = SchemaMapper::new(&ontology).with_config(config);
            let mut set = BindingSet::new(&ontology);
            let mut outcome = Outcome::Success;

            for path in &bindings {
                let binding = load_binding(path)?;
                if !mapper.validate_binding(&binding).ok {
                    warn!("Binding {} does not validate", path.display());
                    outcome = Outcome::InvalidBinding;
                }
                set.insert(&binding);
            }

            let yaml = set.to_yaml()?;
            match output {
                Some(path) => std::fs::write(&path, yaml)
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => print!("{}", yaml),
            }
            Ok(outcome)
        }
    }
}

fn parse_mapping(raw: &str) -> std::result::Result<(String, String), String> {
    let (property, column) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected PROPERTY=COLUMN, got '{}'", raw))?;
    let (property, column) = (property.trim(), column.trim());
    if property.is_empty() || column.is_empty() {
        return Err(format!("expected PROPERTY=COLUMN, got '{}'", raw));
    }
    Ok((property.to_string(), column.to_string()))
}

fn load_ontology(path: &Path) -> Result<Ontology> {
    Ontology::load(path).with_context(|| format!("Failed to load ontology {}", path.display()))
}

fn load_binding(path: &Path) -> Result<SchemaBinding> {
    SchemaBinding::load(path).with_context(|| format!("Failed to load binding {}", path.display()))
}

fn load_snapshot(path: &Path, binding: &SchemaBinding) -> Result<SchemaSnapshot> {
    SchemaSnapshot::load(path, Some(&binding.physical_table))
        .with_context(|| format!("Failed to load schema snapshot {}", path.display()))
}

fn emit<T: Serialize + ?Sized>(value: &T, output: Option<&Path>) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => std::fs::write(path, text)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => println!("{}", text),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mapping() {
        assert_eq!(
            parse_mapping("Location = warehouse_location").unwrap(),
            ("Location".to_string(), "warehouse_location".to_string())
        );
        assert!(parse_mapping("Location").is_err());
        assert!(parse_mapping("=warehouse_location").is_err());
    }

    #[test]
    fn test_critical_drift_has_its_own_exit_status() {
        assert_eq!(Outcome::from_severity(Severity::Critical), Outcome::CriticalDrift);
        assert_eq!(Outcome::from_severity(Severity::High), Outcome::Success);
        assert_eq!(Outcome::from_severity(Severity::None), Outcome::Success);
        assert_ne!(EXIT_CRITICAL_DRIFT, EXIT_RUNTIME_ERROR);
        assert_ne!(EXIT_CRITICAL_DRIFT, EXIT_INVALID_BINDING);
    }

    #[test]
    fn test_cli_parses_drift_command() {
        let args = Args::try_parse_from([
            "pbi-ontology",
            "drift",
            "--ontology",
            "o.json",
            "--binding",
            "b.json",
            "--schema",
            "s.json",
            "--ignore-extra-columns",
        ])
        .unwrap();

        match args.command {
            Command::Drift {
                ignore_extra_columns,
                fixes,
                ..
            } => {
                assert!(ignore_extra_columns);
                assert!(!fixes);
            }
            _ => panic!("expected drift command"),
        }
    }
}
