//! `vigil` binary.
//!
//! Loads a schema against the built-in rule pack and either prints the
//! resolved plans or validates value snapshots, printing the result map as
//! JSON. Exits with status 1 when any attribute is invalid.

mod cli;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::rc::Rc;

use anyhow::{Context, bail};
use clap::Parser;
use tokio::task::LocalSet;
use tracing::info;
use vigil_registry::RuleRegistry;
use vigil_validator::{Schema, Validator};
use vigil_worker::Attributes;

use crate::cli::{Cli, Command};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
	let cli = Cli::parse();

	let subscriber = tracing_subscriber::fmt()
		.with_max_level(if cli.verbose {
			tracing::Level::DEBUG
		} else {
			tracing::Level::INFO
		})
		.with_writer(std::io::stderr)
		.finish();
	tracing::subscriber::set_global_default(subscriber)?;

	let registry = RuleRegistry::with_builtins();
	match cli.command {
		Command::Plan { schema } => plan(&registry, &schema),
		Command::Check { schema, values } => {
			LocalSet::new()
				.run_until(check(&registry, &schema, &values))
				.await
		}
		Command::Rules => {
			for def in registry.rules() {
				let deps: Vec<_> = def.dependencies().collect();
				let auto = if def.is_auto() { " (auto)" } else { "" };
				println!("{}{auto}\tdeps: [{}]\t{}", def.id(), deps.join(", "), def.help());
			}
			Ok(ExitCode::SUCCESS)
		}
	}
}

fn load(registry: &RuleRegistry, path: &Path) -> anyhow::Result<Rc<Validator>> {
	let schema = Schema::from_path(path)?;
	Validator::new(registry, &schema).with_context(|| format!("building validator for {}", path.display()))
}

fn plan(registry: &RuleRegistry, schema: &Path) -> anyhow::Result<ExitCode> {
	let validator = load(registry, schema)?;
	for attribute in validator.attributes() {
		let plan = validator.plan(attribute).unwrap_or_default();
		println!("{attribute}: {}", plan.join(" -> "));
	}
	Ok(ExitCode::SUCCESS)
}

fn read_values(path: &Path) -> anyhow::Result<Attributes> {
	let source = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
	match serde_json::from_str::<serde_json::Value>(&source).with_context(|| format!("parsing {}", path.display()))? {
		serde_json::Value::Object(values) => Ok(values),
		other => bail!("{}: expected a JSON object, got {other}", path.display()),
	}
}

async fn check(registry: &RuleRegistry, schema: &Path, values: &[PathBuf]) -> anyhow::Result<ExitCode> {
	let validator = load(registry, schema)?;
	for (index, path) in values.iter().enumerate() {
		let snapshot = read_values(path)?;
		let scheduled = if index == 0 {
			validator.force(snapshot)
		} else {
			validator.run(snapshot)
		};
		info!(file = %path.display(), scheduled = ?scheduled, "applied snapshot");
	}
	validator.settled().await;

	println!("{}", serde_json::to_string_pretty(&validator.results())?);
	if validator.errors() > 0 {
		info!(errors = validator.errors(), "validation failed");
		return Ok(ExitCode::FAILURE);
	}
	Ok(ExitCode::SUCCESS)
}
