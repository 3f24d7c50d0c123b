use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "vigil")]
#[command(about = "Dependency-ordered attribute validation")]
#[command(version)]
/// Command-line arguments.
pub struct Cli {
	/// Verbose logging
	#[arg(short, long, global = true)]
	pub verbose: bool,

	/// Subcommand to execute.
	#[command(subcommand)]
	pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
	/// Print each attribute's resolved rule order
	Plan {
		/// Schema file (`.toml`, otherwise JSON)
		#[arg(long, short, value_name = "FILE")]
		schema: PathBuf,
	},
	/// Validate one or more JSON value snapshots in order
	Check {
		/// Schema file (`.toml`, otherwise JSON)
		#[arg(long, short, value_name = "FILE")]
		schema: PathBuf,

		/// JSON object of attribute values; repeat to apply successive snapshots
		#[arg(long = "values", value_name = "FILE", required = true)]
		values: Vec<PathBuf>,
	},
	/// List the registered rules
	Rules,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn check_accepts_repeated_values() {
		let cli = Cli::try_parse_from([
			"vigil", "check", "--schema", "signup.toml", "--values", "a.json", "--values", "b.json", "-v",
		])
		.unwrap();
		assert!(cli.verbose);
		match cli.command {
			Command::Check { schema, values } => {
				assert_eq!(schema, PathBuf::from("signup.toml"));
				assert_eq!(values, vec![PathBuf::from("a.json"), PathBuf::from("b.json")]);
			}
			other => panic!("unexpected command {other:?}"),
		}
	}

	#[test]
	fn check_requires_values() {
		assert!(Cli::try_parse_from(["vigil", "check", "--schema", "signup.toml"]).is_err());
	}
}
