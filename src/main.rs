use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use graphwire::decl::{FunctionTable, GraphsSpec};
use graphwire::{Value, begin_scope};

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "graphwire")]
#[command(about = "Declare, check and build dependency graphs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate every graph of a declaration file.
    Check {
        #[arg(long)]
        graph: String,
    },
    /// Build one attribute and print it as JSON.
    Build {
        #[arg(long)]
        graph: String,

        /// Graph.attr[.attr...]
        #[arg(long)]
        target: String,

        /// Dynamic value for the target's scope, repeatable.
        #[arg(long = "set", value_name = "NAME=JSON")]
        set: Vec<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "graphwire=info".into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let functions = FunctionTable::default();

    match cli.cmd {
        Commands::Check { graph } => {
            let declared = GraphsSpec::from_path(&graph)?.validate_and_build(&functions)?;
            for schema in declared.iter() {
                info!(graph = schema.name(), attrs = schema.registry().len(), "ok");
            }
            println!("{} graph(s) in {} are valid", declared.len(), graph);
        }
        Commands::Build { graph, target, set } => {
            let declared = GraphsSpec::from_path(&graph)?.validate_and_build(&functions)?;
            let (schema, attrs) = declared.resolve_target(&target)?;

            let values = set
                .iter()
                .map(|s| parse_assignment(s))
                .collect::<Result<Vec<_>>>()?;
            let _scope = if schema.is_scoped() {
                Some(begin_scope(schema, values)?.enter()?)
            } else if !values.is_empty() {
                bail!("graph '{}' is not scoped; --set is not accepted", schema.name());
            } else {
                None
            };

            let mut value = schema.get(attrs[0])?;
            for attr in &attrs[1..] {
                value = match value.as_graph() {
                    Some(instance) => instance.get(attr)?,
                    None => value
                        .attr(attr)
                        .with_context(|| format!("'{}' value has no attribute '{}'", value.type_name(), attr))?,
                };
            }

            match value.to_json() {
                Some(json) => println!("{}", serde_json::to_string_pretty(&json)?),
                None => println!("{:?}", value),
            }
        }
    }

    Ok(())
}

/// `NAME=JSON`; a value that is not valid JSON is taken as a string.
fn parse_assignment(s: &str) -> Result<(String, Value)> {
    let Some((name, raw)) = s.split_once('=') else {
        bail!("--set expects NAME=JSON, got '{}'", s);
    };
    let json = serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));
    Ok((name.trim().to_string(), Value::json(json)))
}
