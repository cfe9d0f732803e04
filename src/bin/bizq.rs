//! bizq: compile and run browser queries from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Show the SQL and parameters for a payload
//! bizq --registry registry.toml compile payload.json
//!
//! # Compile for a named topology, reading the payload from stdin
//! echo '{"select":["c.name"]}' | bizq -r registry.toml compile - --named category_offerings
//!
//! # Execute against a database
//! BIZQ_DATABASE_URL=sqlite://catalog.db bizq -r registry.toml run payload.json
//! ```

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::*;
use bizq::prelude::*;
use std::collections::BTreeSet;
use std::io::Read;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bizq")]
#[command(version)]
#[command(about = "Secure dynamic query compiler for business-data browsers", long_about = None)]
#[command(after_help = "EXAMPLES:
    bizq -r registry.toml compile payload.json
    bizq -r registry.toml compile - --named category_offerings --count
    bizq -r registry.toml run payload.json --fixed-from wholesalers:w --format json")]
struct Cli {
    /// Config file (defaults to <config dir>/bizq/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Registry file, overrides `registry_path` from the config
    #[arg(short, long, global = true)]
    registry: Option<PathBuf>,

    /// Database connection URL
    #[arg(long, global = true, env = "BIZQ_DATABASE_URL")]
    database_url: Option<String>,

    /// Dialect to compile for
    #[arg(short, long, global = true)]
    dialect: Option<Dialect>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Args)]
struct QueryArgs {
    /// Payload JSON file, or `-` for stdin
    payload: String,

    /// Use a named query from the registry as FROM/JOIN source
    #[arg(short, long)]
    named: Option<String>,

    /// Fixed FROM source as `table:alias`
    #[arg(long, value_parser = parse_fixed_from)]
    fixed_from: Option<FromClause>,

    /// Compile the COUNT(*) variant instead of the row query
    #[arg(long)]
    count: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a payload and print the SQL and parameters
    Compile(QueryArgs),
    /// Compile a payload and execute it
    Run(QueryArgs),
    /// List registered aliases
    Tables,
    /// List named queries
    Named,
}

fn parse_fixed_from(s: &str) -> Result<FromClause, String> {
    let (table, alias) = s
        .split_once(':')
        .ok_or_else(|| format!("expected table:alias, got '{}'", s))?;
    let alias = Alias::parse(alias).map_err(|e| e.to_string())?;
    Ok(FromClause::new(table, alias))
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    if let Some(url) = &cli.database_url {
        config.database.url = Some(url.clone());
    }
    if let Some(dialect) = cli.dialect {
        config.dialect = Some(dialect);
    }
    if let Some(path) = &cli.registry {
        config.registry_path = Some(path.clone());
    }

    let filter = if cli.verbose { "debug" } else { config.log_filter.as_str() };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();

    let registry_path = config
        .registry_path
        .clone()
        .ok_or_else(|| anyhow!("no registry configured; pass --registry or set registry_path"))?;
    let registry = Registry::load_from_file(&registry_path)?;

    match &cli.command {
        Commands::Compile(args) => {
            let dialect = config.resolved_dialect()?;
            let compiled = compile_payload(&registry, &config, dialect, args)?;
            print_compiled(&compiled, cli.format)?;
        }
        Commands::Run(args) => {
            if config.database.url.is_none() {
                bail!("no database URL; use --database-url or set BIZQ_DATABASE_URL");
            }
            let db = QueryDb::connect_with(&config.database).await?;
            let compiled = compile_payload(&registry, &config, db.dialect(), args)?;
            if cli.verbose {
                eprintln!("{} {}", "SQL:".dimmed(), compiled.sql.yellow());
            }
            let rows = db.execute(&compiled).await?;
            format_output(&rows, &compiled.metadata.selected_columns, cli.format);
        }
        Commands::Tables => show_tables(&registry, cli.format)?,
        Commands::Named => show_named(&registry, cli.format)?,
    }

    Ok(())
}

fn read_payload(source: &str) -> Result<QueryPayload> {
    let json = if source == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).context("reading payload from stdin")?;
        buf
    } else {
        std::fs::read_to_string(source).with_context(|| format!("reading payload {}", source))?
    };
    QueryPayload::from_json(&json).context("parsing payload")
}

fn compile_payload(
    registry: &Registry,
    config: &AppConfig,
    dialect: Dialect,
    args: &QueryArgs,
) -> Result<CompiledQuery> {
    let payload = read_payload(&args.payload)?;
    let mut compiler = QueryCompiler::new(registry).dialect(dialect);
    if let Some(max) = config.max_page_size {
        compiler = compiler.max_limit(max);
    }
    let named = args.named.as_deref();
    let fixed = args.fixed_from.as_ref();
    let compiled = if args.count {
        compiler.compile_count(&payload, named, fixed)?
    } else {
        compiler.compile(&payload, named, fixed)?
    };
    Ok(compiled)
}

fn print_compiled(compiled: &CompiledQuery, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(compiled)?),
        OutputFormat::Table => {
            println!("{}", "Generated SQL:".green().bold());
            println!("{}", compiled.sql.white());
            if !compiled.parameters.is_empty() {
                println!();
                println!("{}", "Parameters:".cyan());
                for param in &compiled.parameters {
                    println!("  {} = {}", param.name, param.value.to_string().yellow());
                }
            }
        }
    }
    Ok(())
}

fn format_output(results: &[QueryRow], selected: &[String], format: OutputFormat) {
    if results.is_empty() {
        println!("{}", "(no results)".dimmed());
        return;
    }

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(results).unwrap_or_default());
        }
        OutputFormat::Table => {
            let columns = column_order(results, selected);
            let widths: Vec<usize> = columns
                .iter()
                .map(|c| {
                    results
                        .iter()
                        .filter_map(|row| row.get(c))
                        .map(|v| val_to_string(v).len())
                        .max()
                        .unwrap_or(0)
                        .max(c.len())
                })
                .collect();

            let header: Vec<String> = columns
                .iter()
                .zip(&widths)
                .map(|(c, w)| format!("{:width$}", c, width = *w))
                .collect();
            println!("{}", header.join(" │ ").white().bold());

            let sep: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
            println!("{}", sep.join("─┼─").dimmed());

            for row in results {
                let cells: Vec<String> = columns
                    .iter()
                    .zip(&widths)
                    .map(|(c, w)| {
                        let val = row.get(c).map(val_to_string).unwrap_or_default();
                        format!("{:width$}", val, width = *w)
                    })
                    .collect();
                println!("{}", cells.join(" │ "));
            }

            println!();
            println!("{} row(s) returned", results.len().to_string().cyan());
        }
    }
}

/// Columns in select order; drivers report bare names, so match on the
/// column part of `alias.column`.
fn column_order(results: &[QueryRow], selected: &[String]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut columns = Vec::new();
    for key in selected {
        if results[0].contains_key(key) && seen.insert(key.as_str()) {
            columns.push(key.clone());
        }
    }
    let mut rest: Vec<&String> = results[0].keys().filter(|k| !seen.contains(k.as_str())).collect();
    rest.sort();
    columns.extend(rest.into_iter().cloned());
    columns
}

fn val_to_string(val: &serde_json::Value) -> String {
    match val {
        serde_json::Value::Null => "NULL".to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.clone(),
        _ => val.to_string(),
    }
}

fn show_tables(registry: &Registry, format: OutputFormat) -> Result<()> {
    let tables = registry.tables();
    if let OutputFormat::Json = format {
        let value: Vec<serde_json::Value> = tables
            .iter()
            .map(|t| {
                serde_json::json!({
                    "alias": t.alias().as_str(),
                    "table": t.table_name(),
                    "columns": t.allowed_columns().collect::<Vec<_>>(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!(
        "{:8} {:24} {}",
        "Alias".white().bold(),
        "Table".white().bold(),
        "Columns".white().bold()
    );
    println!("{}", "─".repeat(72).dimmed());
    for entry in tables {
        println!(
            "{:8} {:24} {}",
            entry.alias().as_str().cyan().bold(),
            entry.table_name().yellow(),
            entry.allowed_columns().collect::<Vec<_>>().join(", ").dimmed()
        );
    }
    Ok(())
}

fn show_named(registry: &Registry, format: OutputFormat) -> Result<()> {
    let queries = registry.named_queries();
    if let OutputFormat::Json = format {
        let value: serde_json::Map<String, serde_json::Value> = queries
            .iter()
            .map(|(key, q)| -> Result<(String, serde_json::Value)> {
                Ok((key.to_string(), serde_json::to_value(q)?))
            })
            .collect::<Result<_>>()?;
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    if queries.is_empty() {
        println!("{}", "(no named queries)".dimmed());
        return Ok(());
    }
    for (key, query) in queries {
        println!("{}", key.cyan().bold());
        println!("  {} {} {}", "FROM".dimmed(), query.from.table.white(), query.from.alias);
        for join in &query.joins {
            let alias = join.alias.as_ref().map(|a| a.as_str()).unwrap_or("?");
            println!(
                "  {} {} {}",
                join.join_type.sql_keyword().dimmed(),
                join.table.white(),
                alias
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_column_order_keeps_same_named_columns_apart() {
        let row: QueryRow = [
            ("c.name".to_string(), json!("Tools")),
            ("w.name".to_string(), json!("Acme")),
            ("extra".to_string(), json!(1)),
        ]
        .into_iter()
        .collect();
        let selected = vec!["w.name".to_string(), "c.name".to_string()];
        assert_eq!(column_order(&[row], &selected), vec!["w.name", "c.name", "extra"]);
    }
}
