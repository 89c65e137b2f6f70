mod script;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fmt::Display;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use propnet::{ContradictionPolicy, Network, NetworkConfig, Numeric};
use script::Runner;

#[derive(Parser)]
#[command(name = "propnet")]
#[command(about = "Constraint propagation network runner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Keep the writes of a call that ends in a contradiction
    #[arg(long, global = true)]
    keep_partial: bool,

    /// Print the change history after running
    #[arg(long, global = true)]
    history: bool,

    /// Print the final network state as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Use floating point values instead of integers
    #[arg(long, global = true)]
    float: bool,

    /// Log propagation steps (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the built-in adder scenario
    Demo,
    /// Run a network script
    Run {
        /// Path to script file
        file: PathBuf,
    },
    /// Build a script's wiring without driving it
    Check {
        /// Path to script file
        file: PathBuf,
    },
}

impl Cli {
    fn config(&self) -> NetworkConfig {
        NetworkConfig {
            contradiction_policy: if self.keep_partial {
                ContradictionPolicy::KeepPartial
            } else {
                ContradictionPolicy::Rollback
            },
            record_history: self.history,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(if cli.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        })
        .parse_default_env()
        .init();

    let success = if cli.float {
        dispatch::<f64>(&cli)?
    } else {
        dispatch::<i64>(&cli)?
    };
    if !success {
        std::process::exit(1);
    }
    Ok(())
}

fn dispatch<V>(cli: &Cli) -> Result<bool>
where
    V: Numeric + Display + FromStr + Serialize,
    V::Err: Display,
{
    let mut out = io::stdout().lock();
    match &cli.command {
        Commands::Demo => {
            demo::<V>(cli, &mut out)?;
            Ok(true)
        }
        Commands::Run { file } => run_file::<V>(cli, file, &mut out),
        Commands::Check { file } => check_file::<V>(cli, file, &mut out),
    }
}

fn read_script<V>(file: &Path) -> Result<Vec<script::Line<V>>>
where
    V: FromStr,
    V::Err: Display,
{
    let source = fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    script::parse(&source).with_context(|| format!("parsing {}", file.display()))
}

/// `a + b = c`: forward with a=1, b=2, then backward from c=10.
fn demo<V>(cli: &Cli, out: &mut impl Write) -> Result<()>
where
    V: Numeric + Display + FromStr + Serialize,
    V::Err: Display,
{
    let parse = |text: &str| -> Result<V> {
        text.parse::<V>()
            .map_err(|e| anyhow::anyhow!("invalid demo value '{text}': {e}"))
    };

    let mut net: Network<V> = Network::with_config(cli.config());
    let a = net.add_named_connector("a");
    let b = net.add_named_connector("b");
    let c = net.add_named_connector("c");
    net.add_adder(a, b, c)?;

    net.set_value(a, parse("1")?)?;
    net.set_value(b, parse("2")?)?;
    writeln!(out, "c = {}", net.get_value(c)?)?;

    net.drop_value(c)?;
    net.drop_value(a)?;
    net.set_value(c, parse("10")?)?;
    writeln!(out, "a = {}", net.get_value(a)?)?;

    if cli.json {
        writeln!(out, "{}", net.snapshot().to_json()?)?;
    }
    Ok(())
}

fn run_file<V>(cli: &Cli, file: &Path, out: &mut impl Write) -> Result<bool>
where
    V: Numeric + Display + FromStr + Serialize,
    V::Err: Display,
{
    let lines = read_script::<V>(file)?;
    log::info!("running {} ({} statements)", file.display(), lines.len());

    let mut runner = Runner::<V>::new(cli.config());
    let report = runner.run(&lines, out)?;

    if cli.history {
        writeln!(out, "-- history")?;
        runner.write_history(out)?;
    }
    if cli.json {
        writeln!(out, "{}", runner.network().snapshot().to_json()?)?;
    }

    let stats = runner.network().total_stats();
    log::info!(
        "{} contradictions, {} failed expectations, {} writes, {} reactions",
        report.contradictions,
        report.failed_expectations,
        stats.writes,
        stats.reactions
    );
    if !report.is_success() {
        eprintln!(
            "{}: {} expectation(s) failed",
            file.display(),
            report.failed_expectations
        );
    }
    Ok(report.is_success())
}

fn check_file<V>(cli: &Cli, file: &Path, out: &mut impl Write) -> Result<bool>
where
    V: Numeric + Display + FromStr + Serialize,
    V::Err: Display,
{
    let lines = read_script::<V>(file)?;
    let mut runner = Runner::<V>::new(cli.config());
    runner.declare(&lines, out)?;

    let net = runner.network();
    let unbound = net.unbound_constraints();
    for constraint in &unbound {
        eprintln!(
            "unbound {} {constraint}",
            net.constraint_kind(*constraint).unwrap_or("constraint")
        );
    }
    let report = runner.report();
    writeln!(
        out,
        "{}: {} connectors, {} constraints, {} contradictions",
        file.display(),
        net.connectors().count(),
        net.constraints().count(),
        report.contradictions
    )?;
    if cli.json {
        writeln!(out, "{}", net.snapshot().to_json()?)?;
    }
    Ok(unbound.is_empty() && report.contradictions == 0)
}
