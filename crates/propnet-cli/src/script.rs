//! Line-oriented network scripts.
//!
//! ```text
//! # Celsius/Fahrenheit: 9c = 5(f - 32)
//! connector c f u v nine five k32
//! multiplier c nine u
//! multiplier v five u
//! adder v k32 f
//! constant nine 9
//! constant five 5
//! constant k32 32
//!
//! set c 25
//! print f
//! expect f 77
//! ```
//!
//! Declarations (`connector`, relations, `constant`) build the network;
//! `set`, `drop`, `print` and `expect` drive and inspect it in order.

use anyhow::{Context, Result, anyhow, bail};
use indexmap::IndexMap;
use std::fmt::Display;
use std::io::Write;
use std::str::FromStr;

use propnet::{ConnectorId, Network, NetworkConfig, NetworkError, Numeric};

#[derive(Debug, Clone, PartialEq)]
pub enum Statement<V> {
    Connectors(Vec<String>),
    Adder { lhs: String, rhs: String, sum: String },
    Subtractor { minuend: String, subtrahend: String, difference: String },
    Multiplier { lhs: String, rhs: String, product: String },
    Sum { terms: Vec<String>, total: String },
    Equal(Vec<String>),
    Constant { name: String, value: V },
    Set { name: String, value: V },
    Drop(String),
    Print(Vec<String>),
    /// `None` expects the connector to be absent (`?`)
    Expect { name: String, value: Option<V> },
}

impl<V> Statement<V> {
    fn is_declaration(&self) -> bool {
        !matches!(
            self,
            Statement::Set { .. } | Statement::Drop(_) | Statement::Print(_) | Statement::Expect { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Line<V> {
    pub number: usize,
    pub statement: Statement<V>,
}

fn parse_value<V: FromStr>(word: &str) -> Result<V>
where
    V::Err: Display,
{
    word.parse::<V>()
        .map_err(|e| anyhow!("invalid value '{word}': {e}"))
}

fn names(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

fn exactly<'a, const N: usize>(keyword: &str, args: &[&'a str]) -> Result<[&'a str; N]> {
    <[&str; N]>::try_from(args)
        .map_err(|_| anyhow!("'{keyword}' takes {N} arguments, got {}", args.len()))
}

fn parse_statement<V: FromStr>(keyword: &str, args: &[&str]) -> Result<Statement<V>>
where
    V::Err: Display,
{
    let statement = match keyword {
        "connector" | "connectors" => {
            if args.is_empty() {
                bail!("'connector' needs at least one name");
            }
            Statement::Connectors(names(args))
        }
        "adder" => {
            let [lhs, rhs, sum] = exactly(keyword, args)?;
            Statement::Adder { lhs: lhs.into(), rhs: rhs.into(), sum: sum.into() }
        }
        "subtractor" => {
            let [minuend, subtrahend, difference] = exactly(keyword, args)?;
            Statement::Subtractor {
                minuend: minuend.into(),
                subtrahend: subtrahend.into(),
                difference: difference.into(),
            }
        }
        "multiplier" => {
            let [lhs, rhs, product] = exactly(keyword, args)?;
            Statement::Multiplier { lhs: lhs.into(), rhs: rhs.into(), product: product.into() }
        }
        "sum" => match args {
            [terms @ .., "->", total] if !terms.is_empty() => Statement::Sum {
                terms: names(terms),
                total: total.to_string(),
            },
            _ => bail!("expected 'sum <term>... -> <total>'"),
        },
        "equal" => {
            if args.len() < 2 {
                bail!("'equal' needs at least two names");
            }
            Statement::Equal(names(args))
        }
        "constant" => {
            let [name, value] = exactly(keyword, args)?;
            Statement::Constant { name: name.into(), value: parse_value(value)? }
        }
        "set" => {
            let [name, value] = exactly(keyword, args)?;
            Statement::Set { name: name.into(), value: parse_value(value)? }
        }
        "drop" => {
            let [name] = exactly(keyword, args)?;
            Statement::Drop(name.into())
        }
        "print" => {
            if args.is_empty() {
                bail!("'print' needs at least one name");
            }
            Statement::Print(names(args))
        }
        "expect" => {
            let [name, value] = exactly(keyword, args)?;
            let value = if value == "?" { None } else { Some(parse_value(value)?) };
            Statement::Expect { name: name.into(), value }
        }
        other => bail!("unknown statement '{other}'"),
    };
    Ok(statement)
}

/// Parse a whole script. Blank lines and `#` comments are skipped.
pub fn parse<V: FromStr>(source: &str) -> Result<Vec<Line<V>>>
where
    V::Err: Display,
{
    let mut lines = Vec::new();
    for (index, raw) in source.lines().enumerate() {
        let number = index + 1;
        let text = raw.split('#').next().unwrap_or_default().trim();
        if text.is_empty() {
            continue;
        }
        let words: Vec<&str> = text.split_whitespace().collect();
        let statement = parse_statement(words[0], &words[1..])
            .with_context(|| format!("line {number}: {text}"))?;
        lines.push(Line { number, statement });
    }
    Ok(lines)
}

/// Outcome counters of a script run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Report {
    pub contradictions: usize,
    pub failed_expectations: usize,
}

impl Report {
    pub fn is_success(&self) -> bool {
        self.failed_expectations == 0
    }
}

/// Executes parsed scripts against a network, writing output to `out`.
pub struct Runner<V: Numeric> {
    network: Network<V>,
    names: IndexMap<String, ConnectorId>,
    report: Report,
}

impl<V> Runner<V>
where
    V: Numeric + Display,
{
    pub fn new(config: NetworkConfig) -> Self {
        Self {
            network: Network::with_config(config),
            names: IndexMap::new(),
            report: Report::default(),
        }
    }

    pub fn network(&self) -> &Network<V> {
        &self.network
    }

    pub fn report(&self) -> Report {
        self.report
    }

    fn lookup(&self, name: &str) -> Result<ConnectorId> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| anyhow!("unknown connector '{name}'"))
    }

    fn lookup_all(&self, names: &[String]) -> Result<Vec<ConnectorId>> {
        names.iter().map(|name| self.lookup(name)).collect()
    }

    fn format_value(&self, id: ConnectorId) -> String {
        match self.network.value(id) {
            Some(value) => value.to_string(),
            None => "?".to_string(),
        }
    }

    /// Build only the wiring of a script, skipping `set`/`drop`/`print`/`expect`.
    pub fn declare(&mut self, lines: &[Line<V>], out: &mut impl Write) -> Result<()> {
        for line in lines.iter().filter(|l| l.statement.is_declaration()) {
            self.execute(line, out)
                .with_context(|| format!("line {}", line.number))?;
        }
        Ok(())
    }

    pub fn run(&mut self, lines: &[Line<V>], out: &mut impl Write) -> Result<Report> {
        for line in lines {
            self.execute(line, out)
                .with_context(|| format!("line {}", line.number))?;
        }
        Ok(self.report)
    }

    fn execute(&mut self, line: &Line<V>, out: &mut impl Write) -> Result<()> {
        let number = line.number;
        let outcome = match &line.statement {
            Statement::Connectors(names) => {
                for name in names {
                    if self.names.contains_key(name) {
                        bail!("connector '{name}' declared twice");
                    }
                    let id = self.network.add_named_connector(name.clone());
                    self.names.insert(name.clone(), id);
                }
                Ok(())
            }
            Statement::Adder { lhs, rhs, sum } => {
                let (lhs, rhs, sum) = (self.lookup(lhs)?, self.lookup(rhs)?, self.lookup(sum)?);
                self.network.add_adder(lhs, rhs, sum).map(drop)
            }
            Statement::Subtractor { minuend, subtrahend, difference } => {
                let minuend = self.lookup(minuend)?;
                let subtrahend = self.lookup(subtrahend)?;
                let difference = self.lookup(difference)?;
                self.network.add_subtractor(minuend, subtrahend, difference).map(drop)
            }
            Statement::Multiplier { lhs, rhs, product } => {
                let (lhs, rhs, product) =
                    (self.lookup(lhs)?, self.lookup(rhs)?, self.lookup(product)?);
                self.network.add_multiplier(lhs, rhs, product).map(drop)
            }
            Statement::Sum { terms, total } => {
                let terms = self.lookup_all(terms)?;
                let total = self.lookup(total)?;
                self.network.add_summation(&terms, total).map(drop)
            }
            Statement::Equal(names) => {
                let ids = self.lookup_all(names)?;
                self.network.add_equality(&ids).map(drop)
            }
            Statement::Constant { name, value } => {
                let id = self.lookup(name)?;
                self.network.add_constant(id, *value).map(drop)
            }
            Statement::Set { name, value } => {
                let id = self.lookup(name)?;
                self.network.set_value(id, *value)
            }
            Statement::Drop(name) => {
                let id = self.lookup(name)?;
                self.network.drop_value(id)
            }
            Statement::Print(names) => {
                for name in names {
                    let id = self.lookup(name)?;
                    writeln!(out, "{name} = {}", self.format_value(id))?;
                }
                Ok(())
            }
            Statement::Expect { name, value } => {
                let id = self.lookup(name)?;
                let actual = self.network.value(id);
                if actual != *value {
                    self.report.failed_expectations += 1;
                    let expected = value.map_or_else(|| "?".to_string(), |v| v.to_string());
                    writeln!(
                        out,
                        "line {number}: expected {name} = {expected}, found {}",
                        self.format_value(id)
                    )?;
                }
                Ok(())
            }
        };

        match outcome {
            Ok(()) => Ok(()),
            Err(err @ NetworkError::Contradiction(_)) => {
                self.report.contradictions += 1;
                writeln!(out, "line {number}: {err}")?;
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Committed change history, one line per transition.
    pub fn write_history(&self, out: &mut impl Write) -> Result<()> {
        for record in self.network.history() {
            let show = |value: Option<V>| value.map_or_else(|| "?".to_string(), |v| v.to_string());
            let cause = match record.origin {
                Some(origin) => format!(
                    "{} {origin}",
                    self.network.constraint_kind(origin).unwrap_or("constraint")
                ),
                None => "client".to_string(),
            };
            writeln!(
                out,
                "{:>4} {}{}: {} -> {} ({cause})",
                record.seq,
                "  ".repeat(record.depth as usize),
                self.network.describe(record.connector),
                show(record.old),
                show(record.new),
            )?;
        }
        Ok(())
    }
}
