//! evalsheet CLI - evaluate and inspect formulas

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDateTime;
use clap::{Args, Parser, Subcommand};
use evalsheet::prelude::*;
use evalsheet::{parse_formula, references, registry, tokenize, FormulaError, FunctionKind};
use evalsheet_csv::detect_type;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "evalsheet")]
#[command(author, version, about = "Evaluate spreadsheet formulas and expressions")]
struct Cli {
    /// Log more (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DialectArg {
    /// Formula language: spreadsheet or expression
    #[arg(short, long, default_value = "spreadsheet")]
    dialect: Dialect,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a formula and print the result
    Eval {
        /// Formula source, e.g. "=SUM(A1:A3)" or "[x] * 2"
        source: String,

        #[command(flatten)]
        dialect: DialectArg,

        /// Variable binding NAME=VALUE (repeatable)
        #[arg(long = "var", value_name = "NAME=VALUE")]
        vars: Vec<String>,

        /// Cell binding A1=VALUE (repeatable, applied after --csv)
        #[arg(long = "cell", value_name = "ADDRESS=VALUE")]
        cells: Vec<String>,

        /// Load cells from a CSV file; the first row is A1
        #[arg(long, value_name = "FILE")]
        csv: Option<PathBuf>,

        /// Treat the first CSV row as data instead of a header
        #[arg(long, requires = "csv")]
        no_header: bool,

        /// Clock for NOW()/TODAY(), e.g. "2024-03-15 09:30:00" (default: local time)
        #[arg(long)]
        now: Option<String>,
    },

    /// Print the tokens of a formula
    Tokens {
        source: String,

        #[command(flatten)]
        dialect: DialectArg,
    },

    /// Print the parsed syntax tree
    Ast {
        source: String,

        #[command(flatten)]
        dialect: DialectArg,

        /// Print the full tree structure instead of the canonical form
        #[arg(long)]
        debug: bool,
    },

    /// List the variables, cells and ranges a formula reads
    Refs {
        source: String,

        #[command(flatten)]
        dialect: DialectArg,
    },

    /// List the built-in functions of a dialect
    Functions {
        #[command(flatten)]
        dialect: DialectArg,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Eval {
            source,
            dialect,
            vars,
            cells,
            csv,
            no_header,
            now,
        } => {
            let ctx = build_context(&vars, &cells, csv.as_ref(), no_header, now.as_deref())?;
            eval(&source, dialect.dialect, &ctx)
        }
        Commands::Tokens { source, dialect } => show_tokens(&source, dialect.dialect),
        Commands::Ast {
            source,
            dialect,
            debug,
        } => show_ast(&source, dialect.dialect, debug),
        Commands::Refs { source, dialect } => show_refs(&source, dialect.dialect),
        Commands::Functions { dialect } => {
            list_functions(dialect.dialect);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

/// Cells and variables from the command line, resolved together
struct CliContext {
    sheet: SheetContext,
    vars: VariableContext,
}

impl EvaluationContext for CliContext {
    fn resolve_variable(&self, name: &str) -> Option<Value> {
        self.vars.resolve_variable(name)
    }

    fn resolve_cell(&self, address: &CellAddress) -> Option<CellValue> {
        self.sheet.resolve_cell(address)
    }

    fn resolve_range(&self, range: &CellRange) -> Option<Vec<CellValue>> {
        self.sheet.resolve_range(range)
    }

    fn now(&self) -> NaiveDateTime {
        self.sheet.now()
    }
}

fn split_binding(binding: &str) -> Result<(&str, &str)> {
    binding
        .split_once('=')
        .map(|(name, value)| (name.trim(), value))
        .filter(|(name, _)| !name.is_empty())
        .ok_or_else(|| anyhow!("Invalid binding '{}', expected NAME=VALUE", binding))
}

fn parse_now(text: &str) -> Result<NaiveDateTime> {
    match detect_type(text) {
        CellValue::DateTime(dt) => Ok(dt),
        _ => bail!("Invalid --now '{}', expected YYYY-MM-DD[ HH:MM:SS]", text),
    }
}

fn build_context(
    vars: &[String],
    cells: &[String],
    csv: Option<&PathBuf>,
    no_header: bool,
    now: Option<&str>,
) -> Result<CliContext> {
    let mut sheet = match csv {
        Some(path) => {
            let options = CsvReadOptions {
                has_header: !no_header,
                ..CsvReadOptions::default()
            };
            SheetContext::from_csv(path, &options)
                .with_context(|| format!("Failed to read '{}'", path.display()))?
        }
        None => SheetContext::default(),
    };

    for binding in cells {
        let (address, value) = split_binding(binding)?;
        sheet
            .grid_mut()
            .set(address, detect_type(value))
            .with_context(|| format!("Invalid cell binding '{}'", binding))?;
    }

    let mut variables = VariableContext::new();
    for binding in vars {
        let (name, value) = split_binding(binding)?;
        variables.set(name, Value::from(detect_type(value)));
    }

    if let Some(now) = now {
        sheet = sheet.with_now(parse_now(now)?);
    }
    log::debug!(
        "context: {} cells, {} variables",
        sheet.grid().len(),
        variables.len()
    );

    Ok(CliContext {
        sheet,
        vars: variables,
    })
}

/// "syntax error at offset 4: expected ')', found end of input"
fn report(err: &FormulaError) -> ExitCode {
    let detail = match err {
        FormulaError::Lex(e) => e.message.clone(),
        FormulaError::Parse(e) => format!("expected {}, found {}", e.expected, e.found),
        FormulaError::Eval { error, .. } => error.to_string(),
    };
    eprintln!("{} at offset {}: {}", err.category(), err.offset(), detail);
    ExitCode::FAILURE
}

fn eval(source: &str, dialect: Dialect, ctx: &CliContext) -> Result<ExitCode> {
    let engine = Engine::new(EngineOptions {
        dialect,
        cache_enabled: false,
        ..EngineOptions::default()
    });
    match engine.evaluate(source, ctx) {
        Ok(value) => {
            println!("{}", value);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => Ok(report(&e)),
    }
}

fn show_tokens(source: &str, dialect: Dialect) -> Result<ExitCode> {
    let tokens = match tokenize(source, dialect) {
        Ok(tokens) => tokens,
        Err(e) => return Ok(report(&e.into())),
    };
    for token in tokens {
        println!("{}\t{}\t{}", token.offset, token.kind.describe(), token.lexeme);
    }
    Ok(ExitCode::SUCCESS)
}

fn show_ast(source: &str, dialect: Dialect, debug: bool) -> Result<ExitCode> {
    match parse_formula(source, dialect) {
        Ok(ast) if debug => println!("{:#?}", ast),
        Ok(ast) => println!("{}", ast),
        Err(e) => return Ok(report(&e)),
    }
    Ok(ExitCode::SUCCESS)
}

fn show_refs(source: &str, dialect: Dialect) -> Result<ExitCode> {
    let ast = match parse_formula(source, dialect) {
        Ok(ast) => ast,
        Err(e) => return Ok(report(&e)),
    };
    let refs = references(&ast);
    for name in &refs.variables {
        println!("variable\t[{}]", name);
    }
    for cell in &refs.cells {
        println!("cell\t{}", cell);
    }
    for range in &refs.ranges {
        println!("range\t{}", range);
    }
    Ok(ExitCode::SUCCESS)
}

fn list_functions(dialect: Dialect) {
    for def in registry(dialect).definitions() {
        let kind = match def.kind {
            FunctionKind::Scalar(_) => "scalar",
            FunctionKind::Aggregate(_) => "aggregate",
            FunctionKind::Special(_) => "special",
        };
        let volatile = if def.volatile { "\tvolatile" } else { "" };
        println!("{}\t{}\t{}{}", def.name, kind, def.arity_description(), volatile);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_binding() {
        assert_eq!(split_binding("x=1").unwrap(), ("x", "1"));
        assert_eq!(split_binding("s=a=b").unwrap(), ("s", "a=b"));
        assert!(split_binding("=1").is_err());
        assert!(split_binding("x").is_err());
    }

    #[test]
    fn test_build_context() {
        let ctx = build_context(
            &["rate=0.5".to_string(), "label=abc".to_string()],
            &["B2=TRUE".to_string()],
            None,
            false,
            Some("2024-01-02 03:04:05"),
        )
        .unwrap();

        assert_eq!(ctx.resolve_variable("rate"), Some(Value::Number(0.5)));
        assert_eq!(ctx.resolve_variable("label"), Some(Value::text("abc")));
        assert_eq!(
            ctx.resolve_cell(&CellAddress::parse("B2").unwrap()),
            Some(CellValue::Boolean(true))
        );
        assert_eq!(ctx.now().to_string(), "2024-01-02 03:04:05");
    }

    #[test]
    fn test_invalid_now() {
        assert!(parse_now("tomorrow").is_err());
    }
}
