use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use skrift::ast_printer::AstPrinter;
use skrift::interpreter::Interpreter;
use skrift::parser::Parser;
use skrift::resolver::{Locals, Resolver};
use skrift::scanner::Scanner;
use skrift::token::Token;

/// Exit code for lexical, syntax and static (resolve) errors.
const EXIT_STATIC_ERROR: u8 = 65;

/// Exit code for runtime errors.
const EXIT_RUNTIME_ERROR: u8 = 70;

#[derive(ClapParser, Debug)]
#[command(version, about = "Skrift language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: PathBuf,

        /// Dump the token stream as JSON instead of one token per line
        #[arg(long)]
        json: bool,
    },

    /// Parses input from a file as a single expression and prints its AST
    Parse { filename: PathBuf },

    /// Evaluates input from a file as a single expression and prints the result
    Evaluate { filename: PathBuf },

    /// Runs input from a file as a Skrift program
    Run { filename: PathBuf },
}

/// Reads the contents of a file into a `Vec<u8>`.
fn read_file(filename: &Path) -> Result<Vec<u8>> {
    info!("Reading file: {:?}", filename);

    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    let bytes = reader
        .read_to_end(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    Ok(buf)
}

fn init_logger() -> Result<()> {
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    // Log lines carry the in-crate module path and source line.
    Builder::new()
        .format(|buf, record| {
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("skrift::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // default Debug, override with RUST_LOG
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

/// Scan the whole buffer, printing lexical diagnostics to stderr as they
/// surface. Scanning never aborts: the token list is complete either way and
/// the boolean tells the caller whether any diagnostic was reported.
fn scan(buf: &[u8]) -> (Vec<Token<'_>>, bool) {
    let mut tokens = Vec::new();
    let mut had_error = false;

    for result in Scanner::new(buf) {
        match result {
            Ok(token) => {
                debug!("Scanned token: {}", token);
                tokens.push(token);
            }

            Err(e) => {
                had_error = true;
                eprintln!("{}", e);
            }
        }
    }

    (tokens, had_error)
}

fn tokenize_command(filename: &Path, json: bool) -> Result<ExitCode> {
    info!("Running Tokenize subcommand");

    let buf = read_file(filename)?;
    let (tokens, had_error) = scan(&buf);

    if json {
        println!("{}", serde_json::to_string_pretty(&tokens)?);
    } else {
        for token in &tokens {
            println!("{}", token);
        }
    }

    if had_error {
        debug!("Tokenization had errors, exiting with code 65");
        return Ok(ExitCode::from(EXIT_STATIC_ERROR));
    }

    info!("Tokenization completed successfully");
    Ok(ExitCode::SUCCESS)
}

fn parse_command(filename: &Path) -> Result<ExitCode> {
    info!("Running Parse subcommand");

    let buf = read_file(filename)?;
    let (tokens, had_error) = scan(&buf);

    if had_error {
        return Ok(ExitCode::from(EXIT_STATIC_ERROR));
    }

    let mut parser = Parser::new(&tokens);

    match parser.parse_expression() {
        Ok(expr) => {
            info!("Expression parsed successfully");
            println!("{}", AstPrinter::print(&expr));
            Ok(ExitCode::SUCCESS)
        }

        Err(e) => {
            eprintln!("{}", e);
            Ok(ExitCode::from(EXIT_STATIC_ERROR))
        }
    }
}

fn evaluate_command(filename: &Path) -> Result<ExitCode> {
    info!("Running Evaluate subcommand");

    let buf = read_file(filename)?;
    let (tokens, had_error) = scan(&buf);

    if had_error {
        return Ok(ExitCode::from(EXIT_STATIC_ERROR));
    }

    let mut parser = Parser::new(&tokens);
    let expr = match parser.parse_expression() {
        Ok(expr) => expr,
        Err(e) => {
            eprintln!("{}", e);
            return Ok(ExitCode::from(EXIT_STATIC_ERROR));
        }
    };

    let mut interpreter = Interpreter::new();

    match interpreter.evaluate(&expr) {
        Ok(value) => {
            println!("{}", value);
            Ok(ExitCode::SUCCESS)
        }

        Err(e) => {
            eprintln!("{}", e);
            Ok(ExitCode::from(EXIT_RUNTIME_ERROR))
        }
    }
}

fn run_command(filename: &Path) -> Result<ExitCode> {
    info!("Running Run subcommand");

    let buf = read_file(filename)?;
    let (tokens, had_lex_error) = scan(&buf);

    let mut parser = Parser::new(&tokens);
    let statements = match parser.parse() {
        Ok(statements) => statements,

        Err(diagnostics) => {
            for e in &diagnostics {
                eprintln!("{}", e);
            }
            return Ok(ExitCode::from(EXIT_STATIC_ERROR));
        }
    };

    if had_lex_error {
        return Ok(ExitCode::from(EXIT_STATIC_ERROR));
    }

    info!("Parsed {} statements", statements.len());

    let locals: Locals = match Resolver::new().resolve(&statements) {
        Ok(locals) => locals,

        Err(diagnostics) => {
            for e in &diagnostics {
                eprintln!("{}", e);
            }
            return Ok(ExitCode::from(EXIT_STATIC_ERROR));
        }
    };

    let mut interpreter = Interpreter::new();

    match interpreter.interpret(&statements, locals) {
        Ok(()) => {
            info!("Program executed successfully");
            Ok(ExitCode::SUCCESS)
        }

        Err(e) => {
            eprintln!("{}", e);
            Ok(ExitCode::from(EXIT_RUNTIME_ERROR))
        }
    }
}

fn main() -> Result<ExitCode> {
    let args: Cli = Cli::parse();

    // Initialize logging only if --log was provided; otherwise install a
    // disabled logger so the log macros have a sink.
    if args.log {
        init_logger()?;
    } else {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match &args.commands {
        Commands::Tokenize { filename, json } => tokenize_command(filename, *json),
        Commands::Parse { filename } => parse_command(filename),
        Commands::Evaluate { filename } => evaluate_command(filename),
        Commands::Run { filename } => run_command(filename),
    }
}
