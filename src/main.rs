use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use kestrel::ast_printer::AstPrinter;
use kestrel::error::KestrelError;
use kestrel::interpreter::Interpreter;
use kestrel::parser::{Parser, Stmt};
use kestrel::resolver::Resolver;
use kestrel::scanner::Scanner;
use kestrel::token::Token;

#[derive(ClapParser, Debug)]
#[command(version, about = "Kestrel language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Option<Commands>,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize { filename: Option<PathBuf> },

    /// Parses input from a file and prints its AST
    Parse { filename: Option<PathBuf> },

    /// Runs a Kestrel script
    Run { filename: Option<PathBuf> },

    /// Starts an interactive session
    Repl,
}

/// Reads the contents of a file into a Vec<u8>
fn read_file(filename: PathBuf) -> Result<Vec<u8>> {
    info!("Reading file: {:?}", filename);
    let file = File::open(&filename).context(format!("Failed to open file {:?}", filename))?;
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

    // Write to file with module path and source line
    Builder::new()
        .format(|buf, record| {
            // Strip 'kestrel::' from module path
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("kestrel::")
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
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

/// Scan the whole buffer, splitting tokens from lexical errors.
fn scan(buf: &[u8]) -> (Vec<Token>, Vec<KestrelError>) {
    let mut tokens: Vec<Token> = Vec::new();
    let mut errors: Vec<KestrelError> = Vec::new();

    for item in Scanner::new(buf) {
        match item {
            Ok(token) => tokens.push(token),
            Err(e) => errors.push(e),
        }
    }

    (tokens, errors)
}

/// Scan + parse; any error is reported to stderr and ends the process with
/// status 65.
fn frontend(buf: &[u8]) -> Vec<Stmt> {
    let (tokens, scan_errors) = scan(buf);

    if !scan_errors.is_empty() {
        for e in &scan_errors {
            debug!("Lex debug: {}", e);
            eprintln!("{}", e);
        }
        std::process::exit(65);
    }

    match Parser::new(tokens).parse() {
        Ok(statements) => statements,

        Err(errors) => {
            for e in &errors {
                debug!("Parse debug: {}", e);
                eprintln!("{}", e);
            }
            std::process::exit(65);
        }
    }
}

fn run_program(buf: &[u8]) {
    let statements = frontend(buf);

    info!("Parsed {} statements", statements.len());

    let mut interpreter = Interpreter::new();

    if let Err(errors) = Resolver::new(&mut interpreter).resolve(&statements) {
        for e in &errors {
            debug!("Resolution debug: {}", e);
            eprintln!("{}", e);
        }
        std::process::exit(65);
    }

    match interpreter.interpret(&statements) {
        Ok(()) => {
            info!("Program executed successfully");
        }

        Err(KestrelError::Exit { code }) => {
            info!("Program requested exit with code {}", code);
            std::process::exit(code);
        }

        Err(e) => {
            debug!("Runtime debug: {}", e);
            eprintln!("{}", e);
            std::process::exit(70);
        }
    }
}

fn repl() -> Result<()> {
    info!("Starting interactive session");

    let mut interpreter = Interpreter::new();
    let stdin = io::stdin();

    // Node ids continue across lines: the interpreter's binding-distance map
    // outlives each parse, so ids must never repeat within a session.
    let mut next_id: usize = 0;

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }

        let line = line.trim();
        if line.is_empty() {
            break;
        }

        let (tokens, scan_errors) = scan(line.as_bytes());
        if !scan_errors.is_empty() {
            for e in &scan_errors {
                eprintln!("{}", e);
            }
            continue;
        }

        let mut statements = match Parser::with_first_id(tokens, next_id).parse_resuming() {
            Ok((statements, resume_id)) => {
                next_id = resume_id;
                statements
            }
            Err(errors) => {
                for e in &errors {
                    eprintln!("{}", e);
                }
                continue;
            }
        };

        // A lone expression statement gets its value echoed back.
        if statements.len() == 1 {
            if let Stmt::Expression(expr) = statements.remove(0) {
                statements.push(Stmt::Print(expr));
            }
        }

        if let Err(errors) = Resolver::new(&mut interpreter).resolve(&statements) {
            for e in &errors {
                eprintln!("{}", e);
            }
            continue;
        }

        match interpreter.interpret(&statements) {
            Ok(()) => {}

            Err(KestrelError::Exit { code }) => {
                info!("Session requested exit with code {}", code);
                std::process::exit(code);
            }

            Err(e) => eprintln!("{}", e),
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        // Initialize a minimal logger to avoid "no logger" errors
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands {
        None | Some(Commands::Repl) => repl()?,

        Some(Commands::Tokenize { filename }) => match filename {
            Some(filename) => {
                info!("Running Tokenize subcommand");
                let buf = read_file(filename)?;
                let mut tokenized = true;

                for token in Scanner::new(&buf) {
                    match token {
                        Ok(token) => {
                            debug!("Scanned token: {}", token);

                            println!("{}", token);
                        }

                        Err(e) => {
                            tokenized = false;

                            debug!("Tokenization debug: {}", e);

                            eprintln!("{}", e);
                        }
                    }
                }

                if !tokenized {
                    debug!("Tokenization failed, exiting with code 65");

                    std::process::exit(65);
                }

                info!("Tokenization completed successfully");
            }
            None => {
                info!("No filepath provided for Tokenize");

                println!("No input filepath was provided. Exiting...");

                std::process::exit(0);
            }
        },

        Some(Commands::Parse { filename }) => match filename {
            Some(filename) => {
                info!("Running Parse subcommand");
                let buf = read_file(filename)?;
                let statements = frontend(&buf);

                let printer = AstPrinter::new();
                let ast_str = printer.print_program(&statements);

                debug!("AST: {}", ast_str);
                println!("{}", ast_str);

                info!("Parse subcommand completed");
            }
            None => {
                info!("No filepath provided for Parse");
                println!("No input filepath was provided. Exiting...");
                std::process::exit(0);
            }
        },

        Some(Commands::Run { filename }) => match filename {
            Some(filename) => {
                info!("Running Run subcommand");
                let buf = read_file(filename)?;

                run_program(&buf);
            }

            None => {
                info!("No filepath provided for Run");
                println!("No input filepath was provided. Exiting...");
                std::process::exit(0);
            }
        },
    }

    Ok(())
}
