use std::fs;
use std::process::ExitCode;

use wasmstream::parser::validate::validate;
use wasmstream::parser::Parser;

#[derive(clap::Parser)]
#[command(name = "wasmstream")]
#[command(about = "WebAssembly binary module section stream toolkit")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Print the section event stream of a module
    Dump {
        /// Path to the WebAssembly module
        file: String,
    },

    /// Check module-level structural invariants
    Validate {
        /// Path to the WebAssembly module
        file: String,
    },
}

fn main() -> ExitCode {
    let cli = <Cli as clap::Parser>::parse();

    match cli.command {
        Commands::Dump { file } => dump_module(&file),
        Commands::Validate { file } => validate_module(&file),
    }
}

fn dump_module(file: &str) -> ExitCode {
    let bytes = match fs::read(file) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Error reading {}: {}", file, e);
            return ExitCode::FAILURE;
        }
    };

    for event in Parser::new(&bytes) {
        match event {
            Ok(payload) => println!("{}", payload),
            Err(e) => {
                eprintln!("Error parsing {}: {}", file, e);
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}

fn validate_module(file: &str) -> ExitCode {
    let bytes = match fs::read(file) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Error reading {}: {}", file, e);
            return ExitCode::FAILURE;
        }
    };

    let result = validate(&bytes);
    if result.is_valid() {
        println!("{}: ok", file);
        ExitCode::SUCCESS
    } else {
        for message in result.messages() {
            eprintln!("{}: {}", file, message);
        }
        ExitCode::FAILURE
    }
}
