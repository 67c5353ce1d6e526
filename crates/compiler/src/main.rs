//! midl compiler CLI
//!
//! `midlc <schema> [<output_prefix>]` compiles a schema file into
//! `<prefix>.decl` and `<prefix>.impl`. Diagnostics go to stderr, one
//! per line; the exit code is 1 on any parse, I/O, or usage failure.

use clap::Parser as ClapParser;
use clap::error::ErrorKind;
use std::process;

#[derive(ClapParser)]
#[command(name = "midlc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "midl compiler - emit Rust serializers and servant skeletons", long_about = None)]
struct Cli {
    /// Input schema file
    schema: String,

    /// Output prefix (defaults to the schema basename)
    output_prefix: Option<String>,
}

fn main() {
    // Usage failures exit 1, like every other failure; --help and
    // --version still exit 0.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            process::exit(code);
        }
    };

    if let Err(err) = midlc::compile_file(&cli.schema, cli.output_prefix.as_deref()) {
        eprintln!("{err}");
        process::exit(1);
    }
}
