//! Facefill CLI: evaluate face-inpainting output
//!
//! ## Usage
//!
//! ```bash
//! facefill eval --gt-dir data/gt --pred-dir out/pred            # Score a run
//! facefill eval --gt-dir gt --pred-dir pred --size 256 256 -j 0 # Resize, all cores
//! facefill infer --model ./run_model.sh --input-dir masked --output-dir out
//! ```

use clap::Parser;
use facefill_cli::{
    handlers::{execute_eval, execute_infer},
    logging, Cli, CliConfig, CliResult, ColorChoice, Commands, Verbosity,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();

    let config = build_config(&cli);
    logging::init(config.verbosity);

    match cli.command {
        Commands::Eval(args) => execute_eval(&config, &args).map(|_| ()),
        Commands::Infer(args) => execute_infer(&config, &args).map(|_| ()),
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    let verbosity = Verbosity::from_flags(cli.quiet, cli.verbose);
    let color: ColorChoice = cli.color.clone().into();

    CliConfig::new().with_verbosity(verbosity).with_color(color)
}
