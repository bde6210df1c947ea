use clap::{Parser, Subcommand};
use meson_ops::error::{CliExitCode, exit_code_for_error};
use meson_ops::{Result, driver, input, registry, report, validate};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "make-meson-ops")]
#[command(about = "Construct group meson operators from elemental operators", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG wins when set.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build every group operator for every configuration and timeslice.
    Run {
        #[arg(long)]
        input: String,

        /// Output document listing every file written.
        #[arg(short = 'o', long)]
        output: String,

        /// Do not run the cross-file consistency checks.
        #[arg(long)]
        skip_checks: bool,

        /// Process configurations concurrently.
        #[arg(long)]
        parallel: bool,
    },

    /// Index the elemental operators and run the consistency checks only.
    Validate {
        #[arg(long)]
        input: String,
    },

    /// Print the header summary and shape of one operator file.
    Inspect { file: String },
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match execute(cli.cmd) {
        Ok(()) => CliExitCode::Success.into(),
        Err(err) => {
            error!("{:#}", err);
            exit_code_for_error(&err).into()
        }
    }
}

fn execute(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Run {
            input,
            output,
            skip_checks,
            parallel,
        } => {
            // 1) Parse the input document.
            let doc = input::load_input(&input)?;
            let params = &doc.make_meson_ops;

            // 2) Command line switches override the document.
            let mut opts = driver::RunOptions::from_input(params);
            if skip_checks {
                opts.check_consistency = false;
            }
            opts.parallel |= parallel;

            // 3) Build and write every operator.
            let summary = driver::run(params, opts)?;

            // 4) Record what was written.
            report::write_output_document(&output, &doc, &summary)?;
            println!(
                "Wrote {} operator files for {} group operators; summary in {}",
                summary.outputs.len() * 2,
                summary.operators.len(),
                output
            );
        }

        Commands::Validate { input } => {
            let doc = input::load_input(&input)?;
            let params = &doc.make_meson_ops;
            params.validate()?;

            let manifests = &params.input_files.elem_op_files;
            let reg = registry::ElementalRegistry::build(manifests)?;
            let checked = validate::check_consistency(manifests, Some(params.param.decay_dir))?;
            info!(nelem = reg.len(), "validation finished");
            println!(
                "OK: {} elemental operators, {} configs, {} timeslices, {} files checked",
                reg.len(),
                checked.configs,
                checked.timeslices,
                checked.files_checked
            );
        }

        Commands::Inspect { file } => {
            let summary = report::describe_file(&file)?;
            print!("{}", summary.render());
        }
    }

    Ok(())
}
