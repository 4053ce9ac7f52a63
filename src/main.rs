//! ddsp-dataprep - Spectrogram and TFRecord Preparation

use anyhow::Context;
use clap::Parser;
use std::process;
use ddsp_dataprep::{
    Args, Command, CompleteStage, Config, PartialStage, SpectrogramGenerator, StageReport, init_logging,
};

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(args) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    if args.verbose {
        println!("{}", ddsp_dataprep::get_library_info());
        println!();
    }

    let config = Config::from_args(&args).context("Invalid configuration")?;

    match &args.command {
        Command::Spectrograms(_) => {
            let dir = &config.spectrogram.dir;
            println!("=== Spectrograms ===");
            println!("Directory: {}", dir.display());
            println!("====================\n");

            let generator = SpectrogramGenerator::new(&config.spectrogram, config.error_policy());
            let report = generator
                .run(dir)
                .with_context(|| format!("Rendering spectrograms in {}", dir.display()))?;
            report.print_summary();
        }
        Command::Partial(_) => {
            print_banner("Partial Records", &config);
            print_report(run_partial(&config)?, &config);
        }
        Command::Complete(_) => {
            print_banner("Complete Records", &config);
            print_report(run_complete(&config)?, &config);
        }
        Command::Prepare(_) => {
            print_banner("Partial + Complete Records", &config);
            print_report(run_partial(&config)?, &config);
            print_report(run_complete(&config)?, &config);
        }
    }

    Ok(())
}

fn run_partial(config: &Config) -> anyhow::Result<StageReport> {
    PartialStage::new(config)
        .run()
        .with_context(|| format!("Building {}", config.partial_path().display()))
}

fn run_complete(config: &Config) -> anyhow::Result<StageReport> {
    let mut stage = CompleteStage::restore(config)
        .with_context(|| format!("Restoring model from {}", config.split_dir().display()))?;
    stage
        .run()
        .with_context(|| format!("Building {}", config.complete_path().display()))
}

fn print_banner(title: &str, config: &Config) {
    println!("=== {} ===", title);
    println!("Split: {}", config.split_dir().display());
    println!("Sample rate: {} Hz, frame rate: {} Hz", config.sample_rate(), config.frame_rate());
    println!("Error policy: {:?}", config.error_policy());
    println!("============================================\n");
}

fn print_report(report: StageReport, config: &Config) {
    report.print_summary();
    if config.verbose() {
        println!("Failures: {}", report.failures.len());
    }
    println!();
}
