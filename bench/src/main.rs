mod args;
mod error;
mod flow;
mod harness;
mod logging;
mod reclaim;
mod transport;
mod utils;

use crate::args::command::PipeBenchCommand;
use crate::args::common::PipeBenchArgs;
use crate::args::examples::print_examples;
use crate::error::PipeBenchError;
use crate::harness::HarnessOutcome;
use crate::logging::Logging;
use clap::Parser;
use pipebench_report::hardware::BenchmarkHardware;
use pipebench_report::params::BenchmarkParams;
use pipebench_report::report::BenchmarkReport;
use std::process::ExitCode;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let args = match PipeBenchArgs::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Benchmark failed: {e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: PipeBenchArgs) -> Result<(), PipeBenchError> {
    let mut logging = Logging::new();
    match &args.command {
        Some(PipeBenchCommand::Examples) => {
            print_examples();
            return Ok(());
        }
        Some(PipeBenchCommand::Consume(consume)) => {
            logging.init(consume.verbose, None)?;
            harness::run_consumer(consume).await?;
            return Ok(());
        }
        None => {}
    }

    args.validate()?;
    logging.init(args.verbose, args.output_dir())?;

    let outcome = match args.sweep_config() {
        Some(sweep) => harness::sweep::run(&sweep).await?,
        None => harness::run(&args.harness_config()).await?,
    };
    if let Some(sweep) = &outcome.sweep {
        for line in sweep.output_lines() {
            println!("{line}");
        }
    }
    for line in outcome.result.output_lines() {
        println!("{line}");
    }

    let report = build_report(&args, outcome);
    report.print_summary();
    if let Some(output_dir) = args.output_dir() {
        let report_path = report
            .dump_to_json(output_dir)
            .map_err(|e| PipeBenchError::io("writing the report", e))?;
        let samples_path = report
            .dump_to_csv(output_dir)
            .map_err(|e| PipeBenchError::io("writing the samples", e))?;
        info!(
            "Report saved to {}, samples saved to {}",
            report_path.display(),
            samples_path.display()
        );
    }
    Ok(())
}

fn build_report(args: &PipeBenchArgs, outcome: HarnessOutcome) -> BenchmarkReport {
    let params = BenchmarkParams::from(args);
    let hardware = if args.output_dir().is_some() {
        BenchmarkHardware::detect(params.identifier.clone())
    } else {
        BenchmarkHardware {
            identifier: params.identifier.clone(),
            ..Default::default()
        }
    };
    BenchmarkReport::new(
        hardware,
        params,
        outcome.result,
        outcome.flows,
        outcome.samples,
        outcome.stable,
        outcome.sweep,
    )
}
