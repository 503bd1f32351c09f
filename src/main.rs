mod cli;
mod commands;
mod formatting;
mod settings;

use std::process::ExitCode;

use cli::Commands;
use commands::{run_check_url, run_describe, run_ocr, run_vision};

#[tokio::main]
async fn main() -> ExitCode {
    run().await
}

async fn run() -> ExitCode {
    let raw_args: Vec<String> = std::env::args().collect();
    let args = cli::parse();

    match args.command {
        Commands::Describe {
            image,
            fast,
            show_stages,
            compression_ratio,
            artifacts_dir,
            format,
            output,
        } => {
            run_describe(
                args.config,
                args.verbose,
                image,
                fast,
                show_stages,
                compression_ratio,
                artifacts_dir,
                format,
                output,
            )
            .await
        }
        Commands::Vision {
            input,
            probe_timeout,
            format,
            output,
        } => {
            run_vision(
                &raw_args,
                args.config,
                args.verbose,
                input,
                probe_timeout,
                format,
                output,
            )
            .await
        }
        Commands::CheckUrl {
            url,
            probe_timeout,
            format,
            output,
        } => {
            run_check_url(
                &raw_args,
                args.config,
                args.verbose,
                url,
                probe_timeout,
                format,
                output,
            )
            .await
        }
        Commands::Ocr {
            image,
            artifacts_dir,
            format,
            output,
        } => run_ocr(args.config, args.verbose, image, artifacts_dir, format, output).await,
    }
}
