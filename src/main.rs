use temperature_import::{logging, Config};

fn main() -> miette::Result<()> {
    logging::init();

    let config = Config::from_args(std::env::args().skip(1));
    let summary = temperature_import::run(&config)?;

    tracing::info!(
        "wrote {} regions to `{}`, {} without valid data",
        summary.regions().len(),
        config.output_dir.display(),
        summary.skipped().len()
    );

    Ok(())
}
