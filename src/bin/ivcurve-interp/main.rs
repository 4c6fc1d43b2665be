mod cli;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ivcurve::{data_file, find_mpp, Config, InterpolationMode, Interpolator, Point4};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ivcurve=info,ivcurve_interp=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let (config, _) = Config::load()?;
    let mode = args.mode.map(Into::into).unwrap_or(config.interpolation);
    let infinite_val = config.adc.infinite_val;
    tracing::info!("{} file(s), {} interpolation", args.files.len(), mode);

    // curves are independent, no shared state between tasks
    let tasks = args
        .files
        .iter()
        .cloned()
        .map(|file| {
            let write_output = !args.no_output;
            tokio::task::spawn_blocking(move || {
                let result = process_file(&file, mode, infinite_val, write_output);
                (file, result)
            })
        })
        .collect::<Vec<_>>();

    let mut failed = 0;
    for task in tasks {
        let (file, result) = task.await?;
        match result {
            Ok(mpp) => println!(
                "{}: MPP {:.2} W @ {:.2} V, {:.3} A ({:.3} ohms)",
                file.display(),
                mpp.power,
                mpp.voltage,
                mpp.current,
                mpp.resistance
            ),
            Err(e) => {
                tracing::error!("{}: {:#}", file.display(), e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} file(s) failed", failed, args.files.len());
    }
    Ok(())
}

fn process_file(
    file: &Path,
    mode: InterpolationMode,
    infinite_val: f64,
    write_output: bool,
) -> anyhow::Result<Point4> {
    let points = data_file::load_data_points(file)?;
    let curve = Interpolator::new(&points, infinite_val)?.curve(mode)?;
    let mpp = find_mpp(&curve).context("Empty interpolated curve")?;

    if write_output {
        let out = interp_file_name(file);
        data_file::save_data_points(&out, &curve)
            .with_context(|| format!("Writing {:?}", out))?;
    }
    Ok(mpp)
}

/// `dir/name.csv` -> `dir/name_interp.csv`
fn interp_file_name(file: &Path) -> PathBuf {
    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    file.with_file_name(format!("{}_interp.csv", stem))
}
