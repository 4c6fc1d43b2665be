mod cli;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ivcurve::components::choose_optimal_components;
use ivcurve::report::SimReport;
use ivcurve::{convert, data_file};
use ivcurve::{generate, AdcScale, Config, CurveModel, Interpolator, TimingParams};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ivcurve=info,ivcurve_sim=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    tracing::info!("Loading config...");
    let mut config = match &args.config {
        Some(path) => Config::from_file(path).with_context(|| format!("Loading {:?}", path))?,
        None => Config::load()?.0,
    };
    apply_overrides(&mut config, &args);

    tracing::info!("{}", config);

    let model = CurveModel::from_config(&config.model)?;
    if args.choose_components {
        config.hardware = choose_optimal_components(
            model.isc(),
            model.voc(),
            &config.hardware,
            &config.adc,
            &config.optimizer,
        )?;
    }

    let scale = AdcScale::from_hardware(&config.hardware, &config.adc)?;
    let timing = TimingParams::from_hardware(&config.hardware, config.model.num_synth_points);
    let synthesis = generate(&model, &timing, &config.reduction, &scale)?;

    let points = convert::to_points(&synthesis.adc_pairs, &scale);
    let interpolator = Interpolator::new(&points, scale.infinite_val)?;
    let curve = interpolator.curve(config.interpolation)?;
    let mpp = ivcurve::find_mpp(&curve).context("Empty interpolated curve")?;

    let run_dir = args.output.join(format!(
        "sim_{}",
        chrono::Local::now().format("%y%m%d_%H_%M_%S")
    ));
    std::fs::create_dir_all(&run_dir).with_context(|| format!("Creating {:?}", run_dir))?;

    data_file::save_adc_pairs(&run_dir.join("adc_pairs.csv"), &synthesis.adc_pairs)?;
    data_file::save_data_points(&run_dir.join("data_points.csv"), &points)?;
    data_file::save_data_points(&run_dir.join("interpolated.csv"), &curve)?;
    data_file::save_plot_table(&run_dir.join("plot_data.txt"), &curve)?;
    config
        .save(&run_dir.join("config.json"))
        .context("Saving run config")?;

    let report = SimReport::new(&model, &config.hardware, &scale, &config.optimizer, &synthesis);
    println!("\nSimulation Results\n\n{}\n", run_dir.display());
    println!("{}", report);
    println!(
        "MPP ({} interpolation): {:.2} W @ {:.2} V, {:.3} A",
        config.interpolation, mpp.power, mpp.voltage, mpp.current
    );

    Ok(())
}

fn apply_overrides(config: &mut ivcurve::Config, args: &cli::Cli) {
    if let Some(isc) = args.isc {
        config.model.isc = isc;
    }
    if let Some(voc) = args.voc {
        config.model.voc = voc;
    }
    if let Some(shape) = args.shape {
        config.model.shape_ratio = shape;
    }
    if let Some(points) = args.points {
        config.model.num_synth_points = points;
    }
    if let Some(max_points) = args.max_points {
        config.reduction.max_points = max_points;
    }
    if let Some(max_discards) = args.max_discards {
        config.reduction.max_consecutive_discards = max_discards;
    }
    if let Some(mode) = args.mode {
        config.interpolation = mode.into();
    }
}
