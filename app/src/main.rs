use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use common::{
    config::Config,
    grid::enumerate_grid,
    plot::{ChartConfig, render_line_chart},
    report::{group_records, parse_log},
};
use eyre::{Context, Result};
use tokio::fs::{read_to_string, write};
use tracing::error;
use tracing_subscriber::{
    EnvFilter,
    fmt::{layer, time::ChronoLocal},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

mod sweep;

#[derive(Parser)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    #[arg(long, default_value_t = false)]
    no_progress: bool,
    #[arg(short, long)]
    log: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the configured parameter sweep
    Sweep {
        #[arg(short, long, default_value = "config.yaml")]
        config_file: String,
    },
    /// Parse the sweep log and render the timing chart
    Report {
        #[arg(short, long, default_value = "config.yaml")]
        config_file: String,
        /// Output path for the SVG chart (defaults to the log path with an
        /// .svg extension)
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Also export the grouped series as CSV
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Also export the grouped series as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },
    /// Print the commands a sweep would run
    Print {
        #[arg(short, long, default_value = "config.yaml")]
        config_file: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let log_level = std::env::var("RUST_LOG").unwrap_or("warn".to_owned());
    let args = Cli::parse();
    let file_appender = tracing_appender::rolling::never(".", "log.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let mut env_filter = EnvFilter::new(format!("sweep_bench={log_level},common={log_level}"));
    for log in &args.log {
        env_filter = env_filter.add_directive(log.parse()?);
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            layer()
                .with_timer(ChronoLocal::new("%v %k:%M:%S %z".to_owned()))
                .compact(),
        )
        .with(layer().with_writer(non_blocking))
        .init();

    match args.command {
        Commands::Sweep { config_file } => {
            let config = load_config(&config_file).await?;
            if let Err(err) = sweep::run_sweep(config, args.no_progress).await {
                error!("{err:#?}");
                return Err(err);
            }
        }
        Commands::Report {
            config_file,
            out,
            csv,
            json,
        } => {
            let config = load_config(&config_file).await?;
            report(&config, out, csv, json).await?;
        }
        Commands::Print { config_file } => {
            let config = load_config(&config_file).await?;
            print_commands(&config);
        }
    };

    Ok(())
}

async fn load_config(path: &str) -> Result<Config> {
    let raw = read_to_string(path)
        .await
        .wrap_err_with(|| format!("Read config file {path}"))?;
    let config: Config =
        serde_yml::from_str(&raw).wrap_err_with(|| format!("Parse config file {path}"))?;
    config.validate()?;
    Ok(config)
}

fn print_commands(config: &Config) {
    for point in enumerate_grid(&config.thread_counts, config.sizes, config.iterations) {
        println!(
            "{} {} {} {}",
            config.binary.display(),
            point.size,
            point.iterations,
            point.threads
        );
    }
}

async fn report(
    config: &Config,
    out: Option<PathBuf>,
    csv: Option<PathBuf>,
    json: Option<PathBuf>,
) -> Result<()> {
    let raw = read_to_string(&config.log_file)
        .await
        .wrap_err_with(|| format!("Read log file {}", config.log_file.display()))?;
    let records = parse_log(&raw)
        .wrap_err_with(|| format!("Parse log file {}", config.log_file.display()))?;
    let series = group_records(&records);

    // exports happen before rendering so the parsed data is still usable
    // when the chart fails
    if let Some(path) = &csv {
        write(path, series.to_csv()?)
            .await
            .wrap_err_with(|| format!("Write CSV export {}", path.display()))?;
        println!("Series written to {}", path.display());
    }
    if let Some(path) = &json {
        write(path, serde_json::to_string_pretty(&series)?)
            .await
            .wrap_err_with(|| format!("Write JSON export {}", path.display()))?;
        println!("Series written to {}", path.display());
    }

    let chart = chart_config(config);
    let svg = render_line_chart(&series, &chart).wrap_err("Render chart")?;
    let out = out.unwrap_or_else(|| config.log_file.with_extension("svg"));
    write_chart(&out, &svg).await?;
    println!("Chart written to {}", out.display());
    Ok(())
}

fn chart_config(config: &Config) -> ChartConfig {
    let mut chart = ChartConfig::default();
    if let Some(title) = &config.settings.chart_title {
        chart.title = title.clone();
    }
    if let Some(x_label) = &config.settings.x_label {
        chart.x_label = x_label.clone();
    }
    if let Some(y_label) = &config.settings.y_label {
        chart.y_label = y_label.clone();
    }
    chart
}

async fn write_chart(path: &Path, svg: &str) -> Result<()> {
    write(path, svg)
        .await
        .wrap_err_with(|| format!("Write chart {}", path.display()))
}
