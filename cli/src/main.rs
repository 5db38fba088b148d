use {
    anyhow::Context as _,
    autoclick::{
        spawn_desktop_chain, ChainConfig, Locate, Locator, MatchThreshold, Matcher, TemplateImage,
    },
    clap::Parser,
    std::{path::PathBuf, process},
    tracing::info,
    tracing_subscriber::{filter::LevelFilter, EnvFilter},
};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
enum Args {
    /// List attached displays and their geometry.
    Displays,
    /// Search all displays once for a template without clicking.
    Locate {
        template: PathBuf,
        #[clap(long)]
        threshold: Option<f64>,
    },
    /// Run a step chain from a JSON config and wait for it to finish.
    Run {
        config: PathBuf,
        /// Overrides the threshold from the config file.
        #[clap(long)]
        threshold: Option<f64>,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env()?,
        )
        .init();

    match args {
        Args::Displays => {
            let context = autoclick_desktop::Context::new()?;
            for display in context.displays()? {
                println!(
                    "#{} id={} origin=({}, {}) size={}x{}",
                    display.index,
                    display.id,
                    display.offset_x,
                    display.offset_y,
                    display.width,
                    display.height
                );
            }
        }
        Args::Locate {
            template,
            threshold,
        } => {
            let template = TemplateImage::load(&template)?;
            let threshold = threshold.map(MatchThreshold::new).unwrap_or_default();
            let context = autoclick_desktop::Context::new()?;
            let locator = Locator::new(context, Matcher::new(threshold));
            match locator.locate(&template)? {
                Some(found) => println!(
                    "{} at ({}, {}) on display #{} (score {:.4})",
                    template.name(),
                    found.point.x,
                    found.point.y,
                    found.display_index,
                    found.score
                ),
                None => {
                    println!("{} not found", template.name());
                    process::exit(1);
                }
            }
        }
        Args::Run { config, threshold } => {
            let mut config = ChainConfig::load(&config)?;
            if let Some(threshold) = threshold {
                config.threshold = MatchThreshold::new(threshold);
            }
            let chain = config.to_chain()?;
            info!("starting click chain with {} steps", chain.len());
            let report = spawn_desktop_chain(chain, config.threshold)
                .context("failed to start click chain")?
                .join();
            if !report.is_success() {
                process::exit(1);
            }
        }
    }

    Ok(())
}
