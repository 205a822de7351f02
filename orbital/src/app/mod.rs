mod report;
mod tasks;
mod universe;

pub use universe::build_universe;

use self::report::report_universe;
use self::tasks::run_task;
use crate::config::{Args, Config};
use crate::io::setup_output;
use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub struct OrbitalApplication {
    args: Args,
    config: Config,
}

impl OrbitalApplication {
    pub fn from_cli() -> Result<Self> {
        let args = Args::parse();
        let config = load_config(&args)?;
        Ok(Self { args, config })
    }

    pub fn run(self) -> Result<()> {
        let verbose = self.args.verbose || self.config.task.verbose.unwrap_or(false);
        setup_output(self.args.output.as_ref(), verbose);
        info!("Configuration loaded from: {}", self.args.config_file);

        let frame = self.args.frame.unwrap_or(0);
        let mut uni = build_universe(&self.config, &config_dir(&self.args.config_file), frame)?;
        run_task(&mut uni, &self.config, &self.args)?;
        report_universe(&mut uni, self.args.summary.as_ref())?;
        Ok(())
    }
}

fn load_config(args: &Args) -> Result<Config> {
    let config_content = fs::read_to_string(&args.config_file)
        .wrap_err_with(|| format!("Unable to read configuration file: {}", args.config_file))?;

    let config = serde_yml::from_str::<Config>(&config_content)
        .wrap_err("Failed to parse configuration file")?
        .with_defaults();

    Ok(config)
}

fn config_dir(config_file: &str) -> PathBuf {
    Path::new(config_file)
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default()
}
