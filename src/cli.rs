use std::io::{self, Write};
use std::path::PathBuf;

use clap::ArgMatches;
use rand::Rng;

use crate::commands;
use crate::config::{Hyperparameters, RunConfig, Variant};
use crate::error::Result;

/// One parsed command line, shared by both binaries.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub variant: Variant,
    pub data_path: PathBuf,
    pub model_path: PathBuf,
    pub seed: u64,
    pub predict: bool,
    pub proba: bool,
    pub config_path: Option<PathBuf>,
    pub verbose: bool,
}

impl Invocation {
    /// Exits with clap's usage message when a required value is missing or the
    /// seed is not an unsigned integer.
    pub fn from_matches(matches: &ArgMatches, variant: Variant) -> Self {
        let required = |name: &str| -> PathBuf {
            match matches.value_of(name) {
                Some(value) => PathBuf::from(value),
                None => clap::Error::argument_not_found_auto(name).exit(),
            }
        };

        let seed = match variant {
            Variant::Holdout => value_t!(matches, "seed", u64).unwrap_or_else(|e| e.exit()),
            Variant::Single => rand::thread_rng().gen::<u32>() as u64,
        };

        Invocation {
            variant,
            data_path: required("data_path"),
            model_path: required("model_path"),
            seed,
            predict: matches.is_present("predict"),
            proba: matches.is_present("proba"),
            config_path: matches.value_of("config").map(PathBuf::from),
            verbose: matches.is_present("verbose"),
        }
    }

    pub fn run_config(&self) -> Result<RunConfig> {
        let preset = match self.variant {
            Variant::Holdout => RunConfig::holdout(self.seed),
            Variant::Single => RunConfig::single(self.seed),
        };

        match self.config_path {
            Some(ref path) => {
                let hyperparameters = Hyperparameters::load_from_file(path)?;
                info!("Hyperparameters loaded from {}", path.display());
                Ok(preset.with_hyperparameters(hyperparameters))
            }
            None => Ok(preset),
        }
    }
}

/// Dispatches to training or prediction, writing results to stdout.
pub fn run(invocation: &Invocation) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if invocation.predict {
        commands::predict(
            &invocation.data_path,
            &invocation.model_path,
            invocation.variant,
            invocation.proba,
            &mut out,
        )?;
    } else {
        let config = invocation.run_config()?;
        if invocation.variant == Variant::Single {
            info!("Random seed: {}", config.seed);
        }
        commands::train(&invocation.data_path, &invocation.model_path, &config, &mut out)?;
    }

    out.flush()?;
    Ok(())
}
