#[macro_use]
extern crate clap;
extern crate anyhow;
extern crate mlp_classifier;

use anyhow::{Context, Result};
use clap::App;

use mlp_classifier::cli::{self, Invocation};
use mlp_classifier::{logging, Variant};

fn main() -> Result<()> {
    let yaml = load_yaml!("cli.yml");
    let matches = App::from_yaml(yaml).version(crate_version!()).get_matches();
    let invocation = Invocation::from_matches(&matches, Variant::Holdout);
    logging::init(invocation.verbose);

    let action = if invocation.predict { "Prediction" } else { "Training" };
    cli::run(&invocation).with_context(|| {
        format!(
            "{} on {} with model {} failed",
            action,
            invocation.data_path.display(),
            invocation.model_path.display()
        )
    })
}
