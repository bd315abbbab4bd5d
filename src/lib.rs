extern crate byteorder;
extern crate csv;
extern crate matrixmultiply;
extern crate rand;
extern crate serde;
extern crate serde_json;
#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate log;
#[macro_use]
extern crate clap;
extern crate env_logger;
extern crate thiserror;

pub mod artifact;
pub mod classifier;
pub mod cli;
pub mod commands;
pub mod config;
pub mod dataset;
pub mod error;
pub mod logging;
pub mod math;
pub mod network;
pub mod optimizer;
pub mod scaler;
pub mod split;
pub mod timing;
pub mod trainer;

pub use artifact::Artifact;
pub use classifier::MlpClassifier;
pub use config::{Hyperparameters, RunConfig, Variant};
pub use dataset::Dataset;
pub use error::{Error, Result};
pub use scaler::StandardScaler;
