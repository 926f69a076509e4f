#![warn(clippy::all, clippy::pedantic, clippy::nursery, rust_2018_idioms)]
#![allow(
    clippy::module_name_repetitions,
    clippy::redundant_field_names,
    clippy::struct_field_names,
    clippy::option_if_let_else,
    clippy::missing_const_for_fn,
    clippy::cast_precision_loss,
    clippy::redundant_pub_crate,
    clippy::struct_excessive_bools
)]
#![forbid(unsafe_code)]

use clap::Parser;
use config::{Args, PingerConfig};

mod app;
mod config;
mod report;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let cfg = PingerConfig::from_args(args)?;
    app::run_pinger(&cfg).map(|_| ())
}
