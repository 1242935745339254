pub mod bucket;
pub mod calendar;
pub mod cli;
pub mod colors;
pub mod commands;
pub mod config;
pub mod datastore;
pub mod error;
pub mod period;
pub mod render;
pub mod sqlite;
pub mod store;
pub mod task;
pub mod view;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting datebook"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.rcfile.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let data_dir =
    config::resolve_data_dir(
      &cfg,
      cli.data.as_deref()
    )
    .context(
      "failed to resolve data \
       directory"
    )?;

  let backend = cfg.backend()?;
  let mut store =
    store::open_store(
      backend, &data_dir
    )
    .with_context(|| {
      format!(
        "failed to open {backend} \
         store at {}",
        data_dir.display()
      )
    })?;

  let renderer =
    render::Renderer::new(&cfg)?;
  let inv = cli::Invocation::parse(
    &cfg, cli.rest
  )?;

  commands::dispatch(
    store.as_mut(),
    &cfg,
    &renderer,
    &data_dir,
    inv
  )?;

  info!("done");
  Ok(())
}
