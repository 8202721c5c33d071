pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod drag;
pub mod form;
pub mod host;
pub mod render;
pub mod store;
pub mod view;

#[cfg(test)]
mod testing;

use std::ffi::OsString;
use std::io::{
  self,
  Write
};

use anyhow::Context;
use chrono::Local;
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
    "starting taskdeck"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.deckrc.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let backend = api::HttpBackend::new(
    &cfg.api_url(),
    cfg.api_timeout()?
  )?;
  info!(url = backend.base_url(), "using task backend");

  let host = host::TerminalHost::new(
    cli.yes || !cfg.confirm()
  );
  let mut store =
    store::Store::new(backend, host);
  let renderer =
    render::Renderer::new(&cfg);

  let command = cli.command.unwrap_or_else(
    || {
      cli::Command::List(
        cli::ListArgs::default()
      )
    }
  );

  let runtime =
    tokio::runtime::Builder::new_current_thread()
      .enable_all()
      .build()
      .context(
        "failed to start async runtime"
      )?;

  let stdout = io::stdout();
  let mut out = stdout.lock();
  let mut session = commands::Session {
    renderer: &renderer,
    out: &mut out,
    now: Local::now().naive_local()
  };
  runtime.block_on(commands::dispatch(
    &mut store,
    &mut session,
    command
  ))?;
  out.flush()?;

  info!("done");
  Ok(())
}
