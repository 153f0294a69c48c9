pub mod cli;
pub mod collections;
pub mod commands;
pub mod config;
pub mod display;
pub mod model;
pub mod notify;
pub mod render;
pub mod session;
pub mod store;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info};

#[tracing::instrument(skip_all)]
pub fn run(raw_args: Vec<OsString>) -> anyhow::Result<()> {
    let pre = cli::preprocess_args(&raw_args)?;
    let cli = cli::GlobalCli::parse_from(pre.cleaned_args);

    cli::init_tracing(cli.verbose, cli.quiet)?;

    info!(
        verbose = cli.verbose,
        quiet = cli.quiet,
        "starting together CLI"
    );
    debug!(?pre.rc_overrides, "preprocessed rc overrides");

    let mut cfg = config::Config::load(cli.togetherrc.as_deref())?;
    cfg.apply_overrides(
        pre.rc_overrides
            .into_iter()
            .chain(cli.rc_overrides.into_iter().map(|kv| (kv.key, kv.value))),
    );

    let data_dir = config::resolve_data_dir(&cfg, cli.data.as_deref())
        .context("failed to resolve data directory")?;

    let partners = cfg.partners();
    let partner_names: Vec<String> = partners.iter().map(|p| p.name.clone()).collect();

    let session = session::SessionFile::open(&data_dir, partner_names.clone());
    let client = collections::open(&cfg, &data_dir).with_context(|| {
        format!(
            "failed to open collection store (data dir {})",
            data_dir.display()
        )
    })?;
    let mut store = store::SyncStore::new(client, partner_names);

    let mut renderer = render::Renderer::new(&cfg)?;
    let inv = cli::Invocation::parse(&cfg, cli.rest)?;

    commands::dispatch(&mut store, &cfg, &session, &mut renderer, inv)?;

    info!("done");
    Ok(())
}
