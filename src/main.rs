// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{Context, Result};
use clap::Parser;
use kube::Client;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rancher_bind::config::Config;
use rancher_bind::kubernetes::Store;
use rancher_bind::manifest::ManifestRegistry;
use rancher_bind::remote::RemoteAuth;
use rancher_bind::workflow::Workflow;

/// Generate a kubeconfig for a newly created Rancher user matching the provided role
#[derive(Parser, Debug)]
#[command(name = "kubectl-rancher-bind")]
#[command(after_help = "Example:\n  kubectl rancher-bind -f <global-role.yaml>")]
struct Cli {
    /// A file with a GlobalRole manifest
    #[arg(short = 'f', long = "file")]
    file: PathBuf,

    /// Skip TLS verification and drop certificate authority data in the generated kubeconfig
    #[arg(long)]
    insecure: bool,

    /// Name of the provisioned user and its temporary role and binding
    #[arg(long, env = "RANCHER_BIND_NAME")]
    name: Option<String>,

    /// Write the kubeconfig to this file instead of stdout
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr, stdout is reserved for the kubeconfig
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(name) = cli.name {
        config.identity = name;
        config.validate()?;
    }
    info!("Provisioning credentials as '{}'", config.identity);

    let registry = ManifestRegistry::default();
    let manifest = registry
        .decode_file(&cli.file)
        .with_context(|| format!("unable to decode provided manifest {}", cli.file.display()))?;

    let client = Client::try_default()
        .await
        .context("Failed to connect to the Rancher management cluster")?;
    info!("Connected to Kubernetes cluster");

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("Interrupted, cancelling. Interrupt again to exit without cleanup");
        on_interrupt.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted during cleanup, exiting");
            std::process::exit(130);
        }
    });

    let store = Store::new(client, cancel);
    let remote = RemoteAuth::new()?;
    let mut workflow = Workflow::new(store, remote, config);

    let kubeconfig = workflow.run(manifest, cli.insecure).await?;

    match cli.output {
        Some(path) => {
            write_private(&path, &kubeconfig)
                .with_context(|| format!("Failed to write kubeconfig to {}", path.display()))?;
            info!("Kubeconfig written to {}", path.display());
        }
        None => print!("{}", kubeconfig),
    }

    Ok(())
}

/// Write a file readable only by its owner, it contains a bearer token
fn write_private(path: &std::path::Path, contents: &str) -> std::io::Result<()> {
    use std::io::Write;

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)?.write_all(contents.as_bytes())
}
