//! CLI commands

use std::fmt::Display;

use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::debug;

use crate::{Error, Result};

pub mod create_git;

/// Extension trait to convert errors with Display to CLI Error::CommandFailed.
pub trait CommandErrorExt<T> {
    /// Convert an error to `Error::CommandFailed` using its Display implementation.
    fn cmd_err(self) -> Result<T>;
}

impl<T, E: Display> CommandErrorExt<T> for std::result::Result<T, E> {
    fn cmd_err(self) -> Result<T> {
        self.map_err(|e| Error::command_failed(e.to_string()))
    }
}

/// Build a kube [`Client`].
///
/// Resolution priority:
/// 1. `explicit`: the `--kubeconfig` flag (or `KUBECONFIG`, via clap)
/// 2. kube defaults (in-cluster config / `~/.kube/config`)
///
/// `context` selects a context from the resolved kubeconfig.
pub async fn resolve_kube_client(explicit: Option<&str>, context: Option<&str>) -> Result<Client> {
    let explicit = explicit.filter(|p| !p.is_empty());
    if explicit.is_none() && context.is_none() {
        debug!("using default kube client configuration");
        return Client::try_default().await.cmd_err();
    }

    let kubeconfig = match explicit {
        Some(path) => Kubeconfig::read_from(path).map_err(|e| {
            Error::command_failed(format!("failed to read kubeconfig {}: {}", path, e))
        })?,
        None => Kubeconfig::read()
            .map_err(|e| Error::command_failed(format!("failed to read kubeconfig: {}", e)))?,
    };

    let options = KubeConfigOptions {
        context: context.map(str::to_string),
        ..Default::default()
    };
    kube_client_from_kubeconfig(kubeconfig, &options).await
}

/// Build a kube [`Client`] from an already-loaded [`Kubeconfig`] with options.
pub async fn kube_client_from_kubeconfig(
    kubeconfig: Kubeconfig,
    options: &KubeConfigOptions,
) -> Result<Client> {
    let config = Config::from_custom_kubeconfig(kubeconfig, options)
        .await
        .cmd_err()?;
    Client::try_from(config).cmd_err()
}
