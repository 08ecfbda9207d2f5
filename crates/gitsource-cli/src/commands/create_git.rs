//! `gitsource create git` command
//!
//! Creates or updates a Flux GitRepository source and, depending on the
//! address and flags, the Secret it authenticates with:
//!
//! - `--secret-ref`: reference an existing Secret, nothing is generated
//! - `ssh://` address: generate a deploy key, ask for it to be registered,
//!   then pin the server's host key
//! - `--username` and `--password`: store basic-auth credentials
//!
//! With `--export` the manifest is printed instead of applied.

use std::io::Write;
use std::sync::Arc;

use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use zeroize::Zeroizing;

use gitsource_common::crd::{GitImplementation, RevisionSelector, DEFAULT_BRANCH};
use gitsource_common::duration::parse_duration;
use gitsource_common::kube_utils::parse_labels;
use gitsource_common::{Error as SourceError, DEFAULT_NAMESPACE};
use gitsource_provision::{
    AssumeYes, AuthInputs, Confirm, CredentialProvisioner, EcdsaCurve, KeyAlgorithm, PollConfig,
    ProgressReporter, ProvisionConfig, SourceGitWorkflow, SourceKubeClientImpl, SourceRequest,
    Ssh2HostKeyScanner,
};

use super::resolve_kube_client;
use crate::export::to_yaml;
use crate::progress::ConsoleReporter;
use crate::prompt::ConsoleConfirm;
use crate::Result;

/// Create or update a GitRepository source
#[derive(Args, Debug)]
#[command(after_help = "Examples:
  # Public repository, tracking the master branch
  gitsource create git podinfo --url=https://github.com/stefanprodan/podinfo

  # SSH with a generated ed25519 deploy key, following semver tags
  gitsource create git podinfo --url=ssh://git@github.com/stefanprodan/podinfo \\
    --tag-semver='>=4.0.0' --ssh-key-algorithm=ed25519

  # HTTPS with basic auth
  gitsource create git podinfo --url=https://github.com/stefanprodan/podinfo \\
    --username=git --password=$TOKEN

  # Print the manifest instead of applying it
  gitsource create git podinfo --url=https://github.com/stefanprodan/podinfo --export")]
pub struct CreateGitArgs {
    /// Name of the GitRepository (and of a generated Secret)
    pub name: String,

    /// Repository address, e.g. ssh://git@host/org/repo or https://host/org/repo
    #[arg(long)]
    pub url: String,

    /// Branch to track when neither --tag nor --tag-semver is set
    #[arg(long, default_value = DEFAULT_BRANCH)]
    pub branch: String,

    /// Tag to check out, takes precedence over --branch
    #[arg(long, default_value = "")]
    pub tag: String,

    /// Semver range of tags to follow, takes precedence over --tag
    #[arg(long = "tag-semver", default_value = "")]
    pub semver: String,

    /// Basic authentication username
    #[arg(short = 'u', long)]
    pub username: Option<String>,

    /// Basic authentication password
    #[arg(short = 'p', long)]
    pub password: Option<String>,

    /// Deploy key algorithm (rsa, ecdsa, ed25519)
    #[arg(long, default_value = "rsa")]
    pub ssh_key_algorithm: String,

    /// RSA key size in bits
    #[arg(long, default_value_t = gitsource_provision::keygen::DEFAULT_RSA_BITS)]
    pub ssh_rsa_bits: usize,

    /// ECDSA curve (p256, p384, p521)
    #[arg(long, default_value = "p384")]
    pub ssh_ecdsa_curve: String,

    /// Name of an existing Secret with credentials; nothing is generated
    #[arg(long)]
    pub secret_ref: Option<String>,

    /// Git client library for the controller (go-git, libgit2)
    #[arg(long)]
    pub git_implementation: Option<String>,

    /// Label to set on the source and Secret, as key=value (repeatable)
    #[arg(long = "label", value_name = "KEY=VALUE")]
    pub labels: Vec<String>,

    /// How often the controller fetches the repository
    #[arg(long, default_value = "1m")]
    pub interval: String,

    /// Namespace of the source
    #[arg(short = 'n', long, env = "GITSOURCE_NAMESPACE", default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,

    /// How long to wait for the source to be fetched
    #[arg(long, default_value = "5m")]
    pub timeout: String,

    /// Delay between readiness checks
    #[arg(long, default_value = "2s")]
    pub poll_interval: String,

    /// How long to wait for the SSH server's host key
    #[arg(long, default_value = "30s")]
    pub ssh_probe_timeout: String,

    /// Print the GitRepository as YAML instead of applying it
    #[arg(long)]
    pub export: bool,

    /// Path to kubeconfig file
    #[arg(long, env = "KUBECONFIG")]
    pub kubeconfig: Option<String>,

    /// Kubeconfig context to use
    #[arg(long)]
    pub context: Option<String>,

    /// Do not ask to confirm the deploy key was registered
    #[arg(short = 'y', long)]
    pub yes: bool,
}

impl CreateGitArgs {
    /// Turn the flags into a validated request
    pub fn to_request(&self) -> Result<SourceRequest> {
        let revision = RevisionSelector::from_inputs(&self.branch, &self.tag, &self.semver)?;
        let interval = parse_duration(&self.interval)?;
        let labels = parse_labels(&self.labels)?;
        let git_implementation = match self.git_implementation.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(value) => Some(value.parse::<GitImplementation>()?),
        };

        let request = SourceRequest {
            name: self.name.clone(),
            namespace: self.namespace.clone(),
            url: self.url.clone(),
            revision,
            interval,
            labels,
            git_implementation,
            auth: AuthInputs {
                secret_ref: self.secret_ref.clone(),
                username: self.username.clone(),
                password: self.password.clone().map(Zeroizing::new),
            },
        };
        request.validate()?;
        Ok(request)
    }

    /// Key generation and host probe settings
    pub fn provision_config(&self) -> Result<ProvisionConfig> {
        let curve = self.ssh_ecdsa_curve.parse::<EcdsaCurve>()?;
        Ok(ProvisionConfig {
            key_algorithm: KeyAlgorithm::from_flags(
                &self.ssh_key_algorithm,
                self.ssh_rsa_bits,
                curve,
            )?,
            host_key_timeout: parse_duration(&self.ssh_probe_timeout)?,
        })
    }

    /// Readiness polling settings
    pub fn poll_config(&self) -> Result<PollConfig> {
        let interval = parse_duration(&self.poll_interval)?;
        if interval.is_zero() {
            return Err(SourceError::invalid_selection_for(
                "--poll-interval",
                "must be greater than zero",
            )
            .into());
        }
        Ok(PollConfig {
            interval,
            timeout: parse_duration(&self.timeout)?,
        })
    }
}

/// Run the create git command
pub async fn run(args: CreateGitArgs) -> Result<()> {
    let request = args.to_request()?;

    if args.export {
        let repository = request.to_git_repository(
            request
                .auth
                .secret_ref
                .clone()
                .filter(|name| !name.is_empty()),
        );
        let yaml = to_yaml(&repository)?;
        let mut out = std::io::stdout().lock();
        out.write_all(yaml.as_bytes())?;
        return Ok(());
    }

    let provision = args.provision_config()?;
    let poll = args.poll_config()?;

    let client = resolve_kube_client(args.kubeconfig.as_deref(), args.context.as_deref()).await?;

    let reporter: Arc<dyn ProgressReporter> = Arc::new(ConsoleReporter::stderr());
    let confirm: Arc<dyn Confirm> = if args.yes {
        Arc::new(AssumeYes)
    } else {
        Arc::new(ConsoleConfirm)
    };
    let provisioner = CredentialProvisioner::new(
        provision,
        Arc::new(Ssh2HostKeyScanner),
        confirm,
        Arc::clone(&reporter),
    );
    let workflow = SourceGitWorkflow::new(
        Arc::new(SourceKubeClientImpl::new(client)),
        provisioner,
        poll,
        reporter,
    );

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping");
            on_signal.cancel();
        }
    });

    let outcome = workflow.run(&request, &cancel).await?;
    info!(
        name = %request.name,
        namespace = %request.namespace,
        revision = %outcome.revision,
        source = %outcome.source,
        "git source ready"
    );
    Ok(())
}
