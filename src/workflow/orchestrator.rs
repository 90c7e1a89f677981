// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Sequencing of one credential-provisioning run

use crate::config::{CleanupPolicy, Config};
use crate::constants::cleanup;
use crate::credentials::generate_credential;
use crate::error::{BindError, Result};
use crate::kubeconfig;
use crate::kubernetes::Store;
use crate::manifest::Manifest;
use crate::provisioning::{
    apply_role_to_existing_user, create_ephemeral_role, create_role_binding, create_user,
};
use crate::remote::RemoteAuth;
use crate::types::LoginRequest;
use crate::workflow::cleanup::{CleanupAction, CleanupLedger};
use kube::ResourceExt;
use std::fmt;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

/// Progress of a run. Stages are entered strictly in declaration order;
/// any failure moves the run to `Aborted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    ServerResolved,
    CredentialGenerated,
    UserCreated,
    RoleCreated,
    BindingCreated,
    Authenticated,
    ConfigCollected,
    RoleApplied,
    Done,
    Aborted,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Provisions a temporary user, exchanges it for a kubeconfig and grants the
/// caller's role to it. Ephemeral grants never outlive [`Workflow::run`].
pub struct Workflow {
    store: Store,
    remote: RemoteAuth,
    config: Config,
    stage: Stage,
    cleanup_timeout: Duration,
}

impl Workflow {
    pub fn new(store: Store, remote: RemoteAuth, config: Config) -> Self {
        Self {
            store,
            remote,
            config,
            stage: Stage::Start,
            cleanup_timeout: Duration::from_secs(cleanup::TIMEOUT_SECS),
        }
    }

    /// Give up on unwinding ephemeral objects after `timeout`
    pub fn with_cleanup_timeout(mut self, timeout: Duration) -> Self {
        self.cleanup_timeout = timeout;
        self
    }

    /// The last stage entered
    pub fn stage(&self) -> Stage {
        self.stage
    }

    fn advance(&mut self, stage: Stage) {
        info!("{} -> {}", self.stage, stage);
        self.stage = stage;
    }

    /// Run the workflow and return the kubeconfig, with TLS verification
    /// disabled when `insecure` is set.
    #[instrument(skip(self, manifest), fields(identity = %self.config.identity))]
    pub async fn run(&mut self, manifest: Manifest, insecure: bool) -> Result<String> {
        let mut ledger = CleanupLedger::default();

        let result = self.execute(manifest, insecure, &mut ledger).await;

        // cleanup also has to happen when the run itself was cancelled
        let failures = if ledger.is_empty() {
            Vec::new()
        } else {
            self.unwind(&mut ledger).await
        };

        match result {
            Err(e) => {
                error!("Workflow aborted after stage {}: {}", self.stage, e);
                if !failures.is_empty() {
                    warn!("{} cleanup step(s) failed after abort", failures.len());
                }
                self.stage = Stage::Aborted;
                Err(e)
            }
            Ok(_) if !failures.is_empty() && self.config.cleanup_policy == CleanupPolicy::Fail => {
                self.stage = Stage::Aborted;
                Err(BindError::CleanupError(failures))
            }
            Ok(kubeconfig) => {
                self.advance(Stage::Done);
                Ok(kubeconfig)
            }
        }
    }

    async fn unwind(&self, ledger: &mut CleanupLedger) -> Vec<String> {
        let store = self.store.detached();
        let outcome = tokio::time::timeout(self.cleanup_timeout, ledger.unwind(&store)).await;
        match outcome {
            Ok(failures) => failures,
            Err(_) => {
                let mut failures = vec![format!(
                    "cleanup did not finish within {:?}",
                    self.cleanup_timeout
                )];
                failures.extend(ledger.pending().map(|action| format!("{}: skipped", action)));
                warn!("{}", failures.join("; "));
                failures
            }
        }
    }

    async fn execute(
        &mut self,
        manifest: Manifest,
        insecure: bool,
        ledger: &mut CleanupLedger,
    ) -> Result<String> {
        let Manifest::GlobalRole(durable_role) = manifest;
        if durable_role.name_any() == self.config.identity {
            return Err(BindError::ValidationError(format!(
                "role '{}' collides with the temporary role of the same name",
                self.config.identity
            )));
        }

        let server_url = self.store.server_url().await?;
        self.advance(Stage::ServerResolved);

        let credential = generate_credential(self.config.bcrypt_cost).await?;
        self.advance(Stage::CredentialGenerated);

        let user = create_user(&self.store, &self.config.identity, &credential.hash).await?;
        ledger.register(CleanupAction::ReleaseUser {
            name: user.name_any(),
            policy: self.config.user_policy,
        });
        self.advance(Stage::UserCreated);

        let role = create_ephemeral_role(&self.store, &user).await?;
        ledger.register(CleanupAction::DeleteRole(role.name_any()));
        self.advance(Stage::RoleCreated);

        let binding = create_role_binding(&self.store, &user, &role).await?;
        ledger.register(CleanupAction::DeleteBinding(binding.name_any()));
        self.advance(Stage::BindingCreated);

        let request = LoginRequest {
            username: user.username.clone(),
            password: credential.plaintext.expose().to_string(),
        };
        drop(credential);
        let login = self.remote.login(&server_url, &request).await?;
        drop(request);
        self.advance(Stage::Authenticated);

        let generated = self.remote.fetch_kubeconfig(&server_url, &login.token).await?;
        let rendered = kubeconfig::render(&generated.config, insecure)?;
        self.advance(Stage::ConfigCollected);

        apply_role_to_existing_user(&self.store, &user.username, durable_role).await?;
        self.advance(Stage::RoleApplied);

        Ok(rendered)
    }
}
