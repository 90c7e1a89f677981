// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Record of the objects one run must remove or neutralise before it returns

use crate::config::UserPolicy;
use crate::kubernetes::{delete, Store};
use crate::provisioning::{delete_user, reset_password};
use crate::types::{GlobalRole, GlobalRoleBinding};
use std::fmt;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupAction {
    DeleteRole(String),
    DeleteBinding(String),
    /// Apply the user policy to the provisioned user
    ReleaseUser { name: String, policy: UserPolicy },
}

impl fmt::Display for CleanupAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CleanupAction::DeleteRole(name) => write!(f, "delete GlobalRole {}", name),
            CleanupAction::DeleteBinding(name) => write!(f, "delete GlobalRoleBinding {}", name),
            CleanupAction::ReleaseUser { name, policy } => {
                write!(f, "apply {:?} to User {}", policy, name)
            }
        }
    }
}

/// Actions are unwound in reverse registration order.
#[derive(Debug, Default)]
pub struct CleanupLedger {
    actions: Vec<CleanupAction>,
}

impl CleanupLedger {
    pub fn register(&mut self, action: CleanupAction) {
        debug!("Registered cleanup: {}", action);
        self.actions.push(action);
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Actions not unwound yet, in the order they would run
    pub fn pending(&self) -> impl Iterator<Item = &CleanupAction> {
        self.actions.iter().rev()
    }

    /// Run every registered action, continuing past failures.
    /// Returns one message per failed action.
    pub async fn unwind(&mut self, store: &Store) -> Vec<String> {
        let mut failures = Vec::new();

        while let Some(action) = self.actions.pop() {
            let res = match &action {
                CleanupAction::DeleteRole(name) => delete::<GlobalRole>(store, name).await,
                CleanupAction::DeleteBinding(name) => {
                    delete::<GlobalRoleBinding>(store, name).await
                }
                CleanupAction::ReleaseUser { name, policy } => match policy {
                    UserPolicy::ResetPassword => reset_password(store, name).await,
                    UserPolicy::Delete => delete_user(store, name).await,
                    UserPolicy::Keep => Ok(()),
                },
            };

            if let Err(e) = res {
                warn!("Cleanup step '{}' failed: {}", action, e);
                failures.push(format!("{}: {}", action, e));
            }
        }

        failures
    }
}
