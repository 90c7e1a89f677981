// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Individual provisioning steps, each built on the create-or-update primitive

use crate::constants::{management::GROUP, PROVISIONING_GROUP};
use crate::error::Result;
use crate::kubernetes::{create_or_update, delete, Mode, Store};
use crate::types::{GlobalRole, GlobalRoleBinding, User};
use k8s_openapi::api::rbac::v1::PolicyRule;
use kube::api::{Patch, PatchParams};
use kube::ResourceExt;
use serde_json::json;
use tracing::{info, instrument, warn};

fn cluster_read_rule(group: &str) -> PolicyRule {
    PolicyRule {
        api_groups: Some(vec![group.to_string()]),
        resources: Some(vec!["clusters".to_string()]),
        verbs: vec!["get".to_string(), "list".to_string(), "watch".to_string()],
        ..Default::default()
    }
}

/// Create the user `name` with the given bcrypt hash, replacing any previous one.
#[instrument(skip(store, password_hash))]
pub async fn create_user(store: &Store, name: &str, password_hash: &str) -> Result<User> {
    create_or_update(store, User::new(name, password_hash), Mode::Recreate)
        .await
        .inspect_err(|e| warn!("unable to create a new user: {}", e))
}

/// Create the throwaway role that lets `user` read clusters, which is enough to get a token.
#[instrument(skip(store, user), fields(user = %user.name_any()))]
pub async fn create_ephemeral_role(store: &Store, user: &User) -> Result<GlobalRole> {
    let role = GlobalRole::new(
        &user.name_any(),
        vec![cluster_read_rule(GROUP), cluster_read_rule(PROVISIONING_GROUP)],
    );

    create_or_update(store, role, Mode::Recreate)
        .await
        .inspect_err(|e| warn!("unable to create a new role: {}", e))
}

/// Bind `role` to `user`. The binding carries the role's name.
#[instrument(skip(store, user, role), fields(user = %user.name_any(), role = %role.name_any()))]
pub async fn create_role_binding(
    store: &Store,
    user: &User,
    role: &GlobalRole,
) -> Result<GlobalRoleBinding> {
    let binding = GlobalRoleBinding::for_role(&role.name_any(), &user.name_any());

    create_or_update(store, binding, Mode::Recreate)
        .await
        .inspect_err(|e| warn!("unable to create a new role binding: {}", e))
}

/// Grant a caller-supplied role to an existing user. Both objects are kept after the run.
#[instrument(skip(store, role), fields(role = %role.name_any()))]
pub async fn apply_role_to_existing_user(
    store: &Store,
    username: &str,
    role: GlobalRole,
) -> Result<(GlobalRole, GlobalRoleBinding)> {
    let binding = GlobalRoleBinding::for_role(&role.name_any(), username);

    let role = create_or_update(store, role, Mode::Update)
        .await
        .inspect_err(|e| warn!("unable to create a user role: {}", e))?;
    let binding = create_or_update(store, binding, Mode::Update)
        .await
        .inspect_err(|e| warn!("unable to create a user role binding: {}", e))?;

    info!(
        "Granted role {} to user {}",
        role.name_any(),
        binding.user_name
    );
    Ok((role, binding))
}

/// Clear the stored password hash so the one-time password can no longer log in.
#[instrument(skip(store))]
pub async fn reset_password(store: &Store, name: &str) -> Result<()> {
    let users = store.api::<User>();
    let patch = json!({ "password": "" });

    store
        .guard(users.patch(name, &PatchParams::default(), &Patch::Merge(&patch)))
        .await?;
    info!("Reset password of user {}", name);
    Ok(())
}

#[instrument(skip(store))]
pub async fn delete_user(store: &Store, name: &str) -> Result<()> {
    delete::<User>(store, name).await
}
