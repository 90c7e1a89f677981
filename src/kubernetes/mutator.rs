// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Idempotent create-or-update of management objects

use crate::error::{BindError, Result};
use crate::kubernetes::store::Store;
use crate::types::ManagementObject;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{DeleteParams, PostParams};
use kube::ResourceExt;
use tracing::{debug, info, instrument};

/// How an already existing object is brought to the desired state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Delete, wait until the object is gone, create again
    Recreate,
    /// Update in place on top of the stored version
    Update,
}

fn is_already_exists(err: &BindError) -> bool {
    matches!(
        err,
        BindError::KubeError(kube::Error::Api(ae)) if ae.code == 409 && ae.reason == "AlreadyExists"
    )
}

/// Create `object`, or converge the existing object of the same name according to `mode`.
///
/// Returns the object as persisted by the API server.
#[instrument(skip(store, object), fields(kind = %K::kind(&()), name = %object.name_any()))]
pub async fn create_or_update<K: ManagementObject>(
    store: &Store,
    mut object: K,
    mode: Mode,
) -> Result<K> {
    let Some(name) = object.meta().name.clone() else {
        return Err(BindError::ValidationError(format!(
            "{} has no metadata.name",
            K::kind(&())
        )));
    };
    object.stamp_type_meta();

    let api = store.api::<K>();
    let pp = PostParams::default();

    let err = match store.guard(api.create(&pp, &object)).await {
        Ok(created) => {
            info!("Created {} {}", K::kind(&()), name);
            return Ok(created);
        }
        Err(e) => e,
    };

    if !is_already_exists(&err) {
        return Err(err);
    }

    match mode {
        Mode::Recreate => {
            debug!("{} {} already exists, recreating", K::kind(&()), name);
            delete::<K>(store, &name).await?;
            wait_for_deletion::<K>(store, &name).await?;

            let created = store.guard(api.create(&pp, &object)).await?;
            info!("Recreated {} {}", K::kind(&()), name);
            Ok(created)
        }
        Mode::Update => {
            debug!("{} {} already exists, updating", K::kind(&()), name);
            let current = store.guard(api.get(&name)).await?;
            let desired = merge_onto(current.meta(), object);

            let updated = store.guard(api.replace(&name, &pp, &desired)).await?;
            info!("Updated {} {}", K::kind(&()), name);
            Ok(updated)
        }
    }
}

/// Carry store-assigned metadata (resource version, uid, timestamps) over to `desired`.
/// Labels and annotations of `desired` are layered on top of the stored ones.
fn merge_onto<K: ManagementObject>(current: &ObjectMeta, mut desired: K) -> K {
    let mut metadata = current.clone();
    let wanted = desired.meta_mut();

    if let Some(labels) = wanted.labels.take() {
        metadata.labels.get_or_insert_with(Default::default).extend(labels);
    }
    if let Some(annotations) = wanted.annotations.take() {
        metadata
            .annotations
            .get_or_insert_with(Default::default)
            .extend(annotations);
    }

    *desired.meta_mut() = metadata;
    desired
}

/// Delete an object by name. An object that is already gone counts as deleted.
#[instrument(skip(store), fields(kind = %K::kind(&())))]
pub async fn delete<K: ManagementObject>(store: &Store, name: &str) -> Result<()> {
    let api = store.api::<K>();

    match store.guard(api.delete(name, &DeleteParams::default())).await {
        Ok(_) => {
            info!("Deleted {} {}", K::kind(&()), name);
            Ok(())
        }
        Err(e) if e.is_not_found() => {
            debug!("{} {} already gone", K::kind(&()), name);
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Wait until `name` is no longer returned by the API server.
///
/// Checks immediately, then every poll interval, and gives up with
/// [`BindError::DeletionTimeout`] once the poll timeout elapses.
pub async fn wait_for_deletion<K: ManagementObject>(store: &Store, name: &str) -> Result<()> {
    let poll = store.poll_settings();

    match tokio::time::timeout(poll.timeout, poll_until_gone::<K>(store, name)).await {
        Ok(res) => res,
        Err(_) => Err(BindError::DeletionTimeout {
            kind: K::kind(&()).into_owned(),
            name: name.to_string(),
            timeout: poll.timeout,
        }),
    }
}

async fn poll_until_gone<K: ManagementObject>(store: &Store, name: &str) -> Result<()> {
    let api = store.api::<K>();
    let interval = store.poll_settings().interval;

    loop {
        match store.guard(api.get_opt(name)).await? {
            None => {
                debug!("{} {} is gone", K::kind(&()), name);
                return Ok(());
            }
            Some(_) => {
                debug!(
                    "{} {} still present, checking again in {:?}",
                    K::kind(&()),
                    name,
                    interval
                );
                store.sleep(interval).await?;
            }
        }
    }
}
