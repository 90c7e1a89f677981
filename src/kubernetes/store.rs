// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Object-store access shared by every provisioning step

use crate::constants::{management::SERVER_URL_SETTING, poll};
use crate::error::{BindError, Result};
use crate::types::{ManagementObject, Setting};
use kube::{Api, Client, Resource};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};
use url::Url;

/// Interval and ceiling of the deletion poll loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        PollSettings {
            interval: Duration::from_millis(poll::INTERVAL_MILLIS),
            timeout: Duration::from_secs(poll::TIMEOUT_SECS),
        }
    }
}

/// A Kubernetes client bound to the cancellation token of one workflow run.
#[derive(Clone)]
pub struct Store {
    client: Client,
    cancel: CancellationToken,
    poll: PollSettings,
}

impl Store {
    pub fn new(client: Client, cancel: CancellationToken) -> Self {
        Self {
            client,
            cancel,
            poll: PollSettings::default(),
        }
    }

    pub fn with_poll_settings(mut self, poll: PollSettings) -> Self {
        self.poll = poll;
        self
    }

    /// A copy that ignores cancellation, used to clean up after a cancelled run.
    pub fn detached(&self) -> Self {
        Self {
            client: self.client.clone(),
            cancel: CancellationToken::new(),
            poll: self.poll,
        }
    }

    pub fn poll_settings(&self) -> PollSettings {
        self.poll
    }

    pub fn api<K: ManagementObject>(&self) -> Api<K> {
        Api::all(self.client.clone())
    }

    /// Run an API call unless the run gets cancelled first.
    pub async fn guard<T, F>(&self, call: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, kube::Error>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(BindError::Cancelled),
            res = call => res.map_err(BindError::from),
        }
    }

    /// Cancellable sleep
    pub async fn sleep(&self, duration: Duration) -> Result<()> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(BindError::Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }

    /// Resolve the Rancher server URL from the `server-url` setting.
    #[instrument(skip(self))]
    pub async fn server_url(&self) -> Result<String> {
        let settings = self.api::<Setting>();
        let setting = self
            .guard(settings.get_opt(SERVER_URL_SETTING))
            .await?
            .ok_or_else(|| BindError::NotFound {
                kind: Setting::kind(&()).into_owned(),
                name: SERVER_URL_SETTING.to_string(),
            })?;

        let value = setting.value.trim();
        if value.is_empty() {
            return Err(BindError::ValidationError(format!(
                "setting '{}' is empty",
                SERVER_URL_SETTING
            )));
        }

        let url = Url::parse(value).map_err(|e| {
            BindError::ValidationError(format!(
                "setting '{}' is not a valid URL ({}): {}",
                SERVER_URL_SETTING, value, e
            ))
        })?;

        debug!("Resolved Rancher server URL {}", url);
        Ok(url.as_str().trim_end_matches('/').to_string())
    }
}
