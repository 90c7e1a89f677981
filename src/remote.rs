// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Token and kubeconfig exchange with the Rancher HTTP API

use crate::constants::endpoints::{GENERATE_KUBECONFIG, LOGIN};
use crate::error::{BindError, Result};
use crate::types::{KubeconfigResponse, LoginRequest, LoginResponse};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};

/// HTTP client for the Rancher login and kubeconfig endpoints.
///
/// Certificate validation is disabled: Rancher installs commonly run with a
/// self-signed certificate and the operator already trusts the management cluster.
#[derive(Clone, Debug)]
pub struct RemoteAuth {
    http: reqwest::Client,
}

impl RemoteAuth {
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| BindError::TransportError {
                endpoint: "<client>".to_string(),
                source: e,
            })?;
        Ok(Self { http })
    }

    /// Exchange username and password for a bearer token.
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn login(&self, server_url: &str, request: &LoginRequest) -> Result<LoginResponse> {
        let endpoint = format!("{}{}", server_url, LOGIN);
        debug!("Logging in at {}", endpoint);

        let response = self
            .http
            .post(&endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| BindError::TransportError {
                endpoint: endpoint.clone(),
                source: e,
            })?;

        let login: LoginResponse = read_json(&endpoint, response, "login").await?;
        info!("Obtained token for user {}", request.username);
        Ok(login)
    }

    /// Ask Rancher to generate a kubeconfig for the local cluster on behalf of `token`.
    #[instrument(skip(self, token))]
    pub async fn fetch_kubeconfig(&self, server_url: &str, token: &str) -> Result<KubeconfigResponse> {
        let endpoint = format!("{}{}", server_url, GENERATE_KUBECONFIG);
        debug!("Requesting kubeconfig from {}", endpoint);

        let response = self
            .http
            .post(&endpoint)
            .header(AUTHORIZATION, basic_authorization(token))
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| BindError::TransportError {
                endpoint: endpoint.clone(),
                source: e,
            })?;

        let kubeconfig: KubeconfigResponse = read_json(&endpoint, response, "kubeconfig").await?;
        info!("Collected kubeconfig");
        Ok(kubeconfig)
    }
}

fn basic_authorization(token: &str) -> String {
    format!("Basic {}", STANDARD.encode(token))
}

/// Check the status first, then parse the body.
async fn read_json<T: DeserializeOwned>(
    endpoint: &str,
    response: reqwest::Response,
    what: &str,
) -> Result<T> {
    let status = response.status();
    let body = response.text().await.map_err(|e| BindError::TransportError {
        endpoint: endpoint.to_string(),
        source: e,
    })?;

    if !status.is_success() {
        return Err(BindError::HttpStatusError {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str(&body)
        .map_err(|e| BindError::DecodeError(format!("error parsing the {} response: {}", what, e)))
}
