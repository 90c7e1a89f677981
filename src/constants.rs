// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Default name shared by the provisioned user, its ephemeral role and binding
pub const DEFAULT_IDENTITY: &str = "rancher-bind";

/// Rancher management API coordinates
pub mod management {
    pub const GROUP: &str = "management.cattle.io";
    pub const VERSION: &str = "v3";
    /// Name of the Setting holding the externally reachable Rancher URL
    pub const SERVER_URL_SETTING: &str = "server-url";
}

/// Provisioning API group, also granted read access by the ephemeral role
pub const PROVISIONING_GROUP: &str = "provisioning.cattle.io";

/// Relative endpoints of the Rancher HTTP API
pub mod endpoints {
    pub const LOGIN: &str = "/v3-public/localProviders/local?action=login";
    pub const GENERATE_KUBECONFIG: &str = "/v3/clusters/local?action=generateKubeconfig";
}

/// Deletion polling used by recreate-mode create-or-update
pub mod poll {
    pub const INTERVAL_MILLIS: u64 = 500;
    pub const TIMEOUT_SECS: u64 = 10;
}

/// Ceiling for unwinding the ephemeral objects of one run
pub mod cleanup {
    pub const TIMEOUT_SECS: u64 = 30;
}

/// Generated password shape
pub mod password {
    pub const LENGTH: usize = 64;
    pub const MIN_DIGITS: usize = 10;
    pub const MIN_SYMBOLS: usize = 10;
}
