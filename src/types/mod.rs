// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Typed resources of the management API and bodies of its HTTP endpoints.

pub mod management;
pub mod remote;

pub use management::{GlobalRole, GlobalRoleBinding, ManagementObject, Setting, User};
pub use remote::{KubeconfigResponse, LoginRequest, LoginResponse};
