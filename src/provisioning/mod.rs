// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Provisioning of the temporary user and its role grants.

pub mod steps;

pub use steps::{
    apply_role_to_existing_user, create_ephemeral_role, create_role_binding, create_user,
    delete_user, reset_password,
};
