// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! The provisioning workflow and its cleanup bookkeeping.

pub mod cleanup;
pub mod orchestrator;

pub use cleanup::{CleanupAction, CleanupLedger};
pub use orchestrator::{Stage, Workflow};
