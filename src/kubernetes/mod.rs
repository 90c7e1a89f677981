// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Object-store access and the idempotent create-or-update primitive.

pub mod mutator;
pub mod store;

pub use mutator::{create_or_update, delete, wait_for_deletion, Mode};
pub use store::{PollSettings, Store};
