// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Middleware modules.

pub mod identity;

pub use identity::{resolve_identity, CurrentUser, Identity};
