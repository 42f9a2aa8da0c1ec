// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Shared test infrastructure.

pub mod builders;
pub mod mocks;

pub use builders::{BusNodeBuilder, IoNodeBuilder};
pub use mocks::{scripted_slave, MockPortFactory, RecordingSink};
