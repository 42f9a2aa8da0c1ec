// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # pylon-tests
//!
//! Integration test harness for the pylon gateway: shared mocks (scripted
//! slaves, recording sinks, in-memory port factories) and node-tree
//! builders. The actual integration suites live under `tests/`.

pub mod common;
