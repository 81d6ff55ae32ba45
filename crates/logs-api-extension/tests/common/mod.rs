// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Common test utilities, fakes, and helpers for integration tests

#![allow(dead_code)]

pub mod fakes;
pub mod helpers;
