// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Lambda extension shipping function logs to Kinesis Data Firehose.
//!
//! Two tasks run for the lifetime of the execution environment:
//! - [`listener`]: receives log batches pushed by the Logs API and queues them.
//! - [`coordinator`]: follows the Extensions API lifecycle and, after each event, drains the
//!   [`queue`] into the [`sink`].

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod config;
pub mod coordinator;
pub mod error;
pub mod extension_api;
pub mod http_utils;
pub mod lambda;
pub mod listener;
pub mod logger;
pub mod logs_api;
pub mod queue;
pub mod sink;
