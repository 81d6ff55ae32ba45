// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::QueueFullError;
use crate::lambda::LogBatch;

/// FIFO of pushed batches shared between the logs listener and the coordinator.
///
/// `push` and `try_pop_all` each hold the lock for their whole operation, so a push racing a
/// drain lands either in that drain or in the next one, never in both or neither.
#[derive(Debug, Default)]
pub struct HandoffQueue {
    batches: Mutex<VecDeque<LogBatch>>,
    capacity: Option<usize>,
}

impl HandoffQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// A queue refusing pushes once `capacity` batches are waiting.
    pub fn bounded(capacity: usize) -> Self {
        HandoffQueue {
            batches: Mutex::new(VecDeque::new()),
            capacity: Some(capacity),
        }
    }

    pub fn push(&self, batch: LogBatch) -> Result<(), QueueFullError> {
        let mut batches = self.lock();
        if let Some(capacity) = self.capacity {
            if batches.len() >= capacity {
                return Err(QueueFullError { capacity });
            }
        }
        batches.push_back(batch);
        Ok(())
    }

    /// Takes every batch queued so far, oldest first. Never waits for new pushes.
    pub fn try_pop_all(&self) -> Vec<LogBatch> {
        let mut batches = self.lock();
        if batches.is_empty() {
            return Vec::new();
        }
        std::mem::take(&mut *batches).into()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock cannot leave a half-written batch behind, so the data
    // is still usable.
    fn lock(&self) -> MutexGuard<'_, VecDeque<LogBatch>> {
        self.batches.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
