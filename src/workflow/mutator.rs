// SPDX-License-Identifier: MIT

//! Out-of-band state mutation for paused threads

use crate::error::{HitlError, Result};
use crate::workflow::checkpoint::{Checkpoint, CheckpointStore};
use crate::workflow::state::{StateSchema, StateUpdate};

/// Merge `update` into the stored state of `thread_id` without advancing it.
///
/// Keys in `update` win and every other field keeps its value. The pending
/// next node is left unchanged. Fails with [`HitlError::UnknownThread`] when
/// the thread has never run.
pub async fn apply(
    store: &dyn CheckpointStore,
    schema: &StateSchema,
    thread_id: &str,
    update: StateUpdate,
) -> Result<Checkpoint> {
    let _lease = store.lock(thread_id).await;

    if store.load(thread_id).await?.is_none() {
        return Err(HitlError::UnknownThread(thread_id.to_string()));
    }

    for (key, value) in &update {
        schema.validate(key, value)?;
    }

    let checkpoint = store.update(thread_id, update).await?;
    log::info!(
        "Updated state of thread '{}' (next {:?})",
        thread_id,
        checkpoint.next
    );
    Ok(checkpoint)
}
