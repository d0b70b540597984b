//! Bounded Concurrency Executor
//!
//! Runs an ordered batch of work items through an async mapper with at most
//! `limit` mapper invocations in flight. Workers pull from one shared cursor,
//! so a slow item never blocks the rest of the batch, and results land in
//! the slot matching their input position.

use std::future::Future;
use std::sync::Mutex;

use futures::future::join_all;

/// Map `items` through `mapper`, at most `limit` at a time, preserving order.
///
/// The mapper's output is returned untouched, so fallible mappers surface one
/// `Result` per item. A `limit` of zero is treated as one.
pub async fn run_bounded<T, R, F, Fut>(items: Vec<T>, limit: usize, mapper: F) -> Vec<R>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = R>,
{
    let total = items.len();
    if total == 0 {
        return Vec::new();
    }

    let workers = limit.max(1).min(total);
    let cursor = Mutex::new(items.into_iter().enumerate());
    let slots: Mutex<Vec<Option<R>>> = Mutex::new((0..total).map(|_| None).collect());

    let (cursor_ref, slots_ref, mapper) = (&cursor, &slots, &mapper);

    join_all((0..workers).map(|_| async move {
        loop {
            // Guard is dropped before the mapper is awaited.
            let claimed = cursor_ref.lock().unwrap_or_else(|e| e.into_inner()).next();
            let Some((index, item)) = claimed else {
                break;
            };
            let output = mapper(item).await;
            slots_ref.lock().unwrap_or_else(|e| e.into_inner())[index] = Some(output);
        }
    }))
    .await;

    slots
        .into_inner()
        .unwrap_or_else(|e| e.into_inner())
        .into_iter()
        .flatten()
        .collect()
}
