//! Bounded concurrent fan-out with order-preserving reassembly.
//!
//! Page summarization and result verification both issue one inference call
//! per item. Items are started in submission order, at most `concurrency` run
//! at once, and results come back in whatever order they finish; each is
//! tagged with its submission index so the output can be put back in order.
//! The first error ends the fan-out and drops (cancels) every call still in
//! flight.

use futures::stream::{self, StreamExt, TryStreamExt};
use std::future::Future;

/// Run `f` over `items` with at most `concurrency` futures in flight.
///
/// Returns outputs in the order of `items`, or the first error encountered.
pub async fn fan_out<I, T, U, E, F, Fut>(items: I, concurrency: usize, f: F) -> Result<Vec<U>, E>
where
    I: IntoIterator<Item = T>,
    F: Fn(usize, T) -> Fut,
    Fut: Future<Output = Result<U, E>>,
{
    let mut tagged: Vec<(usize, U)> = stream::iter(items.into_iter().enumerate().map(|(idx, item)| {
        let fut = f(idx, item);
        async move { fut.await.map(|out| (idx, out)) }
    }))
    .buffer_unordered(concurrency.max(1))
    .try_collect()
    .await?;

    tagged.sort_by_key(|(idx, _)| *idx);
    Ok(tagged.into_iter().map(|(_, out)| out).collect())
}
