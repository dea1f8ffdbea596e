//! Combine-latest over any number of result streams.

use futures_util::{Stream, StreamExt};
use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Merges the latest value of every input into one stream.
///
/// Nothing is emitted until each input has produced a value. After that,
/// every value from any input yields exactly one merged value built from
/// the latest value of each input. An `Err` from any input is passed on and
/// ends the stream. The stream ends when every input has ended, or as soon
/// as an input ends without ever producing a value.
pub struct CombineLatest<S, V, O, F> {
    inputs: Vec<Option<S>>,
    latest: Vec<Option<V>>,
    merge: F,
    next_poll: usize,
    done: bool,
    _output: PhantomData<fn() -> O>,
}

/// Combine `inputs` with `merge`, which receives the latest values in input
/// order.
pub fn combine_latest<S, V, E, O, F>(inputs: Vec<S>, merge: F) -> CombineLatest<S, V, O, F>
where
    S: Stream<Item = Result<V, E>> + Unpin,
    F: FnMut(&[&V]) -> O,
{
    let latest = inputs.iter().map(|_| None).collect();
    CombineLatest {
        inputs: inputs.into_iter().map(Some).collect(),
        latest,
        merge,
        next_poll: 0,
        done: false,
        _output: PhantomData,
    }
}

/// Concatenate lists in input order.
pub fn concat<T: Clone>(parts: &[&Vec<T>]) -> Vec<T> {
    let mut all = Vec::with_capacity(parts.iter().map(|p| p.len()).sum());
    for part in parts {
        all.extend(part.iter().cloned());
    }
    all
}

impl<S, V, O, F> CombineLatest<S, V, O, F>
where
    F: FnMut(&[&V]) -> O,
{
    fn merged(&mut self) -> Option<O> {
        let values = self.latest.iter().map(Option::as_ref).collect::<Option<Vec<_>>>()?;
        Some((self.merge)(&values))
    }
}

impl<S, V, E, O, F> Stream for CombineLatest<S, V, O, F>
where
    S: Stream<Item = Result<V, E>> + Unpin,
    F: FnMut(&[&V]) -> O,
    V: Unpin,
    F: Unpin,
{
    type Item = Result<O, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }

        let count = this.inputs.len();
        // Rotate the starting input so a busy stream cannot starve the rest.
        for offset in 0..count {
            let index = (this.next_poll + offset) % count;
            let Some(input) = this.inputs[index].as_mut() else {
                continue;
            };

            match input.poll_next_unpin(cx) {
                Poll::Ready(Some(Ok(value))) => {
                    this.latest[index] = Some(value);
                    this.next_poll = (index + 1) % count;
                    if let Some(merged) = this.merged() {
                        return Poll::Ready(Some(Ok(merged)));
                    }
                    // Still waiting on another input. The one that just
                    // yielded registered no waker, so poll again.
                    cx.waker().wake_by_ref();
                    return Poll::Pending;
                }
                Poll::Ready(Some(Err(e))) => {
                    this.done = true;
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(None) => {
                    this.inputs[index] = None;
                    if this.latest[index].is_none() {
                        this.done = true;
                        return Poll::Ready(None);
                    }
                }
                Poll::Pending => {}
            }
        }

        if this.inputs.iter().all(Option::is_none) {
            this.done = true;
            return Poll::Ready(None);
        }
        Poll::Pending
    }
}
