use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Future that drives a set of fallible futures concurrently.
///
/// All futures are polled on every wake-up from the same task, so they
/// interleave cooperatively on the calling thread. Resolves to the outputs in
/// input order once every future succeeded, or to the first error observed.
/// Remaining futures are dropped on error.
pub struct TryJoinAll<F, T> {
    pending: Vec<Option<Pin<Box<F>>>>,
    results: Vec<Option<T>>,
}

/// Join a collection of fallible futures. See [`TryJoinAll`].
pub fn try_join_all<I, F, T, E>(futures: I) -> TryJoinAll<F, T>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, E>>,
{
    let pending: Vec<_> = futures.into_iter().map(|f| Some(Box::pin(f))).collect();
    let results = pending.iter().map(|_| None).collect();
    TryJoinAll { pending, results }
}

// Futures are boxed and results are never pinned.
impl<F, T> Unpin for TryJoinAll<F, T> {}

impl<F, T, E> Future for TryJoinAll<F, T>
where
    F: Future<Output = Result<T, E>>,
{
    type Output = Result<Vec<T>, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        let mut all_done = true;

        for (slot, result) in this.pending.iter_mut().zip(this.results.iter_mut()) {
            let Some(fut) = slot else {
                continue;
            };
            match fut.as_mut().poll(cx) {
                Poll::Ready(Ok(value)) => {
                    *result = Some(value);
                    *slot = None;
                }
                Poll::Ready(Err(err)) => return Poll::Ready(Err(err)),
                Poll::Pending => all_done = false,
            }
        }

        if all_done {
            let results = std::mem::take(&mut this.results);
            Poll::Ready(Ok(results.into_iter().flatten().collect()))
        } else {
            Poll::Pending
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Future that returns Pending a fixed number of times before resolving.
    struct Delayed {
        remaining: u32,
        value: Result<u32, &'static str>,
    }

    impl Future for Delayed {
        type Output = Result<u32, &'static str>;

        fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
            if self.remaining == 0 {
                Poll::Ready(self.value)
            } else {
                self.remaining -= 1;
                cx.waker().wake_by_ref();
                Poll::Pending
            }
        }
    }

    #[test]
    fn preserves_input_order() {
        let futures = vec![
            Delayed { remaining: 3, value: Ok(1) },
            Delayed { remaining: 0, value: Ok(2) },
            Delayed { remaining: 1, value: Ok(3) },
        ];
        let out = pollster::block_on(try_join_all(futures)).unwrap();
        assert_eq!(out, vec![1, 2, 3]);
    }

    #[test]
    fn first_error_wins() {
        let futures = vec![
            Delayed { remaining: 5, value: Ok(1) },
            Delayed { remaining: 1, value: Err("boom") },
        ];
        let out = pollster::block_on(try_join_all(futures));
        assert_eq!(out, Err("boom"));
    }

    #[test]
    fn empty_set_is_ready() {
        let futures: Vec<Delayed> = Vec::new();
        let out = pollster::block_on(try_join_all(futures)).unwrap();
        assert!(out.is_empty());
    }
}
