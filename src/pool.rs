//! Minimal scoped worker pool for the per-frame stages.

use crate::error::{Error, PixResult};
use crossbeam_channel::Sender;
use std::sync::atomic::{AtomicBool, Ordering::SeqCst};

/// Fans messages from `producer` out to `threads` copies of `consumer` on
/// scoped threads. Once any consumer fails, the rest keep draining the
/// channel without processing, so the producer never wedges on a full queue.
pub(crate) fn run<M, P, C, R>(threads: usize, name: &str, producer: P, consumer: C) -> PixResult<R>
where
    M: Send,
    C: Clone + Send + FnMut(M) -> PixResult<()>,
    P: FnOnce(Sender<M>) -> PixResult<R>,
{
    debug_assert!(threads > 0);
    let failed = &AtomicBool::new(false);
    std::thread::scope(move |scope| {
        let (sender, receiver) = crossbeam_channel::bounded::<M>(2);
        let mut handles = Vec::with_capacity(threads);
        for n in 0..threads {
            let receiver = receiver.clone();
            let mut consumer = consumer.clone();
            let handle = std::thread::Builder::new()
                .name(format!("{name}{n}"))
                .spawn_scoped(scope, move || -> PixResult<()> {
                    for m in receiver {
                        if failed.load(SeqCst) {
                            continue;
                        }
                        if let Err(e) = consumer(m) {
                            failed.store(true, SeqCst);
                            return Err(e);
                        }
                    }
                    Ok(())
                })
                .map_err(|_| Error::ThreadSend)?;
            handles.push(handle);
        }
        drop(receiver);

        let res = producer(sender);
        let mut worker_err = None;
        for handle in handles {
            match handle.join() {
                Ok(Ok(())) => {},
                Ok(Err(e)) => worker_err = Some(e),
                Err(_) => worker_err = Some(Error::ThreadSend),
            }
        }
        match (res, worker_err) {
            (Err(e), _) => Err(e),
            (_, Some(e)) => Err(e),
            (Ok(r), None) => Ok(r),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn all_messages_are_consumed() {
        let count = AtomicUsize::new(0);
        let count = &count;
        run(4, "test", |tx| {
            for i in 0..100usize {
                tx.send(i)?;
            }
            Ok(())
        }, move |_m: usize| {
            count.fetch_add(1, SeqCst);
            Ok(())
        }).unwrap();
        assert_eq!(count.load(SeqCst), 100);
    }

    #[test]
    fn consumer_error_propagates() {
        let res: PixResult<()> = run(2, "test", |tx| {
            for i in 0..50usize {
                if tx.send(i).is_err() {
                    break;
                }
            }
            Ok(())
        }, |m: usize| {
            if m == 3 { Err(Error::Aborted) } else { Ok(()) }
        });
        assert!(matches!(res, Err(Error::Aborted)));
    }
}
