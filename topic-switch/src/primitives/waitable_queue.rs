/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! In-flight tracking with a single shared "became empty" wait.

use futures::future::{self, BoxFuture, FutureExt, Shared};
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};
use tokio::sync::oneshot;

/// Identity of one [`WaitableQueue`] entry. Not cloneable, so each entry is removed once.
#[derive(Debug, Eq, Hash, PartialEq)]
pub struct QueueTicket(u64);

impl QueueTicket {
    pub fn id(&self) -> u64 {
        self.0
    }
}

type EmptySignal = Shared<BoxFuture<'static, ()>>;

#[derive(Default)]
struct QueueState {
    next_id: u64,
    pending: HashSet<u64>,
    waiter: Option<(oneshot::Sender<()>, EmptySignal)>,
}

///
/// [`WaitableQueue`] tracks in-flight entries by ticket identity.
///
/// [`wait_empty`][WaitableQueue::wait_empty] resolves at once when nothing is pending.
/// Otherwise all callers share one pending future that resolves when the last entry
/// is removed.
///
/// # Examples
///
/// ```
/// use topic_switch::primitives::WaitableQueue;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let queue = WaitableQueue::new();
/// let first = queue.add();
/// let second = queue.add();
///
/// let drained = queue.wait_empty();
/// queue.remove(first);
/// queue.remove(second);
/// drained.await;
/// assert!(queue.is_empty());
/// # });
/// ```
#[derive(Default)]
pub struct WaitableQueue {
    state: Mutex<QueueState>,
}

impl WaitableQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self) -> QueueTicket {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let id = state.next_id;
        state.next_id += 1;
        state.pending.insert(id);
        QueueTicket(id)
    }

    /// Removes the entry behind `ticket`. Returns `false` if it was already gone.
    pub fn remove(&self, ticket: QueueTicket) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let removed = state.pending.remove(&ticket.0);
        if state.pending.is_empty() {
            if let Some((notify, _)) = state.waiter.take() {
                let _ = notify.send(());
            }
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolves once the queue is empty.
    pub fn wait_empty(&self) -> BoxFuture<'static, ()> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.pending.is_empty() {
            return future::ready(()).boxed();
        }
        if let Some((_, signal)) = &state.waiter {
            return signal.clone().boxed();
        }

        let (notify, emptied) = oneshot::channel::<()>();
        let signal = emptied.map(|_| ()).boxed().shared();
        state.waiter = Some((notify, signal.clone()));
        signal.boxed()
    }

    #[cfg(test)]
    fn has_waiter(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .waiter
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::WaitableQueue;
    use futures::FutureExt;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn wait_empty_is_ready_for_empty_queue() {
        let queue = WaitableQueue::new();
        assert!(queue.wait_empty().now_or_never().is_some());
    }

    #[tokio::test]
    async fn remove_matches_ticket_identity() {
        let queue = WaitableQueue::new();
        let first = queue.add();
        let second = queue.add();
        let first_id = first.id();

        assert!(queue.remove(first));
        assert_eq!(queue.len(), 1);
        assert_ne!(second.id(), first_id);
        assert!(queue.remove(second));
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn concurrent_waiters_share_one_signal() {
        let queue = Arc::new(WaitableQueue::new());
        let ticket = queue.add();

        let a = tokio::spawn(queue.wait_empty());
        let b = tokio::spawn(queue.wait_empty());
        assert!(queue.has_waiter());

        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(!a.is_finished());

        queue.remove(ticket);
        a.await.unwrap();
        b.await.unwrap();
        assert!(!queue.has_waiter());
    }

    #[tokio::test]
    async fn signal_is_recreated_after_each_drain() {
        let queue = WaitableQueue::new();

        let ticket = queue.add();
        let drained = queue.wait_empty();
        queue.remove(ticket);
        drained.await;

        let ticket = queue.add();
        let mut pending = queue.wait_empty();
        assert!((&mut pending).now_or_never().is_none());
        queue.remove(ticket);
        pending.await;
    }
}
