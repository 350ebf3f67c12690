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

//! Reference-counted lazy activation shared by many subscribers.

use crate::observability::events;
use std::fmt::Display;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::warn;

const COMPONENT: &str = "lazy_resource";

type Factory<R> = Box<dyn Fn() -> R + Send + Sync>;
type Hook<E> = Box<dyn Fn() -> Result<(), E> + Send + Sync>;

struct LazyState<R> {
    active: Option<R>,
    count: usize,
}

struct LazyInner<R, E> {
    factory: Factory<R>,
    before_first: Hook<E>,
    after_last: Hook<E>,
    state: Mutex<LazyState<R>>,
}

impl<R, E: Display> LazyInner<R, E> {
    fn detach(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.count = state.count.saturating_sub(1);
        if state.count > 0 {
            return;
        }
        state.active = None;
        if let Err(err) = (self.after_last)() {
            warn!(
                event = events::LAZY_DEACTIVATION_FAILED,
                component = COMPONENT,
                err = %err,
                "after-last hook failed"
            );
        }
    }
}

///
/// [`LazyResource`] activates a resource on the first [`attach`][LazyResource::attach]
/// and releases it when the last [`Lease`] is dropped.
///
/// Every attach on an idle resource runs the `before_first` hook and then the factory.
/// Dropping the last lease discards the resource and runs `after_last`. A later attach
/// activates from scratch again.
///
/// Hooks run while the resource's own lock is held, so they must not attach or drop
/// leases of the same resource.
///
/// # Examples
///
/// ```
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use topic_switch::primitives::LazyResource;
///
/// let activations = Arc::new(AtomicUsize::new(0));
/// let counter = activations.clone();
/// let resource: LazyResource<&'static str, String> = LazyResource::new(
///     || "channel",
///     move || {
///         counter.fetch_add(1, Ordering::SeqCst);
///         Ok(())
///     },
///     || Ok(()),
/// );
///
/// let first = resource.attach().unwrap();
/// let second = resource.attach().unwrap();
/// assert_eq!(*first.resource(), "channel");
/// assert_eq!(resource.active_count(), 2);
///
/// drop(first);
/// drop(second);
/// assert!(!resource.is_active());
///
/// let _again = resource.attach().unwrap();
/// assert_eq!(activations.load(Ordering::SeqCst), 2);
/// ```
pub struct LazyResource<R, E> {
    inner: Arc<LazyInner<R, E>>,
}

impl<R, E> Clone for LazyResource<R, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<R, E> LazyResource<R, E>
where
    R: Clone + Send + 'static,
    E: Display + 'static,
{
    pub fn new(
        factory: impl Fn() -> R + Send + Sync + 'static,
        before_first: impl Fn() -> Result<(), E> + Send + Sync + 'static,
        after_last: impl Fn() -> Result<(), E> + Send + Sync + 'static,
    ) -> Self {
        Self {
            inner: Arc::new(LazyInner {
                factory: Box::new(factory),
                before_first: Box::new(before_first),
                after_last: Box::new(after_last),
                state: Mutex::new(LazyState {
                    active: None,
                    count: 0,
                }),
            }),
        }
    }

    /// Attaches one subscriber, activating the resource if it is idle.
    ///
    /// A failing `before_first` hook leaves the resource idle and is returned as is.
    pub fn attach(&self) -> Result<Lease<R, E>, E> {
        let mut state = self
            .inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let resource = match &state.active {
            Some(resource) => resource.clone(),
            None => {
                (self.inner.before_first)()?;
                let resource = (self.inner.factory)();
                state.active = Some(resource.clone());
                resource
            }
        };
        state.count += 1;

        Ok(Lease {
            resource,
            owner: self.inner.clone(),
        })
    }

    pub fn active_count(&self) -> usize {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .count
    }

    pub fn is_active(&self) -> bool {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .active
            .is_some()
    }
}

/// One attached subscriber. Dropping it detaches.
pub struct Lease<R, E: Display> {
    resource: R,
    owner: Arc<LazyInner<R, E>>,
}

impl<R, E: Display> Lease<R, E> {
    pub fn resource(&self) -> &R {
        &self.resource
    }
}

impl<R, E: Display> Drop for Lease<R, E> {
    fn drop(&mut self) {
        self.owner.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::LazyResource;
    use std::sync::{Arc, Mutex};

    fn recording_resource(
        log: Arc<Mutex<Vec<&'static str>>>,
    ) -> LazyResource<u32, String> {
        let factory_log = log.clone();
        let before_log = log.clone();
        let after_log = log;
        LazyResource::new(
            move || {
                factory_log.lock().unwrap().push("factory");
                7
            },
            move || {
                before_log.lock().unwrap().push("before");
                Ok(())
            },
            move || {
                after_log.lock().unwrap().push("after");
                Ok(())
            },
        )
    }

    #[test]
    fn hooks_fire_once_per_activation_run() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let resource = recording_resource(log.clone());

        let a = resource.attach().unwrap();
        let b = resource.attach().unwrap();
        drop(a);
        let c = resource.attach().unwrap();
        drop(b);
        drop(c);

        assert_eq!(*log.lock().unwrap(), vec!["before", "factory", "after"]);
        assert_eq!(resource.active_count(), 0);
    }

    #[test]
    fn reactivation_after_full_drain_calls_factory_again() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let resource = recording_resource(log.clone());

        drop(resource.attach().unwrap());
        let lease = resource.attach().unwrap();

        assert_eq!(*lease.resource(), 7);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["before", "factory", "after", "before", "factory"]
        );
    }

    #[test]
    fn failing_before_hook_keeps_resource_idle() {
        let resource: LazyResource<u32, String> =
            LazyResource::new(|| 1, || Err("refused".to_string()), || Ok(()));

        let err = resource.attach().err().expect("before hook refuses");

        assert_eq!(err, "refused");
        assert!(!resource.is_active());
        assert_eq!(resource.active_count(), 0);
    }

    #[test]
    fn concurrent_attach_detach_keeps_count_consistent() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let resource = recording_resource(log.clone());
        let anchor = resource.attach().unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let resource = resource.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        drop(resource.attach().unwrap());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(resource.active_count(), 1);
        drop(anchor);
        assert_eq!(*log.lock().unwrap(), vec!["before", "factory", "after"]);
    }
}
