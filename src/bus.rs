use std::fmt;
use std::panic;
use std::path;
use std::sync;

use crate::model::tree;

static NEXT_PAGE_ID: sync::atomic::AtomicU64 = sync::atomic::AtomicU64::new(1);

/// Opaque key scoping one open document's views and event traffic. Stable
/// for the document's lifetime and never reused within the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageId(u64);

impl PageId {
    pub fn fresh() -> PageId {
        PageId(NEXT_PAGE_ID.fetch_add(1, sync::atomic::Ordering::Relaxed))
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page-{}", self.0)
    }
}

/// Everything that crosses between views. One dispatcher exists per page, so
/// no event carries a page id; isolation between open documents comes from
/// each page owning its own dispatcher instead of string-prefixed topics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Selection moved in the tree view (or the page just finished
    /// constructing its views, in which case this carries the root).
    FocusChanged { node: Option<tree::NodeId> },

    /// Some view successfully mutated the document. Exactly one of these per
    /// user gesture; the persistence coordinator autosaves on it.
    DocumentChanged,

    /// A node was inserted; the tree view appends a row for it.
    StructureChanged { node: tree::NodeId },

    /// Another view (or menu plumbing) wants the tree view to run its
    /// add-node flow for this parent.
    AddNodeRequested { parent: tree::NodeId },

    /// Menu plumbing wants the tree view to run its remove flow.
    RemoveNodeRequested { node: tree::NodeId },

    /// Explicit save. `None` means ask the user where.
    SaveRequested { path: Option<path::PathBuf> },
}

pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

type Handler = sync::Arc<dyn Fn(&Event) -> Result<(), HandlerError> + Send + Sync>;

struct Subscriber {
    token: u64,
    name: &'static str,
    handler: Handler,
}

struct Interior {
    subscribers: Vec<Subscriber>,
    next_token: u64,
}

/// Synchronous same-thread publish/subscribe for one page. Delivery happens
/// in registration order before `publish` returns. A handler that fails (or
/// panics) is logged and skipped; the remaining subscribers still run.
pub struct Dispatcher {
    page: PageId,
    interior: parking_lot::Mutex<Interior>,
}

impl Dispatcher {
    pub fn new(page: PageId) -> sync::Arc<Dispatcher> {
        sync::Arc::new(Dispatcher {
            page,
            interior: parking_lot::Mutex::new(Interior {
                subscribers: Vec::new(),
                next_token: 0,
            }),
        })
    }

    pub fn page(&self) -> PageId {
        self.page
    }

    /// Registers a handler. The returned Subscription unregisters it on
    /// drop, tying the handler's lifetime to its view's.
    pub fn subscribe<F>(self: &sync::Arc<Self>, name: &'static str, handler: F) -> Subscription
    where F: Fn(&Event) -> Result<(), HandlerError> + Send + Sync + 'static {
        let mut interior = self.interior.lock();
        let token = interior.next_token;
        interior.next_token += 1;

        interior.subscribers.push(Subscriber {
            token,
            name,
            handler: sync::Arc::new(handler),
        });

        Subscription {
            dispatcher: sync::Arc::downgrade(self),
            token,
        }
    }

    pub fn publish(&self, event: &Event) {
        /* Snapshot the list so handlers can subscribe or publish without
         * deadlocking on the interior lock. */
        let snapshot: Vec<(&'static str, Handler)> = self.interior.lock().subscribers
            .iter()
            .map(|subscriber| (subscriber.name, subscriber.handler.clone()))
            .collect();

        for (name, handler) in snapshot {
            match panic::catch_unwind(panic::AssertUnwindSafe(|| handler(event))) {
                Ok(Ok(())) => {},
                Ok(Err(e)) => {
                    tracing::error!("{}: subscriber '{}' failed handling {:?}: {}", self.page, name, event, e);
                },
                Err(_) => {
                    tracing::error!("{}: subscriber '{}' panicked handling {:?}", self.page, name, event);
                },
            }
        }
    }

    fn unsubscribe(&self, token: u64) {
        self.interior.lock().subscribers.retain(|subscriber| subscriber.token != token);
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("page", &self.page)
            .field("subscribers", &self.interior.lock().subscribers.len())
            .finish()
    }
}

pub struct Subscription {
    dispatcher: sync::Weak<Dispatcher>,
    token: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(dispatcher) = self.dispatcher.upgrade() {
            dispatcher.unsubscribe(self.token);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn test_page_ids_are_unique() {
        let a = PageId::fresh();
        let b = PageId::fresh();
        assert_ne!(a, b);
    }

    #[test]
    fn test_delivery_in_registration_order() {
        let dispatcher = Dispatcher::new(PageId::fresh());
        let order = sync::Arc::new(parking_lot::Mutex::new(Vec::new()));

        let o1 = order.clone();
        let _s1 = dispatcher.subscribe("first", move |_| { o1.lock().push(1); Ok(()) });
        let o2 = order.clone();
        let _s2 = dispatcher.subscribe("second", move |_| { o2.lock().push(2); Ok(()) });
        let o3 = order.clone();
        let _s3 = dispatcher.subscribe("third", move |_| { o3.lock().push(3); Ok(()) });

        dispatcher.publish(&Event::DocumentChanged);
        assert_eq!(*order.lock(), vec![1, 2, 3]);
    }

    #[test]
    fn test_faulting_handler_does_not_abort_siblings() {
        let dispatcher = Dispatcher::new(PageId::fresh());
        let seen = sync::Arc::new(parking_lot::Mutex::new(Vec::new()));

        let s = seen.clone();
        let _s1 = dispatcher.subscribe("ok-before", move |_| { s.lock().push("before"); Ok(()) });
        let _s2 = dispatcher.subscribe("fails", |_| Err("intentional".into()));
        let _s3 = dispatcher.subscribe("panics", |_| panic!("intentional"));
        let s = seen.clone();
        let _s4 = dispatcher.subscribe("ok-after", move |_| { s.lock().push("after"); Ok(()) });

        dispatcher.publish(&Event::DocumentChanged);
        assert_eq!(*seen.lock(), vec!["before", "after"]);
    }

    #[test]
    fn test_dropping_subscription_unsubscribes() {
        let dispatcher = Dispatcher::new(PageId::fresh());
        let count = sync::Arc::new(sync::atomic::AtomicU64::new(0));

        let c = count.clone();
        let subscription = dispatcher.subscribe("counter", move |_| {
            c.fetch_add(1, sync::atomic::Ordering::Relaxed);
            Ok(())
        });

        dispatcher.publish(&Event::DocumentChanged);
        drop(subscription);
        dispatcher.publish(&Event::DocumentChanged);

        assert_eq!(count.load(sync::atomic::Ordering::Relaxed), 1);
    }

    #[test]
    fn test_publish_is_reentrant() {
        let dispatcher = Dispatcher::new(PageId::fresh());
        let count = sync::Arc::new(sync::atomic::AtomicU64::new(0));

        let c = count.clone();
        let inner = dispatcher.clone();
        let _s = dispatcher.subscribe("reentrant", move |event| {
            if matches!(event, Event::DocumentChanged) {
                c.fetch_add(1, sync::atomic::Ordering::Relaxed);
                inner.publish(&Event::FocusChanged { node: None });
            }
            Ok(())
        });

        dispatcher.publish(&Event::DocumentChanged);
        assert_eq!(count.load(sync::atomic::Ordering::Relaxed), 1);
    }
}
