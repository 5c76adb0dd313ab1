//! Listener storage and subscription handles.
//!
//! Listeners live in a [`HandlerMap`]: an [`IndexMap`] keyed by
//! [`HandlerId`], giving O(1) removal with stable insertion order so that
//! listeners fire in the order they were registered.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;

/// Unique identifier for a registered listener, hook, or cleanup entry.
pub type HandlerId = u64;

static NEXT_HANDLER_ID: AtomicU64 = AtomicU64::new(1);

/// Returns a new process-unique handler ID.
pub fn next_handler_id() -> HandlerId {
	NEXT_HANDLER_ID.fetch_add(1, Ordering::SeqCst)
}

/// Shared, insertion-ordered handler storage.
pub type HandlerMap<V> = Arc<Mutex<IndexMap<HandlerId, V>>>;

/// Creates an empty [`HandlerMap`].
pub fn handler_map<V>() -> HandlerMap<V> {
	Arc::new(Mutex::new(IndexMap::new()))
}

/// RAII handle that removes a listener on drop.
///
/// Holds a weak reference to the handler map, so dropping it after the owning
/// [`Session`] is gone is a no-op. Call [`detach`](Self::detach) to keep the
/// listener registered for the rest of the session's life.
///
/// [`Session`]: crate::Session
#[must_use = "dropping a Subscription removes the listener"]
pub struct Subscription {
	id: HandlerId,
	dropper: Option<Arc<dyn Fn(HandlerId) + Send + Sync>>,
}

impl Subscription {
	/// Creates a subscription with a custom dropper function.
	pub fn new(id: HandlerId, dropper: Arc<dyn Fn(HandlerId) + Send + Sync>) -> Self {
		Self {
			id,
			dropper: Some(dropper),
		}
	}

	/// Creates a subscription from a handler map using a weak reference.
	pub fn from_handler_map<V>(id: HandlerId, handlers: &HandlerMap<V>) -> Self
	where
		V: Send + 'static,
	{
		let weak: Weak<Mutex<IndexMap<HandlerId, V>>> = Arc::downgrade(handlers);
		let dropper = Arc::new(move |id: HandlerId| {
			if let Some(map) = weak.upgrade() {
				map.lock().shift_remove(&id);
			}
		});
		Self::new(id, dropper)
	}

	/// Returns this subscription's handler ID.
	pub fn id(&self) -> HandlerId {
		self.id
	}

	/// Explicitly unsubscribes. Equivalent to dropping.
	pub fn unsubscribe(mut self) {
		if let Some(dropper) = self.dropper.take() {
			(dropper)(self.id);
		}
	}

	/// Leaves the listener registered and discards the handle.
	pub fn detach(mut self) {
		self.dropper = None;
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		if let Some(dropper) = self.dropper.take() {
			(dropper)(self.id);
		}
	}
}

impl std::fmt::Debug for Subscription {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Subscription")
			.field("id", &self.id)
			.field("active", &self.dropper.is_some())
			.finish()
	}
}
