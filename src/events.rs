//! Synchronous publish/subscribe for single-threaded models.
//!
//! Listeners run in registration order. Publishing from inside a listener
//! never recurses: the request is queued and served by one extra round once
//! the current round has finished, carrying whatever state is current then.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Upper bound on follow-up rounds triggered from inside listeners.
pub const MAX_NOTIFY_ROUNDS: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener<T> = Box<dyn FnMut(&T)>;

pub struct EventBus<T: ?Sized> {
    listeners: RefCell<Vec<(ListenerId, Listener<T>)>>,
    live: RefCell<Vec<ListenerId>>,
    next_id: Cell<u64>,
    dispatching: Cell<bool>,
    queued: Cell<bool>,
}

impl<T: ?Sized> Default for EventBus<T> {
    fn default() -> Self {
        Self {
            listeners: RefCell::new(Vec::new()),
            live: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
            dispatching: Cell::new(false),
            queued: Cell::new(false),
        }
    }
}

impl<T: ?Sized> EventBus<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener`. When called during a round, the listener is
    /// first invoked on the next round.
    pub fn subscribe(&self, listener: impl FnMut(&T) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(self.next_id.get() + 1);

        self.live.borrow_mut().push(id);
        self.listeners.borrow_mut().push((id, Box::new(listener)));
        id
    }

    /// Removes a listener. Returns false for unknown ids. A listener removed
    /// mid-round is not called again, even later in the same round.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut live = self.live.borrow_mut();
        let Some(pos) = live.iter().position(|l| *l == id) else {
            return false;
        };
        live.remove(pos);
        drop(live);

        // Outside a round the box can go right away; inside one it is held by
        // the dispatch loop and dropped when the round is merged back.
        self.listeners.borrow_mut().retain(|(l, _)| *l != id);
        true
    }

    pub fn len(&self) -> usize {
        self.live.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_dispatching(&self) -> bool {
        self.dispatching.get()
    }

    /// Delivers `snapshot()` to every listener. `snapshot` is called once per
    /// round so queued rounds observe the latest state.
    pub fn publish(&self, snapshot: impl Fn() -> Rc<T>) {
        if self.dispatching.get() {
            self.queued.set(true);
            return;
        }

        self.dispatching.set(true);
        let mut rounds = 0;
        loop {
            let data = snapshot();
            let mut active = std::mem::take(&mut *self.listeners.borrow_mut());
            for (id, listener) in active.iter_mut() {
                if self.is_live(*id) {
                    listener(&data);
                }
            }

            let mut listeners = self.listeners.borrow_mut();
            let added = std::mem::take(&mut *listeners);
            active.extend(added);
            let live = self.live.borrow();
            active.retain(|(id, _)| live.contains(id));
            *listeners = active;
            drop(listeners);
            drop(live);

            if !self.queued.replace(false) {
                break;
            }
            if rounds == MAX_NOTIFY_ROUNDS {
                log::warn!(
                    "Dropping queued notification after {} follow-up rounds, a listener keeps mutating",
                    rounds
                );
                break;
            }
            rounds += 1;
        }
        self.dispatching.set(false);
    }

    fn is_live(&self, id: ListenerId) -> bool {
        self.live.borrow().contains(&id)
    }
}
