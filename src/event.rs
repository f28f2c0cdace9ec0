use log::{debug, warn};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A poll cycle finished, whatever the outcome of its reads.
    RegistersUpdated,
    /// A commit finished, whether or not anything was written.
    RegistersCommitted,
    ErrorReadingRegister(String),
    ErrorCommittingRegister(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    RegistersUpdated,
    RegistersCommitted,
    ErrorReadingRegister,
    ErrorCommittingRegister,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::RegistersUpdated => EventKind::RegistersUpdated,
            Event::RegistersCommitted => EventKind::RegistersCommitted,
            Event::ErrorReadingRegister(_) => EventKind::ErrorReadingRegister,
            Event::ErrorCommittingRegister(_) => EventKind::ErrorCommittingRegister,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Event::ErrorReadingRegister(m) | Event::ErrorCommittingRegister(m) => Some(m),
            _ => None,
        }
    }
}

type Callback = Arc<dyn Fn(&Event) + Send + Sync>;

#[derive(Clone)]
enum Subscriber {
    Channel(UnboundedSender<Event>),
    Callback(Option<EventKind>, Callback),
}

/// Fan-out of device events to any number of subscribers.
///
/// Events are delivered in emission order. Callbacks run on the emitting
/// task without any lock held, so they may emit or subscribe on the same
/// bus. A panicking callback is logged and does not reach the emitter.
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<Subscriber>>,
}

impl EventBus {
    fn subscribers(&self) -> MutexGuard<'_, Vec<Subscriber>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Receive every event from now on.
    pub fn subscribe(&self) -> UnboundedReceiver<Event> {
        let (sender, receiver) = unbounded_channel();
        self.subscribers().push(Subscriber::Channel(sender));
        receiver
    }

    /// Call `callback` for each event of `kind`.
    pub fn on<F>(&self, kind: EventKind, callback: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.subscribers()
            .push(Subscriber::Callback(Some(kind), Arc::new(callback)));
    }

    pub fn on_any<F>(&self, callback: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.subscribers()
            .push(Subscriber::Callback(None, Arc::new(callback)));
    }

    pub fn emit(&self, event: Event) {
        match &event {
            Event::ErrorReadingRegister(m) | Event::ErrorCommittingRegister(m) => warn!("{m}"),
            e => debug!("{e:?}"),
        }

        let kind = event.kind();
        let subscribers = self.subscribers().clone();
        let mut closed = false;
        for subscriber in subscribers {
            match subscriber {
                Subscriber::Channel(sender) => closed |= sender.send(event.clone()).is_err(),
                Subscriber::Callback(filter, callback) => {
                    if filter.map_or(true, |k| k == kind)
                        && catch_unwind(AssertUnwindSafe(|| callback(&event))).is_err()
                    {
                        warn!("Event callback panicked on {:?}.", kind);
                    }
                }
            }
        }

        if closed {
            self.subscribers().retain(|subscriber| match subscriber {
                Subscriber::Channel(sender) => !sender.is_closed(),
                Subscriber::Callback(..) => true,
            });
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers().len()
    }
}
