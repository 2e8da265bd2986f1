use crate::app::dispatcher::run_dispatcher;
use crate::app::listener::run_listener;
use crate::core::modem::Modem;
use crate::core::phonebook::{AuthorizationStore, SlotStrategy};
use crate::core::queue::{EventQueue, OverflowPolicy, DEFAULT_QUEUE_CAPACITY};
use crate::domain::ports::{GateActuator, Transport};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Runtime knobs of the gatekeeper, usually built from the TOML config.
#[derive(Debug, Clone)]
pub struct GateSettings {
    pub admin_numbers: Vec<String>,
    pub queue_capacity: usize,
    pub overflow_policy: OverflowPolicy,
    pub listen_interval: Duration,
    pub slot_strategy: SlotStrategy,
    pub contact_name: String,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            admin_numbers: Vec::new(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            overflow_policy: OverflowPolicy::default(),
            listen_interval: Duration::from_secs(1),
            slot_strategy: SlotStrategy::default(),
            contact_name: String::new(),
        }
    }
}

/// Everything the listener and dispatcher share: one modem, one queue,
/// one authorization store. Built once at startup.
pub struct GateContext<T: Transport> {
    modem: Arc<Modem<T>>,
    store: AuthorizationStore<T>,
    queue: EventQueue<String>,
    admins: HashSet<String>,
    gate: Box<dyn GateActuator>,
    listen_interval: Duration,
    shutdown: watch::Sender<bool>,
}

/// Handles of the two background tasks.
pub struct GateTasks {
    pub listener: JoinHandle<()>,
    pub dispatcher: JoinHandle<()>,
}

impl GateTasks {
    pub async fn join(self) {
        if let Err(e) = self.listener.await {
            tracing::error!("Listener task failed: {}", e);
        }
        if let Err(e) = self.dispatcher.await {
            tracing::error!("Dispatcher task failed: {}", e);
        }
    }
}

impl<T: Transport + 'static> GateContext<T> {
    pub fn new(modem: Arc<Modem<T>>, settings: GateSettings, gate: Box<dyn GateActuator>) -> Self {
        let store = AuthorizationStore::new(Arc::clone(&modem))
            .with_slot_strategy(settings.slot_strategy)
            .with_contact_name(settings.contact_name);
        let (shutdown, _) = watch::channel(false);

        Self {
            modem,
            store,
            queue: EventQueue::new(settings.queue_capacity, settings.overflow_policy),
            admins: settings.admin_numbers.into_iter().collect(),
            gate,
            listen_interval: settings.listen_interval,
            shutdown,
        }
    }

    pub fn modem(&self) -> &Modem<T> {
        &self.modem
    }

    pub fn store(&self) -> &AuthorizationStore<T> {
        &self.store
    }

    pub fn queue(&self) -> &EventQueue<String> {
        &self.queue
    }

    pub fn gate(&self) -> &dyn GateActuator {
        self.gate.as_ref()
    }

    pub fn listen_interval(&self) -> Duration {
        self.listen_interval
    }

    /// Administrator (GK) numbers are matched exactly as configured.
    pub fn is_admin(&self, number: &str) -> bool {
        self.admins.contains(number)
    }

    /// Start the listener and dispatcher tasks.
    pub fn spawn(self: &Arc<Self>) -> GateTasks {
        tracing::info!(
            "Starting listener (every {:?}) and dispatcher on {}",
            self.listen_interval,
            self.modem.port_name()
        );
        GateTasks {
            listener: tokio::spawn(run_listener(Arc::clone(self))),
            dispatcher: tokio::spawn(run_dispatcher(Arc::clone(self))),
        }
    }

    /// Stop listening, let the dispatcher drain what is queued, then exit.
    pub fn shutdown(&self) {
        tracing::info!("Shutting down gatekeeper");
        self.shutdown.send_replace(true);
        self.queue.close();
    }

    pub fn subscribe_shutdown(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }
}
