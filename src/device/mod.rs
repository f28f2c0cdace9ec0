mod commit;
mod poll;

use commit::Attempts;

use crate::async_cloned;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::event::{Event, EventBus};
use crate::model::{Model, AUTO_TRANSFORMER};
use crate::net::rtu::RtuTransport;
use crate::net::{Gate, Request, Transport};
use crate::register::{Action, Register, RegisterBank, RegisterType, Value};
use crate::util::tokio::{Detached, Repeating};

use log::info;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Scheduling options of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    pub update_interval: Duration,
    pub commit_interval: Duration,
    pub auto_update: bool,
    pub auto_commit: bool,
    pub timeout: Duration,
    /// Consecutive failed writes after which a group drops its pending values.
    pub commit_attempts: u32,
}

impl Default for Options {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for Options {
    fn from(config: &Config) -> Self {
        Self {
            update_interval: config.update_interval(),
            commit_interval: config.commit_interval(),
            auto_update: config.auto_update,
            auto_commit: config.auto_commit,
            timeout: Gate::DEFAULT_TIMEOUT,
            commit_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Idle,
    Running,
    Stopped,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State shared between the device handle and its background tasks.
pub(crate) struct Shared {
    model: &'static Model,
    bank: RegisterBank,
    gate: Gate,
    events: EventBus,
    options: Options,
    root: CancellationToken,
    stopped: AtomicBool,
    committer: Mutex<Option<Repeating>>,
    detached: Detached,
    attempts: Attempts,
}

impl Shared {
    /// Start the committer unless it is already running, disabled or the
    /// device is shutting down.
    fn ensure_committer(self: &Arc<Self>) {
        if !self.options.auto_commit {
            return;
        }
        let mut committer = lock(&self.committer);
        if committer.is_some() || self.stopped.load(Ordering::SeqCst) {
            return;
        }

        info!("First successful poll of {}, starting committer.", self.model.name);
        let shared = Arc::clone(self);
        *committer = Some(Repeating::spawn(
            "committer",
            self.options.commit_interval,
            &self.root,
            move || async_cloned!(shared; { commit::cycle(&shared).await }),
        ));
    }
}

/// One controller on one serial line.
///
/// The device mirrors the controller's registers with a poller and pushes
/// staged values back with a committer. Both share one [`Gate`].
pub struct Device {
    shared: Arc<Shared>,
    poller: Mutex<Option<Repeating>>,
    lifecycle: Mutex<Lifecycle>,
}

impl Device {
    pub fn new(
        model: &'static Model,
        options: Options,
        transport: Box<dyn Transport>,
    ) -> Result<Self> {
        let bank = model.bank()?;
        let gate = Gate::new(transport, model.unit, options.timeout);
        Ok(Self {
            shared: Arc::new(Shared {
                model,
                bank,
                gate,
                events: EventBus::default(),
                options,
                root: CancellationToken::new(),
                stopped: AtomicBool::new(false),
                committer: Mutex::new(None),
                detached: Detached::default(),
                attempts: Attempts::default(),
            }),
            poller: Mutex::new(None),
            lifecycle: Mutex::new(Lifecycle::Idle),
        })
    }

    /// Open the serial port from `config` and start an auto-transformer.
    pub async fn connect(config: &Config) -> Result<Self> {
        let transport = RtuTransport::new(&config.port, config.baud_rate);
        let device = Self::new(&AUTO_TRANSFORMER, Options::from(config), Box::new(transport))?;
        device.start().await?;
        Ok(device)
    }

    /// Open the transport and start polling if `auto_update` is set. The
    /// committer follows after the first successful poll.
    pub async fn start(&self) -> Result<()> {
        {
            let mut lifecycle = lock(&self.lifecycle);
            match *lifecycle {
                Lifecycle::Running => return Err(Error::AlreadyActive),
                Lifecycle::Stopped => return Err(Error::Stopped),
                Lifecycle::Idle => *lifecycle = Lifecycle::Running,
            }
        }

        if let Err(e) = self.shared.gate.open().await {
            *lock(&self.lifecycle) = Lifecycle::Idle;
            return Err(e.into());
        }
        info!("{} connected as unit {}.", self.shared.model.name, self.shared.gate.unit());

        if self.shared.options.auto_update {
            let shared = self.shared.clone();
            *lock(&self.poller) = Some(Repeating::spawn(
                "poller",
                self.shared.options.update_interval,
                &self.shared.root,
                move || async_cloned!(shared; { poll::cycle(&shared).await; }),
            ));
        }
        Ok(())
    }

    /// Stop both loops, wait for pending single commits and close the
    /// transport. Calling it again has no effect.
    pub async fn stop(&self) {
        {
            let mut lifecycle = lock(&self.lifecycle);
            if *lifecycle == Lifecycle::Stopped {
                return;
            }
            *lifecycle = Lifecycle::Stopped;
        }
        self.shared.stopped.store(true, Ordering::SeqCst);

        let poller = lock(&self.poller).take();
        if let Some(mut poller) = poller {
            poller.stop().await;
        }
        let committer = lock(&self.shared.committer).take();
        if let Some(mut committer) = committer {
            committer.stop().await;
        }

        self.shared.detached.close();
        self.shared.detached.join_all().await;
        self.shared.gate.close().await;
        info!("{} stopped.", self.shared.model.name);
    }

    pub fn is_running(&self) -> bool {
        *lock(&self.lifecycle) == Lifecycle::Running
    }

    pub fn is_committing(&self) -> bool {
        lock(&self.shared.committer).is_some()
    }

    /// Run one poll cycle now. Returns true if every read succeeded.
    pub async fn poll_once(&self) -> bool {
        poll::cycle(&self.shared).await
    }

    /// Run one commit cycle now.
    pub async fn commit_once(&self) {
        commit::cycle(&self.shared).await
    }

    /// Write the pending value of `name` in background, outside the commit
    /// cycle. The outcome is reported as an event.
    pub fn commit_async(&self, name: &str) -> Result<()> {
        let register = self.shared.bank.require(name)?;
        let name = register.name();
        let shared = self.shared.clone();
        let spawned = self
            .shared
            .detached
            .spawn(async move { commit::single(&shared, name).await });
        if !spawned {
            self.shared.events.emit(Event::ErrorCommittingRegister(format!(
                "Error while writing {}: {}",
                name,
                Error::Stopped
            )));
        }
        Ok(())
    }

    /// Read one discrete input to check that the controller answers.
    pub async fn ping(&self) -> Result<()> {
        let fn_code = self
            .shared
            .model
            .codes
            .select(RegisterType::DiscreteInput, Action::Read)?;
        self.shared
            .gate
            .execute(&Request::read(fn_code, 0, 1))
            .await?;
        Ok(())
    }

    pub fn model(&self) -> &'static Model {
        self.shared.model
    }

    pub fn events(&self) -> &EventBus {
        &self.shared.events
    }

    pub fn registers(&self) -> &RegisterBank {
        &self.shared.bank
    }

    pub fn register(&self, name: &str) -> Result<&Register> {
        self.shared.bank.require(name)
    }

    pub fn value(&self, name: &str) -> Result<Value> {
        self.shared.bank.require(name)?.current_value()
    }

    pub fn stage(&self, name: &str, value: Value) -> Result<()> {
        self.shared.bank.require(name)?.stage(value);
        Ok(())
    }

    pub fn discard_all(&self) {
        self.shared.bank.discard_all();
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        self.shared.root.cancel();
    }
}
