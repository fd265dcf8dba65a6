//! Background bootstrap of the embedded runtime.
//!
//! The runtime is created, the bundle fetched and unpacked, and the module
//! imported on a dedicated thread. Progress is reported over a channel; the
//! owner drains it into the output log and keeps the settled outcome.

use crate::bundle;
use crate::error::{ConsoleError, Result};
use crate::runtime::EmbeddedRuntime;
use crate::session::OutputRecord;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::thread;
use tracing::{error, info};

/// What to do after the runtime is created
#[derive(Debug, Clone, Default)]
pub struct BootPlan {
    /// Bundle location; without one the bundle and import steps are skipped
    pub bundle: Option<String>,
    pub module: String,
}

pub enum BootEvent<R> {
    Status(OutputRecord),
    Ready(R),
    Failed(String),
}

/// Settled state of the bootstrap
pub enum Readiness<R> {
    Pending,
    Ready(R),
    Failed(String),
}

pub struct Bootstrap<R> {
    events: Receiver<BootEvent<R>>,
    readiness: Readiness<R>,
}

/// Start bootstrapping on a background thread
pub fn spawn<R, F>(create: F, plan: BootPlan) -> Bootstrap<R>
where
    R: EmbeddedRuntime + Send + 'static,
    F: FnOnce() -> Result<R> + Send + 'static,
{
    let (sender, receiver) = unbounded();
    thread::spawn(move || {
        let event = match run(create, &plan, &sender) {
            Ok(runtime) => BootEvent::Ready(runtime),
            Err(e) => {
                error!("Bootstrap failed: {}", e);
                BootEvent::Failed(e.to_string())
            }
        };
        let _ = sender.send(event);
    });
    Bootstrap {
        events: receiver,
        readiness: Readiness::Pending,
    }
}

/// The sequential steps; each one must succeed before the next starts
fn run<R, F>(create: F, plan: &BootPlan, progress: &Sender<BootEvent<R>>) -> Result<R>
where
    R: EmbeddedRuntime,
    F: FnOnce() -> Result<R>,
{
    let mut runtime = create()?;
    report(progress, "load runtime", "Ready!");

    let Some(location) = &plan.bundle else {
        info!("No bundle configured");
        return Ok(runtime);
    };
    let bytes = bundle::fetch(location)?;
    runtime.unpack_archive(&bytes)?;
    runtime.import_module(&plan.module)?;
    report(progress, &format!("import {}", plan.module), "ok");
    Ok(runtime)
}

fn report<R>(progress: &Sender<BootEvent<R>>, input: &str, output: &str) {
    let _ = progress.send(BootEvent::Status(OutputRecord::success(input, output)));
}

impl<R> Bootstrap<R> {
    /// A bootstrap that has already settled with `runtime`
    pub fn ready(runtime: R) -> Self {
        let (_, receiver) = unbounded();
        Self {
            events: receiver,
            readiness: Readiness::Ready(runtime),
        }
    }

    pub fn readiness(&self) -> &Readiness<R> {
        &self.readiness
    }

    pub fn is_settled(&self) -> bool {
        !matches!(self.readiness, Readiness::Pending)
    }

    /// Block until the bootstrap settles, passing each status record to
    /// `on_status`
    pub fn wait(&mut self, mut on_status: impl FnMut(OutputRecord)) -> Result<&mut R> {
        while let Readiness::Pending = self.readiness {
            self.readiness = match self.events.recv() {
                Ok(BootEvent::Status(record)) => {
                    on_status(record);
                    continue;
                }
                Ok(BootEvent::Ready(runtime)) => Readiness::Ready(runtime),
                Ok(BootEvent::Failed(message)) => Readiness::Failed(message),
                Err(_) => Readiness::Failed("bootstrap thread exited".to_string()),
            };
        }
        self.runtime()
    }

    /// Apply status records that already arrived without blocking
    pub fn poll(&mut self, mut on_status: impl FnMut(OutputRecord)) {
        while let Readiness::Pending = self.readiness {
            match self.events.try_recv() {
                Ok(BootEvent::Status(record)) => on_status(record),
                Ok(BootEvent::Ready(runtime)) => self.readiness = Readiness::Ready(runtime),
                Ok(BootEvent::Failed(message)) => self.readiness = Readiness::Failed(message),
                Err(_) => break,
            }
        }
    }

    /// The runtime once settled successfully
    pub fn runtime(&mut self) -> Result<&mut R> {
        match &mut self.readiness {
            Readiness::Ready(runtime) => Ok(runtime),
            Readiness::Failed(message) => Err(ConsoleError::NotReady(message.clone())),
            Readiness::Pending => Err(ConsoleError::NotReady("still bootstrapping".to_string())),
        }
    }
}
