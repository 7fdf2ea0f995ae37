//! Build orchestration logic
//!
//! Builds units one at a time, in build order, on a blocking worker. The
//! coordinator waits for either the worker to finish or an interrupt; on
//! interrupt no further unit is started and the coordinator returns
//! without waiting for the unit currently building.
//!
//! A failing unit never stops the run. Each failure is printed as soon as
//! it happens and appended to `<log_dir>/failed-builds.log`.

use std::fs::File;
use std::future::Future;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::config::defaults;
use crate::core::resolver::BuildOrder;
use crate::error::{BuildError, ForgeError, FilesystemError, RunError, UnitFailure};
use crate::infra::status;
use crate::infra::tee::{OutputMultiplexer, UnitOutput};

/// A way of building one unit
///
/// Everything the build prints should go to `output`, which ends up on the
/// console and in the unit's log.
pub trait BuildOperation: Send + Sync {
    /// Build `unit`
    fn build(&self, unit: &str, output: &mut UnitOutput) -> Result<(), BuildError>;
}

impl<F> BuildOperation for F
where
    F: Fn(&str, &mut UnitOutput) -> Result<(), BuildError> + Send + Sync,
{
    fn build(&self, unit: &str, output: &mut UnitOutput) -> Result<(), BuildError> {
        self(unit, output)
    }
}

/// Lifecycle of a build run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    /// Not started
    Idle,
    /// Worker active
    Running,
    /// Every unit was attempted
    Completed,
    /// Stopped by an interrupt
    Interrupted,
}

/// Outcome of a build run
#[derive(Debug)]
pub struct RunReport {
    /// How the run ended
    pub status: RunState,
    /// Number of units in the order
    pub total: usize,
    /// Units that were started, in order
    pub attempted: Vec<String>,
    /// Units that failed, in order
    pub failures: Vec<UnitFailure>,
}

impl RunReport {
    /// Whether every unit was built successfully
    pub fn succeeded(&self) -> bool {
        self.status == RunState::Completed && self.failures.is_empty()
    }

    /// Turn a partial or failed run into an error
    pub fn into_result(self) -> Result<(), RunError> {
        match self.status {
            RunState::Interrupted => Err(RunError::Interrupted {
                attempted: self.attempted.len(),
                total: self.total,
                failures: self.failures,
            }),
            _ if !self.failures.is_empty() => Err(RunError::BuildsFailed {
                failures: self.failures,
            }),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Default)]
struct Progress {
    attempted: Vec<String>,
    failures: Vec<UnitFailure>,
}

fn lock(progress: &Mutex<Progress>) -> MutexGuard<'_, Progress> {
    progress.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Append-only record of failed units, one line each
struct FailureLog {
    path: PathBuf,
    file: File,
}

impl FailureLog {
    /// Create or truncate the log
    fn create(path: PathBuf) -> Result<Self, FilesystemError> {
        let file = File::create(&path).map_err(|e| FilesystemError::CreateFile {
            path: path.clone(),
            error: e.to_string(),
        })?;
        Ok(Self { path, file })
    }

    fn record(&mut self, failure: &UnitFailure) {
        let written = writeln!(self.file, "{failure}").and_then(|()| self.file.flush());
        if let Err(e) = written {
            tracing::warn!("could not write {}: {e}", self.path.display());
        }
    }
}

/// Build orchestrator state
#[derive(Debug)]
pub struct BuildOrchestrator {
    /// Units to build
    order: BuildOrder,
    /// Directory receiving per-unit logs and the failure log
    log_dir: PathBuf,
    /// Whether unit output is copied to the console
    echo: bool,
    state: RunState,
}

impl BuildOrchestrator {
    /// Create a new build orchestrator
    pub fn new(order: BuildOrder, log_dir: impl Into<PathBuf>) -> Self {
        Self {
            order,
            log_dir: log_dir.into(),
            echo: true,
            state: RunState::Idle,
        }
    }

    /// Enable or disable the console copy of unit output
    #[must_use]
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Get the build order
    pub fn build_order(&self) -> &BuildOrder {
        &self.order
    }

    /// Log directory
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Path of the failure log
    pub fn failure_log_path(&self) -> PathBuf {
        self.log_dir.join(defaults::FAILED_BUILDS_LOG)
    }

    /// Current state
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Build every unit in order until done or `interrupt` resolves
    ///
    /// The log directory must exist. `Err` is reserved for setup problems;
    /// unit failures are reported in the [`RunReport`].
    pub async fn run<I>(
        &mut self,
        operation: Arc<dyn BuildOperation>,
        interrupt: I,
    ) -> Result<RunReport, ForgeError>
    where
        I: Future<Output = ()>,
    {
        let failure_log = FailureLog::create(self.failure_log_path())?;
        let mux = OutputMultiplexer::new(&self.log_dir).with_echo(self.echo);
        let units = self.order.clone().into_units();
        let total = units.len();
        let progress = Arc::new(Mutex::new(Progress::default()));
        let token = CancellationToken::new();

        self.state = RunState::Running;
        tracing::debug!("building {total} units, logs in {}", self.log_dir.display());

        let worker = tokio::task::spawn_blocking({
            let progress = Arc::clone(&progress);
            let token = token.clone();
            move || build_all(&units, operation.as_ref(), &mux, failure_log, &progress, &token)
        });

        let outcome = tokio::select! {
            biased;
            joined = worker => {
                if let Err(e) = joined {
                    self.state = RunState::Completed;
                    return Err(RunError::Worker(e.to_string()).into());
                }
                RunState::Completed
            }
            () = interrupt => {
                // the unit in flight keeps running detached
                token.cancel();
                tracing::info!("interrupt received, no further units will start");
                RunState::Interrupted
            }
        };
        self.state = outcome;

        let mut progress = lock(&progress);
        Ok(RunReport {
            status: outcome,
            total,
            attempted: progress.attempted.clone(),
            failures: std::mem::take(&mut progress.failures),
        })
    }
}

fn build_all(
    units: &[String],
    operation: &dyn BuildOperation,
    mux: &OutputMultiplexer,
    mut failure_log: FailureLog,
    progress: &Mutex<Progress>,
    token: &CancellationToken,
) {
    for unit in units {
        if token.is_cancelled() {
            tracing::debug!("cancelled before {unit}");
            break;
        }
        lock(progress).attempted.push(unit.clone());

        if let Err(error) = build_unit(operation, mux, unit) {
            let failure = UnitFailure {
                unit: unit.clone(),
                error,
            };
            eprintln!("{} {failure}", status::ERROR);
            failure_log.record(&failure);
            lock(progress).failures.push(failure);
        }
    }
}

/// Build one unit with its output captured, turning panics into failures
fn build_unit(
    operation: &dyn BuildOperation,
    mux: &OutputMultiplexer,
    unit: &str,
) -> Result<(), BuildError> {
    let captured = panic::catch_unwind(AssertUnwindSafe(|| {
        mux.scope(unit, |out| {
            if let Err(e) = writeln!(out, "Building {unit}") {
                tracing::debug!("{unit}: cannot write build banner: {e}");
            }
            operation.build(unit, out)
        })
    }));

    match captured {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => Err(BuildError::Output {
            unit: unit.to_string(),
            error: e.to_string(),
        }),
        Err(_) => Err(BuildError::Panicked {
            unit: unit.to_string(),
        }),
    }
}
