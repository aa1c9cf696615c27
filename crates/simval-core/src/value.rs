//! Thread-safe value sink fed by a single consumer task.
//!
//! A [`Value`] moves through `New → Configured → Running → Stopped`:
//!
//! - While `New`/`Configured`, transforms, reset-on-read, the fault policy and
//!   the failure observer may be set. Once started, every such call is
//!   rejected with [`Error::ConfigurationFrozen`].
//! - [`Value::start`] subscribes to the source and spawns exactly one consumer
//!   task. A second `start` is rejected.
//! - [`Value::stop`] waits for the consumer to exit. The consumer ends when the
//!   source closes its stream; `stop` does not cancel it. Repeated calls all
//!   wait for the same exit.
//!
//! The consumer is the only writer of the state apart from the read-and-reset
//! path of [`Value::value`]. Both take the same exclusive lock, so every
//! committed update is observed by exactly one resetting read or overwritten
//! by a later update; nothing is skipped and nothing is counted twice.

use crate::error::{panic_message, usage_error, Error, Result, TransformError};
use crate::hook::{isolate, FailureObserver, FaultPolicy, LogFailures, UpdateFailure, UpdateHook};
use crate::publisher::{Publisher, Subscription};
use crate::transform::Transform;
use parking_lot::{Mutex, RwLock};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

const COMPONENT: &str = "value";

/// Lifecycle state of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueState {
    /// Constructed, nothing configured yet.
    New,
    /// At least one configuration call succeeded.
    Configured,
    /// Consumer task spawned; configuration frozen.
    Running,
    /// `stop` completed.
    Stopped,
}

/// Side-effect-free snapshot of a [`Value`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueStats<T> {
    /// Updates committed by the consumer task.
    pub update_count: u64,
    /// Updates aborted by a failing transform.
    pub failed_updates: u64,
    /// Current state (not reset by taking the snapshot).
    pub current_value: T,
    /// Number of transforms in the pipeline.
    pub transform_count: usize,
}

struct State<T> {
    current: T,
    update_count: u64,
    failed_updates: u64,
    transform_count: usize,
    reset_value: Option<T>,
    hook: Option<Arc<dyn UpdateHook<T>>>,
}

struct Config<T> {
    transforms: Vec<Box<dyn Transform<T>>>,
    fault_policy: FaultPolicy,
    observer: Arc<dyn FailureObserver>,
}

impl<T> Default for Config<T> {
    fn default() -> Self {
        Self {
            transforms: Vec::new(),
            fault_policy: FaultPolicy::default(),
            observer: Arc::new(LogFailures),
        }
    }
}

struct Lifecycle<T> {
    state: ValueState,
    config: Config<T>,
    exited: Option<watch::Receiver<bool>>,
}

struct Inner<T> {
    source: Arc<dyn Publisher<T>>,
    initial: T,
    state: RwLock<State<T>>,
    lifecycle: Mutex<Lifecycle<T>>,
}

/// A simulated value: the sink end of a clock → source → transforms pipeline.
///
/// Share it between readers with `Arc<Value<T>>`. Use [`Value::fork`] for an
/// independent value on the same source.
pub struct Value<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Value<T>
where
    T: Clone + Default + Send + Sync + 'static,
{
    /// Create a value whose state starts at `T::default()`.
    pub fn new<P>(source: P) -> Self
    where
        P: Publisher<T> + 'static,
    {
        Self::with_initial(source, T::default())
    }
}

impl<T> Value<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a value whose state starts at `initial`.
    pub fn with_initial<P>(source: P, initial: T) -> Self
    where
        P: Publisher<T> + 'static,
    {
        Self::from_parts(Arc::new(source), initial, Config::default(), None)
    }

    fn from_parts(
        source: Arc<dyn Publisher<T>>,
        initial: T,
        config: Config<T>,
        reset_value: Option<T>,
    ) -> Self {
        let configured = !config.transforms.is_empty() || reset_value.is_some();
        let state = State {
            current: initial.clone(),
            update_count: 0,
            failed_updates: 0,
            transform_count: config.transforms.len(),
            reset_value,
            hook: None,
        };
        let lifecycle = Lifecycle {
            state: if configured {
                ValueState::Configured
            } else {
                ValueState::New
            },
            config,
            exited: None,
        };

        Self {
            inner: Arc::new(Inner {
                source,
                initial,
                state: RwLock::new(state),
                lifecycle: Mutex::new(lifecycle),
            }),
        }
    }

    /// Append a transform to the pipeline.
    pub fn add_transform<X>(&self, transform: X) -> Result<&Self>
    where
        X: Transform<T> + 'static,
    {
        self.add_boxed_transform(Box::new(transform))
    }

    /// Append an already boxed transform to the pipeline.
    pub fn add_boxed_transform(&self, transform: Box<dyn Transform<T>>) -> Result<&Self> {
        self.configure(|config, state| {
            config.transforms.push(transform);
            state.transform_count = config.transforms.len();
        })
    }

    /// Make every [`Value::value`] call atomically swap the state to `reset`.
    pub fn enable_reset_on_read(&self, reset: T) -> Result<&Self> {
        self.configure(|_, state| state.reset_value = Some(reset))
    }

    /// Choose whether the consumer keeps going after a failed update.
    pub fn set_fault_policy(&self, policy: FaultPolicy) -> Result<&Self> {
        self.configure(|config, _| config.fault_policy = policy)
    }

    /// Replace the observer that receives failed updates.
    pub fn set_failure_observer(&self, observer: Arc<dyn FailureObserver>) -> Result<&Self> {
        self.configure(|config, _| config.observer = observer)
    }

    /// Install or remove the update hook. Legal in every state.
    pub fn set_update_hook(&self, hook: Option<Arc<dyn UpdateHook<T>>>) -> &Self {
        self.inner.state.write().hook = hook;
        self
    }

    fn configure(&self, apply: impl FnOnce(&mut Config<T>, &mut State<T>)) -> Result<&Self> {
        let mut lifecycle = self.inner.lifecycle.lock();
        match lifecycle.state {
            ValueState::New | ValueState::Configured => {}
            ValueState::Running | ValueState::Stopped => {
                return Err(usage_error(Error::ConfigurationFrozen {
                    component: COMPONENT,
                }))
            }
        }

        let mut state = self.inner.state.write();
        apply(&mut lifecycle.config, &mut state);
        lifecycle.state = ValueState::Configured;
        Ok(self)
    }

    /// Subscribe to the source and spawn the consumer task.
    ///
    /// Must be called from within a tokio runtime. Freezes the configuration.
    pub fn start(&self) -> Result<()> {
        let mut lifecycle = self.inner.lifecycle.lock();
        match lifecycle.state {
            ValueState::Running => {
                return Err(usage_error(Error::AlreadyRunning {
                    component: COMPONENT,
                }))
            }
            ValueState::Stopped => {
                return Err(usage_error(Error::Stopped {
                    component: COMPONENT,
                }))
            }
            ValueState::New | ValueState::Configured => {}
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            usage_error(Error::NoRuntime {
                component: COMPONENT,
            })
        })?;

        // The consumer takes the configured instances; fresh copies stay behind for `fork`.
        let prototypes = lifecycle
            .config
            .transforms
            .iter()
            .map(|t| t.fresh())
            .collect();
        let transforms = std::mem::replace(&mut lifecycle.config.transforms, prototypes);

        let (exited_tx, exited_rx) = watch::channel(false);
        let consumer = Consumer {
            inner: self.inner.clone(),
            subscription: self.inner.source.subscribe(),
            transforms,
            policy: lifecycle.config.fault_policy,
            observer: lifecycle.config.observer.clone(),
            exited: exited_tx,
        };
        runtime.spawn(consumer.run());

        lifecycle.exited = Some(exited_rx);
        lifecycle.state = ValueState::Running;

        debug!(
            transforms = lifecycle.config.transforms.len(),
            policy = ?lifecycle.config.fault_policy,
            "Value started"
        );
        Ok(())
    }

    /// Wait for the consumer task to exit, then mark the value stopped.
    ///
    /// The consumer exits once its source closes (e.g. after the clock driving
    /// the source is stopped). Safe to call any number of times, concurrently
    /// included; every call returns only after the consumer has exited. A
    /// value that never started is stopped immediately.
    pub async fn stop(&self) {
        let exited = {
            let mut lifecycle = self.inner.lifecycle.lock();
            match lifecycle.state {
                ValueState::New | ValueState::Configured => {
                    lifecycle.state = ValueState::Stopped;
                    debug!("Value stopped before start");
                    None
                }
                ValueState::Running | ValueState::Stopped => lifecycle.exited.clone(),
            }
        };

        let Some(mut exited) = exited else {
            return;
        };
        // An error means the consumer dropped its sender, which also means it is gone.
        let _ = exited.wait_for(|done| *done).await;

        let mut lifecycle = self.inner.lifecycle.lock();
        if lifecycle.state == ValueState::Running {
            lifecycle.state = ValueState::Stopped;
            debug!(
                updates = self.inner.state.read().update_count,
                "Value stopped"
            );
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ValueState {
        self.inner.lifecycle.lock().state
    }

    /// Whether reads reset the state.
    pub fn is_reset_on_read(&self) -> bool {
        self.inner.state.read().reset_value.is_some()
    }

    /// Read the current state.
    ///
    /// With reset-on-read enabled this is an atomic read-and-reset under the
    /// exclusive lock; otherwise a shared read that may overlap other readers.
    pub fn value(&self) -> T {
        {
            let state = self.inner.state.read();
            if state.reset_value.is_none() {
                return state.current.clone();
            }
        }

        let mut state = self.inner.state.write();
        match state.reset_value.clone() {
            Some(reset) => std::mem::replace(&mut state.current, reset),
            None => state.current.clone(),
        }
    }

    /// Snapshot of counters and state. Never resets.
    pub fn stats(&self) -> ValueStats<T> {
        let state = self.inner.state.read();
        ValueStats {
            update_count: state.update_count,
            failed_updates: state.failed_updates,
            current_value: state.current.clone(),
            transform_count: state.transform_count,
        }
    }

    /// An independent value on the same source.
    ///
    /// The fork gets fresh copies of the transforms (their memory reset), the
    /// same reset-on-read, fault policy and failure observer, no hook, and
    /// the initial state. It starts out unstarted regardless of this value's
    /// state.
    pub fn fork(&self) -> Value<T> {
        let lifecycle = self.inner.lifecycle.lock();
        let reset_value = self.inner.state.read().reset_value.clone();
        let config = Config {
            transforms: lifecycle
                .config
                .transforms
                .iter()
                .map(|t| t.fresh())
                .collect(),
            fault_policy: lifecycle.config.fault_policy,
            observer: lifecycle.config.observer.clone(),
        };

        Self::from_parts(
            self.inner.source.clone(),
            self.inner.initial.clone(),
            config,
            reset_value,
        )
    }
}

impl<T> Inner<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Apply one input under the exclusive lock.
    ///
    /// On failure the state is left untouched apart from the failure counter.
    fn apply_update(
        &self,
        sequence: u64,
        input: T,
        transforms: &mut [Box<dyn Transform<T>>],
    ) -> std::result::Result<(), UpdateFailure> {
        let mut state = self.state.write();
        let prior = state.current.clone();
        let hook = state.hook.clone();

        if let Some(hook) = &hook {
            isolate("on_input", || hook.on_input(&input, &prior));
        }

        let mut next = input;
        for transform in transforms.iter_mut() {
            let step_input = hook.as_ref().map(|_| next.clone());
            let result = catch_unwind(AssertUnwindSafe(|| transform.apply(next, &prior)))
                .unwrap_or_else(|payload| {
                    Err(TransformError::Panicked(panic_message(payload.as_ref())))
                });

            match result {
                Ok(output) => {
                    if let (Some(hook), Some(step_input)) = (&hook, &step_input) {
                        isolate("on_transform", || {
                            hook.on_transform(transform.name(), step_input, &output, &prior)
                        });
                    }
                    next = output;
                }
                Err(error) => {
                    state.failed_updates += 1;
                    return Err(UpdateFailure {
                        sequence,
                        transform: transform.name().to_string(),
                        error,
                    });
                }
            }
        }

        state.current = next;
        if let Some(hook) = &hook {
            isolate("after_update", || hook.after_update(&state.current));
        }
        state.update_count += 1;
        Ok(())
    }
}

struct Consumer<T> {
    inner: Arc<Inner<T>>,
    subscription: Subscription<T>,
    transforms: Vec<Box<dyn Transform<T>>>,
    policy: FaultPolicy,
    observer: Arc<dyn FailureObserver>,
    exited: watch::Sender<bool>,
}

impl<T> Consumer<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn run(mut self) {
        let mut sequence = 0u64;

        while let Some(input) = self.subscription.recv().await {
            let outcome = self
                .inner
                .apply_update(sequence, input, &mut self.transforms);
            sequence += 1;

            if let Err(failure) = outcome {
                let observer = &self.observer;
                isolate("on_failure", || observer.on_failure(&failure));

                if self.policy == FaultPolicy::Halt {
                    warn!(sequence = failure.sequence, "Value consumer halted after failed update");
                    break;
                }
            }
        }

        drop(self.subscription);
        debug!(received = sequence, "Value consumer exiting");
        self.exited.send_replace(true);
    }
}
