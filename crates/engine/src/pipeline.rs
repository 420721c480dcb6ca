// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Generic fail-fast step runner.
//!
//! A [`Pipeline`] is an ordered list of named steps bound at registration
//! time. Running it executes steps strictly in order, records one
//! [`ExecutionStep`] per step that ran, and stops at the first failure.
//! Cancellation is observed between steps only; a started step runs to
//! completion or timeout.

use crate::events::{EventSink, RollbackEvent};
use crate::RecoveryError;
use rb_core::{Clock, ExecutionId, ExecutionStep, Phase, StepStatus};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Success carries an optional detail recorded on the step.
pub type StepResult = Result<Option<String>, RecoveryError>;

type StepFuture = Pin<Box<dyn Future<Output = StepResult> + Send>>;
type StepFn<X> = Arc<dyn Fn(Arc<X>) -> StepFuture + Send + Sync>;

struct NamedStep<X> {
    name: String,
    /// Overrides the runner's default timeout.
    timeout: Option<Duration>,
    run: StepFn<X>,
}

/// The step that halted a pipeline and why.
#[derive(Debug)]
pub struct StepFailure {
    pub step: String,
    pub error: RecoveryError,
}

/// Outcome of running a pipeline: the steps that ran, and the failure if any.
#[derive(Debug, Default)]
pub struct PhaseReport {
    pub steps: Vec<ExecutionStep>,
    pub failure: Option<StepFailure>,
}

impl PhaseReport {
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }
}

/// Settings shared by every step of one run.
pub struct StepRunner<'a, C: Clock> {
    pub execution_id: &'a ExecutionId,
    pub clock: &'a C,
    pub timeout: Duration,
    pub cancel: &'a CancellationToken,
    pub events: &'a EventSink,
}

pub struct Pipeline<X> {
    phase: Phase,
    steps: Vec<NamedStep<X>>,
}

impl<X: Send + Sync + 'static> Pipeline<X> {
    pub fn new(phase: Phase) -> Self {
        Self { phase, steps: Vec::new() }
    }

    /// Register a named step bounded by the runner's timeout.
    pub fn step<F, Fut>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Arc<X>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = StepResult> + Send + 'static,
    {
        self.push(name.into(), None, f)
    }

    /// Register a named step with its own timeout.
    pub fn step_with_timeout<F, Fut>(self, name: impl Into<String>, timeout: Duration, f: F) -> Self
    where
        F: Fn(Arc<X>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = StepResult> + Send + 'static,
    {
        self.push(name.into(), Some(timeout), f)
    }

    fn push<F, Fut>(mut self, name: String, timeout: Option<Duration>, f: F) -> Self
    where
        F: Fn(Arc<X>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = StepResult> + Send + 'static,
    {
        let run: StepFn<X> = Arc::new(move |ctx: Arc<X>| -> StepFuture { Box::pin(f(ctx)) });
        self.steps.push(NamedStep { name, timeout, run });
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Step names in declared order.
    pub fn names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub async fn run<C: Clock>(&self, ctx: Arc<X>, runner: &StepRunner<'_, C>) -> PhaseReport {
        let mut report = PhaseReport::default();
        for step in &self.steps {
            if runner.cancel.is_cancelled() {
                tracing::warn!(
                    execution_id = %runner.execution_id,
                    phase = %self.phase,
                    step = %step.name,
                    "cancelled before step"
                );
                report.failure =
                    Some(StepFailure { step: step.name.clone(), error: RecoveryError::Cancelled });
                break;
            }

            runner
                .events
                .emit(RollbackEvent::StepStarted {
                    execution_id: runner.execution_id.clone(),
                    phase: self.phase,
                    step: step.name.clone(),
                })
                .await;

            let started_at_ms = runner.clock.epoch_ms();
            let timeout = step.timeout.unwrap_or(runner.timeout);
            let work = (step.run)(Arc::clone(&ctx));
            let result = match tokio::time::timeout(timeout, work).await {
                Ok(result) => result,
                Err(_) => Err(RecoveryError::Timeout { step: step.name.clone(), after: timeout }),
            };
            let completed_at_ms = runner.clock.epoch_ms();

            let (status, error, detail) = match &result {
                Ok(detail) => (StepStatus::Success, None, detail.clone()),
                Err(e) => (StepStatus::Failed, Some(e.to_string()), None),
            };
            let record = ExecutionStep {
                name: step.name.clone(),
                phase: self.phase,
                started_at_ms,
                completed_at_ms,
                status,
                error,
                detail,
            };
            runner
                .events
                .emit(RollbackEvent::StepFinished {
                    execution_id: runner.execution_id.clone(),
                    step: record.clone(),
                })
                .await;
            report.steps.push(record);

            if let Err(error) = result {
                report.failure = Some(StepFailure { step: step.name.clone(), error });
                break;
            }
        }
        report
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
