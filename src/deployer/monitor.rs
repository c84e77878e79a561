//! Stack status monitoring.
//!
//! Polls a stack until its status is terminal. Each status transition is
//! announced once, preceded by the failed resource events recorded since the
//! previous transition.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::cloudformation::{CloudFormationApi, Stack, StackEvent, StackStatus};
use crate::error::{Result, ResultExt};

use super::backoff::{BackoffPolicy, Waiter};
use super::sink::OutputSink;

/// Polls a stack to a terminal status.
pub struct StackMonitor<'a, C: CloudFormationApi + ?Sized, O: OutputSink + ?Sized> {
    api: &'a C,
    sink: &'a O,
    policy: BackoffPolicy,
    timeout: Option<Duration>,
    cancel: Option<watch::Receiver<bool>>,
}

impl<'a, C: CloudFormationApi + ?Sized, O: OutputSink + ?Sized> StackMonitor<'a, C, O> {
    /// Creates a monitor.
    #[must_use]
    pub const fn new(
        api: &'a C,
        sink: &'a O,
        policy: BackoffPolicy,
        timeout: Option<Duration>,
        cancel: Option<watch::Receiver<bool>>,
    ) -> Self {
        Self {
            api,
            sink,
            policy,
            timeout,
            cancel,
        }
    }

    /// Polls `stack_name` until its status is terminal and returns the final
    /// stack. A stack that disappears is reported as `DELETE_COMPLETE`.
    ///
    /// # Errors
    ///
    /// Returns an error if a describe call fails, or polling times out or is
    /// cancelled.
    pub async fn watch(&self, stack_name: &str, since: DateTime<Utc>) -> Result<Stack> {
        let mut waiter = Waiter::start(
            format!("stack {stack_name}"),
            self.timeout,
            self.cancel.clone(),
        );
        let mut last_status: Option<StackStatus> = None;
        let mut since = since;
        let mut attempts: u32 = 0;

        loop {
            let (stack, deleted) = match self.api.describe_stack(stack_name).await {
                Ok(stack) => (stack, false),
                Err(e) if e.is_stack_not_found() => (Stack::deleted(stack_name), true),
                Err(e) => return Err(e.context("describe stack")),
            };

            if last_status.as_ref() != Some(&stack.status) {
                let now = Utc::now();
                if !deleted {
                    for event in self.failures(stack_name, since, now).await? {
                        self.sink.stack_event(&event);
                    }
                }
                since = now;

                info!("Stack {stack_name} is {}", stack.status);
                self.sink.status(&stack.status);
                last_status = Some(stack.status.clone());
                attempts = 0;
            }

            if stack.status.is_terminal() {
                return Ok(stack);
            }

            waiter.wait(self.policy.interval(attempts)).await?;
            attempts = attempts.saturating_add(1);
            self.sink.progress();
        }
    }

    /// Returns failed resource events in `[since, until)`, oldest first.
    async fn failures(
        &self,
        stack_name: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<StackEvent>> {
        let events = self
            .api
            .describe_stack_events(stack_name)
            .await
            .context("get stack events")?;

        let mut failures: Vec<StackEvent> = events
            .into_iter()
            .filter(|event| event.within(since, until) && event.is_failure())
            .collect();
        failures.sort_by_key(|event| event.timestamp);

        debug!("{} failed events for {stack_name}", failures.len());
        Ok(failures)
    }
}
