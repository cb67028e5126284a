//! Trigger service: event intake and workflow dispatch
//!
//! The top-level coordinator. An incoming event is matched against the
//! stored triggers; each matched workflow runs as an independent task with
//! its own execution context. `fire_and_wait` blocks the caller up to a
//! timeout; the timeout cancels only the caller's wait, never the workflow
//! itself, which runs to completion and lands its result in the execution
//! store.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::task::JoinHandle;
use uuid::Uuid;
use workflow_engine::{
    EventSink, ExecutionContext, NullEventSink, ProcessorResolver, SandboxedIo,
    WorkflowDefinition, WorkflowExecutionEngine, WorkflowRunResult,
};

use switchboard_event_sources::{EventBusReceiver, SourceEvent};

use crate::error::{Result, TriggerError};
use crate::execution::ExecutionStore;
use crate::matcher::TriggerMatcher;
use crate::store::{TriggerRepository, WorkflowRepository};
use crate::trigger::Trigger;

/// Wait timeout applied when neither the caller nor the trigger names one
pub const DEFAULT_WAIT_TIMEOUT_SECS: u64 = 30;

/// Outcome of a fire-and-wait call
///
/// `NoTriggers` is a valid, distinct result, not an error: nothing matched
/// and zero workflows ran.
#[derive(Debug)]
pub enum FireOutcome {
    NoTriggers,
    Completed(WorkflowRunResult),
}

/// Outcome of processing an event whose dispatch mode follows the matched
/// trigger (`sync` waits, `async` doesn't)
#[derive(Debug)]
pub enum ProcessOutcome {
    NoTriggers,
    /// Async dispatch; executions run in the background
    Dispatched(Vec<String>),
    /// Sync dispatch; the highest-priority trigger's terminal result
    Completed(WorkflowRunResult),
}

/// Coordinates trigger matching and workflow dispatch
pub struct TriggerService {
    triggers: Arc<dyn TriggerRepository>,
    workflows: Arc<dyn WorkflowRepository>,
    resolver: Arc<dyn ProcessorResolver>,
    executions: Arc<ExecutionStore>,
    io: Arc<dyn SandboxedIo>,
    event_sink: Arc<dyn EventSink>,
}

impl TriggerService {
    pub fn new(
        triggers: Arc<dyn TriggerRepository>,
        workflows: Arc<dyn WorkflowRepository>,
        resolver: Arc<dyn ProcessorResolver>,
    ) -> Self {
        Self {
            triggers,
            workflows,
            resolver,
            executions: Arc::new(ExecutionStore::new()),
            io: Arc::new(workflow_engine::DenyAllIo),
            event_sink: Arc::new(NullEventSink),
        }
    }

    /// Set the sandboxed I/O surface handed to execution contexts
    pub fn with_io(mut self, io: Arc<dyn SandboxedIo>) -> Self {
        self.io = io;
        self
    }

    /// Set the event sink engines stream progress into
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// The execution store, for result polling
    pub fn executions(&self) -> Arc<ExecutionStore> {
        self.executions.clone()
    }

    /// Match triggers and schedule every matched workflow without waiting
    ///
    /// Returns the execution ids of everything scheduled; an empty list
    /// means nothing matched.
    pub async fn fire_and_forget(
        &self,
        event_type: &str,
        source: Option<&str>,
        payload: &Value,
    ) -> Vec<String> {
        let stored = self.triggers.triggers_for_event(event_type).await;
        let matched = TriggerMatcher::match_triggers(event_type, source, payload, &stored);

        let mut execution_ids = Vec::with_capacity(matched.len());
        for trigger in matched {
            let (execution_id, _handle) = self.dispatch(trigger, payload).await;
            execution_ids.push(execution_id);
        }
        execution_ids
    }

    /// Match triggers, run every matched workflow, and block for the
    /// highest-priority one's result up to a timeout
    ///
    /// On timeout the caller gets `WorkflowTimeoutError` carrying the
    /// execution id; the workflow itself keeps running (at-most-once
    /// response, best-effort completion) and its result stays observable
    /// through the execution store. Lower-priority matches run detached.
    pub async fn fire_and_wait(
        &self,
        event_type: &str,
        source: Option<&str>,
        payload: &Value,
        timeout_secs: Option<u64>,
    ) -> Result<FireOutcome> {
        let stored = self.triggers.triggers_for_event(event_type).await;
        let matched = TriggerMatcher::match_triggers(event_type, source, payload, &stored);

        let Some((primary, rest)) = matched.split_first() else {
            return Ok(FireOutcome::NoTriggers);
        };

        if !rest.is_empty() {
            // Multiple synchronous triggers for one event is an edge case
            // with debatable semantics; flag it rather than hide it.
            log::warn!(
                "{} triggers matched event '{}'; waiting on '{}' (priority {}), the rest run detached",
                matched.len(),
                event_type,
                primary.id,
                primary.priority
            );
        }
        for trigger in rest {
            let (_execution_id, _handle) = self.dispatch(trigger, payload).await;
        }

        let (execution_id, handle) = self.dispatch(primary, payload).await;
        let timeout = timeout_secs
            .or(primary.timeout_secs)
            .unwrap_or(DEFAULT_WAIT_TIMEOUT_SECS);

        match tokio::time::timeout(Duration::from_secs(timeout), handle).await {
            Ok(Ok(result)) => result.map(FireOutcome::Completed),
            Ok(Err(_join_error)) => Err(TriggerError::ExecutionAborted(execution_id)),
            Err(_elapsed) => {
                // Dropping the join handle detaches the task; the workflow
                // runs on.
                log::info!(
                    "fire_and_wait timed out after {}s; execution '{}' continues in background",
                    timeout,
                    execution_id
                );
                Err(TriggerError::WorkflowTimeout {
                    execution_id,
                    timeout_secs: timeout,
                })
            }
        }
    }

    /// Run a workflow directly, bypassing trigger matching
    ///
    /// The payload is seeded onto the workflow's entry nodes. Used by the
    /// manual-execution HTTP surface.
    pub async fn run_workflow(
        &self,
        workflow_id: &str,
        payload: &Value,
    ) -> Result<WorkflowRunResult> {
        let workflow = self
            .workflows
            .workflow(workflow_id)
            .await
            .ok_or_else(|| TriggerError::UnknownWorkflow(workflow_id.to_string()))?;

        let execution_id = new_execution_id();
        self.executions
            .insert_running(&execution_id, workflow_id, None)
            .await;

        self.execute(&workflow, &execution_id, None, payload).await
    }

    /// Execute a single node ad hoc, bypassing the DAG
    ///
    /// Used for testing a processor in isolation through the HTTP surface.
    pub async fn execute_node(
        &self,
        node_type: &str,
        inputs: &serde_json::Map<String, Value>,
        config: Value,
    ) -> Result<std::collections::HashMap<String, Value>> {
        let processor = self
            .resolver
            .processor(node_type)
            .ok_or_else(|| workflow_engine::EngineError::MissingProcessor(node_type.to_string()))?;

        let execution_id = new_execution_id();
        let node_id = format!("adhoc-{}", node_type);
        let context = ExecutionContext::new(&execution_id, "adhoc", self.io.clone());
        for (port, value) in inputs {
            context.set_input(&node_id, port, value.clone()).await;
        }

        let node = workflow_engine::NodeConfig::new(&node_id, node_type, node_type)
            .with_config(config);
        Ok(processor.execute(&node, &context).await?)
    }

    /// Forward a source event into fire-and-forget dispatch
    pub async fn process_event(&self, event: &SourceEvent) -> Vec<String> {
        self.fire_and_forget(&event.event_type, Some(&event.source), &event.payload)
            .await
    }

    /// Process an event, picking the dispatch mode from the matched
    /// trigger: a sync highest-priority match blocks for its result,
    /// anything else is fire-and-forget
    pub async fn process_event_auto(
        &self,
        event_type: &str,
        source: Option<&str>,
        payload: &Value,
    ) -> Result<ProcessOutcome> {
        let stored = self.triggers.triggers_for_event(event_type).await;
        let matched = TriggerMatcher::match_triggers(event_type, source, payload, &stored);

        let Some(primary) = matched.first() else {
            return Ok(ProcessOutcome::NoTriggers);
        };

        if primary.execution_mode == crate::trigger::TriggerExecutionMode::Sync {
            match self.fire_and_wait(event_type, source, payload, None).await? {
                FireOutcome::NoTriggers => Ok(ProcessOutcome::NoTriggers),
                FireOutcome::Completed(result) => Ok(ProcessOutcome::Completed(result)),
            }
        } else {
            let ids = self.fire_and_forget(event_type, source, payload).await;
            Ok(ProcessOutcome::Dispatched(ids))
        }
    }

    /// Schedule a matched trigger's workflow and return its execution id
    /// plus the handle the waiting path races against
    async fn dispatch(
        &self,
        trigger: &Trigger,
        payload: &Value,
    ) -> (String, JoinHandle<Result<WorkflowRunResult>>) {
        let execution_id = new_execution_id();
        self.executions
            .insert_running(&execution_id, &trigger.workflow_id, Some(trigger.id.clone()))
            .await;

        let workflows = self.workflows.clone();
        let resolver = self.resolver.clone();
        let executions = self.executions.clone();
        let io = self.io.clone();
        let event_sink = self.event_sink.clone();
        let workflow_id = trigger.workflow_id.clone();
        let target_node = trigger.target_node_id.clone();
        let payload = payload.clone();
        let id = execution_id.clone();

        let handle = tokio::spawn(async move {
            let Some(workflow) = workflows.workflow(&workflow_id).await else {
                let err = TriggerError::UnknownWorkflow(workflow_id.clone());
                executions.fail(&id, err.to_string()).await;
                return Err(err);
            };

            run_execution(
                &workflow,
                &id,
                target_node.as_deref(),
                &payload,
                resolver,
                io,
                event_sink,
                executions,
            )
            .await
        });

        (execution_id, handle)
    }

    /// Shared execution tail for direct workflow runs
    async fn execute(
        &self,
        workflow: &WorkflowDefinition,
        execution_id: &str,
        target_node: Option<&str>,
        payload: &Value,
    ) -> Result<WorkflowRunResult> {
        run_execution(
            workflow,
            execution_id,
            target_node,
            payload,
            self.resolver.clone(),
            self.io.clone(),
            self.event_sink.clone(),
            self.executions.clone(),
        )
        .await
    }
}

/// Seed the payload, run the engine, and finalize the execution record
#[allow(clippy::too_many_arguments)]
async fn run_execution(
    workflow: &WorkflowDefinition,
    execution_id: &str,
    target_node: Option<&str>,
    payload: &Value,
    resolver: Arc<dyn ProcessorResolver>,
    io: Arc<dyn SandboxedIo>,
    event_sink: Arc<dyn EventSink>,
    executions: Arc<ExecutionStore>,
) -> Result<WorkflowRunResult> {
    let context = ExecutionContext::new(execution_id, &workflow.id, io);
    seed_payload(&context, workflow, target_node, payload).await;

    let engine = WorkflowExecutionEngine::new(resolver).with_event_sink(event_sink);
    match engine.execute(workflow, &context).await {
        Ok(result) => {
            executions.finish(&result).await;
            Ok(result)
        }
        Err(e) => {
            executions.fail(execution_id, e.to_string()).await;
            Err(e.into())
        }
    }
}

/// Seed event payload fields as inputs on the target node, or on every
/// entry node when the trigger names none
async fn seed_payload(
    context: &ExecutionContext,
    workflow: &WorkflowDefinition,
    target_node: Option<&str>,
    payload: &Value,
) {
    let targets: Vec<String> = match target_node {
        Some(node_id) => vec![node_id.to_string()],
        None => workflow
            .nodes
            .iter()
            .filter(|n| workflow.incoming(&n.id).next().is_none())
            .map(|n| n.id.clone())
            .collect(),
    };

    for node_id in &targets {
        match payload.as_object() {
            Some(fields) => {
                for (port, value) in fields {
                    context.set_input(node_id, port, value.clone()).await;
                }
            }
            None if !payload.is_null() => {
                context.set_input(node_id, "payload", payload.clone()).await;
            }
            None => {}
        }
    }
}

fn new_execution_id() -> String {
    format!("exec-{}", Uuid::new_v4())
}

/// Drain the event bus into the trigger service until the bus closes
///
/// The consumer half of the source → trigger channel; one pump per bus.
pub fn spawn_event_pump(
    service: Arc<TriggerService>,
    mut receiver: EventBusReceiver,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = receiver.recv().await {
            let ids = service.process_event(&event).await;
            if ids.is_empty() {
                log::debug!("Event '{}' matched no triggers", event.event_type);
            } else {
                log::debug!(
                    "Event '{}' dispatched {} execution(s)",
                    event.event_type,
                    ids.len()
                );
            }
        }
        log::info!("Event bus closed; pump exiting");
    })
}
