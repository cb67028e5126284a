//! Workflow execution engine
//!
//! Walks a workflow's node/connection graph in dependency order, invoking
//! each node's processor with the execution context. Structural problems
//! (cycles, dangling connections, unknown node types) are rejected before
//! any node runs; runtime node failures are converted into a structured
//! failure result rather than propagated as unhandled errors.
//!
//! Nodes with no edge between them have no ordering guarantee relative to
//! each other: each topological wave runs concurrently, and processors must
//! not assume sibling-branch completion order.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;

use crate::context::{ExecutionContext, LogLevel};
use crate::error::{EngineError, Result};
use crate::events::{EventSink, NullEventSink, WorkflowEvent};
use crate::processor::ProcessorResolver;
use crate::types::{
    ExecutionStatus, NodeConfig, NodeId, NodeOutcome, WorkflowDefinition, WorkflowRunResult,
};

/// Executes workflow definitions against a processor resolver
pub struct WorkflowExecutionEngine {
    resolver: Arc<dyn ProcessorResolver>,
    event_sink: Arc<dyn EventSink>,
}

impl WorkflowExecutionEngine {
    /// Create an engine with no event streaming
    pub fn new(resolver: Arc<dyn ProcessorResolver>) -> Self {
        Self {
            resolver,
            event_sink: Arc::new(NullEventSink),
        }
    }

    /// Set the event sink for execution progress streaming
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Execute a workflow definition to completion
    ///
    /// Returns `Err` only for eager, all-or-nothing failures (invalid
    /// definition, unknown node type); runtime node failures yield an
    /// `Ok` result with `ExecutionStatus::Failed`.
    pub async fn execute(
        &self,
        definition: &WorkflowDefinition,
        context: &ExecutionContext,
    ) -> Result<WorkflowRunResult> {
        let start_time = Instant::now();
        let waves = topological_waves(definition)?;
        self.check_processors(definition)?;

        let execution_id = context.execution_id().to_string();
        self.emit(WorkflowEvent::WorkflowStarted {
            workflow_id: definition.id.clone(),
            execution_id: execution_id.clone(),
        });

        let mut outcomes: HashMap<NodeId, NodeOutcome> = HashMap::new();
        let mut fatal: Option<EngineError> = None;

        'waves: for wave in &waves {
            let mut runnable: Vec<&NodeConfig> = Vec::new();

            for node_id in wave {
                let node = definition
                    .find_node(node_id)
                    .ok_or_else(|| EngineError::definition(format!("node '{}' not found", node_id)))?;

                if let Some(reason) = self.skip_reason(node, definition, &outcomes, context).await {
                    outcomes.insert(node.id.clone(), NodeOutcome::Skipped);
                    self.emit(WorkflowEvent::NodeSkipped {
                        node_id: node.id.clone(),
                        execution_id: execution_id.clone(),
                        reason,
                    });
                    continue;
                }
                runnable.push(node);
            }

            // Feed each runnable node's inputs from upstream outputs before
            // the wave starts; siblings then run concurrently.
            for node in &runnable {
                for conn in definition.incoming(&node.id) {
                    if let Some(value) = context.output(&conn.from_node, &conn.from_port).await {
                        context.set_input(&conn.to_node, &conn.to_port, value).await;
                    }
                }
            }

            let results = join_all(
                runnable
                    .iter()
                    .map(|node| self.run_node(node, context, &execution_id)),
            )
            .await;

            for (node, result) in runnable.iter().zip(results) {
                match result {
                    Ok(()) => {
                        outcomes.insert(node.id.clone(), NodeOutcome::Completed);
                    }
                    Err(err) => {
                        let optional = self
                            .resolver
                            .descriptor(&node.node_type)
                            .map(|d| d.optional)
                            .unwrap_or(false);
                        let timed_out = matches!(err, EngineError::NodeTimeout { .. });
                        outcomes.insert(
                            node.id.clone(),
                            if timed_out {
                                NodeOutcome::TimedOut
                            } else {
                                NodeOutcome::Failed
                            },
                        );
                        if !optional {
                            fatal = Some(err);
                            break 'waves;
                        }
                        log::warn!(
                            "Optional node '{}' failed, continuing: {}",
                            node.id,
                            err
                        );
                    }
                }
            }
        }

        let elapsed = start_time.elapsed().as_millis() as u64;

        if let Some(err) = fatal {
            // Anything not yet reached stays out of the outcome map on
            // purpose; it was never considered.
            self.emit(WorkflowEvent::WorkflowFailed {
                workflow_id: definition.id.clone(),
                execution_id: execution_id.clone(),
                error: err.to_string(),
            });
            return Ok(WorkflowRunResult::failure(
                execution_id,
                definition.id.clone(),
                err.to_string(),
                outcomes,
                elapsed,
            ));
        }

        let mut outputs = HashMap::new();
        for node in definition.terminal_nodes() {
            for (port, value) in context.node_outputs(&node.id).await {
                outputs.insert(format!("{}.{}", node.id, port), value);
            }
        }

        self.emit(WorkflowEvent::WorkflowCompleted {
            workflow_id: definition.id.clone(),
            execution_id: execution_id.clone(),
        });

        Ok(WorkflowRunResult::success(
            execution_id,
            definition.id.clone(),
            outputs,
            outcomes,
            elapsed,
        ))
    }

    /// Verify every referenced node type has a processor before running
    fn check_processors(&self, definition: &WorkflowDefinition) -> Result<()> {
        for node in &definition.nodes {
            if self.resolver.processor(&node.node_type).is_none() {
                return Err(EngineError::MissingProcessor(node.node_type.clone()));
            }
        }
        Ok(())
    }

    /// Decide whether a node is skipped, and why
    async fn skip_reason(
        &self,
        node: &NodeConfig,
        definition: &WorkflowDefinition,
        outcomes: &HashMap<NodeId, NodeOutcome>,
        context: &ExecutionContext,
    ) -> Option<String> {
        if !node.enabled {
            return Some("disabled".to_string());
        }

        let condition = match &node.condition_key {
            Some(key) => Some(
                context
                    .state(key)
                    .await
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false),
            ),
            None => None,
        };

        if condition == Some(false) {
            return Some("condition evaluated false".to_string());
        }

        let upstream_ok = definition.dependencies(&node.id).iter().all(|dep| {
            matches!(outcomes.get(dep), Some(NodeOutcome::Completed))
        });
        // A true conditional-branch annotation routes around failed or
        // skipped upstream branches.
        if !upstream_ok && condition != Some(true) {
            return Some("upstream node failed or was skipped".to_string());
        }

        None
    }

    /// Run a single node with timeout and retry handling
    async fn run_node(
        &self,
        node: &NodeConfig,
        context: &ExecutionContext,
        execution_id: &str,
    ) -> Result<()> {
        let processor = self
            .resolver
            .processor(&node.node_type)
            .ok_or_else(|| EngineError::MissingProcessor(node.node_type.clone()))?;
        let descriptor = self.resolver.descriptor(&node.node_type);
        let timeout_secs = descriptor.as_ref().and_then(|d| d.timeout_secs);
        let retries = descriptor.as_ref().map(|d| d.retry_count).unwrap_or(0);

        self.emit(WorkflowEvent::NodeStarted {
            node_id: node.id.clone(),
            execution_id: execution_id.to_string(),
        });

        let mut attempt = 0u32;
        let outputs = loop {
            let run = processor.execute(node, context);
            let result = match timeout_secs {
                Some(secs) => {
                    match tokio::time::timeout(Duration::from_secs(secs), run).await {
                        Ok(result) => result,
                        Err(_) => {
                            let err = EngineError::NodeTimeout {
                                node_id: node.id.clone(),
                                timeout_secs: secs,
                            };
                            self.emit(WorkflowEvent::NodeFailed {
                                node_id: node.id.clone(),
                                execution_id: execution_id.to_string(),
                                error: err.to_string(),
                            });
                            // Timeouts are not retried.
                            return Err(err);
                        }
                    }
                }
                None => run.await,
            };

            match result {
                Ok(outputs) => break outputs,
                Err(err) if attempt < retries => {
                    attempt += 1;
                    log::debug!(
                        "Node '{}' attempt {}/{} failed: {}",
                        node.id,
                        attempt,
                        retries,
                        err
                    );
                }
                Err(err) => {
                    self.emit(WorkflowEvent::NodeFailed {
                        node_id: node.id.clone(),
                        execution_id: execution_id.to_string(),
                        error: err.to_string(),
                    });
                    return Err(err);
                }
            }
        };

        for (port, value) in &outputs {
            context.set_output(&node.id, port, value.clone()).await;
        }
        context
            .log(
                LogLevel::Info,
                format!("Node '{}' completed", node.id),
                None,
            )
            .await;
        self.emit(WorkflowEvent::NodeCompleted {
            node_id: node.id.clone(),
            execution_id: execution_id.to_string(),
            output: Some(serde_json::json!(outputs)),
        });

        Ok(())
    }

    fn emit(&self, event: WorkflowEvent) {
        let _ = self.event_sink.send(event);
    }
}

/// Compute topological waves using Kahn's algorithm
///
/// Wave N contains every node whose dependencies all sit in earlier waves;
/// nodes within one wave are independent of each other. A cycle or a
/// connection referencing an unknown node is a definition error.
pub fn topological_waves(definition: &WorkflowDefinition) -> Result<Vec<Vec<NodeId>>> {
    let node_ids: HashSet<&str> = definition.nodes.iter().map(|n| n.id.as_str()).collect();

    for conn in &definition.connections {
        if !node_ids.contains(conn.from_node.as_str()) {
            return Err(EngineError::definition(format!(
                "connection references unknown node '{}'",
                conn.from_node
            )));
        }
        if !node_ids.contains(conn.to_node.as_str()) {
            return Err(EngineError::definition(format!(
                "connection references unknown node '{}'",
                conn.to_node
            )));
        }
    }

    let mut in_degree: HashMap<&str, usize> = HashMap::new();
    for node in &definition.nodes {
        in_degree.insert(&node.id, 0);
    }
    for conn in &definition.connections {
        *in_degree.entry(&conn.to_node).or_insert(0) += 1;
    }

    let mut ready: VecDeque<&str> = definition
        .nodes
        .iter()
        .filter(|n| in_degree[n.id.as_str()] == 0)
        .map(|n| n.id.as_str())
        .collect();

    let mut waves: Vec<Vec<NodeId>> = Vec::new();
    let mut visited = 0;

    while !ready.is_empty() {
        let wave: Vec<NodeId> = ready.drain(..).map(|id| id.to_string()).collect();
        visited += wave.len();

        for node_id in &wave {
            for conn in definition.outgoing(node_id) {
                if let Some(deg) = in_degree.get_mut(conn.to_node.as_str()) {
                    *deg -= 1;
                    if *deg == 0 {
                        ready.push_back(conn.to_node.as_str());
                    }
                }
            }
        }
        waves.push(wave);
    }

    if visited < definition.nodes.len() {
        return Err(EngineError::definition("cycle detected in workflow graph"));
    }

    Ok(waves)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ExecutionContext;
    use crate::descriptor::{NodeCategory, NodeDescriptor};
    use crate::events::VecEventSink;
    use crate::io::DenyAllIo;
    use crate::processor::{NodeProcessor, StaticProcessorMap};
    use crate::types::Connection;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct PassthroughProcessor;

    #[async_trait]
    impl NodeProcessor for PassthroughProcessor {
        async fn execute(
            &self,
            config: &NodeConfig,
            context: &ExecutionContext,
        ) -> crate::error::Result<HashMap<String, serde_json::Value>> {
            Ok(context.inputs(&config.id).await)
        }
    }

    struct UppercaseProcessor;

    #[async_trait]
    impl NodeProcessor for UppercaseProcessor {
        async fn execute(
            &self,
            config: &NodeConfig,
            context: &ExecutionContext,
        ) -> crate::error::Result<HashMap<String, serde_json::Value>> {
            let text = context.require_input(&config.id, "text").await?;
            let text = text.as_str().unwrap_or_default().to_uppercase();
            let mut outputs = HashMap::new();
            outputs.insert("text".to_string(), serde_json::json!(text));
            Ok(outputs)
        }
    }

    struct SleepProcessor;

    #[async_trait]
    impl NodeProcessor for SleepProcessor {
        async fn execute(
            &self,
            _config: &NodeConfig,
            _context: &ExecutionContext,
        ) -> crate::error::Result<HashMap<String, serde_json::Value>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(HashMap::new())
        }
    }

    struct CountingFailProcessor {
        attempts: AtomicU32,
        succeed_on: u32,
    }

    #[async_trait]
    impl NodeProcessor for CountingFailProcessor {
        async fn execute(
            &self,
            _config: &NodeConfig,
            _context: &ExecutionContext,
        ) -> crate::error::Result<HashMap<String, serde_json::Value>> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt >= self.succeed_on {
                Ok(HashMap::new())
            } else {
                Err(EngineError::failed("transient"))
            }
        }
    }

    fn resolver() -> Arc<StaticProcessorMap> {
        Arc::new(
            StaticProcessorMap::new()
                .with(
                    NodeDescriptor::new("input", "Input", NodeCategory::Input),
                    Arc::new(PassthroughProcessor),
                )
                .with(
                    NodeDescriptor::new("uppercase", "Uppercase", NodeCategory::Processing),
                    Arc::new(UppercaseProcessor),
                ),
        )
    }

    fn two_node_workflow() -> WorkflowDefinition {
        WorkflowDefinition::new("wf-1", "Uppercase pipeline")
            .with_node(NodeConfig::new("input_node", "Input", "input"))
            .with_node(NodeConfig::new("uppercase_node", "Uppercase", "uppercase"))
            .with_connection(Connection::new("input_node", "text", "uppercase_node", "text"))
    }

    fn context() -> ExecutionContext {
        ExecutionContext::new("exec-1", "wf-1", Arc::new(DenyAllIo))
    }

    #[tokio::test]
    async fn test_end_to_end_uppercase() {
        let engine = WorkflowExecutionEngine::new(resolver());
        let ctx = context();
        ctx.set_input("input_node", "text", serde_json::json!("hello"))
            .await;

        let result = engine.execute(&two_node_workflow(), &ctx).await.unwrap();

        assert_eq!(result.status, ExecutionStatus::Completed);
        assert_eq!(
            result.outputs.get("uppercase_node.text"),
            Some(&serde_json::json!("HELLO"))
        );

        // One info log entry per executed node
        let infos = ctx
            .logs()
            .await
            .iter()
            .filter(|l| l.level == LogLevel::Info)
            .count();
        assert_eq!(infos, 2);
    }

    #[tokio::test]
    async fn test_cycle_fails_before_any_node_runs() {
        let engine = WorkflowExecutionEngine::new(resolver());
        let ctx = context();
        let wf = WorkflowDefinition::new("wf-cycle", "Cyclic")
            .with_node(NodeConfig::new("a", "A", "input"))
            .with_node(NodeConfig::new("b", "B", "input"))
            .with_connection(Connection::new("a", "out", "b", "in"))
            .with_connection(Connection::new("b", "out", "a", "in"));

        let err = engine.execute(&wf, &ctx).await.unwrap_err();
        assert!(matches!(err, EngineError::WorkflowDefinition(_)));
        // Zero side effects: nothing was logged, nothing was output
        assert!(ctx.logs().await.is_empty());
        assert!(ctx.node_outputs("a").await.is_empty());
    }

    #[tokio::test]
    async fn test_dangling_connection_rejected() {
        let engine = WorkflowExecutionEngine::new(resolver());
        let wf = WorkflowDefinition::new("wf", "Dangling")
            .with_node(NodeConfig::new("a", "A", "input"))
            .with_connection(Connection::new("a", "out", "ghost", "in"));

        let err = engine.execute(&wf, &context()).await.unwrap_err();
        assert!(matches!(err, EngineError::WorkflowDefinition(_)));
    }

    #[tokio::test]
    async fn test_unknown_node_type_rejected_eagerly() {
        let engine = WorkflowExecutionEngine::new(resolver());
        let wf = WorkflowDefinition::new("wf", "Unknown")
            .with_node(NodeConfig::new("a", "A", "no-such-type"));

        let err = engine.execute(&wf, &context()).await.unwrap_err();
        assert!(matches!(err, EngineError::MissingProcessor(_)));
    }

    #[tokio::test]
    async fn test_node_timeout_fails_workflow() {
        let map = StaticProcessorMap::new().with(
            NodeDescriptor::new("sleep", "Sleep", NodeCategory::Processing).with_timeout_secs(1),
            Arc::new(SleepProcessor),
        );
        let engine = WorkflowExecutionEngine::new(Arc::new(map));
        let wf = WorkflowDefinition::new("wf", "Slow")
            .with_node(NodeConfig::new("slow", "Slow", "sleep"));

        let start = Instant::now();
        let result = engine.execute(&wf, &context()).await.unwrap();
        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(result.status, ExecutionStatus::Failed);
        assert_eq!(
            result.node_outcomes.get("slow"),
            Some(&NodeOutcome::TimedOut)
        );
    }

    #[tokio::test]
    async fn test_optional_node_timeout_keeps_workflow_alive() {
        let map = StaticProcessorMap::new()
            .with(
                NodeDescriptor::new("sleep", "Sleep", NodeCategory::Processing)
                    .with_timeout_secs(1)
                    .optional(),
                Arc::new(SleepProcessor),
            )
            .with(
                NodeDescriptor::new("input", "Input", NodeCategory::Input),
                Arc::new(PassthroughProcessor),
            );
        let engine = WorkflowExecutionEngine::new(Arc::new(map));
        let wf = WorkflowDefinition::new("wf", "Slow branch")
            .with_node(NodeConfig::new("slow", "Slow", "sleep"))
            .with_node(NodeConfig::new("fast", "Fast", "input"));

        let result = engine.execute(&wf, &context()).await.unwrap();
        assert_eq!(result.status, ExecutionStatus::Completed);
        assert_eq!(
            result.node_outcomes.get("slow"),
            Some(&NodeOutcome::TimedOut)
        );
        assert_eq!(
            result.node_outcomes.get("fast"),
            Some(&NodeOutcome::Completed)
        );
    }

    #[tokio::test]
    async fn test_retry_count_honored() {
        let processor = Arc::new(CountingFailProcessor {
            attempts: AtomicU32::new(0),
            succeed_on: 3,
        });
        let map = StaticProcessorMap::new().with(
            NodeDescriptor::new("flaky", "Flaky", NodeCategory::Processing).with_retries(2),
            processor.clone(),
        );
        let engine = WorkflowExecutionEngine::new(Arc::new(map));
        let wf = WorkflowDefinition::new("wf", "Flaky")
            .with_node(NodeConfig::new("f", "Flaky", "flaky"));

        let result = engine.execute(&wf, &context()).await.unwrap();
        assert_eq!(result.status, ExecutionStatus::Completed);
        assert_eq!(processor.attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_downstream_of_failed_node_skipped() {
        let processor = Arc::new(CountingFailProcessor {
            attempts: AtomicU32::new(0),
            succeed_on: u32::MAX,
        });
        let map = StaticProcessorMap::new()
            .with(
                NodeDescriptor::new("fail", "Fail", NodeCategory::Processing).optional(),
                processor,
            )
            .with(
                NodeDescriptor::new("input", "Input", NodeCategory::Input),
                Arc::new(PassthroughProcessor),
            );
        let engine = WorkflowExecutionEngine::new(Arc::new(map));
        let wf = WorkflowDefinition::new("wf", "Failing upstream")
            .with_node(NodeConfig::new("bad", "Bad", "fail"))
            .with_node(NodeConfig::new("after", "After", "input"))
            .with_connection(Connection::new("bad", "out", "after", "in"));

        let result = engine.execute(&wf, &context()).await.unwrap();
        assert_eq!(result.status, ExecutionStatus::Completed);
        assert_eq!(result.node_outcomes.get("bad"), Some(&NodeOutcome::Failed));
        assert_eq!(
            result.node_outcomes.get("after"),
            Some(&NodeOutcome::Skipped)
        );
    }

    #[tokio::test]
    async fn test_disabled_node_skipped() {
        let engine = WorkflowExecutionEngine::new(resolver());
        let mut node = NodeConfig::new("a", "A", "input");
        node.enabled = false;
        let wf = WorkflowDefinition::new("wf", "Disabled").with_node(node);

        let result = engine.execute(&wf, &context()).await.unwrap();
        assert_eq!(result.node_outcomes.get("a"), Some(&NodeOutcome::Skipped));
    }

    #[tokio::test]
    async fn test_condition_key_gates_node() {
        let engine = WorkflowExecutionEngine::new(resolver());
        let ctx = context();
        ctx.set_state("take_branch", serde_json::json!(false)).await;

        let wf = WorkflowDefinition::new("wf", "Gated").with_node(
            NodeConfig::new("gated", "Gated", "input").with_condition_key("take_branch"),
        );

        let result = engine.execute(&wf, &ctx).await.unwrap();
        assert_eq!(
            result.node_outcomes.get("gated"),
            Some(&NodeOutcome::Skipped)
        );
    }

    #[tokio::test]
    async fn test_events_emitted_in_order() {
        let sink = Arc::new(VecEventSink::new());
        let engine = WorkflowExecutionEngine::new(resolver()).with_event_sink(sink.clone());
        let ctx = context();
        ctx.set_input("input_node", "text", serde_json::json!("hi"))
            .await;

        engine.execute(&two_node_workflow(), &ctx).await.unwrap();

        let events = sink.events();
        assert!(matches!(events.first(), Some(WorkflowEvent::WorkflowStarted { .. })));
        assert!(matches!(events.last(), Some(WorkflowEvent::WorkflowCompleted { .. })));
        let node_completions = events
            .iter()
            .filter(|e| matches!(e, WorkflowEvent::NodeCompleted { .. }))
            .count();
        assert_eq!(node_completions, 2);
    }

    #[test]
    fn test_waves_group_independent_nodes() {
        let wf = WorkflowDefinition::new("wf", "Diamond")
            .with_node(NodeConfig::new("a", "A", "input"))
            .with_node(NodeConfig::new("b", "B", "input"))
            .with_node(NodeConfig::new("c", "C", "input"))
            .with_node(NodeConfig::new("d", "D", "input"))
            .with_connection(Connection::new("a", "out", "b", "in"))
            .with_connection(Connection::new("a", "out", "c", "in"))
            .with_connection(Connection::new("b", "out", "d", "in"))
            .with_connection(Connection::new("c", "out", "d", "in"));

        let waves = topological_waves(&wf).unwrap();
        assert_eq!(waves.len(), 3);
        assert_eq!(waves[0], vec!["a"]);
        let mut middle = waves[1].clone();
        middle.sort();
        assert_eq!(middle, vec!["b", "c"]);
        assert_eq!(waves[2], vec!["d"]);
    }
}
