//! The orchestration loop: CONSULT → INVOKE → CONSULT … → DONE.
//!
//! The only branching rule is whether the turn the model just produced
//! requests a tool. Everything the loop knows lives in the [`Conversation`]
//! it threads through each step.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use async_stream::stream;
use chrono::Utc;
use futures::{Stream, StreamExt};
use llamantin_core::error::AgentError;
use llamantin_core::event::{DomainEvent, EventBus};
use llamantin_core::message::{Conversation, ConversationId, ToolCall, Turn};
use llamantin_core::provider::{Provider, ProviderRequest};
use llamantin_core::tool::ToolRegistry;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// States of the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Consult,
    Invoke,
    Done,
}

/// Snapshots of a run, one per model consultation.
pub type RunStream = Pin<Box<dyn Stream<Item = Result<Conversation, AgentError>> + Send>>;

/// The core agent loop that orchestrates LLM calls and tool execution.
///
/// Cheap to clone; every clone shares the same provider, tools and bus, so
/// concurrent runs can each hold their own copy.
#[derive(Clone)]
pub struct AgentLoop {
    /// The LLM provider to use
    provider: Arc<dyn Provider>,

    /// The model to use
    model: String,

    /// Temperature setting
    temperature: f32,

    /// Capabilities offered to the model
    tools: Arc<ToolRegistry>,

    /// Event bus for domain events
    event_bus: Arc<EventBus>,

    /// Maximum model consultations per run
    max_steps: Option<usize>,
}

impl AgentLoop {
    /// Create a new agent loop with no step limit.
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        temperature: f32,
        tools: Arc<ToolRegistry>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
            tools,
            event_bus,
            max_steps: None,
        }
    }

    /// Limit the number of model consultations per run.
    pub fn with_max_steps(mut self, max_steps: Option<usize>) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Decide what follows a freshly appended turn.
    pub fn route(turn: &Turn) -> Step {
        if turn.requests_tool() {
            Step::Invoke
        } else {
            Step::Done
        }
    }

    /// Ask the model for the next turn, given the whole conversation.
    pub async fn consult(&self, conversation: &Conversation) -> Result<Turn, AgentError> {
        let conversation_id = conversation.id.to_string();

        self.event_bus.publish(DomainEvent::ConsultStarted {
            conversation_id: conversation_id.clone(),
            turns: conversation.len(),
            timestamp: Utc::now(),
        });

        let request = ProviderRequest {
            model: self.model.clone(),
            turns: conversation.turns().to_vec(),
            temperature: self.temperature,
            tools: self.tools.definitions(),
        };

        let response = self.provider.complete(request).await.map_err(|e| {
            warn!(conversation_id = %conversation_id, provider = self.provider.name(), error = %e, "Model consultation failed");
            AgentError::from(e)
        })?;

        self.event_bus.publish(DomainEvent::ConsultFinished {
            conversation_id,
            model: response.model.clone(),
            requested_tool: response.reply.tool_call.as_ref().map(|c| c.name.clone()),
            tokens_used: response.usage.as_ref().map(|u| u.total_tokens),
            timestamp: Utc::now(),
        });

        response.reply.into_turn()
    }

    /// Run the requested tool and produce the `tool` turn for it.
    ///
    /// A failing tool is not fatal: its error text becomes the turn content so
    /// the model can react. Only an unregistered tool name aborts the run.
    pub async fn invoke(
        &self,
        conversation_id: &ConversationId,
        call: &ToolCall,
    ) -> Result<Turn, AgentError> {
        if self.tools.get(&call.name).is_none() {
            warn!(conversation_id = %conversation_id, tool = %call.name, "Model requested an unknown tool");
            return Err(AgentError::UnknownCapability(call.name.clone()));
        }

        debug!(conversation_id = %conversation_id, tool = %call.name, "Executing tool call");

        let start = Instant::now();
        let result = self.tools.invoke(call).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        // Every error from here on came from the tool itself
        let (content, success) = match result {
            Ok(output) => (output, true),
            Err(e) => {
                warn!(conversation_id = %conversation_id, tool = %call.name, error = %e, "Tool execution failed");
                (format!("Error: {e}"), false)
            }
        };

        self.event_bus.publish(DomainEvent::ToolExecuted {
            conversation_id: conversation_id.to_string(),
            tool_name: call.name.clone(),
            success,
            duration_ms,
            timestamp: Utc::now(),
        });

        Ok(Turn::tool_result(&call.name, content))
    }

    /// Drive the conversation to completion.
    ///
    /// Yields the full conversation after every model consultation, so a
    /// snapshot carries the reply plus any tool turn that fed it. The stream
    /// ends after the final answer or at the first fatal error.
    pub fn run(&self, conversation: Conversation) -> RunStream {
        self.drive(conversation, CancellationToken::new())
    }

    /// Like [`run`](Self::run), but stops as soon as `cancel` fires.
    ///
    /// A cancelled run just ends its stream; the last snapshot yielded is
    /// whatever state the conversation reached.
    pub fn run_until_cancelled(
        &self,
        conversation: Conversation,
        cancel: CancellationToken,
    ) -> RunStream {
        self.drive(conversation, cancel)
    }

    /// Run to completion and return the final answer.
    pub async fn process(&self, conversation: Conversation) -> Result<String, AgentError> {
        let mut runs = self.run(conversation);
        let mut last: Option<Conversation> = None;
        while let Some(snapshot) = runs.next().await {
            last = Some(snapshot?);
        }

        last.as_ref()
            .and_then(|c| c.final_answer())
            .map(str::to_string)
            .ok_or_else(|| AgentError::ProtocolViolation("run finished without a reply".into()))
    }

    /// Whether `steps` consultations use up the budget.
    fn budget_spent(&self, steps: usize) -> bool {
        self.max_steps.is_some_and(|max| steps >= max)
    }

    fn drive(&self, conversation: Conversation, cancel: CancellationToken) -> RunStream {
        let this = self.clone();

        Box::pin(stream! {
            let mut conversation = conversation;
            let mut step = Step::Consult;
            let mut steps = 0usize;

            info!(
                conversation_id = %conversation.id,
                turns = conversation.len(),
                tools = this.tools.len(),
                "Starting run"
            );

            loop {
                match step {
                    Step::Consult => {
                        if this.budget_spent(steps) {
                            warn!(conversation_id = %conversation.id, steps, "Step budget exhausted");
                            yield Err(AgentError::StepBudgetExceeded { steps });
                            return;
                        }
                        steps += 1;
                        debug!(conversation_id = %conversation.id, step = steps, "Consulting model");

                        let reply = tokio::select! {
                            biased;
                            _ = cancel.cancelled() => {
                                info!(conversation_id = %conversation.id, steps, "Run cancelled");
                                return;
                            }
                            reply = this.consult(&conversation) => reply,
                        };

                        let turn = match reply {
                            Ok(turn) => turn,
                            Err(e) => {
                                yield Err(e);
                                return;
                            }
                        };

                        step = AgentLoop::route(&turn);
                        if let Err(e) = conversation.push(turn) {
                            yield Err(e);
                            return;
                        }
                        yield Ok(conversation.clone());
                    }

                    Step::Invoke => {
                        // No consultation is left to read the result, so the tool must not run
                        if this.budget_spent(steps) {
                            warn!(conversation_id = %conversation.id, steps, "Step budget exhausted before tool call");
                            yield Err(AgentError::StepBudgetExceeded { steps });
                            return;
                        }

                        let Some(call) = conversation.last().and_then(|t| t.tool_call.clone()) else {
                            yield Err(AgentError::ProtocolViolation("no pending tool call to invoke".into()));
                            return;
                        };

                        let result = tokio::select! {
                            biased;
                            _ = cancel.cancelled() => {
                                info!(conversation_id = %conversation.id, steps, "Run cancelled");
                                return;
                            }
                            result = this.invoke(&conversation.id, &call) => result,
                        };

                        let pushed = result.and_then(|turn| conversation.push(turn));
                        if let Err(e) = pushed {
                            yield Err(e);
                            return;
                        }
                        step = Step::Consult;
                    }

                    Step::Done => {
                        info!(
                            conversation_id = %conversation.id,
                            turns = conversation.len(),
                            steps,
                            "Run finished"
                        );
                        this.event_bus.publish(DomainEvent::RunFinished {
                            conversation_id: conversation.id.to_string(),
                            turns: conversation.len(),
                            steps,
                            timestamp: Utc::now(),
                        });
                        return;
                    }
                }
            }
        })
    }
}
