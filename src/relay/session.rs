use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::client::{ChatBackend, RelayContext, RelayResult, WebhookReply, WebhookRequest};
use super::history::ConversationHistory;
use super::quota::{Clock, LOW_QUOTA_THRESHOLD, QuotaTracker};
use crate::store::{KeyValueStore, StoreError};
use crate::types::{ChatMessage, LogEntry, Role};

pub const THINKING: &str = "🤔 Thinking...";
pub const APOLOGY: &str = "Oops! Something went wrong. Try again in a moment! 🔧";
pub const STATUS_ONLINE: &str = "AI Assistant Online";
pub const STATUS_LOADING: &str = "Loading AI Assistant...";
pub const STATUS_UNAVAILABLE: &str = "AI Assistant Unavailable";

pub const QUICK_PROMPTS: [(&str, &str); 4] = [
    ("🤖 Get Help", "What can you help me with?"),
    ("📚 Fun Fact", "Tell me a fun fact!"),
    ("😂 Tell Joke", "Tell me a joke!"),
    ("⚡ Motivate Me", "Give me motivation!"),
];

pub fn welcome_message(remaining: u32) -> String {
    format!(
        "Welcome! I'm here to help you with any questions. You have {remaining} messages available today! 🚀"
    )
}

pub fn limit_message(limit: u32) -> String {
    format!(
        "You've reached your daily message limit ({limit} messages). Your next consultation resets at midnight! 🌙✨"
    )
}

pub fn low_quota_message(remaining: u32) -> String {
    format!("🚨 Only {remaining} messages remaining today!")
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WidgetState {
    Uninitialized,
    Loading,
    Ready,
    Sending,
    Fallback,
}

#[derive(Debug, Error)]
pub enum SendRejection {
    #[error("empty message")]
    Empty,
    #[error("chat is not ready ({0:?})")]
    NotReady(WidgetState),
    #[error("a message is already on its way")]
    Busy,
    #[error("daily message limit reached")]
    QuotaExceeded,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendOutcome {
    Replied { remaining: u32 },
    /// The webhook answered with a non-2xx status.
    Rejected,
    Failed,
}

/// A send that passed the quota check and is waiting for the webhook.
#[derive(Debug)]
pub struct PendingSend {
    request: WebhookRequest,
}

impl PendingSend {
    pub fn request(&self) -> &WebhookRequest {
        &self.request
    }
}

/// State of one chat widget: lifecycle, log, history and quota.
///
/// A send is split into [`begin_send`](Self::begin_send) and
/// [`finish_send`](Self::finish_send) so callers never hold the session across the network call.
pub struct RelaySession {
    state: WidgetState,
    minimized: bool,
    history: ConversationHistory,
    log: Vec<LogEntry>,
    quota: QuotaTracker,
    clock: Arc<dyn Clock>,
}

impl RelaySession {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, daily_limit: u32) -> Self {
        Self {
            state: WidgetState::Uninitialized,
            minimized: false,
            history: ConversationHistory::new(),
            log: Vec::new(),
            quota: QuotaTracker::new(store, daily_limit),
            clock,
        }
    }

    pub fn state(&self) -> WidgetState {
        self.state
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    pub fn is_minimized(&self) -> bool {
        self.minimized
    }

    pub fn toggle_minimized(&mut self) -> bool {
        self.minimized = !self.minimized;
        self.minimized
    }

    pub fn status_line(&self) -> &'static str {
        match self.state {
            WidgetState::Uninitialized | WidgetState::Loading => STATUS_LOADING,
            WidgetState::Ready | WidgetState::Sending => STATUS_ONLINE,
            WidgetState::Fallback => STATUS_UNAVAILABLE,
        }
    }

    pub fn remaining(&self) -> Result<u32, StoreError> {
        self.quota.remaining(self.clock.today())
    }

    /// Uninitialized → Loading. Returns false if loading already started.
    pub fn begin_loading(&mut self) -> bool {
        if self.state != WidgetState::Uninitialized {
            return false;
        }
        self.state = WidgetState::Loading;
        true
    }

    /// Loading → Ready, greeting the user with today's allowance.
    ///
    /// A store that cannot be read is a fatal load error and leaves the widget in Fallback.
    pub fn finish_loading(&mut self) -> Result<(), StoreError> {
        if self.state != WidgetState::Loading {
            return Ok(());
        }
        match self.remaining() {
            Ok(remaining) => {
                self.state = WidgetState::Ready;
                self.log.push(LogEntry::assistant(welcome_message(remaining)));
                Ok(())
            }
            Err(err) => {
                warn!("chat failed to load: {err}");
                self.state = WidgetState::Fallback;
                Err(err)
            }
        }
    }

    /// Loading → Fallback when the load window elapses.
    pub fn load_timed_out(&mut self) {
        if self.state == WidgetState::Loading {
            warn!("chat did not become ready in time");
            self.state = WidgetState::Fallback;
        }
    }

    /// Retry from the fallback panel.
    pub fn reload(&mut self) -> Result<(), StoreError> {
        if self.state != WidgetState::Fallback {
            return Ok(());
        }
        self.state = WidgetState::Loading;
        self.finish_loading()
    }

    pub fn begin_send(&mut self, text: &str) -> Result<PendingSend, SendRejection> {
        let message = text.trim();
        if message.is_empty() {
            return Err(SendRejection::Empty);
        }
        match self.state {
            WidgetState::Ready => {}
            WidgetState::Sending => return Err(SendRejection::Busy),
            other => return Err(SendRejection::NotReady(other)),
        }

        let today = self.clock.today();
        let record = self.quota.today(today)?;
        if record.count >= self.quota.limit() {
            info!("daily limit of {} reached", self.quota.limit());
            self.log
                .push(LogEntry::assistant(limit_message(self.quota.limit())));
            return Err(SendRejection::QuotaExceeded);
        }

        self.log.push(LogEntry::user(message));
        self.history.push(ChatMessage::new(
            Role::User,
            message,
            self.clock.now_millis(),
        ));
        self.log.push(LogEntry {
            pending: true,
            ..LogEntry::assistant(THINKING)
        });
        self.state = WidgetState::Sending;

        Ok(PendingSend {
            request: WebhookRequest {
                message: message.to_string(),
                conversation_history: self.history.to_vec(),
                context: RelayContext {
                    messages_left: self.quota.limit() - record.count - 1,
                },
            },
        })
    }

    /// Settles the send started by [`begin_send`](Self::begin_send).
    ///
    /// `pending` is consumed so each accepted send is finished exactly once.
    pub fn finish_send(
        &mut self,
        pending: PendingSend,
        result: RelayResult<WebhookReply>,
    ) -> SendOutcome {
        self.log.retain(|entry| !entry.pending);
        self.state = WidgetState::Ready;
        debug!(
            "settling message of {} chars ({} left if answered)",
            pending.request.message.chars().count(),
            pending.request.context.messages_left
        );

        match result {
            Ok(WebhookReply::Answer(text)) => {
                self.log.push(LogEntry::assistant(text.clone()));
                self.history
                    .push(ChatMessage::new(Role::Assistant, text, self.clock.now_millis()));

                let today = self.clock.today();
                let remaining = match self.quota.increment(today) {
                    Ok(record) => self.quota.limit().saturating_sub(record.count),
                    Err(err) => {
                        error!("could not record sent message: {err}");
                        self.remaining().unwrap_or_default()
                    }
                };
                if remaining > 0 && remaining <= LOW_QUOTA_THRESHOLD {
                    self.log.push(LogEntry::assistant(low_quota_message(remaining)));
                }
                SendOutcome::Replied { remaining }
            }
            Ok(reply @ WebhookReply::HttpError { .. }) => {
                warn!("chat webhook rejected the message: {}", reply.display_text());
                self.log.push(LogEntry::assistant(reply.display_text()));
                SendOutcome::Rejected
            }
            Err(err) => {
                error!("chat relay failed: {err}");
                self.log.push(LogEntry::assistant(APOLOGY));
                SendOutcome::Failed
            }
        }
    }

    /// Convenience for callers that can hold the session across the call.
    pub async fn send<B>(&mut self, backend: &B, text: &str) -> Result<SendOutcome, SendRejection>
    where
        B: ChatBackend + ?Sized,
    {
        let pending = self.begin_send(text)?;
        let result = backend.relay(pending.request()).await;
        Ok(self.finish_send(pending, result))
    }
}
