/// Quota-limited chat relay
///
/// Forwards user messages plus a bounded window of recent turns to an external webhook
/// and renders the replies into the chat log.
///
/// # Architecture
///
/// - `client` - Webhook request/response handling behind the `ChatBackend` trait
/// - `history` - The ten-turn conversation window
/// - `quota` - Per-day send counter kept in the key-value store
/// - `session` - The widget state machine tying the above together
///
/// # Usage
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use aichat::relay::{RelaySession, SystemClock, WebhookBackend};
/// use aichat::store::MemoryStore;
///
/// # async fn example() -> anyhow::Result<()> {
/// let backend = WebhookBackend::new("https://example.com/webhook/chat");
/// let mut session = RelaySession::new(Arc::new(MemoryStore::new()), Arc::new(SystemClock), 50);
/// session.begin_loading();
/// session.finish_loading()?;
/// let outcome = session.send(&backend, "Hello!").await?;
/// # Ok(())
/// # }
/// ```
mod client;
mod history;
mod quota;
mod session;

pub use client::{
    ChatBackend, RelayContext, RelayError, RelayResult, WebhookBackend, WebhookReply,
    WebhookRequest, extract_reply,
};
pub use history::{ConversationHistory, HISTORY_LIMIT};
pub use quota::{
    Clock, DailyQuota, LOW_QUOTA_THRESHOLD, ManualClock, QUOTA_KEY, QuotaTracker, SystemClock,
};
pub use session::{
    APOLOGY, PendingSend, QUICK_PROMPTS, RelaySession, STATUS_LOADING, STATUS_ONLINE,
    STATUS_UNAVAILABLE, SendOutcome, SendRejection, THINKING, WidgetState, limit_message,
    low_quota_message, welcome_message,
};
