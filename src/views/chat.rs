use std::rc::Rc;

use dioxus::events::Key;
use dioxus::prelude::*;
use futures::future::{Either, select};
use tracing::{debug, warn};

use crate::markdown::reply_to_html;
use crate::relay::{
    ChatBackend, QUICK_PROMPTS, RelaySession, SystemClock, WebhookBackend, WidgetState,
};
use crate::types::{LogEntry, Sender};
use crate::views::shared::{AppContext, sleep};

#[component]
pub fn ChatWidget() -> Element {
    let ctx = use_context::<AppContext>();
    let relay = ctx.config.relay.clone();
    let mut session = use_signal(|| {
        RelaySession::new(
            ctx.store.clone(),
            std::sync::Arc::new(SystemClock),
            relay.daily_limit,
        )
    });
    let backend = use_signal(|| Rc::new(WebhookBackend::new(relay.webhook_url.clone())));
    let mut input = use_signal(String::new);
    let mut load_error = use_signal(|| false);

    use_widget_loading(session, relay.ready_delay, relay.load_timeout);

    let mut send_message = move |text: String| {
        let pending = match session.write().begin_send(&text) {
            Ok(pending) => pending,
            Err(reason) => {
                debug!("message not sent: {reason}");
                return;
            }
        };
        input.set(String::new());

        let backend = backend();
        spawn(async move {
            let result = backend.relay(pending.request()).await;
            session.write().finish_send(pending, result);
        });
    };

    let snapshot = session.read();
    let state = snapshot.state();
    let status = snapshot.status_line();
    let minimized = snapshot.is_minimized();
    let log: Vec<LogEntry> = snapshot.log().to_vec();
    drop(snapshot);
    let container_class = if minimized {
        "chatbot-container minimized"
    } else {
        "chatbot-container"
    };

    rsx! {
        div { class: container_class,
            div { class: "chatbot-header",
                onclick: move |_| {
                    session.write().toggle_minimized();
                },
                div {
                    div { class: "chatbot-title", "🤖 AI Assistant" }
                    div { class: "chatbot-status",
                        span { class: "status-indicator" }
                        span { "{status}" }
                    }
                }
                button { class: "minimize-btn", r#type: "button",
                    if minimized { "▲" } else { "▼" }
                }
            }
            div { class: "chat-body",
                {match state {
                    WidgetState::Uninitialized | WidgetState::Loading => rsx! {
                        div { class: "chat-loading",
                            div { class: "loading-spinner" }
                            div { "Loading AI Assistant..." }
                        }
                    },
                    WidgetState::Fallback => rsx! {
                        if load_error() {
                            div { class: "chat-error",
                                div { "❌ Connection Error" }
                                div { "Unable to load AI assistant" }
                            }
                        }
                        div { class: "chat-fallback",
                            div { "🤖 AI Assistant Unavailable" }
                            div { "Please check your connection" }
                            button {
                                class: "fallback-button",
                                r#type: "button",
                                onclick: move |_| {
                                    let failed = session.write().reload().is_err();
                                    load_error.set(failed);
                                },
                                "Retry"
                            }
                        }
                    },
                    WidgetState::Ready | WidgetState::Sending => rsx! {
                        div { class: "chat-interface",
                            div { class: "chat-messages",
                                for entry in log.iter() {
                                    ChatLine { entry: entry.clone() }
                                }
                            }
                            div { class: "chat-quick-tags",
                                for (label, prompt) in QUICK_PROMPTS {
                                    button {
                                        class: "quick-tag",
                                        r#type: "button",
                                        onclick: move |_| send_message(prompt.to_string()),
                                        "{label}"
                                    }
                                }
                            }
                            div { class: "chat-input-container",
                                input {
                                    r#type: "text",
                                    placeholder: "Ask me anything...",
                                    value: "{input}",
                                    oninput: move |ev| input.set(ev.value()),
                                    onkeydown: move |ev| {
                                        if ev.key() == Key::Enter {
                                            ev.prevent_default();
                                            send_message(input());
                                        }
                                    },
                                }
                                button {
                                    class: "chat-send-btn",
                                    r#type: "button",
                                    disabled: state == WidgetState::Sending,
                                    onclick: move |_| send_message(input()),
                                    "Send"
                                }
                            }
                        }
                    },
                }}
            }
        }
    }
}

/// Uninitialized → Loading on mount, then Ready after `ready_delay` unless `load_timeout` wins.
fn use_widget_loading(
    mut session: Signal<RelaySession>,
    ready_delay: std::time::Duration,
    load_timeout: std::time::Duration,
) {
    use_hook(move || {
        spawn(async move {
            if !session.write().begin_loading() {
                return;
            }
            let ready = Box::pin(sleep(ready_delay));
            let deadline = Box::pin(sleep(load_timeout));
            match select(ready, deadline).await {
                Either::Left(_) => {
                    if let Err(err) = session.write().finish_loading() {
                        warn!("chat widget failed to load: {err}");
                    }
                }
                Either::Right(_) => session.write().load_timed_out(),
            }
        });
    });
}

#[component]
fn ChatLine(entry: LogEntry) -> Element {
    let class = match (entry.sender, entry.pending) {
        (_, true) => "chat-message assistant pending",
        (Sender::Assistant, false) => "chat-message assistant",
        (Sender::User, false) => "chat-message user",
    };
    let label = entry.sender.label();

    rsx! {
        div { class: class,
            strong { "{label}: " }
            if entry.sender == Sender::Assistant && !entry.pending {
                span { class: "md", dangerous_inner_html: reply_to_html(&entry.text) }
            } else {
                span { "{entry.text}" }
            }
        }
    }
}
