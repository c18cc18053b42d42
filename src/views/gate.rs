use std::rc::Rc;

use dioxus::events::Key;
use dioxus::prelude::*;

use crate::access::{AccessGate, GateOutcome, HttpVerifier, code_entry};
use crate::views::shared::AppContext;

#[component]
pub fn GateView(on_verified: EventHandler<()>) -> Element {
    let ctx = use_context::<AppContext>();
    let gate = use_signal(|| {
        Rc::new(AccessGate::new(
            HttpVerifier::new(ctx.config.auth_url.clone()),
            ctx.store.clone(),
        ))
    });
    let mut code = use_signal(String::new);
    let mut loading = use_signal(|| false);
    let mut error = use_signal(|| Option::<&'static str>::None);

    let mut submit = move || {
        let candidate = code();
        if loading() || candidate.trim().is_empty() {
            return;
        }
        loading.set(true);
        error.set(None);

        let gate = gate();
        spawn(async move {
            let outcome = gate.submit(&candidate).await;
            loading.set(false);
            match outcome {
                GateOutcome::Verified => on_verified.call(()),
                GateOutcome::Invalid => {
                    error.set(outcome.message());
                    code.set(String::new());
                }
                GateOutcome::Failed => error.set(outcome.message()),
                GateOutcome::Ignored => {}
            }
        });
    };

    let busy = loading();
    let blocked = busy || code().is_empty();

    rsx! {
        div { class: "gate-screen",
            div { class: "gate-card",
                div { class: "gate-icon", "🤖" }
                h2 { class: "gate-title", "AI Chat Assistant" }
                p { class: "gate-subtitle", "Enter your access code to start chatting" }
                if let Some(message) = error() {
                    div { class: "gate-error", "{message}" }
                }
                input {
                    r#type: "text",
                    placeholder: "Access Code",
                    value: "{code}",
                    disabled: busy,
                    autofocus: true,
                    oninput: move |ev| code.set(code_entry(&ev.value())),
                    onkeydown: move |ev| {
                        if ev.key() == Key::Enter {
                            ev.prevent_default();
                            submit();
                        }
                    },
                }
                button {
                    class: "gate-button",
                    r#type: "button",
                    disabled: blocked,
                    onclick: move |_| submit(),
                    if busy { "Verifying..." } else { "Start Chatting" }
                }
                p { class: "gate-hint", "Don't have a code? Contact the administrator! 🤖" }
            }
        }
    }
}
