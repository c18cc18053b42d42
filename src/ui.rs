use crate::access::is_verified;
use crate::config::AppConfig;
use crate::store::default_store;
use crate::views::shared::AppContext;
use crate::views::{ChatWidget, GateView};
use dioxus::prelude::*;

const AICHAT_CSS: Asset = asset!("/assets/aichat.css");

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum GateState {
    Checking,
    Locked,
    Unlocked,
}

#[component]
pub fn App() -> Element {
    let ctx = use_context_provider(|| AppContext {
        config: AppConfig::from_env(),
        store: default_store(),
    });
    let mut gate_state = use_signal(|| GateState::Checking);

    use_auth_check(ctx, gate_state);

    rsx! {
        document::Title { "AI Chat Assistant" }
        document::Link { rel: "stylesheet", href: AICHAT_CSS }
        {match gate_state() {
            GateState::Checking => rsx! {
                div { class: "gate-screen", "Loading..." }
            },
            GateState::Locked => rsx! {
                GateView { on_verified: move |_| gate_state.set(GateState::Unlocked) }
            },
            GateState::Unlocked => rsx! {
                MainPage {}
                ChatWidget {}
            },
        }}
    }
}

/// Resolves the checking screen from the persisted auth flag.
fn use_auth_check(ctx: AppContext, mut gate_state: Signal<GateState>) {
    use_effect(move || {
        let next = if is_verified(ctx.store.as_ref()) {
            GateState::Unlocked
        } else {
            GateState::Locked
        };
        gate_state.set(next);
    });
}

#[component]
fn MainPage() -> Element {
    rsx! {
        div { class: "container",
            h1 { id: "main-title", "🤖 AI Chat Assistant" }
            p { class: "tagline", "Your intelligent chat companion is ready to help!" }
        }
    }
}
