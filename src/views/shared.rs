use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::store::KeyValueStore;

/// Shared by every view through the Dioxus context.
#[derive(Clone)]
pub struct AppContext {
    pub config: AppConfig,
    pub store: Arc<dyn KeyValueStore>,
}

pub async fn sleep(duration: Duration) {
    #[cfg(target_arch = "wasm32")]
    gloo_timers::future::sleep(duration).await;
    #[cfg(not(target_arch = "wasm32"))]
    tokio::time::sleep(duration).await;
}
