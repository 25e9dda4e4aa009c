//! In-process stub servers standing in for the upstream APIs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;

use crate::config::Settings;
use crate::retry::RetrySettings;

/// Serve `router` on a random localhost port and return its base URL
pub(crate) async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    format!("http://{}", addr)
}

/// Settings with no backoff delay and short timeouts
pub(crate) fn fast_settings(max_attempts: u32) -> Settings {
    Settings {
        request_timeout_secs: 5,
        connect_timeout_secs: 5,
        retry: RetrySettings {
            max_attempts,
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
        },
        ..Settings::default()
    }
}

/// Request counter shared with a stub handler
#[derive(Clone, Default)]
pub(crate) struct Hits(Arc<AtomicUsize>);

impl Hits {
    pub fn record(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}
