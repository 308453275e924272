//! Change notifier that emits a structured log line per mutation

use async_trait::async_trait;
use tracing::info;

use super::ChangeNotifier;

/// The default notifier: logs affected resource URIs at info level. A
/// real deployment's protocol layer would swap this for one that pushes
/// over a subscription channel; this crate has no such channel since the
/// wire protocol is out of scope here.
#[derive(Default)]
pub struct LoggingChangeNotifier;

#[async_trait]
impl ChangeNotifier for LoggingChangeNotifier {
    async fn notify(&self, resource_uris: &[String]) {
        info!(resources = ?resource_uris, "resources changed");
    }
}
