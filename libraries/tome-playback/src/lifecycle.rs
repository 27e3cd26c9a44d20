//! App lifecycle integration
//!
//! Hosts publish foreground/background transitions on a watch channel; the
//! watcher forwards each change to the controller so a seek never survives
//! the app being suspended.

use crate::{controller::SeekController, types::AppLifecycleState};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Forward lifecycle changes to `controller` until the sender is dropped
pub fn spawn_lifecycle_watcher(
    controller: SeekController,
    mut states: watch::Receiver<AppLifecycleState>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let state = *states.borrow_and_update();
            trace!(?state, "App lifecycle changed");
            controller.handle_app_state(state);
        }
        debug!("Lifecycle sender dropped, watcher exiting");
    })
}
