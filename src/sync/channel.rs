//! Push half of the sync protocol: a server-sent event subscription that feeds
//! backend file changes into a [`SyncAgent`].
//!
//! The channel exists only in development mode. Delivery is at-most-once and
//! there is no catch-up log, so after every reconnect the agent is
//! re-initialized to pick up whatever was missed.

use futures::StreamExt;
use reqwest::Client;
use reqwest_eventsource::{retry::Never, Error as EventSourceError, Event, EventSource};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::agent::SyncAgent;
use super::error::ChannelError;
use crate::config::{ReconnectPolicy, SyncConfig};

/// Connection state of one channel.
///
/// `Disconnected -> Connecting -> Subscribed -> Disconnected`; a reconnect
/// starts over at `Connecting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Subscribed,
}

#[derive(Debug, Clone)]
pub struct ChannelConfig {
    pub events_url: String,
    pub development_mode: bool,
    pub reconnect: ReconnectPolicy,
}

impl From<&SyncConfig> for ChannelConfig {
    fn from(config: &SyncConfig) -> Self {
        Self {
            events_url: config.events_url(),
            development_mode: config.development_mode,
            reconnect: config.reconnect.clone(),
        }
    }
}

pub struct UpdateChannel {
    config: ChannelConfig,
    client: Client,
}

impl UpdateChannel {
    pub fn new(config: ChannelConfig) -> Self {
        Self::with_client(config, Client::new())
    }

    pub fn with_client(config: ChannelConfig, client: Client) -> Self {
        Self { config, client }
    }

    pub fn is_available(&self) -> bool {
        self.config.development_mode
    }

    /// Start delivering push events to `agent`.
    ///
    /// Outside development mode there is no push channel: nothing is spawned
    /// and `None` is returned. The agent keeps working through its own
    /// `initialize()` and `submit_edit()` calls.
    pub fn spawn(&self, agent: Arc<SyncAgent>) -> Option<ChannelHandle> {
        if !self.config.development_mode {
            debug!("[channel] Development mode off, no push channel");
            return None;
        }

        let (state_tx, state_rx) = watch::channel(ChannelState::Disconnected);
        let state_tx = Arc::new(state_tx);
        let task = tokio::spawn(run(
            self.client.clone(),
            self.config.clone(),
            agent,
            state_tx.clone(),
        ));

        Some(ChannelHandle {
            state_tx,
            state_rx,
            task,
        })
    }
}

/// Handle to a running channel. Dropping it closes the channel.
pub struct ChannelHandle {
    state_tx: Arc<watch::Sender<ChannelState>>,
    state_rx: watch::Receiver<ChannelState>,
    task: JoinHandle<()>,
}

impl ChannelHandle {
    pub fn state(&self) -> ChannelState {
        *self.state_rx.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<ChannelState> {
        self.state_rx.clone()
    }

    /// Wait until the channel reaches `target`. Never returns if the task has
    /// already stopped in another state.
    pub async fn wait_for(&mut self, target: ChannelState) {
        // The handle owns a sender, so the channel cannot close under us.
        let _ = self.state_rx.wait_for(|state| *state == target).await;
    }

    /// Whether the background task has stopped.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn close(&self) {
        self.task.abort();
        self.state_tx.send_replace(ChannelState::Disconnected);
    }
}

impl Drop for ChannelHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(
    client: Client,
    config: ChannelConfig,
    agent: Arc<SyncAgent>,
    state: Arc<watch::Sender<ChannelState>>,
) {
    let mut attempt = 0u32;
    let mut was_subscribed = false;

    loop {
        state.send_replace(ChannelState::Connecting);
        info!("[channel] Connecting to {}", config.events_url);

        let mut subscribed = false;
        match subscribe(
            &client,
            &config.events_url,
            &agent,
            &state,
            was_subscribed,
            &mut subscribed,
        )
        .await
        {
            Ok(()) => info!("[channel] Event stream ended"),
            Err(e) => warn!("[channel] {}", e),
        }
        state.send_replace(ChannelState::Disconnected);

        if subscribed {
            was_subscribed = true;
            attempt = 0;
        }

        if !config.reconnect.enabled {
            break;
        }
        let delay = config.reconnect.delay(attempt);
        attempt = attempt.saturating_add(1);
        debug!("[channel] Reconnecting in {:?}", delay);
        tokio::time::sleep(delay).await;
    }
}

/// Run one connection until it ends. `subscribed` is set once the stream opens.
async fn subscribe(
    client: &Client,
    url: &str,
    agent: &SyncAgent,
    state: &watch::Sender<ChannelState>,
    resync: bool,
    subscribed: &mut bool,
) -> Result<(), ChannelError> {
    let mut source =
        EventSource::new(client.get(url)).map_err(|e| ChannelError::Open(e.to_string()))?;
    // Reconnection is ours to manage so the state machine stays accurate.
    source.set_retry_policy(Box::new(Never));

    while let Some(event) = source.next().await {
        match event {
            Ok(Event::Open) => {
                *subscribed = true;
                state.send_replace(ChannelState::Subscribed);
                info!("[channel] Subscribed");
                if resync {
                    // Failure is already reported through the agent's sink.
                    let _ = agent.initialize().await;
                }
            }
            Ok(Event::Message(message)) => {
                agent.handle_message(&message.event, &message.data);
            }
            Err(EventSourceError::StreamEnded) => {
                source.close();
                return Ok(());
            }
            Err(e) => {
                source.close();
                return Err(if *subscribed {
                    ChannelError::Stream(e.to_string())
                } else {
                    ChannelError::Open(e.to_string())
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::diagnostics::MemorySink;
    use crate::sync::guard::InputGuard;
    use crate::sync::transport::HttpTransport;

    fn config(development_mode: bool) -> ChannelConfig {
        ChannelConfig {
            // Nothing listens here; the tests below never need a live server.
            events_url: "http://127.0.0.1:9/__slidev/events".to_string(),
            development_mode,
            reconnect: ReconnectPolicy::disabled(),
        }
    }

    fn agent() -> Arc<SyncAgent> {
        Arc::new(SyncAgent::new(
            Arc::new(HttpTransport::new("http://127.0.0.1:9/__slidev/file.json")),
            InputGuard::new(),
            Arc::new(MemorySink::new()),
        ))
    }

    #[tokio::test]
    async fn test_spawn_is_noop_outside_development_mode() {
        let channel = UpdateChannel::new(config(false));
        assert!(!channel.is_available());
        assert!(channel.spawn(agent()).is_none());
    }

    #[tokio::test]
    async fn test_unreachable_server_ends_disconnected() {
        let channel = UpdateChannel::new(config(true));
        let handle = channel.spawn(agent()).unwrap();

        let _ = tokio::time::timeout(std::time::Duration::from_secs(5), async {
            while !handle.is_finished() {
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(handle.is_finished());
        assert_eq!(handle.state(), ChannelState::Disconnected);
    }

    #[test]
    fn test_config_from_sync_config() {
        let sync = SyncConfig {
            development_mode: false,
            ..SyncConfig::default()
        };
        let channel = ChannelConfig::from(&sync);
        assert_eq!(channel.events_url, "http://localhost:3030/__slidev/events");
        assert!(!channel.development_mode);
        assert!(channel.reconnect.enabled);
    }
}
