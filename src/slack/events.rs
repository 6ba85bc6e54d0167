//! Socket Mode push listener for new messages in one channel.
//!
//! Runs inside the `listen` child process. Every plain message posted to
//! the watched channel is converted to a [`ChatMessage`] and handed to an
//! mpsc channel; the caller forwards that channel to stdout.

use std::sync::Arc;

use slack_morphism::prelude::{
    SlackApiTokenType, SlackClientEventsListenerEnvironment, SlackClientEventsUserState,
    SlackClientSocketModeConfig, SlackClientSocketModeListener, SlackEventCallbackBody,
    SlackMessageEvent, SlackPushEventCallback, SlackSocketModeListenerCallbacks,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::models::message::ChatMessage;
use crate::slack::client::{new_client, token, SlackHyperClient};
use crate::slack::ts::{ts_to_datetime, ts_to_message_id};
use crate::{config::SlackConfig, AppError, Result};

/// Listener state shared with the push callback.
#[derive(Clone)]
struct PushTarget {
    dialog_id: String,
    tx: mpsc::Sender<ChatMessage>,
}

/// Convert a message event into a [`ChatMessage`] if it belongs to
/// `dialog_id` and is a plain user post.
#[must_use]
pub fn event_to_message(event: &SlackMessageEvent, dialog_id: &str) -> Option<ChatMessage> {
    if event.subtype.is_some() {
        return None;
    }
    let channel = event.origin.channel.as_ref()?;
    if channel.0 != dialog_id {
        return None;
    }
    let ts = event.origin.ts.0.as_str();
    let id = ts_to_message_id(ts)?;
    let timestamp = ts_to_datetime(ts)?;
    let text = event.content.as_ref()?.text.clone()?;
    let mut message = ChatMessage::new(id, text, timestamp);
    message.author = event.sender.user.as_ref().map(|u| u.0.clone());
    Some(message)
}

async fn handle_push_event(
    event: SlackPushEventCallback,
    _client: Arc<SlackHyperClient>,
    state: SlackClientEventsUserState,
) -> slack_morphism::UserCallbackResult<()> {
    let SlackEventCallbackBody::Message(message_event) = event.event else {
        return Ok(());
    };

    let target: Option<PushTarget> = {
        let guard = state.read().await;
        guard.get_user_state::<PushTarget>().cloned()
    };
    let Some(target) = target else {
        warn!("push target not available; dropping event");
        return Ok(());
    };

    if let Some(message) = event_to_message(&message_event, &target.dialog_id) {
        debug!(id = message.id, "received pushed message");
        if target.tx.send(message).await.is_err() {
            warn!("record forwarder closed; dropping pushed message");
        }
    }
    Ok(())
}

/// Subscribe to message events for `dialog_id` and deliver them on `tx`.
///
/// Returns when the Socket Mode listener stops.
///
/// # Errors
///
/// Returns `AppError::Config` if the app token is missing, or
/// `AppError::Slack` if the connection cannot be established.
pub async fn run_push_listener(
    config: &SlackConfig,
    dialog_id: &str,
    tx: mpsc::Sender<ChatMessage>,
) -> Result<()> {
    if config.app_token.trim().is_empty() {
        return Err(AppError::Config(
            "slack app token is required for push mode".into(),
        ));
    }

    let client = new_client()?;
    let app_token = token(&config.app_token, SlackApiTokenType::App);

    let listener_env = Arc::new(
        SlackClientEventsListenerEnvironment::new(Arc::clone(&client))
            .with_error_handler(|err, _client, _state| {
                error!(?err, "socket mode error");
                axum::http::StatusCode::INTERNAL_SERVER_ERROR
            })
            .with_user_state(PushTarget {
                dialog_id: dialog_id.to_owned(),
                tx,
            }),
    );
    let callbacks = SlackSocketModeListenerCallbacks::new()
        .with_hello_events(|event, _client, _state| async move {
            info!(?event, "socket hello");
        })
        .with_push_events(handle_push_event);

    let socket_config = SlackClientSocketModeConfig {
        max_connections_count: SlackClientSocketModeConfig::DEFAULT_CONNECTIONS_COUNT,
        debug_connections: SlackClientSocketModeConfig::DEFAULT_DEBUG_CONNECTIONS,
        initial_backoff_in_seconds: SlackClientSocketModeConfig::DEFAULT_INITIAL_BACKOFF_IN_SECONDS,
        reconnect_timeout_in_seconds:
            SlackClientSocketModeConfig::DEFAULT_RECONNECT_TIMEOUT_IN_SECONDS,
        ping_interval_in_seconds: SlackClientSocketModeConfig::DEFAULT_PING_INTERVAL_IN_SECONDS,
        ping_failure_threshold_times:
            SlackClientSocketModeConfig::DEFAULT_PING_FAILURE_THRESHOLD_TIMES,
    };
    let listener = SlackClientSocketModeListener::new(&socket_config, listener_env, callbacks);
    listener
        .listen_for(&app_token)
        .await
        .map_err(|err| AppError::Slack(format!("socket mode listen failed: {err}")))?;

    info!(dialog_id, "socket mode listener subscribed");
    listener.serve().await;
    info!("socket mode listener exited");
    Ok(())
}
