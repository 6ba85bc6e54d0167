//! Slack Web API client implementing [`ChatConnection`].

use std::sync::Arc;
use std::time::Duration;

use slack_morphism::errors::SlackClientError;
use slack_morphism::prelude::{
    SlackApiChatPostMessageRequest, SlackApiConversationsCreateRequest,
    SlackApiConversationsHistoryRequest, SlackApiConversationsListRequest,
    SlackApiConversationsSetPurposeRequest, SlackApiToken, SlackApiTokenType, SlackApiTokenValue,
    SlackChannelId, SlackChannelInfo, SlackClient, SlackClientHyperHttpsConnector,
    SlackClientSession, SlackConversationType, SlackHistoryMessage, SlackMessageContent,
};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::connection::{ChatConnection, ConnFuture, SharedConnection};
use crate::models::message::{ChatMessage, DialogInfo};
use crate::slack::ts::{ts_to_datetime, ts_to_message_id};
use crate::util::slack_channel_name;
use crate::{config::SlackConfig, AppError, Result};

const INITIAL_RETRY_DELAY: Duration = Duration::from_secs(1);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);
const MAX_SEND_ATTEMPTS: u32 = 5;

/// Hyper-backed Slack client type used across the crate.
pub type SlackHyperClient = SlackClient<SlackClientHyperHttpsConnector>;

/// Build the shared Slack HTTP client.
///
/// # Errors
///
/// Returns `AppError::Slack` if the HTTPS connector cannot be created.
pub fn new_client() -> Result<Arc<SlackHyperClient>> {
    let connector = SlackClientHyperHttpsConnector::new()
        .map_err(|err| AppError::Slack(format!("failed to init slack connector: {err}")))?;
    Ok(Arc::new(SlackClient::new(connector)))
}

/// Build a typed token from a raw value.
#[must_use]
pub fn token(value: &str, token_type: SlackApiTokenType) -> SlackApiToken {
    SlackApiToken::new(SlackApiTokenValue(value.to_owned())).with_token_type(token_type)
}

/// Slack Web API session bound to the bot token.
pub struct SlackService {
    client: Arc<SlackHyperClient>,
    bot_token: SlackApiToken,
}

impl SlackService {
    /// Connect with the configured bot token and verify it with `auth.test`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` when no bot token is loaded, or
    /// `AppError::Slack` if the token is rejected.
    pub async fn connect(config: &SlackConfig) -> Result<Self> {
        if config.bot_token.trim().is_empty() {
            return Err(AppError::Config("slack bot token is not loaded".into()));
        }
        let service = Self {
            client: new_client()?,
            bot_token: token(&config.bot_token, SlackApiTokenType::Bot),
        };

        let auth = service
            .http_session()
            .auth_test()
            .await
            .map_err(|err| AppError::Slack(format!("auth.test failed: {err}")))?;
        info!(user_id = %auth.user_id, "slack bot authenticated");

        Ok(service)
    }

    /// Create an HTTP session for direct API calls using the bot token.
    #[must_use]
    pub fn http_session(&self) -> SlackClientSession<'_, SlackClientHyperHttpsConnector> {
        self.client.open_session(&self.bot_token)
    }

    /// Fetch recent channel history, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Slack` if the Slack API call fails.
    pub async fn fetch_recent_history(
        &self,
        channel: SlackChannelId,
        limit: u16,
    ) -> Result<Vec<SlackHistoryMessage>> {
        let request = SlackApiConversationsHistoryRequest::new()
            .with_channel(channel)
            .with_limit(limit);

        self.http_session()
            .conversations_history(&request)
            .await
            .map(|response| response.messages)
            .map_err(|err| AppError::Slack(format!("failed to read history: {err}")))
    }

    async fn post_with_retry(&self, request: &SlackApiChatPostMessageRequest) -> Result<()> {
        let session = self.http_session();
        let mut backoff = INITIAL_RETRY_DELAY;
        let mut attempt = 1;
        loop {
            match session.chat_post_message(request).await {
                Ok(_) => return Ok(()),
                Err(SlackClientError::RateLimitError(rate)) if attempt < MAX_SEND_ATTEMPTS => {
                    let delay = rate.retry_after.unwrap_or(backoff);
                    warn!(attempt, delay = ?delay, "slack post rate limited; retrying");
                    sleep(delay).await;
                    backoff = (backoff * 2).min(MAX_RETRY_DELAY);
                    attempt += 1;
                }
                Err(err) => {
                    return Err(AppError::Slack(format!("failed to post message: {err}")));
                }
            }
        }
    }
}

/// Convert a history entry into a [`ChatMessage`].
///
/// Entries with a subtype (joins, edits, topic changes) carry no
/// instruction and are skipped, as are entries with an unparseable `ts`.
#[must_use]
pub fn history_to_message(entry: &SlackHistoryMessage) -> Option<ChatMessage> {
    if entry.subtype.is_some() {
        return None;
    }
    let ts = entry.origin.ts.0.as_str();
    let id = ts_to_message_id(ts)?;
    let timestamp = ts_to_datetime(ts)?;
    let mut message = ChatMessage::new(id, entry.content.text.clone().unwrap_or_default(), timestamp);
    message.author = entry
        .sender
        .user
        .as_ref()
        .map(|u| u.0.clone())
        .or_else(|| entry.sender.bot_id.as_ref().map(|b| b.0.clone()));
    Some(message)
}

fn channel_to_dialog(channel: &SlackChannelInfo) -> DialogInfo {
    DialogInfo {
        id: channel.id.0.clone(),
        name: channel.name.clone().unwrap_or_else(|| channel.id.0.clone()),
        is_private: channel.flags.is_private.unwrap_or(false),
        is_member: channel.flags.is_member.unwrap_or(false),
    }
}

impl ChatConnection for SlackService {
    fn fetch_recent<'a>(&'a self, dialog_id: &'a str, limit: u16) -> ConnFuture<'a, Vec<ChatMessage>> {
        Box::pin(async move {
            let history = self
                .fetch_recent_history(SlackChannelId(dialog_id.to_owned()), limit)
                .await?;
            Ok(history.iter().filter_map(history_to_message).collect())
        })
    }

    fn send_message<'a>(&'a self, dialog_id: &'a str, text: &'a str) -> ConnFuture<'a, ()> {
        Box::pin(async move {
            let request = SlackApiChatPostMessageRequest::new(
                SlackChannelId(dialog_id.to_owned()),
                SlackMessageContent::new().with_text(text.to_owned()),
            );
            self.post_with_retry(&request).await?;
            info!(dialog_id, "sent slack message");
            Ok(())
        })
    }

    fn list_dialogs(&self, limit: u16) -> ConnFuture<'_, Vec<DialogInfo>> {
        Box::pin(async move {
            let request = SlackApiConversationsListRequest::new()
                .with_limit(limit)
                .with_exclude_archived(true)
                .with_types(vec![
                    SlackConversationType::Public,
                    SlackConversationType::Private,
                ]);
            let response = self
                .http_session()
                .conversations_list(&request)
                .await
                .map_err(|err| AppError::Slack(format!("failed to list conversations: {err}")))?;
            Ok(response.channels.iter().map(channel_to_dialog).collect())
        })
    }

    fn create_group<'a>(&'a self, title: &'a str, about: Option<&'a str>) -> ConnFuture<'a, DialogInfo> {
        Box::pin(async move {
            let name = slack_channel_name(title);
            if name.is_empty() {
                return Err(AppError::Slack(format!(
                    "title '{title}' has no characters usable in a channel name"
                )));
            }

            let session = self.http_session();
            let request = SlackApiConversationsCreateRequest::new(name).with_is_private(false);
            let response = session
                .conversations_create(&request)
                .await
                .map_err(|err| AppError::Slack(format!("failed to create channel: {err}")))?;
            let dialog = channel_to_dialog(&response.channel);

            if let Some(purpose) = about.map(str::trim).filter(|p| !p.is_empty()) {
                let purpose_request = SlackApiConversationsSetPurposeRequest::new(
                    response.channel.id.clone(),
                    purpose.to_owned(),
                );
                // The channel exists either way.
                if let Err(err) = session.conversations_set_purpose(&purpose_request).await {
                    warn!(%err, channel_id = %dialog.id, "failed to set channel purpose");
                }
            }

            info!(channel_id = %dialog.id, name = %dialog.name, "created slack channel");
            Ok(dialog)
        })
    }
}

/// Process-wide lazily connected Slack session.
#[must_use]
pub fn shared_connection(config: SlackConfig) -> SharedConnection {
    SharedConnection::new(move || {
        let config = config.clone();
        async move {
            let service = SlackService::connect(&config).await?;
            Ok(Arc::new(service) as Arc<dyn ChatConnection>)
        }
    })
}
