//! Telegram adapter (teloxide).
//!
//! This crate implements the `reportbot-core` MessagingPort and NetworkConnector
//! over the Telegram Bot API.

use async_trait::async_trait;

use teloxide::{prelude::*, types::InputFile};

use tokio::time::sleep;

pub mod connector;
pub mod router;

use reportbot_core::{
    domain::SenderId,
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{MessagingCapabilities, OutboundMessage},
    },
    utils::truncate_chars,
    Result,
};

const MAX_MESSAGE_LEN: usize = 4096;
const MAX_CAPTION_LEN: usize = 1024;

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn tg_chat(sender: &SenderId) -> Result<teloxide::types::ChatId> {
        sender
            .0
            .parse::<i64>()
            .map(teloxide::types::ChatId)
            .map_err(|_| Error::External(format!("not a telegram chat id: {sender}")))
    }

    fn tg_url(url: &str) -> Result<reqwest::Url> {
        reqwest::Url::parse(url).map_err(|e| Error::External(format!("bad media url {url}: {e}")))
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::External(format!("telegram error: {e}"))
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(Self::map_err(other)),
                },
            }
        }
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            supports_images: true,
            supports_documents: true,
            max_message_len: MAX_MESSAGE_LEN,
        }
    }

    async fn send(&self, to: &SenderId, message: OutboundMessage) -> Result<()> {
        let chat = Self::tg_chat(to)?;
        match message {
            OutboundMessage::Text(text) => {
                self.with_retry(|| self.bot.send_message(chat, text.clone()))
                    .await?;
            }
            OutboundMessage::Image { url, caption } => {
                let photo = InputFile::url(Self::tg_url(&url)?);
                self.with_retry(|| {
                    let mut req = self.bot.send_photo(chat, photo.clone());
                    if let Some(c) = &caption {
                        req = req.caption(truncate_chars(c, MAX_CAPTION_LEN));
                    }
                    req
                })
                .await?;
            }
            // Telegram derives the content type from the file name; mime_type is not sent.
            OutboundMessage::Document {
                url,
                file_name,
                caption,
                ..
            } => {
                let document = InputFile::url(Self::tg_url(&url)?).file_name(file_name);
                self.with_retry(|| {
                    let mut req = self.bot.send_document(chat, document.clone());
                    if let Some(c) = &caption {
                        req = req.caption(truncate_chars(c, MAX_CAPTION_LEN));
                    }
                    req
                })
                .await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_ids_must_be_numeric() {
        assert_eq!(
            TelegramMessenger::tg_chat(&SenderId("-100123".to_string())).unwrap(),
            teloxide::types::ChatId(-100123)
        );
        assert!(TelegramMessenger::tg_chat(&SenderId("923001234567@s.whatsapp.net".to_string())).is_err());
    }

    #[test]
    fn capabilities_advertise_media_and_telegram_limit() {
        let m = TelegramMessenger::new(Bot::new("123:abc"));
        let caps = m.capabilities();
        assert!(caps.supports_images && caps.supports_documents);
        assert_eq!(caps.max_message_len, MAX_MESSAGE_LEN);
    }

    #[test]
    fn media_urls_are_validated() {
        assert!(TelegramMessenger::tg_url("https://drive.google.com/uc?export=download&id=1x").is_ok());
        assert!(TelegramMessenger::tg_url("not a url").is_err());
    }
}
