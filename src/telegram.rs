//! Companion bot: answers `/start` with one welcome message and a button
//! that opens the web app.

use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, WebAppInfo};
use teloxide::RequestError;
use tracing::{error, info};

use crate::error::{AppError, Result};

pub const WELCOME_TEXT: &str = "Bem-vindo ao Pocket Broker AI Signal Bot! 🚀\n\n\
Clique no botão abaixo para abrir o WebApp e começar a receber sinais.";

pub const OPEN_WEBAPP_TEXT: &str = "Abrir WebApp";

pub fn welcome_keyboard(webapp_url: &str) -> Result<InlineKeyboardMarkup> {
    let url = webapp_url
        .parse()
        .map_err(|e| AppError::Config(format!("invalid web app URL {webapp_url:?}: {e}")))?;
    Ok(InlineKeyboardMarkup::new([[InlineKeyboardButton::web_app(
        OPEN_WEBAPP_TEXT,
        WebAppInfo { url },
    )]]))
}

/// `/start`, optionally addressed as `/start@SomeBot`, with or without a payload.
pub fn is_start_command(text: Option<&str>) -> bool {
    let Some(first) = text.and_then(|t| t.split_whitespace().next()) else {
        return false;
    };
    first == "/start" || first.starts_with("/start@")
}

/// Message handler tree: `/start` gets the welcome message, anything else
/// is ignored. The keyboard is injected as a dependency.
pub fn schema() -> UpdateHandler<RequestError> {
    Update::filter_message().endpoint(handle_message)
}

async fn handle_message(
    bot: Bot,
    msg: Message,
    keyboard: InlineKeyboardMarkup,
) -> ResponseResult<()> {
    if is_start_command(msg.text()) {
        if let Err(e) = bot
            .send_message(msg.chat.id, WELCOME_TEXT)
            .reply_markup(keyboard)
            .await
        {
            error!("Failed to send welcome message to chat {}: {e}", msg.chat.id.0);
        }
    }
    Ok(())
}

/// Long-poll until the process exits. Send failures are logged per message.
/// No Ctrl-C handler is installed here; SIGINT belongs to the HTTP server.
pub async fn run_bot(token: String, webapp_url: String) {
    let keyboard = match welcome_keyboard(&webapp_url) {
        Ok(k) => k,
        Err(e) => {
            error!("Telegram bot disabled: {e}");
            return;
        }
    };

    let bot = Bot::new(token);
    info!("Telegram bot is running (web app: {webapp_url})");

    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![keyboard])
        .build()
        .dispatch()
        .await;
}
