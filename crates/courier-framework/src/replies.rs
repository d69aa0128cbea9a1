//! Shorthand constructors for [`Reply`] values.
//!
//! ```rust,ignore
//! use courier_framework::replies;
//!
//! updates
//!     .matching(command("game"))
//!     .for_each(bot.reply(|_: &Update| replies::send_game("runner_4game")));
//! ```

use serde_json::Value;

use courier_core::Params;

use crate::reply::Reply;

/// Plain text message.
pub fn text(text: impl Into<String>) -> Reply {
    Reply::Text(text.into())
}

/// Markdown message.
pub fn markdown(text: impl Into<String>) -> Reply {
    Reply::Markdown(text.into())
}

/// HTML message.
pub fn html(text: impl Into<String>) -> Reply {
    Reply::Html(text.into())
}

/// Callback acknowledgement opening the game at `url`.
pub fn start_game(url: impl Into<String>) -> Reply {
    let mut params = Params::new();
    params.insert("url".into(), Value::String(url.into()));
    Reply::StartGame(params)
}

/// Sends the game `short_name` to the chat.
pub fn send_game(short_name: impl Into<String>) -> Reply {
    Reply::SendGame(short_name.into())
}

/// Inline query answer with `results`.
pub fn results(results: Vec<Value>) -> Reply {
    let mut params = Params::new();
    params.insert("results".into(), Value::Array(results));
    Reply::Inline(params)
}

/// Sets the score reported by a game-score notification.
pub fn send_score(params: Params) -> Reply {
    Reply::SendScore(params)
}

/// Callback acknowledgement with pass-through parameters.
pub fn callback(params: Params) -> Reply {
    Reply::Callback(params)
}
