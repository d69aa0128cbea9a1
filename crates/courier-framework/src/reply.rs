//! Reply intents and their resolution into outbound calls.
//!
//! | Variant | Method | Needs |
//! |---------|--------|-------|
//! | `Text` / `Markdown` / `Html` | `sendMessage` | message |
//! | `Callback` | `answerCallbackQuery` | callback query |
//! | `StartGame` | `answerCallbackQuery` | callback query with message, public URL |
//! | `Inline` | `answerInlineQuery` | inline query |
//! | `SendGame` | `sendGame` | message |
//! | `SendScore` | `setGameScore` | game-score notification |

use serde_json::Value;
use tracing::debug;
use url::Url;

use courier_core::{Notification, OutboundCall, Params, SCORE_ID_PARAM, ScoreToken, Update};

use crate::error::{ResolveError, ResolveResult};

/// The value a reply is resolved against.
#[derive(Debug, Clone, Copy)]
pub enum Trigger<'a> {
    /// An update from the event stream.
    Update(&'a Update),
    /// A decoded side-channel notification.
    Notification(&'a Notification),
}

impl<'a> Trigger<'a> {
    fn update(self, reply: &'static str) -> ResolveResult<&'a Update> {
        match self {
            Self::Update(update) => Ok(update),
            Self::Notification(_) => Err(ResolveError::missing(reply, "an update")),
        }
    }

    /// Short description for log lines.
    pub fn describe(&self) -> String {
        match self {
            Self::Update(update) => format!("update_id = {}", update.update_id),
            Self::Notification(notification) => format!("{:?} notification", notification.kind()),
        }
    }
}

/// Anything a reply handler can be attached to.
pub trait AsTrigger {
    /// Borrows `self` as a [`Trigger`].
    fn as_trigger(&self) -> Trigger<'_>;
}

impl AsTrigger for Update {
    fn as_trigger(&self) -> Trigger<'_> {
        Trigger::Update(self)
    }
}

impl AsTrigger for Notification {
    fn as_trigger(&self) -> Trigger<'_> {
        Trigger::Notification(self)
    }
}

/// Runtime facts some replies depend on.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveContext<'a> {
    /// Externally reachable base URL of the bot, if known.
    pub public_url: Option<&'a str>,
}

/// A reply intent.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Plain text message.
    Text(String),
    /// Markdown message.
    Markdown(String),
    /// HTML message.
    Html(String),
    /// Callback query acknowledgement with pass-through parameters.
    Callback(Params),
    /// Callback acknowledgement that opens a game. `params` must hold `url`.
    StartGame(Params),
    /// Inline query answer. `results` is sent as a JSON string.
    Inline(Params),
    /// Sends the game with the given short name.
    SendGame(String),
    /// Sets a game score; parameters override the notification payload.
    SendScore(Params),
}

impl Reply {
    /// Variant name for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Markdown(_) => "markdown",
            Self::Html(_) => "html",
            Self::Callback(_) => "callback",
            Self::StartGame(_) => "start_game",
            Self::Inline(_) => "inline",
            Self::SendGame(_) => "send_game",
            Self::SendScore(_) => "send_score",
        }
    }

    /// Resolves the reply against `trigger` into a `(method, params)` call.
    ///
    /// # Errors
    /// Returns [`ResolveError`] when the trigger lacks what the variant needs.
    pub fn resolve(
        &self,
        trigger: Trigger<'_>,
        ctx: &ResolveContext<'_>,
    ) -> ResolveResult<OutboundCall> {
        let name = self.name();
        match self {
            Self::Text(text) => text_message(trigger.update(name)?, name, text, None),
            Self::Markdown(text) => {
                text_message(trigger.update(name)?, name, text, Some("Markdown"))
            }
            Self::Html(text) => text_message(trigger.update(name)?, name, text, Some("HTML")),
            Self::Callback(params) => {
                let params = callback_params(trigger.update(name)?, name, params)?;
                Ok(OutboundCall::new("answerCallbackQuery", params))
            }
            Self::StartGame(params) => start_game(trigger.update(name)?, params, ctx),
            Self::Inline(params) => {
                let query = trigger
                    .update(name)?
                    .inline_query()
                    .ok_or_else(|| ResolveError::missing(name, "inline_query"))?;

                let results = params
                    .get("results")
                    .cloned()
                    .unwrap_or_else(|| Value::Object(Params::new()));

                let mut out = Params::new();
                out.insert("inline_query_id".into(), Value::String(query.id.clone()));
                out.extend(params.clone());
                out.insert("results".into(), Value::String(results.to_string()));
                Ok(OutboundCall::new("answerInlineQuery", out))
            }
            Self::SendGame(short_name) => {
                let chat_id = chat_id(trigger.update(name)?, name)?;

                let mut out = Params::new();
                out.insert("chat_id".into(), Value::from(chat_id));
                out.insert("game_short_name".into(), Value::String(short_name.clone()));
                Ok(OutboundCall::new("sendGame", out))
            }
            Self::SendScore(params) => {
                let Trigger::Notification(notification) = trigger else {
                    return Err(ResolveError::missing(name, "a game-score notification"));
                };

                let mut out = notification.payload();
                out.extend(params.clone());
                Ok(OutboundCall::new("setGameScore", out))
            }
        }
    }
}

fn chat_id(update: &Update, reply: &'static str) -> ResolveResult<i64> {
    update
        .message()
        .map(|message| message.chat.id)
        .ok_or_else(|| ResolveError::missing(reply, "message.chat.id"))
}

fn text_message(
    update: &Update,
    reply: &'static str,
    text: &str,
    parse_mode: Option<&str>,
) -> ResolveResult<OutboundCall> {
    let mut params = Params::new();
    params.insert("chat_id".into(), Value::from(chat_id(update, reply)?));
    if let Some(mode) = parse_mode {
        params.insert("parse_mode".into(), Value::from(mode));
    }
    params.insert("text".into(), Value::from(text));
    Ok(OutboundCall::new("sendMessage", params))
}

fn callback_params(
    update: &Update,
    reply: &'static str,
    params: &Params,
) -> ResolveResult<Params> {
    let query = update
        .callback_query()
        .ok_or_else(|| ResolveError::missing(reply, "callback_query"))?;

    let mut out = Params::new();
    out.insert("callback_query_id".into(), Value::String(query.id.clone()));
    out.extend(params.clone());
    Ok(out)
}

/// Game URL query keys written by start-game.
const GAME_QUERY_KEYS: [&str; 3] = ["username", "user_id", "score_url"];

fn start_game(
    update: &Update,
    params: &Params,
    ctx: &ResolveContext<'_>,
) -> ResolveResult<OutboundCall> {
    const NAME: &str = "start_game";

    let mut out = callback_params(update, NAME, params)?;
    let query = update
        .callback_query()
        .ok_or_else(|| ResolveError::missing(NAME, "callback_query"))?;
    let message = query
        .message
        .as_ref()
        .ok_or_else(|| ResolveError::missing(NAME, "callback_query.message"))?;
    let public_url = ctx.public_url.ok_or(ResolveError::MissingPublicUrl)?;

    let token = ScoreToken::new(query.from.id, message.message_id, message.chat.id);
    let mut score_url = Url::parse(public_url)
        .map_err(|e| ResolveError::InvalidPublicUrl(format!("{public_url}: {e}")))?;
    score_url
        .query_pairs_mut()
        .append_pair(SCORE_ID_PARAM, &token.encode());
    let score_url = String::from(score_url);

    let raw = out
        .get("url")
        .and_then(Value::as_str)
        .ok_or_else(|| ResolveError::InvalidGameUrl("missing 'url' parameter".into()))?;
    let mut game_url =
        Url::parse(raw).map_err(|e| ResolveError::InvalidGameUrl(format!("{raw}: {e}")))?;

    let kept: Vec<(String, String)> = game_url
        .query_pairs()
        .filter(|(key, _)| !GAME_QUERY_KEYS.contains(&key.as_ref()))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    {
        let mut pairs = game_url.query_pairs_mut();
        pairs.clear();
        pairs.extend_pairs(&kept);
        pairs.append_pair("username", query.from.username.as_deref().unwrap_or_default());
        pairs.append_pair("user_id", &query.from.id.to_string());
        pairs.append_pair("score_url", &score_url);
    }

    debug!(score_url = %score_url, "Game score URL issued");

    out.insert("url".into(), Value::String(game_url.into()));
    Ok(OutboundCall::new("answerCallbackQuery", out))
}
