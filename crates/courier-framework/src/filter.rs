//! Update filters.
//!
//! A [`Filter`] is a cheap-to-clone predicate over [`Update`]s. Filters
//! combine with [`and`](Filter::and), [`or`](Filter::or) and `!`, and plug
//! into update streams through [`UpdateStreamExt::matching`].
//!
//! # Example
//!
//! ```rust,ignore
//! use courier_framework::{command, text, UpdateStreamExt};
//!
//! let greetings = bot
//!     .subscribe()
//!     .matching(command("start").or(command("help")));
//! ```

use std::ops::Not;
use std::sync::Arc;

use futures::StreamExt;
use futures::future;
use futures::stream::{BoxStream, Stream};
use regex::Regex;

use courier_core::{Update, UpdateKind};

/// A type-erased predicate.
pub type PredicateFn = Arc<dyn Fn(&Update) -> bool + Send + Sync>;

/// A predicate over updates.
#[derive(Clone)]
pub struct Filter {
    predicate: PredicateFn,
}

impl Filter {
    /// Wraps a closure.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&Update) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
        }
    }

    /// A filter that accepts every update.
    pub fn any() -> Self {
        Self::new(|_| true)
    }

    /// Returns true if `update` passes.
    pub fn matches(&self, update: &Update) -> bool {
        (self.predicate)(update)
    }

    /// Passes when both filters pass.
    pub fn and(self, other: Filter) -> Self {
        Self::new(move |update| self.matches(update) && other.matches(update))
    }

    /// Passes when either filter passes.
    pub fn or(self, other: Filter) -> Self {
        Self::new(move |update| self.matches(update) || other.matches(update))
    }
}

impl Not for Filter {
    type Output = Filter;

    fn not(self) -> Self::Output {
        Filter::new(move |update| !self.matches(update))
    }
}

impl std::fmt::Debug for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Filter").finish_non_exhaustive()
    }
}

/// Message text contains `needle`. False when there is no message.
pub fn text(needle: impl Into<String>) -> Filter {
    let needle = needle.into();
    Filter::new(move |update| {
        update
            .message()
            .is_some_and(|message| message.text().contains(needle.as_str()))
    })
}

/// Message text matches `pattern`. False when there is no message.
pub fn text_regex(pattern: Regex) -> Filter {
    Filter::new(move |update| {
        update
            .message()
            .is_some_and(|message| pattern.is_match(message.text()))
    })
}

/// The message starts with the bot command `/<name>`.
///
/// Only the first `bot_command` entity at offset 0 is considered, and the
/// text it covers must be exactly `/<name>`.
pub fn command(name: impl AsRef<str>) -> Filter {
    let expected = format!("/{}", name.as_ref());
    Filter::new(move |update| {
        let Some(message) = update.message() else {
            return false;
        };
        message
            .entities
            .iter()
            .find(|entity| entity.is_bot_command() && entity.offset == 0)
            .and_then(|entity| message.entity_text(entity))
            .is_some_and(|command| command == expected)
    })
}

/// The update carries a callback query.
pub fn callbacks() -> Filter {
    Filter::new(|update| matches!(update.kind, UpdateKind::CallbackQuery(_)))
}

/// The update carries an inline query.
pub fn inline_queries() -> Filter {
    Filter::new(|update| matches!(update.kind, UpdateKind::InlineQuery(_)))
}

/// A callback query launching the game `short_name`.
pub fn game(short_name: impl Into<String>) -> Filter {
    let short_name = short_name.into();
    Filter::new(move |update| {
        update
            .callback_query()
            .and_then(|query| query.game_short_name.as_deref())
            .is_some_and(|name| name == short_name)
    })
}

/// Filtering adapter for update streams.
pub trait UpdateStreamExt: Stream<Item = Update> + Sized {
    /// Keeps only the updates `filter` accepts.
    fn matching(self, filter: Filter) -> BoxStream<'static, Update>
    where
        Self: Send + 'static,
    {
        self.filter(move |update| future::ready(filter.matches(update)))
            .boxed()
    }
}

impl<S> UpdateStreamExt for S where S: Stream<Item = Update> {}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use serde_json::json;

    fn message(text: &str, entities: serde_json::Value) -> Update {
        Update::from_value(json!({
            "update_id": 1,
            "message": {
                "message_id": 10,
                "chat": {"id": 5, "type": "private"},
                "text": text,
                "entities": entities
            }
        }))
        .unwrap()
    }

    fn callback(game: &str) -> Update {
        Update::from_value(json!({
            "update_id": 2,
            "callback_query": {
                "id": "cb1",
                "from": {"id": 7, "first_name": "Ann"},
                "game_short_name": game
            }
        }))
        .unwrap()
    }

    fn inline() -> Update {
        Update::from_value(json!({
            "update_id": 3,
            "inline_query": {"id": "iq1", "from": {"id": 7}, "query": "", "offset": ""}
        }))
        .unwrap()
    }

    #[test]
    fn test_text_filters() {
        let update = message("say PING now", json!([]));
        assert!(text("PING").matches(&update));
        assert!(!text("ping").matches(&update));
        assert!(text_regex(Regex::new("(?i)ping").unwrap()).matches(&update));
        assert!(!text("PING").matches(&callback("g")));
    }

    #[test]
    fn test_command_with_bot_suffix() {
        let update = message(
            "/start@botazavr extra",
            json!([{"type": "bot_command", "offset": 0, "length": 6}]),
        );
        assert!(command("start").matches(&update));
        assert!(!command("help").matches(&update));
    }

    #[test]
    fn test_command_entity_covering_suffix() {
        let update = message(
            "/start@botazavr",
            json!([{"type": "bot_command", "offset": 0, "length": 15}]),
        );
        assert!(!command("start").matches(&update));
        assert!(command("start@botazavr").matches(&update));
    }

    #[test]
    fn test_command_not_at_offset_zero() {
        let update = message(
            "hello /start",
            json!([{"type": "bot_command", "offset": 6, "length": 6}]),
        );
        assert!(!command("start").matches(&update));
    }

    #[test]
    fn test_command_without_entity() {
        assert!(!command("start").matches(&message("/start", json!([]))));
    }

    #[test]
    fn test_command_after_astral_text() {
        // "🎮" is two UTF-16 units; the entity offsets count those.
        let update = message(
            "/game 🎮",
            json!([{"type": "bot_command", "offset": 0, "length": 5}]),
        );
        assert!(command("game").matches(&update));
    }

    #[test]
    fn test_payload_presence_filters() {
        assert!(callbacks().matches(&callback("g")));
        assert!(!callbacks().matches(&inline()));
        assert!(inline_queries().matches(&inline()));
        assert!(!inline_queries().matches(&message("hi", json!([]))));
    }

    #[test]
    fn test_game_filter() {
        assert!(game("runner_4game").matches(&callback("runner_4game")));
        assert!(!game("runner_4game").matches(&callback("other")));
        assert!(!game("runner_4game").matches(&inline()));
    }

    #[test]
    fn test_combinators() {
        let start = message("/start", json!([{"type": "bot_command", "offset": 0, "length": 6}]));
        let either = command("start").or(command("help"));
        assert!(either.matches(&start));
        assert!(!(!either.clone()).matches(&start));
        assert!(!either.and(callbacks()).matches(&start));
        assert!(Filter::any().matches(&start));
    }

    #[tokio::test]
    async fn test_matching_stream() {
        let updates = vec![message("ping", json!([])), callback("g"), message("pong", json!([]))];
        let texts: Vec<String> = stream::iter(updates)
            .matching(text("p"))
            .map(|update| update.message().map(|m| m.text().to_string()).unwrap_or_default())
            .collect()
            .await;
        assert_eq!(texts, vec!["ping".to_string(), "pong".to_string()]);
    }
}
