//! Game Bot Example
//!
//! A bot serving a browser game through the Courier framework:
//!
//! - `/start`, `/help`: welcome text
//! - any text containing "ping": `pong`
//! - `/game`: sends the game
//! - pressing the game's play button: opens the game with a score URL
//! - inline queries: offers the game
//! - score reports from the game: updates the high score table
//!
//! Updates at or below the cursor stored in the cache file are skipped, so a
//! restart does not answer old messages twice.
//!
//! # Usage
//!
//! ```bash
//! COURIER_TOKEN=123:abc cargo run --package game-bot -- --polling
//! ```

mod cache;

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use clap::Parser;
use courier::prelude::*;
use futures::stream::BoxStream;
use futures::{StreamExt, future};
use regex::Regex;
use serde_json::{Value, json};
use tracing::{error, info};

use crate::cache::CursorCache;

const BOT_NAME: &str = "botazavr";
const GAME: &str = "runner_4game";
const GAME_URL: &str = "https://a-ignatov-parc.github.io/igromir/game/";
const WELCOME: &str = "Welcome human! How are you doing?";

#[derive(Parser, Debug)]
#[command(name = "game-bot", about = "Courier example bot serving a browser game")]
struct Args {
    /// Configuration file. Defaults to the usual search path.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bot token.
    #[arg(long, env = "COURIER_TOKEN", hide_env_values = true)]
    token: String,

    /// Cursor cache file.
    #[arg(long, default_value = "./cache.json")]
    cache: PathBuf,

    /// Poll for updates instead of running a webhook.
    #[arg(long)]
    polling: bool,
}

/// Updates newer than the cursor at start-up, replayed from the beginning.
fn fresh_updates(bot: &Bot, resume_after: i64) -> BoxStream<'static, Update> {
    bot.subscribe_history()
        .filter(move |update| future::ready(update.update_id > resume_after))
        .boxed()
}

fn game_result() -> Value {
    let id = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    json!({"type": "game", "id": id.to_string(), "game_short_name": GAME})
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config_from_file(path)?,
        None => load_config()?,
    };
    if args.polling {
        config.transport = TransportMode::Polling;
    }
    logging::init_from_config(&config.logging);

    let cache = CursorCache::load(&args.cache);
    let resume_after = cache.last_update_id(BOT_NAME);
    info!(resume_after, "Loaded update cursor");

    let bot = Bot::start(config, Token::new(args.token)).await?;

    let saved = cache.clone();
    bot.on_shutdown("cursor cache", move || {
        if let Err(e) = saved.save() {
            error!(error = %e, "Failed to save cursor cache");
        }
    });

    let tracked = cache.clone();
    tokio::spawn(fresh_updates(&bot, resume_after).for_each(move |update| {
        tracked.advance(BOT_NAME, update.update_id);
        future::ready(())
    }));

    spawn_replies(
        fresh_updates(&bot, resume_after).matching(command("start").or(command("help"))),
        bot.reply(|_: &Update| replies::text(WELCOME)),
    );

    spawn_replies(
        fresh_updates(&bot, resume_after).matching(text_regex(Regex::new("(?i)ping")?)),
        bot.reply(|_: &Update| replies::text("pong")),
    );

    spawn_replies(
        fresh_updates(&bot, resume_after).matching(command("game")),
        bot.reply(|_: &Update| replies::send_game(GAME)),
    );

    spawn_replies(
        fresh_updates(&bot, resume_after).matching(game(GAME)),
        bot.reply(|_: &Update| replies::start_game(GAME_URL)),
    );

    spawn_replies(
        fresh_updates(&bot, resume_after).matching(inline_queries()),
        bot.reply(|_: &Update| replies::results(vec![game_result()])),
    );

    spawn_replies(
        bot.subscribe_notifications(),
        bot.reply(|_: &Notification| {
            let mut params = Params::new();
            params.insert("edit_message".into(), Value::Bool(true));
            replies::send_score(params)
        }),
    );

    bot.run_until_signal().await;
    Ok(())
}
