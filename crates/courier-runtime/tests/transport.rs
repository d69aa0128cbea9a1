//! End-to-end tests against a fake platform API.
//!
//! The fake API answers `GET /bot<token>/<method>` with the platform's JSON
//! envelope and records every call. `getUpdates` serves scripted batches,
//! then empty arrays.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::routing::get;
use futures::StreamExt;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use courier_core::{Notification, Params, SCORE_ID_PARAM, ScoreToken, Token, Update};
use courier_framework::{UpdateStreamExt, replies, text};
use courier_runtime::{Bot, CourierConfig, TransportMode, spawn_replies};

const TOKEN: &str = "123:TEST";

#[derive(Default)]
struct FakeApi {
    calls: Mutex<Vec<(String, HashMap<String, String>)>>,
    batches: Mutex<VecDeque<Value>>,
}

impl FakeApi {
    fn calls_to(&self, method: &str) -> Vec<HashMap<String, String>> {
        self.calls
            .lock()
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, params)| params.clone())
            .collect()
    }

    async fn wait_for(&self, method: &str, count: usize) -> Vec<HashMap<String, String>> {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let calls = self.calls_to(method);
                if calls.len() >= count {
                    return calls;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {count} {method} call(s)"))
    }
}

async fn api_handler(
    State(api): State<Arc<FakeApi>>,
    Path((bot_token, method)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    if bot_token != format!("bot{TOKEN}") {
        return Json(json!({"ok": false, "error_code": 401, "description": "Unauthorized"}));
    }

    api.calls.lock().push((method.clone(), params));

    let result = match method.as_str() {
        "getUpdates" => api.batches.lock().pop_front().unwrap_or_else(|| json!([])),
        _ => json!(true),
    };
    Json(json!({"ok": true, "result": result}))
}

async fn fake_api(batches: Vec<Value>) -> (Arc<FakeApi>, SocketAddr) {
    let api = Arc::new(FakeApi {
        batches: Mutex::new(batches.into()),
        ..FakeApi::default()
    });

    let router = Router::new()
        .route("/{bot_token}/{method}", get(api_handler))
        .with_state(api.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (api, addr)
}

fn config_for(addr: SocketAddr) -> CourierConfig {
    let mut config = CourierConfig::default();
    config.api.base_url = format!("http://{addr}/bot");
    config.polling.timeout_secs = 0;
    config.polling.interval_ms = 10;
    config.webhook.host = "127.0.0.1".into();
    config.webhook.port = 0;
    config.webhook.public_url = Some("https://bot.example.com".into());
    config
}

fn message(id: i64, text: &str) -> Value {
    json!({
        "update_id": id,
        "message": {
            "message_id": id,
            "chat": {"id": 77, "type": "private"},
            "from": {"id": 42, "first_name": "Ann"},
            "text": text
        }
    })
}

async fn take_ids(stream: futures::stream::BoxStream<'static, Update>, n: usize) -> Vec<i64> {
    tokio::time::timeout(
        Duration::from_secs(5),
        stream.take(n).map(|u| u.update_id).collect::<Vec<_>>(),
    )
    .await
    .expect("timed out waiting for updates")
}

#[tokio::test]
async fn test_polling_redelivery_is_deduplicated() {
    let (api, addr) = fake_api(vec![
        json!([message(1, "a"), message(2, "b")]),
        json!([message(2, "b"), message(3, "c")]),
    ])
    .await;

    let mut config = config_for(addr);
    config.transport = TransportMode::Polling;
    config.polling.track_offset = false;

    let bot = Bot::start(config, Token::new(TOKEN)).await.unwrap();

    assert_eq!(take_ids(bot.subscribe_history(), 3).await, vec![1, 2, 3]);
    api.wait_for("getUpdates", 3).await;
    assert_eq!(bot.history().len(), 3);

    let methods: Vec<String> = api.calls.lock().iter().map(|(m, _)| m.clone()).collect();
    assert_eq!(methods[0], "deleteWebhook");
    assert!(api.calls_to("getUpdates").iter().all(|p| !p.contains_key("offset")));
    assert!(api.calls_to("setWebhook").is_empty());

    bot.shutdown();
}

#[tokio::test]
async fn test_polling_tracks_offset() {
    let (api, addr) = fake_api(vec![json!([message(5, "a"), message(9, "b")])]).await;

    let mut config = config_for(addr);
    config.transport = TransportMode::Polling;

    let bot = Bot::start(config, Token::new(TOKEN)).await.unwrap();
    let polls = api.wait_for("getUpdates", 2).await;

    assert_eq!(polls[0].get("timeout").map(String::as_str), Some("0"));
    assert!(!polls[0].contains_key("offset"));
    assert_eq!(polls[1].get("offset").map(String::as_str), Some("10"));

    bot.shutdown();
}

#[tokio::test]
async fn test_polling_stops_after_shutdown() {
    let (api, addr) = fake_api(Vec::new()).await;

    let mut config = config_for(addr);
    config.transport = TransportMode::Polling;

    let bot = Bot::start(config, Token::new(TOKEN)).await.unwrap();
    api.wait_for("getUpdates", 1).await;
    bot.shutdown();

    // Let a round already in flight settle.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let settled = api.calls_to("getUpdates").len();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(api.calls_to("getUpdates").len(), settled);
}

#[tokio::test]
async fn test_webhook_round_trip() {
    let (api, addr) = fake_api(Vec::new()).await;
    let bot = Bot::start(config_for(addr), Token::new(TOKEN)).await.unwrap();

    let registered = api.wait_for("setWebhook", 1).await;
    assert_eq!(
        registered[0].get("url").map(String::as_str),
        Some("https://bot.example.com/webhook")
    );

    spawn_replies(
        bot.subscribe().matching(text("ping")),
        bot.reply(|_: &Update| "pong"),
    );
    spawn_replies(
        bot.subscribe_notifications(),
        bot.reply(|_: &Notification| {
            let mut params = Params::new();
            params.insert("edit_message".into(), Value::Bool(true));
            replies::send_score(params)
        }),
    );

    let local = bot.local_addr().unwrap();
    let client = reqwest::Client::new();

    let response = client
        .post(format!("http://{local}/webhook"))
        .json(&json!([message(1, "ping"), message(1, "ping")]))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert!(response.text().await.unwrap().is_empty());

    let sent = api.wait_for("sendMessage", 1).await;
    assert_eq!(sent[0].get("chat_id").map(String::as_str), Some("77"));
    assert_eq!(sent[0].get("text").map(String::as_str), Some("pong"));

    let token = ScoreToken::new(42, 7, -1001234567890i64);
    let response = client
        .get(format!(
            "http://{local}/?{SCORE_ID_PARAM}={}&score=50",
            token.encode()
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let scores = api.wait_for("setGameScore", 1).await;
    assert_eq!(scores[0].get("user_id").map(String::as_str), Some("42"));
    assert_eq!(scores[0].get("message_id").map(String::as_str), Some("7"));
    assert_eq!(scores[0].get("chat_id").map(String::as_str), Some("-1001234567890"));
    assert_eq!(scores[0].get("score").map(String::as_str), Some("50"));
    assert_eq!(scores[0].get("edit_message").map(String::as_str), Some("true"));

    assert_eq!(bot.history().len(), 1);
    assert_eq!(api.calls_to("sendMessage").len(), 1);

    bot.shutdown();
}

#[tokio::test]
async fn test_webhook_bind_conflict_is_fatal() {
    let (_api, addr) = fake_api(Vec::new()).await;
    let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();

    let mut config = config_for(addr);
    config.webhook.port = taken.local_addr().unwrap().port();

    let result = Bot::start(config, Token::new(TOKEN)).await;
    assert!(matches!(result, Err(courier_runtime::RuntimeError::Transport(_))));
}
