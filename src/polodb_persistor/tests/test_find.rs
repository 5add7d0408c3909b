// Copyright 2024 Vincent Chan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//	http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

mod common;

use std::time::Duration;
use serde_json::{json, Value};
use polodb_persistor::PersistorConfig;
use common::{fake_config, start_persistor, start_with_config, TestPersistor};

fn tim() -> Value {
    json!({
        "name": "tim",
        "age": 40,
        "pi": 3.14159,
        "male": true,
        "cheeses": ["brie", "stilton"],
    })
}

async fn save_numbered(p: &TestPersistor, num: i64) {
    for i in 0..num {
        p.save("testcoll", json!({ "name": "tim", "age": i })).await;
    }
}

#[tokio::test]
async fn test_find() {
    let p = start_persistor("test-find");
    p.save("testcoll", tim()).await;

    let reply = p.send_ok(json!({
        "action": "find",
        "collection": "testcoll",
        "matcher": { "name": "tim" },
    })).await;
    assert_eq!(reply["number"], 1);
    let res = &reply["results"][0];
    assert_eq!(res["name"], "tim");
    assert_eq!(res["age"], 40);
    assert_eq!(res["pi"], 3.14159);
    assert_eq!(res["male"], true);
    assert_eq!(res["cheeses"], json!(["brie", "stilton"]));
    assert!(res["_id"].is_string());
    assert!(reply.get("cursor").is_none());
}

#[tokio::test]
async fn test_find_one() {
    let p = start_persistor("test-find-one");
    p.save("testcoll", tim()).await;

    let reply = p.send_ok(json!({
        "action": "findone",
        "collection": "testcoll",
        "matcher": { "name": "tim" },
    })).await;
    assert_eq!(reply["result"]["name"], "tim");
    assert_eq!(reply["result"]["cheeses"][1], "stilton");

    let reply = p.send_ok(json!({
        "action": "findone",
        "collection": "testcoll",
        "matcher": { "name": "bob" },
    })).await;
    assert!(reply.get("result").is_none());
}

#[tokio::test]
async fn test_find_with_limit() {
    let p = start_persistor("test-find-with-limit");
    save_numbered(&p, 20).await;

    let reply = p.send_ok(json!({
        "action": "find",
        "collection": "testcoll",
        "matcher": {},
        "limit": 12,
    })).await;
    assert_eq!(reply["results"].as_array().unwrap().len(), 12);
}

#[tokio::test]
async fn test_find_with_skip_and_limit() {
    let p = start_persistor("test-find-with-skip-and-limit");
    save_numbered(&p, 20).await;

    let reply = p.send_ok(json!({
        "action": "find",
        "collection": "testcoll",
        "matcher": {},
        "skip": 10,
        "limit": 12,
    })).await;
    assert_eq!(reply["results"].as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn test_find_with_sort() {
    let p = start_persistor("test-find-with-sort");
    for age in [7, 3, 9, 0, 5, 5, 10, 1, 8, 2] {
        p.save("testcoll", json!({ "name": "tim", "age": age })).await;
    }

    let reply = p.send_ok(json!({
        "action": "find",
        "collection": "testcoll",
        "matcher": {},
        "sort": { "age": 1 },
    })).await;
    let ages: Vec<i64> = reply["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|doc| doc["age"].as_i64().unwrap())
        .collect();
    assert_eq!(ages, vec![0, 1, 2, 3, 5, 5, 7, 8, 9, 10]);

    let reply = p.send_ok(json!({
        "action": "findone",
        "collection": "testcoll",
        "sort": { "age": -1 },
    })).await;
    assert_eq!(reply["result"]["age"], 10);
}

#[tokio::test]
async fn test_find_with_keys() {
    let p = start_persistor("test-find-with-keys");
    p.save("testcoll", json!({ "name": "tim", "age": 4 })).await;

    let reply = p.send_ok(json!({
        "action": "findone",
        "collection": "testcoll",
        "keys": { "name": 1 },
        "sort": { "age": 1 },
    })).await;
    assert_eq!(reply["result"]["name"], "tim");
    assert!(reply["result"].get("age").is_none());
    assert!(reply["result"].get("_id").is_some());

    let reply = p.send_ok(json!({
        "action": "find",
        "collection": "testcoll",
        "matcher": { "name": "tim" },
        "keys": { "name": 1, "_id": 0 },
    })).await;
    assert_eq!(reply["results"][0], json!({ "name": "tim" }));
}

#[tokio::test]
async fn test_find_batched() {
    let p = start_persistor("test-find-batched");
    save_numbered(&p, 103).await;

    let mut reply = p.send(json!({
        "action": "find",
        "collection": "testcoll",
        "matcher": {},
        "batch_size": 10,
    })).await;

    let mut received = 0;
    let mut replies = 0;
    let mut ages = vec![];
    loop {
        replies += 1;
        let results = reply["results"].as_array().unwrap();
        received += results.len();
        ages.extend(results.iter().map(|doc| doc["age"].as_i64().unwrap()));

        if received < 103 {
            assert_eq!(results.len(), 10);
            assert_eq!(reply["status"], "more-exist");
            let cursor = reply["cursor"].as_i64().unwrap();
            reply = p.send(json!({ "action": "continue", "cursor": cursor })).await;
        } else {
            assert_eq!(results.len(), 3);
            assert_eq!(reply["status"], "ok");
            assert!(reply.get("cursor").is_none());
            break;
        }
    }

    assert_eq!(replies, 11);
    ages.sort();
    ages.dedup();
    assert_eq!(ages.len(), 103);
    assert_eq!(p.persistor.open_cursors(), 0);
}

#[tokio::test]
async fn test_find_batched_exact_multiple() {
    let p = start_persistor("test-find-batched-exact");
    save_numbered(&p, 30).await;

    let mut reply = p.send(json!({
        "action": "find",
        "collection": "testcoll",
        "matcher": {},
        "batch_size": 10,
    })).await;

    let mut statuses = vec![];
    loop {
        assert_eq!(reply["number"], 10);
        statuses.push(reply["status"].as_str().unwrap().to_string());
        match reply["cursor"].as_i64() {
            Some(cursor) => {
                reply = p.send(json!({ "action": "continue", "cursor": cursor })).await;
            },
            None => break,
        }
    }
    assert_eq!(statuses, vec!["more-exist", "more-exist", "ok"]);
}

#[tokio::test]
async fn test_default_batch_size() {
    let config = PersistorConfig {
        default_batch_size: Some(4),
        ..fake_config("test-default-batch-size")
    };
    let p = start_with_config(config);
    save_numbered(&p, 6).await;

    let reply = p.send(json!({
        "action": "find",
        "collection": "testcoll",
        "matcher": {},
    })).await;
    assert_eq!(reply["status"], "more-exist");
    assert_eq!(reply["number"], 4);

    let reply = p.send(json!({ "action": "continue", "cursor": reply["cursor"].clone() })).await;
    assert_eq!(reply["status"], "ok");
    assert_eq!(reply["number"], 2);
}

#[tokio::test]
async fn test_continue_after_done() {
    let p = start_persistor("test-continue-after-done");
    save_numbered(&p, 15).await;

    let reply = p.send(json!({
        "action": "find",
        "collection": "testcoll",
        "matcher": {},
        "batch_size": 10,
    })).await;
    let cursor = reply["cursor"].as_i64().unwrap();

    let reply = p.send(json!({ "action": "continue", "cursor": cursor })).await;
    assert_eq!(reply["status"], "ok");

    let reply = p.send(json!({ "action": "continue", "cursor": cursor })).await;
    assert_eq!(reply["status"], "error");
    assert_eq!(reply["message"], format!("cursor not found: {}", cursor));
}

#[tokio::test]
async fn test_close_cursor() {
    let p = start_persistor("test-close-cursor");
    save_numbered(&p, 15).await;

    let reply = p.send(json!({
        "action": "find",
        "collection": "testcoll",
        "matcher": {},
        "batch_size": 5,
    })).await;
    let cursor = reply["cursor"].as_i64().unwrap();
    assert_eq!(p.persistor.open_cursors(), 1);

    p.send_ok(json!({ "action": "close", "cursor": cursor })).await;
    assert_eq!(p.persistor.open_cursors(), 0);

    let reply = p.send(json!({ "action": "continue", "cursor": cursor })).await;
    assert_eq!(reply["status"], "error");

    let reply = p.send(json!({ "action": "close", "cursor": cursor })).await;
    assert_eq!(reply["status"], "error");
}

#[tokio::test]
async fn test_idle_cursor_reaped() {
    let config = PersistorConfig {
        cursor_timeout_ms: 50,
        cursor_reap_interval_ms: 60_000,
        ..fake_config("test-idle-cursor-reaped")
    };
    let p = start_with_config(config);
    save_numbered(&p, 15).await;

    let reply = p.send(json!({
        "action": "find",
        "collection": "testcoll",
        "matcher": {},
        "batch_size": 5,
    })).await;
    let cursor = reply["cursor"].as_i64().unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(p.persistor.reap_expired_cursors(), 1);

    let reply = p.send(json!({ "action": "continue", "cursor": cursor })).await;
    assert_eq!(reply["status"], "error");
    assert_eq!(reply["message"], format!("cursor not found: {}", cursor));
}

#[tokio::test]
async fn test_request_timeout_overrides_default() {
    let config = PersistorConfig {
        cursor_reap_interval_ms: 60_000,
        ..fake_config("test-request-timeout")
    };
    let p = start_with_config(config);
    save_numbered(&p, 15).await;

    let short = p.send(json!({
        "action": "find",
        "collection": "testcoll",
        "matcher": {},
        "batch_size": 5,
        "timeout": 20,
    })).await;
    let long = p.send(json!({
        "action": "find",
        "collection": "testcoll",
        "matcher": {},
        "batch_size": 5,
    })).await;
    assert_eq!(p.persistor.open_cursors(), 2);

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(p.persistor.reap_expired_cursors(), 1);

    let reply = p.send(json!({ "action": "continue", "cursor": short["cursor"].clone() })).await;
    assert_eq!(reply["status"], "error");
    let reply = p.send(json!({ "action": "continue", "cursor": long["cursor"].clone() })).await;
    assert_eq!(reply["status"], "more-exist");
}

#[tokio::test]
async fn test_find_missing_collection_field() {
    let p = start_persistor("test-find-missing-collection");

    let reply = p.send(json!({ "action": "find", "matcher": {} })).await;
    assert_eq!(reply, json!({ "status": "error", "message": "collection must be specified" }));
}
