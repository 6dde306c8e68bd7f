mod common;

use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

use parley_types::events::GatewayEvent;

use common::{PIXEL_PNG, TestApp};

#[tokio::test]
async fn chat_scenario_with_presence() {
    let app = TestApp::new();
    let (ann, _) = app.signup("Ann", "ann@x.com", "secret1").await;
    let (bob, bob_cookie) = app.signup("Bob", "bob@x.com", "secret2").await;

    let wrong = app
        .call("POST", "/auth/signin", Some(json!({ "email": "ann@x.com", "password": "wrong" })), None)
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);

    let signin = app
        .call("POST", "/auth/signin", Some(json!({ "email": "ann@x.com", "password": "secret1" })), None)
        .await;
    assert_eq!(signin.status, StatusCode::OK);
    let ann_cookie = signin.session_cookie();

    // Bob is offline: stored, nobody to push to
    let first = app
        .call("POST", &format!("/messages/send/{}", bob), Some(json!({ "text": "hi" })), Some(&ann_cookie))
        .await;
    assert_eq!(first.status, StatusCode::CREATED);
    assert_eq!(first.body["senderId"], ann.to_string());
    assert_eq!(first.body["receiverId"], bob.to_string());

    // Bob connects and sees himself online
    let mut bob_conn = app.state.dispatcher.connect(bob).await;
    assert_eq!(
        bob_conn.events.try_recv().unwrap(),
        GatewayEvent::GetOnlineUsers(vec![bob])
    );

    let second = app
        .call("POST", &format!("/messages/send/{}", bob), Some(json!({ "text": "hi2" })), Some(&ann_cookie))
        .await;
    assert_eq!(second.status, StatusCode::CREATED);

    match bob_conn.events.try_recv().unwrap() {
        GatewayEvent::NewMessage(msg) => {
            assert_eq!(msg.text.as_deref(), Some("hi2"));
            assert_eq!(msg.sender_id, ann);
            assert_eq!(msg.id.to_string(), second.body["_id"].as_str().unwrap());
        }
        other => panic!("expected newMessage, got {:?}", other),
    }
    assert!(bob_conn.events.try_recv().is_err(), "exactly one push expected");

    // Bob fetches the full conversation, including what arrived while offline
    let history = app
        .call("GET", &format!("/messages/{}", ann), None, Some(&bob_cookie))
        .await;
    assert_eq!(history.status, StatusCode::OK);
    let texts: Vec<&str> = history
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["text"].as_str().unwrap())
        .collect();
    assert_eq!(texts, vec!["hi", "hi2"]);

    assert!(app.state.dispatcher.disconnect(bob, bob_conn.conn_id).await);
    assert!(!app.state.dispatcher.is_online(bob).await);
}

#[tokio::test]
async fn conversation_is_the_same_from_both_sides() {
    let app = TestApp::new();
    let (ann, ann_cookie) = app.signup("Ann", "ann@x.com", "secret1").await;
    let (bob, bob_cookie) = app.signup("Bob", "bob@x.com", "secret2").await;
    let (cid, cid_cookie) = app.signup("Cid", "cid@x.com", "secret3").await;

    for (cookie, to, text) in [
        (&ann_cookie, bob, "a1"),
        (&bob_cookie, ann, "b1"),
        (&cid_cookie, ann, "c1"),
        (&ann_cookie, bob, "a2"),
    ] {
        let reply = app
            .call("POST", &format!("/messages/send/{}", to), Some(json!({ "text": text })), Some(cookie))
            .await;
        assert_eq!(reply.status, StatusCode::CREATED);
    }

    let from_ann = app.call("GET", &format!("/messages/{}", bob), None, Some(&ann_cookie)).await;
    let from_bob = app.call("GET", &format!("/messages/{}", ann), None, Some(&bob_cookie)).await;
    assert_eq!(from_ann.body, from_bob.body);
    assert_eq!(from_ann.body.as_array().unwrap().len(), 3);

    let with_cid = app.call("GET", &format!("/messages/{}", cid), None, Some(&ann_cookie)).await;
    assert_eq!(with_cid.body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn send_rejects_empty_and_unknown_receiver() {
    let app = TestApp::new();
    let (_, ann_cookie) = app.signup("Ann", "ann@x.com", "secret1").await;
    let (bob, _) = app.signup("Bob", "bob@x.com", "secret2").await;
    let uri = format!("/messages/send/{}", bob);

    let empty = app.call("POST", &uri, Some(json!({})), Some(&ann_cookie)).await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);
    assert_eq!(empty.message(), "Message must contain text or an image");

    let blank = app.call("POST", &uri, Some(json!({ "text": "   " })), Some(&ann_cookie)).await;
    assert_eq!(blank.status, StatusCode::BAD_REQUEST);

    let ghost = app
        .call(
            "POST",
            &format!("/messages/send/{}", Uuid::new_v4()),
            Some(json!({ "text": "hello?" })),
            Some(&ann_cookie),
        )
        .await;
    assert_eq!(ghost.status, StatusCode::NOT_FOUND);
    assert_eq!(ghost.message(), "Receiver not found");

    let bad_id = app
        .call("POST", "/messages/send/not-a-uuid", Some(json!({ "text": "hi" })), Some(&ann_cookie))
        .await;
    assert_eq!(bad_id.status, StatusCode::BAD_REQUEST);
    assert!(!bad_id.message().is_empty(), "body: {}", bad_id.body);

    let bad_conversation = app.call("GET", "/messages/not-a-uuid", None, Some(&ann_cookie)).await;
    assert_eq!(bad_conversation.status, StatusCode::BAD_REQUEST);
    assert!(!bad_conversation.message().is_empty(), "body: {}", bad_conversation.body);
}

#[tokio::test]
async fn image_to_unknown_receiver_leaves_no_file() {
    let app = TestApp::new();
    let (_, ann_cookie) = app.signup("Ann", "ann@x.com", "secret1").await;

    let reply = app
        .call(
            "POST",
            &format!("/messages/send/{}", Uuid::new_v4()),
            Some(json!({ "image": PIXEL_PNG })),
            Some(&ann_cookie),
        )
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(std::fs::read_dir(app.uploads.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn image_messages_are_stored_as_urls() {
    let app = TestApp::new();
    let (_, ann_cookie) = app.signup("Ann", "ann@x.com", "secret1").await;
    let (bob, _) = app.signup("Bob", "bob@x.com", "secret2").await;

    let reply = app
        .call(
            "POST",
            &format!("/messages/send/{}", bob),
            Some(json!({ "image": PIXEL_PNG })),
            Some(&ann_cookie),
        )
        .await;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert!(reply.body["text"].is_null());

    let url = reply.body["image"].as_str().unwrap();
    let file = url.strip_prefix("/uploads/").unwrap();
    assert!(app.uploads.path().join(file).exists());
}

#[tokio::test]
async fn sidebar_lists_other_users_without_secrets() {
    let app = TestApp::new();
    let (_, ann_cookie) = app.signup("Ann", "ann@x.com", "secret1").await;
    let (bob, _) = app.signup("Bob", "bob@x.com", "secret2").await;

    let reply = app.call("GET", "/messages/users", None, Some(&ann_cookie)).await;
    assert_eq!(reply.status, StatusCode::OK);

    let users = reply.body.as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["_id"], bob.to_string());
    assert!(users[0].get("password").is_none());
}
