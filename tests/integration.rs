//! Integration tests against `interactive-test-utils`' mock service,
//! covering the scenarios from the testable-properties section.

use std::sync::Arc;
use std::time::Duration;

use interactive_client::{ClientConfig, Event, InteractiveClient, InteractiveError};
use interactive_protocol::Packet;
use interactive_test_utils::MockInteractiveServer;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// A throwaway raw-HTTP responder standing in for the discovery endpoint:
/// answers every request with a fixed JSON body, then closes.
async fn spawn_discovery_stub(body: serde_json::Value) -> (String, tokio::task::JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let body = serde_json::to_string(&body).unwrap();
    let handle = tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else { break };
            let body = body.clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });
    (format!("http://{addr}"), handle)
}

async fn connected_client(server_url: String) -> InteractiveClient {
    let (discovery_url, _stub) = spawn_discovery_stub(serde_json::json!([server_url])).await;
    let config = ClientConfig::new(42, "test-token").with_discovery_url(discovery_url);
    let client = InteractiveClient::new(config).unwrap();
    client.connect().await.unwrap();
    client
}

#[tokio::test]
async fn s1_single_call_success() {
    let server = MockInteractiveServer::start(Arc::new(|p: &Packet| {
        vec![Packet::reply_ok(p.id, 0, serde_json::json!({"time": 1_700_000_000_000u64}))]
    }))
    .await
    .unwrap();

    let client = connected_client(server.url()).await;
    let result = client.get_time().await.unwrap();
    assert_eq!(result["time"], 1_700_000_000_000u64);
}

#[tokio::test(start_paused = true)]
async fn s2_timeout_and_late_reply_is_dropped() {
    let server = MockInteractiveServer::start(Arc::new(|_p: &Packet| vec![])).await.unwrap();
    let client = connected_client(server.url()).await;

    let call = tokio::spawn(async move { client.get_time().await });
    tokio::time::advance(Duration::from_secs(16)).await;
    let result = call.await.unwrap();

    assert!(matches!(result, Err(InteractiveError::ReplyTimeout { .. })));
}

#[tokio::test]
async fn s3_compression_negotiation_applies_to_next_frame() {
    let server = MockInteractiveServer::start(Arc::new(|p: &Packet| match p.method_name() {
        Some("setCompression") => vec![Packet::reply_ok(p.id, 0, serde_json::json!({"scheme": "gzip"}))],
        Some("getTime") => vec![Packet::reply_ok(p.id, 0, serde_json::json!({"time": 1}))],
        _ => vec![],
    }))
    .await
    .unwrap();

    let client = connected_client(server.url()).await;
    let scheme = client.set_compression(vec!["lz4".into(), "gzip".into(), "none".into()]).await.unwrap();
    assert_eq!(scheme, "gzip");

    // The next call round-trips fine only if both sides agree gzip now
    // applies — this is the black-box observation of invariant 4.
    let result = client.get_time().await.unwrap();
    assert_eq!(result["time"], 1);
}

#[tokio::test]
async fn s4_paginated_participants_dedup_and_order() {
    let server = MockInteractiveServer::start(Arc::new(|p: &Packet| {
        if p.method_name() != Some("getAllParticipants") {
            return vec![];
        }
        let req_params = match &p.body {
            interactive_protocol::PacketBody::Method { params, .. } => params.clone(),
            _ => serde_json::json!({}),
        };
        let from = req_params.get("from").and_then(serde_json::Value::as_u64).unwrap_or(0);
        let (start, count, has_more) = match from {
            0 => (1, 10, true),
            10 => (11, 10, true),
            20 => (21, 4, false),
            _ => (0, 0, false),
        };
        let participants: Vec<serde_json::Value> = (start..start + count)
            .map(|n| serde_json::json!({"sessionID": format!("s{n}"), "userID": format!("u{n}"), "connectedAt": n}))
            .collect();
        vec![Packet::reply_ok(
            p.id,
            0,
            serde_json::json!({"participants": participants, "hasMore": has_more}),
        )]
    }))
    .await
    .unwrap();

    let client = connected_client(server.url()).await;
    let participants = client.participants().await.unwrap();
    let all = participants.get_all(0).await.unwrap();

    assert_eq!(all.len(), 24);
    let connected_ats: Vec<u64> = all.iter().map(|p| p["connectedAt"].as_u64().unwrap()).collect();
    let mut sorted = connected_ats.clone();
    sorted.sort_unstable();
    assert_eq!(connected_ats, sorted);
    assert_eq!(connected_ats.iter().collect::<std::collections::HashSet<_>>().len(), 24);
}

#[tokio::test]
async fn s5_fails_over_to_the_next_candidate() {
    // A: nothing listening -> immediate connection-refused failure.
    let refused_listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let a_addr = refused_listener.local_addr().unwrap();
    drop(refused_listener);

    // B: accepts the TCP connection but hangs up before completing the
    // websocket upgrade -> a handshake-level failure.
    let b_listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let b_addr = b_listener.local_addr().unwrap();
    tokio::spawn(async move {
        if let Ok((stream, _)) = b_listener.accept().await {
            drop(stream);
        }
    });

    // C: a real mock service.
    let server = MockInteractiveServer::start(Arc::new(|_p: &Packet| vec![])).await.unwrap();

    let (discovery_url, _stub) = spawn_discovery_stub(serde_json::json!([
        format!("ws://{a_addr}"),
        format!("ws://{b_addr}"),
        server.url(),
    ]))
    .await;

    let config = ClientConfig::new(1, "test-token").with_discovery_url(discovery_url);
    let client = InteractiveClient::new(config).unwrap();
    client.connect().await.unwrap();

    // `subscribe` necessarily happens after `connect` returns, since there is
    // no session to subscribe against beforehand. The one-shot
    // `ConnectionEstablished` notification must still be observable here —
    // it is replayed to the subscriber rather than lost to having had no
    // listener at the moment it was raised.
    let mut events = client.subscribe().await.unwrap();
    let first = tokio::time::timeout(Duration::from_millis(200), events.recv())
        .await
        .expect("ConnectionEstablished should already be available to a late subscriber")
        .unwrap();
    match first {
        Event::ConnectionEstablished { candidate } => assert_eq!(candidate, server.url()),
        other => panic!("expected ConnectionEstablished first, got {other:?}"),
    }

    // It fires exactly once: a second poll must not see it again.
    let second = tokio::time::timeout(Duration::from_millis(50), events.recv()).await;
    assert!(second.is_err(), "ConnectionEstablished must not be delivered more than once");
}

#[tokio::test]
async fn s6_unknown_event_name_becomes_undefined_and_traffic_continues() {
    let server = MockInteractiveServer::start(Arc::new(|p: &Packet| match p.method_name() {
        Some("ready") => vec![
            Packet::reply_ok(p.id, 0, serde_json::json!({})),
            Packet::method(9000 + p.id, 0, "onNewThingThatDoesNotExist", serde_json::json!({"x": 1}), true),
        ],
        Some("getTime") => vec![Packet::reply_ok(p.id, 0, serde_json::json!({"time": 2}))],
        _ => vec![],
    }))
    .await
    .unwrap();

    let client = connected_client(server.url()).await;
    let mut events = client.subscribe().await.unwrap();

    client.ready(true).await.unwrap();

    let mut saw_undefined = false;
    for _ in 0..5 {
        match tokio::time::timeout(Duration::from_millis(200), events.recv()).await {
            Ok(Ok(Event::Undefined { method, params, .. })) => {
                assert_eq!(method, "onNewThingThatDoesNotExist");
                assert_eq!(params["x"], 1);
                saw_undefined = true;
                break;
            }
            Ok(Ok(_)) => continue,
            _ => break,
        }
    }
    assert!(saw_undefined, "expected an Undefined event for the unknown method name");

    // Traffic still proceeds normally afterward.
    let result = client.get_time().await.unwrap();
    assert_eq!(result["time"], 2);
}

#[tokio::test]
async fn controls_create_keeps_one_scenes_failure_from_discarding_anothers_success() {
    let server = MockInteractiveServer::start(Arc::new(|p: &Packet| {
        if p.method_name() != Some("createControls") {
            return vec![];
        }
        let params = match &p.body {
            interactive_protocol::PacketBody::Method { params, .. } => params.clone(),
            _ => serde_json::json!({}),
        };
        match params.get("sceneID").and_then(serde_json::Value::as_str) {
            Some("bad-scene") => vec![Packet::reply_err(
                p.id,
                0,
                interactive_protocol::ReplyError {
                    code: 4000,
                    message: "scene does not exist".to_owned(),
                    path: None,
                },
            )],
            _ => vec![Packet::reply_ok(p.id, 0, serde_json::json!({"controls": params["controls"]}))],
        }
    }))
    .await
    .unwrap();

    let client = connected_client(server.url()).await;
    let controls = client.controls().await.unwrap();

    let results = controls
        .create(vec![
            serde_json::json!({"sceneID": "good-scene", "controlID": "a"}),
            serde_json::json!({"sceneID": "bad-scene", "controlID": "b"}),
            serde_json::json!({"sceneID": "good-scene", "controlID": "c"}),
        ])
        .await;

    assert!(results[&0].is_ok());
    assert!(results[&2].is_ok());
    assert!(matches!(&*results[&1], Err(InteractiveError::ReplyWithError(_))));
}

#[tokio::test]
async fn controls_delete_rejects_an_empty_scene_id_without_dialing_out() {
    let server = MockInteractiveServer::start(Arc::new(|_p: &Packet| vec![])).await.unwrap();
    let client = connected_client(server.url()).await;
    let controls = client.controls().await.unwrap();

    let err = controls
        .delete(vec![("scene-a".to_owned(), "ctrl-1".to_owned()), (String::new(), "ctrl-2".to_owned())])
        .await
        .unwrap_err();

    assert!(matches!(err, InteractiveError::MissingSceneId { index: 1 }));
}
