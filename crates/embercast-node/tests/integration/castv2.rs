//! End-to-end CastV2 scenarios against a running bridge.

use serde_json::json;

use embercast_protocol::{NS_CONNECTION, NS_HEARTBEAT, NS_MEDIA, NS_RECEIVER, NS_REMOTING};

use crate::harness::{start_bridge, ws_connect, ws_recv_json, CastClient};

#[tokio::test]
async fn heartbeat_ping_pong() {
    let tb = start_bridge().await;
    let mut cast = CastClient::connect(tb.cast_addr()).await;

    cast.send_json(NS_HEARTBEAT, json!({"type":"PING"})).await;

    let (msg, payload) = cast.recv_payload().await;
    assert_eq!(payload["type"], "PONG");
    assert_eq!(msg.source_id.as_deref(), Some("receiver-0"));
    assert_eq!(msg.destination_id.as_deref(), Some("sender-0"));
    assert_eq!(msg.ns(), NS_HEARTBEAT);

    tb.shutdown().await;
}

#[tokio::test]
async fn connect_acknowledged_with_request_id() {
    let tb = start_bridge().await;
    let mut cast = CastClient::connect(tb.cast_addr()).await;

    cast.send_json(NS_CONNECTION, json!({"type":"CONNECT","requestId":7}))
        .await;

    let (_, payload) = cast.recv_payload().await;
    assert_eq!(payload["type"], "CONNECTED");
    assert_eq!(payload["requestId"], 7);

    tb.shutdown().await;
}

#[tokio::test]
async fn receiver_status_advertises_default_media_receiver() {
    let tb = start_bridge().await;
    let mut cast = CastClient::connect(tb.cast_addr()).await;

    cast.send_json(NS_RECEIVER, json!({"type":"GET_STATUS","requestId":1}))
        .await;

    let (_, payload) = cast.recv_payload().await;
    assert_eq!(payload["type"], "RECEIVER_STATUS");
    assert_eq!(payload["requestId"], 1);

    let app = &payload["status"]["applications"][0];
    assert_eq!(app["appId"], "CC1AD845");
    assert!(!app["sessionId"].as_str().unwrap().is_empty());
    assert!(app["transportId"].as_str().unwrap().starts_with("transport-"));

    let volume = &payload["status"]["volume"];
    assert_eq!(volume["level"], 1.0);
    assert_eq!(volume["muted"], false);
    assert_eq!(volume["stepInterval"], 0.05);
    assert_eq!(volume["controlType"], "attenuation");

    tb.shutdown().await;
}

#[tokio::test]
async fn launch_replies_receiver_status() {
    let tb = start_bridge().await;
    let mut cast = CastClient::connect(tb.cast_addr()).await;

    cast.send_json(
        NS_RECEIVER,
        json!({"type":"LAUNCH","requestId":5,"appId":"CC1AD845"}),
    )
    .await;

    let (_, payload) = cast.recv_payload().await;
    assert_eq!(payload["type"], "RECEIVER_STATUS");
    assert_eq!(payload["requestId"], 5);

    tb.shutdown().await;
}

#[tokio::test]
async fn media_load_replies_and_reaches_display() {
    let tb = start_bridge().await;
    let mut display = ws_connect(tb.ws_addr()).await;
    tb.wait_for_display().await;

    let mut cast = CastClient::connect(tb.cast_addr()).await;
    cast.send_json(
        NS_MEDIA,
        json!({
            "type": "LOAD",
            "requestId": 10,
            "media": {
                "contentId": "http://example.com/v.mp4",
                "contentType": "video/mp4",
                "streamType": "BUFFERED",
            },
        }),
    )
    .await;

    let (_, payload) = cast.recv_payload().await;
    assert_eq!(payload["type"], "MEDIA_STATUS");
    assert_eq!(payload["requestId"], 10);
    assert_eq!(payload["status"][0]["playerState"], "PLAYING");
    assert_eq!(
        payload["status"][0]["media"]["contentId"],
        "http://example.com/v.mp4"
    );

    let cmd = ws_recv_json(&mut display).await;
    assert_eq!(cmd["type"], "load");
    assert_eq!(cmd["url"], "http://example.com/v.mp4");
    assert_eq!(cmd["contentType"], "video/mp4");
    assert_eq!(cmd["requestId"], 10);

    tb.shutdown().await;
}

#[tokio::test]
async fn media_session_id_strictly_increases_per_load() {
    let tb = start_bridge().await;
    let mut cast = CastClient::connect(tb.cast_addr()).await;

    let mut last = 1;
    for request_id in [20, 21, 22] {
        cast.send_json(
            NS_MEDIA,
            json!({
                "type": "LOAD",
                "requestId": request_id,
                "media": {"contentId": "http://example.com/v.mp4", "contentType": "video/mp4"},
            }),
        )
        .await;

        let (_, payload) = cast.recv_payload().await;
        let id = payload["status"][0]["mediaSessionId"].as_i64().unwrap();
        assert!(id > last, "mediaSessionId {id} not above {last}");
        last = id;
    }

    tb.shutdown().await;
}

#[tokio::test]
async fn media_commands_mutate_state_in_order() {
    let tb = start_bridge().await;
    let mut display = ws_connect(tb.ws_addr()).await;
    tb.wait_for_display().await;

    let mut cast = CastClient::connect(tb.cast_addr()).await;

    cast.send_json(NS_MEDIA, json!({"type":"PLAY","requestId":1})).await;
    cast.send_json(NS_MEDIA, json!({"type":"PAUSE","requestId":2})).await;
    cast.send_json(NS_MEDIA, json!({"type":"SEEK","requestId":3,"currentTime":42.5})).await;
    cast.send_json(NS_MEDIA, json!({"type":"SET_VOLUME","requestId":4,"volume":{"level":0.5,"muted":true}})).await;
    cast.send_json(NS_MEDIA, json!({"type":"STOP","requestId":5})).await;

    let expectations = [
        (1, "PLAYING"),
        (2, "PAUSED"),
        (3, "PAUSED"),
        (4, "PAUSED"),
        (5, "IDLE"),
    ];
    for (request_id, state) in expectations {
        let (_, payload) = cast.recv_payload().await;
        assert_eq!(payload["requestId"], request_id);
        assert_eq!(payload["status"][0]["playerState"], state);
    }

    // The display sees the same commands, in the same order.
    let kinds = ["play", "pause", "seek", "volume", "stop"];
    for kind in kinds {
        let cmd = ws_recv_json(&mut display).await;
        assert_eq!(cmd["type"], kind);
    }

    tb.shutdown().await;
}

#[tokio::test]
async fn receiver_stop_resets_media_and_notifies_display() {
    let tb = start_bridge().await;
    let mut display = ws_connect(tb.ws_addr()).await;
    tb.wait_for_display().await;

    let mut cast = CastClient::connect(tb.cast_addr()).await;
    cast.send_json(
        NS_MEDIA,
        json!({"type":"LOAD","requestId":1,"media":{"contentId":"x","contentType":"video/mp4"}}),
    )
    .await;
    let _ = cast.recv_payload().await;
    let _ = ws_recv_json(&mut display).await; // the load command

    cast.send_json(NS_RECEIVER, json!({"type":"STOP","requestId":2})).await;
    let (_, payload) = cast.recv_payload().await;
    assert_eq!(payload["type"], "RECEIVER_STATUS");
    assert_eq!(payload["requestId"], 2);

    let cmd = ws_recv_json(&mut display).await;
    assert_eq!(cmd["type"], "stop");
    assert_eq!(cmd["requestId"], 2);

    // Media state went back to idle.
    cast.send_json(NS_MEDIA, json!({"type":"GET_STATUS","requestId":3})).await;
    let (_, payload) = cast.recv_payload().await;
    assert_eq!(payload["status"][0]["playerState"], "IDLE");
    assert!(payload["status"][0].get("media").is_none());

    tb.shutdown().await;
}

#[tokio::test]
async fn remoting_lifecycle_and_mirror_stop() {
    let tb = start_bridge().await;
    let mut display = ws_connect(tb.ws_addr()).await;
    tb.wait_for_display().await;

    let mut cast = CastClient::connect(tb.cast_addr()).await;
    cast.send_json(NS_RECEIVER, json!({"type":"GET_STATUS","requestId":1})).await;
    let (_, payload) = cast.recv_payload().await;
    let session_id = payload["status"]["applications"][0]["sessionId"]
        .as_str()
        .unwrap()
        .to_string();

    cast.send_json(NS_REMOTING, json!({"type":"SETUP","requestId":2})).await;
    let (_, payload) = cast.recv_payload().await;
    assert_eq!(payload["type"], "SETUP_OK");
    assert_eq!(payload["requestId"], 2);

    cast.send_json(NS_REMOTING, json!({"type":"START","requestId":3})).await;
    let (_, payload) = cast.recv_payload().await;
    assert_eq!(payload["type"], "START_OK");

    cast.send_json(NS_REMOTING, json!({"type":"STOP","requestId":4})).await;
    let (_, payload) = cast.recv_payload().await;
    assert_eq!(payload["type"], "STOP_OK");

    let cmd = ws_recv_json(&mut display).await;
    assert_eq!(cmd["type"], "mirror-stop");
    assert_eq!(cmd["sessionId"], session_id.as_str());

    tb.shutdown().await;
}

#[tokio::test]
async fn sessions_are_isolated_across_connections() {
    let tb = start_bridge().await;
    let mut a = CastClient::connect(tb.cast_addr()).await;
    let mut b = CastClient::connect(tb.cast_addr()).await;

    a.send_json(
        NS_MEDIA,
        json!({"type":"LOAD","requestId":11,"media":{"contentId":"a.mp4","contentType":"video/mp4"}}),
    )
    .await;
    b.send_json(
        NS_MEDIA,
        json!({"type":"LOAD","requestId":22,"media":{"contentId":"b.mp4","contentType":"video/mp4"}}),
    )
    .await;

    let (_, payload_a) = a.recv_payload().await;
    let (_, payload_b) = b.recv_payload().await;

    assert_eq!(payload_a["requestId"], 11);
    assert_eq!(payload_a["status"][0]["media"]["contentId"], "a.mp4");
    assert_eq!(payload_b["requestId"], 22);
    assert_eq!(payload_b["status"][0]["media"]["contentId"], "b.mp4");

    tb.shutdown().await;
}

#[tokio::test]
async fn unknown_namespace_and_type_produce_no_reply() {
    let tb = start_bridge().await;
    let mut cast = CastClient::connect(tb.cast_addr()).await;

    cast.send_json("urn:x-cast:com.example.custom", json!({"type":"HELLO"}))
        .await;
    cast.send_json(NS_RECEIVER, json!({"type":"GET_APP_AVAILABILITY","requestId":9}))
        .await;
    cast.send_json(NS_HEARTBEAT, json!({"type":"PING"})).await;

    // The first reply to arrive is the PONG; nothing answered the others.
    let (_, payload) = cast.recv_payload().await;
    assert_eq!(payload["type"], "PONG");
    assert!(cast.try_recv().await.is_none());

    tb.shutdown().await;
}

#[tokio::test]
async fn malformed_json_payload_is_ignored() {
    let tb = start_bridge().await;
    let mut cast = CastClient::connect(tb.cast_addr()).await;

    let msg = embercast_protocol::CastMessage::utf8(NS_MEDIA, "sender-0", "receiver-0", "{broken");
    let frame = embercast_protocol::codec::encode_frame(&msg).unwrap();
    cast.send_raw(&frame).await;

    cast.send_json(NS_MEDIA, json!({"type":"GET_STATUS","requestId":2})).await;
    let (_, payload) = cast.recv_payload().await;
    assert_eq!(payload["type"], "MEDIA_STATUS");
    assert_eq!(payload["requestId"], 2);

    tb.shutdown().await;
}

#[tokio::test]
async fn malformed_protobuf_frame_does_not_desync() {
    let tb = start_bridge().await;
    let mut cast = CastClient::connect(tb.cast_addr()).await;

    // A valid frame whose content is truncated protobuf.
    let garbage = [0x12u8, 0x0A, 0x01];
    let mut raw = Vec::new();
    raw.extend_from_slice(&(garbage.len() as u32).to_be_bytes());
    raw.extend_from_slice(&garbage);
    cast.send_raw(&raw).await;

    cast.send_json(NS_HEARTBEAT, json!({"type":"PING"})).await;
    let (_, payload) = cast.recv_payload().await;
    assert_eq!(payload["type"], "PONG");

    tb.shutdown().await;
}

#[tokio::test]
async fn oversized_frame_destroys_connection() {
    let tb = start_bridge().await;
    let mut cast = CastClient::connect(tb.cast_addr()).await;

    // Declare a 2 MiB frame; the server must kill the socket without reading it.
    cast.send_raw(&(2u32 * 1024 * 1024).to_be_bytes()).await;
    cast.expect_closed().await;

    // The listener is still fine for new connections.
    let mut fresh = CastClient::connect(tb.cast_addr()).await;
    fresh.send_json(NS_HEARTBEAT, json!({"type":"PING"})).await;
    let (_, payload) = fresh.recv_payload().await;
    assert_eq!(payload["type"], "PONG");

    tb.shutdown().await;
}

#[tokio::test]
async fn receiver_set_volume_patches_and_emits_command() {
    let tb = start_bridge().await;
    let mut display = ws_connect(tb.ws_addr()).await;
    tb.wait_for_display().await;

    let mut cast = CastClient::connect(tb.cast_addr()).await;
    cast.send_json(
        NS_RECEIVER,
        json!({"type":"SET_VOLUME","requestId":6,"volume":{"level":0.5,"muted":true}}),
    )
    .await;

    let (_, payload) = cast.recv_payload().await;
    assert_eq!(payload["type"], "RECEIVER_STATUS");
    assert_eq!(payload["status"]["volume"]["level"], 0.5);
    assert_eq!(payload["status"]["volume"]["muted"], true);

    let cmd = ws_recv_json(&mut display).await;
    assert_eq!(cmd["type"], "volume");
    assert_eq!(cmd["volume"], 0.5);
    assert_eq!(cmd["requestId"], 6);

    tb.shutdown().await;
}
