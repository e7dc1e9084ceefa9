//! Mirroring signaling end-to-end: offers, buffered candidates, answers,
//! across both the CastV2 and the WebSocket sender transports.

use serde_json::json;

use embercast_protocol::{NS_RECEIVER, NS_WEBRTC};

use crate::harness::{
    start_bridge, ws_connect, ws_recv_json, ws_send_json, ws_try_recv_json, CastClient,
};

async fn receiver_session_id(cast: &mut CastClient) -> String {
    cast.send_json(NS_RECEIVER, json!({"type":"GET_STATUS","requestId":1}))
        .await;
    let (_, payload) = cast.recv_payload().await;
    payload["status"]["applications"][0]["sessionId"]
        .as_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn cast_offer_buffers_candidates_until_answer() {
    let tb = start_bridge().await;
    let mut display = ws_connect(tb.ws_addr()).await;
    tb.wait_for_display().await;

    let mut cast = CastClient::connect(tb.cast_addr()).await;
    let session_id = receiver_session_id(&mut cast).await;

    // OFFER reaches the display...
    cast.send_json(
        NS_WEBRTC,
        json!({"type":"OFFER","seqNum":3,"offer":{"sdp":"v=0\r\n"}}),
    )
    .await;
    let offer = ws_recv_json(&mut display).await;
    assert_eq!(offer["type"], "webrtc-offer");
    assert_eq!(offer["sessionId"], session_id.as_str());
    assert_eq!(offer["sdp"], "v=0\r\n");

    // ...but candidates sent before the answer do not.
    cast.send_json(
        NS_WEBRTC,
        json!({"type":"ICE_CANDIDATE","seqNum":3,"candidate":{"candidate":"c1"}}),
    )
    .await;
    cast.send_json(
        NS_WEBRTC,
        json!({"type":"ICE_CANDIDATE","seqNum":3,"candidate":{"candidate":"c2"}}),
    )
    .await;
    assert!(ws_try_recv_json(&mut display).await.is_none());

    // The display answers: the sender gets ANSWER on the cast socket with
    // swapped ids, and the buffered candidates flush in order.
    ws_send_json(
        &mut display,
        &json!({"type":"webrtc-answer","sessionId":session_id,"sdp":"answer-sdp"}),
    )
    .await;

    let (msg, payload) = cast.recv_payload().await;
    assert_eq!(payload["type"], "ANSWER");
    assert_eq!(payload["seqNum"], 3);
    assert_eq!(payload["answer"]["sdp"], "answer-sdp");
    assert_eq!(msg.source_id.as_deref(), Some("receiver-0"));
    assert_eq!(msg.destination_id.as_deref(), Some("sender-0"));

    for expected in ["c1", "c2"] {
        let cand = ws_recv_json(&mut display).await;
        assert_eq!(cand["type"], "ice-candidate");
        assert_eq!(cand["sessionId"], session_id.as_str());
        assert_eq!(cand["candidate"]["candidate"], expected);
    }

    // Candidates now flow immediately in both directions.
    cast.send_json(
        NS_WEBRTC,
        json!({"type":"ICE_CANDIDATE","seqNum":3,"candidate":{"candidate":"c3"}}),
    )
    .await;
    let cand = ws_recv_json(&mut display).await;
    assert_eq!(cand["candidate"]["candidate"], "c3");

    ws_send_json(
        &mut display,
        &json!({"type":"ice-candidate","sessionId":session_id,"candidate":{"candidate":"tv1"}}),
    )
    .await;
    let (_, payload) = cast.recv_payload().await;
    assert_eq!(payload["type"], "ICE_CANDIDATE");
    assert_eq!(payload["seqNum"], 3);
    assert_eq!(payload["candidate"]["candidate"], "tv1");

    tb.shutdown().await;
}

#[tokio::test]
async fn second_answer_is_a_no_op() {
    let tb = start_bridge().await;
    let mut display = ws_connect(tb.ws_addr()).await;
    tb.wait_for_display().await;

    let mut cast = CastClient::connect(tb.cast_addr()).await;
    let session_id = receiver_session_id(&mut cast).await;

    cast.send_json(
        NS_WEBRTC,
        json!({"type":"OFFER","offer":{"sdp":"v=0\r\n"}}),
    )
    .await;
    let _ = ws_recv_json(&mut display).await;

    ws_send_json(
        &mut display,
        &json!({"type":"webrtc-answer","sessionId":session_id,"sdp":"first"}),
    )
    .await;
    let (_, payload) = cast.recv_payload().await;
    assert_eq!(payload["answer"]["sdp"], "first");

    // The one-shot consumer is gone; a repeat answer reaches nobody.
    ws_send_json(
        &mut display,
        &json!({"type":"webrtc-answer","sessionId":session_id,"sdp":"second"}),
    )
    .await;
    assert!(cast.try_recv().await.is_none());

    tb.shutdown().await;
}

#[tokio::test]
async fn websocket_sender_signaling_custom_origin() {
    let tb = start_bridge().await;

    // The sender connects first and identifies itself, freeing the slot
    // before the real display arrives.
    let mut sender = ws_connect(tb.ws_addr()).await;
    ws_send_json(&mut sender, &json!({"type":"sender-hello","sessionId":"custom-1"})).await;
    tb.wait_for_senders(1).await;

    let mut display = ws_connect(tb.ws_addr()).await;
    tb.wait_for_display().await;

    ws_send_json(
        &mut sender,
        &json!({"type":"webrtc-offer","sessionId":"custom-1","sdp":"v=0\r\nsender"}),
    )
    .await;
    let offer = ws_recv_json(&mut display).await;
    assert_eq!(offer["type"], "webrtc-offer");
    assert_eq!(offer["sessionId"], "custom-1");
    assert_eq!(offer["sdp"], "v=0\r\nsender");

    // Pre-answer candidate buffers, then flushes on answer.
    ws_send_json(
        &mut sender,
        &json!({"type":"ice-candidate","sessionId":"custom-1","candidate":{"candidate":"s1"}}),
    )
    .await;
    assert!(ws_try_recv_json(&mut display).await.is_none());

    ws_send_json(
        &mut display,
        &json!({"type":"webrtc-answer","sessionId":"custom-1","sdp":"tv-answer"}),
    )
    .await;
    let cand = ws_recv_json(&mut display).await;
    assert_eq!(cand["type"], "ice-candidate");
    assert_eq!(cand["sessionId"], "custom-1");
    assert_eq!(cand["candidate"]["candidate"], "s1");

    tb.shutdown().await;
}

#[tokio::test]
async fn candidates_for_unknown_sessions_are_dropped() {
    let tb = start_bridge().await;
    let mut display = ws_connect(tb.ws_addr()).await;
    tb.wait_for_display().await;

    let mut cast = CastClient::connect(tb.cast_addr()).await;

    // No OFFER was ever sent, so the session does not exist in the relay.
    cast.send_json(
        NS_WEBRTC,
        json!({"type":"ICE_CANDIDATE","candidate":{"candidate":"orphan"}}),
    )
    .await;

    assert!(ws_try_recv_json(&mut display).await.is_none());

    tb.shutdown().await;
}

#[tokio::test]
async fn disconnect_closes_the_signaling_session() {
    let tb = start_bridge().await;
    let mut display = ws_connect(tb.ws_addr()).await;
    tb.wait_for_display().await;

    let mut cast = CastClient::connect(tb.cast_addr()).await;
    cast.send_json(
        NS_WEBRTC,
        json!({"type":"OFFER","offer":{"sdp":"v=0\r\n"}}),
    )
    .await;
    let _ = ws_recv_json(&mut display).await;
    assert_eq!(tb.bridge.relay.session_count(), 1);

    drop(cast);

    let deadline = tokio::time::Instant::now() + crate::harness::RECV_TIMEOUT;
    while tb.bridge.relay.session_count() != 0 {
        assert!(
            tokio::time::Instant::now() < deadline,
            "session not closed on disconnect"
        );
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    tb.shutdown().await;
}
