// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use proptest::prelude::*;
use serde_json::json;

use super::*;

fn names(raw: &str) -> Vec<String> {
    decode(raw).map(|env| env.events().iter().map(EnvelopeEvent::name).collect()).unwrap_or_default()
}

// -- decode -------------------------------------------------------------------

#[yare::parameterized(
    not_json = { "not json" },
    truncated = { r#"{"msg": {"a": 1"# },
    number = { "42" },
    string = { r#""msg""# },
    array = { r#"[{"msg": {}}]"# },
    null = { "null" },
    empty = { "" },
)]
fn decode_discards_non_objects(raw: &str) {
    assert!(decode(raw).is_none());
}

#[test]
fn decode_object_without_known_keys_is_empty() -> anyhow::Result<()> {
    let env = decode(r#"{"other": true}"#).ok_or_else(|| anyhow::anyhow!("decode failed"))?;
    assert!(env.is_empty());
    assert!(env.events().is_empty());
    Ok(())
}

#[test]
fn decode_ignores_non_object_msg() -> anyhow::Result<()> {
    let env = decode(r#"{"msg": "hello"}"#).ok_or_else(|| anyhow::anyhow!("decode failed"))?;
    assert!(env.msg.is_none());
    Ok(())
}

// -- msg fan-out --------------------------------------------------------------

#[test]
fn msg_emits_whole_then_each_key_in_order() -> anyhow::Result<()> {
    let env = decode(r#"{"msg": {"a": 1, "b": 2}}"#).ok_or_else(|| anyhow::anyhow!("decode"))?;
    let events = env.events();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0], EnvelopeEvent::Msg(json!({"a": 1, "b": 2})));
    assert_eq!(events[1], EnvelopeEvent::MsgKey { key: "a".to_owned(), value: json!(1) });
    assert_eq!(events[2], EnvelopeEvent::MsgKey { key: "b".to_owned(), value: json!(2) });
    Ok(())
}

#[test]
fn msg_keys_follow_document_order_not_sorted_order() {
    assert_eq!(names(r#"{"msg": {"zeta": 1, "alpha": 2}}"#), ["msg", "msg:zeta", "msg:alpha"]);
}

// -- rta fan-out --------------------------------------------------------------

#[test]
fn rta_array_walks_elements_last_to_first() -> anyhow::Result<()> {
    let raw = r#"{"rta": [{"action": "A", "rta": 1}, {"action": "B", "rta": 2}]}"#;
    let env = decode(raw).ok_or_else(|| anyhow::anyhow!("decode"))?;
    let events = env.events();
    assert_eq!(events.len(), 3);
    assert_eq!(
        events[0],
        EnvelopeEvent::Rta(json!([{"action": "A", "rta": 1}, {"action": "B", "rta": 2}]))
    );
    assert_eq!(events[1], EnvelopeEvent::RtaAction { action: "B".to_owned(), value: json!(2) });
    assert_eq!(events[2], EnvelopeEvent::RtaAction { action: "A".to_owned(), value: json!(1) });
    Ok(())
}

#[test]
fn rta_single_object_emits_one_action() {
    assert_eq!(names(r#"{"rta": {"action": "printTicket", "rta": {"ok": true}}}"#), [
        "rta",
        "rta:printTicket"
    ]);
}

#[test]
fn rta_elements_without_action_are_skipped() {
    assert_eq!(names(r#"{"rta": [{"rta": 1}, {"action": "B", "rta": 2}, 7]}"#), ["rta", "rta:B"]);
}

#[test]
fn rta_action_without_payload_carries_null() -> anyhow::Result<()> {
    let env = decode(r#"{"rta": {"action": "ping"}}"#).ok_or_else(|| anyhow::anyhow!("decode"))?;
    assert_eq!(env.events()[1], EnvelopeEvent::RtaAction {
        action: "ping".to_owned(),
        value: serde_json::Value::Null
    });
    Ok(())
}

// -- err fan-out --------------------------------------------------------------

#[test]
fn err_emits_exactly_one_event() -> anyhow::Result<()> {
    let env = decode(r#"{"err": {"code": 1, "message": "bad"}}"#)
        .ok_or_else(|| anyhow::anyhow!("decode"))?;
    let events = env.events();
    assert_eq!(events, vec![EnvelopeEvent::Err(json!({"code": 1, "message": "bad"}))]);
    Ok(())
}

#[test]
fn all_three_fan_outs_run_for_one_message() {
    let raw = r#"{"err": "e", "rta": {"action": "x", "rta": 0}, "msg": {"k": "v"}}"#;
    assert_eq!(names(raw), ["msg", "msg:k", "rta", "rta:x", "err"]);
}

proptest! {
    #[test]
    fn rta_action_events_match_actionable_elements(actions in proptest::collection::vec("[a-z]{1,8}", 0..12)) {
        let items: Vec<_> = actions.iter().enumerate().map(|(i, a)| json!({"action": a, "rta": i})).collect();
        let env = Envelope { rta: Some(serde_json::Value::Array(items)), ..Envelope::default() };
        let events = env.events();
        prop_assert_eq!(events.len(), actions.len() + 1);
        let emitted: Vec<String> = events[1..].iter().map(EnvelopeEvent::name).collect();
        let expected: Vec<String> = actions.iter().rev().map(|a| format!("rta:{a}")).collect();
        prop_assert_eq!(emitted, expected);
    }
}

// -- encode -------------------------------------------------------------------

#[test]
fn encode_str_returns_valid_text_verbatim() -> anyhow::Result<()> {
    let text = r#"{ "msg" : {"b": 1, "a": 2} }"#;
    assert_eq!(encode_str(text)?, text);
    Ok(())
}

#[test]
fn encode_str_rejects_malformed_text() {
    let err = encode_str("{'single': 'quotes'}");
    assert!(matches!(err, Err(ProtocolError::InvalidPayload(_))));
}

#[test]
fn encode_serializes_and_skips_absent_parts() -> anyhow::Result<()> {
    let env = Envelope::rta_action("print", json!({"status": 0}));
    let text = encode(&env)?;
    assert_eq!(text, r#"{"rta":{"action":"print","rta":{"status":0}}}"#);
    Ok(())
}

#[test]
fn encoded_envelope_decodes_to_same_events() -> anyhow::Result<()> {
    let mut map = serde_json::Map::new();
    map.insert("status".to_owned(), json!("online"));
    let env = Envelope::msg(map);
    let back = decode(&encode(&env)?).ok_or_else(|| anyhow::anyhow!("decode"))?;
    assert_eq!(back.events(), env.events());
    Ok(())
}
