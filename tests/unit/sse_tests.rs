/*!
 * Tests for the event-stream decoder fed with network-shaped chunks
 */

use gagana::providers::sse::{SseDecoder, SseEvent};

fn decode_bytewise(body: &[u8]) -> Vec<SseEvent> {
    let mut decoder = SseDecoder::new();
    let mut events = Vec::new();
    for byte in body {
        events.extend(decoder.push(std::slice::from_ref(byte)));
    }
    events.extend(decoder.finish());
    events
}

#[test]
fn test_decoder_withByteSizedChunks_shouldMatchWholeBody() {
    let body = "data: {\"choices\":[{\"delta\":{\"content\":\"Tālofa\"}}]}\n\ndata: [DONE]\n\n";

    let mut whole = SseDecoder::new();
    let mut expected = whole.push(body.as_bytes());
    expected.extend(whole.finish());

    assert_eq!(decode_bytewise(body.as_bytes()), expected);
    assert_eq!(expected.len(), 2);
}

#[test]
fn test_decoder_withNamedEvents_shouldResetNameBetweenEvents() {
    let events = decode_bytewise(b"event: output\ndata: Ha\n\ndata: fa\n\n");
    assert_eq!(events[0].event, "output");
    assert_eq!(events[1].event, "message");
}

#[test]
fn test_decoder_withEmptyDataLine_shouldDispatchEmptyString() {
    let events = decode_bytewise(b"data:\n\n");
    assert_eq!(events, vec![SseEvent { event: "message".into(), data: String::new() }]);
}

#[test]
fn test_decoder_withFieldWithoutColon_shouldIgnoreIt() {
    let events = decode_bytewise(b"retry\ndata: ok\n\n");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].data, "ok");
}

#[test]
fn test_finish_withNothingBuffered_shouldReturnNone() {
    let mut decoder = SseDecoder::new();
    assert!(decoder.push(b"data: a\n\n").len() == 1);
    assert!(decoder.finish().is_none());
}
