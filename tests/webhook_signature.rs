use greencart_api::payments::{
    SIGNATURE_TOLERANCE_SECS, SignatureError, sign_payload, verify_signature,
};

const SECRET: &str = "whsec_test_secret";
const PAYLOAD: &[u8] = br#"{"type":"payment_intent.succeeded","data":{"object":{"id":"pi_123"}}}"#;

#[test]
fn signed_payload_verifies() {
    let now = 1_700_000_000;
    let header = sign_payload(PAYLOAD, SECRET, now).expect("header");
    assert_eq!(verify_signature(PAYLOAD, &header, SECRET, now), Ok(()));
    assert_eq!(verify_signature(PAYLOAD, &header, SECRET, now + 30), Ok(()));
}

#[test]
fn tampered_payload_or_wrong_secret_is_rejected() {
    let now = 1_700_000_000;
    let header = sign_payload(PAYLOAD, SECRET, now).expect("header");

    assert_eq!(
        verify_signature(b"{\"type\":\"other\"}", &header, SECRET, now),
        Err(SignatureError::Mismatch)
    );
    assert_eq!(
        verify_signature(PAYLOAD, &header, "whsec_other", now),
        Err(SignatureError::Mismatch)
    );
}

#[test]
fn any_matching_v1_signature_is_accepted() {
    let now = 1_700_000_000;
    let header = sign_payload(PAYLOAD, SECRET, now).expect("header");
    let (ts, v1) = header.split_once(',').expect("two parts");
    let rotated = format!("{ts},v1=deadbeef,{v1}");
    assert_eq!(verify_signature(PAYLOAD, &rotated, SECRET, now), Ok(()));
}

#[test]
fn stale_timestamp_is_rejected() {
    let signed_at = 1_700_000_000;
    let header = sign_payload(PAYLOAD, SECRET, signed_at).expect("header");
    let later = signed_at + SIGNATURE_TOLERANCE_SECS + 1;
    assert_eq!(
        verify_signature(PAYLOAD, &header, SECRET, later),
        Err(SignatureError::Expired)
    );
}

#[test]
fn malformed_headers_are_rejected() {
    let now = 1_700_000_000;
    for header in ["", "v1=abcd", "t=notanumber,v1=abcd", "t=1700000000"] {
        assert_eq!(
            verify_signature(PAYLOAD, header, SECRET, now),
            Err(SignatureError::Malformed),
            "header {header:?}"
        );
    }
}

#[test]
fn extreme_timestamps_are_expired_not_overflowed() {
    let now = 1_700_000_000;
    for ts in [i64::MIN, i64::MAX] {
        let header = format!("t={ts},v1=abcd");
        assert_eq!(
            verify_signature(PAYLOAD, &header, SECRET, now),
            Err(SignatureError::Expired),
            "timestamp {ts}"
        );
    }
}
