//! Run the scripted exchanges in `test-vectors/exchanges.json`.
//!
//! Each case names a mock-peer behavior, a payload and either the expected
//! reply or the expected error kind. Errors are compared by
//! `ErrorKind::as_str` so the vectors stay independent of message wording.

use mock_peer::Behavior;
use netreq_core::{execute, STATUS_OK};

#[test]
fn exchange_test_vectors() {
    let raw = include_str!("../../test-vectors/exchanges.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let peer = &case["peer"];
        let reply = peer["reply"].as_str().unwrap_or("").as_bytes().to_vec();
        let behavior = Behavior::from_mode(peer["mode"].as_str().unwrap(), reply)
            .unwrap_or_else(|| panic!("{name}: unknown peer mode"));
        let addr = mock_peer::spawn(behavior).unwrap();

        let port = case["port"].as_i64().unwrap_or(i64::from(addr.port()));
        let payload = case["payload"].as_str().unwrap().as_bytes().to_vec();
        let outcome = execute("127.0.0.1", port, payload);

        let expected = &case["expected"];
        match expected["error"].as_str() {
            Some(kind) => {
                let err = outcome.expect_err(name);
                assert_eq!(err.kind().as_str(), kind, "{name}: error kind");
            }
            None => {
                let result = outcome.unwrap_or_else(|e| panic!("{name}: {e}"));
                assert_eq!(i64::from(result.status), expected["status"].as_i64().unwrap(), "{name}: status");
                assert_eq!(result.status, STATUS_OK, "{name}: status");
                assert_eq!(
                    result.received,
                    expected["received"].as_str().unwrap().as_bytes(),
                    "{name}: received"
                );
            }
        }
    }
}
