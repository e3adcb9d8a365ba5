//! Utility functions for identifiers

use bech32::Bech32m;
use uuid7::uuid7;

// construct a unique id then encode using bech32
pub fn new_uuid_to_bech32(hrp: &str) -> anyhow::Result<String> {
    let hrp = bech32::Hrp::parse(hrp)?;
    let encode = bech32::encode::<Bech32m>(hrp, uuid7().as_bytes())?;
    Ok(encode)
}

/// Correlation id sent as `X-Request-Id` with every request.
pub fn new_request_id() -> String {
    new_uuid_to_bech32("req_").unwrap_or_else(|_| uuid7().to_string())
}

/// `Idempotency-Key` for one submission. Minted once per transition call.
pub fn new_idempotency_key() -> String {
    new_uuid_to_bech32("idem_").unwrap_or_else(|_| uuid7().to_string())
}
