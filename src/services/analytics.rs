// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Visitor identification for site analytics.
//!
//! Client addresses are reduced to a keyed hash before storage. The key is
//! derived from the server secret with HKDF, so visitor hashes cannot be
//! recomputed from a database dump alone.

use hkdf::Hkdf;
use hmac::digest::{generic_array::GenericArray, KeyInit};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const VISITOR_KEY_INFO: &[u8] = b"noticeboard visitor hash v1";

/// Keyed hash of visitor addresses.
#[derive(Clone)]
pub struct VisitorHasher {
    mac: HmacSha256,
}

impl VisitorHasher {
    /// Derive the hashing key from the server secret.
    pub fn new(secret: &[u8]) -> anyhow::Result<Self> {
        let hk = Hkdf::<Sha256>::new(None, secret);
        // One HMAC-SHA256 block
        let mut key = [0u8; 64];
        hk.expand(VISITOR_KEY_INFO, &mut key)
            .map_err(|e| anyhow::anyhow!("Failed to derive visitor hash key: {}", e))?;
        Ok(Self {
            mac: <HmacSha256 as KeyInit>::new(GenericArray::from_slice(&key)),
        })
    }

    /// Hex digest identifying one visitor (client address plus user agent).
    pub fn visitor_hash(&self, client_ip: &str, user_agent: Option<&str>) -> String {
        let mut mac = self.mac.clone();
        mac.update(client_ip.as_bytes());
        mac.update(b"\n");
        mac.update(user_agent.unwrap_or_default().as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}
