//! KYC claim model and validity rules.
//!
//! Claims on an OnchainID contract are keyed by
//! `keccak256(abi.encode(issuer, topic))`. A claim counts as KYC proof
//! only when the stored record was written by the expected issuer for
//! the expected topic. Reading an unknown claim id returns an all-zero
//! record, which is why a zero issuer is always treated as absent.

use alloy::primitives::{keccak256, Address, Bytes, B256, U256};
use alloy::sol_types::SolValue;
use serde::{Deserialize, Serialize};

/// Topic used for "KYC passed" claims.
pub const KYC_TOPIC: u64 = 1;

/// ECDSA signature scheme identifier (ERC-735).
pub const ECDSA_SCHEME: u64 = 1;

/// Deterministic claim identifier for an issuer/topic pair.
pub fn claim_id(issuer: Address, topic: u64) -> B256 {
    keccak256((issuer, U256::from(topic)).abi_encode())
}

/// Secp256k1 signature split as returned by the signing service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimSignature {
    pub r: B256,
    pub s: B256,
    pub v: u8,
}

impl ClaimSignature {
    /// Packed `r || s || v` form expected by `addClaim`.
    pub fn to_bytes(&self) -> Bytes {
        let mut packed = Vec::with_capacity(65);
        packed.extend_from_slice(self.r.as_slice());
        packed.extend_from_slice(self.s.as_slice());
        packed.push(self.v);
        Bytes::from(packed)
    }
}

/// Attestation obtained from the signing service, consumed once by the
/// claim writer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedClaim {
    /// Claim topic the issuer signed for.
    pub topic: u64,
    /// Issuer that produced the signature.
    pub issuer: Address,
    /// Hash of the claim payload.
    pub data_hash: B256,
    /// Issuer signature.
    pub signature: ClaimSignature,
}

/// Claim record as stored on the identity contract.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClaimRecord {
    pub topic: U256,
    pub scheme: U256,
    pub issuer: Address,
    pub signature: Bytes,
    pub data: Bytes,
    pub uri: String,
}

/// Why a present record does not count as KYC proof.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimMismatch {
    /// Stored issuer differs from the trusted issuer.
    Issuer { expected: Address, found: Address },
    /// Stored topic differs from the requested topic.
    Topic { expected: u64, found: U256 },
}

/// Classification of a claim read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimStatus {
    /// Record exists, issuer and topic match.
    Valid(ClaimRecord),
    /// No record (or a zero-issuer record).
    Absent,
    /// Record exists but fails a check. Treated as "no valid claim".
    Mismatch(ClaimMismatch),
}

impl ClaimStatus {
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }
}

/// Classify a record against the trusted issuer and topic.
///
/// `Address` equality is byte equality, so issuers parsed from
/// differently-cased hex strings compare equal.
pub fn classify(record: &ClaimRecord, expected_issuer: Address, topic: u64) -> ClaimStatus {
    if record.issuer.is_zero() {
        return ClaimStatus::Absent;
    }
    if record.issuer != expected_issuer {
        return ClaimStatus::Mismatch(ClaimMismatch::Issuer {
            expected: expected_issuer,
            found: record.issuer,
        });
    }
    if record.topic != U256::from(topic) {
        return ClaimStatus::Mismatch(ClaimMismatch::Topic {
            expected: topic,
            found: record.topic,
        });
    }
    ClaimStatus::Valid(record.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, b256};

    const ISSUER: Address = address!("3333333333333333333333333333333333333333");

    fn record(issuer: Address, topic: u64) -> ClaimRecord {
        ClaimRecord {
            topic: U256::from(topic),
            scheme: U256::from(ECDSA_SCHEME),
            issuer,
            ..ClaimRecord::default()
        }
    }

    #[test]
    fn test_claim_id_matches_abi_encode_layout() {
        let mut encoded = [0u8; 64];
        encoded[12..32].copy_from_slice(ISSUER.as_slice());
        encoded[63] = 1;
        assert_eq!(claim_id(ISSUER, KYC_TOPIC), keccak256(encoded));
    }

    #[test]
    fn test_claim_id_differs_by_topic() {
        assert_ne!(claim_id(ISSUER, 1), claim_id(ISSUER, 2));
    }

    #[test]
    fn test_matching_record_is_valid() {
        let status = classify(&record(ISSUER, KYC_TOPIC), ISSUER, KYC_TOPIC);
        assert!(status.is_valid());
    }

    #[test]
    fn test_issuer_comparison_ignores_hex_case() {
        let lower: Address = "0xabcdefabcdefabcdefabcdefabcdefabcdefabcd".parse().unwrap();
        let upper: Address = "0xABCDEFABCDEFABCDEFABCDEFABCDEFABCDEFABCD".parse().unwrap();
        let status = classify(&record(lower, KYC_TOPIC), upper, KYC_TOPIC);
        assert!(status.is_valid());
    }

    #[test]
    fn test_zero_issuer_is_absent() {
        let status = classify(&record(Address::ZERO, KYC_TOPIC), ISSUER, KYC_TOPIC);
        assert_eq!(status, ClaimStatus::Absent);
        let status = classify(&record(Address::ZERO, KYC_TOPIC), Address::ZERO, KYC_TOPIC);
        assert_eq!(status, ClaimStatus::Absent);
    }

    #[test]
    fn test_partial_matches_are_rejected() {
        let other = address!("4444444444444444444444444444444444444444");
        assert!(matches!(
            classify(&record(other, KYC_TOPIC), ISSUER, KYC_TOPIC),
            ClaimStatus::Mismatch(ClaimMismatch::Issuer { .. })
        ));
        assert!(matches!(
            classify(&record(ISSUER, 7), ISSUER, KYC_TOPIC),
            ClaimStatus::Mismatch(ClaimMismatch::Topic { expected: 1, .. })
        ));
    }

    #[test]
    fn test_signature_packing() {
        let sig = ClaimSignature {
            r: b256!("0101010101010101010101010101010101010101010101010101010101010101"),
            s: b256!("0202020202020202020202020202020202020202020202020202020202020202"),
            v: 27,
        };
        let packed = sig.to_bytes();
        assert_eq!(packed.len(), 65);
        assert_eq!(packed[0], 1);
        assert_eq!(packed[32], 2);
        assert_eq!(packed[64], 27);
    }
}
