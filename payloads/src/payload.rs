//! Classify and decode untagged payloads.

use crate::{governance, token_bridge, Error};
use binlayout_codec::{deserialize, serialize, Discriminator, Layout, Value};
use bytes::Bytes;
use std::sync::OnceLock;
use tracing::debug;

/// Every payload understood by this crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    CoreContractUpgrade,
    GuardianSetUpgrade,
    SetMessageFee,
    TransferFees,
    RecoverChainId,
    RegisterChain,
    TokenBridgeContractUpgrade,
    Transfer,
    AttestMeta,
    TransferWithPayload,
}

impl PayloadKind {
    /// All kinds, in classifier order.
    pub const ALL: [PayloadKind; 10] = [
        PayloadKind::CoreContractUpgrade,
        PayloadKind::GuardianSetUpgrade,
        PayloadKind::SetMessageFee,
        PayloadKind::TransferFees,
        PayloadKind::RecoverChainId,
        PayloadKind::RegisterChain,
        PayloadKind::TokenBridgeContractUpgrade,
        PayloadKind::Transfer,
        PayloadKind::AttestMeta,
        PayloadKind::TransferWithPayload,
    ];

    /// Returns the layout of this kind of payload.
    pub fn layout(&self) -> Layout {
        match self {
            PayloadKind::CoreContractUpgrade => governance::core_contract_upgrade(),
            PayloadKind::GuardianSetUpgrade => governance::guardian_set_upgrade(),
            PayloadKind::SetMessageFee => governance::set_message_fee(),
            PayloadKind::TransferFees => governance::transfer_fees(),
            PayloadKind::RecoverChainId => governance::recover_chain_id(),
            PayloadKind::RegisterChain => governance::register_chain(),
            PayloadKind::TokenBridgeContractUpgrade => governance::token_bridge_contract_upgrade(),
            PayloadKind::Transfer => token_bridge::transfer(),
            PayloadKind::AttestMeta => token_bridge::attest_meta(),
            PayloadKind::TransferWithPayload => token_bridge::transfer_with_payload(),
        }
    }

    /// Returns true for governance actions.
    pub fn is_governance(&self) -> bool {
        !matches!(
            self,
            PayloadKind::Transfer | PayloadKind::AttestMeta | PayloadKind::TransferWithPayload
        )
    }
}

struct Classifier {
    layouts: Vec<Layout>,
    discriminator: Discriminator,
}

static CLASSIFIER: OnceLock<Result<Classifier, binlayout_codec::Error>> = OnceLock::new();

fn classifier() -> Result<&'static Classifier, Error> {
    CLASSIFIER
        .get_or_init(|| {
            let layouts: Vec<Layout> = PayloadKind::ALL.iter().map(|kind| kind.layout()).collect();
            let discriminator = Discriminator::new(&layouts, false)?;
            Ok(Classifier {
                layouts,
                discriminator,
            })
        })
        .as_ref()
        .map_err(|err| Error::Codec(err.clone()))
}

/// A decoded payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Payload {
    pub kind: PayloadKind,
    pub value: Value,
}

impl Payload {
    /// Identifies the kind of `bytes` and decodes it.
    pub fn parse(bytes: &[u8]) -> Result<Self, Error> {
        let classifier = classifier()?;
        let Some(index) = classifier.discriminator.discriminate(bytes) else {
            debug!(len = bytes.len(), "no payload layout matches");
            return Err(Error::UnknownPayload);
        };
        let kind = PayloadKind::ALL[index];
        let value = deserialize(&classifier.layouts[index], bytes)?;
        debug!(?kind, len = bytes.len(), "parsed payload");
        Ok(Self { kind, value })
    }

    /// Decodes `bytes` as a payload of the given kind.
    pub fn parse_as(kind: PayloadKind, bytes: &[u8]) -> Result<Self, Error> {
        let value = deserialize(&kind.layout(), bytes).map_err(|err| {
            debug!(?kind, ?err, "payload does not match");
            Error::KindMismatch(kind)
        })?;
        Ok(Self { kind, value })
    }

    /// Encodes the payload.
    pub fn encode(&self) -> Result<Bytes, Error> {
        Ok(serialize(&self.kind.layout(), &self.value)?.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::governance::{CORE_MODULE, TOKEN_BRIDGE_MODULE};
    use test_case::test_case;
    use tracing::Level;

    fn traced() {
        let _ = tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .with_test_writer()
            .try_init();
    }

    fn governance(module: [u8; 32], action: u8, body: &[u8]) -> Vec<u8> {
        let mut bytes = module.to_vec();
        bytes.push(action);
        bytes.extend_from_slice(&[0x00, 0x00]);
        bytes.extend_from_slice(body);
        bytes
    }

    fn transfer(id: u8, tail: &[u8]) -> Vec<u8> {
        let mut bytes = vec![id];
        bytes.extend_from_slice(&[0x01; 32]);
        bytes.extend_from_slice(&[0x02; 32]);
        bytes.extend_from_slice(&[0x00, 0x02]);
        bytes.extend_from_slice(&[0x03; 32]);
        bytes.extend_from_slice(&[0x00, 0x04]);
        bytes.extend_from_slice(tail);
        bytes
    }

    #[test]
    fn test_classifier_is_distinguishing() {
        assert!(classifier().unwrap().discriminator.is_distinguishing());
    }

    #[test_case(governance(CORE_MODULE, 1, &[0xAA; 32]), PayloadKind::CoreContractUpgrade; "core contract upgrade")]
    #[test_case(governance(CORE_MODULE, 2, &[&[0u8, 0, 0, 1, 1][..], &[0x55; 20][..]].concat()), PayloadKind::GuardianSetUpgrade; "guardian set upgrade")]
    #[test_case(governance(CORE_MODULE, 3, &[0x01; 32]), PayloadKind::SetMessageFee; "set message fee")]
    #[test_case(governance(CORE_MODULE, 4, &[0x01; 64]), PayloadKind::TransferFees; "transfer fees")]
    #[test_case(governance(CORE_MODULE, 5, &[0x01; 34]), PayloadKind::RecoverChainId; "recover chain id")]
    #[test_case(governance(TOKEN_BRIDGE_MODULE, 1, &[0x07; 34]), PayloadKind::RegisterChain; "register chain")]
    #[test_case(governance(TOKEN_BRIDGE_MODULE, 2, &[0xAA; 32]), PayloadKind::TokenBridgeContractUpgrade; "token bridge contract upgrade")]
    #[test_case(transfer(1, &[0x00; 32]), PayloadKind::Transfer; "transfer")]
    #[test_case(transfer(3, &[0x05; 40]), PayloadKind::TransferWithPayload; "transfer with payload")]
    fn test_parse(bytes: Vec<u8>, kind: PayloadKind) {
        traced();
        let payload = Payload::parse(&bytes).unwrap();
        assert_eq!(payload.kind, kind);
        assert_eq!(&payload.encode().unwrap()[..], &bytes[..]);
        assert_eq!(payload.kind.is_governance(), bytes[0] == 0);
    }

    #[test]
    fn test_unknown() {
        traced();
        assert_eq!(Payload::parse(&[]), Err(Error::UnknownPayload));
        assert_eq!(
            Payload::parse(&governance(CORE_MODULE, 9, &[0xAA; 32])),
            Err(Error::UnknownPayload)
        );
        // A transfer missing its fee
        assert_eq!(
            Payload::parse(&transfer(1, &[])),
            Err(Error::UnknownPayload)
        );
    }

    #[test]
    fn test_parse_as() {
        traced();
        let bytes = governance(CORE_MODULE, 1, &[0xAA; 32]);
        assert!(Payload::parse_as(PayloadKind::CoreContractUpgrade, &bytes).is_ok());
        assert_eq!(
            Payload::parse_as(PayloadKind::TokenBridgeContractUpgrade, &bytes),
            Err(Error::KindMismatch(PayloadKind::TokenBridgeContractUpgrade))
        );
    }
}
