use super::DataCall;
use crate::ObservedTransaction;

/// Metadata recognized in a transaction's data field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted {
    NftCreate { collection: String },
    SftChange { collection: String },
    TransferOwnership { identifier: String },
    ControlChanges { identifier: String },
}

fn hex_to_string(arg: &str) -> Option<String> {
    let bytes = hex::decode(arg).ok()?;
    String::from_utf8(bytes).ok().filter(|text| !text.is_empty())
}

/// `ESDTNFTCreate@collection@quantity@name@royalties@hash@attributes@uris..`,
/// only as a call to self
pub(super) fn nft_create(tx: &ObservedTransaction, call: &DataCall) -> Option<Extracted> {
    if tx.sender != tx.receiver || call.args.len() < 6 {
        return None;
    }

    Some(Extracted::NftCreate {
        collection: hex_to_string(&call.args[0])?,
    })
}

pub(super) fn sft_change(_tx: &ObservedTransaction, call: &DataCall) -> Option<Extracted> {
    Some(Extracted::SftChange {
        collection: hex_to_string(call.args.first()?)?,
    })
}

/// `transferOwnership@identifier@newOwner`
pub(super) fn transfer_ownership(_tx: &ObservedTransaction, call: &DataCall) -> Option<Extracted> {
    if call.args.len() < 2 {
        return None;
    }

    Some(Extracted::TransferOwnership {
        identifier: hex_to_string(&call.args[0])?,
    })
}

pub(super) fn control_changes(_tx: &ObservedTransaction, call: &DataCall) -> Option<Extracted> {
    Some(Extracted::ControlChanges {
        identifier: hex_to_string(call.args.first()?)?,
    })
}
