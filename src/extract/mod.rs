//! Transaction Data Extraction Module
//!
//! Decodes structured metadata out of the `data` field of observed
//! transactions. The field has the form `function@hexArg1@hexArg2...`,
//! base64 encoded. Decoders are pure functions registered per function name
//! in a dispatch table; logging happens here, not inside them.

mod decoders;

use crate::ObservedTransaction;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::debug;

pub use decoders::Extracted;

/// Function call encoded in a transaction's data field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataCall {
    pub function: String,
    pub args: Vec<String>,
}

impl DataCall {
    /// Parse a base64 data field; `None` when it is not a function call
    pub fn parse(data: &str) -> Option<Self> {
        let decoded = STANDARD.decode(data).ok()?;
        let text = String::from_utf8(decoded).ok()?;

        let mut parts = text.split('@');
        let function = parts.next()?.to_string();
        if function.is_empty() {
            return None;
        }

        Some(Self {
            function,
            args: parts.map(str::to_string).collect(),
        })
    }
}

type Decoder = fn(&ObservedTransaction, &DataCall) -> Option<Extracted>;

const DECODERS: &[(&str, Decoder)] = &[
    ("ESDTNFTCreate", decoders::nft_create),
    ("changeSFTToMetaESDT", decoders::sft_change),
    ("transferOwnership", decoders::transfer_ownership),
    ("controlChanges", decoders::control_changes),
];

/// Run the decoder registered for the transaction's function, if any
pub fn extract(transaction: &ObservedTransaction) -> Option<Extracted> {
    let call = DataCall::parse(transaction.data.as_deref()?)?;
    let (_, decoder) = DECODERS.iter().find(|(name, _)| *name == call.function)?;

    let extracted = decoder(transaction, &call);
    match &extracted {
        Some(metadata) => debug!(
            "Extracted {:?} from transaction '{}'",
            metadata, transaction.hash
        ),
        None => debug!(
            "Function '{}' of transaction '{}' did not match its decoder",
            call.function, transaction.hash
        ),
    }
    extracted
}
