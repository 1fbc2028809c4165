use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::rpc::ChainId;

/// Identity a peer presents during the handshake.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PeerMeta {
    pub name: String,
    pub description: String,
    pub url: String,
    pub icons: Vec<String>,
}

/// Params of `wc_sessionRequest` / `dc_sessionRequest`, wrapped in a
/// one-element array on the wire.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionRequestParams {
    #[serde(rename = "peerId")]
    pub peer_id: String,
    #[serde(rename = "peerMeta")]
    pub peer_meta: PeerMeta,
    #[serde(rename = "chainId", default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<ChainId>,
    #[serde(rename = "chainType", default, skip_serializing_if = "Option::is_none")]
    pub chain_type: Option<String>,
    #[serde(
        rename = "addressRequiredCoinTypes",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub address_required_coin_types: Option<Vec<u32>>,
}

/// Params of `wc_sessionUpdate`. The options serialize as explicit
/// `null`s: a kill update is `{"approved":false,"chainId":null,"accounts":null}`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionUpdateParams {
    pub approved: bool,
    #[serde(rename = "chainId")]
    pub chain_id: Option<ChainId>,
    pub accounts: Option<Vec<String>>,
}

impl SessionUpdateParams {
    /// The update sent by `killSession`.
    pub fn kill() -> SessionUpdateParams {
        SessionUpdateParams {
            approved: false,
            chain_id: None,
            accounts: None,
        }
    }
}

/// Result payload answering a `wc_sessionRequest`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionApproval {
    pub approved: bool,
    #[serde(rename = "chainId")]
    pub chain_id: ChainId,
    pub accounts: Vec<String>,
    #[serde(rename = "peerId", default, skip_serializing_if = "Option::is_none")]
    pub peer_id: Option<String>,
    #[serde(rename = "peerMeta", default, skip_serializing_if = "Option::is_none")]
    pub peer_meta: Option<PeerMeta>,
}

/// Decoded `eth_sign` family request. The raw strings are forwarded
/// untouched; interpreting them is the signer's business.
#[derive(Clone, Debug, PartialEq)]
pub enum EthereumSignPayload {
    Sign { address: String, data: String },
    PersonalSign { address: String, data: String },
    SignTypedData { address: String, data: String },
}

impl EthereumSignPayload {
    pub fn address(&self) -> &str {
        match self {
            EthereumSignPayload::Sign { address, .. }
            | EthereumSignPayload::PersonalSign { address, .. }
            | EthereumSignPayload::SignTypedData { address, .. } => address,
        }
    }

    pub fn data(&self) -> &str {
        match self {
            EthereumSignPayload::Sign { data, .. }
            | EthereumSignPayload::PersonalSign { data, .. }
            | EthereumSignPayload::SignTypedData { data, .. } => data,
        }
    }
}

/// Transaction object carried by `eth_signTransaction` / `eth_sendTransaction`.
/// Everything except `from` is optional in the wild.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EthereumTransaction {
    pub from: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    #[serde(rename = "gasPrice", default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas: Option<String>,
    #[serde(rename = "gasLimit", default, skip_serializing_if = "Option::is_none")]
    pub gas_limit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// Binance Chain standard sign message, the params of `bnb_sign`.
/// Field names follow the chain's JSON (snake_case).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BinanceOrder {
    pub account_number: String,
    pub chain_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    pub sequence: String,
    pub source: String,
    pub msgs: Vec<Value>,
}

/// Post-broadcast confirmation carried by `bnb_tx_confirmation`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BinanceTxConfirmation {
    pub ok: bool,
    #[serde(rename = "errorMsg", default, skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,
}

/// Cosmos/IBC transaction, the sole param element of `cosmos_sendTransaction`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct IbcTransaction {
    #[serde(rename = "signerAddress")]
    pub signer_address: String,
    #[serde(rename = "signDoc")]
    pub sign_doc: Value,
}
