/// Event
///
/// The closed set of method strings the bridge routes. Anything outside
/// this set with a numeric id is surfaced to the application as a custom
/// request instead.
///
use std::fmt::Display;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WcEvent {
    SessionRequest,
    SessionUpdate,
    // Crypto.com extension aliases
    DcSessionRequest,
    DcSessionUpdate,
    DcInstantRequest,
    DcKillSession,

    EthSign,
    PersonalSign,
    EthSignTypedData,
    EthSignTransaction,
    EthSendTransaction,

    BnbSign,
    BnbTransactionConfirm,

    TrustSignTransaction,
    GetAccounts,

    CosmosSendTransaction,
}

impl WcEvent {
    pub fn from_method(method: &str) -> Option<WcEvent> {
        Some(match method {
            "wc_sessionRequest" => WcEvent::SessionRequest,
            "wc_sessionUpdate" => WcEvent::SessionUpdate,
            "dc_sessionRequest" => WcEvent::DcSessionRequest,
            "dc_sessionUpdate" => WcEvent::DcSessionUpdate,
            "dc_instantRequest" => WcEvent::DcInstantRequest,
            "dc_killSession" => WcEvent::DcKillSession,

            "eth_sign" => WcEvent::EthSign,
            "personal_sign" => WcEvent::PersonalSign,
            "eth_signTypedData"
            | "eth_signTypedData_v2"
            | "eth_signTypedData_v3"
            | "eth_signTypedData_v4" => WcEvent::EthSignTypedData,
            "eth_signTransaction" => WcEvent::EthSignTransaction,
            "eth_sendTransaction" => WcEvent::EthSendTransaction,

            "bnb_sign" => WcEvent::BnbSign,
            "bnb_tx_confirmation" => WcEvent::BnbTransactionConfirm,

            "trust_signTransaction" => WcEvent::TrustSignTransaction,
            "get_accounts" => WcEvent::GetAccounts,

            "cosmos_sendTransaction" => WcEvent::CosmosSendTransaction,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WcEvent::SessionRequest => "wc_sessionRequest",
            WcEvent::SessionUpdate => "wc_sessionUpdate",
            WcEvent::DcSessionRequest => "dc_sessionRequest",
            WcEvent::DcSessionUpdate => "dc_sessionUpdate",
            WcEvent::DcInstantRequest => "dc_instantRequest",
            WcEvent::DcKillSession => "dc_killSession",

            WcEvent::EthSign => "eth_sign",
            WcEvent::PersonalSign => "personal_sign",
            WcEvent::EthSignTypedData => "eth_signTypedData",
            WcEvent::EthSignTransaction => "eth_signTransaction",
            WcEvent::EthSendTransaction => "eth_sendTransaction",

            WcEvent::BnbSign => "bnb_sign",
            WcEvent::BnbTransactionConfirm => "bnb_tx_confirmation",

            WcEvent::TrustSignTransaction => "trust_signTransaction",
            WcEvent::GetAccounts => "get_accounts",

            WcEvent::CosmosSendTransaction => "cosmos_sendTransaction",
        }
    }
}

impl Display for WcEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_canonical_methods() {
        for event in [
            WcEvent::SessionRequest,
            WcEvent::SessionUpdate,
            WcEvent::DcKillSession,
            WcEvent::EthSign,
            WcEvent::PersonalSign,
            WcEvent::EthSendTransaction,
            WcEvent::BnbSign,
            WcEvent::TrustSignTransaction,
            WcEvent::CosmosSendTransaction,
        ] {
            assert_eq!(WcEvent::from_method(event.as_str()), Some(event));
        }
    }

    #[test]
    fn test_typed_data_version_aliases() {
        for method in [
            "eth_signTypedData",
            "eth_signTypedData_v2",
            "eth_signTypedData_v3",
            "eth_signTypedData_v4",
        ] {
            assert_eq!(WcEvent::from_method(method), Some(WcEvent::EthSignTypedData));
        }
    }

    #[test]
    fn test_unknown_method_is_none() {
        assert_eq!(WcEvent::from_method("my_custom"), None);
        assert_eq!(WcEvent::from_method("eth_signTypedData_v5"), None);
        assert_eq!(WcEvent::from_method(""), None);
    }
}
