/// Handlers
///
/// Stateless decoders for the chain families the bridge routes. Each
/// handler owns nothing but its observer callbacks: it decodes the
/// params for its methods and raises the typed callback, leaving
/// signing entirely to the application.
///
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::error::{Error, Result};
use crate::event::WcEvent;
use crate::types::{
    BinanceOrder, BinanceTxConfirmation, EthereumSignPayload, EthereumTransaction,
    IbcTransaction,
};

/// Replaceable observer closure. Callbacks are borrowed for the duration
/// of one invocation and never beyond; the application can swap or clear
/// them at any time.
pub(crate) struct CallbackSlot<F: ?Sized> {
    slot: Mutex<Option<Arc<F>>>,
}

impl<F: ?Sized> Default for CallbackSlot<F> {
    fn default() -> Self {
        CallbackSlot {
            slot: Mutex::new(None),
        }
    }
}

impl<F: ?Sized> CallbackSlot<F> {
    pub(crate) fn set(&self, f: Arc<F>) {
        *self.slot.lock().unwrap() = Some(f);
    }

    pub(crate) fn get(&self) -> Option<Arc<F>> {
        self.slot.lock().unwrap().clone()
    }
}

type EthSignCallback = dyn Fn(i64, EthereumSignPayload) + Send + Sync;
type EthTransactionCallback =
    dyn Fn(i64, WcEvent, EthereumTransaction, Option<u64>) + Send + Sync;

#[derive(Default)]
pub struct EthereumHandler {
    sign: CallbackSlot<EthSignCallback>,
    transaction: CallbackSlot<EthTransactionCallback>,
}

impl EthereumHandler {
    pub fn on_sign(&self, f: impl Fn(i64, EthereumSignPayload) + Send + Sync + 'static) {
        self.sign.set(Arc::new(f));
    }

    pub fn on_transaction(
        &self,
        f: impl Fn(i64, WcEvent, EthereumTransaction, Option<u64>) + Send + Sync + 'static,
    ) {
        self.transaction.set(Arc::new(f));
    }

    pub(crate) fn handle(
        &self,
        event: WcEvent,
        id: i64,
        params: &Value,
        timestamp: Option<u64>,
    ) -> Result<()> {
        match event {
            WcEvent::EthSign | WcEvent::PersonalSign | WcEvent::EthSignTypedData => {
                let parts = string_params(params)?;
                if parts.len() < 2 {
                    return Err(Error::BadJsonRpcRequest);
                }
                // personal_sign flips the pair: [data, address]
                let payload = match event {
                    WcEvent::EthSign => EthereumSignPayload::Sign {
                        address: parts[0].clone(),
                        data: parts[1].clone(),
                    },
                    WcEvent::PersonalSign => EthereumSignPayload::PersonalSign {
                        address: parts[1].clone(),
                        data: parts[0].clone(),
                    },
                    _ => EthereumSignPayload::SignTypedData {
                        address: parts[0].clone(),
                        data: parts[1].clone(),
                    },
                };
                if let Some(cb) = self.sign.get() {
                    cb(id, payload);
                }
                Ok(())
            }
            WcEvent::EthSignTransaction | WcEvent::EthSendTransaction => {
                let transactions: Vec<EthereumTransaction> =
                    serde_json::from_value(params.clone())?;
                let transaction = transactions
                    .into_iter()
                    .next()
                    .ok_or(Error::BadJsonRpcRequest)?;
                if let Some(cb) = self.transaction.get() {
                    cb(id, event, transaction, timestamp);
                }
                Ok(())
            }
            _ => Err(Error::Unknown),
        }
    }
}

type BnbSignCallback = dyn Fn(i64, BinanceOrder) + Send + Sync;
type BnbConfirmCallback = dyn Fn(i64, BinanceTxConfirmation) + Send + Sync;

#[derive(Default)]
pub struct BinanceHandler {
    sign: CallbackSlot<BnbSignCallback>,
    confirm: CallbackSlot<BnbConfirmCallback>,
}

impl BinanceHandler {
    pub fn on_sign(&self, f: impl Fn(i64, BinanceOrder) + Send + Sync + 'static) {
        self.sign.set(Arc::new(f));
    }

    pub fn on_confirm(&self, f: impl Fn(i64, BinanceTxConfirmation) + Send + Sync + 'static) {
        self.confirm.set(Arc::new(f));
    }

    pub(crate) fn handle(&self, event: WcEvent, id: i64, params: &Value) -> Result<()> {
        match event {
            WcEvent::BnbSign => {
                let orders: Vec<BinanceOrder> = serde_json::from_value(params.clone())?;
                let order = orders.into_iter().next().ok_or(Error::BadJsonRpcRequest)?;
                if let Some(cb) = self.sign.get() {
                    cb(id, order);
                }
                Ok(())
            }
            WcEvent::BnbTransactionConfirm => {
                let confirmations: Vec<BinanceTxConfirmation> =
                    serde_json::from_value(params.clone())?;
                let confirmation = confirmations
                    .into_iter()
                    .next()
                    .ok_or(Error::BadJsonRpcRequest)?;
                if let Some(cb) = self.confirm.get() {
                    cb(id, confirmation);
                }
                Ok(())
            }
            _ => Err(Error::Unknown),
        }
    }
}

type TrustSignCallback = dyn Fn(i64, Value, Option<u64>) + Send + Sync;
type GetAccountsCallback = dyn Fn(i64) + Send + Sync;

/// Trust custom methods are an opaque pass-through: the raw params reach
/// the application unchanged.
#[derive(Default)]
pub struct TrustHandler {
    sign_transaction: CallbackSlot<TrustSignCallback>,
    get_accounts: CallbackSlot<GetAccountsCallback>,
}

impl TrustHandler {
    pub fn on_sign_transaction(
        &self,
        f: impl Fn(i64, Value, Option<u64>) + Send + Sync + 'static,
    ) {
        self.sign_transaction.set(Arc::new(f));
    }

    pub fn on_get_accounts(&self, f: impl Fn(i64) + Send + Sync + 'static) {
        self.get_accounts.set(Arc::new(f));
    }

    pub(crate) fn handle(
        &self,
        event: WcEvent,
        id: i64,
        params: &Value,
        timestamp: Option<u64>,
    ) -> Result<()> {
        match event {
            WcEvent::TrustSignTransaction => {
                if let Some(cb) = self.sign_transaction.get() {
                    cb(id, params.clone(), timestamp);
                }
                Ok(())
            }
            WcEvent::GetAccounts => {
                if let Some(cb) = self.get_accounts.get() {
                    cb(id);
                }
                Ok(())
            }
            _ => Err(Error::Unknown),
        }
    }
}

type IbcTransactionCallback = dyn Fn(i64, IbcTransaction, Option<u64>) + Send + Sync;

#[derive(Default)]
pub struct IbcHandler {
    transaction: CallbackSlot<IbcTransactionCallback>,
}

impl IbcHandler {
    pub fn on_transaction(
        &self,
        f: impl Fn(i64, IbcTransaction, Option<u64>) + Send + Sync + 'static,
    ) {
        self.transaction.set(Arc::new(f));
    }

    pub(crate) fn handle(&self, id: i64, params: &Value, timestamp: Option<u64>) -> Result<()> {
        let transactions: Vec<IbcTransaction> = serde_json::from_value(params.clone())?;
        let transaction = transactions
            .into_iter()
            .next()
            .ok_or(Error::BadJsonRpcRequest)?;
        if let Some(cb) = self.transaction.get() {
            cb(id, transaction, timestamp);
        }
        Ok(())
    }
}

/// Decode a params array into raw strings, stringifying any non-string
/// element (dApps send `eth_signTypedData` payloads both ways).
fn string_params(params: &Value) -> Result<Vec<String>> {
    let items = params.as_array().ok_or(Error::BadJsonRpcRequest)?;
    if items.is_empty() {
        return Err(Error::BadJsonRpcRequest);
    }
    Ok(items
        .iter()
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use serde_json::json;

    use super::*;

    #[test]
    fn test_eth_sign_param_order() {
        let handler = EthereumHandler::default();
        let (tx, rx) = mpsc::channel();
        handler.on_sign(move |id, payload| tx.send((id, payload)).unwrap());

        handler
            .handle(WcEvent::EthSign, 5, &json!(["0xaddr", "0xdata"]), None)
            .unwrap();

        let (id, payload) = rx.try_recv().unwrap();
        assert_eq!(id, 5);
        assert_eq!(payload.address(), "0xaddr");
        assert_eq!(payload.data(), "0xdata");
    }

    #[test]
    fn test_personal_sign_flips_param_order() {
        let handler = EthereumHandler::default();
        let (tx, rx) = mpsc::channel();
        handler.on_sign(move |_, payload| tx.send(payload).unwrap());

        handler
            .handle(WcEvent::PersonalSign, 5, &json!(["0xdata", "0xaddr"]), None)
            .unwrap();

        let payload = rx.try_recv().unwrap();
        assert_eq!(payload.address(), "0xaddr");
        assert_eq!(payload.data(), "0xdata");
        assert!(matches!(payload, EthereumSignPayload::PersonalSign { .. }));
    }

    #[test]
    fn test_typed_data_object_param_is_stringified() {
        let handler = EthereumHandler::default();
        let (tx, rx) = mpsc::channel();
        handler.on_sign(move |_, payload| tx.send(payload).unwrap());

        handler
            .handle(
                WcEvent::EthSignTypedData,
                9,
                &json!(["0xaddr", {"types": {}, "domain": {}}]),
                None,
            )
            .unwrap();

        let payload = rx.try_recv().unwrap();
        assert_eq!(payload.address(), "0xaddr");
        assert!(payload.data().contains("domain"));
    }

    #[test]
    fn test_eth_empty_params_rejected() {
        let handler = EthereumHandler::default();
        assert_eq!(
            handler.handle(WcEvent::EthSign, 1, &json!([]), None),
            Err(Error::BadJsonRpcRequest)
        );
        assert_eq!(
            handler.handle(WcEvent::EthSendTransaction, 1, &json!([]), None),
            Err(Error::BadJsonRpcRequest)
        );
    }

    #[test]
    fn test_eth_transaction_takes_first_element() {
        let handler = EthereumHandler::default();
        let (tx, rx) = mpsc::channel();
        handler.on_transaction(move |id, event, transaction, ts| {
            tx.send((id, event, transaction, ts)).unwrap()
        });

        handler
            .handle(
                WcEvent::EthSendTransaction,
                7,
                &json!([{"from": "0xab", "to": "0xcd"}, {"from": "0xzz"}]),
                Some(123),
            )
            .unwrap();

        let (id, event, transaction, ts) = rx.try_recv().unwrap();
        assert_eq!(id, 7);
        assert_eq!(event, WcEvent::EthSendTransaction);
        assert_eq!(transaction.from, "0xab");
        assert_eq!(ts, Some(123));
    }

    #[test]
    fn test_missing_callback_is_not_an_error() {
        let handler = EthereumHandler::default();
        assert!(
            handler
                .handle(WcEvent::EthSign, 1, &json!(["0xa", "0xb"]), None)
                .is_ok()
        );
    }

    #[test]
    fn test_bnb_sign_decodes_order() {
        let handler = BinanceHandler::default();
        let (tx, rx) = mpsc::channel();
        handler.on_sign(move |id, order| tx.send((id, order)).unwrap());

        handler
            .handle(
                WcEvent::BnbSign,
                3,
                &json!([{
                    "account_number": "12",
                    "chain_id": "Binance-Chain-Tigris",
                    "sequence": "4",
                    "source": "1",
                    "msgs": []
                }]),
            )
            .unwrap();

        let (id, order) = rx.try_recv().unwrap();
        assert_eq!(id, 3);
        assert_eq!(order.sequence, "4");
    }

    #[test]
    fn test_bnb_confirmation() {
        let handler = BinanceHandler::default();
        let (tx, rx) = mpsc::channel();
        handler.on_confirm(move |_, confirmation| tx.send(confirmation).unwrap());

        handler
            .handle(
                WcEvent::BnbTransactionConfirm,
                4,
                &json!([{"ok": false, "errorMsg": "insufficient funds"}]),
            )
            .unwrap();

        let confirmation = rx.try_recv().unwrap();
        assert!(!confirmation.ok);
        assert_eq!(confirmation.error_msg.as_deref(), Some("insufficient funds"));
    }

    #[test]
    fn test_trust_passthrough_keeps_raw_params() {
        let handler = TrustHandler::default();
        let (tx, rx) = mpsc::channel();
        handler.on_sign_transaction(move |id, raw, ts| tx.send((id, raw, ts)).unwrap());

        let params = json!([{"network": 60, "transaction": "{}"}]);
        handler
            .handle(WcEvent::TrustSignTransaction, 8, &params, Some(9))
            .unwrap();

        let (id, raw, ts) = rx.try_recv().unwrap();
        assert_eq!(id, 8);
        assert_eq!(raw, params);
        assert_eq!(ts, Some(9));
    }

    #[test]
    fn test_ibc_transaction_decodes_sign_doc() {
        let handler = IbcHandler::default();
        let (tx, rx) = mpsc::channel();
        handler.on_transaction(move |id, transaction, _| tx.send((id, transaction)).unwrap());

        handler
            .handle(
                11,
                &json!([{"signerAddress": "cosmos1xyz", "signDoc": {"msgs": []}}]),
                None,
            )
            .unwrap();

        let (id, transaction) = rx.try_recv().unwrap();
        assert_eq!(id, 11);
        assert_eq!(transaction.signer_address, "cosmos1xyz");
    }

    #[test]
    fn test_ibc_empty_params_rejected() {
        let handler = IbcHandler::default();
        assert_eq!(
            handler.handle(11, &json!([]), None),
            Err(Error::BadJsonRpcRequest)
        );
    }
}
