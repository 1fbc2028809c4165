use std::time::Duration;

use walletconnect_bridge::interactor::{Interactor, InteractorConfig};
use walletconnect_bridge::rpc::ChainId;
use walletconnect_bridge::session::Session;
use walletconnect_bridge::types::PeerMeta;

#[tokio::main]
async fn main() {
    // WalletConnect v1 URI - you can get it from a dApp that still speaks
    // the bridge protocol by choosing WalletConnect in its wallet selector
    let uri_from_dapp = "wc:217374f6-8735-472d-a743-23bd7d26d106@1?bridge=https%3A%2F%2Fbridge.walletconnect.org&key=6a4ca1a1a48d94984a80e235129488bba5e4b798b4b2c74ae1c3b30b3d18c20e";

    let session = Session::from_uri(uri_from_dapp).expect("invalid pairing uri");
    let interactor = Interactor::new(
        session,
        PeerMeta {
            name: "WalletConnect Bridge Rust SDK".to_string(),
            description: "Example wallet that approves the first session request"
                .to_string(),
            url: "https://github.com/example/walletconnect-bridge".to_string(),
            icons: vec![],
        },
        InteractorConfig::default(),
        None,
    );

    interactor.on_session_request(|id, param| {
        println!("session request {id} from {}", param.peer_meta.name);
    });
    interactor.on_disconnect(|error| {
        println!("disconnected: {error:?}");
    });
    interactor.ethereum().on_sign(|id, payload| {
        println!("sign request {id} for {}", payload.address());
    });
    interactor.ethereum().on_transaction(|id, event, transaction, _| {
        println!("{event} request {id} from {}", transaction.from);
    });

    interactor.connect().await.expect("connect failed");
    println!("connected, waiting for the dApp handshake...");

    // a real wallet would prompt the user from on_session_request; here we
    // poll and approve whatever shows up first
    while interactor.handshake_id() < 0 {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    let approval = interactor.session_approval(
        ChainId::from("1"),
        vec!["0xBA5BA3955463ADcc7aa3E33bbdfb8A68e0933dD8".to_string()],
    );
    interactor.approve_session(approval).await.expect("approve failed");
    println!("session approved as {}", interactor.client_id());

    tokio::time::sleep(Duration::from_secs(120)).await;
    interactor.disconnect().await;
}
