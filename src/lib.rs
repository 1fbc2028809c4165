pub mod constants;
pub mod crypto;
pub mod error;
pub mod event;
pub mod frame;
pub mod handlers;
pub mod interactor;
pub mod rpc;
pub mod session;
pub mod store;
pub mod subscription;
pub mod types;
///
/// Client for WalletConnect v1 style bridges
///
/// let session = Session::from_uri(uri_from_qr_code)?;
/// let interactor = Interactor::new(
///     session,
///     PeerMeta {
///         name: "WalletConnect Bridge Rust SDK".to_string(),
///         description: "Wallet side of an encrypted bridge session".to_string(),
///         url: "https://example.org".to_string(),
///         icons: vec![],
///     },
///     InteractorConfig::default(),
///     None,
/// );
/// interactor.on_session_request(|id, param| { /* prompt the user */ });
/// interactor.connect().await?;
pub use interactor::{ConnectionState, Interactor, InteractorConfig, ReconnectPolicy};
///
/// Exposed for easy access
pub use error::{Error, Result};
pub use event::WcEvent;
pub use session::{Session, SessionSource};
pub use types::PeerMeta;
