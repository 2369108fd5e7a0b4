//! Lightning Address (LUD6) server with verified lnproxy invoice wrapping

pub mod backend;
pub mod config;
pub mod error;
pub mod invoice;
pub mod lnurl;
pub mod registry;
pub mod server;
pub mod wrap;

pub use backend::{
    create_backend, DescriptionCommitment, InvoiceBackend, NodeBackendConfig, NodeType,
};
pub use error::{BackendError, ConfigError, DecodeError, LnurlError, ValidationError, WrapError};
pub use invoice::{decode, DecodedInvoice, PaymentHashCommitment};
pub use lnurl::{LnurlPayService, LnurlResponse, PaymentAddress};
pub use registry::{Registration, Registry};
pub use wrap::{LnproxyClient, RoutingFees, WrapVerifier, WrappingProxy};
