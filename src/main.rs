//! lnaddress-proxy - Lightning Address server
//!
//! Serves LUD6 pay requests for the registered users, issuing invoices from
//! each user's own node and wrapping them through an lnproxy relay.

use anyhow::{Context, Result};
use clap::Parser;
use lnaddress_proxy::backend;
use lnaddress_proxy::config::Args;
use lnaddress_proxy::server;
use lnaddress_proxy::{LnproxyClient, LnurlPayService, Registry, WrapVerifier};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    info!(
        "lnaddress-proxy starting... (domain: {}, registry: {:?})",
        args.domain, args.registry_dir
    );

    let backend_client = backend::http_client(args.backend_timeout())?;
    let registry = Registry::load_dir(
        &args.registry_dir,
        &args.domain,
        &backend_client,
        args.backend_timeout(),
    )
    .with_context(|| format!("Failed to load registry from {:?}", args.registry_dir))?;
    if registry.is_empty() {
        warn!("No addresses registered");
    }

    let wrapper = match args.lnproxy_url() {
        Some(url) => {
            let fees = args.routing_fees();
            info!(
                "Wrapping invoices through {} (base={} msat, ppm={})",
                url, fees.base_msat, fees.ppm
            );
            let proxy = LnproxyClient::new(url, args.proxy_timeout())?;
            Some(WrapVerifier::new(Arc::new(proxy), fees))
        }
        None => {
            warn!("lnproxy URL empty, invoices are returned unwrapped");
            None
        }
    };

    let service = LnurlPayService::new(Arc::new(registry), wrapper);

    let listener = tokio::net::TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("Failed to bind {}", args.listen))?;
    server::serve(listener, service).await?;

    warn!("Server stopped");
    Ok(())
}
