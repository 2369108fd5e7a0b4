//! Process configuration from flags and environment.

use crate::wrap::RoutingFees;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Command-line arguments for the server
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Address to bind the HTTP server to
    #[arg(long, env = "LNADDR_LISTEN", default_value = "127.0.0.1:4760")]
    pub listen: SocketAddr,

    /// Domain (host[:port]) of the Lightning Addresses served
    #[arg(long, env = "LNADDR_DOMAIN", default_value = "example.com")]
    pub domain: String,

    /// Directory holding `user/` and `node/` records
    #[arg(long, env = "LNADDR_REGISTRY_DIR", default_value = ".")]
    pub registry_dir: PathBuf,

    /// lnproxy relay URL; empty disables wrapping
    #[arg(long, env = "LNADDR_LNPROXY_URL", default_value = "https://lnproxy.org/spec")]
    pub lnproxy_url: String,

    /// Base routing budget granted to the relay, in msat
    #[arg(long, env = "LNADDR_LNPROXY_ROUTING_BASE", default_value_t = 2_000)]
    pub lnproxy_routing_base: u64,

    /// Proportional routing budget granted to the relay, in ppm
    #[arg(long, env = "LNADDR_LNPROXY_ROUTING_PPM", default_value_t = 10_000)]
    pub lnproxy_routing_ppm: u64,

    /// Timeout for node backend calls, in seconds
    #[arg(long, env = "LNADDR_BACKEND_TIMEOUT_SECS", default_value_t = 25)]
    pub backend_timeout_secs: u64,

    /// Timeout for relay calls, in seconds
    #[arg(long, env = "LNADDR_PROXY_TIMEOUT_SECS", default_value_t = 15)]
    pub proxy_timeout_secs: u64,
}

impl Args {
    /// Relay URL, or `None` when wrapping is disabled.
    pub fn lnproxy_url(&self) -> Option<&str> {
        Some(self.lnproxy_url.trim()).filter(|url| !url.is_empty())
    }

    pub fn routing_fees(&self) -> RoutingFees {
        RoutingFees {
            base_msat: self.lnproxy_routing_base,
            ppm: self.lnproxy_routing_ppm,
        }
    }

    pub fn backend_timeout(&self) -> Duration {
        Duration::from_secs(self.backend_timeout_secs)
    }

    pub fn proxy_timeout(&self) -> Duration {
        Duration::from_secs(self.proxy_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["lnaddress-proxy"]).unwrap();
        assert_eq!(args.listen, "127.0.0.1:4760".parse().unwrap());
        assert_eq!(args.lnproxy_url(), Some("https://lnproxy.org/spec"));
        assert_eq!(
            args.routing_fees(),
            RoutingFees {
                base_msat: 2_000,
                ppm: 10_000
            }
        );
        assert_eq!(args.backend_timeout(), Duration::from_secs(25));
        assert_eq!(args.proxy_timeout(), Duration::from_secs(15));
    }

    #[test]
    fn empty_proxy_url_disables_wrapping() {
        let args = Args::try_parse_from(["lnaddress-proxy", "--lnproxy-url", ""]).unwrap();
        assert_eq!(args.lnproxy_url(), None);
    }
}
