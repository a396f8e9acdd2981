//! TCP-dial connectivity probe
//!
//! Best-effort and deliberately cheap: a short-timeout TCP connect to the
//! origin host, with the last answer cached for a couple of seconds so
//! lifecycle callbacks can query freely without stacking up dials. Stale
//! answers are acceptable by contract.

use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use bithash_core::{BithashError, BithashResult};
use bithash_shell::NetworkProbe;
use url::Url;

const CONNECT_TIMEOUT: Duration = Duration::from_millis(250);
const CACHE_WINDOW: Duration = Duration::from_secs(2);

pub struct TcpProbe {
    host: String,
    port: u16,
    cached: Mutex<Option<(Instant, bool)>>,
}

impl TcpProbe {
    /// Probe against the host serving the configured origin
    pub fn for_origin(start_url: &str) -> BithashResult<Self> {
        let parsed = Url::parse(start_url)?;
        let host = parsed
            .host_str()
            .ok_or_else(|| BithashError::config(format!("Origin URL has no host: {}", start_url)))?
            .to_string();
        let port = parsed.port_or_known_default().unwrap_or(443);
        Ok(Self::new(host, port))
    }

    pub fn new(host: String, port: u16) -> Self {
        Self {
            host,
            port,
            cached: Mutex::new(None),
        }
    }

    fn dial(&self) -> bool {
        let addrs = match (self.host.as_str(), self.port).to_socket_addrs() {
            Ok(addrs) => addrs,
            Err(err) => {
                log::debug!("Probe resolution failed for {}: {}", self.host, err);
                return false;
            }
        };
        for addr in addrs {
            if TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT).is_ok() {
                return true;
            }
        }
        false
    }
}

impl NetworkProbe for TcpProbe {
    fn is_online(&self) -> bool {
        let mut cached = match self.cached.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some((when, answer)) = *cached {
            if when.elapsed() < CACHE_WINDOW {
                return answer;
            }
        }
        let answer = self.dial();
        *cached = Some((Instant::now(), answer));
        log::debug!("Connectivity probe against {}: {}", self.host, answer);
        answer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn test_probe_reaches_a_local_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let probe = TcpProbe::new("127.0.0.1".to_string(), port);
        assert!(probe.is_online());
    }

    #[test]
    fn test_probe_caches_across_a_listener_restart() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let probe = TcpProbe::new("127.0.0.1".to_string(), port);
        assert!(probe.is_online());

        // Within the freshness window the cached answer survives the
        // listener going away
        drop(listener);
        assert!(probe.is_online());
    }

    #[test]
    fn test_probe_rejects_origin_without_host() {
        assert!(TcpProbe::for_origin("data:text/plain,hello").is_err());
    }

    #[test]
    fn test_probe_derives_port_from_origin() {
        let probe = TcpProbe::for_origin("https://bithash.apps.adpumb.com/").unwrap();
        assert_eq!(probe.port, 443);
        assert_eq!(probe.host, "bithash.apps.adpumb.com");
    }
}
