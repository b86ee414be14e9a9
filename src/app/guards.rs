use actix_web::guard::{Guard, GuardContext};
use std::net::IpAddr;
use log::warn;

// A guard makes the router skip the route, so refused
// clients get the same 404 as for an unknown endpoint.
// Only the socket peer address counts, never the
// forwarding headers, which the client controls.
#[derive(Clone)]
pub struct IPRestrictedGuard {
  allowed_ip_addresses: Vec<IpAddr>
}

impl IPRestrictedGuard {
  pub fn new(allowed_ips: &[&str]) -> Self {
    Self {
      allowed_ip_addresses: allowed_ips.iter()
        .filter_map(|ip| ip.parse().ok())
        .collect()
    }
  }
}

impl Guard for IPRestrictedGuard {
  fn check(&self, ctx: &GuardContext<'_>) -> bool {
    let head = ctx.head();
    match head.peer_addr {
      Some(sock_addr) => {
        let addr = sock_addr.ip();
        if self.allowed_ip_addresses.contains(&addr) {
          true
        } else {
          warn!("IP address {} attempted to reach protected \
            endpoint at {}", addr, head.uri);
          false
        }
      },
      None => false
    }
  }
}
