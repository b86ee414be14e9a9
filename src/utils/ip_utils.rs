use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

// Page views keep a coarse version of the client address so
// unique visitors can be estimated without storing the full
// IP. IPv4 loses its last octet, IPv6 keeps the first 48 bits.
pub fn anonymize_ip(ip: &IpAddr) -> String {
  match ip {
    IpAddr::V4(v4) => {
      let [a, b, c, _] = v4.octets();
      Ipv4Addr::new(a, b, c, 0).to_string()
    },
    IpAddr::V6(v6) => {
      // Loopback is left alone, it's not identifying anyone.
      if v6.is_loopback() {
        return v6.to_string();
      }
      let s = v6.segments();
      Ipv6Addr::new(s[0], s[1], s[2], 0, 0, 0, 0, 0).to_string()
    }
  }
}
