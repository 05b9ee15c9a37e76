use std::net::{IpAddr, Ipv4Addr};

use nix::ifaddrs::getifaddrs;

use super::LatencyError;

/// First IPv4 address bound to `interface`.
pub fn interface_ipv4(interface: &str) -> Result<IpAddr, LatencyError> {
    getifaddrs()?
        .filter(|ifaddr| ifaddr.interface_name == interface)
        .find_map(|ifaddr| {
            ifaddr
                .address
                .as_ref()
                .and_then(|address| address.as_sockaddr_in())
                .map(|sin| IpAddr::V4(Ipv4Addr::from(sin.ip())))
        })
        .ok_or_else(|| LatencyError::InterfaceAddressNotFound(interface.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_interface_has_no_address() {
        let err = interface_ipv4("netshape-test-missing0").unwrap_err();
        assert!(matches!(err, LatencyError::InterfaceAddressNotFound(_)));
    }
}
