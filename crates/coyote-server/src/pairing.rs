//! Pairing code content and local address discovery.

use std::net::{IpAddr, Ipv4Addr, UdpSocket};

/// Prefix the DG-LAB app expects in a pairing QR code.
const PAIRING_PREFIX: &str = "https://www.dungeon-lab.com/app-download.php#DGLAB-SOCKET#";

/// Text encoded in the pairing QR code.
pub fn pairing_url(host: &str, port: u16, client_id: &str) -> String {
    format!("{PAIRING_PREFIX}ws://{host}:{port}/{client_id}")
}

/// Whether `ip` lies in 10.0.0.0/8 or 192.168.0.0/16.
pub fn is_lan_address(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    a == 10 || (a == 192 && b == 168)
}

/// The LAN IPv4 address this machine routes outbound traffic from.
///
/// Connecting a UDP socket sends nothing; it only asks the OS to pick a
/// source address.
pub fn detect_lan_address() -> Option<Ipv4Addr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).ok()?;
    socket.connect((Ipv4Addr::new(192, 168, 0, 1), 9)).ok()?;
    match socket.local_addr().ok()?.ip() {
        IpAddr::V4(ip) if is_lan_address(ip) => Some(ip),
        _ => None,
    }
}
