/// Beacon prefix emitted by the vehicle firmware.
pub const BEACON_PREFIX: &str = "ESP32|";

/// A parsed announcement: the vehicle's address on the local network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Beacon {
    pub ip: String,
    pub mac: String,
}

/// Parses `ESP32|<ip>|<mac>`. Anything else is discarded.
pub fn parse_beacon(msg: &str) -> Option<Beacon> {
    let rest = msg.trim_end().strip_prefix(BEACON_PREFIX)?;
    let mut fields = rest.split('|');
    let ip = fields.next().filter(|s| !s.is_empty())?;
    let mac = fields.next().filter(|s| !s.is_empty())?;
    Some(Beacon { ip: ip.to_string(), mac: mac.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_beacon() {
        let b = parse_beacon("ESP32|192.168.1.50|24:6F:28:AE:52:7C").unwrap();
        assert_eq!(b.ip, "192.168.1.50");
        assert_eq!(b.mac, "24:6F:28:AE:52:7C");
    }

    #[test]
    fn tolerates_trailing_newline() {
        let b = parse_beacon("ESP32|10.0.0.5|AA:BB:CC:DD:EE:FF\n").unwrap();
        assert_eq!(b.ip, "10.0.0.5");
    }

    #[test]
    fn rejects_wrong_prefix_and_missing_fields() {
        assert!(parse_beacon("ESP8266|10.0.0.5|AA").is_none());
        assert!(parse_beacon("ESP32|").is_none());
        assert!(parse_beacon("ESP32|10.0.0.5").is_none());
        assert!(parse_beacon("").is_none());
    }
}
