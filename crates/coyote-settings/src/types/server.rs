use serde::{Deserialize, Serialize};

/// WebSocket relay settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Address the app should dial, embedded in the pairing URL.
    ///
    /// When unset the first private IPv4 address of this machine is used.
    pub public_address: Option<String>,
    /// Outbound frames buffered per connection before sends fail.
    pub send_queue_size: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9999,
            public_address: None,
            send_queue_size: 256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_binds_all_interfaces() {
        let s = ServerSettings::default();
        assert_eq!(s.host, "0.0.0.0");
        assert_eq!(s.port, 9999);
        assert!(s.public_address.is_none());
    }

    #[test]
    fn camel_case_keys() {
        let s: ServerSettings =
            serde_json::from_str(r#"{"publicAddress": "192.168.1.5", "sendQueueSize": 8}"#)
                .unwrap();
        assert_eq!(s.public_address.as_deref(), Some("192.168.1.5"));
        assert_eq!(s.send_queue_size, 8);
    }
}
