use std::net::IpAddr;

/// Protocol-level errors for the radar.
///
/// Wraps transport errors and adds table and configuration variants.
#[derive(Debug, thiserror::Error)]
pub enum RadarError {
    #[error("neighbor table full: no free id for {ip}")]
    TableFull { ip: IpAddr },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("transport error: {0}")]
    Transport(#[from] radar_transport::TransportError),

    #[error("radar runtime shut down")]
    Shutdown,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_display_table_full() {
        let err = RadarError::TableFull {
            ip: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7)),
        };
        assert_eq!(err.to_string(), "neighbor table full: no free id for 10.0.0.7");
    }

    #[test]
    fn test_display_config() {
        let err = RadarError::Config("max_neigh must be at least 1".into());
        assert_eq!(
            err.to_string(),
            "invalid configuration: max_neigh must be at least 1"
        );
    }

    #[test]
    fn test_display_transport() {
        let err: RadarError = radar_transport::TransportError::NoDevices.into();
        assert_eq!(
            err.to_string(),
            "transport error: no devices configured and responder disabled"
        );
    }

    #[test]
    fn test_display_shutdown() {
        assert_eq!(RadarError::Shutdown.to_string(), "radar runtime shut down");
    }
}
