//! TLS settings handed to the transport.
//!
//! Negotiation happens inside the transport; this module only carries the
//! mode and the certificate material the caller configured.

use crate::Error;

/// SSL mode matching the MySQL client `ssl-mode` option.
///
/// Numeric codes follow the client library (`OPT_SSL_MODE` 1..=5).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SslMode {
    /// No TLS
    Disabled,
    /// TLS when the server supports it
    #[default]
    Preferred,
    /// TLS required, certificate not verified
    Required,
    /// TLS required, certificate signed by a trusted CA
    VerifyCa,
    /// TLS required, CA verified and host name must match
    VerifyIdentity,
}

impl SslMode {
    /// Mode from the client library's numeric code
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            1 => Some(Self::Disabled),
            2 => Some(Self::Preferred),
            3 => Some(Self::Required),
            4 => Some(Self::VerifyCa),
            5 => Some(Self::VerifyIdentity),
            _ => None,
        }
    }

    /// Numeric code understood by the client library
    pub fn code(self) -> u64 {
        match self {
            Self::Disabled => 1,
            Self::Preferred => 2,
            Self::Required => 3,
            Self::VerifyCa => 4,
            Self::VerifyIdentity => 5,
        }
    }

    /// Whether this mode requires certificate verification
    pub fn requires_verification(&self) -> bool {
        matches!(self, Self::VerifyCa | Self::VerifyIdentity)
    }
}

impl std::fmt::Display for SslMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disabled => write!(f, "DISABLED"),
            Self::Preferred => write!(f, "PREFERRED"),
            Self::Required => write!(f, "REQUIRED"),
            Self::VerifyCa => write!(f, "VERIFY_CA"),
            Self::VerifyIdentity => write!(f, "VERIFY_IDENTITY"),
        }
    }
}

impl std::str::FromStr for SslMode {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "DISABLED" => Ok(Self::Disabled),
            "PREFERRED" => Ok(Self::Preferred),
            "REQUIRED" => Ok(Self::Required),
            "VERIFY_CA" => Ok(Self::VerifyCa),
            "VERIFY_IDENTITY" => Ok(Self::VerifyIdentity),
            _ => Err(Error::invalid(format!(
                "invalid ssl-mode '{}': expected DISABLED, PREFERRED, REQUIRED, VERIFY_CA, or VERIFY_IDENTITY",
                s
            ))),
        }
    }
}

/// Certificate material for the transport's TLS setup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SslMaterial {
    /// Client private key path
    pub key: Option<String>,
    /// Client certificate path
    pub cert: Option<String>,
    /// CA certificate path
    pub ca: Option<String>,
    /// CA directory
    pub ca_path: Option<String>,
    /// Allowed ciphers
    pub cipher: Option<String>,
}

impl SslMaterial {
    /// Whether any SSL option was given
    pub fn is_used(&self) -> bool {
        self.key.is_some()
            || self.cert.is_some()
            || self.ca.is_some()
            || self.ca_path.is_some()
            || self.cipher.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sslmode_codes() {
        for code in 1..=5 {
            assert_eq!(SslMode::from_code(code).unwrap().code(), code);
        }
        assert!(SslMode::from_code(0).is_none());
        assert!(SslMode::from_code(6).is_none());
    }

    #[test]
    fn test_sslmode_parse() {
        assert_eq!("required".parse::<SslMode>().unwrap(), SslMode::Required);
        assert_eq!("verify-ca".parse::<SslMode>().unwrap(), SslMode::VerifyCa);
        assert_eq!(
            "VERIFY_IDENTITY".parse::<SslMode>().unwrap(),
            SslMode::VerifyIdentity
        );
        assert!("bogus".parse::<SslMode>().is_err());
    }

    #[test]
    fn test_sslmode_default_is_preferred() {
        assert_eq!(SslMode::default(), SslMode::Preferred);
        assert!(!SslMode::Required.requires_verification());
        assert!(SslMode::VerifyIdentity.requires_verification());
    }

    #[test]
    fn test_material_usage() {
        assert!(!SslMaterial::default().is_used());
        let m = SslMaterial {
            ca: Some("/ca.pem".into()),
            ..Default::default()
        };
        assert!(m.is_used());
    }
}
