//! Connection options
//!
//! This module handles:
//! * The typed option value model
//! * Static registry tables mapping option names to handlers
//! * Construction-time type and range checks
//! * Full validation into a [`ValidatedOptions`] plan

pub mod names;
mod registry;
mod validator;
mod value;

pub use registry::{
    deprecated_ssl_setting, lookup, plugin_options, DeferredField, Handler, NativeOption,
    OptionSpec, PluginOptionSpec, SettingValue, StoredField, ValueKind,
};
pub use validator::{
    check_value, Credentials, Deferred, PluginSetting, ResultSetType, Setting, ValidatedOptions,
    ValidationContext, Validator,
};
pub use value::OptionValue;

use crate::endpoint::EndpointDescriptor;
use crate::{Error, Result};
use std::collections::BTreeMap;

/// Highest accepted endpoint priority
pub const MAX_PRIORITY: u16 = 100;

/// Named connection options plus an explicit host list
///
/// Option names are kept in sorted order, so validation walks them
/// deterministically. Values are type-checked against the registry as they
/// are inserted; unknown names are kept and later ignored.
///
/// # Examples
///
/// ```
/// use connector_wire::options::{names, ConnectOptions};
/// use std::time::Duration;
///
/// let opts = ConnectOptions::new()
///     .set(names::USER_NAME, "app")?
///     .set(names::CONNECT_TIMEOUT, Duration::from_secs(3))?
///     .set(names::MULTI_HOST, true)?
///     .host("db1.internal", Some(3306))
///     .priority(90)?
///     .host("db2.internal", Some(3306))
///     .priority(10)?;
///
/// assert_eq!(opts.hosts().len(), 2);
/// # Ok::<(), connector_wire::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConnectOptions {
    values: BTreeMap<String, OptionValue>,
    hosts: Vec<EndpointDescriptor>,
}

impl ConnectOptions {
    /// Create an empty option set
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an option, checking its value against the registry
    pub fn set(mut self, name: impl Into<String>, value: impl Into<OptionValue>) -> Result<Self> {
        self.insert(name, value)?;
        Ok(self)
    }

    /// Insert an option in place, checking its value against the registry
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<OptionValue>) -> Result<()> {
        let name = name.into();
        let value = value.into();
        if let Some(spec) = lookup(&name) {
            check_value(spec, &value)?;
        }
        self.values.insert(name, value);
        Ok(())
    }

    /// Remove an option
    pub fn remove(&mut self, name: &str) -> Option<OptionValue> {
        self.values.remove(name)
    }

    /// Get an option value
    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.values.get(name)
    }

    /// Whether an option is present
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Iterate options in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Append a TCP host to the explicit host list
    pub fn host(mut self, host: impl Into<String>, port: Option<u16>) -> Self {
        self.hosts.push(EndpointDescriptor::tcp(host, port));
        self
    }

    /// Append an endpoint of any protocol to the explicit host list
    pub fn endpoint(mut self, endpoint: EndpointDescriptor) -> Self {
        self.hosts.push(endpoint);
        self
    }

    /// Set the priority of the most recently added host
    pub fn priority(mut self, priority: u16) -> Result<Self> {
        if priority > MAX_PRIORITY {
            return Err(Error::invalid(format!(
                "priority {} out of range, expected 0-{}",
                priority, MAX_PRIORITY
            )));
        }
        let last = self
            .hosts
            .pop()
            .ok_or_else(|| Error::invalid("PRIORITY must follow a HOST"))?;
        self.hosts.push(last.with_priority(Some(priority)));
        Ok(self)
    }

    /// Explicit host list, in insertion order
    pub fn hosts(&self) -> &[EndpointDescriptor] {
        &self.hosts
    }

    /// Build options from a connection URI
    ///
    /// Query parameters are converted to typed values here, so malformed
    /// numbers fail at construction rather than at connect time.
    pub fn from_uri(uri: &str) -> Result<Self> {
        crate::client::ConnectionUri::parse(uri)?.into_options()
    }

    /// Build options from a JSON object of name/value pairs
    ///
    /// An optional `"hosts"` array of `{"host", "port", "priority"}` objects
    /// fills the explicit host list.
    pub fn from_json(json: &str) -> Result<Self> {
        #[derive(serde::Deserialize)]
        struct HostDoc {
            host: String,
            port: Option<u16>,
            priority: Option<u16>,
        }

        #[derive(serde::Deserialize)]
        struct Doc {
            #[serde(default)]
            hosts: Vec<HostDoc>,
            #[serde(flatten)]
            values: BTreeMap<String, OptionValue>,
        }

        let doc: Doc = serde_json::from_str(json)?;
        let mut opts = ConnectOptions::new();
        for (name, value) in doc.values {
            opts.insert(name, value)?;
        }
        for h in doc.hosts {
            opts = opts.host(h.host, h.port);
            if let Some(p) = h.priority {
                opts = opts.priority(p)?;
            }
        }
        Ok(opts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_set_checks_types_immediately() {
        let err = ConnectOptions::new()
            .set(names::RECONNECT, "yes")
            .unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { ref option, .. } if option == "OPT_RECONNECT"));
    }

    #[test]
    fn test_set_rejects_negative_timeout() {
        let err = ConnectOptions::new()
            .set(names::CONNECT_TIMEOUT, -5)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_unknown_options_are_kept() {
        let opts = ConnectOptions::new().set("futureOption", 42).unwrap();
        assert_eq!(opts.get("futureOption"), Some(&OptionValue::Int(42)));
    }

    #[test]
    fn test_priority_requires_host() {
        assert!(ConnectOptions::new().priority(1).is_err());
    }

    #[test]
    fn test_priority_range() {
        let opts = ConnectOptions::new().host("a", None);
        assert!(opts.clone().priority(100).is_ok());
        assert!(opts.priority(101).is_err());
    }

    #[test]
    fn test_options_iterate_in_name_order() {
        let opts = ConnectOptions::new()
            .set(names::USER_NAME, "u")
            .unwrap()
            .set(names::CONNECT_TIMEOUT, Duration::from_secs(1))
            .unwrap();
        let names: Vec<&str> = opts.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["OPT_CONNECT_TIMEOUT", "userName"]);
    }

    #[test]
    fn test_from_json() {
        let opts = ConnectOptions::from_json(
            r#"{
                "userName": "app",
                "OPT_CONNECT_TIMEOUT": 1500,
                "OPT_MULTI_HOST": true,
                "hosts": [
                    {"host": "db1", "port": 3307, "priority": 10},
                    {"host": "db2"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(opts.hosts().len(), 2);
        assert_eq!(opts.hosts()[0].priority(), Some(10));
        assert_eq!(opts.get(names::CONNECT_TIMEOUT), Some(&OptionValue::Int(1500)));
    }

    #[test]
    fn test_from_json_rejects_fractional_timeout() {
        let err = ConnectOptions::from_json(r#"{"OPT_READ_TIMEOUT": 10.5}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }
}
