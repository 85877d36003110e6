//! Option validation
//!
//! Turns a [`ConnectOptions`] map into a [`ValidatedOptions`] plan: typed
//! transport settings in application order, plugin settings, credentials,
//! the endpoint set and the options deferred until after connect. All checks
//! happen here, before any network activity, and the first failure wins.

use super::registry::{
    deprecated_ssl_setting, lookup, plugin_options, DeferredField, Handler, NativeOption,
    OptionSpec, PluginOptionSpec, SettingValue, StoredField, ValueKind,
};
use super::{names, ConnectOptions, OptionValue};
use crate::client::{parse_host_list, ConnectionUri};
use crate::connection::{SslMaterial, SslMode};
use crate::endpoint::{EndpointDescriptor, EndpointSet, Protocol};
use crate::plugin::PluginValue;
use crate::protocol::constants::{
    flags, CLIENT_VERSION_80000, DEFAULT_CHARSET, DEFAULT_PORT,
};
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::time::Duration;

/// Connection attributes always sent by this connector
pub const DEFAULT_CONNECT_ATTRS: &[(&str, &str)] = &[
    ("_connector_name", "connector-wire"),
    ("_connector_version", env!("CARGO_PKG_VERSION")),
    ("_connector_license", "MIT OR Apache-2.0"),
];

/// Default named pipe when only `OPT_NAMED_PIPE` is given
const DEFAULT_PIPE_NAME: &str = "MySQL";

/// One typed transport setting
#[derive(Debug, Clone, PartialEq)]
pub struct Setting {
    /// Option name as supplied by the caller
    pub option: String,
    /// Transport option
    pub native: NativeOption,
    /// Typed value
    pub value: SettingValue,
    /// Value is the default/no-op one; a transport rejection is not an error
    pub is_default: bool,
    /// Transport rejection is never an error (reported by the server instead)
    pub tolerate_rejection: bool,
}

impl Setting {
    fn new(option: impl Into<String>, native: NativeOption, value: SettingValue) -> Self {
        let is_default = matches!(
            value,
            SettingValue::Bool(false) | SettingValue::UInt(0)
        ) || matches!(value, SettingValue::Duration(d) if d.is_zero());
        Self {
            option: option.into(),
            native,
            value,
            is_default,
            tolerate_rejection: false,
        }
    }

    fn defaulted(mut self) -> Self {
        self.is_default = true;
        self
    }

    fn tolerant(mut self) -> Self {
        self.tolerate_rejection = true;
        self
    }
}

/// One authentication plugin setting
#[derive(Debug, Clone)]
pub struct PluginSetting {
    /// Connection option name
    pub option: &'static str,
    /// Registry entry
    pub spec: PluginOptionSpec,
    /// Value to set
    pub value: PluginValue,
    /// True when resetting to the plugin default
    pub is_default: bool,
}

/// Credentials used by every connect attempt
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// User name
    pub user: String,
    /// Password (optional)
    pub password: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Options applied once the connection has been established
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Deferred {
    /// Reconnect flag, if the caller set one
    pub reconnect: Option<bool>,
    /// Statement executed right after connecting
    pub post_init: Option<String>,
}

/// Default result set type for statements created on the connection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResultSetType {
    /// Forward-only cursor
    #[default]
    ForwardOnly,
    /// Buffered, scrollable
    ScrollInsensitive,
}

impl ResultSetType {
    fn from_code(option: &str, code: u64) -> Result<Self> {
        match code {
            0 => Ok(Self::ForwardOnly),
            1 => Ok(Self::ScrollInsensitive),
            2 => Err(Error::invalid(format!(
                "Invalid value {} for option {}. TYPE_SCROLL_SENSITIVE is not supported",
                code, option
            ))),
            _ => Err(Error::invalid(format!(
                "Invalid value {} for option {}",
                code, option
            ))),
        }
    }
}

/// Inputs from outside the option map
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    /// Linked client library version (e.g. 80033)
    pub client_version: u32,
    /// Driver-wide plugin directory, used when `pluginDir` is not given
    pub default_plugin_dir: Option<&'a str>,
}

impl Default for ValidationContext<'_> {
    fn default() -> Self {
        Self {
            client_version: 80040,
            default_plugin_dir: None,
        }
    }
}

/// Fully validated connection plan
#[derive(Debug, Clone)]
pub struct ValidatedOptions {
    /// Plugin directory; applied before anything plugin related
    pub plugin_dir: Option<Setting>,
    /// Transport settings in application order
    pub settings: Vec<Setting>,
    /// Authentication plugin settings, applied under the plugin lock
    pub plugin_settings: Vec<PluginSetting>,
    /// Connection character set
    pub charset: String,
    /// Result character set
    pub character_set_results: String,
    /// TLS material
    pub ssl: SslMaterial,
    /// SSL mode, re-applied after the TLS material
    pub ssl_mode: Option<Setting>,
    /// Client capability flags
    pub flags: u64,
    /// Credentials
    pub credentials: Credentials,
    /// Candidate endpoints
    pub endpoints: EndpointSet,
    /// DNS SRV mode
    pub dns_srv: bool,
    /// Multi-host mode
    pub multi_host: bool,
    /// Per-attempt connect timeout
    pub connect_timeout: Option<Duration>,
    /// Rewrite "password expired" failures
    pub can_handle_expired_passwords: bool,
    /// Default statement result type
    pub statement_result_type: ResultSetType,
    /// Post-connect options
    pub deferred: Deferred,
}

/// Check a value against its registry entry.
///
/// Used both when options are inserted and during validation.
pub fn check_value(spec: &OptionSpec, value: &OptionValue) -> Result<()> {
    match spec.kind {
        ValueKind::Bool => expect_bool(spec, value).map(drop),
        ValueKind::UInt => expect_uint(spec, value).map(drop),
        ValueKind::Timeout => expect_timeout(spec, value).map(drop),
        ValueKind::Str => expect_str(spec, value).map(drop),
        ValueKind::Map => expect_map(spec, value).map(drop),
        ValueKind::List => expect_list(spec, value).map(drop),
        ValueKind::Any => Ok(()),
        ValueKind::Disabled => expect_disabled(spec, value),
    }
}

fn expect_bool(spec: &OptionSpec, value: &OptionValue) -> Result<bool> {
    match value {
        OptionValue::Bool(b) => Ok(*b),
        _ => Err(Error::type_mismatch(spec.name, spec.kind.expected())),
    }
}

fn expect_uint(spec: &OptionSpec, value: &OptionValue) -> Result<u64> {
    match value {
        OptionValue::Int(i) if *i >= 0 => Ok(*i as u64),
        OptionValue::Int(i) => Err(Error::invalid(format!(
            "negative value {} for option {}",
            i, spec.name
        ))),
        OptionValue::Float(x) => Err(Error::invalid(format!(
            "fractional value {} for option {}, expected {}",
            x,
            spec.name,
            spec.kind.expected()
        ))),
        _ => Err(Error::type_mismatch(spec.name, spec.kind.expected())),
    }
}

fn expect_timeout(spec: &OptionSpec, value: &OptionValue) -> Result<Duration> {
    match value {
        OptionValue::Duration(d) => Ok(*d),
        other => expect_uint(spec, other).map(Duration::from_millis),
    }
}

fn expect_str<'v>(spec: &OptionSpec, value: &'v OptionValue) -> Result<&'v str> {
    match value {
        OptionValue::Str(s) => Ok(s),
        _ => Err(Error::type_mismatch(spec.name, spec.kind.expected())),
    }
}

fn expect_map<'v>(
    spec: &OptionSpec,
    value: &'v OptionValue,
) -> Result<&'v BTreeMap<String, String>> {
    match value {
        OptionValue::Map(m) => Ok(m),
        _ => Err(Error::type_mismatch(spec.name, spec.kind.expected())),
    }
}

fn expect_list<'v>(spec: &OptionSpec, value: &'v OptionValue) -> Result<&'v [String]> {
    match value {
        OptionValue::List(l) => Ok(l),
        _ => Err(Error::type_mismatch(spec.name, spec.kind.expected())),
    }
}

fn expect_disabled(spec: &OptionSpec, value: &OptionValue) -> Result<()> {
    match value {
        OptionValue::Bool(false) | OptionValue::Int(0) => Ok(()),
        OptionValue::Bool(true) | OptionValue::Int(_) => Err(Error::UnsupportedOption {
            option: spec.name.to_string(),
            message: format!("{} can only be disabled on this platform", spec.name),
        }),
        _ => Err(Error::type_mismatch(spec.name, spec.kind.expected())),
    }
}

fn ssl_mode_from(spec: &OptionSpec, value: &OptionValue) -> Result<SslMode> {
    let code = expect_uint(spec, value)?;
    SslMode::from_code(code).ok_or_else(|| {
        Error::invalid(format!("invalid value {} for option {}", code, spec.name))
    })
}

/// Endpoint inputs collected while walking the options
#[derive(Debug, Default)]
struct EndpointInputs {
    from_host_name: Vec<EndpointDescriptor>,
    local: Option<EndpointDescriptor>,
    default_port: Option<u16>,
    schema: Option<String>,
}

/// Option validator
///
/// Walks the options once, in name order, dispatching each entry through its
/// registry handler. Unknown names are skipped.
#[derive(Debug)]
pub struct Validator<'a> {
    ctx: ValidationContext<'a>,
}

impl<'a> Validator<'a> {
    /// Create a validator for the given context
    pub fn new(ctx: ValidationContext<'a>) -> Self {
        Self { ctx }
    }

    /// Validate an option set
    pub fn validate(&self, options: &ConnectOptions) -> Result<ValidatedOptions> {
        let mut plan = ValidatedOptions {
            plugin_dir: None,
            settings: Vec::new(),
            plugin_settings: Vec::new(),
            charset: DEFAULT_CHARSET.to_string(),
            character_set_results: DEFAULT_CHARSET.to_string(),
            ssl: SslMaterial::default(),
            ssl_mode: None,
            flags: flags::CLIENT_MULTI_RESULTS,
            credentials: Credentials::default(),
            endpoints: EndpointSet::default(),
            dns_srv: false,
            multi_host: false,
            connect_timeout: None,
            can_handle_expired_passwords: false,
            statement_result_type: ResultSetType::default(),
            deferred: Deferred::default(),
        };
        let mut user: Option<String> = None;
        let mut inputs = EndpointInputs::default();
        let mut legacy_auth: Option<bool> = None;

        for (key, value) in DEFAULT_CONNECT_ATTRS {
            plan.settings.push(
                Setting::new(
                    "default connection attributes",
                    NativeOption::ConnectAttrAdd,
                    SettingValue::Pair(key.to_string(), value.to_string()),
                )
                .defaulted(),
            );
        }

        // hostName goes first so individually given options override the URI
        let mut merged = None;
        if let Some(value) = options.get(names::HOST_NAME) {
            let spec = registry_entry(names::HOST_NAME)?;
            let host_name = expect_str(spec, value)?;
            if host_name.contains("://") {
                let uri = ConnectionUri::parse(host_name)?;
                user = uri.user;
                plan.credentials.password = uri.password;
                inputs.schema = uri.schema;
                plan.dns_srv = uri.srv;
                inputs.from_host_name = uri.hosts;
                if !uri.params.is_empty() {
                    let mut with_params = options.clone();
                    for (name, value) in uri.params {
                        if !with_params.contains(&name) {
                            with_params.insert(name, value)?;
                        }
                    }
                    merged = Some(with_params);
                }
            } else {
                inputs.from_host_name = parse_host_list(host_name)?;
            }
        }
        let options = merged.as_ref().unwrap_or(options);

        plan.plugin_dir = self.plugin_dir(options)?;

        for (name, value) in options.iter() {
            let Some(spec) = lookup(name) else {
                tracing::debug!(option = name, "ignoring unknown connection option");
                continue;
            };
            check_value(spec, value)?;

            match spec.handler {
                Handler::Apply(native) => {
                    let setting = self.typed_setting(spec, native, value)?;
                    if native == NativeOption::ConnectTimeout {
                        if let SettingValue::Duration(d) = setting.value {
                            plan.connect_timeout = (!d.is_zero()).then_some(d);
                        }
                    }
                    if native == NativeOption::SslMode {
                        plan.ssl_mode = Some(setting.clone());
                    }
                    plan.settings.push(setting);
                }
                Handler::Flag(bit) => {
                    if expect_bool(spec, value)? {
                        plan.flags |= bit;
                    }
                }
                Handler::Plugin(_) => {
                    // collected below, after the loop, in registry order
                }
                Handler::Defer(DeferredField::Reconnect) => {
                    plan.deferred.reconnect = Some(expect_bool(spec, value)?);
                }
                Handler::Defer(DeferredField::PostInitCommand) => {
                    let cmd = expect_str(spec, value)?;
                    plan.deferred.post_init = (!cmd.is_empty()).then(|| cmd.to_string());
                }
                Handler::Store(field) => self.store(
                    spec,
                    field,
                    value,
                    &mut plan,
                    &mut user,
                    &mut inputs,
                    &mut legacy_auth,
                )?,
            }
        }

        if self.ctx.client_version < CLIENT_VERSION_80000 {
            let setting = Setting::new(
                names::LEGACY_AUTH,
                NativeOption::SecureAuth,
                SettingValue::Bool(!legacy_auth.unwrap_or(false)),
            );
            plan.settings.push(if legacy_auth.is_some() {
                setting
            } else {
                setting.defaulted()
            });
        }

        plan.plugin_settings = self.plugin_settings(options)?;
        plan.credentials.user = user.unwrap_or_else(whoami::username);
        plan.endpoints = self.endpoints(options, inputs, plan.dns_srv)?;
        self.check_exclusions(options, &plan)?;

        tracing::debug!(
            endpoints = plan.endpoints.len(),
            dns_srv = plan.dns_srv,
            multi_host = plan.multi_host,
            settings = plan.settings.len(),
            "connection options validated"
        );
        Ok(plan)
    }

    fn plugin_dir(&self, options: &ConnectOptions) -> Result<Option<Setting>> {
        let dir = match options.get(names::PLUGIN_DIR) {
            Some(value) => {
                let spec = registry_entry(names::PLUGIN_DIR)?;
                Some(expect_str(spec, value)?.to_string())
            }
            None => self.ctx.default_plugin_dir.map(str::to_string),
        };
        Ok(dir.map(|d| {
            Setting::new(names::PLUGIN_DIR, NativeOption::PluginDir, SettingValue::Str(d))
        }))
    }

    fn typed_setting(
        &self,
        spec: &OptionSpec,
        native: NativeOption,
        value: &OptionValue,
    ) -> Result<Setting> {
        let native = native.for_client(self.ctx.client_version);
        let typed = match (spec.kind, native) {
            (ValueKind::UInt, NativeOption::SslMode) => {
                SettingValue::SslMode(ssl_mode_from(spec, value)?)
            }
            (ValueKind::Bool, _) => SettingValue::Bool(expect_bool(spec, value)?),
            (ValueKind::UInt, _) => SettingValue::UInt(expect_uint(spec, value)?),
            (ValueKind::Timeout, _) => SettingValue::Duration(expect_timeout(spec, value)?),
            (ValueKind::Str, _) => SettingValue::Str(expect_str(spec, value)?.to_string()),
            _ => return Err(Error::type_mismatch(spec.name, spec.kind.expected())),
        };
        Ok(Setting::new(spec.name, native, typed))
    }

    #[allow(clippy::too_many_arguments)]
    fn store(
        &self,
        spec: &OptionSpec,
        field: StoredField,
        value: &OptionValue,
        plan: &mut ValidatedOptions,
        user: &mut Option<String>,
        inputs: &mut EndpointInputs,
        legacy_auth: &mut Option<bool>,
    ) -> Result<()> {
        match field {
            // handled before the loop
            StoredField::HostName | StoredField::PluginDir => {}
            StoredField::User => *user = Some(expect_str(spec, value)?.to_string()),
            StoredField::Password => {
                plan.credentials.password = Some(expect_str(spec, value)?.to_string())
            }
            StoredField::Port => {
                let port = expect_uint(spec, value)?;
                let port = u16::try_from(port).map_err(|_| {
                    Error::invalid(format!("port {} out of range", port))
                })?;
                inputs.default_port = Some(port);
            }
            StoredField::Socket => {
                inputs.local = Some(EndpointDescriptor::socket(expect_str(spec, value)?));
            }
            StoredField::Pipe => {
                inputs.local = Some(EndpointDescriptor::pipe(expect_str(spec, value)?));
            }
            StoredField::NamedPipe => {
                let keep_name = inputs
                    .local
                    .as_ref()
                    .filter(|e| e.protocol() == Protocol::Pipe)
                    .is_some();
                if !keep_name {
                    inputs.local = Some(EndpointDescriptor::pipe(DEFAULT_PIPE_NAME));
                }
            }
            StoredField::Schema => inputs.schema = Some(expect_str(spec, value)?.to_string()),
            StoredField::CharacterSetResults => {
                plan.character_set_results = expect_str(spec, value)?.to_string()
            }
            StoredField::CharsetName => plan.charset = expect_str(spec, value)?.to_string(),
            StoredField::SslKey => plan.ssl.key = Some(expect_str(spec, value)?.to_string()),
            StoredField::SslCert => plan.ssl.cert = Some(expect_str(spec, value)?.to_string()),
            StoredField::SslCa => plan.ssl.ca = Some(expect_str(spec, value)?.to_string()),
            StoredField::SslCaPath => {
                plan.ssl.ca_path = Some(expect_str(spec, value)?.to_string())
            }
            StoredField::SslCipher => {
                plan.ssl.cipher = Some(expect_str(spec, value)?.to_string())
            }
            StoredField::TlsVersion => {
                // The server reports an unusable TLS version at connect time.
                plan.settings.push(
                    Setting::new(
                        spec.name,
                        NativeOption::TlsVersion,
                        SettingValue::Str(expect_str(spec, value)?.to_string()),
                    )
                    .tolerant(),
                );
            }
            StoredField::StatementResultType => {
                plan.statement_result_type =
                    ResultSetType::from_code(spec.name, expect_uint(spec, value)?)?;
            }
            StoredField::PreparedStatementResultType => {
                return Err(Error::UnsupportedOption {
                    option: spec.name.to_string(),
                    message: format!("{} parameter still not implemented", spec.name),
                });
            }
            StoredField::DnsSrv => plan.dns_srv = expect_bool(spec, value)?,
            StoredField::MultiHost => plan.multi_host = expect_bool(spec, value)?,
            StoredField::CanHandleExpiredPasswords => {
                let enabled = expect_bool(spec, value)?;
                plan.can_handle_expired_passwords = enabled;
                plan.settings.push(Setting::new(
                    spec.name,
                    NativeOption::CanHandleExpiredPasswords,
                    SettingValue::Bool(enabled),
                ));
            }
            StoredField::LegacyAuth => *legacy_auth = Some(expect_bool(spec, value)?),
            StoredField::ConnectAttrAdd => {
                for (k, v) in expect_map(spec, value)? {
                    if is_default_attr(k) {
                        continue;
                    }
                    plan.settings.push(Setting::new(
                        spec.name,
                        NativeOption::ConnectAttrAdd,
                        SettingValue::Pair(k.clone(), v.clone()),
                    ));
                }
            }
            StoredField::ConnectAttrDelete => {
                for k in expect_list(spec, value)? {
                    if is_default_attr(k) {
                        continue;
                    }
                    plan.settings.push(Setting::new(
                        spec.name,
                        NativeOption::ConnectAttrDelete,
                        SettingValue::Str(k.clone()),
                    ));
                }
            }
            StoredField::ConnectAttrReset => plan.settings.push(Setting::new(
                spec.name,
                NativeOption::ConnectAttrReset,
                SettingValue::Unit,
            )),
            StoredField::DeprecatedSslVerify | StoredField::DeprecatedSslEnforce => {
                let enabled = expect_bool(spec, value)?;
                if let Some((native, typed)) =
                    deprecated_ssl_setting(field, enabled, self.ctx.client_version)
                {
                    let mut setting = Setting::new(spec.name, native, typed);
                    setting.is_default = false;
                    if native == NativeOption::SslMode {
                        plan.ssl_mode = Some(setting.clone());
                    }
                    plan.settings.push(setting);
                }
            }
            StoredField::OpenTelemetry => expect_disabled(spec, value)?,
        }
        Ok(())
    }

    fn plugin_settings(&self, options: &ConnectOptions) -> Result<Vec<PluginSetting>> {
        let mut out = Vec::new();
        for spec in plugin_options() {
            let Handler::Plugin(plugin) = spec.handler else {
                continue;
            };
            let (value, is_default) = match options.get(spec.name) {
                Some(v) => {
                    let value = match spec.kind {
                        ValueKind::UInt => {
                            let n = expect_uint(spec, v)?;
                            PluginValue::Int(i64::try_from(n).map_err(|_| {
                                Error::invalid(format!(
                                    "value {} out of range for option {}",
                                    n, spec.name
                                ))
                            })?)
                        }
                        _ => PluginValue::Str(expect_str(spec, v)?.to_string()),
                    };
                    (value, false)
                }
                None => (
                    plugin.default.map(PluginValue::Int).unwrap_or(PluginValue::Reset),
                    true,
                ),
            };
            out.push(PluginSetting {
                option: spec.name,
                spec: plugin,
                value,
                is_default,
            });
        }
        Ok(out)
    }

    fn endpoints(
        &self,
        options: &ConnectOptions,
        inputs: EndpointInputs,
        dns_srv: bool,
    ) -> Result<EndpointSet> {
        let mut list = inputs.from_host_name;
        list.extend(options.hosts().iter().cloned());
        if let Some(local) = inputs.local {
            list = vec![local];
        }

        if list.is_empty() && dns_srv {
            return Err(Error::invalid("No hostname specified for DNS SRV lookup."));
        }
        if list.is_empty() {
            list.push(EndpointDescriptor::tcp("localhost", None));
        }

        for endpoint in &list {
            endpoint.validate()?;
            match endpoint.protocol() {
                Protocol::Socket if cfg!(windows) => {
                    return Err(Error::invalid(
                        "Invalid for this platform protocol requested(MYSQL_PROTOCOL_SOCKET)",
                    ));
                }
                Protocol::Pipe if !cfg!(windows) => {
                    return Err(Error::invalid(
                        "Invalid for this platform protocol requested(MYSQL_PROTOCOL_PIPE)",
                    ));
                }
                _ => {}
            }
        }

        Ok(EndpointSet::new(
            list,
            inputs.default_port.unwrap_or(DEFAULT_PORT),
            inputs.schema,
        ))
    }

    fn check_exclusions(&self, options: &ConnectOptions, plan: &ValidatedOptions) -> Result<()> {
        let count = plan.endpoints.len();

        if plan.dns_srv && plan.multi_host {
            return Err(Error::invalid(
                "DNS SRV lookup cannot be combined with OPT_MULTI_HOST.",
            ));
        }
        if !plan.multi_host && count > 1 {
            return Err(Error::invalid("Missing option OPT_MULTI_HOST = true"));
        }
        if !plan.dns_srv {
            return Ok(());
        }

        if count > 1 {
            return Err(Error::invalid(
                "Specifying multiple hostnames with DNS SRV look up is not allowed.",
            ));
        }
        if let Some(host) = plan.endpoints.iter().next() {
            match host.protocol() {
                Protocol::Socket => {
                    return Err(Error::invalid(
                        "Using Unix domain sockets with DNS SRV lookup is not allowed.",
                    ))
                }
                Protocol::Pipe => {
                    return Err(Error::invalid(
                        "Using pipe with DNS SRV lookup is not allowed.",
                    ))
                }
                Protocol::Tcp => {}
            }
            if host.has_port() || options.contains(names::PORT) {
                return Err(Error::invalid(
                    "Specifying a port number with DNS SRV lookup is not allowed.",
                ));
            }
        }
        Ok(())
    }
}

fn registry_entry(name: &str) -> Result<&'static OptionSpec> {
    lookup(name).ok_or_else(|| Error::invalid(format!("option {} is not registered", name)))
}

fn is_default_attr(key: &str) -> bool {
    DEFAULT_CONNECT_ATTRS.iter().any(|(k, _)| *k == key)
}
