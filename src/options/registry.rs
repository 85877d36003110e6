//! Static option tables
//!
//! Every external option name maps to exactly one [`OptionSpec`]: the value
//! shape it expects and the handler that consumes it. Lookups are data driven;
//! the validator never branches on option names directly.

use super::names::*;
use crate::connection::SslMode;
use crate::protocol::constants::{flags, plugins, CLIENT_VERSION_80000, CLIENT_VERSION_80011};
use std::fmt;
use std::time::Duration;

/// Option understood by the transport's typed setter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeOption {
    ConnectTimeout,
    ReadTimeout,
    WriteTimeout,
    LocalInfile,
    MaxAllowedPacket,
    NetBufferLength,
    SslMode,
    RetryCount,
    ReportDataTruncation,
    EnableCleartextPlugin,
    GetServerPublicKey,
    OptionalResultsetMetadata,
    CanHandleExpiredPasswords,
    Reconnect,
    SslVerifyServerCert,
    SslEnforce,
    SecureAuth,
    InitCommand,
    SslKey,
    SslCert,
    SslCa,
    SslCaPath,
    SslCipher,
    SslCrl,
    SslCrlPath,
    TlsVersion,
    ServerPublicKey,
    CharsetDir,
    CharsetName,
    PluginDir,
    DefaultAuth,
    ReadDefaultGroup,
    ReadDefaultFile,
    LoadDataLocalDir,
    ConnectAttrAdd,
    ConnectAttrDelete,
    ConnectAttrReset,
    /// Multi-factor password, factor 1..=3
    UserPassword(u8),
}

impl NativeOption {
    /// Translate the option id for the linked client library version.
    ///
    /// 8.0 client libraries before 8.0.11 numbered `GetServerPublicKey` and
    /// `RetryCount` the other way around.
    pub fn for_client(self, client_version: u32) -> Self {
        if (CLIENT_VERSION_80000..CLIENT_VERSION_80011).contains(&client_version) {
            match self {
                Self::GetServerPublicKey => return Self::RetryCount,
                Self::RetryCount => return Self::GetServerPublicKey,
                _ => {}
            }
        }
        self
    }
}

impl fmt::Display for NativeOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserPassword(n) => write!(f, "MYSQL_OPT_USER_PASSWORD({})", n),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Value handed to the transport's typed setter
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    Bool(bool),
    UInt(u64),
    Duration(Duration),
    Str(String),
    SslMode(SslMode),
    /// Key/value pair (connection attributes)
    Pair(String, String),
    /// No payload (reset style options)
    Unit,
}

/// Value shape an option expects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    /// Non-negative integer
    UInt,
    /// Non-negative integer milliseconds or a duration
    Timeout,
    Str,
    Map,
    List,
    /// Presence only; any value accepted
    Any,
    /// Boolean false or integer 0
    Disabled,
}

impl ValueKind {
    /// Expected type as printed in errors
    pub fn expected(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::UInt => "non-negative integer",
            Self::Timeout => "non-negative integer or duration",
            Self::Str => "string",
            Self::Map => "string map",
            Self::List => "string list",
            Self::Any => "any",
            Self::Disabled => "bool (false) or integer (0)",
        }
    }
}

/// Field stored by the validator for endpoint or credential construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoredField {
    HostName,
    User,
    Password,
    Port,
    Socket,
    Pipe,
    NamedPipe,
    Schema,
    CharacterSetResults,
    CharsetName,
    SslKey,
    SslCert,
    SslCa,
    SslCaPath,
    SslCipher,
    TlsVersion,
    StatementResultType,
    PreparedStatementResultType,
    DnsSrv,
    MultiHost,
    CanHandleExpiredPasswords,
    LegacyAuth,
    ConnectAttrAdd,
    ConnectAttrDelete,
    ConnectAttrReset,
    DeprecatedSslVerify,
    DeprecatedSslEnforce,
    PluginDir,
    OpenTelemetry,
}

/// Field applied only once a connection has succeeded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredField {
    Reconnect,
    PostInitCommand,
}

/// Authentication plugin option
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PluginOptionSpec {
    /// Plugin name
    pub plugin: &'static str,
    /// Plugin option key
    pub option: &'static str,
    /// Value restored when the connection option is absent
    pub default: Option<i64>,
    /// Message used when a non-default value is rejected
    pub error: &'static str,
}

/// What happens to an option once its type has been checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    /// Pass to the transport's typed setter
    Apply(NativeOption),
    /// OR into the client capability flags when true
    Flag(u64),
    /// Set on an authentication plugin under the plugin lock
    Plugin(PluginOptionSpec),
    /// Keep for endpoint, credential, or TLS construction
    Store(StoredField),
    /// Apply after the connection succeeds
    Defer(DeferredField),
}

/// Registry entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionSpec {
    pub name: &'static str,
    pub kind: ValueKind,
    pub handler: Handler,
}

const fn spec(name: &'static str, kind: ValueKind, handler: Handler) -> OptionSpec {
    OptionSpec {
        name,
        kind,
        handler,
    }
}

const fn store(name: &'static str, kind: ValueKind, field: StoredField) -> OptionSpec {
    spec(name, kind, Handler::Store(field))
}

/// Options with a dedicated handler
pub static EXPLICIT_OPTIONS: &[OptionSpec] = &[
    store(HOST_NAME, ValueKind::Str, StoredField::HostName),
    store(USER_NAME, ValueKind::Str, StoredField::User),
    store(PASSWORD, ValueKind::Str, StoredField::Password),
    spec(PASSWORD1, ValueKind::Str, Handler::Apply(NativeOption::UserPassword(1))),
    spec(PASSWORD2, ValueKind::Str, Handler::Apply(NativeOption::UserPassword(2))),
    spec(PASSWORD3, ValueKind::Str, Handler::Apply(NativeOption::UserPassword(3))),
    store(PORT, ValueKind::UInt, StoredField::Port),
    store(SOCKET, ValueKind::Str, StoredField::Socket),
    store(PIPE, ValueKind::Str, StoredField::Pipe),
    store(NAMED_PIPE, ValueKind::Any, StoredField::NamedPipe),
    store(SCHEMA, ValueKind::Str, StoredField::Schema),
    store(CHARACTER_SET_RESULTS, ValueKind::Str, StoredField::CharacterSetResults),
    store(CHARSET_NAME, ValueKind::Str, StoredField::CharsetName),
    store(SSL_KEY, ValueKind::Str, StoredField::SslKey),
    store("sslKey", ValueKind::Str, StoredField::SslKey),
    store(SSL_CERT, ValueKind::Str, StoredField::SslCert),
    store("sslCert", ValueKind::Str, StoredField::SslCert),
    store(SSL_CA, ValueKind::Str, StoredField::SslCa),
    store("sslCA", ValueKind::Str, StoredField::SslCa),
    store(SSL_CAPATH, ValueKind::Str, StoredField::SslCaPath),
    store("sslCAPath", ValueKind::Str, StoredField::SslCaPath),
    store(SSL_CIPHER, ValueKind::Str, StoredField::SslCipher),
    store("sslCipher", ValueKind::Str, StoredField::SslCipher),
    store(TLS_VERSION, ValueKind::Str, StoredField::TlsVersion),
    store("OPT_TLS_VERSION", ValueKind::Str, StoredField::TlsVersion),
    store(DEFAULT_STATEMENT_RESULT_TYPE, ValueKind::UInt, StoredField::StatementResultType),
    store(
        DEFAULT_PREPARED_STATEMENT_RESULT_TYPE,
        ValueKind::UInt,
        StoredField::PreparedStatementResultType,
    ),
    spec(RECONNECT, ValueKind::Bool, Handler::Defer(DeferredField::Reconnect)),
    spec(POST_INIT_COMMAND, ValueKind::Str, Handler::Defer(DeferredField::PostInitCommand)),
    store(DNS_SRV, ValueKind::Bool, StoredField::DnsSrv),
    store(MULTI_HOST, ValueKind::Bool, StoredField::MultiHost),
    store(
        CAN_HANDLE_EXPIRED_PASSWORDS,
        ValueKind::Bool,
        StoredField::CanHandleExpiredPasswords,
    ),
    store(LEGACY_AUTH, ValueKind::Bool, StoredField::LegacyAuth),
    store(CONNECT_ATTR_ADD, ValueKind::Map, StoredField::ConnectAttrAdd),
    store(CONNECT_ATTR_DELETE, ValueKind::List, StoredField::ConnectAttrDelete),
    store(CONNECT_ATTR_RESET, ValueKind::Any, StoredField::ConnectAttrReset),
    store(SSL_VERIFY, ValueKind::Bool, StoredField::DeprecatedSslVerify),
    store(SSL_ENFORCE, ValueKind::Bool, StoredField::DeprecatedSslEnforce),
    store(PLUGIN_DIR, ValueKind::Str, StoredField::PluginDir),
    store(OPENTELEMETRY, ValueKind::Disabled, StoredField::OpenTelemetry),
];

/// Boolean options passed straight to the transport
pub static BOOL_OPTIONS: &[OptionSpec] = &[
    spec(
        REPORT_DATA_TRUNCATION,
        ValueKind::Bool,
        Handler::Apply(NativeOption::ReportDataTruncation),
    ),
    spec(
        ENABLE_CLEARTEXT_PLUGIN,
        ValueKind::Bool,
        Handler::Apply(NativeOption::EnableCleartextPlugin),
    ),
    spec(
        GET_SERVER_PUBLIC_KEY,
        ValueKind::Bool,
        Handler::Apply(NativeOption::GetServerPublicKey),
    ),
    spec(
        OPTIONAL_RESULTSET_METADATA,
        ValueKind::Bool,
        Handler::Apply(NativeOption::OptionalResultsetMetadata),
    ),
];

/// Integer options passed straight to the transport
pub static INT_OPTIONS: &[OptionSpec] = &[
    spec(CONNECT_TIMEOUT, ValueKind::Timeout, Handler::Apply(NativeOption::ConnectTimeout)),
    spec("CONNECT_TIMEOUT", ValueKind::Timeout, Handler::Apply(NativeOption::ConnectTimeout)),
    spec(READ_TIMEOUT, ValueKind::Timeout, Handler::Apply(NativeOption::ReadTimeout)),
    spec("READ_TIMEOUT", ValueKind::Timeout, Handler::Apply(NativeOption::ReadTimeout)),
    spec(WRITE_TIMEOUT, ValueKind::Timeout, Handler::Apply(NativeOption::WriteTimeout)),
    spec("WRITE_TIMEOUT", ValueKind::Timeout, Handler::Apply(NativeOption::WriteTimeout)),
    spec(LOCAL_INFILE, ValueKind::UInt, Handler::Apply(NativeOption::LocalInfile)),
    spec(MAX_ALLOWED_PACKET, ValueKind::UInt, Handler::Apply(NativeOption::MaxAllowedPacket)),
    spec(NET_BUFFER_LENGTH, ValueKind::UInt, Handler::Apply(NativeOption::NetBufferLength)),
    spec(SSL_MODE, ValueKind::UInt, Handler::Apply(NativeOption::SslMode)),
    spec("OPT_SSL_MODE", ValueKind::UInt, Handler::Apply(NativeOption::SslMode)),
    spec(RETRY_COUNT, ValueKind::UInt, Handler::Apply(NativeOption::RetryCount)),
];

/// String options passed straight to the transport
pub static STRING_OPTIONS: &[OptionSpec] = &[
    spec(INIT_COMMAND, ValueKind::Str, Handler::Apply(NativeOption::InitCommand)),
    spec(SSL_CRL, ValueKind::Str, Handler::Apply(NativeOption::SslCrl)),
    spec("sslCRL", ValueKind::Str, Handler::Apply(NativeOption::SslCrl)),
    spec(SSL_CRLPATH, ValueKind::Str, Handler::Apply(NativeOption::SslCrlPath)),
    spec("sslCRLPath", ValueKind::Str, Handler::Apply(NativeOption::SslCrlPath)),
    spec(SERVER_PUBLIC_KEY, ValueKind::Str, Handler::Apply(NativeOption::ServerPublicKey)),
    spec(CHARSET_DIR, ValueKind::Str, Handler::Apply(NativeOption::CharsetDir)),
    spec(DEFAULT_AUTH, ValueKind::Str, Handler::Apply(NativeOption::DefaultAuth)),
    spec(READ_DEFAULT_GROUP, ValueKind::Str, Handler::Apply(NativeOption::ReadDefaultGroup)),
    spec(READ_DEFAULT_FILE, ValueKind::Str, Handler::Apply(NativeOption::ReadDefaultFile)),
    spec(LOAD_DATA_LOCAL_DIR, ValueKind::Str, Handler::Apply(NativeOption::LoadDataLocalDir)),
];

/// Boolean options that set client capability flags
pub static FLAG_OPTIONS: &[OptionSpec] = &[
    spec(CLIENT_COMPRESS, ValueKind::Bool, Handler::Flag(flags::CLIENT_COMPRESS)),
    spec(CLIENT_FOUND_ROWS, ValueKind::Bool, Handler::Flag(flags::CLIENT_FOUND_ROWS)),
    spec(CLIENT_IGNORE_SIGPIPE, ValueKind::Bool, Handler::Flag(flags::CLIENT_IGNORE_SIGPIPE)),
    spec(CLIENT_IGNORE_SPACE, ValueKind::Bool, Handler::Flag(flags::CLIENT_IGNORE_SPACE)),
    spec(CLIENT_INTERACTIVE, ValueKind::Bool, Handler::Flag(flags::CLIENT_INTERACTIVE)),
    spec(CLIENT_LOCAL_FILES, ValueKind::Bool, Handler::Flag(flags::CLIENT_LOCAL_FILES)),
    spec(
        CLIENT_MULTI_STATEMENTS,
        ValueKind::Bool,
        Handler::Flag(flags::CLIENT_MULTI_STATEMENTS),
    ),
    spec(CLIENT_NO_SCHEMA, ValueKind::Bool, Handler::Flag(flags::CLIENT_NO_SCHEMA)),
];

/// Authentication plugin options, reset to their default when not given
pub static PLUGIN_OPTIONS: &[OptionSpec] = &[
    spec(
        OCI_CONFIG_FILE,
        ValueKind::Str,
        Handler::Plugin(PluginOptionSpec {
            plugin: plugins::OCI_CLIENT,
            option: "oci-config-file",
            default: None,
            error: "Failed to set config file for authentication_oci_client plugin",
        }),
    ),
    spec(
        OCI_CLIENT_CONFIG_PROFILE,
        ValueKind::Str,
        Handler::Plugin(PluginOptionSpec {
            plugin: plugins::OCI_CLIENT,
            option: "authentication-oci-client-config-profile",
            default: None,
            error: "Failed to set config profile for authentication_oci_client plugin",
        }),
    ),
    spec(
        AUTHENTICATION_KERBEROS_CLIENT_MODE,
        ValueKind::Str,
        Handler::Plugin(PluginOptionSpec {
            plugin: plugins::KERBEROS_CLIENT,
            option: "plugin_authentication_kerberos_client_mode",
            default: None,
            error: "Failed to set mode for authentication_kerberos_client plugin",
        }),
    ),
    spec(
        OPENID_TOKEN_FILE,
        ValueKind::Str,
        Handler::Plugin(PluginOptionSpec {
            plugin: plugins::OPENID_CONNECT_CLIENT,
            option: "id-token-file",
            default: None,
            error: "Failed to set token file for authentication_openid_connect_client plugin",
        }),
    ),
    spec(
        WEBAUTHN_DEVICE_NUMBER,
        ValueKind::UInt,
        Handler::Plugin(PluginOptionSpec {
            plugin: plugins::WEBAUTHN_CLIENT,
            option: "device",
            default: Some(0),
            error: "Failed to set a WebAuthn authentication device",
        }),
    ),
];

/// Lookup order: explicit handlers first, then the typed tables.
static TABLES: &[&[OptionSpec]] = &[
    EXPLICIT_OPTIONS,
    INT_OPTIONS,
    BOOL_OPTIONS,
    STRING_OPTIONS,
    FLAG_OPTIONS,
    PLUGIN_OPTIONS,
];

/// Find the registry entry for an option name.
///
/// Returns `None` for names the registry does not know; callers ignore those.
pub fn lookup(name: &str) -> Option<&'static OptionSpec> {
    TABLES
        .iter()
        .flat_map(|table| table.iter())
        .find(|spec| spec.name == name && available(spec))
}

/// Iterate every plugin option entry available on this platform
pub fn plugin_options() -> impl Iterator<Item = &'static OptionSpec> {
    PLUGIN_OPTIONS.iter().filter(|spec| available(spec))
}

// The Kerberos plugin mode can only be set on Windows.
fn available(spec: &OptionSpec) -> bool {
    cfg!(windows) || spec.name != AUTHENTICATION_KERBEROS_CLIENT_MODE
}

/// SSL mode selected by the deprecated `sslVerify` / `sslEnforce` booleans.
///
/// Before 8.0 these map onto their own boolean transport options. From 8.0 on
/// both map onto the SSL mode; `sslVerify` asks for CA verification and
/// `sslEnforce` for a required connection. The pairing looks transposed next
/// to the pre-8.0 option names but both behaviors are kept as they are.
pub fn deprecated_ssl_setting(
    field: StoredField,
    enabled: bool,
    client_version: u32,
) -> Option<(NativeOption, SettingValue)> {
    let legacy = client_version < CLIENT_VERSION_80000;
    match (field, legacy) {
        (StoredField::DeprecatedSslVerify, true) => Some((
            NativeOption::SslVerifyServerCert,
            SettingValue::Bool(enabled),
        )),
        (StoredField::DeprecatedSslEnforce, true) => {
            Some((NativeOption::SslEnforce, SettingValue::Bool(enabled)))
        }
        (StoredField::DeprecatedSslVerify, false) => Some((
            NativeOption::SslMode,
            SettingValue::SslMode(if enabled {
                SslMode::VerifyCa
            } else {
                SslMode::Preferred
            }),
        )),
        (StoredField::DeprecatedSslEnforce, false) => Some((
            NativeOption::SslMode,
            SettingValue::SslMode(if enabled {
                SslMode::Required
            } else {
                SslMode::Preferred
            }),
        )),
        _ => None,
    }
}
