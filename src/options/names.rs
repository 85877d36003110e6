//! Connection option names
//!
//! External names accepted in a [`ConnectOptions`](super::ConnectOptions) map.

pub const HOST_NAME: &str = "hostName";
pub const USER_NAME: &str = "userName";
pub const PASSWORD: &str = "password";
pub const PASSWORD1: &str = "password1";
pub const PASSWORD2: &str = "password2";
pub const PASSWORD3: &str = "password3";
pub const PORT: &str = "port";
pub const SOCKET: &str = "socket";
pub const PIPE: &str = "pipe";
pub const SCHEMA: &str = "schema";
pub const CHARACTER_SET_RESULTS: &str = "characterSetResults";

pub const SSL_KEY: &str = "ssl-key";
pub const SSL_CERT: &str = "ssl-cert";
pub const SSL_CA: &str = "ssl-ca";
pub const SSL_CAPATH: &str = "ssl-capath";
pub const SSL_CIPHER: &str = "ssl-cipher";
pub const SSL_CRL: &str = "ssl-crl";
pub const SSL_CRLPATH: &str = "ssl-crlpath";
pub const SSL_MODE: &str = "ssl-mode";
pub const TLS_VERSION: &str = "tls-version";
/// Deprecated, version dependent
pub const SSL_VERIFY: &str = "sslVerify";
/// Deprecated, version dependent
pub const SSL_ENFORCE: &str = "sslEnforce";

pub const DEFAULT_STATEMENT_RESULT_TYPE: &str = "defaultStatementResultType";
pub const DEFAULT_PREPARED_STATEMENT_RESULT_TYPE: &str = "defaultPreparedStatementResultType";

pub const RECONNECT: &str = "OPT_RECONNECT";
pub const DNS_SRV: &str = "OPT_DNS_SRV";
pub const MULTI_HOST: &str = "OPT_MULTI_HOST";
pub const CHARSET_NAME: &str = "OPT_CHARSET_NAME";
pub const NAMED_PIPE: &str = "OPT_NAMED_PIPE";
pub const CAN_HANDLE_EXPIRED_PASSWORDS: &str = "OPT_CAN_HANDLE_EXPIRED_PASSWORDS";
pub const POST_INIT_COMMAND: &str = "postInit";
pub const INIT_COMMAND: &str = "preInit";
pub const LEGACY_AUTH: &str = "useLegacyAuth";
pub const CONNECT_ATTR_ADD: &str = "OPT_CONNECT_ATTR_ADD";
pub const CONNECT_ATTR_DELETE: &str = "OPT_CONNECT_ATTR_DELETE";
pub const CONNECT_ATTR_RESET: &str = "OPT_CONNECT_ATTR_RESET";
pub const PLUGIN_DIR: &str = "pluginDir";
pub const OPENTELEMETRY: &str = "OPT_OPENTELEMETRY";

pub const CONNECT_TIMEOUT: &str = "OPT_CONNECT_TIMEOUT";
pub const READ_TIMEOUT: &str = "OPT_READ_TIMEOUT";
pub const WRITE_TIMEOUT: &str = "OPT_WRITE_TIMEOUT";
pub const LOCAL_INFILE: &str = "OPT_LOCAL_INFILE";
pub const MAX_ALLOWED_PACKET: &str = "OPT_MAX_ALLOWED_PACKET";
pub const NET_BUFFER_LENGTH: &str = "OPT_NET_BUFFER_LENGTH";
pub const RETRY_COUNT: &str = "OPT_RETRY_COUNT";

pub const REPORT_DATA_TRUNCATION: &str = "OPT_REPORT_DATA_TRUNCATION";
pub const ENABLE_CLEARTEXT_PLUGIN: &str = "OPT_ENABLE_CLEARTEXT_PLUGIN";
pub const GET_SERVER_PUBLIC_KEY: &str = "OPT_GET_SERVER_PUBLIC_KEY";
pub const OPTIONAL_RESULTSET_METADATA: &str = "OPT_OPTIONAL_RESULTSET_METADATA";

pub const SERVER_PUBLIC_KEY: &str = "rsaKey";
pub const CHARSET_DIR: &str = "charsetDir";
pub const DEFAULT_AUTH: &str = "defaultAuth";
pub const READ_DEFAULT_GROUP: &str = "readDefaultGroup";
pub const READ_DEFAULT_FILE: &str = "readDefaultFile";
pub const LOAD_DATA_LOCAL_DIR: &str = "OPT_LOAD_DATA_LOCAL_DIR";

pub const CLIENT_COMPRESS: &str = "CLIENT_COMPRESS";
pub const CLIENT_FOUND_ROWS: &str = "CLIENT_FOUND_ROWS";
pub const CLIENT_IGNORE_SIGPIPE: &str = "CLIENT_IGNORE_SIGPIPE";
pub const CLIENT_IGNORE_SPACE: &str = "CLIENT_IGNORE_SPACE";
pub const CLIENT_INTERACTIVE: &str = "CLIENT_INTERACTIVE";
pub const CLIENT_LOCAL_FILES: &str = "CLIENT_LOCAL_FILES";
pub const CLIENT_MULTI_STATEMENTS: &str = "CLIENT_MULTI_STATEMENTS";
pub const CLIENT_NO_SCHEMA: &str = "CLIENT_NO_SCHEMA";

pub const OCI_CONFIG_FILE: &str = "OPT_OCI_CONFIG_FILE";
pub const OCI_CLIENT_CONFIG_PROFILE: &str = "OPT_OCI_CLIENT_CONFIG_PROFILE";
pub const AUTHENTICATION_KERBEROS_CLIENT_MODE: &str = "OPT_AUTHENTICATION_KERBEROS_CLIENT_MODE";
pub const OPENID_TOKEN_FILE: &str = "OPT_OPENID_TOKEN_FILE";
pub const WEBAUTHN_DEVICE_NUMBER: &str = "OPT_WEBAUTHN_DEVICE_NUMBER";

/// URI query parameter names mapped to option names
///
/// Keys not listed here are passed through unchanged.
pub const URI_PARAMS: &[(&str, &str)] = &[
    ("connect-timeout", CONNECT_TIMEOUT),
    ("read-timeout", READ_TIMEOUT),
    ("write-timeout", WRITE_TIMEOUT),
    ("ssl-mode", SSL_MODE),
    ("ssl-ca", SSL_CA),
    ("ssl-capath", SSL_CAPATH),
    ("ssl-cert", SSL_CERT),
    ("ssl-key", SSL_KEY),
    ("ssl-cipher", SSL_CIPHER),
    ("ssl-crl", SSL_CRL),
    ("ssl-crlpath", SSL_CRLPATH),
    ("tls-version", TLS_VERSION),
    ("multi-host", MULTI_HOST),
    ("dns-srv", DNS_SRV),
    ("charset", CHARSET_NAME),
    ("reconnect", RECONNECT),
    ("plugin-dir", PLUGIN_DIR),
    ("default-auth", DEFAULT_AUTH),
    ("local-infile", LOCAL_INFILE),
    ("max-allowed-packet", MAX_ALLOWED_PACKET),
    ("retry-count", RETRY_COUNT),
];

/// Map a URI query key to its option name
pub fn from_uri_param(key: &str) -> &str {
    URI_PARAMS
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, name)| *name)
        .unwrap_or(key)
}
