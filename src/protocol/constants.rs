//! MySQL client protocol constants

/// Default TCP port
pub const DEFAULT_PORT: u16 = 3306;

/// Default connection character set
pub const DEFAULT_CHARSET: &str = "utf8mb4";

/// SQL state class used for connection exceptions
pub const NETWORK_SQLSTATE_CLASS: &str = "08";

/// First client library version with the 8.0 option set
pub const CLIENT_VERSION_80000: u32 = 80000;

/// First 8.0 client library version with the final option id layout
pub const CLIENT_VERSION_80011: u32 = 80011;

/// Native error codes
pub mod codes {
    /// Too many connections
    pub const ER_CON_COUNT_ERROR: u32 = 1040;

    /// Access denied for user
    pub const ER_ACCESS_DENIED_ERROR: u32 = 1045;

    /// Password expired, must be changed before login
    pub const ER_MUST_CHANGE_PASSWORD_LOGIN: u32 = 1820;

    /// Can't create socket
    pub const CR_SOCKET_CREATE_ERROR: u32 = 2001;

    /// Can't connect through local socket
    pub const CR_CONNECTION_ERROR: u32 = 2002;

    /// Can't connect to host
    pub const CR_CONN_HOST_ERROR: u32 = 2003;

    /// Can't create TCP/IP socket
    pub const CR_IPSOCK_ERROR: u32 = 2004;

    /// Unknown host
    pub const CR_UNKNOWN_HOST: u32 = 2005;

    /// SSL connection error
    pub const CR_SSL_CONNECTION_ERROR: u32 = 2026;

    /// Connector-side: expired password cannot be handled by the linked client
    pub const CL_CANT_HANDLE_EXP_PWD: u32 = 820;
}

/// Client capability flags
pub mod flags {
    /// Return found rows instead of affected rows
    pub const CLIENT_FOUND_ROWS: u64 = 2;

    /// Don't allow database.table.column
    pub const CLIENT_NO_SCHEMA: u64 = 16;

    /// Use compression protocol
    pub const CLIENT_COMPRESS: u64 = 32;

    /// Can use LOAD DATA LOCAL
    pub const CLIENT_LOCAL_FILES: u64 = 128;

    /// Ignore spaces before '('
    pub const CLIENT_IGNORE_SPACE: u64 = 256;

    /// Interactive client (interactive_timeout applies)
    pub const CLIENT_INTERACTIVE: u64 = 1024;

    /// Ignore SIGPIPE
    pub const CLIENT_IGNORE_SIGPIPE: u64 = 4096;

    /// Multi-statement support
    pub const CLIENT_MULTI_STATEMENTS: u64 = 1 << 16;

    /// Multi-results support
    pub const CLIENT_MULTI_RESULTS: u64 = 1 << 17;
}

/// Authentication plugin names and plugin option keys
pub mod plugins {
    /// OCI IAM authentication plugin
    pub const OCI_CLIENT: &str = "authentication_oci_client";

    /// Kerberos authentication plugin
    pub const KERBEROS_CLIENT: &str = "authentication_kerberos_client";

    /// OpenID Connect authentication plugin
    pub const OPENID_CONNECT_CLIENT: &str = "authentication_openid_connect_client";

    /// WebAuthn authentication plugin
    pub const WEBAUTHN_CLIENT: &str = "authentication_webauthn_client";

    /// WebAuthn plugin option carrying the message callback
    pub const WEBAUTHN_MESSAGES_CALLBACK: &str =
        "plugin_authentication_webauthn_client_messages_callback";
}
