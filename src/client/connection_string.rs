//! Connection URI parsing
//!
//! Supports formats:
//! * mysql://[user[:password]@]host[:port][,host[:port]...][/schema][?key=value&...]
//! * mysql://user@[host1:3306,host2:3307]/schema (bracketed host list)
//! * mysql://user@[(address=host1:3306,priority=90),(address=host2,priority=10)]/schema
//! * mysql://user@(/var/run/mysqld/mysqld.sock)/schema or %2F-encoded socket paths
//! * mysql+srv://user@_mysql._tcp.example.com/schema (DNS SRV lookup)
//! * tcp://host:port/schema, unix:///path/to/socket, pipe://name

use crate::connection::SslMode;
use crate::endpoint::EndpointDescriptor;
use crate::options::{lookup, names, ConnectOptions, OptionValue, ValueKind, MAX_PRIORITY};
use crate::{Error, Result};
use percent_encoding::percent_decode_str;
use std::collections::BTreeMap;

/// Parsed connection URI
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionUri {
    /// `mysql+srv` scheme
    pub srv: bool,
    /// User name
    pub user: Option<String>,
    /// Password
    pub password: Option<String>,
    /// Hosts in URI order
    pub hosts: Vec<EndpointDescriptor>,
    /// Schema (path component)
    pub schema: Option<String>,
    /// Query parameters, as option names with typed values
    pub params: Vec<(String, OptionValue)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scheme {
    Mysql,
    MysqlSrv,
    Tcp,
    Unix,
    Pipe,
}

impl Scheme {
    fn parse(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mysql" | "mysqlx" => Ok(Self::Mysql),
            "mysql+srv" | "mysqlx+srv" => Ok(Self::MysqlSrv),
            "tcp" => Ok(Self::Tcp),
            "unix" => Ok(Self::Unix),
            "pipe" => Ok(Self::Pipe),
            other => Err(Error::invalid(format!(
                "unsupported connection URI scheme '{}'",
                other
            ))),
        }
    }
}

/// Percent-decode one URI component
fn decode(s: &str) -> Result<String> {
    percent_decode_str(s)
        .decode_utf8()
        .map(|c| c.into_owned())
        .map_err(|_| Error::invalid(format!("invalid percent-encoding in '{}'", s)))
}

/// Index of the first `stop` character outside parentheses and brackets
fn find_top_level(s: &str, stop: &[char]) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            c if depth == 0 && stop.contains(&c) => return Some(i),
            _ => {}
        }
    }
    None
}

/// Split on top-level commas
fn split_top_level(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut rest = s;
    while let Some(i) = find_top_level(rest, &[',']) {
        parts.push(&rest[..i]);
        rest = &rest[i + 1..];
    }
    parts.push(rest);
    parts
}

fn parse_port(s: &str) -> Result<u16> {
    s.parse::<u16>()
        .map_err(|_| Error::invalid(format!("invalid port '{}'", s)))
}

/// Parse `host`, `host:port`, `[v6]:port`, a socket path, or an
/// `(address=...,priority=...)` group.
fn parse_host(item: &str) -> Result<EndpointDescriptor> {
    let item = item.trim();
    if item.is_empty() {
        return Err(Error::invalid("empty host in host list"));
    }

    if let Some(inner) = item.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        if !inner.contains('=') {
            return Ok(EndpointDescriptor::socket(decode(inner)?));
        }
        let mut address = None;
        let mut priority = None;
        for pair in inner.split(',') {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| Error::invalid(format!("malformed host group '{}'", item)))?;
            match key.trim().to_ascii_lowercase().as_str() {
                "address" => address = Some(value.trim()),
                "priority" => {
                    let p = value.trim().parse::<u16>().map_err(|_| {
                        Error::invalid(format!("invalid priority '{}'", value.trim()))
                    })?;
                    if p > MAX_PRIORITY {
                        return Err(Error::invalid(format!(
                            "priority {} out of range, expected 0-{}",
                            p, MAX_PRIORITY
                        )));
                    }
                    priority = Some(p);
                }
                other => {
                    return Err(Error::invalid(format!(
                        "unknown host attribute '{}'",
                        other
                    )))
                }
            }
        }
        let address =
            address.ok_or_else(|| Error::invalid(format!("missing address in '{}'", item)))?;
        return Ok(parse_host(address)?.with_priority(priority));
    }

    let decoded = decode(item)?;
    if decoded.starts_with('/') || decoded.starts_with('.') {
        return Ok(EndpointDescriptor::socket(decoded));
    }

    if let Some(v6) = item.strip_prefix('[') {
        let (addr, after) = v6
            .split_once(']')
            .ok_or_else(|| Error::invalid(format!("unterminated IPv6 address '{}'", item)))?;
        let port = match after.strip_prefix(':') {
            Some(p) => Some(parse_port(p)?),
            None if after.is_empty() => None,
            None => return Err(Error::invalid(format!("malformed host '{}'", item))),
        };
        return Ok(EndpointDescriptor::tcp(addr, port));
    }

    // Unbracketed IPv6 literal; a port needs the `[addr]:port` form
    if decoded.matches(':').count() > 1 {
        return Ok(EndpointDescriptor::tcp(decoded, None));
    }

    match decoded.rsplit_once(':') {
        Some((host, port)) => Ok(EndpointDescriptor::tcp(host, Some(parse_port(port)?))),
        None => Ok(EndpointDescriptor::tcp(decoded, None)),
    }
}

/// Parse a comma separated host list, optionally wrapped in `[...]`
pub fn parse_host_list(s: &str) -> Result<Vec<EndpointDescriptor>> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(Vec::new());
    }
    let inner = match s.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
        Some(inner) if inner.contains(',') || inner.starts_with('(') => inner,
        _ => s,
    };
    split_top_level(inner).into_iter().map(parse_host).collect()
}

fn parse_bool(name: &str, raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "" | "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(Error::invalid(format!(
            "invalid value '{}' for {}, expected a boolean",
            raw, name
        ))),
    }
}

fn parse_number(name: &str, raw: &str) -> Result<OptionValue> {
    if let Ok(i) = raw.parse::<i64>() {
        return Ok(OptionValue::Int(i));
    }
    if let Ok(x) = raw.parse::<f64>() {
        return Ok(OptionValue::Float(x));
    }
    Err(Error::invalid(format!(
        "invalid value '{}' for {}, expected a non-negative integer",
        raw, name
    )))
}

fn strip_brackets(raw: &str) -> &str {
    raw.strip_prefix('[')
        .and_then(|r| r.strip_suffix(']'))
        .unwrap_or(raw)
}

/// Convert one query parameter to a typed option value
fn typed_param(name: &str, raw: &str) -> Result<OptionValue> {
    let Some(spec) = lookup(name) else {
        return Ok(OptionValue::Str(raw.to_string()));
    };
    match spec.kind {
        ValueKind::Bool => Ok(OptionValue::Bool(parse_bool(name, raw)?)),
        ValueKind::Any => Ok(parse_bool(name, raw)
            .map(OptionValue::Bool)
            .unwrap_or_else(|_| OptionValue::Str(raw.to_string()))),
        ValueKind::UInt if name == names::SSL_MODE || name == "OPT_SSL_MODE" => {
            match raw.parse::<SslMode>() {
                Ok(mode) => Ok(OptionValue::Int(mode.code() as i64)),
                Err(_) => parse_number(name, raw),
            }
        }
        ValueKind::UInt | ValueKind::Timeout => parse_number(name, raw),
        ValueKind::Disabled => match parse_bool(name, raw) {
            Ok(b) => Ok(OptionValue::Bool(b)),
            Err(_) => parse_number(name, raw),
        },
        ValueKind::Str => Ok(OptionValue::Str(raw.to_string())),
        ValueKind::List => Ok(OptionValue::List(
            strip_brackets(raw)
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        )),
        ValueKind::Map => {
            let mut map = BTreeMap::new();
            for pair in strip_brackets(raw).split(',').filter(|p| !p.trim().is_empty()) {
                let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
                map.insert(k.trim().to_string(), v.trim().to_string());
            }
            Ok(OptionValue::Map(map))
        }
    }
}

impl ConnectionUri {
    /// Parse a connection URI
    pub fn parse(s: &str) -> Result<Self> {
        let (scheme, rest) = s
            .split_once("://")
            .ok_or_else(|| Error::invalid("connection URI must start with <scheme>://"))?;
        let scheme = Scheme::parse(scheme)?;

        let mut uri = ConnectionUri {
            srv: scheme == Scheme::MysqlSrv,
            ..Default::default()
        };

        // unix:///path/to/sock and pipe://name carry the target as the whole body
        let rest = match scheme {
            Scheme::Unix | Scheme::Pipe => {
                let (target, query) = match rest.split_once('?') {
                    Some((t, q)) => (t, Some(q)),
                    None => (rest, None),
                };
                let target = decode(target)?;
                if target.is_empty() {
                    return Err(Error::invalid("missing socket path or pipe name"));
                }
                uri.hosts.push(if scheme == Scheme::Unix {
                    EndpointDescriptor::socket(target)
                } else {
                    EndpointDescriptor::pipe(target)
                });
                if let Some(q) = query {
                    uri.parse_query(q)?;
                }
                return Ok(uri);
            }
            _ => rest,
        };

        let end = find_top_level(rest, &['/', '?']).unwrap_or(rest.len());
        let (authority, tail) = rest.split_at(end);

        let hosts = match authority.rfind('@') {
            Some(at) => {
                let userinfo = &authority[..at];
                match userinfo.split_once(':') {
                    Some((user, password)) => {
                        uri.user = Some(decode(user)?);
                        uri.password = Some(decode(password)?);
                    }
                    None => uri.user = Some(decode(userinfo)?),
                }
                &authority[at + 1..]
            }
            None => authority,
        };
        uri.hosts = parse_host_list(hosts)?;

        let (path, query) = match tail.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (tail, None),
        };
        let schema = decode(path.trim_start_matches('/'))?;
        if !schema.is_empty() {
            uri.schema = Some(schema);
        }
        if let Some(q) = query {
            uri.parse_query(q)?;
        }

        Ok(uri)
    }

    fn parse_query(&mut self, query: &str) -> Result<()> {
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, raw) = pair.split_once('=').unwrap_or((pair, ""));
            let key = decode(key)?;
            let raw = decode(raw)?;
            let name = names::from_uri_param(&key).to_string();
            let value = typed_param(&name, &raw)?;
            self.params.push((name, value));
        }
        Ok(())
    }

    /// Convert to a checked option set
    pub fn into_options(self) -> Result<ConnectOptions> {
        let mut opts = ConnectOptions::new();
        if let Some(user) = self.user {
            opts.insert(names::USER_NAME, user)?;
        }
        if let Some(password) = self.password {
            opts.insert(names::PASSWORD, password)?;
        }
        if let Some(schema) = self.schema {
            opts.insert(names::SCHEMA, schema)?;
        }
        if self.srv {
            opts.insert(names::DNS_SRV, true)?;
        }
        for (name, value) in self.params {
            opts.insert(name, value)?;
        }
        for host in self.hosts {
            opts = opts.endpoint(host);
        }
        Ok(opts)
    }
}
