//! In-memory transport for tests and examples
//!
//! [`ScriptedTransport`] records every call made on it and answers connect
//! calls from a per-target script. Clones share the same script and log, so a
//! test keeps one clone for inspection and hands the other to the driver.

use crate::connection::{ConnectTarget, OptionRejected, SslMaterial, Transport};
use crate::endpoint::Protocol;
use crate::error::NativeError;
use crate::options::{NativeOption, SettingValue};
use crate::plugin::PluginValue;
use crate::protocol::constants::codes;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

pub use crate::endpoint::SequenceSelector;

/// Client library version reported unless overridden
pub const DEFAULT_CLIENT_VERSION: u32 = 80040;

/// Scripted answer to one connect call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Accept,
    Fail(NativeError),
    /// Never complete; only a connect timeout ends the call
    Hang,
}

/// One recorded transport call
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    SetOption(NativeOption, SettingValue),
    SetSsl(SslMaterial),
    PluginOption { plugin: String, option: String },
    UseProtocol(Protocol),
    Connect(ConnectTarget),
    ConnectDnsSrv(String, ConnectTarget),
    SetAutocommit(bool),
    Execute(String),
    Reset,
    Close,
}

#[derive(Debug)]
struct Script {
    client_version: u32,
    outcomes: HashMap<String, VecDeque<Outcome>>,
    fallback: Outcome,
    rejected_options: HashMap<NativeOption, OptionRejected>,
    rejected_plugin_options: HashMap<String, OptionRejected>,
    failing_statements: HashMap<String, NativeError>,
    events: Vec<Event>,
    plugin_values: Vec<(String, String, PluginValue)>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            client_version: DEFAULT_CLIENT_VERSION,
            outcomes: HashMap::new(),
            fallback: Outcome::Accept,
            rejected_options: HashMap::new(),
            rejected_plugin_options: HashMap::new(),
            failing_statements: HashMap::new(),
            events: Vec::new(),
            plugin_values: Vec::new(),
        }
    }
}

/// Scripted transport
///
/// Connect targets are keyed by `host:port` for TCP, by path for sockets and
/// pipes, and by the service name for DNS SRV lookups. Targets without a
/// script use the fallback outcome, [`Outcome::Accept`] unless changed.
///
/// # Examples
///
/// ```
/// use connector_wire::testing::{Outcome, ScriptedTransport};
/// use connector_wire::NativeError;
///
/// let transport = ScriptedTransport::new()
///     .script("db1:3306", Outcome::Fail(NativeError::new(2003, "HY000", "down")))
///     .script("db2:3306", Outcome::Accept);
/// let log = transport.clone();
/// assert!(log.connect_attempts().is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `version` as the linked client library version
    pub fn with_client_version(self, version: u32) -> Self {
        self.script.lock().client_version = version;
        self
    }

    /// Queue an outcome for `target`; the last queued outcome repeats
    pub fn script(self, target: impl Into<String>, outcome: Outcome) -> Self {
        self.script
            .lock()
            .outcomes
            .entry(target.into())
            .or_default()
            .push_back(outcome);
        self
    }

    /// Shorthand for a retryable "can't connect" failure on `target`
    pub fn unreachable(self, target: impl Into<String>) -> Self {
        let target = target.into();
        let err = NativeError::new(
            codes::CR_CONN_HOST_ERROR,
            "HY000",
            format!("Can't connect to MySQL server on '{}'", target),
        );
        self.script(target, Outcome::Fail(err))
    }

    /// Outcome for targets without a script
    pub fn fallback(self, outcome: Outcome) -> Self {
        self.script.lock().fallback = outcome;
        self
    }

    /// Refuse a typed option
    pub fn reject_option(self, option: NativeOption, rejected: OptionRejected) -> Self {
        self.script.lock().rejected_options.insert(option, rejected);
        self
    }

    /// Refuse an authentication plugin option, by option name
    pub fn reject_plugin_option(self, option: impl Into<String>, rejected: OptionRejected) -> Self {
        self.script
            .lock()
            .rejected_plugin_options
            .insert(option.into(), rejected);
        self
    }

    /// Fail `sql` when executed
    pub fn fail_statement(self, sql: impl Into<String>, err: NativeError) -> Self {
        self.script.lock().failing_statements.insert(sql.into(), err);
        self
    }

    /// Every recorded call, in order
    pub fn events(&self) -> Vec<Event> {
        self.script.lock().events.clone()
    }

    /// Connect targets tried, in order
    pub fn connect_attempts(&self) -> Vec<String> {
        self.script
            .lock()
            .events
            .iter()
            .filter_map(|e| match e {
                Event::Connect(target) => Some(target_key(target)),
                Event::ConnectDnsSrv(name, _) => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    /// Typed options set, in order
    pub fn options_set(&self) -> Vec<(NativeOption, SettingValue)> {
        self.script
            .lock()
            .events
            .iter()
            .filter_map(|e| match e {
                Event::SetOption(option, value) => Some((*option, value.clone())),
                _ => None,
            })
            .collect()
    }

    /// Last value set for `option`
    pub fn option(&self, option: NativeOption) -> Option<SettingValue> {
        self.options_set()
            .into_iter()
            .rev()
            .find(|(o, _)| *o == option)
            .map(|(_, v)| v)
    }

    /// Plugin options set, as `(plugin, option, value)`
    pub fn plugin_values(&self) -> Vec<(String, String, PluginValue)> {
        self.script.lock().plugin_values.clone()
    }

    /// Statements executed, in order
    pub fn executed(&self) -> Vec<String> {
        self.script
            .lock()
            .events
            .iter()
            .filter_map(|e| match e {
                Event::Execute(sql) => Some(sql.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: Event) {
        self.script.lock().events.push(event);
    }

    fn next_outcome(&self, key: &str) -> Outcome {
        let mut script = self.script.lock();
        let fallback = script.fallback.clone();
        match script.outcomes.get_mut(key) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(fallback),
            Some(queue) => queue.front().cloned().unwrap_or(fallback),
            None => fallback,
        }
    }

    async fn answer(&self, key: &str) -> Result<(), NativeError> {
        match self.next_outcome(key) {
            Outcome::Accept => Ok(()),
            Outcome::Fail(err) => Err(err),
            Outcome::Hang => std::future::pending().await,
        }
    }
}

fn target_key(target: &ConnectTarget) -> String {
    match (&target.host, &target.socket) {
        (Some(host), _) => format!("{}:{}", host, target.port),
        (None, Some(path)) => path.clone(),
        (None, None) => String::new(),
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    fn client_version(&self) -> u32 {
        self.script.lock().client_version
    }

    fn set_option(
        &mut self,
        option: NativeOption,
        value: &SettingValue,
    ) -> Result<(), OptionRejected> {
        if let Some(rejected) = self.script.lock().rejected_options.get(&option) {
            return Err(rejected.clone());
        }
        self.record(Event::SetOption(option, value.clone()));
        Ok(())
    }

    fn set_ssl(&mut self, material: &SslMaterial) -> Result<(), OptionRejected> {
        self.record(Event::SetSsl(material.clone()));
        Ok(())
    }

    fn plugin_option(
        &mut self,
        plugin: &str,
        option: &str,
        value: &PluginValue,
    ) -> Result<(), OptionRejected> {
        let mut script = self.script.lock();
        if let Some(rejected) = script.rejected_plugin_options.get(option) {
            return Err(rejected.clone());
        }
        script.events.push(Event::PluginOption {
            plugin: plugin.to_string(),
            option: option.to_string(),
        });
        script
            .plugin_values
            .push((plugin.to_string(), option.to_string(), value.clone()));
        Ok(())
    }

    fn use_protocol(&mut self, protocol: Protocol) -> Result<(), OptionRejected> {
        self.record(Event::UseProtocol(protocol));
        Ok(())
    }

    async fn connect(&mut self, target: &ConnectTarget) -> Result<(), NativeError> {
        self.record(Event::Connect(target.clone()));
        self.answer(&target_key(target)).await
    }

    async fn connect_dns_srv(
        &mut self,
        srv_name: &str,
        target: &ConnectTarget,
    ) -> Result<(), NativeError> {
        self.record(Event::ConnectDnsSrv(srv_name.to_string(), target.clone()));
        self.answer(srv_name).await
    }

    async fn set_autocommit(&mut self, enabled: bool) -> Result<(), NativeError> {
        self.record(Event::SetAutocommit(enabled));
        Ok(())
    }

    async fn execute(&mut self, sql: &str) -> Result<(), NativeError> {
        self.record(Event::Execute(sql.to_string()));
        let failure = self.script.lock().failing_statements.get(sql).cloned();
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn reset(&mut self) {
        self.record(Event::Reset);
    }

    async fn close(&mut self) {
        self.record(Event::Close);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(host: &str, port: u16) -> ConnectTarget {
        ConnectTarget {
            host: Some(host.into()),
            user: "u".into(),
            password: None,
            schema: None,
            port,
            socket: None,
            flags: 0,
        }
    }

    #[tokio::test]
    async fn test_scripted_outcomes_then_repeat() {
        let mut transport = ScriptedTransport::new()
            .unreachable("db:3306")
            .script("db:3306", Outcome::Accept);
        let log = transport.clone();

        assert!(transport.connect(&target("db", 3306)).await.is_err());
        assert!(transport.connect(&target("db", 3306)).await.is_ok());
        assert!(transport.connect(&target("db", 3306)).await.is_ok());
        assert_eq!(log.connect_attempts(), vec!["db:3306"; 3]);
    }

    #[tokio::test]
    async fn test_fallback_outcome() {
        let err = NativeError::new(1045, "28000", "denied");
        let mut transport = ScriptedTransport::new().fallback(Outcome::Fail(err.clone()));
        assert_eq!(transport.connect(&target("x", 1)).await, Err(err));
    }

    #[test]
    fn test_rejected_option_is_not_recorded() {
        let mut transport = ScriptedTransport::new()
            .reject_option(NativeOption::ReadTimeout, OptionRejected::NotImplemented);
        assert!(transport
            .set_option(NativeOption::ReadTimeout, &SettingValue::UInt(1))
            .is_err());
        assert!(transport
            .set_option(NativeOption::WriteTimeout, &SettingValue::UInt(1))
            .is_ok());
        assert_eq!(
            transport.options_set(),
            vec![(NativeOption::WriteTimeout, SettingValue::UInt(1))]
        );
    }
}
