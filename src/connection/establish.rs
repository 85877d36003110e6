//! Connection establishment
//!
//! Runs one attempt end to end: validate options, apply them to the
//! transport, pin the authentication plugin configuration, fail over across
//! endpoints and finish the session setup. Any failure is final for the
//! attempt; the transport is reset and the plugin lock released on every
//! exit path.

use super::conn::{Binding, Connection};
use super::state::EstablishState;
use super::transport::{ConnectTarget, OptionRejected, Transport};
use crate::endpoint::{EndpointDescriptor, Failover, Protocol, Selector};
use crate::error::NativeError;
use crate::metrics::{counters, histograms, labels};
use crate::options::{
    names, ConnectOptions, NativeOption, PluginSetting, Setting, SettingValue, ValidatedOptions,
    ValidationContext, Validator,
};
use crate::plugin::{
    required_target, AuthMessageCallback, CallbackTarget, DriverId, LockRequest, PluginConfigGuard,
    PluginLock, PluginValue,
};
use crate::protocol::constants::{codes, plugins};
use crate::{Error, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;

const EXPIRED_PASSWORD_MESSAGE: &str = "Your password has expired, but this connector is not \
     linked against a client library that allows resetting it. Change the password with a \
     client that supports expired passwords, or use a client library that supports resetting \
     an expired password.";

const TLS_VERSIONS_HINT: &str = ", valid versions are: TLSv1.2, TLSv1.3";

/// Drives establishment attempts for one driver
#[derive(Clone)]
pub struct Establisher<'d> {
    guard: &'d Arc<PluginConfigGuard>,
    driver: DriverId,
    callback: Option<&'d AuthMessageCallback>,
    default_plugin_dir: Option<&'d str>,
}

impl std::fmt::Debug for Establisher<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Establisher")
            .field("driver", &self.driver)
            .field("has_callback", &self.callback.is_some())
            .field("default_plugin_dir", &self.default_plugin_dir)
            .finish()
    }
}

impl<'d> Establisher<'d> {
    /// Establisher for an anonymous driver without a callback
    pub fn new(guard: &'d Arc<PluginConfigGuard>) -> Self {
        Self {
            guard,
            driver: DriverId::next(),
            callback: None,
            default_plugin_dir: None,
        }
    }

    /// Act on behalf of `driver`, routing plugin messages to `callback`
    pub fn driver(mut self, driver: DriverId, callback: Option<&'d AuthMessageCallback>) -> Self {
        self.driver = driver;
        self.callback = callback;
        self
    }

    /// Plugin directory used when the options do not name one
    pub fn default_plugin_dir(mut self, dir: Option<&'d str>) -> Self {
        self.default_plugin_dir = dir;
        self
    }

    /// Establish a connection over `transport`
    pub async fn establish<T: Transport>(
        &self,
        mut transport: T,
        options: &ConnectOptions,
        selector: &mut dyn Selector,
    ) -> Result<Connection<T>> {
        let span = tracing::info_span!(
            "establish",
            driver = %self.driver,
            endpoints = tracing::field::Empty,
            dns_srv = tracing::field::Empty,
        );
        async move {
            let started = Instant::now();
            let mut state = EstablishState::Init;

            let result = self.run(&mut transport, options, selector, &mut state).await;
            histograms::establish_duration(started.elapsed());

            match result {
                Ok(binding) => {
                    counters::connection_established();
                    tracing::info!(
                        endpoint = %binding.endpoint,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "connection established"
                    );
                    Ok(Connection::new(transport, binding))
                }
                Err(e) => {
                    let _ = state.transition(EstablishState::Failed);
                    transport.reset();
                    tracing::warn!(error = %e, code = ?e.code(), "connection establishment failed");
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run<T: Transport>(
        &self,
        transport: &mut T,
        options: &ConnectOptions,
        selector: &mut dyn Selector,
        state: &mut EstablishState,
    ) -> Result<Binding> {
        let ctx = ValidationContext {
            client_version: transport.client_version(),
            default_plugin_dir: self.default_plugin_dir,
        };
        let plan = Validator::new(ctx).validate(options)?;
        state.transition(EstablishState::OptionsValidated)?;

        let span = tracing::Span::current();
        span.record("endpoints", plan.endpoints.len());
        span.record("dns_srv", plan.dns_srv);

        // Must precede anything that may load a plugin.
        if let Some(dir) = &plan.plugin_dir {
            apply_setting(transport, dir)?;
        }
        for setting in &plan.settings {
            apply_setting(transport, setting)?;
        }

        // Held until this function returns; dropping it releases the guard.
        let mut lock = self.guard.handle();
        lock.request(LockRequest::Guard).await;
        for setting in &plan.plugin_settings {
            apply_plugin_setting(transport, setting)?;
        }
        self.route_callback(&mut lock, transport).await?;

        apply_setting(
            transport,
            &Setting {
                option: names::CHARSET_NAME.into(),
                native: NativeOption::CharsetName,
                value: SettingValue::Str(plan.charset.clone()),
                is_default: false,
                tolerate_rejection: false,
            },
        )?;

        if plan.ssl.is_used() {
            transport
                .set_ssl(&plan.ssl)
                .map_err(|e| unsupported("ssl", &e))?;
        }
        // A TLS version setting may have overwritten the mode.
        if let Some(mode) = &plan.ssl_mode {
            apply_setting(transport, mode)?;
        }
        state.transition(EstablishState::PluginConfigured)?;

        state.transition(EstablishState::Connecting)?;
        let endpoint = self.failover(transport, &plan, selector).await?;

        let binding = finish_session(transport, &plan, endpoint).await?;
        state.transition(EstablishState::Connected)?;

        lock.request(LockRequest::Unguard).await;
        Ok(binding)
    }

    async fn failover<T: Transport>(
        &self,
        transport: &mut T,
        plan: &ValidatedOptions,
        selector: &mut dyn Selector,
    ) -> Result<EndpointDescriptor> {
        let mut failover = Failover::new(plan.endpoints.clone(), selector);
        let default_port = failover.default_port();

        while let Some(endpoint) = failover.next_endpoint() {
            let port = endpoint.port_or(default_port);
            let attempt = tracing::debug_span!(
                "attempt",
                endpoint = %endpoint.describe(default_port),
                protocol = %endpoint.protocol(),
            );

            let outcome = async {
                if !plan.dns_srv {
                    transport
                        .use_protocol(endpoint.protocol())
                        .map_err(|e| unsupported("protocol", &e))?;
                }
                let target = connect_target(plan, &endpoint, port);
                let connect = async {
                    if plan.dns_srv {
                        transport.connect_dns_srv(endpoint.host(), &target).await
                    } else {
                        transport.connect(&target).await
                    }
                };
                Ok::<_, Error>(
                    with_timeout(plan.connect_timeout, &endpoint, default_port, connect).await,
                )
            }
            .instrument(attempt)
            .await?;

            match outcome {
                Ok(()) => return Ok(endpoint),
                Err(err) => {
                    let err = refine_error(err, plan.can_handle_expired_passwords);
                    failover.record_failure(&endpoint, err)?;
                }
            }
        }

        Err(failover.into_error(plan.dns_srv))
    }

    /// Point the WebAuthn message callback at this driver, or back at the
    /// plugin default.
    ///
    /// The target is computed under the shared hold and recomputed after the
    /// exclusive upgrade, since another attempt may have reconfigured the
    /// plugin in between.
    async fn route_callback<T: Transport>(
        &self,
        lock: &mut PluginLock,
        transport: &mut T,
    ) -> Result<()> {
        let has_callback = self.callback.is_some();
        let wanted = |guard: &PluginConfigGuard| {
            let (current, installed) = guard.routing();
            required_target(current, installed.as_ref(), self.driver, self.callback)
        };
        if wanted(lock.guard()).is_none() {
            return Ok(());
        }

        lock.request(LockRequest::Exclusive).await;
        let Some(target) = wanted(lock.guard()) else {
            return Ok(());
        };

        let (value, installed, label) = match target {
            CallbackTarget::Caller(_) => {
                let guard = Arc::clone(lock.guard());
                let forward: AuthMessageCallback = Arc::new(move |msg: &str| {
                    guard.dispatch(msg);
                });
                (
                    PluginValue::Callback(Some(forward)),
                    self.callback.cloned(),
                    labels::TARGET_CALLER,
                )
            }
            _ => (
                PluginValue::Callback(None),
                None,
                labels::TARGET_PLUGIN_DEFAULT,
            ),
        };

        match transport.plugin_option(
            plugins::WEBAUTHN_CLIENT,
            plugins::WEBAUTHN_MESSAGES_CALLBACK,
            &value,
        ) {
            Ok(()) => {
                lock.set_callback_target(target, installed)?;
                counters::plugin_reconfigured(label);
                tracing::debug!(?target, "webauthn message callback rerouted");
                Ok(())
            }
            Err(rejected) if !has_callback => {
                tracing::debug!(%rejected, "ignoring failure to reset webauthn callback");
                Ok(())
            }
            Err(OptionRejected::NotImplemented) => Ok(()),
            Err(OptionRejected::Invalid(_)) => Err(Error::UnsupportedOption {
                option: plugins::WEBAUTHN_MESSAGES_CALLBACK.to_string(),
                message: format!(
                    "Failed to set fido message callback for {} plugin",
                    plugins::WEBAUTHN_CLIENT
                ),
            }),
        }
    }
}

fn apply_setting<T: Transport>(transport: &mut T, setting: &Setting) -> Result<()> {
    match transport.set_option(setting.native, &setting.value) {
        Ok(()) => Ok(()),
        Err(rejected) if setting.is_default || setting.tolerate_rejection => {
            tracing::debug!(
                option = %setting.option,
                native = %setting.native,
                %rejected,
                "transport rejected option, ignoring"
            );
            Ok(())
        }
        Err(rejected) => Err(unsupported(&setting.option, &rejected)),
    }
}

fn apply_plugin_setting<T: Transport>(transport: &mut T, setting: &PluginSetting) -> Result<()> {
    match transport.plugin_option(setting.spec.plugin, setting.spec.option, &setting.value) {
        Ok(()) => Ok(()),
        Err(_) if setting.is_default => Ok(()),
        Err(_) => Err(Error::UnsupportedOption {
            option: setting.option.to_string(),
            message: setting.spec.error.to_string(),
        }),
    }
}

fn unsupported(option: &str, rejected: &OptionRejected) -> Error {
    Error::UnsupportedOption {
        option: option.to_string(),
        message: rejected.to_string(),
    }
}

fn connect_target(plan: &ValidatedOptions, endpoint: &EndpointDescriptor, port: u16) -> ConnectTarget {
    let tcp = endpoint.protocol() == Protocol::Tcp;
    ConnectTarget {
        host: tcp.then(|| endpoint.host().to_string()),
        user: plan.credentials.user.clone(),
        password: plan.credentials.password.clone(),
        schema: plan.endpoints.schema().map(str::to_string),
        port: if tcp { port } else { 0 },
        socket: endpoint.path().map(str::to_string),
        flags: plan.flags,
    }
}

/// Bound a connect call by the per-endpoint timeout.
///
/// Expiry is reported as a host connection error, so failover moves on.
async fn with_timeout<F>(
    timeout: Option<Duration>,
    endpoint: &EndpointDescriptor,
    default_port: u16,
    connect: F,
) -> std::result::Result<(), NativeError>
where
    F: std::future::Future<Output = std::result::Result<(), NativeError>>,
{
    let Some(limit) = timeout else {
        return connect.await;
    };
    match tokio::time::timeout(limit, connect).await {
        Ok(result) => result,
        Err(_) => Err(NativeError::new(
            codes::CR_CONN_HOST_ERROR,
            "HY000",
            format!(
                "Can't connect to MySQL server on '{}' (timed out after {}ms)",
                endpoint.describe(default_port),
                limit.as_millis()
            ),
        )),
    }
}

/// Rewrite native failures the caller cannot act on as reported
fn refine_error(err: NativeError, can_handle_expired_passwords: bool) -> NativeError {
    match err.code {
        codes::ER_MUST_CHANGE_PASSWORD_LOGIN if can_handle_expired_passwords => NativeError::new(
            codes::CL_CANT_HANDLE_EXP_PWD,
            err.sqlstate,
            EXPIRED_PASSWORD_MESSAGE,
        ),
        codes::CR_SSL_CONNECTION_ERROR if err.message.contains("TLS version") => {
            let message = format!("{}{}", err.message, TLS_VERSIONS_HINT);
            NativeError { message, ..err }
        }
        _ => err,
    }
}

async fn finish_session<T: Transport>(
    transport: &mut T,
    plan: &ValidatedOptions,
    endpoint: EndpointDescriptor,
) -> Result<Binding> {
    let reconnect = plan.deferred.reconnect.unwrap_or(false);
    if reconnect {
        transport
            .set_option(NativeOption::Reconnect, &SettingValue::Bool(true))
            .map_err(|e| unsupported(names::RECONNECT, &e))?;
    }

    transport.set_autocommit(true).await?;

    if plan.character_set_results != plan.charset {
        let value = if plan.character_set_results.is_empty() {
            "NULL".to_string()
        } else {
            format!("'{}'", plan.character_set_results.replace('\'', "''"))
        };
        transport
            .execute(&format!("SET SESSION character_set_results = {}", value))
            .await?;
    }

    if let Some(cmd) = &plan.deferred.post_init {
        transport.execute(cmd).await?;
    }

    Ok(Binding {
        port: endpoint.port_or(plan.endpoints.default_port()),
        endpoint,
        user: plan.credentials.user.clone(),
        schema: plan.endpoints.schema().map(str::to_string),
        reconnect,
        statement_result_type: plan.statement_result_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expired_password_rewritten_when_supported() {
        let err = NativeError::new(1820, "HY000", "You must reset your password");
        let refined = refine_error(err.clone(), true);
        assert_eq!(refined.code, codes::CL_CANT_HANDLE_EXP_PWD);
        assert_eq!(refined.sqlstate, "HY000");

        assert_eq!(refine_error(err.clone(), false), err);
    }

    #[test]
    fn test_tls_version_hint() {
        let err = NativeError::new(2026, "HY000", "SSL connection error: TLS version is invalid");
        let refined = refine_error(err, false);
        assert!(refined.message.ends_with("valid versions are: TLSv1.2, TLSv1.3"));

        let other = NativeError::new(2026, "HY000", "SSL connection error: unknown error");
        assert_eq!(refine_error(other.clone(), false), other);
    }

    #[tokio::test]
    async fn test_timeout_maps_to_host_error() {
        let endpoint = EndpointDescriptor::tcp("db", None);
        let err = with_timeout(
            Some(Duration::from_millis(5)),
            &endpoint,
            3306,
            std::future::pending(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, codes::CR_CONN_HOST_ERROR);
        assert!(err.is_network());
        assert!(err.message.contains("db:3306"));
    }

    #[tokio::test]
    async fn test_no_timeout_passes_through() {
        let endpoint = EndpointDescriptor::tcp("db", None);
        let result = with_timeout(None, &endpoint, 3306, async { Ok(()) }).await;
        assert!(result.is_ok());
    }
}
