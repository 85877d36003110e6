//! Driver implementation

use super::connection_string::ConnectionUri;
use crate::connection::{Connection, Establisher, Transport};
use crate::endpoint::{RandomSelector, Selector};
use crate::options::ConnectOptions;
use crate::plugin::{AuthMessageCallback, DriverId, PluginConfigGuard};
use crate::Result;
use std::fmt;
use std::sync::Arc;

/// Connection factory
///
/// A driver owns an identity and an optional authentication message
/// callback. Every driver in a process shares one [`PluginConfigGuard`], so
/// connections made by different drivers never see each other's plugin
/// configuration half applied.
#[derive(Clone)]
pub struct Driver {
    guard: Arc<PluginConfigGuard>,
    id: DriverId,
    callback: Option<AuthMessageCallback>,
    default_plugin_dir: Option<String>,
}

impl fmt::Debug for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Driver")
            .field("id", &self.id)
            .field("has_callback", &self.callback.is_some())
            .field("default_plugin_dir", &self.default_plugin_dir)
            .finish()
    }
}

impl Driver {
    /// Create a driver sharing `guard`
    pub fn new(guard: Arc<PluginConfigGuard>) -> Self {
        Self {
            guard,
            id: DriverId::next(),
            callback: None,
            default_plugin_dir: None,
        }
    }

    /// Plugin directory used when the options do not name one
    pub fn with_default_plugin_dir(mut self, dir: impl Into<String>) -> Self {
        self.default_plugin_dir = Some(dir.into());
        self
    }

    /// Route authentication plugin messages of this driver's connections to `callback`
    pub fn set_auth_message_callback<F>(&mut self, callback: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
    }

    /// Stop routing plugin messages to this driver
    pub fn clear_auth_message_callback(&mut self) {
        self.callback = None;
    }

    pub fn id(&self) -> DriverId {
        self.id
    }

    pub fn guard(&self) -> &Arc<PluginConfigGuard> {
        &self.guard
    }

    /// Connect using options, picking remaining endpoints uniformly at random
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # async fn example() -> connector_wire::Result<()> {
    /// use connector_wire::client::Driver;
    /// use connector_wire::options::{names, ConnectOptions};
    /// use connector_wire::plugin::PluginConfigGuard;
    /// use connector_wire::testing::ScriptedTransport;
    /// use std::sync::Arc;
    ///
    /// let driver = Driver::new(Arc::new(PluginConfigGuard::new()));
    /// let opts = ConnectOptions::new()
    ///     .set(names::USER_NAME, "app")?
    ///     .host("db1.internal", Some(3306));
    ///
    /// let conn = driver.connect(ScriptedTransport::new(), &opts).await?;
    /// println!("connected to {}", conn.host_info());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect<T: Transport>(
        &self,
        transport: T,
        options: &ConnectOptions,
    ) -> Result<Connection<T>> {
        let mut selector = RandomSelector::new();
        self.connect_with_selector(transport, options, &mut selector)
            .await
    }

    /// Connect using a connection URI
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # async fn example() -> connector_wire::Result<()> {
    /// use connector_wire::client::Driver;
    /// use connector_wire::plugin::PluginConfigGuard;
    /// use connector_wire::testing::ScriptedTransport;
    /// use std::sync::Arc;
    ///
    /// let driver = Driver::new(Arc::new(PluginConfigGuard::new()));
    /// let conn = driver
    ///     .connect_uri(
    ///         ScriptedTransport::new(),
    ///         "mysql://app@db1:3306,db2:3306/shop?multi-host=true&connect-timeout=2000",
    ///     )
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect_uri<T: Transport>(&self, transport: T, uri: &str) -> Result<Connection<T>> {
        let options = ConnectionUri::parse(uri)?.into_options()?;
        self.connect(transport, &options).await
    }

    /// Connect, letting `selector` pick the endpoint order
    pub async fn connect_with_selector<T: Transport>(
        &self,
        transport: T,
        options: &ConnectOptions,
        selector: &mut dyn Selector,
    ) -> Result<Connection<T>> {
        Establisher::new(&self.guard)
            .driver(self.id, self.callback.as_ref())
            .default_plugin_dir(self.default_plugin_dir.as_deref())
            .establish(transport, options, selector)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drivers_get_distinct_ids() {
        let guard = Arc::new(PluginConfigGuard::new());
        let a = Driver::new(Arc::clone(&guard));
        let b = Driver::new(guard);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_callback_set_and_clear() {
        let mut driver = Driver::new(Arc::new(PluginConfigGuard::new()));
        driver.set_auth_message_callback(|_| {});
        assert!(format!("{:?}", driver).contains("has_callback: true"));
        driver.clear_auth_message_callback();
        assert!(driver.callback.is_none());
    }
}
