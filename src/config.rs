//! Bridge configuration.
//!
//! Defaults match a stock install: a local Mosquitto broker with the
//! `mqttbed` account and a Serta base. A TOML file (feature `config-file`)
//! can override any subset of fields, and the `BED_ADDRESS`/`BLE_ADDRESS`
//! and `BED_TYPE` environment variables override the file.
//!
//! # Example
//!
//! ```rust
//! use mqtt_bed::config::{BedConfig, Config, MqttConfig};
//! use mqtt_bed::BedModel;
//!
//! // Use defaults
//! let config = Config::default();
//! assert_eq!(config.mqtt.topic, "bed");
//!
//! // Or customize
//! let config = Config::default()
//!     .with_mqtt(MqttConfig::default().with_host("192.168.1.100"))
//!     .with_bed(BedConfig::default().with_model(BedModel::Linak));
//! assert_eq!(config.mqtt.state_topic(), "bed/state");
//! ```

use crate::address::PeripheralAddress;
use crate::error::{AddressError, ConfigError};
use crate::models::BedModel;
use crate::traits::QoS;

/// Environment variables holding the bed address, in priority order.
pub const ADDRESS_ENV_VARS: [&str; 2] = ["BED_ADDRESS", "BLE_ADDRESS"];

/// Environment variable holding the bed model.
pub const MODEL_ENV_VAR: &str = "BED_TYPE";

// ============================================================================
// Main Config
// ============================================================================

/// Complete application configuration
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// MQTT client configuration
    pub mqtt: MqttConfig,
    /// Controlled bed
    pub bed: BedConfig,
    /// Reconnect and keepalive timing
    pub timing: TimingConfig,
}

impl Config {
    /// Set MQTT configuration
    pub fn with_mqtt(mut self, mqtt: MqttConfig) -> Self {
        self.mqtt = mqtt;
        self
    }

    /// Set bed configuration
    pub fn with_bed(mut self, bed: BedConfig) -> Self {
        self.bed = bed;
        self
    }

    /// Set timing configuration
    pub fn with_timing(mut self, timing: TimingConfig) -> Self {
        self.timing = timing;
        self
    }

    /// Parse a TOML document. Missing fields keep their defaults.
    #[cfg(feature = "config-file")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Read and parse a TOML file.
    #[cfg(feature = "config-file")]
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Apply environment overrides read through `lookup`.
    ///
    /// `BED_ADDRESS` wins over `BLE_ADDRESS`. Empty values are ignored.
    ///
    /// ```
    /// use mqtt_bed::{BedModel, Config};
    ///
    /// let config = Config::default()
    ///     .apply_env(|key| match key {
    ///         "BLE_ADDRESS" => Some("00:11:22:33:44:55".to_string()),
    ///         "BED_TYPE" => Some("linak".to_string()),
    ///         _ => None,
    ///     })
    ///     .unwrap();
    ///
    /// assert_eq!(config.bed.address, "00:11:22:33:44:55");
    /// assert_eq!(config.bed.model, BedModel::Linak);
    /// ```
    pub fn apply_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(address) = ADDRESS_ENV_VARS.iter().find_map(|&key| non_empty(key)) {
            self.bed.address = address.trim().to_string();
        }

        if let Some(model) = non_empty(MODEL_ENV_VAR) {
            self.bed.model =
                BedModel::from_text(&model).ok_or(ConfigError::UnknownModel(model))?;
        }

        Ok(self)
    }

    /// Apply overrides from the process environment.
    pub fn apply_process_env(self) -> Result<Self, ConfigError> {
        self.apply_env(|key| std::env::var(key).ok())
    }

    /// Check values that cannot be validated by the type system.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bed.address()?;
        if QoS::from_level(self.mqtt.qos).is_none() {
            return Err(ConfigError::Parse(format!(
                "mqtt.qos must be 0, 1 or 2, got {}",
                self.mqtt.qos
            )));
        }
        Ok(())
    }
}

// ============================================================================
// MQTT Config
// ============================================================================

/// MQTT client configuration
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MqttConfig {
    /// Broker hostname or IP
    pub host: String,
    /// Broker port
    pub port: u16,
    /// Username; empty disables authentication
    pub username: String,
    /// Password
    pub password: String,
    /// Client ID (should be unique per broker)
    pub client_id: String,
    /// Command topic; state is published below it
    pub topic: String,
    /// Presence topic
    pub checkin_topic: String,
    /// Payload published periodically to the presence topic
    pub checkin_payload: String,
    /// Payload published to the presence topic on every (re)connect
    pub online_payload: String,
    /// Seconds between presence publications
    pub checkin_interval_secs: u64,
    /// QoS level (0-2) for the command subscription and state topics
    pub qos: u8,
    /// MQTT keep-alive in seconds
    pub keep_alive_secs: u64,
    /// Seconds to wait before reconnecting after a broker error
    pub reconnect_interval_secs: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 1883,
            username: "mqttbed".to_string(),
            password: "mqtt-bed".to_string(),
            client_id: "mqtt-bed".to_string(),
            topic: "bed".to_string(),
            checkin_topic: "checkIn/bed".to_string(),
            checkin_payload: "OK".to_string(),
            online_payload: "online".to_string(),
            checkin_interval_secs: 30,
            qos: 0,
            keep_alive_secs: 30,
            reconnect_interval_secs: 3,
        }
    }
}

impl MqttConfig {
    /// Set the broker host
    pub fn with_host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    /// Set the broker port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the client ID
    pub fn with_client_id(mut self, id: &str) -> Self {
        self.client_id = id.to_string();
        self
    }

    /// Set the command topic
    pub fn with_topic(mut self, topic: &str) -> Self {
        self.topic = topic.to_string();
        self
    }

    /// Set authentication credentials
    pub fn with_auth(mut self, username: &str, password: &str) -> Self {
        self.username = username.to_string();
        self.password = password.to_string();
        self
    }

    /// Disable authentication
    pub fn without_auth(mut self) -> Self {
        self.username.clear();
        self.password.clear();
        self
    }

    /// Set the presence interval
    pub fn with_checkin_interval_secs(mut self, secs: u64) -> Self {
        self.checkin_interval_secs = secs;
        self
    }

    /// Set the QoS level (clamped to 2)
    pub fn with_qos(mut self, qos: u8) -> Self {
        self.qos = qos.min(2);
        self
    }

    /// Configured QoS, falling back to at-most-once for invalid levels
    pub fn qos(&self) -> QoS {
        QoS::from_level(self.qos).unwrap_or_default()
    }

    /// Build a topic below the command topic
    pub fn topic(&self, suffix: &str) -> String {
        format!("{}/{}", self.topic, suffix)
    }

    /// Topic of the JSON state snapshot
    pub fn state_topic(&self) -> String {
        self.topic("state")
    }

    /// Topic of a single state field
    pub fn state_field_topic(&self, field: &str) -> String {
        self.topic(&format!("state/{field}"))
    }

    /// Check if authentication is configured
    pub fn has_auth(&self) -> bool {
        !self.username.is_empty()
    }
}

// ============================================================================
// Bed Config
// ============================================================================

/// Controlled bed
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BedConfig {
    /// Hardware address, `AA:BB:CC:DD:EE:FF`
    pub address: String,
    /// Controller model
    pub model: BedModel,
}

impl Default for BedConfig {
    fn default() -> Self {
        Self {
            address: "7C:EC:79:FF:6D:02".to_string(),
            model: BedModel::Serta,
        }
    }
}

impl BedConfig {
    /// Set the hardware address
    pub fn with_address(mut self, address: &str) -> Self {
        self.address = address.to_string();
        self
    }

    /// Set the controller model
    pub fn with_model(mut self, model: BedModel) -> Self {
        self.model = model;
        self
    }

    /// Parse the address with the model's addressing mode
    pub fn address(&self) -> Result<PeripheralAddress, AddressError> {
        PeripheralAddress::parse(&self.address, self.model.descriptor().address_type)
    }
}

// ============================================================================
// Timing Config
// ============================================================================

/// Reconnect and keepalive timing, in milliseconds
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TimingConfig {
    /// Delay between connect attempts
    pub connect_retry_ms: u64,
    /// Reconnects slower than this drop the pending command
    pub reconnect_budget_ms: u64,
    /// Period of the keepalive prober
    pub keepalive_interval_ms: u64,
    /// Delay before the second keepalive attempt
    pub keepalive_retry_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            connect_retry_ms: 1_000,
            reconnect_budget_ms: 5_000,
            keepalive_interval_ms: 10_000,
            keepalive_retry_ms: 500,
        }
    }
}

impl TimingConfig {
    /// Set the connect retry delay
    pub fn with_connect_retry_ms(mut self, ms: u64) -> Self {
        self.connect_retry_ms = ms;
        self
    }

    /// Set the reconnect budget
    pub fn with_reconnect_budget_ms(mut self, ms: u64) -> Self {
        self.reconnect_budget_ms = ms;
        self
    }

    /// Set the keepalive period
    pub fn with_keepalive_interval_ms(mut self, ms: u64) -> Self {
        self.keepalive_interval_ms = ms;
        self
    }

    /// Set the keepalive retry delay
    pub fn with_keepalive_retry_ms(mut self, ms: u64) -> Self {
        self.keepalive_retry_ms = ms;
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::AddressType;

    fn env<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.mqtt.host, "127.0.0.1");
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.mqtt.checkin_topic, "checkIn/bed");
        assert_eq!(config.mqtt.checkin_interval_secs, 30);
        assert_eq!(config.bed.model, BedModel::Serta);
        assert_eq!(config.timing.reconnect_budget_ms, 5_000);
        assert_eq!(config.timing.keepalive_interval_ms, 10_000);
        config.validate().unwrap();
    }

    #[test]
    fn mqtt_topic_building() {
        let mqtt = MqttConfig::default().with_topic("bedroom/bed");
        assert_eq!(mqtt.topic("state"), "bedroom/bed/state");
        assert_eq!(mqtt.state_field_topic("head"), "bedroom/bed/state/head");
    }

    #[test]
    fn mqtt_auth_detection() {
        assert!(MqttConfig::default().has_auth());
        assert!(!MqttConfig::default().without_auth().has_auth());
    }

    #[test]
    fn qos_clamped() {
        assert_eq!(MqttConfig::default().with_qos(9).qos(), QoS::ExactlyOnce);
        assert_eq!(MqttConfig::default().qos(), QoS::AtMostOnce);
    }

    #[test]
    fn bed_address_uses_model_addressing() {
        let bed = BedConfig::default().with_model(BedModel::DewertOkin);
        assert_eq!(bed.address().unwrap().address_type(), AddressType::Random);

        let bed = BedConfig::default().with_model(BedModel::DewertOkinOld);
        assert_eq!(bed.address().unwrap().address_type(), AddressType::Public);
    }

    #[test]
    fn env_overrides() {
        let config = Config::default()
            .apply_env(env(&[
                ("BED_ADDRESS", "AA:BB:CC:DD:EE:FF"),
                ("BLE_ADDRESS", "00:11:22:33:44:55"),
                ("BED_TYPE", "DewertOkin"),
            ]))
            .unwrap();
        assert_eq!(config.bed.address, "AA:BB:CC:DD:EE:FF");
        assert_eq!(config.bed.model, BedModel::DewertOkin);
    }

    #[test]
    fn env_empty_values_ignored() {
        let config = Config::default()
            .apply_env(env(&[("BED_ADDRESS", "  "), ("BED_TYPE", "")]))
            .unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn env_unknown_model() {
        let err = Config::default()
            .apply_env(env(&[("BED_TYPE", "waterbed")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownModel(m) if m == "waterbed"));
    }

    #[test]
    fn validate_rejects_bad_address() {
        let config = Config::default().with_bed(BedConfig::default().with_address("nope"));
        assert!(matches!(config.validate(), Err(ConfigError::Address(_))));
    }

    #[test]
    fn builder_pattern() {
        let config = Config::default()
            .with_mqtt(MqttConfig::default().with_host("broker.local").with_port(8883))
            .with_timing(TimingConfig::default().with_keepalive_retry_ms(250));
        assert_eq!(config.mqtt.host, "broker.local");
        assert_eq!(config.mqtt.port, 8883);
        assert_eq!(config.timing.keepalive_retry_ms, 250);
    }

    #[cfg(feature = "config-file")]
    #[test]
    fn toml_partial_override() {
        let config = Config::from_toml_str(
            r#"
            [mqtt]
            host = "10.0.0.2"
            topic = "master/bed"

            [bed]
            address = "00:11:22:33:44:55"
            model = "dewertokin-old"

            [timing]
            keepalive_interval_ms = 5000
            "#,
        )
        .unwrap();

        assert_eq!(config.mqtt.host, "10.0.0.2");
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.mqtt.state_topic(), "master/bed/state");
        assert_eq!(config.bed.model, BedModel::DewertOkinOld);
        assert_eq!(config.timing.keepalive_interval_ms, 5000);
        assert_eq!(config.timing.connect_retry_ms, 1000);
    }

    #[cfg(feature = "config-file")]
    #[test]
    fn toml_unknown_model_is_parse_error() {
        let err = Config::from_toml_str("[bed]\nmodel = \"waterbed\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
