use serde::Deserialize;

use crate::types::Value;

/// Behaviour switches for a [Container](crate::Container)
///
/// Can be deserialized from whatever settings source the application uses.
///
/// # Example
/// ```rust
/// use wrapp_wiring::ContainerConfig;
///
/// let config = ContainerConfig::from_json(&serde_json::json!({
///     "strict_params": true,
/// }))
/// .unwrap();
/// assert!(config.strict_params);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContainerConfig {
    /// Fail with `NotFound` when a `%param` reference names a missing param
    pub strict_params: bool,
    /// Substituted for missing params when not strict, `null` if unset
    pub param_default: Option<serde_json::Value>,
}

impl ContainerConfig {
    pub fn strict() -> Self {
        Self {
            strict_params: true,
            ..Self::default()
        }
    }

    pub fn with_param_default(mut self, value: impl Into<serde_json::Value>) -> Self {
        self.param_default = Some(value.into());
        self
    }

    pub fn from_json(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(value)
    }

    /// Value used in place of a missing param
    pub(crate) fn missing_param(&self) -> Value {
        self.param_default
            .clone()
            .map(Value::from)
            .unwrap_or_default()
    }
}
