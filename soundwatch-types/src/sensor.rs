//! Sensor directory entries.

/// A sensor as listed by `/sensors`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WireSensor {
    #[cfg_attr(feature = "serde", serde(default))]
    pub id: Option<String>,

    #[cfg_attr(feature = "serde", serde(default))]
    pub location: Option<String>,

    /// Sensor kind. Serialized as `type_` by the service.
    #[cfg_attr(feature = "serde", serde(default, rename = "type_"))]
    pub kind: Option<String>,
}
