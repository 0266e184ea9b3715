use super::{ConversionError, ConversionErrors};
use serde_json::Value;

/// Converts host values into the canonical representation stored on records.
///
/// Implementations are shared by every merge task of a tick, so they must be
/// usable from several worker threads at once.
pub trait Converter: Send + Sync {
    /// Human readable converter name (e.g. the kit it belongs to)
    fn name(&self) -> &str;

    fn can_convert_to_canonical(&self, value: &Value) -> bool;

    fn convert_to_canonical(&self, value: &Value) -> Result<Value, ConversionError>;

    /// Errors accumulated while converting, drained by the node on collect
    fn errors(&self) -> &ConversionErrors;
}

/// Convert `value` if the converter supports it, otherwise pass it through
pub fn try_convert_item(value: &Value, converter: &dyn Converter) -> Result<Value, ConversionError> {
    if converter.can_convert_to_canonical(value) {
        converter.convert_to_canonical(value)
    } else {
        Ok(value.clone())
    }
}

/// Converter that accepts nothing, so every value is stored as-is
#[derive(Debug, Default)]
pub struct PassthroughConverter {
    errors: ConversionErrors,
}

impl PassthroughConverter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Converter for PassthroughConverter {
    fn name(&self) -> &str {
        "passthrough"
    }

    fn can_convert_to_canonical(&self, _value: &Value) -> bool {
        false
    }

    fn convert_to_canonical(&self, value: &Value) -> Result<Value, ConversionError> {
        Ok(value.clone())
    }

    fn errors(&self) -> &ConversionErrors {
        &self.errors
    }
}
