pub mod converter;
pub mod error;

pub use converter::{try_convert_item, Converter, PassthroughConverter};
pub use error::{ConversionError, ConversionErrors};
