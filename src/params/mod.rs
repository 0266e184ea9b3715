pub mod schema;
pub mod slot;

pub use schema::{SchemaError, SlotSchema, DEFAULT_NICKNAME_POOL};
pub use slot::{Access, InputSlot};
