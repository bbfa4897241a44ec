pub mod allocator;
pub mod case;

pub use allocator::{normalize_identifier, IdentCase, IdentifierAllocator, Scope};
pub use case::{to_camel_case, to_pascal_case, to_screaming_snake_case, to_snake_case};
