//! Dynamic object model.
//!
//! Objects are plain property bags tagged with their registered type name.
//! Related objects nest by value; identity between rows is carried by
//! stored addresses, never by shared pointers.

mod object;
mod value;

pub use object::Object;
pub use value::Value;
