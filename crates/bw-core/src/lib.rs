pub mod error;
pub mod interpreter;
pub mod types;
pub mod value;

pub use error::StoryError;
pub use interpreter::StoryInterpreter;
pub use types::*;
pub use value::*;
