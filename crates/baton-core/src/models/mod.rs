pub mod agent;
pub mod message;
pub mod question;
pub mod todo;
pub mod workflow;

pub use agent::*;
pub use message::*;
pub use question::*;
pub use todo::*;
pub use workflow::*;
