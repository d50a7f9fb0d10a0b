pub mod openai;
pub mod reliable;
mod traits;
mod types;

pub use openai::OpenAiOracle;
pub use reliable::ReliableOracle;
pub use traits::{NullOracle, Oracle};
pub use types::{ChatChoice, ChatCompletion, ChoiceMessage, CompletionRequest};
