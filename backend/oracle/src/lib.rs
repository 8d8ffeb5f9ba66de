pub mod chat;
pub mod providers;

pub use chat::OracleChat;
pub use providers::gemini::GeminiOracle;
pub use providers::scripted::ScriptedOracle;
