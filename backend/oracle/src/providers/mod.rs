pub mod gemini;
pub mod scripted;
