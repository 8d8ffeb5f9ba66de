pub mod error;
pub mod letters;
pub mod message;
pub mod policy;
pub mod traits;
pub mod validator;

pub use error::SignError;
pub use letters::{normalize, tally, LetterCount};
pub use message::{ExtractRequest, GenerateRequest};
pub use policy::{PolicyViolation, UploadPolicy, ACCEPTED_MIME_TYPES};
pub use traits::{
    FunctionCall, FunctionDeclaration, Oracle, OracleRequest, OracleResponse, Part, Turn,
    TurnRole,
};
pub use validator::{annotate, check, is_valid, Verdict, Violation};
