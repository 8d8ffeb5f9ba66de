//! Function-calling contract with the oracle.
//!
//! Each endpoint offers a closed set of functions. Calls coming back from the oracle
//! are matched against that set by name; anything else is a [`DispatchError`].

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use thiserror::Error;

use signshuffle_core::{FunctionCall, FunctionDeclaration};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("unexpected function {0:?}")]
    UnknownFunction(String),

    #[error("bad arguments for {name}: {source}")]
    BadArguments {
        name: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

fn parse_args<T: DeserializeOwned>(
    name: &'static str,
    args: &Value,
) -> Result<T, DispatchError> {
    serde_json::from_value(args.clone())
        .map_err(|source| DispatchError::BadArguments { name, source })
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionFunction {
    ReportTextPresence,
    ReportExtractedText,
}

impl ExtractionFunction {
    pub fn name(self) -> &'static str {
        match self {
            Self::ReportTextPresence => "report_text_presence",
            Self::ReportExtractedText => "report_extracted_text",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        [Self::ReportTextPresence, Self::ReportExtractedText]
            .into_iter()
            .find(|f| f.name() == name)
    }

    pub fn declaration(self) -> FunctionDeclaration {
        match self {
            Self::ReportTextPresence => FunctionDeclaration {
                name: self.name().to_string(),
                description: "Report whether the image contains any readable text.".to_string(),
                parameters: json!({
                    "type": "OBJECT",
                    "properties": {
                        "has_text": {
                            "type": "BOOLEAN",
                            "description": "True when at least one readable character is visible."
                        }
                    },
                    "required": ["has_text"]
                }),
            },
            Self::ReportExtractedText => FunctionDeclaration {
                name: self.name().to_string(),
                description: "Report the literal text visible in the image.".to_string(),
                parameters: json!({
                    "type": "OBJECT",
                    "properties": {
                        "text": {
                            "type": "STRING",
                            "description": "All visible text, transcribed exactly."
                        }
                    },
                    "required": ["text"]
                }),
            },
        }
    }
}

#[derive(Deserialize)]
struct TextPresenceArgs {
    has_text: bool,
}

#[derive(Deserialize)]
struct ExtractedTextArgs {
    text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionCall {
    TextPresence { has_text: bool },
    ExtractedText { text: String },
}

impl ExtractionCall {
    pub fn parse(call: &FunctionCall) -> Result<Self, DispatchError> {
        let function = ExtractionFunction::from_name(&call.name)
            .ok_or_else(|| DispatchError::UnknownFunction(call.name.clone()))?;
        match function {
            ExtractionFunction::ReportTextPresence => {
                let args: TextPresenceArgs = parse_args(function.name(), &call.args)?;
                Ok(Self::TextPresence { has_text: args.has_text })
            }
            ExtractionFunction::ReportExtractedText => {
                let args: ExtractedTextArgs = parse_args(function.name(), &call.args)?;
                Ok(Self::ExtractedText { text: args.text })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationFunction {
    ProposeSentences,
}

impl GenerationFunction {
    pub fn name(self) -> &'static str {
        match self {
            Self::ProposeSentences => "propose_sentences",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        (name == Self::ProposeSentences.name()).then_some(Self::ProposeSentences)
    }

    pub fn declaration(self) -> FunctionDeclaration {
        match self {
            Self::ProposeSentences => FunctionDeclaration {
                name: self.name().to_string(),
                description: "Propose sentences built only from the available letters.".to_string(),
                parameters: json!({
                    "type": "OBJECT",
                    "properties": {
                        "sentences": {
                            "type": "ARRAY",
                            "items": { "type": "STRING" },
                            "description": "Between one and five candidate sentences."
                        }
                    },
                    "required": ["sentences"]
                }),
            },
        }
    }
}

#[derive(Deserialize)]
struct SentencesArgs {
    sentences: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationCall {
    Sentences(Vec<String>),
}

impl GenerationCall {
    pub fn parse(call: &FunctionCall) -> Result<Self, DispatchError> {
        let function = GenerationFunction::from_name(&call.name)
            .ok_or_else(|| DispatchError::UnknownFunction(call.name.clone()))?;
        match function {
            GenerationFunction::ProposeSentences => {
                let args: SentencesArgs = parse_args(function.name(), &call.args)?;
                Ok(Self::Sentences(args.sentences))
            }
        }
    }
}
