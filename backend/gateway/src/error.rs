//! Gateway errors and their HTTP mapping.
//!
//! Client mistakes map to 400 and oracle trouble maps to 502. Bodies are short
//! plain-text diagnostics.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

use signshuffle_core::PolicyViolation;

use crate::functions::DispatchError;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Data malformed")]
    Malformed,

    #[error("{0}")]
    Policy(#[from] PolicyViolation),

    #[error("Oracle request failed")]
    Oracle(anyhow::Error),

    #[error("Unexpected oracle response")]
    Dispatch(#[from] DispatchError),

    #[error("Oracle returned no sentences")]
    NoSentences,
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Malformed | Self::Policy(_) => StatusCode::BAD_REQUEST,
            Self::Oracle(_) | Self::Dispatch(_) | Self::NoSentences => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::Oracle(e) => error!(error = %format!("{e:#}"), "Oracle call failed"),
            Self::Dispatch(e) => error!(error = %e, "Oracle called an unexpected function"),
            other => warn!(status = status.as_u16(), reason = %other, "Rejecting request"),
        }
        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_400() {
        assert_eq!(GatewayError::Malformed.status(), StatusCode::BAD_REQUEST);
        let too_large = GatewayError::from(PolicyViolation::TooLarge { size: 10, limit: 5 });
        assert_eq!(too_large.status(), StatusCode::BAD_REQUEST);
        assert_eq!(too_large.to_string(), "File too large");
    }

    #[test]
    fn oracle_errors_are_502() {
        let err = GatewayError::Oracle(anyhow::anyhow!("timeout"));
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.to_string(), "Oracle request failed");
    }
}
