use common::CorrelationId;
use serde::de::DeserializeOwned;

use crate::error::DispatchError;

/// Outcome of one `consume` call.
///
/// The mediator never lets a dispatch fault escape as a plain error;
/// callers inspect [`is_successful`](Self::is_successful) and the
/// ordered [`errors`](Self::errors) list instead.
#[derive(Debug)]
pub struct ConsumeResult {
    correlation_id: CorrelationId,
    state: Option<serde_json::Value>,
    completed: bool,
    errors: Vec<DispatchError>,
}

impl ConsumeResult {
    pub(crate) fn success(
        correlation_id: CorrelationId,
        state: serde_json::Value,
        completed: bool,
    ) -> Self {
        Self {
            correlation_id,
            state: Some(state),
            completed,
            errors: Vec::new(),
        }
    }

    pub(crate) fn failure(correlation_id: CorrelationId, error: DispatchError) -> Self {
        Self {
            correlation_id,
            state: None,
            completed: false,
            errors: vec![error],
        }
    }

    /// Returns true if the dispatch completed without errors.
    pub fn is_successful(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the correlation ID the message was addressed to.
    pub fn correlation_id(&self) -> CorrelationId {
        self.correlation_id
    }

    /// Returns the resulting state snapshot on success.
    ///
    /// For a completed saga this is the final state even though the
    /// repository record has already been removed.
    pub fn state(&self) -> Option<&serde_json::Value> {
        self.state.as_ref()
    }

    /// Decodes the resulting state snapshot into a typed value.
    pub fn state_as<D: DeserializeOwned>(&self) -> Result<Option<D>, serde_json::Error> {
        self.state
            .as_ref()
            .map(|value| serde_json::from_value(value.clone()))
            .transpose()
    }

    /// Returns true if the saga marked itself complete on this dispatch.
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Returns the ordered list of dispatch errors, empty on success.
    pub fn errors(&self) -> &[DispatchError] {
        &self.errors
    }
}
