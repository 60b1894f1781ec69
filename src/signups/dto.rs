use serde::Serialize;

use crate::signups::model::{Association, SignupStatus};

/// A signup as returned to clients, with its derived lifecycle state.
#[derive(Debug, Clone, Serialize)]
pub struct SignupView {
    #[serde(flatten)]
    pub association: Association,
    pub status: SignupStatus,
}

impl From<Association> for SignupView {
    fn from(association: Association) -> Self {
        Self {
            status: association.status(),
            association,
        }
    }
}
