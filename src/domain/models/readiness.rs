use serde::Deserialize;
use serde::Serialize;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Readiness {
    Idle,
    Ingesting,
    Ready,
}

impl Readiness {
    pub fn derive(document_count: usize, ingesting: bool) -> Readiness {
        if ingesting {
            return Readiness::Ingesting;
        }
        if document_count == 0 {
            return Readiness::Idle;
        }

        return Readiness::Ready;
    }
}
