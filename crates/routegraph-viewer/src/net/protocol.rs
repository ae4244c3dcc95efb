use routegraph_core::QueryOutcome;

#[derive(Debug, Clone)]
pub struct Incoming {
    pub endpoint: String,
    pub kind: IncomingKind,
}

#[derive(Debug, Clone)]
pub enum IncomingKind {
    Connected,
    Disconnected,
    Outcome(QueryOutcome),
    Error(String),
}

impl Incoming {
    pub fn connected(endpoint: String) -> Self {
        Self { endpoint, kind: IncomingKind::Connected }
    }

    pub fn disconnected(endpoint: String) -> Self {
        Self { endpoint, kind: IncomingKind::Disconnected }
    }

    pub fn outcome(endpoint: String, outcome: QueryOutcome) -> Self {
        Self { endpoint, kind: IncomingKind::Outcome(outcome) }
    }

    pub fn error(endpoint: String, message: String) -> Self {
        Self { endpoint, kind: IncomingKind::Error(message) }
    }
}
