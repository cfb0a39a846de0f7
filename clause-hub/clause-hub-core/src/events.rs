use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type")]
pub enum ClauseEvent {
    Created { id: Uuid },
    Updated { id: Uuid },
    Renamed { id: Uuid, title: String },
    Moved { id: Uuid, new_parent: Option<Uuid> },
    Deleted { id: Uuid },
    ParentsRepaired { updated: usize },
    BulkRenamed { succeeded: usize, failed: usize },
}

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ClauseEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(100);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClauseEvent> {
        self.tx.subscribe()
    }

    pub fn send(&self, event: ClauseEvent) {
        let _ = self.tx.send(event);
    }
}
