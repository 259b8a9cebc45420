use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;
use tracing::{debug, info};

use grid_snap::PointerEvent;

use crate::config::ScriptStep;

/// Broadcast channel carrying pointer events to every subscriber.
/// Subscribers see the channel close once every bus clone is dropped.
#[derive(Debug, Clone)]
pub struct PointerBus {
    tx: broadcast::Sender<Arc<PointerEvent>>,
}

impl PointerBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Returns how many subscribers received the event.
    pub fn publish(&self, event: PointerEvent) -> usize {
        // No subscribers yet is not an error for a pointer stream
        self.tx.send(Arc::new(event)).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<PointerEvent>> {
        self.tx.subscribe()
    }
}

/// Plays scripted pointer input onto the bus, sleeping before each step.
/// Consumes the bus so the channel closes when the script ends.
pub async fn replay_script(bus: PointerBus, steps: Vec<ScriptStep>) -> anyhow::Result<()> {
    info!(steps = steps.len(), "Input replay started.");
    for step in &steps {
        if step.delay_ms > 0 {
            time::sleep(Duration::from_millis(step.delay_ms)).await;
        }
        let event = step.to_event();
        let receivers = bus.publish(event);
        debug!(?event, receivers, "Published pointer event");
    }
    info!("Input replay finished.");
    Ok(())
}
