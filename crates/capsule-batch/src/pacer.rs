//! Minimum spacing between outbound deliveries.

use std::time::Duration;

use tokio::time::Instant;

/// Awaits until at least `spacing` has passed since the previous send.
#[derive(Debug)]
pub struct DeliveryPacer {
    spacing: Duration,
    last_sent: Option<Instant>,
}

impl DeliveryPacer {
    pub fn new(spacing: Duration) -> Self {
        Self {
            spacing,
            last_sent: None,
        }
    }

    pub fn spacing(&self) -> Duration {
        self.spacing
    }

    /// Wait for the next slot and claim it. The first call returns at once.
    pub async fn ready(&mut self) {
        if let Some(last) = self.last_sent {
            tokio::time::sleep_until(last + self.spacing).await;
        }
        self.last_sent = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn enforces_spacing_between_sends() {
        let mut pacer = DeliveryPacer::new(Duration::from_millis(30));
        let start = std::time::Instant::now();
        pacer.ready().await;
        assert!(start.elapsed() < Duration::from_millis(30));
        pacer.ready().await;
        pacer.ready().await;
        assert!(start.elapsed() >= Duration::from_millis(60));
    }
}
