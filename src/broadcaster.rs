//! Status Broadcaster.
//!
//! A `Mutex`-protected registry of in-flight tournament status, generalized
//! from "a list of in-flight matches" to "a list of interested subscribers
//! per tournament". Survives subscriber churn: send errors are swallowed and
//! dead senders are pruned on the next publish.

use std::collections::HashMap;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Mutex;

use crate::data::TournamentStatus;

struct Entry {
    latest: TournamentStatus,
    subscribers: Vec<Sender<TournamentStatus>>,
}

/// In-memory registry of tournament states, shared across all concurrently
/// running tournaments.
#[derive(Default)]
pub struct Broadcaster {
    entries: Mutex<HashMap<String, Entry>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Broadcaster {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Replaces the registry entry for `status.id` and delivers it to every
    /// current subscriber. Never fails: a closed subscriber is simply
    /// dropped from the list.
    pub fn publish(&self, status: TournamentStatus) {
        let mut entries = self.entries.lock().expect("broadcaster mutex poisoned");
        let entry = entries.entry(status.id.clone()).or_insert_with(|| Entry {
            latest: status.clone(),
            subscribers: Vec::new(),
        });
        entry.latest = status.clone();
        entry.subscribers.retain(|sender| sender.send(status.clone()).is_ok());
    }

    /// Subscribes to a tournament's status stream. The current status (if
    /// any) is delivered immediately so late subscribers are not stuck
    /// with no data.
    pub fn subscribe(&self, tournament_id: &str) -> Receiver<TournamentStatus> {
        let (sender, receiver) = channel();
        let mut entries = self.entries.lock().expect("broadcaster mutex poisoned");
        if let Some(entry) = entries.get_mut(tournament_id) {
            let _ = sender.send(entry.latest.clone());
            entry.subscribers.push(sender);
        } else {
            // No tournament registered yet; still register the subscriber so
            // it receives the first publish once the tournament starts.
            entries.insert(
                tournament_id.to_string(),
                Entry {
                    latest: TournamentStatus::queued(tournament_id, 0, 0),
                    subscribers: vec![sender],
                },
            );
        }
        receiver
    }

    /// The latest known status for a tournament, if any has been published.
    pub fn status(&self, tournament_id: &str) -> Option<TournamentStatus> {
        let entries = self.entries.lock().expect("broadcaster mutex poisoned");
        entries.get(tournament_id).map(|e| e.latest.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TournamentState;

    #[test]
    fn late_subscriber_gets_current_status_immediately() {
        let broadcaster = Broadcaster::new();
        broadcaster.publish(TournamentStatus::queued("cup-1", 2, 8));

        let receiver = broadcaster.subscribe("cup-1");
        let status = receiver.recv().unwrap();
        assert_eq!(status.id, "cup-1");
        assert_eq!(status.state, TournamentState::Queued);
    }

    #[test]
    fn dead_subscribers_are_pruned_without_failing_publish() {
        let broadcaster = Broadcaster::new();
        {
            let _receiver = broadcaster.subscribe("cup-1");
            // dropped here; publish must not panic or error
        }
        broadcaster.publish(TournamentStatus::queued("cup-1", 1, 4));
        broadcaster.publish(TournamentStatus::queued("cup-1", 1, 4));
    }

    #[test]
    fn publish_updates_latest_status() {
        let broadcaster = Broadcaster::new();
        broadcaster.publish(TournamentStatus::queued("cup-1", 1, 4));
        let mut running = TournamentStatus::queued("cup-1", 1, 4);
        running.state = TournamentState::Running;
        running.completed_games = 2;
        broadcaster.publish(running);

        let status = broadcaster.status("cup-1").unwrap();
        assert_eq!(status.state, TournamentState::Running);
        assert_eq!(status.completed_games, 2);
    }
}
