use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::{PathItem, TransferIntent, TransferKey, TransferKind, TransferRecord};

/// Snapshot of the sync engine's state as the UI sees it.
///
/// The UI never reads engine state through globals; the snapshot is owned by
/// the app and handed to projection functions by reference. Transfers keep
/// insertion order, which is the order the popup selects by.
#[derive(Clone, Debug, Default)]
pub struct SyncSnapshot {
    pub path_items: HashMap<String, PathItem>,
    pub transfers: Vec<(TransferKey, TransferRecord)>,
    pub username: Option<String>,
}

impl SyncSnapshot {
    /// Looks up a path item, falling back to an unknown placeholder.
    pub fn path_item(&self, path: &str) -> PathItem {
        self.path_items
            .get(path)
            .cloned()
            .unwrap_or_else(|| PathItem::unknown(path))
    }

    /// Inserts or updates a transfer. An existing key is updated in place so
    /// the sequence keeps its original insertion order.
    pub fn upsert_transfer(&mut self, key: TransferKey, record: TransferRecord) {
        if let Some((_, existing)) = self.transfers.iter_mut().find(|(k, _)| *k == key) {
            *existing = record;
        } else {
            self.transfers.push((key, record));
        }
    }

    pub fn remove_transfer(&mut self, key: &TransferKey) {
        self.transfers.retain(|(k, _)| k != key);
    }

    pub fn transfer(&self, key: &TransferKey) -> Option<&TransferRecord> {
        self.transfers
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, r)| r)
    }

    pub fn has_active_downloads(&self) -> bool {
        self.transfers.iter().any(|(_, r)| {
            r.kind == TransferKind::Download && r.intent != TransferIntent::None && !r.is_done
        })
    }
}

/// One state-change notification from the sync engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SyncEvent {
    Username {
        username: String,
    },
    PathItemUpdated {
        path: String,
        item: PathItem,
    },
    PathItemRemoved {
        path: String,
    },
    TransferStarted {
        key: TransferKey,
        /// Full path of the item being transferred; the routing layer uses
        /// it when surfacing the progress popup.
        #[serde(default)]
        path: String,
        record: TransferRecord,
    },
    TransferProgressed {
        key: TransferKey,
        complete_portion: f32,
        end_estimate: Option<i64>,
    },
    TransferFinished {
        key: TransferKey,
    },
}

impl SyncSnapshot {
    pub fn apply_event(&mut self, event: SyncEvent) {
        match event {
            SyncEvent::Username { username } => {
                self.username = if username.trim().is_empty() {
                    None
                } else {
                    Some(username)
                };
            }
            SyncEvent::PathItemUpdated { path, item } => {
                self.path_items.insert(path, item);
            }
            SyncEvent::PathItemRemoved { path } => {
                self.path_items.remove(&path);
            }
            SyncEvent::TransferStarted { key, record, .. } => {
                self.upsert_transfer(key, record);
            }
            SyncEvent::TransferProgressed {
                key,
                complete_portion,
                end_estimate,
            } => {
                if let Some((_, record)) = self.transfers.iter_mut().find(|(k, _)| *k == key) {
                    record.complete_portion = complete_portion.clamp(0.0, 1.0);
                    record.end_estimate = end_estimate;
                }
            }
            SyncEvent::TransferFinished { key } => {
                if let Some((_, record)) = self.transfers.iter_mut().find(|(k, _)| *k == key) {
                    record.complete_portion = 1.0;
                    record.is_done = true;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PathType;

    fn download(portion: f32) -> TransferRecord {
        TransferRecord {
            kind: TransferKind::Download,
            intent: TransferIntent::Share,
            complete_portion: portion,
            end_estimate: None,
            is_done: false,
        }
    }

    #[test]
    fn missing_path_item_falls_back_to_unknown() {
        let snapshot = SyncSnapshot::default();
        let item = snapshot.path_item("/loft/private/alice/doc.txt");
        assert_eq!(item.name, "doc.txt");
        assert_eq!(item.ptype, PathType::Unknown);
    }

    #[test]
    fn upsert_keeps_insertion_order() {
        let mut snapshot = SyncSnapshot::default();
        snapshot.upsert_transfer(TransferKey::new("a"), download(0.1));
        snapshot.upsert_transfer(TransferKey::new("b"), download(0.2));
        snapshot.upsert_transfer(TransferKey::new("a"), download(0.9));

        let keys: Vec<&str> = snapshot.transfers.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
        let a = snapshot.transfer(&TransferKey::new("a")).unwrap();
        assert_eq!(a.complete_portion, 0.9);
    }

    #[test]
    fn finished_event_marks_done_and_completes_portion() {
        let mut snapshot = SyncSnapshot::default();
        snapshot.upsert_transfer(TransferKey::new("a"), download(0.4));
        snapshot.apply_event(SyncEvent::TransferFinished {
            key: TransferKey::new("a"),
        });
        let a = snapshot.transfer(&TransferKey::new("a")).unwrap();
        assert!(a.is_done);
        assert_eq!(a.complete_portion, 1.0);
    }

    #[test]
    fn progress_event_clamps_portion() {
        let mut snapshot = SyncSnapshot::default();
        snapshot.upsert_transfer(TransferKey::new("a"), download(0.0));
        snapshot.apply_event(SyncEvent::TransferProgressed {
            key: TransferKey::new("a"),
            complete_portion: 1.7,
            end_estimate: Some(10),
        });
        let a = snapshot.transfer(&TransferKey::new("a")).unwrap();
        assert_eq!(a.complete_portion, 1.0);
        assert_eq!(a.end_estimate, Some(10));
    }

    #[test]
    fn blank_username_clears_the_field() {
        let mut snapshot = SyncSnapshot::default();
        snapshot.apply_event(SyncEvent::Username {
            username: "alice".to_string(),
        });
        assert_eq!(snapshot.username.as_deref(), Some("alice"));
        snapshot.apply_event(SyncEvent::Username {
            username: "  ".to_string(),
        });
        assert!(snapshot.username.is_none());
    }

    #[test]
    fn event_stream_round_trips_through_json_lines() {
        let line = r#"{"event":"transfer_started","key":"t-1","path":"/loft/private/alice/doc.txt","record":{"kind":"download","intent":"share","complete_portion":0.25}}"#;
        let event: SyncEvent = serde_json::from_str(line).unwrap();
        let mut snapshot = SyncSnapshot::default();
        snapshot.apply_event(event);
        assert_eq!(snapshot.transfers.len(), 1);
        assert_eq!(snapshot.transfers[0].0.as_str(), "t-1");
    }
}
