use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::encoder::{encode_file, EncodedImage, RawFile};
use crate::error::{EncodeError, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKey {
    Character(usize),
    Context,
}

#[derive(Debug, Clone)]
pub struct CharacterSlot {
    pub id: usize,
    pub label: String,
    pub file: Option<RawFile>,
    pub encoded: Option<EncodedImage>,
    pub selected: bool,
}

impl CharacterSlot {
    pub fn is_ready(&self) -> bool {
        self.encoded.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContextSlot {
    pub file: Option<RawFile>,
    pub encoded: Option<EncodedImage>,
    pub use_context: bool,
}

#[derive(Debug)]
struct SlotRecord {
    label: String,
    file: Option<RawFile>,
    encoded: Option<EncodedImage>,
    flag: bool,
    // Bumped on every file change. An encode only lands if it still matches.
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeTicket {
    pub key: SlotKey,
    pub token: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlotView {
    pub id: usize,
    pub label: String,
    pub file_name: Option<String>,
    pub encoded: bool,
    pub active: bool,
}

#[derive(Clone)]
pub struct SlotStore {
    slots: Arc<DashMap<SlotKey, SlotRecord>>,
    encodes: Arc<DashMap<SlotKey, JoinHandle<()>>>,
    tokens: Arc<AtomicU64>,
    character_count: usize,
}

impl SlotStore {
    pub fn new(count: usize) -> Self {
        let slots = DashMap::new();
        for i in 0..count {
            slots.insert(
                SlotKey::Character(i),
                SlotRecord {
                    label: format!("Character {}", i + 1),
                    file: None,
                    encoded: None,
                    flag: i == 0,
                    generation: 0,
                },
            );
        }
        slots.insert(
            SlotKey::Context,
            SlotRecord {
                label: "Background".to_string(),
                file: None,
                encoded: None,
                flag: false,
                generation: 0,
            },
        );
        Self {
            slots: Arc::new(slots),
            encodes: Arc::new(DashMap::new()),
            tokens: Arc::new(AtomicU64::new(0)),
            character_count: count,
        }
    }

    pub fn character_count(&self) -> usize {
        self.character_count
    }

    fn check(&self, key: SlotKey) -> Result<(), ValidationError> {
        match key {
            SlotKey::Character(i) if i >= self.character_count => {
                Err(ValidationError::SlotOutOfRange(i))
            }
            _ => Ok(()),
        }
    }

    // A later assignment supersedes any encode still in flight.
    pub fn set_file(
        &self,
        key: SlotKey,
        file: Option<RawFile>,
    ) -> Result<EncodeTicket, ValidationError> {
        self.check(key)?;
        let token = self.tokens.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut rec = self
                .slots
                .get_mut(&key)
                .ok_or(ValidationError::SlotOutOfRange(index_of(key)))?;
            rec.generation = token;
            rec.file = file.clone();
            rec.encoded = None;
        }
        if let Some((_, stale)) = self.encodes.remove(&key) {
            stale.abort();
        }

        let ticket = EncodeTicket { key, token };
        if let Some(file) = file {
            debug!(?key, token, name = %file.name, "encoding slot file");
            let store = self.clone();
            let handle = tokio::spawn(async move {
                let result = encode_file(&file).await;
                store.apply_encode(ticket, result);
            });
            self.encodes.insert(key, handle);
        }
        Ok(ticket)
    }

    pub(crate) fn apply_encode(
        &self,
        ticket: EncodeTicket,
        result: Result<EncodedImage, EncodeError>,
    ) -> bool {
        let Some(mut rec) = self.slots.get_mut(&ticket.key) else {
            return false;
        };
        if rec.generation != ticket.token {
            debug!(key = ?ticket.key, token = ticket.token, "discarding stale encode");
            return false;
        }
        match result {
            Ok(encoded) => rec.encoded = Some(encoded),
            Err(e) => {
                warn!(key = ?ticket.key, error = %e, "encode failed");
                rec.encoded = None;
            }
        }
        true
    }

    pub async fn settle(&self) {
        let keys: Vec<SlotKey> = self.encodes.iter().map(|e| *e.key()).collect();
        for key in keys {
            if let Some((_, handle)) = self.encodes.remove(&key) {
                // Aborted handles resolve with a cancellation error.
                let _ = handle.await;
            }
        }
    }

    pub fn toggle_selected(&self, index: usize) -> Result<bool, ValidationError> {
        self.check(SlotKey::Character(index))?;
        let mut rec = self
            .slots
            .get_mut(&SlotKey::Character(index))
            .ok_or(ValidationError::SlotOutOfRange(index))?;
        rec.flag = !rec.flag;
        Ok(rec.flag)
    }

    pub fn set_use_context(&self, use_context: bool) {
        if let Some(mut rec) = self.slots.get_mut(&SlotKey::Context) {
            rec.flag = use_context;
        }
    }

    pub fn toggle_use_context(&self) -> bool {
        let mut rec = match self.slots.get_mut(&SlotKey::Context) {
            Some(r) => r,
            None => return false,
        };
        rec.flag = !rec.flag;
        rec.flag
    }

    pub fn characters(&self) -> Vec<CharacterSlot> {
        (0..self.character_count)
            .filter_map(|i| {
                self.slots.get(&SlotKey::Character(i)).map(|rec| CharacterSlot {
                    id: i + 1,
                    label: rec.label.clone(),
                    file: rec.file.clone(),
                    encoded: rec.encoded.clone(),
                    selected: rec.flag,
                })
            })
            .collect()
    }

    pub fn selected_ready(&self) -> Vec<CharacterSlot> {
        self.characters()
            .into_iter()
            .filter(|c| c.selected && c.is_ready())
            .collect()
    }

    pub fn context(&self) -> ContextSlot {
        self.slots
            .get(&SlotKey::Context)
            .map(|rec| ContextSlot {
                file: rec.file.clone(),
                encoded: rec.encoded.clone(),
                use_context: rec.flag,
            })
            .unwrap_or_default()
    }

    pub fn views(&self) -> (Vec<SlotView>, SlotView) {
        let view = |id: usize, rec: &SlotRecord| SlotView {
            id,
            label: rec.label.clone(),
            file_name: rec.file.as_ref().map(|f| f.name.clone()),
            encoded: rec.encoded.is_some(),
            active: rec.flag,
        };
        let characters = (0..self.character_count)
            .filter_map(|i| {
                self.slots
                    .get(&SlotKey::Character(i))
                    .map(|rec| view(i + 1, rec.value()))
            })
            .collect();
        let context = self
            .slots
            .get(&SlotKey::Context)
            .map(|rec| view(0, rec.value()))
            .unwrap_or(SlotView {
                id: 0,
                label: String::new(),
                file_name: None,
                encoded: false,
                active: false,
            });
        (characters, context)
    }
}

fn index_of(key: SlotKey) -> usize {
    match key {
        SlotKey::Character(i) => i,
        SlotKey::Context => 0,
    }
}
