use crate::logging;
use crate::models::{CURRENT_NOVEL_KEY, PositionKey, PositionRecord, Tier};
use eyre::Result;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// String key/value persistence port. Both storage tiers implement it.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

pub type SharedStore = Rc<RefCell<dyn KeyValueStore>>;

/// Process-local store. Serves as the session tier: it outlives any single
/// reading surface but not the process.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Rc<RefCell<MemoryStore>> {
        Rc::new(RefCell::new(Self::new()))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Parse a stored offset. Non-numeric, negative and non-finite values are
/// rejected.
pub fn parse_offset(value: &str) -> Option<u32> {
    let number = value.trim().parse::<f64>().ok()?;
    if !number.is_finite() || number < 0.0 {
        return None;
    }
    Some(number.round().min(u32::MAX as f64) as u32)
}

/// Scroll offsets per reading context, written to both tiers and read back
/// session first. Every storage failure degrades to "nothing saved".
#[derive(Clone)]
pub struct PositionStore {
    durable: SharedStore,
    session: SharedStore,
}

impl PositionStore {
    pub fn new(durable: SharedStore, session: SharedStore) -> Self {
        Self { durable, session }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStore::shared(), MemoryStore::shared())
    }

    pub fn durable(&self) -> SharedStore {
        Rc::clone(&self.durable)
    }

    fn tier(&self, tier: Tier) -> &SharedStore {
        match tier {
            Tier::Durable => &self.durable,
            Tier::Session => &self.session,
        }
    }

    pub fn save(&self, key: &PositionKey, offset: u32) {
        let value = offset.to_string();
        for tier in [Tier::Durable, Tier::Session] {
            let storage_key = key.storage_key(tier);
            if let Err(err) = self.tier(tier).borrow_mut().set(&storage_key, &value) {
                logging::warn(format!("could not save {}: {}", storage_key, err));
            }
        }
    }

    pub fn load(&self, key: &PositionKey) -> u32 {
        self.load_record(key).map(|r| r.offset).unwrap_or(0)
    }

    /// The saved offset along with the tier it came from.
    pub fn load_record(&self, key: &PositionKey) -> Option<PositionRecord> {
        [Tier::Session, Tier::Durable].into_iter().find_map(|tier| {
            let offset = self.read_offset(key, tier)?;
            Some(PositionRecord {
                key: key.clone(),
                offset,
                tier,
            })
        })
    }

    fn read_offset(&self, key: &PositionKey, tier: Tier) -> Option<u32> {
        let storage_key = key.storage_key(tier);
        match self.tier(tier).borrow().get(&storage_key) {
            Ok(Some(value)) => {
                let offset = parse_offset(&value);
                if offset.is_none() {
                    logging::debug(format!("ignoring invalid offset {:?} at {}", value, storage_key));
                }
                offset
            }
            Ok(None) => None,
            Err(err) => {
                logging::warn(format!("could not read {}: {}", storage_key, err));
                None
            }
        }
    }

    pub fn last_active(&self) -> Option<String> {
        match self.durable.borrow().get(CURRENT_NOVEL_KEY) {
            Ok(value) => value.filter(|v| !v.trim().is_empty()),
            Err(err) => {
                logging::warn(format!("could not read last active novel: {}", err));
                None
            }
        }
    }

    pub fn set_last_active(&self, novel: &str) {
        if let Err(err) = self.durable.borrow_mut().set(CURRENT_NOVEL_KEY, novel) {
            logging::warn(format!("could not record last active novel: {}", err));
        }
    }
}
