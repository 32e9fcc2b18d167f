//! Persistence layer.
//!
//! A small key-value store holding JSON values, with an in-memory and a
//! single-file JSON implementation. `WealthStore` layers typed access for
//! clients, orders and copilot conversations on top. There are no
//! durability guarantees beyond "the file is rewritten on every write".

pub mod kv;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::types::{ChatTurn, Client, Order, WealthError};
pub use kv::{JsonFileStore, KvStore, MemoryStore};

const CLIENT_INDEX_KEY: &str = "clients:index";

fn client_key(id: &str) -> String {
    format!("client:{id}")
}

fn orders_key(client_id: &str) -> String {
    format!("orders:{client_id}")
}

fn chat_key(client_id: &str) -> String {
    format!("chat:{client_id}")
}

/// Typed facade over a `KvStore`.
pub struct WealthStore {
    kv: Box<dyn KvStore>,
}

impl WealthStore {
    pub fn new(kv: Box<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// An in-memory store, mostly for tests.
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStore::new()))
    }

    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.kv.get(key)? {
            Some(value) => {
                let parsed = serde_json::from_value(value)
                    .with_context(|| format!("Failed to decode stored value for {key}"))?;
                Ok(Some(parsed))
            }
            None => Ok(None),
        }
    }

    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_value(value)
            .with_context(|| format!("Failed to encode value for {key}"))?;
        self.kv.set(key, json)
    }

    // -- Clients --

    pub fn client_ids(&self) -> Result<Vec<String>> {
        Ok(self.get_json(CLIENT_INDEX_KEY)?.unwrap_or_default())
    }

    /// All clients in index order.
    pub fn list_clients(&self) -> Result<Vec<Client>> {
        let mut clients = Vec::new();
        for id in self.client_ids()? {
            if let Some(client) = self.get_json::<Client>(&client_key(&id))? {
                clients.push(client);
            }
        }
        Ok(clients)
    }

    /// Load one client. Missing clients surface as `WealthError::ClientNotFound`.
    pub fn client(&self, id: &str) -> Result<Client> {
        self.get_json::<Client>(&client_key(id))?
            .ok_or_else(|| anyhow::Error::from(WealthError::ClientNotFound(id.to_string())))
    }

    /// Insert or replace a client, keeping the index free of duplicates.
    pub fn save_client(&self, client: &Client) -> Result<()> {
        self.set_json(&client_key(&client.id), client)?;
        let mut ids = self.client_ids()?;
        if !ids.iter().any(|id| id == &client.id) {
            ids.push(client.id.clone());
            self.set_json(CLIENT_INDEX_KEY, &ids)?;
        }
        debug!(client_id = %client.id, "Client saved");
        Ok(())
    }

    /// Remove a client together with its orders and conversation.
    pub fn delete_client(&self, id: &str) -> Result<bool> {
        let existed = self.kv.delete(&client_key(id))?;
        self.kv.delete(&orders_key(id))?;
        self.kv.delete(&chat_key(id))?;
        let mut ids = self.client_ids()?;
        ids.retain(|c| c != id);
        self.set_json(CLIENT_INDEX_KEY, &ids)?;
        Ok(existed)
    }

    /// Load clients into an empty store. Returns whether anything was written.
    pub fn seed_if_empty(&self, clients: &[Client]) -> Result<bool> {
        if !self.client_ids()?.is_empty() {
            return Ok(false);
        }
        for client in clients {
            self.save_client(client)?;
        }
        info!(clients = clients.len(), "Store seeded with demo data");
        Ok(true)
    }

    // -- Orders --

    pub fn orders(&self, client_id: &str) -> Result<Vec<Order>> {
        Ok(self.get_json(&orders_key(client_id))?.unwrap_or_default())
    }

    pub fn save_orders(&self, client_id: &str, orders: &[Order]) -> Result<()> {
        self.set_json(&orders_key(client_id), &orders)
    }

    /// Append orders to a client's blotter.
    pub fn add_orders(&self, client_id: &str, new_orders: &[Order]) -> Result<()> {
        let mut orders = self.orders(client_id)?;
        orders.extend_from_slice(new_orders);
        self.save_orders(client_id, &orders)
    }

    // -- Copilot conversation --

    pub fn chat_history(&self, client_id: &str) -> Result<Vec<ChatTurn>> {
        Ok(self.get_json(&chat_key(client_id))?.unwrap_or_default())
    }

    pub fn append_chat(&self, client_id: &str, turns: &[ChatTurn]) -> Result<()> {
        let mut history = self.chat_history(client_id)?;
        history.extend_from_slice(turns);
        self.set_json(&chat_key(client_id), &history)
    }

    pub fn clear_chat(&self, client_id: &str) -> Result<()> {
        self.kv.delete(&chat_key(client_id))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
