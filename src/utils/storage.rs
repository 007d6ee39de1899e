use serde::{de::DeserializeOwned, Serialize};
use web_sys::{window, Storage};

pub fn get_local_storage() -> Option<Storage> {
    window()?.local_storage().ok()?
}

pub fn save_to_storage<T: Serialize>(key: &str, value: &T) -> Result<(), String> {
    let storage = get_local_storage().ok_or("No se pudo acceder a localStorage")?;
    let json = serde_json::to_string(value)
        .map_err(|e| format!("Error serializando datos: {}", e))?;
    storage.set_item(key, &json)
        .map_err(|_| "Error guardando en localStorage".to_string())?;
    Ok(())
}

pub fn load_from_storage<T: DeserializeOwned>(key: &str) -> Option<T> {
    let storage = get_local_storage()?;
    let json = storage.get_item(key).ok()??;
    serde_json::from_str(&json).ok()
}

pub fn remove_from_storage(key: &str) -> Result<(), String> {
    let storage = get_local_storage().ok_or("No se pudo acceder a localStorage")?;
    storage.remove_item(key)
        .map_err(|_| "Error eliminando de localStorage".to_string())?;
    Ok(())
}

/// Ranura clave-valor durable inyectable en los componentes que persisten
/// estado, para poder sustituirla en tests por una en memoria
pub trait KeyValueSlot {
    fn read(&self) -> Option<String>;
    fn write(&self, value: &str) -> Result<(), String>;
    fn clear(&self) -> Result<(), String>;
}

/// Ranura respaldada por una clave fija de localStorage
pub struct LocalStorageSlot {
    key: String,
}

impl LocalStorageSlot {
    pub fn new(key: &str) -> Self {
        Self { key: key.to_string() }
    }
}

impl KeyValueSlot for LocalStorageSlot {
    fn read(&self) -> Option<String> {
        get_local_storage()?.get_item(&self.key).ok()?
    }

    fn write(&self, value: &str) -> Result<(), String> {
        let storage = get_local_storage().ok_or("No se pudo acceder a localStorage")?;
        storage.set_item(&self.key, value)
            .map_err(|_| "Error guardando en localStorage".to_string())
    }

    fn clear(&self) -> Result<(), String> {
        let storage = get_local_storage().ok_or("No se pudo acceder a localStorage")?;
        storage.remove_item(&self.key)
            .map_err(|_| "Error eliminando de localStorage".to_string())
    }
}

#[cfg(test)]
pub struct MemorySlot {
    pub data: std::cell::RefCell<Option<String>>,
    pub fail_writes: std::cell::Cell<bool>,
}

#[cfg(test)]
impl MemorySlot {
    pub fn new() -> Self {
        Self {
            data: std::cell::RefCell::new(None),
            fail_writes: std::cell::Cell::new(false),
        }
    }

    pub fn with_contents(raw: &str) -> Self {
        let slot = Self::new();
        *slot.data.borrow_mut() = Some(raw.to_string());
        slot
    }
}

#[cfg(test)]
impl KeyValueSlot for MemorySlot {
    fn read(&self) -> Option<String> {
        self.data.borrow().clone()
    }

    fn write(&self, value: &str) -> Result<(), String> {
        if self.fail_writes.get() {
            return Err("quota exceeded".to_string());
        }
        *self.data.borrow_mut() = Some(value.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), String> {
        *self.data.borrow_mut() = None;
        Ok(())
    }
}
