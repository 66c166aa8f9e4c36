//! Backend registration and discovery.
//!
//! OCR and translation engines are expensive to initialize (model/engine
//! load), so they live in process-wide registries, are initialized on
//! registration, and are reused across jobs. A failed initialization is
//! NOT cached: the backend is not inserted, and the next registration
//! attempt retries, since transient resource unavailability (missing
//! weights, busy GPU) may resolve.

use crate::ocr::OcrBackend;
use crate::translation::TranslationBackend;
use crate::{Result, TarjamaError};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Base trait for pluggable engines.
///
/// Backends must be thread-safe: they are stored in `Arc<dyn Trait>` and
/// shared across jobs, so mutable state (loaded models, native handles)
/// belongs behind interior mutability.
pub trait Backend: Send + Sync {
    /// Registry name, kebab-case, unique per registry.
    fn name(&self) -> &str;

    /// Called once at registration. Expensive setup belongs here.
    fn initialize(&self) -> Result<()> {
        Ok(())
    }

    /// Called on removal and at shutdown.
    fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

fn validate_backend_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(TarjamaError::validation("backend name cannot be empty"));
    }
    if name.contains(char::is_whitespace) {
        return Err(TarjamaError::validation(format!(
            "backend name '{name}' cannot contain whitespace"
        )));
    }
    Ok(())
}

/// Registry for OCR backends.
#[derive(Default)]
pub struct OcrBackendRegistry {
    backends: HashMap<String, Arc<dyn OcrBackend>>,
}

impl OcrBackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend, initializing it first.
    ///
    /// On initialization failure the backend is not inserted and the error
    /// surfaces to the caller; a later registration retries from scratch.
    pub fn register(&mut self, backend: Arc<dyn OcrBackend>) -> Result<()> {
        let name = backend.name().to_string();
        validate_backend_name(&name)?;
        backend.initialize()?;
        self.backends.insert(name, backend);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn OcrBackend>> {
        self.backends.get(name).cloned().ok_or_else(|| {
            TarjamaError::ocr(format!("OCR backend '{name}' not registered"))
        })
    }

    pub fn list(&self) -> Vec<String> {
        self.backends.keys().cloned().collect()
    }

    /// Remove a backend, calling `shutdown()` first.
    pub fn remove(&mut self, name: &str) -> Result<()> {
        if let Some(backend) = self.backends.remove(name) {
            backend.shutdown()?;
        }
        Ok(())
    }

    pub fn shutdown_all(&mut self) -> Result<()> {
        let names: Vec<_> = self.backends.keys().cloned().collect();
        for name in names {
            self.remove(&name)?;
        }
        Ok(())
    }
}

/// Registry for translation backends.
#[derive(Default)]
pub struct TranslationBackendRegistry {
    backends: HashMap<String, Arc<dyn TranslationBackend>>,
}

impl TranslationBackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, backend: Arc<dyn TranslationBackend>) -> Result<()> {
        let name = backend.name().to_string();
        validate_backend_name(&name)?;
        backend.initialize()?;
        self.backends.insert(name, backend);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn TranslationBackend>> {
        self.backends.get(name).cloned().ok_or_else(|| {
            TarjamaError::translation(format!("translation backend '{name}' not registered"))
        })
    }

    pub fn list(&self) -> Vec<String> {
        self.backends.keys().cloned().collect()
    }

    pub fn remove(&mut self, name: &str) -> Result<()> {
        if let Some(backend) = self.backends.remove(name) {
            backend.shutdown()?;
        }
        Ok(())
    }

    pub fn shutdown_all(&mut self) -> Result<()> {
        let names: Vec<_> = self.backends.keys().cloned().collect();
        for name in names {
            self.remove(&name)?;
        }
        Ok(())
    }
}

/// Global OCR backend registry.
pub static OCR_BACKEND_REGISTRY: Lazy<Arc<RwLock<OcrBackendRegistry>>> =
    Lazy::new(|| Arc::new(RwLock::new(OcrBackendRegistry::new())));

/// Global translation backend registry.
pub static TRANSLATION_BACKEND_REGISTRY: Lazy<Arc<RwLock<TranslationBackendRegistry>>> =
    Lazy::new(|| Arc::new(RwLock::new(TranslationBackendRegistry::new())));

pub fn get_ocr_backend_registry() -> Arc<RwLock<OcrBackendRegistry>> {
    Arc::clone(&OCR_BACKEND_REGISTRY)
}

pub fn get_translation_backend_registry() -> Arc<RwLock<TranslationBackendRegistry>> {
    Arc::clone(&TRANSLATION_BACKEND_REGISTRY)
}

/// Register an OCR backend with the global registry.
pub fn register_ocr_backend(backend: Arc<dyn OcrBackend>) -> Result<()> {
    OCR_BACKEND_REGISTRY.write().register(backend)
}

/// Register a translation backend with the global registry.
pub fn register_translation_backend(backend: Arc<dyn TranslationBackend>) -> Result<()> {
    TRANSLATION_BACKEND_REGISTRY.write().register(backend)
}
