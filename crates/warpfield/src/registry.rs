use std::collections::HashMap;

use crate::engine::Destroy;
use crate::error::RenderError;

/// One engine per canvas (or window) key.
pub struct EngineRegistry<E: Destroy> {
    engines: HashMap<String, E>,
}

impl<E: Destroy> Default for EngineRegistry<E> {
    fn default() -> Self {
        Self {
            engines: HashMap::new(),
        }
    }
}

impl<E: Destroy> EngineRegistry<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the engine already bound to `key`, or build one with `make`.
    pub fn attach<F>(&mut self, key: &str, make: F) -> Result<&mut E, RenderError>
    where
        F: FnOnce() -> Result<E, RenderError>,
    {
        if self.engines.contains_key(key) {
            log::debug!("reusing engine for '{}'", key);
        } else {
            let engine = make()?;
            self.engines.insert(key.to_string(), engine);
        }
        self.engines
            .get_mut(key)
            .ok_or_else(|| RenderError::Config(format!("no engine for '{}'", key)))
    }

    /// Destroy whatever is bound to `key`, then bind a fresh engine.
    ///
    /// The old engine is released before `make` runs, so the context is never
    /// owned by two engines at once.
    pub fn replace<F>(&mut self, key: &str, make: F) -> Result<&mut E, RenderError>
    where
        F: FnOnce() -> Result<E, RenderError>,
    {
        if self.detach(key) {
            log::info!("replaced engine for '{}'", key);
        }
        self.attach(key, make)
    }

    /// Destroy and forget the engine bound to `key`.
    pub fn detach(&mut self, key: &str) -> bool {
        match self.engines.remove(key) {
            Some(mut engine) => {
                engine.destroy();
                true
            }
            None => false,
        }
    }

    pub fn get(&self, key: &str) -> Option<&E> {
        self.engines.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut E> {
        self.engines.get_mut(key)
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut E)> {
        self.engines.iter_mut().map(|(k, e)| (k.as_str(), e))
    }
}

impl<E: Destroy> Drop for EngineRegistry<E> {
    fn drop(&mut self) {
        for engine in self.engines.values_mut() {
            engine.destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Tracked {
        id: u32,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl Destroy for Tracked {
        fn destroy(&mut self) {
            self.log.borrow_mut().push(format!("destroy {}", self.id));
        }
    }

    fn maker(id: u32, log: &Rc<RefCell<Vec<String>>>) -> impl FnOnce() -> Result<Tracked, RenderError> {
        let log = Rc::clone(log);
        move || {
            log.borrow_mut().push(format!("create {}", id));
            Ok(Tracked { id, log })
        }
    }

    #[test]
    fn test_attach_reuses() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut reg = EngineRegistry::new();
        reg.attach("warp-canvas", maker(1, &log)).unwrap();
        let e = reg.attach("warp-canvas", maker(2, &log)).unwrap();
        assert_eq!(e.id, 1);
        assert_eq!(*log.borrow(), vec!["create 1"]);
    }

    #[test]
    fn test_replace_destroys_before_create() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut reg = EngineRegistry::new();
        reg.attach("warp-canvas", maker(1, &log)).unwrap();
        let e = reg.replace("warp-canvas", maker(2, &log)).unwrap();
        assert_eq!(e.id, 2);
        assert_eq!(*log.borrow(), vec!["create 1", "destroy 1", "create 2"]);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_failed_make_leaves_slot_empty() {
        let mut reg: EngineRegistry<Tracked> = EngineRegistry::new();
        let err = reg.attach("c", || Err(RenderError::Config("bad grid".into())));
        assert!(err.is_err());
        assert!(reg.is_empty());
        assert!(!reg.detach("c"));
    }
}
