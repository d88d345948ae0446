use std::cell::RefCell;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::rc::Rc;

use crate::interpreter::error::RuntimeError;
use crate::interpreter::value::Value;

struct Frame {
    bindings: RefCell<HashMap<String, Value>>,
    parent: Option<Env>,
}

/// One frame of the lexical-scope chain. Cloning shares the frame, which
/// is what gives closures their capture semantics: every closure created
/// in a scope sees mutations made through any other handle to it.
#[derive(Clone)]
pub struct Env {
    frame: Rc<Frame>,
}

impl Env {
    pub fn new() -> Self {
        Self::with_parent(None)
    }

    /// Top-level frame preloaded with host-supplied globals, typically
    /// native functions.
    pub fn with_bindings(bindings: impl IntoIterator<Item = (String, Value)>) -> Self {
        let env = Self::new();
        env.frame.bindings.borrow_mut().extend(bindings);
        env
    }

    fn with_parent(parent: Option<Env>) -> Self {
        Self {
            frame: Rc::new(Frame {
                bindings: RefCell::new(HashMap::new()),
                parent,
            }),
        }
    }

    /// A fresh frame whose lookups fall back to this one.
    pub fn child(&self) -> Env {
        Self::with_parent(Some(self.clone()))
    }

    pub fn get(&self, name: &str) -> Result<Value, RuntimeError> {
        if let Some(value) = self.frame.bindings.borrow().get(name) {
            return Ok(value.clone());
        }
        match &self.frame.parent {
            Some(parent) => parent.get(name),
            None => Err(RuntimeError::UndeclaredAccess {
                name: name.to_string(),
            }),
        }
    }

    /// Rewrites the nearest enclosing frame that already holds `name`.
    pub fn assign(&self, name: &str, value: Value) -> Result<(), RuntimeError> {
        let mut bindings = self.frame.bindings.borrow_mut();
        if let Some(slot) = bindings.get_mut(name) {
            *slot = value;
            return Ok(());
        }
        drop(bindings);
        match &self.frame.parent {
            Some(parent) => parent.assign(name, value),
            None => Err(RuntimeError::UndeclaredAccess {
                name: name.to_string(),
            }),
        }
    }

    /// Binds `name` in this frame; shadowing an outer binding is fine,
    /// re-declaring a local one is not.
    pub fn declare(&self, name: &str, value: Value) -> Result<(), RuntimeError> {
        match self.frame.bindings.borrow_mut().entry(name.to_string()) {
            Entry::Vacant(entry) => {
                entry.insert(value);
                Ok(())
            }
            Entry::Occupied(_) => Err(RuntimeError::DoubleDeclaration {
                name: name.to_string(),
            }),
        }
    }

    /// Whether both handles point at the same frame.
    pub fn ptr_eq(&self, other: &Env) -> bool {
        Rc::ptr_eq(&self.frame, &other.frame)
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Env {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Env")
            .field("names", &self.frame.bindings.borrow().keys().collect::<Vec<_>>())
            .field("has_parent", &self.frame.parent.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_walks_the_parent_chain() {
        let outer = Env::new();
        outer.declare("x", Value::Number(1.0)).expect("declare");
        let inner = outer.child().child();
        assert_eq!(inner.get("x").expect("get"), Value::Number(1.0));
    }

    #[test]
    fn assign_rewrites_the_nearest_holding_frame() {
        let outer = Env::new();
        outer.declare("x", Value::Number(1.0)).expect("declare");
        let inner = outer.child();
        inner.assign("x", Value::Number(2.0)).expect("assign");
        assert_eq!(outer.get("x").expect("get"), Value::Number(2.0));
    }

    #[test]
    fn assign_to_unbound_name_fails() {
        let env = Env::new();
        let error = env
            .assign("missing", Value::Nil)
            .expect_err("expected failure");
        assert_eq!(
            error,
            RuntimeError::UndeclaredAccess {
                name: "missing".to_string()
            }
        );
    }

    #[test]
    fn declare_rejects_local_rebinding_but_allows_shadowing() {
        let outer = Env::new();
        outer.declare("x", Value::Number(1.0)).expect("declare");
        let error = outer
            .declare("x", Value::Number(2.0))
            .expect_err("expected failure");
        assert_eq!(
            error,
            RuntimeError::DoubleDeclaration {
                name: "x".to_string()
            }
        );

        let inner = outer.child();
        inner.declare("x", Value::Number(3.0)).expect("shadowing");
        assert_eq!(inner.get("x").expect("get"), Value::Number(3.0));
        assert_eq!(outer.get("x").expect("get"), Value::Number(1.0));
    }

    #[test]
    fn clones_share_the_frame() {
        let env = Env::new();
        let alias = env.clone();
        env.declare("x", Value::Number(1.0)).expect("declare");
        assert_eq!(alias.get("x").expect("get"), Value::Number(1.0));
        assert!(env.ptr_eq(&alias));
    }
}
