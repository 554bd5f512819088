//! Built-in operations for Tua
//!
//! Provides the trait and registry for the fixed, host-implemented set of
//! built-ins the evaluator consults before user functions.

pub mod stdlib;

use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::runtime::{Evaluator, Value};

/// Lazy, finite, non-restartable stream of `(key, value)` pairs
///
/// Produced by built-ins like `ipairs` and driven one pull at a time by the
/// generic for loop; the whole sequence is never materialized.
pub type PairStream = Box<dyn Iterator<Item = (i64, Value)>>;

/// What a built-in call produced
pub enum ToolOutput {
    /// An ordinary value
    Value(Value),
    /// A lazy key/value stream; only valid as a generic-for source
    Pairs(PairStream),
}

impl std::fmt::Debug for ToolOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolOutput::Value(v) => f.debug_tuple("Value").field(v).finish(),
            ToolOutput::Pairs(_) => f.debug_tuple("Pairs").field(&"<stream>").finish(),
        }
    }
}

/// Tool trait - all Tua built-ins implement this
pub trait Tool {
    /// Built-in name
    fn name(&self) -> &str;

    /// Built-in description
    fn description(&self) -> &str;

    /// Invoke the built-in with the evaluator and the evaluated arguments
    ///
    /// Arguments share list payloads with the caller's bindings, so
    /// list-mutating built-ins act on the caller's list.
    fn call(&self, interp: &mut Evaluator, args: Vec<Value>) -> Result<ToolOutput>;

    /// Required argument count; `None` means variadic
    fn arity(&self) -> Option<usize> {
        None
    }
}

/// Tool registry
pub struct ToolRegistry {
    tools: HashMap<String, Rc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a new registry with the standard built-ins
    pub fn new() -> Self {
        let mut registry = ToolRegistry {
            tools: HashMap::new(),
        };

        stdlib::register_all(&mut registry);

        registry
    }

    /// Create an empty registry (for testing)
    pub fn empty() -> Self {
        ToolRegistry {
            tools: HashMap::new(),
        }
    }

    /// Register a built-in
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        let name = tool.name().to_string();
        self.tools.insert(name, Rc::new(tool));
    }

    /// Get a built-in by name
    pub fn get(&self, name: &str) -> Result<Rc<dyn Tool>> {
        self.tools
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UndefinedFunction {
                name: name.to_string(),
            })
    }

    /// Check if a built-in exists
    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// List all built-in names
    pub fn list_tools(&self) -> Vec<String> {
        let mut names: Vec<_> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered built-ins
    pub fn count(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestTool;

    impl Tool for TestTool {
        fn name(&self) -> &str {
            "test"
        }

        fn description(&self) -> &str {
            "A test built-in"
        }

        fn call(&self, _interp: &mut Evaluator, args: Vec<Value>) -> Result<ToolOutput> {
            Ok(ToolOutput::Value(
                args.into_iter().next().unwrap_or(Value::Int(42)),
            ))
        }
    }

    #[test]
    fn test_registration() {
        let mut registry = ToolRegistry::empty();
        registry.register(TestTool);

        assert!(registry.has("test"));
        assert!(!registry.has("unknown"));
        assert!(registry.get("unknown").is_err());
    }

    #[test]
    fn test_standard_set() {
        let registry = ToolRegistry::new();
        assert_eq!(
            registry.list_tools(),
            vec!["append", "concat", "dump_stack", "ipairs", "len", "pop", "print", "type"]
        );
        assert_eq!(registry.count(), 8);
    }
}
