use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::runtime::value::Value;

/// Stack of lexical scope frames
///
/// The bottom frame is the distinguished program frame: it is created with
/// the stack and popped only when the stack is dropped, so a line-by-line
/// driver keeps its top-level bindings between programs. Nested blocks
/// always pair a push with a pop.
///
/// A name is bound in at most one frame: definition checks every frame for
/// collisions, lookups resolve innermost-first.
#[derive(Debug, Clone)]
pub struct ScopeStack {
    frames: Vec<HashMap<String, Value>>,
}

impl ScopeStack {
    /// Creates a scope stack holding only the program frame
    pub fn new() -> Self {
        ScopeStack {
            frames: vec![HashMap::new()],
        }
    }

    /// Enters a new nested frame
    pub fn push(&mut self) {
        self.frames.push(HashMap::new());
    }

    /// Exits the current frame; the program frame is never popped
    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Number of frames on the stack (1 for just the program frame)
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// The frames, outermost first (for diagnostics)
    pub fn frames(&self) -> &[HashMap<String, Value>] {
        &self.frames
    }

    /// Binds `name` in the current frame
    ///
    /// Returns false without binding when the name is already defined in any
    /// frame.
    pub fn new_identifier(&mut self, name: &str, value: Value) -> bool {
        if self.is_defined(name) {
            return false;
        }
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.to_string(), value);
        }
        true
    }

    /// True when `name` is bound in any frame
    pub fn is_defined(&self, name: &str) -> bool {
        self.frames.iter().any(|frame| frame.contains_key(name))
    }

    /// Resolves `name` to its binding, innermost frame first
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    /// Mutates the existing binding for `name` in whichever frame holds it
    ///
    /// The new value's type must equal the current binding's type.
    pub fn change_value(&mut self, name: &str, value: Value) -> Result<()> {
        for frame in self.frames.iter_mut().rev() {
            if let Some(current) = frame.get(name) {
                if current.ty() != value.ty() {
                    return Err(Error::TypeMismatch {
                        expected: current.type_name(),
                        got: value.type_name(),
                    });
                }
                frame.insert(name.to_string(), value);
                return Ok(());
            }
        }
        Err(Error::NotDefined {
            name: name.to_string(),
        })
    }

    /// Replaces one element of the list bound to `name`
    ///
    /// The binding must hold a list, the index must be in range, and the new
    /// element's type must equal the list's element type.
    pub fn change_value_with_suffix(&mut self, name: &str, value: Value, index: i64) -> Result<()> {
        let binding = self.get(name).ok_or_else(|| Error::NotDefined {
            name: name.to_string(),
        })?;

        let list = match binding {
            Value::List(list) => list.clone(),
            other => {
                return Err(Error::NotIndexable {
                    name: name.to_string(),
                    got: other.type_name(),
                })
            }
        };

        let value_ty = value.ty();
        let mut list = list.borrow_mut();

        if index < 0 || index as usize >= list.len() {
            return Err(Error::IndexOutOfRange {
                index,
                name: name.to_string(),
                length: list.len(),
            });
        }

        if let Some(elem_type) = &list.elem_type {
            if *elem_type != value_ty {
                return Err(Error::TypeMismatch {
                    expected: elem_type.to_string(),
                    got: value_ty.to_string(),
                });
            }
        }

        list.set(index as usize, value);
        Ok(())
    }

    /// Removes the binding for `name` from whichever frame holds it
    pub fn del_identifier(&mut self, name: &str) -> bool {
        for frame in self.frames.iter_mut().rev() {
            if frame.remove(name).is_some() {
                return true;
            }
        }
        false
    }

    /// Every function-typed binding across all frames
    pub fn get_functions(&self) -> Vec<(String, Value)> {
        let mut functions = Vec::new();
        for frame in &self.frames {
            for (name, value) in frame {
                if matches!(value, Value::Function(_)) {
                    functions.push((name.clone(), value.clone()));
                }
            }
        }
        functions
    }
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::value::Type;

    #[test]
    fn test_define_and_get() {
        let mut scope = ScopeStack::new();
        assert!(scope.new_identifier("x", Value::Int(42)));
        assert_eq!(scope.get("x"), Some(&Value::Int(42)));
        assert_eq!(scope.get("y"), None);
    }

    #[test]
    fn test_definition_checks_all_frames() {
        let mut scope = ScopeStack::new();
        assert!(scope.new_identifier("x", Value::Int(1)));

        scope.push();
        // the name lives in the outer frame, so redefinition fails
        assert!(!scope.new_identifier("x", Value::Int(2)));
        assert!(scope.new_identifier("y", Value::Int(3)));

        scope.pop();
        assert_eq!(scope.get("x"), Some(&Value::Int(1)));
        assert_eq!(scope.get("y"), None);
    }

    #[test]
    fn test_change_value_in_outer_frame() {
        let mut scope = ScopeStack::new();
        scope.new_identifier("x", Value::Int(10));

        scope.push();
        scope.change_value("x", Value::Int(20)).unwrap();
        scope.pop();

        assert_eq!(scope.get("x"), Some(&Value::Int(20)));
    }

    #[test]
    fn test_change_value_type_checked() {
        let mut scope = ScopeStack::new();
        scope.new_identifier("x", Value::Int(10));

        let err = scope
            .change_value("x", Value::Str("hi".to_string()))
            .unwrap_err();
        assert_eq!(
            err,
            Error::TypeMismatch {
                expected: "int".to_string(),
                got: "string".to_string(),
            }
        );
    }

    #[test]
    fn test_change_value_undefined() {
        let mut scope = ScopeStack::new();
        assert!(matches!(
            scope.change_value("ghost", Value::Int(1)),
            Err(Error::NotDefined { .. })
        ));
    }

    #[test]
    fn test_change_value_with_suffix() {
        use crate::runtime::list::List;

        let mut scope = ScopeStack::new();
        scope.new_identifier(
            "xs",
            Value::from_list(List::new(
                vec![Value::Int(1), Value::Int(2)],
                Some(Type::Int),
            )),
        );

        scope
            .change_value_with_suffix("xs", Value::Int(9), 1)
            .unwrap();
        match scope.get("xs") {
            Some(Value::List(list)) => assert_eq!(list.borrow().get(1), Some(Value::Int(9))),
            other => panic!("expected list binding, got {:?}", other),
        }

        assert!(matches!(
            scope.change_value_with_suffix("xs", Value::Int(0), 2),
            Err(Error::IndexOutOfRange { .. })
        ));
        assert!(matches!(
            scope.change_value_with_suffix("xs", Value::Int(0), -1),
            Err(Error::IndexOutOfRange { .. })
        ));
        assert!(matches!(
            scope.change_value_with_suffix("xs", Value::Bool(true), 0),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_del_identifier() {
        let mut scope = ScopeStack::new();
        scope.new_identifier("x", Value::Int(1));
        assert!(scope.del_identifier("x"));
        assert!(!scope.del_identifier("x"));
        assert_eq!(scope.get("x"), None);
    }

    #[test]
    fn test_program_frame_survives_pop() {
        let mut scope = ScopeStack::new();
        scope.new_identifier("x", Value::Int(1));
        scope.pop();
        assert_eq!(scope.depth(), 1);
        assert_eq!(scope.get("x"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_get_functions_across_frames() {
        use crate::parser::Block;
        use crate::runtime::value::Function;
        use std::rc::Rc;

        let func = |name: &str| {
            Value::Function(Rc::new(Function {
                name: name.to_string(),
                params: Vec::new(),
                returns: Type::Nil,
                body: Rc::new(Block::default()),
            }))
        };

        let mut scope = ScopeStack::new();
        scope.new_identifier("f", func("f"));
        scope.new_identifier("x", Value::Int(1));
        scope.push();
        scope.new_identifier("g", func("g"));

        let mut names: Vec<String> = scope
            .get_functions()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["f".to_string(), "g".to_string()]);
    }
}
