use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::parser::{Block, TypedName};
use crate::runtime::list::List;

/// Nominal type identity
///
/// Equality is structural; `List(None)` is the provisional type of an empty
/// list literal until a binding fixes its element type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Type {
    /// 64-bit integer
    Int,
    /// IEEE-754 double
    Float,
    /// Boolean
    Bool,
    /// String
    Str,
    /// Nil
    Nil,
    /// User function
    Function,
    /// Homogeneous list; `None` means the element type is not yet known
    List(Option<Box<Type>>),
}

impl Type {
    /// The `List[elem]` type
    pub fn list_of(elem: Type) -> Type {
        Type::List(Some(Box::new(elem)))
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Float => write!(f, "float"),
            Type::Bool => write!(f, "bool"),
            Type::Str => write!(f, "string"),
            Type::Nil => write!(f, "nil"),
            Type::Function => write!(f, "function"),
            Type::List(Some(elem)) => write!(f, "List[{}]", elem),
            Type::List(None) => write!(f, "List[]"),
        }
    }
}

/// Runtime record of a user function: parameters, return type, and a handle
/// to the unevaluated body
///
/// No environment is captured; at call time the evaluator injects every
/// function binding visible to the caller into the fresh callee scope.
#[derive(Debug, Clone)]
pub struct Function {
    /// Function name
    pub name: String,
    /// Declared parameters in order
    pub params: Vec<TypedName>,
    /// Declared return type (not enforced at `return`)
    pub returns: Type,
    /// Body handle
    pub body: Rc<Block>,
}

/// Runtime value representation
///
/// Cloning a value is shallow: a cloned list shares its payload, which is
/// how plain assignment and built-in arguments alias the caller's list.
/// [`Value::deep_copy`] is the by-value copy used for user-call arguments.
#[derive(Debug, Clone)]
pub enum Value {
    /// 64-bit integer value
    Int(i64),
    /// 64-bit floating-point value
    Float(f64),
    /// Boolean value
    Bool(bool),
    /// String value
    Str(String),
    /// Nil value
    Nil,
    /// List value; shared, mutable through the owning binding
    List(Rc<RefCell<List>>),
    /// User function descriptor
    Function(Rc<Function>),
}

impl Value {
    /// Creates a list value from a list payload
    pub fn from_list(list: List) -> Self {
        Value::List(Rc::new(RefCell::new(list)))
    }

    /// Returns the type of the value
    pub fn ty(&self) -> Type {
        match self {
            Value::Int(_) => Type::Int,
            Value::Float(_) => Type::Float,
            Value::Bool(_) => Type::Bool,
            Value::Str(_) => Type::Str,
            Value::Nil => Type::Nil,
            Value::List(list) => list.borrow().full_type(),
            Value::Function(_) => Type::Function,
        }
    }

    /// Returns the full type tag as a string
    pub fn type_name(&self) -> String {
        self.ty().to_string()
    }

    /// Copies the value by value: lists are cloned element-by-element,
    /// primitives trivially
    pub fn deep_copy(&self) -> Value {
        match self {
            Value::List(list) => {
                let list = list.borrow();
                let items = list.items().iter().map(Value::deep_copy).collect();
                Value::from_list(List::new(items, list.elem_type.clone()))
            }
            other => other.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(fl) => {
                // Integral floats keep their fractional part: `2.0`, not `2`
                if fl.is_finite() && fl.fract() == 0.0 {
                    write!(f, "{:.1}", fl)
                } else {
                    write!(f, "{}", fl)
                }
            }
            Value::Bool(b) => write!(f, "{}", b),
            Value::Str(s) => write!(f, "{}", s),
            Value::Nil => write!(f, "nil"),
            Value::List(list) => {
                write!(f, "{{")?;
                for (i, item) in list.borrow().items().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "}}")
            }
            Value::Function(function) => write!(f, "<function {}>", function.name),
        }
    }
}

// Functions compare by identity; everything else structurally.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Nil, Value::Nil) => true,
            (Value::List(a), Value::List(b)) => {
                Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow()
            }
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}
