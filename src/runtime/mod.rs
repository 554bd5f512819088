//! Runtime representation and evaluation

mod evaluator;
mod list;
mod scope;
mod value;

pub use evaluator::Evaluator;
pub use list::List;
pub use scope::ScopeStack;
pub use value::{Function, Type, Value};
