//! The standard built-ins
//!
//! The fixed set of host operations every program can call: output,
//! introspection, list manipulation, and the key/value iteration source for
//! the generic for loop.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::error::{Error, Result};
use crate::runtime::{Evaluator, List, Value};
use crate::tools::{Tool, ToolOutput, ToolRegistry};

/// Register all standard built-ins
pub fn register_all(registry: &mut ToolRegistry) {
    registry.register(PrintTool);
    registry.register(TypeTool);
    registry.register(LenTool);
    registry.register(ConcatTool);
    registry.register(AppendTool);
    registry.register(PopTool);
    registry.register(IpairsTool);
    registry.register(DumpStackTool);
}

fn wrong_args(tool: &str, expected: &str, args: &[Value]) -> Error {
    let got: Vec<String> = args.iter().map(Value::type_name).collect();
    Error::InvalidArguments {
        tool: tool.to_string(),
        reason: format!("expected {}, got ({})", expected, got.join(", ")),
    }
}

/// `print(v, ...)` - write values to the output sink
pub struct PrintTool;

impl Tool for PrintTool {
    fn name(&self) -> &str {
        "print"
    }

    fn description(&self) -> &str {
        "Write the space-separated display form of each argument, then a newline"
    }

    fn call(&self, interp: &mut Evaluator, args: Vec<Value>) -> Result<ToolOutput> {
        let line: Vec<String> = args.iter().map(Value::to_string).collect();
        writeln!(interp.output(), "{}", line.join(" "))
            .map_err(|e| Error::internal(format!("failed to write output: {}", e)))?;
        Ok(ToolOutput::Value(Value::Nil))
    }
}

/// `type(v)` - the full type tag as a string
pub struct TypeTool;

impl Tool for TypeTool {
    fn name(&self) -> &str {
        "type"
    }

    fn description(&self) -> &str {
        "The type tag of the argument, as a string"
    }

    fn call(&self, _interp: &mut Evaluator, args: Vec<Value>) -> Result<ToolOutput> {
        match args.as_slice() {
            [value] => Ok(ToolOutput::Value(Value::Str(value.type_name()))),
            _ => Err(wrong_args("type", "one value", &args)),
        }
    }

    fn arity(&self) -> Option<usize> {
        Some(1)
    }
}

/// `len(list)` - element count
pub struct LenTool;

impl Tool for LenTool {
    fn name(&self) -> &str {
        "len"
    }

    fn description(&self) -> &str {
        "Number of elements in a list"
    }

    fn call(&self, _interp: &mut Evaluator, args: Vec<Value>) -> Result<ToolOutput> {
        match args.as_slice() {
            [Value::List(list)] => Ok(ToolOutput::Value(Value::Int(list.borrow().len() as i64))),
            _ => Err(wrong_args("len", "a list", &args)),
        }
    }

    fn arity(&self) -> Option<usize> {
        Some(1)
    }
}

/// `concat(a, b)` - a new list holding a's then b's elements
pub struct ConcatTool;

impl Tool for ConcatTool {
    fn name(&self) -> &str {
        "concat"
    }

    fn description(&self) -> &str {
        "Concatenate two lists of the same type into a new list"
    }

    fn call(&self, _interp: &mut Evaluator, args: Vec<Value>) -> Result<ToolOutput> {
        match args.as_slice() {
            [Value::List(a), Value::List(b)] => {
                let a = a.borrow();
                let b = b.borrow();
                if a.full_type() != b.full_type() {
                    return Err(Error::TypeMismatch {
                        expected: a.full_type().to_string(),
                        got: b.full_type().to_string(),
                    });
                }
                let mut items = a.items().to_vec();
                items.extend_from_slice(b.items());
                Ok(ToolOutput::Value(Value::from_list(List::new(
                    items,
                    a.elem_type.clone(),
                ))))
            }
            _ => Err(wrong_args("concat", "two lists", &args)),
        }
    }

    fn arity(&self) -> Option<usize> {
        Some(2)
    }
}

/// `append(list, elem)` - push an element onto the caller's list
pub struct AppendTool;

impl Tool for AppendTool {
    fn name(&self) -> &str {
        "append"
    }

    fn description(&self) -> &str {
        "Append an element to a list in place"
    }

    fn call(&self, _interp: &mut Evaluator, args: Vec<Value>) -> Result<ToolOutput> {
        match args.as_slice() {
            [Value::List(list), elem] => {
                // taken before borrowing: the element may be the list itself
                let elem_ty = elem.ty();
                let mut list = list.borrow_mut();
                match &list.elem_type {
                    Some(elem_type) if *elem_type != elem_ty => Err(Error::TypeMismatch {
                        expected: elem_type.to_string(),
                        got: elem_ty.to_string(),
                    }),
                    Some(_) => {
                        list.push(elem.clone());
                        Ok(ToolOutput::Value(Value::Nil))
                    }
                    // an untyped empty list adopts the element's type
                    None => {
                        list.elem_type = Some(elem_ty);
                        list.push(elem.clone());
                        Ok(ToolOutput::Value(Value::Nil))
                    }
                }
            }
            _ => Err(wrong_args("append", "a list and an element", &args)),
        }
    }

    fn arity(&self) -> Option<usize> {
        Some(2)
    }
}

/// `pop(list)` - remove and return the last element
pub struct PopTool;

impl Tool for PopTool {
    fn name(&self) -> &str {
        "pop"
    }

    fn description(&self) -> &str {
        "Remove and return the last element of a list"
    }

    fn call(&self, _interp: &mut Evaluator, args: Vec<Value>) -> Result<ToolOutput> {
        match args.as_slice() {
            [Value::List(list)] => match list.borrow_mut().pop() {
                Some(value) => Ok(ToolOutput::Value(value)),
                None => Err(Error::EmptyList {
                    operation: "pop".to_string(),
                }),
            },
            _ => Err(wrong_args("pop", "a list", &args)),
        }
    }

    fn arity(&self) -> Option<usize> {
        Some(1)
    }
}

/// `ipairs(list)` - lazy `(0, l[0]), (1, l[1]), ...` pair stream
pub struct IpairsTool;

impl Tool for IpairsTool {
    fn name(&self) -> &str {
        "ipairs"
    }

    fn description(&self) -> &str {
        "Key/value sequence over a list, for the generic for loop"
    }

    fn call(&self, _interp: &mut Evaluator, args: Vec<Value>) -> Result<ToolOutput> {
        match args.as_slice() {
            [Value::List(list)] => Ok(ToolOutput::Pairs(Box::new(ListPairs {
                list: Rc::clone(list),
                index: 0,
            }))),
            _ => Err(wrong_args("ipairs", "a list", &args)),
        }
    }

    fn arity(&self) -> Option<usize> {
        Some(1)
    }
}

/// Pull-based pair stream over a shared list payload
///
/// Each advance reads the live list, so elements appended during iteration
/// are observed; the stream is not restartable.
struct ListPairs {
    list: Rc<RefCell<List>>,
    index: usize,
}

impl Iterator for ListPairs {
    type Item = (i64, Value);

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.list.borrow().get(self.index)?;
        let key = self.index as i64;
        self.index += 1;
        Some((key, item))
    }
}

/// `dump_stack()` - log the scope frames
pub struct DumpStackTool;

impl Tool for DumpStackTool {
    fn name(&self) -> &str {
        "dump_stack"
    }

    fn description(&self) -> &str {
        "Log every scope frame and its bindings"
    }

    fn call(&self, interp: &mut Evaluator, _args: Vec<Value>) -> Result<ToolOutput> {
        for (depth, frame) in interp.scope.frames().iter().enumerate() {
            let mut names: Vec<&str> = frame.keys().map(String::as_str).collect();
            names.sort_unstable();
            debug!(depth, bindings = %names.join(", "), "scope frame");
        }
        Ok(ToolOutput::Value(Value::Nil))
    }

    fn arity(&self) -> Option<usize> {
        Some(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Type;
    use std::io::Write;

    fn evaluator() -> Evaluator {
        Evaluator::with_output(Box::new(std::io::sink()))
    }

    fn int_list(values: &[i64]) -> Value {
        Value::from_list(List::new(
            values.iter().map(|n| Value::Int(*n)).collect(),
            Some(Type::Int),
        ))
    }

    fn unwrap_value(output: ToolOutput) -> Value {
        match output {
            ToolOutput::Value(value) => value,
            ToolOutput::Pairs(_) => panic!("expected a value, got a pair stream"),
        }
    }

    #[test]
    fn test_type_tool() {
        let mut interp = evaluator();
        let out = TypeTool.call(&mut interp, vec![Value::Int(1)]).unwrap();
        assert_eq!(unwrap_value(out), Value::Str("int".to_string()));

        let out = TypeTool.call(&mut interp, vec![int_list(&[1])]).unwrap();
        assert_eq!(unwrap_value(out), Value::Str("List[int]".to_string()));
    }

    #[test]
    fn test_len_tool() {
        let mut interp = evaluator();
        let out = LenTool.call(&mut interp, vec![int_list(&[1, 2, 3])]).unwrap();
        assert_eq!(unwrap_value(out), Value::Int(3));

        assert!(LenTool.call(&mut interp, vec![Value::Int(1)]).is_err());
    }

    #[test]
    fn test_concat_law() {
        let mut interp = evaluator();
        let a = int_list(&[1, 2]);
        let b = int_list(&[3]);
        let out = ConcatTool.call(&mut interp, vec![a.clone(), b]).unwrap();
        let result = unwrap_value(out);

        assert_eq!(result.type_name(), a.type_name());
        match &result {
            Value::List(list) => assert_eq!(list.borrow().len(), 3),
            other => panic!("expected list, got {:?}", other),
        }
    }

    #[test]
    fn test_concat_type_mismatch() {
        let mut interp = evaluator();
        let ints = int_list(&[1]);
        let strs = Value::from_list(List::new(
            vec![Value::Str("a".to_string())],
            Some(Type::Str),
        ));
        assert!(matches!(
            ConcatTool.call(&mut interp, vec![ints, strs]),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_append_pop_roundtrip() {
        let mut interp = evaluator();
        let list = int_list(&[1, 2]);

        AppendTool
            .call(&mut interp, vec![list.clone(), Value::Int(7)])
            .unwrap();
        let popped = unwrap_value(PopTool.call(&mut interp, vec![list.clone()]).unwrap());

        assert_eq!(popped, Value::Int(7));
        match &list {
            Value::List(list) => assert_eq!(list.borrow().len(), 2),
            other => panic!("expected list, got {:?}", other),
        }
    }

    #[test]
    fn test_append_type_checked() {
        let mut interp = evaluator();
        assert!(matches!(
            AppendTool.call(&mut interp, vec![int_list(&[1]), Value::Bool(true)]),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_append_types_empty_list() {
        let mut interp = evaluator();
        let empty = Value::from_list(List::new(Vec::new(), None));
        AppendTool
            .call(&mut interp, vec![empty.clone(), Value::Int(1)])
            .unwrap();
        assert_eq!(empty.type_name(), "List[int]");
    }

    #[test]
    fn test_pop_empty_fails() {
        let mut interp = evaluator();
        let empty = Value::from_list(List::new(Vec::new(), Some(Type::Int)));
        assert_eq!(
            PopTool.call(&mut interp, vec![empty]).unwrap_err(),
            Error::EmptyList {
                operation: "pop".to_string(),
            }
        );
    }

    #[test]
    fn test_ipairs_key_sequence() {
        let mut interp = evaluator();
        let out = IpairsTool
            .call(&mut interp, vec![int_list(&[10, 20, 30])])
            .unwrap();
        let pairs = match out {
            ToolOutput::Pairs(pairs) => pairs,
            ToolOutput::Value(_) => panic!("expected a pair stream"),
        };

        let collected: Vec<(i64, Value)> = pairs.collect();
        assert_eq!(
            collected,
            vec![
                (0, Value::Int(10)),
                (1, Value::Int(20)),
                (2, Value::Int(30)),
            ]
        );
    }

    #[test]
    fn test_ipairs_sees_growth() {
        let mut interp = evaluator();
        let list = int_list(&[1]);
        let out = IpairsTool.call(&mut interp, vec![list.clone()]).unwrap();
        let mut pairs = match out {
            ToolOutput::Pairs(pairs) => pairs,
            ToolOutput::Value(_) => panic!("expected a pair stream"),
        };

        assert_eq!(pairs.next(), Some((0, Value::Int(1))));
        AppendTool
            .call(&mut interp, vec![list, Value::Int(2)])
            .unwrap();
        assert_eq!(pairs.next(), Some((1, Value::Int(2))));
        assert_eq!(pairs.next(), None);
    }

    #[test]
    fn test_dump_stack_is_a_no_op() {
        let mut interp = evaluator();
        interp.scope.new_identifier("x", Value::Int(1));
        let out = DumpStackTool.call(&mut interp, Vec::new()).unwrap();
        assert_eq!(unwrap_value(out), Value::Nil);
        assert_eq!(interp.scope.get("x"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_print_writes_to_sink() {
        struct SharedBuf(Rc<RefCell<Vec<u8>>>);
        impl Write for SharedBuf {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.borrow_mut().extend_from_slice(buf);
                Ok(buf.len())
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let buffer = Rc::new(RefCell::new(Vec::new()));
        let mut interp = Evaluator::with_output(Box::new(SharedBuf(Rc::clone(&buffer))));

        PrintTool
            .call(
                &mut interp,
                vec![Value::Int(0), Value::Str("ten".to_string()), Value::Nil],
            )
            .unwrap();

        assert_eq!(String::from_utf8(buffer.borrow().clone()).unwrap(), "0 ten nil\n");
    }
}
