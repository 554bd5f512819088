use std::collections::BTreeSet;
use std::io::Write;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::parser::{
    BinaryOp, Block, Expression, FunctionCall, Program, Statement, UnaryOp,
};
use crate::runtime::list::List;
use crate::runtime::scope::ScopeStack;
use crate::runtime::value::{Function, Type, Value};
use crate::tools::{ToolOutput, ToolRegistry};

/// Early-exit signal threaded up through statement evaluation: `Some` carries
/// the value of a `return`, `None` is normal completion.
type Exit = Option<Value>;

/// Tree-walking evaluator for Tua programs
///
/// Owns the scope stack (whose bottom frame is the program frame, kept alive
/// across [`Evaluator::execute`] calls so a driver can run programs line by
/// line) and the built-in registry. Output from `print` goes to the
/// evaluator's sink, stdout by default.
pub struct Evaluator {
    /// Scope stack; the bottom frame is the program frame
    pub scope: ScopeStack,
    registry: Rc<ToolRegistry>,
    out: Box<dyn Write>,
}

impl Evaluator {
    /// Creates a new evaluator writing to stdout
    pub fn new() -> Self {
        Evaluator {
            scope: ScopeStack::new(),
            registry: Rc::new(ToolRegistry::new()),
            out: Box::new(std::io::stdout()),
        }
    }

    /// Creates a new evaluator with a custom output sink
    pub fn with_output(out: Box<dyn Write>) -> Self {
        Evaluator {
            scope: ScopeStack::new(),
            registry: Rc::new(ToolRegistry::new()),
            out,
        }
    }

    /// The output sink `print` writes to
    pub fn output(&mut self) -> &mut dyn Write {
        &mut *self.out
    }

    /// Executes a program's top-level statements in the program frame
    ///
    /// A top-level `return` ends the program; its value is discarded.
    pub fn execute(&mut self, program: &Program) -> Result<()> {
        debug!(statements = program.body.statements.len(), "executing program");

        for statement in &program.body.statements {
            if let Some(value) = self.eval_statement(statement)? {
                trace!(%value, "top-level return");
                break;
            }
        }

        Ok(())
    }

    /// Evaluate a statement, returning an early-exit signal if one was raised
    fn eval_statement(&mut self, stmt: &Statement) -> Result<Exit> {
        match stmt {
            Statement::Declare { name, ty, value } => self.eval_declare(name, ty, value),
            Statement::Assign { name, index, value } => self.eval_assign(name, index.as_ref(), value),
            Statement::Call(call) => match self.eval_call(call)? {
                ToolOutput::Value(_) => Ok(None),
                ToolOutput::Pairs(_) => Err(Error::PairsOutsideFor {
                    name: call.name.clone(),
                }),
            },
            Statement::Do(body) => self.eval_block(body),
            Statement::While { condition, body } => self.eval_while(condition, body),
            Statement::If { arms, else_body } => self.eval_if(arms, else_body.as_ref()),
            Statement::NumericFor {
                iterator,
                start,
                limit,
                step,
                body,
            } => self.eval_numeric_for(iterator, start, limit, step.as_ref(), body),
            Statement::GenericFor {
                key,
                value,
                source,
                body,
            } => self.eval_generic_for(key, value, source, body),
            Statement::FunctionDef {
                name,
                params,
                returns,
                body,
            } => {
                let function = Function {
                    name: name.clone(),
                    params: params.clone(),
                    returns: returns.clone(),
                    body: Rc::new(body.clone()),
                };
                if !self
                    .scope
                    .new_identifier(name, Value::Function(Rc::new(function)))
                {
                    return Err(Error::AlreadyDefined { name: name.clone() });
                }
                Ok(None)
            }
            Statement::Return { values } => {
                let mut evaluated = Vec::new();
                for expr in values {
                    evaluated.push(self.eval_expression(expr)?);
                }
                // only the first value is returned
                Ok(Some(evaluated.into_iter().next().unwrap_or(Value::Nil)))
            }
            // recognized by the grammar, no runtime effect
            Statement::Break | Statement::Continue => Ok(None),
        }
    }

    /// Evaluate a block in a fresh frame, popping it on every exit path
    fn eval_block(&mut self, block: &Block) -> Result<Exit> {
        self.scope.push();

        for statement in &block.statements {
            match self.eval_statement(statement) {
                Ok(None) => {}
                result => {
                    self.scope.pop();
                    return result;
                }
            }
        }

        self.scope.pop();
        Ok(None)
    }

    fn eval_declare(&mut self, name: &str, ty: &Type, value: &Expression) -> Result<Exit> {
        let value = self.eval_expression(value)?;

        if value.ty() != *ty {
            // an empty list literal is retyped by its binding
            let retyped = match (&value, ty) {
                (Value::List(list), Type::List(Some(elem)))
                    if list.borrow().elem_type.is_none() =>
                {
                    list.borrow_mut().elem_type = Some((**elem).clone());
                    true
                }
                _ => false,
            };
            if !retyped {
                return Err(Error::TypeMismatch {
                    expected: ty.to_string(),
                    got: value.type_name(),
                });
            }
        }

        if !self.scope.new_identifier(name, value) {
            return Err(Error::AlreadyDefined {
                name: name.to_string(),
            });
        }

        Ok(None)
    }

    fn eval_assign(
        &mut self,
        name: &str,
        index: Option<&Expression>,
        value: &Expression,
    ) -> Result<Exit> {
        match index {
            Some(index_expr) => {
                let index = self.eval_expression(index_expr)?;
                let value = self.eval_expression(value)?;
                let index = match index {
                    Value::Int(i) => i,
                    other => {
                        return Err(Error::IndexNotInt {
                            name: name.to_string(),
                            got: other.type_name(),
                        })
                    }
                };
                self.scope.change_value_with_suffix(name, value, index)?;
            }
            None => {
                let value = self.eval_expression(value)?;
                self.scope.change_value(name, value)?;
            }
        }
        Ok(None)
    }

    fn eval_while(&mut self, condition: &Expression, body: &Block) -> Result<Exit> {
        loop {
            if !self.eval_condition(condition)? {
                break;
            }
            if let Some(value) = self.eval_block(body)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    fn eval_if(
        &mut self,
        arms: &[crate::parser::IfArm],
        else_body: Option<&Block>,
    ) -> Result<Exit> {
        for arm in arms {
            if self.eval_condition(&arm.condition)? {
                return self.eval_block(&arm.body);
            }
        }
        if let Some(body) = else_body {
            return self.eval_block(body);
        }
        Ok(None)
    }

    /// Evaluate a condition expression, requiring a bool
    fn eval_condition(&mut self, condition: &Expression) -> Result<bool> {
        match self.eval_expression(condition)? {
            Value::Bool(b) => Ok(b),
            other => Err(Error::ConditionNotBool {
                got: other.type_name(),
            }),
        }
    }

    fn eval_numeric_for(
        &mut self,
        iterator: &str,
        start: &Expression,
        limit: &Expression,
        step: Option<&Expression>,
        body: &Block,
    ) -> Result<Exit> {
        let start = self.eval_expression(start)?;
        if !matches!(start, Value::Int(_)) {
            return Err(Error::IteratorNotInt {
                name: iterator.to_string(),
                got: start.type_name(),
            });
        }

        // the iterator lives in the surrounding scope for the loop's duration
        if !self.scope.new_identifier(iterator, start) {
            return Err(Error::IteratorCollision {
                name: iterator.to_string(),
            });
        }

        let result = self.run_numeric_for(iterator, limit, step, body);
        self.scope.del_identifier(iterator);
        result
    }

    // The iterator is already bound; the caller removes it afterwards.
    fn run_numeric_for(
        &mut self,
        iterator: &str,
        limit: &Expression,
        step: Option<&Expression>,
        body: &Block,
    ) -> Result<Exit> {
        // the step is evaluated once, with the iterator in scope
        let step = match step {
            Some(expr) => match self.eval_expression(expr)? {
                Value::Int(n) => n,
                other => {
                    return Err(Error::StepNotInt {
                        got: other.type_name(),
                    })
                }
            },
            None => 1,
        };

        // the limit is a boolean condition over the iterator, re-checked
        // before every iteration; it is not a numeric bound
        while self.eval_condition(limit)? {
            if let Some(value) = self.eval_block(body)? {
                return Ok(Some(value));
            }

            let current = match self.scope.get(iterator) {
                Some(Value::Int(n)) => *n,
                _ => {
                    return Err(Error::internal(format!(
                        "numeric-for iterator '{}' lost its int binding",
                        iterator
                    )))
                }
            };
            self.scope
                .change_value(iterator, Value::Int(current.saturating_add(step)))?;
        }

        Ok(None)
    }

    fn eval_generic_for(
        &mut self,
        key: &str,
        value: &str,
        source: &FunctionCall,
        body: &Block,
    ) -> Result<Exit> {
        let pairs = match self.eval_call(source)? {
            ToolOutput::Pairs(pairs) => pairs,
            ToolOutput::Value(_) => {
                return Err(Error::NotAPairSource {
                    name: source.name.clone(),
                })
            }
        };

        if self.scope.get(key).is_some() {
            return Err(Error::IteratorCollision {
                name: key.to_string(),
            });
        }
        if self.scope.get(value).is_some() {
            return Err(Error::IteratorCollision {
                name: value.to_string(),
            });
        }

        for (k, v) in pairs {
            // rebound every iteration: values in the sequence may differ in type
            self.scope.new_identifier(key, Value::Int(k));
            self.scope.new_identifier(value, v);

            let result = self.eval_block(body);

            self.scope.del_identifier(key);
            self.scope.del_identifier(value);

            match result? {
                Some(exit) => return Ok(Some(exit)),
                None => {}
            }
        }

        Ok(None)
    }

    /// Evaluate an expression to a value
    pub fn eval_expression(&mut self, expr: &Expression) -> Result<Value> {
        match expr {
            Expression::Int(n) => Ok(Value::Int(*n)),
            Expression::Float(f) => Ok(Value::Float(*f)),
            Expression::Str(s) => Ok(Value::Str(s.clone())),
            Expression::Bool(b) => Ok(Value::Bool(*b)),
            Expression::Nil => Ok(Value::Nil),

            Expression::Variable { name, index } => self.eval_variable(name, index.as_deref()),

            Expression::Call(call) => match self.eval_call(call)? {
                ToolOutput::Value(value) => Ok(value),
                ToolOutput::Pairs(_) => Err(Error::PairsOutsideFor {
                    name: call.name.clone(),
                }),
            },

            Expression::List(elements) => self.eval_list_constructor(elements),

            Expression::Binary { op, left, right } => {
                let left = self.eval_expression(left)?;
                let right = self.eval_expression(right)?;
                self.apply_binary_op(*op, left, right)
            }

            Expression::Unary { op, operand } => {
                let operand = self.eval_expression(operand)?;
                self.apply_unary_op(*op, operand)
            }
        }
    }

    fn eval_variable(&mut self, name: &str, index: Option<&Expression>) -> Result<Value> {
        match index {
            Some(index_expr) => {
                let index = self.eval_expression(index_expr)?;
                let binding = self
                    .scope
                    .get(name)
                    .cloned()
                    .ok_or_else(|| Error::NotDefined {
                        name: name.to_string(),
                    })?;
                let list = match binding {
                    Value::List(list) => list,
                    other => {
                        return Err(Error::NotIndexable {
                            name: name.to_string(),
                            got: other.type_name(),
                        })
                    }
                };
                let index = match index {
                    Value::Int(i) => i,
                    other => {
                        return Err(Error::IndexNotInt {
                            name: name.to_string(),
                            got: other.type_name(),
                        })
                    }
                };
                let list = list.borrow();
                if index < 0 || index as usize >= list.len() {
                    return Err(Error::IndexOutOfRange {
                        index,
                        name: name.to_string(),
                        length: list.len(),
                    });
                }
                list.get(index as usize).ok_or_else(|| {
                    Error::internal(format!("bounds-checked index {} missing in '{}'", index, name))
                })
            }
            None => self
                .scope
                .get(name)
                .cloned()
                .ok_or_else(|| Error::NotDefined {
                    name: name.to_string(),
                }),
        }
    }

    // All elements must share one type, which becomes the element type; an
    // empty constructor stays untyped until bound.
    fn eval_list_constructor(&mut self, elements: &[Expression]) -> Result<Value> {
        let mut items = Vec::new();
        let mut types = BTreeSet::new();

        for element in elements {
            let value = self.eval_expression(element)?;
            types.insert(value.type_name());
            items.push(value);
        }

        if types.len() > 1 {
            return Err(Error::HeterogeneousList {
                types: types.into_iter().collect::<Vec<_>>().join(", "),
            });
        }

        let elem_type = items.first().map(Value::ty);
        Ok(Value::from_list(List::new(items, elem_type)))
    }

    /// Evaluate a call to a built-in or user function
    ///
    /// Built-ins shadow user definitions and receive the evaluated argument
    /// values directly (sharing list payloads); user calls copy every
    /// argument by value and run the body on a fresh scope stack seeded with
    /// the parameters and the caller's function bindings.
    fn eval_call(&mut self, call: &FunctionCall) -> Result<ToolOutput> {
        trace!(name = %call.name, args = call.args.len(), "call");

        if self.registry.has(&call.name) {
            let tool = Rc::clone(&self.registry).get(&call.name)?;
            let mut args = Vec::new();
            for arg in &call.args {
                args.push(self.eval_expression(arg)?);
            }
            if let Some(arity) = tool.arity() {
                if args.len() != arity {
                    return Err(Error::InvalidArguments {
                        tool: call.name.clone(),
                        reason: format!("expected {} arguments, got {}", arity, args.len()),
                    });
                }
            }
            return tool.call(self, args);
        }

        let binding = self
            .scope
            .get(&call.name)
            .cloned()
            .ok_or_else(|| Error::UndefinedFunction {
                name: call.name.clone(),
            })?;
        let function = match binding {
            Value::Function(function) => function,
            _ => {
                return Err(Error::NotCallable {
                    name: call.name.clone(),
                })
            }
        };

        if call.args.len() != function.params.len() {
            return Err(Error::WrongArity {
                name: call.name.clone(),
                expected: function.params.len(),
                got: call.args.len(),
            });
        }

        // arguments are passed by copy; the callee cannot alias caller lists
        let mut args = Vec::new();
        for arg in &call.args {
            args.push(self.eval_expression(arg)?.deep_copy());
        }

        let mut function_scope = ScopeStack::new();
        for (param, arg) in function.params.iter().zip(args) {
            if arg.ty() != param.ty {
                return Err(Error::ArgumentTypeMismatch {
                    function: call.name.clone(),
                    param: param.name.clone(),
                    expected: param.ty.to_string(),
                    got: arg.type_name(),
                });
            }
            function_scope.new_identifier(&param.name, arg);
        }

        // functions stay visible inside the callee; a colliding parameter
        // name wins
        for (name, value) in self.scope.get_functions() {
            function_scope.new_identifier(&name, value);
        }

        debug!(name = %call.name, "entering function");
        let saved = std::mem::replace(&mut self.scope, function_scope);
        let result = self.eval_block(&function.body);
        self.scope = saved;

        match result? {
            Some(value) => Ok(ToolOutput::Value(value)),
            None => Ok(ToolOutput::Value(Value::Nil)),
        }
    }

    fn apply_binary_op(&self, op: BinaryOp, left: Value, right: Value) -> Result<Value> {
        match op {
            BinaryOp::Add => match (left, right) {
                (Value::Int(l), Value::Int(r)) => Ok(Value::Int(l.saturating_add(r))),
                (Value::Int(l), Value::Float(r)) => Ok(Value::Float(l as f64 + r)),
                (Value::Float(l), Value::Int(r)) => Ok(Value::Float(l + r as f64)),
                (Value::Float(l), Value::Float(r)) => Ok(Value::Float(l + r)),
                (l, r) => Err(self.bad_binary_op(op, &l, &r)),
            },

            BinaryOp::Sub => match (left, right) {
                (Value::Int(l), Value::Int(r)) => Ok(Value::Int(l.saturating_sub(r))),
                (Value::Int(l), Value::Float(r)) => Ok(Value::Float(l as f64 - r)),
                (Value::Float(l), Value::Int(r)) => Ok(Value::Float(l - r as f64)),
                (Value::Float(l), Value::Float(r)) => Ok(Value::Float(l - r)),
                (l, r) => Err(self.bad_binary_op(op, &l, &r)),
            },

            BinaryOp::Mul => match (left, right) {
                (Value::Int(l), Value::Int(r)) => Ok(Value::Int(l.saturating_mul(r))),
                (Value::Int(l), Value::Float(r)) => Ok(Value::Float(l as f64 * r)),
                (Value::Float(l), Value::Int(r)) => Ok(Value::Float(l * r as f64)),
                (Value::Float(l), Value::Float(r)) => Ok(Value::Float(l * r)),
                (l, r) => Err(self.bad_binary_op(op, &l, &r)),
            },

            // true division always yields float
            BinaryOp::Div => {
                let (l, r) = self.numeric_operands(op, left, right)?;
                if r == 0.0 {
                    return Err(Error::DivisionByZero);
                }
                Ok(Value::Float(l / r))
            }

            BinaryOp::FloorDiv => match (left, right) {
                (Value::Int(l), Value::Int(r)) => {
                    if r == 0 {
                        return Err(Error::DivisionByZero);
                    }
                    Ok(Value::Int(floor_div(l, r)))
                }
                (l, r) => {
                    let (l, r) = self.numeric_operands(op, l, r)?;
                    if r == 0.0 {
                        return Err(Error::DivisionByZero);
                    }
                    Ok(Value::Float((l / r).floor()))
                }
            },

            // floored semantics: the result takes the divisor's sign
            BinaryOp::Mod => match (left, right) {
                (Value::Int(l), Value::Int(r)) => {
                    if r == 0 {
                        return Err(Error::DivisionByZero);
                    }
                    Ok(Value::Int(floor_mod(l, r)))
                }
                (l, r) => {
                    let (l, r) = self.numeric_operands(op, l, r)?;
                    if r == 0.0 {
                        return Err(Error::DivisionByZero);
                    }
                    Ok(Value::Float(l - r * (l / r).floor()))
                }
            },

            // int only when both operands are int and the result is
            // representably integral
            BinaryOp::Pow => match (left, right) {
                (Value::Int(l), Value::Int(r)) => {
                    if r >= 0 {
                        match u32::try_from(r).ok().and_then(|exp| l.checked_pow(exp)) {
                            Some(n) => Ok(Value::Int(n)),
                            None => Ok(Value::Float((l as f64).powf(r as f64))),
                        }
                    } else {
                        Ok(Value::Float((l as f64).powf(r as f64)))
                    }
                }
                (l, r) => {
                    let (l, r) = self.numeric_operands(op, l, r)?;
                    Ok(Value::Float(l.powf(r)))
                }
            },

            BinaryOp::Concat => match (left, right) {
                (Value::Str(l), Value::Str(r)) => Ok(Value::Str(l + &r)),
                (l, r) => Err(self.bad_binary_op(op, &l, &r)),
            },

            BinaryOp::Eq | BinaryOp::NotEq => {
                if left.ty() != right.ty() {
                    return Err(self.bad_binary_op(op, &left, &right));
                }
                let equal = left == right;
                Ok(Value::Bool(if op == BinaryOp::Eq { equal } else { !equal }))
            }

            BinaryOp::Lt => match (left, right) {
                (Value::Int(l), Value::Int(r)) => Ok(Value::Bool(l < r)),
                (Value::Float(l), Value::Float(r)) => Ok(Value::Bool(l < r)),
                (Value::Str(l), Value::Str(r)) => Ok(Value::Bool(l < r)),
                (l, r) => Err(self.bad_binary_op(op, &l, &r)),
            },

            BinaryOp::LtEq => match (left, right) {
                (Value::Int(l), Value::Int(r)) => Ok(Value::Bool(l <= r)),
                (Value::Float(l), Value::Float(r)) => Ok(Value::Bool(l <= r)),
                (Value::Str(l), Value::Str(r)) => Ok(Value::Bool(l <= r)),
                (l, r) => Err(self.bad_binary_op(op, &l, &r)),
            },

            BinaryOp::Gt => match (left, right) {
                (Value::Int(l), Value::Int(r)) => Ok(Value::Bool(l > r)),
                (Value::Float(l), Value::Float(r)) => Ok(Value::Bool(l > r)),
                (Value::Str(l), Value::Str(r)) => Ok(Value::Bool(l > r)),
                (l, r) => Err(self.bad_binary_op(op, &l, &r)),
            },

            BinaryOp::GtEq => match (left, right) {
                (Value::Int(l), Value::Int(r)) => Ok(Value::Bool(l >= r)),
                (Value::Float(l), Value::Float(r)) => Ok(Value::Bool(l >= r)),
                (Value::Str(l), Value::Str(r)) => Ok(Value::Bool(l >= r)),
                (l, r) => Err(self.bad_binary_op(op, &l, &r)),
            },

            // both operands are already evaluated; no short circuit
            BinaryOp::And => match (left, right) {
                (Value::Bool(l), Value::Bool(r)) => Ok(Value::Bool(l && r)),
                (l, r) => Err(self.bad_binary_op(op, &l, &r)),
            },

            BinaryOp::Or => match (left, right) {
                (Value::Bool(l), Value::Bool(r)) => Ok(Value::Bool(l || r)),
                (l, r) => Err(self.bad_binary_op(op, &l, &r)),
            },
        }
    }

    fn apply_unary_op(&self, op: UnaryOp, operand: Value) -> Result<Value> {
        match (op, operand) {
            (UnaryOp::Neg, Value::Int(n)) => Ok(Value::Int(n.saturating_neg())),
            (UnaryOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
            (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
            (op, operand) => Err(Error::InvalidUnaryOp {
                op: op.to_string(),
                operand: operand.type_name(),
            }),
        }
    }

    // Both operands as floats, for the operator families where any float
    // operand makes the result float.
    fn numeric_operands(&self, op: BinaryOp, left: Value, right: Value) -> Result<(f64, f64)> {
        match (&left, &right) {
            (Value::Int(l), Value::Int(r)) => Ok((*l as f64, *r as f64)),
            (Value::Int(l), Value::Float(r)) => Ok((*l as f64, *r)),
            (Value::Float(l), Value::Int(r)) => Ok((*l, *r as f64)),
            (Value::Float(l), Value::Float(r)) => Ok((*l, *r)),
            _ => Err(self.bad_binary_op(op, &left, &right)),
        }
    }

    fn bad_binary_op(&self, op: BinaryOp, left: &Value, right: &Value) -> Error {
        Error::InvalidBinaryOp {
            op: op.to_string(),
            left: left.type_name(),
            right: right.type_name(),
        }
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

// Floored division: the quotient rounds toward negative infinity.
fn floor_div(l: i64, r: i64) -> i64 {
    let q = l.wrapping_div(r);
    if l.wrapping_rem(r) != 0 && (l < 0) != (r < 0) {
        q - 1
    } else {
        q
    }
}

// Floored remainder: the result takes the divisor's sign.
fn floor_mod(l: i64, r: i64) -> i64 {
    let m = l.wrapping_rem(r);
    if m != 0 && (m < 0) != (r < 0) {
        m + r
    } else {
        m
    }
}
