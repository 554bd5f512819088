//! Error types for the Tua interpreter

use thiserror::Error;

/// Tua interpreter errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // Scan/parse errors
    /// Syntax error encountered while scanning or parsing
    ///
    /// **Triggered by:** invalid source text (stray characters, unterminated
    /// strings, malformed numbers)
    #[error("Syntax error at line {line}: {message}")]
    SyntaxError {
        /// Line number where the error occurred (1-indexed)
        line: usize,
        /// Error description
        message: String,
    },

    /// Unexpected token encountered during parsing
    #[error("Unexpected token at line {line}: expected {expected}, got {got}")]
    UnexpectedToken {
        /// Expected token description
        expected: String,
        /// Actual token received
        got: String,
        /// Line number of the offending token
        line: usize,
    },

    /// Unexpected end of file during parsing
    #[error("Unexpected end of file")]
    UnexpectedEof,

    /// Unknown type name in an annotation
    #[error("Unknown type name '{name}' at line {line}")]
    UnknownType {
        /// The unrecognized type name
        name: String,
        /// Line number of the annotation
        line: usize,
    },

    // Semantic errors
    /// Value type does not match the expected type
    ///
    /// **Triggered by:** `let` initializers, assignments, and list element
    /// writes whose value type differs from the declared/current type
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch {
        /// Expected type tag
        expected: String,
        /// Actual type tag
        got: String,
    },

    /// Definition collides with an existing binding
    #[error("Variable named '{name}' is already defined")]
    AlreadyDefined {
        /// The colliding identifier
        name: String,
    },

    /// Reference to a name with no binding in any frame
    #[error("Name '{name}' is not defined")]
    NotDefined {
        /// The unresolved identifier
        name: String,
    },

    /// Call target is neither a built-in nor a defined function
    #[error("Function '{name}' is not defined")]
    UndefinedFunction {
        /// The unresolved call target
        name: String,
    },

    /// Call target resolves to a non-function binding
    #[error("Trying to call non-function '{name}'")]
    NotCallable {
        /// The call target
        name: String,
    },

    /// Call with the wrong number of arguments
    #[error("Wrong number of arguments when calling function '{name}': expected {expected}, got {got}")]
    WrongArity {
        /// The called function
        name: String,
        /// Declared parameter count
        expected: usize,
        /// Supplied argument count
        got: usize,
    },

    /// Argument type does not match the declared parameter type
    #[error("When calling function '{function}' parameter '{param}' should be of type {expected}, got {got} instead")]
    ArgumentTypeMismatch {
        /// The called function
        function: String,
        /// The mismatched parameter name
        param: String,
        /// Declared parameter type
        expected: String,
        /// Supplied argument type
        got: String,
    },

    /// Binary operator applied to unsupported operand types
    ///
    /// **Triggered by:** e.g. `true + 1`, `"a" < 2`, `1 .. "b"`
    #[error("Trying to use operator '{op}' on {left} and {right}")]
    InvalidBinaryOp {
        /// Operator lexeme
        op: String,
        /// Left operand type
        left: String,
        /// Right operand type
        right: String,
    },

    /// Unary operator applied to an unsupported operand type
    #[error("Trying to use operator '{op}' on {operand}")]
    InvalidUnaryOp {
        /// Operator lexeme
        op: String,
        /// Operand type
        operand: String,
    },

    /// Condition expression did not produce a bool
    #[error("Condition must be of type bool, got {got}")]
    ConditionNotBool {
        /// Actual condition type
        got: String,
    },

    /// List index outside `0..len`
    #[error("Index out of range: {index} for '{name}' of length {length}")]
    IndexOutOfRange {
        /// Requested index
        index: i64,
        /// Name of the indexed binding
        name: String,
        /// Current list length
        length: usize,
    },

    /// List index expression did not produce an int
    #[error("List index for '{name}' must be of type int, got {got}")]
    IndexNotInt {
        /// Name of the indexed binding
        name: String,
        /// Actual index type
        got: String,
    },

    /// Index suffix applied to a non-list binding
    #[error("Trying to index non-list '{name}' of type {got}")]
    NotIndexable {
        /// Name of the binding
        name: String,
        /// Its actual type
        got: String,
    },

    /// Table constructor with elements of differing types
    #[error("List constructor contains multiple types: {types}")]
    HeterogeneousList {
        /// Sorted, comma-separated list of the conflicting type tags
        types: String,
    },

    /// Loop iterator name is already bound
    #[error("Cannot use name '{name}' as iterator, because the identifier is already defined")]
    IteratorCollision {
        /// The colliding iterator name
        name: String,
    },

    /// Numeric-for start value is not an int
    #[error("Iterator '{name}' must be of type int, got {got}")]
    IteratorNotInt {
        /// The iterator name
        name: String,
        /// Actual start value type
        got: String,
    },

    /// Numeric-for step value is not an int
    #[error("Cannot increment an int iterator using a value of type {got}")]
    StepNotInt {
        /// Actual step value type
        got: String,
    },

    /// Generic-for source call did not produce a key/value sequence
    #[error("Call to '{name}' in a generic for must produce a key/value sequence")]
    NotAPairSource {
        /// The call target
        name: String,
    },

    /// Key/value sequence used outside a generic for
    #[error("Call to '{name}' produces a key/value sequence, which is only valid as the source of a generic for")]
    PairsOutsideFor {
        /// The call target
        name: String,
    },

    /// Division or modulo by zero
    #[error("Division by zero")]
    DivisionByZero,

    /// Operation that requires elements applied to an empty list
    #[error("Empty list for operation: {operation}")]
    EmptyList {
        /// Operation name
        operation: String,
    },

    /// Invalid arguments provided to a built-in
    #[error("Invalid arguments for built-in '{tool}': {reason}")]
    InvalidArguments {
        /// Built-in name
        tool: String,
        /// Reason for invalidity
        reason: String,
    },

    // Internal errors
    /// Contract violation inside the evaluator; never fires on well-formed input
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an internal error with a message
    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }

    /// True for errors that indicate a bug in the interpreter itself rather
    /// than in the interpreted program
    pub fn is_internal(&self) -> bool {
        matches!(self, Error::Internal(_))
    }
}

/// Result type for Tua operations
pub type Result<T> = std::result::Result<T, Error>;
