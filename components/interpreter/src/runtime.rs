//! Runtime state: scope chain, closure call stack, `this` register, and the
//! host-provided global record.

use crate::closure::Closure;
use core_types::{EcoError, ErrorKind, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// One level of the scope stack: a mapping from name to value.
pub type ScopeFrame = HashMap<String, Value>;

/// Control-flow signal produced by evaluation.
///
/// `Return` is the non-local return: it is never catchable by user code and
/// is converted back into a value only at a function-call boundary (or at
/// the program root). `Throw` carries a user-thrown value; `Error` carries
/// an engine error. Both are caught by `try`/`catch`.
#[derive(Debug, Clone, PartialEq)]
pub enum Unwind {
    /// Non-local return carrying the return payload
    Return(Value),
    /// User `throw`; the value propagates unchanged
    Throw(Value),
    /// Engine error (illegal assignment, type errors, host failures)
    Error(EcoError),
}

/// Result of evaluating any AST node.
pub type EvalResult = Result<Value, Unwind>;

/// Mutable evaluation state for one program run.
///
/// Invariants: the scope stack is never empty below the root; every push has
/// a matching pop on every exit path, so scope and closure stack depths are
/// identical before and after any balanced evaluation.
pub struct Runtime {
    /// Host-provided global bindings, also exposed as the `this` of plain
    /// function calls
    global: Rc<RefCell<HashMap<String, Value>>>,
    /// Frames are shared: a closure call pushes its captured frame by
    /// reference, so writes through it persist between calls
    scopes: Vec<Rc<RefCell<ScopeFrame>>>,
    this_value: Value,
    call_stack: Vec<Rc<Closure>>,
}

impl Runtime {
    /// Create a runtime with an empty global record and a single root frame.
    pub fn new() -> Self {
        Self {
            global: Rc::new(RefCell::new(HashMap::new())),
            scopes: vec![Rc::new(RefCell::new(ScopeFrame::new()))],
            this_value: Value::Undefined,
            call_stack: Vec::new(),
        }
    }

    /// Replace the global record and reset the scope stack to the given
    /// root frame.
    pub fn set_args(&mut self, global: HashMap<String, Value>, scope: ScopeFrame) {
        self.global = Rc::new(RefCell::new(global));
        self.scopes = vec![Rc::new(RefCell::new(scope))];
        self.this_value = Value::Undefined;
        self.call_stack.clear();
    }

    /// Push a scope frame; an empty frame when `None`.
    pub fn push_scope(&mut self, frame: Option<Rc<RefCell<ScopeFrame>>>) {
        self.scopes
            .push(frame.unwrap_or_else(|| Rc::new(RefCell::new(ScopeFrame::new()))));
    }

    /// Pop the innermost scope frame.
    pub fn pop_scope(&mut self) -> Option<Rc<RefCell<ScopeFrame>>> {
        self.scopes.pop()
    }

    /// The innermost scope frame.
    pub fn get_scope(&self) -> Rc<RefCell<ScopeFrame>> {
        self.scopes
            .last()
            .cloned()
            .expect("scope stack is never empty during evaluation")
    }

    /// Flattened snapshot of the scope chain; inner frames override outer
    /// bindings.
    pub fn get_full_scope(&self) -> ScopeFrame {
        let mut flat = ScopeFrame::new();
        for frame in &self.scopes {
            for (name, value) in frame.borrow().iter() {
                flat.insert(name.clone(), value.clone());
            }
        }
        flat
    }

    /// Look a name up through the scope chain, innermost frame first.
    ///
    /// A frame that defines the name wins even when the value is
    /// `undefined`. Unbound names fall back to the global record, whose
    /// value is returned only when truthy.
    pub fn get_local(&self, name: &str) -> Value {
        for frame in self.scopes.iter().rev() {
            if let Some(value) = frame.borrow().get(name) {
                return value.clone();
            }
        }
        let global = self.global.borrow();
        match global.get(name) {
            Some(value) if value.is_truthy() => value.clone(),
            _ => Value::Undefined,
        }
    }

    /// Write to the innermost frame that already binds the name.
    ///
    /// Writes to names with no existing binding are silently dropped.
    pub fn set_local(&mut self, name: &str, value: Value) {
        for frame in self.scopes.iter().rev() {
            if frame.borrow().contains_key(name) {
                frame.borrow_mut().insert(name.to_string(), value);
                return;
            }
        }
    }

    /// Bind a name in the innermost scope frame (variable declaration).
    pub fn declare_local(&mut self, name: &str, value: Value) {
        self.get_scope().borrow_mut().insert(name.to_string(), value);
    }

    /// Number of frames currently on the scope stack.
    pub fn scope_depth(&self) -> usize {
        self.scopes.len()
    }

    /// Push a closure onto the call stack.
    pub fn push_stack(&mut self, closure: Rc<Closure>) {
        self.call_stack.push(closure);
    }

    /// Pop the top closure off the call stack.
    pub fn pop_stack(&mut self) -> Option<Rc<Closure>> {
        self.call_stack.pop()
    }

    /// The currently executing closure, if any.
    pub fn stack_top(&self) -> Option<&Rc<Closure>> {
        self.call_stack.last()
    }

    /// Depth of the closure call stack.
    pub fn stack_depth(&self) -> usize {
        self.call_stack.len()
    }

    /// Current `this` value.
    pub fn get_this(&self) -> Value {
        self.this_value.clone()
    }

    /// Replace the `this` value, returning the previous one.
    pub fn set_this(&mut self, value: Value) -> Value {
        std::mem::replace(&mut self.this_value, value)
    }

    /// The global record viewed as an object value; plain function calls
    /// receive it as `this`.
    pub fn global_object(&self) -> Value {
        Value::Object(self.global.clone())
    }

    /// Install a binding in the global record.
    pub fn set_global(&mut self, name: &str, value: Value) {
        self.global.borrow_mut().insert(name.to_string(), value);
    }

    /// Construct an instance through `global[class_name]` with positional
    /// arguments.
    ///
    /// The constructor is invoked with a fresh empty object as `this`; when
    /// it returns `undefined` the object itself is the result.
    pub fn instantiate(&mut self, class_name: &str, args: Vec<Value>) -> EvalResult {
        let constructor = {
            let global = self.global.borrow();
            global.get(class_name).cloned()
        };
        let constructor = match constructor {
            Some(value) if value.is_callable() => value,
            _ => {
                return Err(Unwind::Error(EcoError::new(
                    ErrorKind::TypeError,
                    format!("'{}' is not a constructor", class_name),
                )))
            }
        };
        let instance = Value::object(HashMap::new());
        let result = self.call_value(&constructor, instance.clone(), args)?;
        match result {
            Value::Undefined => Ok(instance),
            other => Ok(other),
        }
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_chain_lookup_inner_wins() {
        let mut runtime = Runtime::new();
        runtime.declare_local("x", Value::Number(1.0));
        runtime.push_scope(None);
        runtime.declare_local("x", Value::Number(2.0));
        assert_eq!(runtime.get_local("x"), Value::Number(2.0));
        runtime.pop_scope();
        assert_eq!(runtime.get_local("x"), Value::Number(1.0));
    }

    #[test]
    fn test_shadowing_with_undefined_still_wins() {
        let mut runtime = Runtime::new();
        runtime.declare_local("x", Value::Number(1.0));
        runtime.push_scope(None);
        runtime.declare_local("x", Value::Undefined);
        assert_eq!(runtime.get_local("x"), Value::Undefined);
    }

    #[test]
    fn test_global_fallback_requires_truthy() {
        let mut runtime = Runtime::new();
        runtime.set_global("answer", Value::Number(42.0));
        runtime.set_global("zero", Value::Number(0.0));
        assert_eq!(runtime.get_local("answer"), Value::Number(42.0));
        // Falsy globals are indistinguishable from missing ones.
        assert_eq!(runtime.get_local("zero"), Value::Undefined);
    }

    #[test]
    fn test_set_local_writes_innermost_binding() {
        let mut runtime = Runtime::new();
        runtime.declare_local("x", Value::Number(1.0));
        runtime.push_scope(None);
        runtime.set_local("x", Value::Number(5.0));
        runtime.pop_scope();
        assert_eq!(runtime.get_local("x"), Value::Number(5.0));
    }

    #[test]
    fn test_set_local_silently_drops_unbound_writes() {
        let mut runtime = Runtime::new();
        runtime.set_local("ghost", Value::Number(1.0));
        assert_eq!(runtime.get_local("ghost"), Value::Undefined);
    }

    #[test]
    fn test_full_scope_flattening() {
        let mut runtime = Runtime::new();
        runtime.declare_local("a", Value::Number(1.0));
        runtime.declare_local("b", Value::Number(2.0));
        runtime.push_scope(None);
        runtime.declare_local("b", Value::Number(3.0));
        let flat = runtime.get_full_scope();
        assert_eq!(flat.get("a"), Some(&Value::Number(1.0)));
        assert_eq!(flat.get("b"), Some(&Value::Number(3.0)));
    }

    #[test]
    fn test_this_register() {
        let mut runtime = Runtime::new();
        assert_eq!(runtime.get_this(), Value::Undefined);
        let previous = runtime.set_this(Value::Number(1.0));
        assert_eq!(previous, Value::Undefined);
        assert_eq!(runtime.get_this(), Value::Number(1.0));
    }
}
