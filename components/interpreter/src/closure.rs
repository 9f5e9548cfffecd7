//! Closure values: a captured lexical environment plus the function's
//! parameters and body.

use crate::runtime::ScopeFrame;
use parser::ast::{Binding, FunctionBody};
use std::cell::RefCell;
use std::rc::Rc;

/// A function value's captured state.
///
/// The captured scope is a snapshot of the scope chain flattened at
/// closure-creation time, outer frames first so inner bindings win. Every
/// invocation pushes the same shared frame, so writes through the closure
/// persist between calls. The parameters and body are shared with every
/// clone of the function value; the display name lives on the surrounding
/// [`core_types::FunctionValue`].
///
/// The `this` value is not captured: it is threaded through the runtime's
/// register per call, with function calls receiving the global object and
/// method calls their receiver.
#[derive(Debug, Clone)]
pub struct Closure {
    /// Flattened snapshot of the scope chain at creation time
    pub captured_scope: Rc<RefCell<ScopeFrame>>,
    /// Parameter bindings, including destructuring patterns and defaults
    pub parameters: Rc<Vec<Binding>>,
    /// Block or expression body
    pub body: Rc<FunctionBody>,
}

impl Closure {
    /// Build a closure from a capture snapshot and the function literal's
    /// parts.
    pub fn new(captured_scope: ScopeFrame, parameters: Vec<Binding>, body: FunctionBody) -> Self {
        Self {
            captured_scope: Rc::new(RefCell::new(captured_scope)),
            parameters: Rc::new(parameters),
            body: Rc::new(body),
        }
    }
}
