//! The `evaluate` dispatcher: tree-walking evaluation of every AST node.

use crate::closure::Closure;
use crate::runtime::{EvalResult, Runtime, Unwind};
use core_types::{EcoError, ErrorKind, FunctionValue, Value};
use parser::ast::*;
use parser::Parser;
use regex::Regex;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::OnceLock;

fn type_error(message: impl Into<String>) -> Unwind {
    Unwind::Error(EcoError::new(ErrorKind::TypeError, message))
}

fn illegal_assignment() -> Unwind {
    Unwind::Error(EcoError::new(ErrorKind::ReferenceError, "illegal assignment"))
}

fn assignment_failed() -> Unwind {
    Unwind::Error(EcoError::new(ErrorKind::ReferenceError, "assignment failed"))
}

impl Runtime {
    /// Evaluate a whole program, converting a top-level return unwind into
    /// the program's result. Without a return, the result is the value of
    /// the last statement.
    pub fn run_program(&mut self, program: &[Statement]) -> Result<Value, EcoError> {
        let mut last = Value::Undefined;
        for statement in program {
            match self.evaluate(statement) {
                Ok(value) => last = value,
                Err(Unwind::Return(value)) => return Ok(value),
                Err(Unwind::Throw(value)) => {
                    return Err(EcoError::new(
                        ErrorKind::InternalError,
                        format!("uncaught exception: {}", value),
                    ))
                }
                Err(Unwind::Error(err)) => return Err(err),
            }
        }
        Ok(last)
    }

    /// Evaluate a single statement.
    ///
    /// Expression statements yield their value; other statements yield
    /// `undefined`.
    pub fn evaluate(&mut self, statement: &Statement) -> EvalResult {
        match statement {
            Statement::Noop => Ok(Value::Undefined),

            Statement::VarDecl { binding, .. } => self.eval_var_decl(binding),

            Statement::Block(statements) => self.eval_block(statements),

            Statement::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let cond = self.eval_expression(cond)?;
                if cond.is_truthy() {
                    self.evaluate(then_branch)?;
                } else if let Some(else_branch) = else_branch {
                    self.evaluate(else_branch)?;
                }
                Ok(Value::Undefined)
            }

            Statement::While { cond, body } => {
                while self.eval_expression(cond)?.is_truthy() {
                    self.evaluate(body)?;
                }
                Ok(Value::Undefined)
            }

            Statement::Return { value } => {
                let value = match value {
                    Some(expr) => self.eval_expression(expr)?,
                    None => Value::Undefined,
                };
                Err(Unwind::Return(value))
            }

            Statement::Throw { value } => {
                let value = self.eval_expression(value)?;
                Err(Unwind::Throw(value))
            }

            Statement::TryCatch {
                try_block,
                catch_block,
                catch_name,
                finally_block,
            } => self.eval_try_catch(try_block, catch_block, catch_name.as_deref(), finally_block),

            // Imports carry no interpreter semantics; the bundler rewrites
            // them before execution.
            Statement::Import(_) => Ok(Value::Undefined),

            Statement::Export(decl) => {
                // An exported declaration still declares its binding;
                // export bookkeeping itself belongs to the bundler.
                if let ExportDecl::VarDecl { binding, .. } = decl {
                    self.eval_var_decl(binding)?;
                }
                Ok(Value::Undefined)
            }

            Statement::Expression(expr) => self.eval_expression(expr),
        }
    }

    fn eval_var_decl(&mut self, binding: &Binding) -> EvalResult {
        let mut value = match &binding.init {
            Some(init) => self.eval_expression(init)?,
            None => Value::Undefined,
        };
        // A function bound by name adopts that name for display.
        if let (Pattern::Identifier(name), Value::Function(func)) = (&binding.pattern, &mut value) {
            if func.name.is_none() {
                func.name = Some(name.clone());
            }
        }
        self.bind_pattern(&binding.pattern, value)?;
        Ok(Value::Undefined)
    }

    fn eval_block(&mut self, statements: &[Statement]) -> EvalResult {
        self.push_scope(None);
        let mut result = Ok(Value::Undefined);
        for statement in statements {
            if let Err(unwind) = self.evaluate(statement) {
                result = Err(unwind);
                break;
            }
        }
        self.pop_scope();
        result.map(|_| Value::Undefined)
    }

    fn eval_try_catch(
        &mut self,
        try_block: &Statement,
        catch_block: &Statement,
        catch_name: Option<&str>,
        finally_block: &Option<Box<Statement>>,
    ) -> EvalResult {
        let mut result = self.evaluate(try_block);

        // The non-local return signal is never catchable; only thrown
        // values and engine errors reach the handler.
        let caught = match result {
            Err(Unwind::Throw(ref value)) => Some(value.clone()),
            Err(Unwind::Error(ref err)) => Some(Value::String(err.message.clone())),
            _ => None,
        };
        if let Some(caught) = caught {
            // The catch binding lives in its own frame scoped to the
            // handler.
            self.push_scope(None);
            if let Some(name) = catch_name {
                self.declare_local(name, caught);
            }
            result = self.evaluate(catch_block);
            self.pop_scope();
        }

        if let Some(finally_block) = finally_block {
            // Finally runs on every exit path; its own unwind supersedes
            // the pending one.
            let finally_result = self.evaluate(finally_block);
            finally_result?;
        }
        result
    }

    /// Evaluate a single expression.
    pub fn eval_expression(&mut self, expression: &Expression) -> EvalResult {
        match expression {
            Expression::Literal(literal) => self.eval_literal(literal),

            Expression::Load { name } => Ok(self.get_local(name)),

            Expression::Parens(inner) => self.eval_expression(inner),

            // Spread is transparent here; array/object literals and call
            // positions give it meaning.
            Expression::Spread(inner) => self.eval_expression(inner),

            Expression::Array(elements) => self.eval_array_literal(elements),

            Expression::Object(fields) => self.eval_object_literal(fields),

            Expression::Function { parameters, body } => {
                let closure = Closure::new(
                    self.get_full_scope(),
                    parameters.clone(),
                    body.clone(),
                );
                Ok(Value::Function(FunctionValue {
                    name: None,
                    payload: Rc::new(closure),
                }))
            }

            Expression::Unary { op, expr } => {
                let value = self.eval_expression(expr)?;
                match op {
                    UnaryOp::Not => Ok(Value::Boolean(!value.is_truthy())),
                    UnaryOp::Neg => Ok(Value::Number(-to_number(&value))),
                }
            }

            Expression::IncOrDec {
                is_prefix,
                op,
                expr,
            } => self.eval_inc_or_dec(*is_prefix, *op, expr),

            Expression::Binary { left, op, right } => self.eval_binary(left, *op, right),

            Expression::Assignment { target, op, value } => self.eval_assignment(target, *op, value),

            Expression::Ternary {
                cond,
                then_branch,
                else_branch,
            } => {
                let cond = self.eval_expression(cond)?;
                if cond.is_truthy() {
                    self.eval_expression(then_branch)
                } else {
                    self.eval_expression(else_branch)
                }
            }

            Expression::ArrayAccess { object, index } => {
                let object = self.eval_expression(object)?;
                let index = self.eval_expression(index)?;
                self.read_index(&object, &index)
            }

            Expression::FieldAccess { object, field } => {
                let object = self.eval_expression(object)?;
                self.read_field(&object, field)
            }

            Expression::FuncCall { callee, args } => {
                let callee = self.eval_expression(callee)?;
                let args = self.eval_arguments(args)?;
                let this = self.global_object();
                self.call_value(&callee, this, args)
            }

            Expression::MethodCall {
                object,
                field_name,
                args,
            } => {
                let object = self.eval_expression(object)?;
                let method = self.read_field(&object, field_name)?;
                if !method.is_callable() {
                    return Err(type_error(format!("'{}' is not a function", field_name)));
                }
                let args = self.eval_arguments(args)?;
                self.call_value(&method, object, args)
            }

            Expression::New { class_name, args } => {
                let args = self.eval_arguments(args)?;
                self.instantiate(class_name, args)
            }

            Expression::Typeof(expr) => {
                let value = self.eval_expression(expr)?;
                Ok(Value::String(value.type_of().to_string()))
            }

            Expression::Html {
                tag_name,
                attributes,
                children,
            } => self.eval_html(tag_name.as_deref(), attributes, children),

            Expression::HtmlExpr(inner) => self.eval_expression(inner),

            Expression::HtmlText(text) => Ok(Value::String(text.clone())),

            Expression::TemplateString(parts) => {
                let mut out = String::new();
                for part in parts {
                    let value = self.eval_expression(part)?;
                    out.push_str(&value.to_string());
                }
                Ok(Value::String(out))
            }

            Expression::TemplateStringContent(text) => Ok(Value::String(text.clone())),
        }
    }

    fn eval_literal(&mut self, literal: &Literal) -> EvalResult {
        match literal {
            Literal::Number(n) => Ok(Value::Number(*n)),
            Literal::Boolean(b) => Ok(Value::Boolean(*b)),
            Literal::Null => Ok(Value::Null),
            Literal::Undefined => Ok(Value::Undefined),
            Literal::Str(s) => {
                if s.contains("#{") {
                    self.interpolate(s)
                } else {
                    Ok(Value::String(s.clone()))
                }
            }
        }
    }

    /// Replace each `#{expr}` (non-greedy, no nesting) with the string form
    /// of its evaluated sub-expression, re-parsed on demand.
    fn interpolate(&mut self, source: &str) -> EvalResult {
        static INTERPOLATION: OnceLock<Regex> = OnceLock::new();
        let pattern = INTERPOLATION.get_or_init(|| Regex::new(r"#\{([^}]*)\}").unwrap());

        let mut out = String::new();
        let mut last = 0;
        for capture in pattern.captures_iter(source) {
            let whole = capture.get(0).unwrap();
            out.push_str(&source[last..whole.start()]);
            let expr = Parser::new(&capture[1])
                .parse_single_expression()
                .map_err(Unwind::Error)?;
            let value = self.eval_expression(&expr)?;
            out.push_str(&value.to_string());
            last = whole.end();
        }
        out.push_str(&source[last..]);
        Ok(Value::String(out))
    }

    fn eval_array_literal(&mut self, elements: &[Expression]) -> EvalResult {
        let mut out = Vec::new();
        for element in elements {
            match element {
                Expression::Spread(inner) => {
                    let value = self.eval_expression(inner)?;
                    match value {
                        Value::Array(items) => out.extend(items.borrow().iter().cloned()),
                        _ => return Err(type_error("cannot spread a non-array value")),
                    }
                }
                _ => out.push(self.eval_expression(element)?),
            }
        }
        Ok(Value::array(out))
    }

    fn eval_object_literal(&mut self, fields: &[ObjectProperty]) -> EvalResult {
        let mut out = HashMap::new();
        for field in fields {
            match field {
                ObjectProperty::Regular { key, value } => {
                    let value = match value {
                        Some(expr) => self.eval_expression(expr)?,
                        // Shorthand loads the key's binding.
                        None => self.get_local(key),
                    };
                    out.insert(key.clone(), value);
                }
                ObjectProperty::Dynamic { key, value } => {
                    let key = self.eval_expression(key)?.to_string();
                    let value = self.eval_expression(value)?;
                    out.insert(key, value);
                }
                ObjectProperty::Spread(expr) => {
                    let value = self.eval_expression(expr)?;
                    if let Value::Object(fields) = value {
                        for (key, value) in fields.borrow().iter() {
                            out.insert(key.clone(), value.clone());
                        }
                    }
                }
            }
        }
        Ok(Value::object(out))
    }

    fn eval_inc_or_dec(
        &mut self,
        is_prefix: bool,
        op: IncDecOp,
        target: &Expression,
    ) -> EvalResult {
        if !matches!(
            target,
            Expression::Load { .. } | Expression::ArrayAccess { .. } | Expression::FieldAccess { .. }
        ) {
            return Err(illegal_assignment());
        }
        let old = to_number(&self.eval_expression(target)?);
        let new = match op {
            IncDecOp::Increment => old + 1.0,
            IncDecOp::Decrement => old - 1.0,
        };
        self.assign_to_target(target, Value::Number(new))?;
        Ok(Value::Number(if is_prefix { new } else { old }))
    }

    fn eval_binary(&mut self, left: &Expression, op: BinaryOp, right: &Expression) -> EvalResult {
        // Short-circuit operators yield the deciding operand itself.
        if op == BinaryOp::And {
            let left = self.eval_expression(left)?;
            if !left.is_truthy() {
                return Ok(left);
            }
            return self.eval_expression(right);
        }
        if op == BinaryOp::Or {
            let left = self.eval_expression(left)?;
            if left.is_truthy() {
                return Ok(left);
            }
            return self.eval_expression(right);
        }

        let left = self.eval_expression(left)?;
        let right = self.eval_expression(right)?;
        Ok(apply_binary(op, &left, &right))
    }

    fn eval_assignment(
        &mut self,
        target: &Expression,
        op: AssignOp,
        value: &Expression,
    ) -> EvalResult {
        if !matches!(
            target,
            Expression::Load { .. } | Expression::ArrayAccess { .. } | Expression::FieldAccess { .. }
        ) {
            return Err(illegal_assignment());
        }
        let value = match op {
            AssignOp::Assign => self.eval_expression(value)?,
            AssignOp::AddAssign => {
                let old = self.eval_expression(target)?;
                let rhs = self.eval_expression(value)?;
                apply_binary(BinaryOp::Add, &old, &rhs)
            }
            AssignOp::SubAssign => {
                let old = self.eval_expression(target)?;
                let rhs = self.eval_expression(value)?;
                apply_binary(BinaryOp::Sub, &old, &rhs)
            }
            AssignOp::MulAssign => {
                let old = self.eval_expression(target)?;
                let rhs = self.eval_expression(value)?;
                apply_binary(BinaryOp::Mul, &old, &rhs)
            }
            AssignOp::DivAssign => {
                let old = self.eval_expression(target)?;
                let rhs = self.eval_expression(value)?;
                apply_binary(BinaryOp::Div, &old, &rhs)
            }
        };
        self.assign_to_target(target, value.clone())?;
        Ok(value)
    }

    fn assign_to_target(&mut self, target: &Expression, value: Value) -> EvalResult {
        match target {
            Expression::Load { name } => {
                // Writes to undeclared names are silently dropped.
                self.set_local(name, value.clone());
                Ok(value)
            }
            Expression::ArrayAccess { object, index } => {
                let object = self.eval_expression(object)?;
                let index = self.eval_expression(index)?;
                match object {
                    Value::Array(items) => {
                        let idx = to_number(&index);
                        if !idx.is_finite() || idx < 0.0 {
                            return Err(assignment_failed());
                        }
                        let idx = idx as usize;
                        let mut items = items.borrow_mut();
                        if idx >= items.len() {
                            items.resize(idx + 1, Value::Undefined);
                        }
                        items[idx] = value.clone();
                        Ok(value)
                    }
                    Value::Object(fields) => {
                        fields.borrow_mut().insert(index.to_string(), value.clone());
                        Ok(value)
                    }
                    _ => Err(assignment_failed()),
                }
            }
            Expression::FieldAccess { object, field } => {
                let object = self.eval_expression(object)?;
                match object {
                    Value::Object(fields) => {
                        fields.borrow_mut().insert(field.clone(), value.clone());
                        Ok(value)
                    }
                    _ => Err(assignment_failed()),
                }
            }
            _ => Err(illegal_assignment()),
        }
    }

    fn read_index(&mut self, object: &Value, index: &Value) -> EvalResult {
        match object {
            Value::Array(items) => {
                let idx = to_number(index);
                if !idx.is_finite() || idx < 0.0 {
                    return Ok(Value::Undefined);
                }
                Ok(items
                    .borrow()
                    .get(idx as usize)
                    .cloned()
                    .unwrap_or(Value::Undefined))
            }
            Value::Object(fields) => Ok(fields
                .borrow()
                .get(&index.to_string())
                .cloned()
                .unwrap_or(Value::Undefined)),
            Value::String(s) => {
                let idx = to_number(index);
                if !idx.is_finite() || idx < 0.0 {
                    return Ok(Value::Undefined);
                }
                Ok(s.chars()
                    .nth(idx as usize)
                    .map(|c| Value::String(c.to_string()))
                    .unwrap_or(Value::Undefined))
            }
            Value::Undefined | Value::Null => Err(type_error(format!(
                "cannot read properties of {}",
                object
            ))),
            _ => Ok(Value::Undefined),
        }
    }

    fn read_field(&mut self, object: &Value, field: &str) -> EvalResult {
        match object {
            Value::Object(fields) => Ok(fields
                .borrow()
                .get(field)
                .cloned()
                .unwrap_or(Value::Undefined)),
            Value::Array(items) => match field {
                "length" => Ok(Value::Number(items.borrow().len() as f64)),
                _ => Ok(Value::Undefined),
            },
            Value::String(s) => match field {
                "length" => Ok(Value::Number(s.chars().count() as f64)),
                _ => Ok(Value::Undefined),
            },
            Value::Undefined | Value::Null => Err(type_error(format!(
                "cannot read properties of {}",
                object
            ))),
            _ => Ok(Value::Undefined),
        }
    }

    fn eval_arguments(&mut self, args: &[Expression]) -> Result<Vec<Value>, Unwind> {
        let mut out = Vec::with_capacity(args.len());
        for arg in args {
            out.push(self.eval_expression(arg)?);
        }
        Ok(out)
    }

    /// Invoke a callable value with an explicit `this`.
    pub fn call_value(&mut self, callee: &Value, this: Value, args: Vec<Value>) -> EvalResult {
        match callee {
            Value::Native(native) => (native.func)(&args).map_err(Unwind::Error),
            Value::Function(func) => {
                let closure = func
                    .payload
                    .clone()
                    .downcast::<Closure>()
                    .map_err(|_| type_error("corrupt function value"))?;
                self.call_closure(&closure, this, args)
            }
            _ => Err(type_error("value is not a function")),
        }
    }

    /// Invoke a closure: push it on the call stack, push the captured-scope
    /// frame and a parameter frame, bind arguments, evaluate the body, and
    /// convert a return unwind into the call's value.
    ///
    /// Both frames and the call-stack entry are popped on every exit path,
    /// including unwinds.
    pub fn call_closure(&mut self, closure: &Rc<Closure>, this: Value, args: Vec<Value>) -> EvalResult {
        self.push_stack(closure.clone());
        self.push_scope(Some(closure.captured_scope.clone()));
        self.push_scope(None);
        let saved_this = self.set_this(this);

        let mut result = self.bind_parameters(&closure.parameters, &args);
        if result.is_ok() {
            result = match closure.body.as_ref() {
                FunctionBody::Block(block) => self.evaluate(block),
                FunctionBody::Expression(expr) => self.eval_expression(expr),
            };
        }

        self.set_this(saved_this);
        self.pop_scope();
        self.pop_scope();
        self.pop_stack();

        match result {
            Err(Unwind::Return(value)) => Ok(value),
            other => other,
        }
    }

    fn bind_parameters(&mut self, parameters: &[Binding], args: &[Value]) -> EvalResult {
        for (index, parameter) in parameters.iter().enumerate() {
            let mut value = args.get(index).cloned().unwrap_or(Value::Undefined);
            // A missing argument takes the default, evaluated in the
            // parameter frame.
            if matches!(value, Value::Undefined) {
                if let Some(default) = &parameter.init {
                    value = self.eval_expression(default)?;
                }
            }
            self.bind_pattern(&parameter.pattern, value)?;
        }
        Ok(Value::Undefined)
    }

    /// Bind a value to a pattern in the innermost scope frame.
    pub fn bind_pattern(&mut self, pattern: &Pattern, value: Value) -> EvalResult {
        match pattern {
            Pattern::Identifier(name) => {
                self.declare_local(name, value);
                Ok(Value::Undefined)
            }
            Pattern::Array(elements) => {
                let items: Vec<Value> = match &value {
                    Value::Array(items) => items.borrow().clone(),
                    _ => Vec::new(),
                };
                // Only bound elements advance the source index; holes are
                // skipped without consuming a slot.
                let mut index = 0usize;
                for element in elements {
                    let Some(element) = element else {
                        continue;
                    };
                    if element.is_rest {
                        let rest: Vec<Value> = items.iter().skip(index).cloned().collect();
                        self.declare_local(&element.name, Value::array(rest));
                        continue;
                    }
                    let mut slot = items.get(index).cloned().unwrap_or(Value::Undefined);
                    index += 1;
                    if matches!(slot, Value::Undefined) {
                        if let Some(default) = &element.default {
                            slot = self.eval_expression(default)?;
                        }
                    }
                    self.declare_local(&element.name, slot);
                }
                Ok(Value::Undefined)
            }
            Pattern::Object(entries) => {
                let fields: HashMap<String, Value> = match &value {
                    Value::Object(fields) => fields.borrow().clone(),
                    _ => HashMap::new(),
                };
                let mut taken: Vec<&str> = Vec::new();
                for entry in entries {
                    if entry.is_rest {
                        let rest: HashMap<String, Value> = fields
                            .iter()
                            .filter(|(key, _)| !taken.contains(&key.as_str()))
                            .map(|(key, value)| (key.clone(), value.clone()))
                            .collect();
                        self.declare_local(&entry.name, Value::object(rest));
                        continue;
                    }
                    taken.push(&entry.name);
                    let mut slot = fields.get(&entry.name).cloned().unwrap_or(Value::Undefined);
                    if matches!(slot, Value::Undefined) {
                        if let Some(default) = &entry.default {
                            slot = self.eval_expression(default)?;
                        }
                    }
                    self.declare_local(&entry.name, slot);
                }
                Ok(Value::Undefined)
            }
        }
    }

    fn eval_html(
        &mut self,
        tag_name: Option<&str>,
        attributes: &[HtmlAttribute],
        children: &[Expression],
    ) -> EvalResult {
        // A tag bound to a callable in the scope chain is a component;
        // otherwise the tag name is used as a string.
        let tag = match tag_name {
            Some(name) => {
                let bound = self.get_local(name);
                if bound.is_callable() {
                    bound
                } else {
                    Value::String(name.to_string())
                }
            }
            None => Value::String(String::new()),
        };

        let mut evaluated_attributes = Vec::with_capacity(attributes.len());
        for attribute in attributes {
            let value = self.eval_expression(&attribute.value)?;
            evaluated_attributes.push((attribute.name.clone(), value));
        }

        let mut evaluated_children = Vec::with_capacity(children.len());
        for child in children {
            evaluated_children.push(self.eval_expression(child)?);
        }

        Ok(Value::Html(Rc::new(core_types::HtmlElement::new(
            tag,
            evaluated_attributes,
            evaluated_children,
        ))))
    }
}

/// Numeric coercion used by arithmetic, comparisons, and index access.
fn to_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => *n,
        Value::Boolean(true) => 1.0,
        Value::Boolean(false) => 0.0,
        Value::Null => 0.0,
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse::<f64>().unwrap_or(f64::NAN)
            }
        }
        _ => f64::NAN,
    }
}

/// Loose equality pinned to primitive abstract equality: `null` equals
/// `undefined`, numbers and strings compare numerically, booleans coerce to
/// numbers, and everything else falls back to strict equality.
fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Undefined) | (Value::Undefined, Value::Null) => true,
        (Value::Number(n), Value::String(_)) => *n == to_number(right),
        (Value::String(_), Value::Number(n)) => to_number(left) == *n,
        (Value::Boolean(b), other) if !matches!(other, Value::Boolean(_)) => {
            loose_eq(&Value::Number(if *b { 1.0 } else { 0.0 }), other)
        }
        (other, Value::Boolean(b)) if !matches!(other, Value::Boolean(_)) => {
            loose_eq(other, &Value::Number(if *b { 1.0 } else { 0.0 }))
        }
        _ => left == right,
    }
}

fn apply_binary(op: BinaryOp, left: &Value, right: &Value) -> Value {
    match op {
        BinaryOp::Add => {
            // `+` concatenates when either side is a string.
            if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) {
                Value::String(format!("{}{}", left, right))
            } else {
                Value::Number(to_number(left) + to_number(right))
            }
        }
        BinaryOp::Sub => Value::Number(to_number(left) - to_number(right)),
        BinaryOp::Mul => Value::Number(to_number(left) * to_number(right)),
        BinaryOp::Div => Value::Number(to_number(left) / to_number(right)),
        BinaryOp::StrictEq => Value::Boolean(left == right),
        BinaryOp::StrictNotEq => Value::Boolean(left != right),
        BinaryOp::Eq => Value::Boolean(loose_eq(left, right)),
        BinaryOp::NotEq => Value::Boolean(!loose_eq(left, right)),
        BinaryOp::Gt | BinaryOp::GtEq | BinaryOp::Lt | BinaryOp::LtEq => {
            let result = match (left, right) {
                (Value::String(a), Value::String(b)) => match op {
                    BinaryOp::Gt => a > b,
                    BinaryOp::GtEq => a >= b,
                    BinaryOp::Lt => a < b,
                    _ => a <= b,
                },
                _ => {
                    let a = to_number(left);
                    let b = to_number(right);
                    match op {
                        BinaryOp::Gt => a > b,
                        BinaryOp::GtEq => a >= b,
                        BinaryOp::Lt => a < b,
                        _ => a <= b,
                    }
                }
            };
            Value::Boolean(result)
        }
        // Short-circuit operators are handled before operand evaluation.
        BinaryOp::And | BinaryOp::Or => Value::Undefined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(source: &str) -> Value {
        let program = Parser::new(source).parse().unwrap();
        Runtime::new().run_program(&program).unwrap()
    }

    fn run_err(source: &str) -> EcoError {
        let program = Parser::new(source).parse().unwrap();
        Runtime::new().run_program(&program).unwrap_err()
    }

    #[test]
    fn test_arithmetic_precedence() {
        assert_eq!(run("const x = 1 + 2 * 3; return x;"), Value::Number(7.0));
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(
            run("return 'a' + 1;"),
            Value::String("a1".to_string())
        );
    }

    #[test]
    fn test_short_circuit_yields_operand() {
        assert_eq!(run("return 0 || 'fallback';"), Value::String("fallback".to_string()));
        assert_eq!(run("return 0 && boom();"), Value::Number(0.0));
        assert_eq!(run("return 1 && 2;"), Value::Number(2.0));
    }

    #[test]
    fn test_strict_vs_loose_equality() {
        assert_eq!(run("return 1 == '1';"), Value::Boolean(true));
        assert_eq!(run("return 1 === '1';"), Value::Boolean(false));
        assert_eq!(run("return null == undefined;"), Value::Boolean(true));
        assert_eq!(run("return null === undefined;"), Value::Boolean(false));
        assert_eq!(run("return true == 1;"), Value::Boolean(true));
    }

    #[test]
    fn test_ternary() {
        assert_eq!(run("return 2 > 1 ? 'yes' : 'no';"), Value::String("yes".to_string()));
    }

    #[test]
    fn test_while_loop_with_compound_assignment() {
        assert_eq!(
            run("let i = 0; let total = 0; while (i < 5) { total += i; i += 1; } return total;"),
            Value::Number(10.0)
        );
    }

    #[test]
    fn test_prefix_and_postfix_increment() {
        assert_eq!(run("let i = 1; return i++;"), Value::Number(1.0));
        assert_eq!(run("let i = 1; i++; return i;"), Value::Number(2.0));
        assert_eq!(run("let i = 1; return ++i;"), Value::Number(2.0));
    }

    #[test]
    fn test_illegal_increment_target() {
        let err = run_err("return (1 + 2)++;");
        assert!(err.message.contains("illegal assignment"));
    }

    #[test]
    fn test_array_literal_and_access() {
        assert_eq!(run("const a = [1, 2, 3]; return a[1];"), Value::Number(2.0));
        assert_eq!(run("const a = [1, 2, 3]; return a.length;"), Value::Number(3.0));
    }

    #[test]
    fn test_array_spread_flattens() {
        assert_eq!(
            run("const a = [2, 3]; const b = [1, ...a, 4]; return b.length;"),
            Value::Number(4.0)
        );
    }

    #[test]
    fn test_object_literal_forms() {
        assert_eq!(
            run("const b = 2; const k = 'c'; const o = { a: 1, b, [k]: 3 }; return o.a + o.b;"),
            Value::Number(3.0)
        );
        assert_eq!(
            run("const k = 'c'; const o = { [k]: 3 }; return o.c;"),
            Value::Number(3.0)
        );
    }

    #[test]
    fn test_object_spread_merges() {
        assert_eq!(
            run("const o = { a: 1 }; const p = { ...o, b: 2 }; return p.a + p.b;"),
            Value::Number(3.0)
        );
    }

    #[test]
    fn test_member_assignment() {
        assert_eq!(
            run("const o = { a: 1 }; o.a = 5; o['b'] = 2; return o.a + o.b;"),
            Value::Number(7.0)
        );
        assert_eq!(
            run("const a = [1]; a[2] = 9; return a.length;"),
            Value::Number(3.0)
        );
    }

    #[test]
    fn test_unbound_write_is_dropped() {
        // Assignments to undeclared names are silently ignored.
        assert_eq!(run("ghost = 1; return typeof ghost;"), Value::String("undefined".to_string()));
    }

    #[test]
    fn test_function_call_and_defaults() {
        assert_eq!(
            run("const f = (x, y = 10) => x + y; return f(5);"),
            Value::Number(15.0)
        );
        assert_eq!(
            run("const f = (x, y = 10) => x + y; return f(5, 1);"),
            Value::Number(6.0)
        );
    }

    #[test]
    fn test_recursion() {
        assert_eq!(
            run("const g = n => n <= 1 ? 1 : n * g(n - 1); return g(5);"),
            Value::Number(120.0)
        );
    }

    #[test]
    fn test_closure_captures_snapshot() {
        assert_eq!(
            run("const make = n => () => n; const f = make(7); return f();"),
            Value::Number(7.0)
        );
    }

    #[test]
    fn test_block_body_requires_return() {
        assert_eq!(
            run("const f = x => { const y = x * 2; return y + 1; }; return f(3);"),
            Value::Number(7.0)
        );
        assert_eq!(
            run("const f = x => { const y = x * 2; }; return f(3);"),
            Value::Undefined
        );
    }

    #[test]
    fn test_destructuring_declaration() {
        // Holes do not consume a source slot, so the rest starts right
        // after the last bound element.
        assert_eq!(
            run("const [a, , ...b] = [1, 2, 3, 4]; return a + b.length;"),
            Value::Number(4.0)
        );
        assert_eq!(
            run("const { a, b = 5 } = { a: 1 }; return a + b;"),
            Value::Number(6.0)
        );
    }

    #[test]
    fn test_object_rest_excludes_taken() {
        assert_eq!(
            run("const { a, ...rest } = { a: 1, b: 2, c: 3 }; return rest.a;"),
            Value::Undefined
        );
        assert_eq!(
            run("const { a, ...rest } = { a: 1, b: 2, c: 3 }; return rest.b + rest.c;"),
            Value::Number(5.0)
        );
    }

    #[test]
    fn test_destructuring_parameters() {
        assert_eq!(
            run("const f = ([a, b]) => a + b; return f([1, 2]);"),
            Value::Number(3.0)
        );
        assert_eq!(
            run("const f = ({ x, y = 2 }) => x + y; return f({ x: 1 });"),
            Value::Number(3.0)
        );
    }

    #[test]
    fn test_try_catch_finally_order() {
        assert_eq!(
            run("let r = ''; try { throw 'oops'; } catch (e) { r = e; } finally { r = r + '!'; } return r;"),
            Value::String("oops!".to_string())
        );
    }

    #[test]
    fn test_catch_binding_scoped_to_handler() {
        assert_eq!(
            run("try { throw 1; } catch (e) { } return typeof e;"),
            Value::String("undefined".to_string())
        );
    }

    #[test]
    fn test_return_not_catchable() {
        assert_eq!(
            run("const f = () => { try { return 1; } catch (e) { return 2; } }; return f();"),
            Value::Number(1.0)
        );
    }

    #[test]
    fn test_finally_runs_on_return_path() {
        assert_eq!(
            run("let r = 0; const f = () => { try { return 1; } catch (e) { } finally { r = 9; } }; f(); return r;"),
            Value::Number(9.0)
        );
    }

    #[test]
    fn test_engine_error_caught_as_message() {
        assert_eq!(
            run("let r = ''; try { const x = null; x.y; } catch (e) { r = e; } return r;"),
            Value::String("cannot read properties of null".to_string())
        );
    }

    #[test]
    fn test_uncaught_throw_surfaces() {
        let err = run_err("throw 'boom';");
        assert!(err.message.contains("uncaught exception: boom"));
    }

    #[test]
    fn test_string_interpolation() {
        assert_eq!(
            run("const s = 'hi #{1+2}'; return s;"),
            Value::String("hi 3".to_string())
        );
        assert_eq!(
            run("const n = 4; const s = 'n is #{n} ok'; return s;"),
            Value::String("n is 4 ok".to_string())
        );
    }

    #[test]
    fn test_template_string_concatenates() {
        assert_eq!(
            run("const x = 2; return `one ${x} three`;"),
            Value::String("one 2 three".to_string())
        );
    }

    #[test]
    fn test_typeof() {
        assert_eq!(run("return typeof 1;"), Value::String("number".to_string()));
        assert_eq!(run("return typeof 'x';"), Value::String("string".to_string()));
        assert_eq!(
            run("const f = x => x; return typeof f;"),
            Value::String("function".to_string())
        );
        assert_eq!(run("return typeof null;"), Value::String("object".to_string()));
    }

    #[test]
    fn test_html_element_evaluation() {
        let value = run("return <div id=\"main\">hi</div>;");
        let Value::Html(element) = value else {
            panic!("expected html element");
        };
        assert_eq!(element.tag, Value::String("div".to_string()));
        assert_eq!(element.attributes.len(), 1);
        assert_eq!(element.children.len(), 1);
    }

    #[test]
    fn test_html_component_lookup() {
        let value = run("const Card = props => props; return <Card title={1}/>;");
        let Value::Html(element) = value else {
            panic!("expected html element");
        };
        assert!(element.tag.is_callable());
    }

    #[test]
    fn test_scope_depth_balanced_after_calls() {
        let program = Parser::new(
            "const f = n => n <= 0 ? 0 : f(n - 1); f(3); try { throw 1; } catch (e) { f(1); }",
        )
        .parse()
        .unwrap();
        let mut runtime = Runtime::new();
        let scope_depth = runtime.scope_depth();
        let stack_depth = runtime.stack_depth();
        runtime.run_program(&program).unwrap();
        assert_eq!(runtime.scope_depth(), scope_depth);
        assert_eq!(runtime.stack_depth(), stack_depth);
    }

    #[test]
    fn test_method_call_receives_this() {
        // `this` is observable through natives installed by the host; here
        // we only check that calling a missing method errors.
        let err = run_err("const o = { a: 1 }; return o.missing();");
        assert!(err.message.contains("is not a function"));
    }

    #[test]
    fn test_var_decl_names_function() {
        assert_eq!(
            run("const f = x => x; return '' + f;"),
            Value::String("[function f]".to_string())
        );
    }
}
