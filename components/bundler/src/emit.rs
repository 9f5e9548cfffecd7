//! Source emission: renders AST nodes back into eco source text.
//!
//! Imports and exports are rewritten by the bundler itself and never reach
//! these functions; everything else round-trips through the parser.

use parser::ast::*;

/// Render a statement as source text.
///
/// Import and export statements are handled by the bundler's module walker
/// and emit nothing here.
pub fn statement_source(statement: &Statement) -> String {
    match statement {
        Statement::Noop => ";".to_string(),

        Statement::VarDecl { is_const, binding } => var_decl_source(*is_const, binding),

        Statement::Block(statements) => {
            let mut out = String::from("{\n");
            for statement in statements {
                out.push_str(&statement_source(statement));
                out.push('\n');
            }
            out.push('}');
            out
        }

        Statement::If {
            cond,
            then_branch,
            else_branch,
        } => {
            let mut out = format!(
                "if ({}) {}",
                expression_source(cond),
                statement_source(then_branch)
            );
            if let Some(else_branch) = else_branch {
                out.push_str(&format!(" else {}", statement_source(else_branch)));
            }
            out
        }

        Statement::While { cond, body } => format!(
            "while ({}) {}",
            expression_source(cond),
            statement_source(body)
        ),

        Statement::Return { value } => match value {
            Some(value) => format!("return {};", expression_source(value)),
            None => "return;".to_string(),
        },

        Statement::Throw { value } => format!("throw {};", expression_source(value)),

        Statement::TryCatch {
            try_block,
            catch_block,
            catch_name,
            finally_block,
        } => {
            let mut out = format!("try {} catch", statement_source(try_block));
            if let Some(name) = catch_name {
                out.push_str(&format!(" ({})", name));
            }
            out.push_str(&format!(" {}", statement_source(catch_block)));
            if let Some(finally_block) = finally_block {
                out.push_str(&format!(" finally {}", statement_source(finally_block)));
            }
            out
        }

        Statement::Import(_) | Statement::Export(_) => String::new(),

        Statement::Expression(expr) => format!("{};", expression_source(expr)),
    }
}

/// Render a variable declaration.
pub fn var_decl_source(is_const: bool, binding: &Binding) -> String {
    let keyword = if is_const { "const" } else { "let" };
    format!("{} {};", keyword, binding_source(binding))
}

fn binding_source(binding: &Binding) -> String {
    match &binding.init {
        Some(init) => format!(
            "{} = {}",
            pattern_source(&binding.pattern),
            expression_source(init)
        ),
        None => pattern_source(&binding.pattern),
    }
}

fn pattern_source(pattern: &Pattern) -> String {
    match pattern {
        Pattern::Identifier(name) => name.clone(),
        Pattern::Array(elements) => {
            let rendered: Vec<String> = elements
                .iter()
                .map(|element| match element {
                    Some(value) => destructured_value_source(value),
                    None => String::new(),
                })
                .collect();
            format!("[{}]", rendered.join(", "))
        }
        Pattern::Object(entries) => {
            let rendered: Vec<String> = entries.iter().map(destructured_value_source).collect();
            format!("{{ {} }}", rendered.join(", "))
        }
    }
}

fn destructured_value_source(value: &DestructuredValue) -> String {
    if value.is_rest {
        return format!("...{}", value.name);
    }
    match &value.default {
        Some(default) => format!("{} = {}", value.name, expression_source(default)),
        None => value.name.clone(),
    }
}

/// Names bound by a pattern, in source order.
pub fn pattern_names(pattern: &Pattern) -> Vec<String> {
    match pattern {
        Pattern::Identifier(name) => vec![name.clone()],
        Pattern::Array(elements) => elements
            .iter()
            .flatten()
            .map(|value| value.name.clone())
            .collect(),
        Pattern::Object(entries) => entries.iter().map(|value| value.name.clone()).collect(),
    }
}

/// Render an expression as source text.
pub fn expression_source(expression: &Expression) -> String {
    match expression {
        Expression::Literal(literal) => literal_source(literal),

        Expression::Load { name } => name.clone(),

        Expression::Parens(inner) => format!("({})", expression_source(inner)),

        Expression::Spread(inner) => format!("...{}", expression_source(inner)),

        Expression::Array(elements) => {
            let rendered: Vec<String> = elements.iter().map(expression_source).collect();
            format!("[{}]", rendered.join(", "))
        }

        Expression::Object(fields) => {
            if fields.is_empty() {
                return "{}".to_string();
            }
            let rendered: Vec<String> = fields.iter().map(object_property_source).collect();
            format!("{{ {} }}", rendered.join(", "))
        }

        Expression::Function { parameters, body } => {
            let params: Vec<String> = parameters.iter().map(binding_source).collect();
            let body = match body {
                FunctionBody::Block(block) => statement_source(block),
                FunctionBody::Expression(expr) => expression_source(expr),
            };
            format!("({}) => {}", params.join(", "), body)
        }

        Expression::Unary { op, expr } => {
            let op = match op {
                UnaryOp::Not => "!",
                UnaryOp::Neg => "-",
            };
            format!("{}{}", op, expression_source(expr))
        }

        Expression::IncOrDec {
            is_prefix,
            op,
            expr,
        } => {
            let op = match op {
                IncDecOp::Increment => "++",
                IncDecOp::Decrement => "--",
            };
            if *is_prefix {
                format!("{}{}", op, expression_source(expr))
            } else {
                format!("{}{}", expression_source(expr), op)
            }
        }

        Expression::Binary { left, op, right } => format!(
            "{} {} {}",
            expression_source(left),
            binary_op_source(*op),
            expression_source(right)
        ),

        Expression::Assignment { target, op, value } => {
            let op = match op {
                AssignOp::Assign => "=",
                AssignOp::AddAssign => "+=",
                AssignOp::SubAssign => "-=",
                AssignOp::MulAssign => "*=",
                AssignOp::DivAssign => "/=",
            };
            format!(
                "{} {} {}",
                expression_source(target),
                op,
                expression_source(value)
            )
        }

        Expression::Ternary {
            cond,
            then_branch,
            else_branch,
        } => format!(
            "{} ? {} : {}",
            expression_source(cond),
            expression_source(then_branch),
            expression_source(else_branch)
        ),

        Expression::ArrayAccess { object, index } => format!(
            "{}[{}]",
            expression_source(object),
            expression_source(index)
        ),

        Expression::FieldAccess { object, field } => {
            format!("{}.{}", expression_source(object), field)
        }

        Expression::FuncCall { callee, args } => {
            format!("{}({})", expression_source(callee), arguments_source(args))
        }

        Expression::MethodCall {
            object,
            field_name,
            args,
        } => format!(
            "{}.{}({})",
            expression_source(object),
            field_name,
            arguments_source(args)
        ),

        Expression::New { class_name, args } => {
            format!("new {}({})", class_name, arguments_source(args))
        }

        Expression::Typeof(expr) => format!("typeof {}", expression_source(expr)),

        Expression::Html {
            tag_name,
            attributes,
            children,
        } => html_source(tag_name.as_deref(), attributes, children),

        Expression::HtmlExpr(inner) => format!("{{{}}}", expression_source(inner)),

        Expression::HtmlText(text) => text.clone(),

        Expression::TemplateString(parts) => {
            let mut out = String::from("`");
            for part in parts {
                match part {
                    Expression::TemplateStringContent(text) => out.push_str(text),
                    other => out.push_str(&format!("${{{}}}", expression_source(other))),
                }
            }
            out.push('`');
            out
        }

        Expression::TemplateStringContent(text) => text.clone(),
    }
}

fn arguments_source(args: &[Expression]) -> String {
    let rendered: Vec<String> = args.iter().map(expression_source).collect();
    rendered.join(", ")
}

fn object_property_source(property: &ObjectProperty) -> String {
    match property {
        ObjectProperty::Regular { key, value } => match value {
            Some(value) => format!("{}: {}", key_source(key), expression_source(value)),
            None => key.clone(),
        },
        ObjectProperty::Dynamic { key, value } => format!(
            "[{}]: {}",
            expression_source(key),
            expression_source(value)
        ),
        ObjectProperty::Spread(value) => format!("...{}", expression_source(value)),
    }
}

fn key_source(key: &str) -> String {
    let plain = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !key.chars().next().unwrap().is_ascii_digit();
    if plain {
        key.to_string()
    } else {
        format!("'{}'", key)
    }
}

fn literal_source(literal: &Literal) -> String {
    match literal {
        Literal::Number(n) => number_source(*n),
        Literal::Str(s) => format!("'{}'", s),
        Literal::Boolean(b) => b.to_string(),
        Literal::Null => "null".to_string(),
        Literal::Undefined => "undefined".to_string(),
    }
}

/// Integer-valued numbers print without a decimal point.
pub fn number_source(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

fn binary_op_source(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::And => "&&",
        BinaryOp::Or => "||",
        BinaryOp::StrictEq => "===",
        BinaryOp::StrictNotEq => "!==",
        BinaryOp::Eq => "==",
        BinaryOp::NotEq => "!=",
        BinaryOp::Gt => ">",
        BinaryOp::GtEq => ">=",
        BinaryOp::Lt => "<",
        BinaryOp::LtEq => "<=",
    }
}

fn html_source(
    tag_name: Option<&str>,
    attributes: &[HtmlAttribute],
    children: &[Expression],
) -> String {
    let name = tag_name.unwrap_or("");
    let mut out = format!("<{}", name);
    for attribute in attributes {
        match &attribute.value {
            // A bare attribute carries the literal true.
            Expression::Literal(Literal::Boolean(true)) => {
                out.push_str(&format!(" {}", attribute.name));
            }
            Expression::Literal(Literal::Str(s)) => {
                out.push_str(&format!(" {}=\"{}\"", attribute.name, s));
            }
            other => {
                out.push_str(&format!(" {}={{{}}}", attribute.name, expression_source(other)));
            }
        }
    }
    if children.is_empty() && tag_name.is_some() {
        out.push_str("/>");
        return out;
    }
    out.push('>');
    for child in children {
        out.push_str(&expression_source(child));
    }
    out.push_str(&format!("</{}>", name));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use parser::Parser;

    fn roundtrip(source: &str) -> String {
        let program = Parser::new(source).parse().unwrap();
        program
            .iter()
            .map(statement_source)
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_emit_var_decl() {
        assert_eq!(roundtrip("const x = 1 + 2 * 3;"), "const x = 1 + 2 * 3;");
    }

    #[test]
    fn test_emit_preserves_parens() {
        assert_eq!(roundtrip("const x = (a + b) + c;"), "const x = (a + b) + c;");
    }

    #[test]
    fn test_emit_arrow_function() {
        assert_eq!(
            roundtrip("const f = (x, y = 10) => x + y;"),
            "const f = (x, y = 10) => x + y;"
        );
    }

    #[test]
    fn test_emit_destructuring() {
        assert_eq!(
            roundtrip("const [a, , ...b] = list;"),
            "const [a, , ...b] = list;"
        );
        assert_eq!(
            roundtrip("const { a, b = 2, ...rest } = obj;"),
            "const { a, b = 2, ...rest } = obj;"
        );
    }

    #[test]
    fn test_emit_object_literal() {
        assert_eq!(
            roundtrip("const o = { a: 1, b, [k]: 2, ...rest };"),
            "const o = { a: 1, b, [k]: 2, ...rest };"
        );
    }

    #[test]
    fn test_emit_template_string() {
        assert_eq!(roundtrip("const s = `a ${x} b`;"), "const s = `a ${x} b`;");
    }

    #[test]
    fn test_emit_html() {
        assert_eq!(
            roundtrip("const el = <div id=\"main\" hidden>{x}</div>;"),
            "const el = <div id=\"main\" hidden>{x}</div>;"
        );
        assert_eq!(roundtrip("const el = <br/>;"), "const el = <br/>;");
    }

    #[test]
    fn test_emitted_source_reparses() {
        let sources = [
            "const f = n => n <= 1 ? 1 : n * g(n - 1);",
            "try { throw 'x'; } catch (e) { } finally { }",
            "while (i < 10) { i += 1; }",
            "if (a) { b(); } else { c(); }",
            "const el = <ul>{items}</ul>;",
        ];
        for source in sources {
            let emitted = roundtrip(source);
            let reparsed = Parser::new(&emitted).parse().unwrap();
            let second = reparsed
                .iter()
                .map(statement_source)
                .collect::<Vec<_>>()
                .join("\n");
            assert_eq!(emitted, second, "unstable emission for {}", source);
        }
    }
}
