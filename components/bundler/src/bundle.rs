//! The module-graph walker.
//!
//! Modules are keyed by canonical name. A placeholder entry is inserted
//! before recursing into a module's imports, so dependency cycles terminate
//! and each module is emitted exactly once, in first-visit order.

use crate::emit;
use crate::resolver::ModuleResolver;
use core_types::{EcoError, ErrorKind};
use parser::ast::{ExportDecl, ImportDecl, Statement};
use parser::Parser;
use std::collections::HashMap;

/// Per-module bundling state.
struct BundlerContext {
    current_dir: String,
    /// Exported name paired with the local expression that produces it
    named_exports: Vec<(String, String)>,
    default_export: Option<String>,
    has_imports: bool,
}

impl BundlerContext {
    fn new(current_dir: String) -> Self {
        Self {
            current_dir,
            named_exports: Vec::new(),
            default_export: None,
            has_imports: false,
        }
    }
}

/// A fully emitted module.
struct EmittedModule {
    body: String,
    has_imports: bool,
    /// Names this module exports; used to expand `export *`
    export_names: Vec<String>,
}

/// Walks a module graph and emits a single self-contained script.
pub struct Bundler<'a> {
    resolver: &'a mut dyn ModuleResolver,
    /// First-visit order; also the emission order
    order: Vec<String>,
    /// `None` marks a module currently being bundled (cycle placeholder)
    modules: HashMap<String, Option<EmittedModule>>,
    context_stack: Vec<BundlerContext>,
    import_counter: usize,
}

impl<'a> Bundler<'a> {
    /// Create a bundler over the given resolver.
    pub fn new(resolver: &'a mut dyn ModuleResolver) -> Self {
        Self {
            resolver,
            order: Vec::new(),
            modules: HashMap::new(),
            context_stack: Vec::new(),
            import_counter: 0,
        }
    }

    /// Bundle the module graph rooted at `file_name`, returning the wrapped
    /// script.
    pub fn bundle(&mut self, current_dir: &str, file_name: &str) -> Result<String, EcoError> {
        let entry = self.bundle_module(current_dir, file_name)?;
        Ok(self.assemble(&entry))
    }

    /// Bundle one module, returning its canonical name. Already-known
    /// modules (including in-progress placeholders) are returned as-is.
    fn bundle_module(&mut self, current_dir: &str, name: &str) -> Result<String, EcoError> {
        let resolved = self.resolver.resolve_filename(current_dir, name)?;
        let canonical = resolved.canonical_name;
        if self.modules.contains_key(&canonical) {
            return Ok(canonical);
        }

        // Tentative insertion before recursion breaks import cycles.
        self.modules.insert(canonical.clone(), None);
        self.order.push(canonical.clone());

        let source = self.resolver.resolve_import(&canonical)?;
        let program = Parser::new(&source).parse()?;

        self.context_stack
            .push(BundlerContext::new(resolved.new_current_dir));
        let mut body = String::new();
        for statement in &program {
            let text = match self.emit_statement(statement) {
                Ok(text) => text,
                Err(err) => {
                    self.context_stack.pop();
                    return Err(err);
                }
            };
            if !text.is_empty() {
                body.push_str(&text);
                body.push('\n');
            }
        }
        let context = self
            .context_stack
            .pop()
            .expect("context stack is balanced");

        let mut export_names = Vec::new();
        if let Some(default) = &context.default_export {
            body.push_str(&format!("module.exports = {};\n", default));
        } else if !context.named_exports.is_empty() {
            let entries: Vec<String> = context
                .named_exports
                .iter()
                .map(|(name, local)| {
                    if name == local {
                        name.clone()
                    } else {
                        format!("{}: {}", name, local)
                    }
                })
                .collect();
            body.push_str(&format!("module.exports = {{ {} }};\n", entries.join(", ")));
            export_names = context
                .named_exports
                .iter()
                .map(|(name, _)| name.clone())
                .collect();
        }

        self.modules.insert(
            canonical.clone(),
            Some(EmittedModule {
                body,
                has_imports: context.has_imports,
                export_names,
            }),
        );
        Ok(canonical)
    }

    fn emit_statement(&mut self, statement: &Statement) -> Result<String, EcoError> {
        match statement {
            Statement::Import(decl) => self.emit_import(decl),
            Statement::Export(decl) => self.emit_export(decl),
            other => Ok(emit::statement_source(other)),
        }
    }

    fn current_dir(&self) -> String {
        self.context_stack
            .last()
            .map(|context| context.current_dir.clone())
            .unwrap_or_default()
    }

    fn mark_has_imports(&mut self) {
        if let Some(context) = self.context_stack.last_mut() {
            context.has_imports = true;
        }
    }

    fn fresh_import_name(&mut self) -> String {
        let name = format!("__eco_import_{}", self.import_counter);
        self.import_counter += 1;
        name
    }

    fn emit_import(&mut self, decl: &ImportDecl) -> Result<String, EcoError> {
        let dir = self.current_dir();
        let canonical = self.bundle_module(&dir, &decl.from_file)?;
        self.mark_has_imports();

        if let Some(name) = &decl.default_name {
            return Ok(format!("const {} = __eco_require__('{}');", name, canonical));
        }
        if let Some(name) = &decl.namespace_name {
            return Ok(format!("const {} = __eco_require__('{}');", name, canonical));
        }
        if let Some(named) = &decl.named {
            let temp = self.fresh_import_name();
            let mut out = format!("const {} = __eco_require__('{}');", temp, canonical);
            for binding in named {
                let local = binding.alias.as_ref().unwrap_or(&binding.name);
                out.push_str(&format!("\nconst {} = {}.{};", local, temp, binding.name));
            }
            return Ok(out);
        }
        // Bare import: evaluated for effect only.
        Ok(format!("__eco_require__('{}');", canonical))
    }

    fn emit_export(&mut self, decl: &ExportDecl) -> Result<String, EcoError> {
        match decl {
            ExportDecl::Default(value) => {
                let source = emit::expression_source(value);
                if let Some(context) = self.context_stack.last_mut() {
                    context.default_export = Some(source);
                }
                Ok(String::new())
            }

            ExportDecl::VarDecl { is_const, binding } => {
                let names = emit::pattern_names(&binding.pattern);
                if let Some(context) = self.context_stack.last_mut() {
                    for name in names {
                        context.named_exports.push((name.clone(), name));
                    }
                }
                Ok(emit::var_decl_source(*is_const, binding))
            }

            ExportDecl::Reexport { file, all, named } => {
                let dir = self.current_dir();
                let canonical = self.bundle_module(&dir, file)?;
                self.mark_has_imports();
                let temp = self.fresh_import_name();
                let out = format!("const {} = __eco_require__('{}');", temp, canonical);

                if *all {
                    let export_names = match self.modules.get(&canonical) {
                        Some(Some(module)) => module.export_names.clone(),
                        _ => {
                            return Err(EcoError::new(
                                ErrorKind::ModuleError,
                                format!(
                                    "cannot re-export all from '{}' inside a dependency cycle",
                                    canonical
                                ),
                            ))
                        }
                    };
                    if let Some(context) = self.context_stack.last_mut() {
                        for name in export_names {
                            let local = format!("{}.{}", temp, name);
                            context.named_exports.push((name, local));
                        }
                    }
                } else if let Some(context) = self.context_stack.last_mut() {
                    for binding in named {
                        let exported = binding.alias.as_ref().unwrap_or(&binding.name).clone();
                        // The default of a module *is* its exports value.
                        let local = if binding.name == "default" {
                            temp.clone()
                        } else {
                            format!("{}.{}", temp, binding.name)
                        };
                        context.named_exports.push((exported, local));
                    }
                }
                Ok(out)
            }
        }
    }

    /// Emit the skeleton: an immediately-invoked module table with a
    /// CommonJS-style cache, written in the eco subset itself.
    fn assemble(&self, entry: &str) -> String {
        let mut out = String::new();
        out.push_str("((modules) => {\n");
        out.push_str("const cached = {};\n");
        out.push_str("const require = (id) => {\n");
        out.push_str("if (cached[id]) {\nreturn cached[id].exports;\n}\n");
        out.push_str("const module = { exports: {} };\n");
        out.push_str("cached[id] = module;\n");
        out.push_str("modules[id](module, require);\n");
        out.push_str("return module.exports;\n");
        out.push_str("};\n");
        out.push_str(&format!("return require('{}');\n", entry));
        out.push_str("})({\n");
        for name in &self.order {
            let module = self.modules[name]
                .as_ref()
                .expect("all modules emitted before assembly");
            let params = if module.has_imports {
                "(module, __eco_require__)"
            } else {
                "(module)"
            };
            out.push_str(&format!("'{}': {} => {{\n{}}},\n", name, params, module.body));
        }
        out.push_str("});\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::MemoryResolver;

    #[test]
    fn test_single_module_bundle() {
        let mut resolver = MemoryResolver::new();
        resolver.add("main.eco", "export default 1 + 1;");
        let mut bundler = Bundler::new(&mut resolver);
        let script = bundler.bundle("", "./main").unwrap();
        assert!(script.contains("module.exports = 1 + 1;"));
        assert!(script.contains("return require('main.eco');"));
        // No imports, so the module only takes the module parameter.
        assert!(script.contains("'main.eco': (module) =>"));
    }

    #[test]
    fn test_import_rewrites_to_require() {
        let mut resolver = MemoryResolver::new();
        resolver.add("a.eco", "import x from './b'; export default x + 1;");
        resolver.add("b.eco", "export default 41;");
        let mut bundler = Bundler::new(&mut resolver);
        let script = bundler.bundle("", "./a").unwrap();
        assert!(script.contains("const x = __eco_require__('b.eco');"));
        assert!(script.contains("'a.eco': (module, __eco_require__) =>"));
    }

    #[test]
    fn test_named_imports_rebind() {
        let mut resolver = MemoryResolver::new();
        resolver.add("a.eco", "import { one, two as dva } from './b'; export default one + dva;");
        resolver.add("b.eco", "export const one = 1; export const two = 2;");
        let mut bundler = Bundler::new(&mut resolver);
        let script = bundler.bundle("", "./a").unwrap();
        assert!(script.contains("const one = __eco_import_0.one;"));
        assert!(script.contains("const dva = __eco_import_0.two;"));
        assert!(script.contains("module.exports = { one, two };"));
    }

    #[test]
    fn test_each_module_emitted_once() {
        let mut resolver = MemoryResolver::new();
        resolver.add("a.eco", "import b from './b'; import c from './c'; export default b + c;");
        resolver.add("b.eco", "import c from './c'; export default c;");
        resolver.add("c.eco", "export default 1;");
        let mut bundler = Bundler::new(&mut resolver);
        let script = bundler.bundle("", "./a").unwrap();
        assert_eq!(script.matches("'c.eco':").count(), 1);
    }

    #[test]
    fn test_cycle_terminates() {
        let mut resolver = MemoryResolver::new();
        resolver.add("a.eco", "import b from './b'; export default 1;");
        resolver.add("b.eco", "import a from './a'; export default 2;");
        let mut bundler = Bundler::new(&mut resolver);
        let script = bundler.bundle("", "./a").unwrap();
        assert_eq!(script.matches("'a.eco':").count(), 1);
        assert_eq!(script.matches("'b.eco':").count(), 1);
    }

    #[test]
    fn test_reexport_all() {
        let mut resolver = MemoryResolver::new();
        resolver.add("a.eco", "export * from './b';");
        resolver.add("b.eco", "export const x = 1; export const y = 2;");
        let mut bundler = Bundler::new(&mut resolver);
        let script = bundler.bundle("", "./a").unwrap();
        assert!(script.contains("x: __eco_import_0.x"));
        assert!(script.contains("y: __eco_import_0.y"));
    }

    #[test]
    fn test_reexport_default_as_named() {
        let mut resolver = MemoryResolver::new();
        resolver.add("a.eco", "export { default as answer } from './b';");
        resolver.add("b.eco", "export default 42;");
        let mut bundler = Bundler::new(&mut resolver);
        let script = bundler.bundle("", "./a").unwrap();
        assert!(script.contains("answer: __eco_import_0"));
    }

    #[test]
    fn test_missing_module_error() {
        let mut resolver = MemoryResolver::new();
        resolver.add("a.eco", "import x from './nope'; export default x;");
        let mut bundler = Bundler::new(&mut resolver);
        let err = bundler.bundle("", "./a").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::ModuleError));
    }
}
