//! Host globals and the default filesystem module resolver.

use bundler::{ModuleResolver, ResolvedModule};
use core_types::{EcoError, ErrorKind, NativeFunction, Value};
use std::path::{Component, Path, PathBuf};
use std::rc::Rc;

fn native(name: &str, func: impl Fn(&[Value]) -> Result<Value, EcoError> + 'static) -> Value {
    Value::Native(NativeFunction {
        name: name.to_string(),
        func: Rc::new(func),
    })
}

/// Install the host global record: `print` and `len`.
pub fn install(runtime: &mut interpreter::Runtime) {
    runtime.set_global(
        "print",
        native("print", |args| {
            let rendered: Vec<String> = args.iter().map(|value| value.to_string()).collect();
            println!("{}", rendered.join(" "));
            Ok(Value::Undefined)
        }),
    );

    runtime.set_global(
        "len",
        native("len", |args| match args.first() {
            Some(Value::Array(items)) => Ok(Value::Number(items.borrow().len() as f64)),
            Some(Value::String(s)) => Ok(Value::Number(s.chars().count() as f64)),
            Some(Value::Object(fields)) => Ok(Value::Number(fields.borrow().len() as f64)),
            _ => Err(EcoError::new(
                ErrorKind::TypeError,
                "len expects an array, string, or object",
            )),
        }),
    );
}

/// Filesystem resolver: joins specifiers against the importing module's
/// directory, appends the `.eco` extension when missing, and normalises the
/// path lexically into the canonical module name.
#[derive(Debug, Default)]
pub struct FsResolver;

impl FsResolver {
    /// Create a filesystem resolver.
    pub fn new() -> Self {
        Self
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other),
        }
    }
    out
}

impl ModuleResolver for FsResolver {
    fn resolve_filename(
        &mut self,
        current_dir: &str,
        name: &str,
    ) -> Result<ResolvedModule, EcoError> {
        let mut path = Path::new(current_dir).join(name);
        if path.extension().is_none() {
            path.set_extension("eco");
        }
        let path = normalize(&path);
        let new_current_dir = path
            .parent()
            .map(|parent| parent.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(ResolvedModule {
            canonical_name: path.to_string_lossy().into_owned(),
            new_current_dir,
        })
    }

    fn resolve_import(&mut self, canonical_name: &str) -> Result<String, EcoError> {
        std::fs::read_to_string(canonical_name).map_err(|err| {
            EcoError::new(
                ErrorKind::ModuleError,
                format!("cannot read module '{}': {}", canonical_name, err),
            )
        })
    }
}
