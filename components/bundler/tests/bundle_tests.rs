//! Integration tests: bundles are self-contained scripts the interpreter
//! can execute directly.

use bundler::{Bundler, MemoryResolver};
use core_types::Value;
use interpreter::Runtime;
use parser::Parser;

fn bundle(modules: &[(&str, &str)], entry: &str) -> String {
    let mut resolver = MemoryResolver::new();
    for (name, source) in modules {
        resolver.add(name, source);
    }
    let mut bundler = Bundler::new(&mut resolver);
    bundler.bundle("", entry).unwrap()
}

fn run_bundle(modules: &[(&str, &str)], entry: &str) -> Value {
    let script = bundle(modules, entry);
    let program = Parser::new(&script)
        .parse()
        .unwrap_or_else(|e| panic!("emitted bundle failed to parse: {}\n{}", e, script));
    Runtime::new()
        .run_program(&program)
        .unwrap_or_else(|e| panic!("bundle execution failed: {}\n{}", e, script))
}

/// Requiring the entry of a two-module graph evaluates the default export.
#[test]
fn default_import_and_export() {
    let result = run_bundle(
        &[
            ("a.eco", "import x from './b'; export default x + 1;"),
            ("b.eco", "export default 41;"),
        ],
        "./a",
    );
    assert_eq!(result, Value::Number(42.0));
}

#[test]
fn named_exports_with_aliases() {
    let result = run_bundle(
        &[
            (
                "main.eco",
                "import { one, two as second } from './nums'; export default one + second;",
            ),
            ("nums.eco", "export const one = 1; export const two = 2;"),
        ],
        "./main",
    );
    assert_eq!(result, Value::Number(3.0));
}

#[test]
fn namespace_import_reads_named_exports() {
    let result = run_bundle(
        &[
            (
                "main.eco",
                "import * as nums from './nums'; export default nums.one + nums.two;",
            ),
            ("nums.eco", "export const one = 1; export const two = 2;"),
        ],
        "./main",
    );
    assert_eq!(result, Value::Number(3.0));
}

#[test]
fn shared_dependency_evaluates_once() {
    // Both importers must receive the same cached instance: each bumps the
    // shared counter object, so the second importer observes the first's
    // write.
    let result = run_bundle(
        &[
            (
                "main.eco",
                "import a from './a'; import b from './b'; export default a + b;",
            ),
            ("a.eco", "import s from './state'; s.n += 1; export default s.n;"),
            ("b.eco", "import s from './state'; s.n += 1; export default s.n;"),
            ("state.eco", "export default { n: 0 };"),
        ],
        "./main",
    );
    assert_eq!(result, Value::Number(3.0));
}

#[test]
fn reexport_named_and_default() {
    let result = run_bundle(
        &[
            (
                "main.eco",
                "import { x, answer } from './facade'; export default x + answer;",
            ),
            (
                "facade.eco",
                "export { x } from './impl'; export { default as answer } from './deep';",
            ),
            ("impl.eco", "export const x = 1;"),
            ("deep.eco", "export default 41;"),
        ],
        "./main",
    );
    assert_eq!(result, Value::Number(42.0));
}

#[test]
fn reexport_all_forwards_every_name() {
    let result = run_bundle(
        &[
            (
                "main.eco",
                "import { a, b } from './facade'; export default a + b;",
            ),
            ("facade.eco", "export * from './impl';"),
            ("impl.eco", "export const a = 10; export const b = 32;"),
        ],
        "./main",
    );
    assert_eq!(result, Value::Number(42.0));
}

#[test]
fn bare_import_runs_for_effect() {
    // The effect module mutates nothing observable here, but its presence
    // must not disturb the entry's default export.
    let result = run_bundle(
        &[
            ("main.eco", "import './effect'; export default 7;"),
            ("effect.eco", "const unused = 1;"),
        ],
        "./main",
    );
    assert_eq!(result, Value::Number(7.0));
}

#[test]
fn bundle_is_deterministic() {
    let modules = [
        ("a.eco", "import b from './b'; export default b;"),
        ("b.eco", "export default 5;"),
    ];
    let first = bundle(&modules, "./a");
    let second = bundle(&modules, "./a");
    assert_eq!(first, second);
}

#[test]
fn cyclic_graph_emits_each_module_once_and_runs() {
    // b's import of a resolves to a's placeholder exports; b only uses it
    // lazily inside a function, so the cycle is observable but harmless.
    let script = bundle(
        &[
            (
                "a.eco",
                "import get_b from './b'; export default get_b();",
            ),
            (
                "b.eco",
                "import a_exports from './a'; export default () => 42;",
            ),
        ],
        "./a",
    );
    assert_eq!(script.matches("'a.eco':").count(), 1);
    assert_eq!(script.matches("'b.eco':").count(), 1);

    let program = Parser::new(&script).parse().unwrap();
    let result = Runtime::new().run_program(&program).unwrap();
    assert_eq!(result, Value::Number(42.0));
}

#[test]
fn module_bodies_emit_in_first_visit_order() {
    let script = bundle(
        &[
            ("a.eco", "import b from './b'; import c from './c'; export default b + c;"),
            ("b.eco", "export default 1;"),
            ("c.eco", "export default 2;"),
        ],
        "./a",
    );
    let a = script.find("'a.eco':").unwrap();
    let b = script.find("'b.eco':").unwrap();
    let c = script.find("'c.eco':").unwrap();
    assert!(a < b && b < c);
}
