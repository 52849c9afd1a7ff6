// src/compile/bundler.rs

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use boa_engine::{Context, Script, Source};
use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use tracing::{debug, info};

use crate::compile::jsx::JsxOptions;
use crate::compile::resolve::resolve_specifier;
use crate::compile::transform::{transform_module, SourceKind, TransformOptions};
use crate::compile::{CompiledModule, ModuleCompiler};
use crate::errors::{ConfigError, Result};
use crate::fs::{FileSystem, RealFileSystem};

/// Bundles an entry module and its transitive imports into one script.
#[derive(Debug, Clone, Default)]
pub struct Bundler<F: FileSystem = RealFileSystem> {
    fs: F,
    options: TransformOptions,
}

impl Bundler<RealFileSystem> {
    pub fn new() -> Self {
        Self::with_fs(RealFileSystem)
    }
}

impl<F: FileSystem> Bundler<F> {
    pub fn with_fs(fs: F) -> Self {
        Self {
            fs,
            options: TransformOptions::default(),
        }
    }

    /// Factory and fragment names JSX compiles to, unless a module overrides
    /// them with `@jsx` / `@jsxFrag` pragmas.
    pub fn jsx(mut self, jsx: JsxOptions) -> Self {
        self.options.jsx = jsx;
        self
    }
}

#[derive(Debug)]
struct ModuleRecord {
    /// Identity inside the bundle: path relative to the entry's directory.
    id: String,
    path: PathBuf,
    body: String,
    /// Import specifier -> id of the module it resolved to.
    links: BTreeMap<String, String>,
}

impl<F: FileSystem> ModuleCompiler for Bundler<F> {
    fn compile(&self, entry: &Path) -> Result<CompiledModule> {
        let base = entry.parent().unwrap_or_else(|| Path::new("/")).to_path_buf();
        let mut context = Context::default();

        let mut modules: Vec<ModuleRecord> = Vec::new();
        let mut index: HashMap<PathBuf, usize> = HashMap::new();
        let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();
        let mut queue: VecDeque<usize> = VecDeque::new();

        modules.push(ModuleRecord {
            id: module_id(&base, entry),
            path: entry.to_path_buf(),
            body: String::new(),
            links: BTreeMap::new(),
        });
        index.insert(entry.to_path_buf(), 0);
        graph.add_node(0);
        queue.push_back(0);

        while let Some(current) = queue.pop_front() {
            let path = modules[current].path.clone();
            let (body, specifiers) = self.prepare(&path)?;
            syntax_check(&mut context, &path, &body)?;

            for specifier in specifiers {
                let target = resolve_specifier(&self.fs, &path, &specifier)
                    .map_err(|err| ConfigError::compile(&path, format!("{err:#}")))?;

                let next = match index.get(&target) {
                    Some(&known) => known,
                    None => {
                        let next = modules.len();
                        debug!(from = %path.display(), to = %target.display(), "discovered module");
                        modules.push(ModuleRecord {
                            id: module_id(&base, &target),
                            path: target.clone(),
                            body: String::new(),
                            links: BTreeMap::new(),
                        });
                        index.insert(target, next);
                        graph.add_node(next);
                        queue.push_back(next);
                        next
                    }
                };

                graph.add_edge(current, next, ());
                let target_id = modules[next].id.clone();
                modules[current].links.insert(specifier, target_id);
            }

            modules[current].body = body;
        }

        // Cycles are allowed: modules read each other's bindings live.
        for component in tarjan_scc(&graph) {
            let cyclic = component.len() > 1 || component.first().is_some_and(|&n| graph.contains_edge(n, n));
            if cyclic {
                let ids: Vec<&str> = component.iter().map(|&n| modules[n].id.as_str()).collect();
                debug!(modules = ?ids, "circular imports");
            }
        }

        info!(entry = %entry.display(), modules = modules.len(), "compiled configuration module");
        Ok(CompiledModule::new(emit(&modules)))
    }
}

impl<F: FileSystem> Bundler<F> {
    /// Read one module and produce its rewritten body plus import specifiers.
    fn prepare(&self, path: &Path) -> Result<(String, Vec<String>)> {
        let kind = SourceKind::from_path(path).map_err(|err| ConfigError::compile(path, err.to_string()))?;
        let source = self
            .fs
            .read_to_string(path)
            .map_err(|err| ConfigError::compile(path, format!("{err:#}")))?;

        let module = transform_module(&source, kind, &self.options)
            .map_err(|err| ConfigError::compile(path, format!("{err:#}")))?;
        Ok((module.body, module.specifiers))
    }
}

/// Parse (without running) a rewritten module body so syntax errors are
/// reported against the file they came from.
fn syntax_check(context: &mut Context, path: &Path, body: &str) -> Result<()> {
    let text = format!("\"use strict\";{body}");
    let source = Source::from_bytes(text.as_bytes()).with_path(path);
    Script::parse(source, None, context)
        .map(|_| ())
        .map_err(|err| ConfigError::compile(path, err.to_string()))
}

fn module_id(base: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(base).unwrap_or(path);
    relative.to_string_lossy().replace('\\', "/")
}

fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{s}\""))
}

/// File URL exposed as `import.meta.url`.
fn file_url(path: &Path) -> String {
    let path = path.to_string_lossy().replace('\\', "/");
    if path.starts_with('/') {
        format!("file://{path}")
    } else {
        format!("file:///{path}")
    }
}

const BUNDLE_PRELUDE: &str = r#"(function () {
"use strict";
const __registry = Object.create(null);
function __define(id, links, meta, init) {
  __registry[id] = { links: links, meta: meta, init: init, namespace: null };
}
function __require(id) {
  const record = __registry[id];
  if (record.namespace !== null) return record.namespace;
  const namespace = Object.create(null);
  Object.defineProperty(namespace, Symbol.toStringTag, { value: "Module" });
  record.namespace = namespace;
  const load = function (specifier) {
    if (!Object.prototype.hasOwnProperty.call(record.links, specifier)) {
      throw new Error("module '" + specifier + "' was not bundled with '" + id + "'");
    }
    return __require(record.links[specifier]);
  };
  const loadLater = function (specifier) {
    let loaded;
    try {
      loaded = load(specifier);
    } catch (error) {
      return Promise.reject(error);
    }
    return Promise.resolve(loaded);
  };
  record.init.call(undefined, namespace, load, loadLater, record.meta);
  return namespace;
}
function __export(namespace, getters) {
  for (const name of Object.keys(getters)) {
    Object.defineProperty(namespace, name, { enumerable: true, get: getters[name] });
  }
}
function __exportStar(namespace, source) {
  for (const name of Object.keys(source)) {
    if (name === "default" || Object.prototype.hasOwnProperty.call(namespace, name)) continue;
    Object.defineProperty(namespace, name, { enumerable: true, get: function () { return source[name]; } });
  }
}
"#;

fn emit(modules: &[ModuleRecord]) -> String {
    let mut out = String::from(BUNDLE_PRELUDE);

    for module in modules {
        let id = js_string(&module.id);
        let links = serde_json::to_string(&module.links).unwrap_or_else(|_| "{}".to_string());
        let meta = serde_json::json!({ "url": file_url(&module.path) });
        let _ = writeln!(out, "// {}", module.id);
        let _ = writeln!(
            out,
            "__define({id}, {links}, {meta}, function (__exports, __import, __dynamicImport, __meta) {{"
        );
        out.push_str(&module.body);
        if !module.body.ends_with('\n') {
            out.push('\n');
        }
        out.push_str("});\n");
    }

    let entry = modules.first().map(|m| js_string(&m.id)).unwrap_or_default();
    let _ = writeln!(out, "return __require({entry});");
    out.push_str("})();\n");
    out
}
