// src/load/js.rs

//! [`ModuleLoader`] backed by an embedded JavaScript engine (`boa_engine`).

use std::path::Path;

use boa_engine::property::Attribute;
use boa_engine::{js_string, Context, Source};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::compile::CompiledModule;
use crate::errors::{ConfigError, Result};
use crate::load::{Candidate, ModuleLoader};

/// Installed before the bundle runs: a `console` that records calls, and the
/// function that turns the default export into JSON-safe data.
const RUNTIME_PRELUDE: &str = r#"
var __quartzLogs = [];
globalThis.console = (function () {
  function record(level) {
    return function () {
      var parts = [];
      for (var i = 0; i < arguments.length; i++) {
        var arg = arguments[i];
        if (typeof arg === "string") {
          parts.push(arg);
        } else {
          try { parts.push(JSON.stringify(arg)); } catch (e) { parts.push(String(arg)); }
        }
      }
      __quartzLogs.push({ level: level, message: parts.join(" ") });
    };
  }
  return {
    log: record("info"),
    info: record("info"),
    warn: record("warn"),
    error: record("error"),
    debug: record("debug"),
  };
})();

function __quartzDescribe(value, stack) {
  switch (typeof value) {
    case "function": return { "$quartz": "function", name: value.name || null };
    case "undefined": return { "$quartz": "undefined" };
    case "symbol": return { "$quartz": "symbol", repr: String(value) };
    case "bigint": return { "$quartz": "bigint", repr: String(value) };
    case "number": return isFinite(value) ? value : { "$quartz": "number", repr: String(value) };
    case "string":
    case "boolean": return value;
  }
  if (value === null) return null;
  if (stack.indexOf(value) !== -1) return { "$quartz": "circular" };
  if (value instanceof RegExp) return { "$quartz": "regexp", repr: String(value) };
  if (value instanceof Date) return { "$quartz": "date", repr: String(value) };

  stack.push(value);
  var out;
  if (Array.isArray(value)) {
    out = [];
    for (var i = 0; i < value.length; i++) out.push(__quartzDescribe(value[i], stack));
  } else {
    out = {};
    var keys = Object.keys(value);
    for (var k = 0; k < keys.length; k++) out[keys[k]] = __quartzDescribe(value[keys[k]], stack);
  }
  stack.pop();
  return out;
}
"#;

/// Evaluated after the bundle; reads the global the exports were stored in.
const EXTRACT_DEFAULT: &str = r#"
(function (ns) {
  var hasDefault = ns !== null && typeof ns === "object"
    && Object.prototype.hasOwnProperty.call(ns, "default");
  return JSON.stringify({
    hasDefault: hasDefault,
    value: hasDefault ? __quartzDescribe(ns["default"], []) : null,
    logs: __quartzLogs,
  });
})(__quartzExports)
"#;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Extracted {
    has_default: bool,
    value: Value,
    logs: Vec<ConsoleLine>,
}

#[derive(Debug, Deserialize)]
struct ConsoleLine {
    level: String,
    message: String,
}

/// Iterations a single loop may run before evaluation is aborted.
pub const DEFAULT_LOOP_ITERATION_LIMIT: u64 = 1_000_000;

/// Nested calls allowed before evaluation is aborted.
pub const DEFAULT_RECURSION_LIMIT: usize = 512;

/// Runs compiled configuration in a fresh engine context per call.
///
/// Runaway loops and unbounded recursion hit the engine's runtime limits and
/// come back as [`ConfigError::Load`] instead of hanging the process.
#[derive(Debug, Clone, Copy)]
pub struct JsModuleLoader {
    loop_iteration_limit: u64,
    recursion_limit: usize,
}

impl Default for JsModuleLoader {
    fn default() -> Self {
        Self {
            loop_iteration_limit: DEFAULT_LOOP_ITERATION_LIMIT,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }
}

impl JsModuleLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_loop_iteration_limit(mut self, limit: u64) -> Self {
        self.loop_iteration_limit = limit;
        self
    }

    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit;
        self
    }

    fn context(&self) -> Context {
        let mut context = Context::default();
        let limits = context.runtime_limits_mut();
        limits.set_loop_iteration_limit(self.loop_iteration_limit);
        limits.set_recursion_limit(self.recursion_limit);
        context
    }
}

impl ModuleLoader for JsModuleLoader {
    fn load(&self, module: &CompiledModule, identity: &Path) -> Result<Candidate> {
        // Dropped at the end of this call; nothing survives between loads.
        let mut context = self.context();
        let fail = |err: boa_engine::JsError| ConfigError::load(identity, err.to_string());

        context
            .eval(Source::from_bytes(RUNTIME_PRELUDE))
            .map_err(|err| ConfigError::load(identity, format!("runtime setup failed: {err}")))?;

        let exports = context
            .eval(Source::from_bytes(module.text()).with_path(identity))
            .map_err(fail)?;

        context
            .register_global_property(js_string!("__quartzExports"), exports, Attribute::all())
            .map_err(fail)?;

        let extracted = context
            .eval(Source::from_bytes(EXTRACT_DEFAULT))
            .map_err(fail)?;

        let json = extracted
            .as_string()
            .map(|s| s.to_std_string_escaped())
            .ok_or_else(|| ConfigError::load(identity, "default export could not be serialized"))?;

        let extracted: Extracted = serde_json::from_str(&json)
            .map_err(|err| ConfigError::load(identity, format!("malformed export data: {err}")))?;

        forward_console(identity, &extracted.logs);

        if !extracted.has_default {
            return Err(ConfigError::load(identity, "module has no default export"));
        }

        debug!(identity = %identity.display(), "loaded configuration module");
        Ok(Candidate::new(extracted.value))
    }
}

fn forward_console(identity: &Path, lines: &[ConsoleLine]) {
    let file = identity.display();
    for line in lines {
        let message = line.message.as_str();
        match line.level.as_str() {
            "error" => error!(target: "quartz::config", %file, "{message}"),
            "warn" => warn!(target: "quartz::config", %file, "{message}"),
            "debug" => debug!(target: "quartz::config", %file, "{message}"),
            _ => info!(target: "quartz::config", %file, "{message}"),
        }
    }
}
