mod common;
use crate::common::{init_tracing, write_project, TestResult, MINIMAL_CONFIG};

use serde_json::json;
use tempfile::tempdir;

use quartz_config::compile::{Bundler, ModuleCompiler};
use quartz_config::config::{load_config, QUARTZ_VERSION};
use quartz_config::load::{JsModuleLoader, ModuleLoader, OpaqueRef};

#[test]
fn data_only_module_round_trips() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let entry = write_project(
        dir.path(),
        &[(
            "quartz.config.js",
            r#"
export default {
  plugins: [{ name: "Latex", options: { renderEngine: "katex" } }],
  configuration: {
    quartzVersion: "4.0.0",
    name: "Round Trip",
    ignorePatterns: ["private"],
    enableSPA: true,
    analytics: null,
    locale: "en-US",
    maxDepth: 3,
  },
  components: { pageSingle: "a", pageList: "b", pageHome: "c", document: "d" },
}
"#,
        )],
    );

    let compiled = Bundler::new().compile(&entry)?;
    let candidate = JsModuleLoader::new().load(&compiled, &entry)?;

    assert_eq!(
        candidate.value(),
        &json!({
            "plugins": [{ "name": "Latex", "options": { "renderEngine": "katex" } }],
            "configuration": {
                "quartzVersion": "4.0.0",
                "name": "Round Trip",
                "ignorePatterns": ["private"],
                "enableSPA": true,
                "analytics": null,
                "locale": "en-US",
                "maxDepth": 3
            },
            "components": { "pageSingle": "a", "pageList": "b", "pageHome": "c", "document": "d" }
        })
    );
    Ok(())
}

#[test]
fn minimal_project_loads() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    write_project(dir.path(), &[("quartz.config.js", MINIMAL_CONFIG)]);

    let loaded = load_config(dir.path())?;
    assert_eq!(loaded.config.configuration.name, "Minimal");
    assert!(loaded.config.plugins.is_empty());
    assert_eq!(QUARTZ_VERSION, "4.0.0");
    assert!(loaded.version_mismatch.is_none());
    Ok(())
}

#[test]
fn typescript_and_json_imports_are_bundled() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    write_project(
        dir.path(),
        &[
            (
                "quartz.config.js",
                r#"
import { siteName, patterns } from "./settings"
import * as layout from "./layout/index.js"
import meta from "./meta.json"

console.log("loading", siteName)

export default {
  plugins: meta.plugins,
  configuration: {
    quartzVersion: meta.version,
    name: siteName,
    ignorePatterns: patterns,
  },
  components: layout,
}
"#,
            ),
            (
                "settings.ts",
                r#"
import type { GlobalConfiguration } from "./types"

interface Extra {
  draft: boolean
}

type Pattern = string

export const siteName: string = "Typed Garden"
export const patterns = ["private", "drafts"] as const
"#,
            ),
            (
                "layout/index.js",
                r#"
function ContentPage() {}
const ListPage = function ListPage() {}
export { ContentPage as pageSingle, ListPage as pageList }
export * from "./rest"
"#,
            ),
            (
                "layout/rest.js",
                r#"
export function pageHome() {}
export const document = () => null
"#,
            ),
            (
                "meta.json",
                r#"{ "version": "4.0.0", "plugins": [{ "name": "FromJson" }] }"#,
            ),
        ],
    );

    let loaded = load_config(dir.path())?;
    let config = loaded.config;

    assert_eq!(config.configuration.name, "Typed Garden");
    assert_eq!(config.configuration.ignore_patterns, vec!["private", "drafts"]);
    assert_eq!(config.plugins.len(), 1);
    assert_eq!(config.plugins[0].name(), Some("FromJson"));
    assert_eq!(
        config.components.page_single,
        OpaqueRef::Function {
            name: Some("ContentPage".to_string())
        }
    );
    assert_eq!(config.components.page_home.name(), Some("pageHome"));
    assert!(matches!(config.components.document, OpaqueRef::Function { .. }));
    Ok(())
}

#[test]
fn packages_resolve_from_node_modules() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    write_project(
        dir.path(),
        &[
            (
                "quartz.config.js",
                r#"
import { components } from "quartz-layouts"
export default {
  plugins: [],
  configuration: { quartzVersion: "4.0.0", name: "Pkg", ignorePatterns: [] },
  components,
}
"#,
            ),
            (
                "node_modules/quartz-layouts/package.json",
                r#"{ "name": "quartz-layouts", "main": "lib/main.js" }"#,
            ),
            (
                "node_modules/quartz-layouts/lib/main.js",
                r#"
export const components = {
  pageSingle: "single",
  pageList: "list",
  pageHome: "home",
  document: "document",
}
"#,
            ),
        ],
    );

    let loaded = load_config(dir.path())?;
    assert_eq!(
        loaded.config.components.page_list,
        OpaqueRef::Value(json!("list"))
    );
    Ok(())
}

#[test]
fn repeated_loads_do_not_share_state() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    write_project(
        dir.path(),
        &[(
            "quartz.config.js",
            r#"
globalThis.__loads = (globalThis.__loads || 0) + 1
export default {
  plugins: [],
  configuration: {
    quartzVersion: "4.0.0",
    name: "load " + globalThis.__loads,
    ignorePatterns: [],
  },
  components: { pageSingle: 1, pageList: 2, pageHome: 3, document: 4 },
}
"#,
        )],
    );

    let first = load_config(dir.path())?;
    let second = load_config(dir.path())?;
    assert_eq!(first.config.configuration.name, "load 1");
    assert_eq!(second.config.configuration.name, "load 1");
    Ok(())
}

#[test]
fn typescript_and_tsx_leave_runtime_text_alone() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let entry = write_project(
        dir.path(),
        &[
            (
                "quartz.config.js",
                r#"
import { siteName, tagline, banner, first, second, locale, count, sure, Mode } from "./settings"
import Page from "./page"

export default {
  name: siteName,
  tagline,
  banner,
  pair: [first, second],
  locale,
  count,
  sure,
  modes: [Mode.Light, Mode.Dark, Mode[0]],
  page: { title: Page.displayName, view: Page() },
  component: Page,
}
"#,
            ),
            (
                "settings.ts",
                r#"
import type { Theme } from "./theme"

export enum Mode {
  Light,
  Dark = "dark",
}

type Name = string
const label = (s: string): string => s

export const siteName = label("Site" as Name)
export const tagline: string = "Quality satisfies everyone, treat as const"
export const banner = `import x from "./nope" ${siteName}`
// import y from "./nowhere"
export const first = 1, second = 2
export const { locale } = { locale: "en-US" }
export const count = new Map<string, number>([["a", 1]]).size
const maybe: string | undefined = "xyz"
export const sure = maybe!.length
"#,
            ),
            (
                "page.tsx",
                r#"
const h = (tag: string, props: object | null, ...children: unknown[]) => ({ tag, children })

export default function Page() {
  return <div>hi</div>
}
Page.displayName = "P"
"#,
            ),
        ],
    );

    let compiled = Bundler::new().compile(&entry)?;
    let candidate = JsModuleLoader::new().load(&compiled, &entry)?;
    let value = candidate.value();

    assert_eq!(value["name"], "Site");
    assert_eq!(value["tagline"], "Quality satisfies everyone, treat as const");
    assert_eq!(value["banner"], "import x from \"./nope\" Site");
    assert_eq!(value["pair"], json!([1, 2]));
    assert_eq!(value["locale"], "en-US");
    assert_eq!(value["count"], 1);
    assert_eq!(value["sure"], 3);
    assert_eq!(value["modes"], json!([0, "dark", "Light"]));
    assert_eq!(value["page"], json!({ "title": "P", "view": { "tag": "div", "children": ["hi"] } }));
    assert_eq!(
        OpaqueRef::from_value(&value["component"]),
        OpaqueRef::Function {
            name: Some("Page".to_string())
        }
    );
    Ok(())
}
