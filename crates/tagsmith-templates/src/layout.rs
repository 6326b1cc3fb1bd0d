/*
 * layout.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Generated output layout.
//!
//! Every template becomes `<ns modules>/<module>.rs` below the output
//! directory, and every namespace gets a `mod.rs` registry object listing
//! its child modules and its registry-visible templates. Paths are a pure
//! function of the namespace path and the template name.

use crate::error::{TemplateError, TemplateResult};
use crate::model::{SubPath, TemplateDefinition};
use once_cell::sync::Lazy;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt::Write as _;
use std::path::PathBuf;

/// First line of every generated file.
pub const GENERATED_HEADER: &str = "// @generated by tagsmith";

/// Name of the registry static in the root module.
pub const REGISTRY_STATIC: &str = "REGISTRY";

static RUST_KEYWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "as", "async", "await", "box", "break", "const", "continue", "crate", "do", "dyn",
        "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in",
        "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub",
        "ref", "return", "self", "Self", "static", "struct", "super", "trait", "true", "try",
        "type", "typeof", "unsafe", "unsized", "use", "virtual", "where", "while", "yield",
    ]
    .into_iter()
    .collect()
});

pub fn is_keyword(name: &str) -> bool {
    RUST_KEYWORDS.contains(name)
}

/// Rust module name for a template or namespace segment.
pub fn module_name(name: &str) -> String {
    let mut module: String = name
        .chars()
        .map(|c| match c {
            '-' | '.' | ' ' => '_',
            c if c.is_alphanumeric() || c == '_' => c.to_ascii_lowercase(),
            _ => '_',
        })
        .collect();
    if module.is_empty() || module.starts_with(|c: char| c.is_ascii_digit()) {
        module.insert(0, '_');
    }
    if is_keyword(&module) {
        module.push('_');
    }
    module
}

/// Where a template's generated code lives and how it is referenced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateLayout {
    /// Namespace module names, outermost first
    pub namespace: Vec<String>,
    pub module: String,
    /// Fully qualified module path, e.g. `crate::templates::components::icon`
    pub module_path: String,
    /// Import alias used by callers, e.g. `components_icon`
    pub alias: String,
}

impl TemplateLayout {
    pub fn new(root_module: &str, sub_path: &SubPath, name: &str) -> Self {
        let namespace: Vec<String> = sub_path.segments().iter().map(|s| module_name(s)).collect();
        let module = module_name(name);

        let module_path = std::iter::once(root_module.to_string())
            .chain(namespace.iter().cloned())
            .chain(std::iter::once(module.clone()))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("::");

        let alias = namespace
            .iter()
            .map(|s| s.trim_end_matches('_'))
            .chain(std::iter::once(module.trim_end_matches('_')))
            .collect::<Vec<_>>()
            .join("_");

        TemplateLayout {
            namespace,
            module,
            module_path,
            alias,
        }
    }

    pub fn function_path(&self) -> String {
        format!("{}::render", self.module_path)
    }

    /// Generated file path relative to the output directory.
    pub fn relative_path(&self) -> PathBuf {
        let mut path: PathBuf = self.namespace.iter().collect();
        path.push(format!("{}.rs", self.module));
        path
    }
}

/// Registry-object path for a namespace, relative to the output directory.
pub fn namespace_file(namespace: &[String]) -> PathBuf {
    let mut path: PathBuf = namespace.iter().collect();
    path.push("mod.rs");
    path
}

#[derive(Default)]
struct NamespaceNode<'a> {
    children: BTreeSet<String>,
    templates: BTreeMap<String, &'a TemplateDefinition>,
}

/// Produce the `mod.rs` registry objects for a set of definitions.
///
/// Fails when two templates, or a template and a namespace, would generate
/// the same module.
pub fn registry_files(
    definitions: &[&TemplateDefinition],
    root_module: &str,
) -> TemplateResult<Vec<(PathBuf, String)>> {
    let mut nodes: BTreeMap<Vec<String>, NamespaceNode<'_>> = BTreeMap::new();
    nodes.entry(Vec::new()).or_default();

    for def in definitions {
        let layout = TemplateLayout::new(root_module, &def.sub_path, &def.name);
        for depth in 0..layout.namespace.len() {
            nodes
                .entry(layout.namespace[..depth].to_vec())
                .or_default()
                .children
                .insert(layout.namespace[depth].clone());
        }
        let node = nodes.entry(layout.namespace.clone()).or_default();
        if let Some(first) = node.templates.get(&layout.module) {
            return Err(TemplateError::ModuleCollision {
                file: def.file.clone(),
                namespace: def.sub_path.to_string(),
                module: layout.module,
                first: first.name.clone(),
                second: def.name.clone(),
            });
        }
        node.templates.insert(layout.module, def);
    }

    for node in nodes.values() {
        if let Some((module, def)) = node
            .templates
            .iter()
            .find(|(module, _)| node.children.contains(*module))
        {
            return Err(TemplateError::ModuleCollision {
                file: def.file.clone(),
                namespace: def.sub_path.to_string(),
                module: module.clone(),
                first: def.name.clone(),
                second: format!("{}/", module),
            });
        }
    }

    let namespaces: Vec<Vec<String>> = nodes.keys().cloned().collect();
    let files = nodes
        .iter()
        .map(|(namespace, node)| {
            let is_root = namespace.is_empty();
            let body = render_namespace(node, is_root.then_some((root_module, &namespaces[..])));
            (namespace_file(namespace), body)
        })
        .collect();
    Ok(files)
}

fn render_namespace(node: &NamespaceNode<'_>, root: Option<(&str, &[Vec<String>])>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}; do not edit.", GENERATED_HEADER);
    out.push('\n');

    let modules: BTreeSet<&String> = node.children.iter().chain(node.templates.keys()).collect();
    for module in &modules {
        let _ = writeln!(out, "pub mod {};", module);
    }
    if !modules.is_empty() {
        out.push('\n');
    }

    out.push_str("pub const TEMPLATES: &[tagsmith_runtime::TemplateInfo] = &[\n");
    for def in node.templates.values().filter(|d| d.is_fragment || d.is_page) {
        let _ = writeln!(out, "    tagsmith_runtime::TemplateInfo {{");
        let _ = writeln!(out, "        name: {:?},", def.name);
        let _ = writeln!(out, "        namespace: {:?},", def.sub_path.to_string());
        let _ = writeln!(out, "        function: {:?},", def.function);
        let _ = writeln!(out, "        page: {},", def.is_page);
        let _ = writeln!(out, "        parameters: &[");
        for param in &def.parameters {
            let _ = writeln!(
                out,
                "            tagsmith_runtime::ParameterInfo {{ name: {:?}, ty: {:?}, default: {:?} }},",
                param.name, param.ty, param.default
            );
        }
        let _ = writeln!(out, "        ],");
        let _ = writeln!(out, "    }},");
    }
    out.push_str("];\n");

    if let Some((root_module, namespaces)) = root {
        let _ = writeln!(
            out,
            "\npub const REGISTRY_NAME: &str = {:?};",
            format!("{}::{}", root_module, REGISTRY_STATIC)
        );
        let tables: Vec<String> = namespaces
            .iter()
            .map(|ns| {
                if ns.is_empty() {
                    "TEMPLATES".to_string()
                } else {
                    format!("{}::TEMPLATES", ns.join("::"))
                }
            })
            .collect();
        let _ = writeln!(
            out,
            "\npub static {}: tagsmith_runtime::Registry = tagsmith_runtime::Registry {{\n    name: REGISTRY_NAME,\n    namespaces: &[{}],\n}};",
            REGISTRY_STATIC,
            tables.join(", ")
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TemplateParameter;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    fn definition(ns: &str, name: &str, fragment: bool) -> TemplateDefinition {
        let sub_path = SubPath::parse(ns);
        let layout = TemplateLayout::new("crate::templates", &sub_path, name);
        TemplateDefinition {
            name: name.into(),
            sub_path,
            file: PathBuf::from(format!("{}/{}.html", ns, name)),
            module: layout.module_path.clone(),
            function: layout.function_path(),
            alias: layout.alias.clone(),
            parameters: vec![TemplateParameter::new("name", "&str", None)],
            is_page: false,
            is_fragment: fragment,
        }
    }

    #[test]
    fn module_names() {
        assert_eq!(module_name("my-button"), "my_button");
        assert_eq!(module_name("Card"), "card");
        assert_eq!(module_name("type"), "type_");
        assert_eq!(module_name("404"), "_404");
    }

    #[test]
    fn layout_paths() {
        let layout = TemplateLayout::new("crate::templates", &SubPath::parse("components/admin"), "my-icon");
        assert_eq!(layout.module_path, "crate::templates::components::admin::my_icon");
        assert_eq!(layout.function_path(), "crate::templates::components::admin::my_icon::render");
        assert_eq!(layout.alias, "components_admin_my_icon");
        assert_eq!(layout.relative_path(), Path::new("components/admin/my_icon.rs"));

        let root = TemplateLayout::new("crate::templates", &SubPath::root(), "index");
        assert_eq!(root.relative_path(), Path::new("index.rs"));
        assert_eq!(root.alias, "index");
    }

    #[test]
    fn namespace_files_include_intermediate_modules() {
        let icon = definition("components/admin", "icon", true);
        let files = registry_files(&[&icon], "crate::templates").unwrap();
        let paths: Vec<_> = files.iter().map(|(p, _)| p.clone()).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("mod.rs"),
                PathBuf::from("components/mod.rs"),
                PathBuf::from("components/admin/mod.rs"),
            ]
        );

        let root = &files[0].1;
        assert!(root.starts_with(GENERATED_HEADER));
        assert!(root.contains("pub mod components;"));
        assert!(root.contains("pub const REGISTRY_NAME: &str = \"crate::templates::REGISTRY\";"));
        assert!(root.contains("namespaces: &[TEMPLATES, components::TEMPLATES, components::admin::TEMPLATES],"));

        let admin = &files[2].1;
        assert!(admin.contains("pub mod icon;"));
        assert!(admin.contains("function: \"crate::templates::components::admin::icon::render\","));
        assert!(!admin.contains("REGISTRY_NAME"));
    }

    #[test]
    fn non_fragment_templates_are_not_listed() {
        let hidden = definition("components", "hidden", false);
        let files = registry_files(&[&hidden], "crate::templates").unwrap();
        let components = &files[1].1;
        assert!(components.contains("pub mod hidden;"));
        assert!(!components.contains("name: \"hidden\""));
    }

    #[test]
    fn module_collisions_are_errors() {
        let a = definition("components", "my-card", false);
        let b = definition("components", "my_card", false);
        let err = registry_files(&[&a, &b], "crate::templates").unwrap_err();
        assert_eq!(err.code(), "T-2-9");

        let admin = definition("components", "admin", false);
        let nested = definition("components/admin", "icon", false);
        let err = registry_files(&[&admin, &nested], "crate::templates").unwrap_err();
        assert!(matches!(err, TemplateError::ModuleCollision { .. }));
    }
}
