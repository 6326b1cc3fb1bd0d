/*
 * integration_tests.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * End-to-end tests: template project on disk to generated modules and
 * remapped compiler diagnostics.
 */

use std::fs;
use std::path::{Path, PathBuf};
use tagsmith_templates::diagnostics::resolve;
use tagsmith_templates::{
    CompilerError, ErrorLocation, Position, Project, ProjectConfig, TemplateError, build,
};

fn project(files: &[(&str, &str)]) -> (tempfile::TempDir, Project) {
    let dir = tempfile::tempdir().unwrap();
    for (path, source) in files {
        let path = dir.path().join("templates").join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, source).unwrap();
    }
    let project = Project::with_config(dir.path(), ProjectConfig::default()).unwrap();
    (dir, project)
}

const MY_BUTTON: &str = r#"<my-button text="String" onClick="String" fragment>
  <button onclick="${onClick}">${text}</button>
</my-button>
"#;

const TOOLBAR: &str = r#"<my-toolbar onClick="String" fragment>
  <nav><my-button text="Hello" onClick="${onClick}"/></nav>
</my-toolbar>
"#;

#[test]
fn my_button_call_in_sorted_parameter_order() {
    let (dir, project) = project(&[
        ("components/my-button.html", MY_BUTTON),
        ("components/toolbar.html", TOOLBAR),
    ]);
    let (output, report) = build(&project).unwrap();
    assert!(report.is_ok(), "{:?}", report.errors);

    output.write(&project.output_dir()).unwrap();
    let toolbar = fs::read_to_string(dir.path().join("src/templates/components/my_toolbar.rs")).unwrap();

    let call = toolbar.find("my_button::render(").unwrap();
    let on_click = toolbar[call..].find("(onClick) /*@tagsmith:e").unwrap();
    let text = toolbar[call..].find("\"Hello\".into(),").unwrap();
    assert!(on_click < text);

    let root = fs::read_to_string(dir.path().join("src/templates/mod.rs")).unwrap();
    assert!(root.contains("pub mod components;"));
    assert!(root.contains("REGISTRY_NAME"));
    let components = fs::read_to_string(dir.path().join("src/templates/components/mod.rs")).unwrap();
    assert!(components.contains("name: \"my-button\","));
    assert!(components.contains("name: \"my-toolbar\","));
}

const ICON: &str = "<icon name=\"&str\" fragment><i class=\"icon-${name}\"></i></icon>\n";
const ADMIN_ICON: &str = "<icon name=\"&str\" fragment><i class=\"admin-${name}\"></i></icon>\n";

#[test]
fn icon_resolution_by_proximity() {
    let (_dir, project) = project(&[
        ("components/icon.html", ICON),
        ("components/admin/icon.html", ADMIN_ICON),
        ("components/admin/panel.html", "<admin-panel><icon name=\"gear\"/></admin-panel>\n"),
        ("shared/page.html", "<shared-page><icon name=\"home\"/></shared-page>\n"),
    ]);
    let (output, report) = build(&project).unwrap();

    let panel = &output.files[Path::new("components/admin/admin_panel.rs")].contents;
    assert!(panel.contains("use crate::templates::components::admin::icon as components_admin_icon;"));

    assert_eq!(report.errors.len(), 1);
    let TemplateError::AmbiguousTag { tag, candidates, .. } = &report.errors[0] else {
        panic!("expected ambiguity, got {:?}", report.errors);
    };
    assert_eq!(tag, "icon");
    assert_eq!(candidates, &vec!["components".to_string(), "components/admin".to_string()]);

    let message = report.errors[0].to_string();
    assert!(message.starts_with("shared/page.html: `<icon>` used in `shared-page` is ambiguous"));

    let ctx = output.source_context();
    let diagnostic = report.errors[0].to_diagnostic(&ctx);
    assert_eq!(diagnostic.code.as_deref(), Some("T-2-2"));
    assert!(diagnostic.location.is_some());
}

#[test]
fn deleting_a_provider_makes_the_name_unique() {
    let (dir, project) = project(&[
        ("components/icon.html", ICON),
        ("components/admin/icon.html", ADMIN_ICON),
        ("shared/page.html", "<shared-page><icon name=\"home\"/></shared-page>\n"),
    ]);
    let (_, report) = build(&project).unwrap();
    assert_eq!(report.errors.len(), 1);

    fs::remove_file(dir.path().join("templates/components/admin/icon.html")).unwrap();
    let (output, report) = build(&project).unwrap();
    assert!(report.is_ok(), "{:?}", report.errors);
    let page = &output.files[Path::new("shared/shared_page.rs")].contents;
    assert!(page.contains("use crate::templates::components::icon as components_icon;"));
}

const CARD: &str = "<rust>\nuse crate::model::User;\n</rust>\n<user-card user=\"&User\" fragment>\n  <div>\n    <h2>${user.name}</h2>\n  </div>\n</user-card>\n";

#[test]
fn compiler_errors_map_to_template_coordinates() {
    let (_dir, project) = project(&[("components/card.html", CARD)]);
    let (output, report) = build(&project).unwrap();
    assert!(report.is_ok());

    let generated_path = project.output_dir().join("components/user_card.rs");
    let contents = &output.files[Path::new("components/user_card.rs")].contents;
    let line_of = |needle: &str| contents.lines().position(|l| l.contains(needle)).unwrap() + 1;

    let errors = vec![
        CompilerError {
            message: "no field `name` on type `&User`".into(),
            file: generated_path.clone(),
            line: line_of("out.write(&(user.name)"),
            column: 9,
        },
        CompilerError {
            message: "cannot find type `User` in this scope".into(),
            file: generated_path.clone(),
            line: line_of("pub fn render"),
            column: 38,
        },
        CompilerError {
            message: "unresolved import `crate::model`".into(),
            file: generated_path,
            line: line_of("use crate::model::User;"),
            column: 5,
        },
    ];
    let resolved = resolve(&output.generated_sources(&project.output_dir()), &errors);
    assert_eq!(resolved.len(), 3);

    let ErrorLocation::Expression { start, .. } = &resolved[0].location else {
        panic!("expected expression location");
    };
    assert_eq!(*start, Position { line: 6, column: 9 });
    assert_eq!(resolved[0].excerpt.as_deref(), Some("    <h2>${user.name}</h2>"));
    assert_eq!(resolved[0].template_file.as_deref(), Some(Path::new("components/card.html")));

    let ErrorLocation::Expression { start, .. } = &resolved[1].location else {
        panic!("parameter type should map to its attribute");
    };
    assert_eq!(start.line, 4);

    assert_eq!(resolved[2].location, ErrorLocation::TopLevelCode);
}

#[test]
fn self_reference_is_not_a_call() {
    let (_dir, project) = project(&[(
        "tree.html",
        "<tree-node label=\"&str\" fragment>\n<li>${label}<tree-node><b>leaf</b></tree-node></li>\n</tree-node>\n",
    )]);
    let (output, report) = build(&project).unwrap();
    assert!(report.is_ok(), "{:?}", report.errors);
    let code = &output.files[Path::new("tree_node.rs")].contents;
    assert!(!code.contains("::render("));
    assert!(code.contains("<b>leaf</b>"));
    assert!(!code.contains("<tree-node"));
}

#[test]
fn stale_generated_files_are_removed_on_rebuild() {
    let (dir, project) = project(&[("a.html", "<my-a></my-a>"), ("b.html", "<my-b></my-b>")]);
    let (output, _) = build(&project).unwrap();
    output.write(&project.output_dir()).unwrap();
    assert!(dir.path().join("src/templates/my_b.rs").exists());

    fs::remove_file(dir.path().join("templates/b.html")).unwrap();
    let (output, _) = build(&project).unwrap();
    let summary = output.write(&project.output_dir()).unwrap();
    assert_eq!(summary.removed, vec![PathBuf::from("my_b.rs")]);
}
