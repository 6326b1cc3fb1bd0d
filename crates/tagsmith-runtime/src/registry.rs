/// Static description of a template parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterInfo {
    pub name: &'static str,
    pub ty: &'static str,
    pub default: Option<&'static str>,
}

/// Static description of one generated template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateInfo {
    /// Tag name of the template
    pub name: &'static str,
    /// Namespace path segments joined with `/`, empty for the root
    pub namespace: &'static str,
    /// Rust path of the generated render function
    pub function: &'static str,
    pub page: bool,
    pub parameters: &'static [ParameterInfo],
}

/// Registry object emitted in the root generated module.
#[derive(Debug, Clone, Copy)]
pub struct Registry {
    pub name: &'static str,
    pub namespaces: &'static [&'static [TemplateInfo]],
}

impl Registry {
    pub fn templates(&self) -> impl Iterator<Item = &'static TemplateInfo> {
        self.namespaces.iter().flat_map(|ns| ns.iter())
    }

    pub fn find(&self, namespace: &str, name: &str) -> Option<&'static TemplateInfo> {
        self.templates()
            .find(|t| t.namespace == namespace && t.name == name)
    }
}
