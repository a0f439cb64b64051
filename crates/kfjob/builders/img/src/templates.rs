use std::collections::BTreeMap;

use kfjob_core::Framework;
use tracing::warn;

pub const TENSORFLOW_TEMPLATE: &str = r#"FROM tensorflow/tensorflow:1.15.5-py3

WORKDIR /opt/kfjob
COPY code.py /opt/kfjob/code.py

ENTRYPOINT ["python", "/opt/kfjob/code.py"]
"#;

pub const PYTORCH_TEMPLATE: &str = r#"FROM pytorch/pytorch:1.13.1-cuda11.6-cudnn8-runtime

WORKDIR /opt/kfjob
COPY code.py /opt/kfjob/code.py

ENTRYPOINT ["python", "/opt/kfjob/code.py"]
"#;

/// Dockerfile recipe per framework.
///
/// `Default` carries the built-in TensorFlow and PyTorch recipes. Entries can be replaced;
/// a table built from [`DockerfileTemplates::empty`] may leave a framework out, and that
/// framework gets an empty recipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerfileTemplates {
    recipes: BTreeMap<Framework, String>,
}

impl Default for DockerfileTemplates {
    fn default() -> Self {
        DockerfileTemplates::empty()
            .with(Framework::TensorFlow, TENSORFLOW_TEMPLATE)
            .with(Framework::PyTorch, PYTORCH_TEMPLATE)
    }
}

impl DockerfileTemplates {
    pub fn empty() -> Self {
        DockerfileTemplates {
            recipes: BTreeMap::new(),
        }
    }

    pub fn with(mut self, framework: Framework, recipe: impl Into<String>) -> Self {
        self.insert(framework, recipe);
        self
    }

    pub fn insert(&mut self, framework: Framework, recipe: impl Into<String>) {
        self.recipes.insert(framework, recipe.into());
    }

    pub fn select(&self, framework: Framework) -> &str {
        match self.recipes.get(&framework) {
            Some(recipe) => recipe.as_str(),
            None => {
                warn!(%framework, "no Dockerfile template registered, staging an empty one");
                ""
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_both_frameworks() {
        let templates = DockerfileTemplates::default();
        assert_eq!(templates.select(Framework::TensorFlow), TENSORFLOW_TEMPLATE);
        assert_eq!(templates.select(Framework::PyTorch), PYTORCH_TEMPLATE);
        assert!(TENSORFLOW_TEMPLATE.contains("COPY code.py"));
    }

    #[test]
    fn overrides_replace_one_framework_only() {
        let templates = DockerfileTemplates::default().with(Framework::PyTorch, "FROM custom\n");
        assert_eq!(templates.select(Framework::PyTorch), "FROM custom\n");
        assert_eq!(templates.select(Framework::TensorFlow), TENSORFLOW_TEMPLATE);
    }

    #[test]
    fn unregistered_framework_selects_an_empty_recipe() {
        let templates = DockerfileTemplates::empty().with(Framework::PyTorch, PYTORCH_TEMPLATE);
        assert_eq!(templates.select(Framework::TensorFlow), "");
        assert_eq!(DockerfileTemplates::empty().select(Framework::PyTorch), "");
    }
}
