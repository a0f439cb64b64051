use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use kfjob_core::{Framework, ImageBuilder};
use kfjob_img::{DockerfileTemplates, ImgBuilder};
use kfjob_mock::MockBuilder;

use crate::config::BuilderConfig;

pub fn create_builder(config: &BuilderConfig) -> Result<Box<dyn ImageBuilder>> {
    match config.provider.as_str() {
        "img" => {
            let templates = load_templates(&config.templates)?;
            let mut builder = ImgBuilder::new(&config.owner)
                .with_program(&config.program)
                .with_templates(templates)
                .with_keep_workdir(config.keep_workdir);
            if let Some(work_root) = &config.work_root {
                builder = builder.with_work_root(work_root);
            }
            Ok(Box::new(builder))
        }
        "mock" => Ok(Box::new(MockBuilder::new())),
        other => bail!("Unimplemented builder provider: {}, expected 'img' or 'mock'", other),
    }
}

fn load_templates(overrides: &BTreeMap<String, PathBuf>) -> Result<DockerfileTemplates> {
    let mut templates = DockerfileTemplates::default();
    for (name, path) in overrides {
        let framework: Framework = name.parse()?;
        let recipe = fs::read_to_string(path)
            .with_context(|| format!("Failed to read Dockerfile template {}", path.display()))?;
        templates.insert(framework, recipe);
    }
    Ok(templates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kfjob_core::JobRequest;
    use kfjob_mock::MOCK_IMAGE;

    #[test]
    fn mock_provider_is_selected_from_config() {
        let config = BuilderConfig {
            provider: "mock".to_string(),
            ..Default::default()
        };
        let builder = create_builder(&config).unwrap();
        let request = JobRequest::new("mnist-1", Framework::TensorFlow);
        assert_eq!(builder.source_to_image("", &request).unwrap(), MOCK_IMAGE);
    }

    #[test]
    fn img_provider_is_the_default() {
        assert!(create_builder(&BuilderConfig::default()).is_ok());
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let config = BuilderConfig {
            provider: "s2i".to_string(),
            ..Default::default()
        };
        let err = create_builder(&config).err().unwrap();
        assert!(err.to_string().contains("Unimplemented builder provider: s2i"));
    }

    #[test]
    fn template_overrides_must_name_a_known_framework() {
        let config = BuilderConfig {
            templates: BTreeMap::from([("mxnet".to_string(), PathBuf::from("Dockerfile"))]),
            ..Default::default()
        };
        let err = create_builder(&config).err().unwrap();
        assert!(err.to_string().contains("unknown framework 'mxnet'"));
    }

    #[test]
    fn template_overrides_are_read_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tf.Dockerfile");
        fs::write(&path, "FROM tensorflow/tensorflow:2.15.0\n").unwrap();

        let templates =
            load_templates(&BTreeMap::from([("tensorflow".to_string(), path)])).unwrap();
        assert_eq!(
            templates.select(Framework::TensorFlow),
            "FROM tensorflow/tensorflow:2.15.0\n"
        );
        assert_eq!(
            templates.select(Framework::PyTorch),
            DockerfileTemplates::default().select(Framework::PyTorch)
        );
    }
}
