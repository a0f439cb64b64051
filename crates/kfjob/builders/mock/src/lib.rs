use kfjob_core::{BuildError, ImageBuilder, JobRequest};
use tracing::debug;

/// Image every mocked build resolves to.
pub const MOCK_IMAGE: &str = "kubeflow/tf-dist-mnist-test:1.0";

/// Skips the build entirely and hands back a known-good public image. Useful for trying out
/// generated jobs on a cluster without any container tooling installed.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockBuilder;

impl MockBuilder {
    pub fn new() -> MockBuilder {
        MockBuilder
    }
}

impl ImageBuilder for MockBuilder {
    fn source_to_image(&self, _code: &str, request: &JobRequest) -> Result<String, BuildError> {
        debug!(name = request.generate_name(), image = MOCK_IMAGE, "skipping image build");
        Ok(MOCK_IMAGE.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kfjob_core::Framework;

    #[test]
    fn always_returns_the_fixed_image() {
        let builder = MockBuilder::new();
        let requests = [
            JobRequest::new("mnist-1", Framework::TensorFlow),
            JobRequest::new("", Framework::PyTorch).with_image("ignored:latest"),
        ];

        for request in &requests {
            for code in ["", "import torch", "\u{0}not even python"] {
                assert_eq!(builder.source_to_image(code, request).unwrap(), MOCK_IMAGE);
            }
        }
    }

    #[test]
    fn works_behind_the_trait_object() {
        let builder: Box<dyn ImageBuilder> = Box::new(MockBuilder);
        let request = JobRequest::new("mnist-1", Framework::TensorFlow);
        assert_eq!(builder.source_to_image("print(1)", &request).unwrap(), MOCK_IMAGE);
    }
}
