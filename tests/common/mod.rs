//! Common test utilities for Metamove integration tests

use std::path::PathBuf;
use tempfile::TempDir;

/// A temporary project directory holding schema files under test
#[allow(dead_code)]
pub struct TestProject {
    /// Temporary directory
    #[allow(dead_code)]
    pub temp: TempDir,
    /// Path to project root
    pub path: PathBuf,
}

impl TestProject {
    /// Create a new test project
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let path = temp.path().to_path_buf();
        Self { temp, path }
    }

    /// Write a schema file into the project
    pub fn write_file(&self, name: &str, content: &str) -> PathBuf {
        let file_path = self.path.join(name);
        std::fs::write(&file_path, content).expect("Failed to write file");
        file_path
    }

    /// Read a file back from the project
    pub fn read_file(&self, name: &str) -> String {
        std::fs::read_to_string(self.path.join(name)).expect("Failed to read file")
    }

    /// Transform `input` into `output` and return the rewritten text
    pub fn transform(&self, input: &str, output: &str, content: &str) -> String {
        let input_path = self.write_file(input, content);
        let output_path = self.path.join(output);
        metamove::transform_document(&input_path, &output_path)
            .expect("Failed to transform document");
        self.read_file(output)
    }
}

/// Parse rewritten text into a value tree for semantic assertions
#[allow(dead_code)]
pub fn as_value(text: &str) -> serde_yaml::Value {
    serde_yaml::from_str(text).expect("Rewritten output should be valid YAML")
}
