use libsymtab::Compiler;
use super::test_case::{TestCase, TestResult};

pub struct CompileFail {
    path: String
}

impl CompileFail {
    pub fn new(path: String) -> Box<dyn TestCase> {
        Box::new(CompileFail {
            path: path
        })
    }
}

impl TestCase for CompileFail {
    fn name(&self) -> &str {
        &self.path
    }

    fn execute(&self) -> TestResult {
        let compiler = Compiler::new();
        match compiler.compile(&self.path) {
            Err(_) => Ok(()),
            Ok(table) => Err(format!("Expected a failure, built:\n{}", table)),
        }
    }
}
