/// `Err` carries the message printed for a failing fixture.
pub type TestResult = Result<(), String>;

pub trait TestCase {
    fn name(&self) -> &str;
    fn execute(&self) -> TestResult;
}
