mod collector;
mod compile_pass;
mod compile_fail;
mod test_case;

use colored::*;
use std::env;
use std::process;
use self::collector::collect_test_cases;

fn main() {
    let root = env::args().nth(1).unwrap_or_else(|| "tests".to_string());
    let test_cases = match collect_test_cases(&root) {
        Ok(test_cases) => test_cases,
        Err(e) => {
            println!("{}", format!("Could not collect tests under `{}`: {}", root, e).red().bold());
            process::exit(2);
        },
    };
    let mut failures = Vec::new();
    println!("{}", "Running `symtab` fixture tests...".blue().bold());
    println!("");
    let test_case_count = test_cases.len();
    for test_case in test_cases {
        let result = test_case.execute();
        if let Err(message) = result {
            failures.push(test_case.name().to_string());
            println!("{}", format!("Error in `{}`:", test_case.name()).red().bold());
            println!("{}", message);
            println!("");
        }
    }
    if failures.is_empty() {
        println!("{}", format!("{} tests passed!", test_case_count).green().bold());
    } else {
        println!("{}", format!("{} tests failed:", failures.len()).red().bold());
        for failure in &failures {
            println!("\t{}", failure.red());
        }
    }
    println!("");
    if !failures.is_empty() {
        process::exit(1);
    }
}
