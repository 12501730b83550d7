#[macro_use] extern crate clap;
#[macro_use] extern crate log;

use libsymtab::compiler::{Compiler, DEMO_SOURCE};
use libsymtab::symtab;
use libsymtab::Error;
use std::process;

fn report(compiler: &Compiler, name: &str, source: &str, show_ast: bool) -> Result<(), Error> {
    let ast = compiler.parse_source(source)?;
    if show_ast {
        println!("{}", ast.show());
    }
    let table = symtab::build(&ast)?;
    info!("built symbol table for {}", name);
    println!("{}", table);
    Ok(())
}

fn main() {
    env_logger::init();

    let matches = clap_app!(symtabc =>
        (version: crate_version!())
        (author: "Kyle Phelps <kylep91@gmail.com>")
        (about: "Builds nested symbol tables for C translation units")
        (@arg CODE: -e --code +takes_value "Reads the program from the command line")
        (@arg SHOW_AST: --("show-ast") "Prints the parsed syntax tree first")
        (@arg INPUT: ... "Sets the input files to use")
    ).get_matches();

    let compiler = Compiler::new();
    let show_ast = matches.is_present("SHOW_AST");
    let mut failed = false;

    let mut sources = Vec::new();
    if let Some(code) = matches.value_of("CODE") {
        sources.push(("<code>".to_string(), code.to_string()));
    }
    if let Some(paths) = matches.values_of("INPUT") {
        for path in paths {
            match libsymtab::source_file::SourceFile::load(path) {
                Ok(sf) => sources.push((sf.path, sf.body)),
                Err(e) => {
                    error!("{}", Error::Io { path: path.to_string(), source: e });
                    failed = true;
                },
            }
        }
    }
    if sources.is_empty() && !failed {
        debug!("no input given, using the demo program");
        sources.push(("<demo>".to_string(), DEMO_SOURCE.to_string()));
    }

    for (name, source) in sources {
        if !name.starts_with('<') {
            println!("== {}", name);
        }
        if let Err(e) = report(&compiler, &name, &source, show_ast) {
            eprintln!("{}: {}", name, e);
            failed = true;
        }
    }

    if failed {
        process::exit(1);
    }
}

#[test]
fn test_report_with_ast_dump() {
    let compiler = Compiler::new();
    assert!(report(&compiler, "<demo>", DEMO_SOURCE, true).is_ok());
    match report(&compiler, "<code>", "int foo( {", true) {
        Err(Error::Parse(_)) => (),
        other => panic!("unexpected result: {:?}", other),
    }
}
