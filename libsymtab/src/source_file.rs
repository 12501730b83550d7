use std::fs::File;
use std::io::Read;
use std::io::Result as IoResult;

pub struct SourceFile {
    pub path: String,
    pub body: String,
}

impl SourceFile {

    pub fn load(path: &str) -> IoResult<SourceFile> {
        File::open(path).and_then(|mut f| {
            let mut source_file = SourceFile::new(path);
            f.read_to_string(&mut source_file.body)
                .and(Ok(source_file))
        })
    }

    fn new(path: &str) -> SourceFile {
        SourceFile {
            path: path.to_string(),
            body: String::new(),
        }
    }
}

#[test]
fn test_load_source_file() {
    use std::io::{Seek, SeekFrom, Write};

    let mut tmpfile = tempfile::NamedTempFile::new().unwrap();
    write!(tmpfile, "int z;").unwrap();
    tmpfile.seek(SeekFrom::Start(0)).unwrap();

    let sf = SourceFile::load(tmpfile.path().to_str().unwrap()).unwrap();
    assert_eq!(sf.path, tmpfile.path().to_str().unwrap());
    assert_eq!(sf.body, "int z;");
}

#[test]
fn test_load_missing_file() {
    assert!(SourceFile::load("/nonexistent/source.c").is_err());
}
