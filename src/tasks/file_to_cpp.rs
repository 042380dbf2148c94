//! Embedding a file's bytes into a generated C++ source.

use crate::{
    error::{BuildError, Result},
    outofdate::FileOutOfDate,
    Driver,
};
use std::{
    fs,
    io::{BufWriter, Write},
    path::PathBuf,
};

/// Bytes emitted per line of the generated array initialiser.
const BYTES_PER_LINE: usize = 150;

/// Generates a C++ source declaring a byte array with the contents of a file,
/// plus a pointer aliasing the array.
#[derive(Clone, Debug)]
pub struct FileToCpp {
    infile: PathBuf,
    outfile: PathBuf,
    name_for_array: String,
    name_for_ptr: String,
    namespace: String,
    var_const: bool,
    terminating_null: bool,
    intro: String,
    outro: String,
    additional: String,
    dependency_check: bool,
}

impl FileToCpp {
    pub fn new(_driver: Driver) -> Self {
        Self {
            infile: PathBuf::new(),
            outfile: PathBuf::new(),
            name_for_array: String::new(),
            name_for_ptr: String::new(),
            namespace: String::new(),
            var_const: false,
            terminating_null: false,
            intro: String::new(),
            outro: String::new(),
            additional: String::new(),
            dependency_check: true,
        }
    }

    pub fn infile(&mut self, infile: impl Into<PathBuf>) {
        self.infile = infile.into();
    }

    pub fn outfile(&mut self, outfile: impl Into<PathBuf>) {
        self.outfile = outfile.into();
    }

    pub fn name_for_array(&mut self, name: impl Into<String>) {
        self.name_for_array = name.into();
    }

    pub fn name_for_ptr(&mut self, name: impl Into<String>) {
        self.name_for_ptr = name.into();
    }

    pub fn namespace(&mut self, namespace: impl Into<String>) {
        self.namespace = namespace.into();
    }

    pub fn var_const(&mut self, var_const: bool) {
        self.var_const = var_const;
    }

    pub fn terminating_null(&mut self, terminating_null: bool) {
        self.terminating_null = terminating_null;
    }

    pub fn intro(&mut self, intro: impl Into<String>) {
        self.intro = intro.into();
    }

    pub fn outro(&mut self, outro: impl Into<String>) {
        self.outro = outro.into();
    }

    /// Extra text emitted after the pointer declaration, inside the namespace.
    pub fn additional(&mut self, additional: impl Into<String>) {
        self.additional = additional.into();
    }

    pub fn dependency_check(&mut self, check: bool) {
        self.dependency_check = check;
    }

    /// Synthesises the missing one of the two names by suffix.
    fn names(&self) -> Result<(String, String)> {
        if self.name_for_array.is_empty() && self.name_for_ptr.is_empty() {
            return Err(BuildError::config("Missing variable name for FileToCpp()"));
        }
        let array = if self.name_for_array.is_empty() {
            format!("{}Array", self.name_for_ptr)
        } else {
            self.name_for_array.clone()
        };
        let ptr = if self.name_for_ptr.is_empty() {
            format!("{}Ptr", self.name_for_array)
        } else {
            self.name_for_ptr.clone()
        };
        Ok((array, ptr))
    }

    pub fn go(&self) -> Result<()> {
        if self.infile.as_os_str().is_empty() {
            return Err(BuildError::config("Missing 'Infile' for FileToCpp()"));
        }
        if self.outfile.as_os_str().is_empty() {
            return Err(BuildError::config("Missing 'Outfile' for FileToCpp()"));
        }
        let (array, ptr) = self.names()?;
        if !self.infile.is_file() {
            return Err(BuildError::config(format!(
                "Missing Infile \"{}\" for FileToCpp(). File does not exist",
                self.infile.display()
            )));
        }

        let stale = FileOutOfDate::new(&self.outfile)
            .add_file(&self.infile)
            .dependency_check(self.dependency_check)
            .go();
        if !stale {
            trace!(outfile = %self.outfile.display(), "generated source up to date");
            return Ok(());
        }

        let file = fs::File::open(&self.infile).map_err(|err| BuildError::io(err, &self.infile))?;
        let len = file.metadata().map_err(|err| BuildError::io(err, &self.infile))?.len();
        // mapping a zero-length file fails on some platforms
        let mapping;
        let bytes: &[u8] = if len == 0 {
            &[]
        } else {
            mapping = unsafe { memmap2::Mmap::map(&file) }
                .map_err(|err| BuildError::io(err, &self.infile))?;
            &mapping
        };

        let out = fs::File::create(&self.outfile).map_err(|err| BuildError::io(err, &self.outfile))?;
        let mut w = BufWriter::new(out);
        self.emit(&mut w, bytes, &array, &ptr)
            .map_err(|err| BuildError::io(err, &self.outfile))?;
        w.flush().map_err(|err| BuildError::io(err, &self.outfile))
    }

    fn emit(&self, w: &mut impl Write, bytes: &[u8], array: &str, ptr: &str) -> std::io::Result<()> {
        let indent = if self.namespace.is_empty() { "" } else { "  " };
        let konst = if self.var_const { "const " } else { "" };

        if !self.intro.is_empty() {
            writeln!(w, "{}\n", self.intro)?;
        }
        if !self.namespace.is_empty() {
            writeln!(w, "namespace {} {{\n", self.namespace)?;
        }

        write!(w, "{indent}{konst}char {array}[] = {{ ")?;
        for (i, byte) in bytes.iter().enumerate() {
            if i > 0 {
                if i % BYTES_PER_LINE == 0 {
                    write!(w, ",\n{indent}  ")?;
                } else {
                    write!(w, ",")?;
                }
            }
            write!(w, "{byte}")?;
        }
        if self.terminating_null {
            if bytes.is_empty() {
                write!(w, "0")?;
            } else {
                write!(w, ",0")?;
            }
        }
        writeln!(w, " }};\n")?;

        writeln!(w, "{indent}{konst}char* {ptr} = {array};\n")?;

        if !self.additional.is_empty() {
            writeln!(w, "{indent}{}\n", self.additional)?;
        }
        if !self.namespace.is_empty() {
            writeln!(w, "}}\n")?;
        }
        if !self.outro.is_empty() {
            write!(w, "{}", self.outro)?;
        }
        writeln!(w)
    }
}
