use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};
use std::marker::PhantomData;

use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;

/// Writes records as JSON lines into a temp file, so large result sets never
/// have to be held in memory at once.
pub struct ContentWriter<T> {
    file: BufWriter<NamedTempFile>,
    length: usize,
    _record: PhantomData<T>,
}

impl<T: Serialize + DeserializeOwned> ContentWriter<T> {
    pub fn new() -> Result<ContentWriter<T>> {
        Ok(ContentWriter {
            file: BufWriter::new(NamedTempFile::new()?),
            length: 0,
            _record: PhantomData,
        })
    }

    pub fn write(&mut self, record: &T) -> Result<()> {
        serde_json::to_writer(&mut self.file, record)?;
        self.file.write_all(b"\n")?;
        self.length += 1;
        Ok(())
    }

    /// Flush the temp file and open it for reading. The file is removed once the
    /// reader is dropped.
    pub fn close(self) -> Result<ContentReader<T>> {
        let temp_file = self.file.into_inner().map_err(|err| err.into_error())?;
        let lines = BufReader::new(temp_file.reopen()?).lines();
        Ok(ContentReader {
            lines,
            length: self.length,
            _file: temp_file,
            _record: PhantomData,
        })
    }
}

pub struct ContentReader<T> {
    lines: Lines<BufReader<File>>,
    length: usize,
    _file: NamedTempFile,
    _record: PhantomData<T>,
}

impl<T: Serialize + DeserializeOwned> ContentReader<T> {
    pub fn from_items<I: IntoIterator<Item = T>>(items: I) -> Result<ContentReader<T>> {
        let mut writer = ContentWriter::new()?;
        for item in items {
            writer.write(&item)?;
        }
        writer.close()
    }
}

impl<T> ContentReader<T> {
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

impl<T: DeserializeOwned> Iterator for ContentReader<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(err) => return Some(Err(err.into())),
            };
            if line.trim().is_empty() {
                continue;
            }
            return Some(serde_json::from_str::<T>(&line).map_err(Into::into));
        }
    }
}
