//! Sequential line reader with file/line context for errors.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

use crate::field::{self, FieldError};
use crate::repository::RepoError;

pub(crate) struct LineReader {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    /// Index of the next line to be read.
    line: usize,
}

impl LineReader {
    pub fn open(path: &Path) -> Result<Self, RepoError> {
        let file = File::open(path).map_err(|e| RepoError::Open(path.to_path_buf(), e))?;
        Ok(Self {
            path: path.to_path_buf(),
            lines: BufReader::new(file).lines(),
            line: 0,
        })
    }

    pub fn line_number(&self) -> usize {
        self.line
    }

    pub fn next_line(&mut self) -> Result<String, RepoError> {
        match self.lines.next() {
            Some(Ok(text)) => {
                self.line += 1;
                Ok(text)
            }
            Some(Err(e)) => Err(RepoError::Read(self.path.clone(), e)),
            None => Err(RepoError::Truncated {
                path: self.path.clone(),
                line: self.line,
            }),
        }
    }

    pub fn skip(&mut self, count: usize) -> Result<(), RepoError> {
        for _ in 0..count {
            self.next_line()?;
        }
        Ok(())
    }

    /// Skip forward until `line` is the next line to be read.
    /// Does nothing if the reader is already past it.
    pub fn seek_line(&mut self, line: usize) -> Result<(), RepoError> {
        while self.line < line {
            self.next_line()?;
        }
        Ok(())
    }

    pub fn hex(&mut self) -> Result<u32, RepoError> {
        self.field(field::parse_hex)
    }

    pub fn decimal(&mut self) -> Result<u32, RepoError> {
        self.field(field::parse_decimal)
    }

    pub fn signed(&mut self) -> Result<i32, RepoError> {
        self.field(field::parse_signed)
    }

    fn field<T>(&mut self, parse: fn(&str) -> Result<T, FieldError>) -> Result<T, RepoError> {
        let text = self.next_line()?;
        parse(&text).map_err(|e| RepoError::InvalidField {
            path: self.path.clone(),
            line: self.line - 1,
            kind: e.kind,
            token: e.token,
        })
    }
}
