//! The framed line communicator (spec §4.2): a stateful reader/writer pair
//! with one-slot look-ahead, batch termination on a blank line, and typed
//! per-request parsers. `vcs` below is the remote-helper line protocol; the
//! LFS NDJSON variant lives in `communicator::lfs`.

pub mod lfs;

use std::io::{self, BufRead, BufReader, Read, Write};

use crate::protocol::vcs::{
    FetchRequest, ListLine, ListRequest, OptionRequest, OptionResponse, PushRequest, PushResult,
};
use crate::protocol::ProtocolError;

/// What `look_ahead` found on the wire, cached until the next `parse_*`
/// call drains it (spec §9: "an explicit `Option<...>` field").
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Peek {
    Eof,
    Blank,
    Line(Vec<String>),
}

pub struct Communicator<R, W> {
    reader: BufReader<R>,
    writer: W,
    cached: Option<Peek>,
}

impl<R: Read, W: Write> Communicator<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: BufReader::new(reader),
            writer,
            cached: None,
        }
    }

    fn read_raw(&mut self) -> Result<Peek, ProtocolError> {
        let mut line = String::new();
        let n = self
            .reader
            .read_line(&mut line)
            .map_err(|e| ProtocolError::Io(e.to_string()))?;
        if n == 0 {
            return Ok(Peek::Eof);
        }
        let trimmed = line.trim_end_matches(['\n', '\r']);
        if trimmed.is_empty() {
            return Ok(Peek::Blank);
        }
        Ok(Peek::Line(
            trimmed.split_whitespace().map(str::to_owned).collect(),
        ))
    }

    /// Peek the next request without consuming it.
    pub fn look_ahead(&mut self) -> Result<&Peek, ProtocolError> {
        if self.cached.is_none() {
            self.cached = Some(self.read_raw()?);
        }
        Ok(self.cached.as_ref().expect("just populated"))
    }

    fn take(&mut self) -> Result<Peek, ProtocolError> {
        match self.cached.take() {
            Some(peek) => Ok(peek),
            None => self.read_raw(),
        }
    }

    fn tokens(peek: Peek) -> Result<Vec<String>, ProtocolError> {
        match peek {
            Peek::Line(tokens) => Ok(tokens),
            Peek::Blank => Err(ProtocolError::Unexpected("blank line".into())),
            Peek::Eof => Err(ProtocolError::Unexpected("end of input".into())),
        }
    }

    pub fn parse_capabilities(&mut self) -> Result<(), ProtocolError> {
        let tokens = Self::tokens(self.take()?)?;
        match tokens.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
            ["capabilities"] => Ok(()),
            other => Err(ProtocolError::Unexpected(other.join(" "))),
        }
    }

    pub fn parse_option(&mut self) -> Result<OptionRequest, ProtocolError> {
        let tokens = Self::tokens(self.take()?)?;
        let refs: Vec<&str> = tokens.iter().map(String::as_str).collect();
        OptionRequest::parse(&refs)
    }

    pub fn parse_list(&mut self) -> Result<ListRequest, ProtocolError> {
        let tokens = Self::tokens(self.take()?)?;
        let refs: Vec<&str> = tokens.iter().map(String::as_str).collect();
        ListRequest::parse(&refs)
    }

    /// Reads `fetch` lines until a blank line or end-of-input (spec §4.1.1).
    pub fn parse_fetch_batch(&mut self) -> Result<Vec<FetchRequest>, ProtocolError> {
        let mut batch = Vec::new();
        loop {
            match self.take()? {
                Peek::Blank | Peek::Eof => break,
                Peek::Line(tokens) => {
                    let refs: Vec<&str> = tokens.iter().map(String::as_str).collect();
                    batch.push(FetchRequest::parse(&refs)?);
                }
            }
        }
        Ok(batch)
    }

    /// Reads `push` lines until a blank line or end-of-input (spec §4.1.1).
    pub fn parse_push_batch(&mut self) -> Result<Vec<PushRequest>, ProtocolError> {
        let mut batch = Vec::new();
        loop {
            match self.take()? {
                Peek::Blank | Peek::Eof => break,
                Peek::Line(tokens) => {
                    let refs: Vec<&str> = tokens.iter().map(String::as_str).collect();
                    batch.push(PushRequest::parse(&refs)?);
                }
            }
        }
        Ok(batch)
    }

    pub fn write_capabilities_response(&mut self) -> io::Result<()> {
        writeln!(self.writer, "option")?;
        writeln!(self.writer, "fetch")?;
        writeln!(self.writer, "push")?;
        writeln!(self.writer)?;
        self.writer.flush()
    }

    pub fn write_option_response(&mut self, response: OptionResponse) -> io::Result<()> {
        writeln!(self.writer, "{response}")?;
        self.writer.flush()
    }

    pub fn write_list_response(&mut self, lines: &[ListLine]) -> io::Result<()> {
        for line in lines {
            writeln!(self.writer, "{line}")?;
        }
        writeln!(self.writer)?;
        self.writer.flush()
    }

    pub fn write_fetch_response(&mut self) -> io::Result<()> {
        writeln!(self.writer)?;
        self.writer.flush()
    }

    pub fn write_push_response(&mut self, results: &[PushResult]) -> io::Result<()> {
        for result in results {
            writeln!(self.writer, "{result}")?;
        }
        writeln!(self.writer)?;
        self.writer.flush()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    fn communicator(input: &str) -> Communicator<Cursor<Vec<u8>>, Vec<u8>> {
        Communicator::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn look_ahead_does_not_consume() {
        let mut comm = communicator("capabilities\n");
        assert_eq!(
            comm.look_ahead().unwrap(),
            &Peek::Line(vec!["capabilities".into()])
        );
        comm.parse_capabilities().unwrap();
    }

    #[test]
    fn push_batch_stops_at_blank_line() {
        let mut comm = communicator(
            "push refs/heads/main:refs/heads/main\npush refs/heads/dev:refs/heads/dev\n\n",
        );
        let batch = comm.parse_push_batch().unwrap();
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn empty_push_batch_yields_no_requests() {
        let mut comm = communicator("\n");
        let batch = comm.parse_push_batch().unwrap();
        assert!(batch.is_empty());
    }

    #[test]
    fn eof_terminates_a_batch_like_a_blank_line() {
        let mut comm = communicator("push refs/heads/main:refs/heads/main\n");
        let batch = comm.parse_push_batch().unwrap();
        assert_eq!(batch.len(), 1);
    }
}
