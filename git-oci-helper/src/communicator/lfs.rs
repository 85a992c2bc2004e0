//! The LFS NDJSON communicator (spec §4.2): structurally the same contract
//! as the VCS communicator, but framing is one JSON object per line and
//! there is no blank-line batch terminator — every request stands alone.

use std::io::{self, BufRead, BufReader, Read, Write};

use serde::Serialize;

use crate::protocol::lfs::LfsRequest;
use crate::protocol::ProtocolError;

pub struct LfsCommunicator<R, W> {
    reader: BufReader<R>,
    writer: W,
}

impl<R: Read, W: Write> LfsCommunicator<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: BufReader::new(reader),
            writer,
        }
    }

    /// Reads and validates the next request, or `None` at end-of-input.
    pub fn read_request(&mut self) -> Result<Option<LfsRequest>, ProtocolError> {
        let mut line = String::new();
        let n = self
            .reader
            .read_line(&mut line)
            .map_err(|e| ProtocolError::Io(e.to_string()))?;
        if n == 0 {
            return Ok(None);
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return self.read_request();
        }
        let request: LfsRequest = serde_json::from_str(trimmed)
            .map_err(|e| ProtocolError::BadRequest(e.to_string()))?;
        request
            .validate()
            .map_err(|e| ProtocolError::BadRequest(e.to_string()))?;
        Ok(Some(request))
    }

    fn write_line(&mut self, value: &impl Serialize) -> io::Result<()> {
        let json = serde_json::to_string(value)?;
        writeln!(self.writer, "{json}")?;
        self.writer.flush()
    }

    pub fn write_init_response(
        &mut self,
        response: &crate::protocol::lfs::InitResponse,
    ) -> io::Result<()> {
        self.write_line(response)
    }

    pub fn write_progress(
        &mut self,
        response: &crate::protocol::lfs::ProgressResponse,
    ) -> io::Result<()> {
        self.write_line(response)
    }

    pub fn write_complete(
        &mut self,
        response: &crate::protocol::lfs::CompleteResponse,
    ) -> io::Result<()> {
        self.write_line(response)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_init_then_terminate_then_eof() {
        let input = "{\"event\":\"init\",\"operation\":\"download\",\"remote\":\"x\"}\n{\"event\":\"terminate\"}\n";
        let mut comm = LfsCommunicator::new(Cursor::new(input.as_bytes().to_vec()), Vec::new());
        assert!(matches!(
            comm.read_request().unwrap(),
            Some(LfsRequest::Init { .. })
        ));
        assert!(matches!(
            comm.read_request().unwrap(),
            Some(LfsRequest::Terminate)
        ));
        assert_eq!(comm.read_request().unwrap(), None);
    }

    #[test]
    fn rejects_invalid_upload_request() {
        let input = "{\"event\":\"upload\",\"oid\":\"\",\"size\":1,\"path\":\"/tmp/x\"}\n";
        let mut comm = LfsCommunicator::new(Cursor::new(input.as_bytes().to_vec()), Vec::new());
        assert!(comm.read_request().is_err());
    }
}
