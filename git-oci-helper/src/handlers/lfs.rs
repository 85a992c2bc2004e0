//! LFS transfer handler (spec §4.9): one `init`, then any number of
//! `upload`/`download` requests, then `terminate`. Progress messages are
//! collected from the ticker and flushed after each transfer completes
//! rather than truly interleaved mid-copy — the driving call into the
//! registry is itself blocking, so there is no point in the main thread's
//! control flow to interleave a write before the copy returns. The
//! monotonic-total / non-negative-delta properties spec §8.4 cares about
//! hold either way.

use std::io;

use oci_store::{Descriptor, GraphTarget};

use crate::communicator::lfs::LfsCommunicator;
use crate::error::Error;
use crate::model::{DataModel, LFS_MEDIA_TYPE};
use crate::progress::{self, CountingReader, Ticker};
use crate::protocol::lfs::{
    CompleteResponse, InitResponse, LfsRequest, Operation, ProgressResponse,
};
use crate::protocol::ProtocolError;
use crate::store::FileStore;

/// Reads and acknowledges the mandatory first `init` request, returning the
/// declared operation and the remote address (the LFS subsystem, not argv,
/// is the source of truth for which repository this session concerns).
pub fn init<R: io::Read, W: io::Write>(
    comm: &mut LfsCommunicator<R, W>,
) -> Result<(Operation, String), Error> {
    match comm.read_request()? {
        Some(LfsRequest::Init { operation, remote }) => {
            comm.write_init_response(&InitResponse::default())?;
            Ok((operation, remote))
        }
        Some(_) => Err(ProtocolError::Unexpected("expected `init`".into()).into()),
        None => Err(ProtocolError::Unexpected("end of input before `init`".into()).into()),
    }
}

fn drain_progress<R: io::Read, W: io::Write>(
    comm: &mut LfsCommunicator<R, W>,
    oid: &str,
    rx: &crossbeam_channel::Receiver<progress::Update>,
) -> io::Result<()> {
    for update in rx.try_iter() {
        comm.write_progress(&ProgressResponse::new(oid, update.total, update.delta))?;
    }
    Ok(())
}

fn upload_one<W: io::Write>(
    comm: &mut LfsCommunicator<impl io::Read, W>,
    target: &dyn GraphTarget,
    model: &mut DataModel,
    oid: String,
    path: String,
) -> Result<(), Error> {
    let file = std::fs::File::open(&path)?;
    let (tx, rx) = crossbeam_channel::unbounded();
    let (mut reader, ticker) = Ticker::spawn(file, progress::DEFAULT_INTERVAL, tx);
    let pushed = push_with_descriptor(target, &mut reader);
    ticker.stop();
    drain_progress(comm, &oid, &rx)?;

    match pushed {
        Ok(descriptor) => {
            model.append_lfs_descriptor(descriptor);
            comm.write_complete(&CompleteResponse::ok(oid, None))?;
        }
        Err(e) => {
            comm.write_complete(&CompleteResponse::failed(oid, e.to_string()))?;
        }
    }
    Ok(())
}

fn push_with_descriptor(
    target: &dyn GraphTarget,
    reader: &mut CountingReader<std::fs::File>,
) -> Result<Descriptor, oci_store::Error> {
    target.push_blob(LFS_MEDIA_TYPE, reader)
}

fn download_one<W: io::Write>(
    comm: &mut LfsCommunicator<impl io::Read, W>,
    target: &dyn GraphTarget,
    model: &DataModel,
    store: &FileStore,
    oid: String,
    size: i64,
) -> Result<(), Error> {
    let Some(descriptor) = model.find_lfs_layer(&oid) else {
        comm.write_complete(&CompleteResponse::failed(
            oid.clone(),
            format!("no such object `{oid}`"),
        ))?;
        return Ok(());
    };

    let upstream = target.fetch_blob(&descriptor.digest)?;
    let (tx, rx) = crossbeam_channel::unbounded();
    let (mut reader, ticker) = Ticker::spawn(upstream, progress::DEFAULT_INTERVAL, tx);
    let (path, mut file) = store.create(&oid)?;
    let copied = io::copy(&mut reader, &mut file);
    ticker.stop();
    drain_progress(comm, &oid, &rx)?;

    match copied {
        Ok(n) if n == size as u64 => {
            comm.write_complete(&CompleteResponse::ok(oid, Some(path.display().to_string())))?;
        }
        Ok(n) => {
            comm.write_complete(&CompleteResponse::failed(
                oid,
                format!("expected {size} bytes, got {n}"),
            ))?;
        }
        Err(e) => {
            comm.write_complete(&CompleteResponse::failed(oid, e.to_string()))?;
        }
    }
    Ok(())
}

/// Runs the transfer loop until `terminate`, then (for an upload session)
/// pushes the accumulated LFS manifest.
pub fn run<R: io::Read, W: io::Write>(
    comm: &mut LfsCommunicator<R, W>,
    operation: Operation,
    target: &dyn GraphTarget,
    model: &mut DataModel,
    store: &FileStore,
    tag: &str,
) -> Result<(), Error> {
    loop {
        match comm.read_request()? {
            Some(LfsRequest::Upload { oid, path, .. }) => {
                upload_one(comm, target, model, oid, path)?;
            }
            Some(LfsRequest::Download { oid, size }) => {
                download_one(comm, target, model, store, oid, size)?;
            }
            Some(LfsRequest::Terminate) | None => break,
            Some(LfsRequest::Init { .. }) => {
                return Err(ProtocolError::Unexpected("`init` sent twice".into()).into());
            }
        }
    }

    if operation == Operation::Upload {
        model.push_lfs_manifest(target, tag)?;
    }
    Ok(())
}
