//! The VCS session driver (spec §4.3): `look_ahead` → dispatch by kind →
//! handler → continue, until end-of-input. The OCI graph target and the
//! data model are both initialized lazily, on the first request that
//! actually needs the remote (`list`, `fetch` or `push` — `capabilities`
//! and most `option`s never touch the network).

use std::io::{Read, Write};

use log::debug;
use oci_store::{GraphTarget, HttpRegistry, LocalRepository};

use crate::communicator::{Communicator, Peek};
use crate::config::Config;
use crate::error::Error;
use crate::handlers;
use crate::model::DataModel;
use crate::store::FileStore;
use crate::url::OciUrl;

fn registry(remote: &OciUrl, config: &Config) -> HttpRegistry {
    HttpRegistry::new(
        format!("https://{}", remote.host),
        remote.repo_path.clone(),
        config.token.clone(),
    )
}

/// Runs one `git-remote-oci` session to completion, tearing down the
/// ephemeral file store on every exit path, success or error.
pub fn run<R: Read, W: Write>(
    reader: R,
    writer: W,
    repo: &dyn LocalRepository,
    remote: &OciUrl,
    config: &Config,
) -> Result<(), Error> {
    let mut comm = Communicator::new(reader, writer);
    let store = FileStore::new()?;
    let target = registry(remote, config);
    let mut model: Option<DataModel> = None;

    let result = (|| -> Result<(), Error> {
        loop {
            let kind = match comm.look_ahead()? {
                Peek::Eof => break,
                Peek::Blank => continue,
                Peek::Line(tokens) => tokens.first().cloned(),
            };

            match kind.as_deref() {
                Some("capabilities") => handlers::capabilities::capabilities(&mut comm)?,
                Some("option") => handlers::capabilities::option(&mut comm)?,
                Some("list") => {
                    let request = comm.parse_list()?;
                    let model = model_mut(&mut model, &target, &remote.tag)?;
                    handlers::list::list(&mut comm, request, model, Some(repo))?;
                }
                Some("fetch") => {
                    let model = model_mut(&mut model, &target, &remote.tag)?;
                    handlers::fetch::fetch(&mut comm, model, &target, repo)?;
                }
                Some("push") => {
                    let model = model_mut(&mut model, &target, &remote.tag)?;
                    handlers::push::push(&mut comm, model, &target, repo, &store, &remote.tag)?;
                }
                Some(other) => {
                    return Err(crate::protocol::ProtocolError::Unsupported(other.to_string()).into());
                }
                None => break,
            }
        }
        Ok(())
    })();

    debug!("session ended, removing ephemeral store at {:?}", store.path());
    drop(store);
    result
}

fn model_mut<'a>(
    model: &'a mut Option<DataModel>,
    target: &dyn GraphTarget,
    tag: &str,
) -> Result<&'a mut DataModel, Error> {
    if model.is_none() {
        *model = Some(DataModel::fetch_or_default(target, tag)?);
    }
    Ok(model.as_mut().expect("just populated"))
}

/// Runs one `git-lfs-oci` session (spec §4.9): one `init`, then any number
/// of transfer requests, then `terminate`. The remote address comes from
/// the `init` request itself, not argv — git-lfs invokes a custom transfer
/// agent with no address on the command line.
pub fn run_lfs<R: Read, W: Write>(reader: R, writer: W, config: &Config) -> Result<(), Error> {
    let mut comm = crate::communicator::lfs::LfsCommunicator::new(reader, writer);
    let store = FileStore::new()?;

    let result = (|| -> Result<(), Error> {
        let (operation, remote) = handlers::lfs::init(&mut comm)?;
        let remote: OciUrl = remote.parse()?;
        let target = registry(&remote, config);
        let mut model = DataModel::fetch_or_default(&target, &remote.tag)?;
        handlers::lfs::run(&mut comm, operation, &target, &mut model, &store, &remote.tag)
    })();

    debug!("lfs session ended, removing ephemeral store at {:?}", store.path());
    drop(store);
    result
}
