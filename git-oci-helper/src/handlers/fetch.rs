//! Fetch handler (spec §4.8). Fetches whole packfiles per distinct layer
//! referenced by the batch rather than walking commit parents to find the
//! minimal transitively-needed set — see the open question recorded in
//! `DESIGN.md` and spec §9's note on this tradeoff.

use std::io::{Read, Write};

use oci_store::{Digest, GraphTarget, LocalRepository};

use crate::communicator::Communicator;
use crate::error::Error;
use crate::model::DataModel;

pub fn fetch<R: Read, W: Write>(
    comm: &mut Communicator<R, W>,
    model: &DataModel,
    target: &dyn GraphTarget,
    repo: &dyn LocalRepository,
) -> Result<(), Error> {
    let batch = comm.parse_fetch_batch()?;

    let mut layers: Vec<Digest> = Vec::new();
    for request in &batch {
        if let Some(info) = model.resolve(&request.refname) {
            if !layers.contains(&info.layer) {
                layers.push(info.layer.clone());
            }
        }
    }

    for digest in &layers {
        let mut reader = target.fetch_blob(digest)?;
        repo.index_pack(&mut reader)?;
    }

    comm.write_fetch_response()?;
    Ok(())
}
