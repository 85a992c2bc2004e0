//! Push handler (spec §4.6): applies a whole batch to the in-memory model,
//! and only then pushes packfiles, config and manifest — an error partway
//! through applying the batch aborts before any registry write happens.

use std::io::{Read, Write};

use oci_store::{GraphTarget, LocalRepository};

use crate::comparator::{self, ComparatorError};
use crate::communicator::Communicator;
use crate::error::Error;
use crate::model::{DataModel, ReferenceInfo};
use crate::protocol::vcs::{PushRequest, PushResult};
use crate::store::FileStore;

enum Outcome {
    Ok,
    NonFastForward,
}

fn apply_one(
    request: &PushRequest,
    model: &mut DataModel,
    repo: &dyn LocalRepository,
    store: &FileStore,
) -> Result<Outcome, Error> {
    let local = match &request.src {
        Some(src) => repo.resolve(src)?,
        None => None,
    };
    let remote = model.resolve(&request.dst).cloned();

    let decision = match comparator::compare(local, remote.as_ref(), request.force, repo, model) {
        Ok(decision) => decision,
        Err(ComparatorError::NonFastForward) => return Ok(Outcome::NonFastForward),
        Err(ComparatorError::Local(e)) => return Err(Error::Remote(e)),
    };

    if decision.status.delete {
        model.delete_ref(&request.dst);
        return Ok(Outcome::Ok);
    }

    let commit = local.expect("a non-delete decision always resolved a local commit");
    let layer = match decision.reuse_layer {
        Some(layer) => layer,
        None => {
            let have: Vec<_> = model
                .index()
                .iter()
                .flat_map(|(_, commits)| commits.iter().copied())
                .collect();
            let bytes = repo.pack(commit, &have)?;
            model.stage_layer(store, &bytes)?
        }
    };
    model.update_ref(request.dst.clone(), ReferenceInfo { commit, layer });
    Ok(Outcome::Ok)
}

pub fn push<R: Read, W: Write>(
    comm: &mut Communicator<R, W>,
    model: &mut DataModel,
    target: &dyn GraphTarget,
    repo: &dyn LocalRepository,
    store: &FileStore,
    tag: &str,
) -> Result<(), Error> {
    let batch = comm.parse_push_batch()?;
    let mut results = Vec::with_capacity(batch.len());
    let mut mutated = false;

    for request in &batch {
        match apply_one(request, model, repo, store)? {
            Outcome::Ok => {
                mutated = true;
                results.push(PushResult::Ok(request.dst.clone()));
            }
            Outcome::NonFastForward => results.push(PushResult::Error {
                dst: request.dst.clone(),
                message: "non-fast-forward".to_string(),
            }),
        }
    }

    if mutated {
        model.push(target, tag)?;
    }

    comm.write_push_response(&results)?;
    Ok(())
}
