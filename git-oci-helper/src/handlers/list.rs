//! List handler (spec §4.5).

use std::io::{Read, Write};

use oci_store::{LocalRepository, RefName};

use crate::communicator::Communicator;
use crate::error::Error;
use crate::model::DataModel;
use crate::protocol::vcs::{ListLine, ListRequest};

pub fn list<R: Read, W: Write>(
    comm: &mut Communicator<R, W>,
    request: ListRequest,
    model: &DataModel,
    repo: Option<&dyn LocalRepository>,
) -> Result<(), Error> {
    let head = if request.for_push {
        None
    } else {
        match repo {
            Some(repo) => repo.head()?,
            None => None,
        }
    };

    let mut lines = Vec::new();
    for (name, info) in model.config.heads.iter() {
        if let (RefName::Branch(branch), Some(RefName::Branch(head_branch))) = (name, &head) {
            if branch == head_branch {
                lines.push(ListLine::Head {
                    target: name.clone(),
                });
            }
        }
        lines.push(ListLine::Ref {
            commit: info.commit,
            name: name.clone(),
        });
    }
    for (name, info) in model.config.tags.iter() {
        lines.push(ListLine::Ref {
            commit: info.commit,
            name: name.clone(),
        });
    }

    comm.write_list_response(&lines)?;
    Ok(())
}
