//! Capabilities / option handlers (spec §4.4).

use std::io::{Read, Write};

use log::LevelFilter;

use crate::communicator::Communicator;
use crate::error::Error;
use crate::protocol::vcs::OptionResponse;
use crate::protocol::ProtocolError;

pub fn capabilities<R: Read, W: Write>(comm: &mut Communicator<R, W>) -> Result<(), Error> {
    comm.parse_capabilities()?;
    comm.write_capabilities_response()?;
    Ok(())
}

/// `≤0 → error, 1 → warn, 2 → info, >2 → debug` (spec §4.4, §8.3).
fn verbosity_to_level(v: i64) -> LevelFilter {
    match v {
        v if v <= 0 => LevelFilter::Error,
        1 => LevelFilter::Warn,
        2 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    }
}

/// Handles `option <name> <value>`. A `verbosity` value that fails integer
/// parsing is the one case that is fatal to the session (spec §4.4).
pub fn option<R: Read, W: Write>(comm: &mut Communicator<R, W>) -> Result<(), Error> {
    let request = comm.parse_option()?;
    let response = match request.name.as_str() {
        "verbosity" => {
            let value: i64 = request.value.parse().map_err(|_| {
                ProtocolError::BadRequest(format!("invalid verbosity `{}`", request.value))
            })?;
            log::set_max_level(verbosity_to_level(value));
            OptionResponse::Ok
        }
        _ => OptionResponse::Unsupported,
    };
    comm.write_option_response(response)?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn verbosity_boundaries_match_spec_table() {
        assert_eq!(verbosity_to_level(-1), LevelFilter::Error);
        assert_eq!(verbosity_to_level(0), LevelFilter::Error);
        assert_eq!(verbosity_to_level(1), LevelFilter::Warn);
        assert_eq!(verbosity_to_level(2), LevelFilter::Info);
        assert_eq!(verbosity_to_level(10), LevelFilter::Debug);
    }
}
