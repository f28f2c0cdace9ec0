use super::Shared;
use crate::error::Result;
use crate::event::Event;
use crate::model::ReadBlock;
use crate::net::{Request, TransportError};
use crate::register::{Action, Value};

use log::debug;
use std::sync::Arc;

/// Read every block of the model once. A failing block is reported and the
/// remaining blocks are still read. Returns true if all reads succeeded.
pub(crate) async fn cycle(shared: &Arc<Shared>) -> bool {
    let mut failed = 0;
    for block in shared.model.reads {
        if let Err(e) = read_block(shared, block).await {
            failed += 1;
            shared.events.emit(Event::ErrorReadingRegister(format!(
                "Error while reading {}s: {}",
                block.kind, e
            )));
        }
    }
    shared.events.emit(Event::RegistersUpdated);

    if failed > 0 {
        debug!(
            "Poll of {} finished with {} failed block(s).",
            shared.model.name, failed
        );
        return false;
    }
    shared.ensure_committer();
    true
}

async fn read_block(shared: &Shared, block: &ReadBlock) -> Result<()> {
    let fn_code = shared.model.codes.select(block.kind, Action::Read)?;
    let words = shared
        .gate
        .execute(&Request::read(fn_code, block.start, block.count))
        .await?;
    if words.len() != usize::from(block.count) {
        return Err(TransportError::InvalidResponse(format!(
            "expected {} values at {}, got {}",
            block.count,
            block.start,
            words.len()
        ))
        .into());
    }

    for register in shared.bank.of_kind(block.kind) {
        if !block.contains(register.address()) {
            continue;
        }
        let offset = usize::from(register.address() - block.start);
        register.set_last_known(Value::from(words[offset]));
    }
    Ok(())
}
