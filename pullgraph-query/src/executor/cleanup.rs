use pullgraph_api::GraphSnapshot;
use tracing::warn;

use super::PlanIterator;
use crate::error::{Error, Result};

/// Combine the outcomes of several independent releases.
///
/// Every release has already run by the time this is called; the first
/// failure is returned and the rest are logged.
pub(super) fn close_all(results: impl IntoIterator<Item = Result<()>>) -> Result<()> {
    let mut first: Option<Error> = None;
    for result in results {
        if let Err(e) = result {
            match first {
                None => first = Some(e),
                Some(_) => warn!(error = %e, "suppressed secondary close failure"),
            }
        }
    }
    match first {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Close a half-built subtree after a later open failed, keeping `cause`.
pub(super) fn abandon<S: GraphSnapshot>(mut opened: PlanIterator<'_, S>, cause: Error) -> Error {
    if let Err(e) = opened.close() {
        warn!(error = %e, "close failed while abandoning a partially opened plan");
    }
    cause
}

/// Close an optional storage cursor once, leaving `None` behind.
pub(super) fn close_cursor<C: pullgraph_api::Cursor>(slot: &mut Option<C>) -> Result<()> {
    match slot.take() {
        Some(mut cursor) => cursor.close().map_err(Error::from),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_failure_wins() {
        let out = close_all([
            Ok(()),
            Err(Error::Other("first".into())),
            Err(Error::Other("second".into())),
        ]);
        assert_eq!(out.unwrap_err().to_string(), "first");
        assert!(close_all([Ok(()), Ok(())]).is_ok());
    }
}
